// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Asset registry contract for file-backed references.
//!
//! `filepath[...]` and `icon[...]` constraints resolve through an injected
//! [`AssetRegistry`]; the core never touches the filesystem during a walk.

use std::collections::BTreeSet;

use ecow::EcoString;

/// Outcome of a registry lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetLookup {
    /// The asset exists.
    Found,
    /// The registry is authoritative and the asset is absent.
    Missing,
    /// No registry is configured for this path space.
    Unknown,
}

/// Abstract asset registry injected into the type-check services.
pub trait AssetRegistry: std::fmt::Debug {
    /// Looks up a normalized (forward-slash) asset path.
    fn lookup(&self, path: &str) -> AssetLookup;
}

/// Default registry: every lookup is [`AssetLookup::Unknown`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAssetRegistry;

impl AssetRegistry for NullAssetRegistry {
    fn lookup(&self, _path: &str) -> AssetLookup {
        AssetLookup::Unknown
    }
}

/// In-memory registry over a fixed path set; for tests and local wiring.
#[derive(Debug, Clone, Default)]
pub struct SetAssetRegistry {
    known_paths: BTreeSet<EcoString>,
}

impl SetAssetRegistry {
    /// Creates a registry over the given known paths.
    #[must_use]
    pub fn new(paths: impl IntoIterator<Item = impl Into<EcoString>>) -> Self {
        Self {
            known_paths: paths
                .into_iter()
                .map(|path| EcoString::from(normalize(&path.into())))
                .collect(),
        }
    }
}

impl AssetRegistry for SetAssetRegistry {
    fn lookup(&self, path: &str) -> AssetLookup {
        if self.known_paths.contains(normalize(path).as_str()) {
            AssetLookup::Found
        } else {
            AssetLookup::Missing
        }
    }
}

fn normalize(path: &str) -> String {
    path.trim().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_registry_is_always_unknown() {
        assert_eq!(NullAssetRegistry.lookup("gfx/a.dds"), AssetLookup::Unknown);
    }

    #[test]
    fn set_registry_normalizes_paths() {
        let registry = SetAssetRegistry::new(["gfx\\interface\\goals\\a.dds"]);
        assert_eq!(
            registry.lookup("gfx/interface/goals/a.dds"),
            AssetLookup::Found
        );
        assert_eq!(registry.lookup("gfx/other.dds"), AssetLookup::Missing);
    }
}
