// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Key harvesting and the locale-presence index.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;

use camino::Utf8Path;
use ecow::EcoString;

/// Keys harvested from one localisation file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalisationFileKeys {
    /// The locale, e.g. `english` from `l_english:`.
    pub locale: EcoString,
    pub keys: BTreeSet<EcoString>,
}

/// Key → locale-presence index.
#[derive(Debug, Clone, Default)]
pub struct LocalisationKeyProvider {
    locales_by_key: BTreeMap<EcoString, BTreeSet<EcoString>>,
    all_locales: BTreeSet<EcoString>,
}

impl LocalisationKeyProvider {
    /// True if no keys were loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locales_by_key.is_empty()
    }

    /// True if the key exists in at least one locale.
    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        self.locales_by_key.contains_key(key)
    }

    /// The locales the key is present in.
    #[must_use]
    pub fn locales_for(&self, key: &str) -> BTreeSet<EcoString> {
        self.locales_by_key.get(key).cloned().unwrap_or_default()
    }

    /// Every locale any key was seen in.
    #[must_use]
    pub fn known_locales(&self) -> &BTreeSet<EcoString> {
        &self.all_locales
    }

    /// Locales (from `required`, or all known) the key is missing from.
    #[must_use]
    pub fn missing_locales(&self, key: &str, required: &BTreeSet<EcoString>) -> BTreeSet<EcoString> {
        let universe = if required.is_empty() {
            &self.all_locales
        } else {
            required
        };
        let present = self.locales_for(key);
        universe.difference(&present).cloned().collect()
    }
}

/// Parses one localisation file text: the `l_<locale>:` header plus
/// `KEY:0 "text"` lines. Unrecognised lines are skipped.
#[must_use]
pub fn parse_localisation_text(text: &str) -> LocalisationFileKeys {
    let mut result = LocalisationFileKeys::default();

    for raw_line in text.lines() {
        let line = raw_line.trim_start_matches('\u{feff}').trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(locale) = line.strip_prefix("l_").and_then(|rest| rest.strip_suffix(':')) {
            if result.locale.is_empty() {
                result.locale = EcoString::from(locale.trim());
            }
            continue;
        }
        let Some((key_part, _)) = line.split_once(':') else {
            continue;
        };
        let key = key_part.trim();
        if !key.is_empty() && key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.') {
            result.keys.insert(EcoString::from(key));
        }
    }

    result
}

/// Combines per-file keys into a provider.
#[must_use]
pub fn build_localisation_key_provider(
    files: impl IntoIterator<Item = LocalisationFileKeys>,
) -> LocalisationKeyProvider {
    let mut provider = LocalisationKeyProvider::default();
    for file in files {
        if file.locale.is_empty() {
            continue;
        }
        provider.all_locales.insert(file.locale.clone());
        for key in file.keys {
            provider
                .locales_by_key
                .entry(key)
                .or_default()
                .insert(file.locale.clone());
        }
    }
    provider
}

/// Loads every `.yml` under `<root>/localisation` into a provider.
#[must_use]
pub fn load_localisation_keys_under_root(root: &Utf8Path) -> LocalisationKeyProvider {
    let localisation_root = root.join("localisation");
    let mut files = Vec::new();
    collect_yml_files(&localisation_root, &mut files);
    files.sort();

    build_localisation_key_provider(files.iter().filter_map(|path| {
        fs::read_to_string(path)
            .ok()
            .map(|text| parse_localisation_text(&text))
    }))
}

fn collect_yml_files(dir: &Utf8Path, out: &mut Vec<camino::Utf8PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let Ok(path) = camino::Utf8PathBuf::from_path_buf(entry.path()) else {
            continue;
        };
        if path.is_dir() {
            collect_yml_files(&path, out);
        } else if path.extension() == Some("yml") {
            out.push(path);
        }
    }
}
