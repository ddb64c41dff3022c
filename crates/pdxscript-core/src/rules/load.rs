// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Filesystem loading for rules directories and project scans.
//!
//! All directory walks sort their results so the resulting artifacts are
//! identical across runs regardless of filesystem iteration order.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use super::ir::{RuleFileIR, RuleSetIR};
use super::normalize::normalize_ruleset;
use super::parser::parse_rules_text;
use super::schema_graph::{build_schema_graph, SchemaGraph};

/// Errors raised while loading schema or project files.
#[derive(Debug, Error, Diagnostic)]
pub enum SchemaLoadError {
    #[error("rules root `{root}` does not exist")]
    #[diagnostic(help("check the configured rules directory"))]
    MissingRoot { root: Utf8PathBuf },

    #[error("failed to read `{path}`")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A loaded and normalized ruleset with its schema graph.
#[derive(Debug)]
pub struct LoadedRules {
    pub file_irs: Vec<RuleFileIR>,
    pub graph: SchemaGraph,
}

/// Loads every `.cwt` file under `root` into a schema graph.
///
/// # Errors
///
/// Returns [`SchemaLoadError`] when the root is missing or a file cannot
/// be read.
pub fn load_rules_directory(root: &Utf8Path) -> Result<LoadedRules, SchemaLoadError> {
    if !root.exists() {
        return Err(SchemaLoadError::MissingRoot {
            root: root.to_owned(),
        });
    }

    let mut paths = Vec::new();
    collect_files_with_extension(root, "cwt", &mut paths)?;
    paths.sort();
    debug!(count = paths.len(), root = %root, "loading rules files");

    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        let text = fs::read_to_string(path).map_err(|source| SchemaLoadError::Io {
            path: path.clone(),
            source,
        })?;
        let relative = path.strip_prefix(root).unwrap_or(path);
        files.push(parse_rules_text(&text, relative.as_str()));
    }

    let ruleset: RuleSetIR = normalize_ruleset(files.clone());
    Ok(LoadedRules {
        file_irs: files,
        graph: build_schema_graph(root.as_str(), ruleset),
    })
}

/// Collects project file texts for membership discovery, keyed by the path
/// relative to `root` with `/` separators. Binary image formats are
/// skipped; unreadable files are ignored.
#[must_use]
pub fn collect_file_texts_under_root(root: &Utf8Path) -> IndexMap<String, String> {
    const SKIPPED_EXTENSIONS: &[&str] = &["dds", "png", "tga", "jpg", "jpeg", "webp"];

    let mut paths = Vec::new();
    if collect_all_files(root, &mut paths).is_err() {
        return IndexMap::new();
    }
    paths.sort();

    let mut texts = IndexMap::new();
    for path in paths {
        if path
            .extension()
            .is_some_and(|ext| SKIPPED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        {
            continue;
        }
        let Ok(text) = fs::read_to_string(&path) else {
            continue;
        };
        let relative = path.strip_prefix(root).unwrap_or(&path);
        texts.insert(relative.as_str().replace('\\', "/"), text);
    }
    texts
}

fn collect_files_with_extension(
    dir: &Utf8Path,
    extension: &str,
    out: &mut Vec<Utf8PathBuf>,
) -> Result<(), SchemaLoadError> {
    let entries = fs::read_dir(dir).map_err(|source| SchemaLoadError::Io {
        path: dir.to_owned(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| SchemaLoadError::Io {
            path: dir.to_owned(),
            source,
        })?;
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
            continue;
        };
        if path.is_dir() {
            collect_files_with_extension(&path, extension, out)?;
        } else if path.extension() == Some(extension) {
            out.push(path);
        }
    }
    Ok(())
}

fn collect_all_files(dir: &Utf8Path, out: &mut Vec<Utf8PathBuf>) -> Result<(), std::io::Error> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
            continue;
        };
        if path.is_dir() {
            collect_all_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_root_is_an_error() {
        let result = load_rules_directory(Utf8Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(SchemaLoadError::MissingRoot { .. })));
    }
}
