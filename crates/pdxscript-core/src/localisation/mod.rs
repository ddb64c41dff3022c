// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Localisation key provider.
//!
//! The type checker only needs the *existence contract*: which keys exist,
//! and in which locales. The loader here parses just enough of the
//! `l_<locale>:` YAML-like format to harvest keys; everything else about
//! localisation files is another tool's problem.

mod keys;

pub use keys::{
    build_localisation_key_provider, load_localisation_keys_under_root, parse_localisation_text,
    LocalisationFileKeys, LocalisationKeyProvider,
};
