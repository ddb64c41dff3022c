// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Parser modes and feature gates.

use serde::Serialize;

/// Top-level parser behaviour profile.
///
/// `Strict` is the profile for hand-maintained game script: only `=`
/// assignments, balanced braces. `Permissive` matches what the engines
/// actually accept in shipped content: every comparison operator, stray
/// legacy braces downgraded to warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    #[default]
    Strict,
    Permissive,
}

/// Feature gates controlling grammar compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ParseOptions {
    pub mode: ParseMode,
    /// Accept `[[PARAM]` / `$PARAM$` scripted-effect parameter text.
    pub allow_parameter_syntax: bool,
    /// Accept the CK3 `pattern = list "name"` form.
    pub allow_unmarked_list_form: bool,
    /// Allow quoted scalars to span line breaks.
    pub allow_multiline_strings: bool,
    /// Silently close unterminated quotes at EOF.
    pub allow_unterminated_strings: bool,
    /// Accept comparison operators in strict mode.
    pub allow_comparison_operators: bool,
}

impl ParseOptions {
    /// The strict profile.
    #[must_use]
    pub fn strict() -> Self {
        Self::default()
    }

    /// The permissive profile.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            mode: ParseMode::Permissive,
            ..Self::default()
        }
    }

    /// Options for a given mode with default gates.
    #[must_use]
    pub fn for_mode(mode: ParseMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// True if operators other than `=` are accepted.
    #[must_use]
    pub fn accepts_comparison_operators(&self) -> bool {
        self.mode == ParseMode::Permissive || self.allow_comparison_operators
    }

    /// True if a stray `}` downgrades to a warning.
    #[must_use]
    pub fn tolerates_legacy_braces(&self) -> bool {
        self.mode == ParseMode::Permissive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_rejects_comparisons_by_default() {
        assert!(!ParseOptions::strict().accepts_comparison_operators());
        assert!(ParseOptions::permissive().accepts_comparison_operators());
    }

    #[test]
    fn comparison_gate_opens_strict_mode() {
        let options = ParseOptions {
            allow_comparison_operators: true,
            ..ParseOptions::strict()
        };
        assert!(options.accepts_comparison_operators());
        assert!(!options.tolerates_legacy_braces());
    }
}
