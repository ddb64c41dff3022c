// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Structured diagnostics shared by every pipeline stage.
//!
//! Diagnostics are plain values: a stable string code, a severity, a
//! category naming the emitting stage, a [`Span`], and a human message.
//! Codes are namespaced by prefix — `LEXER_`, `PARSER_`, `TYPECHECK_`,
//! `LINT_`, and `INTERNAL_` — and the prefixes are load-bearing: the rule
//! runners enforce them as part of the rule contract.
//!
//! Both the parser and the rule engines deduplicate at the same
//! `(code, span.start)`: the first emission wins.

use ecow::EcoString;
use serde::Serialize;

use crate::source_analysis::Span;

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A correctness problem; converts to a hard failure at the caller's
    /// discretion.
    Error,
    /// Suspicious but not definitely wrong.
    Warning,
    /// Informational note.
    Info,
    /// A gentle suggestion.
    Hint,
}

/// The pipeline stage a diagnostic originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticCategory {
    Lexer,
    Parser,
    Typecheck,
    Lint,
    /// Internal invariant violations (parser stall, engine bugs).
    Internal,
}

/// A structured diagnostic emitted by lexing, parsing, or rule execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Stable machine-readable code, e.g. `PARSER_EXPECTED_TOKEN`.
    pub code: &'static str,
    /// Human-readable message.
    pub message: EcoString,
    /// Source location.
    pub span: Span,
    /// Severity level.
    pub severity: Severity,
    /// Emitting stage.
    pub category: DiagnosticCategory,
    /// Optional fix hint.
    pub hint: Option<EcoString>,
}

impl Diagnostic {
    /// Creates a new error diagnostic.
    #[must_use]
    pub fn error(
        code: &'static str,
        message: impl Into<EcoString>,
        span: Span,
        category: DiagnosticCategory,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            span,
            severity: Severity::Error,
            category,
            hint: None,
        }
    }

    /// Creates a new warning diagnostic.
    #[must_use]
    pub fn warning(
        code: &'static str,
        message: impl Into<EcoString>,
        span: Span,
        category: DiagnosticCategory,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            span,
            severity: Severity::Warning,
            category,
            hint: None,
        }
    }

    /// Attaches a fix hint.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<EcoString>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ── Lexer codes ─────────────────────────────────────────────────────────────

pub const LEXER_UNTERMINATED_STRING: &str = "LEXER_UNTERMINATED_STRING";

// ── Parser codes ────────────────────────────────────────────────────────────

pub const PARSER_EXPECTED_TOKEN: &str = "PARSER_EXPECTED_TOKEN";
pub const PARSER_EXPECTED_VALUE: &str = "PARSER_EXPECTED_VALUE";
pub const PARSER_UNEXPECTED_TOKEN: &str = "PARSER_UNEXPECTED_TOKEN";
pub const PARSER_UNEXPECTED_OPERATOR: &str = "PARSER_UNEXPECTED_OPERATOR";
pub const PARSER_LEGACY_EXTRA_RBRACE: &str = "PARSER_LEGACY_EXTRA_RBRACE";
pub const PARSER_LEGACY_MISSING_RBRACE: &str = "PARSER_LEGACY_MISSING_RBRACE";
pub const PARSER_UNSUPPORTED_PARAMETER_SYNTAX: &str = "PARSER_UNSUPPORTED_PARAMETER_SYNTAX";
pub const PARSER_UNSUPPORTED_UNMARKED_LIST: &str = "PARSER_UNSUPPORTED_UNMARKED_LIST";

// ── Type-check codes ────────────────────────────────────────────────────────

pub const TYPECHECK_REQUIRED_FIELD_MISSING: &str = "TYPECHECK_REQUIRED_FIELD_MISSING";
pub const TYPECHECK_CARDINALITY_VIOLATION: &str = "TYPECHECK_CARDINALITY_VIOLATION";
pub const TYPECHECK_INVALID_FIELD_TYPE: &str = "TYPECHECK_INVALID_FIELD_TYPE";
pub const TYPECHECK_INVALID_FIELD_REFERENCE: &str = "TYPECHECK_INVALID_FIELD_REFERENCE";
pub const TYPECHECK_INVALID_SCOPE_CONTEXT: &str = "TYPECHECK_INVALID_SCOPE_CONTEXT";
pub const TYPECHECK_UNRESOLVED_REFERENCE: &str = "TYPECHECK_UNRESOLVED_REFERENCE";
pub const TYPECHECK_RULE_CUSTOM_ERROR: &str = "TYPECHECK_RULE_CUSTOM_ERROR";
pub const TYPECHECK_MISSING_LOCALISATION_KEY: &str = "TYPECHECK_MISSING_LOCALISATION_KEY";
pub const TYPECHECK_INVALID_MODIFIER_SCOPE: &str = "TYPECHECK_INVALID_MODIFIER_SCOPE";
pub const TYPECHECK_INCONSISTENT_VALUE_SHAPE: &str = "TYPECHECK_INCONSISTENT_VALUE_SHAPE";

// ── Lint codes ──────────────────────────────────────────────────────────────

pub const LINT_SEMANTIC_INCONSISTENT_SHAPE: &str = "LINT_SEMANTIC_INCONSISTENT_SHAPE";
pub const LINT_SEMANTIC_MISSING_REQUIRED_FIELD: &str = "LINT_SEMANTIC_MISSING_REQUIRED_FIELD";
pub const LINT_STYLE_SINGLE_LINE_BLOCK: &str = "LINT_STYLE_SINGLE_LINE_BLOCK";

// ── Internal invariant codes ────────────────────────────────────────────────

pub const INTERNAL_PARSER_STALL: &str = "INTERNAL_PARSER_STALL";
pub const INTERNAL_TYPECHECK_INVARIANT: &str = "INTERNAL_TYPECHECK_INVARIANT";

/// Returns true if any diagnostic has [`Severity::Error`].
#[must_use]
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.severity == Severity::Error)
}

/// Removes later duplicates sharing `(code, span.start)`, keeping the first
/// emission.
#[must_use]
pub fn dedup_by_position(diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
    let mut seen = std::collections::HashSet::new();
    diagnostics
        .into_iter()
        .filter(|d| seen.insert((d.code, d.span.start())))
        .collect()
}

/// Sorts diagnostics into the stable reporting order: start, end, code,
/// message.
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        (a.span.start(), a.span.end(), a.code, a.message.as_str())
            .cmp(&(b.span.start(), b.span.end(), b.code, b.message.as_str()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_emission_per_code_and_start() {
        let first = Diagnostic::error(
            PARSER_EXPECTED_TOKEN,
            "expected `}`",
            Span::new(4, 5),
            DiagnosticCategory::Parser,
        );
        let duplicate = Diagnostic::error(
            PARSER_EXPECTED_TOKEN,
            "expected `}` (again)",
            Span::new(4, 9),
            DiagnosticCategory::Parser,
        );
        let other_code = Diagnostic::error(
            PARSER_EXPECTED_VALUE,
            "expected a value",
            Span::new(4, 5),
            DiagnosticCategory::Parser,
        );

        let deduped = dedup_by_position(vec![first.clone(), duplicate, other_code.clone()]);
        assert_eq!(deduped, vec![first, other_code]);
    }

    #[test]
    fn sort_orders_by_start_then_end_then_code() {
        let mut diagnostics = vec![
            Diagnostic::error(
                PARSER_UNEXPECTED_TOKEN,
                "b",
                Span::new(10, 12),
                DiagnosticCategory::Parser,
            ),
            Diagnostic::error(
                PARSER_EXPECTED_TOKEN,
                "a",
                Span::new(2, 3),
                DiagnosticCategory::Parser,
            ),
        ];
        sort_diagnostics(&mut diagnostics);
        assert_eq!(diagnostics[0].span.start(), 2);
        assert_eq!(diagnostics[1].span.start(), 10);
    }

    #[test]
    fn has_errors_ignores_warnings() {
        let warning = Diagnostic::warning(
            PARSER_LEGACY_EXTRA_RBRACE,
            "stray `}`",
            Span::new(0, 1),
            DiagnosticCategory::Parser,
        );
        assert!(!has_errors(&[warning.clone()]));

        let error = Diagnostic::error(
            PARSER_EXPECTED_VALUE,
            "expected a value",
            Span::new(0, 1),
            DiagnosticCategory::Parser,
        );
        assert!(has_errors(&[warning, error]));
    }
}
