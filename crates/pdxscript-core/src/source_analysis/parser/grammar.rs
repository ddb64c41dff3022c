// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Jomini grammar routines that emit CST events.
//!
//! ```text
//! SourceFile       ::= StatementList EOF
//! Statement        ::= KeyValue | Value
//! KeyValue         ::= Scalar Operator Value
//! Value            ::= Scalar | Block | TaggedBlockValue
//! Block            ::= `{` StatementList `}`
//! TaggedBlockValue ::= Scalar Block        (value position, no line break)
//! ```
//!
//! An implicit assignment (`key{...}`) is a `KeyValue` with no operator
//! token. A tagged block value is only recognised on the right-hand side of
//! an assignment when the `{` follows the tag scalar without a line break;
//! `rgb` on its own line stays a plain scalar value and the block becomes a
//! stray statement.

use crate::diagnostics::{
    Diagnostic, DiagnosticCategory, PARSER_EXPECTED_TOKEN, PARSER_EXPECTED_VALUE,
    PARSER_LEGACY_EXTRA_RBRACE, PARSER_LEGACY_MISSING_RBRACE, PARSER_UNEXPECTED_OPERATOR,
    PARSER_UNEXPECTED_TOKEN, PARSER_UNSUPPORTED_PARAMETER_SYNTAX, PARSER_UNSUPPORTED_UNMARKED_LIST,
};
use crate::syntax::SyntaxKind;

use super::recovery::ParseRecoveryTokenSet;
use super::{CompletedMarker, ParseMode, Parser, ParserProgress, TokenKind};

/// The eight assignment/comparison operators.
pub(crate) const ASSIGNMENT_OPERATORS: &[TokenKind] = &[
    TokenKind::Equal,
    TokenKind::EqualEqual,
    TokenKind::NotEqual,
    TokenKind::LessThan,
    TokenKind::LessThanOrEqual,
    TokenKind::GreaterThan,
    TokenKind::GreaterThanOrEqual,
    TokenKind::QuestionEqual,
];

const SCALAR_STARTS: &[TokenKind] = &[TokenKind::ScalarUnquoted, TokenKind::ScalarQuoted];

#[derive(Debug, Clone, Copy)]
struct StatementParse {
    present: bool,
    is_key_value: bool,
}

impl StatementParse {
    const ABSENT: Self = Self {
        present: false,
        is_key_value: false,
    };

    const fn present(is_key_value: bool) -> Self {
        Self {
            present: true,
            is_key_value,
        }
    }
}

/// Parses a whole source file into events.
pub fn parse_source_file(parser: &mut Parser<'_>) {
    let root = parser.start();
    // Top-level strict profiles reject bare values once a key-value has
    // appeared; blocks always accept the alternating form.
    let restrict_bare = parser.options().mode == ParseMode::Strict;
    parse_statement_list(parser, &[TokenKind::Eof], restrict_bare);
    root.complete(parser, SyntaxKind::SourceFile);
}

fn parse_statement_list(
    parser: &mut Parser<'_>,
    stop: &[TokenKind],
    restrict_bare_after_key_value: bool,
) -> CompletedMarker {
    let marker = parser.start();
    let mut progress = ParserProgress::default();
    let mut seen_key_value = false;

    let mut recovery_set = vec![TokenKind::RBrace];
    recovery_set.extend_from_slice(SCALAR_STARTS);
    recovery_set.extend_from_slice(stop);
    let recovery =
        ParseRecoveryTokenSet::new(SyntaxKind::Error, &recovery_set).enable_recovery_on_line_break();

    while !parser.at(TokenKind::Eof) && !parser.at_set(stop) {
        if !progress.has_progressed(parser) {
            parser.report_stall();
            break;
        }

        let restrict = restrict_bare_after_key_value && seen_key_value;
        let statement = parse_statement(parser, restrict);
        if statement.present {
            seen_key_value |= statement.is_key_value;
            continue;
        }

        parser.error(unexpected_token(parser));
        if recovery.recover(parser).is_err() {
            break;
        }
    }

    marker.complete(parser, SyntaxKind::StatementList)
}

fn parse_statement(parser: &mut Parser<'_>, restrict_bare_scalar: bool) -> StatementParse {
    if parser.at(TokenKind::RBrace) {
        // Only reachable at the top level; nested lists stop before `}`.
        if parser.options().tolerates_legacy_braces() {
            parser.error(legacy_extra_closing_brace(parser));
            parser.bump();
        } else {
            parser.error(unexpected_token(parser));
            let marker = parser.start();
            parser.bump();
            marker.complete(parser, SyntaxKind::Error);
        }
        return StatementParse::present(false);
    }

    if parser.at(TokenKind::LBrace) {
        parse_block(parser);
        return StatementParse::present(false);
    }

    let Some(key_or_value) = parse_scalar(parser) else {
        return StatementParse::ABSENT;
    };

    if parser.at_set(ASSIGNMENT_OPERATORS) {
        if !parser.at(TokenKind::Equal) && !parser.options().accepts_comparison_operators() {
            parser.error(unexpected_operator(parser));
        }
        let marker = key_or_value.precede(parser);
        parser.bump();
        if parser.at(TokenKind::Eof) || parser.at(TokenKind::RBrace) {
            parser.error(expected_value(parser));
        } else {
            parse_value(parser);
        }
        marker.complete(parser, SyntaxKind::KeyValue);
        return StatementParse::present(true);
    }

    if parser.at(TokenKind::LBrace) {
        // Implicit assignment: `key{...}` means `key = {...}`.
        let marker = key_or_value.precede(parser);
        parse_block(parser);
        marker.complete(parser, SyntaxKind::KeyValue);
        return StatementParse::present(true);
    }

    let text = key_or_value.text(parser).to_owned();
    if is_parameter_syntax(&text) && !parser.options().allow_parameter_syntax {
        parser.error(unsupported_parameter_syntax(parser, key_or_value));
    }
    if restrict_bare_scalar {
        parser.error(bare_scalar_not_allowed(parser, key_or_value));
    }
    StatementParse::present(false)
}

fn parse_value(parser: &mut Parser<'_>) -> bool {
    if parser.at(TokenKind::LBrace) {
        parse_block(parser);
        return true;
    }

    let tag_candidate = parser.at(TokenKind::ScalarUnquoted);
    let Some(scalar) = parse_scalar(parser) else {
        parser.error(expected_value(parser));
        return false;
    };

    if scalar.text(parser) == "list" && parser.at(TokenKind::ScalarQuoted) {
        if !parser.options().allow_unmarked_list_form {
            parser.error(unsupported_unmarked_list(parser));
            return false;
        }
        parse_scalar(parser);
        return true;
    }

    // `TAG { ... }`: only with an unquoted tag and no intervening newline.
    if parser.at(TokenKind::LBrace) && tag_candidate && !parser.has_preceding_line_break() {
        let tagged = scalar.precede(parser);
        parse_block(parser);
        tagged.complete(parser, SyntaxKind::TaggedBlockValue);
    }

    true
}

fn parse_block(parser: &mut Parser<'_>) -> CompletedMarker {
    let marker = parser.start();
    if !parser.at(TokenKind::LBrace) {
        parser.error(expected_token(parser, "{"));
        return marker.complete(parser, SyntaxKind::Block);
    }

    parser.bump();
    parse_statement_list(parser, &[TokenKind::RBrace, TokenKind::Eof], false);

    if parser.at(TokenKind::RBrace) {
        parser.bump();
    } else if parser.at(TokenKind::Eof) && parser.options().tolerates_legacy_braces() {
        parser.error(legacy_missing_closing_brace(parser));
    } else {
        parser.error(expected_token(parser, "}"));
    }

    marker.complete(parser, SyntaxKind::Block)
}

fn parse_scalar(parser: &mut Parser<'_>) -> Option<CompletedMarker> {
    if !parser.at_set(SCALAR_STARTS) {
        return None;
    }
    let marker = parser.start();
    parser.bump();
    Some(marker.complete(parser, SyntaxKind::Scalar))
}

fn is_parameter_syntax(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.starts_with("[[") || (trimmed.len() >= 2 && trimmed.starts_with('$') && trimmed.ends_with('$'))
}

// ── Diagnostics ─────────────────────────────────────────────────────────────

fn expected_token(parser: &Parser<'_>, expected: &str) -> Diagnostic {
    Diagnostic::error(
        PARSER_EXPECTED_TOKEN,
        format!("expected `{expected}`"),
        parser.current_span(),
        DiagnosticCategory::Parser,
    )
}

fn expected_value(parser: &Parser<'_>) -> Diagnostic {
    Diagnostic::error(
        PARSER_EXPECTED_VALUE,
        "expected a value after the operator",
        parser.current_span(),
        DiagnosticCategory::Parser,
    )
}

fn unexpected_token(parser: &Parser<'_>) -> Diagnostic {
    Diagnostic::error(
        PARSER_UNEXPECTED_TOKEN,
        format!("unexpected token `{:?}`", parser.current()),
        parser.current_span(),
        DiagnosticCategory::Parser,
    )
}

fn unexpected_operator(parser: &Parser<'_>) -> Diagnostic {
    Diagnostic::error(
        PARSER_UNEXPECTED_OPERATOR,
        "comparison operators are not allowed in strict mode",
        parser.current_span(),
        DiagnosticCategory::Parser,
    )
    .with_hint("use `=`, or enable `allow_comparison_operators`")
}

fn legacy_extra_closing_brace(parser: &Parser<'_>) -> Diagnostic {
    Diagnostic::warning(
        PARSER_LEGACY_EXTRA_RBRACE,
        "stray closing brace",
        parser.current_span(),
        DiagnosticCategory::Parser,
    )
}

fn legacy_missing_closing_brace(parser: &Parser<'_>) -> Diagnostic {
    Diagnostic::warning(
        PARSER_LEGACY_MISSING_RBRACE,
        "block is missing its closing brace",
        parser.current_span(),
        DiagnosticCategory::Parser,
    )
}

fn unsupported_parameter_syntax(parser: &Parser<'_>, scalar: CompletedMarker) -> Diagnostic {
    Diagnostic::error(
        PARSER_UNSUPPORTED_PARAMETER_SYNTAX,
        "scripted-effect parameter syntax is not enabled",
        scalar.span(parser),
        DiagnosticCategory::Parser,
    )
    .with_hint("enable `allow_parameter_syntax` to accept `[[PARAM]` and `$PARAM$`")
}

fn unsupported_unmarked_list(parser: &Parser<'_>) -> Diagnostic {
    Diagnostic::error(
        PARSER_UNSUPPORTED_UNMARKED_LIST,
        "unmarked list form is not enabled",
        parser.current_span(),
        DiagnosticCategory::Parser,
    )
    .with_hint("enable `allow_unmarked_list_form` to accept `pattern = list \"name\"`")
}

fn bare_scalar_not_allowed(parser: &Parser<'_>, scalar: CompletedMarker) -> Diagnostic {
    Diagnostic::error(
        PARSER_UNEXPECTED_TOKEN,
        "bare value after a key-value statement",
        scalar.span(parser),
        DiagnosticCategory::Parser,
    )
    .with_hint("give the value a key, or parse in permissive mode")
}
