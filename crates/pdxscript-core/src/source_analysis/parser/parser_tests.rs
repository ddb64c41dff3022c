// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Parser unit tests: events, markers, checkpoints, grammar, recovery.

use std::sync::Arc;

use crate::diagnostics::{
    Diagnostic, DiagnosticCategory, PARSER_EXPECTED_TOKEN, PARSER_LEGACY_EXTRA_RBRACE,
    PARSER_LEGACY_MISSING_RBRACE, PARSER_UNEXPECTED_OPERATOR, PARSER_UNEXPECTED_TOKEN,
};
use crate::source_analysis::{
    build_green_tree, BufferedLexer, Lexer, LexerOptions, Span, TokenKind, TokenSource,
};
use crate::syntax::{GreenNode, SyntaxKind, SyntaxNode};

use super::recovery::{ParseRecoveryTokenSet, RecoveryError};
use super::{parse_source_file, ParseOptions, Parser};

fn parser_for(text: &str, options: ParseOptions) -> Parser<'_> {
    let lexer_options = LexerOptions {
        allow_multiline_strings: options.allow_multiline_strings,
        allow_unterminated_strings: options.allow_unterminated_strings,
    };
    let source = TokenSource::new(BufferedLexer::new(Lexer::with_options(text, lexer_options)));
    Parser::new(source, options)
}

fn parse(text: &str, options: ParseOptions) -> (SyntaxNode, Vec<Diagnostic>) {
    let mut parser = parser_for(text, options);
    parse_source_file(&mut parser);
    let (events, mut diagnostics, source) = parser.finish();
    let (trivia, lexer_diagnostics) = source.finish();
    diagnostics.extend(lexer_diagnostics);
    let green = build_green_tree(text, events, trivia);
    (SyntaxNode::new_root(green, text), diagnostics)
}

fn collect_kinds(green: &Arc<GreenNode>, out: &mut Vec<SyntaxKind>) {
    out.push(green.kind);
    for child in &green.children {
        if let crate::syntax::GreenElement::Node(node) = child {
            collect_kinds(node, out);
        }
    }
}

fn node_kinds(root: &SyntaxNode) -> Vec<SyntaxKind> {
    let mut kinds = Vec::new();
    collect_kinds(root.green(), &mut kinds);
    kinds
}

#[test]
fn compact_form_produces_two_statements() {
    let (root, diagnostics) = parse("a={b=\"1\"c=d}foo=bar#good\n", ParseOptions::strict());
    assert!(diagnostics.is_empty(), "diagnostics: {diagnostics:?}");

    let kinds = node_kinds(&root);
    assert_eq!(
        kinds.iter().filter(|k| **k == SyntaxKind::KeyValue).count(),
        4 // a, b, c, foo
    );
    assert_eq!(kinds.iter().filter(|k| **k == SyntaxKind::Block).count(), 1);
}

#[test]
fn tagged_block_requires_same_line_brace() {
    let (root, _) = parse("color = rgb { 100 200 150 }", ParseOptions::strict());
    assert!(node_kinds(&root).contains(&SyntaxKind::TaggedBlockValue));

    // With a newline between tag and `{`, the scalar stays a plain value
    // and the block is a stray statement.
    let (root, _) = parse("color = rgb\n{ 100 200 150 }", ParseOptions::permissive());
    assert!(!node_kinds(&root).contains(&SyntaxKind::TaggedBlockValue));
}

#[test]
fn quoted_tag_is_not_a_tagged_block() {
    let (root, _) = parse("color = \"rgb\" { 1 2 3 }", ParseOptions::permissive());
    assert!(!node_kinds(&root).contains(&SyntaxKind::TaggedBlockValue));
}

#[test]
fn implicit_assignment_creates_key_value() {
    let (root, diagnostics) = parse("key{ a = 1 }", ParseOptions::strict());
    assert!(diagnostics.is_empty());
    assert!(node_kinds(&root).contains(&SyntaxKind::KeyValue));
}

#[test]
fn permissive_extra_rbrace_is_warning() {
    let (root, diagnostics) = parse("a = { 1 }\n}\nb = 2", ParseOptions::permissive());
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, PARSER_LEGACY_EXTRA_RBRACE);

    let kinds = node_kinds(&root);
    assert_eq!(
        kinds.iter().filter(|k| **k == SyntaxKind::KeyValue).count(),
        2
    );
    assert!(!kinds.contains(&SyntaxKind::Error));
}

#[test]
fn strict_extra_rbrace_is_error_node_and_parsing_continues() {
    let (root, diagnostics) = parse("a = { 1 }\n}\nb = 2", ParseOptions::strict());
    assert!(diagnostics.iter().any(|d| d.code == PARSER_UNEXPECTED_TOKEN));

    let kinds = node_kinds(&root);
    assert!(kinds.contains(&SyntaxKind::Error));
    assert_eq!(
        kinds.iter().filter(|k| **k == SyntaxKind::KeyValue).count(),
        2
    );
}

#[test]
fn permissive_missing_rbrace_is_warning() {
    let (_, diagnostics) = parse("a = { b = 1", ParseOptions::permissive());
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, PARSER_LEGACY_MISSING_RBRACE);
}

#[test]
fn strict_missing_rbrace_is_error() {
    let (_, diagnostics) = parse("a = { b = 1", ParseOptions::strict());
    assert!(diagnostics.iter().any(|d| d.code == PARSER_EXPECTED_TOKEN));
}

#[test]
fn strict_rejects_comparison_operators() {
    let (_, diagnostics) = parse("threshold > 5", ParseOptions::strict());
    assert!(diagnostics
        .iter()
        .any(|d| d.code == PARSER_UNEXPECTED_OPERATOR));

    let (_, diagnostics) = parse("threshold > 5", ParseOptions::permissive());
    assert!(diagnostics.is_empty());

    let gated = ParseOptions {
        allow_comparison_operators: true,
        ..ParseOptions::strict()
    };
    let (_, diagnostics) = parse("threshold > 5", gated);
    assert!(diagnostics.is_empty());
}

#[test]
fn recovery_creates_error_node_and_continues() {
    let (root, diagnostics) = parse("a=1 ?=oops\nb=2\n", ParseOptions::permissive());
    assert!(!diagnostics.is_empty());

    let kinds = node_kinds(&root);
    assert!(kinds.contains(&SyntaxKind::Error));
    assert_eq!(
        kinds.iter().filter(|k| **k == SyntaxKind::KeyValue).count(),
        2
    );
}

#[test]
fn equal_as_key_is_rejected_in_both_modes() {
    for options in [ParseOptions::strict(), ParseOptions::permissive()] {
        let (_, diagnostics) = parse("== \"bar\"", options);
        assert!(!diagnostics.is_empty(), "mode: {:?}", options.mode);
    }
}

#[test]
fn bare_scalar_after_key_value_rejected_in_strict() {
    let source = "pride_of_the_fleet = yes\ndefinition\n";
    let (_, diagnostics) = parse(source, ParseOptions::strict());
    assert!(!diagnostics.is_empty());

    let (_, diagnostics) = parse(source, ParseOptions::permissive());
    assert!(diagnostics.is_empty());
}

#[test]
fn alternating_values_inside_blocks_are_accepted() {
    let source = "on_actions = {\n  pulse\n  delay = { days = 5 }\n  other_pulse\n}\n";
    let (_, diagnostics) = parse(source, ParseOptions::strict());
    assert!(diagnostics.is_empty(), "diagnostics: {diagnostics:?}");
}

#[test]
fn checkpoint_rewind_restores_events_and_diagnostics() {
    let mut parser = parser_for("foo=1", ParseOptions::strict());
    let checkpoint = parser.checkpoint();

    parser.bump();
    parser.bump();
    assert!(!parser.events().is_empty());

    parser.rewind(checkpoint);
    assert_eq!(parser.current(), TokenKind::ScalarUnquoted);
    assert!(parser.events().is_empty());
    assert!(parser.diagnostics().is_empty());
}

#[test]
fn speculative_mode_discards_diagnostics_on_rewind() {
    let mut parser = parser_for("a = ", ParseOptions::strict());
    let checkpoint = parser.checkpoint();

    parser.speculative(|p| {
        p.bump();
        p.error(Diagnostic::error(
            PARSER_UNEXPECTED_TOKEN,
            "speculative-only",
            p.current_span(),
            DiagnosticCategory::Parser,
        ));
    });
    assert_eq!(parser.diagnostics().len(), 1);

    parser.rewind(checkpoint);
    assert!(parser.diagnostics().is_empty());
}

#[test]
fn recovery_is_disabled_during_speculative_parsing() {
    let mut parser = parser_for("?=oops", ParseOptions::strict());
    let recovery = ParseRecoveryTokenSet::new(SyntaxKind::Error, &[TokenKind::Eof]);

    let result = parser.speculative(|p| recovery.recover(p).map(|_| ()));
    assert_eq!(result.unwrap_err(), RecoveryError::RecoveryDisabled);
}

#[test]
fn marker_precede_reparents_completed_node() {
    let mut parser = parser_for("a = b", ParseOptions::strict());
    let marker = parser.start();
    parser.bump();
    let completed = marker.complete(&mut parser, SyntaxKind::Scalar);

    let outer = completed.precede(&mut parser);
    parser.bump();
    parser.bump();
    outer.complete(&mut parser, SyntaxKind::KeyValue);

    let (events, _, source) = parser.finish();
    let (trivia, _) = source.finish();
    let green = build_green_tree("a = b", events, trivia);
    let root = SyntaxNode::new_root(green, "a = b");
    let kinds = node_kinds(&root);
    assert_eq!(kinds, vec![SyntaxKind::Root, SyntaxKind::KeyValue, SyntaxKind::Scalar]);
}

#[test]
fn abandoned_marker_leaves_no_node() {
    let mut parser = parser_for("a", ParseOptions::strict());
    let marker = parser.start();
    marker.abandon(&mut parser);
    assert!(parser.events().is_empty());
}

#[test]
fn diagnostics_dedup_at_same_position() {
    let mut parser = parser_for("x", ParseOptions::strict());
    let span = Span::new(0, 1);
    for _ in 0..3 {
        parser.error(Diagnostic::error(
            PARSER_UNEXPECTED_TOKEN,
            "same spot",
            span,
            DiagnosticCategory::Parser,
        ));
    }
    assert_eq!(parser.diagnostics().len(), 1);
}

#[test]
fn empty_source_parses_to_empty_file() {
    let (root, diagnostics) = parse("", ParseOptions::strict());
    assert!(diagnostics.is_empty());
    let kinds = node_kinds(&root);
    assert!(kinds.contains(&SyntaxKind::SourceFile));
    assert!(kinds.contains(&SyntaxKind::StatementList));
}
