// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Property-based tests for the lossless pipeline.
//!
//! These verify the universal invariants over generated inputs:
//!
//! 1. **Byte-exact reconstruction** — concatenating every token's leading
//!    trivia, text, and trailing trivia reproduces the input.
//! 2. **Ownership uniqueness** — token full-spans tile the input with no
//!    gaps and no overlaps.
//! 3. **Determinism** — the same input always produces the same green tree.
//! 4. **Well-formed inputs parse cleanly** — generated valid statements
//!    produce no diagnostics in strict mode.

use proptest::prelude::*;

use super::parser::{parse_source_file, ParseOptions, Parser};
use super::{build_green_tree, BufferedLexer, Lexer, TokenSource};
use crate::diagnostics::Diagnostic;
use crate::syntax::SyntaxNode;

fn parse_red(text: &str, options: ParseOptions) -> (SyntaxNode, Vec<Diagnostic>) {
    let source = TokenSource::new(BufferedLexer::new(Lexer::new(text)));
    let mut parser = Parser::new(source, options);
    parse_source_file(&mut parser);
    let (events, mut diagnostics, source) = parser.finish();
    let (trivia, lexer_diagnostics) = source.finish();
    diagnostics.extend(lexer_diagnostics);
    let green = build_green_tree(text, events, trivia);
    (SyntaxNode::new_root(green, text), diagnostics)
}

fn reconstruct(root: &SyntaxNode) -> String {
    root.descendant_tokens()
        .iter()
        .map(|t| t.text_with_trivia().to_string())
        .collect()
}

fn scalar_fragment() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "infantry",
        "1444.11.11",
        "-0.5",
        "1000",
        "yes",
        "@variable",
        "pre:fixed",
        "\"quoted value\"",
        "\"multi word\"",
    ])
    .prop_map(str::to_string)
}

fn statement_fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        (scalar_fragment(), scalar_fragment()).prop_map(|(k, v)| format!("{k} = {v}")),
        (scalar_fragment(), scalar_fragment()).prop_map(|(k, v)| format!("{k} = {{ {v} }}")),
        (scalar_fragment(), scalar_fragment()).prop_map(|(k, v)| format!("{k} = rgb {{ {v} }}")),
        scalar_fragment().prop_map(|k| format!("{k} = {{}}")),
    ]
}

fn well_formed_source() -> impl Strategy<Value = String> {
    prop::collection::vec(statement_fragment(), 0..8).prop_map(|statements| {
        let mut out = String::new();
        for statement in statements {
            out.push_str(&statement);
            out.push('\n');
        }
        out
    })
}

proptest! {
    #[test]
    fn reconstruction_is_byte_exact_for_arbitrary_input(source in ".*") {
        let (root, _) = parse_red(&source, ParseOptions::permissive());
        prop_assert_eq!(reconstruct(&root), source);
    }

    #[test]
    fn token_spans_tile_the_input(source in ".*") {
        let (root, _) = parse_red(&source, ParseOptions::permissive());
        let mut covered = 0u32;
        for token in root.descendant_tokens() {
            prop_assert_eq!(token.span().start(), covered);
            covered = token.span().end();
        }
        prop_assert_eq!(covered as usize, source.len());
    }

    #[test]
    fn parsing_is_deterministic(source in ".*") {
        let (first, _) = parse_red(&source, ParseOptions::permissive());
        let (second, _) = parse_red(&source, ParseOptions::permissive());
        prop_assert_eq!(first.green().as_ref(), second.green().as_ref());
    }

    #[test]
    fn well_formed_sources_parse_cleanly(source in well_formed_source()) {
        let (root, diagnostics) = parse_red(&source, ParseOptions::strict());
        prop_assert!(diagnostics.is_empty(), "diagnostics: {diagnostics:?}");
        prop_assert_eq!(reconstruct(&root), source);
    }
}
