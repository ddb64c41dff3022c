// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The shared parse carrier.

use std::sync::Arc;

use once_cell::unsync::OnceCell;
use tracing::debug;

use crate::analysis::{build_analysis_facts, AnalysisFacts};
use crate::ast::{lower_source_file, AstBlock, AstSourceFile, BlockView};
use crate::diagnostics::{dedup_by_position, has_errors, sort_diagnostics, Diagnostic};
use crate::source_analysis::{
    build_green_tree, parse_source_file, BufferedLexer, Lexer, LexerOptions, ParseOptions, Parser,
    Span, TokenSource,
};
use crate::syntax::{GreenNode, SyntaxNode};

/// Parses game script with the strict profile.
#[must_use]
pub fn parse(text: &str) -> ParseResult {
    parse_with_options(text, ParseOptions::strict())
}

/// Parses game script with explicit options.
#[must_use]
pub fn parse_with_options(text: &str, options: ParseOptions) -> ParseResult {
    let (stripped, had_bom) = strip_bom(text);
    debug!(len = stripped.len(), mode = ?options.mode, "parsing source");

    let lexer_options = LexerOptions {
        allow_multiline_strings: options.allow_multiline_strings,
        allow_unterminated_strings: options.allow_unterminated_strings,
    };
    let source = TokenSource::new(BufferedLexer::new(Lexer::with_options(
        stripped,
        lexer_options,
    )));
    let mut parser = Parser::new(source, options);
    parse_source_file(&mut parser);
    let (events, parser_diagnostics, source) = parser.finish();
    let (trivia, lexer_diagnostics) = source.finish();
    let green = build_green_tree(stripped, events, trivia);

    let mut diagnostics: Vec<Diagnostic> = parser_diagnostics;
    diagnostics.extend(lexer_diagnostics);
    let mut diagnostics = dedup_by_position(diagnostics);
    sort_diagnostics(&mut diagnostics);

    ParseResult {
        source_text: Arc::from(stripped),
        had_bom,
        options,
        green,
        diagnostics,
        syntax_root: OnceCell::new(),
        ast_root: OnceCell::new(),
        root_block: OnceCell::new(),
        facts: OnceCell::new(),
    }
}

fn strip_bom(text: &str) -> (&str, bool) {
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => (stripped, true),
        None => (text, false),
    }
}

/// A parse result with lazy syntax/AST/view/fact accessors.
///
/// Immutable after construction modulo the one-shot caches; each cache slot
/// initialises at most once.
#[derive(Debug)]
pub struct ParseResult {
    source_text: Arc<str>,
    had_bom: bool,
    options: ParseOptions,
    green: Arc<GreenNode>,
    diagnostics: Vec<Diagnostic>,
    syntax_root: OnceCell<SyntaxNode>,
    ast_root: OnceCell<AstSourceFile>,
    root_block: OnceCell<AstBlock>,
    facts: OnceCell<AnalysisFacts>,
}

impl ParseResult {
    /// The source text (BOM stripped).
    #[must_use]
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// True if the input carried a UTF-8 BOM.
    #[must_use]
    pub fn had_bom(&self) -> bool {
        self.had_bom
    }

    /// The options the source was parsed with.
    #[must_use]
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Lex and parse diagnostics, deduplicated and position-sorted.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// True if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }

    /// The immutable green root.
    #[must_use]
    pub fn green_root(&self) -> &Arc<GreenNode> {
        &self.green
    }

    /// The red root, built on first access.
    pub fn syntax_root(&self) -> &SyntaxNode {
        self.syntax_root.get_or_init(|| {
            SyntaxNode::new_root(Arc::clone(&self.green), Arc::clone(&self.source_text))
        })
    }

    /// The typed AST, lowered on first access.
    pub fn ast_root(&self) -> &AstSourceFile {
        self.ast_root
            .get_or_init(|| lower_source_file(self.syntax_root()))
    }

    /// The top-level statements as a block, for view access.
    pub fn root_block(&self) -> &AstBlock {
        self.root_block.get_or_init(|| AstBlock {
            statements: self.ast_root().statements.clone(),
            span: Span::new(0, self.source_text.len() as u32),
        })
    }

    /// A view over the top-level statements.
    pub fn root_view(&self) -> BlockView<'_> {
        BlockView::new(self.root_block())
    }

    /// The analysis fact index, built on first access.
    pub fn analysis_facts(&self) -> &AnalysisFacts {
        self.facts
            .get_or_init(|| build_analysis_facts(self.ast_root()))
    }
}

#[cfg(test)]
mod tests {
    use crate::diagnostics::Severity;

    use super::*;

    #[test]
    fn caches_return_the_same_instance() {
        let result = parse("a = 1\n");
        let first = result.ast_root() as *const AstSourceFile;
        let second = result.ast_root() as *const AstSourceFile;
        assert_eq!(first, second);
    }

    #[test]
    fn bom_is_stripped_and_recorded() {
        let result = parse("\u{feff}a = 1\n");
        assert!(result.had_bom());
        assert_eq!(result.source_text(), "a = 1\n");
        assert!(result.diagnostics().is_empty());

        let plain = parse("a = 1\n");
        assert!(!plain.had_bom());
    }

    #[test]
    fn diagnostics_are_sorted_and_deduped() {
        let result = parse_with_options("a = { 1 }\n}\nb = 2", ParseOptions::permissive());
        let starts: Vec<_> = result.diagnostics().iter().map(|d| d.span.start()).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
    }

    #[test]
    fn has_errors_reflects_severity() {
        let clean = parse("a = 1\n");
        assert!(!clean.has_errors());

        let broken = parse("a = { b");
        assert!(broken.has_errors());

        let legacy = parse_with_options("a = { b", ParseOptions::permissive());
        assert!(legacy
            .diagnostics()
            .iter()
            .all(|d| d.severity == Severity::Warning));
        assert!(!legacy.has_errors());
    }

    #[test]
    fn root_view_covers_top_level_statements() {
        let result = parse("a = 1\nb = 2\n");
        let object = result.root_view().as_object().expect("object view");
        assert_eq!(object.len(), 2);
    }
}
