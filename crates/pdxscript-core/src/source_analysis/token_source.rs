// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Bridge between lexer and parser that hides trivia but records ownership.
//!
//! The grammar only ever sees non-trivia tokens. Every trivia token is
//! appended to an ordered list with its ownership (`trailing`) decided
//! immediately, at stream time:
//!
//! - Trivia after a non-trivia token `T` is trailing of `T` up to and
//!   including the first newline.
//! - Everything after that newline is leading of the next non-trivia token.
//! - Trivia before the first token of the file is leading of that token;
//!   trivia after the last token is leading of the synthetic EOF.
//!
//! The tree sink later converts this list into compact trivia pieces; the
//! two stages together guarantee byte-exact reconstruction.

use crate::diagnostics::Diagnostic;

use super::buffered_lexer::{BufferedLexer, LexContext};
use super::lexer::LexerCheckpoint;
use super::{Span, TokenFlags, TokenKind, Trivia, TriviaKind};

/// A resumable snapshot of the token source.
#[derive(Debug, Clone, Copy)]
pub struct TokenSourceCheckpoint {
    lexer_checkpoint: LexerCheckpoint,
    trivia_len: usize,
}

/// Trivia-hiding token stream with lookahead.
pub struct TokenSource<'src> {
    lexer: BufferedLexer<'src>,
    trivia: Vec<Trivia>,
    current_kind: TokenKind,
    current_span: Span,
    preceding_line_break: bool,
    preceding_trivia: bool,
}

impl<'src> TokenSource<'src> {
    /// Creates a token source positioned at the first non-trivia token.
    #[must_use]
    pub fn new(lexer: BufferedLexer<'src>) -> Self {
        let mut source = Self {
            lexer,
            trivia: Vec::new(),
            current_kind: TokenKind::Eof,
            current_span: Span::empty(0),
            preceding_line_break: false,
            preceding_trivia: false,
        };
        source.next_non_trivia(true, LexContext::REGULAR);
        source
    }

    /// The original source text.
    #[must_use]
    pub fn text(&self) -> &'src str {
        self.lexer.source()
    }

    /// The current non-trivia token kind.
    #[must_use]
    pub fn current(&self) -> TokenKind {
        self.current_kind
    }

    /// The current token's span.
    #[must_use]
    pub fn current_span(&self) -> Span {
        self.current_span
    }

    /// The current token's start offset.
    #[must_use]
    pub fn position(&self) -> u32 {
        self.current_span.start()
    }

    /// True if a newline occurred between the previous token and this one.
    #[must_use]
    pub fn has_preceding_line_break(&self) -> bool {
        self.preceding_line_break
    }

    /// True if any trivia occurred between the previous token and this one.
    #[must_use]
    pub fn has_preceding_trivia(&self) -> bool {
        self.preceding_trivia
    }

    /// The ordered trivia list collected so far.
    #[must_use]
    pub fn trivia(&self) -> &[Trivia] {
        &self.trivia
    }

    /// Advances past the current token.
    pub fn bump(&mut self) {
        if self.current_kind != TokenKind::Eof {
            self.next_non_trivia(false, LexContext::REGULAR);
        }
    }

    /// Advances past the current token under a specific lex context.
    pub fn bump_with_context(&mut self, context: LexContext) {
        if self.current_kind != TokenKind::Eof {
            self.next_non_trivia(false, context);
        }
    }

    /// Converts the current token into `Skipped` trivia and advances.
    ///
    /// Used by recovery to preserve bytes the grammar cannot place.
    pub fn skip_as_trivia(&mut self) {
        if self.current_kind == TokenKind::Eof {
            return;
        }
        self.trivia.push(Trivia {
            kind: TriviaKind::Skipped,
            span: self.current_span,
            trailing: false,
        });
        self.next_non_trivia(false, LexContext::REGULAR);
    }

    /// The kind of the `n`th non-trivia token (`n == 0` is the current one).
    pub fn nth(&mut self, n: usize) -> TokenKind {
        if n == 0 {
            return self.current_kind;
        }
        self.lexer
            .nth_non_trivia(n)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    /// The span of the `n`th non-trivia token.
    pub fn nth_span(&mut self, n: usize) -> Span {
        if n == 0 {
            return self.current_span;
        }
        self.lexer
            .nth_non_trivia(n)
            .map_or_else(|| Span::empty(self.current_span.end()), |t| t.span)
    }

    /// True if the `n`th non-trivia token follows a line break.
    pub fn has_nth_preceding_line_break(&mut self, n: usize) -> bool {
        if n == 0 {
            return self.preceding_line_break;
        }
        self.lexer
            .nth_non_trivia(n)
            .is_some_and(|t| t.has_preceding_line_break())
    }

    /// True if any trivia separates the `n-1`th and `n`th tokens.
    pub fn has_nth_preceding_trivia(&mut self, n: usize) -> bool {
        if n == 0 {
            return self.preceding_trivia;
        }
        let prev_span = self.nth_span(n - 1);
        let next_span = self.nth_span(n);
        next_span.start() > prev_span.end()
    }

    /// Snapshots the stream state.
    #[must_use]
    pub fn checkpoint(&self) -> TokenSourceCheckpoint {
        TokenSourceCheckpoint {
            lexer_checkpoint: self.lexer.checkpoint(),
            trivia_len: self.trivia.len(),
        }
    }

    /// Restores a snapshot, truncating trivia recorded after it.
    pub fn rewind(&mut self, checkpoint: TokenSourceCheckpoint) {
        self.lexer.rewind(checkpoint.lexer_checkpoint);
        self.trivia.truncate(checkpoint.trivia_len);

        let ck = checkpoint.lexer_checkpoint;
        self.current_kind = ck.current_kind;
        self.current_span = ck.current_span();
        self.preceding_line_break = ck.has_preceding_line_break();
        self.preceding_trivia = false;
    }

    /// Finishes the stream, returning the trivia list and lexer diagnostics.
    #[must_use]
    pub fn finish(self) -> (Vec<Trivia>, Vec<Diagnostic>) {
        (self.trivia, self.lexer.finish())
    }

    fn next_non_trivia(&mut self, first_token: bool, context: LexContext) {
        // Before the first token there is no previous owner, so everything
        // is leading. After that, trivia trails the previous token until a
        // newline flips ownership.
        let mut trailing = !first_token;
        self.preceding_line_break = false;
        let mut saw_trivia = false;

        loop {
            let kind = self.lexer.next_token(context);
            let span = self.lexer.current_span();

            if let Some(trivia_kind) = TriviaKind::from_token_kind(kind) {
                saw_trivia = true;
                if trivia_kind == TriviaKind::Newline {
                    self.trivia.push(Trivia {
                        kind: trivia_kind,
                        span,
                        trailing,
                    });
                    trailing = false;
                    self.preceding_line_break = true;
                    continue;
                }
                self.trivia.push(Trivia {
                    kind: trivia_kind,
                    span,
                    trailing,
                });
                continue;
            }

            self.current_kind = kind;
            self.current_span = span;
            self.preceding_trivia = saw_trivia;
            if self
                .lexer
                .current_flags()
                .contains(TokenFlags::PRECEDING_LINE_BREAK)
            {
                self.preceding_line_break = true;
            }
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::lexer::Lexer;
    use super::*;

    fn source(text: &str) -> TokenSource<'_> {
        TokenSource::new(BufferedLexer::new(Lexer::new(text)))
    }

    #[test]
    fn hides_trivia_from_the_grammar() {
        let mut ts = source("a = b # note\nc");
        let mut kinds = Vec::new();
        while ts.current() != TokenKind::Eof {
            kinds.push(ts.current());
            ts.bump();
        }
        assert_eq!(
            kinds,
            vec![
                TokenKind::ScalarUnquoted,
                TokenKind::Equal,
                TokenKind::ScalarUnquoted,
                TokenKind::ScalarUnquoted,
            ]
        );
    }

    #[test]
    fn trailing_policy_includes_first_newline() {
        // "a # note\n  b": comment and newline trail `a`; the indent leads `b`.
        let mut ts = source("a # note\n  b");
        ts.bump(); // past `a`
        assert_eq!(ts.current(), TokenKind::ScalarUnquoted);

        let trivia = ts.trivia();
        assert_eq!(
            trivia
                .iter()
                .map(|t| (t.kind, t.trailing))
                .collect::<Vec<_>>(),
            vec![
                (TriviaKind::Whitespace, true),
                (TriviaKind::Comment, true),
                (TriviaKind::Newline, true),
                (TriviaKind::Whitespace, false),
            ]
        );
    }

    #[test]
    fn file_leading_trivia_belongs_to_first_token() {
        let ts = source("  # header\n a");
        assert!(ts.trivia().iter().all(|t| !t.trailing));
        assert!(ts.has_preceding_line_break());
        assert!(ts.has_preceding_trivia());
    }

    #[test]
    fn nth_lookahead_and_line_breaks() {
        let mut ts = source("a = b\nc");
        assert_eq!(ts.nth(0), TokenKind::ScalarUnquoted);
        assert_eq!(ts.nth(1), TokenKind::Equal);
        assert_eq!(ts.nth(2), TokenKind::ScalarUnquoted);
        assert!(!ts.has_nth_preceding_line_break(2));
        assert!(ts.has_nth_preceding_line_break(3));
    }

    #[test]
    fn nth_preceding_trivia_detects_gaps() {
        let mut ts = source("rgb{ x }");
        // `rgb` then `{` with no gap.
        assert!(!ts.has_nth_preceding_trivia(1));
        let mut spaced = source("rgb { x }");
        assert!(spaced.has_nth_preceding_trivia(1));
    }

    #[test]
    fn skip_as_trivia_preserves_bytes() {
        let mut ts = source("a = b");
        ts.skip_as_trivia();
        let skipped: Vec<_> = ts
            .trivia()
            .iter()
            .filter(|t| t.kind == TriviaKind::Skipped)
            .collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].span, Span::new(0, 1));
        assert_eq!(ts.current(), TokenKind::Equal);
    }

    #[test]
    fn checkpoint_rewind_restores_stream_and_trivia() {
        let mut ts = source("a = b\nc = d");
        ts.bump();
        let checkpoint = ts.checkpoint();
        let trivia_len = ts.trivia().len();

        ts.bump();
        ts.bump();
        assert!(ts.trivia().len() > trivia_len);

        ts.rewind(checkpoint);
        assert_eq!(ts.current(), TokenKind::Equal);
        assert_eq!(ts.trivia().len(), trivia_len);
    }
}
