// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Buffered lookahead over the raw lexer.
//!
//! The parser needs `nth_non_trivia(n)` lookahead without paying for
//! re-lexing. The buffer stores [`LexerCheckpoint`]s rather than tokens:
//! a checkpoint is both the token (kind/span/flags) and the resume point,
//! so rewinding is a pointer reset.
//!
//! A non-regular [`LexContext`] signals that tokenisation rules changed at
//! the current position; the buffer must then drop its queued lookahead and
//! re-lex, since the cached checkpoints were produced under the old rules.

use std::collections::VecDeque;

use crate::diagnostics::Diagnostic;

use super::lexer::{Lexer, LexerCheckpoint};
use super::{Span, TokenFlags, TokenKind};

/// Lexing context for the next token.
///
/// The core grammar only uses the regular context; DSL grammar profiles can
/// request a cache flush when switching token interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexContext {
    regular: bool,
}

impl LexContext {
    /// The default context.
    pub const REGULAR: Self = Self { regular: true };

    /// A context-kind change: invalidates buffered lookahead.
    pub const RESTART: Self = Self { regular: false };

    /// Returns true if cached lookahead remains valid.
    #[must_use]
    pub const fn is_regular(self) -> bool {
        self.regular
    }
}

impl Default for LexContext {
    fn default() -> Self {
        Self::REGULAR
    }
}

/// A lookahead view of a token: kind and flags only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookaheadToken {
    pub kind: TokenKind,
    pub flags: TokenFlags,
    pub span: Span,
}

impl LookaheadToken {
    /// Returns true if a newline preceded this token.
    #[must_use]
    pub fn has_preceding_line_break(&self) -> bool {
        self.flags.contains(TokenFlags::PRECEDING_LINE_BREAK)
    }

    fn from_checkpoint(checkpoint: &LexerCheckpoint) -> Self {
        Self {
            kind: checkpoint.current_kind,
            flags: checkpoint.current_flags,
            span: checkpoint.current_span(),
        }
    }
}

/// Lexer wrapper with cached lookahead and checkpoint/rewind.
pub struct BufferedLexer<'src> {
    inner: Lexer<'src>,
    /// When lookahead is buffered, the checkpoint describing the logical
    /// current token (the inner lexer has physically scanned past it).
    current: Option<LexerCheckpoint>,
    lookahead: VecDeque<LexerCheckpoint>,
}

impl<'src> BufferedLexer<'src> {
    /// Wraps a raw lexer.
    #[must_use]
    pub fn new(lexer: Lexer<'src>) -> Self {
        Self {
            inner: lexer,
            current: None,
            lookahead: VecDeque::new(),
        }
    }

    /// The original source text.
    #[must_use]
    pub fn source(&self) -> &'src str {
        self.inner.source()
    }

    /// Advances to the next token and returns its kind.
    pub fn next_token(&mut self, context: LexContext) -> TokenKind {
        if !context.is_regular() {
            self.reset_lookahead();
        } else if let Some(next) = self.lookahead.pop_front() {
            let kind = next.current_kind;
            if self.lookahead.is_empty() {
                // The inner lexer's own state now equals the popped entry.
                self.current = None;
            } else {
                self.current = Some(next);
            }
            return kind;
        }

        self.current = None;
        self.inner.next_token().kind
    }

    /// The kind of the current token.
    #[must_use]
    pub fn current(&self) -> TokenKind {
        match &self.current {
            Some(checkpoint) => checkpoint.current_kind,
            None => self.inner.current(),
        }
    }

    /// The span of the current token.
    #[must_use]
    pub fn current_span(&self) -> Span {
        match &self.current {
            Some(checkpoint) => checkpoint.current_span(),
            None => self.inner.current_span(),
        }
    }

    /// The flags of the current token.
    #[must_use]
    pub fn current_flags(&self) -> TokenFlags {
        match &self.current {
            Some(checkpoint) => checkpoint.current_flags,
            None => self.inner.current_flags(),
        }
    }

    /// Returns true if the current token followed a line break.
    #[must_use]
    pub fn has_preceding_line_break(&self) -> bool {
        self.current_flags()
            .contains(TokenFlags::PRECEDING_LINE_BREAK)
    }

    /// Returns the `n`th non-trivia token after the current one (`n >= 1`),
    /// lexing ahead into the buffer as needed.
    pub fn nth_non_trivia(&mut self, n: usize) -> Option<LookaheadToken> {
        assert!(n >= 1, "nth_non_trivia requires n >= 1");

        let mut remaining = n;
        for checkpoint in &self.lookahead {
            if !checkpoint.current_kind.is_trivia() {
                remaining -= 1;
                if remaining == 0 {
                    return Some(LookaheadToken::from_checkpoint(checkpoint));
                }
            }
        }

        // Lex further ahead, preserving the logical current token.
        while remaining > 0 {
            if self.inner.is_eof() && self.inner.current() == TokenKind::Eof {
                return None;
            }
            if self.current.is_none() {
                self.current = Some(self.inner.checkpoint());
            }
            let token = self.inner.next_token();
            self.lookahead.push_back(self.inner.checkpoint());
            if token.kind == TokenKind::Eof {
                if !token.kind.is_trivia() {
                    remaining -= 1;
                }
                if remaining == 0 {
                    return Some(LookaheadToken {
                        kind: token.kind,
                        flags: token.flags,
                        span: token.span,
                    });
                }
                return None;
            }
            if !token.kind.is_trivia() {
                remaining -= 1;
                if remaining == 0 {
                    return Some(LookaheadToken {
                        kind: token.kind,
                        flags: token.flags,
                        span: token.span,
                    });
                }
            }
        }
        None
    }

    /// Snapshots the logical current position.
    #[must_use]
    pub fn checkpoint(&self) -> LexerCheckpoint {
        match &self.current {
            Some(checkpoint) => *checkpoint,
            None => self.inner.checkpoint(),
        }
    }

    /// Restores a snapshot, dropping buffered lookahead.
    pub fn rewind(&mut self, checkpoint: LexerCheckpoint) {
        self.inner.rewind(checkpoint);
        self.lookahead.clear();
        self.current = None;
    }

    /// Takes the diagnostics accumulated by the inner lexer.
    #[must_use]
    pub fn finish(self) -> Vec<Diagnostic> {
        self.inner.finish()
    }

    fn reset_lookahead(&mut self) {
        if let Some(checkpoint) = self.current.take() {
            self.inner.rewind(checkpoint);
            self.lookahead.clear();
        }
    }
}
