// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Event-based parser core.
//!
//! The parser does not build trees. It records a flat stream of
//! [`Event`]s — `Start`, `Token`, `Finish` — that the tree sink later
//! replays into the green tree. This indirection buys three things:
//!
//! - **Markers**: a grammar routine opens a provisional `Start`, decides
//!   the node kind when it completes, or tombstones it when it abandons.
//! - **Forward parents**: a completed node can be re-parented under a node
//!   opened *later* (`CompletedMarker::precede`), without moving events.
//!   This is how `color = rgb { ... }` promotes the scalar into a tagged
//!   block head after the fact.
//! - **Checkpoints**: speculative parsing snapshots the cursor plus the
//!   event and diagnostic vector lengths; rewinding truncates both.
//!
//! Diagnostic emission deduplicates at the previous diagnostic's start
//! offset — one diagnostic per position.

mod grammar;
mod options;
mod recovery;

#[cfg(test)]
mod parser_tests;

pub use grammar::parse_source_file;
pub use options::{ParseMode, ParseOptions};
pub use recovery::{ParseRecoveryTokenSet, RecoveryError};

use tracing::error;

use crate::diagnostics::Diagnostic;
use crate::syntax::SyntaxKind;

use super::token_source::{TokenSource, TokenSourceCheckpoint};
use super::{Span, TokenKind};

/// One parser event, replayed by the tree sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Opens a node. `kind == Tombstone` marks an abandoned start.
    Start {
        kind: SyntaxKind,
        /// Relative offset to a later `Start` this node re-parents under.
        forward_parent: Option<usize>,
    },
    /// A consumed token ending at `end`.
    Token { kind: SyntaxKind, end: u32 },
    /// Closes the most recently opened node.
    Finish,
}

impl Event {
    const fn tombstone() -> Self {
        Event::Start {
            kind: SyntaxKind::Tombstone,
            forward_parent: None,
        }
    }
}

/// A handle to a provisional `Start` event.
#[derive(Debug)]
pub struct Marker {
    pos: usize,
    start: u32,
    old_start: usize,
    child_idx: Option<usize>,
}

impl Marker {
    /// Completes the node with its final kind.
    pub fn complete(self, parser: &mut Parser<'_>, kind: SyntaxKind) -> CompletedMarker {
        match &mut parser.events[self.pos] {
            Event::Start { kind: slot, .. } => *slot = kind,
            _ => unreachable!("marker must point at a Start event"),
        }
        let finish_pos = parser.events.len();
        parser.events.push(Event::Finish);
        CompletedMarker {
            start_pos: self.pos,
            finish_pos,
            offset: self.start,
            old_start: self.old_start,
        }
    }

    /// Abandons the node, tombstoning its `Start`.
    pub fn abandon(self, parser: &mut Parser<'_>) {
        if self.pos == parser.events.len() - 1 {
            if let Event::Start {
                kind: SyntaxKind::Tombstone,
                forward_parent: None,
            } = parser.events[self.pos]
            {
                parser.events.pop();
            }
        }
        if let Some(idx) = self.child_idx {
            if let Event::Start { forward_parent, .. } = &mut parser.events[idx] {
                *forward_parent = None;
            }
        }
    }
}

/// A completed node that can still be re-parented or re-kinded.
#[derive(Debug, Clone, Copy)]
pub struct CompletedMarker {
    start_pos: usize,
    finish_pos: usize,
    offset: u32,
    old_start: usize,
}

impl CompletedMarker {
    /// Opens a new node that will become this node's parent.
    pub fn precede(self, parser: &mut Parser<'_>) -> Marker {
        let mut new_marker = parser.start();
        let distance = new_marker.pos - self.start_pos;
        debug_assert!(distance > 0);
        match &mut parser.events[self.start_pos] {
            Event::Start { forward_parent, .. } => *forward_parent = Some(distance),
            _ => unreachable!("completed marker must point at a Start event"),
        }
        new_marker.child_idx = Some(self.start_pos);
        new_marker.start = self.offset;
        new_marker.old_start = new_marker.old_start.min(self.old_start);
        new_marker
    }

    /// Reverts the completion, restoring the original [`Marker`].
    ///
    /// Only the most recent completion can be undone.
    pub fn undo_completion(self, parser: &mut Parser<'_>) -> Marker {
        assert_eq!(
            self.finish_pos,
            parser.events.len() - 1,
            "only the most recent completion can be undone"
        );
        parser.events.pop();
        Marker {
            pos: self.start_pos,
            start: self.offset,
            old_start: self.old_start,
            child_idx: None,
        }
    }

    /// Rewrites the completed node's kind.
    pub fn change_kind(&self, parser: &mut Parser<'_>, new_kind: SyntaxKind) {
        match &mut parser.events[self.start_pos] {
            Event::Start { kind, .. } => *kind = new_kind,
            _ => unreachable!("completed marker must point at a Start event"),
        }
    }

    /// The source span covered by the completed node.
    #[must_use]
    pub fn span(&self, parser: &Parser<'_>) -> Span {
        let mut end = self.offset;
        for event in parser.events[self.old_start..self.finish_pos].iter().rev() {
            if let Event::Token { end: token_end, .. } = event {
                end = *token_end;
                break;
            }
        }
        Span::new(self.offset, end)
    }

    /// The source text covered by the completed node.
    #[must_use]
    pub fn text<'a>(&self, parser: &'a Parser<'_>) -> &'a str {
        &parser.source.text()[self.span(parser).as_range()]
    }
}

/// A resumable snapshot of the full parser state.
#[derive(Debug, Clone, Copy)]
pub struct ParserCheckpoint {
    source_checkpoint: TokenSourceCheckpoint,
    events_len: usize,
    diagnostics_len: usize,
    speculative_depth: u32,
}

/// Stall guard for list-style parse loops.
///
/// A loop iteration that consumes nothing is an internal parser bug; the
/// guard detects it so the loop can report and stop instead of spinning.
#[derive(Debug, Default)]
pub struct ParserProgress {
    position: Option<u32>,
}

impl ParserProgress {
    /// Returns true if the cursor advanced since the last call.
    pub fn has_progressed(&mut self, parser: &Parser<'_>) -> bool {
        let progressed = self.position.is_none_or(|prev| prev < parser.position());
        self.position = Some(parser.position());
        progressed
    }
}

/// Simple present/absent result for grammar routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedSyntax {
    Present,
    Absent,
}

impl ParsedSyntax {
    /// Returns true for `Present`.
    #[must_use]
    pub fn is_present(self) -> bool {
        matches!(self, ParsedSyntax::Present)
    }
}

/// The event-recording parser.
pub struct Parser<'src> {
    source: TokenSource<'src>,
    options: ParseOptions,
    events: Vec<Event>,
    diagnostics: Vec<Diagnostic>,
    speculative_depth: u32,
}

impl<'src> Parser<'src> {
    /// Creates a parser over a token source.
    #[must_use]
    pub fn new(source: TokenSource<'src>, options: ParseOptions) -> Self {
        Self {
            source,
            options,
            events: Vec::new(),
            diagnostics: Vec::new(),
            speculative_depth: 0,
        }
    }

    /// The parse options in effect.
    #[must_use]
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// The recorded events so far.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// The diagnostics recorded so far.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The current token kind.
    #[must_use]
    pub fn current(&self) -> TokenKind {
        self.source.current()
    }

    /// The current token's span.
    #[must_use]
    pub fn current_span(&self) -> Span {
        self.source.current_span()
    }

    /// The current token's start offset.
    #[must_use]
    pub fn position(&self) -> u32 {
        self.source.position()
    }

    /// True if a line break precedes the current token.
    #[must_use]
    pub fn has_preceding_line_break(&self) -> bool {
        self.source.has_preceding_line_break()
    }

    /// True if any trivia precedes the current token.
    #[must_use]
    pub fn has_preceding_trivia(&self) -> bool {
        self.source.has_preceding_trivia()
    }

    /// True if the current token is `kind`.
    #[must_use]
    pub fn at(&self, kind: TokenKind) -> bool {
        self.current() == kind
    }

    /// True if the current token is any of `kinds`.
    #[must_use]
    pub fn at_set(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.current())
    }

    /// The `n`th lookahead token kind (`n == 0` is current).
    pub fn nth(&mut self, n: usize) -> TokenKind {
        self.source.nth(n)
    }

    /// True if the `n`th lookahead token follows a line break.
    pub fn has_nth_preceding_line_break(&mut self, n: usize) -> bool {
        self.source.has_nth_preceding_line_break(n)
    }

    /// True if trivia separates the `n-1`th and `n`th lookahead tokens.
    pub fn has_nth_preceding_trivia(&mut self, n: usize) -> bool {
        self.source.has_nth_preceding_trivia(n)
    }

    /// Opens a provisional node.
    pub fn start(&mut self) -> Marker {
        let pos = self.events.len();
        self.events.push(Event::tombstone());
        Marker {
            pos,
            start: self.position(),
            old_start: pos,
            child_idx: None,
        }
    }

    /// Consumes the current token into the event stream.
    pub fn bump(&mut self) {
        if self.at(TokenKind::Eof) {
            return;
        }
        self.events.push(Event::Token {
            kind: SyntaxKind::from_token_kind(self.current()),
            end: self.current_span().end(),
        });
        self.source.bump();
    }

    /// Consumes the current token if it is `kind`.
    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            return true;
        }
        false
    }

    /// Consumes `kind` or records `diagnostic`.
    pub fn expect(&mut self, kind: TokenKind, diagnostic: Diagnostic) -> ParsedSyntax {
        if self.eat(kind) {
            ParsedSyntax::Present
        } else {
            self.error(diagnostic);
            ParsedSyntax::Absent
        }
    }

    /// Records a diagnostic, suppressing a second one at the same start
    /// offset as the previous emission.
    pub fn error(&mut self, diagnostic: Diagnostic) {
        if let Some(previous) = self.diagnostics.last() {
            if previous.span.start() == diagnostic.span.start() {
                return;
            }
        }
        self.diagnostics.push(diagnostic);
    }

    /// Converts the current token into skipped trivia.
    pub fn skip_as_trivia(&mut self) {
        self.source.skip_as_trivia();
    }

    /// Snapshots the full parser state.
    #[must_use]
    pub fn checkpoint(&self) -> ParserCheckpoint {
        ParserCheckpoint {
            source_checkpoint: self.source.checkpoint(),
            events_len: self.events.len(),
            diagnostics_len: self.diagnostics.len(),
            speculative_depth: self.speculative_depth,
        }
    }

    /// Restores a snapshot, truncating events and diagnostics recorded
    /// after it.
    pub fn rewind(&mut self, checkpoint: ParserCheckpoint) {
        self.source.rewind(checkpoint.source_checkpoint);
        self.events.truncate(checkpoint.events_len);
        self.diagnostics.truncate(checkpoint.diagnostics_len);
        self.speculative_depth = checkpoint.speculative_depth;
    }

    /// Runs `f` in speculative mode: recovery is disabled and the caller
    /// is expected to rewind on failure.
    pub fn speculative<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.speculative_depth += 1;
        let result = f(self);
        self.speculative_depth -= 1;
        result
    }

    /// True while inside [`Parser::speculative`].
    #[must_use]
    pub fn is_speculative(&self) -> bool {
        self.speculative_depth > 0
    }

    /// Records an internal stall and logs it; the caller must stop its loop.
    pub(crate) fn report_stall(&mut self) {
        error!(
            position = self.position(),
            kind = ?self.current(),
            "parser stopped making progress; aborting list loop"
        );
        let diagnostic = Diagnostic::error(
            crate::diagnostics::INTERNAL_PARSER_STALL,
            "internal error: parser stopped making progress",
            self.current_span(),
            crate::diagnostics::DiagnosticCategory::Internal,
        );
        self.diagnostics.push(diagnostic);
    }

    /// Finishes parsing, yielding events, diagnostics, and the stream.
    #[must_use]
    pub fn finish(self) -> (Vec<Event>, Vec<Diagnostic>, TokenSource<'src>) {
        (self.events, self.diagnostics, self.source)
    }
}
