// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Token-set recovery.
//!
//! On a grammar violation the caller opens an `ERROR` node via
//! [`ParseRecoveryTokenSet::recover`]: the offending token — plus anything
//! else the grammar cannot place — is consumed into the node until a
//! synchronizing token or a line break is reached. At least one token is
//! always consumed, which is what guarantees list-loop progress.

use crate::syntax::SyntaxKind;

use super::{CompletedMarker, Parser, TokenKind};

/// Why recovery declined to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryError {
    /// The stream is at EOF; nothing to consume.
    Eof,
    /// Speculative parsing is active; the caller will rewind instead.
    RecoveryDisabled,
}

/// Recovery into an error node, synchronized on a closed token set.
#[derive(Debug, Clone)]
pub struct ParseRecoveryTokenSet {
    node_kind: SyntaxKind,
    recovery_set: Vec<TokenKind>,
    line_break: bool,
}

impl ParseRecoveryTokenSet {
    /// Creates a recovery that synchronizes on `recovery_set`.
    #[must_use]
    pub fn new(node_kind: SyntaxKind, recovery_set: &[TokenKind]) -> Self {
        Self {
            node_kind,
            recovery_set: recovery_set.to_vec(),
            line_break: false,
        }
    }

    /// Additionally synchronize on the next line break.
    #[must_use]
    pub fn enable_recovery_on_line_break(mut self) -> Self {
        self.line_break = true;
        self
    }

    /// Consumes tokens into an error node until a synchronizing point.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::Eof`] at end of input and
    /// [`RecoveryError::RecoveryDisabled`] during speculative parsing.
    pub fn recover(&self, parser: &mut Parser<'_>) -> Result<CompletedMarker, RecoveryError> {
        if parser.at(TokenKind::Eof) {
            return Err(RecoveryError::Eof);
        }
        if parser.is_speculative() {
            return Err(RecoveryError::RecoveryDisabled);
        }

        let marker = parser.start();
        // Always consume the offending token; the caller only recovers when
        // the current token cannot start anything.
        parser.bump();
        while !parser.at(TokenKind::Eof) && !self.is_at_recovered(parser) {
            parser.bump();
        }
        Ok(marker.complete(parser, self.node_kind))
    }

    fn is_at_recovered(&self, parser: &Parser<'_>) -> bool {
        parser.at_set(&self.recovery_set) || (self.line_break && parser.has_preceding_line_break())
    }
}
