// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Unified syntax vocabulary for tokens and CST nodes.

use crate::source_analysis::TokenKind;

/// The kind of a green tree element: token kinds plus node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    /// Abandoned marker placeholder; never appears in a finished tree.
    Tombstone,
    /// End-of-file sentinel token, synthesised by the tree sink.
    Eof,

    // === Token kinds ===
    Whitespace,
    Newline,
    Comment,
    Skipped,
    ScalarUnquoted,
    ScalarQuoted,
    Equal,
    EqualEqual,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    QuestionEqual,
    LBrace,
    RBrace,

    // === Node kinds ===
    Root,
    Error,
    SourceFile,
    StatementList,
    KeyValue,
    Block,
    Scalar,
    TaggedBlockValue,
}

impl SyntaxKind {
    /// Returns true for trivia token kinds.
    #[must_use]
    pub const fn is_trivia(self) -> bool {
        matches!(
            self,
            SyntaxKind::Whitespace
                | SyntaxKind::Newline
                | SyntaxKind::Comment
                | SyntaxKind::Skipped
        )
    }

    /// Returns true for token kinds (including `Eof`, excluding `Tombstone`).
    #[must_use]
    pub const fn is_token(self) -> bool {
        !matches!(self, SyntaxKind::Tombstone) && !self.is_node()
    }

    /// Returns true for node kinds.
    #[must_use]
    pub const fn is_node(self) -> bool {
        matches!(
            self,
            SyntaxKind::Root
                | SyntaxKind::Error
                | SyntaxKind::SourceFile
                | SyntaxKind::StatementList
                | SyntaxKind::KeyValue
                | SyntaxKind::Block
                | SyntaxKind::Scalar
                | SyntaxKind::TaggedBlockValue
        )
    }

    /// Returns true for assignment/comparison operator token kinds.
    #[must_use]
    pub const fn is_operator(self) -> bool {
        matches!(
            self,
            SyntaxKind::Equal
                | SyntaxKind::EqualEqual
                | SyntaxKind::NotEqual
                | SyntaxKind::LessThan
                | SyntaxKind::LessThanOrEqual
                | SyntaxKind::GreaterThan
                | SyntaxKind::GreaterThanOrEqual
                | SyntaxKind::QuestionEqual
        )
    }

    /// Maps a lexer token kind into the unified vocabulary.
    #[must_use]
    pub const fn from_token_kind(kind: TokenKind) -> Self {
        match kind {
            TokenKind::Eof => SyntaxKind::Eof,
            TokenKind::Whitespace => SyntaxKind::Whitespace,
            TokenKind::Newline => SyntaxKind::Newline,
            TokenKind::Comment => SyntaxKind::Comment,
            TokenKind::Skipped => SyntaxKind::Skipped,
            TokenKind::ScalarUnquoted => SyntaxKind::ScalarUnquoted,
            TokenKind::ScalarQuoted => SyntaxKind::ScalarQuoted,
            TokenKind::Equal => SyntaxKind::Equal,
            TokenKind::EqualEqual => SyntaxKind::EqualEqual,
            TokenKind::NotEqual => SyntaxKind::NotEqual,
            TokenKind::LessThan => SyntaxKind::LessThan,
            TokenKind::LessThanOrEqual => SyntaxKind::LessThanOrEqual,
            TokenKind::GreaterThan => SyntaxKind::GreaterThan,
            TokenKind::GreaterThanOrEqual => SyntaxKind::GreaterThanOrEqual,
            TokenKind::QuestionEqual => SyntaxKind::QuestionEqual,
            TokenKind::LBrace => SyntaxKind::LBrace,
            TokenKind::RBrace => SyntaxKind::RBrace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_and_token_partition() {
        assert!(SyntaxKind::KeyValue.is_node());
        assert!(!SyntaxKind::KeyValue.is_token());
        assert!(SyntaxKind::Equal.is_token());
        assert!(SyntaxKind::Eof.is_token());
        assert!(!SyntaxKind::Tombstone.is_token());
        assert!(!SyntaxKind::Tombstone.is_node());
    }

    #[test]
    fn token_kind_mapping_is_total() {
        assert_eq!(
            SyntaxKind::from_token_kind(TokenKind::ScalarQuoted),
            SyntaxKind::ScalarQuoted
        );
        assert_eq!(
            SyntaxKind::from_token_kind(TokenKind::QuestionEqual),
            SyntaxKind::QuestionEqual
        );
    }
}
