// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Token types for PDXScript lexical analysis.
//!
//! The lexer works with a deliberately small vocabulary: braces, the eight
//! comparison/assignment operators, two scalar kinds, and trivia. All
//! semantic classification (dates, numbers, booleans) is deferred to
//! [`crate::ast::scalar`] — a date and a dotted identifier are both just
//! `ScalarUnquoted` here.
//!
//! Trivia has two representations:
//! - Stream-side [`Trivia`] — span-addressed, with the leading/trailing
//!   ownership decision already made by the token source.
//! - Tree-side [`TriviaPiece`] — kind + length only; the text is recovered
//!   by slicing the original source at the token's known offset.

use super::Span;

/// The kind of token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// End of input sentinel.
    Eof,

    // === Trivia ===
    /// Spaces and tabs.
    Whitespace,
    /// One line terminator (`\n`, `\r`, or `\r\n`).
    Newline,
    /// A `#` comment, up to but not including the line terminator.
    Comment,
    /// A byte the grammar can never use, preserved for losslessness.
    Skipped,

    // === Scalars ===
    /// An unquoted scalar: `infantry`, `1444.11.11`, `-0.5`, `@var`.
    ScalarUnquoted,
    /// A quoted scalar: `"Army of the North"`.
    ScalarQuoted,

    // === Operators ===
    /// `=`
    Equal,
    /// `==`
    EqualEqual,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `?=`
    QuestionEqual,

    // === Structure ===
    /// `{`
    LBrace,
    /// `}`
    RBrace,
}

impl TokenKind {
    /// Returns true for trivia token kinds.
    #[must_use]
    pub const fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::Newline | TokenKind::Comment | TokenKind::Skipped
        )
    }

    /// Returns true for the two scalar token kinds.
    #[must_use]
    pub const fn is_scalar(self) -> bool {
        matches!(self, TokenKind::ScalarUnquoted | TokenKind::ScalarQuoted)
    }

    /// Returns true for assignment/comparison operator kinds.
    #[must_use]
    pub const fn is_operator(self) -> bool {
        matches!(
            self,
            TokenKind::Equal
                | TokenKind::EqualEqual
                | TokenKind::NotEqual
                | TokenKind::LessThan
                | TokenKind::LessThanOrEqual
                | TokenKind::GreaterThan
                | TokenKind::GreaterThanOrEqual
                | TokenKind::QuestionEqual
        )
    }

    /// The operator's source text, for diagnostics and AST lowering.
    #[must_use]
    pub const fn operator_text(self) -> Option<&'static str> {
        match self {
            TokenKind::Equal => Some("="),
            TokenKind::EqualEqual => Some("=="),
            TokenKind::NotEqual => Some("!="),
            TokenKind::LessThan => Some("<"),
            TokenKind::LessThanOrEqual => Some("<="),
            TokenKind::GreaterThan => Some(">"),
            TokenKind::GreaterThanOrEqual => Some(">="),
            TokenKind::QuestionEqual => Some("?="),
            _ => None,
        }
    }
}

/// Packed lexical facts about a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TokenFlags(u8);

impl TokenFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// A `Newline` trivia token precedes this token.
    pub const PRECEDING_LINE_BREAK: Self = Self(1 << 0);
    /// The token was a quoted scalar.
    pub const WAS_QUOTED: Self = Self(1 << 1);
    /// The quoted scalar contained `\\` or `\"` escapes.
    pub const HAS_ESCAPE: Self = Self(1 << 2);

    /// Returns the union of `self` and `other`.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns true if every flag in `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for TokenFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for TokenFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// A single lexed token (trivia or non-trivia).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// The token kind.
    pub kind: TokenKind,
    /// Source location.
    pub span: Span,
    /// Lexical fact flags.
    pub flags: TokenFlags,
}

impl Token {
    /// Returns true if a newline immediately preceded this token.
    #[must_use]
    pub fn has_preceding_line_break(&self) -> bool {
        self.flags.contains(TokenFlags::PRECEDING_LINE_BREAK)
    }
}

/// The trivia vocabulary, separate from [`TokenKind`] for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriviaKind {
    Whitespace,
    Newline,
    Comment,
    /// Bytes preserved by lexer fallback or parser recovery.
    Skipped,
}

impl TriviaKind {
    /// Maps a trivia [`TokenKind`] to its [`TriviaKind`].
    ///
    /// Returns `None` for non-trivia kinds.
    #[must_use]
    pub const fn from_token_kind(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Whitespace => Some(TriviaKind::Whitespace),
            TokenKind::Newline => Some(TriviaKind::Newline),
            TokenKind::Comment => Some(TriviaKind::Comment),
            TokenKind::Skipped => Some(TriviaKind::Skipped),
            _ => None,
        }
    }
}

/// Span-addressed trivia recorded by the token source.
///
/// The `trailing` flag is the ownership decision: trailing trivia belongs
/// to the previous non-trivia token, leading trivia to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trivia {
    pub kind: TriviaKind,
    pub span: Span,
    pub trailing: bool,
}

/// Compact trivia unit stored in the green tree: kind + byte length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriviaPiece {
    pub kind: TriviaKind,
    pub len: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trivia_kinds_are_trivia() {
        assert!(TokenKind::Whitespace.is_trivia());
        assert!(TokenKind::Newline.is_trivia());
        assert!(TokenKind::Comment.is_trivia());
        assert!(TokenKind::Skipped.is_trivia());
        assert!(!TokenKind::ScalarUnquoted.is_trivia());
        assert!(!TokenKind::Eof.is_trivia());
    }

    #[test]
    fn operator_text_round_trip() {
        assert_eq!(TokenKind::Equal.operator_text(), Some("="));
        assert_eq!(TokenKind::QuestionEqual.operator_text(), Some("?="));
        assert_eq!(TokenKind::LBrace.operator_text(), None);
    }

    #[test]
    fn token_flags_compose() {
        let mut flags = TokenFlags::WAS_QUOTED;
        flags |= TokenFlags::HAS_ESCAPE;
        assert!(flags.contains(TokenFlags::WAS_QUOTED));
        assert!(flags.contains(TokenFlags::HAS_ESCAPE));
        assert!(!flags.contains(TokenFlags::PRECEDING_LINE_BREAK));
    }
}
