// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lexical analysis for PDXScript source.
//!
//! The lexer is hand-written for full control over error recovery and
//! trivia. It is strictly lexical: it never decides whether a scalar is a
//! date, a number, or an identifier — that is the AST layer's job.
//!
//! # Design
//!
//! - **Error recovery**: never fails; an unclosed string closes at the
//!   newline/EOF boundary and queues a diagnostic, unknown bytes become
//!   [`TokenKind::Skipped`] trivia.
//! - **Losslessness**: every byte of input is covered by exactly one token,
//!   trivia included.
//! - **Checkpoints**: the buffered lexer and the parser's speculative mode
//!   rely on cheap [`LexerCheckpoint`] snapshots; rewinding also truncates
//!   diagnostics queued after the snapshot.
//!
//! # Scalar boundaries
//!
//! An unquoted scalar starts at any byte that is not a boundary byte and
//! runs until the next one. Boundary bytes are whitespace, `{`, `}`, `"`,
//! `#`, the operator leaders `=`, `<`, `>`, `!`, and `?` only when the next
//! byte is `=`. That single rule admits dotted dates (`1444.11.11`), signed
//! numbers (`-0.5`), variable references (`@var`), parameter text
//! (`$PARAM$`), and locale-specific bytes as one token each.

use crate::diagnostics::{Diagnostic, DiagnosticCategory, LEXER_UNTERMINATED_STRING};

use super::{Span, Token, TokenFlags, TokenKind};

/// Options controlling string-literal edge cases.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexerOptions {
    /// Allow quoted scalars to span line breaks.
    pub allow_multiline_strings: bool,
    /// Silently close an unterminated quote at EOF/newline instead of
    /// emitting `LEXER_UNTERMINATED_STRING`.
    pub allow_unterminated_strings: bool,
}

/// A resumable snapshot of the lexer state.
#[derive(Debug, Clone, Copy)]
pub struct LexerCheckpoint {
    pub(crate) position: usize,
    pub(crate) current_start: u32,
    pub(crate) current_kind: TokenKind,
    pub(crate) current_flags: TokenFlags,
    after_newline: bool,
    eof_emitted: bool,
    diagnostics_len: usize,
}

impl LexerCheckpoint {
    /// The span of the token current at snapshot time.
    #[must_use]
    pub fn current_span(&self) -> Span {
        Span::new(self.current_start, self.position as u32)
    }

    /// Returns true if the snapshot token had a preceding line break.
    #[must_use]
    pub fn has_preceding_line_break(&self) -> bool {
        self.current_flags.contains(TokenFlags::PRECEDING_LINE_BREAK)
    }
}

/// A lossless lexer that emits trivia and non-trivia tokens.
pub struct Lexer<'src> {
    source: &'src str,
    bytes: &'src [u8],
    position: usize,
    current_start: u32,
    current_kind: TokenKind,
    current_flags: TokenFlags,
    after_newline: bool,
    eof_emitted: bool,
    options: LexerOptions,
    diagnostics: Vec<Diagnostic>,
}

impl std::fmt::Debug for Lexer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lexer")
            .field("position", &self.position)
            .field("current_kind", &self.current_kind)
            .finish()
    }
}

impl<'src> Lexer<'src> {
    /// Creates a new lexer for the given source text.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self::with_options(source, LexerOptions::default())
    }

    /// Creates a new lexer with explicit string-handling options.
    #[must_use]
    pub fn with_options(source: &'src str, options: LexerOptions) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            position: 0,
            current_start: 0,
            current_kind: TokenKind::Eof,
            current_flags: TokenFlags::NONE,
            after_newline: false,
            eof_emitted: false,
            options,
            diagnostics: Vec::new(),
        }
    }

    /// The original source text.
    #[must_use]
    pub fn source(&self) -> &'src str {
        self.source
    }

    /// The kind of the most recently lexed token.
    #[must_use]
    pub fn current(&self) -> TokenKind {
        self.current_kind
    }

    /// The span of the most recently lexed token.
    #[must_use]
    pub fn current_span(&self) -> Span {
        Span::new(self.current_start, self.position as u32)
    }

    /// The flags of the most recently lexed token.
    #[must_use]
    pub fn current_flags(&self) -> TokenFlags {
        self.current_flags
    }

    /// Returns true if the current token followed a line break.
    #[must_use]
    pub fn has_preceding_line_break(&self) -> bool {
        self.current_flags.contains(TokenFlags::PRECEDING_LINE_BREAK)
    }

    /// Returns true once the scan position has reached the end of input.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.position >= self.bytes.len()
    }

    /// Lexes and returns the next token (trivia included).
    ///
    /// At end of input this keeps returning zero-length `Eof` tokens.
    pub fn next_token(&mut self) -> Token {
        self.current_start = self.position as u32;
        self.current_flags = TokenFlags::NONE;

        if self.is_eof() {
            self.eof_emitted = true;
            self.current_kind = TokenKind::Eof;
            if self.after_newline {
                self.current_flags |= TokenFlags::PRECEDING_LINE_BREAK;
            }
            return Token {
                kind: TokenKind::Eof,
                span: Span::empty(self.current_start),
                flags: self.current_flags,
            };
        }

        let kind = self.lex_token();
        if self.after_newline {
            self.current_flags |= TokenFlags::PRECEDING_LINE_BREAK;
        }
        self.current_kind = kind;

        if !kind.is_trivia() {
            self.after_newline = false;
        }

        Token {
            kind,
            span: self.current_span(),
            flags: self.current_flags,
        }
    }

    /// Lexes the entire input, returning all tokens up to and including EOF.
    pub fn lex(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        (tokens, self.diagnostics)
    }

    /// Takes the diagnostics accumulated so far.
    #[must_use]
    pub fn finish(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Snapshots the lexer state.
    #[must_use]
    pub fn checkpoint(&self) -> LexerCheckpoint {
        LexerCheckpoint {
            position: self.position,
            current_start: self.current_start,
            current_kind: self.current_kind,
            current_flags: self.current_flags,
            after_newline: self.after_newline,
            eof_emitted: self.eof_emitted,
            diagnostics_len: self.diagnostics.len(),
        }
    }

    /// Restores a snapshot, discarding diagnostics queued after it.
    pub fn rewind(&mut self, checkpoint: LexerCheckpoint) {
        self.position = checkpoint.position;
        self.current_start = checkpoint.current_start;
        self.current_kind = checkpoint.current_kind;
        self.current_flags = checkpoint.current_flags;
        self.after_newline = checkpoint.after_newline;
        self.eof_emitted = checkpoint.eof_emitted;
        self.diagnostics.truncate(checkpoint.diagnostics_len);
    }

    // ── Scanning ────────────────────────────────────────────────────────────

    fn lex_token(&mut self) -> TokenKind {
        match self.current_byte() {
            b' ' | b'\t' => {
                self.consume_whitespace();
                TokenKind::Whitespace
            }
            b'\n' | b'\r' => {
                self.consume_newline();
                self.after_newline = true;
                TokenKind::Newline
            }
            b'#' => {
                self.consume_comment();
                TokenKind::Comment
            }
            b'"' => self.lex_quoted_scalar(),
            b'{' => {
                self.advance(1);
                TokenKind::LBrace
            }
            b'}' => {
                self.advance(1);
                TokenKind::RBrace
            }
            b'=' => {
                if self.peek_byte(1) == b'=' {
                    self.advance(2);
                    TokenKind::EqualEqual
                } else {
                    self.advance(1);
                    TokenKind::Equal
                }
            }
            b'<' => {
                if self.peek_byte(1) == b'=' {
                    self.advance(2);
                    TokenKind::LessThanOrEqual
                } else {
                    self.advance(1);
                    TokenKind::LessThan
                }
            }
            b'>' => {
                if self.peek_byte(1) == b'=' {
                    self.advance(2);
                    TokenKind::GreaterThanOrEqual
                } else {
                    self.advance(1);
                    TokenKind::GreaterThan
                }
            }
            b'!' => {
                if self.peek_byte(1) == b'=' {
                    self.advance(2);
                    TokenKind::NotEqual
                } else {
                    // A lone `!` is not part of the grammar; preserve it.
                    self.advance(1);
                    TokenKind::Skipped
                }
            }
            b'?' if self.peek_byte(1) == b'=' => {
                self.advance(2);
                TokenKind::QuestionEqual
            }
            _ => self.lex_unquoted_scalar(),
        }
    }

    fn lex_unquoted_scalar(&mut self) -> TokenKind {
        self.advance(1);
        while !self.is_eof() && !self.at_scalar_boundary() {
            self.advance(1);
        }
        TokenKind::ScalarUnquoted
    }

    fn at_scalar_boundary(&self) -> bool {
        match self.current_byte() {
            b' ' | b'\t' | b'\n' | b'\r' | b'{' | b'}' | b'"' | b'#' | b'=' | b'<' | b'>'
            | b'!' => true,
            b'?' => self.peek_byte(1) == b'=',
            _ => false,
        }
    }

    fn lex_quoted_scalar(&mut self) -> TokenKind {
        self.advance(1);
        self.current_flags |= TokenFlags::WAS_QUOTED;
        let mut closed = false;

        while !self.is_eof() {
            match self.current_byte() {
                b'"' => {
                    self.advance(1);
                    closed = true;
                    break;
                }
                b'\\' => {
                    self.current_flags |= TokenFlags::HAS_ESCAPE;
                    self.advance(1);
                    if !self.is_eof() {
                        self.advance(1);
                    }
                }
                b'\n' | b'\r' if !self.options.allow_multiline_strings => break,
                _ => self.advance(1),
            }
        }

        if !closed && !self.options.allow_unterminated_strings {
            self.diagnostics.push(
                Diagnostic::error(
                    LEXER_UNTERMINATED_STRING,
                    "unterminated string literal",
                    self.current_span(),
                    DiagnosticCategory::Lexer,
                )
                .with_hint("close the string with a double quote or enable multiline strings"),
            );
        }

        TokenKind::ScalarQuoted
    }

    fn consume_comment(&mut self) {
        // To end of line; the terminator stays its own Newline token.
        self.advance(1);
        while !self.is_eof() && !matches!(self.current_byte(), b'\n' | b'\r') {
            self.advance(1);
        }
    }

    fn consume_whitespace(&mut self) {
        while !self.is_eof() && matches!(self.current_byte(), b' ' | b'\t') {
            self.advance(1);
        }
    }

    fn consume_newline(&mut self) {
        if self.current_byte() == b'\r' && self.peek_byte(1) == b'\n' {
            self.advance(2);
        } else {
            self.advance(1);
        }
    }

    fn current_byte(&self) -> u8 {
        if self.is_eof() {
            0
        } else {
            self.bytes[self.position]
        }
    }

    fn peek_byte(&self, ahead: usize) -> u8 {
        let index = self.position + ahead;
        if index >= self.bytes.len() {
            0
        } else {
            self.bytes[index]
        }
    }

    fn advance(&mut self, steps: usize) {
        self.position += steps;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, _) = Lexer::new(source).lex();
        tokens.into_iter().map(|t| t.kind).collect()
    }

    fn texts(source: &str) -> Vec<String> {
        let (tokens, _) = Lexer::new(source).lex();
        tokens
            .into_iter()
            .map(|t| source[t.span.as_range()].to_string())
            .collect()
    }

    #[test]
    fn lexes_key_value() {
        assert_eq!(
            kinds("a = b"),
            vec![
                TokenKind::ScalarUnquoted,
                TokenKind::Whitespace,
                TokenKind::Equal,
                TokenKind::Whitespace,
                TokenKind::ScalarUnquoted,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_all_operators() {
        assert_eq!(
            kinds("= == != < <= > >= ?=")
                .into_iter()
                .filter(|k| !k.is_trivia() && *k != TokenKind::Eof)
                .collect::<Vec<_>>(),
            vec![
                TokenKind::Equal,
                TokenKind::EqualEqual,
                TokenKind::NotEqual,
                TokenKind::LessThan,
                TokenKind::LessThanOrEqual,
                TokenKind::GreaterThan,
                TokenKind::GreaterThanOrEqual,
                TokenKind::QuestionEqual,
            ]
        );
    }

    #[test]
    fn dates_and_signed_numbers_are_single_scalars() {
        assert_eq!(texts("1444.11.11"), vec!["1444.11.11", ""]);
        assert_eq!(texts("-0.5"), vec!["-0.5", ""]);
        assert_eq!(texts("@var:x"), vec!["@var:x", ""]);
    }

    #[test]
    fn question_mark_only_pairs_with_equal() {
        // `a?b` is one scalar; `a ?= b` splits at the operator.
        assert_eq!(texts("a?b"), vec!["a?b", ""]);
        assert_eq!(
            kinds("a?=b"),
            vec![
                TokenKind::ScalarUnquoted,
                TokenKind::QuestionEqual,
                TokenKind::ScalarUnquoted,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comment_stops_before_newline() {
        assert_eq!(
            kinds("# note\na"),
            vec![
                TokenKind::Comment,
                TokenKind::Newline,
                TokenKind::ScalarUnquoted,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn crlf_is_one_newline_token() {
        let (tokens, _) = Lexer::new("a\r\nb").lex();
        assert_eq!(tokens[1].kind, TokenKind::Newline);
        assert_eq!(tokens[1].span.len(), 2);
    }

    #[test]
    fn quoted_scalar_with_escapes() {
        let (tokens, diagnostics) = Lexer::new(r#""a \"quoted\" value""#).lex();
        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::ScalarQuoted);
        assert!(tokens[0].flags.contains(TokenFlags::WAS_QUOTED));
        assert!(tokens[0].flags.contains(TokenFlags::HAS_ESCAPE));
    }

    #[test]
    fn unterminated_string_reports_diagnostic() {
        let (tokens, diagnostics) = Lexer::new("\"open\nnext").lex();
        assert_eq!(tokens[0].kind, TokenKind::ScalarQuoted);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, LEXER_UNTERMINATED_STRING);
    }

    #[test]
    fn unterminated_string_silent_when_allowed() {
        let options = LexerOptions {
            allow_unterminated_strings: true,
            ..LexerOptions::default()
        };
        let (_, diagnostics) = Lexer::with_options("\"open", options).lex();
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn multiline_string_gated_by_option() {
        let options = LexerOptions {
            allow_multiline_strings: true,
            ..LexerOptions::default()
        };
        let (tokens, diagnostics) = Lexer::with_options("\"a\nb\"", options).lex();
        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0].span.len(), 5);
    }

    #[test]
    fn stray_bang_becomes_skipped_trivia() {
        assert_eq!(
            kinds("a ! b"),
            vec![
                TokenKind::ScalarUnquoted,
                TokenKind::Whitespace,
                TokenKind::Skipped,
                TokenKind::Whitespace,
                TokenKind::ScalarUnquoted,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn preceding_line_break_flag_set_after_newline() {
        let (tokens, _) = Lexer::new("a\nb").lex();
        assert!(!tokens[0].has_preceding_line_break());
        assert!(tokens[2].has_preceding_line_break());
    }

    #[test]
    fn checkpoint_rewind_restores_position_and_diagnostics() {
        let mut lexer = Lexer::new("a \"open");
        let first = lexer.next_token();
        assert_eq!(first.kind, TokenKind::ScalarUnquoted);
        let checkpoint = lexer.checkpoint();

        lexer.next_token(); // whitespace
        lexer.next_token(); // unterminated string, queues a diagnostic
        assert_eq!(lexer.checkpoint().diagnostics_len, 1);

        lexer.rewind(checkpoint);
        assert_eq!(lexer.current(), TokenKind::ScalarUnquoted);
        assert_eq!(lexer.finish().len(), 0);
    }

    #[test]
    fn every_byte_is_covered_in_order() {
        let source = "a={b=\"1\"c=d}foo=bar#good\n";
        let (tokens, _) = Lexer::new(source).lex();
        let mut expected_start = 0;
        for token in &tokens {
            assert_eq!(token.span.start(), expected_start);
            expected_start = token.span.end();
        }
        assert_eq!(expected_start as usize, source.len());
    }
}
