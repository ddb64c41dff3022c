// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lexing and parsing infrastructure for PDXScript source.
//!
//! The stages compose as a straight line:
//!
//! ```text
//! Lexer → BufferedLexer → TokenSource → Parser (events) → TreeSink → green tree
//! ```
//!
//! Trivia ownership is decided once, at the [`TokenSource`]; the
//! [`tree_sink`] only converts the decision into compact tree-side pieces.
//! Together the two stages guarantee that the green tree reproduces the
//! input byte-for-byte.

mod buffered_lexer;
mod lexer;
pub mod parser;
mod span;
mod token;
mod token_source;
mod tree_sink;

#[cfg(test)]
mod reconstruct_property_tests;

pub use buffered_lexer::{BufferedLexer, LexContext, LookaheadToken};
pub use lexer::{Lexer, LexerCheckpoint, LexerOptions};
pub use parser::{parse_source_file, Event, ParseMode, ParseOptions, Parser, ParserCheckpoint};
pub use span::Span;
pub use token::{Token, TokenFlags, TokenKind, Trivia, TriviaKind, TriviaPiece};
pub use token_source::{TokenSource, TokenSourceCheckpoint};
pub use tree_sink::build_green_tree;
