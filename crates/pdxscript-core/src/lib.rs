// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! PDXScript toolchain core.
//!
//! This crate contains the shared front-end for Jomini/Clausewitz
//! game-script tooling:
//! - Lexical analysis with full trivia preservation
//! - Event-based parsing into a lossless green/red syntax tree
//! - A typed AST with derived object/multimap/array views
//! - CWTools `.cwt` rules ingest into a normalized schema graph
//! - A schema-driven type-check engine and a policy lint engine
//!
//! The pipeline is built around a parse-once/consume-many carrier
//! ([`pipeline::ParseResult`]): formatters, linters, and the type checker
//! all read from the same immutable tree.

pub mod analysis;
pub mod ast;
pub mod diagnostics;
pub mod lint;
pub mod localisation;
pub mod pipeline;
pub mod rules;
pub mod source_analysis;
pub mod syntax;
pub mod typecheck;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::ast::{AstBlock, AstKeyValue, AstScalar, AstSourceFile, AstStatement, AstValue};
    pub use crate::diagnostics::{Diagnostic, DiagnosticCategory, Severity};
    pub use crate::pipeline::{parse, parse_with_options, ParseMode, ParseOptions, ParseResult};
    pub use crate::source_analysis::Span;
    pub use crate::syntax::SyntaxKind;
}
