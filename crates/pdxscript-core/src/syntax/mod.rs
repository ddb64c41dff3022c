// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lossless concrete syntax tree.
//!
//! Two layers, in the rust-analyzer/Biome tradition:
//!
//! - The **green tree** ([`green`]) is the compact immutable storage:
//!   kinds, token texts, and trivia piece lengths. No absolute offsets, no
//!   parent pointers — subtrees are freely shareable.
//! - The **red wrappers** ([`red`]) are on-demand navigation handles that
//!   materialise parent links and absolute offsets while walking.
//!
//! Concatenating every token's leading trivia, text, and trailing trivia in
//! source order reproduces the input byte-for-byte.

mod green;
mod kind;
mod red;

pub use green::{GreenElement, GreenNode, GreenToken, TreeBuilder};
pub use kind::SyntaxKind;
pub use red::{SyntaxElement, SyntaxNode, SyntaxToken, SyntaxTrivia};
