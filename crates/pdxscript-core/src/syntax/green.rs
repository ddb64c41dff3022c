// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Compact immutable green tree.
//!
//! Green elements store no absolute positions: a token is its kind, its
//! text without trivia, and its leading/trailing trivia pieces; a node is
//! its kind and children. Offsets are materialised on demand by the red
//! wrappers. Subtrees are reference-counted and structurally shareable.

use std::sync::Arc;

use ecow::EcoString;

use crate::source_analysis::TriviaPiece;

use super::SyntaxKind;

/// An immutable token in the green tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GreenToken {
    pub kind: SyntaxKind,
    /// The token's own text, trivia excluded.
    pub text: EcoString,
    pub leading: Vec<TriviaPiece>,
    pub trailing: Vec<TriviaPiece>,
}

impl GreenToken {
    /// Total byte length including leading and trailing trivia.
    #[must_use]
    pub fn full_len(&self) -> u32 {
        self.leading_len() + self.text.len() as u32 + self.trailing_len()
    }

    /// Byte length of the leading trivia.
    #[must_use]
    pub fn leading_len(&self) -> u32 {
        self.leading.iter().map(|piece| piece.len).sum()
    }

    /// Byte length of the trailing trivia.
    #[must_use]
    pub fn trailing_len(&self) -> u32 {
        self.trailing.iter().map(|piece| piece.len).sum()
    }
}

/// An immutable interior node in the green tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GreenNode {
    pub kind: SyntaxKind,
    pub children: Vec<GreenElement>,
}

impl GreenNode {
    /// Total byte length of the subtree, trivia included.
    #[must_use]
    pub fn full_len(&self) -> u32 {
        self.children.iter().map(GreenElement::full_len).sum()
    }
}

/// A child of a green node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GreenElement {
    Node(Arc<GreenNode>),
    Token(Arc<GreenToken>),
}

impl GreenElement {
    /// Total byte length, trivia included.
    #[must_use]
    pub fn full_len(&self) -> u32 {
        match self {
            GreenElement::Node(node) => node.full_len(),
            GreenElement::Token(token) => token.full_len(),
        }
    }

    /// The element's kind.
    #[must_use]
    pub fn kind(&self) -> SyntaxKind {
        match self {
            GreenElement::Node(node) => node.kind,
            GreenElement::Token(token) => token.kind,
        }
    }
}

/// Stack-based green tree builder driven by the tree sink.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    stack: Vec<(SyntaxKind, Vec<GreenElement>)>,
    roots: Vec<GreenElement>,
}

impl TreeBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a node of the given kind.
    pub fn start_node(&mut self, kind: SyntaxKind) {
        self.stack.push((kind, Vec::new()));
    }

    /// Appends a token with its trivia pieces to the open node.
    pub fn token_with_trivia(
        &mut self,
        kind: SyntaxKind,
        text: impl Into<EcoString>,
        leading: Vec<TriviaPiece>,
        trailing: Vec<TriviaPiece>,
    ) {
        let token = GreenToken {
            kind,
            text: text.into(),
            leading,
            trailing,
        };
        self.push(GreenElement::Token(Arc::new(token)));
    }

    /// Closes the most recently opened node.
    ///
    /// # Panics
    ///
    /// Panics if no node is open; the event stream guarantees balance.
    pub fn finish_node(&mut self) {
        let (kind, children) = self
            .stack
            .pop()
            .expect("finish_node called with no open node");
        self.push(GreenElement::Node(Arc::new(GreenNode { kind, children })));
    }

    /// Finishes the tree, wrapping stray roots in a `Root` node.
    ///
    /// # Panics
    ///
    /// Panics if unclosed nodes remain on the stack.
    #[must_use]
    pub fn finish(mut self) -> Arc<GreenNode> {
        assert!(
            self.stack.is_empty(),
            "cannot finish tree: unclosed nodes remain"
        );

        if self.roots.len() == 1 {
            if let GreenElement::Node(node) = &self.roots[0] {
                if node.kind == SyntaxKind::Root {
                    return Arc::clone(node);
                }
            }
        }

        Arc::new(GreenNode {
            kind: SyntaxKind::Root,
            children: std::mem::take(&mut self.roots),
        })
    }

    fn push(&mut self, element: GreenElement) {
        match self.stack.last_mut() {
            Some((_, children)) => children.push(element),
            None => self.roots.push(element),
        }
    }
}
