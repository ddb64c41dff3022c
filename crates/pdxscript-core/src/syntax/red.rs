// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Red wrappers: navigable handles over the green tree.
//!
//! A red node is a cheap clone — an `Arc` around (green subtree, parent
//! handle, absolute offset). Children and offsets are materialised on
//! demand by walking green children and summing their full lengths; the
//! green tree itself stays position-free and shareable.

use std::sync::Arc;

use ecow::EcoString;

use crate::source_analysis::{Span, TriviaKind};

use super::green::{GreenElement, GreenNode, GreenToken};
use super::SyntaxKind;

/// A trivia piece with its resolved text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTrivia {
    pub kind: TriviaKind,
    pub text: EcoString,
}

#[derive(Debug)]
struct NodeData {
    green: Arc<GreenNode>,
    parent: Option<SyntaxNode>,
    index_in_parent: usize,
    /// Absolute start offset, leading trivia of the first token included.
    offset: u32,
    source: Arc<str>,
}

/// A navigable node handle over the green tree.
#[derive(Debug, Clone)]
pub struct SyntaxNode(Arc<NodeData>);

/// A navigable token handle over the green tree.
#[derive(Debug, Clone)]
pub struct SyntaxToken {
    green: Arc<GreenToken>,
    parent: SyntaxNode,
    index_in_parent: usize,
    offset: u32,
    source: Arc<str>,
}

/// Either child of a node.
#[derive(Debug, Clone)]
pub enum SyntaxElement {
    Node(SyntaxNode),
    Token(SyntaxToken),
}

impl SyntaxElement {
    /// The element's kind.
    #[must_use]
    pub fn kind(&self) -> SyntaxKind {
        match self {
            SyntaxElement::Node(node) => node.kind(),
            SyntaxElement::Token(token) => token.kind(),
        }
    }

    /// The element's full span, trivia included.
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            SyntaxElement::Node(node) => node.span(),
            SyntaxElement::Token(token) => token.span(),
        }
    }
}

impl SyntaxNode {
    /// Wraps a green root into a red root at offset zero.
    #[must_use]
    pub fn new_root(green: Arc<GreenNode>, source: impl Into<Arc<str>>) -> Self {
        Self(Arc::new(NodeData {
            green,
            parent: None,
            index_in_parent: 0,
            offset: 0,
            source: source.into(),
        }))
    }

    /// The node kind.
    #[must_use]
    pub fn kind(&self) -> SyntaxKind {
        self.0.green.kind
    }

    /// The underlying green node.
    #[must_use]
    pub fn green(&self) -> &Arc<GreenNode> {
        &self.0.green
    }

    /// The full span of the subtree, trivia included.
    #[must_use]
    pub fn span(&self) -> Span {
        Span::at(self.0.offset, self.0.green.full_len())
    }

    /// The subtree's source text, trivia included.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.0.source[self.span().as_range()]
    }

    /// The span of the subtree with trivia stripped from both ends.
    ///
    /// Empty nodes collapse to an empty span at the node offset.
    #[must_use]
    pub fn trimmed_span(&self) -> Span {
        let tokens = self.descendant_tokens();
        let first = tokens.iter().find(|t| t.kind() != SyntaxKind::Eof);
        let last = tokens.iter().rev().find(|t| t.kind() != SyntaxKind::Eof);
        match (first, last) {
            (Some(first), Some(last)) => {
                Span::new(first.token_span().start(), last.token_span().end())
            }
            _ => Span::empty(self.0.offset),
        }
    }

    /// The subtree's source text with trivia stripped from both ends.
    ///
    /// Interior trivia (between child tokens) is preserved.
    #[must_use]
    pub fn text_trimmed(&self) -> &str {
        &self.0.source[self.trimmed_span().as_range()]
    }

    /// The parent node, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&SyntaxNode> {
        self.0.parent.as_ref()
    }

    /// All children in order.
    #[must_use]
    pub fn children(&self) -> Vec<SyntaxElement> {
        let mut offset = self.0.offset;
        let mut children = Vec::with_capacity(self.0.green.children.len());
        for (index, child) in self.0.green.children.iter().enumerate() {
            let len = child.full_len();
            match child {
                GreenElement::Node(node) => {
                    children.push(SyntaxElement::Node(SyntaxNode(Arc::new(NodeData {
                        green: Arc::clone(node),
                        parent: Some(self.clone()),
                        index_in_parent: index,
                        offset,
                        source: Arc::clone(&self.0.source),
                    }))));
                }
                GreenElement::Token(token) => {
                    children.push(SyntaxElement::Token(SyntaxToken {
                        green: Arc::clone(token),
                        parent: self.clone(),
                        index_in_parent: index,
                        offset,
                        source: Arc::clone(&self.0.source),
                    }));
                }
            }
            offset += len;
        }
        children
    }

    /// Child nodes only, in order.
    #[must_use]
    pub fn child_nodes(&self) -> Vec<SyntaxNode> {
        self.children()
            .into_iter()
            .filter_map(|child| match child {
                SyntaxElement::Node(node) => Some(node),
                SyntaxElement::Token(_) => None,
            })
            .collect()
    }

    /// Child tokens only, in order.
    #[must_use]
    pub fn child_tokens(&self) -> Vec<SyntaxToken> {
        self.children()
            .into_iter()
            .filter_map(|child| match child {
                SyntaxElement::Node(_) => None,
                SyntaxElement::Token(token) => Some(token),
            })
            .collect()
    }

    /// The first child node of the given kind.
    #[must_use]
    pub fn first_child_of_kind(&self, kind: SyntaxKind) -> Option<SyntaxNode> {
        self.child_nodes().into_iter().find(|node| node.kind() == kind)
    }

    /// All descendant tokens in source order.
    #[must_use]
    pub fn descendant_tokens(&self) -> Vec<SyntaxToken> {
        fn walk(node: &SyntaxNode, out: &mut Vec<SyntaxToken>) {
            for child in node.children() {
                match child {
                    SyntaxElement::Node(node) => walk(&node, out),
                    SyntaxElement::Token(token) => out.push(token),
                }
            }
        }
        let mut tokens = Vec::new();
        walk(self, &mut tokens);
        tokens
    }

    /// The next sibling element, if any.
    #[must_use]
    pub fn next_sibling(&self) -> Option<SyntaxElement> {
        let parent = self.0.parent.as_ref()?;
        parent.children().into_iter().nth(self.0.index_in_parent + 1)
    }

    /// The previous sibling element, if any.
    #[must_use]
    pub fn prev_sibling(&self) -> Option<SyntaxElement> {
        let parent = self.0.parent.as_ref()?;
        self.0
            .index_in_parent
            .checked_sub(1)
            .and_then(|index| parent.children().into_iter().nth(index))
    }
}

impl SyntaxToken {
    /// The token kind.
    #[must_use]
    pub fn kind(&self) -> SyntaxKind {
        self.green.kind
    }

    /// The parent node.
    #[must_use]
    pub fn parent(&self) -> &SyntaxNode {
        &self.parent
    }

    /// The token's index among its parent's children.
    #[must_use]
    pub fn index_in_parent(&self) -> usize {
        self.index_in_parent
    }

    /// The full span: leading trivia + token + trailing trivia.
    #[must_use]
    pub fn span(&self) -> Span {
        Span::at(self.offset, self.green.full_len())
    }

    /// The span of the token text alone.
    #[must_use]
    pub fn token_span(&self) -> Span {
        Span::at(
            self.offset + self.green.leading_len(),
            self.green.text.len() as u32,
        )
    }

    /// The token text without trivia.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.green.text
    }

    /// The token text including its leading and trailing trivia.
    #[must_use]
    pub fn text_with_trivia(&self) -> &str {
        &self.source[self.span().as_range()]
    }

    /// Leading trivia pieces with resolved text.
    #[must_use]
    pub fn leading_trivia(&self) -> Vec<SyntaxTrivia> {
        self.resolve_trivia(self.offset, &self.green.leading)
    }

    /// Trailing trivia pieces with resolved text.
    #[must_use]
    pub fn trailing_trivia(&self) -> Vec<SyntaxTrivia> {
        self.resolve_trivia(self.token_span().end(), &self.green.trailing)
    }

    /// Concatenated leading trivia text.
    #[must_use]
    pub fn leading_trivia_text(&self) -> &str {
        let start = self.offset;
        let end = self.token_span().start();
        &self.source[Span::new(start, end).as_range()]
    }

    /// Concatenated trailing trivia text.
    #[must_use]
    pub fn trailing_trivia_text(&self) -> &str {
        let start = self.token_span().end();
        let end = self.span().end();
        &self.source[Span::new(start, end).as_range()]
    }

    fn resolve_trivia(
        &self,
        start: u32,
        pieces: &[crate::source_analysis::TriviaPiece],
    ) -> Vec<SyntaxTrivia> {
        let mut offset = start;
        let mut resolved = Vec::with_capacity(pieces.len());
        for piece in pieces {
            let span = Span::at(offset, piece.len);
            resolved.push(SyntaxTrivia {
                kind: piece.kind,
                text: EcoString::from(&self.source[span.as_range()]),
            });
            offset = span.end();
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use crate::source_analysis::TriviaPiece;
    use crate::syntax::green::TreeBuilder;

    use super::*;

    fn sample_tree() -> SyntaxNode {
        // Source: "  a = b\n"
        let mut builder = TreeBuilder::new();
        builder.start_node(SyntaxKind::SourceFile);
        builder.start_node(SyntaxKind::KeyValue);
        builder.token_with_trivia(
            SyntaxKind::ScalarUnquoted,
            "a",
            vec![TriviaPiece {
                kind: TriviaKind::Whitespace,
                len: 2,
            }],
            vec![TriviaPiece {
                kind: TriviaKind::Whitespace,
                len: 1,
            }],
        );
        builder.token_with_trivia(
            SyntaxKind::Equal,
            "=",
            Vec::new(),
            vec![TriviaPiece {
                kind: TriviaKind::Whitespace,
                len: 1,
            }],
        );
        builder.token_with_trivia(
            SyntaxKind::ScalarUnquoted,
            "b",
            Vec::new(),
            vec![TriviaPiece {
                kind: TriviaKind::Newline,
                len: 1,
            }],
        );
        builder.finish_node();
        builder.finish_node();
        SyntaxNode::new_root(builder.finish(), "  a = b\n")
    }

    #[test]
    fn offsets_account_for_trivia() {
        let root = sample_tree();
        let key_value = root.child_nodes()[0].child_nodes()[0].clone();
        let tokens = key_value.child_tokens();

        assert_eq!(tokens[0].token_span(), Span::new(2, 3));
        assert_eq!(tokens[0].span(), Span::new(0, 4));
        assert_eq!(tokens[1].token_span(), Span::new(4, 5));
        assert_eq!(tokens[2].token_span(), Span::new(6, 7));
        assert_eq!(tokens[2].span().end(), 8);
    }

    #[test]
    fn text_accessors_with_and_without_trivia() {
        let root = sample_tree();
        assert_eq!(root.text(), "  a = b\n");

        let key_value = root.child_nodes()[0].child_nodes()[0].clone();
        assert_eq!(key_value.text_trimmed(), "a = b");

        let token = &key_value.child_tokens()[0];
        assert_eq!(token.text(), "a");
        assert_eq!(token.text_with_trivia(), "  a ");
        assert_eq!(token.leading_trivia_text(), "  ");
        assert_eq!(token.trailing_trivia_text(), " ");
    }

    #[test]
    fn sibling_navigation() {
        let root = sample_tree();
        let source_file = root.child_nodes()[0].clone();
        let key_value = source_file.child_nodes()[0].clone();
        assert!(key_value.next_sibling().is_none());
        assert!(key_value.prev_sibling().is_none());
        assert_eq!(key_value.parent().unwrap().kind(), SyntaxKind::SourceFile);
    }

    #[test]
    fn descendant_tokens_in_source_order() {
        let root = sample_tree();
        let texts: Vec<_> = root
            .descendant_tokens()
            .iter()
            .map(|t| t.text().to_string())
            .collect();
        assert_eq!(texts, vec!["a", "=", "b"]);
    }

    #[test]
    fn trivia_pieces_resolve_text() {
        let root = sample_tree();
        let token = root.descendant_tokens()[0].clone();
        let leading = token.leading_trivia();
        assert_eq!(leading.len(), 1);
        assert_eq!(leading[0].kind, TriviaKind::Whitespace);
        assert_eq!(leading[0].text, "  ");
    }
}
