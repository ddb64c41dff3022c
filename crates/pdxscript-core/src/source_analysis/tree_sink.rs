// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lossless tree sink: replays parser events into the green tree.
//!
//! The sink walks the event stream and the stream-side trivia list in
//! lockstep. For each token it consumes the contiguous run of leading
//! trivia before the token, slices the token text out of the source, and
//! consumes the trailing run after it. When the root node closes it
//! synthesises the `Eof` token, attaching any residual trivia as leading
//! pieces — which is what makes reconstruction byte-exact for files that
//! end in comments or blank lines.

use std::sync::Arc;

use crate::syntax::{GreenNode, SyntaxKind, TreeBuilder};

use super::parser::Event;
use super::{Trivia, TriviaPiece};

/// Builds a green tree from parser events and stream trivia.
#[must_use]
pub fn build_green_tree(text: &str, mut events: Vec<Event>, trivia: Vec<Trivia>) -> Arc<GreenNode> {
    let mut sink = LosslessTreeSink::new(text, trivia);
    process_events(&mut sink, &mut events);
    sink.finish()
}

/// Resolves forward parents and feeds the sink in tree order.
fn process_events(sink: &mut LosslessTreeSink<'_>, events: &mut [Event]) {
    let mut forward_parents: Vec<SyntaxKind> = Vec::new();

    for idx in 0..events.len() {
        match events[idx] {
            Event::Start {
                kind: SyntaxKind::Tombstone,
                ..
            } => {}
            Event::Start {
                kind,
                forward_parent,
            } => {
                // Walk the forward-parent chain, tombstoning each entry so
                // it is not started twice, and collect kinds inner-first.
                forward_parents.push(kind);
                let mut parent_idx = idx;
                let mut offset = forward_parent;
                while let Some(distance) = offset {
                    parent_idx += distance;
                    let Event::Start {
                        kind: parent_kind,
                        forward_parent: next_offset,
                    } = events[parent_idx]
                    else {
                        unreachable!("forward_parent must point at a Start event");
                    };
                    events[parent_idx] = Event::Start {
                        kind: SyntaxKind::Tombstone,
                        forward_parent: None,
                    };
                    if parent_kind != SyntaxKind::Tombstone {
                        forward_parents.push(parent_kind);
                    }
                    offset = next_offset;
                }
                while let Some(kind) = forward_parents.pop() {
                    sink.start_node(kind);
                }
            }
            Event::Finish => sink.finish_node(),
            Event::Token { kind, end } => sink.token(kind, end),
        }
    }
}

/// Converts events + trivia ownership into a green CST.
struct LosslessTreeSink<'src> {
    text: &'src str,
    trivia: Vec<Trivia>,
    text_pos: u32,
    trivia_pos: usize,
    open_parents: usize,
    needs_eof: bool,
    builder: TreeBuilder,
    pieces: Vec<TriviaPiece>,
}

impl<'src> LosslessTreeSink<'src> {
    fn new(text: &'src str, trivia: Vec<Trivia>) -> Self {
        Self {
            text,
            trivia,
            text_pos: 0,
            trivia_pos: 0,
            open_parents: 0,
            needs_eof: true,
            builder: TreeBuilder::new(),
            pieces: Vec::new(),
        }
    }

    fn start_node(&mut self, kind: SyntaxKind) {
        self.builder.start_node(kind);
        self.open_parents += 1;
    }

    fn finish_node(&mut self) {
        debug_assert!(self.open_parents > 0, "finish without matching start");
        self.open_parents -= 1;
        if self.open_parents == 0 && self.needs_eof {
            self.token(SyntaxKind::Eof, self.text.len() as u32);
        }
        self.builder.finish_node();
    }

    fn token(&mut self, kind: SyntaxKind, token_end: u32) {
        if kind == SyntaxKind::Eof {
            self.needs_eof = false;
        }

        self.eat_trivia(false, token_end);
        let token_start = self.text_pos;
        let leading_count = self.pieces.len();
        self.text_pos = token_end;
        self.eat_trivia(true, token_end);

        let token_text = &self.text[token_start as usize..token_end as usize];
        let trailing = self.pieces.split_off(leading_count);
        let leading = std::mem::take(&mut self.pieces);
        self.builder
            .token_with_trivia(kind, token_text, leading, trailing);
    }

    fn eat_trivia(&mut self, trailing: bool, token_end: u32) {
        while let Some(trivia) = self.trivia.get(self.trivia_pos) {
            if trivia.trailing != trailing {
                break;
            }
            if self.text_pos != trivia.span.start() {
                break;
            }
            if !trailing && trivia.span.end() > token_end {
                break;
            }
            self.pieces.push(TriviaPiece {
                kind: trivia.kind,
                len: trivia.span.len(),
            });
            self.text_pos = trivia.span.end();
            self.trivia_pos += 1;
        }
    }

    fn finish(self) -> Arc<GreenNode> {
        self.builder.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::buffered_lexer::BufferedLexer;
    use super::super::lexer::Lexer;
    use super::super::parser::{parse_source_file, ParseOptions, Parser};
    use super::super::token_source::TokenSource;
    use super::*;
    use crate::syntax::SyntaxNode;

    fn parse_to_red(text: &str) -> SyntaxNode {
        let source = TokenSource::new(BufferedLexer::new(Lexer::new(text)));
        let mut parser = Parser::new(source, ParseOptions::permissive());
        parse_source_file(&mut parser);
        let (events, _, source) = parser.finish();
        let (trivia, _) = source.finish();
        SyntaxNode::new_root(build_green_tree(text, events, trivia), text)
    }

    fn reconstruct(node: &SyntaxNode) -> String {
        node.descendant_tokens()
            .iter()
            .map(|t| t.text_with_trivia().to_string())
            .collect()
    }

    #[test]
    fn reconstruction_is_byte_exact() {
        let sources = [
            "a={b=\"1\"c=d}foo=bar#good\n",
            "  leading = ws\n\n# trailing comment",
            "color = rgb { 100 200 150 }",
            "broken = { unclosed",
            "",
            "# only a comment",
        ];
        for source in sources {
            let root = parse_to_red(source);
            assert_eq!(reconstruct(&root), source, "source: {source:?}");
        }
    }

    #[test]
    fn eof_token_owns_file_trailing_trivia() {
        let root = parse_to_red("a = b\n# tail\n");
        let tokens = root.descendant_tokens();
        let eof = tokens.last().expect("eof token");
        assert_eq!(eof.kind(), SyntaxKind::Eof);
        assert_eq!(eof.leading_trivia_text(), "# tail\n");
    }

    #[test]
    fn forward_parent_reparents_tagged_block() {
        let root = parse_to_red("color = rgb { 1 2 3 }");
        let source_file = root.child_nodes()[0].clone();
        let list = source_file.child_nodes()[0].clone();
        let key_value = list.child_nodes()[0].clone();
        assert_eq!(key_value.kind(), SyntaxKind::KeyValue);

        let tagged = key_value
            .first_child_of_kind(SyntaxKind::TaggedBlockValue)
            .expect("tagged block value");
        assert!(tagged.first_child_of_kind(SyntaxKind::Scalar).is_some());
        assert!(tagged.first_child_of_kind(SyntaxKind::Block).is_some());
    }

    #[test]
    fn every_byte_owned_exactly_once() {
        let source = "a={b=\"1\"c=d}foo=bar#good\n";
        let root = parse_to_red(source);
        let mut covered = 0u32;
        for token in root.descendant_tokens() {
            assert_eq!(token.span().start(), covered);
            covered = token.span().end();
        }
        assert_eq!(covered as usize, source.len());
    }
}
