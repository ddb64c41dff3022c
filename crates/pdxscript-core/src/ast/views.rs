// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Derived consumer views over [`AstBlock`].
//!
//! The canonical AST keeps repeated keys and source order; these views are
//! how consumers choose an interpretation. All maps are insertion-ordered
//! (`IndexMap`): the object view is last-write-wins but keeps the position
//! of each key's first occurrence. Views never mutate the AST.

use ecow::EcoString;
use indexmap::IndexMap;

use super::scalar::{interpret_scalar, ScalarValue};
use super::{AstBlock, AstStatement, AstValue};

/// The statement shape of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockShape {
    /// Every statement is a key-value.
    ObjectLike,
    /// No statement is a key-value.
    ArrayLike,
    /// Both forms appear.
    Mixed,
    /// No statements; `{}` could be either.
    EmptyAmbiguous,
}

pub(super) fn classify(block: &AstBlock) -> BlockShape {
    if block.statements.is_empty() {
        return BlockShape::EmptyAmbiguous;
    }
    let key_values = block
        .statements
        .iter()
        .filter(|s| s.as_key_value().is_some())
        .count();
    if key_values == block.statements.len() {
        BlockShape::ObjectLike
    } else if key_values == 0 {
        BlockShape::ArrayLike
    } else {
        BlockShape::Mixed
    }
}

/// An explicit consumer view over an [`AstBlock`].
#[derive(Debug, Clone, Copy)]
pub struct BlockView<'a> {
    block: &'a AstBlock,
}

impl<'a> BlockView<'a> {
    /// Creates a view over `block`.
    #[must_use]
    pub fn new(block: &'a AstBlock) -> Self {
        Self { block }
    }

    /// The block's shape classification.
    #[must_use]
    pub fn shape(&self) -> BlockShape {
        classify(self.block)
    }

    /// Last-write-wins object view, insertion-ordered by first occurrence.
    ///
    /// Returns `None` unless the block is object-like or empty. Key-values
    /// with a missing (unrecoverable) value are skipped.
    #[must_use]
    pub fn as_object(&self) -> Option<IndexMap<EcoString, &'a AstValue>> {
        if !matches!(
            self.shape(),
            BlockShape::ObjectLike | BlockShape::EmptyAmbiguous
        ) {
            return None;
        }
        let mut map = IndexMap::new();
        for statement in &self.block.statements {
            let Some(key_value) = statement.as_key_value() else {
                continue;
            };
            let Some(value) = key_value.value.as_ref() else {
                continue;
            };
            map.insert(EcoString::from(key_value.key.value_text()), value);
        }
        Some(map)
    }

    /// Multimap view: every value per key, repetition order preserved.
    #[must_use]
    pub fn as_multimap(&self) -> Option<IndexMap<EcoString, Vec<&'a AstValue>>> {
        if !matches!(
            self.shape(),
            BlockShape::ObjectLike | BlockShape::EmptyAmbiguous
        ) {
            return None;
        }
        let mut map: IndexMap<EcoString, Vec<&'a AstValue>> = IndexMap::new();
        for statement in &self.block.statements {
            let Some(key_value) = statement.as_key_value() else {
                continue;
            };
            let Some(value) = key_value.value.as_ref() else {
                continue;
            };
            map.entry(EcoString::from(key_value.key.value_text()))
                .or_default()
                .push(value);
        }
        Some(map)
    }

    /// Ordered list of non-key-value statements.
    #[must_use]
    pub fn as_array(&self) -> Option<Vec<&'a AstStatement>> {
        if !matches!(
            self.shape(),
            BlockShape::ArrayLike | BlockShape::EmptyAmbiguous
        ) {
            return None;
        }
        Some(
            self.block
                .statements
                .iter()
                .filter(|s| s.as_key_value().is_none())
                .collect(),
        )
    }

    /// Interprets the scalar at `key` in the object view.
    ///
    /// Quoted scalars require `allow_quoted`.
    #[must_use]
    pub fn get_scalar(&self, key: &str, allow_quoted: bool) -> Option<ScalarValue> {
        let object = self.as_object()?;
        let value = object.get(key)?;
        let scalar = value.as_scalar()?;
        Some(interpret_scalar(
            scalar.value_text(),
            scalar.was_quoted,
            allow_quoted,
        ))
    }

    /// Interprets every scalar bound to `key`, in repetition order.
    #[must_use]
    pub fn get_scalar_all(&self, key: &str, allow_quoted: bool) -> Vec<ScalarValue> {
        let Some(multimap) = self.as_multimap() else {
            return Vec::new();
        };
        let Some(values) = multimap.get(key) else {
            return Vec::new();
        };
        values
            .iter()
            .filter_map(|value| value.as_scalar())
            .map(|scalar| interpret_scalar(scalar.value_text(), scalar.was_quoted, allow_quoted))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::scalar::ScalarNumber;
    use crate::pipeline::parse;

    use super::*;

    fn block_of(source: &str) -> AstBlock {
        let result = parse(source);
        let ast = result.ast_root();
        AstBlock {
            statements: ast.statements.clone(),
            span: crate::source_analysis::Span::empty(0),
        }
    }

    #[test]
    fn repeated_keys_object_vs_multimap() {
        let block = block_of("modifier = { a = 1 }\nmodifier = { b = 2 }\n");
        let view = BlockView::new(&block);

        let object = view.as_object().expect("object view");
        assert_eq!(object.len(), 1);
        let last = object.get("modifier").expect("modifier");
        let last_block = last.as_block().expect("block");
        assert_eq!(
            last_block.statements[0].as_key_value().unwrap().key.raw_text,
            "b"
        );

        let multimap = view.as_multimap().expect("multimap view");
        assert_eq!(multimap.get("modifier").map(Vec::len), Some(2));
    }

    #[test]
    fn shape_classification() {
        assert_eq!(
            BlockView::new(&block_of("a = 1\nb = 2\n")).shape(),
            BlockShape::ObjectLike
        );
        assert_eq!(
            BlockView::new(&block_of("1 2 3")).shape(),
            BlockShape::ArrayLike
        );
        assert_eq!(
            BlockView::new(&block_of("a = 1\n2\n")).shape(),
            BlockShape::Mixed
        );
        assert_eq!(
            BlockView::new(&block_of("")).shape(),
            BlockShape::EmptyAmbiguous
        );
    }

    #[test]
    fn mixed_blocks_expose_no_object_view() {
        let block = block_of("a = 1\n2\n");
        let view = BlockView::new(&block);
        assert!(view.as_object().is_none());
        assert!(view.as_multimap().is_none());
        assert!(view.as_array().is_none());
    }

    #[test]
    fn empty_block_answers_all_views() {
        let block = block_of("");
        let view = BlockView::new(&block);
        assert_eq!(view.as_object().map(|m| m.len()), Some(0));
        assert_eq!(view.as_array().map(|v| v.len()), Some(0));
    }

    #[test]
    fn scalar_helpers_respect_quote_policy() {
        let block = block_of("count = \"5\"\nlevel = 3\n");
        let view = BlockView::new(&block);

        assert!(view.get_scalar("count", false).unwrap().is_unknown());
        assert_eq!(
            view.get_scalar("count", true).unwrap(),
            ScalarValue::Number(ScalarNumber::Int(5))
        );
        assert_eq!(
            view.get_scalar("level", false).unwrap(),
            ScalarValue::Number(ScalarNumber::Int(3))
        );
    }

    #[test]
    fn object_view_preserves_first_occurrence_order() {
        let block = block_of("z = 1\na = 2\nz = 3\n");
        let view = BlockView::new(&block);
        let object = view.as_object().expect("object");
        let keys: Vec<_> = object.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }
}
