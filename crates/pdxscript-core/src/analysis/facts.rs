// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Single-pass field index over the AST.
//!
//! Built once per parse carrier and shared by the type-check and lint
//! engines. The index covers every object-like block reachable through
//! key-value nesting: each field gets a declaration path (the key chain
//! from the top level), the occurrence index of its containing object, and
//! its own occurrence index within that object. Blocks that are not
//! object-like (arrays, mixed) contribute nothing.

use std::collections::BTreeSet;

use ecow::EcoString;
use indexmap::IndexMap;

use crate::ast::{AstBlock, AstSourceFile, AstValue};
use crate::source_analysis::Span;

/// The shape of a key-value's right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValueShape {
    Missing,
    Scalar,
    Block,
    Tagged,
    Error,
}

impl ValueShape {
    fn of(value: Option<&AstValue>) -> Self {
        match value {
            None => ValueShape::Missing,
            Some(AstValue::Scalar(_)) => ValueShape::Scalar,
            Some(AstValue::Block(_)) => ValueShape::Block,
            Some(AstValue::Tagged(_)) => ValueShape::Tagged,
            Some(AstValue::Error(_)) => ValueShape::Error,
        }
    }
}

/// One field occurrence inside an object-like block.
#[derive(Debug, Clone)]
pub struct FieldFact {
    /// Key chain from the top level to this field, e.g.
    /// `["technology", "level"]`.
    pub path: Vec<EcoString>,
    /// Occurrence index of the containing object among same-key siblings.
    pub object_occurrence: usize,
    /// Occurrence index of this field among same-key fields in the object.
    pub field_occurrence: usize,
    /// The field's value, if the parse recovered one.
    pub value: Option<AstValue>,
    /// Span of the field's key token.
    pub key_span: Span,
}

impl FieldFact {
    /// The field's own name (last path segment).
    #[must_use]
    pub fn field_name(&self) -> &EcoString {
        self.path.last().expect("field path is never empty")
    }
}

/// Facts extracted once from the AST and reused by multiple engines.
#[derive(Debug, Clone, Default)]
pub struct AnalysisFacts {
    /// Top-level values per key, in source order.
    pub top_level_values: IndexMap<EcoString, Vec<Option<AstValue>>>,
    /// Distinct value shapes per top-level key.
    pub top_level_shapes: IndexMap<EcoString, BTreeSet<ValueShape>>,
    /// Field facts per top-level object key, in source order.
    pub object_fields: IndexMap<EcoString, Vec<FieldFact>>,
    /// Per-object index: field name → indices into `object_fields[key]`.
    pub object_field_map: IndexMap<EcoString, IndexMap<EcoString, Vec<usize>>>,
}

impl AnalysisFacts {
    /// All field facts across all objects, in source order.
    pub fn all_field_facts(&self) -> impl Iterator<Item = &FieldFact> {
        self.object_fields.values().flatten()
    }

    /// Facts for one field of one object, in source order.
    pub fn fields_for<'a>(
        &'a self,
        object: &str,
        field: &str,
    ) -> impl Iterator<Item = &'a FieldFact> {
        let indices = self
            .object_field_map
            .get(object)
            .and_then(|by_field| by_field.get(field))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let facts = self.object_fields.get(object);
        indices
            .iter()
            .filter_map(move |index| facts.and_then(|f| f.get(*index)))
    }
}

/// Builds the fact index from a lowered source file.
#[must_use]
pub fn build_analysis_facts(source_file: &AstSourceFile) -> AnalysisFacts {
    let mut facts = AnalysisFacts::default();
    let mut object_occurrences: IndexMap<EcoString, usize> = IndexMap::new();

    for statement in &source_file.statements {
        let Some(key_value) = statement.as_key_value() else {
            continue;
        };
        let key = EcoString::from(key_value.key.value_text());

        facts
            .top_level_values
            .entry(key.clone())
            .or_default()
            .push(key_value.value.clone());
        facts
            .top_level_shapes
            .entry(key.clone())
            .or_default()
            .insert(ValueShape::of(key_value.value.as_ref()));

        let Some(AstValue::Block(block)) = key_value.value.as_ref() else {
            continue;
        };
        if !block.is_object_like() {
            continue;
        }

        let occurrence_slot = object_occurrences.entry(key.clone()).or_insert(0);
        let object_occurrence = *occurrence_slot;
        *occurrence_slot += 1;

        let path = [key.clone()];
        let bucket = facts.object_fields.entry(key).or_default();
        index_object_block(block, &path, object_occurrence, bucket);
    }

    // Build the per-object field maps from the final fact lists.
    let mut field_maps: IndexMap<EcoString, IndexMap<EcoString, Vec<usize>>> = IndexMap::new();
    for (object_key, field_facts) in &facts.object_fields {
        let map = field_maps.entry(object_key.clone()).or_default();
        for (index, fact) in field_facts.iter().enumerate() {
            map.entry(fact.field_name().clone()).or_default().push(index);
        }
    }
    facts.object_field_map = field_maps;

    facts
}

fn index_object_block(
    block: &AstBlock,
    path: &[EcoString],
    object_occurrence: usize,
    out: &mut Vec<FieldFact>,
) {
    let mut field_occurrences: IndexMap<EcoString, usize> = IndexMap::new();

    for statement in &block.statements {
        let Some(key_value) = statement.as_key_value() else {
            continue;
        };
        let field = EcoString::from(key_value.key.value_text());
        let occurrence_slot = field_occurrences.entry(field.clone()).or_insert(0);
        let field_occurrence = *occurrence_slot;
        *occurrence_slot += 1;

        let mut field_path = path.to_vec();
        field_path.push(field);
        out.push(FieldFact {
            path: field_path.clone(),
            object_occurrence,
            field_occurrence,
            value: key_value.value.clone(),
            key_span: key_value.key.span,
        });

        // Recurse into nested object-like blocks under the same top-level
        // bucket; the nested object reuses its parent's occurrence index.
        if let Some(AstValue::Block(nested)) = key_value.value.as_ref() {
            if nested.is_object_like() {
                index_object_block(nested, &field_path, object_occurrence, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::pipeline::parse;

    use super::*;

    fn facts_of(source: &str) -> AnalysisFacts {
        let result = parse(source);
        build_analysis_facts(result.ast_root())
    }

    #[test]
    fn tracks_object_and_field_occurrences() {
        let facts = facts_of("technology={ level=1 level=2 cost=3 }\ntechnology={ level=4 }\n");

        let field_facts = facts.object_fields.get("technology").expect("technology");
        let summary: Vec<_> = field_facts
            .iter()
            .map(|fact| {
                (
                    fact.path
                        .iter()
                        .map(EcoString::as_str)
                        .collect::<Vec<_>>()
                        .join("."),
                    fact.object_occurrence,
                    fact.field_occurrence,
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("technology.level".to_string(), 0, 0),
                ("technology.level".to_string(), 0, 1),
                ("technology.cost".to_string(), 0, 0),
                ("technology.level".to_string(), 1, 0),
            ]
        );

        assert_eq!(facts.fields_for("technology", "level").count(), 3);
        assert_eq!(facts.fields_for("technology", "cost").count(), 1);
        assert_eq!(facts.all_field_facts().count(), 4);
    }

    #[test]
    fn skips_non_object_like_blocks() {
        let facts = facts_of("technology={ a=1 2 }\n");
        assert!(!facts.object_fields.contains_key("technology"));
        assert_eq!(facts.all_field_facts().count(), 0);
        // Top-level shape facts are still recorded.
        assert!(facts.top_level_shapes.contains_key("technology"));
    }

    #[test]
    fn indexes_nested_objects_with_full_paths() {
        let facts = facts_of("technology={ wrapper={ target=TAG } }\n");
        let paths: Vec<String> = facts
            .object_fields
            .get("technology")
            .expect("technology")
            .iter()
            .map(|fact| {
                fact.path
                    .iter()
                    .map(EcoString::as_str)
                    .collect::<Vec<_>>()
                    .join(".")
            })
            .collect();
        assert_eq!(
            paths,
            vec!["technology.wrapper", "technology.wrapper.target"]
        );
        assert_eq!(facts.fields_for("technology", "target").count(), 1);
    }

    #[test]
    fn top_level_shape_index_records_all_shapes() {
        let facts = facts_of("a = 1\na = { x = 2 }\nb = rgb { 1 2 3 }\n");
        let a_shapes = facts.top_level_shapes.get("a").expect("a");
        assert!(a_shapes.contains(&ValueShape::Scalar));
        assert!(a_shapes.contains(&ValueShape::Block));
        let b_shapes = facts.top_level_shapes.get("b").expect("b");
        assert_eq!(b_shapes.len(), 1);
        assert!(b_shapes.contains(&ValueShape::Tagged));
    }
}
