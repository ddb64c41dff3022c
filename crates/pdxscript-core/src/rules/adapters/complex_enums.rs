// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Complex-enum materialisation.
//!
//! A `complex_enum[...]` declares a path filter and a name tree; its
//! members are discovered by scanning project files under the filter and
//! walking the tree against each file's AST. In the name tree,
//! `enum_name` marks the collection point:
//!
//! - `enum_name = {}` collects object keys at that level
//! - `enum_name = scalar` collects every key with a scalar value
//! - `field = enum_name` collects the values of `field`
//! - a bare `enum_name` collects bare array scalars
//! - `scalar` as a key is a wildcard structural step
//!
//! Path filters match case-insensitively; a definition with no `path`
//! matches no file and therefore contributes no values.

use std::sync::Arc;

use ecow::EcoString;
use indexmap::IndexMap;

use crate::ast::{AstKeyValue, AstStatement, AstValue};
use crate::pipeline::{parse_with_options, ParseOptions};
use crate::rules::ir::{RuleExpression, RuleStatement, RuleStatementKind};
use crate::rules::schema_graph::SchemaGraph;
use crate::rules::semantics::strip_quotes;

use super::common::{find_block_child, find_scalar_child, find_scalar_children, normalize_path, strip_game_prefix};
use super::models::{ComplexEnumDefinition, MemberSet};

/// Extracts complex-enum definitions from the schema graph.
#[must_use]
pub fn build_complex_enum_definitions(
    graph: &SchemaGraph,
) -> IndexMap<EcoString, Vec<ComplexEnumDefinition>> {
    let mut definitions: IndexMap<EcoString, Vec<ComplexEnumDefinition>> = IndexMap::new();

    for declaration in graph.category(crate::rules::ir::RuleCategory::ComplexEnum) {
        let Some(enum_key) = declaration.argument.clone() else {
            continue;
        };
        let RuleExpression::Block(block) = &declaration.statement.value else {
            continue;
        };
        let Some(name_node) = find_block_child(block, "name") else {
            continue;
        };
        let Some(name_tree) = name_node.value.as_block() else {
            continue;
        };
        if name_tree.is_empty() {
            continue;
        }

        definitions.entry(enum_key.clone()).or_default().push(ComplexEnumDefinition {
            enum_key,
            paths: find_scalar_children(block, "path"),
            path_strict: find_scalar_child(block, "path_strict").as_deref() == Some("yes"),
            path_file: find_scalar_child(block, "path_file"),
            path_extension: find_scalar_child(block, "path_extension"),
            start_from_root: find_scalar_child(block, "start_from_root").as_deref() == Some("yes"),
            name_tree: name_tree.to_vec(),
        });
    }

    definitions
}

/// Materialises complex-enum member sets by scanning project file texts.
#[must_use]
pub fn build_complex_enum_values_from_file_texts(
    file_texts_by_path: &IndexMap<String, String>,
    definitions_by_key: &IndexMap<EcoString, Vec<ComplexEnumDefinition>>,
) -> IndexMap<EcoString, MemberSet> {
    let mut values: IndexMap<EcoString, MemberSet> = IndexMap::new();

    for (enum_key, definitions) in definitions_by_key {
        let bucket = values.entry(enum_key.clone()).or_default();
        for definition in definitions {
            for (file_path, text) in file_texts_by_path {
                if !matches_complex_enum_path(file_path, definition) {
                    continue;
                }
                extract_values_from_text(text, definition, bucket);
            }
        }
    }

    values.retain(|_, bucket| !bucket.is_empty());
    values
}

fn matches_complex_enum_path(file_path: &str, definition: &ComplexEnumDefinition) -> bool {
    let normalized = normalize_path(file_path).to_ascii_lowercase();

    if let Some(path_file) = &definition.path_file {
        let wanted = basename(&normalize_path(path_file).to_ascii_lowercase()).to_string();
        if basename(&normalized) != wanted {
            return false;
        }
    }
    if let Some(extension) = &definition.path_extension {
        if !normalized.ends_with(extension.to_ascii_lowercase().as_str()) {
            return false;
        }
    }

    // No path filter means no reachable files.
    if definition.paths.is_empty() {
        return false;
    }

    for raw_declared in &definition.paths {
        let declared = strip_game_prefix(&normalize_path(raw_declared).to_ascii_lowercase())
            .trim_end_matches('/')
            .to_string();
        if declared.is_empty() {
            continue;
        }
        if definition.path_strict {
            if dirname(&normalized) == declared {
                return true;
            }
            continue;
        }
        if normalized == declared || normalized.starts_with(&format!("{declared}/")) {
            return true;
        }
    }
    false
}

fn extract_values_from_text(
    text: &str,
    definition: &ComplexEnumDefinition,
    out: &mut MemberSet,
) {
    let parsed = parse_with_options(text, ParseOptions::permissive());
    let statements = &parsed.ast_root().statements;

    if definition.start_from_root {
        extract_values_in_clause(statements, &definition.name_tree, out);
        return;
    }
    for statement in statements {
        let Some(key_value) = statement.as_key_value() else {
            continue;
        };
        if let Some(AstValue::Block(block)) = key_value.value.as_ref() {
            extract_values_in_clause(&block.statements, &definition.name_tree, out);
        }
    }
}

fn extract_values_in_clause(
    statements: &[AstStatement],
    name_tree: &[Arc<RuleStatement>],
    out: &mut MemberSet,
) {
    let key_values: Vec<&AstKeyValue> = statements
        .iter()
        .filter_map(AstStatement::as_key_value)
        .collect();

    for tree_node in name_tree {
        match tree_node.kind {
            RuleStatementKind::KeyValue => {
                let Some(key) = &tree_node.key else {
                    continue;
                };
                match &tree_node.value {
                    RuleExpression::Block(subtree) => {
                        visit_block_step(&key_values, key, subtree, out);
                    }
                    RuleExpression::Scalar(value) => {
                        visit_scalar_step(&key_values, key, value, out);
                    }
                    _ => {}
                }
            }
            RuleStatementKind::Value => {
                // A bare `enum_name` collects array scalars at this level.
                let is_collector = tree_node
                    .value
                    .as_scalar()
                    .is_some_and(|text| strip_quotes(text).eq_ignore_ascii_case("enum_name"));
                if is_collector {
                    for statement in statements {
                        if let AstStatement::Scalar(scalar) = statement {
                            insert_member(out, scalar.value_text());
                        }
                    }
                }
            }
            RuleStatementKind::Error => {}
        }
    }
}

fn visit_block_step(
    key_values: &[&AstKeyValue],
    key: &str,
    subtree: &[Arc<RuleStatement>],
    out: &mut MemberSet,
) {
    let lowered = key.to_ascii_lowercase();

    if lowered == "enum_name" {
        for key_value in key_values {
            insert_member(out, key_value.key.value_text());
        }
        if subtree.is_empty() {
            return;
        }
    }

    let wildcard = lowered == "enum_name" || lowered == "scalar";
    for key_value in key_values {
        if !wildcard && !key_value.key.value_text().eq_ignore_ascii_case(&lowered) {
            continue;
        }
        if let Some(AstValue::Block(block)) = key_value.value.as_ref() {
            extract_values_in_clause(&block.statements, subtree, out);
        }
    }
}

fn visit_scalar_step(key_values: &[&AstKeyValue], key: &str, value: &str, out: &mut MemberSet) {
    let key_lowered = key.to_ascii_lowercase();
    let value_lowered = strip_quotes(value).to_ascii_lowercase();

    if key_lowered == "enum_name" {
        // `enum_name = scalar` collects keys with scalar values;
        // `enum_name = literal` collects keys whose value equals it.
        for key_value in key_values {
            let Some(AstValue::Scalar(scalar)) = key_value.value.as_ref() else {
                continue;
            };
            if value_lowered == "scalar"
                || scalar.value_text().eq_ignore_ascii_case(&value_lowered)
            {
                insert_member(out, key_value.key.value_text());
            }
        }
        return;
    }

    if value_lowered == "enum_name" {
        // `field = enum_name` collects the values of `field`;
        // `scalar = enum_name` collects every scalar field value.
        for key_value in key_values {
            let Some(AstValue::Scalar(scalar)) = key_value.value.as_ref() else {
                continue;
            };
            if key_lowered == "scalar"
                || key_value.key.value_text().eq_ignore_ascii_case(&key_lowered)
            {
                insert_member(out, scalar.value_text());
            }
        }
    }
}

fn insert_member(out: &mut MemberSet, raw: &str) {
    let member = strip_quotes(raw);
    if !member.is_empty() {
        out.insert(EcoString::from(member));
    }
}

fn basename(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

fn dirname(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}
