// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Shared walking utilities for the rule stack.
//!
//! Every rule sees the same object decomposition: top-level key-values
//! with object-like block values, each with its active subtype (first
//! matcher wins, at most one active) and its merged field constraints.
//! The scope walker layers the scope-context stack on top, applying
//! `push_scope`/`replace_scope` lexically so sibling subtrees stay
//! isolated.

use ecow::EcoString;
use indexmap::IndexMap;

use crate::ast::{AstBlock, AstKeyValue, AstSourceFile, AstValue};
use crate::rules::adapters::SubtypeMatcher;
use crate::rules::RuleFieldConstraint;
use crate::source_analysis::Span;

use super::scope::ScopeStack;
use super::services::{FieldScopeConstraint, TypecheckServices};

/// One top-level object occurrence under check.
pub struct ObjectOccurrence<'a> {
    pub key: EcoString,
    pub occurrence: usize,
    pub key_span: Span,
    pub block: &'a AstBlock,
    pub subtype: Option<&'a SubtypeMatcher>,
}

/// Decomposes the file into object occurrences with active subtypes.
#[must_use]
pub fn object_occurrences<'a>(
    ast: &'a AstSourceFile,
    services: &'a TypecheckServices,
) -> Vec<ObjectOccurrence<'a>> {
    let mut occurrences = Vec::new();
    let mut counts: IndexMap<EcoString, usize> = IndexMap::new();

    for statement in &ast.statements {
        let Some(key_value) = statement.as_key_value() else {
            continue;
        };
        let Some(AstValue::Block(block)) = key_value.value.as_ref() else {
            continue;
        };
        let key = EcoString::from(key_value.key.value_text());
        let slot = counts.entry(key.clone()).or_insert(0);
        let occurrence = *slot;
        *slot += 1;

        let subtype = services
            .subtype_matchers_by_object
            .get(&key)
            .and_then(|matchers| {
                matchers
                    .iter()
                    .find(|matcher| matcher_applies(matcher, &key, block))
            });

        occurrences.push(ObjectOccurrence {
            key,
            occurrence,
            key_span: key_value.key.span,
            block,
            subtype,
        });
    }

    occurrences
}

fn matcher_applies(matcher: &SubtypeMatcher, object_key: &str, block: &AstBlock) -> bool {
    if !matcher.type_key_filters.is_empty()
        && !matcher
            .type_key_filters
            .iter()
            .any(|filter| filter == object_key)
    {
        return false;
    }
    if matcher
        .excluded_type_key_filters
        .iter()
        .any(|filter| filter == object_key)
    {
        return false;
    }
    if let Some(prefix) = &matcher.starts_with {
        if !object_key.starts_with(prefix.as_str()) {
            return false;
        }
    }

    matcher.expected_field_values.iter().all(|(field, literal)| {
        block.statements.iter().any(|statement| {
            statement.as_key_value().is_some_and(|key_value| {
                key_value.key.value_text() == field.as_str()
                    && key_value
                        .value
                        .as_ref()
                        .and_then(AstValue::as_scalar)
                        .is_some_and(|scalar| scalar.value_text() == literal.as_str())
            })
        })
    })
}

/// The object's field constraints: base rules merged with the active
/// subtype's branch.
#[must_use]
pub fn constraints_for(
    services: &TypecheckServices,
    object: &ObjectOccurrence<'_>,
) -> IndexMap<EcoString, RuleFieldConstraint> {
    let mut merged = services
        .field_constraints_by_object
        .get(&object.key)
        .cloned()
        .unwrap_or_default();

    if let Some(subtype) = object.subtype {
        if let Some(branch) = services
            .subtype_field_constraints_by_object
            .get(&object.key)
            .and_then(|by_subtype| by_subtype.get(&subtype.subtype_name))
        {
            for (field, constraint) in branch {
                match merged.get_mut(field) {
                    Some(existing) => existing.merge(constraint.clone()),
                    None => {
                        merged.insert(field.clone(), constraint.clone());
                    }
                }
            }
        }
    }

    merged
}

/// Builds the scope stack established at the object root: the object's own
/// declaration metadata plus the active subtype's `push_scope`.
#[must_use]
pub fn scope_stack_for_object(
    services: &TypecheckServices,
    object: &ObjectOccurrence<'_>,
) -> ScopeStack {
    let mut stack = ScopeStack::new();
    if let Some(constraint) = services
        .field_scope_constraints_by_object
        .get(&object.key)
        .and_then(|by_path| by_path.get(&Vec::new()))
    {
        apply_scope_constraint(&mut stack, constraint);
    }
    if let Some(subtype) = object.subtype {
        stack.push_scopes(&subtype.push_scope);
    }
    stack
}

/// Applies one path's scope metadata: `push_scope` wins over
/// `replace_scope` on the same declaration path.
pub fn apply_scope_constraint(stack: &mut ScopeStack, constraint: &FieldScopeConstraint) {
    if !constraint.push_scope.is_empty() {
        stack.push_scopes(&constraint.push_scope);
        return;
    }
    if !constraint.replace_scope.is_empty() {
        stack.push_replacements(&constraint.replace_scope);
    }
}

/// Walks every key-value field of the object, depth first, maintaining
/// the scope stack.
///
/// The callback observes the stack as established by *enclosing* paths;
/// the field's own `push_scope` applies to its subtree only.
pub fn walk_fields_with_scope<'a>(
    object: &ObjectOccurrence<'a>,
    services: &TypecheckServices,
    visit: &mut dyn FnMut(&[EcoString], &'a AstKeyValue, &ScopeStack),
) {
    let mut stack = scope_stack_for_object(services, object);
    let scope_constraints = services.field_scope_constraints_by_object.get(&object.key);
    walk_block(
        object.block,
        &[],
        &mut stack,
        scope_constraints,
        visit,
    );
}

fn walk_block<'a>(
    block: &'a AstBlock,
    path: &[EcoString],
    stack: &mut ScopeStack,
    scope_constraints: Option<&IndexMap<Vec<EcoString>, FieldScopeConstraint>>,
    visit: &mut dyn FnMut(&[EcoString], &'a AstKeyValue, &ScopeStack),
) {
    for statement in &block.statements {
        let Some(key_value) = statement.as_key_value() else {
            continue;
        };
        let mut field_path = path.to_vec();
        field_path.push(EcoString::from(key_value.key.value_text()));

        visit(&field_path, key_value, stack);

        if let Some(AstValue::Block(nested)) = key_value.value.as_ref() {
            let depth = stack.depth();
            if let Some(constraint) =
                scope_constraints.and_then(|by_path| by_path.get(&field_path))
            {
                apply_scope_constraint(stack, constraint);
            }
            walk_block(nested, &field_path, stack, scope_constraints, visit);
            stack.truncate(depth);
        }
    }
}

/// Finds the blocks reached by a relative declaration path (e.g. the body
/// of `ai_will_do` under each matching field), starting at the object
/// root. An empty path yields the object root block.
#[must_use]
pub fn blocks_at_path<'a>(root: &'a AstBlock, path: &[EcoString]) -> Vec<&'a AstBlock> {
    let mut current = vec![root];
    for segment in path {
        let mut next = Vec::new();
        for block in current {
            for statement in &block.statements {
                let Some(key_value) = statement.as_key_value() else {
                    continue;
                };
                if key_value.key.value_text() != segment.as_str() {
                    continue;
                }
                if let Some(AstValue::Block(nested)) = key_value.value.as_ref() {
                    next.push(nested);
                }
            }
        }
        current = next;
        if current.is_empty() {
            break;
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use crate::pipeline::parse;
    use crate::rules::adapters::SubtypeMatcher;

    use super::*;

    #[test]
    fn occurrences_track_repeats_and_skip_non_objects() {
        let result = parse("a = { x = 1 }\nb = 2\na = { y = 2 }\n");
        let services = TypecheckServices::default();
        let occurrences = object_occurrences(result.ast_root(), &services);
        assert_eq!(occurrences.len(), 2);
        assert_eq!(occurrences[0].occurrence, 0);
        assert_eq!(occurrences[1].occurrence, 1);
        assert_eq!(occurrences[1].key, "a");
    }

    #[test]
    fn first_matching_subtype_wins() {
        let result = parse("ship = { class = battleship }\n");
        let mut services = TypecheckServices::default();
        services.subtype_matchers_by_object.insert(
            EcoString::from("ship"),
            vec![
                SubtypeMatcher {
                    subtype_name: EcoString::from("starbase"),
                    expected_field_values: vec![(
                        EcoString::from("class"),
                        EcoString::from("shipclass_starbase"),
                    )],
                    ..SubtypeMatcher::default()
                },
                SubtypeMatcher {
                    subtype_name: EcoString::from("military"),
                    expected_field_values: vec![(
                        EcoString::from("class"),
                        EcoString::from("battleship"),
                    )],
                    ..SubtypeMatcher::default()
                },
            ],
        );
        let occurrences = object_occurrences(result.ast_root(), &services);
        assert_eq!(
            occurrences[0].subtype.map(|s| s.subtype_name.as_str()),
            Some("military")
        );
    }

    #[test]
    fn scope_walk_isolates_siblings() {
        let result = parse("obj = { branch_a = { leaf = 1 } branch_b = { leaf = 2 } }\n");
        let mut services = TypecheckServices::default();
        let mut constraints = IndexMap::new();
        constraints.insert(
            vec![EcoString::from("branch_a")],
            FieldScopeConstraint {
                push_scope: vec![EcoString::from("country")],
                ..FieldScopeConstraint::default()
            },
        );
        services
            .field_scope_constraints_by_object
            .insert(EcoString::from("obj"), constraints);

        let occurrences = object_occurrences(result.ast_root(), &services);
        let mut seen = Vec::new();
        walk_fields_with_scope(&occurrences[0], &services, &mut |path, _, stack| {
            seen.push((
                path.iter().map(EcoString::as_str).collect::<Vec<_>>().join("."),
                stack.current().map(ToString::to_string),
            ));
        });

        assert_eq!(
            seen,
            vec![
                ("branch_a".to_string(), None),
                ("branch_a.leaf".to_string(), Some("country".to_string())),
                ("branch_b".to_string(), None),
                ("branch_b.leaf".to_string(), None),
            ]
        );
    }

    #[test]
    fn blocks_at_path_resolves_nested_blocks() {
        let result = parse("obj = { wrapper = { inner = { x = 1 } } wrapper = { inner = { y = 2 } } }\n");
        let services = TypecheckServices::default();
        let occurrences = object_occurrences(result.ast_root(), &services);
        let blocks = blocks_at_path(
            occurrences[0].block,
            &[EcoString::from("wrapper"), EcoString::from("inner")],
        );
        assert_eq!(blocks.len(), 2);
    }
}
