// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Subtype matchers and subtype-conditional field constraints.

use ecow::EcoString;
use indexmap::IndexMap;

use crate::rules::ir::{RuleExpression, RuleMetadata, RuleStatement, RuleStatementKind};
use crate::rules::schema_graph::SchemaGraph;
use crate::rules::semantics::{
    build_constraints_from_rule_block, strip_quotes, RuleFieldConstraint,
};

use super::aliases::collect_single_alias_specs;
use super::models::SubtypeMatcher;

/// Extracts the `subtype[name]` inner name from a key.
#[must_use]
pub fn subtype_name(key: Option<&str>) -> Option<EcoString> {
    let key = key?;
    let inner = key
        .strip_prefix("subtype[")?
        .strip_suffix(']')?
        .trim();
    if inner.is_empty() {
        None
    } else {
        Some(EcoString::from(inner))
    }
}

/// Builds declaration-ordered subtype matchers per type key.
#[must_use]
pub fn build_subtype_matchers_by_object(
    graph: &SchemaGraph,
) -> IndexMap<EcoString, Vec<SubtypeMatcher>> {
    let mut matchers: IndexMap<EcoString, Vec<SubtypeMatcher>> = IndexMap::new();

    for (object_key, declarations) in &graph.types_by_key {
        let bucket = matchers.entry(object_key.clone()).or_default();
        for declaration in declarations {
            let RuleExpression::Block(block) = &declaration.statement.value else {
                continue;
            };
            for child in block {
                let Some(name) = subtype_name(child.key.as_deref()) else {
                    continue;
                };
                let RuleExpression::Block(subtype_block) = &child.value else {
                    continue;
                };
                let (includes, excludes, starts_with) = matcher_options(&child.metadata);
                bucket.push(SubtypeMatcher {
                    subtype_name: name,
                    expected_field_values: expected_fields(subtype_block),
                    type_key_filters: includes,
                    excluded_type_key_filters: excludes,
                    starts_with,
                    push_scope: child
                        .metadata
                        .push_scope
                        .clone()
                        .unwrap_or_default()
                        .iter()
                        .map(|scope| EcoString::from(scope.to_ascii_lowercase()))
                        .collect(),
                });
            }
        }
    }

    matchers.retain(|_, bucket| !bucket.is_empty());
    matchers
}

/// Builds subtype-conditional field constraints per object, from top-level
/// object rules that contain `subtype[...]` branches.
#[must_use]
pub fn build_subtype_field_constraints_by_object(
    graph: &SchemaGraph,
) -> IndexMap<EcoString, IndexMap<EcoString, IndexMap<EcoString, RuleFieldConstraint>>> {
    let single_aliases = collect_single_alias_specs(graph);
    let mut output: IndexMap<EcoString, IndexMap<EcoString, IndexMap<EcoString, RuleFieldConstraint>>> =
        IndexMap::new();

    for statement in &graph.top_level_rule_statements {
        let Some(object_key) = &statement.key else {
            continue;
        };
        let Some(block) = statement.value.as_block() else {
            continue;
        };

        let mut subtype_map: IndexMap<EcoString, IndexMap<EcoString, RuleFieldConstraint>> =
            IndexMap::new();
        for child in block {
            let Some(name) = subtype_name(child.key.as_deref()) else {
                continue;
            };
            let Some(subtype_block) = child.value.as_block() else {
                continue;
            };
            let fields = build_constraints_from_rule_block(subtype_block, &single_aliases);
            if !fields.is_empty() {
                subtype_map.insert(name, fields);
            }
        }

        if !subtype_map.is_empty() {
            output.insert(object_key.clone(), subtype_map);
        }
    }

    output
}

fn expected_fields(statements: &[std::sync::Arc<RuleStatement>]) -> Vec<(EcoString, EcoString)> {
    let mut expected = Vec::new();
    for statement in statements {
        if statement.kind != RuleStatementKind::KeyValue {
            continue;
        }
        let Some(key) = &statement.key else {
            continue;
        };
        let Some(value) = statement.value.as_scalar() else {
            continue;
        };
        let literal = strip_quotes(value);
        if !literal.is_empty() {
            expected.push((key.clone(), EcoString::from(literal)));
        }
    }
    expected
}

fn matcher_options(
    metadata: &RuleMetadata,
) -> (Vec<EcoString>, Vec<EcoString>, Option<EcoString>) {
    let mut includes = Vec::new();
    let mut excludes = Vec::new();
    let mut starts_with = None;

    for option in &metadata.options {
        let Some(value) = option.value.as_deref() else {
            continue;
        };
        match option.key.to_ascii_lowercase().as_str() {
            "type_key_filter" => {
                let mut raw = value.trim();
                let mut negated = false;
                for marker in ["<>", "!="] {
                    if let Some(stripped) = raw.strip_prefix(marker) {
                        negated = true;
                        raw = stripped.trim_start();
                        break;
                    }
                }
                let values = parse_filter_list(raw);
                if negated {
                    excludes.extend(values);
                } else {
                    includes.extend(values);
                }
            }
            "starts_with" => {
                let trimmed = strip_quotes(value);
                if !trimmed.is_empty() {
                    starts_with = Some(EcoString::from(trimmed));
                }
            }
            _ => {}
        }
    }

    (includes, excludes, starts_with)
}

fn parse_filter_list(value: &str) -> Vec<EcoString> {
    let trimmed = value.trim();
    if let Some(inner) = trimmed
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
    {
        return inner
            .split_whitespace()
            .map(|part| EcoString::from(strip_quotes(part)))
            .collect();
    }
    if trimmed.is_empty() {
        Vec::new()
    } else {
        vec![EcoString::from(strip_quotes(trimmed))]
    }
}

#[cfg(test)]
mod tests {
    use crate::rules::normalize::normalize_ruleset;
    use crate::rules::parser::parse_rules_text;
    use crate::rules::schema_graph::build_schema_graph;

    use super::*;

    fn graph(text: &str) -> SchemaGraph {
        build_schema_graph(
            "test",
            normalize_ruleset(vec![parse_rules_text(text, "test.cwt")]),
        )
    }

    #[test]
    fn matchers_carry_expected_fields_and_options() {
        let graph = graph(
            "types = {\n  type[unit] = {\n    path = \"game/common/units\"\n\
             \x20   ## type_key_filter = <> { artillery }\n\
             \x20   ## push_scope = country\n\
             \x20   subtype[armored] = {\n      armor = yes\n    }\n  }\n}\n",
        );
        let matchers = build_subtype_matchers_by_object(&graph);
        let unit = matchers.get("unit").expect("unit matchers");
        assert_eq!(unit.len(), 1);
        assert_eq!(unit[0].subtype_name, "armored");
        assert_eq!(
            unit[0].expected_field_values,
            vec![(EcoString::from("armor"), EcoString::from("yes"))]
        );
        assert_eq!(unit[0].excluded_type_key_filters.len(), 1);
        assert_eq!(unit[0].push_scope, vec![EcoString::from("country")]);
    }

    #[test]
    fn subtype_field_constraints_from_object_rules() {
        let graph = graph(
            "technology = {\n  subtype[naval] = {\n    ## cardinality = 1..1\n    range = int\n  }\n}\n",
        );
        let constraints = build_subtype_field_constraints_by_object(&graph);
        let naval = &constraints["technology"]["naval"];
        assert!(naval["range"].required);
    }

    #[test]
    fn subtype_name_extraction() {
        assert_eq!(
            subtype_name(Some("subtype[capital_ship]")).as_deref(),
            Some("capital_ship")
        );
        assert_eq!(subtype_name(Some("subtype[]")), None);
        assert_eq!(subtype_name(Some("type[x]")), None);
        assert_eq!(subtype_name(None), None);
    }
}
