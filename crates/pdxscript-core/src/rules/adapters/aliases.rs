// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Alias-family and single-alias materialisation.
//!
//! `alias[family:member]` declarations pool into families; an
//! `alias_name[family] = alias_match_left[family]` invocation site accepts
//! any member of the family. `single_alias[name]` bodies are inlined at
//! `single_alias_right[name]` use sites. Expansion is name-keyed and
//! on-demand; recursive references stay as names, so cyclic configs load
//! without unwinding.

use std::sync::Arc;

use ecow::EcoString;
use indexmap::IndexMap;

use crate::rules::ir::{RuleExpression, RuleStatement, RuleStatementKind};
use crate::rules::schema_graph::SchemaGraph;
use crate::rules::semantics::{
    build_constraints_from_rule_block, extract_value_specs, merge_specs, strip_quotes,
    RuleFieldConstraint, RuleValueSpec,
};

use super::common::parse_bracket_key;
use super::models::{
    AliasDefinition, AliasInvocation, MemberSet, SingleAliasDefinition, SingleAliasInvocation,
    TypeLocalisationTemplate,
};
use super::subtypes::subtype_name;

/// Splits an alias index name (`family:member`) into its parts.
fn split_alias_name(raw: &str) -> Option<(EcoString, EcoString)> {
    let (family, member) = raw.split_once(':')?;
    let family = family.trim();
    let member = member.trim();
    if family.is_empty() || member.is_empty() {
        return None;
    }
    Some((EcoString::from(family), EcoString::from(member)))
}

/// Builds family → member-name sets.
#[must_use]
pub fn build_alias_members_by_family(graph: &SchemaGraph) -> IndexMap<EcoString, MemberSet> {
    let mut families: IndexMap<EcoString, MemberSet> = IndexMap::new();
    for raw_name in graph.aliases_by_key.keys() {
        let Some((family, member)) = split_alias_name(raw_name) else {
            continue;
        };
        families.entry(family).or_default().insert(member);
    }
    families
}

/// Builds full alias definitions grouped by family then member name.
#[must_use]
pub fn build_alias_definitions_by_family(
    graph: &SchemaGraph,
) -> IndexMap<EcoString, IndexMap<EcoString, AliasDefinition>> {
    let single_aliases = collect_single_alias_specs(graph);
    let mut by_family: IndexMap<EcoString, IndexMap<EcoString, AliasDefinition>> = IndexMap::new();

    for (raw_name, declarations) in &graph.aliases_by_key {
        let Some((family, member)) = split_alias_name(raw_name) else {
            continue;
        };
        let bucket = by_family.entry(family.clone()).or_default();

        for declaration in declarations {
            let statement = &declaration.statement;
            let value_specs = extract_value_specs(&statement.value);
            let field_constraints = statement
                .value
                .as_block()
                .map(|block| build_constraints_from_rule_block(block, &single_aliases))
                .unwrap_or_default();

            match bucket.get_mut(&member) {
                Some(existing) => {
                    existing.value_specs =
                        merge_specs(std::mem::take(&mut existing.value_specs), value_specs);
                    for (field, constraint) in field_constraints {
                        match existing.field_constraints.get_mut(&field) {
                            Some(slot) => slot.merge(constraint),
                            None => {
                                existing.field_constraints.insert(field, constraint);
                            }
                        }
                    }
                }
                None => {
                    bucket.insert(
                        member.clone(),
                        AliasDefinition {
                            family: family.clone(),
                            name: member.clone(),
                            value_specs,
                            field_constraints,
                        },
                    );
                }
            }
        }
    }

    by_family.retain(|_, members| !members.is_empty());
    by_family
}

/// Builds single-alias definitions by name.
#[must_use]
pub fn build_single_alias_definitions(
    graph: &SchemaGraph,
) -> IndexMap<EcoString, SingleAliasDefinition> {
    let mut definitions: IndexMap<EcoString, SingleAliasDefinition> = IndexMap::new();

    for (alias_name, declarations) in &graph.single_aliases_by_key {
        let mut merged_specs: Vec<RuleValueSpec> = Vec::new();
        let mut merged_fields: IndexMap<EcoString, RuleFieldConstraint> = IndexMap::new();

        for declaration in declarations {
            let statement = &declaration.statement;
            merged_specs = merge_specs(merged_specs, extract_value_specs(&statement.value));
            if let Some(block) = statement.value.as_block() {
                for (field, constraint) in
                    build_constraints_from_rule_block(block, &IndexMap::new())
                {
                    match merged_fields.get_mut(&field) {
                        Some(slot) => slot.merge(constraint),
                        None => {
                            merged_fields.insert(field, constraint);
                        }
                    }
                }
            }
        }

        if !merged_specs.is_empty() || !merged_fields.is_empty() {
            definitions.insert(
                alias_name.clone(),
                SingleAliasDefinition {
                    name: alias_name.clone(),
                    value_specs: merged_specs,
                    field_constraints: merged_fields,
                },
            );
        }
    }

    definitions
}

/// Flattens single-alias value specs for inline expansion.
#[must_use]
pub fn collect_single_alias_specs(
    graph: &SchemaGraph,
) -> IndexMap<EcoString, Vec<RuleValueSpec>> {
    let mut specs: IndexMap<EcoString, Vec<RuleValueSpec>> = IndexMap::new();
    for (alias_name, declarations) in &graph.single_aliases_by_key {
        let mut merged = Vec::new();
        for declaration in declarations {
            merged = merge_specs(merged, extract_value_specs(&declaration.statement.value));
        }
        if !merged.is_empty() {
            specs.insert(alias_name.clone(), merged);
        }
    }
    specs
}

/// Builds object-level field constraints with single-alias expansion.
#[must_use]
pub fn build_expanded_field_constraints(
    graph: &SchemaGraph,
) -> IndexMap<EcoString, IndexMap<EcoString, RuleFieldConstraint>> {
    let single_aliases = collect_single_alias_specs(graph);
    let mut by_object: IndexMap<EcoString, IndexMap<EcoString, RuleFieldConstraint>> =
        IndexMap::new();

    for statement in &graph.top_level_rule_statements {
        let Some(object_key) = &statement.key else {
            continue;
        };
        let Some(block) = statement.value.as_block() else {
            continue;
        };
        let constraints = build_constraints_from_rule_block(block, &single_aliases);
        if constraints.is_empty() {
            continue;
        }
        match by_object.get_mut(object_key) {
            Some(existing) => {
                for (field, constraint) in constraints {
                    match existing.get_mut(&field) {
                        Some(slot) => slot.merge(constraint),
                        None => {
                            existing.insert(field, constraint);
                        }
                    }
                }
            }
            None => {
                by_object.insert(object_key.clone(), constraints);
            }
        }
    }

    by_object
}

/// Builds a flat field→constraint map across *all* depths of each object
/// rule, keyed by bare field name.
///
/// The reference and localisation rules apply constraints by name wherever
/// a field appears; cardinality and primitive checks stay depth-exact and
/// use [`build_expanded_field_constraints`] instead. Subtype branches are
/// excluded — their fields are conditional and live in the subtype
/// constraint map.
#[must_use]
pub fn build_nested_field_constraints(
    graph: &SchemaGraph,
) -> IndexMap<EcoString, IndexMap<EcoString, RuleFieldConstraint>> {
    let single_aliases = collect_single_alias_specs(graph);
    let mut by_object: IndexMap<EcoString, IndexMap<EcoString, RuleFieldConstraint>> =
        IndexMap::new();

    for statement in &graph.top_level_rule_statements {
        let Some(object_key) = &statement.key else {
            continue;
        };
        let Some(block) = statement.value.as_block() else {
            continue;
        };
        let out = by_object.entry(object_key.clone()).or_default();
        collect_nested_constraints(block, &single_aliases, out);
    }

    by_object.retain(|_, constraints| !constraints.is_empty());
    by_object
}

fn collect_nested_constraints(
    statements: &[Arc<RuleStatement>],
    single_aliases: &IndexMap<EcoString, Vec<RuleValueSpec>>,
    out: &mut IndexMap<EcoString, RuleFieldConstraint>,
) {
    for (field, constraint) in build_constraints_from_rule_block(statements, single_aliases) {
        if field.starts_with("subtype[") || field.starts_with("alias_name[") {
            continue;
        }
        match out.get_mut(&field) {
            Some(existing) => existing.merge(constraint),
            None => {
                out.insert(field, constraint);
            }
        }
    }
    for statement in statements {
        if subtype_name(statement.key.as_deref()).is_some() {
            continue;
        }
        if let Some(block) = statement.value.as_block() {
            collect_nested_constraints(block, single_aliases, out);
        }
    }
}

/// Finds `alias_name[family] = alias_match_left[family]` invocation sites
/// in top-level object rules.
#[must_use]
pub fn build_alias_invocations_by_object(
    graph: &SchemaGraph,
) -> IndexMap<EcoString, Vec<AliasInvocation>> {
    let mut invocations: IndexMap<EcoString, Vec<AliasInvocation>> = IndexMap::new();

    for statement in &graph.top_level_rule_statements {
        let Some(object_key) = &statement.key else {
            continue;
        };
        let Some(block) = statement.value.as_block() else {
            continue;
        };
        let bucket = invocations.entry(object_key.clone()).or_default();
        collect_alias_invocations(block, &[object_key.clone()], None, bucket);
        dedup_invocations(bucket);
    }

    invocations.retain(|_, bucket| !bucket.is_empty());
    invocations
}

/// Finds `single_alias_right[...]` invocation sites in top-level rules.
#[must_use]
pub fn build_single_alias_invocations_by_object(
    graph: &SchemaGraph,
) -> IndexMap<EcoString, Vec<SingleAliasInvocation>> {
    let mut invocations: IndexMap<EcoString, Vec<SingleAliasInvocation>> = IndexMap::new();

    for statement in &graph.top_level_rule_statements {
        let Some(object_key) = &statement.key else {
            continue;
        };
        let Some(block) = statement.value.as_block() else {
            continue;
        };
        let bucket = invocations.entry(object_key.clone()).or_default();
        collect_single_alias_invocations(block, &[object_key.clone()], None, bucket);
        bucket.dedup_by(|a, b| {
            a.alias_name == b.alias_name
                && a.field_path == b.field_path
                && a.required_subtype == b.required_subtype
        });
    }

    invocations.retain(|_, bucket| !bucket.is_empty());
    invocations
}

/// Collects per-type localisation templates from `type[...]` declarations.
#[must_use]
pub fn build_type_localisation_templates_by_type(
    graph: &SchemaGraph,
) -> IndexMap<EcoString, Vec<TypeLocalisationTemplate>> {
    let mut templates_by_type: IndexMap<EcoString, Vec<TypeLocalisationTemplate>> =
        IndexMap::new();

    for (type_key, declarations) in &graph.types_by_key {
        let bucket = templates_by_type.entry(type_key.clone()).or_default();
        for declaration in declarations {
            let Some(block) = declaration.statement.value.as_block() else {
                continue;
            };
            for child in block {
                if child.key.as_deref() != Some("localisation") {
                    continue;
                }
                let Some(localisation_block) = child.value.as_block() else {
                    continue;
                };
                collect_localisation_templates(localisation_block, None, bucket);
            }
        }
        bucket.dedup();
    }

    templates_by_type.retain(|_, bucket| !bucket.is_empty());
    templates_by_type
}

fn collect_localisation_templates(
    statements: &[Arc<RuleStatement>],
    subtype: Option<&EcoString>,
    out: &mut Vec<TypeLocalisationTemplate>,
) {
    for statement in statements {
        if statement.kind != RuleStatementKind::KeyValue {
            continue;
        }
        if let Some(nested_subtype) = subtype_name(statement.key.as_deref()) {
            if let Some(block) = statement.value.as_block() {
                collect_localisation_templates(block, Some(&nested_subtype), out);
            }
            continue;
        }
        let Some(raw) = statement.value.as_scalar() else {
            continue;
        };
        let template = strip_quotes(raw);
        if template.is_empty() || !template.contains('$') {
            continue;
        }
        out.push(TypeLocalisationTemplate {
            template: EcoString::from(template),
            required: statement.metadata.has_flag("required"),
            subtype_name: subtype.cloned(),
        });
    }
}

fn collect_alias_invocations(
    statements: &[Arc<RuleStatement>],
    path: &[EcoString],
    subtype: Option<&EcoString>,
    out: &mut Vec<AliasInvocation>,
) {
    for statement in statements {
        if statement.kind != RuleStatementKind::KeyValue {
            continue;
        }
        let Some(key) = &statement.key else {
            continue;
        };

        if let Some(family) = parse_bracket_key(key, "alias_name") {
            let specs = extract_value_specs(&statement.value);
            let matches_family = specs.iter().any(|spec| {
                matches!(
                    spec,
                    RuleValueSpec::AliasMatchLeftRef { family: spec_family }
                        if *spec_family == family
                )
            });
            if matches_family {
                out.push(AliasInvocation {
                    family,
                    parent_path: path.to_vec(),
                    required_subtype: subtype.cloned(),
                });
            }
        }

        if let Some(block) = statement.value.as_block() {
            // Subtype branches describe the same object level, so they do
            // not contribute a path segment.
            let nested_subtype = subtype_name(statement.key.as_deref());
            let mut child_path = path.to_vec();
            if nested_subtype.is_none() {
                child_path.push(key.clone());
            }
            collect_alias_invocations(
                block,
                &child_path,
                nested_subtype.as_ref().or(subtype),
                out,
            );
        }
    }
}

fn collect_single_alias_invocations(
    statements: &[Arc<RuleStatement>],
    path: &[EcoString],
    subtype: Option<&EcoString>,
    out: &mut Vec<SingleAliasInvocation>,
) {
    for statement in statements {
        if statement.kind != RuleStatementKind::KeyValue {
            continue;
        }
        let Some(key) = &statement.key else {
            continue;
        };
        let nested_subtype = subtype_name(statement.key.as_deref());
        let mut child_path = path.to_vec();
        if nested_subtype.is_none() {
            child_path.push(key.clone());
        }

        if let RuleExpression::Scalar(_) = statement.value {
            for spec in extract_value_specs(&statement.value) {
                if let RuleValueSpec::SingleAliasRightRef { name } = spec {
                    out.push(SingleAliasInvocation {
                        alias_name: name,
                        field_path: child_path.clone(),
                        required_subtype: subtype.cloned(),
                    });
                }
            }
        }

        if let Some(block) = statement.value.as_block() {
            collect_single_alias_invocations(
                block,
                &child_path,
                nested_subtype.as_ref().or(subtype),
                out,
            );
        }
    }
}

fn dedup_invocations(invocations: &mut Vec<AliasInvocation>) {
    let mut seen = Vec::new();
    invocations.retain(|invocation| {
        let key = (
            invocation.family.clone(),
            invocation.parent_path.clone(),
            invocation.required_subtype.clone(),
        );
        if seen.contains(&key) {
            false
        } else {
            seen.push(key);
            true
        }
    });
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
    fn families_pool_their_members() {
        let graph = graph(
            "alias[effect:add_gold] = { amount = int }\n\
             alias[effect:remove_gold] = { amount = int }\n\
             alias[trigger:has_gold] = bool\n",
        );
        let members = build_alias_members_by_family(&graph);
        let effect = members.get("effect").expect("effect family");
        assert!(effect.contains("add_gold"));
        assert!(effect.contains("remove_gold"));
        assert_eq!(members.get("trigger").map(MemberSet::len), Some(1));
    }

    #[test]
    fn alias_definitions_merge_repeats() {
        let graph = graph(
            "alias[effect:add_gold] = { amount = int }\n\
             alias[effect:add_gold] = { target = scalar }\n",
        );
        let definitions = build_alias_definitions_by_family(&graph);
        let add_gold = &definitions["effect"]["add_gold"];
        assert!(add_gold.field_constraints.contains_key("amount"));
        assert!(add_gold.field_constraints.contains_key("target"));
    }

    #[test]
    fn single_alias_definitions_and_expansion() {
        let graph = graph(
            "single_alias[clause] = { ok = bool }\n\
             technology = { check = single_alias_right[clause] }\n",
        );
        let definitions = build_single_alias_definitions(&graph);
        assert!(definitions["clause"].field_constraints.contains_key("ok"));

        let invocations = build_single_alias_invocations_by_object(&graph);
        let sites = &invocations["technology"];
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].alias_name, "clause");
        assert_eq!(
            sites[0]
                .field_path
                .iter()
                .map(EcoString::as_str)
                .collect::<Vec<_>>(),
            vec!["technology", "check"]
        );
    }

    #[test]
    fn alias_invocation_sites_require_matching_family() {
        let graph = graph(
            "technology = {\n  alias_name[modifier] = alias_match_left[modifier]\n  alias_name[effect] = alias_match_left[other]\n}\n",
        );
        let invocations = build_alias_invocations_by_object(&graph);
        let sites = &invocations["technology"];
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].family, "modifier");
    }

    #[test]
    fn subtype_gated_invocations_record_the_subtype() {
        let graph = graph(
            "technology = {\n  subtype[naval] = {\n    alias_name[modifier] = alias_match_left[modifier]\n  }\n}\n",
        );
        let invocations = build_alias_invocations_by_object(&graph);
        let sites = &invocations["technology"];
        assert_eq!(sites[0].required_subtype.as_deref(), Some("naval"));
    }

    #[test]
    fn localisation_templates_with_required_flag() {
        let graph = graph(
            "types = {\n  type[focus] = {\n    path = \"game/common\"\n    localisation = {\n\
             \x20     ## required\n      name = \"$\"\n      desc = \"$_desc\"\n\
             \x20     subtype[special] = {\n        extra = \"$_extra\"\n      }\n    }\n  }\n}\n",
        );
        let templates = build_type_localisation_templates_by_type(&graph);
        let focus = &templates["focus"];
        assert_eq!(focus.len(), 3);
        assert!(focus[0].required);
        assert!(!focus[1].required);
        assert_eq!(focus[2].subtype_name.as_deref(), Some("special"));
    }

    #[test]
    fn expanded_field_constraints_inline_single_aliases() {
        let graph = graph(
            "single_alias[weight_block] = int\n\
             technology = { weight = single_alias_right[weight_block] }\n",
        );
        let constraints = build_expanded_field_constraints(&graph);
        let weight = &constraints["technology"]["weight"];
        assert!(weight
            .specs
            .iter()
            .any(|spec| matches!(spec, RuleValueSpec::Primitive { .. })));
    }
}
