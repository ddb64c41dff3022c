// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Type-member discovery from `type[...]` declarations.
//!
//! A CWTools type declaration names where its instances live (`path`,
//! `path_file`, `path_extension`) and how each instance is named
//! (`name_field`, `skip_root_key`, `type_per_file`). Discovery scans
//! project file texts through those filters and produces the set of known
//! IDs per type — the sets `<type>` references are checked against.
//!
//! All path filters match case-insensitively and sets are ordered, so the
//! artifacts are deterministic for fixed inputs.

use std::collections::BTreeSet;

use ecow::EcoString;
use indexmap::IndexMap;

use crate::ast::{AstKeyValue, AstValue};
use crate::pipeline::{parse_with_options, ParseOptions};

use super::adapters::common::{find_scalar_child, normalize_path, strip_game_prefix};
use super::ir::RuleExpression;
use super::schema_graph::SchemaGraph;
use super::semantics::strip_quotes;

/// Normalized subset of a `type[...]` declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeDefinition {
    pub type_key: EcoString,
    pub path: Option<EcoString>,
    pub name_field: Option<EcoString>,
    pub skip_root_key: Option<EcoString>,
    pub path_strict: bool,
    pub path_file: Option<EcoString>,
    pub path_extension: Option<EcoString>,
    pub type_per_file: bool,
    pub starts_with: Option<EcoString>,
    pub unique: bool,
    pub severity: Option<EcoString>,
}

/// Extracts normalized type definitions from the schema graph.
#[must_use]
pub fn extract_type_definitions(graph: &SchemaGraph) -> IndexMap<EcoString, Vec<TypeDefinition>> {
    let mut by_key: IndexMap<EcoString, Vec<TypeDefinition>> = IndexMap::new();

    for (type_key, declarations) in &graph.types_by_key {
        let bucket = by_key.entry(type_key.clone()).or_default();
        for declaration in declarations {
            let RuleExpression::Block(block) = &declaration.statement.value else {
                continue;
            };
            bucket.push(TypeDefinition {
                type_key: type_key.clone(),
                path: find_scalar_child(block, "path"),
                name_field: find_scalar_child(block, "name_field"),
                skip_root_key: find_scalar_child(block, "skip_root_key"),
                path_strict: find_scalar_child(block, "path_strict").as_deref() == Some("yes"),
                path_file: find_scalar_child(block, "path_file"),
                path_extension: find_scalar_child(block, "path_extension"),
                type_per_file: find_scalar_child(block, "type_per_file").as_deref() == Some("yes"),
                starts_with: find_scalar_child(block, "starts_with"),
                unique: find_scalar_child(block, "unique").as_deref() == Some("yes"),
                severity: find_scalar_child(block, "severity"),
            });
        }
    }

    by_key
}

/// Discovers member IDs for each type by scanning project file texts.
#[must_use]
pub fn build_type_memberships_from_file_texts(
    file_texts_by_path: &IndexMap<String, String>,
    type_definitions_by_key: &IndexMap<EcoString, Vec<TypeDefinition>>,
) -> IndexMap<EcoString, BTreeSet<EcoString>> {
    let mut members: IndexMap<EcoString, BTreeSet<EcoString>> = IndexMap::new();

    for (type_key, definitions) in type_definitions_by_key {
        let bucket = members.entry(type_key.clone()).or_default();
        for definition in definitions {
            for (file_path, text) in file_texts_by_path {
                if !matches_type_path(file_path, definition) {
                    continue;
                }
                discover_members_in_file(file_path, text, definition, bucket);
            }
        }
    }

    members.retain(|_, values| !values.is_empty());
    members
}

fn matches_type_path(file_path: &str, definition: &TypeDefinition) -> bool {
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
    let Some(path) = &definition.path else {
        return true;
    };

    let declared = strip_game_prefix(&normalize_path(path).to_ascii_lowercase())
        .trim_end_matches('/')
        .to_string();
    if declared.is_empty() {
        return true;
    }
    if definition.path_strict {
        return dirname(&normalized) == declared;
    }
    normalized == declared || normalized.starts_with(&format!("{declared}/"))
}

fn discover_members_in_file(
    file_path: &str,
    text: &str,
    definition: &TypeDefinition,
    out: &mut BTreeSet<EcoString>,
) {
    if definition.type_per_file {
        let normalized_path = normalize_path(file_path);
        let stem = basename(&normalized_path);
        let stem = stem.rsplit_once('.').map_or(stem, |(name, _)| name);
        if accepts_name(definition, stem) {
            out.insert(EcoString::from(stem));
        }
        return;
    }

    let parsed = parse_with_options(text, ParseOptions::permissive());
    let top_level: Vec<&AstKeyValue> = parsed
        .ast_root()
        .statements
        .iter()
        .filter_map(crate::ast::AstStatement::as_key_value)
        .collect();

    for entity in select_entities(&top_level, definition.skip_root_key.as_deref()) {
        let Some(name) = extract_entity_name(entity, definition.name_field.as_deref()) else {
            continue;
        };
        if accepts_name(definition, &name) {
            out.insert(EcoString::from(name.as_str()));
        }
    }
}

fn accepts_name(definition: &TypeDefinition, name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    definition
        .starts_with
        .as_ref()
        .is_none_or(|prefix| name.starts_with(prefix.as_str()))
}

fn select_entities<'a>(
    top_level: &[&'a AstKeyValue],
    skip_root_key: Option<&str>,
) -> Vec<&'a AstKeyValue> {
    let Some(skip_root_key) = skip_root_key else {
        return top_level.to_vec();
    };

    let match_any = skip_root_key.eq_ignore_ascii_case("any");
    let mut selected = Vec::new();
    for statement in top_level {
        if !match_any && statement.key.value_text() != skip_root_key {
            continue;
        }
        if let Some(AstValue::Block(block)) = statement.value.as_ref() {
            if block.is_object_like() {
                selected.extend(
                    block
                        .statements
                        .iter()
                        .filter_map(crate::ast::AstStatement::as_key_value),
                );
            }
        }
    }
    selected
}

fn extract_entity_name(entity: &AstKeyValue, name_field: Option<&str>) -> Option<String> {
    let Some(name_field) = name_field else {
        let name = entity.key.value_text();
        return Some(name.to_string()).filter(|n| !n.is_empty());
    };

    let Some(AstValue::Block(block)) = entity.value.as_ref() else {
        return None;
    };
    if !block.is_object_like() {
        return None;
    }
    for child in &block.statements {
        let Some(key_value) = child.as_key_value() else {
            continue;
        };
        if key_value.key.value_text() != name_field {
            continue;
        }
        let scalar = key_value.value.as_ref()?.as_scalar()?;
        let name = strip_quotes(scalar.value_text()).to_string();
        return Some(name).filter(|n| !n.is_empty());
    }
    None
}

fn basename(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

fn dirname(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

#[cfg(test)]
mod tests {
    use crate::rules::normalize::normalize_ruleset;
    use crate::rules::parser::parse_rules_text;
    use crate::rules::schema_graph::build_schema_graph;

    use super::*;

    fn definitions(schema_text: &str) -> IndexMap<EcoString, Vec<TypeDefinition>> {
        let ruleset = normalize_ruleset(vec![parse_rules_text(schema_text, "types.cwt")]);
        extract_type_definitions(&build_schema_graph("test", ruleset))
    }

    fn texts(entries: &[(&str, &str)]) -> IndexMap<String, String> {
        entries
            .iter()
            .map(|(path, text)| ((*path).to_string(), (*text).to_string()))
            .collect()
    }

    #[test]
    fn discovers_members_by_top_level_keys() {
        let defs = definitions(
            "types = {\n  type[technology] = {\n    path = \"game/common/technologies\"\n  }\n}\n",
        );
        let memberships = build_type_memberships_from_file_texts(
            &texts(&[
                (
                    "common/technologies/infantry.txt",
                    "infantry_weapons = {}\nbasic_train = {}\n",
                ),
                ("common/units/foo.txt", "not_a_tech = {}\n"),
            ]),
            &defs,
        );
        let technology = memberships.get("technology").expect("technology");
        assert!(technology.contains("infantry_weapons"));
        assert!(technology.contains("basic_train"));
        assert!(!technology.contains("not_a_tech"));
    }

    #[test]
    fn path_matching_is_case_insensitive() {
        let defs = definitions(
            "types = {\n  type[decision] = {\n    path = \"game/common/decisions\"\n  }\n}\n",
        );
        let memberships = build_type_memberships_from_file_texts(
            &texts(&[("Common/Decisions/a.txt", "my_decision = {}\n")]),
            &defs,
        );
        assert!(memberships.get("decision").unwrap().contains("my_decision"));
    }

    #[test]
    fn name_field_and_skip_root_key() {
        let defs = definitions(
            "types = {\n  type[wargoal] = {\n    path = \"game/common/wargoals\"\n    skip_root_key = wargoal_types\n    name_field = name\n  }\n}\n",
        );
        let memberships = build_type_memberships_from_file_texts(
            &texts(&[(
                "common/wargoals/all.txt",
                "wargoal_types = {\n  wg = { name = \"take_state\" }\n}\n",
            )]),
            &defs,
        );
        assert!(memberships.get("wargoal").unwrap().contains("take_state"));
    }

    #[test]
    fn type_per_file_uses_file_stem() {
        let defs = definitions(
            "types = {\n  type[oob] = {\n    path = \"game/history/units\"\n    type_per_file = yes\n  }\n}\n",
        );
        let memberships = build_type_memberships_from_file_texts(
            &texts(&[("history/units/GER_1936.txt", "division = {}\n")]),
            &defs,
        );
        assert!(memberships.get("oob").unwrap().contains("GER_1936"));
    }

    #[test]
    fn starts_with_filters_names() {
        let defs = definitions(
            "types = {\n  type[focus] = {\n    path = \"game/common/focuses\"\n    starts_with = GER_\n  }\n}\n",
        );
        let memberships = build_type_memberships_from_file_texts(
            &texts(&[("common/focuses/a.txt", "GER_army = {}\nENG_navy = {}\n")]),
            &defs,
        );
        let focus = memberships.get("focus").unwrap();
        assert!(focus.contains("GER_army"));
        assert!(!focus.contains("ENG_navy"));
    }

    #[test]
    fn empty_path_definition_matches_everything_under_root() {
        let defs = definitions("types = {\n  type[any_file] = {}\n}\n");
        let memberships = build_type_memberships_from_file_texts(
            &texts(&[("anywhere/file.txt", "thing = {}\n")]),
            &defs,
        );
        assert!(memberships.get("any_file").unwrap().contains("thing"));
    }
}
