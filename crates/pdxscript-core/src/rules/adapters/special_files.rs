// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Providers for the special schema files: `scopes.cwt`, `links.cwt`,
//! `modifiers.cwt` + `modifier_categories.cwt`, `localisation_commands.cwt`,
//! and `values.cwt`.
//!
//! Each provider reads one special top-level section out of the schema
//! graph and produces a deterministic artifact for the type-check services.

use std::collections::BTreeSet;

use ecow::EcoString;
use indexmap::IndexMap;

use crate::rules::schema_graph::SchemaGraph;

use super::common::{extract_scope_list, find_scalar_child, parse_bracket_key};
use super::models::{
    LinkDefinition, LinkType, LocalisationCommandDefinition, MemberSet, ModifierDefinition,
};

/// Scope names and their alias relations from the `scopes` section.
#[derive(Debug, Clone, Default)]
pub struct ScopeCatalog {
    /// Canonical scope names, lowercased.
    pub names: MemberSet,
    /// Alias → canonical name (e.g. `countries` → `country`).
    pub aliases: IndexMap<EcoString, EcoString>,
}

impl ScopeCatalog {
    /// Resolves a scope name or alias to its canonical name.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<EcoString> {
        let lowered = name.to_ascii_lowercase();
        if self.names.contains(lowered.as_str()) {
            return Some(EcoString::from(lowered));
        }
        self.aliases.get(lowered.as_str()).cloned()
    }

    /// True if the name (or the wildcard `any`/`all`) names a known scope.
    #[must_use]
    pub fn is_known(&self, name: &str) -> bool {
        let lowered = name.to_ascii_lowercase();
        lowered == "any" || lowered == "all" || self.resolve(&lowered).is_some()
    }
}

/// Builds the scope catalog from the `scopes` section.
#[must_use]
pub fn build_scope_catalog(graph: &SchemaGraph) -> ScopeCatalog {
    let mut catalog = ScopeCatalog::default();

    for section in graph.sections_by_key.get("scopes").into_iter().flatten() {
        let Some(block) = section.statement.value.as_block() else {
            continue;
        };
        for child in block {
            let Some(display_name) = &child.key else {
                continue;
            };
            let Some(scope_block) = child.value.as_block() else {
                continue;
            };
            let aliases = scope_block
                .iter()
                .find(|entry| entry.key.as_deref() == Some("aliases"))
                .map(|entry| extract_scope_list(entry))
                .unwrap_or_default();

            // The first alias is the canonical script name; the display
            // key itself is also accepted.
            let canonical = aliases
                .first()
                .cloned()
                .unwrap_or_else(|| EcoString::from(display_name.to_ascii_lowercase()));
            catalog.names.insert(canonical.clone());
            catalog
                .aliases
                .insert(EcoString::from(display_name.to_ascii_lowercase()), canonical.clone());
            for alias in aliases {
                catalog.aliases.insert(alias, canonical.clone());
            }
        }
    }

    catalog
}

/// Builds the link table from the `links` section.
#[must_use]
pub fn build_link_definitions(graph: &SchemaGraph) -> IndexMap<EcoString, LinkDefinition> {
    let mut links: IndexMap<EcoString, LinkDefinition> = IndexMap::new();

    for section in graph.sections_by_key.get("links").into_iter().flatten() {
        let Some(block) = section.statement.value.as_block() else {
            continue;
        };
        for child in block {
            let Some(name) = child.key.as_deref() else {
                continue;
            };
            let Some(link_block) = child.value.as_block() else {
                continue;
            };
            let name = EcoString::from(name.trim());
            if name.is_empty() {
                continue;
            }

            let input_scopes = link_block
                .iter()
                .find(|entry| entry.key.as_deref() == Some("input_scopes"))
                .map(|entry| extract_scope_list(entry))
                .unwrap_or_default();
            let data_sources = link_block
                .iter()
                .filter(|entry| entry.key.as_deref() == Some("data_source"))
                .filter_map(|entry| entry.value.as_scalar())
                .map(|text| EcoString::from(text.trim()))
                .filter(|text| !text.is_empty())
                .collect();

            links.insert(
                name.clone(),
                LinkDefinition {
                    name,
                    input_scopes,
                    output_scope: find_scalar_child(link_block, "output_scope")
                        .map(|scope| EcoString::from(scope.to_ascii_lowercase())),
                    prefix: find_scalar_child(link_block, "prefix"),
                    from_data: find_scalar_child(link_block, "from_data").as_deref() == Some("yes"),
                    data_sources,
                    link_type: find_scalar_child(link_block, "type")
                        .map(|text| LinkType::parse(&text))
                        .unwrap_or_default(),
                },
            );
        }
    }

    links
}

/// Builds the modifier table from the `modifiers` and
/// `modifier_categories` sections.
#[must_use]
pub fn build_modifier_definitions(graph: &SchemaGraph) -> IndexMap<EcoString, ModifierDefinition> {
    let scopes_by_category = collect_modifier_category_scopes(graph);
    let mut modifiers: IndexMap<EcoString, ModifierDefinition> = IndexMap::new();

    for section in graph.sections_by_key.get("modifiers").into_iter().flatten() {
        let Some(block) = section.statement.value.as_block() else {
            continue;
        };
        for child in block {
            let Some(name) = child.key.as_deref() else {
                continue;
            };
            let name = EcoString::from(name.trim());
            if name.is_empty() {
                continue;
            }
            let category = child
                .value
                .as_scalar()
                .map(|text| EcoString::from(crate::rules::semantics::strip_quotes(text)))
                .filter(|text| !text.is_empty());
            let supported_scopes = category
                .as_ref()
                .and_then(|category| scopes_by_category.get(category))
                .cloned()
                .unwrap_or_default();
            modifiers.insert(
                name.clone(),
                ModifierDefinition {
                    name,
                    category,
                    supported_scopes,
                },
            );
        }
    }

    modifiers
}

/// Materialises templated modifiers from `type[...]` declarations.
///
/// A type block may declare `modifiers = { "$_attack" = category }`; every
/// discovered member of the type stamps the template.
#[must_use]
pub fn build_templated_modifier_definitions(
    graph: &SchemaGraph,
    type_memberships: &IndexMap<EcoString, BTreeSet<EcoString>>,
) -> IndexMap<EcoString, ModifierDefinition> {
    let scopes_by_category = collect_modifier_category_scopes(graph);
    let mut modifiers: IndexMap<EcoString, ModifierDefinition> = IndexMap::new();

    for (type_key, declarations) in &graph.types_by_key {
        let Some(members) = type_memberships.get(type_key) else {
            continue;
        };
        for declaration in declarations {
            let Some(block) = declaration.statement.value.as_block() else {
                continue;
            };
            for child in block {
                if child.key.as_deref() != Some("modifiers") {
                    continue;
                }
                let Some(templates) = child.value.as_block() else {
                    continue;
                };
                for template in templates {
                    let Some(raw_template) = template.key.as_deref() else {
                        continue;
                    };
                    let template_text = crate::rules::semantics::strip_quotes(raw_template);
                    if !template_text.contains('$') {
                        continue;
                    }
                    let category = template
                        .value
                        .as_scalar()
                        .map(|text| {
                            EcoString::from(crate::rules::semantics::strip_quotes(text))
                        })
                        .filter(|text| !text.is_empty());
                    let supported_scopes = category
                        .as_ref()
                        .and_then(|category| scopes_by_category.get(category))
                        .cloned()
                        .unwrap_or_default();
                    for member in members {
                        let name = EcoString::from(template_text.replace('$', member.as_str()));
                        modifiers.insert(
                            name.clone(),
                            ModifierDefinition {
                                name,
                                category: category.clone(),
                                supported_scopes: supported_scopes.clone(),
                            },
                        );
                    }
                }
            }
        }
    }

    modifiers
}

/// Builds the localisation command table.
#[must_use]
pub fn build_localisation_command_definitions(
    graph: &SchemaGraph,
) -> IndexMap<EcoString, LocalisationCommandDefinition> {
    let mut commands: IndexMap<EcoString, LocalisationCommandDefinition> = IndexMap::new();

    for section in graph
        .sections_by_key
        .get("localisation_commands")
        .into_iter()
        .flatten()
    {
        let Some(block) = section.statement.value.as_block() else {
            continue;
        };
        for child in block {
            let Some(name) = child.key.as_deref() else {
                continue;
            };
            let name = EcoString::from(name.trim());
            if name.is_empty() {
                continue;
            }
            let mut supported_scopes = extract_scope_list(child);
            if supported_scopes.is_empty() {
                supported_scopes = vec![EcoString::from("any")];
            }
            commands.insert(
                name.clone(),
                LocalisationCommandDefinition {
                    name,
                    supported_scopes,
                },
            );
        }
    }

    commands
}

/// Builds declared value-set memberships from the `values` section.
#[must_use]
pub fn build_values_memberships_by_key(graph: &SchemaGraph) -> IndexMap<EcoString, MemberSet> {
    let mut memberships: IndexMap<EcoString, MemberSet> = IndexMap::new();

    for section in graph.sections_by_key.get("values").into_iter().flatten() {
        let Some(block) = section.statement.value.as_block() else {
            continue;
        };
        for child in block {
            let Some(raw_key) = child.key.as_deref() else {
                continue;
            };
            let Some(value_key) = parse_bracket_key(raw_key, "value") else {
                continue;
            };
            let Some(values) = child.value.as_block() else {
                continue;
            };
            let bucket = memberships.entry(value_key).or_default();
            for leaf in values {
                if leaf.kind != crate::rules::ir::RuleStatementKind::Value {
                    continue;
                }
                let Some(text) = leaf.value.as_scalar() else {
                    continue;
                };
                let member = crate::rules::semantics::strip_quotes(text);
                if !member.is_empty() {
                    bucket.insert(EcoString::from(member));
                }
            }
        }
    }

    memberships
}

fn collect_modifier_category_scopes(graph: &SchemaGraph) -> IndexMap<EcoString, Vec<EcoString>> {
    let mut scopes_by_category: IndexMap<EcoString, Vec<EcoString>> = IndexMap::new();

    for section in graph
        .sections_by_key
        .get("modifier_categories")
        .into_iter()
        .flatten()
    {
        let Some(block) = section.statement.value.as_block() else {
            continue;
        };
        for category_entry in block {
            let Some(category) = category_entry.key.as_deref() else {
                continue;
            };
            let category = EcoString::from(category.trim());
            if category.is_empty() {
                continue;
            }
            let Some(category_block) = category_entry.value.as_block() else {
                continue;
            };
            let scopes = category_block
                .iter()
                .find(|entry| entry.key.as_deref() == Some("supported_scopes"))
                .map(|entry| extract_scope_list(entry))
                .unwrap_or_default();
            scopes_by_category.insert(category, scopes);
        }
    }

    scopes_by_category
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
    fn scope_catalog_resolves_aliases() {
        let graph = graph(
            "scopes = {\n  Country = {\n    aliases = { country countries }\n  }\n\
             \x20 State = {\n    aliases = { state }\n  }\n}\n",
        );
        let catalog = build_scope_catalog(&graph);
        assert!(catalog.names.contains("country"));
        assert_eq!(catalog.resolve("countries").as_deref(), Some("country"));
        assert_eq!(catalog.resolve("Country").as_deref(), Some("country"));
        assert!(catalog.is_known("any"));
        assert!(!catalog.is_known("planet"));
    }

    #[test]
    fn link_definitions_with_data_sources() {
        let graph = graph(
            "links = {\n  owner = {\n    input_scopes = { state }\n    output_scope = country\n  }\n\
             \x20 var = {\n    from_data = yes\n    prefix = var:\n    data_source = value[variable]\n\
             \x20   type = both\n    input_scopes = { country }\n    output_scope = country\n  }\n}\n",
        );
        let links = build_link_definitions(&graph);
        let owner = links.get("owner").expect("owner link");
        assert_eq!(owner.input_scopes, vec![EcoString::from("state")]);
        assert_eq!(owner.output_scope.as_deref(), Some("country"));
        assert_eq!(owner.link_type, LinkType::Scope);

        let var = links.get("var").expect("var link");
        assert!(var.from_data);
        assert_eq!(var.prefix.as_deref(), Some("var:"));
        assert_eq!(var.data_sources.len(), 1);
        assert!(var.link_type.allows_value());
        assert!(var.link_type.allows_scope());
    }

    #[test]
    fn modifier_scopes_come_from_categories() {
        let graph = graph(
            "modifier_categories = {\n  army = {\n    supported_scopes = { country unit_leader }\n  }\n}\n\
             modifiers = {\n  army_attack_factor = army\n  unknown_mod = navy\n}\n",
        );
        let modifiers = build_modifier_definitions(&graph);
        let attack = modifiers.get("army_attack_factor").expect("modifier");
        assert_eq!(attack.supported_scopes.len(), 2);
        assert!(modifiers.get("unknown_mod").unwrap().supported_scopes.is_empty());
    }

    #[test]
    fn templated_modifiers_stamp_type_members() {
        let graph = graph(
            "modifier_categories = {\n  unit = {\n    supported_scopes = { country }\n  }\n}\n\
             types = {\n  type[unit_type] = {\n    path = \"game/common/units\"\n\
             \x20   modifiers = {\n      \"$_attack\" = unit\n    }\n  }\n}\n",
        );
        let mut memberships = IndexMap::new();
        memberships.insert(
            EcoString::from("unit_type"),
            BTreeSet::from([EcoString::from("infantry")]),
        );
        let modifiers = build_templated_modifier_definitions(&graph, &memberships);
        let stamped = modifiers.get("infantry_attack").expect("templated modifier");
        assert_eq!(stamped.supported_scopes, vec![EcoString::from("country")]);
    }

    #[test]
    fn localisation_commands_default_to_any_scope() {
        let graph = graph(
            "localisation_commands = {\n  GetName = { country state }\n  Root = {}\n}\n",
        );
        let commands = build_localisation_command_definitions(&graph);
        assert_eq!(commands.get("GetName").unwrap().supported_scopes.len(), 2);
        assert_eq!(
            commands.get("Root").unwrap().supported_scopes,
            vec![EcoString::from("any")]
        );
    }

    #[test]
    fn declared_value_memberships() {
        let graph = graph("values = {\n  value[focus_flags] = {\n    flag_a\n    flag_b\n  }\n}\n");
        let memberships = build_values_memberships_by_key(&graph);
        let flags = memberships.get("focus_flags").expect("focus flags");
        assert!(flags.contains("flag_a"));
        assert!(flags.contains("flag_b"));
    }
}
