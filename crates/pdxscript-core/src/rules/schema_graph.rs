// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Cross-file schema graph over normalized rules IR.
//!
//! The graph is an arena of declarations keyed by stable names; aliases,
//! subtypes, and complex enums reference each other *by name*, never by
//! pointer, so the cyclic shapes CWTools configs use (`any_trigger`
//! referring back into the trigger family) stay representable. Built once
//! per schema load, immutable afterwards, shared by reference.

use std::sync::Arc;

use ecow::EcoString;
use indexmap::IndexMap;

use super::ir::{IndexedRuleStatement, RuleCategory, RuleSetIR, RuleStatement, RuleStatementKind};

/// Resolved cross-file schema index for one ruleset root.
#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    pub source_root: EcoString,
    pub ruleset: RuleSetIR,
    pub by_category: IndexMap<RuleCategory, Vec<IndexedRuleStatement>>,
    pub types_by_key: IndexMap<EcoString, Vec<IndexedRuleStatement>>,
    pub enums_by_key: IndexMap<EcoString, Vec<IndexedRuleStatement>>,
    pub aliases_by_key: IndexMap<EcoString, Vec<IndexedRuleStatement>>,
    pub single_aliases_by_key: IndexMap<EcoString, Vec<IndexedRuleStatement>>,
    pub values_by_key: IndexMap<EcoString, Vec<IndexedRuleStatement>>,
    pub value_sets_by_key: IndexMap<EcoString, Vec<IndexedRuleStatement>>,
    pub sections_by_key: IndexMap<EcoString, Vec<IndexedRuleStatement>>,
    /// Concrete top-level object rules (`technology = { ... }`).
    pub top_level_rule_statements: Vec<Arc<RuleStatement>>,
}

impl SchemaGraph {
    /// Declarations in one category, in deterministic index order.
    #[must_use]
    pub fn category(&self, category: RuleCategory) -> &[IndexedRuleStatement] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Builds the schema graph from a normalized ruleset.
#[must_use]
pub fn build_schema_graph(source_root: impl Into<EcoString>, ruleset: RuleSetIR) -> SchemaGraph {
    let mut by_category: IndexMap<RuleCategory, Vec<IndexedRuleStatement>> = IndexMap::new();
    for item in &ruleset.indexed {
        by_category
            .entry(item.category)
            .or_default()
            .push(item.clone());
    }

    let group = |category: RuleCategory| -> IndexMap<EcoString, Vec<IndexedRuleStatement>> {
        let mut grouped: IndexMap<EcoString, Vec<IndexedRuleStatement>> = IndexMap::new();
        for item in by_category.get(&category).into_iter().flatten() {
            grouped.entry(item.name().clone()).or_default().push(item.clone());
        }
        grouped
    };

    let types_by_key = group(RuleCategory::Type);
    let enums_by_key = group(RuleCategory::Enum);
    let aliases_by_key = group(RuleCategory::Alias);
    let single_aliases_by_key = group(RuleCategory::SingleAlias);
    let values_by_key = group(RuleCategory::Value);
    let value_sets_by_key = group(RuleCategory::ValueSet);
    let sections_by_key = group(RuleCategory::Section);

    let top_level_rule_statements = by_category
        .get(&RuleCategory::Rule)
        .into_iter()
        .flatten()
        .filter(|item| item.declaration_path.len() == 1)
        .filter(|item| item.statement.kind == RuleStatementKind::KeyValue)
        .filter(|item| item.statement.value.as_block().is_some())
        .map(|item| Arc::clone(&item.statement))
        .collect();

    SchemaGraph {
        source_root: source_root.into(),
        ruleset,
        by_category,
        types_by_key,
        enums_by_key,
        aliases_by_key,
        single_aliases_by_key,
        values_by_key,
        value_sets_by_key,
        sections_by_key,
        top_level_rule_statements,
    }
}

#[cfg(test)]
mod tests {
    use super::super::normalize::normalize_ruleset;
    use super::super::parser::parse_rules_text;
    use super::*;

    fn graph(text: &str) -> SchemaGraph {
        let ruleset = normalize_ruleset(vec![parse_rules_text(text, "test.cwt")]);
        build_schema_graph("test", ruleset)
    }

    #[test]
    fn groups_declarations_by_name() {
        let graph = graph(
            "types = {\n  type[technology] = { path = \"game/common\" }\n}\n\
             enums = {\n  enum[levels] = { 1 2 3 }\n}\n\
             alias[effect:add_gold] = { amount = int }\n\
             single_alias[clause] = { ok = bool }\n\
             technology = { level = int }\n",
        );

        assert!(graph.types_by_key.contains_key("technology"));
        assert!(graph.enums_by_key.contains_key("levels"));
        assert!(graph.aliases_by_key.contains_key("effect:add_gold"));
        assert!(graph.single_aliases_by_key.contains_key("clause"));
        assert_eq!(graph.top_level_rule_statements.len(), 1);
        assert_eq!(
            graph.top_level_rule_statements[0].key.as_deref(),
            Some("technology")
        );
    }

    #[test]
    fn sections_are_indexed_by_key() {
        let graph = graph("links = {\n  owner = { output_scope = country }\n}\n");
        assert!(graph.sections_by_key.contains_key("links"));
        assert!(graph.top_level_rule_statements.is_empty());
    }

    #[test]
    fn nested_rules_are_not_top_level() {
        let graph = graph("outer = { inner = { leaf = bool } }\n");
        assert_eq!(graph.top_level_rule_statements.len(), 1);
    }
}
