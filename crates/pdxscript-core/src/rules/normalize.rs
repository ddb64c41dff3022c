// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Normalization of raw rules IR into deterministic indexed IR.
//!
//! Two jobs:
//!
//! 1. Parse the raw `##` options into the typed [`RuleMetadata`] fields
//!    (`cardinality`, `scope`, `push_scope`, `replace_scope`, `severity`,
//!    `error_if_only_match`) and mark `==` declarations as comparisons.
//! 2. Index every keyed statement with a category, its bracket
//!    family/argument, and a `key#occurrence` declaration path, then order
//!    the index deterministically so downstream artifacts are stable
//!    across runs.

use std::collections::BTreeSet;
use std::sync::Arc;

use ecow::EcoString;
use indexmap::IndexMap;

use super::ir::{
    IndexedRuleStatement, RuleCardinality, RuleCategory, RuleExpression, RuleFileIR, RuleMetadata,
    RuleScopeReplacement, RuleSetIR, RuleStatement, RuleStatementKind,
};

const SECTION_KEYS: &[&str] = &[
    "types",
    "enums",
    "values",
    "links",
    "scopes",
    "folders",
    "modifiers",
    "modifier_categories",
    "localisation_commands",
    "list_merge_optimisations",
];

/// Normalizes parsed rule files into a deterministic indexed ruleset.
#[must_use]
pub fn normalize_ruleset(files: Vec<RuleFileIR>) -> RuleSetIR {
    let normalized: Vec<RuleFileIR> = files
        .into_iter()
        .map(|file| RuleFileIR {
            path: file.path,
            statements: file
                .statements
                .iter()
                .map(|statement| Arc::new(normalize_statement(statement)))
                .collect(),
            diagnostics: file.diagnostics,
        })
        .collect();

    let mut indexed = Vec::new();
    for file in &normalized {
        index_statement_list(&file.statements, &[], &mut indexed);
    }

    indexed.sort_by(|a, b| {
        (
            a.category,
            a.source_path.as_str(),
            a.span.start(),
            a.span.end(),
            a.key.as_str(),
        )
            .cmp(&(
                b.category,
                b.source_path.as_str(),
                b.span.start(),
                b.span.end(),
                b.key.as_str(),
            ))
    });

    RuleSetIR {
        files: normalized,
        indexed,
    }
}

fn normalize_statement(statement: &RuleStatement) -> RuleStatement {
    let mut metadata = normalize_metadata(&statement.metadata);
    if statement.operator.as_deref() == Some("==") {
        metadata.comparison = true;
    }

    let value = match &statement.value {
        RuleExpression::Block(block) => RuleExpression::Block(
            block
                .iter()
                .map(|child| Arc::new(normalize_statement(child)))
                .collect(),
        ),
        RuleExpression::TaggedBlock { tag, block } => RuleExpression::TaggedBlock {
            tag: tag.clone(),
            block: block
                .iter()
                .map(|child| Arc::new(normalize_statement(child)))
                .collect(),
        },
        other => other.clone(),
    };

    RuleStatement {
        source_path: statement.source_path.clone(),
        span: statement.span,
        kind: statement.kind,
        key: statement.key.clone(),
        operator: statement.operator.clone(),
        value,
        metadata,
    }
}

fn normalize_metadata(metadata: &RuleMetadata) -> RuleMetadata {
    let mut normalized = RuleMetadata {
        documentation: metadata.documentation.clone(),
        options: metadata.options.clone(),
        ..RuleMetadata::default()
    };
    let mut flags = BTreeSet::new();

    for option in &metadata.options {
        let key = option.key.to_ascii_lowercase();
        let Some(value) = option.value.as_deref() else {
            flags.insert(option.key.clone());
            continue;
        };
        match key.as_str() {
            "cardinality" => normalized.cardinality = parse_cardinality(value),
            "scope" | "scopes" => normalized.scope = Some(parse_value_list(value)),
            "push_scope" => normalized.push_scope = Some(parse_value_list(value)),
            "replace_scope" | "replace_scopes" => {
                normalized.replace_scope = parse_replace_scope(value);
            }
            "severity" => normalized.severity = Some(EcoString::from(value)),
            "error_if_only_match" => {
                normalized.error_if_only_match = Some(EcoString::from(strip_quotes(value)));
            }
            _ => {}
        }
    }

    normalized.flags = flags;
    normalized
}

fn parse_cardinality(value: &str) -> Option<RuleCardinality> {
    let mut raw = value.trim();
    let soft_min = raw.starts_with('~');
    if soft_min {
        raw = raw[1..].trim_start();
    }
    let (min_text, max_text) = raw.split_once("..")?;

    let (min, min_unbounded) = parse_bound(min_text);
    let (max, max_unbounded) = parse_bound(max_text);
    Some(RuleCardinality {
        min,
        max,
        soft_min,
        min_unbounded,
        max_unbounded,
    })
}

fn parse_bound(text: &str) -> (Option<u32>, bool) {
    let lowered = text.trim().to_ascii_lowercase();
    if matches!(lowered.as_str(), "inf" | "+inf" | "-inf") {
        return (None, true);
    }
    (lowered.parse().ok(), false)
}

fn parse_value_list(value: &str) -> Vec<EcoString> {
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

fn parse_replace_scope(value: &str) -> Option<Vec<RuleScopeReplacement>> {
    let inner = value.trim().strip_prefix('{')?.strip_suffix('}')?;
    // Space out `a=b` spellings so the pairs split uniformly.
    let spaced = inner.replace('=', " = ");
    let tokens: Vec<&str> = spaced.split_whitespace().collect();

    let mut replacements = Vec::new();
    let mut i = 0;
    while i + 3 <= tokens.len() {
        if tokens[i + 1] == "=" {
            replacements.push(RuleScopeReplacement {
                source: EcoString::from(tokens[i]),
                target: EcoString::from(tokens[i + 2]),
            });
            i += 3;
        } else {
            i += 1;
        }
    }

    if replacements.is_empty() {
        None
    } else {
        Some(replacements)
    }
}

fn strip_quotes(value: &str) -> &str {
    let trimmed = value.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed)
}

fn index_statement_list(
    statements: &[Arc<RuleStatement>],
    parent_path: &[EcoString],
    indexed: &mut Vec<IndexedRuleStatement>,
) {
    let mut sibling_counts: IndexMap<EcoString, usize> = IndexMap::new();

    for statement in statements {
        let label = statement
            .key
            .clone()
            .unwrap_or_else(|| EcoString::from(statement_kind_label(statement.kind)));
        let slot = sibling_counts.entry(label.clone()).or_insert(0);
        let occurrence = *slot;
        *slot += 1;

        let mut declaration_path = parent_path.to_vec();
        declaration_path.push(EcoString::from(format!("{label}#{occurrence}")));

        if let Some(key) = &statement.key {
            let (family, argument) = parse_bracket_key_pattern(key);
            let category = infer_category(key, family.as_deref());
            indexed.push(IndexedRuleStatement {
                category,
                source_path: statement.source_path.clone(),
                span: statement.span,
                key: key.clone(),
                family,
                argument,
                declaration_path: declaration_path.clone(),
                statement: Arc::clone(statement),
            });
        }

        if let Some(block) = statement.value.as_block() {
            index_statement_list(block, &declaration_path, indexed);
        }
    }
}

fn statement_kind_label(kind: RuleStatementKind) -> &'static str {
    match kind {
        RuleStatementKind::KeyValue => "key_value",
        RuleStatementKind::Value => "value",
        RuleStatementKind::Error => "error",
    }
}

/// Splits `family[argument]` keys; returns `(None, None)` otherwise.
#[must_use]
pub fn parse_bracket_key_pattern(key: &str) -> (Option<EcoString>, Option<EcoString>) {
    let Some(open) = key.find('[') else {
        return (None, None);
    };
    let Some(rest) = key[open + 1..].strip_suffix(']') else {
        return (None, None);
    };
    let family = key[..open].trim();
    let argument = rest.trim();
    (
        Some(EcoString::from(family)).filter(|f| !f.is_empty()),
        Some(EcoString::from(argument)).filter(|a| !a.is_empty()),
    )
}

fn infer_category(key: &str, family: Option<&str>) -> RuleCategory {
    if let Some(family) = family {
        return match family {
            "alias" => RuleCategory::Alias,
            "single_alias" => RuleCategory::SingleAlias,
            "type" => RuleCategory::Type,
            "enum" => RuleCategory::Enum,
            "complex_enum" => RuleCategory::ComplexEnum,
            "value" => RuleCategory::Value,
            "value_set" => RuleCategory::ValueSet,
            _ => RuleCategory::Pattern,
        };
    }
    if SECTION_KEYS.contains(&key) {
        RuleCategory::Section
    } else {
        RuleCategory::Rule
    }
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse_rules_text;
    use super::*;

    fn ruleset(text: &str) -> RuleSetIR {
        normalize_ruleset(vec![parse_rules_text(text, "test.cwt")])
    }

    #[test]
    fn cardinality_parses_bounds_and_softness() {
        assert_eq!(
            parse_cardinality("1..1"),
            Some(RuleCardinality {
                min: Some(1),
                max: Some(1),
                ..RuleCardinality::default()
            })
        );
        assert_eq!(
            parse_cardinality("~1..inf"),
            Some(RuleCardinality {
                min: Some(1),
                max: None,
                soft_min: true,
                max_unbounded: true,
                ..RuleCardinality::default()
            })
        );
        assert_eq!(parse_cardinality("nonsense"), None);
    }

    #[test]
    fn typed_metadata_from_options() {
        let set = ruleset(
            "## cardinality = 0..5\n## push_scope = country\n## severity = warning\nfield = int\n",
        );
        let metadata = &set.files[0].statements[0].metadata;
        assert_eq!(metadata.cardinality.unwrap().max, Some(5));
        assert_eq!(
            metadata.push_scope.as_deref(),
            Some(&[EcoString::from("country")][..])
        );
        assert_eq!(metadata.severity.as_deref(), Some("warning"));
    }

    #[test]
    fn replace_scope_parses_pairs() {
        let set = ruleset("## replace_scope = { this = planet root = country }\nfield = {}\n");
        let replace = set.files[0].statements[0]
            .metadata
            .replace_scope
            .as_ref()
            .expect("replace scope");
        assert_eq!(replace.len(), 2);
        assert_eq!(replace[0].source, "this");
        assert_eq!(replace[0].target, "planet");
        assert_eq!(replace[1].source, "root");
        assert_eq!(replace[1].target, "country");
    }

    #[test]
    fn comparison_marker_from_double_equals() {
        let set = ruleset("factor == 1.0\n");
        assert!(set.files[0].statements[0].metadata.comparison);
    }

    #[test]
    fn categories_and_declaration_paths() {
        let set = ruleset(
            "types = {\n  type[technology] = {}\n}\nalias[effect:add_gold] = {}\ntechnology = { a = 1 a = 2 }\n",
        );

        let type_entry = set
            .indexed
            .iter()
            .find(|item| item.category == RuleCategory::Type)
            .expect("type entry");
        assert_eq!(type_entry.argument.as_deref(), Some("technology"));
        assert_eq!(
            type_entry
                .declaration_path
                .iter()
                .map(EcoString::as_str)
                .collect::<Vec<_>>(),
            vec!["types#0", "type[technology]#0"]
        );

        let alias_entry = set
            .indexed
            .iter()
            .find(|item| item.category == RuleCategory::Alias)
            .expect("alias entry");
        assert_eq!(alias_entry.argument.as_deref(), Some("effect:add_gold"));

        // Repeated keys get distinct occurrence suffixes.
        let a_paths: Vec<String> = set
            .indexed
            .iter()
            .filter(|item| item.key == "a")
            .map(|item| item.declaration_path.last().unwrap().to_string())
            .collect();
        assert_eq!(a_paths, vec!["a#0", "a#1"]);
    }

    #[test]
    fn index_order_is_deterministic() {
        let text = "b = {}\na = {}\ntypes = { type[x] = {} }\n";
        let first = ruleset(text);
        let second = ruleset(text);
        let keys =
            |set: &RuleSetIR| set.indexed.iter().map(|i| i.key.clone()).collect::<Vec<_>>();
        assert_eq!(keys(&first), keys(&second));
    }
}
