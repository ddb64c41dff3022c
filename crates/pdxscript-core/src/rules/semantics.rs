// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Semantic classification of rule right-hand sides.
//!
//! A rules scalar like `int[0..10]`, `enum[weight_or_base]`, or
//! `<technology>` is a *value spec*: a constraint the type checker applies
//! to script values at that position. This module parses scalar spec text
//! into [`RuleValueSpec`] and extracts per-field constraint maps from rule
//! blocks.

use ecow::EcoString;
use indexmap::IndexMap;

use super::ir::{RuleExpression, RuleMetadata, RuleStatement, RuleStatementKind};

/// Primitive value-type constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulePrimitive {
    Bool,
    /// `int` with an optional inclusive range argument.
    Int,
    /// `float` with an optional inclusive range argument.
    Float,
    Scalar,
    PercentageField,
    DateField,
    Localisation,
    LocalisationSynced,
    LocalisationInline,
    /// `filepath[prefix,.ext]`.
    Filepath,
    /// `icon[path]`.
    Icon,
    VariableField,
    IntVariableField,
    ValueField,
    IntValueField,
}

/// One parsed value spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleValueSpec {
    Primitive {
        primitive: RulePrimitive,
        argument: Option<EcoString>,
        raw: EcoString,
    },
    /// `enum[name]` — simple or complex enum membership.
    EnumRef { name: EcoString },
    /// `<type>` or `prefix_<type>_suffix` — type-member reference.
    TypeRef {
        type_key: EcoString,
        prefix: EcoString,
        suffix: EcoString,
    },
    /// `scope[name]` — scope compatibility.
    ScopeRef { scope: EcoString },
    /// `scope_field` — any scope-valued field.
    ScopeField,
    /// `event_target[name]`.
    EventTargetRef { name: EcoString },
    /// `value[name]` — value-set membership read.
    ValueRef { name: EcoString },
    /// `value_set[name]` — value-set membership write.
    ValueSetRef { name: EcoString },
    /// `alias_match_left[family]` — the family's members apply here.
    AliasMatchLeftRef { family: EcoString },
    /// `alias_name[family]` — a dynamic key drawn from the family.
    AliasNameRef { family: EcoString },
    /// `alias_keys_field[family]` — a value drawn from the family's keys.
    AliasKeysFieldRef { family: EcoString },
    /// `single_alias_right[name]` — inline the single alias here.
    SingleAliasRightRef { name: EcoString },
    /// A nested `{ ... }` rule block.
    Block,
    /// A tagged block, e.g. `colour = rgb { ... }`.
    TaggedBlock { tag: EcoString },
    Missing,
    Error,
    /// Anything unrecognised; treated as an opaque literal match.
    UnknownRef { raw: EcoString },
}

impl RuleValueSpec {
    /// A stable identity for deduplication.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        format!("{self:?}")
    }
}

/// Merged constraints for one field of one object.
#[derive(Debug, Clone, Default)]
pub struct RuleFieldConstraint {
    pub required: bool,
    pub specs: Vec<RuleValueSpec>,
    pub cardinality: Option<super::ir::RuleCardinality>,
    pub comparison: bool,
    pub error_if_only_match: Option<EcoString>,
}

impl RuleFieldConstraint {
    /// Merges another constraint for the same field into this one.
    pub fn merge(&mut self, other: RuleFieldConstraint) {
        self.required |= other.required;
        self.comparison |= other.comparison;
        if self.cardinality.is_none() {
            self.cardinality = other.cardinality;
        }
        if self.error_if_only_match.is_none() {
            self.error_if_only_match = other.error_if_only_match;
        }
        self.specs = merge_specs(std::mem::take(&mut self.specs), other.specs);
    }
}

/// Parses the value specs of one rule expression.
#[must_use]
pub fn extract_value_specs(expression: &RuleExpression) -> Vec<RuleValueSpec> {
    match expression {
        RuleExpression::Missing => vec![RuleValueSpec::Missing],
        RuleExpression::Error(_) => vec![RuleValueSpec::Error],
        RuleExpression::Block(_) => vec![RuleValueSpec::Block],
        RuleExpression::TaggedBlock { tag, .. } => {
            vec![RuleValueSpec::TaggedBlock { tag: tag.clone() }]
        }
        RuleExpression::Scalar(text) => vec![parse_value_spec(text)],
    }
}

/// Parses one scalar spec text.
#[must_use]
pub fn parse_value_spec(raw: &str) -> RuleValueSpec {
    let text = strip_quotes(raw.trim());
    if text.is_empty() {
        return RuleValueSpec::UnknownRef {
            raw: EcoString::from(raw),
        };
    }

    // `<type>` and `prefix_<type>_suffix` forms.
    if let Some(open) = text.find('<') {
        if let Some(close_rel) = text[open..].find('>') {
            let close = open + close_rel;
            let type_key = text[open + 1..close].trim();
            if !type_key.is_empty() {
                return RuleValueSpec::TypeRef {
                    type_key: EcoString::from(type_key),
                    prefix: EcoString::from(&text[..open]),
                    suffix: EcoString::from(&text[close + 1..]),
                };
            }
        }
    }

    // `head[argument]` forms.
    if let Some(open) = text.find('[') {
        if let Some(argument) = text[open + 1..].strip_suffix(']') {
            let head = text[..open].trim().to_ascii_lowercase();
            let argument = argument.trim();
            let arg = || EcoString::from(argument);
            let some_arg = || Some(arg()).filter(|a| !a.is_empty());
            return match head.as_str() {
                "int" => primitive(RulePrimitive::Int, some_arg(), text),
                "float" => primitive(RulePrimitive::Float, some_arg(), text),
                "filepath" => primitive(RulePrimitive::Filepath, some_arg(), text),
                "icon" => primitive(RulePrimitive::Icon, some_arg(), text),
                "enum" => RuleValueSpec::EnumRef { name: arg() },
                "scope" => RuleValueSpec::ScopeRef { scope: arg() },
                "event_target" => RuleValueSpec::EventTargetRef { name: arg() },
                "value" => RuleValueSpec::ValueRef { name: arg() },
                "value_set" => RuleValueSpec::ValueSetRef { name: arg() },
                "alias_match_left" => RuleValueSpec::AliasMatchLeftRef { family: arg() },
                "alias_name" => RuleValueSpec::AliasNameRef { family: arg() },
                "alias_keys_field" => RuleValueSpec::AliasKeysFieldRef { family: arg() },
                "single_alias_right" => RuleValueSpec::SingleAliasRightRef { name: arg() },
                _ => RuleValueSpec::UnknownRef {
                    raw: EcoString::from(text),
                },
            };
        }
    }

    match text.to_ascii_lowercase().as_str() {
        "bool" => primitive(RulePrimitive::Bool, None, text),
        "int" => primitive(RulePrimitive::Int, None, text),
        "float" => primitive(RulePrimitive::Float, None, text),
        "scalar" => primitive(RulePrimitive::Scalar, None, text),
        "percentage_field" => primitive(RulePrimitive::PercentageField, None, text),
        "date_field" => primitive(RulePrimitive::DateField, None, text),
        "localisation" => primitive(RulePrimitive::Localisation, None, text),
        "localisation_synced" => primitive(RulePrimitive::LocalisationSynced, None, text),
        "localisation_inline" => primitive(RulePrimitive::LocalisationInline, None, text),
        "variable_field" => primitive(RulePrimitive::VariableField, None, text),
        "int_variable_field" => primitive(RulePrimitive::IntVariableField, None, text),
        "value_field" => primitive(RulePrimitive::ValueField, None, text),
        "int_value_field" => primitive(RulePrimitive::IntValueField, None, text),
        "scope_field" => RuleValueSpec::ScopeField,
        _ => RuleValueSpec::UnknownRef {
            raw: EcoString::from(text),
        },
    }
}

fn primitive(primitive: RulePrimitive, argument: Option<EcoString>, raw: &str) -> RuleValueSpec {
    RuleValueSpec::Primitive {
        primitive,
        argument,
        raw: EcoString::from(raw),
    }
}

/// Deduplicating spec merge preserving first-seen order.
#[must_use]
pub fn merge_specs(left: Vec<RuleValueSpec>, right: Vec<RuleValueSpec>) -> Vec<RuleValueSpec> {
    let mut merged = left;
    let mut seen: Vec<String> = merged.iter().map(RuleValueSpec::dedup_key).collect();
    for spec in right {
        let key = spec.dedup_key();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        merged.push(spec);
    }
    merged
}

/// Extracts a field→constraint map from the statements of a rule block,
/// expanding `single_alias_right[...]` specs through `single_aliases`.
#[must_use]
pub fn build_constraints_from_rule_block(
    statements: &[std::sync::Arc<RuleStatement>],
    single_aliases: &IndexMap<EcoString, Vec<RuleValueSpec>>,
) -> IndexMap<EcoString, RuleFieldConstraint> {
    let mut by_field: IndexMap<EcoString, RuleFieldConstraint> = IndexMap::new();

    for child in statements {
        if child.kind != RuleStatementKind::KeyValue {
            continue;
        }
        let Some(key) = &child.key else {
            continue;
        };

        let specs = expand_single_alias_specs(extract_value_specs(&child.value), single_aliases);
        let constraint = RuleFieldConstraint {
            required: is_required(&child.metadata),
            specs,
            cardinality: child.metadata.cardinality,
            comparison: child.metadata.comparison,
            error_if_only_match: child.metadata.error_if_only_match.clone(),
        };

        match by_field.get_mut(key) {
            Some(existing) => existing.merge(constraint),
            None => {
                by_field.insert(key.clone(), constraint);
            }
        }
    }

    by_field
}

/// Replaces `single_alias_right[name]` specs with the alias's own specs.
#[must_use]
pub fn expand_single_alias_specs(
    specs: Vec<RuleValueSpec>,
    single_aliases: &IndexMap<EcoString, Vec<RuleValueSpec>>,
) -> Vec<RuleValueSpec> {
    let mut expanded = Vec::new();
    for spec in specs {
        if let RuleValueSpec::SingleAliasRightRef { name } = &spec {
            if let Some(alias_specs) = single_aliases.get(name) {
                expanded = merge_specs(expanded, alias_specs.clone());
                continue;
            }
        }
        expanded = merge_specs(expanded, vec![spec]);
    }
    expanded
}

fn is_required(metadata: &RuleMetadata) -> bool {
    metadata
        .cardinality
        .as_ref()
        .is_some_and(super::ir::RuleCardinality::is_required)
}

/// Strips one layer of surrounding double quotes.
#[must_use]
pub fn strip_quotes(value: &str) -> &str {
    let trimmed = value.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed)
}
