// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Artifact types produced by the schema adapters.
//!
//! Everything here is a plain deterministic value: built once from the
//! schema graph (plus project file scans), then shared immutably with the
//! type-check services.

use std::collections::BTreeSet;
use std::sync::Arc;

use ecow::EcoString;
use indexmap::IndexMap;

use crate::rules::ir::RuleStatement;
use crate::rules::semantics::{RuleFieldConstraint, RuleValueSpec};

/// A subtype matcher from a `subtype[...]` declaration.
///
/// Matchers run in declaration order; the first match wins and at most one
/// subtype is active per object occurrence.
#[derive(Debug, Clone, Default)]
pub struct SubtypeMatcher {
    pub subtype_name: EcoString,
    /// `field = literal` pairs the object must contain.
    pub expected_field_values: Vec<(EcoString, EcoString)>,
    /// `## type_key_filter = x` / `{ a b }` inclusion filters.
    pub type_key_filters: Vec<EcoString>,
    /// `## type_key_filter = <> x` exclusion filters.
    pub excluded_type_key_filters: Vec<EcoString>,
    /// `## starts_with = prefix` key-prefix filter.
    pub starts_with: Option<EcoString>,
    /// Scopes injected when this subtype matches.
    pub push_scope: Vec<EcoString>,
}

/// A normalized `complex_enum[...]` definition.
#[derive(Debug, Clone)]
pub struct ComplexEnumDefinition {
    pub enum_key: EcoString,
    pub paths: Vec<EcoString>,
    pub path_strict: bool,
    pub path_file: Option<EcoString>,
    pub path_extension: Option<EcoString>,
    pub start_from_root: bool,
    /// The `name = { ... }` traversal spec.
    pub name_tree: Vec<Arc<RuleStatement>>,
}

/// Whether a link resolves to a scope, a value, or either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkType {
    #[default]
    Scope,
    Value,
    Both,
}

impl LinkType {
    /// True if the link may appear in scope position.
    #[must_use]
    pub fn allows_scope(self) -> bool {
        matches!(self, LinkType::Scope | LinkType::Both)
    }

    /// True if the link may appear in value position.
    #[must_use]
    pub fn allows_value(self) -> bool {
        matches!(self, LinkType::Value | LinkType::Both)
    }

    /// Parses the `type = ...` option of a link declaration.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match text {
            "value" => LinkType::Value,
            "both" => LinkType::Both,
            _ => LinkType::Scope,
        }
    }
}

/// A scope link from the `links` special section.
#[derive(Debug, Clone, Default)]
pub struct LinkDefinition {
    pub name: EcoString,
    pub input_scopes: Vec<EcoString>,
    pub output_scope: Option<EcoString>,
    /// Data-link prefix, e.g. `var:`.
    pub prefix: Option<EcoString>,
    pub from_data: bool,
    /// Membership sets gating the data segment, e.g. `value[variable]`.
    pub data_sources: Vec<EcoString>,
    pub link_type: LinkType,
}

/// A modifier with the scopes its categories support.
#[derive(Debug, Clone, Default)]
pub struct ModifierDefinition {
    pub name: EcoString,
    pub category: Option<EcoString>,
    pub supported_scopes: Vec<EcoString>,
}

/// A localisation command with its supported scopes.
#[derive(Debug, Clone, Default)]
pub struct LocalisationCommandDefinition {
    pub name: EcoString,
    pub supported_scopes: Vec<EcoString>,
}

/// One `name = "$_desc"` style template from a type's `localisation` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeLocalisationTemplate {
    /// Template with `$` standing for the instance name.
    pub template: EcoString,
    pub required: bool,
    /// Set when declared under `subtype[...]`.
    pub subtype_name: Option<EcoString>,
}

/// One member of an alias family (`alias[family:name]`).
#[derive(Debug, Clone, Default)]
pub struct AliasDefinition {
    pub family: EcoString,
    pub name: EcoString,
    pub value_specs: Vec<RuleValueSpec>,
    pub field_constraints: IndexMap<EcoString, RuleFieldConstraint>,
}

/// A rule position that accepts any member of an alias family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasInvocation {
    pub family: EcoString,
    /// Declaration keys from the object root to the invocation site.
    pub parent_path: Vec<EcoString>,
    pub required_subtype: Option<EcoString>,
}

/// A single alias (`single_alias[name]`), inlined at use sites.
#[derive(Debug, Clone, Default)]
pub struct SingleAliasDefinition {
    pub name: EcoString,
    pub value_specs: Vec<RuleValueSpec>,
    pub field_constraints: IndexMap<EcoString, RuleFieldConstraint>,
}

/// A rule field whose value inlines a single alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleAliasInvocation {
    pub alias_name: EcoString,
    pub field_path: Vec<EcoString>,
    pub required_subtype: Option<EcoString>,
}

/// Ordered membership set used across adapter artifacts.
pub type MemberSet = BTreeSet<EcoString>;
