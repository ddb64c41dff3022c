// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Service and policy wiring for the type-check engine.
//!
//! [`TypecheckServices`] is the one bundle of precomputed artifacts a walk
//! reads from: memberships, alias tables, subtype matchers, links,
//! modifiers, localisation providers, and the injected asset registry.
//! Nothing here is global — callers build services once per schema load
//! and share them across carriers.

use std::collections::BTreeSet;
use std::sync::Arc;

use ecow::EcoString;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::localisation::LocalisationKeyProvider;
use crate::pipeline::ParseResult;
use crate::rules::adapters::{
    build_alias_definitions_by_family, build_alias_invocations_by_object,
    build_alias_members_by_family, build_complex_enum_definitions,
    build_complex_enum_values_from_file_texts, build_expanded_field_constraints,
    build_link_definitions, build_localisation_command_definitions, build_modifier_definitions,
    build_nested_field_constraints, build_scope_catalog, build_single_alias_definitions,
    build_single_alias_invocations_by_object, build_subtype_field_constraints_by_object,
    build_subtype_matchers_by_object, build_templated_modifier_definitions,
    build_type_localisation_templates_by_type, build_values_memberships_by_key, AliasDefinition,
    AliasInvocation, LinkDefinition, LocalisationCommandDefinition, MemberSet,
    ModifierDefinition, ScopeCatalog, SingleAliasDefinition, SingleAliasInvocation,
    SubtypeMatcher, TypeLocalisationTemplate,
};
use crate::rules::{
    build_type_memberships_from_file_texts, extract_type_definitions, RuleFieldConstraint,
    RuleStatement, RuleValueSpec, SchemaGraph,
};

use super::assets::{AssetRegistry, NullAssetRegistry};

/// How unresolved references and assets are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedPolicy {
    /// Stay silent; the reference may be provided elsewhere.
    #[default]
    Defer,
    /// Report a diagnostic.
    Error,
}

/// Locale coverage required for localisation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocaleCoverage {
    /// Present in at least one locale.
    #[default]
    Any,
    /// Present in every required (or known) locale.
    All,
}

/// Policy toggles for the type-check rules.
#[derive(Debug, Clone, Default)]
pub struct TypecheckPolicy {
    pub unresolved_reference: UnresolvedPolicy,
    pub unresolved_asset: UnresolvedPolicy,
    pub localisation_coverage: LocaleCoverage,
    /// Locales the `All` coverage checks against; empty means every locale
    /// the provider has seen.
    pub required_locales: BTreeSet<EcoString>,
    /// Report known modifiers that carry no category metadata.
    pub strict_modifiers: bool,
}

/// A path of field keys relative to a top-level object; empty means the
/// object itself.
pub type FieldPath = Vec<EcoString>;

/// Scope metadata attached to one rule path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldScopeConstraint {
    pub push_scope: Vec<EcoString>,
    pub replace_scope: Vec<(EcoString, EcoString)>,
    /// Scopes the current context must be compatible with at this path.
    pub required_scope: Vec<EcoString>,
}

impl FieldScopeConstraint {
    /// True if nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.push_scope.is_empty() && self.replace_scope.is_empty() && self.required_scope.is_empty()
    }
}

/// Shared resolver/services injected into type-check execution.
#[derive(Debug, Clone)]
pub struct TypecheckServices {
    pub asset_registry: Arc<dyn AssetRegistry + Send + Sync>,
    pub policy: TypecheckPolicy,
    pub known_scopes: ScopeCatalog,
    pub type_memberships_by_key: IndexMap<EcoString, MemberSet>,
    pub enum_memberships_by_key: IndexMap<EcoString, MemberSet>,
    pub value_memberships_by_key: IndexMap<EcoString, MemberSet>,
    pub field_constraints_by_object: IndexMap<EcoString, IndexMap<EcoString, RuleFieldConstraint>>,
    /// Flat by-name constraints across all rule depths; consumed by the
    /// reference and localisation rules.
    pub nested_field_constraints_by_object:
        IndexMap<EcoString, IndexMap<EcoString, RuleFieldConstraint>>,
    pub field_scope_constraints_by_object: IndexMap<EcoString, IndexMap<FieldPath, FieldScopeConstraint>>,
    pub alias_memberships_by_family: IndexMap<EcoString, MemberSet>,
    pub alias_definitions_by_family: IndexMap<EcoString, IndexMap<EcoString, AliasDefinition>>,
    pub alias_invocations_by_object: IndexMap<EcoString, Vec<AliasInvocation>>,
    pub single_alias_definitions_by_name: IndexMap<EcoString, SingleAliasDefinition>,
    pub single_alias_invocations_by_object: IndexMap<EcoString, Vec<SingleAliasInvocation>>,
    pub subtype_matchers_by_object: IndexMap<EcoString, Vec<SubtypeMatcher>>,
    pub subtype_field_constraints_by_object:
        IndexMap<EcoString, IndexMap<EcoString, IndexMap<EcoString, RuleFieldConstraint>>>,
    pub link_definitions_by_name: IndexMap<EcoString, LinkDefinition>,
    pub modifier_definitions_by_name: IndexMap<EcoString, ModifierDefinition>,
    pub localisation_command_definitions_by_name:
        IndexMap<EcoString, LocalisationCommandDefinition>,
    pub type_localisation_templates_by_type: IndexMap<EcoString, Vec<TypeLocalisationTemplate>>,
    pub localisation_key_provider: LocalisationKeyProvider,
}

impl Default for TypecheckServices {
    fn default() -> Self {
        Self {
            asset_registry: Arc::new(NullAssetRegistry),
            policy: TypecheckPolicy::default(),
            known_scopes: ScopeCatalog::default(),
            type_memberships_by_key: IndexMap::new(),
            enum_memberships_by_key: IndexMap::new(),
            value_memberships_by_key: IndexMap::new(),
            field_constraints_by_object: IndexMap::new(),
            nested_field_constraints_by_object: IndexMap::new(),
            field_scope_constraints_by_object: IndexMap::new(),
            alias_memberships_by_family: IndexMap::new(),
            alias_definitions_by_family: IndexMap::new(),
            alias_invocations_by_object: IndexMap::new(),
            single_alias_definitions_by_name: IndexMap::new(),
            single_alias_invocations_by_object: IndexMap::new(),
            subtype_matchers_by_object: IndexMap::new(),
            subtype_field_constraints_by_object: IndexMap::new(),
            link_definitions_by_name: IndexMap::new(),
            modifier_definitions_by_name: IndexMap::new(),
            localisation_command_definitions_by_name: IndexMap::new(),
            type_localisation_templates_by_type: IndexMap::new(),
            localisation_key_provider: LocalisationKeyProvider::default(),
        }
    }
}

/// Builds services from a schema graph plus project file texts.
///
/// The file texts feed type-member discovery, complex-enum
/// materialisation, and dynamic `value_set[...]` collection. Pass an empty
/// map for schema-only validation.
#[must_use]
pub fn build_typecheck_services(
    graph: &SchemaGraph,
    file_texts_by_path: &IndexMap<String, String>,
    asset_registry: Option<Arc<dyn AssetRegistry + Send + Sync>>,
    policy: TypecheckPolicy,
) -> TypecheckServices {
    debug!(files = file_texts_by_path.len(), "building typecheck services");

    let type_definitions = extract_type_definitions(graph);
    let mut type_memberships =
        build_type_memberships_from_file_texts(file_texts_by_path, &type_definitions);

    let field_constraints = build_expanded_field_constraints(graph);

    // Enum memberships: simple `enum[...]` declarations plus materialised
    // complex enums.
    let mut enum_memberships = build_simple_enum_memberships(graph);
    let complex_definitions = build_complex_enum_definitions(graph);
    for (key, values) in
        build_complex_enum_values_from_file_texts(file_texts_by_path, &complex_definitions)
    {
        enum_memberships.entry(key).or_default().extend(values);
    }

    // Value memberships: declared `values.cwt` sets plus dynamic
    // `value_set[...]` writes discovered in project files.
    let mut value_memberships = build_values_memberships_by_key(graph);
    for (key, values) in
        collect_dynamic_value_memberships(file_texts_by_path, &field_constraints)
    {
        value_memberships.entry(key).or_default().extend(values);
    }

    // Modifiers: the static table plus templated stamps; modifier names
    // double as a type membership and an alias family.
    let mut modifier_definitions = build_modifier_definitions(graph);
    for (name, definition) in build_templated_modifier_definitions(graph, &type_memberships) {
        modifier_definitions.entry(name).or_insert(definition);
    }
    let modifier_names: MemberSet = modifier_definitions.keys().cloned().collect();
    let mut alias_memberships = build_alias_members_by_family(graph);
    alias_memberships
        .entry(EcoString::from("modifier"))
        .or_default()
        .extend(modifier_names.iter().cloned());
    type_memberships
        .entry(EcoString::from("modifier"))
        .or_default()
        .extend(modifier_names);

    TypecheckServices {
        asset_registry: asset_registry.unwrap_or_else(|| Arc::new(NullAssetRegistry)),
        policy,
        known_scopes: build_scope_catalog(graph),
        type_memberships_by_key: type_memberships,
        enum_memberships_by_key: enum_memberships,
        value_memberships_by_key: value_memberships,
        field_constraints_by_object: field_constraints,
        nested_field_constraints_by_object: build_nested_field_constraints(graph),
        field_scope_constraints_by_object: build_field_scope_constraints_by_object(graph),
        alias_memberships_by_family: alias_memberships,
        alias_definitions_by_family: build_alias_definitions_by_family(graph),
        alias_invocations_by_object: build_alias_invocations_by_object(graph),
        single_alias_definitions_by_name: build_single_alias_definitions(graph),
        single_alias_invocations_by_object: build_single_alias_invocations_by_object(graph),
        subtype_matchers_by_object: build_subtype_matchers_by_object(graph),
        subtype_field_constraints_by_object: build_subtype_field_constraints_by_object(graph),
        link_definitions_by_name: build_link_definitions(graph),
        modifier_definitions_by_name: modifier_definitions,
        localisation_command_definitions_by_name: build_localisation_command_definitions(graph),
        type_localisation_templates_by_type: build_type_localisation_templates_by_type(graph),
        localisation_key_provider: LocalisationKeyProvider::default(),
    }
}

/// Members of simple `enum[...]` declarations: the bare scalars (and
/// scalar values) of the declaration block.
fn build_simple_enum_memberships(graph: &SchemaGraph) -> IndexMap<EcoString, MemberSet> {
    let mut memberships: IndexMap<EcoString, MemberSet> = IndexMap::new();
    for (name, declarations) in &graph.enums_by_key {
        let bucket = memberships.entry(name.clone()).or_default();
        for declaration in declarations {
            let Some(block) = declaration.statement.value.as_block() else {
                continue;
            };
            for child in block {
                if let Some(text) = child.value.as_scalar() {
                    let member = crate::rules::semantics::strip_quotes(text);
                    if !member.is_empty() && child.key.is_none() {
                        bucket.insert(EcoString::from(member));
                    }
                }
            }
        }
    }
    memberships.retain(|_, bucket| !bucket.is_empty());
    memberships
}

/// Scans project files for writes into `value_set[...]` positions.
fn collect_dynamic_value_memberships(
    file_texts_by_path: &IndexMap<String, String>,
    field_constraints_by_object: &IndexMap<EcoString, IndexMap<EcoString, RuleFieldConstraint>>,
) -> IndexMap<EcoString, MemberSet> {
    let mut memberships: IndexMap<EcoString, MemberSet> = IndexMap::new();

    for text in file_texts_by_path.values() {
        let parsed: ParseResult =
            crate::pipeline::parse_with_options(text, crate::pipeline::ParseOptions::permissive());
        let facts = parsed.analysis_facts();

        for (object_key, constraints) in field_constraints_by_object {
            for (field_name, constraint) in constraints {
                let set_names: Vec<&EcoString> = constraint
                    .specs
                    .iter()
                    .filter_map(|spec| match spec {
                        RuleValueSpec::ValueSetRef { name } => Some(name),
                        _ => None,
                    })
                    .collect();
                if set_names.is_empty() {
                    continue;
                }
                for fact in facts.fields_for(object_key, field_name) {
                    let Some(value) = fact.value.as_ref().and_then(|v| v.as_scalar()) else {
                        continue;
                    };
                    let member = crate::rules::semantics::strip_quotes(value.value_text());
                    if member.is_empty() {
                        continue;
                    }
                    for set_name in &set_names {
                        memberships
                            .entry((*set_name).clone())
                            .or_default()
                            .insert(EcoString::from(member));
                    }
                }
            }
        }
    }

    memberships
}

/// Collects per-path scope metadata from top-level rule declarations.
#[must_use]
pub fn build_field_scope_constraints_by_object(
    graph: &SchemaGraph,
) -> IndexMap<EcoString, IndexMap<FieldPath, FieldScopeConstraint>> {
    let mut by_object: IndexMap<EcoString, IndexMap<FieldPath, FieldScopeConstraint>> =
        IndexMap::new();

    for statement in &graph.top_level_rule_statements {
        let Some(object_key) = &statement.key else {
            continue;
        };
        let Some(block) = statement.value.as_block() else {
            continue;
        };
        let constraints = by_object.entry(object_key.clone()).or_default();

        let root_constraint = scope_constraint_from(statement);
        if !root_constraint.is_empty() {
            constraints.insert(Vec::new(), root_constraint);
        }
        collect_scope_constraints(block, &[], constraints);
    }

    by_object.retain(|_, constraints| !constraints.is_empty());
    by_object
}

fn collect_scope_constraints(
    statements: &[Arc<RuleStatement>],
    path: &[EcoString],
    out: &mut IndexMap<FieldPath, FieldScopeConstraint>,
) {
    for statement in statements {
        let Some(key) = &statement.key else {
            continue;
        };
        // Subtype branches gate on the matcher's own push_scope instead.
        if key.starts_with("subtype[") {
            continue;
        }
        let mut field_path = path.to_vec();
        field_path.push(key.clone());

        let constraint = scope_constraint_from(statement);
        if !constraint.is_empty() {
            match out.get_mut(&field_path) {
                Some(existing) => {
                    existing.push_scope.extend(constraint.push_scope);
                    existing.replace_scope.extend(constraint.replace_scope);
                    existing.required_scope.extend(constraint.required_scope);
                }
                None => {
                    out.insert(field_path.clone(), constraint);
                }
            }
        }

        if let Some(block) = statement.value.as_block() {
            collect_scope_constraints(block, &field_path, out);
        }
    }
}

fn scope_constraint_from(statement: &RuleStatement) -> FieldScopeConstraint {
    FieldScopeConstraint {
        push_scope: statement
            .metadata
            .push_scope
            .clone()
            .unwrap_or_default()
            .iter()
            .map(|scope| EcoString::from(scope.to_ascii_lowercase()))
            .collect(),
        replace_scope: statement
            .metadata
            .replace_scope
            .clone()
            .unwrap_or_default()
            .iter()
            .map(|replacement| (replacement.source.clone(), replacement.target.clone()))
            .collect(),
        required_scope: statement
            .metadata
            .scope
            .clone()
            .unwrap_or_default()
            .iter()
            .map(|scope| EcoString::from(scope.to_ascii_lowercase()))
            .collect(),
    }
}
