// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The deterministic type-check rule stack.
//!
//! Rules run in a fixed order — cardinality, primitive constraints,
//! reference resolution, scope transitions, alias execution, localisation,
//! modifier scopes, custom constraints, shape consistency — and every rule
//! emits diagnostics and continues. Failure of one field never aborts the
//! walk.

use ecow::EcoString;
use indexmap::IndexMap;

use crate::ast::{AstValue, ScalarNumber, ScalarValue};
use crate::diagnostics::{
    Diagnostic, DiagnosticCategory, TYPECHECK_CARDINALITY_VIOLATION,
    TYPECHECK_INCONSISTENT_VALUE_SHAPE, TYPECHECK_INVALID_FIELD_REFERENCE,
    TYPECHECK_INVALID_FIELD_TYPE, TYPECHECK_INVALID_MODIFIER_SCOPE,
    TYPECHECK_INVALID_SCOPE_CONTEXT, TYPECHECK_MISSING_LOCALISATION_KEY,
    TYPECHECK_REQUIRED_FIELD_MISSING, TYPECHECK_RULE_CUSTOM_ERROR,
    TYPECHECK_UNRESOLVED_REFERENCE,
};
use crate::rules::{RuleFieldConstraint, RulePrimitive, RuleValueSpec};
use crate::source_analysis::Span;

use super::assets::AssetLookup;
use super::contract::{RuleConfidence, RuleContext, RuleDomain, TypecheckRule};
use super::scope::{ScopeResolution, ScopeStack};
use super::services::{TypecheckServices, UnresolvedPolicy};
use super::walk::{
    blocks_at_path, constraints_for, object_occurrences, walk_fields_with_scope,
    ObjectOccurrence,
};

/// Diagnostic code used for ambiguous scope alias mappings.
pub const TYPECHECK_AMBIGUOUS_SCOPE_CONTEXT: &str = "TYPECHECK_AMBIGUOUS_SCOPE_CONTEXT";

/// The default rule stack, in its deterministic execution order.
#[must_use]
pub fn default_typecheck_rules() -> Vec<Box<dyn TypecheckRule>> {
    vec![
        Box::new(CardinalityRule),
        Box::new(FieldConstraintRule),
        Box::new(FieldReferenceRule),
        Box::new(ScopeContextRule),
        Box::new(AliasExecutionRule),
        Box::new(LocalisationRule),
        Box::new(ModifierScopeRule),
        Box::new(ErrorIfOnlyMatchRule),
        Box::new(InconsistentShapeRule),
    ]
}

// ── Spec matching ───────────────────────────────────────────────────────────

/// Outcome of matching one value against one spec.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SpecOutcome {
    Pass,
    Fail,
    /// The spec could not be decided from available artifacts.
    Unresolved,
    /// A scope alias mapping was ambiguous.
    Ambiguous,
}

fn spec_is_reference(spec: &RuleValueSpec) -> bool {
    matches!(
        spec,
        RuleValueSpec::EnumRef { .. }
            | RuleValueSpec::TypeRef { .. }
            | RuleValueSpec::ScopeRef { .. }
            | RuleValueSpec::ScopeField
            | RuleValueSpec::EventTargetRef { .. }
            | RuleValueSpec::ValueRef { .. }
            | RuleValueSpec::ValueSetRef { .. }
            | RuleValueSpec::AliasMatchLeftRef { .. }
            | RuleValueSpec::AliasKeysFieldRef { .. }
            | RuleValueSpec::Primitive {
                primitive: RulePrimitive::VariableField
                    | RulePrimitive::IntVariableField
                    | RulePrimitive::ValueField
                    | RulePrimitive::IntValueField,
                ..
            }
    )
}

/// Structural matching: primitives, blocks, literals. No memberships.
fn structural_outcome(
    value: Option<&AstValue>,
    spec: &RuleValueSpec,
    services: &TypecheckServices,
) -> SpecOutcome {
    match spec {
        RuleValueSpec::Block => match value {
            Some(AstValue::Block(_)) => SpecOutcome::Pass,
            _ => SpecOutcome::Fail,
        },
        RuleValueSpec::TaggedBlock { tag } => match value {
            Some(AstValue::Tagged(tagged)) if tagged.tag.value_text() == tag.as_str() => {
                SpecOutcome::Pass
            }
            Some(AstValue::Tagged(_)) if tag.is_empty() => SpecOutcome::Pass,
            _ => SpecOutcome::Fail,
        },
        RuleValueSpec::Missing | RuleValueSpec::Error | RuleValueSpec::UnknownRef { .. } => {
            SpecOutcome::Pass
        }
        RuleValueSpec::Primitive {
            primitive,
            argument,
            ..
        } => primitive_outcome(value, primitive, argument.as_deref(), services),
        // Reference specs are decided elsewhere.
        _ => SpecOutcome::Unresolved,
    }
}

fn primitive_outcome(
    value: Option<&AstValue>,
    primitive: &RulePrimitive,
    argument: Option<&str>,
    services: &TypecheckServices,
) -> SpecOutcome {
    let Some(AstValue::Scalar(scalar)) = value else {
        return SpecOutcome::Fail;
    };
    let interpreted = scalar.interpret_allow_quoted();

    match primitive {
        RulePrimitive::Scalar
        | RulePrimitive::Localisation
        | RulePrimitive::LocalisationSynced
        | RulePrimitive::LocalisationInline => SpecOutcome::Pass,
        RulePrimitive::Bool => {
            if !scalar.was_quoted && interpreted.as_bool().is_some() {
                SpecOutcome::Pass
            } else {
                SpecOutcome::Fail
            }
        }
        RulePrimitive::Int => match interpreted.as_number() {
            Some(number) if number.is_integer() => range_outcome(number, argument),
            _ => SpecOutcome::Fail,
        },
        RulePrimitive::Float => match interpreted.as_number() {
            Some(number) => range_outcome(number, argument),
            None => SpecOutcome::Fail,
        },
        RulePrimitive::PercentageField => {
            let text = scalar.value_text();
            match text.strip_suffix('%') {
                Some(prefix) if !prefix.is_empty() => {
                    match crate::ast::scalar::parse_number(prefix) {
                        Some(_) => SpecOutcome::Pass,
                        None => SpecOutcome::Fail,
                    }
                }
                _ => SpecOutcome::Fail,
            }
        }
        RulePrimitive::DateField => match interpreted {
            ScalarValue::DateLike { .. } => SpecOutcome::Pass,
            _ => SpecOutcome::Fail,
        },
        RulePrimitive::Filepath => {
            asset_outcome(&filepath_for(scalar.value_text(), argument), services)
        }
        RulePrimitive::Icon => {
            let path = match argument {
                Some(dir) => format!("{}/{}.dds", dir.trim_end_matches('/'), scalar.value_text()),
                None => scalar.value_text().to_string(),
            };
            asset_outcome(&path, services)
        }
        // Variable/value fields are reference-resolved.
        RulePrimitive::VariableField
        | RulePrimitive::IntVariableField
        | RulePrimitive::ValueField
        | RulePrimitive::IntValueField => SpecOutcome::Unresolved,
    }
}

fn filepath_for(value: &str, argument: Option<&str>) -> String {
    match argument {
        Some(argument) => match argument.split_once(',') {
            Some((prefix, extension)) => format!("{prefix}{value}{extension}"),
            None => format!("{argument}{value}"),
        },
        None => value.to_string(),
    }
}

fn asset_outcome(path: &str, services: &TypecheckServices) -> SpecOutcome {
    match services.asset_registry.lookup(path) {
        AssetLookup::Found => SpecOutcome::Pass,
        AssetLookup::Missing => SpecOutcome::Fail,
        AssetLookup::Unknown => match services.policy.unresolved_asset {
            UnresolvedPolicy::Defer => SpecOutcome::Pass,
            UnresolvedPolicy::Error => SpecOutcome::Fail,
        },
    }
}

fn range_outcome(number: &ScalarNumber, argument: Option<&str>) -> SpecOutcome {
    let Some(argument) = argument else {
        return SpecOutcome::Pass;
    };
    let Some((min_text, max_text)) = argument.split_once("..") else {
        return SpecOutcome::Pass;
    };
    let value = number.as_f64();
    if let Ok(min) = min_text.trim().parse::<f64>() {
        if value < min {
            return SpecOutcome::Fail;
        }
    }
    if let Ok(max) = max_text.trim().parse::<f64>() {
        if value > max {
            return SpecOutcome::Fail;
        }
    }
    SpecOutcome::Pass
}

/// Reference matching: memberships, scopes, links.
fn reference_outcome(
    value: Option<&AstValue>,
    spec: &RuleValueSpec,
    services: &TypecheckServices,
    stack: &ScopeStack,
) -> SpecOutcome {
    let scalar_text = value
        .and_then(AstValue::as_scalar)
        .map(|scalar| EcoString::from(scalar.value_text()));

    match spec {
        RuleValueSpec::EnumRef { name } => match &scalar_text {
            Some(text) => match services.enum_memberships_by_key.get(name) {
                Some(members) => {
                    if members.contains(text.as_str()) {
                        SpecOutcome::Pass
                    } else {
                        SpecOutcome::Fail
                    }
                }
                None => SpecOutcome::Unresolved,
            },
            None => SpecOutcome::Fail,
        },
        RuleValueSpec::TypeRef {
            type_key,
            prefix,
            suffix,
        } => match &scalar_text {
            Some(text) => {
                let Some(stripped) = text
                    .strip_prefix(prefix.as_str())
                    .and_then(|rest| rest.strip_suffix(suffix.as_str()))
                else {
                    return SpecOutcome::Fail;
                };
                match services.type_memberships_by_key.get(type_key) {
                    Some(members) => {
                        if members.contains(stripped) {
                            SpecOutcome::Pass
                        } else {
                            SpecOutcome::Fail
                        }
                    }
                    None => SpecOutcome::Unresolved,
                }
            }
            None => SpecOutcome::Fail,
        },
        RuleValueSpec::ScopeRef { scope } => match &scalar_text {
            Some(text) => match resolve_scope_expression(text, stack, services) {
                ScopeExprOutcome::Resolved(resolved) => {
                    let target = scope.to_ascii_lowercase();
                    if target == "any" || target == "all" || resolved == target.as_str() {
                        SpecOutcome::Pass
                    } else {
                        SpecOutcome::Fail
                    }
                }
                ScopeExprOutcome::Ambiguous => SpecOutcome::Ambiguous,
                ScopeExprOutcome::Fail => SpecOutcome::Fail,
                ScopeExprOutcome::Unresolved => SpecOutcome::Unresolved,
            },
            None => SpecOutcome::Fail,
        },
        RuleValueSpec::ScopeField | RuleValueSpec::EventTargetRef { .. } => SpecOutcome::Unresolved,
        RuleValueSpec::ValueRef { name } => match &scalar_text {
            Some(text) => match services.value_memberships_by_key.get(name) {
                Some(members) => {
                    if members.contains(text.as_str()) {
                        SpecOutcome::Pass
                    } else {
                        SpecOutcome::Fail
                    }
                }
                None => SpecOutcome::Unresolved,
            },
            None => SpecOutcome::Fail,
        },
        // A value_set position defines members; any scalar is fine.
        RuleValueSpec::ValueSetRef { .. } => match scalar_text {
            Some(_) => SpecOutcome::Pass,
            None => SpecOutcome::Fail,
        },
        RuleValueSpec::AliasMatchLeftRef { family } | RuleValueSpec::AliasKeysFieldRef { family } => {
            match &scalar_text {
                Some(text) => match services.alias_memberships_by_family.get(family) {
                    Some(members) => {
                        if members.contains(text.as_str()) {
                            SpecOutcome::Pass
                        } else {
                            SpecOutcome::Fail
                        }
                    }
                    None => SpecOutcome::Unresolved,
                },
                None => SpecOutcome::Fail,
            }
        }
        RuleValueSpec::Primitive {
            primitive:
                primitive @ (RulePrimitive::VariableField
                | RulePrimitive::IntVariableField
                | RulePrimitive::ValueField
                | RulePrimitive::IntValueField),
            ..
        } => variable_value_outcome(scalar_text.as_deref(), primitive, services, stack),
        other => structural_outcome(value, other, services),
    }
}

/// `variable_field` / `value_field`: either a numeric literal or a
/// value-typed link chain.
fn variable_value_outcome(
    text: Option<&str>,
    primitive: &RulePrimitive,
    services: &TypecheckServices,
    stack: &ScopeStack,
) -> SpecOutcome {
    let Some(text) = text else {
        return SpecOutcome::Fail;
    };

    let wants_int = matches!(
        primitive,
        RulePrimitive::IntVariableField | RulePrimitive::IntValueField
    );
    if let Some(number) = crate::ast::scalar::parse_number(text) {
        if wants_int && !number.is_integer() {
            return SpecOutcome::Fail;
        }
        return SpecOutcome::Pass;
    }

    // A prefixed data link must allow value resolution.
    for link in services.link_definitions_by_name.values() {
        let Some(prefix) = &link.prefix else {
            continue;
        };
        let Some(payload) = text.strip_prefix(prefix.as_str()) else {
            continue;
        };
        if !link.link_type.allows_value() {
            return SpecOutcome::Fail;
        }
        return data_source_outcome(payload, link, services);
    }

    let _ = stack;
    SpecOutcome::Unresolved
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ScopeExprOutcome {
    Resolved(EcoString),
    Fail,
    Ambiguous,
    Unresolved,
}

/// Resolves a dotted scope expression (`owner.capital`, `var:foo.owner`)
/// against the current context and the link table.
fn resolve_scope_expression(
    text: &str,
    stack: &ScopeStack,
    services: &TypecheckServices,
) -> ScopeExprOutcome {
    let mut current: Option<EcoString> = None;

    for (index, raw_segment) in text.split('.').enumerate() {
        let segment = raw_segment.trim();
        if segment.is_empty() {
            return ScopeExprOutcome::Unresolved;
        }

        if index == 0 && ScopeStack::is_scope_alias(segment) {
            match stack.resolve_alias(segment) {
                ScopeResolution::Resolved(scope) => {
                    current = Some(scope);
                    continue;
                }
                ScopeResolution::Ambiguous(_) => return ScopeExprOutcome::Ambiguous,
                ScopeResolution::Unresolved => return ScopeExprOutcome::Unresolved,
            }
        }

        match find_link(segment, services) {
            Some((link, payload)) => {
                if !link.link_type.allows_scope() {
                    return ScopeExprOutcome::Fail;
                }
                if let Some(scope) = &current {
                    if !link.input_scopes.is_empty()
                        && !link
                            .input_scopes
                            .iter()
                            .any(|input| input == scope || input == "any" || input == "all")
                    {
                        return ScopeExprOutcome::Fail;
                    }
                }
                if let Some(payload) = payload {
                    match data_source_outcome(payload, link, services) {
                        SpecOutcome::Pass => {}
                        SpecOutcome::Fail => return ScopeExprOutcome::Fail,
                        SpecOutcome::Unresolved | SpecOutcome::Ambiguous => {
                            return ScopeExprOutcome::Unresolved
                        }
                    }
                }
                match &link.output_scope {
                    Some(output) => current = Some(output.clone()),
                    None => return ScopeExprOutcome::Unresolved,
                }
            }
            None => return ScopeExprOutcome::Unresolved,
        }
    }

    match current {
        Some(scope) => ScopeExprOutcome::Resolved(scope),
        None => ScopeExprOutcome::Unresolved,
    }
}

fn find_link<'a>(
    segment: &'a str,
    services: &'a TypecheckServices,
) -> Option<(&'a crate::rules::adapters::LinkDefinition, Option<&'a str>)> {
    let lowered = segment.to_ascii_lowercase();
    if let Some(link) = services.link_definitions_by_name.get(lowered.as_str()) {
        if !link.from_data {
            return Some((link, None));
        }
    }
    for link in services.link_definitions_by_name.values() {
        if !link.from_data {
            continue;
        }
        let Some(prefix) = &link.prefix else {
            continue;
        };
        if let Some(payload) = segment.strip_prefix(prefix.as_str()) {
            return Some((link, Some(payload)));
        }
    }
    None
}

fn data_source_outcome(
    payload: &str,
    link: &crate::rules::adapters::LinkDefinition,
    services: &TypecheckServices,
) -> SpecOutcome {
    if link.data_sources.is_empty() {
        return SpecOutcome::Pass;
    }
    let mut any_known = false;
    for source in &link.data_sources {
        let members = match crate::rules::parse_value_spec(source) {
            RuleValueSpec::ValueRef { name } | RuleValueSpec::ValueSetRef { name } => {
                services.value_memberships_by_key.get(&name)
            }
            RuleValueSpec::TypeRef { type_key, .. } => {
                services.type_memberships_by_key.get(&type_key)
            }
            RuleValueSpec::EnumRef { name } => services.enum_memberships_by_key.get(&name),
            _ => None,
        };
        if let Some(members) = members {
            any_known = true;
            if members.contains(payload) {
                return SpecOutcome::Pass;
            }
        }
    }
    if any_known {
        SpecOutcome::Fail
    } else {
        SpecOutcome::Unresolved
    }
}

fn field_diagnostic(
    code: &'static str,
    message: impl Into<EcoString>,
    span: Span,
) -> Diagnostic {
    Diagnostic::error(code, message, span, DiagnosticCategory::Typecheck)
}

// ── 1. Cardinality ──────────────────────────────────────────────────────────

/// Required fields and occurrence counts per object.
pub struct CardinalityRule;

impl TypecheckRule for CardinalityRule {
    fn code(&self) -> &'static str {
        TYPECHECK_CARDINALITY_VIOLATION
    }
    fn name(&self) -> &'static str {
        "cardinality"
    }
    fn domain(&self) -> RuleDomain {
        RuleDomain::Correctness
    }
    fn confidence(&self) -> RuleConfidence {
        RuleConfidence::Sound
    }

    fn run(&self, context: &RuleContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for object in object_occurrences(context.parse.ast_root(), context.services) {
            let constraints = constraints_for(context.services, &object);
            if constraints.is_empty() {
                continue;
            }

            let mut counts: IndexMap<&str, usize> = IndexMap::new();
            for statement in &object.block.statements {
                if let Some(key_value) = statement.as_key_value() {
                    *counts.entry(key_value.key.value_text()).or_insert(0) += 1;
                }
            }

            for (field, constraint) in &constraints {
                let count = counts.get(field.as_str()).copied().unwrap_or(0);
                let cardinality = constraint.cardinality.unwrap_or_default();

                let min = if cardinality.soft_min {
                    None
                } else if cardinality.min_unbounded {
                    Some(1)
                } else {
                    cardinality.min
                };
                let required = constraint.required && !cardinality.soft_min;

                if count == 0 && (required || min.is_some_and(|min| min > 0)) {
                    diagnostics.push(field_diagnostic(
                        TYPECHECK_REQUIRED_FIELD_MISSING,
                        format!("`{}` is missing required field `{field}`", object.key),
                        object.key_span,
                    ));
                    continue;
                }
                if let Some(min) = min {
                    if count > 0 && count < min as usize {
                        diagnostics.push(field_diagnostic(
                            TYPECHECK_CARDINALITY_VIOLATION,
                            format!(
                                "`{}.{field}` appears {count} times; at least {min} required",
                                object.key
                            ),
                            object.key_span,
                        ));
                    }
                }
                if !cardinality.max_unbounded {
                    if let Some(max) = cardinality.max {
                        if count > max as usize {
                            diagnostics.push(field_diagnostic(
                                TYPECHECK_CARDINALITY_VIOLATION,
                                format!(
                                    "`{}.{field}` appears {count} times; at most {max} allowed",
                                    object.key
                                ),
                                object.key_span,
                            ));
                        }
                    }
                }
            }
        }

        diagnostics
    }
}

// ── 2. Primitive field constraints ──────────────────────────────────────────

/// Primitive value-type checks (`bool`, `int[..]`, `filepath[..]`, …).
pub struct FieldConstraintRule;

impl TypecheckRule for FieldConstraintRule {
    fn code(&self) -> &'static str {
        TYPECHECK_INVALID_FIELD_TYPE
    }
    fn name(&self) -> &'static str {
        "fieldConstraint"
    }
    fn domain(&self) -> RuleDomain {
        RuleDomain::Correctness
    }
    fn confidence(&self) -> RuleConfidence {
        RuleConfidence::Sound
    }

    fn run(&self, context: &RuleContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for object in object_occurrences(context.parse.ast_root(), context.services) {
            let constraints = constraints_for(context.services, &object);
            if constraints.is_empty() {
                continue;
            }

            for statement in &object.block.statements {
                let Some(key_value) = statement.as_key_value() else {
                    continue;
                };
                let Some(constraint) = constraints.get(key_value.key.value_text()) else {
                    continue;
                };
                if constraint.specs.is_empty()
                    || constraint.specs.iter().any(spec_is_reference)
                {
                    continue;
                }

                let matched = constraint.specs.iter().any(|spec| {
                    structural_outcome(key_value.value.as_ref(), spec, context.services)
                        == SpecOutcome::Pass
                });
                if !matched {
                    diagnostics.push(field_diagnostic(
                        TYPECHECK_INVALID_FIELD_TYPE,
                        format!(
                            "`{}.{}` does not match {}",
                            object.key,
                            key_value.key.value_text(),
                            describe_specs(&constraint.specs)
                        ),
                        key_value.key.span,
                    ));
                }
            }
        }

        diagnostics
    }
}

fn describe_specs(specs: &[RuleValueSpec]) -> String {
    let rendered: Vec<String> = specs
        .iter()
        .map(|spec| match spec {
            RuleValueSpec::Primitive { raw, .. } => raw.to_string(),
            RuleValueSpec::Block => "{...}".to_string(),
            RuleValueSpec::TaggedBlock { tag } => format!("{tag} {{...}}"),
            RuleValueSpec::EnumRef { name } => format!("enum[{name}]"),
            RuleValueSpec::TypeRef { type_key, .. } => format!("<{type_key}>"),
            RuleValueSpec::ScopeRef { scope } => format!("scope[{scope}]"),
            RuleValueSpec::ValueRef { name } => format!("value[{name}]"),
            RuleValueSpec::ValueSetRef { name } => format!("value_set[{name}]"),
            RuleValueSpec::UnknownRef { raw } => raw.to_string(),
            other => format!("{other:?}"),
        })
        .collect();
    if rendered.is_empty() {
        "the schema constraints".to_string()
    } else {
        rendered.join(" | ")
    }
}

// ── 3. Reference resolution ─────────────────────────────────────────────────

/// Enum/type/scope/value reference checks, with link-chain resolution.
pub struct FieldReferenceRule;

impl TypecheckRule for FieldReferenceRule {
    fn code(&self) -> &'static str {
        TYPECHECK_INVALID_FIELD_REFERENCE
    }
    fn name(&self) -> &'static str {
        "fieldReference"
    }
    fn domain(&self) -> RuleDomain {
        RuleDomain::Correctness
    }
    fn confidence(&self) -> RuleConfidence {
        RuleConfidence::Sound
    }

    fn run(&self, context: &RuleContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for object in object_occurrences(context.parse.ast_root(), context.services) {
            let constraints = context
                .services
                .nested_field_constraints_by_object
                .get(&object.key);
            let Some(constraints) = constraints else {
                continue;
            };

            walk_fields_with_scope(&object, context.services, &mut |_path, key_value, stack| {
                let Some(constraint) = constraints.get(key_value.key.value_text()) else {
                    return;
                };
                if !constraint.specs.iter().any(spec_is_reference) {
                    return;
                }

                let mut outcomes = Vec::new();
                for spec in &constraint.specs {
                    let outcome = if spec_is_reference(spec) {
                        reference_outcome(key_value.value.as_ref(), spec, context.services, stack)
                    } else {
                        structural_outcome(key_value.value.as_ref(), spec, context.services)
                    };
                    if outcome == SpecOutcome::Pass {
                        return;
                    }
                    outcomes.push(outcome);
                }

                if outcomes.contains(&SpecOutcome::Ambiguous) {
                    diagnostics.push(field_diagnostic(
                        TYPECHECK_AMBIGUOUS_SCOPE_CONTEXT,
                        format!(
                            "`{}.{}` scope alias mapping is ambiguous",
                            object.key,
                            key_value.key.value_text()
                        ),
                        key_value.key.span,
                    ));
                    return;
                }
                if outcomes.iter().all(|outcome| *outcome == SpecOutcome::Unresolved) {
                    if context.services.policy.unresolved_reference == UnresolvedPolicy::Error {
                        diagnostics.push(field_diagnostic(
                            TYPECHECK_UNRESOLVED_REFERENCE,
                            format!(
                                "`{}.{}` could not be resolved against any known reference set",
                                object.key,
                                key_value.key.value_text()
                            ),
                            key_value.key.span,
                        ));
                    }
                    return;
                }
                diagnostics.push(field_diagnostic(
                    TYPECHECK_INVALID_FIELD_REFERENCE,
                    format!(
                        "`{}.{}` does not match {}",
                        object.key,
                        key_value.key.value_text(),
                        describe_specs(&constraint.specs)
                    ),
                    key_value.key.span,
                ));
            });
        }

        diagnostics
    }
}

// ── 4. Scope transitions ────────────────────────────────────────────────────

/// Required-scope checks per rule path, with push/replace maintenance.
pub struct ScopeContextRule;

impl TypecheckRule for ScopeContextRule {
    fn code(&self) -> &'static str {
        TYPECHECK_INVALID_SCOPE_CONTEXT
    }
    fn name(&self) -> &'static str {
        "scopeContext"
    }
    fn domain(&self) -> RuleDomain {
        RuleDomain::Correctness
    }
    fn confidence(&self) -> RuleConfidence {
        RuleConfidence::Sound
    }

    fn run(&self, context: &RuleContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for object in object_occurrences(context.parse.ast_root(), context.services) {
            let Some(scope_constraints) = context
                .services
                .field_scope_constraints_by_object
                .get(&object.key)
            else {
                continue;
            };

            walk_fields_with_scope(&object, context.services, &mut |path, key_value, stack| {
                let Some(constraint) = scope_constraints.get(&path.to_vec()) else {
                    return;
                };
                if constraint.required_scope.is_empty() {
                    return;
                }
                if constraint
                    .required_scope
                    .iter()
                    .any(|scope| scope == "any" || scope == "all")
                {
                    return;
                }

                if stack.has_ambiguous_replacements() {
                    diagnostics.push(field_diagnostic(
                        TYPECHECK_AMBIGUOUS_SCOPE_CONTEXT,
                        format!(
                            "scope context for `{}.{}` is ambiguous",
                            object.key,
                            key_value.key.value_text()
                        ),
                        key_value.key.span,
                    ));
                    return;
                }

                let satisfied = stack
                    .current()
                    .is_some_and(|current| {
                        constraint
                            .required_scope
                            .iter()
                            .any(|scope| scope == current)
                    });
                if !satisfied {
                    diagnostics.push(field_diagnostic(
                        TYPECHECK_INVALID_SCOPE_CONTEXT,
                        format!(
                            "`{}.{}` requires scope {}",
                            object.key,
                            key_value.key.value_text(),
                            constraint
                                .required_scope
                                .iter()
                                .map(EcoString::as_str)
                                .collect::<Vec<_>>()
                                .join(" | ")
                        ),
                        key_value.key.span,
                    ));
                }
            });
        }

        diagnostics
    }
}

// ── 5. Alias execution ──────────────────────────────────────────────────────

/// Dynamic alias keys and single-alias inlining at invocation sites.
pub struct AliasExecutionRule;

impl TypecheckRule for AliasExecutionRule {
    fn code(&self) -> &'static str {
        TYPECHECK_UNRESOLVED_REFERENCE
    }
    fn name(&self) -> &'static str {
        "aliasExecution"
    }
    fn domain(&self) -> RuleDomain {
        RuleDomain::Correctness
    }
    fn confidence(&self) -> RuleConfidence {
        RuleConfidence::Sound
    }

    fn run(&self, context: &RuleContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let services = context.services;

        for object in object_occurrences(context.parse.ast_root(), services) {
            let known_fields = constraints_for(services, &object);
            let active_subtype = object.subtype.map(|subtype| subtype.subtype_name.clone());

            for invocation in services
                .alias_invocations_by_object
                .get(&object.key)
                .into_iter()
                .flatten()
            {
                if let Some(required) = &invocation.required_subtype {
                    if active_subtype.as_ref() != Some(required) {
                        continue;
                    }
                }
                let relative_path = &invocation.parent_path[1..];
                for block in blocks_at_path(object.block, relative_path) {
                    self.check_dynamic_keys(
                        context,
                        &object,
                        block,
                        invocation,
                        &known_fields,
                        &mut diagnostics,
                    );
                }
            }

            for invocation in services
                .single_alias_invocations_by_object
                .get(&object.key)
                .into_iter()
                .flatten()
            {
                if let Some(required) = &invocation.required_subtype {
                    if active_subtype.as_ref() != Some(required) {
                        continue;
                    }
                }
                let relative_path = &invocation.field_path[1..];
                let Some((field_name, parent_path)) = relative_path.split_last() else {
                    continue;
                };
                let Some(definition) =
                    services.single_alias_definitions_by_name.get(&invocation.alias_name)
                else {
                    continue;
                };
                for block in blocks_at_path(object.block, parent_path) {
                    for statement in &block.statements {
                        let Some(key_value) = statement.as_key_value() else {
                            continue;
                        };
                        if key_value.key.value_text() != field_name.as_str() {
                            continue;
                        }
                        if let Some(AstValue::Block(body)) = key_value.value.as_ref() {
                            check_body_against_constraints(
                                &object.key,
                                key_value.key.span,
                                body,
                                &definition.field_constraints,
                                services,
                                &mut diagnostics,
                            );
                        }
                    }
                }
            }
        }

        diagnostics
    }
}

impl AliasExecutionRule {
    fn check_dynamic_keys(
        &self,
        context: &RuleContext<'_>,
        object: &ObjectOccurrence<'_>,
        block: &crate::ast::AstBlock,
        invocation: &crate::rules::adapters::AliasInvocation,
        known_fields: &IndexMap<EcoString, RuleFieldConstraint>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let services = context.services;
        let Some(members) = services.alias_memberships_by_family.get(&invocation.family) else {
            return;
        };

        for statement in &block.statements {
            let Some(key_value) = statement.as_key_value() else {
                continue;
            };
            let key = key_value.key.value_text();
            if known_fields.contains_key(key) {
                continue;
            }

            if !members.contains(key) {
                if services.policy.unresolved_reference == UnresolvedPolicy::Error {
                    diagnostics.push(field_diagnostic(
                        TYPECHECK_UNRESOLVED_REFERENCE,
                        format!(
                            "`{key}` is not a member of alias family `{}`",
                            invocation.family
                        ),
                        key_value.key.span,
                    ));
                }
                continue;
            }

            let definition = services
                .alias_definitions_by_family
                .get(&invocation.family)
                .and_then(|family| family.get(key));
            if let (Some(definition), Some(AstValue::Block(body))) =
                (definition, key_value.value.as_ref())
            {
                check_body_against_constraints(
                    &object.key,
                    key_value.key.span,
                    body,
                    &definition.field_constraints,
                    services,
                    diagnostics,
                );
            }
        }
    }
}

/// Validates a block body against an alias definition's field constraints:
/// required fields plus structural specs.
fn check_body_against_constraints(
    object_key: &EcoString,
    site_span: Span,
    body: &crate::ast::AstBlock,
    constraints: &IndexMap<EcoString, RuleFieldConstraint>,
    services: &TypecheckServices,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (field, constraint) in constraints {
        let occurrences: Vec<_> = body
            .statements
            .iter()
            .filter_map(|statement| statement.as_key_value())
            .filter(|key_value| key_value.key.value_text() == field.as_str())
            .collect();

        if occurrences.is_empty() {
            if constraint.required {
                diagnostics.push(field_diagnostic(
                    TYPECHECK_REQUIRED_FIELD_MISSING,
                    format!("`{object_key}` alias body is missing required field `{field}`"),
                    site_span,
                ));
            }
            continue;
        }
        if constraint.specs.is_empty() || constraint.specs.iter().any(spec_is_reference) {
            continue;
        }
        for key_value in occurrences {
            let matched = constraint.specs.iter().any(|spec| {
                structural_outcome(key_value.value.as_ref(), spec, services) == SpecOutcome::Pass
            });
            if !matched {
                diagnostics.push(field_diagnostic(
                    TYPECHECK_INVALID_FIELD_TYPE,
                    format!(
                        "`{field}` does not match {}",
                        describe_specs(&constraint.specs)
                    ),
                    key_value.key.span,
                ));
            }
        }
    }
}

// ── 6. Localisation ─────────────────────────────────────────────────────────

/// Localisation command scopes, key existence, and required templates.
pub struct LocalisationRule;

impl TypecheckRule for LocalisationRule {
    fn code(&self) -> &'static str {
        TYPECHECK_MISSING_LOCALISATION_KEY
    }
    fn name(&self) -> &'static str {
        "localisation"
    }
    fn domain(&self) -> RuleDomain {
        RuleDomain::Correctness
    }
    fn confidence(&self) -> RuleConfidence {
        RuleConfidence::Sound
    }

    fn run(&self, context: &RuleContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let services = context.services;

        for object in object_occurrences(context.parse.ast_root(), services) {
            let constraints = services
                .nested_field_constraints_by_object
                .get(&object.key)
                .cloned()
                .unwrap_or_default();

            walk_fields_with_scope(&object, services, &mut |_path, key_value, stack| {
                let Some(constraint) = constraints.get(key_value.key.value_text()) else {
                    return;
                };
                if !constraint.specs.iter().any(is_localisation_spec) {
                    return;
                }
                let Some(AstValue::Scalar(scalar)) = key_value.value.as_ref() else {
                    return;
                };

                let text = scalar.value_text();
                if text.contains('[') {
                    check_localisation_commands(
                        &object,
                        key_value.key.span,
                        text,
                        stack,
                        services,
                        &mut diagnostics,
                    );
                } else if !text.contains('$') && !services.localisation_key_provider.is_empty() {
                    check_key_existence(key_value.key.span, text, services, &mut diagnostics);
                }
            });

            check_required_templates(&object, services, &mut diagnostics);
        }

        diagnostics
    }
}

fn is_localisation_spec(spec: &RuleValueSpec) -> bool {
    matches!(
        spec,
        RuleValueSpec::Primitive {
            primitive: RulePrimitive::Localisation
                | RulePrimitive::LocalisationSynced
                | RulePrimitive::LocalisationInline,
            ..
        }
    )
}

fn check_localisation_commands(
    object: &ObjectOccurrence<'_>,
    span: Span,
    text: &str,
    stack: &ScopeStack,
    services: &TypecheckServices,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for token in bracketed_tokens(text) {
        let mut segments: Vec<&str> = token.split('.').collect();
        let Some(command) = segments.pop() else {
            continue;
        };
        let command = command.split('(').next().unwrap_or(command).trim();
        if command.is_empty() {
            continue;
        }

        let Some(definition) = services.localisation_command_definitions_by_name.get(command)
        else {
            if services.policy.unresolved_reference == UnresolvedPolicy::Error {
                diagnostics.push(field_diagnostic(
                    TYPECHECK_UNRESOLVED_REFERENCE,
                    format!("unknown localisation command `{command}`"),
                    span,
                ));
            }
            continue;
        };
        if definition
            .supported_scopes
            .iter()
            .any(|scope| scope == "any" || scope == "all")
        {
            continue;
        }

        // Leading segments re-anchor the evaluation scope.
        let evaluation_scope = if segments.is_empty() {
            stack.current().cloned()
        } else {
            match resolve_scope_expression(&segments.join("."), stack, services) {
                ScopeExprOutcome::Resolved(scope) => Some(scope),
                _ => None,
            }
        };

        let Some(scope) = evaluation_scope else {
            continue;
        };
        if !definition
            .supported_scopes
            .iter()
            .any(|supported| supported == &scope)
        {
            diagnostics.push(field_diagnostic(
                TYPECHECK_INVALID_FIELD_REFERENCE,
                format!(
                    "localisation command `{command}` does not support scope `{scope}` in `{}`",
                    object.key
                ),
                span,
            ));
        }
    }
}

fn bracketed_tokens(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        let after = &rest[open + 1..];
        let Some(close) = after.find(']') else {
            break;
        };
        tokens.push(&after[..close]);
        rest = &after[close + 1..];
    }
    tokens
}

fn check_key_existence(
    span: Span,
    key: &str,
    services: &TypecheckServices,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let provider = &services.localisation_key_provider;
    if !provider.has_key(key) {
        diagnostics.push(field_diagnostic(
            TYPECHECK_INVALID_FIELD_REFERENCE,
            format!("Unknown localisation key `{key}`"),
            span,
        ));
        return;
    }
    if services.policy.localisation_coverage == super::services::LocaleCoverage::All {
        let missing = provider.missing_locales(key, &services.policy.required_locales);
        if !missing.is_empty() {
            diagnostics.push(field_diagnostic(
                TYPECHECK_INVALID_FIELD_REFERENCE,
                format!(
                    "localisation key `{key}` missing locales: {}",
                    missing
                        .iter()
                        .map(EcoString::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                span,
            ));
        }
    }
}

fn check_required_templates(
    object: &ObjectOccurrence<'_>,
    services: &TypecheckServices,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if services.localisation_key_provider.is_empty() {
        return;
    }
    let active_subtype = object.subtype.map(|subtype| subtype.subtype_name.clone());

    for (type_key, templates) in &services.type_localisation_templates_by_type {
        let Some(members) = services.type_memberships_by_key.get(type_key) else {
            continue;
        };
        if !members.contains(object.key.as_str()) {
            continue;
        }
        for template in templates {
            if !template.required {
                continue;
            }
            if let Some(subtype) = &template.subtype_name {
                if active_subtype.as_ref() != Some(subtype) {
                    continue;
                }
            }
            let key = template.template.replace("$", object.key.as_str());
            if !services.localisation_key_provider.has_key(&key) {
                diagnostics.push(field_diagnostic(
                    TYPECHECK_MISSING_LOCALISATION_KEY,
                    format!("Missing required localisation key `{key}`"),
                    object.key_span,
                ));
            }
        }
    }
}

// ── 7. Modifier scopes ──────────────────────────────────────────────────────

/// Modifier-category scope compatibility at modifier alias sites.
pub struct ModifierScopeRule;

impl TypecheckRule for ModifierScopeRule {
    fn code(&self) -> &'static str {
        TYPECHECK_INVALID_MODIFIER_SCOPE
    }
    fn name(&self) -> &'static str {
        "modifierScope"
    }
    fn domain(&self) -> RuleDomain {
        RuleDomain::Correctness
    }
    fn confidence(&self) -> RuleConfidence {
        RuleConfidence::Sound
    }

    fn run(&self, context: &RuleContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let services = context.services;

        for object in object_occurrences(context.parse.ast_root(), services) {
            let invocation_parents: Vec<Vec<EcoString>> = services
                .alias_invocations_by_object
                .get(&object.key)
                .into_iter()
                .flatten()
                .filter(|invocation| invocation.family == "modifier")
                .map(|invocation| invocation.parent_path[1..].to_vec())
                .collect();
            if invocation_parents.is_empty() {
                continue;
            }

            walk_fields_with_scope(&object, services, &mut |path, key_value, stack| {
                let parent = &path[..path.len() - 1];
                if !invocation_parents.iter().any(|p| p == parent) {
                    return;
                }
                let Some(definition) = services
                    .modifier_definitions_by_name
                    .get(key_value.key.value_text())
                else {
                    return;
                };

                if definition.supported_scopes.is_empty() {
                    if services.policy.strict_modifiers {
                        diagnostics.push(field_diagnostic(
                            TYPECHECK_INVALID_MODIFIER_SCOPE,
                            format!(
                                "modifier `{}` has no scope metadata",
                                definition.name
                            ),
                            key_value.key.span,
                        ));
                    }
                    return;
                }
                let Some(current) = stack.current() else {
                    return;
                };
                let compatible = definition
                    .supported_scopes
                    .iter()
                    .any(|scope| scope == current || scope == "any" || scope == "all");
                if !compatible {
                    diagnostics.push(field_diagnostic(
                        TYPECHECK_INVALID_MODIFIER_SCOPE,
                        format!(
                            "modifier `{}` does not apply in scope `{current}`",
                            definition.name
                        ),
                        key_value.key.span,
                    ));
                }
            });
        }

        diagnostics
    }
}

// ── 8. Custom constraints ───────────────────────────────────────────────────

/// `## error_if_only_match` branch annotations.
pub struct ErrorIfOnlyMatchRule;

impl TypecheckRule for ErrorIfOnlyMatchRule {
    fn code(&self) -> &'static str {
        TYPECHECK_RULE_CUSTOM_ERROR
    }
    fn name(&self) -> &'static str {
        "errorIfOnlyMatch"
    }
    fn domain(&self) -> RuleDomain {
        RuleDomain::Correctness
    }
    fn confidence(&self) -> RuleConfidence {
        RuleConfidence::Sound
    }

    fn run(&self, context: &RuleContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for object in object_occurrences(context.parse.ast_root(), context.services) {
            let constraints = constraints_for(context.services, &object);

            for statement in &object.block.statements {
                let Some(key_value) = statement.as_key_value() else {
                    continue;
                };
                let Some(constraint) = constraints.get(key_value.key.value_text()) else {
                    continue;
                };
                let Some(message) = &constraint.error_if_only_match else {
                    continue;
                };

                let matched = constraint.specs.iter().any(|spec| {
                    structural_outcome(key_value.value.as_ref(), spec, context.services)
                        == SpecOutcome::Pass
                });
                if matched {
                    diagnostics.push(field_diagnostic(
                        TYPECHECK_RULE_CUSTOM_ERROR,
                        format!(
                            "`{}.{}`: {message}",
                            object.key,
                            key_value.key.value_text()
                        ),
                        key_value.key.span,
                    ));
                }
            }
        }

        diagnostics
    }
}

// ── 9. Shape consistency ────────────────────────────────────────────────────

/// Flags top-level keys that switch between scalar/block/tagged shapes.
pub struct InconsistentShapeRule;

impl TypecheckRule for InconsistentShapeRule {
    fn code(&self) -> &'static str {
        TYPECHECK_INCONSISTENT_VALUE_SHAPE
    }
    fn name(&self) -> &'static str {
        "inconsistentShape"
    }
    fn domain(&self) -> RuleDomain {
        RuleDomain::Correctness
    }
    fn confidence(&self) -> RuleConfidence {
        RuleConfidence::Sound
    }

    fn run(&self, context: &RuleContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for (key, shapes) in &context.type_facts.inconsistent_top_level_shapes {
            let span = context
                .parse
                .ast_root()
                .statements
                .iter()
                .filter_map(|statement| statement.as_key_value())
                .find(|key_value| key_value.key.value_text() == key.as_str())
                .map_or(Span::empty(0), |key_value| key_value.key.span);

            diagnostics.push(field_diagnostic(
                TYPECHECK_INCONSISTENT_VALUE_SHAPE,
                format!(
                    "key `{key}` uses multiple value shapes: {}",
                    shapes.join(", ")
                ),
                span,
            ));
        }

        diagnostics
    }
}
