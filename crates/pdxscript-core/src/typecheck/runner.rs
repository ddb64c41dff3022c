// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The type-check runner: one parse lifecycle, one deterministic walk.

use ecow::EcoString;
use indexmap::IndexMap;
use tracing::debug;

use crate::analysis::{AnalysisFacts, ValueShape};
use crate::diagnostics::{dedup_by_position, sort_diagnostics, Diagnostic};
use crate::pipeline::ParseResult;

use super::contract::{validate_typecheck_rules, RuleContext, RuleContractError, TypecheckRule};
use super::rules::default_typecheck_rules;
use super::services::TypecheckServices;

/// Type facts derived from the shared analysis facts.
#[derive(Debug, Clone, Default)]
pub struct TypecheckFacts {
    /// Top-level keys whose values use more than one shape, with the
    /// shape names in deterministic order.
    pub inconsistent_top_level_shapes: IndexMap<EcoString, Vec<String>>,
}

/// Builds type facts from the analysis fact index.
#[must_use]
pub fn build_typecheck_facts(facts: &AnalysisFacts) -> TypecheckFacts {
    let mut inconsistent = IndexMap::new();
    for (key, shapes) in &facts.top_level_shapes {
        if shapes.len() > 1 {
            inconsistent.insert(
                key.clone(),
                shapes.iter().map(|shape| shape_name(*shape).to_string()).collect(),
            );
        }
    }
    TypecheckFacts {
        inconsistent_top_level_shapes: inconsistent,
    }
}

fn shape_name(shape: ValueShape) -> &'static str {
    match shape {
        ValueShape::Missing => "missing",
        ValueShape::Scalar => "scalar",
        ValueShape::Block => "block",
        ValueShape::Tagged => "tagged",
        ValueShape::Error => "error",
    }
}

/// Result of running the type-check rule stack over one parse.
#[derive(Debug)]
pub struct TypecheckRunResult {
    /// Rule diagnostics only (parse diagnostics stay on the carrier),
    /// deduplicated at `(code, start)` and position-sorted.
    pub diagnostics: Vec<Diagnostic>,
    pub facts: TypecheckFacts,
}

/// Runs the default rule stack over an existing parse carrier.
///
/// # Errors
///
/// Returns [`RuleContractError`] when a rule violates the engine contract;
/// rules are rejected before execution.
pub fn run_typecheck(
    parse: &ParseResult,
    services: &TypecheckServices,
) -> Result<TypecheckRunResult, RuleContractError> {
    run_typecheck_with_rules(parse, services, default_typecheck_rules())
}

/// Runs an explicit rule stack over an existing parse carrier.
///
/// # Errors
///
/// Returns [`RuleContractError`] when a rule violates the engine contract.
pub fn run_typecheck_with_rules(
    parse: &ParseResult,
    services: &TypecheckServices,
    rules: Vec<Box<dyn TypecheckRule>>,
) -> Result<TypecheckRunResult, RuleContractError> {
    validate_typecheck_rules(&rules)?;

    let facts = parse.analysis_facts();
    let type_facts = build_typecheck_facts(facts);
    let context = RuleContext {
        parse,
        facts,
        type_facts: &type_facts,
        services,
    };

    let mut diagnostics = Vec::new();
    for rule in &rules {
        let emitted = rule.run(&context);
        debug!(rule = rule.name(), count = emitted.len(), "typecheck rule ran");
        diagnostics.extend(emitted);
    }

    let mut diagnostics = dedup_by_position(diagnostics);
    sort_diagnostics(&mut diagnostics);

    Ok(TypecheckRunResult {
        diagnostics,
        facts: type_facts,
    })
}
