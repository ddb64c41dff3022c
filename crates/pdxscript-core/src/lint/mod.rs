// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lint passes for PDXScript source.
//!
//! Lint rules follow the same rule-engine contract as the type checker but
//! from the other side of the fence: `domain` is semantic/style/heuristic,
//! `confidence` is policy/heuristic, and codes carry the `LINT_` prefix.
//! Type facts flow in through a one-way boundary — lint rules read
//! [`TypecheckFacts`] but the type checker never sees lint output.
//!
//! # Adding a New Lint
//!
//! 1. Implement [`LintRule`] in its own module.
//! 2. Add it to [`default_lint_rules`].

mod inconsistent_shape;
mod missing_required_field;
mod single_line_block;

pub use inconsistent_shape::InconsistentShapeLint;
pub use missing_required_field::MissingRequiredFieldLint;
pub use single_line_block::SingleLineMultiValueBlockLint;

use tracing::debug;

use crate::analysis::AnalysisFacts;
use crate::diagnostics::{dedup_by_position, sort_diagnostics, Diagnostic};
use crate::pipeline::ParseResult;
use crate::typecheck::{RuleConfidence, RuleContractError, RuleDomain, TypecheckFacts};

/// Everything a lint rule reads during one pass.
pub struct LintContext<'a> {
    pub parse: &'a ParseResult,
    pub facts: &'a AnalysisFacts,
    /// Type facts, read-only across the engine boundary.
    pub type_facts: &'a TypecheckFacts,
}

impl LintContext<'_> {
    /// The source text under lint.
    #[must_use]
    pub fn source(&self) -> &str {
        self.parse.source_text()
    }
}

/// A lint rule: metadata plus a checking pass.
pub trait LintRule {
    /// The diagnostic code this rule emits under.
    fn code(&self) -> &'static str;
    /// A short camel-case rule name.
    fn name(&self) -> &'static str;
    /// Semantic, style, or heuristic.
    fn domain(&self) -> RuleDomain;
    /// Policy or heuristic.
    fn confidence(&self) -> RuleConfidence;
    /// Runs the rule over one parse.
    fn run(&self, context: &LintContext<'_>) -> Vec<Diagnostic>;
}

/// The default lint rules, in execution order.
#[must_use]
pub fn default_lint_rules() -> Vec<Box<dyn LintRule>> {
    vec![
        Box::new(InconsistentShapeLint),
        Box::new(MissingRequiredFieldLint::default()),
        Box::new(SingleLineMultiValueBlockLint),
    ]
}

/// Rejects lint rules that violate the engine contract.
///
/// # Errors
///
/// Returns the first [`RuleContractError`] found.
pub fn validate_lint_rules(rules: &[Box<dyn LintRule>]) -> Result<(), RuleContractError> {
    const ALLOWED_DOMAINS: &[RuleDomain] =
        &[RuleDomain::Semantic, RuleDomain::Style, RuleDomain::Heuristic];
    const ALLOWED_CONFIDENCE: &[RuleConfidence] =
        &[RuleConfidence::Policy, RuleConfidence::Heuristic];

    for rule in rules {
        if !ALLOWED_DOMAINS.contains(&rule.domain()) {
            return Err(RuleContractError::InvalidDomain {
                name: rule.name().to_string(),
                domain: rule.domain(),
                expected: ALLOWED_DOMAINS,
            });
        }
        if !ALLOWED_CONFIDENCE.contains(&rule.confidence()) {
            return Err(RuleContractError::InvalidConfidence {
                name: rule.name().to_string(),
                confidence: rule.confidence(),
                expected: ALLOWED_CONFIDENCE,
            });
        }
        if !rule.code().starts_with("LINT_") {
            return Err(RuleContractError::InvalidCodePrefix {
                name: rule.name().to_string(),
                code: rule.code(),
                prefix: "LINT_",
            });
        }
    }
    Ok(())
}

/// Result of running the lint rules over one parse.
#[derive(Debug)]
pub struct LintRunResult {
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs the default lint rules over an existing parse carrier.
///
/// # Errors
///
/// Returns [`RuleContractError`] when a rule violates the engine contract.
pub fn run_lint(
    parse: &ParseResult,
    type_facts: &TypecheckFacts,
) -> Result<LintRunResult, RuleContractError> {
    run_lint_with_rules(parse, type_facts, default_lint_rules())
}

/// Runs an explicit lint rule list over an existing parse carrier.
///
/// # Errors
///
/// Returns [`RuleContractError`] when a rule violates the engine contract.
pub fn run_lint_with_rules(
    parse: &ParseResult,
    type_facts: &TypecheckFacts,
    rules: Vec<Box<dyn LintRule>>,
) -> Result<LintRunResult, RuleContractError> {
    validate_lint_rules(&rules)?;

    let context = LintContext {
        parse,
        facts: parse.analysis_facts(),
        type_facts,
    };

    let mut diagnostics = Vec::new();
    for rule in &rules {
        let emitted = rule.run(&context);
        debug!(rule = rule.name(), count = emitted.len(), "lint rule ran");
        diagnostics.extend(emitted);
    }

    let mut diagnostics = dedup_by_position(diagnostics);
    sort_diagnostics(&mut diagnostics);
    Ok(LintRunResult { diagnostics })
}
