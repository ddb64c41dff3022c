// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The rule contract shared by the type-check and lint engines.
//!
//! A rule is a value: validation behaviour plus metadata. The runners
//! enforce the metadata mechanically before execution — a type-check rule
//! must be a sound correctness rule with a `TYPECHECK_` code; a lint rule
//! must be a policy/heuristic rule with a `LINT_` code. A rule that lies
//! about its domain is rejected, not run.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::analysis::AnalysisFacts;
use crate::diagnostics::Diagnostic;
use crate::pipeline::ParseResult;

use super::services::TypecheckServices;

/// What a rule's findings are about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleDomain {
    /// Violations are definitely wrong per the schema.
    Correctness,
    /// Meaning-level observations short of correctness claims.
    Semantic,
    /// Formatting and layout policy.
    Style,
    /// Best-effort pattern detection.
    Heuristic,
}

/// How certain a rule's findings are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleConfidence {
    /// A reported violation is always a real violation.
    Sound,
    /// Findings reflect a configured policy.
    Policy,
    /// Findings may be wrong.
    Heuristic,
}

/// A rule whose metadata violated the engine contract.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum RuleContractError {
    #[error("rule `{name}` declares domain {domain:?}; this engine requires {expected:?}")]
    InvalidDomain {
        name: String,
        domain: RuleDomain,
        expected: &'static [RuleDomain],
    },

    #[error("rule `{name}` declares confidence {confidence:?}; this engine requires {expected:?}")]
    InvalidConfidence {
        name: String,
        confidence: RuleConfidence,
        expected: &'static [RuleConfidence],
    },

    #[error("rule `{name}` has code `{code}`; this engine requires the `{prefix}` prefix")]
    InvalidCodePrefix {
        name: String,
        code: &'static str,
        prefix: &'static str,
    },
}

/// Everything a type-check rule reads during one walk.
pub struct RuleContext<'a> {
    pub parse: &'a ParseResult,
    pub facts: &'a AnalysisFacts,
    pub type_facts: &'a super::runner::TypecheckFacts,
    pub services: &'a TypecheckServices,
}

impl RuleContext<'_> {
    /// The source text under check.
    #[must_use]
    pub fn source(&self) -> &str {
        self.parse.source_text()
    }
}

/// A type-check rule: metadata plus a validation pass.
///
/// Rules emit diagnostics and continue; no rule may abort the walk.
pub trait TypecheckRule {
    /// The diagnostic code this rule emits under.
    fn code(&self) -> &'static str;
    /// A short camel-case rule name for error reporting.
    fn name(&self) -> &'static str;
    /// The rule's declared domain; must be [`RuleDomain::Correctness`].
    fn domain(&self) -> RuleDomain;
    /// The rule's declared confidence; must be [`RuleConfidence::Sound`].
    fn confidence(&self) -> RuleConfidence;
    /// Runs the rule over one parse.
    fn run(&self, context: &RuleContext<'_>) -> Vec<Diagnostic>;
}

/// Rejects type-check rules that violate the engine contract.
///
/// # Errors
///
/// Returns the first [`RuleContractError`] found.
pub fn validate_typecheck_rules(
    rules: &[Box<dyn TypecheckRule>],
) -> Result<(), RuleContractError> {
    for rule in rules {
        if rule.domain() != RuleDomain::Correctness {
            return Err(RuleContractError::InvalidDomain {
                name: rule.name().to_string(),
                domain: rule.domain(),
                expected: &[RuleDomain::Correctness],
            });
        }
        if rule.confidence() != RuleConfidence::Sound {
            return Err(RuleContractError::InvalidConfidence {
                name: rule.name().to_string(),
                confidence: rule.confidence(),
                expected: &[RuleConfidence::Sound],
            });
        }
        if !rule.code().starts_with("TYPECHECK_") {
            return Err(RuleContractError::InvalidCodePrefix {
                name: rule.name().to_string(),
                code: rule.code(),
                prefix: "TYPECHECK_",
            });
        }
    }
    Ok(())
}
