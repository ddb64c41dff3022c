// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lint: policy reminder for required fields on configured objects.

use ecow::EcoString;
use indexmap::IndexMap;

use crate::ast::AstValue;
use crate::diagnostics::{
    Diagnostic, DiagnosticCategory, LINT_SEMANTIC_MISSING_REQUIRED_FIELD,
};
use crate::typecheck::{RuleConfidence, RuleDomain};

use super::{LintContext, LintRule};

/// Flags configured objects missing fields the local policy requires.
///
/// Unlike the type checker's schema-driven required-field rule this one is
/// a plain policy list, useful for project conventions the schema does not
/// encode. With no configuration it does nothing.
#[derive(Default)]
pub struct MissingRequiredFieldLint {
    pub required_fields_by_object: IndexMap<EcoString, Vec<EcoString>>,
}

impl LintRule for MissingRequiredFieldLint {
    fn code(&self) -> &'static str {
        LINT_SEMANTIC_MISSING_REQUIRED_FIELD
    }
    fn name(&self) -> &'static str {
        "semanticMissingRequiredField"
    }
    fn domain(&self) -> RuleDomain {
        RuleDomain::Semantic
    }
    fn confidence(&self) -> RuleConfidence {
        RuleConfidence::Policy
    }

    fn run(&self, context: &LintContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for statement in &context.parse.ast_root().statements {
            let Some(key_value) = statement.as_key_value() else {
                continue;
            };
            let Some(required) = self
                .required_fields_by_object
                .get(key_value.key.value_text())
            else {
                continue;
            };
            let Some(AstValue::Block(block)) = key_value.value.as_ref() else {
                continue;
            };
            if !block.is_object_like() {
                continue;
            }

            for field in required {
                let present = block.statements.iter().any(|statement| {
                    statement
                        .as_key_value()
                        .is_some_and(|kv| kv.key.value_text() == field.as_str())
                });
                if !present {
                    diagnostics.push(
                        Diagnostic::warning(
                            self.code(),
                            format!(
                                "object `{}` is missing `{field}`",
                                key_value.key.value_text()
                            ),
                            key_value.key.span,
                            DiagnosticCategory::Lint,
                        )
                        .with_hint(format!("add `{field} = ...`")),
                    );
                }
            }
        }

        diagnostics
    }
}
