// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lint: a top-level key should keep one value shape.

use crate::diagnostics::{Diagnostic, DiagnosticCategory, LINT_SEMANTIC_INCONSISTENT_SHAPE};
use crate::source_analysis::Span;
use crate::typecheck::{RuleConfidence, RuleDomain};

use super::{LintContext, LintRule};

/// Flags keys that alternate between scalar/block/tagged forms, reading
/// the type checker's shape facts across the one-way boundary.
pub struct InconsistentShapeLint;

impl LintRule for InconsistentShapeLint {
    fn code(&self) -> &'static str {
        LINT_SEMANTIC_INCONSISTENT_SHAPE
    }
    fn name(&self) -> &'static str {
        "semanticInconsistentShape"
    }
    fn domain(&self) -> RuleDomain {
        RuleDomain::Semantic
    }
    fn confidence(&self) -> RuleConfidence {
        RuleConfidence::Heuristic
    }

    fn run(&self, context: &LintContext<'_>) -> Vec<Diagnostic> {
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

            diagnostics.push(
                Diagnostic::warning(
                    self.code(),
                    format!(
                        "key `{key}` should use one value shape, found: {}",
                        shapes.join(", ")
                    ),
                    span,
                    DiagnosticCategory::Lint,
                )
                .with_hint("move alternative shapes under explicit nested keys"),
            );
        }
        diagnostics
    }
}
