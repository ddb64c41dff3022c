// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lint: `{ a b c }` blocks with several values belong on multiple lines.

use crate::ast::{AstStatement, AstValue};
use crate::diagnostics::{Diagnostic, DiagnosticCategory, LINT_STYLE_SINGLE_LINE_BLOCK};
use crate::typecheck::{RuleConfidence, RuleDomain};

use super::{LintContext, LintRule};

/// Flags blocks whose statements all share one source line while holding
/// more than one value.
pub struct SingleLineMultiValueBlockLint;

impl LintRule for SingleLineMultiValueBlockLint {
    fn code(&self) -> &'static str {
        LINT_STYLE_SINGLE_LINE_BLOCK
    }
    fn name(&self) -> &'static str {
        "styleSingleLineMultiValueBlock"
    }
    fn domain(&self) -> RuleDomain {
        RuleDomain::Style
    }
    fn confidence(&self) -> RuleConfidence {
        RuleConfidence::Policy
    }

    fn run(&self, context: &LintContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let source = context.source();
        for statement in &context.parse.ast_root().statements {
            visit_statement(statement, source, &mut diagnostics, self.code());
        }
        diagnostics
    }
}

fn visit_statement(
    statement: &AstStatement,
    source: &str,
    diagnostics: &mut Vec<Diagnostic>,
    code: &'static str,
) {
    let block = match statement {
        AstStatement::KeyValue(key_value) => match key_value.value.as_ref() {
            Some(AstValue::Block(block)) => Some(block),
            Some(AstValue::Tagged(tagged)) => Some(&tagged.block),
            _ => None,
        },
        AstStatement::Block(block) => Some(block),
        _ => None,
    };
    let Some(block) = block else {
        return;
    };

    if block.statements.len() > 1 && !source[block.span.as_range()].contains('\n') {
        diagnostics.push(
            Diagnostic::warning(
                code,
                "block holds multiple values on a single line",
                block.span,
                DiagnosticCategory::Lint,
            )
            .with_hint("use multiline layout inside braces when multiple values are present"),
        );
    }

    for nested in &block.statements {
        visit_statement(nested, source, diagnostics, code);
    }
}
