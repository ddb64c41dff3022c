// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! `.cwt` rules-file parsing and lowering into raw IR.
//!
//! The rules DSL reuses the core pipeline with the permissive grammar
//! profile (shipped CWTools configs use `==` comparison markers and the
//! occasional unbalanced brace). Lowering walks the red tree; each
//! statement's `##`/`###` metadata comments are harvested from the leading
//! trivia of its first token, which is exactly where the trailing-trivia
//! policy guarantees they end up.

use std::sync::Arc;

use ecow::EcoString;

use crate::pipeline::{parse_with_options, ParseOptions};
use crate::syntax::{SyntaxElement, SyntaxKind, SyntaxNode};

use super::ir::{
    RuleExpression, RuleFileIR, RuleMetadata, RuleOption, RuleStatement, RuleStatementKind,
};

/// Parses one rules file's text into raw file IR.
#[must_use]
pub fn parse_rules_text(text: &str, source_path: &str) -> RuleFileIR {
    let result = parse_with_options(text, ParseOptions::permissive());
    let root = result.syntax_root();

    let Some(source_file) = root.first_child_of_kind(SyntaxKind::SourceFile) else {
        return RuleFileIR {
            path: EcoString::from(source_path),
            statements: Vec::new(),
            diagnostics: result.diagnostics().to_vec(),
        };
    };
    let Some(list) = source_file.first_child_of_kind(SyntaxKind::StatementList) else {
        return RuleFileIR {
            path: EcoString::from(source_path),
            statements: Vec::new(),
            diagnostics: result.diagnostics().to_vec(),
        };
    };

    RuleFileIR {
        path: EcoString::from(source_path),
        statements: lower_statement_list(&list, source_path),
        diagnostics: result.diagnostics().to_vec(),
    }
}

fn lower_statement_list(list: &SyntaxNode, path: &str) -> Vec<Arc<RuleStatement>> {
    list.child_nodes()
        .iter()
        .filter(|node| {
            matches!(
                node.kind(),
                SyntaxKind::KeyValue | SyntaxKind::Scalar | SyntaxKind::Block | SyntaxKind::Error
            )
        })
        .map(|node| Arc::new(lower_statement(node, path)))
        .collect()
}

fn lower_statement(node: &SyntaxNode, path: &str) -> RuleStatement {
    let metadata = extract_metadata(node);
    let span = node.trimmed_span();

    match node.kind() {
        SyntaxKind::KeyValue => {
            let (key, operator, value) = lower_key_value(node, path);
            RuleStatement {
                source_path: EcoString::from(path),
                span,
                kind: RuleStatementKind::KeyValue,
                key,
                operator,
                value,
                metadata,
            }
        }
        SyntaxKind::Scalar => RuleStatement {
            source_path: EcoString::from(path),
            span,
            kind: RuleStatementKind::Value,
            key: None,
            operator: None,
            value: RuleExpression::Scalar(EcoString::from(node.text_trimmed())),
            metadata,
        },
        SyntaxKind::Block => RuleStatement {
            source_path: EcoString::from(path),
            span,
            kind: RuleStatementKind::Value,
            key: None,
            operator: None,
            value: lower_block_expression(node, path),
            metadata,
        },
        _ => RuleStatement {
            source_path: EcoString::from(path),
            span,
            kind: RuleStatementKind::Error,
            key: None,
            operator: None,
            value: RuleExpression::Error(EcoString::from(node.text_trimmed())),
            metadata,
        },
    }
}

fn lower_key_value(
    node: &SyntaxNode,
    path: &str,
) -> (Option<EcoString>, Option<EcoString>, RuleExpression) {
    let mut key: Option<EcoString> = None;
    let mut operator: Option<EcoString> = None;
    let mut value = RuleExpression::Missing;
    let mut saw_value = false;

    for child in node.children() {
        match child {
            SyntaxElement::Node(child_node) => {
                if key.is_none() && child_node.kind() == SyntaxKind::Scalar {
                    key = Some(EcoString::from(child_node.text_trimmed()));
                    continue;
                }
                if !saw_value {
                    if let Some(expression) = lower_expression(&child_node, path) {
                        value = expression;
                        saw_value = true;
                    }
                }
            }
            SyntaxElement::Token(token) => {
                if operator.is_none() && token.kind().is_operator() {
                    operator = Some(EcoString::from(token.text()));
                }
            }
        }
    }

    (key, operator, value)
}

fn lower_expression(node: &SyntaxNode, path: &str) -> Option<RuleExpression> {
    match node.kind() {
        SyntaxKind::Scalar => Some(RuleExpression::Scalar(EcoString::from(node.text_trimmed()))),
        SyntaxKind::Block => Some(lower_block_expression(node, path)),
        SyntaxKind::TaggedBlockValue => {
            let tag = node
                .first_child_of_kind(SyntaxKind::Scalar)
                .map(|scalar| EcoString::from(scalar.text_trimmed()))
                .unwrap_or_default();
            let block = node
                .first_child_of_kind(SyntaxKind::Block)
                .and_then(|block| block.first_child_of_kind(SyntaxKind::StatementList))
                .map(|list| lower_statement_list(&list, path))
                .unwrap_or_default();
            Some(RuleExpression::TaggedBlock { tag, block })
        }
        SyntaxKind::Error => Some(RuleExpression::Error(EcoString::from(node.text_trimmed()))),
        _ => None,
    }
}

fn lower_block_expression(node: &SyntaxNode, path: &str) -> RuleExpression {
    let statements = node
        .first_child_of_kind(SyntaxKind::StatementList)
        .map(|list| lower_statement_list(&list, path))
        .unwrap_or_default();
    RuleExpression::Block(statements)
}

/// Harvests `##` options and `###` docs from a statement's leading trivia.
fn extract_metadata(node: &SyntaxNode) -> RuleMetadata {
    let Some(first_token) = node.descendant_tokens().into_iter().next() else {
        return RuleMetadata::default();
    };

    let mut metadata = RuleMetadata::default();
    for line in first_token.leading_trivia_text().lines() {
        let line = line.trim();
        if let Some(doc) = line.strip_prefix("###") {
            metadata.documentation.push(EcoString::from(doc.trim()));
            continue;
        }
        let Some(option) = line.strip_prefix("##") else {
            continue;
        };
        let option = option.trim();
        if option.is_empty() {
            continue;
        }
        match option.split_once('=') {
            Some((key, value)) => metadata.options.push(RuleOption {
                key: EcoString::from(key.trim()),
                value: Some(EcoString::from(value.trim())).filter(|v| !v.is_empty()),
                raw: EcoString::from(option),
            }),
            None => metadata.options.push(RuleOption {
                key: EcoString::from(option),
                value: None,
                raw: EcoString::from(option),
            }),
        }
    }
    metadata
}
