// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lowering from the red CST into the typed AST.

use ecow::EcoString;

use crate::syntax::{SyntaxElement, SyntaxKind, SyntaxNode};

use super::{
    AstBlock, AstError, AstKeyValue, AstOperator, AstScalar, AstSourceFile, AstStatement,
    AstTaggedBlockValue, AstValue,
};

/// Lowers a red root (or `SOURCE_FILE`) node into an [`AstSourceFile`].
#[must_use]
pub fn lower_source_file(root: &SyntaxNode) -> AstSourceFile {
    let source_file = if root.kind() == SyntaxKind::SourceFile {
        Some(root.clone())
    } else {
        root.first_child_of_kind(SyntaxKind::SourceFile)
    };
    let Some(source_file) = source_file else {
        return AstSourceFile::default();
    };
    let Some(list) = source_file.first_child_of_kind(SyntaxKind::StatementList) else {
        return AstSourceFile::default();
    };
    AstSourceFile {
        statements: lower_statement_list(&list),
    }
}

/// Lowers a `STATEMENT_LIST` node's children in source order.
#[must_use]
pub fn lower_statement_list(list: &SyntaxNode) -> Vec<AstStatement> {
    let mut statements = Vec::new();
    for child in list.child_nodes() {
        match child.kind() {
            SyntaxKind::KeyValue => statements.push(lower_key_value(&child)),
            SyntaxKind::Scalar => {
                if let Some(scalar) = lower_scalar(&child) {
                    statements.push(AstStatement::Scalar(scalar));
                }
            }
            SyntaxKind::Block => statements.push(AstStatement::Block(lower_block(&child))),
            SyntaxKind::Error => statements.push(AstStatement::Error(lower_error(&child))),
            _ => {}
        }
    }
    statements
}

fn lower_key_value(node: &SyntaxNode) -> AstStatement {
    let mut key: Option<AstScalar> = None;
    let mut operator: Option<AstOperator> = None;
    let mut value: Option<AstValue> = None;

    for child in node.children() {
        match child {
            SyntaxElement::Node(child_node) => {
                if key.is_none() && child_node.kind() == SyntaxKind::Scalar {
                    key = lower_scalar(&child_node);
                    continue;
                }
                if value.is_none() {
                    value = lower_value(&child_node);
                }
            }
            SyntaxElement::Token(token) => {
                if operator.is_none() {
                    operator = operator_from_kind(token.kind());
                }
            }
        }
    }

    let Some(key) = key else {
        return AstStatement::Error(lower_error(node));
    };
    AstStatement::KeyValue(AstKeyValue {
        key,
        operator,
        value,
        span: node.trimmed_span(),
    })
}

fn lower_value(node: &SyntaxNode) -> Option<AstValue> {
    match node.kind() {
        SyntaxKind::Scalar => lower_scalar(node).map(AstValue::Scalar),
        SyntaxKind::Block => Some(AstValue::Block(lower_block(node))),
        SyntaxKind::TaggedBlockValue => Some(AstValue::Tagged(lower_tagged(node))),
        SyntaxKind::Error => Some(AstValue::Error(lower_error(node))),
        _ => None,
    }
}

fn lower_block(node: &SyntaxNode) -> AstBlock {
    let statements = node
        .first_child_of_kind(SyntaxKind::StatementList)
        .map(|list| lower_statement_list(&list))
        .unwrap_or_default();
    AstBlock {
        statements,
        span: node.trimmed_span(),
    }
}

fn lower_tagged(node: &SyntaxNode) -> AstTaggedBlockValue {
    let tag = node
        .first_child_of_kind(SyntaxKind::Scalar)
        .and_then(|scalar| lower_scalar(&scalar))
        .unwrap_or(AstScalar {
            raw_text: EcoString::new(),
            was_quoted: false,
            span: node.trimmed_span(),
        });
    let block = node
        .first_child_of_kind(SyntaxKind::Block)
        .map(|block| lower_block(&block))
        .unwrap_or(AstBlock {
            statements: Vec::new(),
            span: node.trimmed_span(),
        });
    AstTaggedBlockValue {
        tag,
        block,
        span: node.trimmed_span(),
    }
}

fn lower_scalar(node: &SyntaxNode) -> Option<AstScalar> {
    let token = node
        .child_tokens()
        .into_iter()
        .find(|token| token.kind().is_token())?;
    Some(AstScalar {
        raw_text: EcoString::from(token.text()),
        was_quoted: token.kind() == SyntaxKind::ScalarQuoted,
        span: token.token_span(),
    })
}

fn lower_error(node: &SyntaxNode) -> AstError {
    AstError {
        raw_text: EcoString::from(node.text_trimmed()),
        span: node.trimmed_span(),
    }
}

fn operator_from_kind(kind: SyntaxKind) -> Option<AstOperator> {
    match kind {
        SyntaxKind::Equal => Some(AstOperator::Equal),
        SyntaxKind::EqualEqual => Some(AstOperator::EqualEqual),
        SyntaxKind::NotEqual => Some(AstOperator::NotEqual),
        SyntaxKind::LessThan => Some(AstOperator::LessThan),
        SyntaxKind::LessThanOrEqual => Some(AstOperator::LessThanOrEqual),
        SyntaxKind::GreaterThan => Some(AstOperator::GreaterThan),
        SyntaxKind::GreaterThanOrEqual => Some(AstOperator::GreaterThanOrEqual),
        SyntaxKind::QuestionEqual => Some(AstOperator::QuestionEqual),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::pipeline::{parse, parse_with_options, ParseOptions};

    use super::super::{AstOperator, AstStatement, AstValue};

    #[test]
    fn lowers_compact_form() {
        let result = parse("a={b=\"1\"c=d}foo=bar#good\n");
        let ast = result.ast_root();
        assert_eq!(ast.statements.len(), 2);

        let a = ast.statements[0].as_key_value().expect("a");
        assert_eq!(a.key.raw_text, "a");
        let block = a.value.as_ref().unwrap().as_block().expect("block");
        assert_eq!(block.statements.len(), 2);
        let b = block.statements[0].as_key_value().expect("b");
        assert_eq!(b.key.raw_text, "b");
        let b_value = b.value.as_ref().unwrap().as_scalar().expect("scalar");
        assert!(b_value.was_quoted);
        assert_eq!(b_value.raw_text, "\"1\"");
        assert_eq!(b_value.value_text(), "1");

        let foo = ast.statements[1].as_key_value().expect("foo");
        assert_eq!(foo.key.raw_text, "foo");
    }

    #[test]
    fn repeated_keys_stay_separate() {
        let result = parse("modifier = { x = 0.5 }\nmodifier = { y = 0.25 }\n");
        let ast = result.ast_root();
        let keys: Vec<_> = ast
            .statements
            .iter()
            .filter_map(|s| s.as_key_value())
            .map(|kv| kv.key.raw_text.clone())
            .collect();
        assert_eq!(keys, vec!["modifier", "modifier"]);
    }

    #[test]
    fn implicit_assignment_has_no_operator() {
        let result = parse("key{ a = 1 }");
        let ast = result.ast_root();
        let key_value = ast.statements[0].as_key_value().expect("key value");
        assert_eq!(key_value.operator, None);
        assert_eq!(key_value.operator_or_default(), AstOperator::Equal);
        assert!(key_value.value.as_ref().unwrap().as_block().is_some());
    }

    #[test]
    fn tagged_block_value_lowered() {
        let result = parse("color = rgb { 100 200 150 }");
        let ast = result.ast_root();
        let key_value = ast.statements[0].as_key_value().expect("color");
        let AstValue::Tagged(tagged) = key_value.value.as_ref().unwrap() else {
            panic!("expected tagged block value");
        };
        assert_eq!(tagged.tag.raw_text, "rgb");
        assert_eq!(tagged.block.statements.len(), 3);
        assert!(tagged.block.is_array_like());
    }

    #[test]
    fn error_nodes_become_ast_errors() {
        let result = parse_with_options("a=1 ?=oops\nb=2\n", ParseOptions::permissive());
        let ast = result.ast_root();
        assert!(ast
            .statements
            .iter()
            .any(|s| matches!(s, AstStatement::Error(_))));
    }

    #[test]
    fn spans_point_into_source() {
        let source = "alpha = beta";
        let result = parse(source);
        let ast = result.ast_root();
        let key_value = ast.statements[0].as_key_value().expect("kv");
        assert_eq!(&source[key_value.key.span.as_range()], "alpha");
        let value = key_value.value.as_ref().unwrap();
        assert_eq!(&source[value.span().as_range()], "beta");
    }
}
