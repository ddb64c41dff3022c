// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Small shared readers over rule-statement blocks.

use std::sync::Arc;

use ecow::EcoString;

use crate::rules::ir::{RuleExpression, RuleStatement, RuleStatementKind};
use crate::rules::semantics::strip_quotes;

/// The first scalar child value under `key`, quotes stripped.
#[must_use]
pub fn find_scalar_child(statements: &[Arc<RuleStatement>], key: &str) -> Option<EcoString> {
    statements.iter().find_map(|statement| {
        if statement.kind != RuleStatementKind::KeyValue || statement.key.as_deref() != Some(key) {
            return None;
        }
        statement
            .value
            .as_scalar()
            .map(|text| EcoString::from(strip_quotes(text)))
            .filter(|text| !text.is_empty())
    })
}

/// All scalar child values under `key`, quotes stripped.
#[must_use]
pub fn find_scalar_children(statements: &[Arc<RuleStatement>], key: &str) -> Vec<EcoString> {
    statements
        .iter()
        .filter(|statement| {
            statement.kind == RuleStatementKind::KeyValue && statement.key.as_deref() == Some(key)
        })
        .filter_map(|statement| statement.value.as_scalar())
        .map(|text| EcoString::from(strip_quotes(text)))
        .filter(|text| !text.is_empty())
        .collect()
}

/// The first block-valued child under `key`.
#[must_use]
pub fn find_block_child<'a>(
    statements: &'a [Arc<RuleStatement>],
    key: &str,
) -> Option<&'a Arc<RuleStatement>> {
    statements.iter().find(|statement| {
        statement.kind == RuleStatementKind::KeyValue
            && statement.key.as_deref() == Some(key)
            && matches!(statement.value, RuleExpression::Block(_))
    })
}

/// Parses `family[inner]` keys against an expected family.
#[must_use]
pub fn parse_bracket_key(raw_key: &str, expected_family: &str) -> Option<EcoString> {
    let rest = raw_key.strip_prefix(expected_family)?;
    let inner = rest.strip_prefix('[')?.strip_suffix(']')?.trim();
    if inner.is_empty() {
        None
    } else {
        Some(EcoString::from(inner))
    }
}

/// A scope list from either a scalar or a `{ a b c }` block value.
#[must_use]
pub fn extract_scope_list(statement: &RuleStatement) -> Vec<EcoString> {
    match &statement.value {
        RuleExpression::Scalar(text) => {
            let scope = strip_quotes(text);
            if scope.is_empty() {
                Vec::new()
            } else {
                vec![EcoString::from(scope.to_ascii_lowercase())]
            }
        }
        RuleExpression::Block(block) => block
            .iter()
            .filter(|child| child.kind == RuleStatementKind::Value)
            .filter_map(|child| child.value.as_scalar())
            .map(|text| EcoString::from(strip_quotes(text).to_ascii_lowercase()))
            .filter(|text| !text.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Normalizes a path to forward slashes without leading `./`.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut normalized = path.trim().replace('\\', "/");
    while let Some(stripped) = normalized.strip_prefix("./") {
        normalized = stripped.to_string();
    }
    normalized
}

/// Strips the conventional `game/` prefix used by CWTools path filters.
#[must_use]
pub fn strip_game_prefix(path: &str) -> &str {
    path.strip_prefix("game/").unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use crate::rules::parser::parse_rules_text;

    use super::*;

    #[test]
    fn scalar_child_readers_strip_quotes() {
        let file = parse_rules_text(
            "def = {\n  path = \"game/common/tech\"\n  path = extra\n  nested = {}\n}\n",
            "test.cwt",
        );
        let block = file.statements[0].value.as_block().unwrap();
        assert_eq!(
            find_scalar_child(block, "path").as_deref(),
            Some("game/common/tech")
        );
        assert_eq!(find_scalar_children(block, "path").len(), 2);
        assert!(find_block_child(block, "nested").is_some());
        assert!(find_block_child(block, "path").is_none());
    }

    #[test]
    fn bracket_key_parsing() {
        assert_eq!(
            parse_bracket_key("value[flags]", "value").as_deref(),
            Some("flags")
        );
        assert_eq!(parse_bracket_key("value[]", "value"), None);
        assert_eq!(parse_bracket_key("other[x]", "value"), None);
    }

    #[test]
    fn path_normalization() {
        assert_eq!(normalize_path(".\\common\\tech"), "common/tech");
        assert_eq!(strip_game_prefix("game/common"), "common");
        assert_eq!(strip_game_prefix("common"), "common");
    }
}
