// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Normalized intermediate representation for CWTools `.cwt` rules files.
//!
//! The rules DSL shares the game-script grammar; what makes it a schema
//! language is the metadata carried in comments. `##` lines attach options
//! to the following statement, `###` lines attach documentation. Lowering
//! harvests both from the statement's leading trivia and parses the
//! well-known options (`cardinality`, `scope`, `push_scope`,
//! `replace_scope`, `severity`, …) into typed fields.

use std::collections::BTreeSet;
use std::sync::Arc;

use ecow::EcoString;

use crate::source_analysis::Span;

/// Statement classification in the rules IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleStatementKind {
    KeyValue,
    Value,
    Error,
}

/// A structured option parsed from one `##` comment line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOption {
    pub key: EcoString,
    pub value: Option<EcoString>,
    pub raw: EcoString,
}

/// Typed cardinality parsed from `## cardinality = [~]min..max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuleCardinality {
    pub min: Option<u32>,
    pub max: Option<u32>,
    /// `~min` marks the minimum as a soft requirement.
    pub soft_min: bool,
    pub min_unbounded: bool,
    pub max_unbounded: bool,
}

impl RuleCardinality {
    /// True if the declaration requires at least one occurrence.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.min_unbounded || self.min.is_some_and(|min| min > 0)
    }
}

/// One `this = planet` style pair from `## replace_scope = { ... }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleScopeReplacement {
    pub source: EcoString,
    pub target: EcoString,
}

/// Documentation and options attached to one declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleMetadata {
    pub documentation: Vec<EcoString>,
    pub options: Vec<RuleOption>,
    pub cardinality: Option<RuleCardinality>,
    pub scope: Option<Vec<EcoString>>,
    pub push_scope: Option<Vec<EcoString>>,
    pub replace_scope: Option<Vec<RuleScopeReplacement>>,
    pub severity: Option<EcoString>,
    /// Set when the declaration uses the `==` comparison operator.
    pub comparison: bool,
    pub error_if_only_match: Option<EcoString>,
    /// Value-less `##` options, e.g. `## required`.
    pub flags: BTreeSet<EcoString>,
}

impl RuleMetadata {
    /// True if a value-less flag with this name is present.
    #[must_use]
    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.iter().any(|flag| flag.eq_ignore_ascii_case(name))
    }
}

/// Right-hand expression of a rule statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleExpression {
    Missing,
    Scalar(EcoString),
    Block(Vec<Arc<RuleStatement>>),
    TaggedBlock {
        tag: EcoString,
        block: Vec<Arc<RuleStatement>>,
    },
    Error(EcoString),
}

impl RuleExpression {
    /// The scalar text, if this is a scalar.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&EcoString> {
        match self {
            RuleExpression::Scalar(text) => Some(text),
            _ => None,
        }
    }

    /// The block statements, if this is a block or tagged block.
    #[must_use]
    pub fn as_block(&self) -> Option<&[Arc<RuleStatement>]> {
        match self {
            RuleExpression::Block(block) | RuleExpression::TaggedBlock { block, .. } => {
                Some(block)
            }
            _ => None,
        }
    }
}

/// One normalized statement from a rules file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleStatement {
    pub source_path: EcoString,
    pub span: Span,
    pub kind: RuleStatementKind,
    pub key: Option<EcoString>,
    pub operator: Option<EcoString>,
    pub value: RuleExpression,
    pub metadata: RuleMetadata,
}

/// IR for one parsed rules file.
#[derive(Debug, Clone, Default)]
pub struct RuleFileIR {
    pub path: EcoString,
    pub statements: Vec<Arc<RuleStatement>>,
    pub diagnostics: Vec<crate::diagnostics::Diagnostic>,
}

/// Declaration category inferred from the key pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleCategory {
    Alias,
    SingleAlias,
    Type,
    Enum,
    ComplexEnum,
    Value,
    ValueSet,
    /// Top-level special sections: `types`, `enums`, `links`, `scopes`, …
    Section,
    /// Bracketed keys outside the known families, e.g. `subtype[x]`.
    Pattern,
    /// Everything else: concrete object rules.
    Rule,
}

/// Category-indexed declaration reference.
#[derive(Debug, Clone)]
pub struct IndexedRuleStatement {
    pub category: RuleCategory,
    pub source_path: EcoString,
    pub span: Span,
    pub key: EcoString,
    /// The bracket family, e.g. `type` for `type[technology]`.
    pub family: Option<EcoString>,
    /// The bracket argument, e.g. `technology` for `type[technology]`.
    pub argument: Option<EcoString>,
    /// Repeated-key disambiguator: `key#occurrence` segments from the root.
    pub declaration_path: Vec<EcoString>,
    pub statement: Arc<RuleStatement>,
}

impl IndexedRuleStatement {
    /// The declaration's index name: argument, else family, else key.
    #[must_use]
    pub fn name(&self) -> &EcoString {
        self.argument
            .as_ref()
            .or(self.family.as_ref())
            .unwrap_or(&self.key)
    }
}

/// Merged rules IR across multiple files.
#[derive(Debug, Clone, Default)]
pub struct RuleSetIR {
    pub files: Vec<RuleFileIR>,
    pub indexed: Vec<IndexedRuleStatement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cardinality_required_logic() {
        let required = RuleCardinality {
            min: Some(1),
            max: Some(1),
            ..RuleCardinality::default()
        };
        assert!(required.is_required());

        let optional = RuleCardinality {
            min: Some(0),
            max: Some(5),
            ..RuleCardinality::default()
        };
        assert!(!optional.is_required());

        let unbounded_min = RuleCardinality {
            min_unbounded: true,
            ..RuleCardinality::default()
        };
        assert!(unbounded_min.is_required());
    }

    #[test]
    fn metadata_flags_are_case_insensitive() {
        let mut metadata = RuleMetadata::default();
        metadata.flags.insert(EcoString::from("Required"));
        assert!(metadata.has_flag("required"));
        assert!(!metadata.has_flag("optional"));
    }
}
