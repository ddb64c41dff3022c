// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Typed AST over the lossless CST.
//!
//! The canonical AST preserves source order and repeated keys; it never
//! merges, sorts, or coerces. Object/multimap/array shapes are derived
//! [`views`], and scalar meaning is computed lazily by
//! [`scalar::interpret_scalar`]. Lowering from the red tree is a pure
//! read — parser and CST state are untouched.

mod lower;
pub mod scalar;
mod views;

pub use lower::{lower_source_file, lower_statement_list};
pub use scalar::{interpret_scalar, ScalarNumber, ScalarValue};
pub use views::{BlockShape, BlockView};

use ecow::EcoString;

use crate::source_analysis::Span;

/// The eight assignment/comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AstOperator {
    Equal,
    EqualEqual,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    QuestionEqual,
}

impl AstOperator {
    /// The operator's source spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            AstOperator::Equal => "=",
            AstOperator::EqualEqual => "==",
            AstOperator::NotEqual => "!=",
            AstOperator::LessThan => "<",
            AstOperator::LessThanOrEqual => "<=",
            AstOperator::GreaterThan => ">",
            AstOperator::GreaterThanOrEqual => ">=",
            AstOperator::QuestionEqual => "?=",
        }
    }
}

/// A scalar value preserved as raw CST token text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstScalar {
    /// The token text exactly as written, quotes included.
    pub raw_text: EcoString,
    /// True for `"..."` scalars.
    pub was_quoted: bool,
    /// The token's span, trivia excluded.
    pub span: Span,
}

impl AstScalar {
    /// The scalar's logical text: surrounding quotes stripped when quoted.
    ///
    /// Escape sequences are left untouched; unescaping is a consumer
    /// decision.
    #[must_use]
    pub fn value_text(&self) -> &str {
        if self.was_quoted {
            let trimmed = self.raw_text.as_str();
            trimmed
                .strip_prefix('"')
                .and_then(|rest| rest.strip_suffix('"'))
                .unwrap_or(trimmed)
        } else {
            &self.raw_text
        }
    }

    /// Interprets the scalar with the default non-coercing policy.
    #[must_use]
    pub fn interpret(&self) -> ScalarValue {
        interpret_scalar(self.value_text(), self.was_quoted, false)
    }

    /// Interprets the scalar, coercing quoted text too.
    #[must_use]
    pub fn interpret_allow_quoted(&self) -> ScalarValue {
        interpret_scalar(self.value_text(), self.was_quoted, true)
    }
}

/// An externally tagged block value, e.g. `rgb { 100 200 150 }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstTaggedBlockValue {
    pub tag: AstScalar,
    pub block: AstBlock,
    pub span: Span,
}

/// A key-value statement. `operator` is `None` for the implicit
/// `key{...}` assignment form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstKeyValue {
    pub key: AstScalar,
    pub operator: Option<AstOperator>,
    pub value: Option<AstValue>,
    pub span: Span,
}

impl AstKeyValue {
    /// The operator, defaulting to `=` for implicit assignments.
    #[must_use]
    pub fn operator_or_default(&self) -> AstOperator {
        self.operator.unwrap_or(AstOperator::Equal)
    }
}

/// A recovered parse fragment retained so downstream passes can proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstError {
    pub raw_text: EcoString,
    pub span: Span,
}

/// A `{ ... }` block preserving statement order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstBlock {
    pub statements: Vec<AstStatement>,
    pub span: Span,
}

impl AstBlock {
    /// Classifies the block's statement shape.
    #[must_use]
    pub fn shape(&self) -> BlockShape {
        views::classify(self)
    }

    /// True when every statement is a key-value.
    #[must_use]
    pub fn is_object_like(&self) -> bool {
        self.shape() == BlockShape::ObjectLike
    }

    /// True when no statement is a key-value.
    #[must_use]
    pub fn is_array_like(&self) -> bool {
        self.shape() == BlockShape::ArrayLike
    }

    /// A consumer view over this block.
    #[must_use]
    pub fn view(&self) -> BlockView<'_> {
        BlockView::new(self)
    }
}

/// The right-hand side of a key-value statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstValue {
    Scalar(AstScalar),
    Block(AstBlock),
    Tagged(AstTaggedBlockValue),
    Error(AstError),
}

impl AstValue {
    /// The value as a scalar, if it is one.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&AstScalar> {
        match self {
            AstValue::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// The value as a block, if it is one.
    #[must_use]
    pub fn as_block(&self) -> Option<&AstBlock> {
        match self {
            AstValue::Block(block) => Some(block),
            _ => None,
        }
    }

    /// The value's span.
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            AstValue::Scalar(scalar) => scalar.span,
            AstValue::Block(block) => block.span,
            AstValue::Tagged(tagged) => tagged.span,
            AstValue::Error(error) => error.span,
        }
    }
}

/// One statement: a key-value, a bare value, or a recovered fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstStatement {
    KeyValue(AstKeyValue),
    Scalar(AstScalar),
    Block(AstBlock),
    Error(AstError),
}

impl AstStatement {
    /// The statement as a key-value, if it is one.
    #[must_use]
    pub fn as_key_value(&self) -> Option<&AstKeyValue> {
        match self {
            AstStatement::KeyValue(key_value) => Some(key_value),
            _ => None,
        }
    }
}

/// A parsed source file: an ordered statement sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AstSourceFile {
    pub statements: Vec<AstStatement>,
}
