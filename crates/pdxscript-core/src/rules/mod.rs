// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! CWTools `.cwt` rules ingest, normalized schema graph, and adapters.
//!
//! The rules DSL pipeline mirrors the game-script pipeline: the same lexer
//! and parser, a DSL-aware lowering that harvests `##`/`###` metadata
//! comments, a normalization pass producing a deterministic indexed IR,
//! and a cross-file [`SchemaGraph`](schema_graph::SchemaGraph) the
//! adapters and the type checker consume.

pub mod adapters;
pub mod ir;
pub mod load;
pub mod normalize;
pub mod parser;
pub mod schema_graph;
pub mod semantics;
pub mod type_members;

pub use ir::{
    IndexedRuleStatement, RuleCardinality, RuleCategory, RuleExpression, RuleFileIR, RuleMetadata,
    RuleOption, RuleScopeReplacement, RuleSetIR, RuleStatement, RuleStatementKind,
};
pub use load::{collect_file_texts_under_root, load_rules_directory, LoadedRules, SchemaLoadError};
pub use normalize::normalize_ruleset;
pub use parser::parse_rules_text;
pub use schema_graph::{build_schema_graph, SchemaGraph};
pub use semantics::{
    build_constraints_from_rule_block, extract_value_specs, merge_specs, parse_value_spec,
    RuleFieldConstraint, RulePrimitive, RuleValueSpec,
};
pub use type_members::{
    build_type_memberships_from_file_texts, extract_type_definitions, TypeDefinition,
};
