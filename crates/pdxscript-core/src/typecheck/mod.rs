// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Schema-driven type checking.
//!
//! The engine walks the AST guided by the schema graph's adapter
//! artifacts, maintaining a scope-context stack, and emits correctness
//! diagnostics. Rules are deterministic, ordered, and contract-checked
//! (`domain = correctness`, `confidence = sound`, `TYPECHECK_` codes)
//! before execution. Walks over distinct carriers may run concurrently
//! against one shared [`TypecheckServices`]; the scope stack is private to
//! each walk.

mod assets;
mod contract;
mod rules;
mod runner;
mod scope;
mod services;
mod walk;


pub use assets::{AssetLookup, AssetRegistry, NullAssetRegistry, SetAssetRegistry};
pub use contract::{
    validate_typecheck_rules, RuleConfidence, RuleContext, RuleContractError, RuleDomain,
    TypecheckRule,
};
pub use rules::{default_typecheck_rules, TYPECHECK_AMBIGUOUS_SCOPE_CONTEXT};
pub use runner::{
    build_typecheck_facts, run_typecheck, run_typecheck_with_rules, TypecheckFacts,
    TypecheckRunResult,
};
pub use scope::{ScopeResolution, ScopeStack};
pub use services::{
    build_field_scope_constraints_by_object, build_typecheck_services, FieldPath,
    FieldScopeConstraint, LocaleCoverage, TypecheckPolicy, TypecheckServices, UnresolvedPolicy,
};
