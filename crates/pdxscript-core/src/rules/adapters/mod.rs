// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Adapters: deterministic artifacts derived from the schema graph.
//!
//! The type-check engine never walks raw rules IR. Each adapter
//! materialises one precomputed artifact — alias tables, subtype matchers,
//! complex-enum memberships, special-file providers — so validation is a
//! lookup, not a re-interpretation. For fixed inputs every artifact is
//! identical across runs.

pub mod aliases;
pub mod common;
pub mod complex_enums;
pub mod models;
pub mod special_files;
pub mod subtypes;

pub use aliases::{
    build_alias_definitions_by_family, build_alias_invocations_by_object,
    build_alias_members_by_family, build_expanded_field_constraints,
    build_nested_field_constraints, build_single_alias_definitions,
    build_single_alias_invocations_by_object, build_type_localisation_templates_by_type,
};
pub use complex_enums::{build_complex_enum_definitions, build_complex_enum_values_from_file_texts};
pub use models::{
    AliasDefinition, AliasInvocation, ComplexEnumDefinition, LinkDefinition, LinkType,
    LocalisationCommandDefinition, MemberSet, ModifierDefinition, SingleAliasDefinition,
    SingleAliasInvocation, SubtypeMatcher, TypeLocalisationTemplate,
};
pub use special_files::{
    build_link_definitions, build_localisation_command_definitions, build_modifier_definitions,
    build_scope_catalog, build_templated_modifier_definitions, build_values_memberships_by_key,
    ScopeCatalog,
};
pub use subtypes::{build_subtype_field_constraints_by_object, build_subtype_matchers_by_object};
