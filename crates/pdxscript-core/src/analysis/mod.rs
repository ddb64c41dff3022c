// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Shared parse-derived facts for the rule engines.

mod facts;

pub use facts::{build_analysis_facts, AnalysisFacts, FieldFact, ValueShape};
