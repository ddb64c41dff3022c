// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Parse carriers and pipeline entrypoints.
//!
//! [`ParseResult`] is the parse-once/consume-many carrier: one parse feeds
//! the formatter, the lint engine, and the type checker. The green tree and
//! diagnostics are built eagerly; the red tree, AST, root view, and
//! analysis facts are lazy one-shot caches.

mod result;

pub use result::{parse, parse_with_options, ParseResult};

pub use crate::source_analysis::{ParseMode, ParseOptions};
