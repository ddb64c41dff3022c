// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The scope-context stack.
//!
//! Validation walks the AST with a stack of scope frames. Entering a rule
//! position with `push_scope` pushes frames; entering one with
//! `replace_scope` (and no `push_scope` — push wins on the same path)
//! installs direct alias mappings. Sibling subtrees never observe each
//! other's frames: the walker pushes on entry and truncates on exit.
//!
//! Alias resolution order: replacement mappings first (nearest frame
//! wins), then the chain — `this`, `root`, `from`/`from_from`/…,
//! `prev`/`prev_prev`/…. Both `prev_prev` and `prevprev` spellings are
//! accepted.

use ecow::EcoString;
use indexmap::IndexMap;

/// Outcome of resolving a scope alias or link chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeResolution {
    /// Resolved to a concrete scope name.
    Resolved(EcoString),
    /// A replacement mapping had conflicting targets for the alias.
    Ambiguous(EcoString),
    /// Nothing in context answers the alias.
    Unresolved,
}

#[derive(Debug, Clone, Default)]
struct ScopeFrame {
    current: Option<EcoString>,
    root: Option<EcoString>,
    /// `prev`, `prev_prev`, … outward.
    prev_chain: Vec<EcoString>,
    /// `from`, `from_from`, … outward.
    from_chain: Vec<EcoString>,
    /// Direct alias → target mappings from `replace_scope`; an alias may
    /// map to several targets, which is reported as ambiguity.
    replacements: IndexMap<EcoString, Vec<EcoString>>,
}

/// Bound on the `prev`/`from` history kept per frame.
const CHAIN_DEPTH: usize = 4;

/// The scope-context stack maintained during a type-check walk.
#[derive(Debug, Clone, Default)]
pub struct ScopeStack {
    frames: Vec<ScopeFrame>,
}

impl ScopeStack {
    /// Creates an empty stack (no scope context).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of frames; used by the walker to truncate on exit.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Drops frames pushed after `depth`.
    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    /// The current scope, if any context is established.
    #[must_use]
    pub fn current(&self) -> Option<&EcoString> {
        self.frames.last().and_then(|frame| frame.current.as_ref())
    }

    /// Pushes one scope, updating the prev/from chains.
    pub fn push_scope(&mut self, scope: &str) {
        let scope = EcoString::from(scope.to_ascii_lowercase());
        let previous = self.frames.last().cloned().unwrap_or_default();

        let mut prev_chain = Vec::with_capacity(CHAIN_DEPTH);
        let mut from_chain = Vec::with_capacity(CHAIN_DEPTH);
        if let Some(current) = &previous.current {
            prev_chain.push(current.clone());
            from_chain.push(current.clone());
            prev_chain.extend(previous.prev_chain.iter().take(CHAIN_DEPTH - 1).cloned());
            from_chain.extend(previous.from_chain.iter().take(CHAIN_DEPTH - 1).cloned());
        }

        self.frames.push(ScopeFrame {
            root: previous.root.clone().or_else(|| Some(scope.clone())),
            current: Some(scope),
            prev_chain,
            from_chain,
            replacements: previous.replacements,
        });
    }

    /// Pushes each scope of a `push_scope` list in order.
    pub fn push_scopes(&mut self, scopes: &[EcoString]) {
        for scope in scopes {
            self.push_scope(scope);
        }
    }

    /// Installs `replace_scope` alias mappings as a new frame.
    pub fn push_replacements(&mut self, replacements: &[(EcoString, EcoString)]) {
        let mut frame = self.frames.last().cloned().unwrap_or_default();
        for (source, target) in replacements {
            let source = EcoString::from(source.to_ascii_lowercase());
            let target = EcoString::from(target.to_ascii_lowercase());
            let targets = frame.replacements.entry(source.clone()).or_default();
            if !targets.contains(&target) {
                targets.push(target.clone());
            }
            // `this` and `root` replacements also rebind the chain heads.
            if source == "this" {
                frame.current = Some(target.clone());
            }
            if source == "root" {
                frame.root = Some(target);
            }
        }
        self.frames.push(frame);
    }

    /// True if the innermost frame carries a replacement alias with
    /// conflicting targets.
    #[must_use]
    pub fn has_ambiguous_replacements(&self) -> bool {
        self.frames
            .last()
            .is_some_and(|frame| frame.replacements.values().any(|targets| targets.len() > 1))
    }

    /// Resolves a scope alias (`this`, `root`, `from_from`, `prevprev`, …).
    #[must_use]
    pub fn resolve_alias(&self, alias: &str) -> ScopeResolution {
        let lowered = alias.to_ascii_lowercase();
        let Some(frame) = self.frames.last() else {
            return ScopeResolution::Unresolved;
        };

        if let Some(targets) = frame.replacements.get(lowered.as_str()) {
            return match targets.as_slice() {
                [single] => ScopeResolution::Resolved(single.clone()),
                _ => ScopeResolution::Ambiguous(EcoString::from(lowered)),
            };
        }

        match lowered.as_str() {
            "this" => frame
                .current
                .clone()
                .map_or(ScopeResolution::Unresolved, ScopeResolution::Resolved),
            "root" => frame
                .root
                .clone()
                .map_or(ScopeResolution::Unresolved, ScopeResolution::Resolved),
            _ => {
                if let Some(depth) = chain_depth(&lowered, "from") {
                    return chain_lookup(&frame.from_chain, depth);
                }
                if let Some(depth) = chain_depth(&lowered, "prev") {
                    return chain_lookup(&frame.prev_chain, depth);
                }
                ScopeResolution::Unresolved
            }
        }
    }

    /// True if `alias` is one of the scope alias spellings.
    #[must_use]
    pub fn is_scope_alias(alias: &str) -> bool {
        let lowered = alias.to_ascii_lowercase();
        lowered == "this"
            || lowered == "root"
            || chain_depth(&lowered, "from").is_some()
            || chain_depth(&lowered, "prev").is_some()
    }
}

/// Parses `from`/`from_from`/`fromfrom` style chains; returns the depth.
fn chain_depth(alias: &str, head: &str) -> Option<usize> {
    if !alias.starts_with(head) {
        return None;
    }
    let mut depth = 0;
    let mut rest = alias;
    while let Some(stripped) = rest.strip_prefix(head) {
        depth += 1;
        rest = stripped.strip_prefix('_').unwrap_or(stripped);
    }
    if rest.is_empty() {
        Some(depth)
    } else {
        None
    }
}

fn chain_lookup(chain: &[EcoString], depth: usize) -> ScopeResolution {
    chain
        .get(depth - 1)
        .cloned()
        .map_or(ScopeResolution::Unresolved, ScopeResolution::Resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn this_and_root_resolve_after_push() {
        let mut stack = ScopeStack::new();
        stack.push_scope("country");
        assert_eq!(
            stack.resolve_alias("this"),
            ScopeResolution::Resolved(EcoString::from("country"))
        );
        assert_eq!(
            stack.resolve_alias("root"),
            ScopeResolution::Resolved(EcoString::from("country"))
        );
    }

    #[test]
    fn prev_and_from_chains_after_nested_pushes() {
        let mut stack = ScopeStack::new();
        stack.push_scopes(&[
            EcoString::from("country"),
            EcoString::from("state"),
            EcoString::from("province"),
        ]);
        assert_eq!(
            stack.resolve_alias("this"),
            ScopeResolution::Resolved(EcoString::from("province"))
        );
        assert_eq!(
            stack.resolve_alias("prev"),
            ScopeResolution::Resolved(EcoString::from("state"))
        );
        assert_eq!(
            stack.resolve_alias("prevprev"),
            ScopeResolution::Resolved(EcoString::from("country"))
        );
        assert_eq!(
            stack.resolve_alias("prev_prev"),
            ScopeResolution::Resolved(EcoString::from("country"))
        );
        assert_eq!(
            stack.resolve_alias("from"),
            ScopeResolution::Resolved(EcoString::from("state"))
        );
        assert_eq!(
            stack.resolve_alias("root"),
            ScopeResolution::Resolved(EcoString::from("country"))
        );
    }

    #[test]
    fn replacements_override_the_chain() {
        let mut stack = ScopeStack::new();
        stack.push_scopes(&[EcoString::from("country"), EcoString::from("state")]);
        stack.push_replacements(&[(EcoString::from("from"), EcoString::from("planet"))]);
        assert_eq!(
            stack.resolve_alias("from"),
            ScopeResolution::Resolved(EcoString::from("planet"))
        );
        // The chain still answers the others.
        assert_eq!(
            stack.resolve_alias("prev"),
            ScopeResolution::Resolved(EcoString::from("country"))
        );
    }

    #[test]
    fn conflicting_replacements_are_ambiguous() {
        let mut stack = ScopeStack::new();
        stack.push_replacements(&[
            (EcoString::from("from"), EcoString::from("country")),
            (EcoString::from("from"), EcoString::from("state")),
        ]);
        assert!(matches!(
            stack.resolve_alias("from"),
            ScopeResolution::Ambiguous(_)
        ));
    }

    #[test]
    fn this_replacement_rebinds_current() {
        let mut stack = ScopeStack::new();
        stack.push_replacements(&[(EcoString::from("this"), EcoString::from("planet"))]);
        assert_eq!(
            stack.current().map(EcoString::as_str),
            Some("planet")
        );
    }

    #[test]
    fn empty_stack_resolves_nothing() {
        let stack = ScopeStack::new();
        assert_eq!(stack.resolve_alias("this"), ScopeResolution::Unresolved);
        assert_eq!(stack.resolve_alias("prev"), ScopeResolution::Unresolved);
    }

    #[test]
    fn truncate_restores_sibling_isolation() {
        let mut stack = ScopeStack::new();
        stack.push_scope("country");
        let depth = stack.depth();
        stack.push_scope("state");
        stack.truncate(depth);
        assert_eq!(stack.current().map(EcoString::as_str), Some("country"));
    }

    #[test]
    fn alias_spellings() {
        assert!(ScopeStack::is_scope_alias("this"));
        assert!(ScopeStack::is_scope_alias("ROOT"));
        assert!(ScopeStack::is_scope_alias("from_from"));
        assert!(ScopeStack::is_scope_alias("fromfrom"));
        assert!(ScopeStack::is_scope_alias("prevprevprev"));
        assert!(!ScopeStack::is_scope_alias("owner"));
        assert!(!ScopeStack::is_scope_alias("from_x"));
    }
}
