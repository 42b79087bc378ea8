//! In-memory evaluatable index.

use crate::policy::{Evaluatable, PolicyDocument, PolicyRef, PolicyTreeNode};
use crate::request::Request;
use crate::{Error, Result};

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Supplies the top-level evaluatables of a request and resolves references.
pub trait EvaluatableIndex: Send + Sync {
    /// Top-level evaluatables to combine for `request`, in evaluation order.
    fn candidates(&self, request: &Request) -> Vec<PolicyRef>;

    /// Look up a top-level evaluatable by id.
    fn resolve(&self, id: &str) -> Option<PolicyRef>;
}

/// Thread-safe, insertion-ordered store of top-level policies and policy
/// sets.
///
/// Candidates are the enabled entries by descending priority. Entries with
/// equal priority keep their load order, which is what the ordered combining
/// algorithms rely on.
///
/// Every change bumps a generation counter, which lets callers tell whether
/// the store moved on since they last looked.
#[derive(Debug, Default)]
pub struct PolicyStore {
    entries: RwLock<Vec<PolicyRef>>,
    generation: AtomicU64,
}

impl PolicyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a top-level evaluatable.
    ///
    /// A replaced entry keeps its position. References are only valid as
    /// children and are rejected.
    pub fn insert(&self, node: PolicyTreeNode) -> Result<()> {
        if let PolicyTreeNode::Reference(reference) = &node {
            return Err(Error::validation_field(
                format!("Reference to '{}' cannot be loaded at top level", reference.id),
                "kind",
            ));
        }
        node.validate()?;
        for defect in node.defects() {
            tracing::warn!(
                evaluatable = node.id(),
                defect = %defect,
                "Loaded evaluatable will evaluate to Indeterminate"
            );
        }

        let node = Arc::new(node);
        let mut entries = self.entries.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        match entries.iter_mut().find(|existing| existing.id() == node.id()) {
            Some(existing) => {
                tracing::info!(evaluatable = node.id(), "Replaced evaluatable");
                *existing = node;
            }
            None => {
                tracing::info!(
                    evaluatable = node.id(),
                    kind = node.kind(),
                    "Loaded evaluatable"
                );
                entries.push(node);
            }
        }
        Ok(())
    }

    /// Add every top-level evaluatable of a document.
    pub fn insert_document(&self, document: PolicyDocument) -> Result<usize> {
        document.validate()?;
        let count = document.policies.len();
        for node in document.policies {
            self.insert(node)?;
        }
        Ok(count)
    }

    /// Remove a top-level evaluatable.
    pub fn remove(&self, id: &str) -> Option<PolicyRef> {
        let mut entries = self.entries.write();
        let position = entries.iter().position(|node| node.id() == id)?;
        self.generation.fetch_add(1, Ordering::AcqRel);
        tracing::info!(evaluatable = id, "Removed evaluatable");
        Some(entries.remove(position))
    }

    /// Get a top-level evaluatable by id.
    pub fn get(&self, id: &str) -> Option<PolicyRef> {
        self.entries.read().iter().find(|node| node.id() == id).cloned()
    }

    /// All top-level evaluatables in load order.
    pub fn list(&self) -> Vec<PolicyRef> {
        self.entries.read().clone()
    }

    /// Number of stored evaluatables.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Remove everything.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.clear();
    }

    /// Number of changes made so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl EvaluatableIndex for PolicyStore {
    fn candidates(&self, _request: &Request) -> Vec<PolicyRef> {
        let mut candidates: Vec<_> = self
            .entries
            .read()
            .iter()
            .filter(|node| node.is_enabled())
            .cloned()
            .collect();
        candidates.sort_by(|a, b| b.priority().cmp(&a.priority()));
        candidates
    }

    fn resolve(&self, id: &str) -> Option<PolicyRef> {
        self.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combining::RuleCombiningAlgId;
    use crate::policy::{Policy, PolicyReference, Rule};

    fn policy(id: &str, priority: i32, enabled: bool) -> PolicyTreeNode {
        Policy::builder(id)
            .combining_algorithm(RuleCombiningAlgId::DenyOverrides)
            .rule(Rule::permit("r"))
            .priority(priority)
            .enabled(enabled)
            .build()
            .into()
    }

    fn ids(nodes: &[PolicyRef]) -> Vec<&str> {
        nodes.iter().map(|n| n.id()).collect()
    }

    #[test]
    fn test_candidates_order() {
        let store = PolicyStore::new();
        store.insert(policy("low", 1, true)).unwrap();
        store.insert(policy("first-high", 5, true)).unwrap();
        store.insert(policy("disabled", 9, false)).unwrap();
        store.insert(policy("second-high", 5, true)).unwrap();

        let candidates = store.candidates(&Request::new());
        assert_eq!(ids(&candidates), vec!["first-high", "second-high", "low"]);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_replace_keeps_position() {
        let store = PolicyStore::new();
        store.insert(policy("a", 0, true)).unwrap();
        store.insert(policy("b", 0, true)).unwrap();
        store.insert(policy("a", 0, false)).unwrap();

        assert_eq!(ids(&store.list()), vec!["a", "b"]);
        assert!(!store.get("a").unwrap().is_enabled());
    }

    #[test]
    fn test_remove_and_resolve() {
        let store = PolicyStore::new();
        store.insert(policy("a", 0, true)).unwrap();

        assert!(store.resolve("a").is_some());
        assert!(store.remove("a").is_some());
        assert!(store.resolve("a").is_none());
        assert!(store.remove("a").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_invalid_node_rejected() {
        let store = PolicyStore::new();
        assert!(store.insert(policy("", 0, true)).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_defective_node_is_stored() {
        let store = PolicyStore::new();
        let node: PolicyTreeNode = Policy::builder("no-alg").rule(Rule::deny("r")).build().into();
        store.insert(node).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_top_level_reference_rejected() {
        let store = PolicyStore::new();
        store.insert(policy("shared", 0, true)).unwrap();

        let err = store.insert(PolicyReference::new("shared").into()).unwrap_err();
        assert_eq!(err.category(), "validation");
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("shared").unwrap().kind(), "policy");
    }

    #[test]
    fn test_generation_tracks_changes() {
        let store = PolicyStore::new();
        assert_eq!(store.generation(), 0);

        store.insert(policy("a", 0, true)).unwrap();
        store.insert(policy("a", 1, true)).unwrap();
        assert_eq!(store.generation(), 2);

        assert!(store.insert(policy("", 0, true)).is_err());
        assert!(store.remove("missing").is_none());
        assert_eq!(store.generation(), 2);

        store.remove("a");
        store.clear();
        assert_eq!(store.generation(), 4);
    }
}
