//! Reachability over the outbound-link graph.
//!
//! Starting from a root document, walks every link depth-first and collects each
//! document it can reach, once. Broken links are not errors, they are simply not
//! followed. The walk is pure: it only reads from the [`LinkIndexProvider`].

use std::collections::HashSet;

use crate::doc::DocId;
use crate::links::LinkIndexProvider;

/// Documents reachable from a root, deduplicated by [`DocId`].
///
/// Iteration yields discovery order. That order follows the provider's link
/// order and callers should not depend on it.
#[derive(Debug, Clone, Default)]
pub struct Reachable {
    order: Vec<DocId>,
    seen: HashSet<DocId>,
}

impl Reachable {
    /// Returns `false` if `id` was already present.
    fn insert(&mut self, id: DocId) -> bool {
        if self.seen.contains(&id) {
            return false;
        }
        self.seen.insert(id.clone());
        self.order.push(id);
        true
    }

    pub fn contains(&self, id: &DocId) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DocId> {
        self.order.iter()
    }

    pub fn as_set(&self) -> &HashSet<DocId> {
        &self.seen
    }

    pub fn into_sorted_vec(self) -> Vec<DocId> {
        let mut v = self.order;
        v.sort();
        v
    }
}

impl PartialEq for Reachable {
    fn eq(&self, other: &Self) -> bool {
        self.seen == other.seen
    }
}

impl Eq for Reachable {}

impl<'a> IntoIterator for &'a Reachable {
    type Item = &'a DocId;
    type IntoIter = std::slice::Iter<'a, DocId>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for Reachable {
    type Item = DocId;
    type IntoIter = std::vec::IntoIter<DocId>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.into_iter()
    }
}

/// Collects every document reachable from `root`, including `root` itself.
///
/// An absent root yields an empty set. Links that do not resolve are skipped.
/// The walk is depth-first and pre-order: a document is marked visited when it is
/// taken off the work stack, and its links are pushed in reverse so the first link
/// is explored first. Cycles and shared targets are visited once.
pub fn collect<P>(root: Option<&DocId>, index: &P) -> Reachable
where
    P: LinkIndexProvider + ?Sized,
{
    let mut visited = Reachable::default();
    let Some(root) = root else {
        return visited;
    };

    let mut dangling = 0usize;
    let mut stack = vec![root.clone()];
    while let Some(doc) = stack.pop() {
        if visited.contains(&doc) {
            continue;
        }
        tracing::debug!(doc = %doc, "visit");
        let links = index.outbound(&doc);
        visited.insert(doc);

        for path in links.iter().rev() {
            match index.resolve(path) {
                Some(target) if !visited.contains(&target) => stack.push(target),
                Some(_) => {}
                None => {
                    dangling += 1;
                    tracing::trace!(link = %path, "skipping unresolved link");
                }
            }
        }
    }

    tracing::debug!(root = %root, reachable = visited.len(), dangling, "collected");
    visited
}
