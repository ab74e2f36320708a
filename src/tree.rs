//! In-memory view of one iteration's unit hierarchy.
//!
//! Units are loaded once per transaction into an adjacency list and walked
//! with explicit stacks and queues. Every walk keeps a visited set, so a
//! corrupted `parent_id` chain that loops back on itself terminates instead
//! of recursing forever.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::types::OrganizationUnit;

#[derive(Debug, Default, Clone)]
pub struct UnitForest {
    parents: HashMap<i64, Option<i64>>,
    children: BTreeMap<i64, Vec<i64>>,
    roots: Vec<i64>,
}

impl UnitForest {
    /// Builds the forest from `(id, parent_id)` pairs. A parent that is not
    /// part of the set (another iteration, or a dangling id) makes the unit a root.
    pub fn new<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (i64, Option<i64>)>,
    {
        let parents: HashMap<i64, Option<i64>> = edges.into_iter().collect();
        let mut children: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
        let mut roots = Vec::new();

        for (&id, &parent) in &parents {
            match parent {
                Some(parent_id) if parent_id != id && parents.contains_key(&parent_id) => {
                    children.entry(parent_id).or_default().push(id);
                }
                _ => roots.push(id),
            }
        }

        roots.sort_unstable();
        for kids in children.values_mut() {
            kids.sort_unstable();
        }

        Self {
            parents,
            children,
            roots,
        }
    }

    pub fn from_units(units: &[OrganizationUnit]) -> Self {
        Self::new(units.iter().map(|u| (u.id, u.parent_id)))
    }

    fn contains(&self, id: i64) -> bool {
        self.parents.contains_key(&id)
    }

    fn children(&self, id: i64) -> &[i64] {
        self.children.get(&id).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn parent(&self, id: i64) -> Option<i64> {
        self.parents.get(&id).copied().flatten()
    }

    /// The unit itself followed by every transitive child, breadth-first.
    /// Empty if `id` is not part of this forest.
    #[must_use]
    pub fn descendants(&self, id: i64) -> Vec<i64> {
        if !self.contains(id) {
            return Vec::new();
        }

        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            order.push(current);
            queue.extend(self.children(current).iter().copied());
        }

        order
    }

    /// Descendants ordered so every unit comes after all of its children.
    #[must_use]
    pub fn bottom_up(&self, id: i64) -> Vec<i64> {
        let mut order = self.descendants(id);
        order.reverse();
        order
    }

    /// Every unit reachable from a root, each parent before its children
    /// (depth-first pre-order). Units caught in a parent cycle are unreachable
    /// from any root and are left out.
    #[must_use]
    pub fn top_down(&self) -> Vec<i64> {
        let mut order = Vec::with_capacity(self.parents.len());
        let mut seen = HashSet::new();
        let mut stack: Vec<i64> = self.roots.iter().rev().copied().collect();

        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            order.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }

        order
    }

    /// True if `candidate` is `id` itself or lies below it.
    #[must_use]
    pub fn is_self_or_descendant(&self, id: i64, candidate: i64) -> bool {
        self.descendants(id).contains(&candidate)
    }
}
