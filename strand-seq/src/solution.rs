//! Solution Map and Exclusion Table.
//!
//! The solution map holds one entry per solved term: a replacement and
//! the dependency under which the two are equal. Chains are forward-only
//! and acyclic; `find` follows them to the fixed point, joining
//! dependencies along the way. A query cache short-circuits repeated
//! expansion; the cache is invalidated on every update and on every pop.

use crate::dependency::{Dep, DepManager};
use rustc_hash::{FxHashMap, FxHashSet};
use strand_core::ast::TermId;

#[derive(Debug, Clone, Copy)]
enum MapOp {
    Ins,
    Del,
}

/// Backtrackable mapping `term -> (replacement, dependency)`.
#[derive(Default)]
pub struct SolutionMap {
    map: FxHashMap<TermId, (TermId, Dep)>,
    trail: Vec<(MapOp, TermId, TermId, Dep)>,
    lims: Vec<usize>,
    cache: FxHashMap<TermId, (TermId, Dep)>,
}

impl SolutionMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff no entry is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// True iff `e` has no entry.
    #[must_use]
    pub fn is_root(&self, e: TermId) -> bool {
        !self.map.contains_key(&e)
    }

    /// Record `e -> (r, d)`. A prior entry for `e` is stacked on the
    /// trail and restored on pop.
    pub fn update(&mut self, e: TermId, r: TermId, d: Dep) {
        if e == r {
            return;
        }
        self.cache.clear();
        if let Some(&(old_r, old_d)) = self.map.get(&e) {
            self.trail.push((MapOp::Del, e, old_r, old_d));
        }
        self.map.insert(e, (r, d));
        self.trail.push((MapOp::Ins, e, r, d));
    }

    /// One step of the chain.
    #[must_use]
    pub fn find1(&self, e: TermId) -> Option<(TermId, Dep)> {
        self.map.get(&e).copied()
    }

    /// Follow the chain to its end, joining dependencies.
    pub fn find(&self, dm: &mut DepManager, e: TermId) -> (TermId, Dep) {
        let mut cur = e;
        let mut dep = Dep::NIL;
        while let Some(&(r, d)) = self.map.get(&cur) {
            debug_assert_ne!(r, cur);
            dep = dm.join(dep, d);
            cur = r;
        }
        (cur, dep)
    }

    /// Follow the chain, ignoring dependencies.
    #[must_use]
    pub fn find_plain(&self, e: TermId) -> TermId {
        let mut cur = e;
        while let Some(&(r, _)) = self.map.get(&cur) {
            cur = r;
        }
        cur
    }

    /// Cached normal form of `e`, if one was recorded.
    #[must_use]
    pub fn find_cache(&self, e: TermId) -> Option<(TermId, Dep)> {
        self.cache.get(&e).copied()
    }

    /// Record a normal form in the cache.
    pub fn add_cache(&mut self, e: TermId, r: TermId, d: Dep) {
        self.cache.insert(e, (r, d));
    }

    /// Drop every cached normal form.
    pub fn reset_cache(&mut self) {
        self.cache.clear();
    }

    /// Stamp the current state.
    pub fn push_scope(&mut self) {
        self.lims.push(self.trail.len());
    }

    /// Replay the trail back to the stamp; the cache is cleared.
    pub fn pop_scope(&mut self, num_scopes: usize) {
        if num_scopes == 0 {
            return;
        }
        self.cache.clear();
        let target = self.lims[self.lims.len() - num_scopes];
        self.lims.truncate(self.lims.len() - num_scopes);
        while self.trail.len() > target {
            let (op, e, r, d) = self.trail.pop().expect("trail entry");
            match op {
                MapOp::Ins => {
                    self.map.remove(&e);
                }
                MapOp::Del => {
                    self.map.insert(e, (r, d));
                }
            }
        }
    }

    /// Iterate live entries.
    pub fn iter(&self) -> impl Iterator<Item = (TermId, TermId, Dep)> + '_ {
        self.map.iter().map(|(&e, &(r, d))| (e, r, d))
    }
}

/// Unordered pairs known to canonize apart. Used to cut redundant
/// extensionality probes; reduced pairs are stored smaller id first.
#[derive(Default)]
pub struct ExclusionTable {
    table: FxHashSet<(TermId, TermId)>,
    list: Vec<(TermId, TermId)>,
    lims: Vec<usize>,
}

impl ExclusionTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: TermId, b: TermId) -> (TermId, TermId) {
        if a <= b { (a, b) } else { (b, a) }
    }

    /// True iff the pair is recorded.
    #[must_use]
    pub fn contains(&self, a: TermId, b: TermId) -> bool {
        self.table.contains(&Self::key(a, b))
    }

    /// Record a pair.
    pub fn update(&mut self, a: TermId, b: TermId) {
        if a == b {
            return;
        }
        let key = Self::key(a, b);
        if self.table.insert(key) {
            self.list.push(key);
        }
    }

    /// True iff no pair is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Stamp the current state.
    pub fn push_scope(&mut self) {
        self.lims.push(self.list.len());
    }

    /// Drop pairs recorded since the stamp.
    pub fn pop_scope(&mut self, num_scopes: usize) {
        if num_scopes == 0 {
            return;
        }
        let target = self.lims[self.lims.len() - num_scopes];
        self.lims.truncate(self.lims.len() - num_scopes);
        while self.list.len() > target {
            let key = self.list.pop().expect("list entry");
            self.table.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_core::literal::Lit;

    fn t(i: u32) -> TermId {
        TermId::new(i)
    }

    #[test]
    fn test_find_follows_chain() {
        let mut dm = DepManager::new();
        let mut rep = SolutionMap::new();
        let d1 = dm.leaf_lit(Lit::positive(1));
        let d2 = dm.leaf_lit(Lit::positive(2));
        rep.update(t(1), t(2), d1);
        rep.update(t(2), t(3), d2);

        let (r, dep) = rep.find(&mut dm, t(1));
        assert_eq!(r, t(3));
        let mut lits = Vec::new();
        let mut eqs = Vec::new();
        dm.linearize(dep, &mut lits, &mut eqs);
        assert_eq!(lits.len(), 2);
        assert!(eqs.is_empty());
    }

    #[test]
    fn test_pop_restores_overwritten_entry() {
        let mut dm = DepManager::new();
        let mut rep = SolutionMap::new();
        let d1 = dm.leaf_lit(Lit::positive(1));
        let d2 = dm.leaf_lit(Lit::positive(2));
        rep.update(t(1), t(2), d1);
        rep.push_scope();
        rep.update(t(1), t(3), d2);
        assert_eq!(rep.find_plain(t(1)), t(3));
        rep.pop_scope(1);
        assert_eq!(rep.find_plain(t(1)), t(2));
        rep.push_scope();
        rep.pop_scope(1);
        assert_eq!(rep.find_plain(t(1)), t(2));
    }

    #[test]
    fn test_cache_cleared_on_update() {
        let mut rep = SolutionMap::new();
        rep.add_cache(t(5), t(6), Dep::NIL);
        assert!(rep.find_cache(t(5)).is_some());
        rep.update(t(1), t(2), Dep::NIL);
        assert!(rep.find_cache(t(5)).is_none());
    }

    #[test]
    fn test_is_root() {
        let mut rep = SolutionMap::new();
        assert!(rep.is_root(t(1)));
        rep.update(t(1), t(2), Dep::NIL);
        assert!(!rep.is_root(t(1)));
        assert!(rep.is_root(t(2)));
    }

    #[test]
    fn test_exclusion_symmetry_and_pop() {
        let mut ex = ExclusionTable::new();
        ex.push_scope();
        ex.update(t(9), t(4));
        assert!(ex.contains(t(4), t(9)));
        assert!(ex.contains(t(9), t(4)));
        ex.pop_scope(1);
        assert!(!ex.contains(t(4), t(9)));
    }
}
