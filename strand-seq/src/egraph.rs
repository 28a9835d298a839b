//! Equality Graph (lite).
//!
//! A scoped union-find over term ids with class rings, disequality
//! tracking and literal-level explanations. Every merge is justified by
//! one equality literal; explaining a class membership yields the set of
//! literals along the connecting path. Congruence closure is not
//! performed here — the theory resolves congruences through
//! canonization instead.

use rustc_hash::FxHashMap;
use strand_core::ast::{TermId, TermKind, TermManager};
use strand_core::literal::Lit;

#[derive(Debug, Clone, Copy)]
enum Undo {
    Merge { ra: TermId, rb: TermId },
    Diseq,
}

/// Scoped union-find with explanations.
#[derive(Default)]
pub struct EGraph {
    repr: FxHashMap<TermId, TermId>,
    ring: FxHashMap<TermId, TermId>,
    edges: Vec<(TermId, TermId, Lit)>,
    diseqs: Vec<(TermId, TermId, Lit)>,
    trail: Vec<Undo>,
    lims: Vec<usize>,
}

impl EGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Representative of a term's class.
    #[must_use]
    pub fn find(&self, t: TermId) -> TermId {
        let mut cur = t;
        while let Some(&p) = self.repr.get(&cur) {
            cur = p;
        }
        cur
    }

    /// Whether two terms are in the same class.
    #[must_use]
    pub fn are_eq(&self, a: TermId, b: TermId) -> bool {
        self.find(a) == self.find(b)
    }

    fn next(&self, t: TermId) -> TermId {
        self.ring.get(&t).copied().unwrap_or(t)
    }

    /// All members of the class of `t` (including `t`).
    #[must_use]
    pub fn class_members(&self, t: TermId) -> Vec<TermId> {
        let mut out = vec![t];
        let mut cur = self.next(t);
        while cur != t {
            out.push(cur);
            cur = self.next(cur);
        }
        out
    }

    /// A constant (character or integer) in the class of `t`, if any.
    #[must_use]
    pub fn const_in_class(&self, tm: &TermManager, t: TermId) -> Option<TermId> {
        self.class_members(t)
            .into_iter()
            .find(|&m| matches!(tm.kind(m), TermKind::CharConst(_) | TermKind::IntConst(_)))
    }

    /// The recorded disequality literal separating the classes of `a`
    /// and `b`, if one exists.
    #[must_use]
    pub fn is_diseq(&self, a: TermId, b: TermId) -> Option<Lit> {
        let ra = self.find(a);
        let rb = self.find(b);
        for &(x, y, l) in &self.diseqs {
            let fx = self.find(x);
            let fy = self.find(y);
            if (fx == ra && fy == rb) || (fx == rb && fy == ra) {
                return Some(l);
            }
        }
        None
    }

    /// Terms recorded disequal to the class of `t`.
    #[must_use]
    pub fn diseq_partners(&self, t: TermId) -> Vec<TermId> {
        let rt = self.find(t);
        let mut out = Vec::new();
        for &(x, y, _) in &self.diseqs {
            if self.find(x) == rt {
                out.push(y);
            } else if self.find(y) == rt {
                out.push(x);
            }
        }
        out
    }

    /// Literals along a path connecting `a` and `b`. Empty when `a == b`;
    /// callers must ensure the two are in the same class.
    #[must_use]
    pub fn explain(&self, a: TermId, b: TermId) -> Vec<Lit> {
        if a == b {
            return Vec::new();
        }
        // BFS over the merge log viewed as an undirected labelled graph
        let mut adj: FxHashMap<TermId, Vec<(TermId, Lit)>> = FxHashMap::default();
        for &(x, y, l) in &self.edges {
            adj.entry(x).or_default().push((y, l));
            adj.entry(y).or_default().push((x, l));
        }
        let mut prev: FxHashMap<TermId, (TermId, Lit)> = FxHashMap::default();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(a);
        prev.insert(a, (a, Lit::positive(0)));
        while let Some(cur) = queue.pop_front() {
            if cur == b {
                break;
            }
            if let Some(ns) = adj.get(&cur) {
                for &(n, l) in ns {
                    if !prev.contains_key(&n) {
                        prev.insert(n, (cur, l));
                        queue.push_back(n);
                    }
                }
            }
        }
        let mut lits = Vec::new();
        let mut cur = b;
        while cur != a {
            let Some(&(p, l)) = prev.get(&cur) else {
                // not connected: the callers only ask within one class
                return lits;
            };
            if !lits.contains(&l) {
                lits.push(l);
            }
            cur = p;
        }
        lits
    }

    /// Merge the classes of `a` and `b`, justified by `reason` (an
    /// equality literal assigned true). On a clash with a recorded
    /// disequality, returns a conflict clause (every literal currently
    /// false) instead.
    pub fn merge(&mut self, a: TermId, b: TermId, reason: Lit) -> Result<(), Vec<Lit>> {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return Ok(());
        }
        for i in 0..self.diseqs.len() {
            let (x, y, dl) = self.diseqs[i];
            let fx = self.find(x);
            let fy = self.find(y);
            let clash = (fx == ra && fy == rb) || (fx == rb && fy == ra);
            if clash {
                let (xa, yb) = if fx == ra { (a, b) } else { (b, a) };
                let mut clause = vec![dl, !reason];
                for l in self.explain(x, xa) {
                    let neg = !l;
                    if !clause.contains(&neg) {
                        clause.push(neg);
                    }
                }
                for l in self.explain(y, yb) {
                    let neg = !l;
                    if !clause.contains(&neg) {
                        clause.push(neg);
                    }
                }
                return Err(clause);
            }
        }
        let na = self.next(ra);
        let nb = self.next(rb);
        self.ring.insert(ra, nb);
        self.ring.insert(rb, na);
        self.repr.insert(rb, ra);
        self.edges.push((a, b, reason));
        self.trail.push(Undo::Merge { ra, rb });
        Ok(())
    }

    /// Record that `a` and `b` are disequal, justified by `reason` (an
    /// equality literal assigned false). If they are already equal,
    /// returns a conflict clause.
    pub fn assert_diseq(&mut self, a: TermId, b: TermId, reason: Lit) -> Result<(), Vec<Lit>> {
        if self.are_eq(a, b) {
            let mut clause = vec![reason];
            for l in self.explain(a, b) {
                let neg = !l;
                if !clause.contains(&neg) {
                    clause.push(neg);
                }
            }
            return Err(clause);
        }
        self.diseqs.push((a, b, reason));
        self.trail.push(Undo::Diseq);
        Ok(())
    }

    /// Stamp the current state.
    pub fn push_scope(&mut self) {
        self.lims.push(self.trail.len());
    }

    /// Undo merges and disequalities back to the stamp.
    pub fn pop_scope(&mut self, num_scopes: usize) {
        if num_scopes == 0 {
            return;
        }
        let target = self.lims[self.lims.len() - num_scopes];
        self.lims.truncate(self.lims.len() - num_scopes);
        while self.trail.len() > target {
            match self.trail.pop().expect("trail entry") {
                Undo::Merge { ra, rb } => {
                    let na = self.next(ra);
                    let nb = self.next(rb);
                    self.ring.insert(ra, nb);
                    self.ring.insert(rb, na);
                    self.repr.remove(&rb);
                    self.edges.pop();
                }
                Undo::Diseq => {
                    self.diseqs.pop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(i: u32) -> TermId {
        TermId::new(i)
    }

    #[test]
    fn test_merge_and_find() {
        let mut eg = EGraph::new();
        eg.merge(t(1), t(2), Lit::positive(1)).unwrap();
        eg.merge(t(2), t(3), Lit::positive(2)).unwrap();
        assert!(eg.are_eq(t(1), t(3)));
        assert!(!eg.are_eq(t(1), t(4)));
    }

    #[test]
    fn test_class_members() {
        let mut eg = EGraph::new();
        eg.merge(t(1), t(2), Lit::positive(1)).unwrap();
        eg.merge(t(3), t(1), Lit::positive(2)).unwrap();
        let mut m = eg.class_members(t(2));
        m.sort();
        assert_eq!(m, vec![t(1), t(2), t(3)]);
    }

    #[test]
    fn test_explain_path() {
        let mut eg = EGraph::new();
        eg.merge(t(1), t(2), Lit::positive(1)).unwrap();
        eg.merge(t(2), t(3), Lit::positive(2)).unwrap();
        let lits = eg.explain(t(1), t(3));
        assert_eq!(lits.len(), 2);
        assert!(lits.contains(&Lit::positive(1)));
        assert!(lits.contains(&Lit::positive(2)));
    }

    #[test]
    fn test_diseq_conflict() {
        let mut eg = EGraph::new();
        eg.assert_diseq(t(1), t(3), Lit::positive(9)).unwrap();
        eg.merge(t(1), t(2), Lit::positive(1)).unwrap();
        let clause = eg.merge(t(2), t(3), Lit::positive(2)).unwrap_err();
        assert!(clause.contains(&Lit::positive(9)));
        assert!(clause.contains(&Lit::negative(2)));
        assert!(clause.contains(&Lit::negative(1)));
    }

    #[test]
    fn test_pop_restores() {
        let mut eg = EGraph::new();
        eg.merge(t(1), t(2), Lit::positive(1)).unwrap();
        eg.push_scope();
        eg.merge(t(2), t(3), Lit::positive(2)).unwrap();
        assert!(eg.are_eq(t(1), t(3)));
        eg.pop_scope(1);
        assert!(!eg.are_eq(t(1), t(3)));
        assert!(eg.are_eq(t(1), t(2)));
        assert_eq!(eg.class_members(t(1)).len(), 2);
        assert_eq!(eg.class_members(t(3)).len(), 1);
    }
}
