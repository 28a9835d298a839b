//! Disequations and Negated Containment.
//!
//! A disequation is violated iff every residual sub-equation holds and
//! every supporting literal is true. Solving decomposes the pairs
//! through canonization and the rewriter; branching hands the residual
//! choice to the boolean engine. Negated containment advances through
//! its guard literal, unfolding one position at a time.

use crate::eqs::SeqNe;
use crate::theory::SeqSolver;
use strand_core::ast::{TermId, TermKind};
use strand_core::literal::{LBool, Lit};
use strand_core::rewrite::ReduceEq;
use strand_core::sort::Sort;
use tracing::trace;

impl SeqSolver {
    /// Decompose pending disequations; conflicts arise when one is
    /// fully violated.
    pub(crate) fn solve_nqs(&mut self, start: usize) -> bool {
        let mut i = start;
        while i < self.nqs.len() {
            if self.solve_ne(i) {
                self.nqs.erase_and_swap(i);
            } else {
                i += 1;
            }
        }
        self.new_propagation
    }

    /// Returns whether the disequation is discharged (satisfied, or
    /// converted into a conflict).
    fn solve_ne(&mut self, idx: usize) -> bool {
        let ne = self.nqs.get(idx).clone();

        // a supporting literal that went false settles the disequality
        for &l in &ne.lits {
            if self.sat.value(l) == LBool::False {
                return true;
            }
        }

        let mut lits = ne.lits.clone();
        let mut dep = ne.dep;
        let mut pairs: Vec<(Vec<TermId>, Vec<TermId>)> = Vec::new();
        let mut changed = false;

        for (ls, rs) in &ne.pairs {
            let mut pdep = dep;
            let (Some(cls), Some(crs)) = (
                self.canonize_side(ls, &mut pdep),
                self.canonize_side(rs, &mut pdep),
            ) else {
                pairs.push((ls.clone(), rs.clone()));
                continue;
            };
            dep = pdep;
            match self.rw.reduce_eq(&mut self.tm, &cls, &crs) {
                ReduceEq::Unsat => {
                    trace!(ne = %ne.display(&self.tm), "disequality settled");
                    return true;
                }
                ReduceEq::Trivial => {
                    changed = true;
                }
                ReduceEq::Reduced {
                    pairs: sub,
                    changed: sub_changed,
                } => {
                    changed |= sub_changed;
                    for (l, r) in sub {
                        if self.tm.sort(l) != Sort::Seq {
                            let lit = self.mk_eq_lit(l, r);
                            match self.sat.value(lit) {
                                LBool::False => return true,
                                LBool::True => {
                                    if !lits.contains(&lit) {
                                        lits.push(lit);
                                        changed = true;
                                    }
                                }
                                LBool::Undef => {
                                    let mut lv = Vec::new();
                                    let mut rv = Vec::new();
                                    self.tm.get_concat_units(l, &mut lv);
                                    self.tm.get_concat_units(r, &mut rv);
                                    pairs.push((lv, rv));
                                }
                            }
                        } else {
                            let mut lv = Vec::new();
                            let mut rv = Vec::new();
                            self.tm.get_concat_units(l, &mut lv);
                            self.tm.get_concat_units(r, &mut rv);
                            pairs.push((lv, rv));
                        }
                    }
                }
            }
        }

        if pairs.is_empty() {
            // every decomposition obligation holds: the disequality is
            // violated
            trace!(ne = %ne.display(&self.tm), "disequality violated");
            self.set_conflict(dep, &lits);
            return true;
        }
        if changed {
            self.nqs.set(
                idx,
                SeqNe {
                    l: ne.l,
                    r: ne.r,
                    lits,
                    pairs,
                    dep,
                },
            );
        }
        false
    }

    /// Split a remaining disequation on its residual literals: under
    /// its assumptions, at least one obligation must fail.
    pub(crate) fn branch_nqs(&mut self) -> bool {
        for i in 0..self.nqs.len() {
            let ne = self.nqs.get(i).clone();
            let mut clause: Vec<Lit> = Vec::new();
            for l in self.linearize_lits(ne.dep) {
                let n = !l;
                if !clause.contains(&n) {
                    clause.push(n);
                }
            }
            for &l in &ne.lits {
                let n = !l;
                if !clause.contains(&n) {
                    clause.push(n);
                }
            }
            for (ls, rs) in &ne.pairs {
                let l = self.tm.mk_concat_many(ls);
                let r = self.tm.mk_concat_many(rs);
                let eq = self.mk_eq_lit(l, r);
                let n = !eq;
                if !clause.contains(&n) {
                    clause.push(n);
                }
            }
            if self.add_axiom(&clause) {
                return true;
            }
        }
        false
    }

    /// Advance every negated-contains constraint through its guard.
    pub(crate) fn check_contains(&mut self) -> bool {
        let mut i = 0;
        while i < self.ncs.len() {
            if self.solve_nc(i) {
                self.ncs.erase_and_swap(i);
            } else {
                i += 1;
            }
        }
        self.new_propagation
    }

    /// Resolve one negated-contains constraint.
    ///
    /// Guard true (`|needle| > |hay|`): trivially satisfied, seed
    /// lengths. Guard undecided: prefer it and defer. Guard false
    /// (`|hay| >= |needle|`): unroll one step.
    fn solve_nc(&mut self, idx: usize) -> bool {
        let nc = self.ncs.get(idx).clone();
        let TermKind::Contains(a, b) = *self.tm.kind(nc.contains) else {
            return true;
        };
        match self.sat.value(nc.len_gt) {
            LBool::True => {
                self.add_length_to_eqc(a);
                self.add_length_to_eqc(b);
                true
            }
            LBool::Undef => {
                self.sat.force_phase(nc.len_gt);
                self.new_propagation = true;
                false
            }
            LBool::False => {
                self.unroll_not_contains(nc.contains);
                true
            }
        }
    }

    /// `¬prefix(a, b)`: `a` is non-empty, and the first-difference
    /// scheme applies.
    pub(crate) fn propagate_not_prefix(&mut self, atom: TermId) {
        let lit = self.mk_literal(atom);
        if let Some((c, dep)) = self.canonize(atom)
            && matches!(self.tm.kind(c), TermKind::True)
        {
            self.propagate_lit(dep, &[], lit);
            return;
        }
        let TermKind::Prefix(a, _) = *self.tm.kind(atom) else {
            return;
        };
        self.propagate_non_empty(!lit, a);
        self.add_prefix_axiom(atom);
    }

    /// `¬suffix(a, b)`: dual.
    pub(crate) fn propagate_not_suffix(&mut self, atom: TermId) {
        let lit = self.mk_literal(atom);
        if let Some((c, dep)) = self.canonize(atom)
            && matches!(self.tm.kind(c), TermKind::True)
        {
            self.propagate_lit(dep, &[], lit);
            return;
        }
        let TermKind::Suffix(a, _) = *self.tm.kind(atom) else {
            return;
        };
        self.propagate_non_empty(!lit, a);
        self.add_suffix_axiom(atom);
    }
}
