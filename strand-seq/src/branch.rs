//! Splitting and Branching Rules.
//!
//! The middle of the final-check cascade: lexicographic-chain closure,
//! length-based splitting, prefix/suffix peeling under known lengths,
//! and the variable branching family.

use crate::eqs::SeqEq;
use crate::skolem;
use crate::theory::SeqSolver;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use strand_core::ast::{TermId, TermKind};
use strand_core::literal::{LBool, Lit, TRUE_LIT};
use tracing::trace;

impl SeqSolver {
    /// For every pair of active lexicographic atoms `a ◁ b`, `c ◁ d`
    /// with `b` and `c` in one class, instantiate transitivity. Runs
    /// once per scope.
    pub(crate) fn check_lts(&mut self) -> bool {
        if self.lts.is_empty() || self.lts_checked {
            return false;
        }
        self.lts_checked = true;
        let atoms: Vec<TermId> = self.lts.iter().copied().collect();
        for i in 0..atoms.len() {
            let Some((a, b, r1, strict1)) = self.oriented_lt(atoms[i]) else {
                continue;
            };
            for &p2 in atoms.iter().skip(i + 1) {
                let Some((c, d, r2, strict2)) = self.oriented_lt(p2) else {
                    continue;
                };
                if !self.eg.are_eq(b, c) {
                    continue;
                }
                let eq = if b == c {
                    TRUE_LIT
                } else {
                    self.mk_eq_lit(b, c)
                };
                let strict = strict1 || strict2;
                let kind = if strict {
                    TermKind::StrLt(a, d)
                } else {
                    TermKind::StrLe(a, d)
                };
                let closed = self.tm.mk(kind);
                let closed = self.mk_literal(closed);
                self.add_axiom(&[!r1, !r2, !eq, closed]);
            }
        }
        true
    }

    /// Read a lexicographic atom under its current assignment,
    /// orienting it as `x ◁ y` with the literal that is true.
    fn oriented_lt(&mut self, atom: TermId) -> Option<(TermId, TermId, Lit, bool)> {
        let (a, b, is_lt) = match *self.tm.kind(atom) {
            TermKind::StrLt(a, b) => (a, b, true),
            TermKind::StrLe(a, b) => (a, b, false),
            _ => return None,
        };
        let lit = self.mk_literal(atom);
        match self.sat.value(lit) {
            LBool::True => Some((a, b, lit, is_lt)),
            // ¬(a < b) is b <= a; ¬(a <= b) is b < a
            LBool::False => Some((b, a, !lit, !is_lt)),
            LBool::Undef => None,
        }
    }

    /// Config-gated: when the two head terms of an equation are known
    /// to have equal length, split off the aligned head equality.
    pub(crate) fn len_based_split(&mut self) -> bool {
        for i in 0..self.eqs.len() {
            let eq = self.eqs.get(i).clone();
            if eq.ls.len() < 2 || eq.rs.len() < 2 {
                continue;
            }
            let (x, y) = (eq.ls[0], eq.rs[0]);
            if x == y {
                continue;
            }
            let len_x = self.mk_len(x);
            let len_y = self.mk_len(y);
            let same = self.tm.mk_eq(len_x, len_y);
            let same = self.mk_literal(same);
            if self.sat.value(same) != LBool::True {
                continue;
            }
            let lhs = eq.ls[1..].to_vec();
            let rhs = eq.rs[1..].to_vec();
            if self.has_eq(&lhs, &rhs) {
                continue;
            }
            let dep = self.dm.join_lit(eq.dep, same);
            self.stats.num_splits += 1;
            self.push_eq(vec![x], vec![y], dep);
            self.push_eq(lhs, rhs, dep);
            return true;
        }
        false
    }

    /// Peel matching prefixes or suffixes whose lengths are known
    /// equal, enqueueing the residual equality.
    pub(crate) fn reduce_length_eq(&mut self) -> bool {
        for i in 0..self.eqs.len() {
            let eq = self.eqs.get(i).clone();
            if eq.ls.is_empty() || eq.rs.is_empty() {
                continue;
            }
            if eq.ls.len() <= 1 && eq.rs.len() <= 1 {
                continue;
            }
            if self.reduce_pair(&eq, true) || self.reduce_pair(&eq, false) {
                return true;
            }
            if self.reduce_aligned(&eq) {
                return true;
            }
        }
        false
    }

    /// Front or back element pair with provably equal lengths.
    fn reduce_pair(&mut self, eq: &SeqEq, front: bool) -> bool {
        let (l, r) = if front {
            (eq.ls[0], eq.rs[0])
        } else {
            (*eq.ls.last().expect("non-empty"), *eq.rs.last().expect("non-empty"))
        };
        if l == r {
            return false;
        }
        let Some((len_l, mut lits)) = self.get_length(l) else {
            return false;
        };
        let Some((len_r, lits_r)) = self.get_length(r) else {
            return false;
        };
        lits.extend(lits_r);
        if len_l != len_r {
            let Some((vl, lits_l2)) = self.get_num_value(len_l) else {
                return false;
            };
            let Some((vr, lits_r2)) = self.get_num_value(len_r) else {
                return false;
            };
            if vl != vr {
                return false;
            }
            lits.extend(lits_l2);
            lits.extend(lits_r2);
        }
        let (lhs, rhs) = if front {
            (eq.ls[1..].to_vec(), eq.rs[1..].to_vec())
        } else {
            (
                eq.ls[..eq.ls.len() - 1].to_vec(),
                eq.rs[..eq.rs.len() - 1].to_vec(),
            )
        };
        if self.has_eq(&lhs, &rhs) {
            return false;
        }
        trace!("peel equal-length pair");
        let dep = self.dm.join_lits(eq.dep, &lits);
        self.push_eq(lhs, rhs, dep);
        self.propagate_eq(dep, &[], l, r);
        self.stats.num_reductions += 1;
        true
    }

    /// Interior split where numeric prefix sums agree; the split is
    /// guarded by the equality of the two prefix lengths.
    fn reduce_aligned(&mut self, eq: &SeqEq) -> bool {
        let sums_l = self.prefix_sums(&eq.ls);
        let sums_r = self.prefix_sums(&eq.rs);
        let (Some(sums_l), Some(sums_r)) = (sums_l, sums_r) else {
            return false;
        };
        for (i, sl) in sums_l.iter().enumerate() {
            if i == 0 || i == eq.ls.len() {
                continue;
            }
            for (j, sr) in sums_r.iter().enumerate() {
                if j == 0 || j == eq.rs.len() {
                    continue;
                }
                if sl != sr {
                    continue;
                }
                let lhs_rest = eq.ls[i..].to_vec();
                let rhs_rest = eq.rs[j..].to_vec();
                if self.has_eq(&lhs_rest, &rhs_rest) {
                    continue;
                }
                let l_pre = self.tm.mk_concat_many(&eq.ls[..i]);
                let r_pre = self.tm.mk_concat_many(&eq.rs[..j]);
                let len_l = self.mk_len(l_pre);
                let len_r = self.mk_len(r_pre);
                let same = self.tm.mk_eq(len_l, len_r);
                let same = self.mk_literal(same);
                if self.sat.value(same) != LBool::True {
                    continue;
                }
                let dep = self.dm.join_lit(eq.dep, same);
                self.stats.num_splits += 1;
                self.push_eq(lhs_rest, rhs_rest, dep);
                self.propagate_eq(dep, &[], l_pre, r_pre);
                return true;
            }
        }
        false
    }

    fn prefix_sums(&mut self, side: &[TermId]) -> Option<Vec<BigInt>> {
        let mut out = Vec::with_capacity(side.len() + 1);
        let mut acc = BigInt::from(0);
        out.push(acc.clone());
        for &p in side {
            let v = self.get_length_value(p)?;
            acc += v;
            out.push(acc.clone());
        }
        Some(out)
    }

    /// `|x| = n` against a unit word: branch on `x` being exactly the
    /// first `n` units of the other side.
    pub(crate) fn branch_unit_variable(&mut self) -> bool {
        for i in 0..self.eqs.len() {
            let eq = self.eqs.get(i).clone();
            if eq.ls.len() == 1
                && self.tm.is_seq_var(eq.ls[0])
                && self.leading_units(&eq.rs) > 0
                && self.branch_unit(&eq, eq.ls[0], &eq.rs)
            {
                return true;
            }
            if eq.rs.len() == 1
                && self.tm.is_seq_var(eq.rs[0])
                && self.leading_units(&eq.ls) > 0
                && self.branch_unit(&eq, eq.rs[0], &eq.ls)
            {
                return true;
            }
        }
        false
    }

    fn branch_unit(&mut self, eq: &SeqEq, x: TermId, other: &[TermId]) -> bool {
        let len_x = self.mk_len(x);
        let Some((lo, _)) = self.lower_bound2(len_x) else {
            return self.add_length_to_eqc(x);
        };
        let units = self.leading_units(other);
        let all_units = self.is_units(other);
        let Some(lo_u) = lo.to_usize() else {
            return false;
        };
        if all_units && lo_u > other.len() {
            let bound = self.tm.mk_int(other.len() as i64);
            let cap = self.tm.mk_le(len_x, bound);
            let cap = self.mk_literal(cap);
            self.propagate_lit(eq.dep, &[], cap);
            return true;
        }
        if lo_u > units {
            return false;
        }
        let val = self.tm.mk_int(lo);
        let pick = self.tm.mk_eq(len_x, val);
        let pick = self.mk_literal(pick);
        match self.sat.value(pick) {
            LBool::True => {
                let prefix = self.tm.mk_concat_many(&other[..lo_u]);
                self.propagate_eq(eq.dep, &[pick], x, prefix)
            }
            LBool::Undef => {
                self.sat.force_phase(pick);
                self.new_propagation = true;
                true
            }
            LBool::False => false,
        }
    }

    /// `x ++ U1 = U2 ++ y`: either `x` stays within `U2` (length
    /// split), or `x` extends past it and absorbs `U2` plus a tail of
    /// its own.
    pub(crate) fn branch_binary_variable(&mut self) -> bool {
        for i in 0..self.eqs.len() {
            let eq = self.eqs.get(i).clone();
            if eq.ls.len() < 2 || eq.rs.len() < 2 {
                continue;
            }
            let x = eq.ls[0];
            let y = *eq.rs.last().expect("non-empty");
            if !self.tm.is_seq_var(x) || !self.tm.is_seq_var(y) || x == y {
                continue;
            }
            if !self.is_units(&eq.ls[1..]) || !self.is_units(&eq.rs[..eq.rs.len() - 1]) {
                continue;
            }
            if self.branch_binary(&eq, x, &eq.rs[..eq.rs.len() - 1]) {
                self.stats.num_splits += 1;
                return true;
            }
        }
        false
    }

    fn branch_binary(&mut self, eq: &SeqEq, x: TermId, u2: &[TermId]) -> bool {
        let len_x = self.mk_len(x);
        let n = u2.len();
        let cap = self.tm.mk_int(n as i64);
        let within = self.tm.mk_le(len_x, cap);
        let within = self.mk_literal(within);

        // |x| <= n  ->  |x| = 0 ∨ … ∨ |x| = n
        let mut split: Vec<Lit> = Vec::with_capacity(n + 2);
        for k in 0..=n {
            let val = self.tm.mk_int(k as i64);
            let pick = self.tm.mk_eq(len_x, val);
            split.push(self.mk_literal(pick));
        }
        let zero = self.tm.mk_int(0);
        let nonneg = self.tm.mk_ge(len_x, zero);
        let nonneg = self.mk_literal(nonneg);
        split.push(!within);
        split.push(!nonneg);
        let mut progress = self.add_axiom(&split);

        // |x| > n  ->  x = U2 ++ post(x, n)
        let from = self.tm.mk_int(n as i64);
        let tail = skolem::mk_post(&mut self.tm, x, from);
        let mut parts = u2.to_vec();
        parts.push(tail);
        let absorbed = self.tm.mk_concat_many(&parts);
        let absorbed = self.mk_eq_lit(x, absorbed);
        let mut clause: Vec<Lit> = vec![within, absorbed];
        for l in self.linearize_lits(eq.dep) {
            let nl = !l;
            if !clause.contains(&nl) {
                clause.push(nl);
            }
        }
        if self.add_axiom(&clause) {
            progress = true;
        }
        progress
    }

    /// General branching: ensure lengths exist, decompose by known
    /// values, then deepen the length assignment of an undetermined
    /// element.
    pub(crate) fn branch_variable(&mut self) -> bool {
        for i in 0..self.eqs.len() {
            let eq = self.eqs.get(i).clone();

            let mut registered = false;
            for &p in eq.ls.iter().chain(eq.rs.iter()) {
                if self.tm.ground_word(p).is_none() && !self.has_length.contains(&p) {
                    self.register_length(p);
                    registered = true;
                }
            }
            if registered {
                return true;
            }

            if self.branch_variable_mb(&eq) {
                return true;
            }

            for &p in eq.ls.iter().chain(eq.rs.iter()) {
                if self.tm.ground_word(p).is_some() {
                    continue;
                }
                let len_p = self.mk_len(p);
                if self.get_num_value(len_p).is_some() {
                    continue;
                }
                let lo = self
                    .lower_bound2(len_p)
                    .map(|(v, _)| v)
                    .unwrap_or_else(|| BigInt::from(0));
                let val = self.tm.mk_int(lo);
                let pick = self.tm.mk_eq(len_p, val);
                let pick = self.mk_literal(pick);
                if self.sat.value(pick) == LBool::Undef {
                    self.sat.force_phase(pick);
                    self.new_propagation = true;
                    return true;
                }
            }
        }
        false
    }

    /// Model-based decomposition: every element length has a value, so
    /// either the totals clash (conflict) or an interior alignment
    /// splits the equation.
    fn branch_variable_mb(&mut self, eq: &SeqEq) -> bool {
        let mut lits: Vec<Lit> = Vec::new();
        let mut sum_l = BigInt::from(0);
        for &p in &eq.ls {
            let len_p = self.mk_len(p);
            match self.get_num_value(len_p) {
                Some((v, ls)) => {
                    sum_l += v;
                    lits.extend(ls);
                }
                None => return false,
            }
        }
        let mut sum_r = BigInt::from(0);
        for &p in &eq.rs {
            let len_p = self.mk_len(p);
            match self.get_num_value(len_p) {
                Some((v, ls)) => {
                    sum_r += v;
                    lits.extend(ls);
                }
                None => return false,
            }
        }
        if sum_l != sum_r {
            trace!("length totals clash");
            self.set_conflict(eq.dep, &lits);
            return true;
        }
        self.reduce_aligned(eq)
    }
}
