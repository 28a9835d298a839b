//! Equation Solving.
//!
//! The first (and hottest) stage of the final-check cascade: iterate
//! until quiescent, canonizing each pending equation and discharging it
//! through the ordered sub-rules — ITE lifting, unit solving, binary
//! conjugate solving, element-chain solving, `itos` solving, and
//! reduction through the sequence rewriter.

use crate::dependency::Dep;
use crate::eqs::SeqEq;
use crate::theory::SeqSolver;
use strand_core::ast::{SkolemKind, TermId, TermKind};
use strand_core::literal::LBool;
use strand_core::rewrite::ReduceEq;
use strand_core::sort::Sort;
use tracing::trace;

enum Simplified {
    Discharged,
    Keep,
}

impl SeqSolver {
    /// Iterate equation solving until no new solution is found.
    pub(crate) fn simplify_and_solve_eqs(&mut self) -> bool {
        self.new_solution = true;
        while self.new_solution && !self.sat.is_root_conflict() {
            self.new_solution = false;
            self.solve_eqs(0);
        }
        self.new_propagation
    }

    /// Process pending equations starting at `start`.
    pub(crate) fn solve_eqs(&mut self, start: usize) {
        let mut i = start;
        while i < self.eqs.len() {
            if self.solve_eq(i) {
                self.eqs.erase_and_swap(i);
            } else {
                i += 1;
            }
        }
    }

    /// Try to discharge one equation; returns whether it is gone.
    fn solve_eq(&mut self, idx: usize) -> bool {
        let eq = self.eqs.get(idx).clone();
        let mut dep = eq.dep;

        if self.lift_ite(&eq) {
            return true;
        }

        let Some(ls) = self.canonize_side(&eq.ls, &mut dep) else {
            return false;
        };
        let Some(rs) = self.canonize_side(&eq.rs, &mut dep) else {
            return false;
        };
        if ls == rs {
            return true;
        }
        let changed = ls != eq.ls || rs != eq.rs;

        if self.solve_unit_eq(&ls, &rs, dep) {
            return true;
        }
        self.solve_binary_eq(&ls, &rs, dep);
        if self.solve_nth_eq(&ls, &rs, dep) {
            return true;
        }
        if self.solve_itos(&ls, &rs, dep) {
            return true;
        }
        match self.simplify_eq(&ls, &rs, dep) {
            Simplified::Discharged => true,
            Simplified::Keep => {
                if changed {
                    self.eqs.set(
                        idx,
                        SeqEq {
                            id: eq.id,
                            ls,
                            rs,
                            dep,
                        },
                    );
                }
                false
            }
        }
    }

    /// Replace a singleton ITE side by the branch its decided condition
    /// selects.
    fn lift_ite(&mut self, eq: &SeqEq) -> bool {
        if eq.ls.len() != 1 || eq.rs.len() != 1 {
            return false;
        }
        let (ite, other) = if matches!(self.tm.kind(eq.ls[0]), TermKind::Ite(..)) {
            (eq.ls[0], eq.rs[0])
        } else if matches!(self.tm.kind(eq.rs[0]), TermKind::Ite(..)) {
            (eq.rs[0], eq.ls[0])
        } else {
            return false;
        };
        let TermKind::Ite(c, t, e) = *self.tm.kind(ite) else {
            return false;
        };
        let clit = self.mk_literal(c);
        let (branch, dep) = match self.sat.value(clit) {
            LBool::True => (t, self.dm.join_lit(eq.dep, clit)),
            LBool::False => (e, self.dm.join_lit(eq.dep, !clit)),
            LBool::Undef => return false,
        };
        self.push_eq(vec![branch], vec![other], dep);
        true
    }

    fn is_unsolved_var(&self, t: TermId) -> bool {
        self.tm.is_seq_var(t) && self.rep.is_root(t)
    }

    fn occurs_in_side(&self, v: TermId, side: &[TermId]) -> bool {
        side.iter().any(|&p| self.tm.occurs(v, p))
    }

    /// `x = t` with `x` a variable not occurring in `t`: commit the
    /// solution.
    fn solve_unit_eq(&mut self, ls: &[TermId], rs: &[TermId], dep: Dep) -> bool {
        if ls.len() == 1 && self.is_unsolved_var(ls[0]) && !self.occurs_in_side(ls[0], rs) {
            let r = self.tm.mk_concat_many(rs);
            return self.add_solution(ls[0], r, dep);
        }
        if rs.len() == 1 && self.is_unsolved_var(rs[0]) && !self.occurs_in_side(rs[0], ls) {
            let l = self.tm.mk_concat_many(ls);
            return self.add_solution(rs[0], l, dep);
        }
        false
    }

    /// `x ++ a = b ++ x` with `a`, `b` units: every position pins to
    /// the same element, so `a = b` follows.
    fn solve_binary_eq(&mut self, ls: &[TermId], rs: &[TermId], dep: Dep) {
        if ls.len() != 2 || rs.len() != 2 {
            return;
        }
        let unit_char = |tm: &strand_core::ast::TermManager, t: TermId| match tm.kind(t) {
            TermKind::Unit(c) => Some(*c),
            _ => None,
        };
        // x a = b x
        if ls[0] == rs[1] && self.tm.is_seq_var(ls[0])
            && let (Some(a), Some(b)) = (unit_char(&self.tm, ls[1]), unit_char(&self.tm, rs[0]))
        {
            self.propagate_eq(dep, &[], a, b);
            return;
        }
        // a x = x b
        if ls[1] == rs[0] && self.tm.is_seq_var(ls[1])
            && let (Some(a), Some(b)) = (unit_char(&self.tm, ls[0]), unit_char(&self.tm, rs[1]))
        {
            self.propagate_eq(dep, &[], a, b);
        }
    }

    /// Recognize `unit(nth(x, 0)) ++ … ++ unit(nth(x, n-1))`.
    fn nth_chain(&self, side: &[TermId]) -> Option<(TermId, usize)> {
        if side.is_empty() {
            return None;
        }
        let mut base: Option<TermId> = None;
        for (j, &p) in side.iter().enumerate() {
            let TermKind::Unit(c) = *self.tm.kind(p) else {
                return None;
            };
            let TermKind::Nth(x, i) = *self.tm.kind(c) else {
                return None;
            };
            if self.tm.int_val_i64(i) != Some(j as i64) {
                return None;
            }
            match base {
                None => base = Some(x),
                Some(b) if b == x => {}
                _ => return None,
            }
        }
        base.map(|x| (x, side.len()))
    }

    /// One side is the element chain of the variable on the other side:
    /// the chain is definitionally the variable.
    fn solve_nth_eq(&mut self, ls: &[TermId], rs: &[TermId], dep: Dep) -> bool {
        if ls.len() == 1
            && self.is_unsolved_var(ls[0])
            && let Some((x, _)) = self.nth_chain(rs)
            && x == ls[0]
        {
            let r = self.tm.mk_concat_many(rs);
            return self.add_solution(x, r, dep);
        }
        if rs.len() == 1
            && self.is_unsolved_var(rs[0])
            && let Some((x, _)) = self.nth_chain(ls)
            && x == rs[0]
        {
            let l = self.tm.mk_concat_many(ls);
            return self.add_solution(x, l, dep);
        }
        false
    }

    /// `itos(n) = ε` forces `n < 0`; `itos(n) = units` forces each unit
    /// to a decimal digit and `n` to the base-10 value.
    fn solve_itos(&mut self, ls: &[TermId], rs: &[TermId], dep: Dep) -> bool {
        if ls.len() == 1
            && let TermKind::Itos(n) = *self.tm.kind(ls[0])
            && self.solve_itos_side(n, rs, dep)
        {
            return true;
        }
        if rs.len() == 1
            && let TermKind::Itos(n) = *self.tm.kind(rs[0])
            && self.solve_itos_side(n, ls, dep)
        {
            return true;
        }
        false
    }

    fn solve_itos_side(&mut self, n: TermId, units: &[TermId], dep: Dep) -> bool {
        if units.is_empty() {
            let minus_one = self.tm.mk_int(-1);
            let neg = self.tm.mk_le(n, minus_one);
            let neg = self.mk_literal(neg);
            self.propagate_lit(dep, &[], neg);
            return true;
        }
        let mut chars = Vec::with_capacity(units.len());
        for &u in units {
            match *self.tm.kind(u) {
                TermKind::Unit(c) => chars.push(c),
                _ => return false,
            }
        }
        for &c in &chars {
            let digit = self.mk_is_digit(c);
            if self.sat.value(digit) != LBool::True {
                self.propagate_lit(dep, &[], digit);
            }
        }
        let ten = self.tm.mk_int(10);
        let mut num = crate::skolem::mk_digit2int(&mut self.tm, chars[0]);
        for &c in &chars[1..] {
            let d = crate::skolem::mk_digit2int(&mut self.tm, c);
            let scaled = self.tm.mk(TermKind::Mul(ten, num));
            num = self.tm.mk_add(scaled, d);
        }
        let num = self.rw.simplify(&mut self.tm, num);
        let zero = self.tm.mk_int(0);
        let nonneg = self.tm.mk_ge(n, zero);
        let nonneg = self.mk_literal(nonneg);
        self.propagate_lit(dep, &[], nonneg);
        let value = self.tm.mk_eq(n, num);
        let value = self.mk_literal(value);
        self.propagate_lit(dep, &[], value);
        true
    }

    /// Reduce through the sequence rewriter and dispatch the produced
    /// sub-equations.
    fn simplify_eq(&mut self, ls: &[TermId], rs: &[TermId], dep: Dep) -> Simplified {
        match self.rw.reduce_eq(&mut self.tm, ls, rs) {
            ReduceEq::Unsat => {
                trace!("equation is inconsistent");
                self.set_conflict(dep, &[]);
                Simplified::Discharged
            }
            ReduceEq::Trivial => Simplified::Discharged,
            ReduceEq::Reduced { pairs, changed } => {
                if !changed {
                    return Simplified::Keep;
                }
                self.stats.num_reductions += 1;
                for (l, r) in pairs {
                    if self.tm.sort(l) == Sort::Seq {
                        if self.is_unsolved_var(l) && !self.tm.occurs(l, r) {
                            self.add_solution(l, r, dep);
                        } else if self.is_unsolved_var(r) && !self.tm.occurs(r, l) {
                            self.add_solution(r, l, dep);
                        } else {
                            let mut lv = Vec::new();
                            let mut rv = Vec::new();
                            self.tm.get_concat_units(l, &mut lv);
                            self.tm.get_concat_units(r, &mut rv);
                            if !self.has_eq(&lv, &rv) {
                                self.push_eq(lv, rv, dep);
                            }
                        }
                    } else {
                        self.propagate_eq(dep, &[], l, r);
                    }
                }
                Simplified::Discharged
            }
        }
    }

    /// Pending-equation view used by branching rules: whether a side is
    /// a variable next to units only.
    pub(crate) fn is_units(&self, side: &[TermId]) -> bool {
        side.iter()
            .all(|&p| matches!(self.tm.kind(p), TermKind::Unit(_)))
    }

    /// Leading units of a side.
    pub(crate) fn leading_units(&self, side: &[TermId]) -> usize {
        side.iter()
            .take_while(|&&p| matches!(self.tm.kind(p), TermKind::Unit(_)))
            .count()
    }

    /// Whether a term is one of the skolems excluded from fixed-length
    /// instantiation (their lengths follow from their defining axioms).
    pub(crate) fn is_internal_skolem(&self, t: TermId) -> bool {
        matches!(
            self.tm.kind(t),
            TermKind::Skolem(
                SkolemKind::Tail
                    | SkolemKind::SeqFirst
                    | SkolemKind::IndexOfLeft
                    | SkolemKind::IndexOfRight,
                _
            )
        )
    }
}
