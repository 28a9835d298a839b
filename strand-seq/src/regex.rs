//! Regular-Language Membership.
//!
//! Membership atoms compile their regex to an automaton and unfold into
//! Skolemized `accept(s, i, R, q)` / `step(s, i, R, q, q', guard)`
//! predicates. Acceptance interacts with length reasoning: a final
//! state releases the word at the current position, a non-final state
//! demands one more element, a sink refutes the run. The global
//! unfolding depth is carried as an assumption literal and raised by
//! the outer driver on demand.

use crate::skolem;
use crate::theory::SeqSolver;
use crate::eqs::SInRe;
use strand_core::ast::{TermId, TermKind};
use strand_core::error::Result;
use strand_core::literal::Lit;
use tracing::{debug, trace};

impl SeqSolver {
    /// Digest an assignment to a membership atom.
    pub(crate) fn propagate_in_re(&mut self, atom: TermId, is_true: bool) -> Result<()> {
        let TermKind::InRe(s, re) = *self.tm.kind(atom) else {
            return Ok(());
        };
        let lit = self.mk_literal(atom);
        let alit = if is_true { lit } else { !lit };

        let mut re_eff = if is_true {
            re
        } else {
            let comp = self.tm.mk(TermKind::ReComp(re));
            self.rw.simplify(&mut self.tm, comp)
        };

        // intersect with the active membership of the same class,
        // deactivating the superseded entry
        let mut carried: Vec<Lit> = Vec::new();
        for i in 0..self.s_in_re.len() {
            let entry = self.s_in_re.get(i).clone();
            if !entry.active || entry.re == re_eff || !self.eg.are_eq(entry.s, s) {
                continue;
            }
            let mut deactivated = entry.clone();
            deactivated.active = false;
            self.s_in_re.set(i, deactivated);
            debug!(
                old = %self.tm.display(entry.re),
                new = %self.tm.display(re_eff),
                "intersect memberships"
            );
            let inter = self.tm.mk(TermKind::ReInter(entry.re, re_eff));
            re_eff = self.rw.simplify(&mut self.tm, inter);
            carried.push(!entry.lit);
            for l in self.eg.explain(entry.s, s) {
                let n = !l;
                if !carried.contains(&n) {
                    carried.push(n);
                }
            }
        }

        let aut_idx = self.get_automaton(re_eff)?;
        self.s_in_re.push(SInRe {
            lit: alit,
            s,
            re: re_eff,
            active: true,
        });

        let init = self.automata[aut_idx].initial() as u32;
        let acc = self.mk_accept_lit(s, 0, re_eff, init);
        let mut clause = vec![!alit];
        clause.extend(carried);
        clause.push(acc);
        self.add_axiom(&clause);
        Ok(())
    }

    pub(crate) fn mk_accept_lit(&mut self, s: TermId, i: u32, re: TermId, q: u32) -> Lit {
        let t = skolem::mk_accept(&mut self.tm, s, i, re, q);
        self.mk_literal(t)
    }

    /// Unfold a true `accept(s, i, R, q)` literal.
    pub(crate) fn propagate_accept(&mut self, alit: Lit, acc: TermId) -> Result<()> {
        let Some((s, i, re, q)) = skolem::is_accept(&self.tm, acc) else {
            return Ok(());
        };
        self.stats.propagate_automata += 1;
        let aut_idx = self.get_automaton(re)?;
        let q = q as usize;

        if self.automata[aut_idx].is_sink(q) {
            trace!(state = q, "accept in sink state");
            self.add_axiom(&[!alit]);
            return Ok(());
        }

        let len_s = self.mk_len(s);
        let idx = self.tm.mk_int(i as i64);
        let within = self.tm.mk_le(len_s, idx);
        let within = self.mk_literal(within);

        let is_final = self.automata[aut_idx].is_final(q);
        if is_final {
            // accept -> |s| >= i, and (|s| <= i or a step fires)
            let at_least = self.tm.mk_ge(len_s, idx);
            let at_least = self.mk_literal(at_least);
            self.propagate_lit(crate::dependency::Dep::NIL, &[alit], at_least);
        } else {
            // accept -> |s| > i
            self.propagate_lit(crate::dependency::Dep::NIL, &[alit], !within);
        }

        let mut clause = vec![!alit];
        if is_final {
            clause.push(within);
        }
        let moves = self.automata[aut_idx].moves_from(q).to_vec();
        for (ranges, q2) in moves {
            let nth = self.tm.mk_nth(s, idx);
            let guard = self.tm.mk(TermKind::CharPred(nth, ranges));
            let guard = self.rw.simplify(&mut self.tm, guard);
            if matches!(self.tm.kind(guard), TermKind::False) {
                continue;
            }
            let step = skolem::mk_step(&mut self.tm, s, i, re, q as u32, q2 as u32, guard);
            clause.push(self.mk_literal(step));
        }
        self.add_axiom(&clause);

        if i > self.max_unfolding_depth
            && let Some(mu) = self.max_unfolding_lit
        {
            self.propagate_lit(crate::dependency::Dep::NIL, &[alit], !mu);
        }
        Ok(())
    }

    /// Unfold a true `step(s, i, R, q, q', guard)` literal.
    pub(crate) fn propagate_step(&mut self, slit: Lit, step: TermId) -> Result<()> {
        let Some((s, i, re, _q, q2, guard)) = skolem::is_step(&self.tm, step) else {
            return Ok(());
        };
        self.stats.propagate_automata += 1;

        let glit = self.mk_literal(guard);
        self.propagate_lit(crate::dependency::Dep::NIL, &[slit], glit);

        let len_s = self.mk_len(s);
        let idx = self.tm.mk_int(i as i64);
        let within = self.tm.mk_le(len_s, idx);
        let within = self.mk_literal(within);
        self.propagate_lit(crate::dependency::Dep::NIL, &[slit], !within);

        self.ensure_nth(slit, s, i);

        let acc = self.mk_accept_lit(s, i + 1, re, q2);
        self.propagate_lit(crate::dependency::Dep::NIL, &[slit], acc);
        Ok(())
    }

    /// `lit => s = unit(nth(s, 0)) ++ … ++ unit(nth(s, i)) ++ tail(s, i)`,
    /// with the length of the tail linked to `|s|`.
    pub(crate) fn ensure_nth(&mut self, lit: Lit, s: TermId, i: u32) {
        let mut parts = Vec::with_capacity(i as usize + 2);
        for j in 0..=i {
            let idx = self.tm.mk_int(j as i64);
            let nth = self.tm.mk_nth(s, idx);
            parts.push(self.tm.mk_unit(nth));
        }
        let tail = skolem::mk_tail_u(&mut self.tm, s, i);
        parts.push(tail);
        let conc = self.tm.mk_concat_many(&parts);
        self.propagate_eq(crate::dependency::Dep::NIL, &[lit], s, conc);

        let len_s = self.mk_len(s);
        let len_tail = self.tm.mk_length(tail);
        let dropped = self.tm.mk_int(i as i64 + 1);
        let sum = self.tm.mk_add(dropped, len_tail);
        let link = self.tm.mk_eq(len_s, sum);
        let link = self.mk_literal(link);
        self.propagate_lit(crate::dependency::Dep::NIL, &[lit], link);
    }

    /// Language equality of two regexes, by emptiness of the symmetric
    /// difference.
    pub(crate) fn regex_are_equal(&mut self, r1: TermId, r2: TermId) -> Result<Option<bool>> {
        if r1 == r2 {
            return Ok(Some(true));
        }
        let s1 = self.rw.simplify(&mut self.tm, r1);
        let s2 = self.rw.simplify(&mut self.tm, r2);
        if s1 == s2 {
            return Ok(Some(true));
        }
        let c2 = self.tm.mk(TermKind::ReComp(s2));
        let c1 = self.tm.mk(TermKind::ReComp(s1));
        let d1 = self.tm.mk(TermKind::ReInter(s1, c2));
        let d2 = self.tm.mk(TermKind::ReInter(s2, c1));
        let diff = self.tm.mk(TermKind::ReUnion(d1, d2));
        let diff = self.rw.simplify(&mut self.tm, diff);
        match self.get_automaton(diff) {
            Ok(idx) => Ok(Some(self.automata[idx].is_empty())),
            Err(err) => Err(err),
        }
    }

    /// Assumption literals for the outer search: the unfolding depth
    /// and one length limit per tracked sequence.
    pub(crate) fn setup_assumptions(&mut self) -> Vec<Lit> {
        let mu_term = skolem::mk_max_unfolding(&mut self.tm, self.max_unfolding_depth);
        let mu = self.mk_literal(mu_term);
        self.max_unfolding_lit = Some(mu);
        let mut assumptions = vec![mu];
        let limits: Vec<(TermId, u32)> = self
            .length_limit_map
            .iter()
            .map(|(&s, &k)| (s, k))
            .collect();
        for (s, k) in limits {
            let lim = skolem::mk_length_limit(&mut self.tm, s, k);
            let lim = self.mk_literal(lim);
            if !assumptions.contains(&lim) {
                assumptions.push(lim);
            }
        }
        assumptions
    }

    /// Examine an unsat core for budget literals; raise the cited
    /// bounds and report whether the search should run again.
    pub(crate) fn should_research(&mut self, core: &[Lit]) -> bool {
        let mut k_min: Option<(TermId, u32)> = None;
        let mut has_max_unfolding = false;
        for &l in core {
            let Some(&atom) = self.var_atom.get(&l.var()) else {
                continue;
            };
            if skolem::is_max_unfolding(&self.tm, atom) {
                has_max_unfolding = true;
            } else if let Some((s, k)) = skolem::is_length_limit(&self.tm, atom)
                && k_min.as_ref().is_none_or(|&(_, k0)| k < k0)
            {
                k_min = Some((s, k));
            }
        }
        if let Some((s, k)) = k_min {
            self.max_unfolding_depth += 1;
            debug!(k = 2 * k, "increase length limit");
            self.add_length_limit(s, 2 * k, false);
            return true;
        }
        if has_max_unfolding {
            self.max_unfolding_depth = (1 + 3 * self.max_unfolding_depth) / 2;
            debug!(depth = self.max_unfolding_depth, "increase unfolding depth");
            return true;
        }
        false
    }
}
