//! The DPLL(T) Driver and Final-Check Cascade.
//!
//! The boolean engine runs to a full assignment, the theory digests
//! each trail literal as it lands, and the final-check cascade applies
//! the ordered rule pipeline until a rule fires (`Continue`), the
//! constraint set is discharged (`Done`) or the rules saturate
//! (`GiveUp`). Unsat answers citing budget assumptions raise the
//! corresponding bound and search again.

use crate::dependency::{Assumption, Dep};
use crate::eqs::{SeqNc, SeqNe};
use crate::skolem;
use crate::theory::{FinalCheck, SeqSolver, SolveResult};
use strand_core::ast::{SkolemKind, TermId, TermKind};
use strand_core::error::Result;
use strand_core::literal::{FALSE_LIT, LBool, Lit, TRUE_LIT};
use strand_core::rewrite::ReduceEq;
use strand_core::sort::Sort;
use strand_sat::ConflictOutcome;
use tracing::{debug, trace};

enum SearchOutcome {
    Sat,
    Unsat(Vec<Lit>),
    Unknown,
}

enum Processed {
    Conflict(Vec<Lit>),
    Progress,
    Quiescent,
}

impl SeqSolver {
    /// Decide satisfiability of the asserted constraints.
    pub fn check(&mut self) -> Result<SolveResult> {
        if self.params.arith_mode != strand_core::config::ArithMode::Bounds {
            return Err(strand_core::error::SeqError::IncompatibleArithTheory);
        }
        for _ in 0..self.params.max_research {
            self.reset_search();
            let assumptions = self.setup_assumptions();
            match self.search(&assumptions)? {
                SearchOutcome::Sat => {
                    let model = self.build_model();
                    return Ok(SolveResult::Sat(model));
                }
                SearchOutcome::Unsat(core) => {
                    if core.is_empty() || !self.should_research(&core) {
                        return Ok(SolveResult::Unsat);
                    }
                    debug!("research with raised bounds");
                }
                SearchOutcome::Unknown => return Ok(SolveResult::Unknown),
            }
        }
        Ok(SolveResult::Unknown)
    }

    fn reset_search(&mut self) {
        self.sat.backtrack_to(0);
        let depth = self.scope_depth;
        self.pop_scopes(depth);
        self.trail_head = self.sat.trail().len();
    }

    fn search(&mut self, assumptions: &[Lit]) -> Result<SearchOutcome> {
        let mut rounds = 0u32;
        loop {
            if self.sat.is_root_conflict() {
                return Ok(SearchOutcome::Unsat(Vec::new()));
            }
            self.drain_axioms();

            if let Err(conflict) = self.sat.propagate() {
                match self.sat.handle_conflict(&conflict) {
                    ConflictOutcome::Backjumped { popped } => {
                        self.pop_scopes(popped);
                        self.trail_head = self.sat.trail().len();
                        continue;
                    }
                    ConflictOutcome::Unsat { core } => return Ok(SearchOutcome::Unsat(core)),
                }
            }

            match self.process_trail()? {
                Processed::Conflict(clause) => {
                    match self.sat.handle_conflict(&clause) {
                        ConflictOutcome::Backjumped { popped } => {
                            self.pop_scopes(popped);
                            self.trail_head = self.sat.trail().len();
                        }
                        ConflictOutcome::Unsat { core } => {
                            return Ok(SearchOutcome::Unsat(core));
                        }
                    }
                    continue;
                }
                Processed::Progress => continue,
                Processed::Quiescent => {}
            }

            if self.propagate_arith_atoms() {
                continue;
            }

            // (re-)establish assumption literals
            let mut acted = false;
            for &a in assumptions {
                match self.sat.value(a) {
                    LBool::Undef => {
                        self.push_scope();
                        self.sat.assume(a, true);
                        acted = true;
                        break;
                    }
                    LBool::False => return Ok(SearchOutcome::Unsat(vec![a])),
                    LBool::True => {}
                }
            }
            if acted {
                continue;
            }

            if let Some(l) = self.sat.pick_branch() {
                self.push_scope();
                self.sat.assume(l, false);
                continue;
            }

            rounds += 1;
            if rounds > self.params.max_rounds {
                return Ok(SearchOutcome::Unknown);
            }
            match self.final_check()? {
                FinalCheck::Continue => continue,
                FinalCheck::Done => return Ok(SearchOutcome::Sat),
                FinalCheck::GiveUp => return Ok(SearchOutcome::Unknown),
            }
        }
    }

    // ------------------------------------------------------------------
    // Trail digestion
    // ------------------------------------------------------------------

    fn process_trail(&mut self) -> Result<Processed> {
        let mut progress = false;
        while self.trail_head < self.sat.trail().len() {
            let lit = self.sat.trail()[self.trail_head];
            self.trail_head += 1;
            let Some(&atom) = self.var_atom.get(&lit.var()) else {
                continue;
            };
            progress = true;
            if let Some(clause) = self.assign_event(atom, lit.is_positive())? {
                return Ok(Processed::Conflict(clause));
            }
        }
        Ok(if progress {
            Processed::Progress
        } else {
            Processed::Quiescent
        })
    }

    /// Digest one atom assignment; a returned clause (all literals
    /// false) reports a conflict.
    fn assign_event(&mut self, atom: TermId, is_true: bool) -> Result<Option<Vec<Lit>>> {
        let plit = Lit::positive(self.atom_var[&atom]);
        let alit = if is_true { plit } else { !plit };
        trace!(atom = %self.tm.display(atom), is_true, "assign");

        match self.tm.kind(atom).clone() {
            TermKind::Eq(a, b) => match self.tm.sort(a) {
                Sort::Seq => {
                    if is_true {
                        if let Err(clause) = self.eg.merge(a, b, plit) {
                            return Ok(Some(clause));
                        }
                        let dep = self.dm.leaf(Assumption::Eq(a, b));
                        let mut lv = Vec::new();
                        let mut rv = Vec::new();
                        self.tm.get_concat_units(a, &mut lv);
                        self.tm.get_concat_units(b, &mut rv);
                        if !self.has_eq(&lv, &rv) {
                            self.push_eq(lv, rv, dep);
                        }
                        self.new_solution = true;
                        self.enforce_length_coherence(a, b);
                    } else {
                        if let Err(clause) = self.eg.assert_diseq(a, b, plit) {
                            return Ok(Some(clause));
                        }
                        self.exclude.update(a, b);
                        let eq = self.tm.mk_eq(a, b);
                        let folded = self.rw.simplify(&mut self.tm, eq);
                        if !matches!(self.tm.kind(folded), TermKind::False) {
                            let dep = self.dep_lit(alit);
                            let (l, r) = if matches!(self.tm.kind(b), TermKind::Empty) {
                                (b, a)
                            } else {
                                (a, b)
                            };
                            self.nqs.push(SeqNe::new(l, r, dep));
                        }
                    }
                }
                Sort::Char => {
                    let outcome = if is_true {
                        self.eg.merge(a, b, plit)
                    } else {
                        self.eg.assert_diseq(a, b, plit)
                    };
                    if let Err(clause) = outcome {
                        return Ok(Some(clause));
                    }
                    if is_true && let Some(clause) = self.distinct_consts_clash(a) {
                        return Ok(Some(clause));
                    }
                }
                Sort::Int => {
                    if let Err(clause) = self.arith.assert_atom(&self.tm, alit, atom, is_true) {
                        return Ok(Some(clause));
                    }
                    // keep the class structure of integer terms so the
                    // e-class walk for tighter bounds sees merged terms
                    if is_true && let Err(clause) = self.eg.merge(a, b, plit) {
                        return Ok(Some(clause));
                    }
                }
                Sort::Re => match self.regex_are_equal(a, b)? {
                    Some(true) if !is_true => return Ok(Some(vec![plit])),
                    Some(false) if is_true => return Ok(Some(vec![!plit])),
                    _ => {}
                },
                Sort::Bool => {}
            },
            TermKind::Le(..) => {
                if let Err(clause) = self.arith.assert_atom(&self.tm, alit, atom, is_true) {
                    return Ok(Some(clause));
                }
            }
            TermKind::Contains(a, b) => {
                if is_true {
                    let iol = skolem::mk_indexof_left(&mut self.tm, a, b);
                    let ior = skolem::mk_indexof_right(&mut self.tm, a, b);
                    let mid = self.tm.mk_concat(b, ior);
                    let dec = self.tm.mk_concat(iol, mid);
                    self.propagate_eq(Dep::NIL, &[alit], a, dec);
                } else {
                    self.propagate_non_empty(alit, b);
                    let la = self.mk_len(a);
                    let lb = self.mk_len(b);
                    let diff = self.tm.mk_sub(la, lb);
                    let minus_one = self.tm.mk_int(-1);
                    let guard = self.tm.mk_le(diff, minus_one);
                    let guard = self.mk_literal(guard);
                    if guard != TRUE_LIT && guard != FALSE_LIT {
                        self.sat.force_phase(guard);
                    }
                    let dep = self.dep_lit(alit);
                    self.ncs.push(SeqNc {
                        contains: atom,
                        len_gt: guard,
                        dep,
                    });
                }
            }
            TermKind::Prefix(a, b) => {
                if is_true {
                    let inv = skolem::mk_prefix_inv(&mut self.tm, a, b);
                    let ext = self.tm.mk_concat(a, inv);
                    self.propagate_eq(Dep::NIL, &[alit], b, ext);
                } else {
                    self.propagate_not_prefix(atom);
                }
            }
            TermKind::Suffix(a, b) => {
                if is_true {
                    let inv = skolem::mk_suffix_inv(&mut self.tm, a, b);
                    let ext = self.tm.mk_concat(inv, a);
                    self.propagate_eq(Dep::NIL, &[alit], b, ext);
                } else {
                    self.propagate_not_suffix(atom);
                }
            }
            TermKind::InRe(..) => {
                self.propagate_in_re(atom, is_true)?;
            }
            TermKind::StrLt(..) | TermKind::StrLe(..) => {
                self.lts.push(atom);
            }
            TermKind::CharPred(el, ranges) => {
                if let Some(clause) = self.char_pred_clash(el, &ranges, is_true, plit) {
                    return Ok(Some(clause));
                }
            }
            TermKind::Skolem(kind, _) => match kind {
                SkolemKind::Accept if is_true => self.propagate_accept(alit, atom)?,
                SkolemKind::Step if is_true => self.propagate_step(alit, atom)?,
                _ => {}
            },
            _ => {}
        }
        Ok(None)
    }

    /// A merge must never put two distinct element constants into one
    /// class; the path between them is the conflict.
    fn distinct_consts_clash(&mut self, t: TermId) -> Option<Vec<Lit>> {
        let members = self.eg.class_members(t);
        let mut first: Option<(TermId, u32)> = None;
        for m in members {
            let Some(v) = self.tm.char_val(m) else {
                continue;
            };
            match first {
                None => first = Some((m, v)),
                Some((m0, v0)) => {
                    if v0 != v {
                        let mut clause = Vec::new();
                        for l in self.eg.explain(m0, m) {
                            let n = !l;
                            if !clause.contains(&n) {
                                clause.push(n);
                            }
                        }
                        return Some(clause);
                    }
                }
            }
        }
        None
    }

    fn char_pred_clash(
        &mut self,
        el: TermId,
        ranges: &strand_core::ast::CharRanges,
        is_true: bool,
        plit: Lit,
    ) -> Option<Vec<Lit>> {
        let members = self.eg.class_members(el);
        for m in members {
            let Some(v) = self.tm.char_val(m) else {
                continue;
            };
            if ranges.contains(v) != is_true {
                let mut clause = vec![if is_true { !plit } else { plit }];
                for l in self.eg.explain(el, m) {
                    let n = !l;
                    if !clause.contains(&n) {
                        clause.push(n);
                    }
                }
                return Some(clause);
            }
            break;
        }
        None
    }

    /// Assign comparison atoms whose truth the current bounds decide.
    fn propagate_arith_atoms(&mut self) -> bool {
        let mut progress = false;
        for i in 0..self.arith_atoms.len() {
            let atom = self.arith_atoms[i];
            let plit = Lit::positive(self.atom_var[&atom]);
            if self.sat.value(plit) != LBool::Undef {
                continue;
            }
            if let Some((truth, lits)) = self.arith.evaluate_atom(&self.tm, atom) {
                let mut clause = vec![if truth { plit } else { !plit }];
                for l in lits {
                    let n = !l;
                    if !clause.contains(&n) {
                        clause.push(n);
                    }
                }
                if self.add_axiom(&clause) {
                    progress = true;
                }
            }
        }
        if let Err(clause) = self.arith.recheck_diseqs(&self.tm) {
            self.add_axiom(&clause);
            progress = true;
        }
        progress
    }

    // ------------------------------------------------------------------
    // Final check
    // ------------------------------------------------------------------

    /// One round of the cascade; the rule order is the procedure's
    /// tie-break against divergence.
    pub(crate) fn final_check(&mut self) -> Result<FinalCheck> {
        self.new_propagation = false;

        if self.simplify_and_solve_eqs() {
            self.stats.solve_eqs += 1;
            trace!(">> solve_eqs");
            return Ok(FinalCheck::Continue);
        }
        if self.check_lts() {
            trace!(">> check_lts");
            return Ok(FinalCheck::Continue);
        }
        if self.solve_nqs(0) {
            self.stats.solve_nqs += 1;
            trace!(">> solve_nqs");
            return Ok(FinalCheck::Continue);
        }
        if self.check_contains() {
            trace!(">> propagate_contains");
            return Ok(FinalCheck::Continue);
        }
        if self.fixed_length(true) {
            self.stats.fixed_length += 1;
            trace!(">> zero_length");
            return Ok(FinalCheck::Continue);
        }
        if self.params.split_with_length && self.len_based_split() {
            self.stats.branch_variable += 1;
            trace!(">> split_based_on_length");
            return Ok(FinalCheck::Continue);
        }
        if self.fixed_length(false) {
            self.stats.fixed_length += 1;
            trace!(">> fixed_length");
            return Ok(FinalCheck::Continue);
        }
        if self.check_int_string() {
            self.stats.int_string += 1;
            trace!(">> int_string");
            return Ok(FinalCheck::Continue);
        }
        if self.reduce_length_eq() {
            self.stats.branch_variable += 1;
            trace!(">> reduce_length");
            return Ok(FinalCheck::Continue);
        }
        if self.branch_unit_variable() {
            self.stats.branch_variable += 1;
            trace!(">> branch_unit_variable");
            return Ok(FinalCheck::Continue);
        }
        if self.branch_binary_variable() {
            self.stats.branch_variable += 1;
            trace!(">> branch_binary_variable");
            return Ok(FinalCheck::Continue);
        }
        if self.branch_variable() {
            self.stats.branch_variable += 1;
            trace!(">> branch_variable");
            return Ok(FinalCheck::Continue);
        }
        if self.check_length_coherence() {
            self.stats.check_length_coherence += 1;
            trace!(">> check_length_coherence");
            return Ok(FinalCheck::Continue);
        }
        if !self.check_extensionality()? {
            self.stats.extensionality += 1;
            trace!(">> extensionality");
            return Ok(FinalCheck::Continue);
        }
        if self.branch_nqs() {
            self.stats.branch_nqs += 1;
            trace!(">> branch_ne");
            return Ok(FinalCheck::Continue);
        }
        if self.check_char_preds() {
            trace!(">> char_preds");
            return Ok(FinalCheck::Continue);
        }
        if self.is_solved() {
            trace!(">> is_solved");
            return Ok(FinalCheck::Done);
        }
        trace!(">> give_up");
        Ok(FinalCheck::GiveUp)
    }

    /// Pairwise probe of shared sequence terms: when canonization
    /// cannot tell two classes apart and no exclusion blocks them,
    /// suggest their equality to the boolean engine. Returns `true`
    /// when saturated.
    fn check_extensionality(&mut self) -> Result<bool> {
        let terms = self.seq_terms.clone();
        let mut reps: Vec<TermId> = Vec::new();
        for t in terms {
            let mut blocked = false;
            for &prev in &reps {
                if self.eg.are_eq(t, prev)
                    || self.eg.is_diseq(t, prev).is_some()
                    || self.exclude.contains(t, prev)
                {
                    continue;
                }
                let Some((e1, d1)) = self.canonize(t) else {
                    return Ok(false);
                };
                let Some((e2, d2)) = self.canonize(prev) else {
                    return Ok(false);
                };
                let dep = self.dm.join(d1, d2);
                let mut lv = Vec::new();
                let mut rv = Vec::new();
                self.tm.get_concat_units(e1, &mut lv);
                self.tm.get_concat_units(e2, &mut rv);
                match self.rw.reduce_eq(&mut self.tm, &lv, &rv) {
                    ReduceEq::Unsat => {
                        self.exclude.update(t, prev);
                        continue;
                    }
                    ReduceEq::Trivial => {
                        if self.propagate_eq(dep, &[], t, prev) {
                            return Ok(false);
                        }
                    }
                    ReduceEq::Reduced { pairs, .. } => {
                        let excluded = pairs
                            .iter()
                            .any(|&(l, r)| self.exclude.contains(l, r));
                        if excluded {
                            continue;
                        }
                        let lit = self.mk_eq_lit(t, prev);
                        if self.sat.value(lit) == LBool::Undef {
                            self.sat.force_phase(lit);
                            self.new_propagation = true;
                            blocked = true;
                            break;
                        }
                    }
                }
            }
            if blocked {
                return Ok(false);
            }
            reps.push(t);
        }
        Ok(true)
    }

    /// Validate decided character-class atoms against class constants
    /// discovered since their assignment.
    fn check_char_preds(&mut self) -> bool {
        let atoms: Vec<(TermId, Lit)> = self
            .atom_var
            .iter()
            .map(|(&t, &v)| (t, Lit::positive(v)))
            .collect();
        for (atom, plit) in atoms {
            let TermKind::CharPred(el, ranges) = self.tm.kind(atom).clone() else {
                continue;
            };
            let is_true = match self.sat.value(plit) {
                LBool::True => true,
                LBool::False => false,
                LBool::Undef => continue,
            };
            if let Some(clause) = self.char_pred_clash(el, &ranges, is_true, plit) {
                self.add_axiom(&clause);
                self.new_propagation = true;
                return true;
            }
        }
        false
    }

    /// Success iff the equation store is empty, every regex compiled to
    /// an automaton, and no negated-contains constraint remains.
    fn is_solved(&self) -> bool {
        if !self.eqs.is_empty() {
            debug!(
                eq = %self.eqs.get(0).display(&self.tm),
                "giveup: unsolved equation"
            );
            return false;
        }
        if self.re2aut.values().any(Option::is_none) {
            debug!("giveup: regular expression did not compile to an automaton");
            return false;
        }
        if !self.ncs.is_empty() {
            debug!(
                nc = %self.ncs.get(0).display(&self.tm),
                "giveup: unsolved negated containment"
            );
            return false;
        }
        true
    }
}
