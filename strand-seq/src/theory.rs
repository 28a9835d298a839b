//! The Sequence Theory Core.
//!
//! [`SeqSolver`] owns the term arena, the boolean engine, the equality
//! graph, the arithmetic view and every scoped store of the theory. The
//! final-check cascade and the individual solving rules are implemented
//! in the sibling modules; this one holds the shared plumbing:
//! literal creation and internalization, axiom emission, dependency
//! linearization, the canonizer/expander, and scope management.

use crate::arith::ArithView;
use crate::automaton::Nfa;
use crate::dependency::{Assumption, Dep, DepManager};
use crate::egraph::EGraph;
use crate::eqs::{SInRe, SeqEq, SeqNc, SeqNe};
use crate::model::Model;
use crate::scoped::ScopedVec;
use crate::solution::{ExclusionTable, SolutionMap};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::collections::VecDeque;
use strand_core::ast::{SkolemKind, TermId, TermKind, TermManager};
use strand_core::config::SeqParams;
use strand_core::literal::{FALSE_LIT, LBool, Lit, TRUE_LIT, Var};
use strand_core::rewrite::SeqRewriter;
use strand_core::sort::Sort;
use strand_core::statistics::Statistics;
use strand_sat::{ClauseStatus, SatSolver};
use tracing::{debug, trace};

/// Verdict of one final-check round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalCheck {
    /// A rule fired; the boolean engine must run again.
    Continue,
    /// The constraint set is satisfied.
    Done,
    /// Saturated without a conclusion.
    GiveUp,
}

/// Result of a satisfiability check.
#[derive(Debug, Clone)]
pub enum SolveResult {
    /// Satisfiable, with a witness model.
    Sat(Model),
    /// Unsatisfiable.
    Unsat,
    /// The procedure gave up.
    Unknown,
}

/// The sequence-theory solver.
pub struct SeqSolver {
    pub(crate) params: SeqParams,
    pub(crate) stats: Statistics,
    pub(crate) tm: TermManager,
    pub(crate) rw: SeqRewriter,
    pub(crate) sat: SatSolver,
    pub(crate) eg: EGraph,
    pub(crate) arith: ArithView,
    pub(crate) dm: DepManager,
    pub(crate) rep: SolutionMap,
    pub(crate) exclude: ExclusionTable,

    pub(crate) eqs: ScopedVec<SeqEq>,
    pub(crate) nqs: ScopedVec<SeqNe>,
    pub(crate) ncs: ScopedVec<SeqNc>,
    pub(crate) lts: ScopedVec<TermId>,
    pub(crate) s_in_re: ScopedVec<SInRe>,
    pub(crate) lts_checked: bool,
    lts_checked_stack: Vec<bool>,
    pub(crate) eq_id: u32,

    // atom registration
    pub(crate) atom_var: FxHashMap<TermId, Var>,
    pub(crate) var_atom: FxHashMap<Var, TermId>,
    pub(crate) arith_atoms: Vec<TermId>,

    // pending operator axioms (the clause database persists across
    // backjumps, so the queue and its memo are monotone)
    pub(crate) axiom_queue: VecDeque<TermId>,
    pub(crate) axiom_set: FxHashSet<TermId>,
    pub(crate) internalized: FxHashSet<TermId>,

    // length and int-string tracking
    pub(crate) has_length: FxHashSet<TermId>,
    pub(crate) length_terms: Vec<TermId>,
    pub(crate) int_string: Vec<TermId>,
    pub(crate) fixed: FxHashSet<TermId>,
    pub(crate) seq_terms: Vec<TermId>,

    // regex engine
    pub(crate) re2aut: FxHashMap<TermId, Option<usize>>,
    pub(crate) automata: Vec<Nfa>,
    pub(crate) max_unfolding_depth: u32,
    pub(crate) max_unfolding_lit: Option<Lit>,
    pub(crate) length_limit_map: FxHashMap<TermId, u32>,

    // per-round flags
    pub(crate) new_propagation: bool,
    pub(crate) new_solution: bool,

    // driver bookkeeping
    pub(crate) scope_depth: u32,
    pub(crate) trail_head: usize,
    pub(crate) assertions: Vec<(TermId, bool)>,
}

impl Default for SeqSolver {
    fn default() -> Self {
        Self::new(SeqParams::default())
    }
}

impl SeqSolver {
    /// Create a solver with the given parameters.
    #[must_use]
    pub fn new(params: SeqParams) -> Self {
        let max_unfolding_depth = params.initial_unfolding_depth;
        Self {
            params,
            stats: Statistics::default(),
            tm: TermManager::new(),
            rw: SeqRewriter::new(),
            sat: SatSolver::new(),
            eg: EGraph::new(),
            arith: ArithView::new(),
            dm: DepManager::new(),
            rep: SolutionMap::new(),
            exclude: ExclusionTable::new(),
            eqs: ScopedVec::new(),
            nqs: ScopedVec::new(),
            ncs: ScopedVec::new(),
            lts: ScopedVec::new(),
            s_in_re: ScopedVec::new(),
            lts_checked: false,
            lts_checked_stack: Vec::new(),
            eq_id: 0,
            atom_var: FxHashMap::default(),
            var_atom: FxHashMap::default(),
            arith_atoms: Vec::new(),
            axiom_queue: VecDeque::new(),
            axiom_set: FxHashSet::default(),
            internalized: FxHashSet::default(),
            has_length: FxHashSet::default(),
            length_terms: Vec::new(),
            int_string: Vec::new(),
            fixed: FxHashSet::default(),
            seq_terms: Vec::new(),
            re2aut: FxHashMap::default(),
            automata: Vec::new(),
            max_unfolding_depth,
            max_unfolding_lit: None,
            length_limit_map: FxHashMap::default(),
            new_propagation: false,
            new_solution: false,
            scope_depth: 0,
            trail_head: 0,
            assertions: Vec::new(),
        }
    }

    /// Mutable access to the term manager, for building constraints.
    pub fn tm(&mut self) -> &mut TermManager {
        &mut self.tm
    }

    /// Collected statistics.
    #[must_use]
    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    /// Assert a boolean term with the given polarity.
    pub fn assert_formula(&mut self, t: TermId, positive: bool) {
        self.assertions.push((t, positive));
        let lit = self.mk_literal(t);
        let lit = if positive { lit } else { !lit };
        self.sat.add_clause(&[lit]);
    }

    // ------------------------------------------------------------------
    // Literals and internalization
    // ------------------------------------------------------------------

    /// Literal for a boolean term, after simplification. Registers the
    /// atom and internalizes its subterms.
    pub fn mk_literal(&mut self, t: TermId) -> Lit {
        let t = self.rw.simplify(&mut self.tm, t);
        match self.tm.kind(t) {
            TermKind::True => return TRUE_LIT,
            TermKind::False => return FALSE_LIT,
            _ => {}
        }
        if let Some(&v) = self.atom_var.get(&t) {
            return Lit::positive(v);
        }
        let v = self.sat.new_var();
        self.atom_var.insert(t, v);
        self.var_atom.insert(v, t);
        if matches!(self.tm.kind(t), TermKind::Le(..))
            || matches!(self.tm.kind(t), TermKind::Eq(a, _) if self.tm.sort(*a) == Sort::Int)
        {
            self.arith_atoms.push(t);
        }
        self.internalize(t);
        Lit::positive(v)
    }

    /// Literal for the simplified equality of two terms.
    pub fn mk_eq_lit(&mut self, a: TermId, b: TermId) -> Lit {
        let eq = self.tm.mk_eq(a, b);
        self.mk_literal(eq)
    }

    /// Simplified length term.
    pub fn mk_len(&mut self, s: TermId) -> TermId {
        let len = self.tm.mk_length(s);
        self.rw.simplify(&mut self.tm, len)
    }

    /// Literal asserting `e = ε`, with a phase preference. Constant
    /// for sides that are certainly empty or certainly not.
    pub fn mk_eq_empty(&mut self, e: TermId, phase: bool) -> Lit {
        let empty = self.tm.mk_empty();
        let lit = self.mk_eq_lit(e, empty);
        if lit != TRUE_LIT && lit != FALSE_LIT {
            self.sat
                .force_phase(if phase { lit } else { !lit });
        }
        lit
    }

    /// Walk a new term's subterms, registering lengths, operator axioms
    /// and tracked lists.
    fn internalize(&mut self, root: TermId) {
        let mut todo = vec![root];
        while let Some(t) = todo.pop() {
            if !self.internalized.insert(t) {
                continue;
            }
            self.tm.for_each_child(t, |c| todo.push(c));

            let kind = self.tm.kind(t).clone();
            match &kind {
                TermKind::Length(s) => {
                    self.register_length(*s);
                }
                TermKind::IndexOf(..)
                | TermKind::Replace(..)
                | TermKind::Extract(..)
                | TermKind::At(..)
                | TermKind::Itos(_)
                | TermKind::Stoi(_)
                | TermKind::StrLt(..)
                | TermKind::StrLe(..) => {
                    self.enqueue_axiom(t);
                }
                TermKind::Skolem(SkolemKind::Tail, args) => {
                    let s = args[0];
                    self.add_length_limit(s, self.max_unfolding_depth.max(self.params.initial_length_limit), true);
                }
                _ => {}
            }
            match &kind {
                TermKind::Itos(_) | TermKind::Stoi(_) => {
                    self.int_string.push(t);
                    self.add_length_limit(t, self.params.initial_length_limit, true);
                }
                _ => {}
            }
            if self.tm.sort(t) == Sort::Seq
                && self.tm.ground_word(t).is_none()
                && !self.seq_terms.contains(&t)
            {
                self.seq_terms.push(t);
            }
        }
    }

    /// Track the length term of `s` and queue its defining axiom.
    pub(crate) fn register_length(&mut self, s: TermId) {
        if self.tm.ground_word(s).is_some() || self.has_length.contains(&s) {
            return;
        }
        self.has_length.insert(s);
        let len = self.tm.mk_length(s);
        self.length_terms.push(len);
        self.enqueue_axiom(len);
    }

    /// Queue a term for axiom instantiation.
    pub(crate) fn enqueue_axiom(&mut self, t: TermId) {
        if self.axiom_set.insert(t) {
            trace!(term = %self.tm.display(t), "enqueue axiom");
            self.axiom_queue.push_back(t);
        }
    }

    // ------------------------------------------------------------------
    // Clause emission
    // ------------------------------------------------------------------

    /// Emit a theory axiom. True literals make the clause trivial;
    /// false literals are dropped. Returns whether the clause was new.
    pub fn add_axiom(&mut self, lits: &[Lit]) -> bool {
        let mut cleaned: SmallVec<[Lit; 5]> = SmallVec::new();
        for &l in lits {
            if l == TRUE_LIT {
                return false;
            }
            if l == FALSE_LIT {
                continue;
            }
            if cleaned.contains(&!l) {
                return false;
            }
            if !cleaned.contains(&l) {
                cleaned.push(l);
            }
        }
        match self.sat.add_clause(&cleaned) {
            ClauseStatus::Added => {
                self.stats.add_axiom += 1;
                self.new_propagation = true;
                true
            }
            _ => false,
        }
    }

    /// Literals of a dependency, resolving equality-graph pairs to the
    /// literals explaining them. Pre-condition: every literal is
    /// currently assigned true.
    pub fn linearize_lits(&mut self, dep: Dep) -> Vec<Lit> {
        let mut lits = Vec::new();
        let mut eqs = Vec::new();
        self.dm.linearize(dep, &mut lits, &mut eqs);
        for (a, b) in eqs {
            for l in self.eg.explain(a, b) {
                if !lits.contains(&l) {
                    lits.push(l);
                }
            }
        }
        debug_assert!(
            lits.iter()
                .all(|&l| self.sat.value(l) == LBool::True || l == TRUE_LIT),
            "dependency literal not asserted"
        );
        lits
    }

    /// Propagate `lit` under `dep ∧ premises`, as a theory clause.
    pub fn propagate_lit(&mut self, dep: Dep, premises: &[Lit], lit: Lit) {
        if lit == TRUE_LIT {
            return;
        }
        let mut clause: Vec<Lit> = Vec::new();
        for &p in premises {
            if p != TRUE_LIT {
                clause.push(!p);
            }
        }
        for l in self.linearize_lits(dep) {
            let n = !l;
            if !clause.contains(&n) {
                clause.push(n);
            }
        }
        if lit != FALSE_LIT {
            clause.push(lit);
        }
        trace!(clause = ?clause, "propagate");
        let added = self.add_axiom(&clause);
        if added || self.sat.value(lit) != LBool::True {
            self.new_propagation = true;
        }
    }

    /// Report a conflict: the conjunction of `dep` and `lits` is
    /// inconsistent.
    pub fn set_conflict(&mut self, dep: Dep, lits: &[Lit]) {
        debug!("seq conflict");
        let mut clause: Vec<Lit> = Vec::new();
        for &l in lits {
            if l != TRUE_LIT {
                let n = !l;
                if !clause.contains(&n) {
                    clause.push(n);
                }
            }
        }
        for l in self.linearize_lits(dep) {
            let n = !l;
            if !clause.contains(&n) {
                clause.push(n);
            }
        }
        self.add_axiom(&clause);
        self.new_propagation = true;
    }

    /// Propagate the equality of two terms under `dep ∧ premises`.
    /// Returns false when the equality is already established.
    pub fn propagate_eq(&mut self, dep: Dep, premises: &[Lit], e1: TermId, e2: TermId) -> bool {
        if e1 == e2 || self.eg.are_eq(e1, e2) {
            return false;
        }
        let lit = self.mk_eq_lit(e1, e2);
        if self.sat.value(lit) == LBool::True {
            return false;
        }
        self.propagate_lit(dep, premises, lit);
        if self.tm.sort(e1) == Sort::Seq {
            self.enforce_length_coherence(e1, e2);
        }
        true
    }

    /// When one side of a propagated equality has a tracked length and
    /// the other does not, track the other side too.
    pub(crate) fn enforce_length_coherence(&mut self, e1: TermId, e2: TermId) {
        let c1 = matches!(self.tm.kind(e1), TermKind::Concat(..));
        let c2 = matches!(self.tm.kind(e2), TermKind::Concat(..));
        if c1 && c2 {
            return;
        }
        if self.has_length.contains(&e1) && !self.has_length.contains(&e2) {
            self.add_length_to_eqc(e2);
        } else if self.has_length.contains(&e2) && !self.has_length.contains(&e1) {
            self.add_length_to_eqc(e1);
        }
    }

    /// Propagate `lit => s != ε`.
    pub fn propagate_non_empty(&mut self, lit: Lit, s: TermId) {
        let emp = self.mk_eq_empty(s, false);
        self.propagate_lit(Dep::NIL, &[lit], !emp);
    }

    // ------------------------------------------------------------------
    // Canonizer / expander
    // ------------------------------------------------------------------

    /// Normal form of `e` under the current solution map, together with
    /// the dependency accumulated along the way. `None` when progress
    /// is blocked on an undecided ITE condition.
    pub fn canonize(&mut self, e: TermId) -> Option<(TermId, Dep)> {
        let mut dep = Dep::NIL;
        let r = self.expand(e, &mut dep)?;
        let r = self.rw.simplify(&mut self.tm, r);
        Some((r, dep))
    }

    /// Expand `e` through the solution map, recursively replacing
    /// sub-terms. The per-scope cache short-circuits repeats.
    pub(crate) fn expand(&mut self, e0: TermId, dep: &mut Dep) -> Option<TermId> {
        if let Some((r, d)) = self.rep.find_cache(e0) {
            if r != e0 {
                *dep = self.dm.join(*dep, d);
            }
            return Some(r);
        }
        let (e, d0) = self.rep.find(&mut self.dm, e0);
        let mut local = d0;
        let result = match self.tm.kind(e).clone() {
            TermKind::Concat(a, b) => {
                let ea = self.expand(a, &mut local)?;
                let eb = self.expand(b, &mut local)?;
                self.tm.mk_concat(ea, eb)
            }
            TermKind::Unit(c) => {
                let ec = self.expand(c, &mut local)?;
                self.tm.mk_unit(ec)
            }
            TermKind::Prefix(a, b) => {
                let ea = self.expand(a, &mut local)?;
                let eb = self.expand(b, &mut local)?;
                self.tm.mk(TermKind::Prefix(ea, eb))
            }
            TermKind::Suffix(a, b) => {
                let ea = self.expand(a, &mut local)?;
                let eb = self.expand(b, &mut local)?;
                self.tm.mk(TermKind::Suffix(ea, eb))
            }
            TermKind::Contains(a, b) => {
                let ea = self.expand(a, &mut local)?;
                let eb = self.expand(b, &mut local)?;
                self.tm.mk(TermKind::Contains(ea, eb))
            }
            TermKind::IndexOf(a, b, i) => {
                let ea = self.expand(a, &mut local)?;
                let eb = self.expand(b, &mut local)?;
                self.tm.mk(TermKind::IndexOf(ea, eb, i))
            }
            TermKind::Ite(c, t, el) => {
                let clit = self.mk_literal(c);
                match self.sat.value(clit) {
                    LBool::True => {
                        local = self.dm.join_lit(local, clit);
                        self.expand(t, &mut local)?
                    }
                    LBool::False => {
                        local = self.dm.join_lit(local, !clit);
                        self.expand(el, &mut local)?
                    }
                    LBool::Undef => {
                        // make progress on the condition first
                        self.new_propagation = true;
                        return None;
                    }
                }
            }
            _ => e,
        };
        let cached_dep = if result == e0 { Dep::NIL } else { local };
        self.rep.add_cache(e0, result, cached_dep);
        *dep = self.dm.join(*dep, cached_dep);
        Some(result)
    }

    /// Canonize a side of an equation into a flat leaf list: each part
    /// expands, rewrites, and its concatenation structure flattens
    /// (literals explode into units).
    pub(crate) fn canonize_side(
        &mut self,
        parts: &[TermId],
        dep: &mut Dep,
    ) -> Option<Vec<TermId>> {
        let mut out = Vec::with_capacity(parts.len());
        for &p in parts {
            let e = self.expand(p, dep)?;
            let e = self.rw.simplify(&mut self.tm, e);
            self.tm.get_concat_units(e, &mut out);
        }
        Some(out)
    }

    // ------------------------------------------------------------------
    // Bounds (through the arithmetic view)
    // ------------------------------------------------------------------

    /// Integral lower bound of an integer term.
    pub(crate) fn lower_bound(&self, e: TermId) -> Option<(num_bigint::BigInt, Vec<Lit>)> {
        let (v, lits) = self.arith.get_lower(&self.tm, e)?;
        if !v.is_integer() {
            return None;
        }
        Some((v.to_integer(), lits))
    }

    /// Integral upper bound of an integer term.
    pub(crate) fn upper_bound(&self, e: TermId) -> Option<(num_bigint::BigInt, Vec<Lit>)> {
        let (v, lits) = self.arith.get_upper(&self.tm, e)?;
        if !v.is_integer() {
            return None;
        }
        Some((v.to_integer(), lits))
    }

    /// Exact integral value of an integer term.
    pub(crate) fn get_num_value(&self, e: TermId) -> Option<(num_bigint::BigInt, Vec<Lit>)> {
        let (v, lits) = self.arith.get_value(&self.tm, e)?;
        if !v.is_integer() {
            return None;
        }
        Some((v.to_integer(), lits))
    }

    /// Like [`Self::lower_bound`], but also walks the equivalence class
    /// of the term for a tighter bound when the direct query fails,
    /// emitting the bridging axiom for an improvement found on a class
    /// member.
    pub(crate) fn lower_bound2(&mut self, e: TermId) -> Option<(num_bigint::BigInt, Vec<Lit>)> {
        if let Some(found) = self.lower_bound(e) {
            return Some(found);
        }
        let members = self.eg.class_members(e);
        let mut best: Option<(num_bigint::BigInt, Vec<Lit>, TermId)> = None;
        for m in members {
            if m == e {
                continue;
            }
            if let Some((v, lits)) = self.lower_bound(m)
                && best.as_ref().is_none_or(|(b, _, _)| v > *b)
            {
                best = Some((v, lits, m));
            }
        }
        let (v, lits, m) = best?;
        let c = self.tm.mk_int(v.clone());
        let low_m = self.tm.mk_ge(m, c);
        let low_m_lit = self.mk_literal(low_m);
        let low_e = self.tm.mk_ge(e, c);
        let low_e_lit = self.mk_literal(low_e);
        self.add_axiom(&[!low_m_lit, low_e_lit]);
        Some((v, lits))
    }

    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    /// Open a scope across every scoped container.
    pub fn push_scope(&mut self) {
        self.scope_depth += 1;
        self.rep.push_scope();
        self.exclude.push_scope();
        self.eg.push_scope();
        self.arith.push_scope();
        self.eqs.push_scope();
        self.nqs.push_scope();
        self.ncs.push_scope();
        self.lts.push_scope();
        self.s_in_re.push_scope();
        self.lts_checked_stack.push(self.lts_checked);
    }

    /// Pop `n` scopes; the solution-map query cache is cleared.
    pub fn pop_scopes(&mut self, n: u32) {
        if n == 0 {
            return;
        }
        let n = n.min(self.scope_depth);
        self.scope_depth -= n;
        let n = n as usize;
        self.rep.pop_scope(n);
        self.exclude.pop_scope(n);
        self.eg.pop_scope(n);
        self.arith.pop_scope(n);
        self.eqs.pop_scope(n);
        self.nqs.pop_scope(n);
        self.ncs.pop_scope(n);
        self.lts.pop_scope(n);
        self.s_in_re.pop_scope(n);
        for _ in 0..n {
            if let Some(v) = self.lts_checked_stack.pop() {
                self.lts_checked = v;
            }
        }
        self.rep.reset_cache();
    }

    // ------------------------------------------------------------------
    // Equation store helpers
    // ------------------------------------------------------------------

    /// Push a structured equation.
    pub(crate) fn push_eq(&mut self, ls: Vec<TermId>, rs: Vec<TermId>, dep: Dep) {
        let id = self.eq_id;
        self.eq_id += 1;
        trace!(
            eq = %SeqEq { id, ls: ls.clone(), rs: rs.clone(), dep }.display(&self.tm),
            "push equation"
        );
        self.eqs.push(SeqEq { id, ls, rs, dep });
    }

    /// Whether an identical equation is already pending.
    pub(crate) fn has_eq(&self, ls: &[TermId], rs: &[TermId]) -> bool {
        self.eqs
            .iter()
            .any(|e| (e.ls == ls && e.rs == rs) || (e.ls == rs && e.rs == ls))
    }

    /// Record a solved equation `l ↦ r` in the solution map and
    /// propagate it to the equality graph.
    pub(crate) fn add_solution(&mut self, l: TermId, r: TermId, dep: Dep) -> bool {
        if l == r {
            return false;
        }
        trace!(l = %self.tm.display(l), r = %self.tm.display(r), "add solution");
        self.new_solution = true;
        self.rep.update(l, r, dep);
        self.propagate_eq(dep, &[], l, r);
        true
    }

    /// Leaf dependency for a literal.
    pub(crate) fn dep_lit(&mut self, l: Lit) -> Dep {
        self.dm.leaf(Assumption::Lit(l))
    }

    /// Fresh automaton handle for a compiled regex, memoized per term.
    pub(crate) fn get_automaton(&mut self, re: TermId) -> strand_core::error::Result<usize> {
        if let Some(&cached) = self.re2aut.get(&re) {
            if let Some(idx) = cached {
                return Ok(idx);
            }
        }
        match Nfa::compile(&self.tm, re, self.params.max_automaton_states) {
            Ok(nfa) => {
                let idx = self.automata.len();
                self.automata.push(nfa);
                self.re2aut.insert(re, Some(idx));
                Ok(idx)
            }
            Err(err) => {
                self.re2aut.insert(re, None);
                Err(err)
            }
        }
    }
}
