//! The CDCL Engine.

use rustc_hash::FxHashSet;
use strand_core::literal::{LBool, Lit, Var};
use tracing::trace;

/// Outcome of adding a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseStatus {
    /// The clause was new and is now in the database.
    Added,
    /// An identical clause was already present.
    Duplicate,
    /// The clause is a tautology (or satisfied at root) and was dropped.
    Trivial,
}

/// Outcome of conflict resolution.
#[derive(Debug, Clone)]
pub enum ConflictOutcome {
    /// The engine backjumped; the theory must pop this many scopes.
    Backjumped {
        /// Number of decision levels popped.
        popped: u32,
    },
    /// The problem is unsatisfiable under the given assumptions.
    Unsat {
        /// Assumption literals involved in the final conflict.
        core: Vec<Lit>,
    },
}

/// Minimal CDCL solver.
pub struct SatSolver {
    clauses: Vec<Vec<Lit>>,
    clause_set: FxHashSet<Vec<Lit>>,
    assign: Vec<LBool>,
    level: Vec<u32>,
    reason: Vec<Option<u32>>,
    is_assumption: Vec<bool>,
    trail: Vec<Lit>,
    trail_lim: Vec<usize>,
    forced_phase: Vec<Option<bool>>,
    root_conflict: bool,
}

impl Default for SatSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SatSolver {
    /// Create a solver. Variable 0 is allocated and pinned to true, so
    /// [`strand_core::literal::TRUE_LIT`] evaluates to true from the start.
    #[must_use]
    pub fn new() -> Self {
        let mut s = Self {
            clauses: Vec::new(),
            clause_set: FxHashSet::default(),
            assign: Vec::new(),
            level: Vec::new(),
            reason: Vec::new(),
            is_assumption: Vec::new(),
            trail: Vec::new(),
            trail_lim: Vec::new(),
            forced_phase: Vec::new(),
            root_conflict: false,
        };
        let v0 = s.new_var();
        debug_assert_eq!(v0, 0);
        s.enqueue(Lit::positive(0), None);
        s
    }

    /// Allocate a fresh boolean variable.
    pub fn new_var(&mut self) -> Var {
        let v = self.assign.len() as Var;
        self.assign.push(LBool::Undef);
        self.level.push(0);
        self.reason.push(None);
        self.is_assumption.push(false);
        self.forced_phase.push(None);
        v
    }

    /// Number of allocated variables.
    #[must_use]
    pub fn num_vars(&self) -> usize {
        self.assign.len()
    }

    /// Truth value of a literal under the current assignment.
    #[must_use]
    pub fn value(&self, lit: Lit) -> LBool {
        let v = self.assign[lit.var() as usize];
        if lit.is_positive() { v } else { v.negate() }
    }

    /// Current decision level.
    #[must_use]
    pub fn decision_level(&self) -> u32 {
        self.trail_lim.len() as u32
    }

    /// The assignment trail, in assignment order.
    #[must_use]
    pub fn trail(&self) -> &[Lit] {
        &self.trail
    }

    /// Whether an inconsistency was derived at the root level.
    #[must_use]
    pub fn is_root_conflict(&self) -> bool {
        self.root_conflict
    }

    /// Record a phase preference for the next decision on this variable.
    pub fn force_phase(&mut self, lit: Lit) {
        self.forced_phase[lit.var() as usize] = Some(lit.is_positive());
    }

    /// Add a clause. Literals false at the root level are removed;
    /// clauses satisfied at the root or tautological are dropped.
    pub fn add_clause(&mut self, lits: &[Lit]) -> ClauseStatus {
        let mut cleaned: Vec<Lit> = Vec::with_capacity(lits.len());
        for &l in lits {
            if cleaned.contains(&l) {
                continue;
            }
            if cleaned.contains(&!l) {
                return ClauseStatus::Trivial;
            }
            // drop root-level-false literals, skip root-level-satisfied clauses
            if self.value(l).is_true() && self.level[l.var() as usize] == 0 {
                return ClauseStatus::Trivial;
            }
            if self.value(l).is_false() && self.level[l.var() as usize] == 0 {
                continue;
            }
            cleaned.push(l);
        }
        if cleaned.is_empty() {
            self.root_conflict = true;
            return ClauseStatus::Added;
        }
        let mut key = cleaned.clone();
        key.sort_unstable();
        if !self.clause_set.insert(key) {
            return ClauseStatus::Duplicate;
        }
        trace!(clause = ?cleaned, "add clause");
        self.clauses.push(cleaned);
        ClauseStatus::Added
    }

    fn enqueue(&mut self, lit: Lit, reason: Option<u32>) {
        debug_assert!(self.value(lit).is_undef());
        let v = lit.var() as usize;
        self.assign[v] = LBool::from(lit.is_positive());
        self.level[v] = self.decision_level();
        self.reason[v] = reason;
        self.trail.push(lit);
    }

    /// Unit propagation to fixpoint. On conflict, returns the literals
    /// of a falsified clause (all false under the current assignment).
    pub fn propagate(&mut self) -> Result<(), Vec<Lit>> {
        if self.root_conflict {
            return Err(Vec::new());
        }
        loop {
            let mut progress = false;
            'clauses: for ci in 0..self.clauses.len() {
                let mut unassigned: Option<Lit> = None;
                let mut n_unassigned = 0usize;
                for i in 0..self.clauses[ci].len() {
                    let l = self.clauses[ci][i];
                    match self.value(l) {
                        LBool::True => continue 'clauses,
                        LBool::False => {}
                        LBool::Undef => {
                            n_unassigned += 1;
                            unassigned = Some(l);
                        }
                    }
                }
                match n_unassigned {
                    0 => return Err(self.clauses[ci].clone()),
                    1 => {
                        let l = unassigned.expect("counted one unassigned literal");
                        self.enqueue(l, Some(ci as u32));
                        progress = true;
                    }
                    _ => {}
                }
            }
            if !progress {
                return Ok(());
            }
        }
    }

    /// Next branching literal: the first unassigned variable, with its
    /// forced phase when one was recorded, negative by default.
    #[must_use]
    pub fn pick_branch(&self) -> Option<Lit> {
        for v in 1..self.num_vars() {
            if self.assign[v].is_undef() {
                let phase = self.forced_phase[v].unwrap_or(false);
                return Some(Lit::new(v as Var, phase));
            }
        }
        None
    }

    /// Open a decision level and assign a decision (or assumption) literal.
    pub fn assume(&mut self, lit: Lit, is_assumption: bool) {
        self.trail_lim.push(self.trail.len());
        self.is_assumption[lit.var() as usize] = is_assumption;
        self.enqueue(lit, None);
    }

    /// Whether this literal is an unassigned-or-assigned assumption slot.
    #[must_use]
    pub fn is_assigned_assumption(&self, lit: Lit) -> bool {
        self.is_assumption[lit.var() as usize] && self.value(lit).is_true()
    }

    /// Undo all assignments above `target` decision level.
    pub fn backtrack_to(&mut self, target: u32) {
        while self.decision_level() > target {
            let start = self.trail_lim.pop().expect("decision level to pop");
            while self.trail.len() > start {
                let l = self.trail.pop().expect("trail entry");
                let v = l.var() as usize;
                self.assign[v] = LBool::Undef;
                self.reason[v] = None;
                self.is_assumption[v] = false;
            }
        }
    }

    /// Resolve a conflict given the literals of a falsified clause.
    ///
    /// Learns the clause over the involved decision literals, backjumps
    /// to its assertion level and stores it. When only assumptions are
    /// involved, reports unsatisfiability with the assumption core.
    pub fn handle_conflict(&mut self, falsified: &[Lit]) -> ConflictOutcome {
        let learned = self.analyze(falsified);
        trace!(?learned, "conflict analysis");

        if learned.is_empty() {
            self.root_conflict = true;
            return ConflictOutcome::Unsat { core: Vec::new() };
        }
        if learned
            .iter()
            .all(|l| self.is_assumption[l.var() as usize])
        {
            let core = learned.iter().map(|&l| !l).collect();
            return ConflictOutcome::Unsat { core };
        }

        let mut max_level = 0u32;
        let mut second = 0u32;
        for &l in &learned {
            let lv = self.level[l.var() as usize];
            if lv > max_level {
                second = max_level;
                max_level = lv;
            } else if lv > second {
                second = lv;
            }
        }
        let popped = self.decision_level() - second;
        self.backtrack_to(second);
        self.add_clause(&learned);
        ConflictOutcome::Backjumped { popped }
    }

    /// Resolve the falsified clause down to decision literals.
    fn analyze(&self, falsified: &[Lit]) -> Vec<Lit> {
        let mut seen: FxHashSet<Var> = FxHashSet::default();
        let mut out: Vec<Lit> = Vec::new();
        let mut stack: Vec<Lit> = falsified.to_vec();
        while let Some(l) = stack.pop() {
            let v = l.var();
            if !seen.insert(v) {
                continue;
            }
            if self.level[v as usize] == 0 {
                continue;
            }
            match self.reason[v as usize] {
                Some(ci) => {
                    for &l2 in &self.clauses[ci as usize] {
                        if l2.var() != v {
                            stack.push(l2);
                        }
                    }
                }
                None => out.push(l),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_core::literal::TRUE_LIT;

    fn lit(v: Var, pos: bool) -> Lit {
        Lit::new(v, pos)
    }

    /// Saturate the solver: propagate, resolve conflicts, decide.
    fn solve(s: &mut SatSolver) -> Option<bool> {
        loop {
            match s.propagate() {
                Ok(()) => match s.pick_branch() {
                    Some(l) => s.assume(l, false),
                    None => return Some(true),
                },
                Err(conflict) => match s.handle_conflict(&conflict) {
                    ConflictOutcome::Backjumped { .. } => {}
                    ConflictOutcome::Unsat { .. } => return Some(false),
                },
            }
        }
    }

    #[test]
    fn test_true_literal_pinned() {
        let s = SatSolver::new();
        assert!(s.value(TRUE_LIT).is_true());
    }

    #[test]
    fn test_unit_propagation() {
        let mut s = SatSolver::new();
        let a = s.new_var();
        let b = s.new_var();
        s.add_clause(&[lit(a, true)]);
        s.add_clause(&[lit(a, false), lit(b, true)]);
        assert!(s.propagate().is_ok());
        assert!(s.value(lit(a, true)).is_true());
        assert!(s.value(lit(b, true)).is_true());
    }

    #[test]
    fn test_sat_with_backjump() {
        let mut s = SatSolver::new();
        let a = s.new_var();
        let b = s.new_var();
        let c = s.new_var();
        s.add_clause(&[lit(a, true), lit(b, true)]);
        s.add_clause(&[lit(a, false), lit(c, true)]);
        s.add_clause(&[lit(c, false), lit(b, false)]);
        assert_eq!(solve(&mut s), Some(true));
    }

    #[test]
    fn test_unsat() {
        let mut s = SatSolver::new();
        let a = s.new_var();
        let b = s.new_var();
        s.add_clause(&[lit(a, true), lit(b, true)]);
        s.add_clause(&[lit(a, true), lit(b, false)]);
        s.add_clause(&[lit(a, false), lit(b, true)]);
        s.add_clause(&[lit(a, false), lit(b, false)]);
        assert_eq!(solve(&mut s), Some(false));
    }

    #[test]
    fn test_assumption_core() {
        let mut s = SatSolver::new();
        let a = s.new_var();
        let b = s.new_var();
        s.add_clause(&[lit(a, false), lit(b, false)]);
        s.assume(lit(a, true), true);
        s.assume(lit(b, true), true);
        let conflict = s.propagate().expect_err("must conflict");
        match s.handle_conflict(&conflict) {
            ConflictOutcome::Unsat { core } => {
                assert!(core.contains(&lit(a, true)) || core.contains(&lit(b, true)));
            }
            other => panic!("expected unsat, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_clause() {
        let mut s = SatSolver::new();
        let a = s.new_var();
        let b = s.new_var();
        assert_eq!(s.add_clause(&[lit(a, true), lit(b, true)]), ClauseStatus::Added);
        assert_eq!(
            s.add_clause(&[lit(b, true), lit(a, true)]),
            ClauseStatus::Duplicate
        );
        assert_eq!(
            s.add_clause(&[lit(a, true), lit(a, false)]),
            ClauseStatus::Trivial
        );
    }

    #[test]
    fn test_forced_phase() {
        let mut s = SatSolver::new();
        let a = s.new_var();
        s.force_phase(lit(a, true));
        assert_eq!(s.pick_branch(), Some(lit(a, true)));
    }
}
