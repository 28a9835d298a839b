//! Regex Compilation to Finite Automata.
//!
//! Regular expressions compile lazily to nondeterministic automata whose
//! transition labels are unions of code-point ranges. Construction is
//! Thompson-style; intersection uses a product over atomic label
//! intervals, complement goes through subset construction. The compiled
//! automaton is ε-free: ε-moves are introduced during construction and
//! eliminated before the automaton is handed to the membership engine.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use strand_core::ast::{CharRanges, TermId, TermKind, TermManager};
use strand_core::error::{Result, SeqError};

/// State identifier.
pub type StateId = usize;

/// An ε-free automaton with predicated transition labels.
#[derive(Debug, Clone)]
pub struct Nfa {
    moves: Vec<Vec<(CharRanges, StateId)>>,
    initial: StateId,
    finals: FxHashSet<StateId>,
    sinks: FxHashSet<StateId>,
}

struct Builder {
    // label None is an ε-move, eliminated before the Nfa is finished
    moves: Vec<Vec<(Option<CharRanges>, StateId)>>,
}

struct Frag {
    start: StateId,
    end: StateId,
}

impl Builder {
    fn new() -> Self {
        Self { moves: Vec::new() }
    }

    fn state(&mut self) -> StateId {
        self.moves.push(Vec::new());
        self.moves.len() - 1
    }

    fn eps(&mut self, from: StateId, to: StateId) {
        self.moves[from].push((None, to));
    }

    fn label(&mut self, from: StateId, ranges: CharRanges, to: StateId) {
        if ranges.is_empty() {
            return;
        }
        self.moves[from].push((Some(ranges), to));
    }

    fn compile(
        &mut self,
        tm: &TermManager,
        re: TermId,
        cap: usize,
    ) -> Result<Frag> {
        if self.moves.len() > cap {
            return Err(SeqError::UnsupportedRegex {
                expr: tm.display(re),
            });
        }
        match tm.kind(re).clone() {
            TermKind::ToRe(s) => {
                let Some(word) = tm.ground_word(s) else {
                    return Err(SeqError::UnsupportedRegex {
                        expr: tm.display(re),
                    });
                };
                let start = self.state();
                let mut cur = start;
                for c in word {
                    let next = self.state();
                    self.label(cur, CharRanges::singleton(c), next);
                    cur = next;
                }
                Ok(Frag { start, end: cur })
            }
            TermKind::ReRange(lo, hi) => {
                let start = self.state();
                let end = self.state();
                self.label(start, CharRanges(smallvec::smallvec![(lo, hi)]), end);
                Ok(Frag { start, end })
            }
            TermKind::ReAllChar => {
                let start = self.state();
                let end = self.state();
                self.label(start, CharRanges::any(), end);
                Ok(Frag { start, end })
            }
            TermKind::ReNone => {
                let start = self.state();
                let end = self.state();
                Ok(Frag { start, end })
            }
            TermKind::ReConcat(a, b) => {
                let fa = self.compile(tm, a, cap)?;
                let fb = self.compile(tm, b, cap)?;
                self.eps(fa.end, fb.start);
                Ok(Frag {
                    start: fa.start,
                    end: fb.end,
                })
            }
            TermKind::ReUnion(a, b) => {
                let start = self.state();
                let end = self.state();
                let fa = self.compile(tm, a, cap)?;
                let fb = self.compile(tm, b, cap)?;
                self.eps(start, fa.start);
                self.eps(start, fb.start);
                self.eps(fa.end, end);
                self.eps(fb.end, end);
                Ok(Frag { start, end })
            }
            TermKind::ReStar(r) => {
                let start = self.state();
                let end = self.state();
                let fr = self.compile(tm, r, cap)?;
                self.eps(start, end);
                self.eps(start, fr.start);
                self.eps(fr.end, fr.start);
                self.eps(fr.end, end);
                Ok(Frag { start, end })
            }
            TermKind::ReInter(a, b) => {
                let na = Nfa::compile(tm, a, cap)?;
                let nb = Nfa::compile(tm, b, cap)?;
                let prod = na.product(&nb, cap).ok_or_else(|| SeqError::UnsupportedRegex {
                    expr: tm.display(re),
                })?;
                Ok(self.embed(&prod))
            }
            TermKind::ReComp(r) => {
                let nr = Nfa::compile(tm, r, cap)?;
                let comp = nr.complement(cap).ok_or_else(|| SeqError::UnsupportedRegex {
                    expr: tm.display(re),
                })?;
                Ok(self.embed(&comp))
            }
            _ => Err(SeqError::UnsupportedRegex {
                expr: tm.display(re),
            }),
        }
    }

    /// Inline a finished automaton as a fragment.
    fn embed(&mut self, nfa: &Nfa) -> Frag {
        let offset = self.moves.len();
        for from in 0..nfa.moves.len() {
            let s = self.state();
            debug_assert_eq!(s, offset + from);
        }
        for (from, outs) in nfa.moves.iter().enumerate() {
            for (ranges, to) in outs {
                self.moves[offset + from].push((Some(ranges.clone()), offset + to));
            }
        }
        let start = self.state();
        let end = self.state();
        self.eps(start, offset + nfa.initial);
        for &f in &nfa.finals {
            self.eps(offset + f, end);
        }
        Frag { start, end }
    }

    fn eps_closure(&self, seed: &FxHashSet<StateId>) -> FxHashSet<StateId> {
        let mut closure = seed.clone();
        let mut queue: VecDeque<StateId> = seed.iter().copied().collect();
        while let Some(q) = queue.pop_front() {
            for (label, to) in &self.moves[q] {
                if label.is_none() && closure.insert(*to) {
                    queue.push_back(*to);
                }
            }
        }
        closure
    }

    /// Eliminate ε-moves, producing the final automaton.
    fn finish(self, frag: &Frag) -> Nfa {
        let n = self.moves.len();
        let mut moves: Vec<Vec<(CharRanges, StateId)>> = vec![Vec::new(); n];
        let mut finals = FxHashSet::default();
        for q in 0..n {
            let mut seed = FxHashSet::default();
            seed.insert(q);
            let closure = self.eps_closure(&seed);
            if closure.contains(&frag.end) {
                finals.insert(q);
            }
            for &p in &closure {
                for (label, to) in &self.moves[p] {
                    if let Some(ranges) = label {
                        let entry = (ranges.clone(), *to);
                        if !moves[q].contains(&entry) {
                            moves[q].push(entry);
                        }
                    }
                }
            }
        }
        let mut nfa = Nfa {
            moves,
            initial: frag.start,
            finals,
            sinks: FxHashSet::default(),
        };
        nfa.compute_sinks();
        nfa
    }
}

impl Nfa {
    /// Compile a regex term, failing on shapes the automaton
    /// representation cannot express.
    pub fn compile(tm: &TermManager, re: TermId, cap: usize) -> Result<Nfa> {
        let mut b = Builder::new();
        let frag = b.compile(tm, re, cap)?;
        if b.moves.len() > cap {
            return Err(SeqError::UnsupportedRegex {
                expr: tm.display(re),
            });
        }
        Ok(b.finish(&frag))
    }

    /// Initial state.
    #[must_use]
    pub fn initial(&self) -> StateId {
        self.initial
    }

    /// Number of states.
    #[must_use]
    pub fn num_states(&self) -> usize {
        self.moves.len()
    }

    /// Whether `q` accepts the empty continuation.
    #[must_use]
    pub fn is_final(&self, q: StateId) -> bool {
        self.finals.contains(&q)
    }

    /// Whether no accepting run leaves `q`.
    #[must_use]
    pub fn is_sink(&self, q: StateId) -> bool {
        self.sinks.contains(&q)
    }

    /// Outgoing predicated moves of `q`.
    #[must_use]
    pub fn moves_from(&self, q: StateId) -> &[(CharRanges, StateId)] {
        &self.moves[q]
    }

    /// Whether the language is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.is_sink(self.initial)
    }

    fn compute_sinks(&mut self) {
        // backward reachability from final states
        let mut can_accept: FxHashSet<StateId> = self.finals.clone();
        loop {
            let mut changed = false;
            for q in 0..self.moves.len() {
                if can_accept.contains(&q) {
                    continue;
                }
                if self.moves[q]
                    .iter()
                    .any(|(ranges, to)| !ranges.is_empty() && can_accept.contains(to))
                {
                    can_accept.insert(q);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        self.sinks = (0..self.moves.len())
            .filter(|q| !can_accept.contains(q))
            .collect();
    }

    /// Atomic intervals partitioning the code-point space with respect
    /// to every label of `self` (and optionally `other`).
    fn atomic_intervals(&self, other: Option<&Nfa>) -> Vec<(u32, u32)> {
        let mut points: Vec<u32> = vec![0];
        let mut collect = |nfa: &Nfa| {
            for outs in &nfa.moves {
                for (ranges, _) in outs {
                    for &(lo, hi) in &ranges.0 {
                        points.push(lo);
                        if hi < char::MAX as u32 {
                            points.push(hi + 1);
                        }
                    }
                }
            }
        };
        collect(self);
        if let Some(o) = other {
            collect(o);
        }
        points.sort_unstable();
        points.dedup();
        let mut intervals = Vec::with_capacity(points.len());
        for (i, &p) in points.iter().enumerate() {
            let hi = if i + 1 < points.len() {
                points[i + 1] - 1
            } else {
                char::MAX as u32
            };
            intervals.push((p, hi));
        }
        intervals
    }

    /// Product automaton accepting the intersection.
    #[must_use]
    pub fn product(&self, other: &Nfa, cap: usize) -> Option<Nfa> {
        let intervals = self.atomic_intervals(Some(other));
        let mut index: FxHashMap<(StateId, StateId), StateId> = FxHashMap::default();
        let mut moves: Vec<Vec<(CharRanges, StateId)>> = Vec::new();
        let mut finals = FxHashSet::default();
        let mut queue = VecDeque::new();
        let start = (self.initial, other.initial);
        index.insert(start, 0);
        moves.push(Vec::new());
        queue.push_back(start);
        while let Some((qa, qb)) = queue.pop_front() {
            let qid = index[&(qa, qb)];
            if self.is_final(qa) && other.is_final(qb) {
                finals.insert(qid);
            }
            for &(lo, hi) in &intervals {
                let mut dests: Vec<(StateId, StateId)> = Vec::new();
                for (ra, ta) in &self.moves[qa] {
                    if !ra.contains(lo) {
                        continue;
                    }
                    for (rb, tb) in &other.moves[qb] {
                        if rb.contains(lo) {
                            dests.push((*ta, *tb));
                        }
                    }
                }
                for d in dests {
                    let did = match index.get(&d) {
                        Some(&i) => i,
                        None => {
                            if moves.len() >= cap {
                                return None;
                            }
                            let i = moves.len();
                            index.insert(d, i);
                            moves.push(Vec::new());
                            queue.push_back(d);
                            i
                        }
                    };
                    let label = CharRanges(smallvec::smallvec![(lo, hi)]);
                    let entry = (label, did);
                    if !moves[qid].contains(&entry) {
                        moves[qid].push(entry);
                    }
                }
            }
        }
        let mut nfa = Nfa {
            moves,
            initial: 0,
            finals,
            sinks: FxHashSet::default(),
        };
        nfa.compute_sinks();
        Some(nfa)
    }

    /// Complement via subset construction.
    #[must_use]
    pub fn complement(&self, cap: usize) -> Option<Nfa> {
        let intervals = self.atomic_intervals(None);
        let mut index: FxHashMap<Vec<StateId>, StateId> = FxHashMap::default();
        let mut moves: Vec<Vec<(CharRanges, StateId)>> = Vec::new();
        let mut accepting_subsets: Vec<bool> = Vec::new();
        let mut queue = VecDeque::new();

        let start = vec![self.initial];
        index.insert(start.clone(), 0);
        moves.push(Vec::new());
        accepting_subsets.push(self.is_final(self.initial));
        queue.push_back(start);

        while let Some(set) = queue.pop_front() {
            let qid = index[&set];
            for &(lo, hi) in &intervals {
                let mut next: Vec<StateId> = Vec::new();
                for &q in &set {
                    for (ranges, to) in &self.moves[q] {
                        if ranges.contains(lo) && !next.contains(to) {
                            next.push(*to);
                        }
                    }
                }
                next.sort_unstable();
                let did = match index.get(&next) {
                    Some(&i) => i,
                    None => {
                        if moves.len() >= cap {
                            return None;
                        }
                        let i = moves.len();
                        index.insert(next.clone(), i);
                        moves.push(Vec::new());
                        accepting_subsets.push(next.iter().any(|&q| self.is_final(q)));
                        queue.push_back(next);
                        i
                    }
                };
                moves[qid].push((CharRanges(smallvec::smallvec![(lo, hi)]), did));
            }
        }

        let finals = (0..moves.len())
            .filter(|&i| !accepting_subsets[i])
            .collect();
        let mut nfa = Nfa {
            moves,
            initial: 0,
            finals,
            sinks: FxHashSet::default(),
        };
        nfa.compute_sinks();
        Some(nfa)
    }

    /// Membership test, used by tests and model validation.
    #[must_use]
    pub fn accepts(&self, word: &[u32]) -> bool {
        let mut current: FxHashSet<StateId> = FxHashSet::default();
        current.insert(self.initial);
        for &c in word {
            let mut next = FxHashSet::default();
            for &q in &current {
                for (ranges, to) in &self.moves[q] {
                    if ranges.contains(c) {
                        next.insert(*to);
                    }
                }
            }
            if next.is_empty() {
                return false;
            }
            current = next;
        }
        current.iter().any(|q| self.is_final(*q))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_core::ast::TermManager;

    fn word(s: &str) -> Vec<u32> {
        s.chars().map(|c| c as u32).collect()
    }

    fn re_char(tm: &mut TermManager, c: char) -> TermId {
        tm.mk(TermKind::ReRange(c as u32, c as u32))
    }

    #[test]
    fn test_literal_chain() {
        let mut tm = TermManager::new();
        let s = tm.mk_seq_lit("ab");
        let re = tm.mk(TermKind::ToRe(s));
        let nfa = Nfa::compile(&tm, re, 1000).unwrap();
        assert!(nfa.accepts(&word("ab")));
        assert!(!nfa.accepts(&word("a")));
        assert!(!nfa.accepts(&word("abc")));
    }

    #[test]
    fn test_union_star_concat() {
        let mut tm = TermManager::new();
        // (a|b)*c
        let a = re_char(&mut tm, 'a');
        let b = re_char(&mut tm, 'b');
        let c = re_char(&mut tm, 'c');
        let ab = tm.mk(TermKind::ReUnion(a, b));
        let star = tm.mk(TermKind::ReStar(ab));
        let re = tm.mk(TermKind::ReConcat(star, c));
        let nfa = Nfa::compile(&tm, re, 1000).unwrap();
        assert!(nfa.accepts(&word("c")));
        assert!(nfa.accepts(&word("abbac")));
        assert!(!nfa.accepts(&word("")));
        assert!(!nfa.accepts(&word("ab")));
        assert!(!nfa.accepts(&word("ca")));
    }

    #[test]
    fn test_initial_not_final_when_language_lacks_epsilon() {
        let mut tm = TermManager::new();
        let a = re_char(&mut tm, 'a');
        let star = tm.mk(TermKind::ReStar(a));
        let c = re_char(&mut tm, 'c');
        let re = tm.mk(TermKind::ReConcat(star, c));
        let nfa = Nfa::compile(&tm, re, 1000).unwrap();
        assert!(!nfa.is_final(nfa.initial()));
    }

    #[test]
    fn test_intersection() {
        let mut tm = TermManager::new();
        // a* ∩ (aa) = {aa}
        let a = re_char(&mut tm, 'a');
        let astar = tm.mk(TermKind::ReStar(a));
        let s = tm.mk_seq_lit("aa");
        let aa = tm.mk(TermKind::ToRe(s));
        let re = tm.mk(TermKind::ReInter(astar, aa));
        let nfa = Nfa::compile(&tm, re, 1000).unwrap();
        assert!(nfa.accepts(&word("aa")));
        assert!(!nfa.accepts(&word("a")));
        assert!(!nfa.accepts(&word("aaa")));
    }

    #[test]
    fn test_complement() {
        let mut tm = TermManager::new();
        let s = tm.mk_seq_lit("x");
        let just_x = tm.mk(TermKind::ToRe(s));
        let re = tm.mk(TermKind::ReComp(just_x));
        let nfa = Nfa::compile(&tm, re, 10_000).unwrap();
        assert!(!nfa.accepts(&word("x")));
        assert!(nfa.accepts(&word("")));
        assert!(nfa.accepts(&word("xx")));
        assert!(nfa.accepts(&word("y")));
    }

    #[test]
    fn test_emptiness_by_symmetric_difference() {
        let mut tm = TermManager::new();
        // (a|a) vs a: symmetric difference is empty
        let a1 = re_char(&mut tm, 'a');
        let union = tm.mk(TermKind::ReUnion(a1, a1));
        let comp_a = tm.mk(TermKind::ReComp(a1));
        let comp_u = tm.mk(TermKind::ReComp(union));
        let d1 = tm.mk(TermKind::ReInter(union, comp_a));
        let d2 = tm.mk(TermKind::ReInter(a1, comp_u));
        let diff = tm.mk(TermKind::ReUnion(d1, d2));
        let nfa = Nfa::compile(&tm, diff, 10_000).unwrap();
        assert!(nfa.is_empty());
    }

    #[test]
    fn test_sink_states() {
        let mut tm = TermManager::new();
        let s = tm.mk_seq_lit("ab");
        let re = tm.mk(TermKind::ToRe(s));
        let nfa = Nfa::compile(&tm, re, 1000).unwrap();
        assert!(!nfa.is_sink(nfa.initial()));
        assert!(!nfa.is_empty());
    }

    #[test]
    fn test_none_regex_is_empty() {
        let mut tm = TermManager::new();
        let re = tm.mk(TermKind::ReNone);
        let nfa = Nfa::compile(&tm, re, 1000).unwrap();
        assert!(nfa.is_empty());
        assert!(!nfa.accepts(&word("")));
    }
}
