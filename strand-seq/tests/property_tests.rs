//! Property-based tests for the theory core: canonizer idempotence,
//! solution-map restoration on pop, and automaton acceptance against a
//! reference matcher.

use proptest::prelude::*;
use strand_core::ast::{TermKind, TermManager};
use strand_core::sort::Sort;
use strand_seq::automaton::Nfa;
use strand_seq::dependency::Dep;
use strand_seq::solution::SolutionMap;
use strand_seq::{SeqSolver, SolveResult};

proptest! {
    /// Canonize is idempotent: re-canonizing a normal form is a no-op.
    #[test]
    fn canonize_idempotent(word in "[ab]{0,4}") {
        let mut solver = SeqSolver::default();
        let x = solver.tm().mk_var("x", Sort::Seq);
        let w = solver.tm().mk_seq_lit(&word);
        let eq = solver.tm().mk_eq(x, w);
        solver.assert_formula(eq, true);
        let result = solver.check().expect("check");
        prop_assert!(matches!(result, SolveResult::Sat(_)));

        let (c1, _) = solver.canonize(x).expect("canonize");
        let (c2, _) = solver.canonize(c1).expect("canonize");
        prop_assert_eq!(c1, c2);
    }

    /// Popping a scope restores every overwritten solution entry.
    #[test]
    fn solution_map_pop_restores(
        base in proptest::collection::vec(0u32..16, 0..8),
        scoped in proptest::collection::vec(0u32..16, 0..8),
    ) {
        let mut rep = SolutionMap::new();
        for &i in &base {
            rep.update(
                strand_core::ast::TermId::new(i),
                strand_core::ast::TermId::new(i + 100),
                Dep::NIL,
            );
        }
        let before: Vec<_> = (0..16)
            .map(|i| rep.find_plain(strand_core::ast::TermId::new(i)))
            .collect();

        rep.push_scope();
        for &i in &scoped {
            rep.update(
                strand_core::ast::TermId::new(i),
                strand_core::ast::TermId::new(i + 200),
                Dep::NIL,
            );
        }
        rep.pop_scope(1);

        let after: Vec<_> = (0..16)
            .map(|i| rep.find_plain(strand_core::ast::TermId::new(i)))
            .collect();
        prop_assert_eq!(before, after);
    }

    /// The compiled automaton for (a|b)*c agrees with the obvious
    /// predicate.
    #[test]
    fn automaton_matches_reference(word in "[abc]{0,6}") {
        let mut tm = TermManager::new();
        let a = tm.mk(TermKind::ReRange('a' as u32, 'a' as u32));
        let b = tm.mk(TermKind::ReRange('b' as u32, 'b' as u32));
        let c = tm.mk(TermKind::ReRange('c' as u32, 'c' as u32));
        let ab = tm.mk(TermKind::ReUnion(a, b));
        let star = tm.mk(TermKind::ReStar(ab));
        let re = tm.mk(TermKind::ReConcat(star, c));
        let nfa = Nfa::compile(&tm, re, 1000).expect("compiles");

        let expected = !word.is_empty()
            && word.ends_with('c')
            && word[..word.len() - 1].chars().all(|ch| ch == 'a' || ch == 'b');
        let w: Vec<u32> = word.chars().map(|ch| ch as u32).collect();
        prop_assert_eq!(nfa.accepts(&w), expected);
    }
}
