//! End-to-end tests for the sequence decision procedure.
//!
//! These exercise the full DPLL(T) loop: equation solving through the
//! solution map, length reasoning against the arithmetic view, negated
//! containment unfolding, regular membership through the automaton
//! engine, int-string bridging, and extensionality.

use strand_core::ast::{TermId, TermKind};
use strand_core::sort::Sort;
use strand_seq::automaton::Nfa;
use strand_seq::{SeqSolver, SolveResult};

fn expect_sat(result: SolveResult) -> strand_seq::Model {
    match result {
        SolveResult::Sat(model) => model,
        other => panic!("expected sat, got {other:?}"),
    }
}

fn expect_unsat(result: SolveResult) {
    assert!(
        matches!(result, SolveResult::Unsat),
        "expected unsat, got {result:?}"
    );
}

fn re_char(solver: &mut SeqSolver, c: char) -> TermId {
    solver.tm().mk(TermKind::ReRange(c as u32, c as u32))
}

// ============================================================================
// Test 1: Basic word equation solving
// ============================================================================

#[test]
fn test_basic_solve() {
    let mut solver = SeqSolver::default();
    // x ++ "ab" = "cab"
    let x = solver.tm().mk_var("x", Sort::Seq);
    let ab = solver.tm().mk_seq_lit("ab");
    let lhs = solver.tm().mk_concat(x, ab);
    let rhs = solver.tm().mk_seq_lit("cab");
    let eq = solver.tm().mk_eq(lhs, rhs);
    solver.assert_formula(eq, true);

    let model = expect_sat(solver.check().expect("check"));
    assert_eq!(model.get_seq(x), Some("c"));
}

#[test]
fn test_conflicting_constants() {
    let mut solver = SeqSolver::default();
    let x = solver.tm().mk_var("x", Sort::Seq);
    let a = solver.tm().mk_seq_lit("a");
    let b = solver.tm().mk_seq_lit("b");
    let eq_a = solver.tm().mk_eq(x, a);
    let eq_b = solver.tm().mk_eq(x, b);
    solver.assert_formula(eq_a, true);
    solver.assert_formula(eq_b, true);

    expect_unsat(solver.check().expect("check"));
}

// ============================================================================
// Test 2: Length contradiction
// ============================================================================

#[test]
fn test_length_contradiction() {
    let mut solver = SeqSolver::default();
    // |x| = 3 and x = "ab"
    let x = solver.tm().mk_var("x", Sort::Seq);
    let len_x = solver.tm().mk_length(x);
    let three = solver.tm().mk_int(3);
    let len_eq = solver.tm().mk_eq(len_x, three);
    solver.assert_formula(len_eq, true);

    let ab = solver.tm().mk_seq_lit("ab");
    let val_eq = solver.tm().mk_eq(x, ab);
    solver.assert_formula(val_eq, true);

    expect_unsat(solver.check().expect("check"));
}

#[test]
fn test_length_consistent() {
    let mut solver = SeqSolver::default();
    let x = solver.tm().mk_var("x", Sort::Seq);
    let len_x = solver.tm().mk_length(x);
    let two = solver.tm().mk_int(2);
    let len_eq = solver.tm().mk_eq(len_x, two);
    solver.assert_formula(len_eq, true);

    let ab = solver.tm().mk_seq_lit("ab");
    let val_eq = solver.tm().mk_eq(x, ab);
    solver.assert_formula(val_eq, true);

    let model = expect_sat(solver.check().expect("check"));
    assert_eq!(model.get_seq(x), Some("ab"));
}

// ============================================================================
// Test 3: Negated containment
// ============================================================================

#[test]
fn test_not_contains() {
    let mut solver = SeqSolver::default();
    // not contains("abab", x), |x| = 2, x != "ab", x != "ba"
    let x = solver.tm().mk_var("x", Sort::Seq);
    let hay = solver.tm().mk_seq_lit("abab");
    let cont = solver.tm().mk(TermKind::Contains(hay, x));
    solver.assert_formula(cont, false);

    let len_x = solver.tm().mk_length(x);
    let two = solver.tm().mk_int(2);
    let len_eq = solver.tm().mk_eq(len_x, two);
    solver.assert_formula(len_eq, true);

    let ab = solver.tm().mk_seq_lit("ab");
    let eq_ab = solver.tm().mk_eq(x, ab);
    solver.assert_formula(eq_ab, false);
    let ba = solver.tm().mk_seq_lit("ba");
    let eq_ba = solver.tm().mk_eq(x, ba);
    solver.assert_formula(eq_ba, false);

    let model = expect_sat(solver.check().expect("check"));
    let value = model.get_seq(x).expect("x has a value");
    assert_eq!(value.chars().count(), 2);
    assert_ne!(value, "ab");
    assert_ne!(value, "ba");
    assert!(!"abab".contains(value));
}

#[test]
fn test_not_contains_shorter_needle_unsat() {
    let mut solver = SeqSolver::default();
    // not contains("ab", x) with x = "b" is false
    let x = solver.tm().mk_var("x", Sort::Seq);
    let hay = solver.tm().mk_seq_lit("ab");
    let cont = solver.tm().mk(TermKind::Contains(hay, x));
    solver.assert_formula(cont, false);
    let b = solver.tm().mk_seq_lit("b");
    let eq = solver.tm().mk_eq(x, b);
    solver.assert_formula(eq, true);

    expect_unsat(solver.check().expect("check"));
}

// ============================================================================
// Test 4: Regular membership against length bounds
// ============================================================================

#[test]
fn test_regex_membership_empty_word_unsat() {
    let mut solver = SeqSolver::default();
    // x in (a|b)*c and |x| = 0
    let x = solver.tm().mk_var("x", Sort::Seq);
    let a = re_char(&mut solver, 'a');
    let b = re_char(&mut solver, 'b');
    let c = re_char(&mut solver, 'c');
    let ab = solver.tm().mk(TermKind::ReUnion(a, b));
    let star = solver.tm().mk(TermKind::ReStar(ab));
    let re = solver.tm().mk(TermKind::ReConcat(star, c));
    let member = solver.tm().mk(TermKind::InRe(x, re));
    solver.assert_formula(member, true);

    let len_x = solver.tm().mk_length(x);
    let zero = solver.tm().mk_int(0);
    let len_eq = solver.tm().mk_eq(len_x, zero);
    solver.assert_formula(len_eq, true);

    expect_unsat(solver.check().expect("check"));
}

#[test]
fn test_regex_membership_single_char() {
    let mut solver = SeqSolver::default();
    // x in (a|b)*c and |x| = 1 forces x = "c"
    let x = solver.tm().mk_var("x", Sort::Seq);
    let a = re_char(&mut solver, 'a');
    let b = re_char(&mut solver, 'b');
    let c = re_char(&mut solver, 'c');
    let ab = solver.tm().mk(TermKind::ReUnion(a, b));
    let star = solver.tm().mk(TermKind::ReStar(ab));
    let re = solver.tm().mk(TermKind::ReConcat(star, c));
    let member = solver.tm().mk(TermKind::InRe(x, re));
    solver.assert_formula(member, true);

    let len_x = solver.tm().mk_length(x);
    let one = solver.tm().mk_int(1);
    let len_eq = solver.tm().mk_eq(len_x, one);
    solver.assert_formula(len_eq, true);

    let model = expect_sat(solver.check().expect("check"));
    let value = model.get_seq(x).expect("x has a value");
    let nfa = Nfa::compile(solver.tm(), re, 10_000).expect("compiles");
    let word: Vec<u32> = value.chars().map(|ch| ch as u32).collect();
    assert!(nfa.accepts(&word), "model {value:?} must match the regex");
    assert_eq!(value, "c");
}

// ============================================================================
// Test 5: Int-string conversion
// ============================================================================

#[test]
fn test_itos_with_leading_zero_sat() {
    let mut solver = SeqSolver::default();
    // itos(n) = "042" and n >= 0
    let n = solver.tm().mk_var("n", Sort::Int);
    let itos = solver.tm().mk(TermKind::Itos(n));
    let target = solver.tm().mk_seq_lit("042");
    let eq = solver.tm().mk_eq(itos, target);
    solver.assert_formula(eq, true);

    let zero = solver.tm().mk_int(0);
    let nonneg = solver.tm().mk_ge(n, zero);
    solver.assert_formula(nonneg, true);

    let model = expect_sat(solver.check().expect("check"));
    assert_eq!(model.get_int(n), Some(&num_bigint::BigInt::from(42)));
}

#[test]
fn test_itos_negative_unsat() {
    let mut solver = SeqSolver::default();
    // itos(n) = "042" and n < 0
    let n = solver.tm().mk_var("n", Sort::Int);
    let itos = solver.tm().mk(TermKind::Itos(n));
    let target = solver.tm().mk_seq_lit("042");
    let eq = solver.tm().mk_eq(itos, target);
    solver.assert_formula(eq, true);

    let minus_one = solver.tm().mk_int(-1);
    let neg = solver.tm().mk_le(n, minus_one);
    solver.assert_formula(neg, true);

    expect_unsat(solver.check().expect("check"));
}

#[test]
fn test_itos_empty_forces_negative() {
    let mut solver = SeqSolver::default();
    // itos(n) = "" and n >= 0
    let n = solver.tm().mk_var("n", Sort::Int);
    let itos = solver.tm().mk(TermKind::Itos(n));
    let empty = solver.tm().mk_empty();
    let eq = solver.tm().mk_eq(itos, empty);
    solver.assert_formula(eq, true);
    let zero = solver.tm().mk_int(0);
    let nonneg = solver.tm().mk_ge(n, zero);
    solver.assert_formula(nonneg, true);

    expect_unsat(solver.check().expect("check"));
}

// ============================================================================
// Test 6: Extensionality
// ============================================================================

#[test]
fn test_extensionality_equates_pointwise_equal() {
    let mut solver = SeqSolver::default();
    // |x| = 2, |y| = 2, nth(x,0) = nth(y,0), nth(x,1) = nth(y,1)
    let x = solver.tm().mk_var("x", Sort::Seq);
    let y = solver.tm().mk_var("y", Sort::Seq);
    let two = solver.tm().mk_int(2);
    let len_x = solver.tm().mk_length(x);
    let len_y = solver.tm().mk_length(y);
    let lx = solver.tm().mk_eq(len_x, two);
    let ly = solver.tm().mk_eq(len_y, two);
    solver.assert_formula(lx, true);
    solver.assert_formula(ly, true);

    for i in 0..2 {
        let idx = solver.tm().mk_int(i);
        let nx = solver.tm().mk_nth(x, idx);
        let ny = solver.tm().mk_nth(y, idx);
        let eq = solver.tm().mk_eq(nx, ny);
        solver.assert_formula(eq, true);
    }

    let model = expect_sat(solver.check().expect("check"));
    let vx = model.get_seq(x).expect("x has a value").to_string();
    let vy = model.get_seq(y).expect("y has a value").to_string();
    assert_eq!(vx.chars().count(), 2);
    assert_eq!(vx, vy);
}

// ============================================================================
// Positive predicate decompositions
// ============================================================================

#[test]
fn test_prefix_with_length() {
    let mut solver = SeqSolver::default();
    // prefixof("ab", x) and |x| = 3
    let x = solver.tm().mk_var("x", Sort::Seq);
    let ab = solver.tm().mk_seq_lit("ab");
    let pre = solver.tm().mk(TermKind::Prefix(ab, x));
    solver.assert_formula(pre, true);

    let len_x = solver.tm().mk_length(x);
    let three = solver.tm().mk_int(3);
    let len_eq = solver.tm().mk_eq(len_x, three);
    solver.assert_formula(len_eq, true);

    let model = expect_sat(solver.check().expect("check"));
    let value = model.get_seq(x).expect("x has a value");
    assert_eq!(value.chars().count(), 3);
    assert!(value.starts_with("ab"));
}

#[test]
fn test_contains_with_length() {
    let mut solver = SeqSolver::default();
    // contains("abc", x) and |x| = 2
    let x = solver.tm().mk_var("x", Sort::Seq);
    let abc = solver.tm().mk_seq_lit("abc");
    let cont = solver.tm().mk(TermKind::Contains(abc, x));
    solver.assert_formula(cont, true);

    let len_x = solver.tm().mk_length(x);
    let two = solver.tm().mk_int(2);
    let len_eq = solver.tm().mk_eq(len_x, two);
    solver.assert_formula(len_eq, true);

    let model = expect_sat(solver.check().expect("check"));
    let value = model.get_seq(x).expect("x has a value");
    assert_eq!(value.chars().count(), 2);
    assert!("abc".contains(value));
}

// ============================================================================
// Lexicographic ordering
// ============================================================================

#[test]
fn test_lex_cycle_unsat() {
    let mut solver = SeqSolver::default();
    // x < y and y < x
    let x = solver.tm().mk_var("x", Sort::Seq);
    let y = solver.tm().mk_var("y", Sort::Seq);
    let xy = solver.tm().mk(TermKind::StrLt(x, y));
    let yx = solver.tm().mk(TermKind::StrLt(y, x));
    solver.assert_formula(xy, true);
    solver.assert_formula(yx, true);

    expect_unsat(solver.check().expect("check"));
}

#[test]
fn test_lex_ground_folds() {
    let mut solver = SeqSolver::default();
    let a = solver.tm().mk_seq_lit("abc");
    let b = solver.tm().mk_seq_lit("abd");
    let lt = solver.tm().mk(TermKind::StrLt(a, b));
    solver.assert_formula(lt, true);
    expect_sat(solver.check().expect("check"));
}

// ============================================================================
// Ground operator folding through assertions
// ============================================================================

#[test]
fn test_ground_indexof() {
    let mut solver = SeqSolver::default();
    let n = solver.tm().mk_var("n", Sort::Int);
    let s = solver.tm().mk_seq_lit("abc");
    let p = solver.tm().mk_seq_lit("b");
    let zero = solver.tm().mk_int(0);
    let idx = solver.tm().mk(TermKind::IndexOf(s, p, zero));
    let eq = solver.tm().mk_eq(n, idx);
    solver.assert_formula(eq, true);

    let model = expect_sat(solver.check().expect("check"));
    assert_eq!(model.get_int(n), Some(&num_bigint::BigInt::from(1)));
}

#[test]
fn test_ground_extract() {
    let mut solver = SeqSolver::default();
    let x = solver.tm().mk_var("x", Sort::Seq);
    let s = solver.tm().mk_seq_lit("hello");
    let one = solver.tm().mk_int(1);
    let three = solver.tm().mk_int(3);
    let sub = solver.tm().mk(TermKind::Extract(s, one, three));
    let eq = solver.tm().mk_eq(x, sub);
    solver.assert_formula(eq, true);

    let model = expect_sat(solver.check().expect("check"));
    assert_eq!(model.get_seq(x), Some("ell"));
}

// ============================================================================
// Disequality splitting
// ============================================================================

#[test]
fn test_diseq_with_fixed_length() {
    let mut solver = SeqSolver::default();
    // |x| = 1 and x != "a"
    let x = solver.tm().mk_var("x", Sort::Seq);
    let len_x = solver.tm().mk_length(x);
    let one = solver.tm().mk_int(1);
    let len_eq = solver.tm().mk_eq(len_x, one);
    solver.assert_formula(len_eq, true);
    let a = solver.tm().mk_seq_lit("a");
    let eq_a = solver.tm().mk_eq(x, a);
    solver.assert_formula(eq_a, false);

    let model = expect_sat(solver.check().expect("check"));
    let value = model.get_seq(x).expect("x has a value");
    assert_eq!(value.chars().count(), 1);
    assert_ne!(value, "a");
}

// ============================================================================
// Error paths
// ============================================================================

#[test]
fn test_unsupported_regex_errors() {
    let mut solver = SeqSolver::default();
    // (to_re y)* over a non-ground sequence has no automaton
    let x = solver.tm().mk_var("x", Sort::Seq);
    let y = solver.tm().mk_var("y", Sort::Seq);
    let lit_y = solver.tm().mk(TermKind::ToRe(y));
    let re = solver.tm().mk(TermKind::ReStar(lit_y));
    let member = solver.tm().mk(TermKind::InRe(x, re));
    solver.assert_formula(member, true);

    let err = solver.check().expect_err("must fail to compile");
    assert!(matches!(
        err,
        strand_core::error::SeqError::UnsupportedRegex { .. }
    ));
}

#[test]
fn test_incompatible_arith_mode_errors() {
    let params = strand_core::config::SeqParams {
        arith_mode: strand_core::config::ArithMode::External,
        ..Default::default()
    };
    let mut solver = SeqSolver::new(params);
    let x = solver.tm().mk_var("x", Sort::Seq);
    let empty = solver.tm().mk_empty();
    let eq = solver.tm().mk_eq(x, empty);
    solver.assert_formula(eq, true);

    let err = solver.check().expect_err("must reject the engine");
    assert!(matches!(
        err,
        strand_core::error::SeqError::IncompatibleArithTheory
    ));
}

#[test]
fn test_diseq_empty_unsat() {
    let mut solver = SeqSolver::default();
    // |x| = 0 and x != ""
    let x = solver.tm().mk_var("x", Sort::Seq);
    let len_x = solver.tm().mk_length(x);
    let zero = solver.tm().mk_int(0);
    let len_eq = solver.tm().mk_eq(len_x, zero);
    solver.assert_formula(len_eq, true);
    let empty = solver.tm().mk_empty();
    let eq_e = solver.tm().mk_eq(x, empty);
    solver.assert_formula(eq_e, false);

    expect_unsat(solver.check().expect("check"));
}
