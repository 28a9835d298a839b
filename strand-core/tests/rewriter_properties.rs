//! Property-based tests for the sequence rewriter.
//!
//! Ground terms must fold to the value the operation denotes, and the
//! equation reducer must be decisive on ground words.

use num_bigint::BigInt;
use proptest::prelude::*;
use strand_core::ast::{TermKind, TermManager};
use strand_core::rewrite::{ReduceEq, SeqRewriter};

fn word_strategy() -> impl Strategy<Value = String> {
    "[abc]{0,6}"
}

proptest! {
    /// |s ++ t| folds to |s| + |t| on ground words.
    #[test]
    fn length_of_concat_folds(s in word_strategy(), t in word_strategy()) {
        let mut tm = TermManager::new();
        let mut rw = SeqRewriter::new();
        let a = tm.mk_seq_lit(&s);
        let b = tm.mk_seq_lit(&t);
        let cat = tm.mk_concat(a, b);
        let len = tm.mk_length(cat);
        let r = rw.simplify(&mut tm, len);
        prop_assert_eq!(tm.int_val_i64(r), Some((s.len() + t.len()) as i64));
    }

    /// extract agrees with slicing, with the out-of-range edges empty.
    #[test]
    fn extract_matches_slicing(
        s in word_strategy(),
        i in -2i64..8,
        l in -2i64..8,
    ) {
        let mut tm = TermManager::new();
        let mut rw = SeqRewriter::new();
        let base = tm.mk_seq_lit(&s);
        let it = tm.mk_int(i);
        let lt = tm.mk_int(l);
        let e = tm.mk(TermKind::Extract(base, it, lt));
        let r = rw.simplify(&mut tm, e);

        let n = s.chars().count() as i64;
        let expected: String = if i < 0 || i >= n || l <= 0 {
            String::new()
        } else {
            s.chars().skip(i as usize).take(l as usize).collect()
        };
        let got = tm.ground_word(r).expect("ground result");
        prop_assert_eq!(TermManager::word_to_string(&got), expected);
    }

    /// stoi(itos(n)) folds back to n for non-negative n.
    #[test]
    fn stoi_itos_roundtrip(n in 0i64..100_000) {
        let mut tm = TermManager::new();
        let mut rw = SeqRewriter::new();
        let nt = tm.mk_int(n);
        let itos = tm.mk(TermKind::Itos(nt));
        let stoi = tm.mk(TermKind::Stoi(itos));
        let r = rw.simplify(&mut tm, stoi);
        prop_assert_eq!(tm.int_val(r), Some(&BigInt::from(n)));
    }

    /// On ground words the reducer is decisive: identical words reduce
    /// to the trivial equation, different words to a contradiction.
    #[test]
    fn reduce_eq_decides_ground(l in word_strategy(), r in word_strategy()) {
        let mut tm = TermManager::new();
        let mut rw = SeqRewriter::new();
        let lt = tm.mk_seq_lit(&l);
        let rt = tm.mk_seq_lit(&r);
        let mut ls = Vec::new();
        let mut rs = Vec::new();
        tm.get_concat_units(lt, &mut ls);
        tm.get_concat_units(rt, &mut rs);
        match rw.reduce_eq(&mut tm, &ls, &rs) {
            ReduceEq::Trivial => prop_assert_eq!(l, r),
            ReduceEq::Unsat => prop_assert_ne!(l, r),
            other => prop_assert!(false, "not decisive on ground words: {:?}", other),
        }
    }

    /// Lexicographic folding agrees with the standard order.
    #[test]
    fn str_lt_matches_ord(l in word_strategy(), r in word_strategy()) {
        let mut tm = TermManager::new();
        let mut rw = SeqRewriter::new();
        let lt = tm.mk_seq_lit(&l);
        let rt = tm.mk_seq_lit(&r);
        let cmp = tm.mk(TermKind::StrLt(lt, rt));
        let res = rw.simplify(&mut tm, cmp);
        let expected = l < r;
        prop_assert_eq!(matches!(tm.kind(res), TermKind::True), expected);
    }
}
