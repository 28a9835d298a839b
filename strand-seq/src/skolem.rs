//! Skolem Functions of the Sequence Theory.
//!
//! Construction and recognition of the named skolem families. The
//! defining clauses live in the axiom module; this module is the index
//! that lets the solver ask "is this term a `pre`/`post`/`tail`/…?" and
//! take it apart again.
//!
//! Automaton predicates (`accept`, `step`) depend on the automaton that
//! existed when they were created; they are not safe to copy across
//! solver contexts.

use strand_core::ast::{SkolemKind, TermId, TermKind, TermManager};

/// `tail(s, i)`: suffix of `s` starting at position `i + 1`.
pub fn mk_tail(tm: &mut TermManager, s: TermId, i: TermId) -> TermId {
    tm.mk_skolem(SkolemKind::Tail, vec![s, i])
}

/// `tail(s, i)` with a numeric index.
pub fn mk_tail_u(tm: &mut TermManager, s: TermId, i: u32) -> TermId {
    let i = tm.mk_int(i as i64);
    mk_tail(tm, s, i)
}

/// Recognize `tail`.
#[must_use]
pub fn is_tail(tm: &TermManager, t: TermId) -> Option<(TermId, TermId)> {
    match tm.kind(t) {
        TermKind::Skolem(SkolemKind::Tail, args) => Some((args[0], args[1])),
        _ => None,
    }
}

/// `pre(s, i)`: prefix of `s` of length `i`.
pub fn mk_pre(tm: &mut TermManager, s: TermId, i: TermId) -> TermId {
    tm.mk_skolem(SkolemKind::Pre, vec![s, i])
}

/// Recognize `pre`.
#[must_use]
pub fn is_pre(tm: &TermManager, t: TermId) -> Option<(TermId, TermId)> {
    match tm.kind(t) {
        TermKind::Skolem(SkolemKind::Pre, args) => Some((args[0], args[1])),
        _ => None,
    }
}

/// `post(s, i)`: suffix of `s` starting at position `i`.
pub fn mk_post(tm: &mut TermManager, s: TermId, i: TermId) -> TermId {
    tm.mk_skolem(SkolemKind::Post, vec![s, i])
}

/// Recognize `post`.
#[must_use]
pub fn is_post(tm: &TermManager, t: TermId) -> Option<(TermId, TermId)> {
    match tm.kind(t) {
        TermKind::Skolem(SkolemKind::Post, args) => Some((args[0], args[1])),
        _ => None,
    }
}

/// `indexof_left(s, t)`: prefix of `s` before the first match of `t`.
pub fn mk_indexof_left(tm: &mut TermManager, s: TermId, t: TermId) -> TermId {
    tm.mk_skolem(SkolemKind::IndexOfLeft, vec![s, t])
}

/// `indexof_right(s, t)`: suffix of `s` after the first match of `t`.
pub fn mk_indexof_right(tm: &mut TermManager, s: TermId, t: TermId) -> TermId {
    tm.mk_skolem(SkolemKind::IndexOfRight, vec![s, t])
}

/// Recognize `indexof_left`.
#[must_use]
pub fn is_indexof_left(tm: &TermManager, t: TermId) -> Option<(TermId, TermId)> {
    match tm.kind(t) {
        TermKind::Skolem(SkolemKind::IndexOfLeft, args) => Some((args[0], args[1])),
        _ => None,
    }
}

/// Recognize `indexof_right`.
#[must_use]
pub fn is_indexof_right(tm: &TermManager, t: TermId) -> Option<(TermId, TermId)> {
    match tm.kind(t) {
        TermKind::Skolem(SkolemKind::IndexOfRight, args) => Some((args[0], args[1])),
        _ => None,
    }
}

/// `prefix_inv(a, b)`: continuation making `a` a prefix of `b`.
pub fn mk_prefix_inv(tm: &mut TermManager, a: TermId, b: TermId) -> TermId {
    tm.mk_skolem(SkolemKind::PrefixInv, vec![a, b])
}

/// `suffix_inv(a, b)`: prolongation making `a` a suffix of `b`.
pub fn mk_suffix_inv(tm: &mut TermManager, a: TermId, b: TermId) -> TermId {
    tm.mk_skolem(SkolemKind::SuffixInv, vec![a, b])
}

/// `seq_first(s)`: first element of a non-empty `s`.
pub fn mk_seq_first(tm: &mut TermManager, s: TermId) -> TermId {
    tm.mk_skolem(SkolemKind::SeqFirst, vec![s])
}

/// `digit2int(c)`: numeric value of a decimal digit element.
pub fn mk_digit2int(tm: &mut TermManager, c: TermId) -> TermId {
    tm.mk_skolem(SkolemKind::Digit2Int, vec![c])
}

/// Head/tail decomposition of `s`: `(unit(seq_first(s)), tail(s, 0))`.
pub fn decompose(tm: &mut TermManager, s: TermId) -> (TermId, TermId) {
    let first = mk_seq_first(tm, s);
    let head = tm.mk_unit(first);
    let tail = mk_tail_u(tm, s, 0);
    (head, tail)
}

/// `accept(s, i, re, q)`.
pub fn mk_accept(tm: &mut TermManager, s: TermId, i: u32, re: TermId, q: u32) -> TermId {
    let i = tm.mk_int(i as i64);
    let q = tm.mk_int(q as i64);
    tm.mk_skolem(SkolemKind::Accept, vec![s, i, re, q])
}

/// Recognize `accept`, returning `(s, i, re, q)`.
#[must_use]
pub fn is_accept(tm: &TermManager, t: TermId) -> Option<(TermId, u32, TermId, u32)> {
    match tm.kind(t) {
        TermKind::Skolem(SkolemKind::Accept, args) => {
            let i = tm.int_val_i64(args[1])? as u32;
            let q = tm.int_val_i64(args[3])? as u32;
            Some((args[0], i, args[2], q))
        }
        _ => None,
    }
}

/// `step(s, i, re, q, q', guard)`.
pub fn mk_step(
    tm: &mut TermManager,
    s: TermId,
    i: u32,
    re: TermId,
    q: u32,
    q2: u32,
    guard: TermId,
) -> TermId {
    let i = tm.mk_int(i as i64);
    let q = tm.mk_int(q as i64);
    let q2 = tm.mk_int(q2 as i64);
    tm.mk_skolem(SkolemKind::Step, vec![s, i, re, q, q2, guard])
}

/// Recognize `step`, returning `(s, i, re, q, q', guard)`.
#[must_use]
pub fn is_step(tm: &TermManager, t: TermId) -> Option<(TermId, u32, TermId, u32, u32, TermId)> {
    match tm.kind(t) {
        TermKind::Skolem(SkolemKind::Step, args) => {
            let i = tm.int_val_i64(args[1])? as u32;
            let q = tm.int_val_i64(args[3])? as u32;
            let q2 = tm.int_val_i64(args[4])? as u32;
            Some((args[0], i, args[2], q, q2, args[5]))
        }
        _ => None,
    }
}

/// `max_unfolding(d)`: budget literal at unfolding depth `d`.
pub fn mk_max_unfolding(tm: &mut TermManager, d: u32) -> TermId {
    let d = tm.mk_int(d as i64);
    tm.mk_skolem(SkolemKind::MaxUnfolding, vec![d])
}

/// Recognize `max_unfolding`.
#[must_use]
pub fn is_max_unfolding(tm: &TermManager, t: TermId) -> bool {
    matches!(tm.kind(t), TermKind::Skolem(SkolemKind::MaxUnfolding, _))
}

/// `length_limit(s, k)`: budget literal bounding `|s| <= k`.
pub fn mk_length_limit(tm: &mut TermManager, s: TermId, k: u32) -> TermId {
    let k = tm.mk_int(k as i64);
    tm.mk_skolem(SkolemKind::LengthLimit, vec![s, k])
}

/// Recognize `length_limit`, returning `(s, k)`.
#[must_use]
pub fn is_length_limit(tm: &TermManager, t: TermId) -> Option<(TermId, u32)> {
    match tm.kind(t) {
        TermKind::Skolem(SkolemKind::LengthLimit, args) => {
            let k = tm.int_val_i64(args[1])? as u32;
            Some((args[0], k))
        }
        _ => None,
    }
}

/// Whether a term is any skolem application.
#[must_use]
pub fn is_skolem(tm: &TermManager, t: TermId) -> bool {
    matches!(tm.kind(t), TermKind::Skolem(..))
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_core::sort::Sort;

    #[test]
    fn test_roundtrip_recognizers() {
        let mut tm = TermManager::new();
        let s = tm.mk_var("s", Sort::Seq);
        let i = tm.mk_int(3);

        let t = mk_tail(&mut tm, s, i);
        assert_eq!(is_tail(&tm, t), Some((s, i)));
        assert!(is_pre(&tm, t).is_none());
        assert!(is_skolem(&tm, t));

        let p = mk_pre(&mut tm, s, i);
        assert_eq!(is_pre(&tm, p), Some((s, i)));

        let re = tm.mk(TermKind::ReAllChar);
        let acc = mk_accept(&mut tm, s, 2, re, 5);
        assert_eq!(is_accept(&tm, acc), Some((s, 2, re, 5)));

        let guard = tm.mk_bool(true);
        let st = mk_step(&mut tm, s, 1, re, 0, 2, guard);
        assert_eq!(is_step(&tm, st), Some((s, 1, re, 0, 2, guard)));

        let lim = mk_length_limit(&mut tm, s, 8);
        assert_eq!(is_length_limit(&tm, lim), Some((s, 8)));

        let mu = mk_max_unfolding(&mut tm, 2);
        assert!(is_max_unfolding(&tm, mu));
        assert!(!is_max_unfolding(&tm, lim));
    }

    #[test]
    fn test_decompose_shape() {
        let mut tm = TermManager::new();
        let s = tm.mk_var("s", Sort::Seq);
        let (head, tail) = decompose(&mut tm, s);
        assert!(matches!(tm.kind(head), TermKind::Unit(_)));
        assert!(is_tail(&tm, tail).is_some());
        assert_eq!(tm.sort(head), Sort::Seq);
        assert_eq!(tm.sort(tail), Sort::Seq);
    }
}
