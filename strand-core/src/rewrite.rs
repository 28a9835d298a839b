//! Sequence and Arithmetic Rewriting.
//!
//! A context-free simplifier over the term arena: ground folding,
//! neutral-element elimination, and the equation reducer that cancels
//! shared prefixes and suffixes of two concatenations. Results are
//! memoized per term id; the memo is sound for the lifetime of the
//! manager because rewriting never consults search state.

use crate::ast::{SkolemKind, TermId, TermKind, TermManager};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use rustc_hash::FxHashMap;

/// Outcome of reducing an equation between two concatenations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReduceEq {
    /// The two sides can never be equal.
    Unsat,
    /// The two sides are identical after reduction.
    Trivial,
    /// Residual proof obligations. Each pair equates two terms; pairs
    /// over the element sort come from unit decomposition.
    Reduced {
        /// Sub-equations implied by the original equation.
        pairs: Vec<(TermId, TermId)>,
        /// Whether reduction changed anything.
        changed: bool,
    },
}

/// Rewriter with a per-manager memo table.
#[derive(Default)]
pub struct SeqRewriter {
    cache: FxHashMap<TermId, TermId>,
}

impl SeqRewriter {
    /// Create a rewriter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite a term to normal form.
    pub fn simplify(&mut self, tm: &mut TermManager, id: TermId) -> TermId {
        if let Some(&r) = self.cache.get(&id) {
            return r;
        }
        let result = self.simplify_rec(tm, id);
        self.cache.insert(id, result);
        result
    }

    fn simplify_rec(&mut self, tm: &mut TermManager, id: TermId) -> TermId {
        use TermKind::*;
        let kind = tm.kind(id).clone();
        match kind {
            True | False | Var(..) | IntConst(_) | CharConst(_) | Empty | SeqLit(_)
            | ReRange(..) | ReNone | ReAllChar => id,

            Unit(c) => {
                let c = self.simplify(tm, c);
                tm.mk_unit(c)
            }

            Concat(a, b) => {
                let a = self.simplify(tm, a);
                let b = self.simplify(tm, b);
                if let (Some(sa), Some(sb)) = (
                    tm.seq_lit_str(a).map(str::to_owned),
                    tm.seq_lit_str(b).map(str::to_owned),
                ) {
                    return tm.mk_seq_lit(&format!("{sa}{sb}"));
                }
                tm.mk_concat(a, b)
            }

            Length(s) => {
                let s = self.simplify(tm, s);
                if let Some(w) = tm.ground_word(s) {
                    return tm.mk_int(w.len() as i64);
                }
                if let TermKind::Concat(a, b) = *tm.kind(s) {
                    let la = tm.mk_length(a);
                    let lb = tm.mk_length(b);
                    let la = self.simplify(tm, la);
                    let lb = self.simplify(tm, lb);
                    return self.fold_add(tm, la, lb);
                }
                if let TermKind::Unit(_) = tm.kind(s) {
                    return tm.mk_int(1);
                }
                tm.mk_length(s)
            }

            Extract(s, i, l) => {
                let s = self.simplify(tm, s);
                let i = self.simplify(tm, i);
                let l = self.simplify(tm, l);
                if let (Some(w), Some(iv), Some(lv)) =
                    (tm.ground_word(s), tm.int_val_i64(i), tm.int_val_i64(l))
                {
                    let n = w.len() as i64;
                    if iv < 0 || iv >= n || lv <= 0 {
                        return tm.mk_empty();
                    }
                    let end = n.min(iv + lv) as usize;
                    let sub = &w[iv as usize..end];
                    let sub = TermManager::word_to_string(sub);
                    return tm.mk_seq_lit(&sub);
                }
                tm.mk(TermKind::Extract(s, i, l))
            }

            At(s, i) => {
                let s = self.simplify(tm, s);
                let i = self.simplify(tm, i);
                if let (Some(w), Some(iv)) = (tm.ground_word(s), tm.int_val_i64(i)) {
                    if iv < 0 || iv >= w.len() as i64 {
                        return tm.mk_empty();
                    }
                    let c = tm.mk_char(w[iv as usize]);
                    return tm.mk_unit(c);
                }
                tm.mk(TermKind::At(s, i))
            }

            Nth(s, i) => {
                let s = self.simplify(tm, s);
                let i = self.simplify(tm, i);
                if let (Some(w), Some(iv)) = (tm.ground_word(s), tm.int_val_i64(i))
                    && iv >= 0
                    && (iv as usize) < w.len()
                {
                    return tm.mk_char(w[iv as usize]);
                }
                tm.mk_nth(s, i)
            }

            Contains(s, t) => {
                let s = self.simplify(tm, s);
                let t = self.simplify(tm, t);
                if matches!(tm.kind(t), TermKind::Empty) || s == t {
                    return tm.mk_bool(true);
                }
                if let (Some(ws), Some(wt)) = (tm.ground_word(s), tm.ground_word(t)) {
                    return tm.mk_bool(contains_word(&ws, &wt));
                }
                if matches!(tm.kind(s), TermKind::Empty) {
                    let e = tm.mk_empty();
                    let eq = tm.mk_eq(t, e);
                    return self.simplify(tm, eq);
                }
                tm.mk(TermKind::Contains(s, t))
            }

            Prefix(a, b) => {
                let a = self.simplify(tm, a);
                let b = self.simplify(tm, b);
                if matches!(tm.kind(a), TermKind::Empty) || a == b {
                    return tm.mk_bool(true);
                }
                if let (Some(wa), Some(wb)) = (tm.ground_word(a), tm.ground_word(b)) {
                    return tm.mk_bool(wb.starts_with(&wa));
                }
                if matches!(tm.kind(b), TermKind::Empty) {
                    let e = tm.mk_empty();
                    let eq = tm.mk_eq(a, e);
                    return self.simplify(tm, eq);
                }
                tm.mk(TermKind::Prefix(a, b))
            }

            Suffix(a, b) => {
                let a = self.simplify(tm, a);
                let b = self.simplify(tm, b);
                if matches!(tm.kind(a), TermKind::Empty) || a == b {
                    return tm.mk_bool(true);
                }
                if let (Some(wa), Some(wb)) = (tm.ground_word(a), tm.ground_word(b)) {
                    return tm.mk_bool(wb.ends_with(&wa));
                }
                if matches!(tm.kind(b), TermKind::Empty) {
                    let e = tm.mk_empty();
                    let eq = tm.mk_eq(a, e);
                    return self.simplify(tm, eq);
                }
                tm.mk(TermKind::Suffix(a, b))
            }

            IndexOf(s, t, i) => {
                let s = self.simplify(tm, s);
                let t = self.simplify(tm, t);
                let i = self.simplify(tm, i);
                if let (Some(ws), Some(wt), Some(iv)) =
                    (tm.ground_word(s), tm.ground_word(t), tm.int_val_i64(i))
                {
                    return tm.mk_int(indexof_word(&ws, &wt, iv));
                }
                tm.mk(TermKind::IndexOf(s, t, i))
            }

            Replace(s, t, r) => {
                let s = self.simplify(tm, s);
                let t = self.simplify(tm, t);
                let r = self.simplify(tm, r);
                if matches!(tm.kind(t), TermKind::Empty) {
                    return tm.mk_concat(r, s);
                }
                if let (Some(ws), Some(wt), Some(wr)) =
                    (tm.ground_word(s), tm.ground_word(t), tm.ground_word(r))
                {
                    let out = replace_word(&ws, &wt, &wr);
                    let out = TermManager::word_to_string(&out);
                    return tm.mk_seq_lit(&out);
                }
                tm.mk(TermKind::Replace(s, t, r))
            }

            Itos(n) => {
                let n = self.simplify(tm, n);
                if let Some(v) = tm.int_val(n).cloned() {
                    if v.is_negative() {
                        return tm.mk_empty();
                    }
                    return tm.mk_seq_lit(&v.to_string());
                }
                tm.mk(TermKind::Itos(n))
            }

            Stoi(s) => {
                let s = self.simplify(tm, s);
                if let Some(w) = tm.ground_word(s) {
                    return match parse_digits(&w) {
                        Some(v) => tm.mk_int(v),
                        None => tm.mk_int(-1),
                    };
                }
                tm.mk(TermKind::Stoi(s))
            }

            StrLt(a, b) => {
                let a = self.simplify(tm, a);
                let b = self.simplify(tm, b);
                if a == b {
                    return tm.mk_bool(false);
                }
                if let (Some(wa), Some(wb)) = (tm.ground_word(a), tm.ground_word(b)) {
                    return tm.mk_bool(wa < wb);
                }
                tm.mk(TermKind::StrLt(a, b))
            }

            StrLe(a, b) => {
                let a = self.simplify(tm, a);
                let b = self.simplify(tm, b);
                if a == b {
                    return tm.mk_bool(true);
                }
                if let (Some(wa), Some(wb)) = (tm.ground_word(a), tm.ground_word(b)) {
                    return tm.mk_bool(wa <= wb);
                }
                tm.mk(TermKind::StrLe(a, b))
            }

            InRe(s, r) => {
                let s = self.simplify(tm, s);
                let r = self.simplify(tm, r);
                if matches!(tm.kind(r), TermKind::ReNone) {
                    return tm.mk_bool(false);
                }
                if let TermKind::ToRe(w) = *tm.kind(r) {
                    let eq = tm.mk_eq(s, w);
                    return self.simplify(tm, eq);
                }
                tm.mk(TermKind::InRe(s, r))
            }

            ToRe(s) => {
                let s = self.simplify(tm, s);
                tm.mk(TermKind::ToRe(s))
            }

            ReConcat(a, b) => {
                let a = self.simplify(tm, a);
                let b = self.simplify(tm, b);
                if matches!(tm.kind(a), TermKind::ReNone) || matches!(tm.kind(b), TermKind::ReNone)
                {
                    return tm.mk(TermKind::ReNone);
                }
                if is_re_epsilon(tm, a) {
                    return b;
                }
                if is_re_epsilon(tm, b) {
                    return a;
                }
                tm.mk(TermKind::ReConcat(a, b))
            }

            ReUnion(a, b) => {
                let a = self.simplify(tm, a);
                let b = self.simplify(tm, b);
                if a == b || matches!(tm.kind(b), TermKind::ReNone) {
                    return a;
                }
                if matches!(tm.kind(a), TermKind::ReNone) {
                    return b;
                }
                tm.mk(TermKind::ReUnion(a, b))
            }

            ReInter(a, b) => {
                let a = self.simplify(tm, a);
                let b = self.simplify(tm, b);
                if a == b {
                    return a;
                }
                if matches!(tm.kind(a), TermKind::ReNone) || matches!(tm.kind(b), TermKind::ReNone)
                {
                    return tm.mk(TermKind::ReNone);
                }
                tm.mk(TermKind::ReInter(a, b))
            }

            ReStar(r) => {
                let r = self.simplify(tm, r);
                if let TermKind::ReStar(_) = tm.kind(r) {
                    return r;
                }
                tm.mk(TermKind::ReStar(r))
            }

            ReComp(r) => {
                let r = self.simplify(tm, r);
                if let TermKind::ReComp(inner) = *tm.kind(r) {
                    return inner;
                }
                tm.mk(TermKind::ReComp(r))
            }

            Add(a, b) => {
                let a = self.simplify(tm, a);
                let b = self.simplify(tm, b);
                self.fold_add(tm, a, b)
            }

            Sub(a, b) => {
                let a = self.simplify(tm, a);
                let b = self.simplify(tm, b);
                if let (Some(va), Some(vb)) = (tm.int_val(a).cloned(), tm.int_val(b).cloned()) {
                    return tm.mk_int(va - vb);
                }
                if tm.is_zero_int(b) {
                    return a;
                }
                if a == b {
                    return tm.mk_int(0);
                }
                tm.mk_sub(a, b)
            }

            Mul(a, b) => {
                let a = self.simplify(tm, a);
                let b = self.simplify(tm, b);
                if let (Some(va), Some(vb)) = (tm.int_val(a).cloned(), tm.int_val(b).cloned()) {
                    return tm.mk_int(va * vb);
                }
                tm.mk(TermKind::Mul(a, b))
            }

            Le(a, b) => {
                let a = self.simplify(tm, a);
                let b = self.simplify(tm, b);
                if a == b {
                    return tm.mk_bool(true);
                }
                if let (Some(va), Some(vb)) = (tm.int_val(a), tm.int_val(b)) {
                    return tm.mk_bool(va <= vb);
                }
                tm.mk_le(a, b)
            }

            Eq(a, b) => {
                let a = self.simplify(tm, a);
                let b = self.simplify(tm, b);
                self.fold_eq(tm, a, b)
            }

            Ite(c, t, e) => {
                let c = self.simplify(tm, c);
                let t = self.simplify(tm, t);
                let e = self.simplify(tm, e);
                match tm.kind(c) {
                    TermKind::True => t,
                    TermKind::False => e,
                    _ if t == e => t,
                    _ => tm.mk_ite(c, t, e),
                }
            }

            CharPred(el, ranges) => {
                let el = self.simplify(tm, el);
                if let Some(c) = tm.char_val(el) {
                    return tm.mk_bool(ranges.contains(c));
                }
                if ranges.is_empty() {
                    return tm.mk_bool(false);
                }
                tm.mk(TermKind::CharPred(el, ranges))
            }

            Skolem(kind, args) => {
                let args: Vec<TermId> = args.iter().map(|&a| self.simplify(tm, a)).collect();
                self.fold_skolem(tm, kind, args)
            }
        }
    }

    fn fold_add(&mut self, tm: &mut TermManager, a: TermId, b: TermId) -> TermId {
        if let (Some(va), Some(vb)) = (tm.int_val(a).cloned(), tm.int_val(b).cloned()) {
            return tm.mk_int(va + vb);
        }
        if tm.is_zero_int(a) {
            return b;
        }
        if tm.is_zero_int(b) {
            return a;
        }
        tm.mk_add(a, b)
    }

    fn fold_eq(&mut self, tm: &mut TermManager, a: TermId, b: TermId) -> TermId {
        if a == b {
            return tm.mk_bool(true);
        }
        if let (Some(va), Some(vb)) = (tm.int_val(a), tm.int_val(b)) {
            return tm.mk_bool(va == vb);
        }
        if let (Some(ca), Some(cb)) = (tm.char_val(a), tm.char_val(b)) {
            return tm.mk_bool(ca == cb);
        }
        if tm.sort(a).is_seq() {
            if let (Some(wa), Some(wb)) = (tm.ground_word(a), tm.ground_word(b)) {
                return tm.mk_bool(wa == wb);
            }
            // unit(a) = unit(b) decomposes to an element equality
            if let (TermKind::Unit(ca), TermKind::Unit(cb)) = (tm.kind(a).clone(), tm.kind(b).clone())
            {
                let eq = tm.mk_eq(ca, cb);
                return self.simplify(tm, eq);
            }
            // length parity: empty vs certainly-non-empty
            if is_certainly_nonempty(tm, a) && matches!(tm.kind(b), TermKind::Empty) {
                return tm.mk_bool(false);
            }
            if is_certainly_nonempty(tm, b) && matches!(tm.kind(a), TermKind::Empty) {
                return tm.mk_bool(false);
            }
        }
        tm.mk_eq(a, b)
    }

    fn fold_skolem(&mut self, tm: &mut TermManager, kind: SkolemKind, args: Vec<TermId>) -> TermId {
        match kind {
            SkolemKind::Digit2Int => {
                if let Some(c) = tm.char_val(args[0])
                    && (('0' as u32)..=('9' as u32)).contains(&c)
                {
                    return tm.mk_int((c - '0' as u32) as i64);
                }
            }
            SkolemKind::SeqFirst => {
                if let Some(w) = tm.ground_word(args[0])
                    && !w.is_empty()
                {
                    return tm.mk_char(w[0]);
                }
            }
            SkolemKind::Tail => {
                if let (Some(w), Some(i)) = (tm.ground_word(args[0]), tm.int_val_i64(args[1]))
                    && i >= 0
                {
                    let from = ((i + 1) as usize).min(w.len());
                    let s = TermManager::word_to_string(&w[from..]);
                    return tm.mk_seq_lit(&s);
                }
            }
            SkolemKind::Pre => {
                if let (Some(w), Some(i)) = (tm.ground_word(args[0]), tm.int_val_i64(args[1]))
                    && i >= 0
                {
                    let to = (i as usize).min(w.len());
                    let s = TermManager::word_to_string(&w[..to]);
                    return tm.mk_seq_lit(&s);
                }
            }
            SkolemKind::Post => {
                if let (Some(w), Some(i)) = (tm.ground_word(args[0]), tm.int_val_i64(args[1]))
                    && i >= 0
                {
                    let from = (i as usize).min(w.len());
                    let s = TermManager::word_to_string(&w[from..]);
                    return tm.mk_seq_lit(&s);
                }
            }
            _ => {}
        }
        tm.mk_skolem(kind, args)
    }

    /// Reduce an equation between two flattened concatenations.
    ///
    /// Both inputs are leaf lists as produced by
    /// [`TermManager::get_concat_units`] (literals already exploded).
    pub fn reduce_eq(
        &mut self,
        tm: &mut TermManager,
        ls: &[TermId],
        rs: &[TermId],
    ) -> ReduceEq {
        let mut ls: Vec<TermId> = ls.to_vec();
        let mut rs: Vec<TermId> = rs.to_vec();
        let mut pairs: Vec<(TermId, TermId)> = Vec::new();
        let mut changed = false;

        // cancel matching fronts
        loop {
            match (ls.first().copied(), rs.first().copied()) {
                (Some(l), Some(r)) if l == r => {
                    ls.remove(0);
                    rs.remove(0);
                    changed = true;
                }
                (Some(l), Some(r)) => match (tm.kind(l).clone(), tm.kind(r).clone()) {
                    (TermKind::Unit(a), TermKind::Unit(b)) => {
                        if let (Some(ca), Some(cb)) = (tm.char_val(a), tm.char_val(b)) {
                            if ca != cb {
                                return ReduceEq::Unsat;
                            }
                        } else {
                            pairs.push((a, b));
                        }
                        ls.remove(0);
                        rs.remove(0);
                        changed = true;
                    }
                    _ => break,
                },
                _ => break,
            }
        }

        // cancel matching backs
        loop {
            match (ls.last().copied(), rs.last().copied()) {
                (Some(l), Some(r)) if l == r => {
                    ls.pop();
                    rs.pop();
                    changed = true;
                }
                (Some(l), Some(r)) => match (tm.kind(l).clone(), tm.kind(r).clone()) {
                    (TermKind::Unit(a), TermKind::Unit(b)) => {
                        if let (Some(ca), Some(cb)) = (tm.char_val(a), tm.char_val(b)) {
                            if ca != cb {
                                return ReduceEq::Unsat;
                            }
                        } else {
                            pairs.push((a, b));
                        }
                        ls.pop();
                        rs.pop();
                        changed = true;
                    }
                    _ => break,
                },
                _ => break,
            }
        }

        match (ls.is_empty(), rs.is_empty()) {
            (true, true) => {
                if pairs.is_empty() {
                    ReduceEq::Trivial
                } else {
                    ReduceEq::Reduced { pairs, changed }
                }
            }
            (true, false) | (false, true) => {
                let rest = if ls.is_empty() { &rs } else { &ls };
                if rest.iter().any(|&t| is_certainly_nonempty(tm, t)) {
                    return ReduceEq::Unsat;
                }
                let empty = tm.mk_empty();
                for &t in rest.iter() {
                    pairs.push((t, empty));
                }
                ReduceEq::Reduced {
                    pairs,
                    changed: true,
                }
            }
            (false, false) => {
                let l = tm.mk_concat_many(&ls);
                let r = tm.mk_concat_many(&rs);
                if l == r {
                    if pairs.is_empty() {
                        return ReduceEq::Trivial;
                    }
                    return ReduceEq::Reduced { pairs, changed };
                }
                pairs.push((l, r));
                ReduceEq::Reduced { pairs, changed }
            }
        }
    }
}

fn is_re_epsilon(tm: &TermManager, r: TermId) -> bool {
    matches!(tm.kind(r), TermKind::ToRe(s) if matches!(tm.kind(*s), TermKind::Empty))
}

/// Terms whose denotation is non-empty in every model.
fn is_certainly_nonempty(tm: &TermManager, t: TermId) -> bool {
    match tm.kind(t) {
        TermKind::Unit(_) => true,
        TermKind::SeqLit(s) => !s.is_empty(),
        TermKind::Concat(a, b) => is_certainly_nonempty(tm, *a) || is_certainly_nonempty(tm, *b),
        _ => false,
    }
}

fn contains_word(hay: &[u32], needle: &[u32]) -> bool {
    if needle.is_empty() {
        return true;
    }
    hay.windows(needle.len()).any(|w| w == needle)
}

fn indexof_word(hay: &[u32], needle: &[u32], from: i64) -> i64 {
    if from < 0 || from > hay.len() as i64 {
        return -1;
    }
    let from = from as usize;
    if needle.is_empty() {
        return from as i64;
    }
    if from + needle.len() > hay.len() {
        return -1;
    }
    hay[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map_or(-1, |p| (from + p) as i64)
}

fn replace_word(hay: &[u32], needle: &[u32], repl: &[u32]) -> Vec<u32> {
    match indexof_word(hay, needle, 0) {
        -1 => hay.to_vec(),
        p => {
            let p = p as usize;
            let mut out = hay[..p].to_vec();
            out.extend_from_slice(repl);
            out.extend_from_slice(&hay[p + needle.len()..]);
            out
        }
    }
}

fn parse_digits(w: &[u32]) -> Option<BigInt> {
    if w.is_empty() {
        return None;
    }
    let mut out = BigInt::zero();
    for &c in w {
        if !(('0' as u32)..=('9' as u32)).contains(&c) {
            return None;
        }
        out = out * 10 + (c - '0' as u32);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::Sort;

    fn setup() -> (TermManager, SeqRewriter) {
        (TermManager::new(), SeqRewriter::new())
    }

    #[test]
    fn test_length_folding() {
        let (mut tm, mut rw) = setup();
        let lit = tm.mk_seq_lit("abc");
        let len = tm.mk_length(lit);
        let r = rw.simplify(&mut tm, len);
        assert_eq!(tm.int_val_i64(r), Some(3));
    }

    #[test]
    fn test_length_of_concat_is_sum() {
        let (mut tm, mut rw) = setup();
        let x = tm.mk_var("x", Sort::Seq);
        let lit = tm.mk_seq_lit("ab");
        let cat = tm.mk_concat(x, lit);
        let len = tm.mk_length(cat);
        let r = rw.simplify(&mut tm, len);
        let lx = tm.mk_length(x);
        let two = tm.mk_int(2);
        assert_eq!(r, tm.mk_add(lx, two));
    }

    #[test]
    fn test_extract_bounds() {
        let (mut tm, mut rw) = setup();
        let s = tm.mk_seq_lit("hello");
        let i = tm.mk_int(-1);
        let l = tm.mk_int(2);
        let e = tm.mk(TermKind::Extract(s, i, l));
        let r = rw.simplify(&mut tm, e);
        assert!(matches!(tm.kind(r), TermKind::Empty));

        let i = tm.mk_int(1);
        let l = tm.mk_int(3);
        let e = tm.mk(TermKind::Extract(s, i, l));
        let r = rw.simplify(&mut tm, e);
        assert_eq!(tm.seq_lit_str(r), Some("ell"));
    }

    #[test]
    fn test_itos_stoi() {
        let (mut tm, mut rw) = setup();
        let n = tm.mk_int(42);
        let t = tm.mk(TermKind::Itos(n));
        let r = rw.simplify(&mut tm, t);
        assert_eq!(tm.seq_lit_str(r), Some("42"));

        let neg = tm.mk_int(-3);
        let t = tm.mk(TermKind::Itos(neg));
        let r = rw.simplify(&mut tm, t);
        assert!(matches!(tm.kind(r), TermKind::Empty));

        let s = tm.mk_seq_lit("042");
        let t = tm.mk(TermKind::Stoi(s));
        let r = rw.simplify(&mut tm, t);
        assert_eq!(tm.int_val_i64(r), Some(42));

        let s = tm.mk_seq_lit("4a");
        let t = tm.mk(TermKind::Stoi(s));
        let r = rw.simplify(&mut tm, t);
        assert_eq!(tm.int_val_i64(r), Some(-1));
    }

    #[test]
    fn test_reduce_eq_cancels_suffix() {
        let (mut tm, mut rw) = setup();
        // x ++ "ab" = "cab"  reduces to  x = "c"
        let x = tm.mk_var("x", Sort::Seq);
        let lhs_lit = tm.mk_seq_lit("ab");
        let lhs = tm.mk_concat(x, lhs_lit);
        let rhs = tm.mk_seq_lit("cab");

        let mut ls = Vec::new();
        let mut rs = Vec::new();
        tm.get_concat_units(lhs, &mut ls);
        tm.get_concat_units(rhs, &mut rs);

        match rw.reduce_eq(&mut tm, &ls, &rs) {
            ReduceEq::Reduced { pairs, changed } => {
                assert!(changed);
                assert_eq!(pairs.len(), 1);
                let (l, r) = pairs[0];
                assert_eq!(l, x);
                let c = tm.mk_char('c' as u32);
                assert_eq!(r, tm.mk_unit(c));
            }
            other => panic!("unexpected reduction: {other:?}"),
        }
    }

    #[test]
    fn test_reduce_eq_contradiction() {
        let (mut tm, mut rw) = setup();
        let a = tm.mk_seq_lit("ab");
        let b = tm.mk_seq_lit("ac");
        let mut ls = Vec::new();
        let mut rs = Vec::new();
        tm.get_concat_units(a, &mut ls);
        tm.get_concat_units(b, &mut rs);
        assert_eq!(rw.reduce_eq(&mut tm, &ls, &rs), ReduceEq::Unsat);
    }

    #[test]
    fn test_reduce_eq_empty_side() {
        let (mut tm, mut rw) = setup();
        let x = tm.mk_var("x", Sort::Seq);
        let y = tm.mk_var("y", Sort::Seq);
        let ls = vec![x, y];
        let rs = vec![];
        match rw.reduce_eq(&mut tm, &ls, &rs) {
            ReduceEq::Reduced { pairs, .. } => {
                assert_eq!(pairs.len(), 2);
                let e = tm.mk_empty();
                assert_eq!(pairs[0], (x, e));
                assert_eq!(pairs[1], (y, e));
            }
            other => panic!("unexpected reduction: {other:?}"),
        }

        let c = tm.mk_char('a' as u32);
        let u = tm.mk_unit(c);
        let ls = vec![x, u];
        assert_eq!(rw.reduce_eq(&mut tm, &ls, &[]), ReduceEq::Unsat);
    }

    #[test]
    fn test_unit_eq_decomposes() {
        let (mut tm, mut rw) = setup();
        let a = tm.mk_var("a", Sort::Char);
        let b = tm.mk_var("b", Sort::Char);
        let ua = tm.mk_unit(a);
        let ub = tm.mk_unit(b);
        let eq = tm.mk_eq(ua, ub);
        let r = rw.simplify(&mut tm, eq);
        assert_eq!(r, tm.mk_eq(a, b));
    }

    #[test]
    fn test_ite_selection() {
        let (mut tm, mut rw) = setup();
        let c = tm.mk_bool(true);
        let x = tm.mk_var("x", Sort::Seq);
        let y = tm.mk_var("y", Sort::Seq);
        let ite = tm.mk_ite(c, x, y);
        assert_eq!(rw.simplify(&mut tm, ite), x);
    }

    #[test]
    fn test_digit2int() {
        let (mut tm, mut rw) = setup();
        let c = tm.mk_char('7' as u32);
        let d = tm.mk_skolem(SkolemKind::Digit2Int, vec![c]);
        let r = rw.simplify(&mut tm, d);
        assert_eq!(tm.int_val_i64(r), Some(7));
    }
}
