//! Axiom Module.
//!
//! Defining clauses for each sequence operator, instantiated lazily
//! when a term becomes relevant. Clauses go through
//! [`SeqSolver::add_axiom`], which drops constant literals and
//! suppresses duplicates.

use crate::skolem;
use crate::theory::SeqSolver;
use strand_core::ast::{CharRanges, TermId, TermKind};
use strand_core::literal::Lit;
use smallvec::smallvec;

impl SeqSolver {
    /// Drain the pending axiom queue.
    pub(crate) fn drain_axioms(&mut self) {
        while let Some(t) = self.axiom_queue.pop_front() {
            self.add_axioms_for(t);
        }
    }

    fn add_axioms_for(&mut self, t: TermId) {
        match self.tm.kind(t).clone() {
            TermKind::Length(s) => self.add_length_axiom(t, s),
            TermKind::IndexOf(s, p, i) => self.add_indexof_axiom(t, s, p, i),
            TermKind::Replace(s, p, r) => self.add_replace_axiom(t, s, p, r),
            TermKind::Extract(s, i, l) => self.add_extract_axiom(t, s, i, l),
            TermKind::At(s, i) => self.add_at_axiom(t, s, i),
            TermKind::Itos(n) => self.add_itos_axiom(t, n),
            TermKind::Stoi(s) => self.add_stoi_axiom(t, s),
            TermKind::StrLt(a, b) => self.add_lt_axiom(t, a, b),
            TermKind::StrLe(a, b) => self.add_le_axiom(t, a, b),
            _ => {}
        }
    }

    /// `|s| >= 0`, `|s| <= 0 -> s = ε`, `s = ε -> |s| <= 0`.
    fn add_length_axiom(&mut self, len: TermId, s: TermId) {
        let zero = self.tm.mk_int(0);
        let nonneg = self.tm.mk_ge(len, zero);
        let nonneg = self.mk_literal(nonneg);
        self.add_axiom(&[nonneg]);

        let le0 = self.tm.mk_le(len, zero);
        let le0 = self.mk_literal(le0);
        let emp = self.tm.mk_empty();
        let is_emp = self.mk_eq_lit(s, emp);
        self.add_axiom(&[!le0, is_emp]);
        self.add_axiom(&[!is_emp, le0]);
    }

    /// First-match decomposition shared by `indexof` and `replace`:
    /// `contains(s, p) -> s = iol ++ p ++ ior`.
    fn contains_split(&mut self, s: TermId, p: TermId) -> (Lit, TermId, TermId) {
        let cnt = self.tm.mk(TermKind::Contains(s, p));
        let cnt = self.mk_literal(cnt);
        let iol = skolem::mk_indexof_left(&mut self.tm, s, p);
        let ior = skolem::mk_indexof_right(&mut self.tm, s, p);
        let mid = self.tm.mk_concat(p, ior);
        let dec = self.tm.mk_concat(iol, mid);
        let dec_eq = self.mk_eq_lit(s, dec);
        self.add_axiom(&[!cnt, dec_eq]);
        (cnt, iol, ior)
    }

    /// `¬contains(s, p) -> t = -1`; on a match, `t = |iol|`.
    fn add_indexof_axiom(&mut self, t: TermId, s: TermId, p: TermId, i: TermId) {
        let minus_one = self.tm.mk_int(-1);
        let at_least = self.tm.mk_ge(t, minus_one);
        let at_least = self.mk_literal(at_least);
        self.add_axiom(&[at_least]);
        if !self.tm.is_zero_int(i) {
            return;
        }
        let (cnt, iol, _ior) = self.contains_split(s, p);
        let none_eq = self.mk_eq_lit(t, minus_one);
        self.add_axiom(&[cnt, none_eq]);
        let len_iol = self.tm.mk_length(iol);
        let pos_eq = self.mk_eq_lit(t, len_iol);
        self.add_axiom(&[!cnt, pos_eq]);
    }

    /// `¬contains(s, p) -> t = s`; on a match the hole is filled with
    /// the replacement.
    fn add_replace_axiom(&mut self, t: TermId, s: TermId, p: TermId, r: TermId) {
        let (cnt, iol, ior) = self.contains_split(s, p);
        let same = self.mk_eq_lit(t, s);
        self.add_axiom(&[cnt, same]);
        let mid = self.tm.mk_concat(r, ior);
        let patched = self.tm.mk_concat(iol, mid);
        let patched_eq = self.mk_eq_lit(t, patched);
        self.add_axiom(&[!cnt, patched_eq]);
    }

    /// `extract(s, i, l)` is empty out of range, and otherwise splits
    /// `s` around the window with the window length pinned down.
    fn add_extract_axiom(&mut self, t: TermId, s: TermId, i: TermId, l: TermId) {
        let empty = self.tm.mk_empty();
        let minus_one = self.tm.mk_int(-1);
        let zero = self.tm.mk_int(0);
        let len_s = self.tm.mk_length(s);

        let i_neg = self.tm.mk_le(i, minus_one);
        let i_neg = self.mk_literal(i_neg);
        let i_big = self.tm.mk_le(len_s, i);
        let i_big = self.mk_literal(i_big);
        let l_le0 = self.tm.mk_le(l, zero);
        let l_le0 = self.mk_literal(l_le0);

        let t_emp = self.mk_eq_lit(t, empty);
        self.add_axiom(&[!i_neg, t_emp]);
        self.add_axiom(&[!i_big, t_emp]);
        self.add_axiom(&[!l_le0, t_emp]);

        let pre = skolem::mk_pre(&mut self.tm, s, i);
        let end = self.tm.mk_add(i, l);
        let post = skolem::mk_post(&mut self.tm, s, end);
        let mid = self.tm.mk_concat(t, post);
        let split = self.tm.mk_concat(pre, mid);
        let split_eq = self.mk_eq_lit(s, split);
        self.add_axiom(&[i_neg, i_big, l_le0, split_eq]);

        let len_pre = self.tm.mk_length(pre);
        let pre_len = self.tm.mk_eq(len_pre, i);
        let pre_len = self.mk_literal(pre_len);
        self.add_axiom(&[i_neg, i_big, l_le0, pre_len]);

        let fits = self.tm.mk_le(end, len_s);
        let fits = self.mk_literal(fits);
        let len_t = self.tm.mk_length(t);
        let full = self.tm.mk_eq(len_t, l);
        let full = self.mk_literal(full);
        self.add_axiom(&[i_neg, i_big, l_le0, !fits, full]);
        let rest = self.tm.mk_sub(len_s, i);
        let clipped = self.tm.mk_eq(len_t, rest);
        let clipped = self.mk_literal(clipped);
        self.add_axiom(&[i_neg, i_big, l_le0, fits, clipped]);
    }

    /// `at(s, i)` is `unit(nth(s, i))` in range and `ε` out of range.
    fn add_at_axiom(&mut self, t: TermId, s: TermId, i: TermId) {
        let empty = self.tm.mk_empty();
        let minus_one = self.tm.mk_int(-1);
        let len_s = self.tm.mk_length(s);

        let i_neg = self.tm.mk_le(i, minus_one);
        let i_neg = self.mk_literal(i_neg);
        let i_big = self.tm.mk_le(len_s, i);
        let i_big = self.mk_literal(i_big);

        let t_emp = self.mk_eq_lit(t, empty);
        self.add_axiom(&[!i_neg, t_emp]);
        self.add_axiom(&[!i_big, t_emp]);

        let nth = self.tm.mk_nth(s, i);
        let unit = self.tm.mk_unit(nth);
        let in_range = self.mk_eq_lit(t, unit);
        self.add_axiom(&[i_neg, i_big, in_range]);
    }

    /// `n < 0 <-> itos(n) = ε`.
    fn add_itos_axiom(&mut self, t: TermId, n: TermId) {
        let minus_one = self.tm.mk_int(-1);
        let neg = self.tm.mk_le(n, minus_one);
        let neg = self.mk_literal(neg);
        let empty = self.tm.mk_empty();
        let emp_eq = self.mk_eq_lit(t, empty);
        self.add_axiom(&[!neg, emp_eq]);
        self.add_axiom(&[neg, !emp_eq]);
    }

    /// `stoi(s) >= -1`.
    fn add_stoi_axiom(&mut self, t: TermId, _s: TermId) {
        let minus_one = self.tm.mk_int(-1);
        let at_least = self.tm.mk_ge(t, minus_one);
        let at_least = self.mk_literal(at_least);
        self.add_axiom(&[at_least]);
    }

    /// `a < b -> a != b` and `a < b -> a <= b`.
    fn add_lt_axiom(&mut self, t: TermId, a: TermId, b: TermId) {
        let lt = self.mk_literal(t);
        let eq = self.mk_eq_lit(a, b);
        self.add_axiom(&[!lt, !eq]);
        let le = self.tm.mk(TermKind::StrLe(a, b));
        let le = self.mk_literal(le);
        self.add_axiom(&[!lt, le]);
    }

    /// Totality: `¬(a <= b) -> b < a`.
    fn add_le_axiom(&mut self, t: TermId, a: TermId, b: TermId) {
        let le = self.mk_literal(t);
        let lt = self.tm.mk(TermKind::StrLt(b, a));
        let lt = self.mk_literal(lt);
        self.add_axiom(&[le, lt]);
    }

    /// Head/tail decomposition of `e`:
    /// `e != ε -> e = unit(seq_first(e)) ++ tail(e, 0)` and
    /// `e != ε -> |e| = 1 + |tail(e, 0)|`.
    pub(crate) fn add_decompose_axiom(&mut self, e: TermId) {
        let emp = self.mk_eq_empty(e, false);
        let (head, tail) = skolem::decompose(&mut self.tm, e);
        let conc = self.tm.mk_concat(head, tail);
        let dec = self.mk_eq_lit(e, conc);
        self.add_axiom(&[emp, dec]);

        let len_e = self.tm.mk_length(e);
        let one = self.tm.mk_int(1);
        let len_tail = self.tm.mk_length(tail);
        let sum = self.tm.mk_add(one, len_tail);
        let len_link = self.tm.mk_eq(len_e, sum);
        let len_link = self.mk_literal(len_link);
        self.add_axiom(&[emp, len_link]);
    }

    /// One unfolding step of a negated contains:
    /// `contains(a, b) ∨ ¬prefix(b, a)` and
    /// `contains(a, b) ∨ ¬contains(tail(a, 0), b)`, with the head/tail
    /// decomposition of `a` alongside.
    pub(crate) fn unroll_not_contains(&mut self, contains: TermId) {
        let TermKind::Contains(a, b) = *self.tm.kind(contains) else {
            return;
        };
        let cnt = self.mk_literal(contains);

        let pre = self.tm.mk(TermKind::Prefix(b, a));
        let pre = self.mk_literal(pre);
        self.add_axiom(&[cnt, !pre]);

        let tail = skolem::mk_tail_u(&mut self.tm, a, 0);
        let rec = self.tm.mk(TermKind::Contains(tail, b));
        let rec = self.mk_literal(rec);
        self.add_axiom(&[cnt, !rec]);

        self.add_decompose_axiom(a);
    }

    /// First-difference scheme for a negated prefix:
    /// `prefix(a, b) ∨ b = ε ∨ seq_first(a) != seq_first(b)
    ///  ∨ ¬prefix(tail(a, 0), tail(b, 0))`.
    pub(crate) fn add_prefix_axiom(&mut self, atom: TermId) {
        let TermKind::Prefix(a, b) = *self.tm.kind(atom) else {
            return;
        };
        let plit = self.mk_literal(atom);

        self.add_decompose_axiom(a);
        self.add_decompose_axiom(b);

        let ha = skolem::mk_seq_first(&mut self.tm, a);
        let hb = skolem::mk_seq_first(&mut self.tm, b);
        let ta = skolem::mk_tail_u(&mut self.tm, a, 0);
        let tb = skolem::mk_tail_u(&mut self.tm, b, 0);

        let b_emp = self.mk_eq_empty(b, false);
        let heads = self.mk_eq_lit(ha, hb);
        let rec = self.tm.mk(TermKind::Prefix(ta, tb));
        let rec = self.mk_literal(rec);
        self.add_axiom(&[plit, b_emp, !heads, !rec]);
    }

    /// Alignment scheme for a negated suffix:
    /// `suffix(a, b) ∨ |a| > |b| ∨ a != post(b, |b| - |a|)`.
    pub(crate) fn add_suffix_axiom(&mut self, atom: TermId) {
        let TermKind::Suffix(a, b) = *self.tm.kind(atom) else {
            return;
        };
        let slit = self.mk_literal(atom);

        let len_a = self.tm.mk_length(a);
        let len_b = self.tm.mk_length(b);
        let fits = self.tm.mk_le(len_a, len_b);
        let fits = self.mk_literal(fits);
        let from = self.tm.mk_sub(len_b, len_a);
        let tail = skolem::mk_post(&mut self.tm, b, from);
        let aligned = self.mk_eq_lit(a, tail);
        self.add_axiom(&[slit, !fits, !aligned]);
    }

    /// Digit constraint for an element of an `itos` image.
    pub(crate) fn mk_is_digit(&mut self, c: TermId) -> Lit {
        let digits = CharRanges(smallvec![('0' as u32, '9' as u32)]);
        let pred = self.tm.mk(TermKind::CharPred(c, digits));
        self.mk_literal(pred)
    }

    /// Record (and bound) the length limit for `s`, emitting
    /// `length_limit(s, k) -> |s| <= k`, and tying it to the current
    /// unfolding assumption when searching.
    pub(crate) fn add_length_limit(&mut self, s: TermId, k: u32, is_searching: bool) {
        if self.tm.ground_word(s).is_some() {
            return;
        }
        if let Some(&k0) = self.length_limit_map.get(&s)
            && k <= k0
        {
            return;
        }
        self.length_limit_map.insert(s, k);
        let lim = skolem::mk_length_limit(&mut self.tm, s, k);
        let lim = self.mk_literal(lim);
        let len_s = self.tm.mk_length(s);
        let bound = self.tm.mk_int(k as i64);
        let le = self.tm.mk_le(len_s, bound);
        let le = self.mk_literal(le);
        self.add_axiom(&[!lim, le]);
        if is_searching && let Some(mu) = self.max_unfolding_lit {
            self.add_axiom(&[!mu, lim]);
        }
    }
}
