//! Length Coherence and the Int-String Bridge.
//!
//! Every tracked sequence term gets a corresponding length term, and
//! lengths are kept consistent with content: a term that canonizes to a
//! ground word propagates its concrete length, bounded variables are
//! decomposed into elements plus a bounded tail, and `itos`/`stoi`
//! terms keep a length on the string side.

use crate::skolem;
use crate::theory::SeqSolver;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use strand_core::ast::{TermId, TermKind};
use strand_core::literal::{LBool, Lit};
use strand_core::sort::Sort;

impl SeqSolver {
    /// Ensure every member of the equivalence class of `e` has a
    /// registered length term.
    pub(crate) fn add_length_to_eqc(&mut self, e: TermId) -> bool {
        let mut change = false;
        for m in self.eg.class_members(e) {
            if self.tm.sort(m) == Sort::Seq
                && self.tm.ground_word(m).is_none()
                && !self.has_length.contains(&m)
            {
                self.register_length(m);
                change = true;
            }
        }
        change
    }

    /// Each tracked `itos(n)` / `stoi(s)` keeps a length term on the
    /// string side.
    pub(crate) fn check_int_string(&mut self) -> bool {
        let mut change = false;
        for i in 0..self.int_string.len() {
            let e = self.int_string[i];
            match *self.tm.kind(e) {
                TermKind::Itos(n) => {
                    if !matches!(self.tm.kind(n), TermKind::Stoi(_)) && self.add_length_to_eqc(e) {
                        change = true;
                    }
                }
                TermKind::Stoi(s) => {
                    if !matches!(self.tm.kind(s), TermKind::Itos(_)) && self.add_length_to_eqc(s) {
                        change = true;
                    }
                }
                _ => {}
            }
        }
        change
    }

    /// For any length term whose bounds coincide at `n` over an unfixed
    /// variable, force the variable into its element chain.
    pub(crate) fn fixed_length(&mut self, is_zero: bool) -> bool {
        let mut found = false;
        for i in 0..self.length_terms.len() {
            let lt = self.length_terms[i];
            if self.fixed_length_term(lt, is_zero) {
                found = true;
            }
        }
        found
    }

    fn fixed_length_term(&mut self, lt: TermId, is_zero: bool) -> bool {
        let TermKind::Length(e) = *self.tm.kind(lt) else {
            return false;
        };
        if !self.tm.is_seq_var(e) || self.is_internal_skolem(e) || self.fixed.contains(&e) {
            return false;
        }
        let Some((lo, _)) = self.lower_bound(lt) else {
            return false;
        };
        let Some((hi, _)) = self.upper_bound(lt) else {
            return false;
        };
        if lo != hi || lo.is_negative() {
            return false;
        }
        if is_zero && !lo.is_zero() {
            return false;
        }
        let Some(n) = lo.to_usize() else {
            return false;
        };
        self.fixed.insert(e);

        let seq = if n == 0 {
            self.tm.mk_empty()
        } else {
            let mut parts = Vec::with_capacity(n);
            for j in 0..n {
                let idx = self.tm.mk_int(j as i64);
                let nth = self.tm.mk_nth(e, idx);
                parts.push(self.tm.mk_unit(nth));
            }
            self.tm.mk_concat_many(&parts)
        };
        let val = self.tm.mk_int(lo);
        let a = self.tm.mk_eq(lt, val);
        let a = self.mk_literal(a);
        let b = self.mk_eq_lit(seq, e);
        self.add_axiom(&[!a, b])
    }

    /// For every active length bound `lo <= |e| <= hi` over an unfixed
    /// plain variable, decompose `e` into `lo` elements plus a tail,
    /// with the tail forced empty at the lower bound and bounded by
    /// `hi - lo` at the upper one. Also propagates concrete lengths of
    /// terms whose canonization grounded out.
    pub(crate) fn check_length_coherence(&mut self) -> bool {
        let mut progress = false;
        for i in 0..self.length_terms.len() {
            let lt = self.length_terms[i];
            let TermKind::Length(e) = *self.tm.kind(lt) else {
                continue;
            };
            // content bridge: a solved term knows its length
            match self.canonize(e) {
                Some((c, dep)) => {
                    if let Some(w) = self.tm.ground_word(c) {
                        let n = self.tm.mk_int(w.len() as i64);
                        let eq = self.tm.mk_eq(lt, n);
                        let lit = self.mk_literal(eq);
                        if self.sat.value(lit) != LBool::True {
                            self.propagate_lit(dep, &[], lit);
                            progress = true;
                        }
                        continue;
                    }
                }
                None => {
                    progress = true;
                    continue;
                }
            }
            if self.decompose_by_bounds(lt, e) {
                progress = true;
            }
        }
        progress
    }

    fn decompose_by_bounds(&mut self, lt: TermId, e: TermId) -> bool {
        if !self.tm.is_seq_var(e)
            || skolem::is_skolem(&self.tm, e)
            || self.fixed.contains(&e)
        {
            return false;
        }
        let Some((lo, _)) = self.lower_bound2(lt) else {
            return false;
        };
        if lo.is_negative() {
            return false;
        }
        let hi = self.upper_bound(lt).map(|(v, _)| v);
        if hi.as_ref() == Some(&lo) {
            // exact bounds are the fixed-length rule's business
            return false;
        }
        let Some(n) = lo.to_usize() else {
            return false;
        };
        if n == 0 && hi.is_none() {
            return false;
        }
        let mut progress = false;

        let lo_term = self.tm.mk_int(lo.clone());
        let from = self.tm.mk_int(n as i64);
        let tail = skolem::mk_post(&mut self.tm, e, from);

        if n > 0 {
            let mut parts = Vec::with_capacity(n + 1);
            for j in 0..n {
                let idx = self.tm.mk_int(j as i64);
                let nth = self.tm.mk_nth(e, idx);
                parts.push(self.tm.mk_unit(nth));
            }
            parts.push(tail);
            let conc = self.tm.mk_concat_many(&parts);
            let ge = self.tm.mk_ge(lt, lo_term);
            let ge = self.mk_literal(ge);
            let split = self.mk_eq_lit(e, conc);
            if self.add_axiom(&[!ge, split]) {
                progress = true;
            }
        }

        let le_lo = self.tm.mk_le(lt, lo_term);
        let le_lo = self.mk_literal(le_lo);
        let empty = self.tm.mk_empty();
        let tail_emp = self.mk_eq_lit(tail, empty);
        if self.add_axiom(&[!le_lo, tail_emp]) {
            progress = true;
        }

        if let Some(hi) = hi
            && hi > lo
        {
            let hi_term = self.tm.mk_int(hi.clone());
            let le_hi = self.tm.mk_le(lt, hi_term);
            let le_hi = self.mk_literal(le_hi);
            let len_tail = self.mk_len(tail);
            let slack = self.tm.mk_int(hi - lo);
            let tail_bound = self.tm.mk_le(len_tail, slack);
            let tail_bound = self.mk_literal(tail_bound);
            if self.add_axiom(&[!le_hi, tail_bound]) {
                progress = true;
            }
        }
        progress
    }

    /// Symbolic length of `e` with the guard literals under which it is
    /// valid, when the guards are currently asserted.
    pub(crate) fn get_length(&mut self, e: TermId) -> Option<(TermId, Vec<Lit>)> {
        let minus_one_lit = |s: &mut Self| s.tm.mk_int(-1);
        match self.tm.kind(e).clone() {
            TermKind::Unit(_) => {
                let one = self.tm.mk_int(1);
                Some((one, Vec::new()))
            }
            TermKind::Extract(s, i, l) => {
                // valid when 0 <= i, i < |s|, 0 < l, i + l <= |s|
                let len_s = self.tm.mk_length(s);
                let m1 = minus_one_lit(self);
                let i_neg = self.tm.mk_le(i, m1);
                let i_neg = self.mk_literal(i_neg);
                let i_big = self.tm.mk_le(len_s, i);
                let i_big = self.mk_literal(i_big);
                let zero = self.tm.mk_int(0);
                let l_pos = self.tm.mk_le(l, zero);
                let l_pos = self.mk_literal(l_pos);
                let end = self.tm.mk_add(i, l);
                let fits = self.tm.mk_le(end, len_s);
                let fits = self.mk_literal(fits);
                if self.sat.value(i_neg) == LBool::False
                    && self.sat.value(i_big) == LBool::False
                    && self.sat.value(l_pos) == LBool::False
                    && self.sat.value(fits) == LBool::True
                {
                    Some((l, vec![!i_neg, !i_big, !l_pos, fits]))
                } else {
                    None
                }
            }
            TermKind::At(s, i) => {
                let len_s = self.tm.mk_length(s);
                let m1 = minus_one_lit(self);
                let i_neg = self.tm.mk_le(i, m1);
                let i_neg = self.mk_literal(i_neg);
                let i_big = self.tm.mk_le(len_s, i);
                let i_big = self.mk_literal(i_big);
                if self.sat.value(i_neg) == LBool::False && self.sat.value(i_big) == LBool::False {
                    let one = self.tm.mk_int(1);
                    Some((one, vec![!i_neg, !i_big]))
                } else {
                    None
                }
            }
            TermKind::Skolem(kind, args) => match kind {
                strand_core::ast::SkolemKind::Pre => {
                    let (s, i) = (args[0], args[1]);
                    let len_s = self.tm.mk_length(s);
                    let m1 = minus_one_lit(self);
                    let i_neg = self.tm.mk_le(i, m1);
                    let i_neg = self.mk_literal(i_neg);
                    let i_big = self.tm.mk_le(len_s, i);
                    let i_big = self.mk_literal(i_big);
                    if self.sat.value(i_neg) == LBool::False
                        && self.sat.value(i_big) == LBool::False
                    {
                        Some((i, vec![!i_neg, !i_big]))
                    } else {
                        None
                    }
                }
                strand_core::ast::SkolemKind::Post => {
                    let (s, i) = (args[0], args[1]);
                    let len_s = self.tm.mk_length(s);
                    let m1 = minus_one_lit(self);
                    let i_neg = self.tm.mk_le(i, m1);
                    let i_neg = self.mk_literal(i_neg);
                    let fits = self.tm.mk_le(i, len_s);
                    let fits = self.mk_literal(fits);
                    if self.sat.value(i_neg) == LBool::False && self.sat.value(fits) == LBool::True
                    {
                        let diff = self.tm.mk_sub(len_s, i);
                        let diff = self.rw.simplify(&mut self.tm, diff);
                        Some((diff, vec![!i_neg, fits]))
                    } else {
                        None
                    }
                }
                strand_core::ast::SkolemKind::Tail => {
                    let (s, i) = (args[0], args[1]);
                    // |s| > i  =>  |tail(s, i)| = |s| - i - 1
                    // |s| <= i =>  |tail(s, i)| = 0
                    let len_s = self.tm.mk_length(s);
                    let within = self.tm.mk_le(len_s, i);
                    let within = self.mk_literal(within);
                    match self.sat.value(within) {
                        LBool::False => {
                            let one = self.tm.mk_int(1);
                            let drop = self.tm.mk_add(i, one);
                            let diff = self.tm.mk_sub(len_s, drop);
                            let diff = self.rw.simplify(&mut self.tm, diff);
                            Some((diff, vec![!within]))
                        }
                        LBool::True => {
                            let zero = self.tm.mk_int(0);
                            Some((zero, vec![within]))
                        }
                        LBool::Undef => None,
                    }
                }
                _ => None,
            },
            _ => {
                if let Some(w) = self.tm.ground_word(e) {
                    let n = self.tm.mk_int(w.len() as i64);
                    return Some((n, Vec::new()));
                }
                None
            }
        }
    }

    /// Concrete length of a concatenation when every piece has one.
    pub(crate) fn get_length_value(&mut self, e: TermId) -> Option<BigInt> {
        let mut total = BigInt::zero();
        let mut todo = vec![e];
        while let Some(c) = todo.pop() {
            match self.tm.kind(c).clone() {
                TermKind::Concat(a, b) => {
                    todo.push(a);
                    todo.push(b);
                }
                TermKind::Unit(_) => total += 1,
                TermKind::Empty => {}
                TermKind::SeqLit(s) => total += s.chars().count(),
                _ => {
                    let len = self.tm.mk_length(c);
                    let (v, _) = self.get_num_value(len)?;
                    if v.is_negative() {
                        return None;
                    }
                    total += v;
                }
            }
        }
        Some(total)
    }
}
