//! Arithmetic Bookkeeping View.
//!
//! The theory consumes integer bounds on length terms through
//! `get_lower` / `get_upper` / `get_value`. This view derives those
//! bounds from the ground comparisons the search asserts: direct bounds
//! `t <= c` / `c <= t`, exact values, offset equalities `t = u + k`
//! (typical of decomposition axioms), and structural sums. Bounds are
//! reported as rationals; consumers insist on integrality before use.
//!
//! Every stored fact carries the literals justifying it, so conflicts
//! and propagations cite exactly the assumptions they rely on.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::One;
use rustc_hash::{FxHashMap, FxHashSet};
use strand_core::ast::{TermId, TermKind, TermManager};
use strand_core::literal::Lit;

type Justified = (BigInt, Vec<Lit>);

#[derive(Debug)]
enum Undo {
    SetLo(TermId, Option<Justified>),
    SetHi(TermId, Option<Justified>),
    PushOffset,
    PushDiseq,
}

#[derive(Debug, Clone)]
struct OffsetEdge {
    /// `a = b + k`
    a: TermId,
    b: TermId,
    k: BigInt,
    lits: Vec<Lit>,
}

/// Scoped bounds bookkeeping over integer terms.
#[derive(Default)]
pub struct ArithView {
    lo: FxHashMap<TermId, Justified>,
    hi: FxHashMap<TermId, Justified>,
    offsets: Vec<OffsetEdge>,
    diseqs: Vec<(TermId, TermId, Lit)>,
    trail: Vec<Undo>,
    lims: Vec<usize>,
}

fn negate_into(clause: &mut Vec<Lit>, lits: &[Lit]) {
    for &l in lits {
        let n = !l;
        if !clause.contains(&n) {
            clause.push(n);
        }
    }
}

impl ArithView {
    /// Create an empty view.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp the current state.
    pub fn push_scope(&mut self) {
        self.lims.push(self.trail.len());
    }

    /// Replay inverses back to the stamp.
    pub fn pop_scope(&mut self, num_scopes: usize) {
        if num_scopes == 0 {
            return;
        }
        let target = self.lims[self.lims.len() - num_scopes];
        self.lims.truncate(self.lims.len() - num_scopes);
        while self.trail.len() > target {
            match self.trail.pop().expect("trail entry") {
                Undo::SetLo(t, old) => match old {
                    Some(j) => {
                        self.lo.insert(t, j);
                    }
                    None => {
                        self.lo.remove(&t);
                    }
                },
                Undo::SetHi(t, old) => match old {
                    Some(j) => {
                        self.hi.insert(t, j);
                    }
                    None => {
                        self.hi.remove(&t);
                    }
                },
                Undo::PushOffset => {
                    self.offsets.pop();
                }
                Undo::PushDiseq => {
                    self.diseqs.pop();
                }
            }
        }
    }

    fn set_lo(&mut self, tm: &TermManager, t: TermId, v: BigInt, lits: Vec<Lit>) -> Result<(), Vec<Lit>> {
        if let Some((hv, hlits)) = self.upper(tm, t)
            && hv < v
        {
            let mut clause = Vec::new();
            negate_into(&mut clause, &lits);
            negate_into(&mut clause, &hlits);
            return Err(clause);
        }
        if let Some((lv, _)) = self.lo.get(&t)
            && *lv >= v
        {
            return Ok(());
        }
        let old = self.lo.insert(t, (v, lits));
        self.trail.push(Undo::SetLo(t, old));
        Ok(())
    }

    fn set_hi(&mut self, tm: &TermManager, t: TermId, v: BigInt, lits: Vec<Lit>) -> Result<(), Vec<Lit>> {
        if let Some((lv, llits)) = self.lower(tm, t)
            && lv > v
        {
            let mut clause = Vec::new();
            negate_into(&mut clause, &lits);
            negate_into(&mut clause, &llits);
            return Err(clause);
        }
        if let Some((hv, _)) = self.hi.get(&t)
            && *hv <= v
        {
            return Ok(());
        }
        let old = self.hi.insert(t, (v, lits));
        self.trail.push(Undo::SetHi(t, old));
        Ok(())
    }

    fn split_offset(tm: &TermManager, t: TermId) -> (TermId, BigInt) {
        match tm.kind(t) {
            TermKind::Add(a, b) => {
                if let Some(k) = tm.int_val(*a) {
                    return (*b, k.clone());
                }
                if let Some(k) = tm.int_val(*b) {
                    return (*a, k.clone());
                }
                (t, BigInt::from(0))
            }
            TermKind::Sub(a, b) => {
                if let Some(k) = tm.int_val(*b) {
                    return (*a, -k.clone());
                }
                (t, BigInt::from(0))
            }
            _ => (t, BigInt::from(0)),
        }
    }

    /// Digest an asserted comparison or integer equality.
    ///
    /// `lit` is the literal carrying the assignment (`atom` when
    /// `is_true`, its negation otherwise). On an immediate clash with
    /// recorded bounds, returns a conflict clause (all literals false).
    pub fn assert_atom(
        &mut self,
        tm: &TermManager,
        lit: Lit,
        atom: TermId,
        is_true: bool,
    ) -> Result<(), Vec<Lit>> {
        match *tm.kind(atom) {
            TermKind::Le(a, b) => {
                if is_true {
                    self.assert_le(tm, lit, a, b)
                } else {
                    // a > b, integrally: b + 1 <= a
                    self.assert_gt(tm, lit, a, b)
                }
            }
            TermKind::Eq(a, b) => {
                if tm.sort(a) != strand_core::sort::Sort::Int {
                    return Ok(());
                }
                if is_true {
                    self.assert_int_eq(tm, lit, a, b)
                } else {
                    self.diseqs.push((a, b, lit));
                    self.trail.push(Undo::PushDiseq);
                    self.bump_on_diseq(tm, lit, a, b)?;
                    self.bump_on_diseq(tm, lit, b, a)?;
                    self.check_diseq(tm, a, b, lit)
                }
            }
            _ => Ok(()),
        }
    }

    fn assert_le(&mut self, tm: &TermManager, lit: Lit, a: TermId, b: TermId) -> Result<(), Vec<Lit>> {
        let va = self.value(tm, a);
        let vb = self.value(tm, b);
        match (va, vb) {
            (Some((va, la)), Some((vb, lb))) => {
                if va > vb {
                    let mut clause = vec![!lit];
                    negate_into(&mut clause, &la);
                    negate_into(&mut clause, &lb);
                    return Err(clause);
                }
                Ok(())
            }
            (None, Some((vb, lb))) => {
                let mut lits = vec![lit];
                lits.extend(lb);
                self.bound_above(tm, a, vb, lits)
            }
            (Some((va, la)), None) => {
                let mut lits = vec![lit];
                lits.extend(la);
                self.bound_below(tm, b, va, lits)
            }
            (None, None) => Ok(()),
        }
    }

    fn assert_gt(&mut self, tm: &TermManager, lit: Lit, a: TermId, b: TermId) -> Result<(), Vec<Lit>> {
        // ¬(a <= b): a >= b + 1
        let va = self.value(tm, a);
        let vb = self.value(tm, b);
        match (va, vb) {
            (Some((va, la)), Some((vb, lb))) => {
                if va <= vb {
                    let mut clause = vec![!lit];
                    negate_into(&mut clause, &la);
                    negate_into(&mut clause, &lb);
                    return Err(clause);
                }
                Ok(())
            }
            (None, Some((vb, lb))) => {
                let mut lits = vec![lit];
                lits.extend(lb);
                self.bound_below(tm, a, vb + BigInt::one(), lits)
            }
            (Some((va, la)), None) => {
                let mut lits = vec![lit];
                lits.extend(la);
                self.bound_above(tm, b, va - BigInt::one(), lits)
            }
            (None, None) => Ok(()),
        }
    }

    /// `t <= v`: store on `t` and push through a difference shape.
    fn bound_above(&mut self, tm: &TermManager, t: TermId, v: BigInt, lits: Vec<Lit>) -> Result<(), Vec<Lit>> {
        if let TermKind::Sub(x, y) = *tm.kind(t) {
            // x - y <= v
            if let Some((vy, ly)) = self.value(tm, y) {
                let mut l2 = lits.clone();
                l2.extend(ly);
                self.set_hi(tm, x, v.clone() + vy, l2)?;
            } else if let Some((vx, lx)) = self.value(tm, x) {
                let mut l2 = lits.clone();
                l2.extend(lx);
                self.set_lo(tm, y, vx - v.clone(), l2)?;
            }
        }
        self.set_hi(tm, t, v, lits)
    }

    /// `t >= v`.
    fn bound_below(&mut self, tm: &TermManager, t: TermId, v: BigInt, lits: Vec<Lit>) -> Result<(), Vec<Lit>> {
        if let TermKind::Sub(x, y) = *tm.kind(t) {
            // x - y >= v
            if let Some((vy, ly)) = self.value(tm, y) {
                let mut l2 = lits.clone();
                l2.extend(ly);
                self.set_lo(tm, x, v.clone() + vy, l2)?;
            } else if let Some((vx, lx)) = self.value(tm, x) {
                let mut l2 = lits.clone();
                l2.extend(lx);
                self.set_hi(tm, y, vx - v.clone(), l2)?;
            }
        }
        self.set_lo(tm, t, v, lits)
    }

    fn assert_int_eq(&mut self, tm: &TermManager, lit: Lit, a: TermId, b: TermId) -> Result<(), Vec<Lit>> {
        let (base_a, ka) = Self::split_offset(tm, a);
        let (base_b, kb) = Self::split_offset(tm, b);
        // base_a + ka = base_b + kb
        self.offsets.push(OffsetEdge {
            a: base_a,
            b: base_b,
            k: kb - ka,
            lits: vec![lit],
        });
        self.trail.push(Undo::PushOffset);
        // exact values flow both ways immediately when one side is known
        if let Some((v, l)) = self.value(tm, a) {
            let mut lits2 = vec![lit];
            lits2.extend(l);
            if self.value(tm, b).is_none() {
                self.set_lo(tm, b, v.clone(), lits2.clone())?;
                self.set_hi(tm, b, v, lits2)?;
            }
        } else if let Some((v, l)) = self.value(tm, b) {
            let mut lits2 = vec![lit];
            lits2.extend(l);
            self.set_lo(tm, a, v.clone(), lits2.clone())?;
            self.set_hi(tm, a, v, lits2)?;
        }
        // both known: clash check
        if let (Some((va, la)), Some((vb, lb))) = (self.value(tm, a), self.value(tm, b))
            && va != vb
        {
            let mut clause = vec![!lit];
            negate_into(&mut clause, &la);
            negate_into(&mut clause, &lb);
            return Err(clause);
        }
        Ok(())
    }

    /// `t != other` with `other` at a known value sitting exactly on a
    /// bound of `t`: tighten the bound past the refused value.
    fn bump_on_diseq(
        &mut self,
        tm: &TermManager,
        lit: Lit,
        t: TermId,
        other: TermId,
    ) -> Result<(), Vec<Lit>> {
        let Some((v, vlits)) = self.value(tm, other) else {
            return Ok(());
        };
        if self.value(tm, t).is_some() {
            // a known value is the disequality check's business
            return Ok(());
        }
        if let Some((lo, lolits)) = self.lower(tm, t)
            && lo == v
        {
            let mut lits = vec![lit];
            lits.extend(vlits.iter().copied());
            lits.extend(lolits);
            self.set_lo(tm, t, v.clone() + BigInt::one(), lits)?;
        }
        if let Some((hi, hilits)) = self.upper(tm, t)
            && hi == v
        {
            let mut lits = vec![lit];
            lits.extend(vlits);
            lits.extend(hilits);
            self.set_hi(tm, t, v - BigInt::one(), lits)?;
        }
        Ok(())
    }

    fn check_diseq(&self, tm: &TermManager, a: TermId, b: TermId, lit: Lit) -> Result<(), Vec<Lit>> {
        if let (Some((va, la)), Some((vb, lb))) = (self.value(tm, a), self.value(tm, b))
            && va == vb
        {
            let mut clause = vec![lit];
            negate_into(&mut clause, &la);
            negate_into(&mut clause, &lb);
            return Err(clause);
        }
        Ok(())
    }

    /// Re-examine recorded integer disequalities against current values.
    pub fn recheck_diseqs(&self, tm: &TermManager) -> Result<(), Vec<Lit>> {
        for &(a, b, lit) in &self.diseqs {
            self.check_diseq(tm, a, b, lit)?;
        }
        Ok(())
    }

    /// Exact integer value of `t`, with its justification.
    #[must_use]
    pub fn value(&self, tm: &TermManager, t: TermId) -> Option<Justified> {
        let mut visited = FxHashSet::default();
        self.value_rec(tm, t, &mut visited)
    }

    fn value_rec(
        &self,
        tm: &TermManager,
        t: TermId,
        visited: &mut FxHashSet<TermId>,
    ) -> Option<Justified> {
        if let Some(v) = tm.ground_int(t) {
            return Some((v, Vec::new()));
        }
        if !visited.insert(t) {
            return None;
        }
        if let (Some((lv, llits)), Some((hv, hlits))) = (self.lo.get(&t), self.hi.get(&t))
            && lv == hv
        {
            let mut lits = llits.clone();
            lits.extend(hlits.iter().copied());
            return Some((lv.clone(), lits));
        }
        // offset edges: t = u + k or u = t + k
        for e in &self.offsets {
            let (other, k) = if e.a == t {
                (e.b, e.k.clone())
            } else if e.b == t {
                (e.a, -e.k.clone())
            } else {
                continue;
            };
            if let Some((v, mut lits)) = self.value_rec(tm, other, visited) {
                lits.extend(e.lits.iter().copied());
                return Some((v + k, lits));
            }
        }
        // structural
        match *tm.kind(t) {
            TermKind::Add(a, b) => {
                let (va, la) = self.value_rec(tm, a, visited)?;
                let (vb, lb) = self.value_rec(tm, b, visited)?;
                let mut lits = la;
                lits.extend(lb);
                Some((va + vb, lits))
            }
            TermKind::Sub(a, b) => {
                let (va, la) = self.value_rec(tm, a, visited)?;
                let (vb, lb) = self.value_rec(tm, b, visited)?;
                let mut lits = la;
                lits.extend(lb);
                Some((va - vb, lits))
            }
            TermKind::Mul(a, b) => {
                let (va, la) = self.value_rec(tm, a, visited)?;
                let (vb, lb) = self.value_rec(tm, b, visited)?;
                let mut lits = la;
                lits.extend(lb);
                Some((va * vb, lits))
            }
            _ => None,
        }
    }

    /// Greatest known lower bound of `t`.
    #[must_use]
    pub fn lower(&self, tm: &TermManager, t: TermId) -> Option<Justified> {
        if let Some(v) = self.value(tm, t) {
            return Some(v);
        }
        let mut best: Option<Justified> = None;
        if let Some((v, lits)) = self.lo.get(&t) {
            best = Some((v.clone(), lits.clone()));
        }
        for e in &self.offsets {
            let (other, k) = if e.a == t {
                (e.b, e.k.clone())
            } else if e.b == t {
                (e.a, -e.k.clone())
            } else {
                continue;
            };
            if let Some((v, lits)) = self.lo.get(&other) {
                let cand = v.clone() + k;
                if best.as_ref().is_none_or(|(b, _)| cand > *b) {
                    let mut l = lits.clone();
                    l.extend(e.lits.iter().copied());
                    best = Some((cand, l));
                }
            }
        }
        best
    }

    /// Least known upper bound of `t`.
    #[must_use]
    pub fn upper(&self, tm: &TermManager, t: TermId) -> Option<Justified> {
        if let Some(v) = self.value(tm, t) {
            return Some(v);
        }
        let mut best: Option<Justified> = None;
        if let Some((v, lits)) = self.hi.get(&t) {
            best = Some((v.clone(), lits.clone()));
        }
        for e in &self.offsets {
            let (other, k) = if e.a == t {
                (e.b, e.k.clone())
            } else if e.b == t {
                (e.a, -e.k.clone())
            } else {
                continue;
            };
            if let Some((v, lits)) = self.hi.get(&other) {
                let cand = v.clone() + k;
                if best.as_ref().is_none_or(|(b, _)| cand < *b) {
                    let mut l = lits.clone();
                    l.extend(e.lits.iter().copied());
                    best = Some((cand, l));
                }
            }
        }
        best
    }

    /// Rational lower bound, per the external arithmetic interface.
    #[must_use]
    pub fn get_lower(&self, tm: &TermManager, t: TermId) -> Option<(BigRational, Vec<Lit>)> {
        self.lower(tm, t)
            .map(|(v, lits)| (BigRational::from_integer(v), lits))
    }

    /// Rational upper bound, per the external arithmetic interface.
    #[must_use]
    pub fn get_upper(&self, tm: &TermManager, t: TermId) -> Option<(BigRational, Vec<Lit>)> {
        self.upper(tm, t)
            .map(|(v, lits)| (BigRational::from_integer(v), lits))
    }

    /// Rational exact value, per the external arithmetic interface.
    #[must_use]
    pub fn get_value(&self, tm: &TermManager, t: TermId) -> Option<(BigRational, Vec<Lit>)> {
        self.value(tm, t)
            .map(|(v, lits)| (BigRational::from_integer(v), lits))
    }

    /// Truth value of a comparison under current bounds, with its
    /// justification, when the bounds decide it.
    #[must_use]
    pub fn evaluate_atom(&self, tm: &TermManager, atom: TermId) -> Option<(bool, Vec<Lit>)> {
        match *tm.kind(atom) {
            TermKind::Le(a, b) => {
                if let (Some((ua, la)), Some((lb, lb2))) = (self.upper(tm, a), self.lower(tm, b))
                    && ua <= lb
                {
                    let mut lits = la;
                    lits.extend(lb2);
                    return Some((true, lits));
                }
                if let (Some((la, ll)), Some((ub, ul))) = (self.lower(tm, a), self.upper(tm, b))
                    && la > ub
                {
                    let mut lits = ll;
                    lits.extend(ul);
                    return Some((false, lits));
                }
                None
            }
            TermKind::Eq(a, b) if tm.sort(a) == strand_core::sort::Sort::Int => {
                if let (Some((va, la)), Some((vb, lb))) = (self.value(tm, a), self.value(tm, b)) {
                    let mut lits = la;
                    lits.extend(lb);
                    return Some((va == vb, lits));
                }
                None
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_core::sort::Sort;

    #[test]
    fn test_exact_value_from_eq() {
        let mut tm = TermManager::new();
        let mut av = ArithView::new();
        let x = tm.mk_var("x", Sort::Seq);
        let len = tm.mk_length(x);
        let three = tm.mk_int(3);
        let atom = tm.mk_eq(len, three);
        av.assert_atom(&tm, Lit::positive(5), atom, true).unwrap();
        let (v, lits) = av.value(&tm, len).unwrap();
        assert_eq!(v, BigInt::from(3));
        assert!(lits.contains(&Lit::positive(5)));
    }

    #[test]
    fn test_bound_conflict() {
        let mut tm = TermManager::new();
        let mut av = ArithView::new();
        let n = tm.mk_var("n", Sort::Int);
        let two = tm.mk_int(2);
        let five = tm.mk_int(5);
        let ge5 = tm.mk_ge(n, five); // 5 <= n
        av.assert_atom(&tm, Lit::positive(1), ge5, true).unwrap();
        let le2 = tm.mk_le(n, two);
        let clause = av
            .assert_atom(&tm, Lit::positive(2), le2, true)
            .unwrap_err();
        assert!(clause.contains(&Lit::negative(1)));
        assert!(clause.contains(&Lit::negative(2)));
    }

    #[test]
    fn test_offset_propagation() {
        let mut tm = TermManager::new();
        let mut av = ArithView::new();
        let x = tm.mk_var("x", Sort::Seq);
        let t = tm.mk_var("t", Sort::Seq);
        let len_x = tm.mk_length(x);
        let len_t = tm.mk_length(t);
        let one = tm.mk_int(1);
        let sum = tm.mk_add(one, len_t);
        // |x| = 1 + |t|
        let link = tm.mk_eq(len_x, sum);
        av.assert_atom(&tm, Lit::positive(1), link, true).unwrap();
        // |x| = 2
        let two = tm.mk_int(2);
        let fix = tm.mk_eq(len_x, two);
        av.assert_atom(&tm, Lit::positive(2), fix, true).unwrap();

        let (v, lits) = av.value(&tm, len_t).unwrap();
        assert_eq!(v, BigInt::from(1));
        assert!(lits.contains(&Lit::positive(1)));
        assert!(lits.contains(&Lit::positive(2)));
    }

    #[test]
    fn test_evaluate_atom() {
        let mut tm = TermManager::new();
        let mut av = ArithView::new();
        let n = tm.mk_var("n", Sort::Int);
        let three = tm.mk_int(3);
        let eq = tm.mk_eq(n, three);
        av.assert_atom(&tm, Lit::positive(1), eq, true).unwrap();

        let zero = tm.mk_int(0);
        let ge0 = tm.mk_ge(n, zero);
        let (truth, lits) = av.evaluate_atom(&tm, ge0).unwrap();
        assert!(truth);
        assert!(lits.contains(&Lit::positive(1)));

        let five = tm.mk_int(5);
        let ge5 = tm.mk_ge(n, five);
        let (truth, _) = av.evaluate_atom(&tm, ge5).unwrap();
        assert!(!truth);
    }

    #[test]
    fn test_pop_scope_restores_bounds() {
        let mut tm = TermManager::new();
        let mut av = ArithView::new();
        let n = tm.mk_var("n", Sort::Int);
        let three = tm.mk_int(3);
        av.push_scope();
        let eq = tm.mk_eq(n, three);
        av.assert_atom(&tm, Lit::positive(1), eq, true).unwrap();
        assert!(av.value(&tm, n).is_some());
        av.pop_scope(1);
        assert!(av.value(&tm, n).is_none());
    }
}
