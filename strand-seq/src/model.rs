//! Model Construction.
//!
//! Witness values are composed from equivalence classes through the
//! solution map: solved sequence variables unfold into their
//! replacement, elements resolve through class constants, true
//! character-class atoms and recorded disequalities, and `itos` pieces
//! render their integer value.

use crate::theory::SeqSolver;
use num_bigint::BigInt;
use num_traits::Signed;
use rustc_hash::FxHashMap;
use strand_core::ast::{TermId, TermKind, TermManager};
use strand_core::literal::LBool;
use strand_core::sort::Sort;

/// A witness assignment for the free variables of the input.
#[derive(Debug, Clone, Default)]
pub struct Model {
    seqs: FxHashMap<TermId, String>,
    ints: FxHashMap<TermId, BigInt>,
    chars: FxHashMap<TermId, char>,
    bools: FxHashMap<TermId, bool>,
}

impl Model {
    /// Sequence value of a variable.
    #[must_use]
    pub fn get_seq(&self, t: TermId) -> Option<&str> {
        self.seqs.get(&t).map(String::as_str)
    }

    /// Integer value of a variable.
    #[must_use]
    pub fn get_int(&self, t: TermId) -> Option<&BigInt> {
        self.ints.get(&t)
    }

    /// Element value of a variable.
    #[must_use]
    pub fn get_char(&self, t: TermId) -> Option<char> {
        self.chars.get(&t).copied()
    }

    /// Boolean value of a variable.
    #[must_use]
    pub fn get_bool(&self, t: TermId) -> Option<bool> {
        self.bools.get(&t).copied()
    }
}

struct CharPicker {
    memo: FxHashMap<TermId, u32>,
}

impl SeqSolver {
    /// Compose a model for every free variable.
    pub(crate) fn build_model(&mut self) -> Model {
        let mut model = Model::default();
        let mut picker = CharPicker {
            memo: FxHashMap::default(),
        };
        let vars: Vec<(TermId, Sort)> = (0..self.tm.len() as u32)
            .map(TermId::new)
            .filter(|&t| matches!(self.tm.kind(t), TermKind::Var(..)))
            .map(|t| (t, self.tm.sort(t)))
            .collect();
        for (t, sort) in vars {
            match sort {
                Sort::Seq => {
                    let s = self.resolve_seq(&mut picker, t);
                    model.seqs.insert(t, s);
                }
                Sort::Int => {
                    let v = self
                        .get_num_value(t)
                        .map(|(v, _)| v)
                        .unwrap_or_else(|| BigInt::from(0));
                    model.ints.insert(t, v);
                }
                Sort::Char => {
                    let c = self.resolve_char(&mut picker, t);
                    model
                        .chars
                        .insert(t, char::from_u32(c).unwrap_or('\u{fffd}'));
                }
                Sort::Bool => {
                    let value = self
                        .atom_var
                        .get(&t)
                        .map(|&v| self.sat.value(strand_core::literal::Lit::positive(v)))
                        .map(|v| v == LBool::True)
                        .unwrap_or(false);
                    model.bools.insert(t, value);
                }
                Sort::Re => {}
            }
        }
        model
    }

    fn resolve_seq(&mut self, picker: &mut CharPicker, t: TermId) -> String {
        let mut out: Vec<u32> = Vec::new();
        self.resolve_word(picker, t, &mut out, 0);
        TermManager::word_to_string(&out)
    }

    fn resolve_word(&mut self, picker: &mut CharPicker, t: TermId, out: &mut Vec<u32>, depth: u32) {
        if depth > 64 {
            return;
        }
        let e = self.rep.find_plain(t);
        let e = self.rw.simplify(&mut self.tm, e);
        match self.tm.kind(e).clone() {
            TermKind::Concat(a, b) => {
                self.resolve_word(picker, a, out, depth + 1);
                self.resolve_word(picker, b, out, depth + 1);
            }
            TermKind::Empty => {}
            TermKind::SeqLit(s) => out.extend(s.chars().map(|c| c as u32)),
            TermKind::Unit(c) => out.push(self.resolve_char(picker, c)),
            TermKind::Itos(n) => {
                if let Some((v, _)) = self.get_num_value(n)
                    && !v.is_negative()
                {
                    out.extend(v.to_string().chars().map(|c| c as u32));
                }
            }
            TermKind::Ite(c, th, el) => {
                let clit = self.mk_literal(c);
                let branch = if self.sat.value(clit) == LBool::False {
                    el
                } else {
                    th
                };
                self.resolve_word(picker, branch, out, depth + 1);
            }
            _ => {
                // an unsolved variable: honor its length lower bound
                let len = self.tm.mk_length(e);
                if let Some((lo, _)) = self.lower_bound(len)
                    && lo.is_positive()
                    && let Some(n) = num_traits::ToPrimitive::to_usize(&lo)
                {
                    out.extend(std::iter::repeat_n('a' as u32, n));
                }
            }
        }
    }

    fn resolve_char(&mut self, picker: &mut CharPicker, c: TermId) -> u32 {
        let root = self.eg.find(c);
        if let Some(&v) = picker.memo.get(&root) {
            return v;
        }
        for m in self.eg.class_members(c) {
            if let Some(v) = self.tm.char_val(m) {
                picker.memo.insert(root, v);
                return v;
            }
        }

        // constraints from true/false character-class atoms on the class
        let mut must_in: Vec<strand_core::ast::CharRanges> = Vec::new();
        let mut must_out: Vec<strand_core::ast::CharRanges> = Vec::new();
        let atoms: Vec<(TermId, u32)> = self
            .atom_var
            .iter()
            .map(|(&t, &v)| (t, v))
            .collect();
        for (atom, var) in atoms {
            let TermKind::CharPred(el, ranges) = self.tm.kind(atom).clone() else {
                continue;
            };
            if !self.eg.are_eq(el, c) {
                continue;
            }
            match self.sat.value(strand_core::literal::Lit::positive(var)) {
                LBool::True => must_in.push(ranges),
                LBool::False => must_out.push(ranges),
                LBool::Undef => {}
            }
        }
        // avoid the values of disequal neighbours
        let mut avoid: Vec<u32> = Vec::new();
        for p in self.eg.diseq_partners(c) {
            for m in self.eg.class_members(p) {
                if let Some(v) = self.tm.char_val(m) {
                    avoid.push(v);
                }
            }
            let proot = self.eg.find(p);
            if let Some(&v) = picker.memo.get(&proot) {
                avoid.push(v);
            }
        }

        let candidates = ('a' as u32..=0x10_FFFF).chain(0..'a' as u32);
        for cand in candidates {
            if char::from_u32(cand).is_none() {
                continue;
            }
            if avoid.contains(&cand) {
                continue;
            }
            if must_in.iter().any(|r| !r.contains(cand)) {
                continue;
            }
            if must_out.iter().any(|r| r.contains(cand)) {
                continue;
            }
            picker.memo.insert(root, cand);
            return cand;
        }
        picker.memo.insert(root, 'a' as u32);
        'a' as u32
    }
}
