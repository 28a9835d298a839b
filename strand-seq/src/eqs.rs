//! Equation, Disequation and Not-Contains Stores.

use crate::dependency::Dep;
use strand_core::ast::{TermId, TermManager};
use strand_core::literal::Lit;

/// A structured equation: the concatenations of the two sides must be
/// equal. Fresh monotone `id` for ordering and duplicate detection.
#[derive(Debug, Clone)]
pub struct SeqEq {
    /// Creation-ordered identifier.
    pub id: u32,
    /// Left side, as a list of sequence terms.
    pub ls: Vec<TermId>,
    /// Right side, as a list of sequence terms.
    pub rs: Vec<TermId>,
    /// Assumptions under which the equation holds.
    pub dep: Dep,
}

impl SeqEq {
    /// Render for diagnostics.
    #[must_use]
    pub fn display(&self, tm: &TermManager) -> String {
        let side = |parts: &[TermId]| {
            if parts.is_empty() {
                "\"\"".to_string()
            } else {
                parts
                    .iter()
                    .map(|&p| tm.display(p))
                    .collect::<Vec<_>>()
                    .join(" ++ ")
            }
        };
        format!("{} = {}", side(&self.ls), side(&self.rs))
    }
}

/// A disequation `l != r`, decomposed into pairs that would all have to
/// hold (together with `lits`) for the disequality to be violated.
#[derive(Debug, Clone)]
pub struct SeqNe {
    /// Original left side.
    pub l: TermId,
    /// Original right side.
    pub r: TermId,
    /// Literals that are true and support the decomposition.
    pub lits: Vec<Lit>,
    /// Residual sub-equations, each a pair of concatenations.
    pub pairs: Vec<(Vec<TermId>, Vec<TermId>)>,
    /// Assumptions under which the disequality was asserted.
    pub dep: Dep,
}

impl SeqNe {
    /// Fresh disequation with a single undecomposed pair.
    #[must_use]
    pub fn new(l: TermId, r: TermId, dep: Dep) -> Self {
        Self {
            l,
            r,
            lits: Vec::new(),
            pairs: vec![(vec![l], vec![r])],
            dep,
        }
    }

    /// Render for diagnostics.
    #[must_use]
    pub fn display(&self, tm: &TermManager) -> String {
        format!("{} != {}", tm.display(self.l), tm.display(self.r))
    }
}

/// A negated-contains constraint with the guard literal controlling its
/// unfolding (`|needle| > |hay|`).
#[derive(Debug, Clone)]
pub struct SeqNc {
    /// The `contains` atom (asserted false).
    pub contains: TermId,
    /// Guard literal `|hay| < |needle|`.
    pub len_gt: Lit,
    /// Assumptions under which the constraint was asserted.
    pub dep: Dep,
}

impl SeqNc {
    /// Render for diagnostics.
    #[must_use]
    pub fn display(&self, tm: &TermManager) -> String {
        format!("not {}", tm.display(self.contains))
    }
}

/// An active regular-language membership for an equivalence class.
#[derive(Debug, Clone)]
pub struct SInRe {
    /// The literal that introduced the membership.
    pub lit: Lit,
    /// The member sequence.
    pub s: TermId,
    /// The (possibly intersected) regex.
    pub re: TermId,
    /// Superseded entries are deactivated, not removed.
    pub active: bool,
}
