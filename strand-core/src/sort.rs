//! Sort System for the Sequence Signature.
//!
//! The signature is closed: Booleans, integers, alphabet elements
//! (Unicode code points), sequences over elements, and regular
//! expressions over sequences.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sort of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sort {
    /// Boolean sort.
    Bool,
    /// Integer sort.
    Int,
    /// Alphabet element (a Unicode code point).
    Char,
    /// Finite sequence of alphabet elements.
    Seq,
    /// Regular expression over sequences.
    Re,
}

impl Sort {
    /// Check whether this is the sequence sort.
    #[must_use]
    pub fn is_seq(self) -> bool {
        self == Sort::Seq
    }

    /// Check whether this is the regular-expression sort.
    #[must_use]
    pub fn is_re(self) -> bool {
        self == Sort::Re
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::Int => write!(f, "Int"),
            Sort::Char => write!(f, "Char"),
            Sort::Seq => write!(f, "Seq"),
            Sort::Re => write!(f, "Re"),
        }
    }
}
