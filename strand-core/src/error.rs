//! Error Types for the Sequence Solver.

use thiserror::Error;

/// Error type for solver operations.
///
/// Contradictions are not errors: they are reported through the SAT
/// conflict machinery. These variants cover genuine failures only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeqError {
    /// A regular expression could not be compiled to an automaton.
    #[error("expression {expr} does not correspond to a supported regular expression")]
    UnsupportedRegex {
        /// Rendering of the offending expression.
        expr: String,
    },
    /// The configured arithmetic engine cannot serve length queries.
    #[error("illegal arithmetic solver used with the sequence solver")]
    IncompatibleArithTheory,
    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias used across the solver crates.
pub type Result<T> = std::result::Result<T, SeqError>;
