//! strand-sat — Minimal CDCL Engine for the Strand Solver.
//!
//! A deliberately small boolean engine: clause database with
//! duplicate suppression, fixpoint unit propagation by clause scan,
//! decisions with forced phases, conflict analysis down to decision
//! literals, backjumping, and assumption handling with unsat cores.
//!
//! The theory drives the engine: it adds clauses mid-search, reads the
//! trail, and is told how far to pop when the engine backjumps. There
//! are no watched literals and no clause deletion; the engine is the
//! thin concrete stand-in for the boolean side of a DPLL(T) loop.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod solver;

pub use solver::{ClauseStatus, ConflictOutcome, SatSolver};
pub use strand_core::literal::{FALSE_LIT, LBool, Lit, TRUE_LIT, Var};
