//! strand-seq — Decision Procedure Core for the Theory of Finite
//! Sequences.
//!
//! Decides satisfiability of conjunctions of equalities,
//! disequalities, length constraints, regular-language membership and
//! string functions over variables ranging over finite sequences of
//! Unicode code points. The hard part is the equation-solving engine:
//!
//! - a backtrackable **solution map** with dependency annotations,
//! - a **cascading check loop** applying a fixed ordered pipeline of
//!   solving, splitting and axiom-instantiation rules at every
//!   final-check round,
//! - a **regular-language engine** compiling regexes to automata and
//!   unfolding membership through `accept`/`step` predicates with
//!   budgeted depth.
//!
//! # Examples
//!
//! ```
//! use strand_seq::{SeqSolver, SolveResult};
//! use strand_core::sort::Sort;
//!
//! let mut solver = SeqSolver::default();
//! let x = solver.tm().mk_var("x", Sort::Seq);
//! let suffix = solver.tm().mk_seq_lit("ab");
//! let lhs = solver.tm().mk_concat(x, suffix);
//! let rhs = solver.tm().mk_seq_lit("cab");
//! let eq = solver.tm().mk_eq(lhs, rhs);
//! solver.assert_formula(eq, true);
//!
//! match solver.check().unwrap() {
//!     SolveResult::Sat(model) => assert_eq!(model.get_seq(x), Some("c")),
//!     other => panic!("expected sat, got {other:?}"),
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod arith;
pub mod automaton;
mod axioms;
mod branch;
pub mod dependency;
pub mod egraph;
pub mod eqs;
mod length;
pub mod model;
mod nqs;
mod regex;
pub mod scoped;
mod search;
pub mod skolem;
pub mod solution;
mod solve;
pub mod theory;

pub use automaton::Nfa;
pub use dependency::{Assumption, Dep, DepManager};
pub use model::Model;
pub use solution::{ExclusionTable, SolutionMap};
pub use theory::{FinalCheck, SeqSolver, SolveResult};
