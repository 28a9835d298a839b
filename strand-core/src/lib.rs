//! strand-core — AST, Sorts and Rewriting for the Strand Sequence Solver.
//!
//! This crate provides the foundational types shared by the SAT engine
//! and the sequence theory:
//! - Arena-allocated, hash-consed terms with [`TermId`] references
//! - The closed operator enumeration of the sequence signature
//! - A minimal sort system
//! - Packed literals for the SAT interface
//! - The context-free sequence/arithmetic rewriter
//! - Errors, configuration and statistics
//!
//! # Examples
//!
//! ```
//! use strand_core::ast::TermManager;
//! use strand_core::rewrite::SeqRewriter;
//! use strand_core::sort::Sort;
//!
//! let mut tm = TermManager::new();
//! let mut rw = SeqRewriter::new();
//!
//! let s = tm.mk_seq_lit("hello");
//! let len = tm.mk_length(s);
//! let r = rw.simplify(&mut tm, len);
//! assert_eq!(tm.int_val_i64(r), Some(5));
//!
//! let x = tm.mk_var("x", Sort::Seq);
//! assert!(tm.is_seq_var(x));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod ast;
pub mod config;
pub mod error;
pub mod literal;
pub mod rewrite;
pub mod sort;
pub mod statistics;

pub use ast::{CharRanges, SkolemKind, Term, TermId, TermKind, TermManager};
pub use config::{ArithMode, SeqParams};
pub use error::{Result, SeqError};
pub use literal::{FALSE_LIT, LBool, Lit, TRUE_LIT, Var};
pub use rewrite::{ReduceEq, SeqRewriter};
pub use sort::Sort;
pub use statistics::Statistics;
