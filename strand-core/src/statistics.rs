//! Statistics Counters.
//!
//! One counter per cascade rule family, mirroring the solver's
//! diagnostic output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Counters collected during solving.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Statistics {
    /// Case splits performed.
    pub num_splits: u64,
    /// Equation reductions.
    pub num_reductions: u64,
    /// Length-coherence rounds that made progress.
    pub check_length_coherence: u64,
    /// Variable branching rounds.
    pub branch_variable: u64,
    /// Disequation solving rounds.
    pub solve_nqs: u64,
    /// Equation solving rounds.
    pub solve_eqs: u64,
    /// Disequation branching rounds.
    pub branch_nqs: u64,
    /// Axioms emitted.
    pub add_axiom: u64,
    /// Extensionality probes.
    pub extensionality: u64,
    /// Fixed-length instantiations.
    pub fixed_length: u64,
    /// Int-string bridging rounds.
    pub int_string: u64,
    /// Automaton accept/step propagations.
    pub propagate_automata: u64,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "seq num splits:        {}", self.num_splits)?;
        writeln!(f, "seq num reductions:    {}", self.num_reductions)?;
        writeln!(f, "seq length coherence:  {}", self.check_length_coherence)?;
        writeln!(f, "seq branch:            {}", self.branch_variable)?;
        writeln!(f, "seq solve !=:          {}", self.solve_nqs)?;
        writeln!(f, "seq solve =:           {}", self.solve_eqs)?;
        writeln!(f, "seq branch !=:         {}", self.branch_nqs)?;
        writeln!(f, "seq add axiom:         {}", self.add_axiom)?;
        writeln!(f, "seq extensionality:    {}", self.extensionality)?;
        writeln!(f, "seq fixed length:      {}", self.fixed_length)?;
        writeln!(f, "seq int.to.str:        {}", self.int_string)?;
        writeln!(f, "seq automata:          {}", self.propagate_automata)
    }
}
