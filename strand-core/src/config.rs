//! Solver Configuration.

use serde::{Deserialize, Serialize};

/// Which arithmetic engine serves length queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithMode {
    /// The built-in bounds bookkeeping view.
    Bounds,
    /// An external engine; not available in this build.
    External,
}

/// Tunable parameters of the sequence solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeqParams {
    /// Arithmetic engine selection, validated when search starts.
    pub arith_mode: ArithMode,
    /// Enable the length-based split rule in the final-check cascade.
    pub split_with_length: bool,
    /// Initial automaton unfolding depth carried as an assumption.
    pub initial_unfolding_depth: u32,
    /// Initial per-sequence length limit.
    pub initial_length_limit: u32,
    /// Upper bound on final-check rounds before answering unknown.
    pub max_rounds: u32,
    /// Upper bound on research iterations (bound raising) per query.
    pub max_research: u32,
    /// Cap on automaton states for complement construction.
    pub max_automaton_states: usize,
}

impl Default for SeqParams {
    fn default() -> Self {
        Self {
            arith_mode: ArithMode::Bounds,
            split_with_length: false,
            initial_unfolding_depth: 1,
            initial_length_limit: 4,
            max_rounds: 10_000,
            max_research: 12,
            max_automaton_states: 10_000,
        }
    }
}
