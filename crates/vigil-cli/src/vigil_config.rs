//! Layered configuration for the synthesizer
//!
//! Options that rarely change per invocation live in a configuration
//! file and can be overridden through `VIGIL_`-prefixed environment
//! variables; command line flags take precedence over both.

use serde::Deserialize;

use vigil_search::heuristics::{
    BfsHeuristic, CompositeHeuristic, DfsHeuristic, EnvironmentFirstHeuristic,
    FewerWordsHeuristic, SmallIncrementHeuristic,
};

/// Weights of the composite expansion heuristic.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HeuristicWeights {
    /// Weight of breadth-first expansion
    pub bfs: i64,
    /// Weight of depth-first expansion
    pub dfs: i64,
    /// Weight of preferring nodes with fewer canonical words
    pub fewer_words: i64,
    /// Weight of preferring nodes reached by environment actions
    pub environment_first: i64,
    /// Weight of preferring small region increments
    pub small_increment: i64,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        HeuristicWeights {
            bfs: 16,
            dfs: 0,
            fewer_words: 4,
            environment_first: 2,
            small_increment: 1,
        }
    }
}

impl HeuristicWeights {
    /// Build the composite heuristic described by the weights.
    pub fn build(&self) -> CompositeHeuristic {
        let mut summands: Vec<(i64, Box<dyn vigil_search::heuristics::Heuristic>)> = Vec::new();
        if self.bfs != 0 {
            summands.push((self.bfs, Box::new(BfsHeuristic::default())));
        }
        if self.dfs != 0 {
            summands.push((self.dfs, Box::new(DfsHeuristic::default())));
        }
        if self.fewer_words != 0 {
            summands.push((self.fewer_words, Box::new(FewerWordsHeuristic)));
        }
        if self.environment_first != 0 {
            summands.push((self.environment_first, Box::new(EnvironmentFirstHeuristic)));
        }
        if self.small_increment != 0 {
            summands.push((self.small_increment, Box::new(SmallIncrementHeuristic)));
        }
        CompositeHeuristic::new(summands)
    }
}

/// The configuration file contents.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VigilConfig {
    /// Number of expansion workers; 0 or absent means single-threaded
    pub workers: Option<usize>,
    /// Cap on the number of search nodes
    pub node_cap: Option<usize>,
    /// Heuristic weights
    pub heuristic: HeuristicWeights,
}
