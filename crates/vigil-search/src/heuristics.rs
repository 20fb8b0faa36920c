//! Heuristics ranking frontier nodes for expansion
//!
//! The search pops the highest-ranked unexplored node first. A heuristic
//! ranks a node from the facts known at discovery time, summarized in a
//! [`RankContext`]. Heuristics compose by weighted sum.

use std::sync::atomic::{AtomicI64, Ordering};

use vigil_automata::regions::RegionIndex;

/// The facts a heuristic may rank a node by.
#[derive(Debug, Clone, Copy)]
pub struct RankContext {
    /// Distance from the root at discovery
    pub depth: usize,
    /// Number of canonical words of the node
    pub num_words: usize,
    /// Smallest region increment among the incoming edges
    pub min_increment: RegionIndex,
    /// Whether some incoming edge carries an environment action
    pub environment_reachable: bool,
}

/// Rank frontier nodes; higher ranks are expanded first.
pub trait Heuristic: Send + Sync {
    /// Rank a newly discovered node.
    fn rank(&self, context: &RankContext) -> i64;
}

/// First-in, first-out expansion: breadth-first search.
#[derive(Debug, Default)]
pub struct BfsHeuristic {
    counter: AtomicI64,
}

impl Heuristic for BfsHeuristic {
    fn rank(&self, _: &RankContext) -> i64 {
        -(self.counter.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Last-in, first-out expansion: depth-first search.
#[derive(Debug, Default)]
pub struct DfsHeuristic {
    counter: AtomicI64,
}

impl Heuristic for DfsHeuristic {
    fn rank(&self, _: &RankContext) -> i64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Prefer nodes with fewer canonical words.
#[derive(Debug, Default)]
pub struct FewerWordsHeuristic;

impl Heuristic for FewerWordsHeuristic {
    fn rank(&self, context: &RankContext) -> i64 {
        -(context.num_words as i64)
    }
}

/// Prefer nodes reached by an environment action.
///
/// Adversarial witnesses tend to be shorter, so refuting a node early
/// cuts more of the tree.
#[derive(Debug, Default)]
pub struct EnvironmentFirstHeuristic;

impl Heuristic for EnvironmentFirstHeuristic {
    fn rank(&self, context: &RankContext) -> i64 {
        i64::from(context.environment_reachable)
    }
}

/// Prefer nodes reached with a small region increment.
#[derive(Debug, Default)]
pub struct SmallIncrementHeuristic;

impl Heuristic for SmallIncrementHeuristic {
    fn rank(&self, context: &RankContext) -> i64 {
        -i64::from(context.min_increment)
    }
}

/// A weighted sum of heuristics.
pub struct CompositeHeuristic {
    summands: Vec<(i64, Box<dyn Heuristic>)>,
}

impl CompositeHeuristic {
    /// Compose the given weighted heuristics.
    pub fn new(summands: Vec<(i64, Box<dyn Heuristic>)>) -> Self {
        CompositeHeuristic { summands }
    }

    /// The default composition: breadth-first, slightly biased towards
    /// simple nodes, environment actions and small increments.
    pub fn standard() -> Self {
        CompositeHeuristic::new(vec![
            (16, Box::new(BfsHeuristic::default())),
            (4, Box::new(FewerWordsHeuristic)),
            (2, Box::new(EnvironmentFirstHeuristic)),
            (1, Box::new(SmallIncrementHeuristic)),
        ])
    }
}

impl Heuristic for CompositeHeuristic {
    fn rank(&self, context: &RankContext) -> i64 {
        self.summands.iter().map(|(weight, heuristic)| weight * heuristic.rank(context)).sum()
    }
}
