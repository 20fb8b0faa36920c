//! Controller extraction from a labelled search graph
//!
//! A winning search graph is projected into a timed automaton: every
//! winning node becomes a location, every winning child reachable over a
//! range of region increments becomes a guarded transition. The guard
//! pins the plant clocks between the regions of the first and the last
//! increment of the range; the resets are those of the plant transitions
//! realizing the action.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::{debug, info};
use vigil_automata::ClockConstraint;
use vigil_automata::regions::{ConstraintBoundKind, RegionIndex, Regions, constraints_from_region};
use vigil_automata::ta::{TimedAutomaton, Transition};

use crate::canonical_word::{AbRegionSymbol, CanonicalWord};
use crate::search::TreeSearch;
use crate::tree::{NodeId, NodeLabel};
use crate::Plant;

/// Error raised when no controller can be extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// The root of the search graph is not winning
    RootNotWinning,
    /// A transition of the controller was rejected by the automaton
    InvalidTransition(String),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::RootNotWinning => {
                write!(f, "cannot extract a controller, the root is not winning")
            }
            ControllerError::InvalidTransition(message) => {
                write!(f, "controller transition rejected: {message}")
            }
        }
    }
}

impl std::error::Error for ControllerError {}

/// Extract the controller of a search whose root is winning.
///
/// Locations are named `n<id>` after the winning nodes; every location is
/// accepting. Transitions follow the winning edges, with guards derived
/// from the region increments of the edges.
pub fn create_controller<P: Plant>(
    search: &TreeSearch<'_, P>,
) -> Result<TimedAutomaton<String, P::Action>, ControllerError> {
    let regions = *search.regions();
    search.with_graph(|graph| {
        let root = graph.root();
        if graph.node(root).label != NodeLabel::Top {
            return Err(ControllerError::RootNotWinning);
        }
        let mut controller: TimedAutomaton<String, P::Action> =
            TimedAutomaton::new([], location_name(root), [location_name(root)]);
        for clock in search.plant().clocks() {
            controller.add_clock(clock);
        }
        let mut visited = BTreeSet::from([root]);
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = graph.node(id);
            // Group the winning edges per child and action.
            let mut increments: BTreeMap<(NodeId, P::Action), BTreeSet<RegionIndex>> =
                BTreeMap::new();
            for ((step, action), child) in node.edge_pairs() {
                if graph.node(child).label != NodeLabel::Top {
                    continue;
                }
                increments.entry((child, action.clone())).or_default().insert(*step);
            }
            let projection = node
                .words
                .iter()
                .next()
                .map(|word| word.plant_projection());
            for ((child, action), steps) in increments {
                if visited.insert(child) {
                    controller.add_location(location_name(child));
                    controller.add_final_location(location_name(child));
                    stack.push(child);
                }
                controller.add_symbol(action.clone());
                let Some(projection) = projection.as_ref() else { continue };
                for (first, last) in consecutive_ranges(&steps) {
                    add_range_transitions(
                        &mut controller,
                        search,
                        &regions,
                        projection,
                        id,
                        child,
                        &action,
                        first,
                        last,
                    )?;
                }
            }
        }
        info!(
            "Extracted a controller with {} locations and {} transitions",
            controller.locations().len(),
            controller.transitions().count()
        );
        Ok(controller)
    })
}

fn location_name(id: NodeId) -> String {
    format!("n{id}")
}

/// Split a set of increments into maximal runs of consecutive values.
fn consecutive_ranges(steps: &BTreeSet<RegionIndex>) -> Vec<(RegionIndex, RegionIndex)> {
    let mut ranges = Vec::new();
    let mut current: Option<(RegionIndex, RegionIndex)> = None;
    for &step in steps {
        current = match current {
            None => Some((step, step)),
            Some((first, last)) if step == last + 1 => Some((first, step)),
            Some(range) => {
                ranges.push(range);
                Some((step, step))
            }
        };
    }
    if let Some(range) = current {
        ranges.push(range);
    }
    ranges
}

/// Emit the transitions for one action over one increment range.
#[allow(clippy::too_many_arguments)]
fn add_range_transitions<P: Plant>(
    controller: &mut TimedAutomaton<String, P::Action>,
    search: &TreeSearch<'_, P>,
    regions: &Regions,
    projection: &CanonicalWord<P::Location>,
    source: NodeId,
    target: NodeId,
    action: &P::Action,
    first: RegionIndex,
    last: RegionIndex,
) -> Result<(), ControllerError> {
    let mut guards: Vec<(String, ClockConstraint)> = Vec::new();
    guards.extend(constraints_at(projection, regions, first, ConstraintBoundKind::Lower));
    guards.extend(constraints_at(projection, regions, last, ConstraintBoundKind::Upper));
    guards.sort();
    guards.dedup();
    // The reset sets come from the plant transitions realizing the action
    // at the start of the range.
    let (candidate, _) = nth_time_successor(projection, regions, first).candidate();
    let mut reset_sets: BTreeSet<BTreeSet<String>> = search
        .plant()
        .symbol_step(&candidate, action)
        .into_iter()
        .map(|step| step.resets)
        .collect();
    if reset_sets.is_empty() {
        reset_sets.insert(BTreeSet::new());
    }
    for resets in reset_sets {
        debug!(
            "Controller transition {} --[{action}]--> {} for increments {first}..={last}",
            location_name(source),
            location_name(target),
        );
        controller
            .add_transition(Transition::new(
                location_name(source),
                action.clone(),
                location_name(target),
                guards.clone(),
                resets,
            ))
            .map_err(|e| ControllerError::InvalidTransition(e.to_string()))?;
    }
    Ok(())
}

fn nth_time_successor<L>(
    word: &CanonicalWord<L>,
    regions: &Regions,
    n: RegionIndex,
) -> CanonicalWord<L>
where
    L: Clone + Ord + fmt::Debug + fmt::Display,
{
    let mut result = word.clone();
    for _ in 0..n {
        result = result.time_successor(regions);
    }
    result
}

/// The clock constraints pinning the plant clocks into the regions of the
/// nth time successor of a word.
fn constraints_at<L>(
    word: &CanonicalWord<L>,
    regions: &Regions,
    n: RegionIndex,
    bound_kind: ConstraintBoundKind,
) -> Vec<(String, ClockConstraint)>
where
    L: Clone + Ord + fmt::Debug + fmt::Display,
{
    let successor = nth_time_successor(word, regions, n);
    let mut constraints = Vec::new();
    for symbol in successor.symbols() {
        if let AbRegionSymbol::Plant(state) = symbol {
            for constraint in constraints_from_region(
                state.region_index,
                regions.max_region_index(),
                bound_kind,
            ) {
                constraints.push((state.clock.clone(), constraint));
            }
        }
    }
    constraints
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_split_on_gaps() {
        let steps = BTreeSet::from([0, 1, 2, 4, 6, 7]);
        assert_eq!(consecutive_ranges(&steps), vec![(0, 2), (4, 4), (6, 7)]);
        assert_eq!(consecutive_ranges(&BTreeSet::new()), vec![]);
    }
}
