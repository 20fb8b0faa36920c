//! The game solver
//!
//! [`TreeSearch`] explores the regionalized product of the plant and the
//! specification automaton as a two-player game. Frontier nodes are popped
//! from a priority queue ranked by a [`Heuristic`], expanded into their
//! time and action successors, and labelled incrementally:
//!
//! - a node whose candidate is accepting for both plant and automaton is
//!   lost ([`NodeLabel::Bottom`]),
//! - a node covered by an ancestor is won ([`NodeLabel::Top`]),
//! - a node without successors is won,
//! - otherwise the label follows from the children: the controller wins if
//!   one of its actions reaches a winning child before the environment can
//!   reach a losing one, and the environment wins dually.
//!
//! Expansion runs single-threaded or on a pool of workers sharing the
//! queue; labels only move from unlabelled to a final value, so the
//! resulting root label does not depend on the expansion order.

use std::collections::{BTreeMap, BTreeSet, BinaryHeap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use log::{debug, info, trace, warn};
use vigil_automata::regions::{RegionIndex, Regions};

use crate::canonical_word::{CanonicalWord, canonical_word, insert_with_domination};
use crate::heuristics::{Heuristic, RankContext};
use crate::successors::{SpecAta, next_canonical_words};
use crate::tree::{NodeId, NodeLabel, NodeState, SearchGraph};
use crate::{LocationSymbols, Plant, SearchConfig, SearchError};

/// The verdict of a finished search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The controller wins; a controller can be extracted
    Realizable,
    /// The environment wins
    Unrealizable,
    /// The node cap was reached before the root was decided
    Unknown,
    /// The search was cancelled before the root was decided
    Cancelled,
}

/// An entry of the expansion queue, ordered by rank, ties broken by
/// insertion order (earlier first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueEntry {
    rank: i64,
    sequence: u64,
    id: NodeId,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank
            .cmp(&other.rank)
            .then_with(|| other.sequence.cmp(&self.sequence))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

struct SearchState<L, A>
where
    L: Clone + Ord + std::hash::Hash + std::fmt::Debug + std::fmt::Display,
    A: Clone + Ord + std::fmt::Debug + std::fmt::Display,
{
    graph: SearchGraph<L, A>,
    queue: BinaryHeap<QueueEntry>,
    sequence: u64,
    in_flight: usize,
    error: Option<SearchError>,
}

/// The synthesis game search.
pub struct TreeSearch<'a, P: Plant> {
    plant: &'a P,
    ata: &'a SpecAta,
    controller_actions: BTreeSet<P::Action>,
    environment_actions: BTreeSet<P::Action>,
    regions: Regions,
    config: SearchConfig,
    location_symbols: Option<LocationSymbols<P::Location>>,
    heuristic: Box<dyn Heuristic>,
    state: Mutex<SearchState<P::Location, P::Action>>,
    work_available: Condvar,
    cancelled: Arc<AtomicBool>,
    root_decided: AtomicBool,
}

impl<'a, P: Plant> TreeSearch<'a, P> {
    /// Set up a search.
    ///
    /// `k` is the largest constant the region abstraction must
    /// distinguish; it has to cover both the plant's guards and the
    /// specification intervals. The action sets must be disjoint and
    /// together cover the plant's alphabet.
    pub fn new(
        plant: &'a P,
        ata: &'a SpecAta,
        controller_actions: BTreeSet<P::Action>,
        environment_actions: BTreeSet<P::Action>,
        k: u32,
        config: SearchConfig,
        location_symbols: Option<LocationSymbols<P::Location>>,
        heuristic: Box<dyn Heuristic>,
    ) -> Result<Self, SearchError> {
        let overlap: Vec<String> = controller_actions
            .intersection(&environment_actions)
            .map(|a| a.to_string())
            .collect();
        if !overlap.is_empty() {
            return Err(SearchError::OverlappingActions(overlap));
        }
        for action in plant.alphabet() {
            if !controller_actions.contains(&action) && !environment_actions.contains(&action) {
                return Err(SearchError::UnassignedAction(action.to_string()));
            }
        }
        if plant.clocks().is_empty() {
            return Err(SearchError::PlantWithoutClocks);
        }
        if ata.alphabet().is_empty() {
            return Err(SearchError::EmptyAlphabet);
        }
        if config.location_constraints && location_symbols.is_none() {
            return Err(SearchError::MissingLocationSymbols);
        }
        let regions = Regions { largest_constant: k };
        let root_word = canonical_word(
            &plant.initial_configuration(),
            &ata.initial_configuration(),
            &regions,
            config.set_semantics,
        )
        .map_err(|e| SearchError::InvalidCanonicalWord(e.to_string()))?;
        let graph = SearchGraph::new(BTreeSet::from([root_word]));
        let mut queue = BinaryHeap::new();
        queue.push(QueueEntry { rank: 0, sequence: 0, id: graph.root() });
        Ok(TreeSearch {
            plant,
            ata,
            controller_actions,
            environment_actions,
            regions,
            config,
            location_symbols,
            heuristic,
            state: Mutex::new(SearchState { graph, queue, sequence: 1, in_flight: 0, error: None }),
            work_available: Condvar::new(),
            cancelled: Arc::new(AtomicBool::new(false)),
            root_decided: AtomicBool::new(false),
        })
    }

    /// The cancellation flag. Setting it stops the search at the next
    /// queue pop; already expanded nodes stay consistent.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// The current label of the root node.
    pub fn root_label(&self) -> NodeLabel {
        let state = self.state.lock().expect("search state poisoned");
        state.graph.node(state.graph.root()).label
    }

    /// The number of nodes discovered so far.
    pub fn num_nodes(&self) -> usize {
        self.state.lock().expect("search state poisoned").graph.len()
    }

    /// Run one expansion step. Returns `false` once the queue is empty or
    /// the search has failed; failures surface when the search concludes.
    pub fn step(&self) -> Result<bool, SearchError> {
        let id = {
            let mut state = self.state.lock().expect("search state poisoned");
            if state.error.is_some() {
                return Ok(false);
            }
            match state.queue.pop() {
                Some(entry) => entry.id,
                None => return Ok(false),
            }
        };
        if self.cancelled.load(Ordering::SeqCst) {
            let mut state = self.state.lock().expect("search state poisoned");
            let node = state.graph.node_mut(id);
            if node.label == NodeLabel::Unlabeled {
                node.label = NodeLabel::Canceled;
            }
            return Ok(true);
        }
        if let Err(error) = self.expand(id) {
            let mut state = self.state.lock().expect("search state poisoned");
            state.error.get_or_insert(error);
            return Ok(false);
        }
        Ok(true)
    }

    /// Run the search to completion with the given number of workers.
    pub fn search(&self, workers: usize) -> Result<SearchOutcome, SearchError> {
        if workers <= 1 {
            loop {
                if self.cancelled.load(Ordering::SeqCst) || self.root_decided.load(Ordering::SeqCst)
                {
                    break;
                }
                if !self.step()? {
                    break;
                }
            }
        } else {
            std::thread::scope(|scope| {
                for _ in 0..workers {
                    scope.spawn(|| self.worker());
                }
            });
        }
        self.conclude()
    }

    fn worker(&self) {
        loop {
            let id = {
                let mut state = self.state.lock().expect("search state poisoned");
                loop {
                    if state.error.is_some()
                        || self.cancelled.load(Ordering::SeqCst)
                        || self.root_decided.load(Ordering::SeqCst)
                    {
                        self.work_available.notify_all();
                        return;
                    }
                    if let Some(entry) = state.queue.pop() {
                        state.in_flight += 1;
                        break entry.id;
                    }
                    if state.in_flight == 0 {
                        self.work_available.notify_all();
                        return;
                    }
                    state = self
                        .work_available
                        .wait(state)
                        .expect("search state poisoned");
                }
            };
            let result = self.expand(id);
            let mut state = self.state.lock().expect("search state poisoned");
            state.in_flight -= 1;
            if let Err(error) = result {
                state.error.get_or_insert(error);
            }
            self.work_available.notify_all();
        }
    }

    fn conclude(&self) -> Result<SearchOutcome, SearchError> {
        let mut state = self.state.lock().expect("search state poisoned");
        if let Some(error) = state.error.clone() {
            if let SearchError::StateSpaceTooLarge(cap) = error {
                warn!("Aborting search, the state space exceeded the cap of {cap} nodes");
                return Ok(SearchOutcome::Unknown);
            }
            return Err(error);
        }
        if self.cancelled.load(Ordering::SeqCst) {
            // Expanded nodes stay consistent; the abandoned frontier is
            // marked, the root stays as it was.
            let root = state.graph.root();
            while let Some(entry) = state.queue.pop() {
                if entry.id == root {
                    continue;
                }
                let node = state.graph.node_mut(entry.id);
                if node.label == NodeLabel::Unlabeled {
                    node.label = NodeLabel::Canceled;
                }
            }
            return Ok(match state.graph.node(root).label {
                NodeLabel::Top => SearchOutcome::Realizable,
                NodeLabel::Bottom => SearchOutcome::Unrealizable,
                _ => SearchOutcome::Cancelled,
            });
        }
        if !self.root_decided.load(Ordering::SeqCst) {
            self.finalize_labels(&mut state);
        }
        let root = state.graph.root();
        match state.graph.node(root).label {
            NodeLabel::Top => Ok(SearchOutcome::Realizable),
            NodeLabel::Bottom => Ok(SearchOutcome::Unrealizable),
            label => {
                // The queue is drained and labelling is complete, so an
                // undecided root indicates a bug.
                Err(SearchError::Internal(format!(
                    "search finished with undecided root label {label}"
                )))
            }
        }
    }

    /// Expand one node: determine it as a leaf or compute its successors.
    fn expand(&self, id: NodeId) -> Result<(), SearchError> {
        let (words, depth) = {
            let mut state = self.state.lock().expect("search state poisoned");
            let node = state.graph.node(id);
            if node.label != NodeLabel::Unlabeled || node.expanded {
                return Ok(());
            }
            // Undesired behavior realized: the node is lost.
            if self.is_bad(&node.words) {
                let node = state.graph.node_mut(id);
                node.state = NodeState::Bad;
                node.label = NodeLabel::Bottom;
                node.expanded = true;
                trace!("Node {id} is bad");
                self.propagate_from(&mut state, id);
                return Ok(());
            }
            // Covered by an ancestor: the ancestor's subtree answers for
            // this node.
            if state.graph.is_covered_by_ancestor(id) {
                let node = state.graph.node_mut(id);
                node.state = NodeState::Good;
                node.label = NodeLabel::Top;
                node.expanded = true;
                trace!("Node {id} is covered by an ancestor");
                self.propagate_from(&mut state, id);
                return Ok(());
            }
            (node.words.clone(), node.depth)
        };

        // Compute the successor classes outside the lock; only the plant
        // and the automaton are queried, both read-only.
        let classes = self.successor_classes(&words)?;

        let mut state = self.state.lock().expect("search state poisoned");
        if classes.is_empty() {
            let node = state.graph.node_mut(id);
            node.state = NodeState::Dead;
            node.label = NodeLabel::Top;
            node.expanded = true;
            trace!("Node {id} is dead");
            self.propagate_from(&mut state, id);
            return Ok(());
        }
        for (_, (class_words, edges)) in classes {
            let num_words = class_words.len();
            let (child, created) = state.graph.intern(class_words, depth + 1);
            for edge in &edges {
                state.graph.add_edge(id, edge.clone(), child);
            }
            if created {
                if let Some(cap) = self.config.node_cap {
                    if state.graph.len() > cap {
                        state.error.get_or_insert(SearchError::StateSpaceTooLarge(cap));
                        return Ok(());
                    }
                }
                let context = RankContext {
                    depth: depth + 1,
                    num_words,
                    min_increment: edges.iter().map(|(step, _)| *step).min().unwrap_or(0),
                    environment_reachable: edges
                        .iter()
                        .any(|(_, action)| self.environment_actions.contains(action)),
                };
                let rank = self.heuristic.rank(&context);
                let sequence = state.sequence;
                state.sequence += 1;
                state.queue.push(QueueEntry { rank, sequence, id: child });
            }
        }
        state.graph.node_mut(id).expanded = true;
        if self.try_label(&mut state.graph, id) {
            self.propagate_from(&mut state, id);
        }
        Ok(())
    }

    /// Check whether some word of a symbolic state realizes the undesired
    /// behavior.
    fn is_bad(&self, words: &BTreeSet<CanonicalWord<P::Location>>) -> bool {
        words.iter().any(|word| {
            let (plant_configuration, ata_configuration) = word.candidate();
            self.plant.is_accepting_configuration(&plant_configuration)
                && self.ata.is_accepting_configuration(&ata_configuration)
        })
    }

    /// Compute all successor classes of a symbolic state, keyed by the
    /// plant projection of the successor words.
    #[allow(clippy::type_complexity)]
    fn successor_classes(
        &self,
        words: &BTreeSet<CanonicalWord<P::Location>>,
    ) -> Result<
        BTreeMap<
            CanonicalWord<P::Location>,
            (BTreeSet<CanonicalWord<P::Location>>, BTreeSet<(RegionIndex, P::Action)>),
        >,
        SearchError,
    > {
        let mut classes: BTreeMap<
            CanonicalWord<P::Location>,
            (BTreeSet<CanonicalWord<P::Location>>, BTreeSet<(RegionIndex, P::Action)>),
        > = BTreeMap::new();
        let alphabet = self.plant.alphabet();
        for word in words {
            for (increment, time_word) in word.time_successors(&self.regions) {
                let candidate = time_word.candidate();
                for action in &alphabet {
                    let successors = next_canonical_words(
                        self.plant,
                        self.ata,
                        &candidate,
                        action,
                        &self.regions,
                        &self.config,
                        self.location_symbols.as_ref(),
                    )
                    .map_err(|e| SearchError::InvalidCanonicalWord(e.to_string()))?;
                    for successor in successors {
                        let class = successor.plant_projection();
                        let entry = classes.entry(class).or_default();
                        insert_with_domination(&mut entry.0, successor);
                        entry.1.insert((increment, action.clone()));
                    }
                }
            }
        }
        Ok(classes)
    }

    /// Try to determine a node's label from its children.
    ///
    /// The controller wins if one of its actions reaches a winning child
    /// strictly before the environment can reach a losing or undecided
    /// child; the environment wins dually; if all children are decided
    /// and neither player can force anything, waiting wins for the
    /// controller.
    fn try_label(&self, graph: &mut SearchGraph<P::Location, P::Action>, id: NodeId) -> bool {
        const NEVER: RegionIndex = RegionIndex::MAX;
        let node = graph.node(id);
        if node.label != NodeLabel::Unlabeled || !node.expanded {
            return false;
        }
        let mut first_good_controller = NEVER;
        let mut first_bad_environment = NEVER;
        let mut first_undecided_controller = NEVER;
        let mut first_undecided_environment = NEVER;
        for ((step, action), child) in node.edge_pairs() {
            let child_label = graph.node(child).label;
            let controller = self.controller_actions.contains(action);
            match child_label {
                NodeLabel::Top if controller => {
                    first_good_controller = first_good_controller.min(*step);
                }
                NodeLabel::Bottom if !controller => {
                    first_bad_environment = first_bad_environment.min(*step);
                }
                NodeLabel::Unlabeled | NodeLabel::Canceled if controller => {
                    first_undecided_controller = first_undecided_controller.min(*step);
                }
                NodeLabel::Unlabeled | NodeLabel::Canceled => {
                    first_undecided_environment = first_undecided_environment.min(*step);
                }
                _ => {}
            }
        }
        let label = if first_good_controller < first_undecided_environment
            && first_good_controller < first_bad_environment
        {
            Some(NodeLabel::Top)
        } else if first_bad_environment < first_good_controller
            && first_bad_environment < first_undecided_controller
        {
            Some(NodeLabel::Bottom)
        } else if first_good_controller == NEVER
            && first_bad_environment == NEVER
            && first_undecided_controller == NEVER
            && first_undecided_environment == NEVER
        {
            // Everything is decided and neither player can force a
            // result; the controller simply waits.
            Some(NodeLabel::Top)
        } else {
            None
        };
        if let Some(label) = label {
            trace!("Labelling node {id} with {label}");
            graph.node_mut(id).label = label;
            if id == graph.root() {
                self.root_decided.store(true, Ordering::SeqCst);
                debug!("Root decided: {label}");
            }
            true
        } else {
            false
        }
    }

    /// Re-evaluate all ancestors of a freshly labelled node.
    fn propagate_from(&self, state: &mut SearchState<P::Location, P::Action>, id: NodeId) {
        if id == state.graph.root() {
            self.root_decided.store(true, Ordering::SeqCst);
        }
        // Every successful labelling enqueues the labelled node's parents;
        // labels are set at most once, so the worklist drains.
        let mut dirty: VecDeque<NodeId> = state.graph.node(id).parents.iter().copied().collect();
        while let Some(parent) = dirty.pop_front() {
            if self.try_label(&mut state.graph, parent) {
                dirty.extend(state.graph.node(parent).parents.iter().copied());
            }
        }
    }

    /// Resolve the nodes the incremental rules could not decide.
    ///
    /// At quiescence the undecided nodes lie on cycles. The environment
    /// wins on a cycle node if it has an edge to a lost child; everything
    /// else is safe to cycle in forever and won by the controller.
    fn finalize_labels(&self, state: &mut SearchState<P::Location, P::Action>) {
        info!("Finalizing labels of {} nodes", state.graph.len());
        loop {
            let mut changed = false;
            for id in state.graph.node_ids().collect::<Vec<_>>() {
                if self.try_label(&mut state.graph, id) {
                    changed = true;
                }
            }
            if changed {
                continue;
            }
            // Attractor extension: an undecided node with an environment
            // edge into a lost child is lost.
            let mut newly_bottom = Vec::new();
            for id in state.graph.node_ids() {
                let node = state.graph.node(id);
                if node.label != NodeLabel::Unlabeled || !node.expanded {
                    continue;
                }
                let lost = node.edge_pairs().any(|((_, action), child)| {
                    !self.controller_actions.contains(action)
                        && state.graph.node(child).label == NodeLabel::Bottom
                });
                if lost {
                    newly_bottom.push(id);
                }
            }
            if newly_bottom.is_empty() {
                break;
            }
            for id in newly_bottom {
                state.graph.node_mut(id).label = NodeLabel::Bottom;
            }
        }
        // The remaining cycles are safe.
        for id in state.graph.node_ids().collect::<Vec<_>>() {
            let node = state.graph.node_mut(id);
            if node.label == NodeLabel::Unlabeled && node.expanded {
                node.label = NodeLabel::Top;
            }
        }
    }

    pub(crate) fn with_graph<R>(
        &self,
        reader: impl FnOnce(&SearchGraph<P::Location, P::Action>) -> R,
    ) -> R {
        let state = self.state.lock().expect("search state poisoned");
        reader(&state.graph)
    }

    pub(crate) fn regions(&self) -> &Regions {
        &self.regions
    }

    pub(crate) fn plant(&self) -> &P {
        self.plant
    }
}
