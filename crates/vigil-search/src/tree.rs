//! The search graph
//!
//! Nodes are hash-consed by their set of canonical words and stored in an
//! arena; [`NodeId`] indices replace owning pointers, so the graph may
//! freely contain back edges. Edges carry the region increment and the
//! action taken; several edges may lead to the same child.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;

use vigil_automata::regions::RegionIndex;

use crate::canonical_word::CanonicalWord;

/// Index of a node in the search graph arena.
pub type NodeId = usize;

/// Exploration state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Not explored yet
    Unknown,
    /// Covered by an ancestor; no undesired behavior can be forced
    Good,
    /// The undesired behavior is realized in this node
    Bad,
    /// The node has no successors
    Dead,
}

/// Game label of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLabel {
    /// Not labelled yet
    Unlabeled,
    /// The controller wins from this node
    Top,
    /// The environment wins from this node
    Bottom,
    /// The search was cancelled before the node was labelled
    Canceled,
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeLabel::Unlabeled => write!(f, "?"),
            NodeLabel::Top => write!(f, "TOP"),
            NodeLabel::Bottom => write!(f, "BOTTOM"),
            NodeLabel::Canceled => write!(f, "CANCELED"),
        }
    }
}

/// A node of the search graph.
#[derive(Debug, Clone)]
pub struct Node<L, A> {
    /// The symbolic state: canonical words of one plant projection class
    pub words: BTreeSet<CanonicalWord<L>>,
    /// Exploration state
    pub state: NodeState,
    /// Game label
    pub label: NodeLabel,
    /// Whether successors of this node have been computed
    pub expanded: bool,
    /// Distance from the root at first discovery
    pub depth: usize,
    /// All nodes with an edge into this node
    pub parents: BTreeSet<NodeId>,
    /// Outgoing edges: (region increment, action) to the reached children.
    /// A nondeterministic plant can reach several children with one label.
    pub edges: BTreeMap<(RegionIndex, A), BTreeSet<NodeId>>,
}

impl<L, A> Node<L, A>
where
    L: Clone + Ord + fmt::Debug + fmt::Display,
    A: Clone + Ord + fmt::Debug + fmt::Display,
{
    fn new(words: BTreeSet<CanonicalWord<L>>, depth: usize) -> Self {
        Node {
            words,
            state: NodeState::Unknown,
            label: NodeLabel::Unlabeled,
            expanded: false,
            depth,
            parents: BTreeSet::new(),
            edges: BTreeMap::new(),
        }
    }

    /// The edge labels leading from this node to one particular child.
    pub fn edges_to(&self, child: NodeId) -> impl Iterator<Item = &(RegionIndex, A)> {
        self.edges
            .iter()
            .filter(move |(_, targets)| targets.contains(&child))
            .map(|(edge, _)| edge)
    }

    /// Iterate over all (edge label, child) pairs.
    pub fn edge_pairs(&self) -> impl Iterator<Item = (&(RegionIndex, A), NodeId)> {
        self.edges
            .iter()
            .flat_map(|(edge, targets)| targets.iter().map(move |target| (edge, *target)))
    }

    /// The distinct children of this node.
    pub fn children(&self) -> BTreeSet<NodeId> {
        self.edges.values().flatten().copied().collect()
    }
}

/// The arena of all search nodes, hash-consed by word set.
#[derive(Debug)]
pub struct SearchGraph<L, A> {
    nodes: Vec<Node<L, A>>,
    index: HashMap<BTreeSet<CanonicalWord<L>>, NodeId>,
}

impl<L, A> SearchGraph<L, A>
where
    L: Clone + Ord + std::hash::Hash + fmt::Debug + fmt::Display,
    A: Clone + Ord + fmt::Debug + fmt::Display,
{
    /// Create a graph containing only the root node.
    pub fn new(root_words: BTreeSet<CanonicalWord<L>>) -> Self {
        let root = Node::new(root_words.clone(), 0);
        SearchGraph { nodes: vec![root], index: HashMap::from([(root_words, 0)]) }
    }

    /// The root node id.
    pub fn root(&self) -> NodeId {
        0
    }

    /// The number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph is empty. It never is; the root always exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Access a node.
    pub fn node(&self, id: NodeId) -> &Node<L, A> {
        &self.nodes[id]
    }

    /// Mutably access a node.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node<L, A> {
        &mut self.nodes[id]
    }

    /// Iterate over all node ids.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        0..self.nodes.len()
    }

    /// Find or create the node for a word set. Returns the id and whether
    /// the node was newly created.
    pub fn intern(&mut self, words: BTreeSet<CanonicalWord<L>>, depth: usize) -> (NodeId, bool) {
        if let Some(&id) = self.index.get(&words) {
            return (id, false);
        }
        let id = self.nodes.len();
        self.nodes.push(Node::new(words.clone(), depth));
        self.index.insert(words, id);
        (id, true)
    }

    /// Add an edge between two nodes.
    pub fn add_edge(&mut self, parent: NodeId, edge: (RegionIndex, A), child: NodeId) {
        self.nodes[parent].edges.entry(edge).or_default().insert(child);
        self.nodes[child].parents.insert(parent);
    }

    /// Check whether any ancestor of a node covers all of the node's
    /// words, i.e. has, for every word, a word with at least the same
    /// obligations.
    pub fn is_covered_by_ancestor(&self, id: NodeId) -> bool {
        let mut visited = BTreeSet::from([id]);
        let mut queue: VecDeque<NodeId> = self.nodes[id].parents.iter().copied().collect();
        while let Some(ancestor) = queue.pop_front() {
            if !visited.insert(ancestor) {
                continue;
            }
            let ancestor_words = &self.nodes[ancestor].words;
            if self.nodes[id]
                .words
                .iter()
                .all(|word| ancestor_words.iter().any(|candidate| word.is_covered_by(candidate)))
            {
                return true;
            }
            queue.extend(self.nodes[ancestor].parents.iter().copied());
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical_word::{AbRegionSymbol, PlantRegionState};

    fn word(location: &str, region: RegionIndex) -> CanonicalWord<String> {
        CanonicalWord::from_groups(vec![vec![AbRegionSymbol::Plant(PlantRegionState {
            location: location.to_string(),
            clock: "x".to_string(),
            region_index: region,
        })]])
    }

    #[test]
    fn interning_deduplicates_word_sets() {
        let mut graph = SearchGraph::<String, String>::new(BTreeSet::from([word("l0", 0)]));
        let (a, created_a) = graph.intern(BTreeSet::from([word("l1", 1)]), 1);
        let (b, created_b) = graph.intern(BTreeSet::from([word("l1", 1)]), 2);
        assert!(created_a);
        assert!(!created_b);
        assert_eq!(a, b);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn edges_link_parents_and_children() {
        let mut graph = SearchGraph::<String, String>::new(BTreeSet::from([word("l0", 0)]));
        let (child, _) = graph.intern(BTreeSet::from([word("l1", 1)]), 1);
        graph.add_edge(graph.root(), (0, "a".to_string()), child);
        graph.add_edge(graph.root(), (2, "a".to_string()), child);
        assert_eq!(graph.node(child).parents, BTreeSet::from([0]));
        assert_eq!(graph.node(graph.root()).children(), BTreeSet::from([child]));
        assert_eq!(graph.node(graph.root()).edges_to(child).count(), 2);
    }

    #[test]
    fn ancestor_coverage_walks_back_references() {
        let root_words = BTreeSet::from([word("l0", 0)]);
        let mut graph = SearchGraph::<String, String>::new(root_words.clone());
        let (child, _) = graph.intern(root_words, 1);
        // The child was interned to the same node as the root.
        assert_eq!(child, graph.root());
        let (other, _) = graph.intern(BTreeSet::from([word("l0", 0), word("l0", 1)]), 1);
        graph.add_edge(graph.root(), (1, "a".to_string()), other);
        assert!(!graph.is_covered_by_ancestor(graph.root()));
        // A descendant whose words all reappear in an ancestor is covered.
        let (descendant, _) = graph.intern(BTreeSet::from([word("l0", 1)]), 2);
        graph.add_edge(other, (1, "a".to_string()), descendant);
        assert!(graph.is_covered_by_ancestor(descendant));
    }
}
