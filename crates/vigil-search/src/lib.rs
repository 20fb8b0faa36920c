//! Symbolic game search for controller synthesis
//!
//! This crate contains the synthesis core: a plant (any implementation of
//! the [`Plant`] trait) is composed with an alternating timed automaton
//! accepting the undesired behaviors, and the regionalized product is
//! explored as a two-player game between the controller and the
//! environment. The search labels every reachable symbolic state as won by
//! the controller ([`tree::NodeLabel::Top`]) or by the environment
//! ([`tree::NodeLabel::Bottom`]); a winning root yields a controller via
//! [`controller::create_controller`].
//!
//! The symbolic states are canonical words ([`canonical_word`]): finite
//! representatives of the uncountably many clock valuations of the product
//! configuration, built from the region abstraction and the order of the
//! clocks' fractional parts.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::Hash;

use vigil_automata::ta::{Configuration, SymbolStep, TimedAutomaton};
use vigil_logic::AtomicProposition;

pub mod canonical_word;
pub mod controller;
pub mod heuristics;
pub mod search;
pub mod successors;
pub mod tree;

/// The plant to be controlled.
///
/// Implementations must answer successor queries concurrently; the search
/// may call them from several workers at once.
pub trait Plant: Sync {
    /// The location type of the plant
    type Location: Clone + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;
    /// The action type of the plant
    type Action: Clone + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// The configuration the plant starts in.
    fn initial_configuration(&self) -> Configuration<Self::Location>;

    /// The clocks of the plant. Every configuration valuates exactly these.
    fn clocks(&self) -> BTreeSet<String>;

    /// All actions the plant can ever take.
    fn alphabet(&self) -> BTreeSet<Self::Action>;

    /// All successors of a configuration under an action, together with
    /// the clocks the respective transition resets.
    ///
    /// The same input must always produce the same successor set.
    fn symbol_step(
        &self,
        configuration: &Configuration<Self::Location>,
        action: &Self::Action,
    ) -> Vec<SymbolStep<Self::Location>>;

    /// Whether a configuration is accepting.
    ///
    /// Undesired behavior only counts once the plant is in an accepting
    /// configuration at the same time as the specification automaton.
    fn is_accepting_configuration(&self, configuration: &Configuration<Self::Location>) -> bool;

    /// The largest constant appearing in the plant's guards.
    fn largest_constant(&self) -> u32;
}

impl<L, A> Plant for TimedAutomaton<L, A>
where
    L: Clone + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static,
    A: Clone + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static,
{
    type Location = L;
    type Action = A;

    fn initial_configuration(&self) -> Configuration<L> {
        TimedAutomaton::initial_configuration(self)
    }

    fn clocks(&self) -> BTreeSet<String> {
        TimedAutomaton::clocks(self).clone()
    }

    fn alphabet(&self) -> BTreeSet<A> {
        TimedAutomaton::alphabet(self).clone()
    }

    fn symbol_step(&self, configuration: &Configuration<L>, action: &A) -> Vec<SymbolStep<L>> {
        TimedAutomaton::symbol_step(self, configuration, action)
    }

    fn is_accepting_configuration(&self, configuration: &Configuration<L>) -> bool {
        TimedAutomaton::is_accepting_configuration(self, configuration)
    }

    fn largest_constant(&self) -> u32 {
        TimedAutomaton::largest_constant(self)
    }
}

/// Projection of plant locations to specification propositions.
///
/// With [`SearchConfig::location_constraints`] enabled, the specification
/// automaton reads the proposition of the location the plant moves into
/// instead of the action name.
pub type LocationSymbols<L> = Box<dyn Fn(&L) -> AtomicProposition + Send + Sync>;

/// Project every location to the proposition carrying its display name.
pub fn location_names<L: fmt::Display + 'static>() -> LocationSymbols<L> {
    Box::new(|location| AtomicProposition::new(location.to_string()))
}

/// Value-level capabilities of a search run.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Feed the specification automaton location propositions instead of
    /// action names
    pub location_constraints: bool,
    /// Collapse duplicate symbols within a canonical word group
    pub set_semantics: bool,
    /// Abort once this many nodes exist; `None` means unbounded
    pub node_cap: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig { location_constraints: false, set_semantics: false, node_cap: None }
    }
}

/// Errors of search setup and execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// Controller and environment actions overlap
    OverlappingActions(Vec<String>),
    /// An action belongs to neither player
    UnassignedAction(String),
    /// The plant has no clocks
    PlantWithoutClocks,
    /// The specification alphabet is empty
    EmptyAlphabet,
    /// Location constraints were requested without a location projection
    MissingLocationSymbols,
    /// The symbolic state space exceeded the configured cap
    StateSpaceTooLarge(usize),
    /// A canonical word violated one of its invariants; this is a bug
    InvalidCanonicalWord(String),
    /// The search reached an inconsistent state; this is a bug
    Internal(String),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::OverlappingActions(actions) => write!(
                f,
                "actions assigned to both players: {}",
                actions.join(", ")
            ),
            SearchError::UnassignedAction(action) => {
                write!(f, "plant action '{action}' is assigned to neither player")
            }
            SearchError::PlantWithoutClocks => write!(f, "plants without clocks are not supported"),
            SearchError::EmptyAlphabet => write!(f, "the specification alphabet is empty"),
            SearchError::MissingLocationSymbols => write!(
                f,
                "location constraints require a projection from locations to propositions"
            ),
            SearchError::StateSpaceTooLarge(cap) => {
                write!(f, "the symbolic state space exceeded the cap of {cap} nodes")
            }
            SearchError::InvalidCanonicalWord(message) => {
                write!(f, "invalid canonical word: {message}")
            }
            SearchError::Internal(message) => write!(f, "internal search error: {message}"),
        }
    }
}

impl std::error::Error for SearchError {}
