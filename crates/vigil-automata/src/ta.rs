//! Timed automata with guarded, resetting transitions
//!
//! A [`TimedAutomaton`] consists of locations, an alphabet, clocks and
//! transitions. Transitions carry atomic clock constraints as guards and a
//! set of clocks to reset. The automaton validates every added transition
//! against its declared locations, symbols and clocks, so a fully
//! constructed automaton is internally consistent.
//!
//! A simple automaton with one guarded transition:
//!
//! ```
//! use vigil_automata::ta::{TimedAutomaton, Transition};
//! use vigil_automata::ClockConstraint;
//!
//! let mut ta = TimedAutomaton::new(
//!     ["a".to_string()],
//!     "s0".to_string(),
//!     ["s1".to_string()],
//! );
//! ta.add_clock("x");
//! ta.add_transition(Transition::new(
//!     "s0".to_string(),
//!     "a".to_string(),
//!     "s1".to_string(),
//!     vec![("x".to_string(), ClockConstraint::less(1))],
//!     ["x".to_string()],
//! ))
//! .unwrap();
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use vigil_display_utils::{braced, comma_joined};

use crate::{ClockConstraint, ClockValuation, Time, TimedWord, cmp_valuations};

pub mod product;

/// A configuration of a timed automaton: a location and one valuation per
/// clock.
#[derive(Debug, Clone)]
pub struct Configuration<L> {
    /// The current location
    pub location: L,
    /// The valuation of every clock, keyed by clock name
    pub clock_valuations: BTreeMap<String, ClockValuation>,
}

impl<L: PartialEq> PartialEq for Configuration<L> {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location
            && self.clock_valuations.len() == other.clock_valuations.len()
            && self
                .clock_valuations
                .iter()
                .zip(other.clock_valuations.iter())
                .all(|((n1, v1), (n2, v2))| n1 == n2 && cmp_valuations(v1, v2).is_eq())
    }
}

impl<L: Eq> Eq for Configuration<L> {}

impl<L: Ord> PartialOrd for Configuration<L> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<L: Ord> Ord for Configuration<L> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.location.cmp(&other.location).then_with(|| {
            let mut lhs = self.clock_valuations.iter();
            let mut rhs = other.clock_valuations.iter();
            loop {
                match (lhs.next(), rhs.next()) {
                    (None, None) => return std::cmp::Ordering::Equal,
                    (None, Some(_)) => return std::cmp::Ordering::Less,
                    (Some(_), None) => return std::cmp::Ordering::Greater,
                    (Some((n1, v1)), Some((n2, v2))) => {
                        let ord = n1.cmp(n2).then(cmp_valuations(v1, v2));
                        if !ord.is_eq() {
                            return ord;
                        }
                    }
                }
            }
        })
    }
}

impl<L: fmt::Display> fmt::Display for Configuration<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clocks = comma_joined(
            self.clock_valuations.iter().map(|(n, v)| format!("{n}: {v}")),
            ", ",
        );
        write!(f, "({}, {{{clocks}}})", self.location)
    }
}

/// One successor of a symbol step: the reached configuration and the clocks
/// the taken transition reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolStep<L> {
    /// The configuration after taking the transition
    pub target: Configuration<L>,
    /// The clocks the transition reset
    pub resets: BTreeSet<String>,
}

/// A transition of a timed automaton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<L, A> {
    /// The source location
    pub source: L,
    /// The symbol read by the transition
    pub symbol: A,
    /// The target location
    pub target: L,
    /// Guards, given as pairs of clock name and atomic constraint
    pub guards: Vec<(String, ClockConstraint)>,
    /// The clocks reset when taking the transition
    pub resets: BTreeSet<String>,
}

impl<L, A> Transition<L, A> {
    /// Create a new transition.
    pub fn new(
        source: L,
        symbol: A,
        target: L,
        guards: Vec<(String, ClockConstraint)>,
        resets: impl IntoIterator<Item = String>,
    ) -> Self {
        Transition {
            source,
            symbol,
            target,
            guards,
            resets: resets.into_iter().collect(),
        }
    }

    /// Create an unguarded transition without resets.
    pub fn unguarded(source: L, symbol: A, target: L) -> Self {
        Transition::new(source, symbol, target, vec![], [])
    }
}

impl<L, A: PartialEq> Transition<L, A> {
    /// Check whether the transition is enabled for the given symbol and
    /// clock valuations.
    pub fn is_enabled(&self, symbol: &A, clock_valuations: &BTreeMap<String, ClockValuation>) -> bool {
        if *symbol != self.symbol {
            return false;
        }
        self.guards.iter().all(|(clock, constraint)| {
            clock_valuations
                .get(clock)
                .is_some_and(|valuation| constraint.is_satisfied(*valuation))
        })
    }
}

impl<L: fmt::Display, A: fmt::Display> fmt::Display for Transition<L, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guards = comma_joined(
            self.guards.iter().map(|(c, g)| format!("{c} {g}")),
            " && ",
        );
        write!(
            f,
            "{} --[{}]--> {} when [{}] reset {}",
            self.source,
            self.symbol,
            self.target,
            guards,
            braced(self.resets.iter()),
        )
    }
}

/// Error raised when an invalid transition is added to a timed automaton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaError {
    /// The transition reads a symbol outside the alphabet
    UnknownSymbol(String),
    /// The transition mentions an undeclared location
    UnknownLocation(String),
    /// A guard or reset mentions an undeclared clock
    UnknownClock(String),
}

impl fmt::Display for TaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaError::UnknownSymbol(s) => write!(f, "symbol '{s}' is not in the alphabet"),
            TaError::UnknownLocation(l) => write!(f, "location '{l}' has not been declared"),
            TaError::UnknownClock(c) => write!(f, "clock '{c}' has not been declared"),
        }
    }
}

impl std::error::Error for TaError {}

/// A timed automaton.
#[derive(Debug, Clone)]
pub struct TimedAutomaton<L, A> {
    alphabet: BTreeSet<A>,
    locations: BTreeSet<L>,
    initial_location: L,
    final_locations: BTreeSet<L>,
    clocks: BTreeSet<String>,
    transitions: BTreeMap<L, Vec<Transition<L, A>>>,
}

impl<L, A> TimedAutomaton<L, A>
where
    L: Clone + Ord + fmt::Debug + fmt::Display,
    A: Clone + Ord + fmt::Debug + fmt::Display,
{
    /// Create a new timed automaton.
    ///
    /// The initial and final locations are declared implicitly; further
    /// locations, clocks and transitions are added afterwards.
    pub fn new(
        alphabet: impl IntoIterator<Item = A>,
        initial_location: L,
        final_locations: impl IntoIterator<Item = L>,
    ) -> Self {
        let final_locations: BTreeSet<L> = final_locations.into_iter().collect();
        let mut locations: BTreeSet<L> = final_locations.iter().cloned().collect();
        locations.insert(initial_location.clone());
        TimedAutomaton {
            alphabet: alphabet.into_iter().collect(),
            locations,
            initial_location,
            final_locations,
            clocks: BTreeSet::new(),
            transitions: BTreeMap::new(),
        }
    }

    /// Declare a location.
    pub fn add_location(&mut self, location: L) {
        self.locations.insert(location);
    }

    /// Declare a clock.
    pub fn add_clock(&mut self, name: impl ToString) {
        self.clocks.insert(name.to_string());
    }

    /// Declare a symbol.
    pub fn add_symbol(&mut self, symbol: A) {
        self.alphabet.insert(symbol);
    }

    /// Mark a location as final, declaring it if necessary.
    pub fn add_final_location(&mut self, location: L) {
        self.locations.insert(location.clone());
        self.final_locations.insert(location);
    }

    /// Add a transition.
    ///
    /// The transition may only mention declared locations, symbols and
    /// clocks.
    pub fn add_transition(&mut self, transition: Transition<L, A>) -> Result<(), TaError> {
        if !self.alphabet.contains(&transition.symbol) {
            return Err(TaError::UnknownSymbol(transition.symbol.to_string()));
        }
        if !self.locations.contains(&transition.source) {
            return Err(TaError::UnknownLocation(transition.source.to_string()));
        }
        if !self.locations.contains(&transition.target) {
            return Err(TaError::UnknownLocation(transition.target.to_string()));
        }
        for (clock, _) in &transition.guards {
            if !self.clocks.contains(clock) {
                return Err(TaError::UnknownClock(clock.clone()));
            }
        }
        for clock in &transition.resets {
            if !self.clocks.contains(clock) {
                return Err(TaError::UnknownClock(clock.clone()));
            }
        }
        self.transitions
            .entry(transition.source.clone())
            .or_default()
            .push(transition);
        Ok(())
    }

    /// The alphabet of the automaton.
    pub fn alphabet(&self) -> &BTreeSet<A> {
        &self.alphabet
    }

    /// The declared clocks.
    pub fn clocks(&self) -> &BTreeSet<String> {
        &self.clocks
    }

    /// The declared locations.
    pub fn locations(&self) -> &BTreeSet<L> {
        &self.locations
    }

    /// The initial location.
    pub fn initial_location(&self) -> &L {
        &self.initial_location
    }

    /// Check whether a location is final.
    pub fn is_final_location(&self, location: &L) -> bool {
        self.final_locations.contains(location)
    }

    /// All transitions, in source-location order.
    pub fn transitions(&self) -> impl Iterator<Item = &Transition<L, A>> {
        self.transitions.values().flatten()
    }

    /// The initial configuration: the initial location with all clocks at
    /// zero.
    pub fn initial_configuration(&self) -> Configuration<L> {
        Configuration {
            location: self.initial_location.clone(),
            clock_valuations: self.clocks.iter().map(|c| (c.clone(), 0.0)).collect(),
        }
    }

    /// Check whether a configuration is in a final location.
    pub fn is_accepting_configuration(&self, configuration: &Configuration<L>) -> bool {
        self.final_locations.contains(&configuration.location)
    }

    /// The largest constant appearing in any guard.
    pub fn largest_constant(&self) -> u32 {
        self.transitions()
            .flat_map(|t| t.guards.iter().map(|(_, g)| g.comparand))
            .max()
            .unwrap_or(0)
    }

    /// Compute all successors of a configuration under a symbol.
    ///
    /// Every enabled transition contributes one successor with its resets
    /// applied; the reset set is reported alongside the reached
    /// configuration.
    pub fn symbol_step(&self, configuration: &Configuration<L>, symbol: &A) -> Vec<SymbolStep<L>> {
        let mut successors = Vec::new();
        let Some(outgoing) = self.transitions.get(&configuration.location) else {
            return successors;
        };
        for transition in outgoing {
            if !transition.is_enabled(symbol, &configuration.clock_valuations) {
                continue;
            }
            let mut clock_valuations = configuration.clock_valuations.clone();
            for clock in &transition.resets {
                clock_valuations.insert(clock.clone(), 0.0);
            }
            successors.push(SymbolStep {
                target: Configuration { location: transition.target.clone(), clock_valuations },
                resets: transition.resets.clone(),
            });
        }
        successors
    }

    /// Advance all clocks of a configuration by a time delta.
    pub fn time_step(&self, configuration: &Configuration<L>, delta: Time) -> Configuration<L> {
        Configuration {
            location: configuration.location.clone(),
            clock_valuations: configuration
                .clock_valuations
                .iter()
                .map(|(n, v)| (n.clone(), v + delta))
                .collect(),
        }
    }

    /// Check whether the automaton accepts a finite timed word.
    ///
    /// Timestamps are absolute and must be monotone. The word is accepted
    /// if some run ends in a final location.
    pub fn accepts_word(&self, word: &TimedWord<A>) -> bool {
        let mut current: Vec<(Configuration<L>, Time)> =
            vec![(self.initial_configuration(), 0.0)];
        for (symbol, time) in word {
            let mut next = Vec::new();
            for (configuration, last_time) in &current {
                if time < last_time {
                    continue;
                }
                let elapsed = self.time_step(configuration, time - last_time);
                for step in self.symbol_step(&elapsed, symbol) {
                    next.push((step.target, *time));
                }
            }
            if next.is_empty() {
                return false;
            }
            current = next;
        }
        current
            .iter()
            .any(|(configuration, _)| self.is_accepting_configuration(configuration))
    }
}

impl<L, A> fmt::Display for TimedAutomaton<L, A>
where
    L: Clone + Ord + fmt::Debug + fmt::Display,
    A: Clone + Ord + fmt::Debug + fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "alphabet: {}", braced(self.alphabet.iter()))?;
        writeln!(f, "clocks: {}", braced(self.clocks.iter()))?;
        writeln!(f, "initial location: {}", self.initial_location)?;
        writeln!(f, "final locations: {}", braced(self.final_locations.iter()))?;
        writeln!(f, "transitions:")?;
        for transition in self.transitions() {
            writeln!(f, "  {transition}")?;
        }
        Ok(())
    }
}

impl<L: Hash> Hash for Configuration<L> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.location.hash(state);
        for (name, valuation) in &self.clock_valuations {
            name.hash(state);
            valuation.to_bits().hash(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_location_ta() -> TimedAutomaton<String, String> {
        let mut ta = TimedAutomaton::new(
            ["a".to_string(), "b".to_string()],
            "s0".to_string(),
            ["s1".to_string()],
        );
        ta.add_clock("x");
        ta.add_transition(Transition::new(
            "s0".to_string(),
            "a".to_string(),
            "s1".to_string(),
            vec![("x".to_string(), ClockConstraint::greater_equal(1))],
            ["x".to_string()],
        ))
        .unwrap();
        ta
    }

    #[test]
    fn transition_validation_rejects_unknown_components() {
        let mut ta = two_location_ta();
        let err = ta
            .add_transition(Transition::unguarded(
                "s0".to_string(),
                "c".to_string(),
                "s1".to_string(),
            ))
            .unwrap_err();
        assert_eq!(err, TaError::UnknownSymbol("c".to_string()));
        let err = ta
            .add_transition(Transition::new(
                "s0".to_string(),
                "a".to_string(),
                "s1".to_string(),
                vec![("y".to_string(), ClockConstraint::less(1))],
                [],
            ))
            .unwrap_err();
        assert_eq!(err, TaError::UnknownClock("y".to_string()));
    }

    #[test]
    fn symbol_step_respects_guards_and_resets() {
        let ta = two_location_ta();
        let initial = ta.initial_configuration();
        assert!(ta.symbol_step(&initial, &"a".to_string()).is_empty());

        let later = ta.time_step(&initial, 1.5);
        let successors = ta.symbol_step(&later, &"a".to_string());
        assert_eq!(successors.len(), 1);
        assert_eq!(successors[0].target.location, "s1");
        assert_eq!(successors[0].target.clock_valuations["x"], 0.0);
        assert_eq!(successors[0].resets, BTreeSet::from(["x".to_string()]));
    }

    #[test]
    fn word_acceptance() {
        let ta = two_location_ta();
        assert!(ta.accepts_word(&vec![("a".to_string(), 1.0)]));
        assert!(!ta.accepts_word(&vec![("a".to_string(), 0.5)]));
        assert!(!ta.accepts_word(&vec![("b".to_string(), 2.0)]));
    }

    #[test]
    fn largest_constant_over_guards() {
        let ta = two_location_ta();
        assert_eq!(ta.largest_constant(), 1);
    }
}
