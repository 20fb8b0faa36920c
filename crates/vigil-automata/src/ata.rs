//! Alternating timed automata
//!
//! An [`Ata`] runs over timed words. Its configurations are finite sets of
//! (location, clock) states; reading a symbol replaces every state by one
//! minimal model of the transition formula of its location, taking the
//! cartesian union across states. Reading a time delta advances every
//! clock.
//!
//! The automata used by the synthesis search are produced by the
//! specification translator; their locations are formulas of the negated
//! specification.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use vigil_display_utils::braced;

use crate::{ClockValuation, Time, TimedWord, cmp_valuations, is_time_equal};

pub mod formula;

pub use formula::Formula;

/// A single state of an ATA: a location with its own clock.
#[derive(Debug, Clone)]
pub struct AtaState<L> {
    /// The location
    pub location: L,
    /// The clock value of this state
    pub clock_valuation: ClockValuation,
}

impl<L: PartialEq> PartialEq for AtaState<L> {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location
            && cmp_valuations(&self.clock_valuation, &other.clock_valuation).is_eq()
    }
}

impl<L: Eq> Eq for AtaState<L> {}

impl<L: Ord> PartialOrd for AtaState<L> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<L: Ord> Ord for AtaState<L> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.location
            .cmp(&other.location)
            .then(cmp_valuations(&self.clock_valuation, &other.clock_valuation))
    }
}

impl<L: fmt::Display> fmt::Display for AtaState<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.location, self.clock_valuation)
    }
}

/// A configuration of an ATA.
pub type AtaConfiguration<L> = BTreeSet<AtaState<L>>;

/// Error raised by ATA operations.
#[derive(Debug, Clone, PartialEq)]
pub enum AtaError {
    /// A time step with a negative delta was attempted
    NegativeTimeDelta(Time),
    /// A timed word did not start at time zero
    InvalidWordStart(Time),
    /// A transition mentions a symbol outside the alphabet
    UnknownSymbol(String),
}

impl fmt::Display for AtaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtaError::NegativeTimeDelta(delta) => {
                write!(f, "cannot advance time by a negative delta ({delta})")
            }
            AtaError::InvalidWordStart(time) => {
                write!(f, "timed words must start at time 0, got {time}")
            }
            AtaError::UnknownSymbol(symbol) => {
                write!(f, "symbol '{symbol}' is not in the alphabet")
            }
        }
    }
}

impl std::error::Error for AtaError {}

/// An alternating timed automaton.
#[derive(Debug, Clone)]
pub struct Ata<L, S> {
    alphabet: BTreeSet<S>,
    initial_location: L,
    accepting_locations: BTreeSet<L>,
    transitions: BTreeMap<L, BTreeMap<S, Formula<L>>>,
}

impl<L, S> Ata<L, S>
where
    L: Clone + Ord + fmt::Debug,
    S: Clone + Ord + fmt::Debug + fmt::Display,
{
    /// Create a new ATA.
    ///
    /// Transitions are triples of source location, symbol and formula.
    /// Every transition symbol must be in the alphabet.
    pub fn new(
        alphabet: impl IntoIterator<Item = S>,
        initial_location: L,
        accepting_locations: impl IntoIterator<Item = L>,
        transitions: impl IntoIterator<Item = (L, S, Formula<L>)>,
    ) -> Result<Self, AtaError> {
        let alphabet: BTreeSet<S> = alphabet.into_iter().collect();
        let mut transition_map: BTreeMap<L, BTreeMap<S, Formula<L>>> = BTreeMap::new();
        for (source, symbol, formula) in transitions {
            if !alphabet.contains(&symbol) {
                return Err(AtaError::UnknownSymbol(symbol.to_string()));
            }
            transition_map.entry(source).or_default().insert(symbol, formula);
        }
        Ok(Ata {
            alphabet,
            initial_location,
            accepting_locations: accepting_locations.into_iter().collect(),
            transitions: transition_map,
        })
    }

    /// The alphabet of the automaton.
    pub fn alphabet(&self) -> &BTreeSet<S> {
        &self.alphabet
    }

    /// The initial location.
    pub fn initial_location(&self) -> &L {
        &self.initial_location
    }

    /// The accepting locations.
    pub fn accepting_locations(&self) -> &BTreeSet<L> {
        &self.accepting_locations
    }

    /// The initial configuration: the initial location with clock zero.
    pub fn initial_configuration(&self) -> AtaConfiguration<L> {
        AtaConfiguration::from([AtaState {
            location: self.initial_location.clone(),
            clock_valuation: 0.0,
        }])
    }

    /// Check whether every state of a configuration is accepting.
    ///
    /// The empty configuration is accepting: it has discharged all
    /// obligations.
    pub fn is_accepting_configuration(&self, configuration: &AtaConfiguration<L>) -> bool {
        configuration
            .iter()
            .all(|state| self.accepting_locations.contains(&state.location))
    }

    /// Compute all successor configurations after reading a symbol.
    ///
    /// Every state is replaced by one minimal model of its location's
    /// transition formula; the result is the cartesian union over all
    /// states. A state whose location has no transition for the symbol
    /// blocks, yielding no successors at all.
    pub fn symbol_step(
        &self,
        configuration: &AtaConfiguration<L>,
        symbol: &S,
    ) -> BTreeSet<AtaConfiguration<L>> {
        let mut per_state_models: Vec<BTreeSet<AtaConfiguration<L>>> = Vec::new();
        if configuration.is_empty() {
            // The empty configuration has no obligations; the empty model
            // is its only successor.
            per_state_models.push(BTreeSet::from([AtaConfiguration::new()]));
        }
        for state in configuration {
            let models = self
                .transitions
                .get(&state.location)
                .and_then(|by_symbol| by_symbol.get(symbol))
                .map(|formula| formula.minimal_models(state.clock_valuation))
                .unwrap_or_default();
            per_state_models.push(models);
        }
        let mut configurations = BTreeSet::from([AtaConfiguration::new()]);
        for state_models in per_state_models {
            let mut expanded = BTreeSet::new();
            for state_model in &state_models {
                for configuration in &configurations {
                    let mut union = configuration.clone();
                    union.extend(state_model.iter().cloned());
                    expanded.insert(union);
                }
            }
            configurations = expanded;
        }
        configurations
    }

    /// Advance every clock of a configuration by a time delta.
    pub fn time_step(
        &self,
        configuration: &AtaConfiguration<L>,
        delta: Time,
    ) -> Result<AtaConfiguration<L>, AtaError> {
        if delta < 0.0 {
            return Err(AtaError::NegativeTimeDelta(delta));
        }
        Ok(configuration
            .iter()
            .map(|state| AtaState {
                location: state.location.clone(),
                clock_valuation: state.clock_valuation + delta,
            })
            .collect())
    }

    /// Check whether the automaton accepts a finite timed word.
    ///
    /// The word's first timestamp must be zero. The word is accepted if
    /// some run ends in a configuration consisting of accepting locations
    /// only.
    pub fn accepts_word(&self, word: &TimedWord<S>) -> Result<bool, AtaError> {
        let Some((first_symbol, first_time)) = word.first() else {
            return Ok(false);
        };
        if !is_time_equal(*first_time, 0.0) {
            return Err(AtaError::InvalidWordStart(*first_time));
        }
        let mut configurations = self.symbol_step(&self.initial_configuration(), first_symbol);
        let mut last_time = *first_time;
        for (symbol, time) in word.iter().skip(1) {
            let mut next = BTreeSet::new();
            for configuration in &configurations {
                let elapsed = self.time_step(configuration, time - last_time)?;
                next.extend(self.symbol_step(&elapsed, symbol));
            }
            configurations = next;
            last_time = *time;
        }
        Ok(configurations
            .iter()
            .any(|configuration| self.is_accepting_configuration(configuration)))
    }
}

impl<L, S> fmt::Display for Ata<L, S>
where
    L: Clone + Ord + fmt::Debug + fmt::Display,
    S: Clone + Ord + fmt::Debug + fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "alphabet: {}", braced(self.alphabet.iter()))?;
        writeln!(f, "initial location: {}", self.initial_location)?;
        writeln!(f, "accepting locations: {}", braced(self.accepting_locations.iter()))?;
        writeln!(f, "transitions:")?;
        for (source, by_symbol) in &self.transitions {
            for (symbol, formula) in by_symbol {
                writeln!(f, "  {source} --[{symbol}]--> {formula}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClockConstraint;

    /// An ATA over {a} with locations q0 (initial) and q1 (accepting):
    /// q0 --a--> q0 && x.q1, q1 --a--> x <= 1
    fn small_ata() -> Ata<String, String> {
        Ata::new(
            ["a".to_string()],
            "q0".to_string(),
            ["q1".to_string()],
            [
                (
                    "q0".to_string(),
                    "a".to_string(),
                    Formula::and(
                        Formula::Location("q0".to_string()),
                        Formula::reset(Formula::Location("q1".to_string())),
                    ),
                ),
                (
                    "q1".to_string(),
                    "a".to_string(),
                    Formula::ClockConstraint(ClockConstraint::less_equal(1)),
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn symbol_step_takes_cartesian_union() {
        let ata = small_ata();
        let successors = ata.symbol_step(&ata.initial_configuration(), &"a".to_string());
        assert_eq!(successors.len(), 1);
        let successor = successors.into_iter().next().unwrap();
        assert_eq!(successor.len(), 2);
        assert!(successor.contains(&AtaState { location: "q0".to_string(), clock_valuation: 0.0 }));
        assert!(successor.contains(&AtaState { location: "q1".to_string(), clock_valuation: 0.0 }));
    }

    #[test]
    fn blocked_state_kills_the_configuration() {
        let ata = small_ata();
        let configuration =
            AtaConfiguration::from([AtaState { location: "q1".to_string(), clock_valuation: 2.0 }]);
        // q1's transition formula is x <= 1, unsatisfiable at 2.0
        assert!(ata.symbol_step(&configuration, &"a".to_string()).is_empty());
    }

    #[test]
    fn empty_configuration_steps_to_itself() {
        let ata = small_ata();
        let successors = ata.symbol_step(&AtaConfiguration::new(), &"a".to_string());
        assert_eq!(successors, BTreeSet::from([AtaConfiguration::new()]));
    }

    #[test]
    fn time_steps_reject_negative_deltas() {
        let ata = small_ata();
        assert!(ata.time_step(&ata.initial_configuration(), -1.0).is_err());
        let advanced = ata.time_step(&ata.initial_configuration(), 0.5).unwrap();
        assert!(advanced
            .contains(&AtaState { location: "q0".to_string(), clock_valuation: 0.5 }));
    }

    #[test]
    fn word_acceptance_requires_accepting_locations_only() {
        let ata = small_ata();
        // After one symbol the configuration contains q0, which is not
        // accepting.
        assert!(!ata.accepts_word(&vec![("a".to_string(), 0.0)]).unwrap());
        assert!(ata
            .accepts_word(&vec![("a".to_string(), 0.5)])
            .is_err());
    }
}
