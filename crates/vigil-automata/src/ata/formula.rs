//! Positive boolean transition formulas of alternating timed automata
//!
//! A transition of an ATA maps a (location, symbol) pair to a [`Formula`]
//! over locations. The formula decides which configurations the automaton
//! may continue in: its *minimal models* are the smallest sets of
//! (location, clock) states making the formula true at the current clock
//! value.

use std::collections::BTreeSet;
use std::fmt;

use crate::ata::{AtaConfiguration, AtaState};
use crate::{ClockConstraint, ClockValuation};

/// A positive boolean formula over ATA locations.
///
/// `Reset` evaluates its subformula with the clock set to zero, which is
/// how a transition spawns states with a fresh clock.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Formula<L> {
    /// Always true; its only minimal model is the empty configuration
    True,
    /// Always false; it has no models
    False,
    /// The configuration must contain the location at the current clock
    /// value
    Location(L),
    /// The current clock value must satisfy the constraint
    ClockConstraint(ClockConstraint),
    /// The subformula is evaluated with the clock reset to zero
    Reset(Box<Formula<L>>),
    /// Both subformulas must hold
    And(Box<Formula<L>>, Box<Formula<L>>),
    /// At least one subformula must hold
    Or(Box<Formula<L>>, Box<Formula<L>>),
}

impl<L> Formula<L> {
    /// Conjunction of two formulas.
    pub fn and(lhs: Formula<L>, rhs: Formula<L>) -> Self {
        Formula::And(Box::new(lhs), Box::new(rhs))
    }

    /// Disjunction of two formulas.
    pub fn or(lhs: Formula<L>, rhs: Formula<L>) -> Self {
        Formula::Or(Box::new(lhs), Box::new(rhs))
    }

    /// Reset wrapper around a formula.
    pub fn reset(inner: Formula<L>) -> Self {
        Formula::Reset(Box::new(inner))
    }
}

impl<L: Clone + Ord> Formula<L> {
    /// Check whether a configuration satisfies the formula at the given
    /// clock value.
    pub fn is_satisfied(&self, states: &AtaConfiguration<L>, valuation: ClockValuation) -> bool {
        match self {
            Formula::True => true,
            Formula::False => false,
            Formula::Location(location) => states.contains(&AtaState {
                location: location.clone(),
                clock_valuation: valuation,
            }),
            Formula::ClockConstraint(constraint) => constraint.is_satisfied(valuation),
            Formula::Reset(inner) => inner.is_satisfied(states, 0.0),
            Formula::And(lhs, rhs) => {
                lhs.is_satisfied(states, valuation) && rhs.is_satisfied(states, valuation)
            }
            Formula::Or(lhs, rhs) => {
                lhs.is_satisfied(states, valuation) || rhs.is_satisfied(states, valuation)
            }
        }
    }

    /// Compute the minimal models of the formula at the given clock value.
    ///
    /// Every returned configuration satisfies the formula and no strict
    /// subset of a returned configuration does.
    pub fn minimal_models(&self, valuation: ClockValuation) -> BTreeSet<AtaConfiguration<L>> {
        prune_non_minimal(self.models(valuation))
    }

    fn models(&self, valuation: ClockValuation) -> BTreeSet<AtaConfiguration<L>> {
        match self {
            Formula::True => BTreeSet::from([AtaConfiguration::new()]),
            Formula::False => BTreeSet::new(),
            Formula::Location(location) => BTreeSet::from([AtaConfiguration::from([AtaState {
                location: location.clone(),
                clock_valuation: valuation,
            }])]),
            Formula::ClockConstraint(constraint) => {
                if constraint.is_satisfied(valuation) {
                    BTreeSet::from([AtaConfiguration::new()])
                } else {
                    BTreeSet::new()
                }
            }
            Formula::Reset(inner) => inner.models(0.0),
            Formula::And(lhs, rhs) => {
                let lhs_models = lhs.models(valuation);
                let rhs_models = rhs.models(valuation);
                let mut result = BTreeSet::new();
                for lhs_model in &lhs_models {
                    for rhs_model in &rhs_models {
                        let mut union = lhs_model.clone();
                        union.extend(rhs_model.iter().cloned());
                        result.insert(union);
                    }
                }
                result
            }
            Formula::Or(lhs, rhs) => {
                let mut result = lhs.models(valuation);
                result.extend(rhs.models(valuation));
                result
            }
        }
    }
}

/// Drop every model that is a strict superset of another model.
fn prune_non_minimal<L: Clone + Ord>(
    models: BTreeSet<AtaConfiguration<L>>,
) -> BTreeSet<AtaConfiguration<L>> {
    models
        .iter()
        .filter(|model| {
            !models
                .iter()
                .any(|other| *other != **model && other.is_subset(model))
        })
        .cloned()
        .collect()
}

impl<L: fmt::Display> fmt::Display for Formula<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::True => write!(f, "true"),
            Formula::False => write!(f, "false"),
            Formula::Location(location) => write!(f, "{location}"),
            Formula::ClockConstraint(constraint) => write!(f, "x {constraint}"),
            Formula::Reset(inner) => write!(f, "x.{inner}"),
            Formula::And(lhs, rhs) => write!(f, "({lhs} && {rhs})"),
            Formula::Or(lhs, rhs) => write!(f, "({lhs} || {rhs})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn true_and_false_models() {
        let t: Formula<String> = Formula::True;
        assert_eq!(t.minimal_models(1.0), BTreeSet::from([BTreeSet::new()]));
        let f: Formula<String> = Formula::False;
        assert!(f.minimal_models(1.0).is_empty());
    }

    #[test]
    fn location_atoms_carry_the_clock() {
        let formula = Formula::Location("q".to_string());
        let models = formula.minimal_models(1.5);
        assert_eq!(models.len(), 1);
        let model = models.into_iter().next().unwrap();
        assert!(model.contains(&AtaState { location: "q".to_string(), clock_valuation: 1.5 }));
    }

    #[test]
    fn reset_evaluates_at_zero() {
        let formula = Formula::reset(Formula::and(
            Formula::Location("q".to_string()),
            Formula::ClockConstraint(ClockConstraint::less(1)),
        ));
        let models = formula.minimal_models(5.0);
        assert_eq!(models.len(), 1);
        let model = models.into_iter().next().unwrap();
        assert!(model.contains(&AtaState { location: "q".to_string(), clock_valuation: 0.0 }));
    }

    #[test]
    fn disjunction_models_are_minimal() {
        // q || (q && r) has the single minimal model {q}
        let formula = Formula::or(
            Formula::Location("q".to_string()),
            Formula::and(Formula::Location("q".to_string()), Formula::Location("r".to_string())),
        );
        let models = formula.minimal_models(0.0);
        assert_eq!(models.len(), 1);
        assert_eq!(models.into_iter().next().unwrap().len(), 1);
    }

    #[test]
    fn satisfaction_agrees_with_the_models() {
        let formula = Formula::or(
            Formula::Location("q".to_string()),
            Formula::ClockConstraint(ClockConstraint::greater(2)),
        );
        let with_q =
            AtaConfiguration::from([AtaState { location: "q".to_string(), clock_valuation: 1.0 }]);
        assert!(formula.is_satisfied(&with_q, 1.0));
        // The state's clock must match the evaluation clock.
        assert!(!formula.is_satisfied(&with_q, 2.0));
        assert!(formula.is_satisfied(&AtaConfiguration::new(), 3.0));
        assert!(!formula.is_satisfied(&AtaConfiguration::new(), 1.0));
    }

    #[test]
    fn clock_constraints_gate_models() {
        let formula = Formula::and(
            Formula::Location("q".to_string()),
            Formula::ClockConstraint(ClockConstraint::less_equal(1)),
        );
        assert_eq!(formula.minimal_models(0.5).len(), 1);
        assert!(formula.minimal_models(1.5).is_empty());
    }
}
