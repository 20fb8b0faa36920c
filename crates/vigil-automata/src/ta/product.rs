//! Binary product of two timed automata
//!
//! The product interleaves the two automata: a transition of the product
//! moves exactly one component, keeping the other component's location
//! fixed. Clock namespaces are shared, so the components must use disjoint
//! clock names unless they deliberately share a clock.
//!
//! Actions on which the components would have to synchronize are not
//! supported and rejected with an error.

use std::collections::BTreeSet;
use std::fmt;

use crate::ta::{TaError, TimedAutomaton, Transition};

/// A location of a product automaton.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProductLocation<L1, L2>(pub L1, pub L2);

impl<L1: fmt::Display, L2: fmt::Display> fmt::Display for ProductLocation<L1, L2> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

/// Error raised when a product cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductError {
    /// Synchronized actions were requested
    SynchronizedActionsUnsupported(Vec<String>),
    /// A component transition was invalid in the product
    InvalidTransition(TaError),
}

impl fmt::Display for ProductError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductError::SynchronizedActionsUnsupported(actions) => write!(
                f,
                "synchronized actions are not supported (requested for: {})",
                actions.join(", ")
            ),
            ProductError::InvalidTransition(err) => {
                write!(f, "component transition invalid in the product: {err}")
            }
        }
    }
}

impl std::error::Error for ProductError {}

impl From<TaError> for ProductError {
    fn from(err: TaError) -> Self {
        ProductError::InvalidTransition(err)
    }
}

/// Compute the interleaving product of two timed automata.
///
/// The product's locations are pairs of component locations, its alphabet
/// the union of the component alphabets, its clocks the union of the
/// component clocks. Final locations are pairs of component final
/// locations.
pub fn product<L1, L2, A>(
    left: &TimedAutomaton<L1, A>,
    right: &TimedAutomaton<L2, A>,
    synchronized_actions: &BTreeSet<A>,
) -> Result<TimedAutomaton<ProductLocation<L1, L2>, A>, ProductError>
where
    L1: Clone + Ord + fmt::Debug + fmt::Display,
    L2: Clone + Ord + fmt::Debug + fmt::Display,
    A: Clone + Ord + fmt::Debug + fmt::Display,
{
    if !synchronized_actions.is_empty() {
        return Err(ProductError::SynchronizedActionsUnsupported(
            synchronized_actions.iter().map(|a| a.to_string()).collect(),
        ));
    }
    let alphabet: BTreeSet<A> = left.alphabet().union(right.alphabet()).cloned().collect();
    let initial = ProductLocation(left.initial_location().clone(), right.initial_location().clone());
    let finals = left
        .locations()
        .iter()
        .filter(|l| left.is_final_location(l))
        .flat_map(|l1| {
            right
                .locations()
                .iter()
                .filter(|l| right.is_final_location(l))
                .map(|l2| ProductLocation(l1.clone(), l2.clone()))
        })
        .collect::<Vec<_>>();
    let mut result = TimedAutomaton::new(alphabet, initial, finals);
    for l1 in left.locations() {
        for l2 in right.locations() {
            result.add_location(ProductLocation(l1.clone(), l2.clone()));
        }
    }
    for clock in left.clocks().iter().chain(right.clocks()) {
        result.add_clock(clock);
    }
    // A left transition fires in every right location, and vice versa.
    for transition in left.transitions() {
        for l2 in right.locations() {
            result.add_transition(Transition::new(
                ProductLocation(transition.source.clone(), l2.clone()),
                transition.symbol.clone(),
                ProductLocation(transition.target.clone(), l2.clone()),
                transition.guards.clone(),
                transition.resets.iter().cloned(),
            ))?;
        }
    }
    for transition in right.transitions() {
        for l1 in left.locations() {
            result.add_transition(Transition::new(
                ProductLocation(l1.clone(), transition.source.clone()),
                transition.symbol.clone(),
                ProductLocation(l1.clone(), transition.target.clone()),
                transition.guards.clone(),
                transition.resets.iter().cloned(),
            ))?;
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name_prefix: &str, action: &str) -> TimedAutomaton<String, String> {
        let mut ta = TimedAutomaton::new(
            [action.to_string()],
            format!("{name_prefix}0"),
            [format!("{name_prefix}1")],
        );
        ta.add_clock(format!("{name_prefix}_clock"));
        ta.add_transition(Transition::unguarded(
            format!("{name_prefix}0"),
            action.to_string(),
            format!("{name_prefix}1"),
        ))
        .unwrap();
        ta
    }

    #[test]
    fn interleaving_product_moves_one_component() {
        let left = component("l", "a");
        let right = component("r", "b");
        let product = product(&left, &right, &BTreeSet::new()).unwrap();

        assert_eq!(product.locations().len(), 4);
        assert_eq!(product.clocks().len(), 2);
        let initial = product.initial_configuration();
        let successors = product.symbol_step(&initial, &"a".to_string());
        assert_eq!(successors.len(), 1);
        assert_eq!(
            successors[0].target.location,
            ProductLocation("l1".to_string(), "r0".to_string())
        );
    }

    #[test]
    fn synchronized_actions_are_rejected() {
        let left = component("l", "a");
        let right = component("r", "a");
        let err =
            product(&left, &right, &BTreeSet::from(["a".to_string()])).unwrap_err();
        assert!(matches!(err, ProductError::SynchronizedActionsUnsupported(_)));
    }
}
