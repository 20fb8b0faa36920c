//! Translation of an MTL specification into an alternating timed automaton
//!
//! [`translate`] builds, for a specification `ϕ`, an automaton accepting
//! the behaviors violating `ϕ`: the negation of `ϕ` is brought into
//! positive normal form, and the automaton gets one location per until or
//! dual-until subformula of the negation, plus a distinguished initial
//! location. Reading a symbol unfolds the temporal operators one step;
//! entering an until or dual-until location resets that location's clock.
//!
//! Accepting locations are exactly the dual-until locations: when a run
//! stops, open dual-until obligations are vacuously fulfilled while open
//! until obligations are not.

use std::fmt;

use log::debug;
use vigil_automata::ClockConstraint;
use vigil_automata::ata::{Ata, Formula};
use vigil_logic::interval::{BoundKind, TimeInterval};
use vigil_logic::{AtomicProposition, MTLFormula};

/// Name of the distinguished initial location.
///
/// The name is reserved; specifications must not use it as a proposition.
pub const INITIAL_LOCATION_NAME: &str = "phi_i";

/// Errors of the translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// The alphabet of the specification is empty
    EmptyAlphabet,
    /// The specification uses the reserved initial location name
    ReservedProposition(String),
    /// The automaton construction rejected a transition; this is a bug
    Construction(String),
}

impl fmt::Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationError::EmptyAlphabet => {
                write!(f, "cannot translate a specification over an empty alphabet")
            }
            TranslationError::ReservedProposition(name) => {
                write!(f, "the proposition '{name}' is reserved")
            }
            TranslationError::Construction(message) => {
                write!(f, "failed to construct the automaton: {message}")
            }
        }
    }
}

impl std::error::Error for TranslationError {}

/// Translate a specification into the automaton of its violations.
///
/// The `alphabet` extends the propositions appearing in the formula;
/// pass the full set of symbols the plant can emit so that the automaton
/// is prepared for all of them.
///
/// # Example
///
/// ```
/// use vigil_logic::{AtomicProposition, MTLFormula};
/// use vigil_logic::interval::TimeInterval;
/// use vigil_translation::translate;
///
/// let spec = MTLFormula::finally(MTLFormula::ap("a"), TimeInterval::unbounded());
/// let ata = translate(&spec, [AtomicProposition::new("a")]).unwrap();
/// // The negation of an eventuality is a dual until, which is accepting.
/// assert_eq!(ata.accepting_locations().len(), 1);
/// ```
pub fn translate(
    specification: &MTLFormula,
    alphabet: impl IntoIterator<Item = AtomicProposition>,
) -> Result<Ata<MTLFormula, AtomicProposition>, TranslationError> {
    let mut alphabet: std::collections::BTreeSet<AtomicProposition> =
        alphabet.into_iter().collect();
    alphabet.extend(specification.alphabet());
    if alphabet.is_empty() {
        return Err(TranslationError::EmptyAlphabet);
    }
    if alphabet.contains(&AtomicProposition::new(INITIAL_LOCATION_NAME)) {
        return Err(TranslationError::ReservedProposition(INITIAL_LOCATION_NAME.to_string()));
    }
    let negation = (!specification.clone()).to_positive_normal_form();
    debug!("Translating the negated specification {negation}");
    let initial_location = MTLFormula::ap(INITIAL_LOCATION_NAME);
    let untils = negation.untils();
    let dual_untils = negation.dual_untils();

    let mut transitions: Vec<(MTLFormula, AtomicProposition, Formula<MTLFormula>)> = Vec::new();
    for symbol in &alphabet {
        transitions.push((initial_location.clone(), symbol.clone(), init(&negation, symbol)));
        for until in &untils {
            let MTLFormula::Until(lhs, rhs, interval) = until else {
                unreachable!("untils() only yields until formulas");
            };
            // (⟨ϕ₂⟩ ∧ x ∈ I) ∨ (⟨ϕ₁⟩ ∧ ⟨U⟩); the fixed point keeps its
            // clock, the reset happened on entry.
            let formula = Formula::or(
                Formula::and(init(rhs, symbol), interval_contains(interval)),
                Formula::and(init(lhs, symbol), Formula::Location(until.clone())),
            );
            transitions.push((until.clone(), symbol.clone(), formula));
        }
        for dual_until in &dual_untils {
            let MTLFormula::DualUntil(lhs, rhs, interval) = dual_until else {
                unreachable!("dual_untils() only yields dual-until formulas");
            };
            // (⟨ϕ₂⟩ ∨ x ∉ I) ∧ (⟨ϕ₁⟩ ∨ ⟨D⟩), the dual of the until rule.
            let formula = Formula::and(
                Formula::or(init(rhs, symbol), interval_excludes(interval)),
                Formula::or(init(lhs, symbol), Formula::Location(dual_until.clone())),
            );
            transitions.push((dual_until.clone(), symbol.clone(), formula));
        }
    }
    Ata::new(alphabet, initial_location, dual_untils, transitions)
        .map_err(|e| TranslationError::Construction(e.to_string()))
}

/// The transition formula entering a formula's obligations.
///
/// Atoms evaluate against the symbol being read; temporal subformulas
/// spawn their location with a fresh clock.
fn init(formula: &MTLFormula, symbol: &AtomicProposition) -> Formula<MTLFormula> {
    match formula {
        MTLFormula::True => Formula::True,
        MTLFormula::False => Formula::False,
        MTLFormula::Ap(ap) => {
            if ap == symbol {
                Formula::True
            } else {
                Formula::False
            }
        }
        MTLFormula::Not(inner) => match inner.as_ref() {
            MTLFormula::Ap(ap) => {
                if ap == symbol {
                    Formula::False
                } else {
                    Formula::True
                }
            }
            // The input is in positive normal form; a negation wraps an
            // atom or is normalized away first.
            _ => init(&formula.to_positive_normal_form(), symbol),
        },
        MTLFormula::And(lhs, rhs) => Formula::and(init(lhs, symbol), init(rhs, symbol)),
        MTLFormula::Or(lhs, rhs) => Formula::or(init(lhs, symbol), init(rhs, symbol)),
        MTLFormula::Until(..) | MTLFormula::DualUntil(..) => {
            Formula::reset(Formula::Location(formula.clone()))
        }
    }
}

/// The clock constraint formula for membership in an interval.
fn interval_contains(interval: &TimeInterval) -> Formula<MTLFormula> {
    let lower = match interval.lower_kind() {
        BoundKind::Unbounded => Formula::True,
        BoundKind::Weak => {
            Formula::ClockConstraint(ClockConstraint::greater_equal(interval.lower()))
        }
        BoundKind::Strict => Formula::ClockConstraint(ClockConstraint::greater(interval.lower())),
    };
    let upper = match interval.upper_kind() {
        BoundKind::Unbounded => Formula::True,
        BoundKind::Weak => Formula::ClockConstraint(ClockConstraint::less_equal(interval.upper())),
        BoundKind::Strict => Formula::ClockConstraint(ClockConstraint::less(interval.upper())),
    };
    Formula::and(lower, upper)
}

/// The clock constraint formula for non-membership in an interval.
fn interval_excludes(interval: &TimeInterval) -> Formula<MTLFormula> {
    let below = match interval.lower_kind() {
        BoundKind::Unbounded => Formula::False,
        BoundKind::Weak => Formula::ClockConstraint(ClockConstraint::less(interval.lower())),
        BoundKind::Strict => Formula::ClockConstraint(ClockConstraint::less_equal(interval.lower())),
    };
    let above = match interval.upper_kind() {
        BoundKind::Unbounded => Formula::False,
        BoundKind::Weak => Formula::ClockConstraint(ClockConstraint::greater(interval.upper())),
        BoundKind::Strict => {
            Formula::ClockConstraint(ClockConstraint::greater_equal(interval.upper()))
        }
    };
    Formula::or(below, above)
}
