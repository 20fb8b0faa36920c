//! MTL formulas and their algebra
//!
//! This crate defines [`MTLFormula`], the metric temporal logic formulas
//! vigil synthesizes controllers against, together with the operations the
//! rest of the workspace needs:
//! - positive normal form ([`MTLFormula::to_positive_normal_form`])
//! - the closure of until subformulas ([`MTLFormula::closure`])
//! - the alphabet and the largest interval constant
//! - satisfaction of finite timed words ([`MtlWord`])
//! - a parser for textual MTL expressions ([`parser`])
//!
//! Formulas are ordered structurally, which gives the automata built from
//! them a canonical state order.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

use interval::TimeInterval;

pub mod interval;
pub mod parser;

/// A named atomic proposition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AtomicProposition(String);

impl AtomicProposition {
    /// Create a new atomic proposition with the given name.
    pub fn new(name: impl ToString) -> Self {
        AtomicProposition(name.to_string())
    }

    /// The name of the proposition.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AtomicProposition {
    fn from(name: &str) -> Self {
        AtomicProposition::new(name)
    }
}

impl fmt::Display for AtomicProposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A metric temporal logic formula.
///
/// # Example
///
/// ```
/// use vigil_logic::MTLFormula;
/// use vigil_logic::interval::TimeInterval;
///
/// // p U[0,2] q
/// let p = MTLFormula::ap("p");
/// let q = MTLFormula::ap("q");
/// let formula = p.until(q, TimeInterval::closed(0, 2));
/// assert_eq!(formula.largest_constant(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MTLFormula {
    /// Always true
    True,
    /// Always false
    False,
    /// An atomic proposition
    Ap(AtomicProposition),
    /// Negation
    Not(Box<MTLFormula>),
    /// Conjunction
    And(Box<MTLFormula>, Box<MTLFormula>),
    /// Disjunction
    Or(Box<MTLFormula>, Box<MTLFormula>),
    /// Timed until
    Until(Box<MTLFormula>, Box<MTLFormula>, TimeInterval),
    /// Timed dual until, the negation dual of until
    DualUntil(Box<MTLFormula>, Box<MTLFormula>, TimeInterval),
}

impl MTLFormula {
    /// Shorthand for an atomic proposition formula.
    pub fn ap(name: impl ToString) -> Self {
        MTLFormula::Ap(AtomicProposition::new(name))
    }

    /// The timed until `self U_I rhs`.
    pub fn until(self, rhs: MTLFormula, interval: TimeInterval) -> Self {
        MTLFormula::Until(Box::new(self), Box::new(rhs), interval)
    }

    /// The timed dual until `self D_I rhs`.
    pub fn dual_until(self, rhs: MTLFormula, interval: TimeInterval) -> Self {
        MTLFormula::DualUntil(Box::new(self), Box::new(rhs), interval)
    }

    /// The eventuality `◇_I inner`, expressed as `⊤ U_I inner`.
    pub fn finally(inner: MTLFormula, interval: TimeInterval) -> Self {
        MTLFormula::True.until(inner, interval)
    }

    /// The invariant `□_I inner`, expressed as `⊥ D_I inner`.
    pub fn globally(inner: MTLFormula, interval: TimeInterval) -> Self {
        MTLFormula::False.dual_until(inner, interval)
    }

    /// Rewrite the formula into positive normal form.
    ///
    /// All negations are pushed inward until they only apply to atomic
    /// propositions; untils flip into dual untils and vice versa.
    pub fn to_positive_normal_form(&self) -> MTLFormula {
        match self {
            MTLFormula::True | MTLFormula::False | MTLFormula::Ap(_) => self.clone(),
            MTLFormula::And(lhs, rhs) => MTLFormula::And(
                Box::new(lhs.to_positive_normal_form()),
                Box::new(rhs.to_positive_normal_form()),
            ),
            MTLFormula::Or(lhs, rhs) => MTLFormula::Or(
                Box::new(lhs.to_positive_normal_form()),
                Box::new(rhs.to_positive_normal_form()),
            ),
            MTLFormula::Until(lhs, rhs, interval) => MTLFormula::Until(
                Box::new(lhs.to_positive_normal_form()),
                Box::new(rhs.to_positive_normal_form()),
                *interval,
            ),
            MTLFormula::DualUntil(lhs, rhs, interval) => MTLFormula::DualUntil(
                Box::new(lhs.to_positive_normal_form()),
                Box::new(rhs.to_positive_normal_form()),
                *interval,
            ),
            MTLFormula::Not(inner) => match inner.as_ref() {
                MTLFormula::True => MTLFormula::False,
                MTLFormula::False => MTLFormula::True,
                MTLFormula::Ap(_) => self.clone(),
                MTLFormula::Not(inner) => inner.to_positive_normal_form(),
                MTLFormula::And(lhs, rhs) => MTLFormula::Or(
                    Box::new(MTLFormula::Not(lhs.clone()).to_positive_normal_form()),
                    Box::new(MTLFormula::Not(rhs.clone()).to_positive_normal_form()),
                ),
                MTLFormula::Or(lhs, rhs) => MTLFormula::And(
                    Box::new(MTLFormula::Not(lhs.clone()).to_positive_normal_form()),
                    Box::new(MTLFormula::Not(rhs.clone()).to_positive_normal_form()),
                ),
                MTLFormula::Until(lhs, rhs, interval) => MTLFormula::DualUntil(
                    Box::new(MTLFormula::Not(lhs.clone()).to_positive_normal_form()),
                    Box::new(MTLFormula::Not(rhs.clone()).to_positive_normal_form()),
                    *interval,
                ),
                MTLFormula::DualUntil(lhs, rhs, interval) => MTLFormula::Until(
                    Box::new(MTLFormula::Not(lhs.clone()).to_positive_normal_form()),
                    Box::new(MTLFormula::Not(rhs.clone()).to_positive_normal_form()),
                    *interval,
                ),
            },
        }
    }

    /// Collect all subformulas (including the formula itself) matching a
    /// predicate.
    fn collect_subformulas<'a>(
        &'a self,
        predicate: &impl Fn(&MTLFormula) -> bool,
        result: &mut BTreeSet<&'a MTLFormula>,
    ) {
        if predicate(self) {
            result.insert(self);
        }
        match self {
            MTLFormula::True | MTLFormula::False | MTLFormula::Ap(_) => {}
            MTLFormula::Not(inner) => inner.collect_subformulas(predicate, result),
            MTLFormula::And(lhs, rhs)
            | MTLFormula::Or(lhs, rhs)
            | MTLFormula::Until(lhs, rhs, _)
            | MTLFormula::DualUntil(lhs, rhs, _) => {
                lhs.collect_subformulas(predicate, result);
                rhs.collect_subformulas(predicate, result);
            }
        }
    }

    /// All until subformulas.
    pub fn untils(&self) -> BTreeSet<MTLFormula> {
        let mut result = BTreeSet::new();
        self.collect_subformulas(&|f| matches!(f, MTLFormula::Until(..)), &mut result);
        result.into_iter().cloned().collect()
    }

    /// All dual-until subformulas.
    pub fn dual_untils(&self) -> BTreeSet<MTLFormula> {
        let mut result = BTreeSet::new();
        self.collect_subformulas(&|f| matches!(f, MTLFormula::DualUntil(..)), &mut result);
        result.into_iter().cloned().collect()
    }

    /// The closure of the formula: all until and dual-until subformulas.
    ///
    /// The specification translator creates one automaton location per
    /// closure element.
    pub fn closure(&self) -> BTreeSet<MTLFormula> {
        let mut result = BTreeSet::new();
        self.collect_subformulas(
            &|f| matches!(f, MTLFormula::Until(..) | MTLFormula::DualUntil(..)),
            &mut result,
        );
        result.into_iter().cloned().collect()
    }

    /// All atomic propositions of the formula.
    pub fn alphabet(&self) -> BTreeSet<AtomicProposition> {
        let mut atoms = BTreeSet::new();
        self.collect_subformulas(&|f| matches!(f, MTLFormula::Ap(_)), &mut atoms);
        atoms
            .into_iter()
            .filter_map(|f| match f {
                MTLFormula::Ap(ap) => Some(ap.clone()),
                _ => None,
            })
            .collect()
    }

    /// The largest constant appearing in any interval of the formula.
    pub fn largest_constant(&self) -> u32 {
        match self {
            MTLFormula::True | MTLFormula::False | MTLFormula::Ap(_) => 0,
            MTLFormula::Not(inner) => inner.largest_constant(),
            MTLFormula::And(lhs, rhs) | MTLFormula::Or(lhs, rhs) => {
                lhs.largest_constant().max(rhs.largest_constant())
            }
            MTLFormula::Until(lhs, rhs, interval) | MTLFormula::DualUntil(lhs, rhs, interval) => {
                interval
                    .largest_constant()
                    .max(lhs.largest_constant())
                    .max(rhs.largest_constant())
            }
        }
    }
}

impl Not for MTLFormula {
    type Output = Self;

    fn not(self) -> Self::Output {
        MTLFormula::Not(Box::new(self))
    }
}

impl BitAnd for MTLFormula {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        MTLFormula::And(Box::new(self), Box::new(rhs))
    }
}

impl BitOr for MTLFormula {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        MTLFormula::Or(Box::new(self), Box::new(rhs))
    }
}

impl fmt::Display for MTLFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MTLFormula::True => write!(f, "true"),
            MTLFormula::False => write!(f, "false"),
            MTLFormula::Ap(ap) => write!(f, "{ap}"),
            MTLFormula::Not(inner) => write!(f, "!({inner})"),
            MTLFormula::And(lhs, rhs) => write!(f, "({lhs} && {rhs})"),
            MTLFormula::Or(lhs, rhs) => write!(f, "({lhs} || {rhs})"),
            MTLFormula::Until(lhs, rhs, interval) => write!(f, "({lhs} U{interval} {rhs})"),
            MTLFormula::DualUntil(lhs, rhs, interval) => write!(f, "({lhs} D{interval} {rhs})"),
        }
    }
}

/// A finite timed word over sets of atomic propositions, checkable against
/// a formula.
///
/// Satisfaction follows the pointwise semantics with a strict future: an
/// until looks for a later position within the interval measured from the
/// current position.
#[derive(Debug, Clone, PartialEq)]
pub struct MtlWord {
    /// Positions of the word: the propositions holding there, and the
    /// absolute timestamp
    pub word: Vec<(Vec<AtomicProposition>, f64)>,
}

impl MtlWord {
    /// Check satisfaction at the first position.
    pub fn satisfies(&self, formula: &MTLFormula) -> bool {
        self.satisfies_at(formula, 0)
    }

    /// Check satisfaction at a position of the word.
    ///
    /// Positions past the end of the word satisfy nothing.
    pub fn satisfies_at(&self, formula: &MTLFormula, position: usize) -> bool {
        if position >= self.word.len() {
            return false;
        }
        match formula {
            MTLFormula::True => true,
            MTLFormula::False => false,
            MTLFormula::Ap(ap) => self.word[position].0.contains(ap),
            MTLFormula::Not(inner) => !self.satisfies_at(inner, position),
            MTLFormula::And(lhs, rhs) => {
                self.satisfies_at(lhs, position) && self.satisfies_at(rhs, position)
            }
            MTLFormula::Or(lhs, rhs) => {
                self.satisfies_at(lhs, position) || self.satisfies_at(rhs, position)
            }
            MTLFormula::Until(lhs, rhs, interval) => {
                let now = self.word[position].1;
                (position + 1..self.word.len()).any(|later| {
                    interval.contains(self.word[later].1 - now)
                        && self.satisfies_at(rhs, later)
                        && (position + 1..later).all(|between| self.satisfies_at(lhs, between))
                })
            }
            MTLFormula::DualUntil(lhs, rhs, interval) => {
                // The dual of until, by De Morgan over its quantifiers.
                let now = self.word[position].1;
                (position + 1..self.word.len()).all(|later| {
                    !interval.contains(self.word[later].1 - now)
                        || self.satisfies_at(rhs, later)
                        || (position + 1..later).any(|between| self.satisfies_at(lhs, between))
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::BoundKind;

    #[test]
    fn positive_normal_form_pushes_negation_to_atoms() {
        let formula = !(MTLFormula::ap("p").until(MTLFormula::ap("q"), TimeInterval::closed(0, 1)));
        let nnf = formula.to_positive_normal_form();
        assert_eq!(
            nnf,
            (!MTLFormula::ap("p")).dual_until(!MTLFormula::ap("q"), TimeInterval::closed(0, 1))
        );
    }

    #[test]
    fn double_negation_cancels() {
        let formula = !!MTLFormula::ap("p");
        assert_eq!(formula.to_positive_normal_form(), MTLFormula::ap("p"));
    }

    #[test]
    fn closure_collects_nested_untils() {
        let inner = MTLFormula::ap("p").until(MTLFormula::ap("q"), TimeInterval::closed(0, 1));
        let outer = MTLFormula::ap("r").dual_until(inner.clone(), TimeInterval::at_least(0));
        let closure = outer.closure();
        assert_eq!(closure.len(), 2);
        assert!(closure.contains(&inner));
        assert!(closure.contains(&outer));
    }

    #[test]
    fn alphabet_and_largest_constant() {
        let formula = MTLFormula::finally(
            MTLFormula::ap("a") & !MTLFormula::ap("b"),
            TimeInterval::new(1, BoundKind::Weak, 3, BoundKind::Strict),
        );
        assert_eq!(
            formula.alphabet(),
            BTreeSet::from([AtomicProposition::new("a"), AtomicProposition::new("b")])
        );
        assert_eq!(formula.largest_constant(), 3);
    }

    #[test]
    fn word_satisfaction_of_until() {
        let word = MtlWord {
            word: vec![
                (vec![AtomicProposition::new("p")], 0.0),
                (vec![AtomicProposition::new("p")], 0.5),
                (vec![AtomicProposition::new("q")], 1.0),
            ],
        };
        let within = MTLFormula::ap("p").until(MTLFormula::ap("q"), TimeInterval::closed(0, 1));
        let too_late = MTLFormula::ap("p")
            .until(MTLFormula::ap("q"), TimeInterval::new(0, BoundKind::Weak, 1, BoundKind::Strict));
        assert!(word.satisfies(&within));
        assert!(!word.satisfies(&too_late));
    }
}
