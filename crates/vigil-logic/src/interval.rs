//! Time intervals with weak, strict and unbounded endpoints
//!
//! Specification operators carry an interval constraining when their
//! argument has to hold. Bounds are non-negative integers; either endpoint
//! may be unbounded, and bounded endpoints are either weak (closed) or
//! strict (open).

use std::fmt;

/// Kind of an interval endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BoundKind {
    /// The endpoint is included
    Weak,
    /// The endpoint is excluded
    Strict,
    /// There is no bound on this side
    Unbounded,
}

/// An interval over non-negative time with integer endpoints.
///
/// The default interval is unbounded on both sides.
///
/// # Example
///
/// ```
/// use vigil_logic::interval::{BoundKind, TimeInterval};
///
/// let interval = TimeInterval::new(0, BoundKind::Weak, 2, BoundKind::Strict);
/// assert!(interval.contains(1.9));
/// assert!(!interval.contains(2.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeInterval {
    lower: u32,
    lower_kind: BoundKind,
    upper: u32,
    upper_kind: BoundKind,
}

impl TimeInterval {
    /// Create an interval from both endpoints.
    pub fn new(lower: u32, lower_kind: BoundKind, upper: u32, upper_kind: BoundKind) -> Self {
        TimeInterval { lower, lower_kind, upper, upper_kind }
    }

    /// The closed interval `[lower, upper]`.
    pub fn closed(lower: u32, upper: u32) -> Self {
        TimeInterval::new(lower, BoundKind::Weak, upper, BoundKind::Weak)
    }

    /// The interval `[lower, ∞)`.
    pub fn at_least(lower: u32) -> Self {
        TimeInterval::new(lower, BoundKind::Weak, 0, BoundKind::Unbounded)
    }

    /// The interval unbounded on both sides, containing all of time.
    pub fn unbounded() -> Self {
        TimeInterval::new(0, BoundKind::Unbounded, 0, BoundKind::Unbounded)
    }

    /// The lower endpoint. Meaningless if the lower kind is unbounded.
    pub fn lower(&self) -> u32 {
        self.lower
    }

    /// The kind of the lower endpoint.
    pub fn lower_kind(&self) -> BoundKind {
        self.lower_kind
    }

    /// The upper endpoint. Meaningless if the upper kind is unbounded.
    pub fn upper(&self) -> u32 {
        self.upper
    }

    /// The kind of the upper endpoint.
    pub fn upper_kind(&self) -> BoundKind {
        self.upper_kind
    }

    /// Check whether a time value lies in the interval.
    pub fn contains(&self, value: f64) -> bool {
        let fits_lower = match self.lower_kind {
            BoundKind::Unbounded => true,
            BoundKind::Weak => value >= f64::from(self.lower),
            BoundKind::Strict => value > f64::from(self.lower),
        };
        let fits_upper = match self.upper_kind {
            BoundKind::Unbounded => true,
            BoundKind::Weak => value <= f64::from(self.upper),
            BoundKind::Strict => value < f64::from(self.upper),
        };
        fits_lower && fits_upper
    }

    /// Check whether no value lies in the interval.
    pub fn is_empty(&self) -> bool {
        if self.lower_kind == BoundKind::Unbounded || self.upper_kind == BoundKind::Unbounded {
            return false;
        }
        self.lower > self.upper
            || (self.lower == self.upper
                && (self.lower_kind == BoundKind::Strict || self.upper_kind == BoundKind::Strict))
    }

    /// The largest constant appearing in a bounded endpoint.
    pub fn largest_constant(&self) -> u32 {
        let mut result = 0;
        if self.lower_kind != BoundKind::Unbounded {
            result = result.max(self.lower);
        }
        if self.upper_kind != BoundKind::Unbounded {
            result = result.max(self.upper);
        }
        result
    }
}

impl Default for TimeInterval {
    fn default() -> Self {
        TimeInterval::unbounded()
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lower_kind == BoundKind::Unbounded && self.upper_kind == BoundKind::Unbounded {
            return Ok(());
        }
        match self.lower_kind {
            BoundKind::Weak => write!(f, "[{}", self.lower)?,
            BoundKind::Strict => write!(f, "({}", self.lower)?,
            BoundKind::Unbounded => write!(f, "(0")?,
        }
        write!(f, ", ")?;
        match self.upper_kind {
            BoundKind::Weak => write!(f, "{}]", self.upper),
            BoundKind::Strict => write!(f, "{})", self.upper),
            BoundKind::Unbounded => write!(f, "inf)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_respects_bound_kinds() {
        let interval = TimeInterval::new(1, BoundKind::Strict, 3, BoundKind::Weak);
        assert!(!interval.contains(1.0));
        assert!(interval.contains(1.1));
        assert!(interval.contains(3.0));
        assert!(!interval.contains(3.1));
    }

    #[test]
    fn unbounded_sides_accept_everything() {
        assert!(TimeInterval::unbounded().contains(1e9));
        assert!(TimeInterval::at_least(2).contains(1e9));
        assert!(!TimeInterval::at_least(2).contains(1.5));
    }

    #[test]
    fn emptiness() {
        assert!(TimeInterval::new(2, BoundKind::Weak, 1, BoundKind::Weak).is_empty());
        assert!(TimeInterval::new(1, BoundKind::Strict, 1, BoundKind::Weak).is_empty());
        assert!(!TimeInterval::closed(1, 1).is_empty());
        assert!(!TimeInterval::unbounded().is_empty());
    }

    #[test]
    fn largest_constant_ignores_unbounded_sides() {
        assert_eq!(TimeInterval::closed(1, 4).largest_constant(), 4);
        assert_eq!(TimeInterval::at_least(2).largest_constant(), 2);
        assert_eq!(TimeInterval::unbounded().largest_constant(), 0);
    }
}
