//! The integer region abstraction for bounded clocks
//!
//! Given the largest constant `K` any clock is compared against, the value
//! of a single clock falls into one of `2K + 2` regions: even index `2k`
//! for the integer value `k <= K`, odd index `2k + 1` for the open interval
//! `(k, k + 1)` with `k < K`, and `2K + 1` for all values above `K`. Two
//! valuations in the same region satisfy the same constraints with
//! comparands up to `K`.

use crate::{ClockConstraint, ClockValuation, Comparison, integral_and_fractional};

/// Index of a one-dimensional clock region.
pub type RegionIndex = u32;

/// The set of regions for clocks bounded by a largest constant.
///
/// # Example
///
/// ```
/// use vigil_automata::regions::Regions;
///
/// let regions = Regions { largest_constant: 2 };
/// assert_eq!(regions.region_index(0.0), 0);
/// assert_eq!(regions.region_index(0.5), 1);
/// assert_eq!(regions.region_index(2.0), 4);
/// assert_eq!(regions.region_index(7.3), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regions {
    /// The largest constant any clock is compared against
    pub largest_constant: u32,
}

impl Regions {
    /// The largest region index, `2K + 1`. It is absorbing under time
    /// elapse.
    pub fn max_region_index(&self) -> RegionIndex {
        2 * self.largest_constant + 1
    }

    /// Map a clock valuation to the index of its region.
    pub fn region_index(&self, valuation: ClockValuation) -> RegionIndex {
        if valuation > f64::from(self.largest_constant) {
            return self.max_region_index();
        }
        let (int, frac) = integral_and_fractional(valuation);
        if frac == 0.0 {
            2 * int
        } else {
            2 * int + 1
        }
    }

    /// The region directly following the given region under time elapse.
    ///
    /// Even regions step to the following open interval, odd regions to the
    /// following integer. The maximal region is absorbing.
    pub fn incremented(&self, region: RegionIndex) -> RegionIndex {
        if region >= self.max_region_index() {
            self.max_region_index()
        } else {
            region + 1
        }
    }

    /// Check whether every valuation in the region satisfies a constraint.
    ///
    /// Constraints with comparands above the largest constant cannot be
    /// decided by the region and evaluate to `false` for the unbounded
    /// region.
    pub fn is_satisfied(&self, constraint: &ClockConstraint, region: RegionIndex) -> bool {
        debug_assert!(constraint.comparand <= self.largest_constant);
        if region == self.max_region_index() {
            // Above K the only decidable constraints are strict lower bounds.
            return matches!(
                constraint.comparison,
                Comparison::Greater | Comparison::GreaterEqual
            );
        }
        let twice_comparand = 2 * constraint.comparand;
        match constraint.comparison {
            Comparison::Less => region < twice_comparand,
            Comparison::LessEqual => region <= twice_comparand,
            Comparison::EqualTo => region == twice_comparand,
            Comparison::GreaterEqual => region >= twice_comparand,
            Comparison::Greater => region > twice_comparand,
        }
    }

}

/// Which bounds of a region to turn into constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintBoundKind {
    /// Only the lower bound
    Lower,
    /// Only the upper bound
    Upper,
    /// Both bounds
    Both,
}

/// Compute the clock constraints that pin a valuation into a region.
///
/// For an even region `2k` this is `x == k`; for an odd region `2k + 1`
/// the pair `x > k`, `x < k + 1`; for the maximal region `x > K`. The
/// `bound_kind` selects which side of the region is emitted, which is what
/// controller extraction uses to describe ranges of regions.
pub fn constraints_from_region(
    region: RegionIndex,
    max_region_index: RegionIndex,
    bound_kind: ConstraintBoundKind,
) -> Vec<ClockConstraint> {
    debug_assert!(region <= max_region_index);
    let largest_constant = (max_region_index - 1) / 2;
    if region == max_region_index {
        return match bound_kind {
            ConstraintBoundKind::Upper => vec![],
            ConstraintBoundKind::Lower | ConstraintBoundKind::Both => {
                vec![ClockConstraint::greater(largest_constant)]
            }
        };
    }
    if region % 2 == 0 {
        // Integer region, both bounds collapse into equality.
        return match bound_kind {
            ConstraintBoundKind::Lower => vec![ClockConstraint::greater_equal(region / 2)],
            ConstraintBoundKind::Upper => vec![ClockConstraint::less_equal(region / 2)],
            ConstraintBoundKind::Both => vec![ClockConstraint::equal_to(region / 2)],
        };
    }
    let lower = region / 2;
    match bound_kind {
        ConstraintBoundKind::Lower => vec![ClockConstraint::greater(lower)],
        ConstraintBoundKind::Upper => vec![ClockConstraint::less(lower + 1)],
        ConstraintBoundKind::Both => {
            vec![ClockConstraint::greater(lower), ClockConstraint::less(lower + 1)]
        }
    }
}
