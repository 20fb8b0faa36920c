//! Canonical words: finite representatives of product configurations
//!
//! A configuration of the product of a plant and a specification automaton
//! carries one clock per plant clock and one clock per automaton state,
//! all real-valued. A [`CanonicalWord`] abstracts such a configuration
//! into a sequence of groups: symbols whose clocks share the same
//! fractional part form one group, groups are ordered by fractional part
//! ascending, and the concrete clock value of every symbol is replaced by
//! its region index. Only the group order survives the abstraction, which
//! makes the set of canonical words finite.
//!
//! Invariants of a well-formed word:
//! 1. every plant clock appears exactly once,
//! 2. every automaton state appears exactly once,
//! 3. groups are non-empty and the word has at least one group,
//! 4. a group contains either only even or only odd region indices,
//! 5. even (integer) region indices appear only in the first group,
//! 6. all region indices are at most `2K + 1`.

use std::collections::BTreeSet;
use std::fmt;

use vigil_automata::ata::{AtaConfiguration, AtaState};
use vigil_automata::regions::{RegionIndex, Regions};
use vigil_automata::ta::Configuration;
use vigil_automata::{ClockValuation, integral_and_fractional, is_time_equal};
use vigil_display_utils::{bracketed, braced};
use vigil_logic::MTLFormula;

/// A regionalized plant clock: location, clock name and clock region.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlantRegionState<L> {
    /// The plant location
    pub location: L,
    /// The clock name
    pub clock: String,
    /// The region of the clock's valuation
    pub region_index: RegionIndex,
}

impl<L: fmt::Display> fmt::Display for PlantRegionState<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.location, self.clock, self.region_index)
    }
}

/// A regionalized specification automaton state.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AtaRegionState {
    /// The automaton location, a formula of the negated specification
    pub formula: MTLFormula,
    /// The region of the state's clock
    pub region_index: RegionIndex,
}

impl fmt::Display for AtaRegionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.formula, self.region_index)
    }
}

/// One symbol of a canonical word.
///
/// The derived order sorts plant symbols before automaton symbols, and
/// within each kind by location, clock and region. That order is the
/// canonical arrangement within a group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AbRegionSymbol<L> {
    /// A plant clock
    Plant(PlantRegionState<L>),
    /// A specification automaton state
    Ata(AtaRegionState),
}

impl<L> AbRegionSymbol<L> {
    /// The region index of the symbol.
    pub fn region_index(&self) -> RegionIndex {
        match self {
            AbRegionSymbol::Plant(state) => state.region_index,
            AbRegionSymbol::Ata(state) => state.region_index,
        }
    }

    fn with_region_index(&self, region_index: RegionIndex) -> Self
    where
        L: Clone,
    {
        match self {
            AbRegionSymbol::Plant(state) => AbRegionSymbol::Plant(PlantRegionState {
                location: state.location.clone(),
                clock: state.clock.clone(),
                region_index,
            }),
            AbRegionSymbol::Ata(state) => AbRegionSymbol::Ata(AtaRegionState {
                formula: state.formula.clone(),
                region_index,
            }),
        }
    }
}

impl<L: fmt::Display> fmt::Display for AbRegionSymbol<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbRegionSymbol::Plant(state) => write!(f, "{state}"),
            AbRegionSymbol::Ata(state) => write!(f, "{state}"),
        }
    }
}

/// Error raised when a canonical word violates one of its invariants.
///
/// This is fatal: successor computation preserves well-formedness, so a
/// violation indicates a bug rather than bad input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalWordError(pub String);

impl fmt::Display for CanonicalWordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid canonical word: {}", self.0)
    }
}

impl std::error::Error for CanonicalWordError {}

/// A canonical word: groups of regionalized symbols ordered by the
/// fractional part of their clocks.
///
/// Groups are sorted multisets; duplicate symbols are retained unless the
/// word was built with set semantics.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalWord<L> {
    groups: Vec<Vec<AbRegionSymbol<L>>>,
}

impl<L> CanonicalWord<L>
where
    L: Clone + Ord + fmt::Debug + fmt::Display,
{
    /// Build a word directly from groups, canonicalizing the order within
    /// each group. Intended for tests and for successor computation.
    pub fn from_groups(groups: Vec<Vec<AbRegionSymbol<L>>>) -> Self {
        let mut groups = groups;
        for group in &mut groups {
            group.sort();
        }
        CanonicalWord { groups }
    }

    /// The groups of the word, ordered by fractional part ascending.
    pub fn groups(&self) -> &[Vec<AbRegionSymbol<L>>] {
        &self.groups
    }

    /// Iterate over all symbols of the word.
    pub fn symbols(&self) -> impl Iterator<Item = &AbRegionSymbol<L>> {
        self.groups.iter().flatten()
    }

    /// Check the structural invariants of the word.
    pub fn validate(&self, regions: &Regions) -> Result<(), CanonicalWordError> {
        if self.groups.is_empty() {
            return Err(CanonicalWordError("word has no groups".into()));
        }
        if self.groups.iter().any(|group| group.is_empty()) {
            return Err(CanonicalWordError("word contains an empty group".into()));
        }
        for group in &self.groups {
            let has_even = group.iter().any(|s| s.region_index() % 2 == 0);
            let has_odd = group.iter().any(|s| s.region_index() % 2 == 1);
            if has_even && has_odd {
                return Err(CanonicalWordError(
                    "group mixes even and odd region indices".into(),
                ));
            }
        }
        for group in self.groups.iter().skip(1) {
            if group.iter().any(|s| s.region_index() % 2 == 0) {
                return Err(CanonicalWordError(
                    "even region index outside the first group".into(),
                ));
            }
        }
        if self
            .symbols()
            .any(|s| s.region_index() > regions.max_region_index())
        {
            return Err(CanonicalWordError("region index exceeds the maximum".into()));
        }
        Ok(())
    }

    /// Project away the specification automaton symbols.
    ///
    /// The result identifies the plant component of the word; successor
    /// words of the same projection belong to the same search node.
    pub fn plant_projection(&self) -> CanonicalWord<L> {
        let groups = self
            .groups
            .iter()
            .map(|group| {
                group
                    .iter()
                    .filter(|s| matches!(s, AbRegionSymbol::Plant(_)))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .filter(|group| !group.is_empty())
            .collect();
        CanonicalWord { groups }
    }

    /// Rebuild a concrete candidate configuration represented by the word.
    ///
    /// Integer regions get their exact value; open regions of the i-th
    /// group get the fraction `(i + 1) / (groups + 1)`, which realizes the
    /// group order.
    pub fn candidate(&self) -> (Configuration<L>, AtaConfiguration<MTLFormula>) {
        let delta = 1.0 / (self.groups.len() as f64 + 1.0);
        let mut location = None;
        let mut clock_valuations = std::collections::BTreeMap::new();
        let mut ata_configuration = AtaConfiguration::new();
        for (group_index, group) in self.groups.iter().enumerate() {
            for symbol in group {
                let region_index = symbol.region_index();
                let fractional = if region_index % 2 == 0 {
                    0.0
                } else {
                    delta * (group_index as f64 + 1.0)
                };
                let valuation = f64::from(region_index / 2) + fractional;
                match symbol {
                    AbRegionSymbol::Plant(state) => {
                        location = Some(state.location.clone());
                        clock_valuations.insert(state.clock.clone(), valuation);
                    }
                    AbRegionSymbol::Ata(state) => {
                        ata_configuration.insert(AtaState {
                            location: state.formula.clone(),
                            clock_valuation: valuation,
                        });
                    }
                }
            }
        }
        let location = location.expect("canonical word without plant symbols");
        (Configuration { location, clock_valuations }, ata_configuration)
    }

    /// The word that directly follows this word in time.
    ///
    /// The group with the largest fractional part crosses into the next
    /// region: its symbols join the saturated group or become the new
    /// integer group. A leading integer group leaves the integer and keeps
    /// the smallest positive fraction. A fully saturated word is its own
    /// time successor.
    pub fn time_successor(&self, regions: &Regions) -> CanonicalWord<L> {
        let max_region_index = regions.max_region_index();
        let mut maxed: Vec<AbRegionSymbol<L>> = Vec::new();
        // Index of the latest group that still has room to grow.
        let last_group = self.groups.len() - 1;
        let last_is_maxed = self.groups[last_group]
            .iter()
            .all(|s| s.region_index() == max_region_index);
        let last_nonmaxed = if last_is_maxed {
            maxed = self.groups[last_group].clone();
            if last_group == 0 {
                return self.clone();
            }
            last_group - 1
        } else {
            last_group
        };

        let mut result: Vec<Vec<AbRegionSymbol<L>>> = Vec::new();
        // Advance the last non-saturated group into the next region.
        let mut advanced_nonmaxed = Vec::new();
        for symbol in &self.groups[last_nonmaxed] {
            let incremented = symbol.with_region_index(regions.incremented(symbol.region_index()));
            if incremented.region_index() == max_region_index {
                maxed.push(incremented);
            } else {
                advanced_nonmaxed.push(incremented);
            }
        }
        if !advanced_nonmaxed.is_empty() {
            result.push(advanced_nonmaxed);
        }

        if last_nonmaxed > 0 {
            // A leading integer group ages into the smallest positive
            // fraction; other groups keep their regions and order.
            if self.groups[0].iter().any(|s| s.region_index() % 2 == 0) {
                let mut advanced_first = Vec::new();
                for symbol in &self.groups[0] {
                    let incremented =
                        symbol.with_region_index(regions.incremented(symbol.region_index()));
                    if incremented.region_index() == max_region_index {
                        maxed.push(incremented);
                    } else {
                        advanced_first.push(incremented);
                    }
                }
                if !advanced_first.is_empty() {
                    result.push(advanced_first);
                }
            } else {
                result.push(self.groups[0].clone());
            }
            for group in &self.groups[1..last_nonmaxed] {
                result.push(group.clone());
            }
        }
        if !maxed.is_empty() {
            result.push(maxed);
        }
        CanonicalWord::from_groups(result)
    }

    /// All distinct time successors, paired with the number of atomic time
    /// steps to reach them. The first entry is the word itself at
    /// increment zero.
    pub fn time_successors(&self, regions: &Regions) -> Vec<(RegionIndex, CanonicalWord<L>)> {
        let mut result = vec![(0, self.clone())];
        let mut increment: RegionIndex = 1;
        let mut current = self.time_successor(regions);
        while current != result.last().expect("nonempty").1 {
            result.push((increment, current.clone()));
            increment += 1;
            current = result.last().expect("nonempty").1.time_successor(regions);
        }
        result
    }

    /// Check whether this word is covered by `other`: every group of this
    /// word is included in some group of `other`, respecting group order.
    ///
    /// A covered word carries fewer obligations than its coverer and
    /// therefore dominates it.
    pub fn is_covered_by(&self, other: &CanonicalWord<L>) -> bool {
        let mut next_other_group = 0;
        'groups: for group in &self.groups {
            for (index, other_group) in other.groups.iter().enumerate().skip(next_other_group) {
                if is_multiset_included(group, other_group) {
                    next_other_group = index + 1;
                    continue 'groups;
                }
            }
            return false;
        }
        true
    }
}

/// Check multiset inclusion of two sorted symbol vectors.
fn is_multiset_included<L: Ord>(
    subset: &[AbRegionSymbol<L>],
    superset: &[AbRegionSymbol<L>],
) -> bool {
    let mut superset_iter = superset.iter();
    'subset: for symbol in subset {
        for candidate in superset_iter.by_ref() {
            match candidate.cmp(symbol) {
                std::cmp::Ordering::Less => continue,
                std::cmp::Ordering::Equal => continue 'subset,
                std::cmp::Ordering::Greater => return false,
            }
        }
        return false;
    }
    true
}

impl<L: fmt::Display> fmt::Display for CanonicalWord<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bracketed(self.groups.iter().map(|group| braced(group.iter()))))
    }
}

/// Build the canonical word of a product configuration.
///
/// Plant clocks and automaton states are partitioned by the fractional
/// parts of their clock values, groups are sorted by fractional part
/// ascending, and every clock value is replaced by its region index. With
/// `set_semantics`, duplicate symbols within a group are collapsed.
pub fn canonical_word<L>(
    plant_configuration: &Configuration<L>,
    ata_configuration: &AtaConfiguration<MTLFormula>,
    regions: &Regions,
    set_semantics: bool,
) -> Result<CanonicalWord<L>, CanonicalWordError>
where
    L: Clone + Ord + fmt::Debug + fmt::Display,
{
    if plant_configuration.clock_valuations.is_empty() {
        return Err(CanonicalWordError("plants without clocks are not supported".into()));
    }
    // Tag every symbol with the fractional part of its clock.
    let mut tagged: Vec<(ClockValuation, AbRegionSymbol<L>)> = Vec::new();
    for (clock, valuation) in &plant_configuration.clock_valuations {
        let (_, fractional) = integral_and_fractional(*valuation);
        tagged.push((
            fractional,
            AbRegionSymbol::Plant(PlantRegionState {
                location: plant_configuration.location.clone(),
                clock: clock.clone(),
                region_index: regions.region_index(*valuation),
            }),
        ));
    }
    for state in ata_configuration {
        let (_, fractional) = integral_and_fractional(state.clock_valuation);
        tagged.push((
            fractional,
            AbRegionSymbol::Ata(AtaRegionState {
                formula: state.location.clone(),
                region_index: regions.region_index(state.clock_valuation),
            }),
        ));
    }
    tagged.sort_by(|(f1, s1), (f2, s2)| f1.total_cmp(f2).then_with(|| s1.cmp(s2)));
    // Group symbols with approximately equal fractional parts.
    let mut groups: Vec<Vec<AbRegionSymbol<L>>> = Vec::new();
    let mut group_fraction = f64::NAN;
    for (fraction, symbol) in tagged {
        if groups.is_empty() || !is_time_equal(fraction, group_fraction) {
            groups.push(Vec::new());
            group_fraction = fraction;
        }
        groups.last_mut().expect("nonempty").push(symbol);
    }
    if set_semantics {
        for group in &mut groups {
            group.dedup();
        }
    }
    let word = CanonicalWord::from_groups(groups);
    word.validate(regions)?;
    Ok(word)
}

/// Insert a word into a set, pruning by domination.
///
/// A word dominates another if it agrees on the plant component and
/// carries a subset of the obligations. Dominated words are dropped: the
/// insertion keeps only inclusion-minimal words.
pub fn insert_with_domination<L>(set: &mut BTreeSet<CanonicalWord<L>>, word: CanonicalWord<L>)
where
    L: Clone + Ord + fmt::Debug + fmt::Display,
{
    if set.iter().any(|existing| existing.is_covered_by(&word)) {
        // An existing word has fewer obligations and dominates the new one.
        return;
    }
    set.retain(|existing| !word.is_covered_by(existing));
    set.insert(word);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use vigil_logic::MTLFormula;

    fn plant_symbol(location: &str, clock: &str, region: RegionIndex) -> AbRegionSymbol<String> {
        AbRegionSymbol::Plant(PlantRegionState {
            location: location.to_string(),
            clock: clock.to_string(),
            region_index: region,
        })
    }

    fn ata_symbol(name: &str, region: RegionIndex) -> AbRegionSymbol<String> {
        AbRegionSymbol::Ata(AtaRegionState { formula: MTLFormula::ap(name), region_index: region })
    }

    fn configuration(location: &str, clocks: &[(&str, f64)]) -> Configuration<String> {
        Configuration {
            location: location.to_string(),
            clock_valuations: clocks
                .iter()
                .map(|(n, v)| (n.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn words_group_by_fractional_part() {
        let regions = Regions { largest_constant: 2 };
        let plant = configuration("l0", &[("x", 0.5), ("y", 1.5)]);
        let ata = AtaConfiguration::from([AtaState {
            location: MTLFormula::ap("q"),
            clock_valuation: 0.2,
        }]);
        let word = canonical_word(&plant, &ata, &regions, false).unwrap();
        assert_eq!(
            word,
            CanonicalWord::from_groups(vec![
                vec![ata_symbol("q", 1)],
                vec![plant_symbol("l0", "x", 1), plant_symbol("l0", "y", 3)],
            ])
        );
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let regions = Regions { largest_constant: 1 };
        let plant = configuration("l0", &[("x", 0.0)]);
        let ata = AtaConfiguration::from([AtaState {
            location: MTLFormula::ap("q"),
            clock_valuation: 0.7,
        }]);
        let word = canonical_word(&plant, &ata, &regions, false).unwrap();
        let (plant2, ata2) = word.candidate();
        let word2 = canonical_word(&plant2, &ata2, &regions, false).unwrap();
        assert_eq!(word, word2);
    }

    #[test]
    fn validation_rejects_mixed_groups() {
        let regions = Regions { largest_constant: 1 };
        let word = CanonicalWord::from_groups(vec![vec![
            plant_symbol("l0", "x", 0),
            ata_symbol("q", 1),
        ]]);
        assert!(word.validate(&regions).is_err());
        let word = CanonicalWord::from_groups(vec![
            vec![plant_symbol("l0", "x", 1)],
            vec![ata_symbol("q", 0)],
        ]);
        assert!(word.validate(&regions).is_err());
    }

    #[test]
    fn time_successor_rotates_the_last_group() {
        let regions = Regions { largest_constant: 2 };
        // [{(l0, x, 0)}, {(q, 1)}]: q has the largest fractional part.
        let word = CanonicalWord::from_groups(vec![
            vec![plant_symbol("l0", "x", 0)],
            vec![ata_symbol("q", 1)],
        ]);
        let successor = word.time_successor(&regions);
        // q crosses to the integer 1, x leaves the integer 0.
        assert_eq!(
            successor,
            CanonicalWord::from_groups(vec![
                vec![ata_symbol("q", 2)],
                vec![plant_symbol("l0", "x", 1)],
            ])
        );
    }

    #[test]
    fn saturated_words_are_time_fixpoints() {
        let regions = Regions { largest_constant: 1 };
        let word = CanonicalWord::from_groups(vec![vec![
            plant_symbol("l0", "x", 3),
            ata_symbol("q", 3),
        ]]);
        assert_eq!(word.time_successor(&regions), word);
        assert_eq!(word.time_successors(&regions).len(), 1);
    }

    #[test]
    fn time_successors_enumerate_until_saturation() {
        let regions = Regions { largest_constant: 1 };
        let word =
            CanonicalWord::from_groups(vec![vec![plant_symbol("l0", "x", 0), ata_symbol("q", 0)]]);
        let successors = word.time_successors(&regions);
        // 0: both at 0; 1: both in (0, 1); 2: both at 1; 3: both above 1.
        assert_eq!(successors.len(), 4);
        assert_eq!(successors[0].0, 0);
        assert_eq!(
            successors[3].1,
            CanonicalWord::from_groups(vec![vec![
                plant_symbol("l0", "x", 3),
                ata_symbol("q", 3)
            ]])
        );
    }

    #[test]
    fn domination_keeps_minimal_words() {
        let smaller =
            CanonicalWord::from_groups(vec![vec![plant_symbol("l0", "x", 1)]]);
        let larger = CanonicalWord::from_groups(vec![vec![
            plant_symbol("l0", "x", 1),
            ata_symbol("q", 1),
        ]]);
        assert!(smaller.is_covered_by(&larger));
        assert!(!larger.is_covered_by(&smaller));

        let mut set = BTreeSet::new();
        insert_with_domination(&mut set, larger.clone());
        insert_with_domination(&mut set, smaller.clone());
        assert_eq!(set, BTreeSet::from([smaller.clone()]));
        // Inserting the larger word again changes nothing.
        insert_with_domination(&mut set, larger);
        assert_eq!(set, BTreeSet::from([smaller]));
    }

    #[test]
    fn coverage_respects_group_order() {
        let word = CanonicalWord::from_groups(vec![
            vec![ata_symbol("q", 1)],
            vec![plant_symbol("l0", "x", 1)],
        ]);
        let reversed = CanonicalWord::from_groups(vec![
            vec![plant_symbol("l0", "x", 1)],
            vec![ata_symbol("q", 1)],
        ]);
        assert!(!word.is_covered_by(&reversed));
        assert!(word.is_covered_by(&word.clone()));
    }

    #[test]
    fn plant_projection_drops_ata_symbols() {
        let word = CanonicalWord::from_groups(vec![
            vec![ata_symbol("q", 1)],
            vec![plant_symbol("l0", "x", 1), ata_symbol("r", 1)],
        ]);
        assert_eq!(
            word.plant_projection(),
            CanonicalWord::from_groups(vec![vec![plant_symbol("l0", "x", 1)]])
        );
    }
}
