//! Action successor computation on canonical words
//!
//! For one concrete candidate of a canonical word and one action, the
//! plant and the specification automaton step synchronously: the plant
//! takes every enabled transition, the automaton reads either the action
//! name or the proposition of the location the plant moved into. Every
//! combination of plant successor and automaton successor is
//! re-canonicalized into a successor word.

use std::collections::BTreeSet;

use log::trace;
use vigil_automata::ata::{Ata, AtaConfiguration};
use vigil_automata::regions::Regions;
use vigil_automata::ta::Configuration;
use vigil_logic::{AtomicProposition, MTLFormula};

use crate::canonical_word::{CanonicalWord, CanonicalWordError, canonical_word};
use crate::{LocationSymbols, Plant, SearchConfig};

/// The specification automaton type used by the search: locations are
/// formulas of the negated specification, symbols are propositions.
pub type SpecAta = Ata<MTLFormula, AtomicProposition>;

/// Compute all successor words of a product configuration under one
/// action.
///
/// `location_symbols` must be present when the configuration demands
/// location constraints; the automaton then reads the proposition of each
/// plant successor's location.
pub fn next_canonical_words<P: Plant>(
    plant: &P,
    ata: &SpecAta,
    configuration: &(Configuration<P::Location>, AtaConfiguration<MTLFormula>),
    action: &P::Action,
    regions: &Regions,
    config: &SearchConfig,
    location_symbols: Option<&LocationSymbols<P::Location>>,
) -> Result<Vec<CanonicalWord<P::Location>>, CanonicalWordError> {
    let (plant_configuration, ata_configuration) = configuration;
    let mut result = Vec::new();
    let plant_successors = plant.symbol_step(plant_configuration, action);
    trace!(
        "{} plant successor(s) for action {action} in {plant_configuration}",
        plant_successors.len()
    );
    if plant_successors.is_empty() {
        return Ok(result);
    }
    let mut action_successors: Option<BTreeSet<AtaConfiguration<MTLFormula>>> = None;
    for plant_successor in plant_successors {
        let ata_successors = match (config.location_constraints, location_symbols) {
            (true, Some(symbols)) => {
                let proposition = symbols(&plant_successor.target.location);
                ata.symbol_step(ata_configuration, &proposition)
            }
            _ => action_successors
                .get_or_insert_with(|| {
                    ata.symbol_step(
                        ata_configuration,
                        &AtomicProposition::new(action.to_string()),
                    )
                })
                .clone(),
        };
        for ata_successor in ata_successors {
            result.push(canonical_word(
                &plant_successor.target,
                &ata_successor,
                regions,
                config.set_semantics,
            )?);
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_automata::ata::Formula;
    use vigil_automata::ta::{TimedAutomaton, Transition};
    use crate::canonical_word::AbRegionSymbol;

    fn loop_plant() -> TimedAutomaton<String, String> {
        let mut ta = TimedAutomaton::new(["a".to_string()], "l0".to_string(), []);
        ta.add_clock("x");
        ta.add_transition(Transition::unguarded(
            "l0".to_string(),
            "a".to_string(),
            "l0".to_string(),
        ))
        .unwrap();
        ta
    }

    fn loop_ata() -> SpecAta {
        Ata::new(
            [AtomicProposition::new("a")],
            MTLFormula::ap("q"),
            [],
            [(
                MTLFormula::ap("q"),
                AtomicProposition::new("a"),
                Formula::reset(Formula::Location(MTLFormula::ap("q"))),
            )],
        )
        .unwrap()
    }

    #[test]
    fn action_successors_combine_plant_and_ata() {
        let plant = loop_plant();
        let ata = loop_ata();
        let regions = Regions { largest_constant: 1 };
        let configuration = (plant.initial_configuration(), ata.initial_configuration());
        let words = next_canonical_words(
            &plant,
            &ata,
            &configuration,
            &"a".to_string(),
            &regions,
            &SearchConfig::default(),
            None,
        )
        .unwrap();
        assert_eq!(words.len(), 1);
        // The automaton reset its clock, the plant clock kept running.
        let word = &words[0];
        assert_eq!(word.groups().len(), 1);
        assert!(word.symbols().all(|s| s.region_index() == 0));
        assert_eq!(word.symbols().filter(|s| matches!(s, AbRegionSymbol::Ata(_))).count(), 1);
    }

    #[test]
    fn disabled_actions_produce_no_words() {
        let plant = loop_plant();
        let ata = loop_ata();
        let regions = Regions { largest_constant: 1 };
        let configuration = (plant.initial_configuration(), ata.initial_configuration());
        let words = next_canonical_words(
            &plant,
            &ata,
            &configuration,
            &"b".to_string(),
            &regions,
            &SearchConfig::default(),
            None,
        )
        .unwrap();
        assert!(words.is_empty());
    }
}
