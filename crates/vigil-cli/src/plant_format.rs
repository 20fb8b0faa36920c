//! Parser for plant description files
//!
//! The grammar lives in `plant_format.pest`. A plant file describes a
//! timed automaton; locations are declared implicitly by the initial,
//! final and transition declarations.

use anyhow::{Context, Error, anyhow, bail};
use log::debug;
use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use vigil_automata::ta::{TimedAutomaton, Transition};
use vigil_automata::{ClockConstraint, Comparison};

#[allow(missing_docs)]
#[derive(Parser)]
#[grammar = "./plant_format.pest"]
struct PestPlantParser;

/// Parse a plant description into a timed automaton.
pub fn parse_plant(input: &str) -> Result<TimedAutomaton<String, String>, Error> {
    let mut pairs = PestPlantParser::parse(Rule::plant, input)
        .context("failed to parse the plant description")?;
    let plant = pairs.next().ok_or_else(|| anyhow!("empty parse result"))?;
    let mut inner = plant.into_inner();
    let name = inner
        .next()
        .filter(|pair| pair.as_rule() == Rule::name)
        .ok_or_else(|| anyhow!("plant misses its name"))?
        .as_str()
        .to_string();
    debug!("Parsing plant '{name}'");

    let mut clocks: Vec<String> = Vec::new();
    let mut initial: Option<String> = None;
    let mut finals: Vec<String> = Vec::new();
    let mut transitions: Vec<(String, String, String, Vec<(String, ClockConstraint)>, Vec<String>)> =
        Vec::new();
    for declaration in inner.filter(|pair| pair.as_rule() == Rule::declaration) {
        let declaration = declaration
            .into_inner()
            .next()
            .ok_or_else(|| anyhow!("empty declaration"))?;
        match declaration.as_rule() {
            Rule::clocks_declaration => {
                clocks.extend(parse_name_list(declaration)?);
            }
            Rule::initial_declaration => {
                let location = declaration
                    .into_inner()
                    .next()
                    .ok_or_else(|| anyhow!("initial declaration misses the location"))?;
                if initial.replace(location.as_str().to_string()).is_some() {
                    bail!("duplicate initial declaration");
                }
            }
            Rule::final_declaration => {
                finals.extend(parse_name_list(declaration)?);
            }
            Rule::transition_declaration => {
                transitions.push(parse_transition(declaration)?);
            }
            rule => bail!("unexpected rule {rule:?} in plant body"),
        }
    }
    let initial = initial.ok_or_else(|| anyhow!("plant '{name}' has no initial location"))?;

    let alphabet: Vec<String> = transitions.iter().map(|(_, _, action, _, _)| action.clone()).collect();
    let mut ta = TimedAutomaton::new(alphabet, initial, finals);
    for clock in clocks {
        ta.add_clock(clock);
    }
    for (source, target, _, _, _) in &transitions {
        ta.add_location(source.clone());
        ta.add_location(target.clone());
    }
    for (source, target, action, guards, resets) in transitions {
        ta.add_transition(Transition::new(source, action, target, guards, resets))
            .with_context(|| format!("invalid transition in plant '{name}'"))?;
    }
    Ok(ta)
}

fn parse_name_list(pair: Pair<'_, Rule>) -> Result<Vec<String>, Error> {
    let Some(list) = pair.into_inner().find(|pair| pair.as_rule() == Rule::name_list) else {
        return Ok(Vec::new());
    };
    Ok(list.into_inner().map(|name| name.as_str().to_string()).collect())
}

#[allow(clippy::type_complexity)]
fn parse_transition(
    pair: Pair<'_, Rule>,
) -> Result<(String, String, String, Vec<(String, ClockConstraint)>, Vec<String>), Error> {
    let mut names = Vec::new();
    let mut guards = Vec::new();
    let mut resets = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::name => names.push(inner.as_str().to_string()),
            Rule::guard_clause => {
                for guard in inner.into_inner() {
                    guards.push(parse_guard(guard)?);
                }
            }
            Rule::reset_clause => {
                resets = parse_name_list(inner)?;
            }
            rule => bail!("unexpected rule {rule:?} in transition"),
        }
    }
    let [source, target, action] = <[String; 3]>::try_from(names)
        .map_err(|_| anyhow!("transition misses source, target or action"))?;
    Ok((source, target, action, guards, resets))
}

fn parse_guard(pair: Pair<'_, Rule>) -> Result<(String, ClockConstraint), Error> {
    let mut inner = pair.into_inner();
    let clock = inner
        .next()
        .ok_or_else(|| anyhow!("guard misses the clock"))?
        .as_str()
        .to_string();
    let comparison = match inner
        .next()
        .ok_or_else(|| anyhow!("guard misses the comparison"))?
        .as_str()
    {
        "<" => Comparison::Less,
        "<=" => Comparison::LessEqual,
        "==" => Comparison::EqualTo,
        ">=" => Comparison::GreaterEqual,
        ">" => Comparison::Greater,
        other => bail!("unknown comparison operator '{other}'"),
    };
    let comparand = inner
        .next()
        .ok_or_else(|| anyhow!("guard misses the comparand"))?
        .as_str()
        .parse()
        .context("invalid guard comparand")?;
    Ok((clock, ClockConstraint { comparison, comparand }))
}
