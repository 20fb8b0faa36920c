//! vigil command line interface
//!
//! Reads a plant description and an MTL specification, runs the synthesis
//! game search and writes the resulting controller as UPPAAL XML. See the
//! `--help` output for all commands and options.

use std::collections::BTreeSet;
use std::process::exit;
use std::time::Duration;

use anyhow::{Context, Error};
use clap::Parser;
use human_panic::setup_panic;
use log::{debug, error, info, warn};

use vigil_display_utils::sorted_joined;
use vigil_logic::AtomicProposition;
use vigil_logic::parser::parse_formula;
use vigil_search::controller::create_controller;
use vigil_search::search::{SearchOutcome, TreeSearch};
use vigil_search::{Plant, SearchConfig, location_names};
use vigil_translation::translate;

use crate::cli::{
    Cli, apply_heuristic_overrides, initialize_logger, load_config, partition_actions,
};
use crate::output_formats::{UppaalDocument, document_actions};

mod cli;
mod output_formats;
mod plant_format;
mod vigil_config;

/// Exit code: the controller was synthesized and written.
const EXIT_REALIZABLE: i32 = 0;
/// Exit code: the specification cannot be enforced.
const EXIT_UNREALIZABLE: i32 = 1;
/// Exit code: the input was invalid.
const EXIT_INPUT_ERROR: i32 = 2;
/// Exit code: the search was cancelled.
const EXIT_CANCELLED: i32 = 3;
/// Exit code: the state space exceeded the configured cap.
const EXIT_UNKNOWN: i32 = 4;

fn main() {
    setup_panic!();
    let cli = Cli::parse();
    if let Err(error) = initialize_logger(&cli.log_config) {
        eprintln!("failed to initialize logging: {error:#}");
        exit(EXIT_INPUT_ERROR);
    }
    info!("This is vigil {}", env!("CARGO_PKG_VERSION"));
    let code = match run(cli) {
        Ok(code) => code,
        Err(error) => {
            error!("{error:#}");
            EXIT_INPUT_ERROR
        }
    };
    exit(code);
}

fn run(cli: Cli) -> Result<i32, Error> {
    match cli.command {
        cli::Commands::Synthesize {
            input,
            spec,
            controller_actions,
            environment_actions,
            max_constant,
            location_constraints,
            workers,
            timeout,
            heuristic_weights,
            config_file,
            out,
            dot,
        } => {
            let plant_text = std::fs::read_to_string(&input.plant)
                .with_context(|| format!("failed to read '{}'", input.plant.display()))?;
            let plant = plant_format::parse_plant(&plant_text)?;
            info!(
                "Parsed plant with {} locations and {} transitions",
                plant.locations().len(),
                plant.transitions().count()
            );

            let formula = parse_formula(&spec)?;
            debug!("Parsed specification: {formula}");

            let (controller_actions, environment_actions) = partition_actions(
                vigil_automata::ta::TimedAutomaton::alphabet(&plant),
                &controller_actions,
                &environment_actions,
            )?;

            let mut config = load_config(config_file.as_ref())?;
            if let Some(overrides) = &heuristic_weights {
                apply_heuristic_overrides(&mut config.heuristic, overrides)?;
            }
            let workers = workers.or(config.workers).unwrap_or(1);

            // The automaton must be prepared for everything the plant can
            // emit: either its location names or its action names.
            let alphabet: BTreeSet<AtomicProposition> = if location_constraints {
                plant
                    .locations()
                    .iter()
                    .map(|l| AtomicProposition::new(l.to_string()))
                    .collect()
            } else {
                plant
                    .alphabet()
                    .iter()
                    .map(|a| AtomicProposition::new(a.to_string()))
                    .collect()
            };
            let ata = translate(&formula, alphabet)?;

            let k = max_constant.unwrap_or_else(|| {
                Plant::largest_constant(&plant).max(formula.largest_constant())
            });
            info!("Searching with K = {k} and {workers} worker(s)");

            let search_config = SearchConfig {
                location_constraints,
                set_semantics: false,
                node_cap: config.node_cap,
            };
            let location_symbols = location_constraints.then(location_names::<String>);
            let search = TreeSearch::new(
                &plant,
                &ata,
                controller_actions,
                environment_actions,
                k,
                search_config,
                location_symbols,
                Box::new(config.heuristic.build()),
            )?;

            if let Some(timeout) = timeout {
                let cancel = search.cancel_flag();
                std::thread::spawn(move || {
                    std::thread::sleep(Duration::from_millis(timeout));
                    cancel.store(true, std::sync::atomic::Ordering::SeqCst);
                });
            }

            let outcome = search.search(workers)?;
            info!("Search finished over {} nodes: {outcome:?}", search.num_nodes());
            match outcome {
                SearchOutcome::Realizable => {
                    let controller = create_controller(&search)?;
                    let document = UppaalDocument::from_controller(&controller);
                    std::fs::write(&out, document.to_xml())
                        .with_context(|| format!("failed to write '{}'", out.display()))?;
                    info!(
                        "Controller with actions {{{}}} written to '{}'",
                        sorted_joined(document_actions(&document), ", "),
                        out.display()
                    );
                    #[cfg(feature = "dot")]
                    if let Some(dot) = dot {
                        use vigil_automata::dot::ToDot;
                        std::fs::write(&dot, controller.to_dot())
                            .with_context(|| format!("failed to write '{}'", dot.display()))?;
                        info!("Controller graph written to '{}'", dot.display());
                    }
                    #[cfg(not(feature = "dot"))]
                    if dot.is_some() {
                        warn!("Ignoring --dot, this build lacks the 'dot' feature");
                    }
                    Ok(EXIT_REALIZABLE)
                }
                SearchOutcome::Unrealizable => {
                    warn!("The specification cannot be enforced on this plant");
                    Ok(EXIT_UNREALIZABLE)
                }
                SearchOutcome::Cancelled => {
                    warn!("The search was cancelled before the root was decided");
                    Ok(EXIT_CANCELLED)
                }
                SearchOutcome::Unknown => {
                    warn!("The search gave up, result unknown");
                    Ok(EXIT_UNKNOWN)
                }
            }
        }
        #[cfg(feature = "dot")]
        cli::Commands::Visualize { input, out } => {
            use vigil_automata::dot::ToDot;
            let plant_text = std::fs::read_to_string(&input.plant)
                .with_context(|| format!("failed to read '{}'", input.plant.display()))?;
            let plant = plant_format::parse_plant(&plant_text)?;
            std::fs::write(&out, plant.to_dot())
                .with_context(|| format!("failed to write '{}'", out.display()))?;
            info!("Plant graph written to '{}'", out.display());
            Ok(EXIT_REALIZABLE)
        }
    }
}
