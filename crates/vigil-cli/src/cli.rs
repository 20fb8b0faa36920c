//! Command line interface definition
//!
//! The CLI is built with `clap`'s derive API. All available commands and
//! options are defined here, along with the logger setup and the glue
//! turning parsed arguments into a configured search.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Error, anyhow};
use clap::{ArgAction, Args, Parser, Subcommand};
use log::{LevelFilter, info};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;

/// vigil - controller synthesis for real-time plants
///
/// vigil reads a plant description and an MTL specification, searches the
/// regionalized product game and, if the specification is enforceable,
/// writes the synthesized controller as an UPPAAL XML file.
///
/// Exit codes: 0 the controller was written, 1 the specification is not
/// enforceable, 2 the input was invalid, 3 the search was cancelled,
/// 4 the state space exceeded the configured cap.
#[derive(Parser, Debug)]
#[command(version, name = "vigil", about, long_about)]
pub struct Cli {
    #[command(flatten)]
    pub log_config: LoggerConfig,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synthesize a controller for a plant against a specification
    Synthesize {
        #[command(flatten)]
        input: PlantInput,

        /// The MTL specification the controller must enforce
        #[arg(short, long, value_name = "MTL")]
        spec: String,

        /// Actions the controller may decide to take
        #[arg(short, long, value_name = "ACTIONS", value_delimiter = ',')]
        controller_actions: Vec<String>,

        /// Actions under the environment's control
        #[arg(short, long, value_name = "ACTIONS", value_delimiter = ',')]
        environment_actions: Vec<String>,

        /// Override the largest constant of the region abstraction
        #[arg(short = 'K', long, value_name = "K")]
        max_constant: Option<u32>,

        /// Let the specification talk about plant locations instead of
        /// actions
        #[arg(short, long, default_value_t = false)]
        location_constraints: bool,

        /// Number of expansion workers
        #[arg(short, long, value_name = "N")]
        workers: Option<usize>,

        /// Cancel the search after this many milliseconds
        #[arg(short, long, value_name = "MS")]
        timeout: Option<u64>,

        /// Override heuristic weights, e.g. 'bfs=16,environment_first=2'
        #[arg(long, value_name = "WEIGHTS")]
        heuristic_weights: Option<String>,

        /// Configuration file with heuristic weights and limits
        #[arg(long, value_name = "CONFIG_FILE")]
        config_file: Option<PathBuf>,

        /// Where to write the synthesized controller
        #[arg(short, long, value_name = "XML_FILE")]
        out: PathBuf,

        /// Also write the controller as a Graphviz graph (needs the `dot`
        /// feature)
        #[arg(long, value_name = "DOT_FILE")]
        dot: Option<PathBuf>,
    },
    /// Visualize a plant description as a Graphviz graph
    #[cfg(feature = "dot")]
    Visualize {
        #[command(flatten)]
        input: PlantInput,

        /// Where to write the graph
        #[arg(short, long, value_name = "DOT_FILE")]
        out: PathBuf,
    },
}

/// The plant description input.
#[derive(Args, Debug)]
pub struct PlantInput {
    /// Path to the plant description file
    #[arg(short, long, value_name = "PLANT_FILE")]
    pub plant: PathBuf,
}

/// Verbosity options shared by all commands.
#[derive(Args, Debug)]
pub struct LoggerConfig {
    /// Increase the log level (repeatable)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Initialize the global logger from the verbosity options.
pub fn initialize_logger(config: &LoggerConfig) -> Result<(), Error> {
    let level = if config.quiet {
        LevelFilter::Error
    } else {
        match config.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{h({l:<5})} {m}{n}")))
        .build();
    let log_config = log4rs::Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))
        .context("failed to assemble the logger configuration")?;
    log4rs::init_config(log_config).context("failed to initialize the logger")?;
    Ok(())
}

/// Load the layered configuration: file, then environment.
pub fn load_config(config_file: Option<&PathBuf>) -> Result<crate::vigil_config::VigilConfig, Error> {
    let mut settings = config::Config::builder();
    if let Some(config_file) = config_file {
        if !config_file.exists() {
            return Err(anyhow!(
                "specified configuration file '{}' does not exist",
                config_file.display()
            ));
        }
        settings = settings.add_source(config::File::from(config_file.clone()));
    }
    settings = settings.add_source(config::Environment::with_prefix("VIGIL"));
    let config = settings
        .build()
        .context("failed to load the configuration")?
        .try_deserialize::<crate::vigil_config::VigilConfig>()
        .context("failed to interpret the configuration")?;
    info!("Loaded configuration: {config:?}");
    Ok(config)
}

/// Apply a comma-separated list of `name=weight` overrides to heuristic
/// weights.
pub fn apply_heuristic_overrides(
    weights: &mut crate::vigil_config::HeuristicWeights,
    overrides: &str,
) -> Result<(), Error> {
    for assignment in overrides.split(',').filter(|a| !a.trim().is_empty()) {
        let (name, value) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("malformed heuristic weight '{assignment}'"))?;
        let value: i64 = value
            .trim()
            .parse()
            .with_context(|| format!("invalid weight in '{assignment}'"))?;
        match name.trim() {
            "bfs" => weights.bfs = value,
            "dfs" => weights.dfs = value,
            "fewer_words" => weights.fewer_words = value,
            "environment_first" => weights.environment_first = value,
            "small_increment" => weights.small_increment = value,
            other => return Err(anyhow!("unknown heuristic '{other}'")),
        }
    }
    Ok(())
}

/// Split the action sets and check them against the plant's alphabet.
pub fn partition_actions(
    alphabet: &BTreeSet<String>,
    controller_actions: &[String],
    environment_actions: &[String],
) -> Result<(BTreeSet<String>, BTreeSet<String>), Error> {
    let controller: BTreeSet<String> = controller_actions.iter().cloned().collect();
    let environment: BTreeSet<String> = environment_actions.iter().cloned().collect();
    for action in controller.iter().chain(&environment) {
        if !alphabet.contains(action) {
            return Err(anyhow!("action '{action}' does not appear in the plant"));
        }
    }
    Ok((controller, environment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn action_partition_rejects_unknown_actions() {
        let alphabet = BTreeSet::from(["a".to_string(), "b".to_string()]);
        assert!(partition_actions(&alphabet, &["a".to_string()], &["b".to_string()]).is_ok());
        assert!(partition_actions(&alphabet, &["c".to_string()], &[]).is_err());
    }

    #[test]
    fn heuristic_overrides_apply_by_name() {
        let mut weights = crate::vigil_config::HeuristicWeights::default();
        apply_heuristic_overrides(&mut weights, "bfs=0, dfs=8").unwrap();
        assert_eq!(weights.bfs, 0);
        assert_eq!(weights.dfs, 8);
        assert_eq!(weights.environment_first, 2);
        assert!(apply_heuristic_overrides(&mut weights, "depth=1").is_err());
        assert!(apply_heuristic_overrides(&mut weights, "bfs").is_err());
    }
}
