//! Command-line front end for the campus SEIR simulator
//!
//! ```text
//! campus-seir run --scenario fall.json --repetitions 20 --threads 4 \
//!     --output summary.json --daily-csv daily.csv
//! campus-seir validate --scenario fall.json
//! ```

mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Config;
use std::fs;
use std::path::{Path, PathBuf};

use campus_seir_core::{Experiment, ScenarioConfig};

// ISO 8601 timestamp and color coded level tag
const LOG_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%SZ)} {h({l})} {t} - {m}{n}";

#[derive(Parser)]
#[command(name = "campus-seir", version, about = "Stochastic SEIR simulation of a campus")]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every repetition of a scenario and aggregate the results
    Run {
        /// Scenario JSON file
        #[arg(short, long)]
        scenario: PathBuf,

        /// Override the scenario's repetition count
        #[arg(short, long)]
        repetitions: Option<usize>,

        /// Base seed; repetition seeds are derived from it
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Worker threads
        #[arg(short, long, default_value_t = 1)]
        threads: usize,

        /// Summary JSON output (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Daily mean series as CSV
        #[arg(long)]
        daily_csv: Option<PathBuf>,
    },

    /// Parse a scenario and build its roster without running it
    Validate {
        #[arg(short, long)]
        scenario: PathBuf,
    },
}

fn init_logging(level: LevelFilter) -> Result<()> {
    let stderr = ConsoleAppender::builder()
        .target(log4rs::append::console::Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
        .context("failed to build log configuration")?;
    log4rs::init_config(config).context("failed to install logger")?;
    Ok(())
}

fn load_scenario(path: &Path) -> Result<ScenarioConfig> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario {}", path.display()))?;
    let scenario = ScenarioConfig::from_json(&json)
        .with_context(|| format!("failed to parse scenario {}", path.display()))?;
    scenario
        .validate()
        .with_context(|| format!("invalid scenario {}", path.display()))?;
    Ok(scenario)
}

fn run(
    scenario: &Path,
    repetitions: Option<usize>,
    seed: u64,
    threads: usize,
    output: Option<&Path>,
    daily_csv: Option<&Path>,
) -> Result<()> {
    let config = load_scenario(scenario)?;
    let mut experiment = Experiment::from_scenario(&config, seed)
        .context("failed to set up experiment")?
        .with_threads(threads);
    if let Some(repetitions) = repetitions {
        experiment = experiment.with_repetitions(repetitions);
    }
    info!(
        "Loaded {}: {} individuals, {} meetings",
        scenario.display(),
        experiment.roster().num_individuals(),
        experiment.roster().num_meetings()
    );

    let summary = experiment.run().context("simulation failed")?;

    let json = serde_json::to_string_pretty(&summary).context("failed to serialize summary")?;
    match output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Summary written to {}", path.display());
        }
        None => println!("{}", json),
    }

    if let Some(path) = daily_csv {
        output::write_daily_csv(path, &summary)?;
        info!("Daily series written to {}", path.display());
    }
    Ok(())
}

fn validate(scenario: &Path) -> Result<()> {
    let config = load_scenario(scenario)?;
    let roster = config.build_roster().context("failed to build roster")?;
    println!(
        "{}: {} individuals, {} meetings, {} meeting days",
        scenario.display(),
        roster.num_individuals(),
        roster.num_meetings(),
        roster.calendar().count()
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level)?;

    match cli.command {
        Command::Run {
            scenario,
            repetitions,
            seed,
            threads,
            output,
            daily_csv,
        } => run(
            &scenario,
            repetitions,
            seed,
            threads,
            output.as_deref(),
            daily_csv.as_deref(),
        ),
        Command::Validate { scenario } => validate(&scenario),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCENARIO: &str = r#"{
        "roster": {"meetings": [{
            "name": "ENG 101",
            "source_label": "Classroom",
            "members": [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
            "schedule": {"Weekly": [
                {"start": "2020-09-02", "end": "2020-09-30", "weekdays": "MWF", "minutes": 50}
            ]}
        }]},
        "parameters": {"start_date": "2020-09-02", "end_date": "2020-09-30", "repetitions": 2},
        "initial_exposure": {"Random": 1}
    }"#;

    fn scenario_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_cli_parses_run_arguments() {
        let cli = Cli::try_parse_from([
            "campus-seir", "run", "--scenario", "s.json", "--threads", "4", "--log-level", "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level, LevelFilter::Debug);
        match cli.command {
            Command::Run { threads, seed, repetitions, .. } => {
                assert_eq!(threads, 4);
                assert_eq!(seed, 0);
                assert_eq!(repetitions, None);
            }
            Command::Validate { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn test_run_writes_outputs() {
        let scenario = scenario_file(SCENARIO);
        let dir = tempfile::tempdir().unwrap();
        let summary_path = dir.path().join("summary.json");
        let csv_path = dir.path().join("daily.csv");

        run(scenario.path(), Some(3), 5, 2, Some(&summary_path), Some(&csv_path)).unwrap();

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&summary_path).unwrap()).unwrap();
        assert_eq!(summary["repetitions"], 3);
        let csv = fs::read_to_string(&csv_path).unwrap();
        assert_eq!(csv.lines().count(), 1 + 29);
    }

    #[test]
    fn test_invalid_scenario_reports_path() {
        let scenario = scenario_file(r#"{"roster": {}}"#);
        let error = load_scenario(scenario.path()).unwrap_err();
        assert!(format!("{:#}", error).contains("failed to parse scenario"));
    }
}
