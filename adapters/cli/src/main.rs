#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter for analysing tracks and running headless races.

mod config;
mod driver;
mod track_file;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vector_racing_rendering::Scene;
use vector_racing_system_benchmark::{BenchmarkConfig, SortKey};
use vector_racing_system_planner::{HeuristicKind, Planner};
use vector_racing_world::{
    track::{Track, TrackGrid},
    Race,
};

use crate::config::{HumanPolicy, RaceConfig};

#[derive(Debug, Parser)]
#[command(name = "vector-racing", version, about = "Vector racing track tools")]
struct Cli {
    /// TOML file with race settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Analyse a track and report its regions and layout issues.
    Validate {
        /// Track file (.json rows, .txt glyphs or a transfer string).
        track: PathBuf,
    },
    /// Plan a route from the first finish cell and print it.
    Plan {
        track: PathBuf,
        #[arg(long)]
        heuristic: Option<HeuristicKind>,
        #[arg(long)]
        laps: Option<u32>,
    },
    /// Run a headless race between the human policy and the autopilot.
    Race {
        track: PathBuf,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        laps: Option<u32>,
        #[arg(long)]
        heuristic: Option<HeuristicKind>,
        #[arg(long, value_enum)]
        human: Option<HumanPolicy>,
        /// Race the human seat alone.
        #[arg(long)]
        solo: bool,
        #[arg(long)]
        max_turns: Option<u64>,
    },
    /// Compare every heuristic on the track.
    Bench {
        track: PathBuf,
        #[arg(long, default_value_t = vector_racing_system_benchmark::DEFAULT_TRIALS)]
        trials: u32,
        #[arg(long, default_value = "time")]
        sort: SortKey,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the single-line transfer string of a track.
    Encode { track: PathBuf },
    /// Decode a transfer string into glyph rows or JSON.
    Decode {
        transfer: String,
        #[arg(long)]
        json: bool,
    },
}

/// Entry point for the vector racing command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = RaceConfig::load(cli.config.as_deref())?;

    match cli.command {
        CliCommand::Validate { track } => validate(&track),
        CliCommand::Plan {
            track,
            heuristic,
            laps,
        } => plan(
            &track,
            heuristic.unwrap_or(config.heuristic),
            laps.unwrap_or(config.required_laps),
            config.max_expansions,
        ),
        CliCommand::Race {
            track,
            seed,
            laps,
            heuristic,
            human,
            solo,
            max_turns,
        } => {
            let config = RaceConfig {
                seed: seed.unwrap_or(config.seed),
                required_laps: laps.unwrap_or(config.required_laps),
                heuristic: heuristic.unwrap_or(config.heuristic),
                human: human.unwrap_or(config.human),
                autopilot: config.autopilot && !solo,
                max_turns: max_turns.unwrap_or(config.max_turns),
                ..config
            };
            let summary = driver::run_race(load_track(&track)?, &config)?;
            print!("{summary}");
            Ok(())
        }
        CliCommand::Bench {
            track,
            trials,
            sort,
            json,
        } => bench(
            &track,
            BenchmarkConfig {
                trials,
                required_laps: config.required_laps,
                max_expansions: config.max_expansions,
            },
            sort,
            json,
        ),
        CliCommand::Encode { track } => {
            let grid = load_grid(&track)?;
            println!("{}", track_file::encode_transfer(&grid));
            Ok(())
        }
        CliCommand::Decode { transfer, json } => {
            let grid = track_file::decode_transfer(&transfer).context("invalid transfer string")?;
            if json {
                println!("{}", track_file::to_json(&grid)?);
            } else {
                for line in grid.to_glyphs() {
                    println!("{line}");
                }
            }
            Ok(())
        }
    }
}

fn load_grid(path: &Path) -> Result<TrackGrid> {
    track_file::load_track(path).with_context(|| format!("failed to load {}", path.display()))
}

fn load_track(path: &Path) -> Result<Track> {
    let grid = load_grid(path)?;
    Track::analyze(grid).with_context(|| format!("{} is not a raceable track", path.display()))
}

fn validate(path: &Path) -> Result<()> {
    let track = load_track(path)?;
    let grid = track.grid();

    println!("{}x{} track", grid.columns(), grid.rows());
    for (tile, count) in track_file::tile_census(grid) {
        println!("  {tile:?}: {count}");
    }
    println!(
        "finish line: {} cells, anchor {}",
        track.finish_line().len(),
        track.finish_anchor()
    );
    for region in [track.checkpoint1(), track.checkpoint2()] {
        println!("{}: {} cells", region.kind(), region.len());
    }

    if track.layout_issues().is_empty() {
        println!("no layout issues");
    } else {
        for issue in track.layout_issues() {
            println!("issue: {issue:?}");
        }
    }
    Ok(())
}

fn plan(path: &Path, heuristic: HeuristicKind, laps: u32, max_expansions: usize) -> Result<()> {
    let track = load_track(path)?;
    let start = track.finish_anchor();
    let outcome = Planner::with_kind(heuristic)
        .with_max_expansions(max_expansions)
        .plan(&track, start, laps)
        .with_context(|| format!("no plan with {heuristic}"))?;

    let race = Race::new(track);
    print!("{}", Scene::capture(&race, Some(&outcome.plan)));
    println!(
        "{} moves, {} expansions, {} generated",
        outcome.plan.move_count(),
        outcome.stats.expansions,
        outcome.stats.generated
    );
    for waypoint in outcome.plan.waypoints() {
        println!("  {waypoint}");
    }
    Ok(())
}

fn bench(path: &Path, config: BenchmarkConfig, sort: SortKey, json: bool) -> Result<()> {
    let track = load_track(path)?;
    let report = vector_racing_system_benchmark::run(&track, config)?.sorted(sort);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}
