use clap::{Parser, Subcommand};
use puzzlematch::{Engine, EngineConfig, FloorPolicy, SolveRequest};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "PuzzleMatch CLI (prints a JSON report)")]
struct Cli {
    /// Treat results below the confidence floor as failures.
    #[arg(long)]
    hard_floor: bool,
    /// Enable tracing output for diagnostics.
    #[arg(long)]
    trace: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find the horizontal placement of a piece in a background.
    Slider {
        /// Background image (raw bytes or base64, optionally a data URL).
        background: PathBuf,
        /// Piece image; its alpha channel masks the search.
        piece: PathBuf,
    },
    /// Find the rotation between an inner disc and an outer ring.
    Rotation {
        /// Inner disc image.
        inner: PathBuf,
        /// Outer ring image.
        outer: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("puzzlematch=debug".parse()?),
            )
            .with_target(false)
            .init();
    }

    let mut config = EngineConfig::default();
    if cli.hard_floor {
        config.score.floor_policy = FloorPolicy::Hard;
    }
    let engine = Engine::new(config);

    let report = match &cli.command {
        Command::Slider { background, piece } => {
            let background = fs::read(background)?;
            let piece = fs::read(piece)?;
            engine.solve(SolveRequest::Slider {
                background: &background,
                piece: &piece,
            })
        }
        Command::Rotation { inner, outer } => {
            let inner = fs::read(inner)?;
            let outer = fs::read(outer)?;
            engine.solve(SolveRequest::Rotation {
                inner: &inner,
                outer: &outer,
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.success {
        std::process::exit(1);
    }
    Ok(())
}
