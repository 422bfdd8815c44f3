#![deny(unsafe_code)]
//! CLI binary for the backdrop procedural background generator.
//!
//! Subcommands:
//! - `render` : generate one background and write a PNG
//! - `batch`  : generate many backgrounds into a directory with a manifest
//! - `params` : print default parameters and their schema

mod error;

use backdrop_core::prng::{derive_seed, entropy_seed, RandomSource};
use backdrop_core::{BackgroundParams, Recipe, Xorshift64};
use backdrop_output::batch::{
    run_batch, BatchConfig, DEFAULT_LAYERS_MAX, DEFAULT_LAYERS_MIN, DEFAULT_PREFIX, DEFAULT_SIZE,
};
use backdrop_output::snapshot::write_png;
use clap::{Parser, Subcommand};
use error::CliError;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "backdrop", about = "Procedural background generator")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate one background and write it as a PNG.
    Render {
        /// Image side length in pixels.
        #[arg(short, long, default_value_t = DEFAULT_SIZE)]
        size: usize,

        /// Number of blended layers. Drawn from [2, 4) when omitted.
        #[arg(short, long)]
        layers: Option<usize>,

        /// PRNG seed. Drawn from system entropy when omitted.
        #[arg(long)]
        seed: Option<u64>,

        /// Output file path.
        #[arg(short, long, default_value = "background.png")]
        output: PathBuf,

        /// Background parameters as a JSON string.
        #[arg(long, default_value = "{}")]
        params: String,
    },
    /// Generate many backgrounds into a directory.
    Batch {
        /// Number of images.
        #[arg(short, long)]
        count: usize,

        /// Image side length in pixels.
        #[arg(short, long, default_value_t = DEFAULT_SIZE)]
        size: usize,

        /// Base PRNG seed. Drawn from system entropy when omitted.
        #[arg(long)]
        seed: Option<u64>,

        /// Index of the first image (file numbering starts here).
        #[arg(long, default_value_t = 0)]
        start: usize,

        /// Inclusive minimum layer count.
        #[arg(long, default_value_t = DEFAULT_LAYERS_MIN)]
        layers_min: usize,

        /// Exclusive maximum layer count.
        #[arg(long, default_value_t = DEFAULT_LAYERS_MAX)]
        layers_max: usize,

        /// File name prefix.
        #[arg(long, default_value = DEFAULT_PREFIX)]
        prefix: String,

        /// Output directory.
        #[arg(short = 'd', long, default_value = "backgrounds")]
        output_dir: PathBuf,

        /// Background parameters as a JSON string.
        #[arg(long, default_value = "{}")]
        params: String,
    },
    /// Print default parameters and the parameter schema.
    Params,
}

fn parse_params(raw: &str) -> Result<serde_json::Value, CliError> {
    serde_json::from_str(raw).map_err(CliError::Params)
}

fn print_report(info: &serde_json::Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(info).map_err(CliError::Report)?);
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Params => {
            print_report(&serde_json::json!({
                "defaults": BackgroundParams::default().to_json(),
                "schema": BackgroundParams::param_schema(),
            }))?;
        }
        Command::Render {
            size,
            layers,
            seed,
            output,
            params,
        } => {
            let seed = seed.unwrap_or_else(entropy_seed);
            let layers = layers.unwrap_or_else(|| {
                Xorshift64::new(derive_seed(seed, 0))
                    .next_usize_range(DEFAULT_LAYERS_MIN, DEFAULT_LAYERS_MAX)
            });
            let recipe = Recipe {
                params: parse_params(&params)?,
                ..Recipe::new(size, layers, seed)
            };
            recipe.validate()?;

            tracing::debug!(size, layers, seed, "rendering background");
            let image = recipe.render()?;
            write_png(&image, &output)?;

            if cli.json {
                print_report(&serde_json::json!({
                    "output": output.display().to_string(),
                    "recipe": recipe,
                }))?;
            } else {
                eprintln!(
                    "rendered {size}x{size} background ({layers} layers, seed {seed}) -> {}",
                    output.display()
                );
            }
        }
        Command::Batch {
            count,
            size,
            seed,
            start,
            layers_min,
            layers_max,
            prefix,
            output_dir,
            params,
        } => {
            let config = BatchConfig {
                count,
                size,
                layers_min,
                layers_max,
                seed: seed.unwrap_or_else(entropy_seed),
                start_index: start,
                prefix,
                output_dir,
                params: parse_params(&params)?,
            };
            let report = run_batch(&config)?;

            if cli.json {
                print_report(&serde_json::json!({
                    "seed": config.seed,
                    "written": report.written.len(),
                    "failed": report.failed,
                    "manifest": report.manifest.display().to_string(),
                }))?;
            } else {
                eprintln!(
                    "wrote {} of {count} backgrounds (seed {}) -> {}",
                    report.written.len(),
                    config.seed,
                    config.output_dir.display()
                );
            }
        }
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}
