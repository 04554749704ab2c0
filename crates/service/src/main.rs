//! lamina-nest CLI

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use lamina_service::{api, ApiResponse};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lamina-nest")]
#[command(about = "Cuts irregular pieces from a single lamina with a genetic algorithm")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize a cutting request and print the layout as JSON
    Optimize {
        /// Request file (JSON), or "-" for stdin
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the response (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seed overriding the one in the request
        #[arg(long)]
        seed: Option<u64>,

        /// Pretty-print the response
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a cutting request without optimizing it
    Validate {
        /// Request file (JSON), or "-" for stdin
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Optimize {
            input,
            output,
            seed,
            pretty,
        } => {
            let body = read_input(&input)?;
            let result = api::parse_request(&body).and_then(|mut request| {
                if seed.is_some() {
                    request.seed = seed;
                }
                api::optimize(&request)
            });
            let response = ApiResponse::from(result);
            let json = response.to_json(pretty)?;

            match output {
                Some(path) => std::fs::write(&path, json + "\n")
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => writeln!(std::io::stdout().lock(), "{json}")?,
            }

            match response {
                ApiResponse::Ok(plan) => {
                    tracing::info!(
                        placed = plan.placed.len(),
                        unplaced = plan.unplaced_count,
                        runtime = plan.runtime,
                        "Optimization complete"
                    );
                }
                ApiResponse::Error(error) => {
                    bail!("{} ({})", error.message, error.status);
                }
            }
        }

        Commands::Validate { input } => {
            let body = read_input(&input)?;
            let request = api::parse_request(&body)?;
            let validated = api::validate_request(&request)?;
            println!(
                "Request is valid: {} shapes, {} pieces, lamina area {:.2}",
                validated.pieces.len(),
                validated.total_quantity(),
                validated.lamina.area()
            );
        }
    }

    Ok(())
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .context("failed to read request from stdin")?;
        Ok(body)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
    }
}
