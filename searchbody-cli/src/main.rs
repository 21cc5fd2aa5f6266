use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "searchbody")]
#[command(about = "Build Elasticsearch-style request bodies from plan files")]
#[command(version)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply a build plan and print the request body
    Build {
        /// Plan file (.json, .yaml or .yml)
        #[arg(short, long)]
        plan: PathBuf,

        /// Builder config (TOML)
        #[arg(short, long, env = "SEARCHBODY_CONFIG")]
        config: Option<PathBuf>,

        /// Always include the `aggs` section
        #[arg(short, long)]
        aggregation: bool,

        /// Print compact JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },

    /// Print the default builder config as TOML
    Defaults,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Build {
            plan,
            config,
            aggregation,
            compact,
        } => {
            let body = commands::build::run(&plan, config.as_deref(), aggregation)?;
            let out = if compact {
                serde_json::to_string(&body)?
            } else {
                serde_json::to_string_pretty(&body)?
            };
            println!("{}", out);
        }
        Commands::Defaults => {
            print!("{}", commands::defaults::run()?);
        }
    }

    Ok(())
}
