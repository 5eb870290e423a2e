use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::filter::EnvFilter;
use trycatch_core::{throw, throw_bare};

mod config;
mod demo;

#[derive(Parser)]
#[command(name = "trycatch", version, about = "Structured exception runtime demo")]
struct Cli {
    /// Path to trycatch.toml (searched upwards from the current directory by default)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run built-in scenarios and print their transcripts
    Demo {
        /// Scenario to run (repeatable); defaults to the configured list, then all
        #[arg(long = "scenario")]
        scenarios: Vec<String>,
    },
    /// List the demo exception hierarchy
    Types,
    /// Throw with no active region, handing the exception to the default handler
    Raise {
        /// Exception kind, e.g. FileNotFoundError
        kind: String,
        /// Optional message
        message: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(config.log.filter.parse()?))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Demo { scenarios } => {
            let names = if scenarios.is_empty() {
                config.demo.scenarios
            } else {
                scenarios
            };
            run_demo(&names)?
        }
        Commands::Types => list_types(),
        Commands::Raise { kind, message } => raise(&kind, message)?,
    }

    Ok(())
}

fn run_demo(names: &[String]) -> Result<()> {
    for (scenario, lines) in demo::run(names)? {
        println!("== {}: {}", scenario.name, scenario.description);
        for line in lines {
            println!("   {line}");
        }
    }
    Ok(())
}

fn list_types() {
    for kind in demo::KINDS {
        let chain: Vec<&str> = kind.ancestors().map(|a| a.name()).collect();
        if chain.is_empty() {
            println!("{}", kind.name());
        } else {
            println!("{} -> {}", kind.name(), chain.join(" -> "));
        }
    }
}

fn raise(kind: &str, message: Option<String>) -> Result<()> {
    let kind = demo::kind_by_name(kind)
        .with_context(|| format!("unknown exception kind: {kind} (see `trycatch types`)"))?;
    match message {
        Some(message) => throw(kind, message),
        None => throw_bare(kind),
    }
}
