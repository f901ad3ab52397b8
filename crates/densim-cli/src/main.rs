//! densim Command-Line Interface
//!
//! Runs JSON instruction programs on the density-matrix engine and prints
//! the saved results.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{memory, run, version};

/// densim - density-matrix evolution with noise channels
#[derive(Parser)]
#[command(name = "densim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a JSON program and print the saved data
    Run {
        /// Program file (JSON)
        #[arg(short, long)]
        input: String,

        /// Engine configuration (YAML or JSON)
        #[arg(short, long)]
        config: Option<String>,

        /// Sample this many outcomes of the final state
        #[arg(short, long, default_value = "0")]
        shots: usize,

        /// Seed for measurement and readout-error draws
        #[arg(long, env = "DENSIM_SEED")]
        seed: Option<u64>,

        /// Output file for the JSON report (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Estimate the memory needed for a register
    Memory {
        /// Number of qubits
        #[arg(short, long)]
        qubits: usize,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Run {
            input,
            config,
            shots,
            seed,
            output,
        } => run::execute(&input, config.as_deref(), shots, seed, output.as_deref()),

        Commands::Memory { qubits } => {
            memory::execute(qubits);
            Ok(())
        }

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
