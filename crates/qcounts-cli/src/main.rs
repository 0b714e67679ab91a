//! qcounts Command-Line Interface
//!
//! Submits a circuit to an OQC cloud QPU and prints the measured counts,
//! or decodes a saved results document offline.
//!
//! ```text
//! qcounts run -i bell.qasm -s 1000 -q 2 -d qpu:uk:2:d865b5a184
//! qcounts decode -i results.json -q 2 --format json
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::common::OutputFormat;
use commands::{decode, run, version};

/// qcounts - dense measurement histograms from cloud QPUs
#[derive(Parser)]
#[command(name = "qcounts")]
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
    /// Run a circuit on an OQC device and print its counts
    Run {
        /// Circuit source file (OpenQASM)
        #[arg(short, long)]
        input: String,

        /// Number of shots
        #[arg(short, long, default_value = "1024")]
        shots: u32,

        /// Number of measured qubits
        #[arg(short = 'q', long)]
        qubits: u32,

        /// Device identifier (defaults to OQC_DEVICE)
        #[arg(short, long, default_value = "")]
        device: String,

        /// Opaque extra configuration, passed through unparsed
        #[arg(long, default_value = "")]
        extra_config: String,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Decode a saved results document into a dense histogram
    Decode {
        /// JSON file holding a `cbits` map
        #[arg(short, long)]
        input: String,

        /// Number of measured qubits
        #[arg(short = 'q', long)]
        qubits: u32,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
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
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Execute command
    let result = match cli.command {
        Commands::Run {
            input,
            shots,
            qubits,
            device,
            extra_config,
            format,
        } => run::execute(&input, shots, qubits, &device, &extra_config, format),

        Commands::Decode {
            input,
            qubits,
            format,
        } => decode::execute(&input, qubits, format),

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
