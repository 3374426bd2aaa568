//! `courier`: inspect how protocol fields travel.

use std::{io, path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use courier_cli::commands::{self, CliError};
use tracing::error;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Inspect indirect message encodings and key-value form documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Show the user-agent response delivering fields to a recipient
    Encode {
        /// Where the message is going
        #[arg(long)]
        recipient: Url,

        /// Wire size above which the form POST is used
        #[arg(long)]
        threshold: Option<usize>,

        /// Message fields
        #[arg(value_parser = commands::parse_field)]
        fields: Vec<(String, String)>,
    },

    /// Print a key-value form document as urlencoded fields
    DecodeKvf {
        /// Input file, or `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,
    },

    /// Print the wire size of a set of fields
    Size {
        /// Message fields
        #[arg(value_parser = commands::parse_field)]
        fields: Vec<(String, String)>,
    },
}

fn run(command: Command) -> Result<(), CliError> {
    let mut out = io::stdout().lock();
    match command {
        Command::Encode { recipient, threshold, fields } => {
            commands::encode(&mut out, &recipient, threshold, fields)
        },
        Command::DecodeKvf { input } => {
            let bytes = commands::read_input(&input)?;
            commands::decode_kvf(&mut out, &bytes)
        },
        Command::Size { fields } => commands::size(&mut out, fields),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "command failed");
            ExitCode::FAILURE
        },
    }
}
