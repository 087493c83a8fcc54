//! Scantrack launcher
//!
//! `scantrack serve` runs the HTTP API. The other subcommands open the same
//! store directly for one-shot reads and writes.

use clap::{Parser, Subcommand};
use scantrack_logging::LogConfig;
use scantrack_server::{ServeArgs, StoreArgs};
use std::process::ExitCode;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "scantrack", version, about = "Barcode scan counter and movement log")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve(ServeArgs),

    /// Record one scan of a barcode
    Scan {
        /// Barcode to count
        barcode: String,

        /// Person responsible for the scan
        #[arg(long = "by")]
        responsible: String,

        /// Signed change to apply (negative to remove stock)
        #[arg(short = 'i', long, default_value_t = 1, allow_negative_numbers = true)]
        increment: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List every barcode, most recently scanned first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the movement history of one barcode
    Logs {
        /// Barcode to inspect
        barcode: String,

        /// Number of entries to show (at most 50)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the number of barcodes and the summed quantity
    Totals {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn run_command(cli: Cli) -> anyhow::Result<()> {
    let store = cli.store;
    match cli.command {
        Commands::Serve(serve) => cli::serve::run(store, serve),
        Commands::Scan {
            barcode,
            responsible,
            increment,
            json,
        } => cli::scan::run(
            store,
            cli::scan::ScanArgs {
                barcode,
                responsible,
                increment,
                json,
            },
        ),
        Commands::List { json } => cli::list::run(store, json),
        Commands::Logs {
            barcode,
            limit,
            json,
        } => cli::logs::run(
            store,
            cli::logs::LogsArgs {
                barcode,
                limit,
                json,
            },
        ),
        Commands::Totals { json } => cli::totals::run(store, json),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let is_server = matches!(cli.command, Commands::Serve(_));
    if let Err(err) = scantrack_logging::init_logging(LogConfig {
        app_name: "scantrack",
        verbose: cli.verbose,
        quiet_console: !is_server,
    }) {
        eprintln!("Warning: logging disabled: {:#}", err);
    }

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:?}", err);
            ExitCode::from(1)
        }
    }
}
