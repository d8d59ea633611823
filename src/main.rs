// Entry point and high-level CLI flow.
//
// One invocation reconciles one month:
// - the current month's order export is normalized and split by warehouse,
// - the previous month's GSTR1 workbook is scanned for cancelled/returned
//   orders, which are re-issued as negative entries,
// - per-warehouse ledgers, a returns workbook and a province summary are
//   written to the output directory.
mod assemble;
mod classify;
mod config;
mod error;
mod format;
mod loader;
mod normalize;
mod output;
mod pipeline;
mod reports;
mod returns;
mod types;
mod util;

use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use config::{RunConfig, SummaryMode, DEFAULT_MONTH, DEFAULT_OUTPUT_DIR};

#[derive(Parser, Debug)]
#[command(name = "gstr-recon")]
#[command(about = "Reconcile a monthly order export against warehouse rules and last month's returns", long_about = None)]
struct Cli {
    /// Current month's order export (.csv or workbook)
    #[arg(long)]
    current: PathBuf,

    /// Previous month's GSTR1 workbook
    #[arg(long)]
    previous: PathBuf,

    /// Reporting month, e.g. "DEC 2025"
    #[arg(short, long, default_value = DEFAULT_MONTH)]
    month: String,

    /// Directory the workbooks are written to
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Pivot written to the summary workbook
    #[arg(long, value_enum, default_value_t = SummaryMode::Province)]
    summary_mode: SummaryMode,

    /// Summary rows echoed to the console
    #[arg(long, default_value = "5")]
    preview_rows: usize,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl From<Cli> for RunConfig {
    fn from(cli: Cli) -> Self {
        RunConfig {
            current: cli.current,
            previous: cli.previous,
            month: cli.month,
            output_dir: cli.output_dir,
            summary_mode: cli.summary_mode,
            preview_rows: cli.preview_rows,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose >= 2)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    debug!(?cli, "starting");

    let config = RunConfig::from(cli);
    match pipeline::run(&config) {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => error!(error = %e, "cannot render run report"),
        },
        Err(e) => {
            error!(error = %e, "processing failed");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
