#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use trapezoid_farm::config::{ConfigOverrides, Isolation, StrategyKind, TotalMode};
use trapezoid_farm::run_cmd::RunArgs;
use trapezoid_farm::{functions_cmd, run_cmd, worker_cmd};

#[derive(Parser, Debug)]
#[command(name = "trapezoid-farm")]
#[command(about = "Trapezoid-rule integration under bounded concurrency", long_about = None)]
struct Cli {
    /// Enable verbose logging (or set TRAPEZOID_FARM_LOG)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Integrate every `start end steps funcId` record from the input
    Run {
        /// Read records from this file instead of stdin
        #[arg(long)]
        input: Option<std::path::PathBuf>,
        /// Engine config file (TOML, or YAML by extension)
        #[arg(long)]
        config: Option<std::path::PathBuf>,
        /// Dispatch strategy
        #[arg(long, value_enum)]
        strategy: Option<StrategyKind>,
        /// Maximum simultaneous independent workers
        #[arg(long)]
        max_workers: Option<usize>,
        /// Workers per synchronous batch
        #[arg(long)]
        batch_size: Option<usize>,
        /// How independent workers are isolated
        #[arg(long, value_enum)]
        isolation: Option<Isolation>,
        /// Whether batch totals accumulate across batches
        #[arg(long, value_enum)]
        total_mode: Option<TotalMode>,
        /// Print a query prompt before reading each record
        #[arg(long)]
        prompt: bool,
        /// Append every result to this JSONL file
        #[arg(long)]
        jsonl: Option<std::path::PathBuf>,
        /// Write a machine-readable JSON run summary to this file
        #[arg(long)]
        summary: Option<std::path::PathBuf>,
    },

    /// List the registered functions
    Functions,

    /// Integrate a single request and print it as JSON (used by process workers)
    #[command(hide = true)]
    Worker {
        #[arg(long, allow_negative_numbers = true)]
        start: f64,
        #[arg(long, allow_negative_numbers = true)]
        end: f64,
        #[arg(long)]
        steps: u64,
        #[arg(long)]
        function: usize,
    },
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("TRAPEZOID_FARM_LOG").unwrap_or_else(|_| {
        if verbose { "trapezoid_farm=debug".to_string() } else { "trapezoid_farm=info".to_string() }
    });
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::ACTIVE)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

fn main() {
    color_eyre::install().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            input,
            config,
            strategy,
            max_workers,
            batch_size,
            isolation,
            total_mode,
            prompt,
            jsonl,
            summary,
        } => run_cmd::run(RunArgs {
            input,
            config,
            overrides: ConfigOverrides {
                strategy,
                max_concurrent_workers: max_workers,
                batch_size,
                isolation,
                total_mode,
                prompt,
            },
            jsonl,
            summary,
        })
        .map(|_| ()),
        Commands::Functions => functions_cmd::run(),
        Commands::Worker { start, end, steps, function } => worker_cmd::run(start, end, steps, function),
    };

    if let Err(e) = result {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
