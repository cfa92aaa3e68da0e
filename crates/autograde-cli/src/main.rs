//! autograde CLI: grade worksheet submissions from the command line.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "autograde", version, about = "Worksheet autograding engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a single submission
    Grade {
        /// Worksheet file (.toml or .json)
        #[arg(long)]
        worksheet: PathBuf,

        /// Answers JSON file
        #[arg(long)]
        answers: PathBuf,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Grade a directory of submissions
    Batch {
        /// Worksheet file (.toml or .json)
        #[arg(long)]
        worksheet: PathBuf,

        /// Directory of submission JSON files
        #[arg(long)]
        submissions: PathBuf,

        /// Max concurrent submissions (overrides config)
        #[arg(long)]
        parallelism: Option<usize>,

        /// Output directory (overrides config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: json, html, all
        #[arg(long, default_value = "json")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List answers awaiting manual review, or apply reviewer overrides
    Review {
        /// Grade report JSON
        #[arg(long)]
        report: PathBuf,

        /// Overrides JSON keyed by submission id
        #[arg(long)]
        apply: Option<PathBuf>,
    },

    /// Compare two grade reports
    Compare {
        /// Baseline report JSON
        #[arg(long)]
        baseline: PathBuf,

        /// Current report JSON
        #[arg(long)]
        current: PathBuf,

        /// Change threshold in percentage points
        #[arg(long, default_value = "5")]
        threshold: f64,

        /// Exit code 1 if any submission lost points
        #[arg(long)]
        fail_on_regression: bool,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Validate worksheet files
    Validate {
        /// Path to worksheet file or directory
        #[arg(long)]
        worksheet: PathBuf,
    },

    /// Create starter config and example worksheet
    Init,
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "autograde=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Grade {
            worksheet,
            answers,
            format,
            config,
        } => commands::grade::execute(worksheet, answers, format, config),
        Commands::Batch {
            worksheet,
            submissions,
            parallelism,
            output,
            format,
            config,
        } => {
            commands::batch::execute(worksheet, submissions, parallelism, output, format, config)
                .await
        }
        Commands::Review { report, apply } => commands::review::execute(report, apply),
        Commands::Compare {
            baseline,
            current,
            threshold,
            fail_on_regression,
            format,
        } => commands::compare::execute(baseline, current, threshold, fail_on_regression, format),
        Commands::Validate { worksheet } => commands::validate::execute(worksheet),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
