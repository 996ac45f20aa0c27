//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use papercorpus_core::{
    ProcessCorpusConfig, ProcessCorpusResult, ProgressReporter, process_corpus, report_corpus,
};
use papercorpus_shared::{AppConfig, CorpusReport, ValidationConfig, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// papercorpus: scholarly TEI articles to validated chunk records.
#[derive(Parser)]
#[command(
    name = "papercorpus",
    version,
    about = "Extract, chunk, and validate a corpus of TEI XML articles.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Process every document in the input directory and write the report.
    Process {
        /// Directory of input XML documents.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Directory receiving one JSON record per article.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Validation report path.
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Maximum number of documents processed at once.
        #[arg(short, long, env = "PAPERCORPUS_CONCURRENCY")]
        concurrency: Option<usize>,
    },

    /// Rebuild the validation report from persisted article records.
    Report {
        /// Directory of persisted article records.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Validation report path.
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "papercorpus=info",
        1 => "papercorpus=debug",
        _ => "papercorpus=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Process {
            input,
            output,
            report,
            concurrency,
        } => cmd_process(input, output, report, concurrency).await,
        Command::Report { output, report } => cmd_report(output, report),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_process(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    report: Option<PathBuf>,
    concurrency: Option<usize>,
) -> Result<()> {
    let app = load_config()?;
    let mut config = ProcessCorpusConfig::from(&app);

    if let Some(input) = input {
        config.input_dir = input;
    }
    if let Some(output) = output {
        config.output_dir = output;
    }
    if let Some(report) = report {
        config.report_path = report;
    }
    if let Some(concurrency) = concurrency {
        if concurrency == 0 {
            return Err(eyre!("--concurrency must be at least 1"));
        }
        config.concurrency = concurrency;
    }

    if !config.input_dir.is_dir() {
        return Err(eyre!(
            "input directory '{}' does not exist or is not a directory",
            config.input_dir.display()
        ));
    }

    info!(
        input = %config.input_dir.display(),
        output = %config.output_dir.display(),
        concurrency = config.concurrency,
        "processing corpus"
    );

    let reporter = CliProgress::new();
    let result = process_corpus(&config, &reporter).await?;

    println!();
    println!("  Corpus processed.");
    print_report(&result.report);
    println!("  Skipped:   {}", result.skipped);
    println!("  Records:   {}", config.output_dir.display());
    println!("  Report:    {}", result.report_path.display());
    println!("  Manifest:  {}", result.manifest_path.display());
    println!("  Time:      {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_report(output: Option<PathBuf>, report: Option<PathBuf>) -> Result<()> {
    let app = load_config()?;
    let output_dir = output.unwrap_or_else(|| PathBuf::from(&app.paths.output_dir));
    let report_path = report.unwrap_or_else(|| PathBuf::from(&app.paths.report_path));

    info!(output = %output_dir.display(), "rebuilding report");

    let report = report_corpus(&output_dir, &report_path, ValidationConfig::from(&app))?;

    println!();
    println!("  Report rebuilt from persisted records.");
    print_report(&report);
    println!("  Report:    {}", report_path.display());
    println!();

    Ok(())
}

fn print_report(report: &CorpusReport) {
    println!("  Articles:  {}", report.total_articles);
    println!("  Valid:     {}", report.valid_articles);
    println!("  Failed:    {}", report.failed_parsing);
    println!("  Chunks:    {}", report.total_chunks);
    println!("  Avg chars: {:.1}", report.avg_chars_per_chunk);
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn document_processed(&self, article_id: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Processed [{current}/{total}] {article_id}"));
    }

    fn document_failed(&self, article_id: &str, reason: &str) {
        self.spinner
            .println(format!("  skipped {article_id}: {reason}"));
    }

    fn done(&self, _result: &ProcessCorpusResult) {
        self.spinner.finish_and_clear();
    }
}
