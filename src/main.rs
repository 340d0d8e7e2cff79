use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dms_clone::config::RunConfig;
use dms_clone::logging::{self, Verbosity};
use dms_clone::output::{self, Format, ValidationSummary};
use dms_clone::run::{self, CloneRun, RunMode};
use dms_clone::service::MigrationService;
use dms_clone::service::dms::DmsService;
use dms_clone::service::memory::{MemoryService, Snapshot};

#[derive(Parser)]
#[command(
    name = "dms-clone",
    version,
    about = "Clone DMS replication tasks onto new source and target endpoints"
)]
struct Cli {
    /// Run configuration file
    #[arg(long, global = true, default_value = "dms-clone.yaml")]
    config: PathBuf,
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "json")]
    format: Format,
    /// Shorthand for --format pretty
    #[arg(long, global = true, hide = true)]
    pretty: bool,
    /// Debug logging on stderr
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// No logging on stderr
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Disable colored output (also respects NO_COLOR env var)
    #[arg(long, global = true)]
    no_color: bool,
    /// Write a per-run log file into this directory (overrides log_dir)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    /// Use a JSON snapshot instead of the live DMS API
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate transforms, then recreate matching tasks on the new endpoints
    Run,
    /// Show which tasks would be recreated without testing or creating anything
    Plan,
    /// Check every transform key against the current endpoints
    Validate,
    /// Parse and validate the configuration file, then print it
    CheckConfig,
}

fn connect(cli: &Cli, config: &RunConfig) -> dms_clone::error::Result<Box<dyn MigrationService>> {
    match &cli.snapshot {
        Some(path) => {
            tracing::info!(snapshot = %path.display(), "using offline snapshot");
            Ok(Box::new(MemoryService::new(Snapshot::load(path)?)))
        }
        None => Ok(Box::new(DmsService::connect(config.dms())?)),
    }
}

/// Install logging, then open the service the command runs against.
fn open_session(cli: &Cli, config: &RunConfig) -> dms_clone::error::Result<Box<dyn MigrationService>> {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else if cli.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };
    let ansi = !(cli.no_color || std::env::var_os("NO_COLOR").is_some());
    let log_dir = cli.log_dir.clone().or_else(|| config.log_dir.clone());
    if let Some(path) = logging::init(verbosity, log_dir.as_deref(), ansi)? {
        tracing::info!(log_file = %path.display(), "logging to file");
    }
    connect(cli, config)
}

fn run(cli: Cli, format: Format) -> dms_clone::error::Result<()> {
    let config = RunConfig::load(&cli.config)?;
    match cli.command {
        Commands::CheckConfig => output::print_config(&config, format),
        Commands::Validate => {
            let service = open_session(&cli, &config)?;
            let directory = run::validate_only(service.as_ref(), &config)?;
            output::print_validation(&ValidationSummary::new(&config, &directory), format)
        }
        Commands::Plan => {
            let service = open_session(&cli, &config)?;
            let report = CloneRun::new(service.as_ref(), &config).execute(RunMode::Plan)?;
            output::print_report(&report, format)
        }
        Commands::Run => {
            let service = open_session(&cli, &config)?;
            let report = CloneRun::new(service.as_ref(), &config).execute(RunMode::Apply)?;
            output::print_report(&report, format)
        }
    }
}


fn main() {
    let cli = Cli::parse();
    if cli.no_color || std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    }
    let format = if cli.pretty {
        Format::Pretty
    } else {
        cli.format
    };
    if let Err(e) = run(cli, format) {
        tracing::error!(code = e.code(), "{e}");
        match format {
            Format::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "error": e.code(),
                        "message": e.to_string()
                    })
                );
            }
            _ => eprintln!("error: {e}"),
        }
        std::process::exit(1);
    }
}
