use anyhow::{Context, Result};
use chksum::LOG_FILTER_ENV;
use chksum::audit::{Auditor, RunSummary};
use chksum::cli::Cli;
use chksum::config::{Config, ReportSink};
use chksum::output::{self, ConsoleReporter, LogFileReporter, Reporter, Verbosity};
use clap::{CommandFactory, Parser};
use clap_complete::{Generator, generate};
use colored::Colorize;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            process::exit(1);
        }
    }
}

/// Returns whether at least one directory was audited to completion.
fn run() -> Result<bool> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        print_completions(shell, &mut Cli::command());
        return Ok(true);
    }

    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else if cli.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };
    output::set_verbosity(verbosity);
    init_logging(verbosity);

    let config = load_config(&cli)?;
    debug!("Effective configuration: {config:?}");

    let root = cli.root.as_path();
    match config.report.sink {
        ReportSink::Stdout => {
            let reporter = ConsoleReporter::new();
            Ok(audit(&config, &reporter, root))
        }
        ReportSink::LogFile => {
            let dir = config
                .report
                .log_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from("."));
            let reporter = LogFileReporter::create(&dir)?;
            println!("Writing detailed log into {}...", reporter.path().display());
            Ok(audit(&config, &reporter, root))
        }
    }
}

/// `CHKSUM_LOG` takes precedence over the verbosity flags.
fn init_logging(verbosity: Verbosity) {
    let fallback = match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => "warn",
        Verbosity::Verbose => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let path = cli.config.clone().or_else(Config::default_path);
    let mut config = match &path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    cli.apply_to(&mut config);
    config.validate()?;
    Ok(config)
}

fn audit(config: &Config, reporter: &dyn Reporter, root: &Path) -> bool {
    let started = Instant::now();
    let summary = Auditor::new(config, reporter).run(root);
    info!(?summary, "Audit of {} finished", root.display());
    print_summary(&summary, started.elapsed());
    summary.succeeded()
}

fn print_summary(summary: &RunSummary, elapsed: Duration) {
    let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    output::info(&format!(
        "Audited {} directories in {}: {} updated, {} unchanged ({} added, {} deleted, {} changed)",
        summary.directories(),
        humantime::format_duration(Duration::from_millis(millis)),
        summary.updated,
        summary.unchanged,
        summary.added,
        summary.deleted,
        summary.changed,
    ));
    if summary.warnings > 0 {
        output::warning(&format!("{} entries could not be recorded", summary.warnings));
    }
    if summary.failed + summary.skipped > 0 {
        output::error(&format!(
            "{} directories failed, {} could not be listed",
            summary.failed, summary.skipped
        ));
    }
}

fn print_completions<G: Generator>(g: G, cmd: &mut clap::Command) {
    generate(g, cmd, cmd.get_name().to_string(), &mut io::stdout());
}
