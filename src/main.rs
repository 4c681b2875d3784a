use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedwatch::cli::Cli;
use feedwatch::config::Config;
use feedwatch::domain::RunReport;
use feedwatch::errors::{ErrorKind, WatcherResult};
use feedwatch::notifier::SmtpNotifier;
use feedwatch::services::{WatchOptions, WatchService};
use feedwatch::sources::RssAtomReader;
use feedwatch::storage::JsonStateStore;

fn main() {
    // Logs go to stderr; stdout carries the run report
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run() -> WatcherResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_env()?;
    if let Some(state_file) = cli.state_file {
        config.state_file = state_file;
    }

    let reader = RssAtomReader::new().with_max_items(config.max_items_per_feed);
    let store = JsonStateStore::new(&config.state_file);
    let notifier = SmtpNotifier::new(&config)?;
    let options = WatchOptions::from_config(&config, cli.dry_run);

    if cli.dry_run {
        println!("Dry run: no email will be sent and no state will be written.\n");
    }
    println!("Checking {} feed(s)...\n", config.feed_urls.len());

    let service = WatchService::new(reader, store, notifier, options);
    let report = service.run(&config.feed_urls)?;

    print_report(&report, cli.dry_run);
    Ok(())
}

fn print_report(report: &RunReport, dry_run: bool) {
    for outcome in &report.outcomes {
        println!("{}", outcome.feed_url);

        match &outcome.error {
            Some(err) if err.kind == ErrorKind::Fetch => {
                println!("  FAILED ({}): {}", err.kind, err.message);
            }
            error => {
                println!(
                    "  fetched: {}, new: {}, notified: {}{}",
                    outcome.fetched_count,
                    outcome.new_count,
                    if outcome.notified { "yes" } else { "no" },
                    if outcome.bootstrapped { " (bootstrapped)" } else { "" }
                );
                if let Some(err) = error {
                    println!("  FAILED ({}): {}", err.kind, err.message);
                }
            }
        }
        println!();
    }

    let failed = report.failures().count();
    if dry_run {
        println!(
            "Dry run complete. Would notify {} new entries ({} feed(s) failed).",
            report.total_new(),
            failed
        );
    } else {
        println!(
            "Run complete: {} new entries across {} feed(s), {} failed.",
            report.total_new(),
            report.outcomes.len(),
            failed
        );
    }
}
