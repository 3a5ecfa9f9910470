// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Set up logging (tracing, to stderr, filtered by RUST_LOG)
// 2. Parse command-line arguments using clap and build the crawl config
// 3. Create the output directory (the one error that stops everything)
// 4. Run the crawl, printing a progress line per event
// 5. Print the report and exit with the proper code
//
// Exit codes:
//   0 = crawl finished, every URL handled
//   1 = crawl finished, but some URLs failed (or it was interrupted)
//   2 = fatal error before the crawl could start
// 130 = interrupted twice, no report
// =============================================================================

mod cli;
mod config;
mod crawl;
mod error;
mod fetch;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use crawl::{CrawlEvent, CrawlReport, Crawler};

#[tokio::main]
async fn main() {
    init_tracing();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = cli.crawl_config()?;

    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| {
            format!(
                "cannot create output directory {}",
                config.output_dir.display()
            )
        })?;

    let crawler = Crawler::new(config)?;

    // The progress trace would get in the way of the JSON on stdout
    let (crawler, printer) = if cli.json {
        (crawler, None)
    } else {
        let (events, rx) = mpsc::unbounded_channel();
        (crawler.with_events(events), Some(tokio::spawn(print_trace(rx))))
    };

    // First Ctrl-C stops the crawl and still prints the report; a second one
    // exits right away
    let cancel = crawler.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Interrupted, stopping the crawl (press Ctrl-C again to quit)");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted twice, exiting");
            std::process::exit(130);
        }
    });

    let report = crawler.run().await;
    let output_dir = crawler.config().output_dir.clone();

    // Dropping the crawler closes the event channel, which ends the printer
    drop(crawler);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    print_report(&report, &output_dir, cli.json)?;

    if report.is_clean() {
        Ok(0)
    } else {
        Ok(1)
    }
}

async fn print_trace(mut events: mpsc::UnboundedReceiver<CrawlEvent>) {
    while let Some(event) = events.recv().await {
        println!("{}", event);
    }
}

// Prints the report either as JSON or as a short summary
fn print_report(report: &CrawlReport, output_dir: &Path, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!();
    println!("📊 Summary:");
    println!("   🌐 Visited:    {}", report.visited);
    println!("   📄 Pages:      {}", report.pages);
    println!(
        "   ⬇️  Downloaded: {} (into {})",
        report.downloaded.len(),
        output_dir.display()
    );
    println!("   ✅ Up to date: {}", report.skipped);
    println!("   ❌ Failed:     {}", report.failures.len());

    if !report.failures.is_empty() {
        println!();
        for failure in &report.failures {
            println!("   {} - {}", failure.url, failure.message);
        }
    }

    if report.cancelled {
        println!();
        println!("⚠️  Crawl was interrupted before the queue was empty");
    }

    Ok(())
}
