use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chrono::Local;
use clap::Parser;
use owo_colors::OwoColorize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    cancel::CancelToken,
    cli::{Cli, Command, CrawlArgs},
    error::CrawlError,
    fetch::{FetchPolicy, Fetcher},
    pipeline::{CrawlOptions, Pipeline, Stage},
};

mod cancel;
mod citation;
mod cli;
mod error;
mod extract;
mod fetch;
mod html;
mod links;
mod listing;
mod output;
mod pipeline;
mod record;
mod venue;

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);
    match args.command {
        Command::Crawl(crawl_args) => crawl(crawl_args),
        Command::Venues { json } => list_venues(json),
        Command::Bibtex { input, out } => bibtex(&input, &out),
    }
}

/// Logs go to stderr; stdout only ever carries the path of the file written.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(use_color())
        .with_target(false)
        .init();
}

fn use_color() -> bool {
    std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal()
}

fn crawl(args: CrawlArgs) -> anyhow::Result<()> {
    let profile = match &args.profile {
        Some(path) => venue::load(path, &args.venue)?,
        None => venue::builtin(&args.venue).ok_or_else(|| CrawlError::UnknownVenue(args.venue.clone()))?,
    };
    let venue = profile.compile(args.year, args.track.as_deref(), args.abstract_trim)?;
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(output::default_file_name(&venue.file_label(), Local::now())));

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        if handler_token.is_cancelled() {
            // Second interrupt: give up on the graceful stop.
            std::process::exit(130);
        }
        warn!("interrupt received; stopping after in-flight requests (again to abort)");
        handler_token.cancel();
    })
    .context("installing the interrupt handler")?;

    let policy = FetchPolicy {
        retries: args.retries,
        backoff_base: args.delay,
        politeness: args.delay,
        timeout: args.timeout,
    };
    let fetcher = Fetcher::new(&venue.profile.user_agent, policy, cancel.clone());
    let options = CrawlOptions {
        override_url: args.listing_url.clone(),
        max_concurrency: args.concurrency.into(),
        progress_every: args.progress_every,
        show_progress: !args.no_progress && std::io::stderr().is_terminal(),
    };

    info!(
        venue = %venue.profile.display,
        year = venue.year,
        track = %venue.track.name,
        out = %out.display(),
        "crawling"
    );
    let outcome = Pipeline::new(&fetcher, &venue, &options, cancel).run()?;
    drop(fetcher);

    output::write_records(&out, &outcome.records)?;
    println!("{}", out.display());

    let c = outcome.counters;
    info!(
        listing_pages = c.listing_pages,
        section_pages = c.section_pages,
        detail_links = c.detail_links,
        citations = c.citations_attached,
        citation_failures = c.citation_failures,
        "run finished"
    );
    let note = match outcome.stage {
        Stage::Done => String::new(),
        other => format!("  ({other})"),
    };
    summary(c.records, c.skipped, &note);
    Ok(())
}

fn list_venues(json: bool) -> anyhow::Result<()> {
    let profiles = venue::builtins();
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&profiles).context("serialising profiles")?
        );
        return Ok(());
    }
    for p in profiles {
        let listing = p
            .tracks
            .first()
            .and_then(|t| t.listings.first())
            .map(String::as_str)
            .unwrap_or("-");
        println!("{:<6} {:<6} {:<16} {listing}", p.id, p.display, p.track_names().join(","));
    }
    Ok(())
}

fn bibtex(input: &Path, out: &Path) -> anyhow::Result<()> {
    let records = output::read_records(input)?;
    let export = output::export_bibtex(&records);
    if export.entries == 0 {
        bail!("no BibTeX entries found in {}", input.display());
    }
    std::fs::write(out, &export.text).with_context(|| format!("writing {}", out.display()))?;
    println!("{}", out.display());
    info!(
        duplicates = export.duplicates,
        invalid = export.invalid,
        missing = export.missing,
        "bibtex export finished"
    );
    summary(export.entries, export.duplicates + export.invalid, "");
    Ok(())
}

/// `✓ <ok> ✗ <failed>` on stderr.
fn summary(ok: usize, failed: usize, note: &str) {
    if use_color() {
        eprintln!("{} {}  {} {}{note}", "✓".green(), ok, "✗".red(), failed);
    } else {
        eprintln!("✓ {ok}  ✗ {failed}{note}");
    }
}
