use std::{path::PathBuf, time::Duration};

use clap::{ArgAction, Args, Parser, Subcommand};
use url::Url;

use crate::extract::AbstractTrim;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// More logging (-v debug, -vv trace). RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl one venue/year/track and write the records as JSON
    Crawl(CrawlArgs),
    /// List the built-in venues
    Venues {
        /// Dump the full profiles as JSON (usable with `crawl --profile`)
        #[arg(long)]
        json: bool,
    },
    /// Export the citations of a crawl output as a BibTeX file
    Bibtex {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(short, long, value_name = "PATH", default_value = "references.bib")]
        out: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// Venue id, e.g. `acl` (see `papercrawl venues`)
    pub venue: String,

    #[arg(long, value_parser = clap::value_parser!(i32).range(1900..=2100))]
    pub year: i32,

    /// Track of the venue; defaults to its first one
    #[arg(long)]
    pub track: Option<String>,

    /// Use this page as the root listing instead of the venue's URL templates
    #[arg(long, value_name = "URL")]
    pub listing_url: Option<Url>,

    /// Read the venue profile from a JSON file instead of the built-in table
    #[arg(long, value_name = "FILE")]
    pub profile: Option<PathBuf>,

    /// Politeness delay before every request, and linear backoff base, in seconds
    #[arg(long, value_name = "SECONDS", default_value = "0.8", value_parser = parse_seconds)]
    pub delay: Duration,

    /// Attempts per request
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub retries: u32,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECONDS", default_value = "25", value_parser = parse_seconds)]
    pub timeout: Duration,

    /// Parallel detail-page workers
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..=16))]
    pub concurrency: u16,

    /// Log a progress line every N records (0 disables it)
    #[arg(long, value_name = "N", default_value_t = 100)]
    pub progress_every: usize,

    /// How the leading "Abstract" label is removed
    #[arg(long, value_enum, default_value_t = AbstractTrim::Label)]
    pub abstract_trim: AbstractTrim,

    /// Output path; defaults to notes_{VENUE}{year}[_{track}]_{timestamp}.json
    #[arg(short, long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("`{s}` is not a number of seconds"))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("`{s}` is not a valid duration"))
}
