//! One crawl run: listing discovery → link collection → detail (and citation) fetches.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};
use url::Url;

use crate::cancel::CancelToken;
use crate::citation::fetch_citation;
use crate::error::{FetchErrorKind, Result};
use crate::extract::extract_record;
use crate::fetch::Fetch;
use crate::html::Page;
use crate::links::extract_detail_links;
use crate::listing::resolve_listing_pages;
use crate::record::{CrawlTarget, PaperRecord, TargetKind};
use crate::venue::{ListingMode, Venue};

#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Used verbatim as the root listing instead of the venue's templates.
    pub override_url: Option<Url>,
    /// Detail-stage workers. 1 keeps the run strictly sequential.
    pub max_concurrency: usize,
    /// Log a progress line every N collected records (0 disables it).
    pub progress_every: usize,
    pub show_progress: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        CrawlOptions {
            override_url: None,
            max_concurrency: 1,
            progress_every: 100,
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// Neither a listing nor any section page could be resolved.
    NoListing,
    /// Listing pages were read but no detail link matched.
    NoLinks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    ListingDiscovery,
    LinkCollection,
    DetailFetch,
    CitationFetch,
    Done,
    Aborted(AbortReason),
    Cancelled,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Init => f.write_str("init"),
            Stage::ListingDiscovery => f.write_str("listing discovery"),
            Stage::LinkCollection => f.write_str("link collection"),
            Stage::DetailFetch => f.write_str("detail fetch"),
            Stage::CitationFetch => f.write_str("citation fetch"),
            Stage::Done => f.write_str("done"),
            Stage::Aborted(AbortReason::NoListing) => f.write_str("aborted: no listing"),
            Stage::Aborted(AbortReason::NoLinks) => f.write_str("aborted: no detail links"),
            Stage::Cancelled => f.write_str("cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub listing_pages: usize,
    pub section_pages: usize,
    pub detail_links: usize,
    pub records: usize,
    pub skipped: usize,
    pub citations_attached: usize,
    pub citation_failures: usize,
}

/// State owned by the orchestrator for one invocation.
#[derive(Debug)]
pub struct CrawlRun {
    pub visited: HashSet<Url>,
    pub collected: Vec<PaperRecord>,
    pub counters: Counters,
    stage: Stage,
}

#[derive(Debug)]
pub struct CrawlOutcome {
    /// Sorted by link.
    pub records: Vec<PaperRecord>,
    pub counters: Counters,
    pub stage: Stage,
}

enum Citation {
    NotApplicable,
    Attached,
    Failed,
}

enum LinkOutcome {
    Collected(PaperRecord, Citation),
    Skipped,
    Cancelled,
}

impl CrawlRun {
    fn new() -> Self {
        CrawlRun {
            visited: HashSet::new(),
            collected: Vec::new(),
            counters: Counters::default(),
            stage: Stage::Init,
        }
    }

    fn enter(&mut self, stage: Stage) {
        debug!(from = %self.stage, to = %stage, "stage");
        self.stage = stage;
    }

    fn finish(mut self, stage: Stage) -> CrawlOutcome {
        self.enter(stage);
        self.collected.sort_by(|a, b| a.link.cmp(&b.link));
        self.counters.records = self.collected.len();
        CrawlOutcome {
            records: self.collected,
            counters: self.counters,
            stage: self.stage,
        }
    }
}

/// Sequences the stages of a run over any [`Fetch`] implementation.
pub struct Pipeline<'a, F: Fetch + ?Sized> {
    fetcher: &'a F,
    venue: &'a Venue,
    options: &'a CrawlOptions,
    cancel: CancelToken,
}

impl<'a, F: Fetch + ?Sized> Pipeline<'a, F> {
    pub fn new(fetcher: &'a F, venue: &'a Venue, options: &'a CrawlOptions, cancel: CancelToken) -> Self {
        Pipeline {
            fetcher,
            venue,
            options,
            cancel,
        }
    }

    /// Run to completion. Only configuration problems are errors; everything the site
    /// does wrong ends in an outcome with whatever was collected.
    pub fn run(&self) -> Result<CrawlOutcome> {
        let mut run = CrawlRun::new();
        if self.cancel.is_cancelled() {
            return Ok(run.finish(Stage::Cancelled));
        }

        run.enter(Stage::ListingDiscovery);
        let pages = resolve_listing_pages(self.fetcher, self.venue, self.options.override_url.as_ref())?;
        run.counters.listing_pages += pages.roots_fetched;
        if pages.urls.is_empty() {
            if self.cancel.is_cancelled() {
                return Ok(run.finish(Stage::Cancelled));
            }
            warn!(venue = %self.venue.profile.id, year = self.venue.year, "no listing or section pages found");
            return Ok(run.finish(Stage::Aborted(AbortReason::NoListing)));
        }

        run.enter(Stage::LinkCollection);
        let links = self.collect_links(&mut run, &pages.urls, pages.kind);
        if self.cancel.is_cancelled() {
            return Ok(run.finish(Stage::Cancelled));
        }
        if links.is_empty() {
            warn!(pages = pages.urls.len(), "no detail links matched the venue pattern");
            return Ok(run.finish(Stage::Aborted(AbortReason::NoLinks)));
        }
        run.counters.detail_links = links.len();
        info!(links = links.len(), "collected detail links");

        run.enter(Stage::DetailFetch);
        for (url, outcome) in self.fetch_details(&links) {
            run.visited.insert(url);
            match outcome {
                LinkOutcome::Collected(record, citation) => {
                    match citation {
                        Citation::Attached => run.counters.citations_attached += 1,
                        Citation::Failed => run.counters.citation_failures += 1,
                        Citation::NotApplicable => {}
                    }
                    run.collected.push(record);
                }
                LinkOutcome::Skipped => run.counters.skipped += 1,
                LinkOutcome::Cancelled => {}
            }
        }

        let end = if self.cancel.is_cancelled() {
            Stage::Cancelled
        } else {
            Stage::Done
        };
        Ok(run.finish(end))
    }

    /// Detail links in URL order, each with the text of the anchor it was found through.
    fn collect_links(&self, run: &mut CrawlRun, pages: &[Url], kind: TargetKind) -> Vec<(Url, String)> {
        let mut links: BTreeMap<Url, String> = BTreeMap::new();
        for url in pages {
            if self.cancel.is_cancelled() {
                break;
            }
            if !run.visited.insert(url.clone()) {
                continue;
            }
            let body = match self.fetcher.fetch(&CrawlTarget::new(url.clone(), kind)) {
                Ok(body) => body,
                Err(e) => {
                    warn!(%url, %kind, error = %e, "skipping page");
                    continue;
                }
            };
            match kind {
                TargetKind::Section => run.counters.section_pages += 1,
                _ => run.counters.listing_pages += 1,
            }
            let found = extract_detail_links(&Page::parse(&body, url), url, &self.venue.detail_pattern);
            debug!(%url, links = found.len(), "scanned page");
            let hit = !found.is_empty();
            for (link, text) in found {
                let known = links.entry(link).or_default();
                if known.is_empty() {
                    *known = text;
                }
            }
            if hit && self.venue.profile.listing_mode == ListingMode::FirstNonEmpty {
                break;
            }
        }
        links.retain(|u, _| !run.visited.contains(u));
        links.into_iter().collect()
    }

    /// Workers claim links through a shared cursor, so no link is fetched twice.
    fn fetch_details(&self, links: &[(Url, String)]) -> Vec<(Url, LinkOutcome)> {
        let cursor = AtomicUsize::new(0);
        let collected = AtomicUsize::new(0);
        let bar = self.progress_bar(links.len());
        let workers = self.options.max_concurrency.clamp(1, links.len().max(1));

        let results: Vec<(Url, LinkOutcome)> = thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    s.spawn(|| {
                        let mut out = Vec::new();
                        while !self.cancel.is_cancelled() {
                            let i = cursor.fetch_add(1, Ordering::Relaxed);
                            let Some((url, anchor_text)) = links.get(i) else { break };
                            let outcome = self.visit(url, anchor_text, &bar);
                            if matches!(outcome, LinkOutcome::Collected(..)) {
                                let n = collected.fetch_add(1, Ordering::Relaxed) + 1;
                                let every = self.options.progress_every;
                                if every > 0 && n % every == 0 {
                                    bar.suspend(|| info!("Collected {n} papers so far..."));
                                }
                            }
                            bar.inc(1);
                            out.push((url.clone(), outcome));
                        }
                        out
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| {
                    h.join().unwrap_or_else(|_| {
                        warn!("detail worker panicked; its results are lost");
                        Vec::new()
                    })
                })
                .collect()
        });
        bar.finish_and_clear();
        results
    }

    /// Warnings go through `bar` so they print above the progress bar instead of over it.
    fn visit(&self, url: &Url, anchor_text: &str, bar: &ProgressBar) -> LinkOutcome {
        let body = match self.fetcher.fetch(&CrawlTarget::new(url.clone(), TargetKind::Detail)) {
            Ok(body) => body,
            Err(e) if e.kind == FetchErrorKind::Cancelled => return LinkOutcome::Cancelled,
            Err(e) => {
                bar.suspend(|| warn!(%url, error = %e, "skipping paper"));
                return LinkOutcome::Skipped;
            }
        };

        let page = Page::parse(&body, url);
        let (mut record, citation_url) = extract_record(&page, url, &self.venue.rules, Some(anchor_text));
        let citation = if record.citation_text.is_some() {
            Citation::Attached
        } else if let Some(cite) = citation_url {
            debug!(stage = %Stage::CitationFetch, %url, citation = %cite, "fetching citation");
            match fetch_citation(self.fetcher, &cite) {
                Ok(Some(text)) => {
                    record.citation_text = Some(text);
                    Citation::Attached
                }
                Ok(None) => Citation::Failed,
                Err(e) => {
                    bar.suspend(|| warn!(%url, citation = %cite, error = %e, "citation fetch failed"));
                    Citation::Failed
                }
            }
        } else {
            Citation::NotApplicable
        };
        LinkOutcome::Collected(record, citation)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {msg} [{bar:40.green/dim}] {pos}/{len} (eta {eta})",
        )
        .map(|s| s.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        let bar = ProgressBar::new(len as u64).with_style(style);
        bar.set_message(format!("{} {}", self.venue.profile.display, self.venue.year));
        bar
    }
}
