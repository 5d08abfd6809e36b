//! Detail-page extraction.
//!
//! Each field is an ordered list of named strategies; the first one that produces a
//! non-empty value wins. A field nobody could fill stays empty, it never fails the page.

mod abstract_text;
mod citation_link;
mod keywords;
mod title;

use scraper::Selector;
use tracing::debug;
use url::Url;

use crate::html::{Page, normalize_ws};
use crate::record::PaperRecord;
use crate::venue::LabelledBlock;

pub use abstract_text::AbstractTrim;

type Strategy<T> = fn(&Page, &ExtractRules) -> Option<T>;

/// One cascade step: a name for the logs and the function that tries it.
type Step<T> = (&'static str, Strategy<T>);

/// Compiled, per-venue extraction rules.
#[derive(Debug, Clone, Default)]
pub struct ExtractRules {
    pub title: Vec<Selector>,
    pub abstract_containers: Vec<Selector>,
    pub content_containers: Vec<Selector>,
    pub keywords: Vec<Selector>,
    pub labelled_block: Option<LabelledBlock>,
    pub abstract_label: Option<String>,
    pub trim: AbstractTrim,
    /// Fall back to the listing anchor's text before guessing a title from the page.
    pub listing_titles: bool,
    pub citation: CitationStrategy,
}

/// Where the machine-readable citation of a paper lives.
#[derive(Debug, Clone, Default)]
pub enum CitationStrategy {
    /// Search the page for a link mentioning this (lower-case) keyword.
    Discover { keyword: String },
    /// Detail URL without trailing `/`, plus this suffix.
    Suffix(String),
    /// Printed on the page itself.
    Inline(Vec<Selector>),
    #[default]
    None,
}

/// Build the best-effort record for one detail page, plus the citation URL to fetch next
/// (when the venue publishes citations on a separate URL). `listing_title` is the text of
/// the anchor the page was found through.
pub fn extract_record(
    page: &Page,
    detail_url: &Url,
    rules: &ExtractRules,
    listing_title: Option<&str>,
) -> (PaperRecord, Option<Url>) {
    let mut record = PaperRecord::new(detail_url);
    record.title = first_hit("title", title::MARKUP, page, rules)
        .or_else(|| {
            let text = normalize_ws(listing_title.filter(|_| rules.listing_titles)?);
            (!text.is_empty()).then(|| {
                debug!(field = "title", strategy = "listing", url = %page.base(), "extracted");
                text
            })
        })
        .or_else(|| first_hit("title", title::GUESSES, page, rules));
    record.abstract_ = first_hit("abstract", abstract_text::STRATEGIES, page, rules)
        .map(|raw| raw.finish(rules.abstract_label.as_deref(), rules.trim))
        .filter(|s| !s.is_empty());
    record.keywords = first_hit("keywords", keywords::STRATEGIES, page, rules).unwrap_or_default();

    let citation_url = match &rules.citation {
        CitationStrategy::Inline(selectors) => {
            record.citation_text = citation_link::inline(page, selectors);
            None
        }
        CitationStrategy::Suffix(suffix) => citation_link::with_suffix(detail_url, suffix),
        CitationStrategy::Discover { keyword } => citation_link::discover(page, detail_url, keyword),
        CitationStrategy::None => None,
    };
    (record, citation_url)
}

fn first_hit<T>(field: &str, steps: &[Step<T>], page: &Page, rules: &ExtractRules) -> Option<T> {
    steps.iter().find_map(|(name, strategy)| {
        let hit = strategy(page, rules)?;
        debug!(field, strategy = name, url = %page.base(), "extracted");
        Some(hit)
    })
}

/// Case-sensitive dedup that keeps the first occurrence.
fn dedup_in_place(v: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    v.retain(|x| seen.insert(x.clone()));
}

/// First element matched by `selector` with non-empty text.
fn first_text(page: &Page, selector: &Selector) -> Option<String> {
    page.select(selector)
        .map(|el| crate::html::element_text(&el))
        .find(|t| !t.is_empty())
}
