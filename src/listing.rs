use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Result;
use crate::fetch::Fetch;
use crate::html::{Page, element_text, resolve_link};
use crate::record::{CrawlTarget, TargetKind};
use crate::venue::{SectionDiscovery, Venue};

static HEADINGS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3, h4").expect("valid selector"));
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));

const DOWNLOAD_EXTENSIONS: &[&str] = &[".pdf", ".zip", ".bib", ".ris"];

/// Pages to scan for detail links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPages {
    pub urls: Vec<Url>,
    /// `Section` when the pages were discovered from a landing page.
    pub kind: TargetKind,
    /// Landing pages fetched while discovering sections.
    pub roots_fetched: usize,
}

/// Work out which listing (or section) pages hold the detail links of a run.
///
/// An empty result means nothing could be discovered; it is not an error. Only a bad
/// template is.
pub fn resolve_listing_pages<F: Fetch + ?Sized>(
    fetcher: &F,
    venue: &Venue,
    override_url: Option<&Url>,
) -> Result<ListingPages> {
    let roots = match override_url {
        Some(url) => vec![url.clone()],
        None => venue.listing_urls()?,
    };

    let Some(discovery) = &venue.profile.sections else {
        return Ok(ListingPages {
            urls: roots,
            kind: TargetKind::Listing,
            roots_fetched: 0,
        });
    };

    let mut sections = BTreeSet::new();
    let mut roots_fetched = 0;
    for root in roots {
        let body = match fetcher.fetch(&CrawlTarget::new(root.clone(), TargetKind::Listing)) {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %root, error = %e, "skipping listing page");
                continue;
            }
        };
        roots_fetched += 1;
        let found = discover_sections(&Page::parse(&body, &root), discovery);
        debug!(url = %root, sections = found.len(), "discovered sections");
        sections.extend(found);
    }
    info!(
        label = %discovery.label,
        sections = sections.len(),
        "section discovery finished"
    );

    Ok(ListingPages {
        urls: sections.into_iter().collect(),
        kind: TargetKind::Section,
        roots_fetched,
    })
}

/// Union of three heuristics over a landing page: anchor text mentions the label, anchors
/// under a heading that mentions it, hrefs containing the slug keyword. Download links are
/// dropped.
pub fn discover_sections(page: &Page, discovery: &SectionDiscovery) -> BTreeSet<Url> {
    let label = discovery.label.to_lowercase();
    let slug = discovery.slug_keyword.to_lowercase();
    let base = page.base();
    let mut hrefs: Vec<&str> = Vec::new();

    for a in page.anchors() {
        if a.text.to_lowercase().contains(&label) {
            hrefs.push(a.href);
        }
    }

    for heading in page.select(&HEADINGS) {
        if !element_text(&heading).to_lowercase().contains(&label) {
            continue;
        }
        let container = heading
            .parent()
            .and_then(ElementRef::wrap)
            .unwrap_or(heading);
        hrefs.extend(container.select(&ANCHOR).filter_map(|a| a.value().attr("href")));
    }

    if !slug.is_empty() {
        hrefs.extend(
            page.anchors()
                .filter(|a| a.href.to_lowercase().contains(&slug))
                .map(|a| a.href),
        );
    }

    hrefs
        .into_iter()
        .filter_map(|href| resolve_link(base, href))
        .filter(|u| !is_download(u))
        .collect()
}

fn is_download(url: &Url) -> bool {
    let path = url.path().to_lowercase();
    DOWNLOAD_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
