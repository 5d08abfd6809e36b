use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::error::FetchError;
use crate::fetch::Fetch;
use crate::record::{CrawlTarget, TargetKind};

static PRE: Lazy<Selector> = Lazy::new(|| Selector::parse("pre").expect("valid selector"));
static CODE: Lazy<Selector> = Lazy::new(|| Selector::parse("code").expect("valid selector"));

/// Fetch the citation record at `url`. `Ok(None)` is an empty body; the caller decides
/// how to report a failed fetch.
pub fn fetch_citation<F: Fetch + ?Sized>(fetcher: &F, url: &Url) -> Result<Option<String>, FetchError> {
    let body = fetcher.fetch(&CrawlTarget::new(url.clone(), TargetKind::Citation))?;
    let parsed = parse_citation_body(&body);
    if parsed.is_none() {
        debug!(%url, "citation body was empty");
    }
    Ok(parsed)
}

/// Plain BibTeX is kept verbatim. HTML wrappers are unwrapped to their first `<pre>`
/// (then `<code>`) block.
pub fn parse_citation_body(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if !trimmed.starts_with('<') && trimmed.contains('@') && trimmed.contains('{') {
        return Some(trimmed.to_string());
    }

    let doc = Html::parse_document(trimmed);
    [&*PRE, &*CODE]
        .into_iter()
        .find_map(|sel| {
            doc.select(sel)
                .map(|el| el.text().collect::<String>().trim().to_string())
                .find(|t| !t.is_empty())
        })
        .or_else(|| Some(trimmed.to_string()))
}
