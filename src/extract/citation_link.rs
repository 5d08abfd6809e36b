use once_cell::sync::Lazy;
use scraper::Selector;
use url::Url;

use crate::html::{Page, element_text, resolve_link};

static CSL_LINKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href*='citationstylelanguage']").expect("valid selector"));
static BUTTONS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("button, a.btn, a.button").expect("valid selector"));

type Finder = fn(&Page, &str) -> Option<String>;

/// OJS exposes BibTeX under several skins; checked in this order.
static FINDERS: &[Finder] = &[mentioning_anchor, csl_export, cite_button];

pub(super) fn discover(page: &Page, detail_url: &Url, keyword: &str) -> Option<Url> {
    FINDERS
        .iter()
        .filter_map(|f| f(page, keyword))
        .find_map(|href| resolve_link(detail_url, &href))
}

/// Any anchor whose text or href mentions the keyword.
fn mentioning_anchor(page: &Page, keyword: &str) -> Option<String> {
    page.anchors()
        .find(|a| {
            a.text.to_lowercase().contains(keyword) || a.href.to_lowercase().contains(keyword)
        })
        .map(|a| a.href.to_string())
}

fn csl_export(page: &Page, _: &str) -> Option<String> {
    page.select(&CSL_LINKS)
        .filter_map(|el| el.value().attr("href"))
        .find(|href| href.to_lowercase().contains("format=bibtex"))
        .map(str::to_string)
}

fn cite_button(page: &Page, keyword: &str) -> Option<String> {
    page.select(&BUTTONS)
        .filter(|el| element_text(el).to_lowercase().contains(keyword))
        .find_map(|el| el.value().attr("href"))
        .map(str::to_string)
}

pub(super) fn with_suffix(detail_url: &Url, suffix: &str) -> Option<Url> {
    Url::parse(&format!("{}{suffix}", detail_url.as_str().trim_end_matches('/'))).ok()
}

/// Raw text of the first non-empty inline block. Line breaks are kept.
pub(super) fn inline(page: &Page, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|sel| {
        page.select(sel)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .find(|t| !t.is_empty())
    })
}
