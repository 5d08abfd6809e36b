use once_cell::sync::Lazy;
use scraper::Selector;

use super::{ExtractRules, Step, first_text};
use crate::html::{Page, element_text};

static BOLD: Lazy<Selector> = Lazy::new(|| Selector::parse("b, strong").expect("valid selector"));

const META_NAMES: &[&str] = &["citation_title", "dc.title", "og:title"];

/// Structured metadata beats markup.
pub(super) static MARKUP: &[Step<String>] = &[("meta", from_meta), ("heading", from_headings)];

/// Last resorts, tried after the listing anchor's text.
pub(super) static GUESSES: &[Step<String>] = &[("bold", from_first_bold), ("first-line", from_first_line)];

fn from_meta(page: &Page, _: &ExtractRules) -> Option<String> {
    META_NAMES.iter().find_map(|name| page.meta_value(name))
}

fn from_headings(page: &Page, rules: &ExtractRules) -> Option<String> {
    rules.title.iter().find_map(|sel| first_text(page, sel))
}

/// Only the first `b`/`strong` on the page is considered, and only if it is long enough to
/// be a title rather than a label.
fn from_first_bold(page: &Page, _: &ExtractRules) -> Option<String> {
    let el = page.select(&BOLD).next()?;
    let text = element_text(&el);
    (text.chars().count() > 8).then_some(text)
}

fn from_first_line(page: &Page, _: &ExtractRules) -> Option<String> {
    page.text_lines().into_iter().next()
}
