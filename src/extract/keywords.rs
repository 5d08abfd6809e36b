use once_cell::sync::Lazy;
use regex::Regex;

use super::{ExtractRules, Step, dedup_in_place};
use crate::html::{Page, element_text};

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[;,]").expect("valid regex"));

/// Visible badges longer than this are sentences, not keywords.
const MAX_VISIBLE_LEN: usize = 100;

pub(super) static STRATEGIES: &[Step<Vec<String>>] = &[("meta", from_meta), ("visible", from_visible)];

fn from_meta(page: &Page, _: &ExtractRules) -> Option<Vec<String>> {
    let mut out: Vec<String> = page
        .meta_values("citation_keywords")
        .iter()
        .flat_map(|v| SEPARATORS.split(v))
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect();
    dedup_in_place(&mut out);
    (!out.is_empty()).then_some(out)
}

fn from_visible(page: &Page, rules: &ExtractRules) -> Option<Vec<String>> {
    let mut out: Vec<String> = rules
        .keywords
        .iter()
        .flat_map(|sel| page.select(sel).map(|el| element_text(&el)).collect::<Vec<_>>())
        .filter(|t| !t.is_empty() && t.chars().count() < MAX_VISIBLE_LEN)
        .collect();
    dedup_in_place(&mut out);
    (!out.is_empty()).then_some(out)
}
