//! Page model shared by the listing, link and detail stages.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));
static META: Lazy<Selector> = Lazy::new(|| Selector::parse("meta[content]").expect("valid selector"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("valid selector"));

/// A parsed HTML page together with the URL relative links resolve against.
pub struct Page {
    doc: Html,
    base: Url,
}

/// An `<a href>` with its raw target and visible text.
#[derive(Debug, Clone)]
pub struct Anchor<'a> {
    pub href: &'a str,
    pub text: String,
}

impl Page {
    pub fn parse(body: &str, base: &Url) -> Self {
        Page {
            doc: Html::parse_document(body),
            base: base.clone(),
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn document(&self) -> &Html {
        &self.doc
    }

    pub fn select<'a>(&'a self, selector: &'a Selector) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.doc.select(selector)
    }

    pub fn anchors(&self) -> impl Iterator<Item = Anchor<'_>> + '_ {
        self.doc.select(&ANCHOR).filter_map(anchor)
    }

    /// Every `content` of `<meta name=…>` (or `property=…`) equal to `name`, ignoring case,
    /// in document order.
    pub fn meta_values(&self, name: &str) -> Vec<String> {
        self.doc
            .select(&META)
            .filter(|el| {
                let v = el.value();
                v.attr("name")
                    .or_else(|| v.attr("property"))
                    .is_some_and(|n| n.trim().eq_ignore_ascii_case(name))
            })
            .filter_map(|el| el.value().attr("content"))
            .map(normalize_ws)
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn meta_value(&self, name: &str) -> Option<String> {
        self.meta_values(name).into_iter().next()
    }

    /// Body text split into trimmed, non-empty lines.
    pub fn text_lines(&self) -> Vec<String> {
        let root = self
            .doc
            .select(&BODY)
            .next()
            .unwrap_or_else(|| self.doc.root_element());
        root.text()
            .flat_map(|chunk| chunk.lines())
            .map(normalize_ws)
            .filter(|l| !l.is_empty())
            .collect()
    }
}

fn anchor(el: ElementRef<'_>) -> Option<Anchor<'_>> {
    let href = el.value().attr("href")?;
    Some(Anchor {
        href,
        text: element_text(&el),
    })
}

/// Whitespace-collapsed text of an element and its descendants.
pub fn element_text(el: &ElementRef<'_>) -> String {
    normalize_ws(&el.text().collect::<Vec<_>>().join(" "))
}

/// Resolve `href` against `base` into a canonical http(s) URL without fragment.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let mut url = absolutise(base, href)?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

fn absolutise(base: &Url, cand: &str) -> Option<Url> {
    if let Ok(u) = Url::parse(cand) {
        return Some(u);
    }
    if cand.starts_with("//") {
        return Url::parse(&format!("{}:{}", base.scheme(), cand)).ok();
    }
    base.join(cand).ok()
}

pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

pub fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}
