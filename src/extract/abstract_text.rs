use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Node, Selector};

use super::{ExtractRules, Step};
use crate::html::{Page, element_text, normalize_ws, word_count};
use crate::venue::LabelledBlock;

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("valid selector"));

const SEPARATORS: [char; 5] = [':', '-', '–', '—', '.'];

/// How the leading "Abstract" label of an extracted abstract is removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum AbstractTrim {
    /// Strip the venue's label only when the text actually starts with it.
    #[default]
    Label,
    /// Drop the first nine characters of markup and labelled-block abstracts.
    Fixed,
}

/// Where a candidate abstract was found. Each origin loses its label differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Origin {
    /// Metadata or a markup container; may still start with the label.
    Markup,
    /// Nodes following the label's own element.
    Siblings,
    /// Cut out of the flattened page text, starting right after the label.
    PageText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct RawAbstract {
    pub text: String,
    pub origin: Origin,
}

impl RawAbstract {
    fn markup(text: String) -> Self {
        RawAbstract {
            text,
            origin: Origin::Markup,
        }
    }

    /// Normalized abstract with its label removed according to `mode`.
    pub(super) fn finish(self, label: Option<&str>, mode: AbstractTrim) -> String {
        let label = label.filter(|l| !l.is_empty());
        match self.origin {
            Origin::Markup => trim_abstract(&self.text, label, mode),
            Origin::Siblings => {
                let text = normalize_ws(&self.text);
                match (mode, label) {
                    (AbstractTrim::Fixed, _) => unquote(&skip_chars(&text, 9)).to_string(),
                    (AbstractTrim::Label, Some(label)) => {
                        let text = unquote(&text);
                        unquote(strip_label(text, label).unwrap_or(text)).to_string()
                    }
                    (AbstractTrim::Label, None) => unquote(&text).to_string(),
                }
            }
            // The label was consumed by the match; never cut into the body.
            Origin::PageText => {
                let text = normalize_ws(&self.text);
                let text = text.trim_start_matches(SEPARATORS).trim_start();
                let text = label.and_then(|l| strip_label(text, l)).unwrap_or(text);
                unquote(text).to_string()
            }
        }
    }
}

pub(super) static STRATEGIES: &[Step<RawAbstract>] = &[
    ("meta", from_meta),
    ("container", from_containers),
    ("labelled-block", from_labelled_block),
    ("content", from_content),
    ("description", from_description),
];

fn from_meta(page: &Page, _: &ExtractRules) -> Option<RawAbstract> {
    page.meta_value("citation_abstract").map(RawAbstract::markup)
}

/// First `<p>` of the first matching container, else the container's own text.
fn from_containers(page: &Page, rules: &ExtractRules) -> Option<RawAbstract> {
    rules.abstract_containers.iter().find_map(|sel| {
        let node = page.select(sel).next()?;
        node.select(&PARAGRAPH)
            .next()
            .map(|p| element_text(&p))
            .filter(|t| !t.is_empty())
            .or_else(|| Some(element_text(&node)))
            .filter(|t| !t.is_empty())
            .map(RawAbstract::markup)
    })
}

fn from_labelled_block(page: &Page, rules: &ExtractRules) -> Option<RawAbstract> {
    let block = rules.labelled_block.as_ref()?;
    let found = sibling_block(page, block)
        .map(|text| RawAbstract {
            text,
            origin: Origin::Siblings,
        })
        .or_else(|| {
            line_block(page, block).map(|text| RawAbstract {
                text,
                origin: Origin::PageText,
            })
        })?;
    (!unquote(&found.text).is_empty()).then_some(found)
}

/// Text of the nodes following the label's element, up to the terminator.
fn sibling_block(page: &Page, block: &LabelledBlock) -> Option<String> {
    let label = page.document().root_element().descendants().find(|n| match n.value() {
        Node::Text(t) => t.trim().eq_ignore_ascii_case(&block.label),
        _ => false,
    })?;
    let parent = label.parent()?;

    let mut parts = Vec::new();
    for sib in parent.next_siblings() {
        let text = match sib.value() {
            Node::Text(t) => normalize_ws(t),
            Node::Element(_) => ElementRef::wrap(sib)
                .map(|el| element_text(&el))
                .unwrap_or_default(),
            _ => continue,
        };
        if text.eq_ignore_ascii_case(&block.terminator) {
            break;
        }
        if !text.is_empty() {
            parts.push(text);
        }
    }
    (!parts.is_empty()).then(|| parts.join(" "))
}

/// Whatever follows the first whole-word label in the page text, up to the first
/// terminator or the end of the page. Catches labels that share a parent with the body.
fn line_block(page: &Page, block: &LabelledBlock) -> Option<String> {
    let stops = std::iter::once(&block.terminator)
        .chain(&block.extra_terminators)
        .filter(|s| !s.is_empty())
        .map(|s| regex::escape(s))
        .collect::<Vec<_>>()
        .join("|");
    let stop = if stops.is_empty() {
        String::new()
    } else {
        format!(r"\b(?:{stops})\b|")
    };
    let pattern = format!(r"(?is)\b{}\b(.*?)(?:{stop}\z)", regex::escape(&block.label));
    let re = Regex::new(&pattern).ok()?;
    let text = page.text_lines().join("\n");
    let body = re.captures(&text)?.get(1)?.as_str().trim().to_string();
    (!body.is_empty()).then_some(body)
}

/// Generic content containers; short fragments (navigation, headings) are not abstracts.
fn from_content(page: &Page, rules: &ExtractRules) -> Option<RawAbstract> {
    rules.content_containers.iter().find_map(|sel| {
        let node = page.select(sel).next()?;
        node.select(&PARAGRAPH)
            .next()
            .map(|p| element_text(&p))
            .filter(|t| word_count(t) > 5)
            .or_else(|| Some(element_text(&node)).filter(|t| word_count(t) > 5))
            .map(RawAbstract::markup)
    })
}

fn from_description(page: &Page, _: &ExtractRules) -> Option<RawAbstract> {
    page.meta_value("description").map(RawAbstract::markup)
}

/// Normalize whitespace and remove the venue's leading label according to `mode`.
/// Venues without a label are never trimmed.
pub(super) fn trim_abstract(raw: &str, label: Option<&str>, mode: AbstractTrim) -> String {
    let text = normalize_ws(raw);
    let Some(label) = label.filter(|l| !l.is_empty()) else {
        return text;
    };
    match mode {
        AbstractTrim::Fixed => skip_chars(&text, 9),
        AbstractTrim::Label => strip_label(&text, label).unwrap_or(&text).to_string(),
    }
}

fn skip_chars(text: &str, n: usize) -> String {
    normalize_ws(&text.chars().skip(n).collect::<String>())
}

fn unquote(text: &str) -> &str {
    text.trim().trim_matches('"').trim()
}

fn strip_label<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    let head = text.get(..label.len())?;
    if !head.eq_ignore_ascii_case(label) {
        return None;
    }
    let rest = &text[label.len()..];
    // "Abstraction is…" does not start with the label.
    if rest.chars().next().is_some_and(char::is_alphanumeric) {
        return None;
    }
    Some(rest.trim_start().trim_start_matches(SEPARATORS).trim_start())
}
