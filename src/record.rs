use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// One crawled paper. Field names are part of the output contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub link: String,
    #[serde(default, alias = "_bibtex")]
    pub citation_text: Option<String>,
}

impl PaperRecord {
    /// An empty record keyed by its detail page.
    pub fn new(link: &Url) -> Self {
        PaperRecord {
            title: None,
            abstract_: None,
            keywords: Vec::new(),
            link: link.as_str().to_string(),
            citation_text: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Listing,
    Section,
    Detail,
    Citation,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetKind::Listing => "listing",
            TargetKind::Section => "section",
            TargetKind::Detail => "detail",
            TargetKind::Citation => "citation",
        };
        f.write_str(s)
    }
}

/// A page to visit during one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    pub url: Url,
    pub kind: TargetKind,
}

impl CrawlTarget {
    pub fn new(url: Url, kind: TargetKind) -> Self {
        CrawlTarget { url, kind }
    }
}
