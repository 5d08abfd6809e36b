//! Declarative per-venue tables consumed by the one generic pipeline.
//!
//! A [`VenueProfile`] is plain data (serde), so the built-in tables can be dumped with
//! `papercrawl venues --json`, edited, and fed back through `--profile`.

pub mod aaai;
pub mod anthology;
pub mod cvf;
pub mod ecva;

use std::path::Path;

use anyhow::Context;
use regex::{Regex, RegexBuilder};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CrawlError, Result};
use crate::extract::{AbstractTrim, CitationStrategy, ExtractRules};

type ProfileFn = fn() -> VenueProfile;

static BUILTINS: &[ProfileFn] = &[
    aaai::profile,
    anthology::acl,
    anthology::emnlp,
    ecva::profile,
    cvf::cvpr,
    cvf::iccv,
    cvf::wacv,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VenueProfile {
    pub id: String,
    /// Upper-case name used in file names and the `{venue}` placeholder.
    pub display: String,
    pub user_agent: String,
    /// `{edition}` = year + offset.
    #[serde(default)]
    pub edition_offset: i32,
    /// First entry is the default track.
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub listing_mode: ListingMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<SectionDiscovery>,
    /// Matched against the URL path. `{year}` and `{venue}` are substituted.
    pub detail_pattern: String,
    #[serde(default)]
    pub selectors: SelectorTable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labelled_block: Option<LabelledBlock>,
    #[serde(default)]
    pub citation: CitationRule,
    /// Use the listing anchor's text as a title when the detail page has no title markup.
    #[serde(default)]
    pub listing_titles: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    /// Listing URL templates with `{year}`, `{edition}` and `{venue}` placeholders.
    pub listings: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingMode {
    /// Every rendered listing page is visited.
    #[default]
    All,
    /// Candidates are tried in order until one yields detail links.
    FirstNonEmpty,
}

/// Landing page → section pages, for venues that split papers over track pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDiscovery {
    /// Matched case-insensitively against anchor and heading text.
    pub label: String,
    /// Looser match against the href.
    pub slug_keyword: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorTable {
    pub title: Vec<String>,
    pub abstract_containers: Vec<String>,
    pub content_containers: Vec<String>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelledBlock {
    pub label: String,
    pub terminator: String,
    /// Also end the block in the page-text fallback.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_terminators: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum CitationRule {
    Discover { keyword: String },
    Suffix { suffix: String },
    Inline { selectors: Vec<String> },
    #[default]
    None,
}

/// A profile bound to one year and track, with its patterns compiled.
#[derive(Debug)]
pub struct Venue {
    pub profile: VenueProfile,
    pub year: i32,
    pub track: Track,
    pub detail_pattern: Regex,
    pub rules: ExtractRules,
}

pub fn builtin(id: &str) -> Option<VenueProfile> {
    let id = id.trim();
    BUILTINS
        .iter()
        .map(|f| f())
        .find(|p| p.id.eq_ignore_ascii_case(id))
}

pub fn builtins() -> Vec<VenueProfile> {
    BUILTINS.iter().map(|f| f()).collect()
}

/// Read a profile written in the `venues --json` shape (one object, or an array whose
/// entry with the matching id is picked).
pub fn load(path: &Path, id: &str) -> anyhow::Result<VenueProfile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading profile {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("parsing profile {}", path.display()))?;
    let profile = match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value::<VenueProfile>)
            .collect::<serde_json::Result<Vec<_>>>()
            .with_context(|| format!("parsing profile {}", path.display()))?
            .into_iter()
            .find(|p| p.id.eq_ignore_ascii_case(id))
            .ok_or_else(|| CrawlError::UnknownVenue(id.to_string()))?,
        other => serde_json::from_value(other)
            .with_context(|| format!("parsing profile {}", path.display()))?,
    };
    Ok(profile)
}

impl VenueProfile {
    pub fn edition(&self, year: i32) -> i32 {
        year + self.edition_offset
    }

    pub fn track(&self, name: Option<&str>) -> Result<&Track> {
        let found = match name {
            None => self.tracks.first(),
            Some(name) => self
                .tracks
                .iter()
                .find(|t| t.name.eq_ignore_ascii_case(name.trim())),
        };
        found.ok_or_else(|| CrawlError::UnknownTrack {
            venue: self.id.clone(),
            track: name.unwrap_or("<default>").to_string(),
            available: self.track_names().join(", "),
        })
    }

    pub fn track_names(&self) -> Vec<&str> {
        self.tracks.iter().map(|t| t.name.as_str()).collect()
    }

    /// Render every listing template of `track` for `year`. Pure; no network.
    pub fn listing_urls(&self, year: i32, track: &Track) -> Result<Vec<Url>> {
        track
            .listings
            .iter()
            .map(|tpl| {
                let rendered = tpl
                    .replace("{year}", &year.to_string())
                    .replace("{edition}", &self.edition(year).to_string())
                    .replace("{venue}", &self.display);
                Url::parse(&rendered).map_err(|source| CrawlError::InvalidUrl {
                    url: rendered,
                    source,
                })
            })
            .collect()
    }

    pub fn detail_regex(&self, year: i32) -> Result<Regex> {
        let pattern = self
            .detail_pattern
            .replace("{year}", &regex::escape(&year.to_string()))
            .replace("{venue}", &regex::escape(&self.display));
        RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| CrawlError::Pattern {
                venue: self.id.clone(),
                source,
            })
    }

    /// Validate and compile everything a run needs. Fails before any request is made.
    pub fn compile(&self, year: i32, track: Option<&str>, trim: AbstractTrim) -> Result<Venue> {
        let track = self.track(track)?.clone();
        if track.listings.is_empty() {
            return Err(CrawlError::EmptyTrack {
                venue: self.id.clone(),
                track: track.name,
            });
        }
        self.listing_urls(year, &track)?;
        let detail_pattern = self.detail_regex(year)?;

        let citation = match &self.citation {
            CitationRule::Discover { keyword } => CitationStrategy::Discover {
                keyword: keyword.to_lowercase(),
            },
            CitationRule::Suffix { suffix } => CitationStrategy::Suffix(suffix.clone()),
            CitationRule::Inline { selectors } => {
                CitationStrategy::Inline(self.selectors(selectors)?)
            }
            CitationRule::None => CitationStrategy::None,
        };
        let table = &self.selectors;
        let rules = ExtractRules {
            title: self.selectors(&table.title)?,
            abstract_containers: self.selectors(&table.abstract_containers)?,
            content_containers: self.selectors(&table.content_containers)?,
            keywords: self.selectors(&table.keywords)?,
            labelled_block: self.labelled_block.clone(),
            abstract_label: self.abstract_label.clone(),
            trim,
            listing_titles: self.listing_titles,
            citation,
        };

        Ok(Venue {
            profile: self.clone(),
            year,
            track,
            detail_pattern,
            rules,
        })
    }

    fn selectors(&self, raw: &[String]) -> Result<Vec<Selector>> {
        raw.iter()
            .map(|s| {
                Selector::parse(s).map_err(|e| CrawlError::Selector {
                    venue: self.id.clone(),
                    selector: s.clone(),
                    message: e.to_string(),
                })
            })
            .collect()
    }
}

impl Venue {
    pub fn listing_urls(&self) -> Result<Vec<Url>> {
        self.profile.listing_urls(self.year, &self.track)
    }

    /// Label used in output file names, e.g. `AAAI2025_technical`.
    pub fn file_label(&self) -> String {
        if self.track.name.eq_ignore_ascii_case("all") {
            format!("{}{}", self.profile.display, self.year)
        } else {
            format!("{}{}_{}", self.profile.display, self.year, self.track.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_compiles() {
        for profile in builtins() {
            for track in profile.track_names() {
                profile
                    .compile(2024, Some(track), AbstractTrim::Label)
                    .unwrap_or_else(|e| panic!("{} / {track}: {e}", profile.id));
            }
        }
    }

    #[test]
    fn builtin_ids_are_unique_and_case_insensitive() {
        let all = builtins();
        let mut ids: Vec<_> = all.iter().map(|p| p.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), all.len());
        assert_eq!(builtin("ACL").map(|p| p.id), Some("acl".to_string()));
        assert!(builtin("neurips").is_none());
    }

    #[test]
    fn aaai_2025_renders_edition_39() {
        let aaai = builtin("aaai").unwrap();
        let track = aaai.track(None).unwrap();
        let urls = aaai.listing_urls(2025, track).unwrap();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].as_str(), "https://aaai.org/proceeding/aaai-39-2025/");
    }

    #[test]
    fn cvf_renders_both_listing_candidates_in_order() {
        let cvpr = builtin("cvpr").unwrap();
        let track = cvpr.track(None).unwrap();
        let urls: Vec<_> = cvpr
            .listing_urls(2023, track)
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            urls,
            [
                "https://openaccess.thecvf.com/CVPR2023?day=all",
                "https://openaccess.thecvf.com/content/CVPR2023",
            ]
        );
        assert_eq!(cvpr.listing_mode, ListingMode::FirstNonEmpty);
    }

    #[test]
    fn unknown_track_lists_alternatives() {
        let acl = builtin("acl").unwrap();
        let err = acl.track(Some("short")).unwrap_err().to_string();
        assert!(err.contains("long, findings"), "{err}");
        assert_eq!(acl.track(Some("FINDINGS")).unwrap().name, "findings");
    }

    #[test]
    fn detail_pattern_substitutes_year() {
        let eccv = builtin("eccv").unwrap();
        let re = eccv.detail_regex(2024).unwrap();
        assert!(re.is_match("/papers/eccv_2024/papers_ECCV/html/4_ECCV_2024_paper.php"));
        assert!(!re.is_match("/papers/eccv_2022/papers_ECCV/html/4_ECCV_2022_paper.php"));
    }

    #[test]
    fn bad_selector_is_a_configuration_error() {
        let mut p = builtin("acl").unwrap();
        p.selectors.title = vec!["h1[".to_string()];
        let err = p.compile(2024, None, AbstractTrim::Label).unwrap_err();
        assert!(matches!(err, CrawlError::Selector { .. }), "{err}");
    }

    #[test]
    fn profiles_round_trip_through_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("venues.json");
        std::fs::write(&path, serde_json::to_string_pretty(&builtins()).unwrap()).unwrap();
        let emnlp = load(&path, "emnlp").unwrap();
        assert_eq!(emnlp, builtin("emnlp").unwrap());
        assert!(load(&path, "icml").is_err());

        let single = dir.path().join("one.json");
        std::fs::write(&single, serde_json::to_string(&builtin("wacv").unwrap()).unwrap()).unwrap();
        assert_eq!(load(&single, "ignored").unwrap().id, "wacv");
    }
}
