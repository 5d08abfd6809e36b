//! ACL Anthology volumes (ACL, EMNLP). Every paper page has a sibling `.bib`.

use super::{CitationRule, ListingMode, SelectorTable, Track, VenueProfile};

const PAPER_ID: &str = r"^/\d{4}\.[a-z0-9\-]+\.\d+/?$";

pub fn acl() -> VenueProfile {
    anthology(
        "acl",
        "acl-anthology-crawler/1.2 (respectful; rate-limited)",
        vec![
            volume("long", "{year}.acl-long"),
            volume("findings", "{year}.findings-acl"),
        ],
    )
}

pub fn emnlp() -> VenueProfile {
    anthology(
        "emnlp",
        "emnlp-anthology-crawler/1.0 (respectful; rate-limited)",
        vec![
            volume("main", "{year}.emnlp-main"),
            volume("findings", "{year}.findings-emnlp"),
        ],
    )
}

fn volume(name: &str, slug: &str) -> Track {
    Track {
        name: name.into(),
        listings: vec![format!("https://aclanthology.org/volumes/{slug}/")],
    }
}

fn anthology(id: &str, user_agent: &str, tracks: Vec<Track>) -> VenueProfile {
    VenueProfile {
        id: id.into(),
        display: id.to_uppercase(),
        user_agent: user_agent.into(),
        edition_offset: 0,
        tracks,
        listing_mode: ListingMode::All,
        sections: None,
        detail_pattern: PAPER_ID.into(),
        selectors: SelectorTable {
            title: vec!["h1, h2, #title, h2.title".into()],
            abstract_containers: vec!["#abstract, section#abstract, div#abstract".into()],
            content_containers: vec![
                "div.acl-abstract".into(),
                "div.card-body .acl-abstract".into(),
                "div.card-body".into(),
            ],
            keywords: vec![".badge, .keyword, span.badge".into()],
        },
        abstract_label: Some("Abstract".into()),
        labelled_block: None,
        citation: CitationRule::Suffix {
            suffix: ".bib".into(),
        },
        listing_titles: false,
    }
}
