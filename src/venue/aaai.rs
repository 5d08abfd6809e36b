//! AAAI proceedings: a landing page per edition that links to one page per technical
//! track, each listing OJS article pages.

use super::{CitationRule, ListingMode, SectionDiscovery, SelectorTable, Track, VenueProfile};

pub fn profile() -> VenueProfile {
    VenueProfile {
        id: "aaai".into(),
        display: "AAAI".into(),
        user_agent: "aaai-technical-track-crawler/1.0 (respectful; rate-limited)".into(),
        // AAAI-39 is 2025.
        edition_offset: -1986,
        tracks: vec![Track {
            name: "technical".into(),
            listings: vec!["https://aaai.org/proceeding/aaai-{edition}-{year}/".into()],
        }],
        listing_mode: ListingMode::All,
        sections: Some(SectionDiscovery {
            label: "technical track".into(),
            slug_keyword: "technical".into(),
        }),
        // Only the article landing page, not /view/<id>/<galley> downloads.
        detail_pattern: r"^/index\.php/AAAI/article/view/\d+/?$".into(),
        selectors: SelectorTable {
            title: vec!["h1, h2, .page_title, .obj_article_header .page_title".into()],
            abstract_containers: vec![
                "section.abstract, .obj_article_details .abstract, div.abstract, #abstract".into(),
            ],
            content_containers: vec![],
            keywords: vec![".keywords, .item.keywords, .tagit-choice, .badge, span.badge".into()],
        },
        abstract_label: Some("Abstract".into()),
        labelled_block: None,
        citation: CitationRule::Discover {
            keyword: "bibtex".into(),
        },
        listing_titles: false,
    }
}
