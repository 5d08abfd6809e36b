//! ECCV on ecva.net: one index for every edition, filtered by the year in the path.
//! Detail pages carry no markup for the abstract, only an "Abstract" line followed by
//! the text and a "Related Material" line.

use super::{CitationRule, LabelledBlock, ListingMode, SelectorTable, Track, VenueProfile};

pub fn profile() -> VenueProfile {
    VenueProfile {
        id: "eccv".into(),
        display: "ECCV".into(),
        user_agent: "eccv-ecva-crawler/1.0 (respectful; rate-limited)".into(),
        edition_offset: 0,
        tracks: vec![Track {
            name: "all".into(),
            listings: vec!["https://www.ecva.net/papers.php".into()],
        }],
        listing_mode: ListingMode::All,
        sections: None,
        detail_pattern: r"^/papers/eccv_{year}/.+_paper\.php$".into(),
        selectors: SelectorTable {
            title: vec!["h1".into(), "h2".into(), "title".into()],
            ..SelectorTable::default()
        },
        abstract_label: Some("Abstract".into()),
        labelled_block: Some(LabelledBlock {
            label: "Abstract".into(),
            terminator: "Related Material".into(),
            extra_terminators: vec!["Contact".into()],
        }),
        citation: CitationRule::None,
        listing_titles: false,
    }
}
