//! CVF open access (CVPR, ICCV, WACV). The listing moved between two templates over the
//! years, so both are tried in order. BibTeX is printed inline on the paper page.

use super::{CitationRule, ListingMode, SelectorTable, Track, VenueProfile};

pub fn cvpr() -> VenueProfile {
    conference("cvpr")
}

pub fn iccv() -> VenueProfile {
    conference("iccv")
}

pub fn wacv() -> VenueProfile {
    conference("wacv")
}

fn conference(id: &str) -> VenueProfile {
    VenueProfile {
        id: id.into(),
        display: id.to_uppercase(),
        user_agent: format!("{id}-metadata-fetcher/1.0 (respectful; rate-limited)"),
        edition_offset: 0,
        tracks: vec![Track {
            name: "all".into(),
            listings: vec![
                "https://openaccess.thecvf.com/{venue}{year}?day=all".into(),
                "https://openaccess.thecvf.com/content/{venue}{year}".into(),
            ],
        }],
        listing_mode: ListingMode::FirstNonEmpty,
        sections: None,
        // `/content/CVPR2024/html/…` and the older `/content_cvpr_2018/html/…`.
        detail_pattern: r"^/content[/_]{venue}_?{year}/html/.+_paper\.html$".into(),
        selectors: SelectorTable {
            title: vec!["#papertitle".into()],
            abstract_containers: vec!["#abstract".into()],
            ..SelectorTable::default()
        },
        abstract_label: None,
        labelled_block: None,
        citation: CitationRule::Inline {
            selectors: vec!["div.bibref pre".into(), "div.bibref".into()],
        },
        listing_titles: true,
    }
}
