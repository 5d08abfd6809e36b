use std::collections::BTreeMap;

use regex::Regex;
use url::Url;

use crate::html::{Page, resolve_link};

/// Detail-page URLs linked from a listing or section page, each with the first non-empty
/// anchor text seen for it.
///
/// Hrefs are resolved against `base`, stripped of their fragment and kept only when the
/// URL *path* matches `pattern`. The map holds one entry per normalized URL, sorted.
pub fn extract_detail_links(page: &Page, base: &Url, pattern: &Regex) -> BTreeMap<Url, String> {
    let mut links: BTreeMap<Url, String> = BTreeMap::new();
    for anchor in page.anchors() {
        let Some(url) = resolve_link(base, anchor.href) else {
            continue;
        };
        if !pattern.is_match(url.path()) {
            continue;
        }
        let text = links.entry(url).or_default();
        if text.is_empty() {
            *text = anchor.text;
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use regex::RegexBuilder;

    fn anthology_re() -> Regex {
        RegexBuilder::new(r"^/\d{4}\.[a-z0-9\-]+\.\d+/?$")
            .case_insensitive(true)
            .build()
            .unwrap()
    }

    #[test]
    fn keeps_only_matching_paths() {
        let base = Url::parse("https://aclanthology.org/volumes/2024.acl-long/").unwrap();
        let page = Page::parse(
            r##"<body>
                <a href="/2024.acl-long.1/">one</a>
                <a href="https://aclanthology.org/2024.acl-long.2/">two</a>
                <a href="/2024.acl-long.3/#abstract">three</a>
                <a href="/2024.acl-long.3.pdf">pdf</a>
                <a href="/people/someone/">author</a>
            </body>"##,
            &base,
        );
        let links: Vec<String> = extract_detail_links(&page, &base, &anthology_re())
            .into_keys()
            .map(String::from)
            .collect();
        assert_eq!(
            links,
            [
                "https://aclanthology.org/2024.acl-long.1/",
                "https://aclanthology.org/2024.acl-long.2/",
                "https://aclanthology.org/2024.acl-long.3/",
            ]
        );
    }

    #[test]
    fn query_does_not_affect_path_match() {
        let base = Url::parse("https://ojs.aaai.org/").unwrap();
        let re = Regex::new(r"^/index\.php/AAAI/article/view/\d+/?$").unwrap();
        let page = Page::parse(
            r#"<a href="/index.php/AAAI/article/view/10?lang=en">a</a>
               <a href="/index.php/AAAI/article/view/10/20">galley</a>"#,
            &base,
        );
        let links = extract_detail_links(&page, &base, &re);
        assert_eq!(links.len(), 1);
        assert_eq!(
            links.first_key_value().unwrap().0.as_str(),
            "https://ojs.aaai.org/index.php/AAAI/article/view/10?lang=en"
        );
    }

    #[test]
    fn keeps_first_non_empty_anchor_text() {
        let base = Url::parse("https://openaccess.thecvf.com/CVPR2024?day=all").unwrap();
        let re = Regex::new(r"^/content/CVPR2024/html/.+_paper\.html$").unwrap();
        let page = Page::parse(
            r#"<dt><a href="/content/CVPR2024/html/A_paper.html"><img alt=""></a></dt>
               <dt><a href="/content/CVPR2024/html/A_paper.html">Seeing  in the
                   Dark</a></dt>
               <dt><a href="/content/CVPR2024/html/A_paper.html">again</a></dt>
               <dt><a href="/content/CVPR2024/html/B_paper.html"></a></dt>"#,
            &base,
        );
        let links = extract_detail_links(&page, &base, &re);
        let texts: Vec<&str> = links.values().map(String::as_str).collect();
        assert_eq!(texts, ["Seeing in the Dark", ""]);
    }

    proptest! {
        #[test]
        fn repeated_and_fragmented_anchors_collapse(ids in proptest::collection::vec(1u32..50, 1..30)) {
            let base = Url::parse("https://aclanthology.org/volumes/2024.acl-long/").unwrap();
            let html: String = ids
                .iter()
                .enumerate()
                .map(|(i, id)| format!(r##"<a href="/2024.acl-long.{id}/#frag{i}">p</a>"##))
                .collect();
            let page = Page::parse(&html, &base);
            let links = extract_detail_links(&page, &base, &anthology_re());

            let distinct: std::collections::BTreeSet<u32> = ids.iter().copied().collect();
            prop_assert_eq!(links.len(), distinct.len());
            for url in links.keys() {
                prop_assert!(url.fragment().is_none());
            }
        }
    }
}
