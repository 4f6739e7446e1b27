//! iNaturalist observation ID extraction
//!
//! The extraction is a single versioned parsing rule against the Ecdysis
//! record page markup: the first outbound anchor inside the association
//! region links to the observation, and the trailing path segment of its
//! `href` is the numeric observation ID. If Ecdysis changes its markup, the
//! selector below is the one line to update.

use scraper::{Html, Selector};

/// Anchor holding the outbound observation link on a record page.
const ASSOCIATION_ANCHOR: &str = r#"#association-div a[target="_blank"]"#;

/// Extract the iNaturalist observation ID from a record page body.
///
/// Returns `None` when the association anchor is absent, has no `href`, or
/// its trailing path segment is not an integer — none of which are crawl
/// failures, just records without a linked observation.
pub fn observation_id(html: &str) -> Option<i64> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(ASSOCIATION_ANCHOR).ok()?;
    let anchor = document.select(&selector).next()?;
    let href = anchor.value().attr("href")?;
    href.rsplit('/').next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(association: &str) -> String {
        format!(
            "<html><body><div id=\"other\"></div>{association}</body></html>"
        )
    }

    #[test]
    fn test_extracts_trailing_observation_id() {
        let html = page(
            r#"<div id="association-div">
                 <a target="_blank" href="https://www.inaturalist.org/observations/123456">obs</a>
               </div>"#,
        );
        assert_eq!(observation_id(&html), Some(123456));
    }

    #[test]
    fn test_first_matching_anchor_wins() {
        let html = page(
            r#"<div id="association-div">
                 <a target="_blank" href="https://www.inaturalist.org/observations/111">first</a>
                 <a target="_blank" href="https://www.inaturalist.org/observations/222">second</a>
               </div>"#,
        );
        assert_eq!(observation_id(&html), Some(111));
    }

    #[test]
    fn test_missing_association_div_is_none() {
        let html = page(r#"<div id="links"><a target="_blank" href="https://x/9">o</a></div>"#);
        assert_eq!(observation_id(&html), None);
    }

    #[test]
    fn test_anchor_without_target_is_ignored() {
        let html = page(
            r#"<div id="association-div"><a href="https://www.inaturalist.org/observations/5">o</a></div>"#,
        );
        assert_eq!(observation_id(&html), None);
    }

    #[test]
    fn test_malformed_trailing_segment_is_none() {
        let html = page(
            r#"<div id="association-div"><a target="_blank" href="https://www.inaturalist.org/observations/">o</a></div>"#,
        );
        assert_eq!(observation_id(&html), None);
    }

    #[test]
    fn test_empty_body_is_none() {
        assert_eq!(observation_id(""), None);
    }
}
