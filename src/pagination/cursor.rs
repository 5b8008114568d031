//! Cursor extraction from next-page URLs.

use reqwest::Url;

/// Query parameter that carries the openFDA pagination cursor.
pub const CURSOR_PARAM: &str = "search_after";

/// Read the `search_after` cursor out of an absolute next-page URL.
///
/// Returns `None` when the URL does not parse or has no (non-empty) cursor.
pub fn cursor_from_next_page_url(next_page_url: &str) -> Option<String> {
    let url = Url::parse(next_page_url).ok()?;

    url.query_pairs()
        .find(|(key, _)| key == CURSOR_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_from_url() {
        let url = "https://api.fda.gov/drug/event.json?search=x&limit=5&search_after=0%3D42";
        assert_eq!(cursor_from_next_page_url(url), Some("0=42".to_string()));
    }

    #[test]
    fn test_cursor_missing() {
        assert_eq!(
            cursor_from_next_page_url("https://api.fda.gov/drug/event.json?limit=5"),
            None
        );
        assert_eq!(
            cursor_from_next_page_url("https://x/y?search_after="),
            None
        );
    }

    #[test]
    fn test_cursor_invalid_url() {
        assert_eq!(cursor_from_next_page_url("not a url"), None);
        assert_eq!(cursor_from_next_page_url(""), None);
    }
}
