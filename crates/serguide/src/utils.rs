use crate::PAGE_MARKER;

/// Cuts `url` right after the first `&PageNumber=` so page indices can be appended.
///
/// URLs without the marker are returned unchanged.
pub fn normalize(url: &str) -> String {
    match url.find(PAGE_MARKER) {
        Some(index) => url[..index + PAGE_MARKER.len()].to_string(),
        None => url.to_string(),
    }
}

pub fn page_url(normalized: &str, page: u32) -> String {
    format!("{}{}", normalized, page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_drops_page_value_and_trailing_params() {
        let url = "https://x?a=1&PageNumber=5&b=2";
        assert_eq!(normalize(url), "https://x?a=1&PageNumber=");
    }

    #[test]
    fn test_normalize_without_marker_is_unchanged() {
        let url = "https://serguide.maccabi4u.co.il/heb/doctors/doctorssearchresults/?Field=1";
        assert_eq!(normalize(url), url);
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_honors_first_marker_only() {
        let url = "https://x?PageSize=10&PageNumber=2&q=a&PageNumber=9";
        assert_eq!(normalize(url), "https://x?PageSize=10&PageNumber=");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let urls = [
            "https://x?a=1&PageNumber=5&b=2",
            "https://x?a=1&PageNumber=",
            "https://x?a=1",
            "&PageNumber=&PageNumber=",
            "",
        ];

        for url in urls {
            let once = normalize(url);
            assert_eq!(normalize(&once), once, "normalize should be idempotent for {url}");
        }
    }

    #[test]
    fn test_page_url_appends_index() {
        let base = normalize("https://x?a=1&PageNumber=7");
        assert_eq!(page_url(&base, 1), "https://x?a=1&PageNumber=1");
        assert_eq!(page_url(&base, 3), "https://x?a=1&PageNumber=3");
    }
}
