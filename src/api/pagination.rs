use crate::models::PaginationLinks;
use reqwest::header::HeaderMap;

/// URL of the next page. The body's `pagination` block wins; endpoints that
/// paginate with a `Link` header fall back to that.
pub fn next_page(body: &PaginationLinks, headers: &HeaderMap) -> Option<String> {
    body.next
        .clone()
        .filter(|next| !next.is_empty())
        .or_else(|| parse_link_header(headers).next)
}

/// Parse an RFC 8288 `Link` header.
pub fn parse_link_header(headers: &HeaderMap) -> PaginationLinks {
    let mut links = PaginationLinks::default();

    let Some(header) = headers.get("link").and_then(|v| v.to_str().ok()) else {
        return links;
    };

    for part in header.split(',') {
        let mut segments = part.split(';');
        let url = segments
            .next()
            .map(|s| s.trim().trim_start_matches('<').trim_end_matches('>').to_string());
        let rel = segments.find_map(|s| {
            s.trim()
                .strip_prefix("rel=")
                .map(|r| r.trim_matches('"').to_string())
        });

        if let (Some(url), Some(rel)) = (url, rel) {
            match rel.as_str() {
                "next" => links.next = Some(url),
                "prev" | "previous" => links.previous = Some(url),
                _ => {}
            }
        }
    }

    links
}
