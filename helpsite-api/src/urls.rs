//! Public URLs of the helpsite sections and input sanitising.

use axum::http::{header, HeaderMap};

/// Builds absolute URLs for the helpsite sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlBuilder {
    base: String,
}

fn first_header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

impl UrlBuilder {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Base URL for a request: the configured one if any, otherwise derived
    /// from the forwarding headers, then from `Host`.
    pub fn from_headers(configured: Option<&str>, headers: &HeaderMap) -> Self {
        if let Some(base) = configured {
            return Self::new(base);
        }
        let scheme = first_header_value(headers, "x-forwarded-proto").unwrap_or("https");
        let host = first_header_value(headers, "x-forwarded-host")
            .or_else(|| first_header_value(headers, header::HOST.as_str()))
            .unwrap_or("localhost");
        Self::new(format!("{}://{}", scheme, host))
    }

    pub fn home(&self) -> String {
        self.base.clone()
    }

    /// Category page URL; an empty slug is the category index.
    pub fn categories(&self, slug: &str) -> String {
        if slug.is_empty() {
            format!("{}/categories", self.base)
        } else {
            format!("{}/categories/{}", self.base, urlencoding::encode(slug))
        }
    }

    pub fn contents(&self, slug: &str) -> String {
        format!("{}/contents/{}", self.base, urlencoding::encode(slug))
    }

    pub fn results(&self) -> String {
        format!("{}/results", self.base)
    }

    pub fn search(&self, query: &str) -> String {
        format!("{}?query={}", self.results(), urlencoding::encode(query))
    }

    pub fn sitemap(&self) -> String {
        format!("{}/sitemap.xml", self.base)
    }

    /// Absolute URL of a request path, without its query.
    pub fn canonical(&self, path: &str) -> String {
        match path {
            "" | "/" => self.home(),
            path => format!("{}{}", self.base, path),
        }
    }
}

/// `url` tagged with the tracking key its link is attributed to.
pub fn tracked(url: &str, key: &str) -> String {
    format!("{}?t={}", url, urlencoding::encode(key))
}

/// Encode HTML special characters (`&"'<>`) and ASCII control characters as
/// numeric entities.
pub fn sanitize_special_chars(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' | '"' | '\'' | '<' | '>' => output.push_str(&format!("&#{};", c as u32)),
            c if c.is_ascii_control() => output.push_str(&format!("&#{};", c as u32)),
            c => output.push(c),
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use proptest::prelude::*;

    #[test]
    fn test_section_urls() {
        let urls = UrlBuilder::new("https://help.example.com/");
        assert_eq!(urls.home(), "https://help.example.com");
        assert_eq!(urls.categories(""), "https://help.example.com/categories");
        assert_eq!(
            urls.categories("billing"),
            "https://help.example.com/categories/billing"
        );
        assert_eq!(
            urls.contents("reset password"),
            "https://help.example.com/contents/reset%20password"
        );
        assert_eq!(urls.results(), "https://help.example.com/results");
        assert_eq!(urls.search("a b"), "https://help.example.com/results?query=a%20b");
        assert_eq!(urls.sitemap(), "https://help.example.com/sitemap.xml");
        assert_eq!(urls.canonical("/"), "https://help.example.com");
    }

    #[test]
    fn test_base_from_forwarded_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("internal:8080"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("http, https"));
        headers.insert("x-forwarded-host", HeaderValue::from_static("help.example.com"));

        let urls = UrlBuilder::from_headers(None, &headers);
        assert_eq!(urls.home(), "http://help.example.com");
    }

    #[test]
    fn test_base_from_host_defaults_to_https() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("help.example.com"));
        assert_eq!(
            UrlBuilder::from_headers(None, &headers).home(),
            "https://help.example.com"
        );
        assert_eq!(
            UrlBuilder::from_headers(Some("https://fixed.example.com"), &headers).home(),
            "https://fixed.example.com"
        );
    }

    #[test]
    fn test_tracked_url() {
        assert_eq!(
            tracked("https://h/contents/a", "rr"),
            "https://h/contents/a?t=rr"
        );
    }

    #[test]
    fn test_sanitize_special_chars() {
        assert_eq!(
            sanitize_special_chars("<b>\"Tom\" & 'Jerry'</b>"),
            "&#60;b&#62;&#34;Tom&#34; &#38; &#39;Jerry&#39;&#60;/b&#62;"
        );
        assert_eq!(sanitize_special_chars("line\nbreak"), "line&#10;break");
        assert_eq!(sanitize_special_chars("plain-slug"), "plain-slug");
    }

    proptest! {
        /// Sanitised text never carries markup delimiters.
        #[test]
        fn prop_sanitized_has_no_markup(input in ".*") {
            let sanitized = sanitize_special_chars(&input);
            prop_assert!(!sanitized.contains('<'));
            prop_assert!(!sanitized.contains('>'));
            prop_assert!(!sanitized.contains('"'));
            prop_assert!(!sanitized.contains('\''));
        }
    }
}
