//! Web page acquisition for ingestion.
//!
//! Fetches allowed-domain pages and reduces them to plain text: the
//! `<title>` plus a tag-stripped, whitespace-collapsed body. Good enough
//! for embedding; this is not an HTML renderer.

use anyhow::{Context, Result};
use regex::Regex;
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = concat!("askdocs/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client used for page fetches.
pub fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// True when the URL's host falls under one of the allowed domain
/// suffixes. An empty allow-list admits nothing.
pub fn in_allowed(url: &str, allowed_domains: &[String]) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    allowed_domains.iter().any(|domain| {
        let domain = domain.trim().to_ascii_lowercase();
        !domain.is_empty() && (host == domain || host.ends_with(&format!(".{}", domain)))
    })
}

/// Fetch a page and return `(title, text)`.
pub async fn fetch_url(client: &reqwest::Client, url: &str) -> Result<(Option<String>, String)> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", url))?
        .error_for_status()
        .with_context(|| format!("Bad status fetching {}", url))?;

    let html = response.text().await?;
    let title = extract_title(&html);
    let text = strip_html(&html);
    Ok((title, text))
}

/// First `<title>` element content, trimmed, if any.
pub fn extract_title(html: &str) -> Option<String> {
    let re = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("static regex");
    re.captures(html)
        .map(|c| decode_entities(c[1].trim()))
        .filter(|t| !t.is_empty())
}

/// Reduce an HTML document to whitespace-normalized plain text.
///
/// Drops `<script>`/`<style>` bodies and comments, replaces remaining
/// tags with spaces, decodes the common entities, and collapses runs of
/// whitespace.
pub fn strip_html(html: &str) -> String {
    let drop_blocks =
        Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>|<!--.*?-->").expect("static regex");
    let tags = Regex::new(r"<[^>]+>").expect("static regex");
    let whitespace = Regex::new(r"\s+").expect("static regex");

    let text = drop_blocks.replace_all(html, " ");
    let text = tags.replace_all(&text, " ");
    let text = decode_entities(&text);
    whitespace.replace_all(&text, " ").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_allowed_suffix_match() {
        let allowed = vec!["example.com".to_string()];
        assert!(in_allowed("https://example.com/page", &allowed));
        assert!(in_allowed("https://docs.example.com/page", &allowed));
        assert!(!in_allowed("https://example.org/page", &allowed));
        // No suffix trickery: notexample.com is a different host
        assert!(!in_allowed("https://notexample.com/", &allowed));
    }

    #[test]
    fn test_in_allowed_empty_list_admits_nothing() {
        assert!(!in_allowed("https://example.com/", &[]));
    }

    #[test]
    fn test_in_allowed_rejects_garbage_url() {
        assert!(!in_allowed("not a url", &["example.com".to_string()]));
    }

    #[test]
    fn test_strip_html_drops_scripts_and_tags() {
        let html = r#"<html><head><title>T</title><style>body{}</style>
            <script>alert("x")</script></head>
            <body><h1>Hello</h1><p>big   world &amp; more</p></body></html>"#;
        let text = strip_html(html);
        assert!(!text.contains("alert"));
        assert!(!text.contains("body{}"));
        assert_eq!(text, "T Hello big world & more");
    }

    #[test]
    fn test_extract_title() {
        assert_eq!(
            extract_title("<html><title> My Page </title></html>"),
            Some("My Page".to_string())
        );
        assert_eq!(extract_title("<html><body>no title</body></html>"), None);
    }
}
