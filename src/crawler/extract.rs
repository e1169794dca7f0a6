//! HTML extraction for probed pages
//!
//! This module pulls the handful of fields the index keeps out of a page:
//! - Page title (from the first <title> tag)
//! - The `description` meta tag
//! - A domain name the page claims for itself (canonical link or og:url)
//! - Visible text, which feeds keyword extraction
//!
//! Parsing is tolerant: malformed markup still yields whatever can be found.

use scraper::{Html, Selector};
use url::{Host, Url};

/// Elements whose text never reaches the reader
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Fields extracted from an HTML page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageExtract {
    /// Trimmed title text, if non-empty
    pub title: Option<String>,

    /// Value of `<meta name="description">`
    pub description: Option<String>,

    /// DNS name from `<link rel="canonical">` or `<meta property="og:url">`
    pub domain: Option<String>,

    /// Whitespace-joined visible text
    pub text: String,
}

/// Parses an HTML document and extracts its indexable fields
///
/// # Arguments
///
/// * `html` - The page body
/// * `base_url` - The URL the page was fetched from, for resolving relative canonical links
///
/// # Example
///
/// ```
/// use netsift::crawler::extract_page;
/// use url::Url;
///
/// let html = r#"<html><head><title> Router </title></head><body>Admin login</body></html>"#;
/// let base = Url::parse("http://192.0.2.10/").unwrap();
/// let page = extract_page(html, &base);
/// assert_eq!(page.title.as_deref(), Some("Router"));
/// assert!(page.text.contains("Admin login"));
/// ```
pub fn extract_page(html: &str, base_url: &Url) -> PageExtract {
    let document = Html::parse_document(html);

    PageExtract {
        title: extract_title(&document),
        description: extract_description(&document),
        domain: extract_domain(&document, base_url),
        text: visible_text(&document),
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_description(document: &Html) -> Option<String> {
    let selector = Selector::parse(r#"meta[name="description"]"#).ok()?;

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .find(|s| !s.is_empty())
}

/// Finds a DNS host name the page declares as its own address
///
/// IP-literal hosts are ignored; the address is already known.
fn extract_domain(document: &Html, base_url: &Url) -> Option<String> {
    let candidates = [
        (r#"link[rel="canonical"]"#, "href"),
        (r#"meta[property="og:url"]"#, "content"),
    ];

    for (selector, attribute) in candidates {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };

        for element in document.select(&selector) {
            let Some(raw) = element.value().attr(attribute) else {
                continue;
            };
            let Ok(url) = base_url.join(raw.trim()) else {
                continue;
            };
            if let Some(Host::Domain(domain)) = url.host() {
                return Some(domain.to_string());
            }
        }
    }

    None
}

fn visible_text(document: &Html) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()))
        });
        if hidden {
            continue;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }

    parts.join(" ")
}
