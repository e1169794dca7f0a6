//! HTTP probe implementation
//!
//! This module handles the single request made to each candidate, including:
//! - Building the HTTP client with user agent and timeouts
//! - One plaintext GET against the candidate's probe port
//! - Bounded, chunk-wise body reads
//! - Turning the response into a `ProbeResult`
//!
//! Network-level failures (timeout, refused connection, protocol errors) are
//! the normal outcome for most of the address space. They are logged at
//! debug level and reported as `None`, never as errors.

use crate::config::{Config, CrawlerConfig};
use crate::crawler::extract::extract_page;
use crate::text::extract_keywords;
use reqwest::{header, redirect::Policy, Client};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

/// Redirect hops followed before a probe gives up on a response
const MAX_REDIRECTS: usize = 5;

/// Per-probe settings derived from the configuration
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub port: u16,
    pub max_body_size: usize,
    pub max_keywords: usize,
    pub min_keyword_length: usize,
}

impl ProbeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            port: config.crawler.probe_port,
            max_body_size: config.crawler.max_body_size,
            max_keywords: config.extraction.max_keywords_per_page,
            min_keyword_length: config.extraction.min_keyword_length,
        }
    }
}

/// Everything learned from one answered probe
#[derive(Debug, Clone)]
pub struct ProbeResult {
    /// URL that was requested
    pub url: String,
    /// HTTP status code of the final response
    pub status_code: u16,
    /// Seconds from sending the request to finishing the body read
    pub response_time: f64,
    /// `Server` response header
    pub server_info: Option<String>,
    /// `Content-Type` response header
    pub content_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub domain: Option<String>,
    /// `(keyword, frequency)` pairs, most frequent first
    pub keywords: Vec<(String, u32)>,
    /// Body decoded as UTF-8, invalid sequences replaced
    pub body: String,
    /// Number of body bytes read
    pub content_size: usize,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use netsift::config::CrawlerConfig;
/// use netsift::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    let timeout = config.request_timeout();

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Probes one address with a single GET request
///
/// Any HTTP response counts as an answer, whatever its status code. The body
/// is read up to `max_body_size` bytes, parsed leniently, and reduced to
/// title, description, domain and keywords.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `address` - The candidate address
/// * `settings` - Port, body limit and keyword settings
///
/// # Returns
///
/// `Some(ProbeResult)` if the host answered, `None` on any network-level failure
pub async fn probe(
    client: &Client,
    address: Ipv4Addr,
    settings: &ProbeSettings,
) -> Option<ProbeResult> {
    let url = format!("http://{}:{}/", address, settings.port);
    let started = Instant::now();

    let mut response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("No answer from {}: {}", address, describe_error(&e));
            return None;
        }
    };

    let status_code = response.status().as_u16();
    let server_info = header_value(&response, header::SERVER);
    let content_type = header_value(&response, header::CONTENT_TYPE);
    let final_url = response.url().clone();

    let mut raw = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let remaining = settings.max_body_size - raw.len();
                if chunk.len() >= remaining {
                    raw.extend_from_slice(&chunk[..remaining]);
                    break;
                }
                raw.extend_from_slice(&chunk);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("Body read from {} failed: {}", address, describe_error(&e));
                return None;
            }
        }
    }
    let response_time = started.elapsed().as_secs_f64();

    let body = String::from_utf8_lossy(&raw).into_owned();
    let page = extract_page(&body, &final_url);
    let keywords = extract_keywords(
        &page.text,
        settings.min_keyword_length,
        settings.max_keywords,
    );

    tracing::debug!(
        "{} answered {} in {:.3}s ({} bytes)",
        address,
        status_code,
        response_time,
        raw.len()
    );

    Some(ProbeResult {
        url,
        status_code,
        response_time,
        server_info,
        content_type,
        title: page.title,
        description: page.description,
        domain: page.domain,
        keywords,
        body,
        content_size: raw.len(),
    })
}

fn header_value(response: &reqwest::Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Short classification of a request failure for logs
fn describe_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        "connection failed".to_string()
    } else if e.is_redirect() {
        "too many redirects".to_string()
    } else {
        e.to_string()
    }
}
