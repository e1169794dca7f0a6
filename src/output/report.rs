//! Plain-text rendering of search results, host details and live telemetry

use crate::crawler::{CrawlerStatus, QueueStats, ScanEvent};
use crate::search::{HostDetails, SearchAnalytics, SearchResponse};
use crate::state::QueueStatus;
use crate::storage::KeywordStat;
use std::fmt::Write;

/// Renders a search result page
///
/// Ranked hits show their score and matching page count; domain hits only
/// the domain.
pub fn format_search_response(response: &SearchResponse) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Query: {} ({} of {} results, {:.3}s)",
        response.query,
        response.results.len(),
        response.total_count,
        response.execution_time
    );
    if let Some(error) = &response.error {
        let _ = writeln!(out, "Error: {}", error);
        return out;
    }
    if response.results.is_empty() {
        let _ = writeln!(out, "No matching hosts.");
        return out;
    }

    for (rank, hit) in response.results.iter().enumerate() {
        let _ = write!(out, "\n{:>3}. {}", rank + 1, hit.address);
        if let Some(domain) = &hit.domain {
            let _ = write!(out, " ({})", domain);
        }
        out.push('\n');

        if let Some(title) = &hit.title {
            let _ = writeln!(out, "     Title: {}", title);
        }
        if let Some(description) = &hit.description {
            let _ = writeln!(out, "     Description: {}", description);
        }
        match hit.page_count {
            Some(pages) => {
                let _ = writeln!(out, "     Score: {:.0} across {} page(s)", hit.score, pages);
            }
            None => {
                if let Some(last_crawled) = &hit.last_crawled {
                    let _ = writeln!(out, "     Last crawled: {}", last_crawled);
                }
            }
        }
    }

    out
}

pub fn format_keywords(keywords: &[KeywordStat]) -> String {
    if keywords.is_empty() {
        return "No keywords indexed.\n".to_string();
    }

    let width = keywords.iter().map(|k| k.keyword.len()).max().unwrap_or(0);
    let mut out = String::new();
    let _ = writeln!(out, "{:<width$}  {:>11}  {:>6}", "Keyword", "Occurrences", "Pages");
    for keyword in keywords {
        let _ = writeln!(
            out,
            "{:<width$}  {:>11}  {:>6}",
            keyword.keyword, keyword.total_occurrences, keyword.page_count
        );
    }
    out
}

pub fn format_host_details(details: &HostDetails) -> String {
    let host = &details.host;
    let mut out = String::new();

    let _ = writeln!(out, "=== Host {} ===\n", host.address);
    let _ = writeln!(out, "  Active: {}", if host.is_active { "yes" } else { "no" });
    let _ = writeln!(out, "  Last crawled: {}", host.last_crawled);
    let fields = [
        ("Domain", host.domain.as_deref()),
        ("Title", host.title.as_deref()),
        ("Description", host.description.as_deref()),
        ("Server", host.server_info.as_deref()),
        ("Content type", host.content_type.as_deref()),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            let _ = writeln!(out, "  {}: {}", label, value);
        }
    }
    if let Some(status) = host.status_code {
        let _ = writeln!(out, "  Status: {}", status);
    }
    if let Some(response_time) = host.response_time {
        let _ = writeln!(out, "  Response time: {:.3}s", response_time);
    }

    let _ = writeln!(out, "\nPages ({}):", details.pages.len());
    for page in &details.pages {
        let _ = writeln!(
            out,
            "  {} [{}] {} bytes, {}",
            page.last_crawled,
            page.http_status
                .map_or_else(|| "-".to_string(), |status| status.to_string()),
            page.content_size,
            page.url
        );
    }

    let _ = writeln!(out, "\nTop keywords:");
    for keyword in &details.top_keywords {
        let _ = writeln!(out, "  {} ({})", keyword.keyword, keyword.frequency);
    }

    out
}

pub fn format_analytics(analytics: &SearchAnalytics) -> String {
    let mut out = String::new();
    if let Some(error) = &analytics.error {
        let _ = writeln!(out, "Error: {}", error);
        return out;
    }

    let stats = &analytics.statistics;
    let _ = writeln!(out, "Last 24 hours:");
    let _ = writeln!(out, "  Searches: {}", stats.total_searches);
    let _ = writeln!(out, "  Unique queries: {}", stats.unique_queries);
    let _ = writeln!(out, "  Average results: {:.1}", stats.avg_results);

    let _ = writeln!(out, "\nRecent searches:");
    for entry in &analytics.recent_searches {
        let _ = writeln!(
            out,
            "  {}  {:?} -> {}",
            entry.search_time, entry.query, entry.result_count
        );
    }
    out
}

pub fn format_queue_stats(stats: &QueueStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Queue entries: {}", stats.total);
    for status in QueueStatus::all() {
        let count = stats.by_status.get(&status).copied().unwrap_or(0);
        let _ = writeln!(out, "  {}: {}", status, count);
    }
    let _ = writeln!(out, "Awaiting workers: {}", stats.channel_depth);
    out
}

pub fn format_crawler_status(status: &CrawlerStatus) -> String {
    format!(
        "{} (active: {}, paused: {}, workers: {}, channel: {})",
        status.status, status.active, status.paused, status.worker_count, status.queue_depth
    )
}

/// One line per event, in the order given
pub fn format_events(events: &[ScanEvent]) -> String {
    let mut out = String::new();
    for event in events {
        let _ = write!(
            out,
            "{} {:?} {}",
            event.timestamp.format("%H:%M:%S%.3f"),
            event.kind,
            event.address
        );
        if let Some(status) = event.status_code {
            let _ = write!(out, " status={}", status);
        }
        if let Some(server) = &event.server_info {
            let _ = write!(out, " server={}", server);
        }
        if let Some(message) = &event.message {
            let _ = write!(out, " {}", message);
        }
        out.push('\n');
    }
    out
}
