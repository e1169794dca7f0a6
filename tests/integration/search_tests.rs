//! Integration tests for search over an on-disk scan database

use netsift::config::{Config, SearchConfig};
use netsift::storage::{ProbeWrite, SqliteStorage, Storage};
use netsift::SearchEngine;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

struct Site<'a> {
    last_octet: u8,
    domain: Option<&'a str>,
    title: &'a str,
    keywords: &'a [(&'a str, u32)],
}

fn store_site(storage: &mut SqliteStorage, site: &Site<'_>) {
    let address = Ipv4Addr::new(198, 51, 100, site.last_octet);
    let url = format!("http://{}:80/", address);
    let keywords: Vec<(String, u32)> = site
        .keywords
        .iter()
        .map(|(keyword, frequency)| (keyword.to_string(), *frequency))
        .collect();

    storage
        .record_success(
            address,
            &ProbeWrite {
                url: &url,
                domain: site.domain,
                title: Some(site.title),
                description: None,
                status_code: 200,
                response_time: 0.05,
                server_info: Some("nginx"),
                content_type: Some("text/html"),
                content_fingerprint: "0000",
                content_size: 512,
                keywords: &keywords,
            },
        )
        .unwrap();
}

/// Builds a small index on disk and returns an engine over it
fn create_engine(db_path: &Path) -> SearchEngine {
    let mut storage = SqliteStorage::new(db_path).unwrap();
    let sites = [
        Site {
            last_octet: 1,
            domain: Some("cams.example.com"),
            title: "Camera Dashboard",
            keywords: &[("camera", 6), ("dashboard", 2)],
        },
        Site {
            last_octet: 2,
            domain: Some("print.example.com"),
            title: "Printer Status",
            keywords: &[("printer", 4), ("camera", 1)],
        },
        Site {
            last_octet: 3,
            domain: Some("nas.example.net"),
            title: "Storage",
            keywords: &[("storage", 3), ("dashboard", 5)],
        },
        Site {
            last_octet: 4,
            domain: None,
            title: "Default page",
            keywords: &[("camera", 2), ("storage", 1)],
        },
    ];
    for site in &sites {
        store_site(&mut storage, site);
    }

    let mut config = Config::default();
    config.search = SearchConfig {
        default_limit: 2,
        max_results: 3,
    };
    SearchEngine::from_config(&config, Arc::new(Mutex::new(storage)))
}

#[test]
fn test_ranked_search_with_pagination() {
    let temp_dir = TempDir::new().unwrap();
    let engine = create_engine(&temp_dir.path().join("search.db"));

    // camera occurs on three pages: scores 18, 6 and 3
    let first = engine.search("Camera", None, 0);
    assert_eq!(first.total_count, 3);
    let addresses: Vec<&str> = first.results.iter().map(|h| h.address.as_str()).collect();
    assert_eq!(addresses, vec!["198.51.100.1", "198.51.100.4"]);
    assert_eq!(first.results[0].score, 18.0);

    let second = engine.search("camera", None, 2);
    assert_eq!(second.results.len(), 1);
    assert_eq!(second.results[0].address, "198.51.100.2");
    assert_eq!(second.results[0].score, 3.0);
}

#[test]
fn test_multi_term_query_matches_any_term() {
    let temp_dir = TempDir::new().unwrap();
    let engine = create_engine(&temp_dir.path().join("search.db"));

    let response = engine.search("dashboard storage", Some(10), 0);
    // Limit is clamped to max-results
    assert_eq!(response.results.len(), 3);
    assert_eq!(response.total_count, 3);
    // nas: 5*2 + 3*2 = 16, cams: 2*2 = 4, default page: 1*2 = 2
    assert_eq!(response.results[0].address, "198.51.100.3");
    assert_eq!(response.results[0].score, 16.0);
    assert_eq!(response.results[2].score, 2.0);
}

#[test]
fn test_domain_search_is_substring_and_case_sensitive() {
    let temp_dir = TempDir::new().unwrap();
    let engine = create_engine(&temp_dir.path().join("search.db"));

    let response = engine.search_by_domain("example.com", Some(3), 0);
    assert_eq!(response.query, "domain:example.com");
    assert_eq!(response.total_count, 2);
    assert!(response.results.iter().all(|hit| hit.page_count.is_none()));

    assert_eq!(engine.search_by_domain("Example", None, 0).total_count, 0);
    assert_eq!(engine.search_by_domain("  ", None, 0).total_count, 0);
}

#[test]
fn test_search_history_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("search.db");
    {
        let engine = create_engine(&db_path);
        engine.search("camera", None, 0);
        engine.search("nothing-matches-this", None, 0);
        engine.search("the", None, 0);
    }

    let storage = SqliteStorage::new(&db_path).unwrap();
    let engine = SearchEngine::from_config(&Config::default(), Arc::new(Mutex::new(storage)));
    let analytics = engine.search_analytics(None);

    assert!(analytics.error.is_none());
    assert_eq!(analytics.statistics.total_searches, 3);
    assert_eq!(analytics.statistics.unique_queries, 3);
    assert_eq!(analytics.statistics.avg_results, 1.0);
    assert_eq!(analytics.recent_searches[0].query, "the");
    assert_eq!(analytics.recent_searches[2].result_count, 3);
}

#[test]
fn test_popular_keywords_and_host_details() {
    let temp_dir = TempDir::new().unwrap();
    let engine = create_engine(&temp_dir.path().join("search.db"));

    let keywords = engine.popular_keywords(Some(3));
    assert_eq!(keywords.len(), 3);
    assert_eq!(keywords[0].keyword, "camera");
    assert_eq!(keywords[0].total_occurrences, 3);
    // dashboard and storage tie on occurrences and pages, alphabetical wins
    assert_eq!(keywords[1].keyword, "dashboard");
    assert_eq!(keywords[2].keyword, "storage");

    let details = engine.host_details("198.51.100.3").unwrap();
    assert_eq!(details.host.domain.as_deref(), Some("nas.example.net"));
    assert_eq!(details.pages.len(), 1);
    assert_eq!(details.top_keywords[0].keyword, "dashboard");
    assert!(engine.host_details("198.51.100.200").is_none());
}
