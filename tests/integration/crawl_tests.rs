//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for a web server on 127.0.0.1 and
//! drive the full claim, probe and store cycle end-to-end. The scan network
//! is a documentation range, so candidate generation seeds nothing and only
//! the addresses queued by the test are probed.

use ipnetwork::Ipv4Network;
use netsift::config::Config;
use netsift::crawler::{Crawler, EventKind};
use netsift::state::{CrawlStatus, QueueStatus};
use netsift::storage::{SqliteStorage, Storage};
use netsift::SearchEngine;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LOCALHOST: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 1);

/// Creates a fast test configuration probing `port`
fn create_test_config(port: u16, db_path: &str) -> Config {
    let mut config = Config::default();
    config.crawler.worker_count = 2;
    config.crawler.batch_size = 4;
    config.crawler.max_addresses_per_run = 10;
    config.crawler.request_timeout = 2;
    config.crawler.politeness_delay = 10;
    config.crawler.idle_wait = 50;
    config.crawler.probe_port = port;
    config.output.database_path = db_path.to_string();
    config
}

fn unroutable_network() -> Ipv4Network {
    "203.0.113.0/24".parse().unwrap()
}

fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Opens the test database, letting `setup` prepare the queue first
fn create_crawler(
    port: u16,
    temp_dir: &TempDir,
    setup: impl FnOnce(&mut SqliteStorage),
) -> Arc<Crawler> {
    let db_path = temp_dir.path().join("scan.db");
    let config = create_test_config(port, db_path.to_str().unwrap());

    let mut storage = SqliteStorage::new(&db_path).unwrap();
    setup(&mut storage);

    Arc::new(
        Crawler::with_storage(config, "test-hash".to_string(), Arc::new(Mutex::new(storage)))
            .unwrap(),
    )
}

fn spawn_scan(crawler: &Arc<Crawler>) -> tokio::task::JoinHandle<bool> {
    let crawler = Arc::clone(crawler);
    tokio::spawn(async move { crawler.start(unroutable_network(), 10).await })
}

/// Polls `condition` every 20ms for up to 10 seconds
async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

fn queue_status(crawler: &Crawler, address: Ipv4Addr) -> Option<QueueStatus> {
    crawler
        .storage()
        .lock()
        .unwrap()
        .queue_status(address)
        .unwrap()
}

async fn mount_page(mock_server: &MockServer) {
    let body = r#"<!DOCTYPE html>
<html>
<head>
    <title>Device Portal</title>
    <meta name="description" content="Firmware management for lab devices">
    <link rel="canonical" href="https://Portal.Example.org/home">
    <script>var firmware = "hidden";</script>
</head>
<body>
    <h1>Firmware upgrade</h1>
    <p>Upload firmware images to the portal. Firmware versions are listed below.</p>
</body>
</html>"#;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("server", "mockd/1.0")
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(body),
        )
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_full_scan_stores_and_indexes_host() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server).await;
    let port = mock_server.address().port();

    let temp_dir = TempDir::new().unwrap();
    let crawler = create_crawler(port, &temp_dir, |storage| {
        storage.enqueue(&[LOCALHOST]).unwrap();
    });
    let scan = spawn_scan(&crawler);

    assert!(
        wait_until(|| queue_status(&crawler, LOCALHOST) == Some(QueueStatus::Completed)).await,
        "address was never completed"
    );
    assert!(crawler.stop().await);
    assert!(scan.await.unwrap());

    {
        let storage = crawler.storage();
        let storage = storage.lock().unwrap();

        let host = storage.get_host("127.0.0.1").unwrap().unwrap();
        assert!(host.is_active);
        assert_eq!(host.title.as_deref(), Some("Device Portal"));
        assert_eq!(host.domain.as_deref(), Some("portal.example.org"));
        assert_eq!(host.server_info.as_deref(), Some("mockd/1.0"));
        assert_eq!(host.status_code, Some(200));

        let pages = storage.get_pages_for_host(host.id).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].content_fingerprint.len(), 64);

        let top = storage.get_host_top_keywords(host.id, 1).unwrap();
        assert_eq!(top[0].0, "firmware");

        let state = storage.get_crawl_state().unwrap().unwrap();
        assert_eq!(state.status, CrawlStatus::Stopped);
        assert_eq!(state.total_crawled, 1);
        assert_eq!(state.config_hash.as_deref(), Some("test-hash"));
    }

    let kinds: Vec<EventKind> = crawler.recent_events(10).iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&EventKind::Detected));
    assert_eq!(kinds.first(), Some(&EventKind::Stored));
    assert!(crawler.currently_scanning(10).is_empty());

    let config = create_test_config(port, "unused.db");
    let engine = SearchEngine::from_config(&config, crawler.storage());
    let response = engine.search("firmware", None, 0);
    assert_eq!(response.total_count, 1);
    assert_eq!(response.results[0].address, "127.0.0.1");
}

#[tokio::test]
async fn test_unanswered_address_is_marked_failed() {
    let temp_dir = TempDir::new().unwrap();
    let crawler = create_crawler(unused_port(), &temp_dir, |storage| {
        storage.enqueue(&[LOCALHOST]).unwrap();
    });
    let scan = spawn_scan(&crawler);

    assert!(
        wait_until(|| queue_status(&crawler, LOCALHOST) == Some(QueueStatus::Failed)).await,
        "address was never marked failed"
    );
    assert!(crawler.stop().await);
    assert!(scan.await.unwrap());

    let storage = crawler.storage();
    let storage = storage.lock().unwrap();
    let host = storage.get_host("127.0.0.1").unwrap().unwrap();
    assert!(!host.is_active);
    assert!(host.title.is_none());
    assert_eq!(storage.count_pages().unwrap(), 0);
}

#[tokio::test]
async fn test_interrupted_claim_is_recovered_on_start() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server).await;

    let temp_dir = TempDir::new().unwrap();
    let crawler = create_crawler(mock_server.address().port(), &temp_dir, |storage| {
        storage.enqueue(&[LOCALHOST]).unwrap();
        // A previous process claimed the entry and died
        assert_eq!(storage.claim_batch(1).unwrap(), vec![LOCALHOST]);
    });
    assert_eq!(
        queue_status(&crawler, LOCALHOST),
        Some(QueueStatus::InProgress)
    );

    let scan = spawn_scan(&crawler);
    assert!(
        wait_until(|| queue_status(&crawler, LOCALHOST) == Some(QueueStatus::Completed)).await,
        "interrupted entry was never probed"
    );
    assert!(crawler.stop().await);
    assert!(scan.await.unwrap());
}

#[tokio::test]
async fn test_pause_keeps_workers_and_resume_continues() {
    let temp_dir = TempDir::new().unwrap();
    let crawler = create_crawler(unused_port(), &temp_dir, |_| {});
    let scan = spawn_scan(&crawler);

    assert!(wait_until(|| crawler.status().worker_count == 2).await);
    assert!(crawler.pause());
    assert!(!crawler.pause());

    let status = crawler.status();
    assert!(status.active);
    assert!(status.paused);
    assert_eq!(status.status, CrawlStatus::Paused);
    assert_eq!(status.worker_count, 2);

    let persisted = crawler
        .storage()
        .lock()
        .unwrap()
        .get_crawl_state()
        .unwrap()
        .unwrap();
    assert_eq!(persisted.status, CrawlStatus::Paused);

    // Work queued while paused waits for resume
    crawler
        .storage()
        .lock()
        .unwrap()
        .enqueue(&[LOCALHOST])
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(queue_status(&crawler, LOCALHOST), Some(QueueStatus::Pending));

    assert!(crawler.resume());
    assert_eq!(crawler.status().status, CrawlStatus::Running);
    assert!(
        wait_until(|| queue_status(&crawler, LOCALHOST) == Some(QueueStatus::Failed)).await,
        "queued address was not probed after resume"
    );

    assert!(crawler.stop().await);
    assert!(scan.await.unwrap());
    assert!(!crawler.resume());
}

#[tokio::test]
async fn test_stop_lets_inflight_probe_finish() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><title>Slow device</title></html>")
                .set_delay(Duration::from_secs(6)),
        )
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("scan.db");
    let mut config = create_test_config(mock_server.address().port(), db_path.to_str().unwrap());
    config.crawler.request_timeout = 30;
    let mut storage = SqliteStorage::new(&db_path).unwrap();
    storage.enqueue(&[LOCALHOST]).unwrap();
    let crawler = Arc::new(
        Crawler::with_storage(config, "test-hash".to_string(), Arc::new(Mutex::new(storage)))
            .unwrap(),
    );

    let scan = spawn_scan(&crawler);
    assert!(wait_until(|| !crawler.currently_scanning(10).is_empty()).await);

    assert!(crawler.stop().await);
    assert!(scan.await.unwrap());

    assert!(crawler.currently_scanning(10).is_empty());
    assert_eq!(queue_status(&crawler, LOCALHOST), Some(QueueStatus::Completed));
    let host = crawler
        .storage()
        .lock()
        .unwrap()
        .get_host("127.0.0.1")
        .unwrap()
        .unwrap();
    assert_eq!(host.title.as_deref(), Some("Slow device"));
}

#[tokio::test]
async fn test_second_start_is_rejected_and_restart_works() {
    let temp_dir = TempDir::new().unwrap();
    let crawler = create_crawler(unused_port(), &temp_dir, |_| {});

    let first = spawn_scan(&crawler);
    assert!(wait_until(|| crawler.status().active).await);
    assert!(!crawler.start(unroutable_network(), 10).await);

    assert!(crawler.stop().await);
    assert!(first.await.unwrap());
    assert!(!crawler.stop().await);
    assert_eq!(crawler.status().worker_count, 0);

    let second = spawn_scan(&crawler);
    assert!(wait_until(|| crawler.status().worker_count == 2).await);
    assert!(crawler.stop().await);
    assert!(second.await.unwrap());
    assert_eq!(crawler.crawl_status(), CrawlStatus::Stopped);
}
