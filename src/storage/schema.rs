//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Netsift database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Durable task queue: one row per candidate address ever seeded
CREATE TABLE IF NOT EXISTS crawl_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    address TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL DEFAULT 'pending',
    added_at TEXT NOT NULL,
    claimed_at TEXT,
    updated_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_crawl_queue_status ON crawl_queue(status);

-- Latest known state of each probed address
CREATE TABLE IF NOT EXISTS hosts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    address TEXT NOT NULL UNIQUE,
    domain TEXT,
    title TEXT,
    description TEXT,
    status_code INTEGER,
    response_time REAL,
    server_info TEXT,
    content_type TEXT,
    is_active INTEGER NOT NULL DEFAULT 0,
    last_crawled TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_hosts_active ON hosts(is_active);
CREATE INDEX IF NOT EXISTS idx_hosts_domain ON hosts(domain);

-- One row per successful probe; history accumulates
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    host_id INTEGER NOT NULL REFERENCES hosts(id),
    url TEXT NOT NULL,
    content_fingerprint TEXT NOT NULL,
    title TEXT,
    meta_description TEXT,
    http_status INTEGER,
    load_time REAL,
    content_size INTEGER NOT NULL,
    last_crawled TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_host ON pages(host_id);
CREATE INDEX IF NOT EXISTS idx_pages_fingerprint ON pages(content_fingerprint);

-- Global keyword table with a running count of pages containing the keyword
CREATE TABLE IF NOT EXISTS keywords (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    keyword TEXT NOT NULL UNIQUE,
    total_occurrences INTEGER NOT NULL DEFAULT 0
);

-- Per-page keyword frequencies
CREATE TABLE IF NOT EXISTS page_keywords (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES pages(id),
    keyword_id INTEGER NOT NULL REFERENCES keywords(id),
    frequency INTEGER NOT NULL,
    UNIQUE(page_id, keyword_id)
);

CREATE INDEX IF NOT EXISTS idx_page_keywords_keyword ON page_keywords(keyword_id);

-- Singleton orchestrator state
CREATE TABLE IF NOT EXISTS crawl_state (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    status TEXT NOT NULL,
    current_network TEXT,
    total_crawled INTEGER NOT NULL DEFAULT 0,
    config_hash TEXT,
    start_time TEXT,
    last_update TEXT NOT NULL
);

-- Append-only query log
CREATE TABLE IF NOT EXISTS search_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    query TEXT NOT NULL,
    result_count INTEGER NOT NULL,
    search_time TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_search_history_time ON search_history(search_time);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
