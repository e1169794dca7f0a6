//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! Several processes or threads may open the same file; claims and result
//! writes take the write lock up front with `BEGIN IMMEDIATE` so concurrent
//! claimers serialize instead of racing.

use crate::state::{CrawlStatus, QueueStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    now_timestamp, timestamp_before, CrawlStateRecord, HostRecord, KeywordStat, PageRecord,
    ProbeWrite, ScoredHost, SearchHistoryEntry, SearchStatistics,
};
use crate::SiftError;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

/// How long a connection waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const HOST_COLUMNS: &str = "id, address, domain, title, description, status_code, \
     response_time, server_info, content_type, is_active, last_crawled";

const JOINED_HOST_COLUMNS: &str = "h.id, h.address, h.domain, h.title, h.description, \
     h.status_code, h.response_time, h.server_info, h.content_type, h.is_active, h.last_crawled";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SiftError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SiftError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, SiftError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Moves an in-progress entry to `to`
    fn finish_entry(&mut self, address: Ipv4Addr, to: QueueStatus) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE crawl_queue SET status = ?1, updated_at = ?2 WHERE address = ?3 AND status = ?4",
            params![
                to.to_db_string(),
                now_timestamp(),
                address.to_string(),
                QueueStatus::InProgress.to_db_string()
            ],
        )?;
        Ok(changed > 0)
    }
}

fn row_to_host(row: &Row<'_>) -> rusqlite::Result<HostRecord> {
    Ok(HostRecord {
        id: row.get(0)?,
        address: row.get(1)?,
        domain: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        status_code: row.get(5)?,
        response_time: row.get(6)?,
        server_info: row.get(7)?,
        content_type: row.get(8)?,
        is_active: row.get::<_, i64>(9)? != 0,
        last_crawled: row.get(10)?,
    })
}

fn parse_address(raw: &str) -> StorageResult<Ipv4Addr> {
    raw.parse()
        .map_err(|_| StorageError::Serialization(format!("Invalid queued address: {}", raw)))
}

/// Builds `?1, ?2, ...` for an IN clause of `count` terms
fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn term_values(terms: &[String]) -> Vec<Value> {
    terms.iter().map(|t| Value::Text(t.clone())).collect()
}

impl Storage for SqliteStorage {
    // ===== Task Queue =====

    fn enqueue(&mut self, addresses: &[Ipv4Addr]) -> StorageResult<usize> {
        let now = now_timestamp();
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO crawl_queue (address, status, added_at) VALUES (?1, ?2, ?3)",
            )?;
            for address in addresses {
                inserted += stmt.execute(params![
                    address.to_string(),
                    QueueStatus::Pending.to_db_string(),
                    now
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn claim_batch(&mut self, limit: usize) -> StorageResult<Vec<Ipv4Addr>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let now = now_timestamp();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let claimed = {
            let mut stmt = tx.prepare(
                "UPDATE crawl_queue SET status = ?1, claimed_at = ?2, updated_at = ?2
                 WHERE id IN (
                     SELECT id FROM crawl_queue WHERE status = ?3 ORDER BY id LIMIT ?4
                 )
                 RETURNING id, address",
            )?;
            let mut rows = stmt
                .query_map(
                    params![
                        QueueStatus::InProgress.to_db_string(),
                        now,
                        QueueStatus::Pending.to_db_string(),
                        limit as i64
                    ],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
                )?
                .collect::<Result<Vec<_>, _>>()?;
            // RETURNING does not guarantee row order
            rows.sort_by_key(|(id, _)| *id);
            rows
        };
        tx.commit()?;

        claimed
            .iter()
            .map(|(_, address)| parse_address(address))
            .collect()
    }

    fn mark_completed(&mut self, address: Ipv4Addr) -> StorageResult<bool> {
        self.finish_entry(address, QueueStatus::Completed)
    }

    fn mark_failed(&mut self, address: Ipv4Addr) -> StorageResult<bool> {
        self.finish_entry(address, QueueStatus::Failed)
    }

    fn release(&mut self, address: Ipv4Addr) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE crawl_queue SET status = ?1, claimed_at = NULL, updated_at = ?2
             WHERE address = ?3 AND status = ?4",
            params![
                QueueStatus::Pending.to_db_string(),
                now_timestamp(),
                address.to_string(),
                QueueStatus::InProgress.to_db_string()
            ],
        )?;
        Ok(changed > 0)
    }

    fn reclaim_stale(&mut self, older_than: Duration) -> StorageResult<usize> {
        let Some(cutoff) = timestamp_before(older_than) else {
            return Ok(0);
        };

        let changed = self.conn.execute(
            "UPDATE crawl_queue SET status = ?1, claimed_at = NULL, updated_at = ?2
             WHERE status = ?3 AND (claimed_at IS NULL OR claimed_at <= ?4)",
            params![
                QueueStatus::Pending.to_db_string(),
                now_timestamp(),
                QueueStatus::InProgress.to_db_string(),
                cutoff
            ],
        )?;
        Ok(changed)
    }

    fn queue_status(&self, address: Ipv4Addr) -> StorageResult<Option<QueueStatus>> {
        let status: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM crawl_queue WHERE address = ?1",
                params![address.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(status.and_then(|s| QueueStatus::from_db_string(&s)))
    }

    fn count_by_status(&self) -> StorageResult<HashMap<QueueStatus, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM crawl_queue GROUP BY status")?;

        let mut counts = HashMap::new();
        let rows = stmt.query_map([], |row| {
            let status_str: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((status_str, count))
        })?;

        for row in rows {
            let (status_str, count) = row?;
            if let Some(status) = QueueStatus::from_db_string(&status_str) {
                counts.insert(status, count as u64);
            }
        }

        Ok(counts)
    }

    fn count_queue_total(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM crawl_queue", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Result Writes =====

    fn record_success(
        &mut self,
        address: Ipv4Addr,
        probe: &ProbeWrite<'_>,
    ) -> StorageResult<i64> {
        let now = now_timestamp();
        let address = address.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Upsert keeps the host id stable so earlier pages stay attached
        tx.execute(
            "INSERT INTO hosts (address, domain, title, description, status_code, response_time,
                                server_info, content_type, is_active, last_crawled)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9)
             ON CONFLICT(address) DO UPDATE SET
                 domain = excluded.domain,
                 title = excluded.title,
                 description = excluded.description,
                 status_code = excluded.status_code,
                 response_time = excluded.response_time,
                 server_info = excluded.server_info,
                 content_type = excluded.content_type,
                 is_active = 1,
                 last_crawled = excluded.last_crawled",
            params![
                address,
                probe.domain,
                probe.title,
                probe.description,
                probe.status_code,
                probe.response_time,
                probe.server_info,
                probe.content_type,
                now
            ],
        )?;
        let host_id: i64 = tx.query_row(
            "SELECT id FROM hosts WHERE address = ?1",
            params![address],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO pages (host_id, url, content_fingerprint, title, meta_description,
                                http_status, load_time, content_size, last_crawled)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                host_id,
                probe.url,
                probe.content_fingerprint,
                probe.title,
                probe.description,
                probe.status_code,
                probe.response_time,
                probe.content_size as i64,
                now
            ],
        )?;
        let page_id = tx.last_insert_rowid();

        {
            let mut bump = tx.prepare(
                "INSERT INTO keywords (keyword, total_occurrences) VALUES (?1, 1)
                 ON CONFLICT(keyword) DO UPDATE SET total_occurrences = total_occurrences + 1",
            )?;
            let mut lookup = tx.prepare("SELECT id FROM keywords WHERE keyword = ?1")?;
            let mut link = tx.prepare(
                "INSERT INTO page_keywords (page_id, keyword_id, frequency) VALUES (?1, ?2, ?3)",
            )?;

            for (keyword, frequency) in probe.keywords {
                bump.execute(params![keyword])?;
                let keyword_id: i64 = lookup.query_row(params![keyword], |row| row.get(0))?;
                link.execute(params![page_id, keyword_id, frequency])?;
            }
        }

        tx.execute(
            "UPDATE crawl_queue SET status = ?1, updated_at = ?2 WHERE address = ?3 AND status = ?4",
            params![
                QueueStatus::Completed.to_db_string(),
                now,
                address,
                QueueStatus::InProgress.to_db_string()
            ],
        )?;

        tx.commit()?;
        Ok(page_id)
    }

    fn record_failure(&mut self, address: Ipv4Addr) -> StorageResult<()> {
        let now = now_timestamp();
        let address = address.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO hosts (address, is_active, last_crawled) VALUES (?1, 0, ?2)
             ON CONFLICT(address) DO UPDATE SET
                 domain = NULL,
                 title = NULL,
                 description = NULL,
                 status_code = NULL,
                 response_time = NULL,
                 server_info = NULL,
                 content_type = NULL,
                 is_active = 0,
                 last_crawled = excluded.last_crawled",
            params![address, now],
        )?;

        tx.execute(
            "UPDATE crawl_queue SET status = ?1, updated_at = ?2 WHERE address = ?3 AND status = ?4",
            params![
                QueueStatus::Failed.to_db_string(),
                now,
                address,
                QueueStatus::InProgress.to_db_string()
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    // ===== Hosts and Pages =====

    fn get_host(&self, address: &str) -> StorageResult<Option<HostRecord>> {
        let sql = format!("SELECT {} FROM hosts WHERE address = ?1", HOST_COLUMNS);
        let host = self
            .conn
            .query_row(&sql, params![address], row_to_host)
            .optional()?;
        Ok(host)
    }

    fn get_pages_for_host(&self, host_id: i64) -> StorageResult<Vec<PageRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, host_id, url, content_fingerprint, title, meta_description, http_status,
                    load_time, content_size, last_crawled
             FROM pages WHERE host_id = ?1
             ORDER BY last_crawled DESC, id DESC",
        )?;

        let pages = stmt
            .query_map(params![host_id], |row| {
                Ok(PageRecord {
                    id: row.get(0)?,
                    host_id: row.get(1)?,
                    url: row.get(2)?,
                    content_fingerprint: row.get(3)?,
                    title: row.get(4)?,
                    meta_description: row.get(5)?,
                    http_status: row.get(6)?,
                    load_time: row.get(7)?,
                    content_size: row.get::<_, i64>(8)? as u64,
                    last_crawled: row.get(9)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pages)
    }

    fn get_host_top_keywords(
        &self,
        host_id: i64,
        limit: usize,
    ) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT k.keyword, SUM(pk.frequency) AS total_frequency
             FROM keywords k
             JOIN page_keywords pk ON pk.keyword_id = k.id
             JOIN pages p ON p.id = pk.page_id
             WHERE p.host_id = ?1
             GROUP BY k.id
             ORDER BY total_frequency DESC, k.keyword ASC
             LIMIT ?2",
        )?;

        let keywords = stmt
            .query_map(params![host_id, limit as i64], |row| {
                Ok((row.get(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(keywords)
    }

    fn get_keyword_occurrences(&self, keyword: &str) -> StorageResult<Option<u64>> {
        let count: Option<i64> = self
            .conn
            .query_row(
                "SELECT total_occurrences FROM keywords WHERE keyword = ?1",
                params![keyword],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.map(|c| c as u64))
    }

    // ===== Crawl State =====

    fn begin_crawl_state(
        &mut self,
        network: &str,
        config_hash: &str,
        total_crawled: u64,
    ) -> StorageResult<()> {
        let now = now_timestamp();
        self.conn.execute(
            "INSERT OR REPLACE INTO crawl_state
             (id, status, current_network, total_crawled, config_hash, start_time, last_update)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                CrawlStatus::Running.to_db_string(),
                network,
                total_crawled as i64,
                config_hash,
                now
            ],
        )?;
        Ok(())
    }

    fn update_crawl_state(
        &mut self,
        status: CrawlStatus,
        total_crawled: Option<u64>,
    ) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO crawl_state (id, status, total_crawled, last_update)
             VALUES (1, ?1, COALESCE(?2, 0), ?3)
             ON CONFLICT(id) DO UPDATE SET
                 status = excluded.status,
                 total_crawled = COALESCE(?2, total_crawled),
                 last_update = excluded.last_update",
            params![
                status.to_db_string(),
                total_crawled.map(|t| t as i64),
                now_timestamp()
            ],
        )?;
        Ok(())
    }

    fn get_crawl_state(&self) -> StorageResult<Option<CrawlStateRecord>> {
        let state = self
            .conn
            .query_row(
                "SELECT status, current_network, total_crawled, config_hash, start_time, last_update
                 FROM crawl_state WHERE id = 1",
                [],
                |row| {
                    Ok(CrawlStateRecord {
                        status: CrawlStatus::from_db_string(&row.get::<_, String>(0)?)
                            .unwrap_or_default(),
                        current_network: row.get(1)?,
                        total_crawled: row.get::<_, i64>(2)? as u64,
                        config_hash: row.get(3)?,
                        start_time: row.get(4)?,
                        last_update: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(state)
    }

    // ===== Search =====

    fn search_by_terms(
        &self,
        terms: &[String],
        limit: usize,
        offset: usize,
    ) -> StorageResult<Vec<ScoredHost>> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {columns},
                    SUM(pk.frequency * k.total_occurrences) AS score,
                    COUNT(DISTINCT p.id) AS page_count
             FROM hosts h
             JOIN pages p ON p.host_id = h.id
             JOIN page_keywords pk ON pk.page_id = p.id
             JOIN keywords k ON k.id = pk.keyword_id
             WHERE k.keyword IN ({terms}) AND h.is_active = 1
             GROUP BY h.id
             ORDER BY score DESC, page_count DESC, h.id ASC
             LIMIT ?{limit} OFFSET ?{offset}",
            columns = JOINED_HOST_COLUMNS,
            terms = placeholders(terms.len()),
            limit = terms.len() + 1,
            offset = terms.len() + 2,
        );

        let mut values = term_values(terms);
        values.push(Value::Integer(limit as i64));
        values.push(Value::Integer(offset as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let hits = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok(ScoredHost {
                    host: row_to_host(row)?,
                    score: row.get::<_, i64>(11)? as f64,
                    page_count: row.get::<_, i64>(12)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(hits)
    }

    fn count_hosts_by_terms(&self, terms: &[String]) -> StorageResult<u64> {
        if terms.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "SELECT COUNT(DISTINCT h.id)
             FROM hosts h
             JOIN pages p ON p.host_id = h.id
             JOIN page_keywords pk ON pk.page_id = p.id
             JOIN keywords k ON k.id = pk.keyword_id
             WHERE k.keyword IN ({}) AND h.is_active = 1",
            placeholders(terms.len())
        );

        let values = term_values(terms);
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(count as u64)
    }

    fn search_by_domain(
        &self,
        fragment: &str,
        limit: usize,
        offset: usize,
    ) -> StorageResult<Vec<HostRecord>> {
        // instr() is case-sensitive, unlike LIKE
        let sql = format!(
            "SELECT {} FROM hosts
             WHERE is_active = 1 AND domain IS NOT NULL AND instr(domain, ?1) > 0
             ORDER BY last_crawled DESC, id DESC
             LIMIT ?2 OFFSET ?3",
            HOST_COLUMNS
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let hosts = stmt
            .query_map(
                params![fragment, limit as i64, offset as i64],
                row_to_host,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(hosts)
    }

    fn count_hosts_by_domain(&self, fragment: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM hosts
             WHERE is_active = 1 AND domain IS NOT NULL AND instr(domain, ?1) > 0",
            params![fragment],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn popular_keywords(&self, limit: usize) -> StorageResult<Vec<KeywordStat>> {
        let mut stmt = self.conn.prepare(
            "SELECT k.keyword, k.total_occurrences, COUNT(DISTINCT pk.page_id) AS page_count
             FROM keywords k
             JOIN page_keywords pk ON pk.keyword_id = k.id
             GROUP BY k.id
             ORDER BY k.total_occurrences DESC, page_count DESC, k.keyword ASC
             LIMIT ?1",
        )?;

        let keywords = stmt
            .query_map(params![limit as i64], |row| {
                Ok(KeywordStat {
                    keyword: row.get(0)?,
                    total_occurrences: row.get::<_, i64>(1)? as u64,
                    page_count: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(keywords)
    }

    fn log_search(&mut self, query: &str, result_count: u64) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO search_history (query, result_count, search_time) VALUES (?1, ?2, ?3)",
            params![query, result_count as i64, now_timestamp()],
        )?;
        Ok(())
    }

    fn recent_searches(&self, limit: usize) -> StorageResult<Vec<SearchHistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT query, result_count, search_time FROM search_history
             ORDER BY search_time DESC, id DESC
             LIMIT ?1",
        )?;

        let entries = stmt
            .query_map(params![limit as i64], |row| {
                Ok(SearchHistoryEntry {
                    query: row.get(0)?,
                    result_count: row.get::<_, i64>(1)? as u64,
                    search_time: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    fn search_statistics_since(&self, since: &str) -> StorageResult<SearchStatistics> {
        let (total, avg, unique): (i64, Option<f64>, i64) = self.conn.query_row(
            "SELECT COUNT(*), AVG(result_count), COUNT(DISTINCT query)
             FROM search_history WHERE search_time >= ?1",
            params![since],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(SearchStatistics {
            total_searches: total as u64,
            avg_results: avg.unwrap_or(0.0),
            unique_queries: unique as u64,
        })
    }

    // ===== Statistics =====

    fn count_hosts(&self, active_only: bool) -> StorageResult<u64> {
        let sql = if active_only {
            "SELECT COUNT(*) FROM hosts WHERE is_active = 1"
        } else {
            "SELECT COUNT(*) FROM hosts"
        };
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_keywords(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM keywords", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn addr(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(198, 51, 100, last)
    }

    fn probe_write<'a>(keywords: &'a [(String, u32)]) -> ProbeWrite<'a> {
        ProbeWrite {
            url: "http://198.51.100.1:80/",
            domain: Some("Example.org"),
            title: Some("Welcome"),
            description: Some("A test host"),
            status_code: 200,
            response_time: 0.25,
            server_info: Some("nginx"),
            content_type: Some("text/html"),
            content_fingerprint: "abc123",
            content_size: 512,
            keywords,
        }
    }

    fn kw(pairs: &[(&str, u32)]) -> Vec<(String, u32)> {
        pairs.iter().map(|(k, f)| (k.to_string(), *f)).collect()
    }

    #[test]
    fn test_create_in_memory() {
        let storage = SqliteStorage::new_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_enqueue_ignores_duplicates() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert_eq!(storage.enqueue(&[addr(1), addr(2)]).unwrap(), 2);
        assert_eq!(storage.enqueue(&[addr(2), addr(3)]).unwrap(), 1);
        assert_eq!(storage.count_queue_total().unwrap(), 3);
    }

    #[test]
    fn test_enqueue_does_not_reset_existing_status() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.enqueue(&[addr(1)]).unwrap();
        storage.claim_batch(1).unwrap();
        storage.mark_completed(addr(1)).unwrap();

        storage.enqueue(&[addr(1)]).unwrap();
        assert_eq!(
            storage.queue_status(addr(1)).unwrap(),
            Some(QueueStatus::Completed)
        );
    }

    #[test]
    fn test_claim_batch_in_insertion_order() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.enqueue(&[addr(5), addr(3), addr(9)]).unwrap();

        let claimed = storage.claim_batch(2).unwrap();
        assert_eq!(claimed, vec![addr(5), addr(3)]);
        assert_eq!(
            storage.queue_status(addr(5)).unwrap(),
            Some(QueueStatus::InProgress)
        );
        assert_eq!(
            storage.queue_status(addr(9)).unwrap(),
            Some(QueueStatus::Pending)
        );

        assert_eq!(storage.claim_batch(10).unwrap(), vec![addr(9)]);
        assert!(storage.claim_batch(10).unwrap().is_empty());
    }

    #[test]
    fn test_claim_zero_claims_nothing() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.enqueue(&[addr(1)]).unwrap();
        assert!(storage.claim_batch(0).unwrap().is_empty());
        assert_eq!(
            storage.queue_status(addr(1)).unwrap(),
            Some(QueueStatus::Pending)
        );
    }

    #[test]
    fn test_finish_only_from_in_progress() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.enqueue(&[addr(1), addr(2)]).unwrap();

        // Pending entries cannot be finished directly
        assert!(!storage.mark_completed(addr(1)).unwrap());

        storage.claim_batch(2).unwrap();
        assert!(storage.mark_completed(addr(1)).unwrap());
        assert!(storage.mark_failed(addr(2)).unwrap());

        // Terminal entries stay terminal
        assert!(!storage.mark_failed(addr(1)).unwrap());
        assert!(!storage.release(addr(2)).unwrap());
        assert_eq!(
            storage.queue_status(addr(1)).unwrap(),
            Some(QueueStatus::Completed)
        );
    }

    #[test]
    fn test_release_returns_entry_to_pending() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.enqueue(&[addr(1)]).unwrap();
        storage.claim_batch(1).unwrap();

        assert!(storage.release(addr(1)).unwrap());
        assert_eq!(storage.claim_batch(1).unwrap(), vec![addr(1)]);
    }

    #[test]
    fn test_reclaim_stale() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.enqueue(&[addr(1), addr(2)]).unwrap();
        storage.claim_batch(2).unwrap();

        // Nothing has been in progress for an hour yet
        assert_eq!(storage.reclaim_stale(Duration::from_secs(3600)).unwrap(), 0);

        assert_eq!(storage.reclaim_stale(Duration::ZERO).unwrap(), 2);
        let counts = storage.count_by_status().unwrap();
        assert_eq!(counts.get(&QueueStatus::Pending), Some(&2));
        assert_eq!(counts.get(&QueueStatus::InProgress), None);
    }

    #[test]
    fn test_count_by_status() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .enqueue(&[addr(1), addr(2), addr(3), addr(4)])
            .unwrap();
        storage.claim_batch(3).unwrap();
        storage.mark_completed(addr(1)).unwrap();
        storage.mark_failed(addr(2)).unwrap();

        let counts = storage.count_by_status().unwrap();
        assert_eq!(counts.get(&QueueStatus::Pending), Some(&1));
        assert_eq!(counts.get(&QueueStatus::InProgress), Some(&1));
        assert_eq!(counts.get(&QueueStatus::Completed), Some(&1));
        assert_eq!(counts.get(&QueueStatus::Failed), Some(&1));
    }

    #[test]
    fn test_concurrent_claims_are_disjoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.db");

        let addresses: Vec<Ipv4Addr> = (1..=200u8).map(|i| Ipv4Addr::new(198, 18, 0, i)).collect();
        {
            let mut storage = SqliteStorage::new(&path).unwrap();
            storage.enqueue(&addresses).unwrap();
        }

        let start = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let path = path.clone();
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    let mut storage = SqliteStorage::new(&path).unwrap();
                    start.wait();
                    let mut claimed = Vec::new();
                    loop {
                        let batch = storage.claim_batch(7).unwrap();
                        if batch.is_empty() {
                            break;
                        }
                        claimed.extend(batch);
                    }
                    claimed
                })
            })
            .collect();

        let results: Vec<Vec<Ipv4Addr>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let first: HashSet<_> = results[0].iter().copied().collect();
        let second: HashSet<_> = results[1].iter().copied().collect();

        assert!(first.is_disjoint(&second));
        assert_eq!(first.len() + second.len(), addresses.len());
    }

    #[test]
    fn test_record_success_writes_everything() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.enqueue(&[addr(1)]).unwrap();
        storage.claim_batch(1).unwrap();

        let keywords = kw(&[("nginx", 3), ("welcome", 1)]);
        let page_id = storage
            .record_success(addr(1), &probe_write(&keywords))
            .unwrap();
        assert!(page_id > 0);

        let host = storage.get_host("198.51.100.1").unwrap().unwrap();
        assert!(host.is_active);
        assert_eq!(host.status_code, Some(200));
        assert_eq!(host.domain.as_deref(), Some("Example.org"));
        assert_eq!(host.server_info.as_deref(), Some("nginx"));

        let pages = storage.get_pages_for_host(host.id).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].content_fingerprint, "abc123");
        assert_eq!(pages[0].content_size, 512);

        assert_eq!(storage.get_keyword_occurrences("nginx").unwrap(), Some(1));
        assert_eq!(
            storage.queue_status(addr(1)).unwrap(),
            Some(QueueStatus::Completed)
        );
    }

    #[test]
    fn test_reprobe_keeps_host_id_and_history() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let keywords = kw(&[("nginx", 2)]);

        storage
            .record_success(addr(1), &probe_write(&keywords))
            .unwrap();
        let first_id = storage.get_host("198.51.100.1").unwrap().unwrap().id;

        storage
            .record_success(addr(1), &probe_write(&keywords))
            .unwrap();
        let host = storage.get_host("198.51.100.1").unwrap().unwrap();

        assert_eq!(host.id, first_id);
        assert_eq!(storage.get_pages_for_host(host.id).unwrap().len(), 2);
        // Counted once per page, not per frequency
        assert_eq!(storage.get_keyword_occurrences("nginx").unwrap(), Some(2));
        assert_eq!(
            storage.get_host_top_keywords(host.id, 10).unwrap(),
            vec![("nginx".to_string(), 4)]
        );
    }

    #[test]
    fn test_record_failure_clears_metadata() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.enqueue(&[addr(1)]).unwrap();
        let keywords = kw(&[("nginx", 2)]);
        storage
            .record_success(addr(1), &probe_write(&keywords))
            .unwrap();

        storage.claim_batch(1).unwrap();
        storage.record_failure(addr(1)).unwrap();

        let host = storage.get_host("198.51.100.1").unwrap().unwrap();
        assert!(!host.is_active);
        assert!(host.title.is_none());
        assert!(host.status_code.is_none());
        assert!(host.domain.is_none());
        // Page history survives
        assert_eq!(storage.get_pages_for_host(host.id).unwrap().len(), 1);
    }

    #[test]
    fn test_record_failure_for_unseen_host() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.enqueue(&[addr(7)]).unwrap();
        storage.claim_batch(1).unwrap();

        storage.record_failure(addr(7)).unwrap();

        let host = storage.get_host("198.51.100.7").unwrap().unwrap();
        assert!(!host.is_active);
        assert_eq!(storage.count_hosts(false).unwrap(), 1);
        assert_eq!(storage.count_hosts(true).unwrap(), 0);
        assert_eq!(
            storage.queue_status(addr(7)).unwrap(),
            Some(QueueStatus::Failed)
        );
    }

    #[test]
    fn test_record_success_is_atomic() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.enqueue(&[addr(1)]).unwrap();
        storage.claim_batch(1).unwrap();

        // A repeated keyword violates the page/keyword uniqueness constraint
        let keywords = kw(&[("nginx", 2), ("nginx", 1)]);
        assert!(storage
            .record_success(addr(1), &probe_write(&keywords))
            .is_err());

        assert_eq!(storage.count_hosts(false).unwrap(), 0);
        assert_eq!(storage.count_pages().unwrap(), 0);
        assert_eq!(storage.count_keywords().unwrap(), 0);
        assert_eq!(
            storage.queue_status(addr(1)).unwrap(),
            Some(QueueStatus::InProgress)
        );
    }

    #[test]
    fn test_search_by_terms_excludes_inactive() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let keywords = kw(&[("camera", 1)]);
        storage
            .record_success(addr(1), &probe_write(&keywords))
            .unwrap();
        storage
            .record_success(addr(2), &probe_write(&keywords))
            .unwrap();
        storage.record_failure(addr(2)).unwrap();

        let terms = vec!["camera".to_string()];
        let hits = storage.search_by_terms(&terms, 10, 0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].host.address, "198.51.100.1");
        assert_eq!(hits[0].score, 2.0);
        assert_eq!(storage.count_hosts_by_terms(&terms).unwrap(), 1);
    }

    #[test]
    fn test_search_by_terms_paging() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        for i in 1..=5u8 {
            let keywords = kw(&[("printer", i as u32)]);
            storage
                .record_success(addr(i), &probe_write(&keywords))
                .unwrap();
        }

        let terms = vec!["printer".to_string()];
        let page = storage.search_by_terms(&terms, 2, 1).unwrap();
        let addresses: Vec<&str> = page.iter().map(|h| h.host.address.as_str()).collect();
        assert_eq!(addresses, vec!["198.51.100.4", "198.51.100.3"]);
        assert_eq!(storage.count_hosts_by_terms(&terms).unwrap(), 5);
    }

    #[test]
    fn test_search_by_domain_is_case_sensitive() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let keywords = kw(&[]);
        storage
            .record_success(addr(1), &probe_write(&keywords))
            .unwrap();

        assert_eq!(storage.search_by_domain("Example", 10, 0).unwrap().len(), 1);
        assert!(storage.search_by_domain("example", 10, 0).unwrap().is_empty());
        assert_eq!(storage.count_hosts_by_domain("ple.org").unwrap(), 1);
    }

    #[test]
    fn test_popular_keywords_order() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let both = kw(&[("router", 1), ("admin", 4)]);
        let one = kw(&[("router", 2)]);
        storage.record_success(addr(1), &probe_write(&both)).unwrap();
        storage.record_success(addr(2), &probe_write(&one)).unwrap();

        let popular = storage.popular_keywords(10).unwrap();
        assert_eq!(popular[0].keyword, "router");
        assert_eq!(popular[0].total_occurrences, 2);
        assert_eq!(popular[0].page_count, 2);
        assert_eq!(popular[1].keyword, "admin");
    }

    #[test]
    fn test_crawl_state_lifecycle() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.get_crawl_state().unwrap().is_none());

        storage
            .begin_crawl_state("10.0.0.0/8", "hash", 12)
            .unwrap();
        let state = storage.get_crawl_state().unwrap().unwrap();
        assert_eq!(state.status, CrawlStatus::Running);
        assert_eq!(state.current_network.as_deref(), Some("10.0.0.0/8"));
        assert_eq!(state.total_crawled, 12);

        storage
            .update_crawl_state(CrawlStatus::Paused, None)
            .unwrap();
        let state = storage.get_crawl_state().unwrap().unwrap();
        assert_eq!(state.status, CrawlStatus::Paused);
        assert_eq!(state.total_crawled, 12);

        storage
            .update_crawl_state(CrawlStatus::Stopped, Some(40))
            .unwrap();
        let state = storage.get_crawl_state().unwrap().unwrap();
        assert_eq!(state.status, CrawlStatus::Stopped);
        assert_eq!(state.total_crawled, 40);
        assert_eq!(state.config_hash.as_deref(), Some("hash"));
    }

    #[test]
    fn test_search_log_statistics() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let since = now_timestamp();
        storage.log_search("apache", 4).unwrap();
        storage.log_search("apache", 2).unwrap();
        storage.log_search("nginx", 0).unwrap();

        let stats = storage.search_statistics_since(&since).unwrap();
        assert_eq!(stats.total_searches, 3);
        assert_eq!(stats.unique_queries, 2);
        assert!((stats.avg_results - 2.0).abs() < f64::EPSILON);

        let recent = storage.recent_searches(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].query, "nginx");
    }

    #[test]
    fn test_search_statistics_empty_window() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let stats = storage.search_statistics_since(&now_timestamp()).unwrap();
        assert_eq!(stats, SearchStatistics::default());
    }
}
