//! Notice store surface + HTTP fetch layer for the crawl pipeline.
//!
//! The pipeline talks to persistence exclusively through [`NoticeStore`];
//! [`PgNoticeStore`] is the production Postgres implementation and
//! [`MemoryNoticeStore`] backs tests and local demos.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use knap_core::{Notice, NoticeInput, NoticeView, RecommendationRecord, UserProfile};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

pub const CRATE_NAME: &str = "knap-storage";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Transactional key-value surface over the notice, user and
/// recommendation tables. Single-row writes are atomic; `ingest_bulk`
/// wraps the whole batch in one transaction.
#[async_trait]
pub trait NoticeStore: Send + Sync {
    async fn find_by_title(&self, title: &str) -> Result<Option<Notice>, StoreError>;

    /// Insert keyed on the title. A conflict with an existing title is
    /// silently absorbed and reported as `None`; the store's unique
    /// constraint, not the caller, resolves insert races.
    async fn insert_ignoring_conflict(
        &self,
        input: &NoticeInput,
    ) -> Result<Option<Notice>, StoreError>;

    /// Write the AI-inferred validity window and flip `enriched_by_ai`.
    async fn update_enrichment(
        &self,
        id: i32,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<(), StoreError>;

    async fn read_profile(&self, user_id: i32) -> Result<Option<UserProfile>, StoreError>;

    async fn read_content(&self, notice_id: i32) -> Result<Option<String>, StoreError>;

    async fn read_recommendation(
        &self,
        user_id: i32,
        notice_id: i32,
    ) -> Result<Option<RecommendationRecord>, StoreError>;

    async fn delete_recommendation(&self, user_id: i32, notice_id: i32)
        -> Result<(), StoreError>;

    /// Upsert on the (user, notice) composite key. Concurrent writers for
    /// the same pair resolve last-write-wins.
    async fn write_recommendation(
        &self,
        record: &RecommendationRecord,
    ) -> Result<(), StoreError>;

    /// Insert a batch inside one transaction; any failure rolls the whole
    /// batch back. Returns the number of rows actually inserted
    /// (title conflicts count as zero).
    async fn ingest_bulk(&self, inputs: &[NoticeInput]) -> Result<u64, StoreError>;

    /// Listing read-model, newest post first. When `user_id` is given the
    /// user's recommendation data is joined in.
    async fn list_notices(&self, user_id: Option<i32>) -> Result<Vec<NoticeView>, StoreError>;

    /// Notices still awaiting temporal enrichment, oldest first.
    async fn fetch_unenriched(&self, limit: i64) -> Result<Vec<Notice>, StoreError>;
}

// ---------------------------------------------------------------------------
// Postgres implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgNoticeStore {
    pool: PgPool,
}

const NOTICE_COLUMNS: &str =
    "id, source, title, content, link, post_date, start_date, end_date, enriched_by_ai, crawled_at";

impl PgNoticeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the tables the pipeline expects. Idempotent.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id SERIAL PRIMARY KEY,
                password TEXT NOT NULL,
                student_id VARCHAR(20) UNIQUE NOT NULL,
                grade VARCHAR(10),
                department TEXT,
                name VARCHAR(50),
                experience_summary TEXT,
                created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notices (
                id SERIAL PRIMARY KEY,
                source VARCHAR(100) NOT NULL,
                title TEXT NOT NULL UNIQUE,
                content TEXT NOT NULL,
                link TEXT NOT NULL,
                post_date DATE NOT NULL,
                start_date DATE,
                end_date DATE,
                enriched_by_ai BOOLEAN NOT NULL DEFAULT FALSE,
                crawled_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_recommendations (
                user_id INT REFERENCES users(id) ON DELETE CASCADE,
                notice_id INT REFERENCES notices(id) ON DELETE CASCADE,
                score INT NOT NULL,
                reason TEXT NOT NULL,
                profile_fingerprint TEXT NOT NULL,
                computed_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (user_id, notice_id)
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        debug!("schema ready");
        Ok(())
    }
}

fn notice_from_row(row: &PgRow) -> Result<Notice, sqlx::Error> {
    Ok(Notice {
        id: row.try_get("id")?,
        source: row.try_get("source")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        link: row.try_get("link")?,
        post_date: row.try_get("post_date")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        enriched_by_ai: row.try_get("enriched_by_ai")?,
        crawled_at: row.try_get("crawled_at")?,
    })
}

fn view_from_row(row: &PgRow) -> Result<NoticeView, sqlx::Error> {
    Ok(NoticeView {
        id: row.try_get("id")?,
        source: row.try_get("source")?,
        title: row.try_get("title")?,
        link: row.try_get("link")?,
        post_date: row.try_get("post_date")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        score: row.try_get("score")?,
        reason: row.try_get("reason")?,
    })
}

#[async_trait]
impl NoticeStore for PgNoticeStore {
    async fn find_by_title(&self, title: &str) -> Result<Option<Notice>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {NOTICE_COLUMNS} FROM notices WHERE title = $1"
        ))
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(notice_from_row).transpose().map_err(Into::into)
    }

    async fn insert_ignoring_conflict(
        &self,
        input: &NoticeInput,
    ) -> Result<Option<Notice>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO notices (source, title, content, link, post_date)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (title) DO NOTHING
            RETURNING {NOTICE_COLUMNS}
            "#
        ))
        .bind(&input.source)
        .bind(&input.title)
        .bind(&input.content)
        .bind(&input.link)
        .bind(input.post_date)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(notice_from_row).transpose().map_err(Into::into)
    }

    async fn update_enrichment(
        &self,
        id: i32,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE notices SET start_date = $1, end_date = $2, enriched_by_ai = TRUE WHERE id = $3",
        )
        .bind(start_date)
        .bind(end_date)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn read_profile(&self, user_id: i32) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query(
            "SELECT id, grade, department, experience_summary FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Some(UserProfile {
                id: row.try_get("id")?,
                grade: row.try_get("grade")?,
                department: row.try_get("department")?,
                experience_summary: row.try_get("experience_summary")?,
            })),
            None => Ok(None),
        }
    }

    async fn read_content(&self, notice_id: i32) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT content FROM notices WHERE id = $1")
            .bind(notice_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(row.try_get("content")?)),
            None => Ok(None),
        }
    }

    async fn read_recommendation(
        &self,
        user_id: i32,
        notice_id: i32,
    ) -> Result<Option<RecommendationRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, notice_id, score, reason, profile_fingerprint, computed_at
              FROM user_recommendations
             WHERE user_id = $1 AND notice_id = $2
            "#,
        )
        .bind(user_id)
        .bind(notice_id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Some(RecommendationRecord {
                user_id: row.try_get("user_id")?,
                notice_id: row.try_get("notice_id")?,
                score: row.try_get("score")?,
                reason: row.try_get("reason")?,
                profile_fingerprint: row.try_get("profile_fingerprint")?,
                computed_at: row.try_get("computed_at")?,
            })),
            None => Ok(None),
        }
    }

    async fn delete_recommendation(
        &self,
        user_id: i32,
        notice_id: i32,
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM user_recommendations WHERE user_id = $1 AND notice_id = $2")
            .bind(user_id)
            .bind(notice_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn write_recommendation(
        &self,
        record: &RecommendationRecord,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_recommendations
                (user_id, notice_id, score, reason, profile_fingerprint, computed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, notice_id) DO UPDATE
               SET score = EXCLUDED.score,
                   reason = EXCLUDED.reason,
                   profile_fingerprint = EXCLUDED.profile_fingerprint,
                   computed_at = EXCLUDED.computed_at
            "#,
        )
        .bind(record.user_id)
        .bind(record.notice_id)
        .bind(record.score)
        .bind(&record.reason)
        .bind(&record.profile_fingerprint)
        .bind(record.computed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn ingest_bulk(&self, inputs: &[NoticeInput]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;
        for input in inputs {
            let result = sqlx::query(
                r#"
                INSERT INTO notices (source, title, content, link, post_date)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (title) DO NOTHING
                "#,
            )
            .bind(&input.source)
            .bind(&input.title)
            .bind(&input.content)
            .bind(&input.link)
            .bind(input.post_date)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn list_notices(&self, user_id: Option<i32>) -> Result<Vec<NoticeView>, StoreError> {
        let rows = match user_id {
            Some(user_id) => {
                sqlx::query(
                    r#"
                    SELECT n.id, n.source, n.title, n.link, n.post_date,
                           n.start_date, n.end_date, r.score, r.reason
                      FROM notices n
                      LEFT JOIN user_recommendations r
                        ON r.notice_id = n.id AND r.user_id = $1
                     ORDER BY n.post_date DESC, n.id DESC
                    "#,
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, source, title, link, post_date, start_date, end_date,
                           NULL::INT AS score, NULL::TEXT AS reason
                      FROM notices
                     ORDER BY post_date DESC, id DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.iter().map(view_from_row).collect::<Result<_, _>>().map_err(Into::into)
    }

    async fn fetch_unenriched(&self, limit: i64) -> Result<Vec<Notice>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTICE_COLUMNS} FROM notices WHERE enriched_by_ai = FALSE ORDER BY id LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(notice_from_row).collect::<Result<_, _>>().map_err(Into::into)
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// Store kept entirely in process memory. Backs the orchestrator, extractor
/// and cache tests, and local demos that have no Postgres at hand.
#[derive(Default)]
pub struct MemoryNoticeStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    next_id: i32,
    notices: Vec<Notice>,
    profiles: HashMap<i32, UserProfile>,
    recommendations: HashMap<(i32, i32), RecommendationRecord>,
}

impl MemoryNoticeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_profile(&self, profile: UserProfile) {
        let mut inner = self.inner.lock().await;
        inner.profiles.insert(profile.id, profile);
    }

    pub async fn notice_count(&self) -> usize {
        self.inner.lock().await.notices.len()
    }

    pub async fn get_notice(&self, id: i32) -> Option<Notice> {
        let inner = self.inner.lock().await;
        inner.notices.iter().find(|n| n.id == id).cloned()
    }
}

#[async_trait]
impl NoticeStore for MemoryNoticeStore {
    async fn find_by_title(&self, title: &str) -> Result<Option<Notice>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.notices.iter().find(|n| n.title == title).cloned())
    }

    async fn insert_ignoring_conflict(
        &self,
        input: &NoticeInput,
    ) -> Result<Option<Notice>, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.notices.iter().any(|n| n.title == input.title) {
            return Ok(None);
        }
        inner.next_id += 1;
        let notice = Notice {
            id: inner.next_id,
            source: input.source.clone(),
            title: input.title.clone(),
            content: input.content.clone(),
            link: input.link.clone(),
            post_date: input.post_date,
            start_date: None,
            end_date: None,
            enriched_by_ai: false,
            crawled_at: Utc::now(),
        };
        inner.notices.push(notice.clone());
        Ok(Some(notice))
    }

    async fn update_enrichment(
        &self,
        id: i32,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(notice) = inner.notices.iter_mut().find(|n| n.id == id) {
            notice.start_date = start_date;
            notice.end_date = end_date;
            notice.enriched_by_ai = true;
        }
        Ok(())
    }

    async fn read_profile(&self, user_id: i32) -> Result<Option<UserProfile>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.profiles.get(&user_id).cloned())
    }

    async fn read_content(&self, notice_id: i32) -> Result<Option<String>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .notices
            .iter()
            .find(|n| n.id == notice_id)
            .map(|n| n.content.clone()))
    }

    async fn read_recommendation(
        &self,
        user_id: i32,
        notice_id: i32,
    ) -> Result<Option<RecommendationRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.recommendations.get(&(user_id, notice_id)).cloned())
    }

    async fn delete_recommendation(
        &self,
        user_id: i32,
        notice_id: i32,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.recommendations.remove(&(user_id, notice_id));
        Ok(())
    }

    async fn write_recommendation(
        &self,
        record: &RecommendationRecord,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner
            .recommendations
            .insert((record.user_id, record.notice_id), record.clone());
        Ok(())
    }

    async fn ingest_bulk(&self, inputs: &[NoticeInput]) -> Result<u64, StoreError> {
        let mut inserted = 0u64;
        for input in inputs {
            if self.insert_ignoring_conflict(input).await?.is_some() {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn list_notices(&self, user_id: Option<i32>) -> Result<Vec<NoticeView>, StoreError> {
        let inner = self.inner.lock().await;
        let mut views: Vec<NoticeView> = inner
            .notices
            .iter()
            .map(|n| {
                let rec = user_id.and_then(|u| inner.recommendations.get(&(u, n.id)));
                NoticeView {
                    id: n.id,
                    source: n.source.clone(),
                    title: n.title.clone(),
                    link: n.link.clone(),
                    post_date: n.post_date,
                    start_date: n.start_date,
                    end_date: n.end_date,
                    score: rec.map(|r| r.score),
                    reason: rec.map(|r| r.reason.clone()),
                }
            })
            .collect();
        views.sort_by(|a, b| b.post_date.cmp(&a.post_date).then(b.id.cmp(&a.id)));
        Ok(views)
    }

    async fn fetch_unenriched(&self, limit: i64) -> Result<Vec<Notice>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .notices
            .iter()
            .filter(|n| !n.enriched_by_ai)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Page fetching
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: None,
        }
    }
}

/// Page loads done by the crawl orchestrator go through this seam; tests
/// substitute a scripted fetcher.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_text(&self, source_id: &str, url: &str) -> Result<String, FetchError>;
}

/// Reqwest-backed fetcher. Navigation is bounded by the configured timeout
/// and never retried; a failed load is the caller's per-location or
/// per-item failure to isolate.
#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder.build().context("building reqwest client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_text(&self, source_id: &str, url: &str) -> Result<String, FetchError> {
        debug!(source_id, url, "fetching page");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: resp.url().to_string(),
            });
        }
        Ok(resp.text().await?)
    }
}

// ---------------------------------------------------------------------------
// Crawl pacing
// ---------------------------------------------------------------------------

/// Pause inserted between detail fetches to bound load on the source
/// servers. Injected so the orchestrator stays testable without timers.
#[async_trait]
pub trait CrawlPacer: Send + Sync {
    async fn pause(&self);
}

#[derive(Debug, Clone, Copy)]
pub struct FixedDelayPacer {
    delay: Duration,
}

impl FixedDelayPacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl CrawlPacer for FixedDelayPacer {
    async fn pause(&self) {
        tokio::time::sleep(self.delay).await;
    }
}

/// Timer-free pacer for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPacer;

#[async_trait]
impl CrawlPacer for NoopPacer {
    async fn pause(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str) -> NoticeInput {
        NoticeInput {
            source: "cs-department".into(),
            title: title.into(),
            content: format!("{title} body"),
            link: format!("https://example.ac.kr/{title}"),
            post_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
        }
    }

    #[tokio::test]
    async fn duplicate_titles_collapse_to_one_row() {
        let store = MemoryNoticeStore::new();
        assert!(store.insert_ignoring_conflict(&input("A")).await.unwrap().is_some());
        assert!(store.insert_ignoring_conflict(&input("B")).await.unwrap().is_some());
        assert!(store.insert_ignoring_conflict(&input("A")).await.unwrap().is_none());
        assert_eq!(store.notice_count().await, 2);
    }

    #[tokio::test]
    async fn bulk_ingest_counts_only_new_rows() {
        let store = MemoryNoticeStore::new();
        let batch = vec![input("A"), input("B"), input("A")];
        assert_eq!(store.ingest_bulk(&batch).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn enrichment_update_sets_flag_and_window() {
        let store = MemoryNoticeStore::new();
        let notice = store
            .insert_ignoring_conflict(&input("A"))
            .await
            .unwrap()
            .unwrap();
        let start = NaiveDate::from_ymd_opt(2026, 3, 10);
        store.update_enrichment(notice.id, start, None).await.unwrap();
        let stored = store.get_notice(notice.id).await.unwrap();
        assert!(stored.enriched_by_ai);
        assert_eq!(stored.start_date, start);
        assert_eq!(stored.end_date, None);
    }

    #[tokio::test]
    async fn recommendation_write_is_an_upsert() {
        let store = MemoryNoticeStore::new();
        let mut record = RecommendationRecord {
            user_id: 1,
            notice_id: 7,
            score: 40,
            reason: "first".into(),
            profile_fingerprint: "f1".into(),
            computed_at: Utc::now(),
        };
        store.write_recommendation(&record).await.unwrap();
        record.score = 90;
        record.reason = "second".into();
        store.write_recommendation(&record).await.unwrap();
        let stored = store.read_recommendation(1, 7).await.unwrap().unwrap();
        assert_eq!(stored.score, 90);
        assert_eq!(stored.reason, "second");
    }

    #[tokio::test]
    async fn listing_joins_recommendations_for_the_given_user_only() {
        let store = MemoryNoticeStore::new();
        let n = store
            .insert_ignoring_conflict(&input("A"))
            .await
            .unwrap()
            .unwrap();
        store
            .write_recommendation(&RecommendationRecord {
                user_id: 1,
                notice_id: n.id,
                score: 77,
                reason: "fits".into(),
                profile_fingerprint: "f1".into(),
                computed_at: Utc::now(),
            })
            .await
            .unwrap();

        let for_user = store.list_notices(Some(1)).await.unwrap();
        assert_eq!(for_user[0].score, Some(77));
        let for_other = store.list_notices(Some(2)).await.unwrap();
        assert_eq!(for_other[0].score, None);
        let anonymous = store.list_notices(None).await.unwrap();
        assert_eq!(anonymous[0].score, None);
    }

    #[tokio::test]
    async fn listing_orders_newest_post_first() {
        let store = MemoryNoticeStore::new();
        let mut old = input("old");
        old.post_date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        store.insert_ignoring_conflict(&old).await.unwrap();
        store.insert_ignoring_conflict(&input("new")).await.unwrap();
        let views = store.list_notices(None).await.unwrap();
        assert_eq!(views[0].title, "new");
        assert_eq!(views[1].title, "old");
    }

    #[tokio::test]
    async fn unenriched_fetch_respects_limit_and_flag() {
        let store = MemoryNoticeStore::new();
        for title in ["A", "B", "C"] {
            store.insert_ignoring_conflict(&input(title)).await.unwrap();
        }
        store.update_enrichment(1, None, None).await.unwrap();
        let pending = store.fetch_unenriched(10).await.unwrap();
        assert_eq!(pending.len(), 2);
        let limited = store.fetch_unenriched(1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }
}
