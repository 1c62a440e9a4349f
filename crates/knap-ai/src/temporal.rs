//! AI-assisted inference of a notice's validity window.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use knap_core::Notice;
use knap_storage::{NoticeStore, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::{truncate_chars, AiError, GenerativeClient};
use crate::json::extract_json_object;

/// Prompt-cost bound on the notice excerpt.
const EXCERPT_CHAR_BUDGET: usize = 2_000;

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("no JSON object in model response")]
    NoJson,

    #[error("malformed window payload: {0}")]
    Malformed(String),

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Deserialize)]
struct WindowPayload {
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
}

/// Translate one payload field: the literal `"null"` marker (or a JSON
/// null) becomes an absent value; anything else must be a calendar date.
fn parse_window_field(field: Option<String>) -> Result<Option<NaiveDate>, EnrichmentError> {
    let Some(raw) = field else { return Ok(None) };
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| EnrichmentError::Malformed(format!("not a calendar date: {raw}")))
}

/// Infers start/end dates from notice content and commits only validated
/// values. Safe to repeat: the `enriched_by_ai` guard is advisory and a
/// failed attempt leaves the notice eligible for the next pass.
pub struct TemporalExtractor {
    client: Arc<dyn GenerativeClient>,
    store: Arc<dyn NoticeStore>,
}

impl TemporalExtractor {
    pub fn new(client: Arc<dyn GenerativeClient>, store: Arc<dyn NoticeStore>) -> Self {
        Self { client, store }
    }

    fn prompt(notice: &Notice) -> String {
        let excerpt = truncate_chars(&notice.content, EXCERPT_CHAR_BUDGET);
        format!(
            "The following is the body of a university notice. Find the activity's \
             application start date and final deadline.\n\
             If no year is stated, assume the notice's own posting year ({post_year}).\n\
             Respond with exactly this JSON shape and nothing else:\n\
             {{\"start_date\": \"YYYY-MM-DD\", \"end_date\": \"YYYY-MM-DD\"}}\n\
             Write \"null\" for any date that cannot be determined.\n\n\
             [Notice body]:\n{excerpt}",
            post_year = notice.post_date.year(),
        )
    }

    pub async fn enrich(&self, notice: &Notice) -> Result<(), EnrichmentError> {
        if notice.enriched_by_ai {
            debug!(notice_id = notice.id, "already enriched, skipping");
            return Ok(());
        }

        let raw = self.client.generate(&Self::prompt(notice)).await?;
        let json = extract_json_object(&raw).ok_or(EnrichmentError::NoJson)?;
        let payload: WindowPayload =
            serde_json::from_str(json).map_err(|e| EnrichmentError::Malformed(e.to_string()))?;

        let start_date = parse_window_field(payload.start_date)?;
        let end_date = parse_window_field(payload.end_date)?;

        self.store
            .update_enrichment(notice.id, start_date, end_date)
            .await?;
        info!(
            notice_id = notice.id,
            ?start_date,
            ?end_date,
            "temporal enrichment stored"
        );
        Ok(())
    }

    /// Batch pass over notices still awaiting enrichment. Per-notice
    /// failures are logged and counted, never abort the batch, and leave
    /// the notice eligible for the next pass.
    pub async fn enrich_pending(&self, limit: i64) -> Result<EnrichReport, StoreError> {
        let pending = self.store.fetch_unenriched(limit).await?;
        let mut report = EnrichReport {
            attempted: pending.len(),
            ..EnrichReport::default()
        };
        if pending.is_empty() {
            info!("no notices awaiting enrichment");
            return Ok(report);
        }
        for notice in pending {
            match self.enrich(&notice).await {
                Ok(()) => report.enriched += 1,
                Err(err) => {
                    warn!(notice_id = notice.id, error = %err, "enrichment failed");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct EnrichReport {
    pub attempted: usize,
    pub enriched: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedClient;
    use knap_core::NoticeInput;
    use knap_storage::MemoryNoticeStore;

    async fn seeded_store() -> (Arc<MemoryNoticeStore>, Notice) {
        let store = Arc::new(MemoryNoticeStore::new());
        let notice = store
            .insert_ignoring_conflict(&NoticeInput {
                source: "cs-department".into(),
                title: "동계 현장실습 모집".into(),
                content: "신청 기간: 3월 2일 ~ 3월 20일".into(),
                link: "https://cse.knu.ac.kr/bbs/board.php?wr_id=90".into(),
                post_date: NaiveDate::from_ymd_opt(2026, 2, 27).unwrap(),
            })
            .await
            .unwrap()
            .unwrap();
        (store, notice)
    }

    #[tokio::test]
    async fn null_markers_become_absent_dates_and_flag_is_set() {
        let (store, notice) = seeded_store().await;
        let client = Arc::new(ScriptedClient::replying(
            r#"{"start_date": "null", "end_date": "null"}"#,
        ));
        let extractor = TemporalExtractor::new(client, store.clone());

        extractor.enrich(&notice).await.unwrap();

        let stored = store.get_notice(notice.id).await.unwrap();
        assert!(stored.enriched_by_ai);
        assert_eq!(stored.start_date, None);
        assert_eq!(stored.end_date, None);
    }

    #[tokio::test]
    async fn well_formed_dates_are_stored() {
        let (store, notice) = seeded_store().await;
        let client = Arc::new(ScriptedClient::replying(
            r#"{"start_date": "2026-03-02", "end_date": "2026-03-20"}"#,
        ));
        TemporalExtractor::new(client, store.clone())
            .enrich(&notice)
            .await
            .unwrap();

        let stored = store.get_notice(notice.id).await.unwrap();
        assert_eq!(stored.start_date, NaiveDate::from_ymd_opt(2026, 3, 2));
        assert_eq!(stored.end_date, NaiveDate::from_ymd_opt(2026, 3, 20));
        assert!(stored.enriched_by_ai);
    }

    #[tokio::test]
    async fn prose_wrapped_responses_still_parse() {
        let (store, notice) = seeded_store().await;
        let client = Arc::new(ScriptedClient::replying(
            "The window is: {\"start_date\": \"2026-03-02\", \"end_date\": \"null\"} — good luck!",
        ));
        TemporalExtractor::new(client, store.clone())
            .enrich(&notice)
            .await
            .unwrap();

        let stored = store.get_notice(notice.id).await.unwrap();
        assert_eq!(stored.start_date, NaiveDate::from_ymd_opt(2026, 3, 2));
        assert_eq!(stored.end_date, None);
    }

    #[tokio::test]
    async fn missing_json_leaves_the_notice_unenriched() {
        let (store, notice) = seeded_store().await;
        let client = Arc::new(ScriptedClient::replying("no dates to be found here"));
        let err = TemporalExtractor::new(client, store.clone())
            .enrich(&notice)
            .await
            .unwrap_err();

        assert!(matches!(err, EnrichmentError::NoJson));
        assert!(!store.get_notice(notice.id).await.unwrap().enriched_by_ai);
    }

    #[tokio::test]
    async fn non_date_values_fail_enrichment() {
        let (store, notice) = seeded_store().await;
        let client = Arc::new(ScriptedClient::replying(
            r#"{"start_date": "sometime in March", "end_date": "null"}"#,
        ));
        let err = TemporalExtractor::new(client, store.clone())
            .enrich(&notice)
            .await
            .unwrap_err();

        assert!(matches!(err, EnrichmentError::Malformed(_)));
        assert!(!store.get_notice(notice.id).await.unwrap().enriched_by_ai);
    }

    #[tokio::test]
    async fn enriched_guard_skips_the_model_call() {
        let (store, notice) = seeded_store().await;
        store.update_enrichment(notice.id, None, None).await.unwrap();
        let enriched = store.get_notice(notice.id).await.unwrap();

        let client = Arc::new(ScriptedClient::new(vec![]));
        TemporalExtractor::new(client.clone(), store)
            .enrich(&enriched)
            .await
            .unwrap();
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn batch_pass_isolates_per_notice_failures() {
        let (store, _first) = seeded_store().await;
        store
            .insert_ignoring_conflict(&NoticeInput {
                source: "ai-college".into(),
                title: "해커톤 참가자 모집".into(),
                content: "일정 추후 공지".into(),
                link: "https://home.knu.ac.kr/HOME/aic/view.htm?no=3".into(),
                post_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            })
            .await
            .unwrap();

        let client = Arc::new(ScriptedClient::new(vec![
            Ok(r#"{"start_date": "2026-03-02", "end_date": "null"}"#.to_string()),
            Ok("the model rambled with no object".to_string()),
        ]));
        let extractor = TemporalExtractor::new(client, store.clone());

        let report = extractor.enrich_pending(10).await.unwrap();
        assert_eq!(report.attempted, 2);
        assert_eq!(report.enriched, 1);
        assert_eq!(report.failed, 1);

        // The failed notice stays eligible for the next pass.
        assert_eq!(store.fetch_unenriched(10).await.unwrap().len(), 1);
    }

    #[test]
    fn window_fields_translate_null_markers() {
        assert_eq!(parse_window_field(None).unwrap(), None);
        assert_eq!(parse_window_field(Some("null".into())).unwrap(), None);
        assert_eq!(parse_window_field(Some(" NULL ".into())).unwrap(), None);
        assert_eq!(
            parse_window_field(Some("2026-01-15".into())).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 15)
        );
        assert!(parse_window_field(Some("15 Jan".into())).is_err());
    }
}
