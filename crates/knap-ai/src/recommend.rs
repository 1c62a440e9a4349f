//! Per-(user, notice) recommendation scoring with a fingerprinted cache.

use std::sync::Arc;

use chrono::Utc;
use knap_core::{RecommendationRecord, UserProfile};
use knap_storage::{NoticeStore, StoreError};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use crate::client::{AiError, GenerativeClient};
use crate::json::extract_json_object;

/// Stable hash over the mutable profile fields. Any change to any field
/// changes the fingerprint; equal field values always reproduce it. This
/// turns "is the cached score still valid" into a pure equality check.
pub fn profile_fingerprint(profile: &UserProfile) -> String {
    let mut hasher = Sha256::new();
    hasher.update(profile.grade.as_deref().unwrap_or_default().as_bytes());
    hasher.update([0x1f]);
    hasher.update(profile.department.as_deref().unwrap_or_default().as_bytes());
    hasher.update([0x1f]);
    hasher.update(
        profile
            .experience_summary
            .as_deref()
            .unwrap_or_default()
            .as_bytes(),
    );
    hex::encode(hasher.finalize())
}

/// Whether a result was served from storage or freshly computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Cache,
    Fresh,
}

#[derive(Debug, Clone, Serialize)]
pub struct Scored {
    pub score: i32,
    pub reason: String,
    pub origin: Origin,
}

/// Malformed or out-of-range model output, or an upstream call error.
/// Nothing is ever written to the store on this path.
#[derive(Debug, Error)]
pub enum ScoringFailure {
    #[error("upstream call failed: {0}")]
    Upstream(#[from] AiError),

    #[error("no JSON object in scorer response")]
    NoJson,

    #[error("malformed scorer payload: {0}")]
    Malformed(String),

    #[error("score {0} outside 0..=100")]
    ScoreOutOfRange(i64),

    #[error("empty reason")]
    EmptyReason,
}

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("user {0} not found")]
    UserNotFound(i32),

    #[error("notice {0} not found")]
    NoticeNotFound(i32),

    #[error("scoring failed: {0}")]
    Scoring(#[from] ScoringFailure),

    #[error(transparent)]
    Store(#[from] StoreError),
}

struct ScoreVerdict {
    score: i32,
    reason: String,
}

/// Returns a cached score while the stored fingerprint still matches the
/// profile; otherwise discards the stale record, scores afresh, and
/// commits the validated result together with the fingerprint that
/// produced it. A given (profile state, notice) pair reaches the model at
/// most once.
pub struct RecommendationCache {
    store: Arc<dyn NoticeStore>,
    client: Arc<dyn GenerativeClient>,
}

impl RecommendationCache {
    pub fn new(store: Arc<dyn NoticeStore>, client: Arc<dyn GenerativeClient>) -> Self {
        Self { store, client }
    }

    pub async fn get_or_compute(
        &self,
        user_id: i32,
        notice_id: i32,
    ) -> Result<Scored, RecommendError> {
        let profile = self
            .store
            .read_profile(user_id)
            .await?
            .ok_or(RecommendError::UserNotFound(user_id))?;
        let fingerprint = profile_fingerprint(&profile);

        if let Some(existing) = self.store.read_recommendation(user_id, notice_id).await? {
            if existing.profile_fingerprint == fingerprint {
                debug!(user_id, notice_id, "cache hit");
                return Ok(Scored {
                    score: existing.score,
                    reason: existing.reason,
                    origin: Origin::Cache,
                });
            }
            // The profile changed since this was computed; the record is
            // no longer valid evidence.
            debug!(user_id, notice_id, "fingerprint mismatch, invalidating");
            self.store.delete_recommendation(user_id, notice_id).await?;
        }

        let content = self
            .store
            .read_content(notice_id)
            .await?
            .ok_or(RecommendError::NoticeNotFound(notice_id))?;

        let verdict = self.score(&profile, &content).await?;
        let record = RecommendationRecord {
            user_id,
            notice_id,
            score: verdict.score,
            reason: verdict.reason,
            profile_fingerprint: fingerprint,
            computed_at: Utc::now(),
        };
        self.store.write_recommendation(&record).await?;
        info!(user_id, notice_id, score = record.score, "scored");

        Ok(Scored {
            score: record.score,
            reason: record.reason,
            origin: Origin::Fresh,
        })
    }

    fn prompt(profile: &UserProfile, content: &str) -> String {
        let grade = profile.grade.as_deref().unwrap_or("unknown");
        let department = profile.department.as_deref().unwrap_or("unknown");
        let experience = profile.experience_summary.as_deref().unwrap_or("none");
        format!(
            "You are a career analyst for university students. Compare the \
             [student profile] against the [notice] and judge how much of a \
             real growth opportunity this activity is for this student.\n\n\
             [Student profile]: year {grade}, department {department}, \
             experience: {experience}\n\
             [Notice]: {content}\n\n\
             Scoring rubric:\n\
             1. Career fit (40 points): how closely the notice topic matches the \
             student's direction.\n\
             2. Growth potential (30 points): worth attempting at the student's \
             current level; too easy or too hard loses points.\n\
             3. Scarcity and reward (30 points): scholarships, hiring pipelines, \
             research positions and similar direct career value.\n\n\
             Respond with only this JSON object, no markdown fences:\n\
             {{\"score\": <integer 0-100>, \"reason\": <one or two sentences tying \
             the score to the profile>}}"
        )
    }

    async fn score(
        &self,
        profile: &UserProfile,
        content: &str,
    ) -> Result<ScoreVerdict, ScoringFailure> {
        let raw = self.client.generate(&Self::prompt(profile, content)).await?;
        let json = extract_json_object(&raw).ok_or(ScoringFailure::NoJson)?;
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| ScoringFailure::Malformed(e.to_string()))?;

        let score = value
            .get("score")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| ScoringFailure::Malformed("score must be an integer".into()))?;
        if !(0..=100).contains(&score) {
            return Err(ScoringFailure::ScoreOutOfRange(score));
        }

        let reason = value
            .get("reason")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .unwrap_or_default();
        if reason.is_empty() {
            return Err(ScoringFailure::EmptyReason);
        }

        Ok(ScoreVerdict {
            score: score as i32,
            reason: reason.to_string(),
        })
    }
}
