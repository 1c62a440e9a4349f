//! Core domain model for the KNU notice aggregation pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const CRATE_NAME: &str = "knap-core";

/// Stored in place of a notice body when detail extraction fails, so the
/// notice shell is still persisted and visible.
pub const CONTENT_UNAVAILABLE: &str = "content unavailable";

/// A persisted notice. `title` is the natural key: two crawls producing the
/// same title never produce two rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub id: i32,
    pub source: String,
    pub title: String,
    pub content: String,
    pub link: String,
    pub post_date: NaiveDate,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub enriched_by_ai: bool,
    pub crawled_at: DateTime<Utc>,
}

/// Insert payload for a notice; the store assigns `id` and the enrichment
/// fields start out empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoticeInput {
    pub source: String,
    pub title: String,
    pub content: String,
    pub link: String,
    pub post_date: NaiveDate,
}

/// Ephemeral listing-page entry produced by an adapter. Lives only between
/// one listing evaluation and the detail fetch that turns it into a
/// [`NoticeInput`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateItem {
    pub source: String,
    pub title: String,
    pub link: String,
    pub raw_date_text: String,
}

/// The profile fields that feed recommendation scoring. Owned by the
/// user-management side; the pipeline only ever reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i32,
    pub grade: Option<String>,
    pub department: Option<String>,
    pub experience_summary: Option<String>,
}

/// Cached AI score for one (user, notice) pair. Valid evidence only while
/// `profile_fingerprint` still matches the owning profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub user_id: i32,
    pub notice_id: i32,
    pub score: i32,
    pub reason: String,
    pub profile_fingerprint: String,
    pub computed_at: DateTime<Utc>,
}

/// Read-model row for the notice listing, with recommendation data joined
/// in when the listing is scoped to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoticeView {
    pub id: i32,
    pub source: String,
    pub title: String,
    pub link: String,
    pub post_date: NaiveDate,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub score: Option<i32>,
    pub reason: Option<String>,
}

/// Normalize a listing-page date string into a calendar date.
///
/// The only normalization performed is mapping the `.` separator some
/// boards use (`2025.03.12`, `2025. 03. 12`) to `-`; anything that still
/// fails a strict `%Y-%m-%d` parse is rejected.
pub fn normalize_post_date(raw: &str) -> Option<NaiveDate> {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| if c == '.' { '-' } else { c })
        .filter(|c| !c.is_whitespace())
        .collect();
    let cleaned = cleaned.trim_end_matches('-');
    NaiveDate::parse_from_str(cleaned, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_dotted_dates() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        assert_eq!(normalize_post_date("2025.03.12"), Some(expected));
        assert_eq!(normalize_post_date("2025. 03. 12"), Some(expected));
        assert_eq!(normalize_post_date("2025.03.12."), Some(expected));
    }

    #[test]
    fn passes_through_iso_dates() {
        assert_eq!(
            normalize_post_date(" 2024-11-02 "),
            NaiveDate::from_ymd_opt(2024, 11, 2)
        );
    }

    #[test]
    fn rejects_non_dates() {
        assert_eq!(normalize_post_date("공지"), None);
        assert_eq!(normalize_post_date("2025-13-99"), None);
        assert_eq!(normalize_post_date(""), None);
    }
}
