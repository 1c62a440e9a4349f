//! Generative-model integration: the client seam, temporal enrichment and
//! the profile-fingerprinted recommendation cache.
//!
//! Model output is free text and is never trusted implicitly — everything
//! that reaches the store first passes a structural validation gate.

pub mod client;
pub mod json;
pub mod recommend;
pub mod temporal;

pub use client::{truncate_chars, AiConfig, AiError, GeminiClient, GenerativeClient};
pub use json::extract_json_object;
pub use recommend::{
    profile_fingerprint, Origin, RecommendError, RecommendationCache, Scored, ScoringFailure,
};
pub use temporal::{EnrichReport, EnrichmentError, TemporalExtractor};

pub const CRATE_NAME: &str = "knap-ai";
