// src/models/score.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'scores' table in the database.
/// One row per submitted quiz session. Append-only.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ScoreEvent {
    pub id: i64,
    pub user_id: i64,
    pub quiz_mode: String,
    pub subtopic: String,
    pub score: i64,
    pub created_at: Option<chrono::NaiveDateTime>,
}

/// A row of the public ranking: users ordered by cumulative score.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct RankEntry {
    pub id: i64,
    pub username: String,
    pub score: i64,
}

/// One entry of the caller's own score history.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct ScoreHistoryEntry {
    pub quiz_mode: String,
    pub subtopic: String,
    pub score: i64,
    pub created_at: Option<chrono::NaiveDateTime>,
}

/// DTO for submitting a quiz score.
///
/// All fields are optional at the serde level so that missing data can
/// be reported as incomplete-data rather than a deserialization error.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitScoreRequest {
    pub user_id: Option<i64>,
    pub quiz_mode: Option<String>,
    pub subtopic: Option<String>,
    pub score: Option<i64>,
}
