// src/handlers/quiz.rs

use axum::{Json, extract::{Query, State}, response::IntoResponse};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{error::AppError, models::question::Mode, store::questions};

/// Default number of questions drawn for the "random" grouping.
const DEFAULT_RANDOM_LIMIT: u32 = 30;
const MAX_RANDOM_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct QuestionQuery {
    pub mode: Option<String>,
    pub subtopic: Option<String>,
    pub limit: Option<u32>,
}

fn parse_mode(raw: Option<&str>) -> Result<Mode, AppError> {
    let raw = raw.ok_or_else(|| {
        AppError::BadRequest("mode is required (easy, normal, hard)".to_string())
    })?;
    raw.parse().map_err(|e: crate::models::question::InvalidMode| {
        AppError::BadRequest(e.to_string())
    })
}

/// Retrieves questions filtered by mode and optionally subtopic.
///
/// An empty match is a valid 200 response with an empty array, so that
/// clients can tell "no questions" apart from a transport failure.
pub async fn get_questions(
    State(pool): State<SqlitePool>,
    Query(params): Query<QuestionQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mode = parse_mode(params.mode.as_deref())?;

    let result = questions::list_by_mode_and_subtopic(&pool, mode, params.subtopic.as_deref())
        .await?;

    Ok(Json(result))
}

/// Retrieves up to `limit` questions selected at random (without
/// replacement) from the mode's eligible set. Returns fewer when the
/// bank holds fewer eligible rows.
pub async fn get_random_questions(
    State(pool): State<SqlitePool>,
    Query(params): Query<QuestionQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mode = parse_mode(params.mode.as_deref())?;
    let limit = params.limit.unwrap_or(DEFAULT_RANDOM_LIMIT).min(MAX_RANDOM_LIMIT);

    let result = questions::random_sample(&pool, mode, params.subtopic.as_deref(), limit).await?;

    Ok(Json(result))
}
