// src/handlers/scores.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        question::Mode,
        score::{RankEntry, ScoreHistoryEntry, SubmitScoreRequest},
    },
    store::scores,
    utils::jwt::Claims,
};

/// Records one score event for the authenticated user.
///
/// * Rejects incomplete payloads with 400.
/// * Rejects attempts to credit another user's account with 403.
/// * Inserts the score row and bumps the user's cumulative total in a
///   single transaction.
pub async fn submit_score(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitScoreRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (user_id, quiz_mode, subtopic, score) =
        match (req.user_id, req.quiz_mode, req.subtopic, req.score) {
            (Some(user_id), Some(mode), Some(subtopic), Some(score)) => {
                (user_id, mode, subtopic, score)
            }
            _ => {
                return Err(AppError::BadRequest(
                    "user_id, quiz_mode, subtopic and score are all required".to_string(),
                ));
            }
        };

    quiz_mode
        .parse::<Mode>()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if score < 0 {
        return Err(AppError::BadRequest("score must be non-negative".to_string()));
    }

    // A user may only credit their own account.
    let caller_id = claims.sub.parse::<i64>().unwrap_or(0);
    if caller_id != user_id {
        return Err(AppError::Forbidden(
            "Cannot record a score for another user".to_string(),
        ));
    }

    let score_id = scores::record_score(&pool, user_id, &quiz_mode, &subtopic, score).await?;

    tracing::info!(user_id, quiz_mode = %quiz_mode, subtopic = %subtopic, score, "score recorded");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": score_id })),
    ))
}

/// Lists the authenticated user's score history, newest first.
pub async fn list_my_scores(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub.parse::<i64>().unwrap_or(0);

    let history: Vec<ScoreHistoryEntry> = sqlx::query_as(
        "SELECT quiz_mode, subtopic, score, created_at \
         FROM scores WHERE user_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch score history: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(history))
}

/// Retrieves the top 50 users by cumulative score.
pub async fn get_rank(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let rank: Vec<RankEntry> = sqlx::query_as(
        "SELECT id, username, score FROM users ORDER BY score DESC, id ASC LIMIT 50",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch rankings: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(rank))
}
