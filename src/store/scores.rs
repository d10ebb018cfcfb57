// src/store/scores.rs

use sqlx::SqlitePool;

use crate::error::AppError;

/// Durably records one score event and increments the owning user's
/// cumulative score.
///
/// Both writes happen inside a single transaction: either the score row
/// exists and the balance moved, or neither did. Any mid-transaction
/// failure triggers an explicit rollback before the error surfaces; the
/// connection goes back to the pool on every exit path.
///
/// Returns the id of the newly created score row.
pub async fn record_score(
    pool: &SqlitePool,
    user_id: i64,
    quiz_mode: &str,
    subtopic: &str,
    score: i64,
) -> Result<i64, AppError> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        "INSERT INTO scores (user_id, quiz_mode, subtopic, score) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(quiz_mode)
    .bind(subtopic)
    .bind(score)
    .execute(&mut *tx)
    .await;

    let score_id = match inserted {
        Ok(result) => result.last_insert_rowid(),
        Err(e) => {
            tracing::error!("Failed to insert score event: {:?}", e);
            rollback(tx).await;
            return Err(AppError::InternalServerError(e.to_string()));
        }
    };

    let updated = sqlx::query("UPDATE users SET score = score + ? WHERE id = ?")
        .bind(score)
        .bind(user_id)
        .execute(&mut *tx)
        .await;

    match updated {
        Ok(result) if result.rows_affected() == 1 => {}
        Ok(_) => {
            rollback(tx).await;
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Err(e) => {
            tracing::error!("Failed to update cumulative score: {:?}", e);
            rollback(tx).await;
            return Err(AppError::InternalServerError(e.to_string()));
        }
    }

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to commit score transaction: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(score_id)
}

async fn rollback(tx: sqlx::Transaction<'_, sqlx::Sqlite>) {
    if let Err(e) = tx.rollback().await {
        tracing::error!("Rollback failed: {:?}", e);
    }
}
