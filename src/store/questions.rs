// src/store/questions.rs

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    error::AppError,
    models::question::{Mode, Question, RANDOM_SUBTOPIC, normalize_options},
};

/// Raw row shape for the 'questions' table. Options arrive as the TEXT
/// column and are normalized into `Vec<String>` exactly once, here.
#[derive(sqlx::FromRow)]
struct QuestionRow {
    id: i64,
    question_text: String,
    options: String,
    difficulty: String,
    subtopic: String,
    correct_answer: i64,
    explanation: Option<String>,
    image_url: Option<String>,
    created_at: Option<chrono::NaiveDateTime>,
}

impl QuestionRow {
    fn into_question(self) -> Result<Question, AppError> {
        let difficulty: Mode = self.difficulty.parse().map_err(|e| {
            AppError::InternalServerError(format!("question {} has {}", self.id, e))
        })?;

        let raw: serde_json::Value = serde_json::from_str(&self.options).map_err(|e| {
            AppError::InternalServerError(format!("question {} options: {}", self.id, e))
        })?;
        let options = normalize_options(&raw).map_err(|e| {
            AppError::InternalServerError(format!("question {} options: {}", self.id, e))
        })?;

        Ok(Question {
            id: self.id,
            question_text: self.question_text,
            options,
            difficulty,
            subtopic: self.subtopic,
            correct_answer: self.correct_answer,
            explanation: self.explanation,
            image_url: self.image_url,
            created_at: self.created_at,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, question_text, options, difficulty, subtopic, \
     correct_answer, explanation, image_url, created_at FROM questions";

/// Appends the mode/subtopic filter. A concrete subtopic restricts to
/// that topic; the "random" sentinel (or no subtopic) makes the whole
/// fixed subtopic group of the mode eligible.
fn push_filter<'a>(
    builder: &mut QueryBuilder<'a, Sqlite>,
    mode: Mode,
    subtopic: Option<&'a str>,
) {
    builder.push(" WHERE difficulty = ");
    builder.push_bind(mode.as_str());

    match subtopic {
        Some(topic) if topic != RANDOM_SUBTOPIC => {
            builder.push(" AND subtopic = ");
            builder.push_bind(topic);
        }
        _ => {
            builder.push(" AND subtopic IN (");
            let mut separated = builder.separated(",");
            for topic in mode.subtopics() {
                separated.push_bind(*topic);
            }
            separated.push_unseparated(")");
        }
    }
}

/// Retrieves the questions matching a mode and optional subtopic, in
/// insertion order. An empty result is valid; the caller decides
/// whether that is fatal.
pub async fn list_by_mode_and_subtopic(
    pool: &SqlitePool,
    mode: Mode,
    subtopic: Option<&str>,
) -> Result<Vec<Question>, AppError> {
    let mut builder = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
    push_filter(&mut builder, mode, subtopic);
    builder.push(" ORDER BY id");

    let rows: Vec<QuestionRow> = builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch questions: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    rows.into_iter().map(QuestionRow::into_question).collect()
}

/// Selects up to `desired` questions uniformly at random, without
/// replacement, from the eligible set. Returns fewer when the eligible
/// set is smaller; never pads and never duplicates.
pub async fn random_sample(
    pool: &SqlitePool,
    mode: Mode,
    subtopic: Option<&str>,
    desired: u32,
) -> Result<Vec<Question>, AppError> {
    let mut builder = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
    push_filter(&mut builder, mode, subtopic);
    builder.push(" ORDER BY RANDOM() LIMIT ");
    builder.push_bind(desired as i64);

    let rows: Vec<QuestionRow> = builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch random questions: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    rows.into_iter().map(QuestionRow::into_question).collect()
}

/// Inserts a question row. Admin-only path; options are stored as a
/// JSON array.
pub async fn insert_question(
    pool: &SqlitePool,
    question_text: &str,
    options: &[String],
    difficulty: Mode,
    subtopic: &str,
    correct_answer: i64,
    explanation: Option<&str>,
    image_url: Option<&str>,
) -> Result<i64, AppError> {
    let options_json = serde_json::to_string(options)?;

    let result = sqlx::query(
        r#"
        INSERT INTO questions
        (question_text, options, difficulty, subtopic, correct_answer, explanation, image_url)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(question_text)
    .bind(options_json)
    .bind(difficulty.as_str())
    .bind(subtopic)
    .bind(correct_answer)
    .bind(explanation)
    .bind(image_url)
    .execute(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(result.last_insert_rowid())
}

/// Lists every question, answers included. Admin-only path.
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Question>, AppError> {
    let rows: Vec<QuestionRow> =
        sqlx::query_as(&format!("{} ORDER BY id", SELECT_COLUMNS))
            .fetch_all(pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list questions: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

    rows.into_iter().map(QuestionRow::into_question).collect()
}
