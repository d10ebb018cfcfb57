// src/session/http.rs

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::models::question::{Mode, Question};
use crate::models::score::SubmitScoreRequest;

use super::source::{Identity, QuestionSource, ScoreSink, SessionError};

/// Question retrieval over the REST API.
///
/// Timeouts are the `reqwest::Client`'s concern; pass one configured
/// with the timeout policy the surrounding application wants.
#[derive(Clone)]
pub struct HttpQuestionSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpQuestionSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn fetch(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<Question>, SessionError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SessionError::Transport(format!(
                "question fetch failed with status {}",
                response.status()
            )));
        }

        response
            .json::<Vec<Question>>()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }
}

#[async_trait]
impl QuestionSource for HttpQuestionSource {
    async fn by_mode_and_subtopic(
        &self,
        mode: Mode,
        subtopic: Option<&str>,
    ) -> Result<Vec<Question>, SessionError> {
        let mut query = vec![("mode", mode.as_str().to_string())];
        if let Some(subtopic) = subtopic {
            query.push(("subtopic", subtopic.to_string()));
        }
        self.fetch("/api/quiz/questions", &query).await
    }

    async fn random_sample(
        &self,
        mode: Mode,
        subtopic: Option<&str>,
        desired: u32,
    ) -> Result<Vec<Question>, SessionError> {
        let mut query = vec![
            ("mode", mode.as_str().to_string()),
            ("limit", desired.to_string()),
        ];
        if let Some(subtopic) = subtopic {
            query.push(("subtopic", subtopic.to_string()));
        }
        self.fetch("/api/quiz/random", &query).await
    }
}

/// Score submission over the REST API, classifying the backend's error
/// statuses into the session taxonomy so the UI can react (e.g., prompt
/// re-authentication on an authorization failure instead of retrying).
#[derive(Clone)]
pub struct HttpScoreSink {
    client: reqwest::Client,
    base_url: String,
}

impl HttpScoreSink {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[derive(serde::Deserialize)]
struct CreatedResponse {
    id: i64,
}

#[async_trait]
impl ScoreSink for HttpScoreSink {
    async fn record(
        &self,
        identity: &Identity,
        mode: Mode,
        subtopic: &str,
        score: u32,
    ) -> Result<i64, SessionError> {
        let body = SubmitScoreRequest {
            user_id: Some(identity.user_id),
            quiz_mode: Some(mode.as_str().to_string()),
            subtopic: Some(subtopic.to_string()),
            score: Some(score as i64),
        };

        let response = self
            .client
            .post(format!("{}/api/scores", self.base_url))
            .bearer_auth(&identity.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(SessionError::NotAuthenticated),
            StatusCode::FORBIDDEN => Err(SessionError::UnauthorizedScoreWrite),
            StatusCode::BAD_REQUEST => Err(SessionError::IncompleteData),
            status if status.is_success() => response
                .json::<CreatedResponse>()
                .await
                .map(|created| created.id)
                .map_err(|e| SessionError::Transport(e.to_string())),
            status => Err(SessionError::Transport(format!(
                "score submission failed with status {}",
                status
            ))),
        }
    }
}
