// src/session/source.rs

use async_trait::async_trait;
use thiserror::Error;

use crate::models::question::{Mode, Question};

/// The authenticated identity a session acts as. Passed in explicitly;
/// the session never reads ambient authentication state.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: i64,
    /// Bearer credential presented to the score ledger.
    pub token: String,
}

/// Everything that can terminally fail a quiz session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no mode or subtopic selected")]
    MissingSelection,

    #[error("no questions available for this selection")]
    NoQuestionsAvailable,

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("not authorized to record a score for this user")]
    UnauthorizedScoreWrite,

    #[error("score submission was missing required data")]
    IncompleteData,

    #[error("session is not ready")]
    NotReady,

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Read access to the question bank.
#[async_trait]
pub trait QuestionSource {
    /// Questions matching a mode and optionally a concrete subtopic.
    /// An empty result is valid here; the session decides what it means.
    async fn by_mode_and_subtopic(
        &self,
        mode: Mode,
        subtopic: Option<&str>,
    ) -> Result<Vec<Question>, SessionError>;

    /// Up to `desired` questions drawn at random, without replacement,
    /// from the mode's eligible set.
    async fn random_sample(
        &self,
        mode: Mode,
        subtopic: Option<&str>,
        desired: u32,
    ) -> Result<Vec<Question>, SessionError>;
}

/// Write access to the score ledger.
#[async_trait]
pub trait ScoreSink {
    /// Records one score event for `identity`'s own account and returns
    /// the created row's id.
    async fn record(
        &self,
        identity: &Identity,
        mode: Mode,
        subtopic: &str,
        score: u32,
    ) -> Result<i64, SessionError>;
}
