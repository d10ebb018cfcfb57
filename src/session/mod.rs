//! Client-side quiz engine: one attempt's question acquisition, answer
//! capture, countdown pacing, local scoring and score submission.
//!
//! The controller talks to the backend only through the
//! [`QuestionSource`] and [`ScoreSink`] seams; `http` provides
//! reqwest-backed implementations of both against the REST API.

pub mod controller;
pub mod http;
pub mod source;
pub mod timer;

pub use controller::{QuizSession, SessionHandle, SessionPhase, SessionResult, SubmitOutcome};
pub use http::{HttpQuestionSource, HttpScoreSink};
pub use source::{Identity, QuestionSource, ScoreSink, SessionError};
pub use timer::CountdownTimer;

/// Countdown length of one quiz attempt, in seconds.
pub const QUIZ_DURATION_SECS: u64 = 1500;

/// Target sample size for the "random" grouping.
pub const RANDOM_SAMPLE_SIZE: u32 = 30;

/// Points awarded per correctly answered question.
pub const POINTS_PER_QUESTION: u32 = 10;
