// src/session/controller.rs

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::models::question::{Mode, Question, RANDOM_SUBTOPIC};

use super::source::{Identity, QuestionSource, ScoreSink, SessionError};
use super::timer::CountdownTimer;
use super::{POINTS_PER_QUESTION, QUIZ_DURATION_SECS, RANDOM_SAMPLE_SIZE};

/// Lifecycle of one quiz attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    Loading,
    Ready,
    Submitting,
    Submitted,
    Failed(SessionError),
}

/// What a call to `submit` achieved. A second submission after the
/// first (e.g., the timer firing the same instant as a manual click)
/// is a no-op rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Recorded { score_id: i64, score: u32 },
    AlreadySubmitted,
}

/// Everything the result view needs, exposed once the session reaches
/// `Submitted`.
#[derive(Debug, Clone)]
pub struct SessionResult {
    pub questions: Vec<Question>,
    pub answers: Vec<Option<usize>>,
    pub score: u32,
    pub mode: Mode,
    pub subtopic: String,
    pub score_id: i64,
}

/// State machine for one quiz attempt.
///
/// Owns the fetched questions and the parallel answers array
/// (`answers.len() == questions.len()` from `Ready` onward), computes
/// the score locally, and reports it to the [`ScoreSink`] exactly once.
pub struct QuizSession<S, W> {
    source: S,
    sink: W,
    identity: Option<Identity>,
    mode: Option<Mode>,
    subtopic: Option<String>,
    preloaded: Option<Vec<Question>>,
    questions: Vec<Question>,
    answers: Vec<Option<usize>>,
    phase: SessionPhase,
    result: Option<SessionResult>,
}

impl<S, W> QuizSession<S, W>
where
    S: QuestionSource,
    W: ScoreSink,
{
    pub fn new(
        source: S,
        sink: W,
        mode: Option<Mode>,
        subtopic: Option<String>,
        identity: Option<Identity>,
    ) -> Self {
        Self {
            source,
            sink,
            identity,
            mode,
            subtopic,
            preloaded: None,
            questions: Vec::new(),
            answers: Vec::new(),
            phase: SessionPhase::Loading,
            result: None,
        }
    }

    /// Supplies a pre-fetched question list. When non-empty it takes
    /// priority over any store fetch during `load`.
    pub fn with_questions(mut self, questions: Vec<Question>) -> Self {
        if !questions.is_empty() {
            self.preloaded = Some(questions);
        }
        self
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    /// Available once the session reached `Submitted`.
    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    /// Acquires questions and transitions `Loading -> Ready`.
    ///
    /// Acquisition priority: a non-empty pre-fetched list, then a
    /// random sample for the "random" sentinel, then a filtered fetch
    /// for a concrete subtopic. A missing mode/subtopic selection fails
    /// without touching the store; a store call yielding zero questions
    /// is a failure, not a valid empty session.
    pub async fn load(&mut self) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Loading {
            return Err(SessionError::NotReady);
        }

        let questions = if let Some(preloaded) = self.preloaded.take() {
            preloaded
        } else {
            let (mode, subtopic) = match (self.mode, self.subtopic.as_deref()) {
                (Some(mode), Some(subtopic)) => (mode, subtopic),
                _ => return self.fail(SessionError::MissingSelection),
            };

            let fetched = if subtopic == RANDOM_SUBTOPIC {
                self.source
                    .random_sample(mode, Some(subtopic), RANDOM_SAMPLE_SIZE)
                    .await
            } else {
                self.source.by_mode_and_subtopic(mode, Some(subtopic)).await
            };

            match fetched {
                Ok(questions) => questions,
                Err(e) => return self.fail(e),
            }
        };

        if questions.is_empty() {
            return self.fail(SessionError::NoQuestionsAvailable);
        }

        self.answers = vec![None; questions.len()];
        self.questions = questions;
        self.phase = SessionPhase::Ready;
        Ok(())
    }

    /// Records (or overwrites) the answer at `question_index`. Only
    /// meaningful in `Ready`; out-of-range writes are dropped.
    pub fn record_answer(&mut self, question_index: usize, option_index: usize) {
        if self.phase != SessionPhase::Ready {
            tracing::warn!(question_index, "answer recorded outside Ready phase, ignored");
            return;
        }
        let Some(question) = self.questions.get(question_index) else {
            tracing::warn!(question_index, "answer for unknown question index, ignored");
            return;
        };
        if option_index >= question.options.len() {
            tracing::warn!(question_index, option_index, "option index out of range, ignored");
            return;
        }
        self.answers[question_index] = Some(option_index);
    }

    /// Computes the attempt's score from the in-memory arrays only.
    /// Unanswered questions score zero.
    pub fn compute_score(&self) -> u32 {
        self.questions
            .iter()
            .zip(&self.answers)
            .filter(|(question, answer)| **answer == Some(question.correct_answer as usize))
            .count() as u32
            * POINTS_PER_QUESTION
    }

    /// Submits the attempt: scores it locally, then records the score
    /// event. Idempotent; after the first submission every further call
    /// reports `AlreadySubmitted`. Every failure is terminal for the
    /// session.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, SessionError> {
        match self.phase {
            SessionPhase::Ready => {}
            SessionPhase::Submitting | SessionPhase::Submitted => {
                return Ok(SubmitOutcome::AlreadySubmitted);
            }
            SessionPhase::Loading => return Err(SessionError::NotReady),
            SessionPhase::Failed(ref e) => return Err(e.clone()),
        }
        self.phase = SessionPhase::Submitting;

        let score = self.compute_score();

        let (mode, subtopic) = match (self.mode, self.subtopic.clone()) {
            (Some(mode), Some(subtopic)) => (mode, subtopic),
            _ => return self.fail(SessionError::MissingSelection),
        };

        let Some(identity) = self.identity.clone() else {
            return self.fail(SessionError::NotAuthenticated);
        };

        let score_id = match self.sink.record(&identity, mode, &subtopic, score).await {
            Ok(id) => id,
            Err(e) => return self.fail(e),
        };

        self.result = Some(SessionResult {
            questions: std::mem::take(&mut self.questions),
            answers: std::mem::take(&mut self.answers),
            score,
            mode,
            subtopic,
            score_id,
        });
        self.phase = SessionPhase::Submitted;

        Ok(SubmitOutcome::Recorded { score_id, score })
    }

    fn fail<T>(&mut self, error: SessionError) -> Result<T, SessionError> {
        self.phase = SessionPhase::Failed(error.clone());
        Err(error)
    }
}

/// Owns a running session together with its countdown.
///
/// Wires timer expiry to exactly one automatic submission and
/// guarantees the countdown stops on every path that leaves `Ready`.
/// An in-flight score write is never cancelled; a racing manual submit
/// simply observes `AlreadySubmitted`.
pub struct SessionHandle<S, W> {
    session: Arc<Mutex<QuizSession<S, W>>>,
    timer: CountdownTimer,
    auto_submit: JoinHandle<()>,
}

impl<S, W> std::fmt::Debug for SessionHandle<S, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle").finish_non_exhaustive()
    }
}

impl<S, W> SessionHandle<S, W>
where
    S: QuestionSource + Send + 'static,
    W: ScoreSink + Send + 'static,
{
    /// Loads the session and starts the standard-length countdown.
    pub async fn start(session: QuizSession<S, W>) -> Result<Self, SessionError> {
        Self::start_with_duration(session, QUIZ_DURATION_SECS).await
    }

    /// Loads the session and starts a countdown of `seconds`. The timer
    /// only starts once questions are ready; a failed load never ticks.
    pub async fn start_with_duration(
        mut session: QuizSession<S, W>,
        seconds: u64,
    ) -> Result<Self, SessionError> {
        session.load().await?;

        let timer = CountdownTimer::start(seconds);
        let session = Arc::new(Mutex::new(session));

        let expired = timer.expired();
        let auto_session = session.clone();
        let auto_submit = tokio::spawn(async move {
            expired.notified().await;
            let mut session = auto_session.lock().await;
            match session.submit().await {
                Ok(_) => tracing::info!("countdown expired, session auto-submitted"),
                Err(e) => tracing::warn!("auto-submit failed: {}", e),
            }
        });

        Ok(Self {
            session,
            timer,
            auto_submit,
        })
    }

    pub async fn record_answer(&self, question_index: usize, option_index: usize) {
        self.session
            .lock()
            .await
            .record_answer(question_index, option_index);
    }

    /// Seconds left on the countdown.
    pub fn remaining(&self) -> u64 {
        self.timer.remaining()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.session.lock().await.phase().clone()
    }

    pub async fn result(&self) -> Option<SessionResult> {
        self.session.lock().await.result().cloned()
    }

    /// Manual submission. Stops the countdown first so it cannot fire
    /// late; if the countdown already triggered the automatic path,
    /// this reports `AlreadySubmitted`.
    pub async fn submit(&self) -> Result<SubmitOutcome, SessionError> {
        self.timer.stop();
        self.session.lock().await.submit().await
    }
}

impl<S, W> Drop for SessionHandle<S, W> {
    fn drop(&mut self) {
        self.timer.stop();
        self.auto_submit.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn question(id: i64, correct: i64) -> Question {
        Question {
            id,
            question_text: format!("question {}", id),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            difficulty: Mode::Easy,
            subtopic: "Sorting Algo".to_string(),
            correct_answer: correct,
            explanation: None,
            image_url: None,
            created_at: None,
        }
    }

    fn identity() -> Identity {
        Identity {
            user_id: 1,
            token: "token".to_string(),
        }
    }

    #[derive(Default)]
    struct FakeSource {
        questions: Vec<Question>,
        list_calls: Arc<AtomicUsize>,
        random_calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl QuestionSource for FakeSource {
        async fn by_mode_and_subtopic(
            &self,
            _mode: Mode,
            _subtopic: Option<&str>,
        ) -> Result<Vec<Question>, SessionError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.questions.clone())
        }

        async fn random_sample(
            &self,
            _mode: Mode,
            _subtopic: Option<&str>,
            desired: u32,
        ) -> Result<Vec<Question>, SessionError> {
            self.random_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .questions
                .iter()
                .take(desired as usize)
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct FakeSink {
        calls: Arc<AtomicUsize>,
        fail_with: Option<SessionError>,
        last_score: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ScoreSink for FakeSink {
        async fn record(
            &self,
            _identity: &Identity,
            _mode: Mode,
            _subtopic: &str,
            score: u32,
        ) -> Result<i64, SessionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.last_score.store(score as usize, Ordering::SeqCst);
            match &self.fail_with {
                Some(e) => Err(e.clone()),
                None => Ok(42),
            }
        }
    }

    fn session_with(
        questions: Vec<Question>,
        sink: FakeSink,
    ) -> QuizSession<FakeSource, FakeSink> {
        let source = FakeSource {
            questions,
            ..Default::default()
        };
        QuizSession::new(
            source,
            sink,
            Some(Mode::Easy),
            Some("Sorting Algo".to_string()),
            Some(identity()),
        )
    }

    #[tokio::test]
    async fn missing_selection_fails_without_store_call() {
        let source = FakeSource::default();
        let list_calls = source.list_calls.clone();
        let random_calls = source.random_calls.clone();
        let mut session =
            QuizSession::new(source, FakeSink::default(), None, None, Some(identity()));

        let err = session.load().await.unwrap_err();

        assert_eq!(err, SessionError::MissingSelection);
        assert_eq!(*session.phase(), SessionPhase::Failed(SessionError::MissingSelection));
        assert_eq!(list_calls.load(Ordering::SeqCst), 0);
        assert_eq!(random_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn zero_questions_is_an_error_not_an_empty_session() {
        let mut session = session_with(Vec::new(), FakeSink::default());

        let err = session.load().await.unwrap_err();

        assert_eq!(err, SessionError::NoQuestionsAvailable);
        assert_eq!(
            *session.phase(),
            SessionPhase::Failed(SessionError::NoQuestionsAvailable)
        );
    }

    #[tokio::test]
    async fn preloaded_questions_take_priority_over_the_store() {
        let source = FakeSource {
            questions: vec![question(99, 0)],
            ..Default::default()
        };
        let list_calls = source.list_calls.clone();
        let random_calls = source.random_calls.clone();
        let mut session = QuizSession::new(
            source,
            FakeSink::default(),
            Some(Mode::Easy),
            Some("Sorting Algo".to_string()),
            Some(identity()),
        )
        .with_questions(vec![question(1, 0), question(2, 1)]);

        session.load().await.unwrap();

        assert_eq!(session.questions().len(), 2);
        assert_eq!(session.answers().len(), 2);
        assert_eq!(list_calls.load(Ordering::SeqCst), 0);
        assert_eq!(random_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn random_sentinel_uses_the_random_sample_path() {
        let source = FakeSource {
            questions: (0..40).map(|i| question(i, 0)).collect(),
            ..Default::default()
        };
        let random_calls = source.random_calls.clone();
        let mut session = QuizSession::new(
            source,
            FakeSink::default(),
            Some(Mode::Hard),
            Some(RANDOM_SUBTOPIC.to_string()),
            Some(identity()),
        );

        session.load().await.unwrap();

        assert_eq!(random_calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.questions().len(), RANDOM_SAMPLE_SIZE as usize);
        assert_eq!(session.answers().len(), session.questions().len());
    }

    #[tokio::test]
    async fn out_of_range_answers_are_dropped() {
        let mut session = session_with(vec![question(1, 0)], FakeSink::default());
        session.load().await.unwrap();

        session.record_answer(5, 0);
        session.record_answer(0, 17);

        assert_eq!(session.answers(), &[None]);

        session.record_answer(0, 2);
        assert_eq!(session.answers(), &[Some(2)]);
    }

    #[tokio::test]
    async fn scoring_awards_ten_points_per_correct_answer() {
        let questions: Vec<Question> = (0..20).map(|i| question(i, 1)).collect();
        let sink = FakeSink::default();
        let last_score = sink.last_score.clone();
        let mut session = session_with(questions, sink);
        session.load().await.unwrap();

        // 12 correct, 3 wrong, 5 unanswered.
        for i in 0..12 {
            session.record_answer(i, 1);
        }
        for i in 12..15 {
            session.record_answer(i, 0);
        }

        assert_eq!(session.compute_score(), 120);

        let outcome = session.submit().await.unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Recorded {
                score_id: 42,
                score: 120
            }
        );
        assert_eq!(last_score.load(Ordering::SeqCst), 120);
        assert_eq!(*session.phase(), SessionPhase::Submitted);

        let result = session.result().unwrap();
        assert_eq!(result.score, 120);
        assert_eq!(result.questions.len(), result.answers.len());
    }

    #[tokio::test]
    async fn double_submit_records_exactly_one_score_event() {
        let sink = FakeSink::default();
        let calls = sink.calls.clone();
        let mut session = session_with(vec![question(1, 0)], sink);
        session.load().await.unwrap();

        let first = session.submit().await.unwrap();
        let second = session.submit().await.unwrap();

        assert!(matches!(first, SubmitOutcome::Recorded { .. }));
        assert_eq!(second, SubmitOutcome::AlreadySubmitted);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unauthenticated_submit_never_reaches_the_sink() {
        let sink = FakeSink::default();
        let calls = sink.calls.clone();
        let source = FakeSource {
            questions: vec![question(1, 0)],
            ..Default::default()
        };
        let mut session = QuizSession::new(
            source,
            sink,
            Some(Mode::Easy),
            Some("Sorting Algo".to_string()),
            None,
        );
        session.load().await.unwrap();

        let err = session.submit().await.unwrap_err();

        assert_eq!(err, SessionError::NotAuthenticated);
        assert_eq!(
            *session.phase(),
            SessionPhase::Failed(SessionError::NotAuthenticated)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unauthorized_write_is_a_distinct_terminal_state() {
        let sink = FakeSink {
            fail_with: Some(SessionError::UnauthorizedScoreWrite),
            ..Default::default()
        };
        let mut session = session_with(vec![question(1, 0)], sink);
        session.load().await.unwrap();

        let err = session.submit().await.unwrap_err();

        assert_eq!(err, SessionError::UnauthorizedScoreWrite);
        assert_eq!(
            *session.phase(),
            SessionPhase::Failed(SessionError::UnauthorizedScoreWrite)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timer_expiry_auto_submits_exactly_once() {
        let sink = FakeSink::default();
        let calls = sink.calls.clone();
        let session = session_with((0..20).map(|i| question(i, 1)).collect(), sink);

        let handle = SessionHandle::start_with_duration(session, 3).await.unwrap();
        for i in 0..5 {
            handle.record_answer(i, 1).await;
        }

        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(handle.phase().await, SessionPhase::Submitted);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(handle.result().await.unwrap().score, 50);

        // A manual submit after expiry is a no-op.
        let outcome = handle.submit().await.unwrap();
        assert_eq!(outcome, SubmitOutcome::AlreadySubmitted);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_submit_stops_the_countdown() {
        let sink = FakeSink::default();
        let calls = sink.calls.clone();
        let session = session_with(vec![question(1, 0)], sink);

        let handle = SessionHandle::start_with_duration(session, 60).await.unwrap();
        handle.record_answer(0, 0).await;

        let outcome = handle.submit().await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Recorded { .. }));

        // Long past the original expiry; no second submission.
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(handle.phase().await, SessionPhase::Submitted);
    }

    #[tokio::test]
    async fn failed_load_surfaces_before_any_timer_starts() {
        let session = session_with(Vec::new(), FakeSink::default());
        let err = SessionHandle::start_with_duration(session, 3)
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::NoQuestionsAvailable);
    }
}
