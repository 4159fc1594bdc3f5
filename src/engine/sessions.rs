use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sqlx::types::Json;
use time::PrimitiveDateTime;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

use crate::db::models::{Exam, ExamResult, ExamSession, Question};
use crate::db::types::SessionStatus;
use crate::engine::clock::Clock;
use crate::engine::error::{EngineError, StoreError};
use crate::engine::events::SessionEvent;
use crate::engine::scoring;
use crate::engine::store::{ExamSource, SessionStore};
use crate::engine::timer::{Timer, TimerSignal};

const TICK_INTERVAL: Duration = Duration::from_secs(1);
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub(crate) struct EngineConfig {
    pub(crate) autosave_every_ticks: u32,
    pub(crate) store_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { autosave_every_ticks: 30, store_timeout: Duration::from_secs(5) }
    }
}

/// Read-only projection of a session. Never mutates engine state.
#[derive(Debug, Clone)]
pub(crate) struct SessionSnapshot {
    pub(crate) session_id: String,
    pub(crate) exam_id: String,
    pub(crate) user_id: String,
    pub(crate) status: SessionStatus,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) ended_at: Option<PrimitiveDateTime>,
    pub(crate) time_left_seconds: u64,
    pub(crate) time_spent_seconds: i64,
    pub(crate) answers: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub(crate) struct StartOutcome {
    pub(crate) snapshot: SessionSnapshot,
    /// True when an existing in-progress attempt was re-attached instead
    /// of a new one created.
    pub(crate) resumed: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FinalizeTrigger {
    Submit,
    Expire,
}

impl FinalizeTrigger {
    fn operation(self) -> &'static str {
        match self {
            FinalizeTrigger::Submit => "submit",
            FinalizeTrigger::Expire => "expire",
        }
    }
}

/// The session state machine. Owns the in-memory representation of every
/// registered session and the single live [`Timer`] per in-progress
/// attempt; delegates scoring to [`scoring`] and durability to the
/// [`SessionStore`].
///
/// All mutating operations on one session run under that session's mutex,
/// so a user-initiated `submit` and a timer-fired `expire` can race but
/// exactly one of them finalizes; the loser observes a terminal status
/// and gets `InvalidTransition`.
#[derive(Clone)]
pub(crate) struct SessionEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    exams: Arc<dyn ExamSource>,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    events: broadcast::Sender<SessionEvent>,
    registry: RwLock<Registry>,
}

#[derive(Default)]
struct Registry {
    by_id: HashMap<String, Arc<ActiveSession>>,
    in_progress: HashMap<(String, String), String>,
}

struct ActiveSession {
    state: Mutex<SessionState>,
}

struct SessionState {
    session: ExamSession,
    exam: Exam,
    questions: Vec<Question>,
    timer: Option<Timer>,
    deadline: Instant,
    total_duration: Duration,
}

impl SessionState {
    fn time_left(&self, now: Instant) -> Duration {
        if self.session.status.is_terminal() {
            return Duration::ZERO;
        }
        self.deadline.saturating_duration_since(now)
    }

    fn elapsed_seconds(&self, now: Instant) -> i64 {
        self.total_duration.saturating_sub(self.time_left(now)).as_secs() as i64
    }
}

impl SessionEngine {
    pub(crate) fn new(
        exams: Arc<dyn ExamSource>,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(EngineInner {
                exams,
                store,
                clock,
                config,
                events,
                registry: RwLock::new(Registry::default()),
            }),
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Open an attempt at `exam_id` for `user_id`, or re-attach to the
    /// attempt already in progress for that pair.
    pub(crate) async fn start(
        &self,
        exam_id: &str,
        user_id: &str,
    ) -> Result<StartOutcome, EngineError> {
        let exam = self
            .store_call(self.inner.exams.exam_by_id(exam_id))
            .await?
            .filter(|exam| exam.is_active)
            .ok_or_else(|| EngineError::ExamNotFound(exam_id.to_string()))?;

        let questions = self.store_call(self.inner.exams.questions_for_exam(exam_id)).await?;
        if questions.is_empty() {
            return Err(EngineError::EmptyQuestionSet);
        }

        // The registry write lock is held through creation so two
        // concurrent starts for the same pair cannot both insert.
        let mut registry = self.inner.registry.write().await;
        let key = (exam_id.to_string(), user_id.to_string());

        if let Some(session_id) = registry.in_progress.get(&key).cloned() {
            if let Some(active) = registry.by_id.get(&session_id).cloned() {
                drop(registry);
                tracing::debug!(session_id = %session_id, "Re-attached to in-progress session");
                let snapshot = self.snapshot_of(&active).await;
                return Ok(StartOutcome { snapshot, resumed: true });
            }
        }

        if let Some(stored) =
            self.store_call(self.inner.store.find_active_session(exam_id, user_id)).await?
        {
            // Left over from a previous process run. Best-effort adoption:
            // resume the countdown from the wall-clock elapsed time.
            let elapsed =
                (self.inner.clock.now_utc() - stored.started_at).whole_seconds().max(0);
            let remaining = exam.duration_seconds.saturating_sub(elapsed).max(0) as u64;
            tracing::info!(
                session_id = %stored.id,
                remaining_seconds = remaining,
                "Adopted persisted in-progress session"
            );
            let active = self.register(
                &mut registry,
                stored,
                exam,
                questions,
                Duration::from_secs(remaining),
            );
            drop(registry);
            let snapshot = self.snapshot_of(&active).await;
            return Ok(StartOutcome { snapshot, resumed: true });
        }

        let session = ExamSession {
            id: Uuid::new_v4().to_string(),
            exam_id: exam_id.to_string(),
            user_id: user_id.to_string(),
            started_at: self.inner.clock.now_utc(),
            ended_at: None,
            status: SessionStatus::InProgress,
            answers: Json(HashMap::new()),
            time_spent_seconds: 0,
            last_saved_at: None,
        };

        self.store_call(self.inner.store.create_session(&session)).await?;

        let duration = Duration::from_secs(exam.duration_seconds.max(0) as u64);
        let active = self.register(&mut registry, session, exam, questions, duration);
        drop(registry);

        metrics::counter!("exam_sessions_started_total").increment(1);
        let snapshot = self.snapshot_of(&active).await;
        tracing::info!(
            session_id = %snapshot.session_id,
            exam_id = %snapshot.exam_id,
            "Started exam session"
        );
        Ok(StartOutcome { snapshot, resumed: false })
    }

    /// Record or overwrite one answer in memory. Durable only after the
    /// next autosave or submission.
    pub(crate) async fn record_answer(
        &self,
        session_id: &str,
        question_id: &str,
        option: &str,
    ) -> Result<(), EngineError> {
        let active = self.active(session_id).await?;
        let mut state = active.state.lock().await;

        if state.session.status != SessionStatus::InProgress {
            return Err(EngineError::InvalidTransition {
                operation: "answer",
                status: state.session.status,
            });
        }

        state.session.answers.0.insert(question_id.to_string(), option.to_string());
        Ok(())
    }

    /// Flush the in-memory answer map and time spent to the store. Safe
    /// on any cadence; a terminal session is a silent no-op and a store
    /// failure is logged and retried at the next cadence.
    pub(crate) async fn autosave(&self, session_id: &str) -> Result<(), EngineError> {
        let active = self.active(session_id).await?;
        let mut state = active.state.lock().await;

        if state.session.status.is_terminal() {
            tracing::debug!(session_id = %session_id, "Autosave skipped for terminal session");
            return Ok(());
        }

        let now = self.inner.clock.monotonic();
        state.session.time_spent_seconds = state.elapsed_seconds(now);
        state.session.last_saved_at = Some(self.inner.clock.now_utc());

        // The session mutex stays held across the write so a concurrent
        // finalize cannot commit between snapshot and store call.
        let row = state.session.clone();
        match self.store_call(self.inner.store.update_session(&row)).await {
            Ok(()) => Ok(()),
            Err(EngineError::StoreUnavailable(err)) => {
                tracing::warn!(session_id = %session_id, error = %err, "Autosave failed; will retry next cadence");
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    /// User-initiated submission. Scores, persists session and result as
    /// one unit, stops the timer, and returns the result.
    pub(crate) async fn submit(&self, session_id: &str) -> Result<ExamResult, EngineError> {
        self.finalize(session_id, FinalizeTrigger::Submit).await
    }

    /// Timer-initiated submission; identical to [`submit`] but emits the
    /// `expired` event when it wins the transition.
    pub(crate) async fn expire(&self, session_id: &str) -> Result<ExamResult, EngineError> {
        self.finalize(session_id, FinalizeTrigger::Expire).await
    }

    /// Explicit cancellation: stops the timer and persists the terminal
    /// state without writing a result.
    pub(crate) async fn abandon(&self, session_id: &str) -> Result<(), EngineError> {
        let active = self.active(session_id).await?;
        let mut state = active.state.lock().await;

        if state.session.status != SessionStatus::InProgress {
            return Err(EngineError::InvalidTransition {
                operation: "abandon",
                status: state.session.status,
            });
        }

        let mut ended = state.session.clone();
        ended.status = SessionStatus::Abandoned;
        ended.ended_at = Some(self.inner.clock.now_utc());
        ended.time_spent_seconds = state.elapsed_seconds(self.inner.clock.monotonic());

        self.store_call(self.inner.store.update_session(&ended)).await?;

        state.session = ended;
        if let Some(timer) = state.timer.take() {
            timer.stop();
        }
        drop(state);

        self.release_pair(session_id).await;
        metrics::counter!("exam_sessions_abandoned_total").increment(1);
        tracing::info!(session_id = %session_id, "Abandoned exam session");
        Ok(())
    }

    pub(crate) async fn snapshot(&self, session_id: &str) -> Result<SessionSnapshot, EngineError> {
        let active = self.active(session_id).await?;
        Ok(self.snapshot_of(&active).await)
    }

    /// Stop every live timer. Called on process shutdown so no scheduled
    /// wake outlives the sessions it serves.
    pub(crate) async fn shutdown(&self) {
        let registry = self.inner.registry.read().await;
        for active in registry.by_id.values() {
            let mut state = active.state.lock().await;
            if let Some(timer) = state.timer.take() {
                timer.stop();
            }
        }
    }

    async fn finalize(
        &self,
        session_id: &str,
        trigger: FinalizeTrigger,
    ) -> Result<ExamResult, EngineError> {
        let active = self.active(session_id).await?;
        let mut state = active.state.lock().await;

        if state.session.status != SessionStatus::InProgress {
            return Err(EngineError::InvalidTransition {
                operation: trigger.operation(),
                status: state.session.status,
            });
        }

        let now = self.inner.clock.now_utc();
        let card = scoring::score(
            &state.questions,
            &state.session.answers.0,
            state.exam.passing_score,
        )?;

        let result = ExamResult {
            id: Uuid::new_v4().to_string(),
            exam_id: state.session.exam_id.clone(),
            user_id: state.session.user_id.clone(),
            session_id: state.session.id.clone(),
            score: card.score,
            total_questions: card.total_questions,
            correct_answers: card.correct_answers,
            wrong_answers: card.wrong_answers,
            skipped_questions: card.skipped_questions,
            percentage: card.percentage,
            passed: card.passed,
            subject_scores: Json(card.subject_scores),
            completed_at: now,
        };

        let mut finalized = state.session.clone();
        finalized.status = SessionStatus::Completed;
        finalized.ended_at = Some(now);
        finalized.time_spent_seconds = state.elapsed_seconds(self.inner.clock.monotonic());
        finalized.last_saved_at = Some(now);

        // In-memory state commits only after the durable write, so a
        // failed store call leaves the session submittable for a retry.
        self.store_call(self.inner.store.finalize_session(&finalized, &result)).await?;

        state.session = finalized;
        if let Some(timer) = state.timer.take() {
            timer.stop();
        }
        drop(state);

        self.release_pair(session_id).await;

        if trigger == FinalizeTrigger::Expire {
            self.emit(SessionEvent::expired(session_id));
        }

        metrics::counter!("exam_sessions_completed_total", "trigger" => trigger.operation())
            .increment(1);
        tracing::info!(
            session_id = %session_id,
            trigger = trigger.operation(),
            percentage = result.percentage,
            passed = result.passed,
            "Finalized exam session"
        );
        Ok(result)
    }

    fn register(
        &self,
        registry: &mut Registry,
        session: ExamSession,
        exam: Exam,
        questions: Vec<Question>,
        remaining: Duration,
    ) -> Arc<ActiveSession> {
        let session_id = session.id.clone();
        let key = (session.exam_id.clone(), session.user_id.clone());
        let total_duration = Duration::from_secs(exam.duration_seconds.max(0) as u64);

        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let timer =
            Timer::start(self.inner.clock.clone(), remaining, TICK_INTERVAL, signals_tx);
        let deadline = self.inner.clock.monotonic() + remaining;

        let active = Arc::new(ActiveSession {
            state: Mutex::new(SessionState {
                session,
                exam,
                questions,
                timer: Some(timer),
                deadline,
                total_duration,
            }),
        });

        registry.by_id.insert(session_id.clone(), active.clone());
        registry.in_progress.insert(key, session_id.clone());

        tokio::spawn(drive_timer(self.clone(), session_id, signals_rx));

        active
    }

    async fn active(&self, session_id: &str) -> Result<Arc<ActiveSession>, EngineError> {
        let registry = self.inner.registry.read().await;
        registry
            .by_id
            .get(session_id)
            .cloned()
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))
    }

    async fn snapshot_of(&self, active: &ActiveSession) -> SessionSnapshot {
        let state = active.state.lock().await;
        let now = self.inner.clock.monotonic();
        let time_spent_seconds = if state.session.status.is_terminal() {
            state.session.time_spent_seconds
        } else {
            state.elapsed_seconds(now)
        };

        SessionSnapshot {
            session_id: state.session.id.clone(),
            exam_id: state.session.exam_id.clone(),
            user_id: state.session.user_id.clone(),
            status: state.session.status,
            started_at: state.session.started_at,
            ended_at: state.session.ended_at,
            time_left_seconds: state.time_left(now).as_secs(),
            time_spent_seconds,
            answers: state.session.answers.0.clone(),
        }
    }

    /// Drop the (exam, user) -> session index entry once the session has
    /// left `InProgress`, so the pair can start a fresh attempt.
    async fn release_pair(&self, session_id: &str) {
        let mut registry = self.inner.registry.write().await;
        registry.in_progress.retain(|_, id| id != session_id);
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.inner.events.send(event);
    }

    async fn store_call<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>> + Send,
    ) -> Result<T, EngineError> {
        let limit = self.inner.config.store_timeout;
        match tokio::time::timeout(limit, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(EngineError::StoreUnavailable(err)),
            Err(_) => Err(EngineError::StoreUnavailable(StoreError::Timeout(limit))),
        }
    }
}

/// Consumes one session's timer signals: pushes ticks to subscribers,
/// triggers the autosave cadence, and fires auto-submission at expiry.
async fn drive_timer(
    engine: SessionEngine,
    session_id: String,
    mut signals: mpsc::UnboundedReceiver<TimerSignal>,
) {
    let autosave_every = engine.inner.config.autosave_every_ticks.max(1);
    let mut ticks: u32 = 0;

    while let Some(signal) = signals.recv().await {
        match signal {
            TimerSignal::Tick { seconds_left } => {
                engine.emit(SessionEvent::tick(&session_id, seconds_left));
                ticks = ticks.wrapping_add(1);
                if ticks % autosave_every == 0 {
                    if let Err(err) = engine.autosave(&session_id).await {
                        tracing::warn!(
                            session_id = %session_id,
                            error = %err,
                            "Scheduled autosave failed"
                        );
                    }
                }
            }
            TimerSignal::Expired => match engine.expire(&session_id).await {
                Ok(_) => {}
                Err(err) if err.is_invalid_transition() => {
                    tracing::debug!(
                        session_id = %session_id,
                        "Expiry lost the race to a user-initiated transition"
                    );
                }
                Err(err) => {
                    tracing::error!(
                        session_id = %session_id,
                        error = %err,
                        "Auto-submit on expiry failed"
                    );
                }
            },
        }
    }
}
