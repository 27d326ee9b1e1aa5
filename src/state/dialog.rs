//! Turn engine: runs the pure state machine and performs the game lock I/O it asks for.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{
    dao::{lock_store::GameLock, storage::StorageResult},
    error::ServiceError,
    state::{
        question_bank::QuestionBank,
        session::SessionState,
        speech::SpeechResponse,
        state_machine::{
            DialogStateMachine, Intent, LockEffect, LockStatus, Outcome, Slots, TurnContext,
        },
    },
};

/// Default bound on a single game lock call.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of a turn: the state to carry forward and what to say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// Session state for the next turn.
    pub session: SessionState,
    /// Spoken response.
    pub response: SpeechResponse,
}

impl From<Outcome> for Turn {
    fn from(outcome: Outcome) -> Self {
        Self {
            session: outcome.session,
            response: outcome.response,
        }
    }
}

/// Drives one conversation turn at a time against a shared question bank.
pub struct DialogEngine {
    machine: DialogStateMachine,
    bank: Arc<QuestionBank>,
    default_team: String,
    lock_timeout: Duration,
}

impl DialogEngine {
    /// Build an engine with every built-in handler registered.
    pub fn new(bank: Arc<QuestionBank>, default_team: impl Into<String>, lock_timeout: Duration) -> Self {
        Self {
            machine: DialogStateMachine::new(),
            bank,
            default_team: default_team.into(),
            lock_timeout,
        }
    }

    /// Question bank the engine draws clues from.
    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    /// Handle one intent.
    ///
    /// `lock` is `None` while no lock backend is installed. Any lock failure,
    /// including a timeout, answers with a generic apology and hands the
    /// previous session back untouched.
    pub async fn handle_intent(
        &self,
        lock: Option<&dyn GameLock>,
        intent_name: &str,
        slots: &Slots,
        session: Option<SessionState>,
    ) -> Turn {
        let previous = session.unwrap_or_default();
        let intent = match intent_name.parse::<Intent>() {
            Ok(intent) => Some(intent),
            Err(err) => {
                debug!(error = %err, "unrecognised intent; asking to clarify");
                None
            }
        };

        match self.run(lock, intent, slots, previous.clone()).await {
            Ok(turn) => turn,
            Err(err) => {
                warn!(intent = intent_name, error = %err, "game lock call failed; keeping previous session");
                Turn {
                    session: previous,
                    response: SpeechResponse::backend_failure(),
                }
            }
        }
    }

    fn context(&self, lock: LockStatus) -> TurnContext<'_> {
        TurnContext {
            bank: &self.bank,
            lock,
            default_team: &self.default_team,
        }
    }

    async fn run(
        &self,
        lock: Option<&dyn GameLock>,
        intent: Option<Intent>,
        slots: &Slots,
        session: SessionState,
    ) -> Result<Turn, ServiceError> {
        let observed = match intent {
            Some(intent) if intent.reads_lock(session.status) => {
                if self.call_lock(lock, |lock| lock.is_running()).await? {
                    LockStatus::Held
                } else {
                    LockStatus::Free
                }
            }
            _ => LockStatus::Unknown,
        };

        let outcome = self
            .machine
            .transition(intent, slots, session.clone(), &self.context(observed));

        match outcome.lock_effect {
            None => Ok(outcome.into()),
            Some(LockEffect::Release) => {
                self.call_lock(lock, |lock| lock.release()).await?;
                Ok(outcome.into())
            }
            Some(LockEffect::Acquire) => {
                if self.call_lock(lock, |lock| lock.try_acquire()).await? {
                    return Ok(outcome.into());
                }

                info!(?intent, "another conversation took the game lock first");
                let retry =
                    self.machine
                        .transition(intent, slots, session, &self.context(LockStatus::Held));
                if retry.lock_effect.is_some() {
                    return Err(ServiceError::InvalidState(
                        "handler kept requesting the game lock after losing it".into(),
                    ));
                }
                Ok(retry.into())
            }
        }
    }

    async fn call_lock<T>(
        &self,
        lock: Option<&dyn GameLock>,
        op: impl FnOnce(&dyn GameLock) -> BoxFuture<'static, StorageResult<T>>,
    ) -> Result<T, ServiceError> {
        let lock = lock.ok_or(ServiceError::Degraded)?;
        match timeout(self.lock_timeout, op(lock)).await {
            Ok(result) => result.map_err(ServiceError::from),
            Err(_) => Err(ServiceError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use futures::future;

    use super::*;
    use crate::{
        dao::{lock_store::MemoryGameLock, storage::StorageError},
        state::session::GameStatus,
    };

    fn engine() -> DialogEngine {
        DialogEngine::new(
            Arc::new(QuestionBank::builtin()),
            "blue",
            Duration::from_millis(50),
        )
    }

    fn slots<const N: usize>(pairs: [(&str, &str); N]) -> Slots {
        pairs.into_iter().collect()
    }

    fn unavailable() -> StorageError {
        StorageError::unavailable(
            "lock backend offline".into(),
            io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        )
    }

    /// Every call fails.
    struct FailingLock;

    impl GameLock for FailingLock {
        fn is_running(&self) -> BoxFuture<'static, StorageResult<bool>> {
            Box::pin(future::ready(Err(unavailable())))
        }
        fn try_acquire(&self) -> BoxFuture<'static, StorageResult<bool>> {
            Box::pin(future::ready(Err(unavailable())))
        }
        fn release(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(future::ready(Err(unavailable())))
        }
        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(future::ready(Err(unavailable())))
        }
        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(future::ready(Err(unavailable())))
        }
    }

    /// Every call hangs forever.
    struct StallingLock;

    impl GameLock for StallingLock {
        fn is_running(&self) -> BoxFuture<'static, StorageResult<bool>> {
            Box::pin(future::pending())
        }
        fn try_acquire(&self) -> BoxFuture<'static, StorageResult<bool>> {
            Box::pin(future::pending())
        }
        fn release(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(future::pending())
        }
        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(future::pending())
        }
        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(future::pending())
        }
    }

    /// Reports the lock as free, then loses the compare-and-set.
    #[derive(Default)]
    struct RacingLock {
        acquire_attempts: Arc<AtomicUsize>,
    }

    impl GameLock for RacingLock {
        fn is_running(&self) -> BoxFuture<'static, StorageResult<bool>> {
            Box::pin(future::ready(Ok(false)))
        }
        fn try_acquire(&self) -> BoxFuture<'static, StorageResult<bool>> {
            self.acquire_attempts.fetch_add(1, Ordering::SeqCst);
            Box::pin(future::ready(Ok(false)))
        }
        fn release(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(future::ready(Ok(())))
        }
        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(future::ready(Ok(())))
        }
        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(future::ready(Ok(())))
        }
    }

    #[tokio::test]
    async fn start_then_restart_then_decline_keeps_the_game() {
        let engine = engine();
        let lock = MemoryGameLock::new();

        let turn = engine
            .handle_intent(Some(&lock), "StartGame", &Slots::default(), None)
            .await;
        assert_eq!(turn.session.status, GameStatus::Running);
        assert!(turn.response.speech.contains("New game"));
        assert!(lock.is_held());

        let turn = engine
            .handle_intent(
                Some(&lock),
                "StartJeopardyIntent",
                &Slots::default(),
                Some(turn.session),
            )
            .await;
        assert_eq!(turn.session.status, GameStatus::CancelPending);
        assert!(turn.response.speech.contains("Want to cancel?"));

        let turn = engine
            .handle_intent(Some(&lock), "No", &Slots::default(), Some(turn.session))
            .await;
        assert_eq!(turn.session.status, GameStatus::Running);
        assert_eq!(turn.response.speech, "Cancel aborted.");
        assert!(lock.is_held());
    }

    #[tokio::test]
    async fn second_conversation_sees_the_running_game() {
        let engine = engine();
        let lock = MemoryGameLock::new();

        engine
            .handle_intent(Some(&lock), "StartGame", &Slots::default(), None)
            .await;
        let other = engine
            .handle_intent(Some(&lock), "StartGame", &Slots::default(), None)
            .await;

        assert_eq!(other.session.status, GameStatus::CancelPending);
        assert!(other.response.speech.contains("already running"));
    }

    #[tokio::test]
    async fn cancel_confirmation_releases_and_offers_restart() {
        let engine = engine();
        let lock = MemoryGameLock::new();

        let turn = engine
            .handle_intent(Some(&lock), "StartGame", &Slots::default(), None)
            .await;
        let turn = engine
            .handle_intent(Some(&lock), "StartGame", &Slots::default(), Some(turn.session))
            .await;
        let turn = engine
            .handle_intent(Some(&lock), "Yes", &Slots::default(), Some(turn.session))
            .await;

        assert_eq!(turn.session.status, GameStatus::StartPending);
        assert!(!lock.is_held());

        let turn = engine
            .handle_intent(Some(&lock), "AMAZON.YesIntent", &Slots::default(), Some(turn.session))
            .await;
        assert_eq!(turn.session.status, GameStatus::Running);
        assert!(lock.is_held());
    }

    #[tokio::test]
    async fn full_round_awards_points_to_default_team() {
        let engine = engine();
        let lock = MemoryGameLock::new();

        let turn = engine
            .handle_intent(Some(&lock), "StartGame", &Slots::default(), None)
            .await;
        let turn = engine
            .handle_intent(
                Some(&lock),
                "SelectCategory",
                &slots([("category", "science"), ("score", "200")]),
                Some(turn.session),
            )
            .await;
        assert!(turn.response.speech.contains("This is the smallest unit"));

        let turn = engine
            .handle_intent(
                Some(&lock),
                "AnswerOnly",
                &slots([("answer", "what is an atom")]),
                Some(turn.session),
            )
            .await;
        assert!(turn.response.speech.contains("correctly answered"));

        let turn = engine
            .handle_intent(
                Some(&lock),
                "QueryScore",
                &slots([("teamName", "Blue")]),
                Some(turn.session),
            )
            .await;
        assert_eq!(
            turn.response.speech,
            "The score for team Blue is currently 200."
        );
    }

    #[tokio::test]
    async fn cancel_from_any_state_releases_the_lock() {
        let engine = engine();
        let lock = MemoryGameLock::new();

        let turn = engine
            .handle_intent(Some(&lock), "StartGame", &Slots::default(), None)
            .await;
        let turn = engine
            .handle_intent(Some(&lock), "AMAZON.CancelIntent", &Slots::default(), Some(turn.session))
            .await;

        assert_eq!(turn.session, SessionState::default());
        assert!(!turn.response.keep_session_open);
        assert!(!lock.is_held());
    }

    #[tokio::test]
    async fn failing_lock_keeps_previous_session() {
        let engine = engine();
        let previous = SessionState {
            status: GameStatus::StartPending,
            ..SessionState::default()
        };

        let turn = engine
            .handle_intent(Some(&FailingLock), "Yes", &Slots::default(), Some(previous.clone()))
            .await;

        assert_eq!(turn.session, previous);
        assert_eq!(turn.response, SpeechResponse::backend_failure());
    }

    #[tokio::test]
    async fn stalled_lock_times_out() {
        let engine = engine();

        let turn = engine
            .handle_intent(Some(&StallingLock), "StartGame", &Slots::default(), None)
            .await;

        assert_eq!(turn.session, SessionState::default());
        assert_eq!(turn.response, SpeechResponse::backend_failure());
    }

    #[tokio::test]
    async fn missing_lock_backend_is_a_backend_failure() {
        let engine = engine();

        let turn = engine
            .handle_intent(None, "Help", &Slots::default(), None)
            .await;

        assert_eq!(turn.response, SpeechResponse::backend_failure());
    }

    #[tokio::test]
    async fn intents_without_lock_access_work_while_degraded() {
        let engine = engine();

        let turn = engine
            .handle_intent(None, "ListCategories", &Slots::default(), None)
            .await;

        assert!(turn.response.speech.starts_with("The available categories are"));
        assert_eq!(turn.session.status, GameStatus::Running);
    }

    #[tokio::test]
    async fn lost_acquire_race_reports_running_game() {
        let engine = engine();
        let lock = RacingLock::default();

        let turn = engine
            .handle_intent(Some(&lock), "StartGame", &Slots::default(), None)
            .await;

        assert_eq!(lock.acquire_attempts.load(Ordering::SeqCst), 1);
        assert_eq!(turn.session.status, GameStatus::CancelPending);
        assert!(turn.response.speech.contains("already running"));
    }

    #[tokio::test]
    async fn unknown_intent_asks_to_clarify_without_touching_state() {
        let engine = engine();
        let previous = SessionState {
            status: GameStatus::Running,
            ..SessionState::default()
        };

        let turn = engine
            .handle_intent(
                Some(&FailingLock),
                "DanceIntent",
                &Slots::default(),
                Some(previous.clone()),
            )
            .await;

        assert_eq!(turn.session, previous);
        assert!(turn.response.speech.contains("didn't understand"));
    }
}
