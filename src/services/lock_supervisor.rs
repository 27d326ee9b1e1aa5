use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{lock_store::GameLock, storage::StorageResult},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Exponential backoff between connection attempts.
#[derive(Debug)]
struct Backoff {
    current: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            current: INITIAL_DELAY,
        }
    }
}

impl Backoff {
    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(MAX_DELAY);
        delay
    }

    fn reset(&mut self) {
        self.current = INITIAL_DELAY;
    }
}

/// Connect the lock backend, keep it healthy, and hold the shared state in
/// degraded mode whenever it is unavailable. Never returns.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = StorageResult<Arc<dyn GameLock>>> + Send,
{
    let mut backoff = Backoff::default();

    loop {
        match connect().await {
            Ok(lock) => {
                state.install_lock_store(lock.clone()).await;
                info!("game lock backend connected; leaving degraded mode");
                backoff.reset();

                watch_health(&state, lock.as_ref()).await;

                state.clear_lock_store().await;
                warn!("exhausted game lock reconnect attempts; connecting from scratch");
            }
            Err(err) => warn!(error = %err, "game lock connection attempt failed"),
        }

        sleep(backoff.next_delay()).await;
    }
}

/// Poll the backend until it fails and cannot be brought back.
async fn watch_health(state: &SharedState, lock: &dyn GameLock) {
    loop {
        match lock.health_check().await {
            Ok(()) => {
                if state.is_degraded().await {
                    info!("game lock backend healthy again; leaving degraded mode");
                    state.update_degraded(false).await;
                }
            }
            Err(err) => {
                warn!(error = %err, "game lock health check failed; entering degraded mode");
                state.update_degraded(true).await;
                if !reconnect(lock).await {
                    return;
                }
                info!("game lock reconnection succeeded; leaving degraded mode");
                state.update_degraded(false).await;
            }
        }

        sleep(HEALTH_POLL_INTERVAL).await;
    }
}

async fn reconnect(lock: &dyn GameLock) -> bool {
    let mut backoff = Backoff::default();
    for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
        match lock.try_reconnect().await {
            Ok(()) => return true,
            Err(err) => {
                warn!(attempt, error = %err, "game lock reconnect attempt failed");
                sleep(backoff.next_delay()).await;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use futures::future;

    use super::*;
    use crate::{
        dao::{lock_store::MemoryGameLock, session_store::MemorySessionStore},
        state::{AppState, dialog::DialogEngine, question_bank::QuestionBank},
    };

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let mut backoff = Backoff::default();
        let delays: Vec<_> = (0..6).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 10, 10]);

        backoff.reset();
        assert_eq!(backoff.next_delay(), INITIAL_DELAY);
    }

    #[tokio::test]
    async fn installing_a_backend_leaves_degraded_mode() {
        let engine = DialogEngine::new(
            Arc::new(QuestionBank::builtin()),
            "blue",
            Duration::from_secs(1),
        );
        let state = AppState::new(engine, Arc::new(MemorySessionStore::new()));
        let mut degraded = state.degraded_watcher();

        let lock = MemoryGameLock::new();
        let task = tokio::spawn(run(state.clone(), move || {
            let lock: Arc<dyn GameLock> = Arc::new(lock.clone());
            future::ready(Ok(lock))
        }));

        tokio::time::timeout(Duration::from_secs(1), degraded.wait_for(|flag| !flag))
            .await
            .expect("supervisor never left degraded mode")
            .unwrap();
        assert!(state.lock_store().await.is_some());

        task.abort();
    }
}
