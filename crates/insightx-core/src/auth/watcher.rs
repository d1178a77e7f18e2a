use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::store::{SessionEndReason, TokenStore};

/// Periodically ends the session once the stored access token has expired.
///
/// Created once by the application and driven explicitly with `start()` and
/// `stop()`. Front ends should also call `check_now()` whenever the user comes
/// back to the application.
pub struct ExpiryWatcher {
    store: TokenStore,
    period: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ExpiryWatcher {
    pub fn new(store: TokenStore, period: Duration) -> Self {
        Self {
            store,
            period,
            task: Mutex::new(None),
        }
    }

    /// Check the stored access token right away.
    ///
    /// Returns `false` if the token was expired and the session was ended,
    /// `true` otherwise (including when no one is logged in).
    pub fn check_now(&self) -> bool {
        check_store(&self.store)
    }

    /// Spawn the periodic check. Must be called from within a tokio runtime.
    /// Calling it while already running does nothing.
    pub fn start(&self) {
        let Ok(mut task) = self.task.lock() else {
            warn!("Expiry watcher state poisoned, not starting");
            return;
        };
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let store = self.store.clone();
        let period = self.period;
        *task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                check_store(&store);
            }
        }));
        debug!(period_secs = period.as_secs(), "Expiry watcher started");
    }

    /// Stop the periodic check. Safe to call when not running.
    pub fn stop(&self) {
        let Ok(mut task) = self.task.lock() else {
            return;
        };
        if let Some(handle) = task.take() {
            handle.abort();
            debug!("Expiry watcher stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .map(|task| task.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }
}

impl Drop for ExpiryWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn check_store(store: &TokenStore) -> bool {
    match store.get_access_token() {
        Some(token) if store.is_access_token_expired(&token) => {
            warn!("Access token expired, ending session");
            store.end_session(SessionEndReason::Expired);
            false
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::tests::make_token;
    use crate::auth::SessionEvent;
    use chrono::{Duration as ChronoDuration, Utc};

    #[test]
    fn test_check_now_keeps_live_session() {
        let store = TokenStore::in_memory();
        store.save(&make_token(Utc::now() + ChronoDuration::hours(1)), Some("R1"), None);
        let watcher = ExpiryWatcher::new(store.clone(), Duration::from_secs(300));

        assert!(watcher.check_now());
        assert!(store.get_access_token().is_some());
    }

    #[test]
    fn test_check_now_without_session() {
        let watcher = ExpiryWatcher::new(TokenStore::in_memory(), Duration::from_secs(300));
        assert!(watcher.check_now());
    }

    #[test]
    fn test_check_now_ends_expired_session() {
        let store = TokenStore::in_memory();
        let mut events = store.subscribe();
        store.save(&make_token(Utc::now() - ChronoDuration::minutes(5)), Some("R1"), None);
        let watcher = ExpiryWatcher::new(store.clone(), Duration::from_secs(300));

        assert!(!watcher.check_now());
        assert_eq!(store.get_access_token(), None);
        assert_eq!(store.get_refresh_token(), None);
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Ended(SessionEndReason::Expired)
        );
    }

    #[tokio::test]
    async fn test_periodic_check_ends_expired_session() {
        let store = TokenStore::in_memory();
        store.save(&make_token(Utc::now() - ChronoDuration::minutes(5)), None, None);
        let watcher = ExpiryWatcher::new(store.clone(), Duration::from_millis(10));

        watcher.start();
        assert!(watcher.is_running());
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(store.get_access_token(), None);
        watcher.stop();
        assert!(!watcher.is_running());
    }

    #[tokio::test]
    async fn test_start_and_stop_are_idempotent() {
        let watcher = ExpiryWatcher::new(TokenStore::in_memory(), Duration::from_secs(300));
        watcher.start();
        watcher.start();
        assert!(watcher.is_running());
        watcher.stop();
        watcher.stop();
        assert!(!watcher.is_running());
    }
}
