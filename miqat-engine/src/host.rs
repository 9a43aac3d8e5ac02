//! Host-facing primitives: the wake-up scheduler contract, its tokio-backed
//! implementation, and the timeout guard for cross-context requests.

use crate::common::REQUEST_TIMEOUT;
use crate::error::RequestError;
use crate::events::WakeEvent;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

/// The host's wall-clock wake facility.
///
/// Triggers are identified by a logical name. Registering under a name that
/// already has a trigger replaces it, so two concurrent triggers can never
/// share a name.
pub trait HostScheduler: Send + Sync {
    /// Wakes once after `initial_delay`, then every `period` thereafter.
    fn schedule_repeating(&self, name: &str, initial_delay: Duration, period: Duration);

    /// Cancels the named trigger. A no-op when nothing is registered.
    fn cancel(&self, name: &str);

    /// Subscribes to wake-ups from every trigger this scheduler owns.
    fn subscribe_wakes(&self) -> broadcast::Receiver<WakeEvent>;
}

/// Tokio-task-backed implementation of [`HostScheduler`].
///
/// Each registered trigger is one spawned task; replacing or cancelling a
/// registration aborts the task.
pub struct TokioScheduler {
    wake_sender: broadcast::Sender<WakeEvent>,
    alarms: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        let (wake_sender, _) = broadcast::channel(64);
        Self {
            wake_sender,
            alarms: Mutex::new(HashMap::new()),
        }
    }

    /// Number of live triggers. A name registered twice counts once.
    pub fn active_alarms(&self) -> usize {
        self.alarms.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl HostScheduler for TokioScheduler {
    fn schedule_repeating(&self, name: &str, initial_delay: Duration, period: Duration) {
        let sender = self.wake_sender.clone();
        let wake_name = name.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(initial_delay).await;
            loop {
                sender
                    .send(WakeEvent {
                        name: wake_name.clone(),
                        at: Utc::now(),
                    })
                    .ok();
                tokio::time::sleep(period).await;
            }
        });

        let mut alarms = self.alarms.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = alarms.insert(name.to_string(), handle) {
            previous.abort();
            debug!("alarm '{}' re-registered; previous instance cancelled", name);
        }
    }

    fn cancel(&self, name: &str) {
        let removed = self
            .alarms
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name);
        if let Some(handle) = removed {
            handle.abort();
        }
    }

    fn subscribe_wakes(&self) -> broadcast::Receiver<WakeEvent> {
        self.wake_sender.subscribe()
    }
}

/// Awaits a one-shot response from the other execution context, giving up
/// after the shared timeout.
pub async fn request_with_timeout<T>(rx: oneshot::Receiver<T>) -> Result<T, RequestError> {
    match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(_)) => Err(RequestError::Closed),
        Err(_) => Err(RequestError::TimedOut),
    }
}
