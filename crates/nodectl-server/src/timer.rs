//! Named one-shot timers for deferred command work.
//!
//! Timers are created by a pluggable [`TimerBackend`]. At most one timer is
//! pending per name; scheduling under a taken name cancels the old timer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{Result, ServerError};

pub type TimerAction = Box<dyn FnOnce() + Send + 'static>;

/// A pending timer. Dropping the handle must also cancel the timer.
pub trait TimerHandle: Send {
    fn cancel(&mut self);
}

/// Factory for timers.
pub trait TimerBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Arrange for `action` to run once after `delay`.
    fn new_timer(&self, action: TimerAction, delay: Duration) -> Box<dyn TimerHandle>;
}

#[derive(Default)]
pub struct DeferredTimers {
    backend: RwLock<Option<Arc<dyn TimerBackend>>>,
    pending: Mutex<HashMap<String, Box<dyn TimerHandle>>>,
}

impl DeferredTimers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` after `delay_secs` seconds, replacing any timer pending
    /// under `name`.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::NoTimerBackend` if no backend is installed.
    pub fn run_later(&self, name: &str, action: TimerAction, delay_secs: u64) -> Result<()> {
        let backend = self
            .backend
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ServerError::NoTimerBackend)?;

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut old) = pending.remove(name) {
            old.cancel();
        }
        debug!(
            "Scheduling timer {} in {}s via {}",
            name,
            delay_secs,
            backend.name()
        );
        let handle = backend.new_timer(action, Duration::from_secs(delay_secs));
        pending.insert(name.to_string(), handle);
        Ok(())
    }

    /// Cancel every pending timer.
    pub fn clear(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        for (name, mut handle) in pending.drain() {
            debug!("Cancelling timer {}", name);
            handle.cancel();
        }
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Install `backend`, replacing any current one.
    pub fn set_backend(&self, backend: Arc<dyn TimerBackend>) {
        debug!("Timer backend set to {}", backend.name());
        *self.backend.write().unwrap_or_else(PoisonError::into_inner) = Some(backend);
    }

    /// Install `backend` only if none is installed. Returns whether it was.
    pub fn set_backend_if_unset(&self, backend: Arc<dyn TimerBackend>) -> bool {
        let mut slot = self.backend.write().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        debug!("Timer backend set to {}", backend.name());
        *slot = Some(backend);
        true
    }

    /// Remove `backend` if it is the one installed. Returns whether it was.
    pub fn unset_backend(&self, backend: &Arc<dyn TimerBackend>) -> bool {
        let mut slot = self.backend.write().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(current) if Arc::ptr_eq(current, backend) => {
                debug!("Timer backend {} removed", backend.name());
                *slot = None;
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn has_backend(&self) -> bool {
        self.backend
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Timer backend that sleeps on a tokio runtime.
pub struct TokioTimerBackend {
    runtime: Handle,
}

impl TokioTimerBackend {
    #[must_use]
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }
}

impl TimerBackend for TokioTimerBackend {
    fn name(&self) -> &'static str {
        "tokio"
    }

    fn new_timer(&self, action: TimerAction, delay: Duration) -> Box<dyn TimerHandle> {
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        });
        Box::new(TokioTimer { task })
    }
}

struct TokioTimer {
    task: JoinHandle<()>,
}

impl TimerHandle for TokioTimer {
    fn cancel(&mut self) {
        self.task.abort();
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
