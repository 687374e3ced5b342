//! Warmup gate shared by every dispatching task.

use std::sync::{Mutex, PoisonError};

use tracing::info;

const INITIAL_STATUS: &str = "RPC server started";

#[derive(Debug)]
struct WarmupState {
    in_warmup: bool,
    status: String,
}

/// Rejects dispatch until startup has finished.
#[derive(Debug)]
pub struct WarmupGate {
    state: Mutex<WarmupState>,
}

impl Default for WarmupGate {
    fn default() -> Self {
        Self::new()
    }
}

impl WarmupGate {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(WarmupState {
                in_warmup: true,
                status: INITIAL_STATUS.to_string(),
            }),
        }
    }

    /// Replace the status message reported to callers while warming up.
    pub fn set_status(&self, status: impl Into<String>) {
        let status = status.into();
        info!("Warmup: {}", status);
        self.lock().status = status;
    }

    /// Leave warmup.
    ///
    /// # Panics
    ///
    /// Panics if warmup has already finished. This is a startup sequencing
    /// bug, not a request error.
    pub fn finish(&self) {
        let mut state = self.lock();
        assert!(state.in_warmup, "warmup finished twice");
        state.in_warmup = false;
        info!("Warmup finished");
    }

    /// Current `(in_warmup, status)` pair.
    #[must_use]
    pub fn status(&self) -> (bool, String) {
        let state = self.lock();
        (state.in_warmup, state.status.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WarmupState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let gate = WarmupGate::new();
        assert_eq!(gate.status(), (true, "RPC server started".to_string()));
    }

    #[test]
    fn test_set_status_keeps_flag() {
        let gate = WarmupGate::new();
        gate.set_status("Loading block index");
        assert_eq!(gate.status(), (true, "Loading block index".to_string()));
    }

    #[test]
    fn test_finish() {
        let gate = WarmupGate::new();
        gate.set_status("Done loading");
        gate.finish();
        let (in_warmup, status) = gate.status();
        assert!(!in_warmup);
        assert_eq!(status, "Done loading");
    }

    #[test]
    #[should_panic(expected = "warmup finished twice")]
    fn test_double_finish_panics() {
        let gate = WarmupGate::new();
        gate.finish();
        gate.finish();
    }
}
