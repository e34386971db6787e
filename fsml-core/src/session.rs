//! Re-entrancy gate for live input.
//!
//! While one event is being processed the gate is `Processing`; input that
//! arrives in that window is refused rather than queued.

use parking_lot::Mutex;
use std::sync::Arc;

/// Session processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// Ready to accept the next event.
    #[default]
    Idle,
    /// An event's actions are still running.
    Processing,
}

/// Shared idle/processing flag.
#[derive(Debug, Clone, Default)]
pub struct SessionGate {
    status: Arc<Mutex<SessionStatus>>,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the gate to `Processing` if it is idle.
    ///
    /// Returns `None` when another event is still being processed. The gate
    /// returns to `Idle` when the guard is dropped.
    pub fn try_begin(&self) -> Option<GateGuard> {
        let mut status = self.status.lock();
        match *status {
            SessionStatus::Processing => None,
            SessionStatus::Idle => {
                *status = SessionStatus::Processing;
                Some(GateGuard {
                    status: Arc::clone(&self.status),
                })
            }
        }
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.lock()
    }

    pub fn is_idle(&self) -> bool {
        self.status() == SessionStatus::Idle
    }
}

/// Holds the gate in `Processing`.
#[derive(Debug)]
pub struct GateGuard {
    status: Arc<Mutex<SessionStatus>>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        *self.status.lock() = SessionStatus::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_refuses_while_processing() {
        let gate = SessionGate::new();
        assert!(gate.is_idle());

        let guard = gate.try_begin().unwrap();
        assert_eq!(gate.status(), SessionStatus::Processing);
        assert!(gate.try_begin().is_none());

        drop(guard);
        assert!(gate.is_idle());
        assert!(gate.try_begin().is_some());
    }

    #[test]
    fn test_clones_share_status() {
        let gate = SessionGate::new();
        let reader = gate.clone();

        let guard = gate.try_begin().unwrap();
        assert!(reader.try_begin().is_none());
        drop(guard);
        assert!(reader.is_idle());
    }

    #[test]
    fn test_guard_released_across_threads() {
        let gate = SessionGate::new();
        let guard = gate.try_begin().unwrap();

        std::thread::spawn(move || drop(guard)).join().unwrap();
        assert!(gate.is_idle());
    }
}
