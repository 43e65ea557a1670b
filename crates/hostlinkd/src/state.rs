//! Process-wide peripheral-block flag shared by every session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One boolean visible to all sessions, flipped by the input-block command.
///
/// Toggling is an atomic XOR, so after N successful toggles the observable
/// state equals the parity of N regardless of which sessions issued them.
/// No further ordering is guaranteed across concurrent toggles.
#[derive(Debug, Clone, Default)]
pub struct SharedToggleState {
    flag: Arc<AtomicBool>,
}

impl SharedToggleState {
    /// Creates a new flag in the unblocked state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the flag and returns the new state.
    pub fn toggle(&self) -> bool {
        !self.flag.fetch_xor(true, Ordering::SeqCst)
    }

    /// Current state of the flag.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn toggle_reports_the_new_state() {
        let state = SharedToggleState::new();
        assert!(state.toggle());
        assert!(state.is_blocked());
        assert!(!state.toggle());
        assert!(!state.is_blocked());
    }

    #[test]
    fn concurrent_toggles_preserve_parity() {
        let state = SharedToggleState::new();
        let toggles_per_thread = 51usize;
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let state = state.clone();
                thread::spawn(move || {
                    for _ in 0..toggles_per_thread {
                        state.toggle();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("toggle thread");
        }
        // 4 * 51 toggles: even total, so the flag must be back where it started.
        assert!(!state.is_blocked());
    }
}
