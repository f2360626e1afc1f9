//! Cooperative cancellation for long-running backtests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop flag checked by the engine between bars.
///
/// Cloning the token shares the flag, so a caller can keep one half and
/// hand the other to the engine (or to a whole batch of engines).
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let shared = token.clone();
        assert!(!shared.is_cancelled());

        token.cancel();
        assert!(shared.is_cancelled());
    }
}
