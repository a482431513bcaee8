//! Lifecycle hooks for long-running studies
//!
//! The ensemble seeker polls a hook between units of work so a caller can
//! abort a search from another thread. Polling happens on the orchestrating
//! thread only; worker threads never observe the hook directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation hook consumed by the search loops.
pub trait StudyHooks: Send + Sync {
    /// True when the study should abort at the next poll point.
    fn should_cancel(&self) -> bool;
}

/// Hook that never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl StudyHooks for NoopHooks {
    fn should_cancel(&self) -> bool {
        false
    }
}

/// Shared flag for cooperative cancellation.
///
/// Clones observe the same underlying flag, so one clone can be handed to a
/// seeker while another stays with the caller.
#[derive(Debug, Default, Clone)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; every clone observes it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl StudyHooks for CancelFlag {
    fn should_cancel(&self) -> bool {
        self.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_never_cancels() {
        let hooks = NoopHooks;
        assert!(!hooks.should_cancel());
    }

    #[test]
    fn test_cancel_flag_shared_across_clones() {
        let flag = CancelFlag::new();
        let observer = flag.clone();
        assert!(!observer.should_cancel());
        flag.cancel();
        assert!(observer.should_cancel());
        assert!(flag.is_cancelled());
    }
}
