//! "Capture in progress" flag with scoped acquisition.

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

/// Tracks whether any capture request is outstanding.
///
/// The flag is raised by [`CaptureIndicator::begin`] and lowered when the
/// last [`CaptureGuard`] drops, whichever way the capture ended.
#[derive(Debug)]
pub struct CaptureIndicator {
    active: AtomicUsize,
    tx: watch::Sender<bool>,
}

impl Default for CaptureIndicator {
    fn default() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            active: AtomicUsize::new(0),
            tx,
        }
    }
}

impl CaptureIndicator {
    /// Creates a lowered indicator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the indicator until the returned guard is dropped.
    pub fn begin(&self) -> CaptureGuard<'_> {
        // The count only changes under the watch lock, so it and the flag
        // move together.
        self.tx.send_if_modified(|raised| {
            let first = self.active.fetch_add(1, Ordering::Relaxed) == 0;
            let changed = first && !*raised;
            *raised = true;
            changed
        });
        CaptureGuard { indicator: self }
    }

    /// Whether a capture is outstanding.
    pub fn is_active(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receiver that observes every raise and lower.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Keeps the [`CaptureIndicator`] raised while alive.
#[derive(Debug)]
pub struct CaptureGuard<'a> {
    indicator: &'a CaptureIndicator,
}

impl Drop for CaptureGuard<'_> {
    fn drop(&mut self) {
        let active = &self.indicator.active;
        self.indicator.tx.send_if_modified(|raised| {
            let last = active.fetch_sub(1, Ordering::Relaxed) == 1;
            if last {
                *raised = false;
            }
            last
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_lowers_on_drop() {
        let indicator = CaptureIndicator::new();
        {
            let _guard = indicator.begin();
            assert!(indicator.is_active());
        }
        assert!(!indicator.is_active());
    }

    #[test]
    fn test_overlapping_guards() {
        let indicator = CaptureIndicator::new();
        let first = indicator.begin();
        let second = indicator.begin();

        drop(first);
        assert!(indicator.is_active());
        drop(second);
        assert!(!indicator.is_active());
    }

    #[test]
    fn test_lowered_after_early_return() {
        fn failing_capture(indicator: &CaptureIndicator) -> Result<(), &'static str> {
            let _guard = indicator.begin();
            let shutter: Result<(), &'static str> = Err("shutter jammed");
            shutter?;
            Ok(())
        }

        let indicator = CaptureIndicator::new();
        let mut rx = indicator.subscribe();

        assert!(failing_capture(&indicator).is_err());
        assert!(!indicator.is_active());
        assert!(rx.has_changed().unwrap());
        assert!(!*rx.borrow_and_update());
    }

    #[test]
    fn test_held_guard_survives_concurrent_captures() {
        let indicator = CaptureIndicator::new();
        let held = indicator.begin();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..10_000 {
                        let _guard = indicator.begin();
                        assert!(indicator.is_active());
                    }
                });
            }
        });

        assert!(indicator.is_active());
        drop(held);
        assert!(!indicator.is_active());
    }
}
