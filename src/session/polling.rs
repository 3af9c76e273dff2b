//! Handle to the periodic discovery task.

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Owns at most one polling task.
///
/// Installing a new task aborts the previous one, and dropping the
/// poller aborts whatever is running.
#[derive(Debug, Default)]
pub(crate) struct Poller {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Poller {
    /// Installs `handle`, aborting any previous task. Returns true if one
    /// was replaced.
    pub fn replace(&self, handle: JoinHandle<()>) -> bool {
        match self.handle.lock().replace(handle) {
            Some(previous) => {
                previous.abort();
                true
            }
            None => false,
        }
    }

    /// Aborts the running task. Returns false if nothing was running.
    pub fn stop(&self) -> bool {
        match self.handle.lock().take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}
