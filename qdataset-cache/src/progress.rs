/// Receives progress notices while a caller waits on or performs a load.
///
/// Every method has an empty default, so implementors override only what
/// they display.
pub trait ProgressMonitor: Send + Sync {
    fn started(&self) {}

    fn set_progress_message(&self, message: &str) {
        let _ = message;
    }

    fn finished(&self) {}
}

/// A monitor that ignores every notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgressMonitor;

impl ProgressMonitor for NullProgressMonitor {}
