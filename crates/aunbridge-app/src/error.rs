//! Controller errors.

use aunbridge_core::ConfigError;
use thiserror::Error;

/// Errors from [`crate::Bridge`].
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration rejected before anything was torn down
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// `start` while the tasks are running
    #[error("bridge already running")]
    AlreadyRunning,

    /// `stop` while the tasks are stopped
    #[error("bridge not running")]
    NotRunning,

    /// An earlier task failure lost the link layer
    #[error("bridge cannot restart after a task failure")]
    Unavailable,

    /// A task panicked or was cancelled; the bridge cannot be restarted
    #[error("{task} task failed: {reason}")]
    TaskFailed {
        /// Which task
        task: &'static str,
        /// Join error text
        reason: String,
    },
}
