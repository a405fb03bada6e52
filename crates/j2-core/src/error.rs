//! Dispatch errors

use crate::Priority;
use crate::lifecycle::Phase;

/// Error type listeners may fail with
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias for dispatcher operations
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Dispatcher error
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Listener at priority {priority} failed: {source}")]
    Listener {
        priority: Priority,
        #[source]
        source: BoxError,
    },

    #[error("Re-entrant fire rejected")]
    Reentrant,

    #[error("{0} phase has already completed")]
    PhaseComplete(Phase),
}

impl DispatchError {
    /// Check if this error came out of a listener callback
    pub fn is_listener_failure(&self) -> bool {
        matches!(self, DispatchError::Listener { .. })
    }
}
