//! Dispatcher and lifecycle configuration

use crate::Priority;

/// What a nested `fire` on an already firing dispatcher does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reentrancy {
    /// Run a full nested pass over the current live listeners
    #[default]
    Allow,
    /// Fail the nested call with `DispatchError::Reentrant`
    Reject,
}

/// Dispatcher configuration options
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Priority given to listeners registered without one
    pub default_priority: Priority,

    /// Nested fire policy
    pub reentrancy: Reentrancy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            default_priority: Priority::DEFAULT,
            reentrancy: Reentrancy::Allow,
        }
    }
}

/// Page lifecycle configuration options
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Host raises `DOMContentLoaded`. Without it, ready is chained onto load.
    pub content_loaded_supported: bool,

    /// Configuration shared by the load and ready dispatchers
    pub dispatcher: DispatcherConfig,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            content_loaded_supported: true,
            dispatcher: DispatcherConfig::default(),
        }
    }
}
