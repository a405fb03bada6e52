//! JSquared Core - Event dispatch
//!
//! Priority-ordered listener sets that tolerate being mutated by their own
//! listeners, and the page lifecycle built on them.
//!
//! # Example
//! ```rust
//! use j2_core::{Dispatcher, Listener, Priority};
//!
//! let clicks: Dispatcher<u32> = Dispatcher::new();
//! clicks.listen_at(Listener::new(|_, count: &mut u32| *count += 1), Priority(100));
//! let handler = clicks.listen(Listener::new(|_, count: &mut u32| *count > 0));
//!
//! let mut count = 0;
//! assert!(clicks.fire(&mut count).unwrap());
//! clicks.remove_listener(&handler);
//! ```

mod config;
mod dispatcher;
mod error;
mod listener;
mod priority;
pub mod lifecycle;

pub use config::{DispatcherConfig, LifecycleConfig, Reentrancy};
pub use dispatcher::{DispatchState, Dispatcher};
pub use error::{BoxError, DispatchError, Result};
pub use lifecycle::{PageEvent, PageLifecycle, Phase, ReadyState};
pub use listener::{Context, DispatcherId, Listener, Verdict};
pub use priority::{Priority, PriorityIndexes};
