//! Priority-ordered event dispatcher
//!
//! A [`Dispatcher`] holds the listeners for one named occurrence and invokes
//! them highest priority first when the occurrence fires.
//!
//! Listeners may register or remove listeners on the dispatcher that is
//! currently invoking them. While a dispatch is in progress:
//! - additions go to a pending buffer and join the live set only after the
//!   outermost `fire` returns, so they never run in the cycle that added them;
//! - removals tombstone the live entry. The cycle iterates a snapshot taken
//!   before the first callback ran, so a tombstoned listener may still run
//!   once more in that cycle, and never again. Nested `fire` calls skip it.
//!
//! Reconciliation (purging tombstones, appending pending additions) is tied
//! to a scope guard, so it also happens when a listener fails or panics.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::config::{DispatcherConfig, Reentrancy};
use crate::listener::{Context, DispatcherId, Listener, Verdict};
use crate::priority::{Priority, PriorityIndexes};
use crate::{DispatchError, Result};

/// Dispatcher state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Firing,
}

/// One listener subscription
struct Registration<A> {
    listener: Listener<A>,
    context: Context,
    priority: Priority,
    removed: bool,
}

struct State<A> {
    live: Vec<Registration<A>>,
    pending: Vec<Registration<A>>,
    /// Nesting depth of `fire` calls; non-zero means firing
    depth: usize,
    removals: bool,
}

impl<A> State<A> {
    fn reconcile(&mut self) {
        if self.removals {
            self.live.retain(|r| !r.removed);
            self.removals = false;
        }
        if !self.pending.is_empty() {
            self.live.append(&mut self.pending);
        }
    }
}

struct Inner<A> {
    id: DispatcherId,
    config: DispatcherConfig,
    indexes: PriorityIndexes,
    state: RefCell<State<A>>,
}

/// Handle to a priority-ordered listener set.
///
/// Clones share the same listeners.
pub struct Dispatcher<A> {
    inner: Rc<Inner<A>>,
}

/// Leaves the firing state when dropped
struct FiringGuard<'a, A> {
    inner: &'a Inner<A>,
}

impl<A> Drop for FiringGuard<'_, A> {
    fn drop(&mut self) {
        // Never panic here: this runs while unwinding out of a listener.
        let Ok(mut state) = self.inner.state.try_borrow_mut() else {
            return;
        };
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            let (removed, added) = (
                state.live.iter().filter(|r| r.removed).count(),
                state.pending.len(),
            );
            state.reconcile();
            if removed > 0 || added > 0 {
                tracing::trace!(
                    "Dispatcher {:?} reconciled: -{} +{}",
                    self.inner.id,
                    removed,
                    added
                );
            }
        }
    }
}

impl<A> Dispatcher<A> {
    /// Create a dispatcher with default configuration
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// Create a dispatcher with the given configuration
    pub fn with_config(config: DispatcherConfig) -> Self {
        Self {
            inner: Rc::new(Inner {
                id: DispatcherId::next(),
                config,
                indexes: PriorityIndexes::new(),
                state: RefCell::new(State {
                    live: Vec::new(),
                    pending: Vec::new(),
                    depth: 0,
                    removals: false,
                }),
            }),
        }
    }

    pub fn id(&self) -> DispatcherId {
        self.inner.id
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }

    /// First/last priority cursors owned by this dispatcher
    pub fn indexes(&self) -> &PriorityIndexes {
        &self.inner.indexes
    }

    /// Subscribe with the dispatcher as context and the default priority
    pub fn listen(&self, listener: Listener<A>) -> Listener<A> {
        self.listen_with(listener, None, None)
    }

    /// Subscribe at the given priority
    pub fn listen_at(&self, listener: Listener<A>, priority: Priority) -> Listener<A> {
        self.listen_with(listener, None, Some(priority))
    }

    /// Subscribe with an explicit context and/or priority.
    ///
    /// Returns the listener so the caller can keep it for removal.
    pub fn listen_with(
        &self,
        listener: Listener<A>,
        context: Option<Context>,
        priority: Option<Priority>,
    ) -> Listener<A> {
        let registration = Registration {
            listener: listener.clone(),
            context: context.unwrap_or(Context::Dispatcher(self.inner.id)),
            priority: priority.unwrap_or(self.inner.config.default_priority),
            removed: false,
        };

        let mut state = self.inner.state.borrow_mut();
        if state.depth > 0 {
            tracing::trace!(
                "Dispatcher {:?} buffering listener at priority {}",
                self.inner.id,
                registration.priority
            );
            state.pending.push(registration);
        } else {
            state.live.push(registration);
        }
        listener
    }

    /// Remove every registration of `listener`. No-op if it is not registered.
    pub fn remove_listener(&self, listener: &Listener<A>) {
        let mut state = self.inner.state.borrow_mut();
        if state.depth > 0 {
            let mut marked = false;
            for r in state.live.iter_mut().filter(|r| r.listener.ptr_eq(listener)) {
                r.removed = true;
                marked = true;
            }
            if marked {
                tracing::trace!("Dispatcher {:?} tombstoned {:?}", self.inner.id, listener);
                state.removals = true;
            }
            state.pending.retain(|r| !r.listener.ptr_eq(listener));
        } else {
            state.live.retain(|r| !r.listener.ptr_eq(listener));
        }
    }

    /// Remove every registration
    pub fn remove_all_listeners(&self) {
        let mut state = self.inner.state.borrow_mut();
        if state.depth > 0 {
            for r in state.live.iter_mut() {
                r.removed = true;
            }
            state.removals = !state.live.is_empty();
            state.pending.clear();
        } else {
            state.live.clear();
        }
    }

    /// Invoke every live listener, highest priority first.
    ///
    /// Returns `Ok(false)` if any listener returned [`Verdict::PreventDefault`],
    /// `Ok(true)` otherwise (including when there are no listeners). A failing
    /// listener aborts the remaining invocations.
    pub fn fire(&self, args: &mut A) -> Result<bool> {
        let snapshot: Vec<(Listener<A>, Context, Priority)> = {
            let mut state = self.inner.state.borrow_mut();
            if state.depth > 0 && self.inner.config.reentrancy == Reentrancy::Reject {
                return Err(DispatchError::Reentrant);
            }
            state.depth += 1;
            // Stable: equal priorities keep registration order.
            state.live.sort_by(|a, b| b.priority.cmp(&a.priority));
            state
                .live
                .iter()
                .filter(|r| !r.removed)
                .map(|r| (r.listener.clone(), r.context.clone(), r.priority))
                .collect()
        };
        let _firing = FiringGuard { inner: &self.inner };

        tracing::trace!(
            "Dispatcher {:?} firing {} listeners",
            self.inner.id,
            snapshot.len()
        );

        let mut result = true;
        for (listener, context, priority) in &snapshot {
            match listener.call(context, args) {
                Ok(Verdict::Continue) => {}
                Ok(Verdict::PreventDefault) => result = false,
                Err(source) => {
                    tracing::debug!(
                        "Dispatcher {:?} listener at priority {} failed: {}",
                        self.inner.id,
                        priority,
                        source
                    );
                    return Err(DispatchError::Listener {
                        priority: *priority,
                        source,
                    });
                }
            }
        }
        Ok(result)
    }

    pub fn state(&self) -> DispatchState {
        if self.is_firing() {
            DispatchState::Firing
        } else {
            DispatchState::Idle
        }
    }

    pub fn is_firing(&self) -> bool {
        self.inner.state.borrow().depth > 0
    }

    /// Live registrations, not counting tombstoned or pending ones
    pub fn len(&self) -> usize {
        self.inner.state.borrow().live.iter().filter(|r| !r.removed).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.pending_len() == 0
    }

    /// Registrations buffered by the dispatch in progress
    pub fn pending_len(&self) -> usize {
        self.inner.state.borrow().pending.len()
    }

    /// Check if `listener` is registered and not tombstoned
    pub fn contains(&self, listener: &Listener<A>) -> bool {
        let state = self.inner.state.borrow();
        state
            .live
            .iter()
            .any(|r| !r.removed && r.listener.ptr_eq(listener))
            || state.pending.iter().any(|r| r.listener.ptr_eq(listener))
    }
}

impl<A> Clone for Dispatcher<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A> Default for Dispatcher<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for Dispatcher<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Dispatcher")
            .field("id", &self.inner.id)
            .field("live", &state.live.len())
            .field("pending", &state.pending.len())
            .field("depth", &state.depth)
            .finish()
    }
}
