//! Page lifecycle
//!
//! Owns the load and DOM-ready dispatchers of one page. Each phase fires at
//! most once; registering for a phase that has already completed fails.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::config::LifecycleConfig;
use crate::{DispatchError, Dispatcher, Listener, Priority, PriorityIndexes, Result};

/// Priority at which ready is chained onto load when the host has no
/// `DOMContentLoaded`
const READY_ON_LOAD_PRIORITY: Priority = Priority(1000);

/// Lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// DOM is parsed and may be scripted
    Ready,
    /// Page and subresources have loaded
    Load,
}

impl Phase {
    /// Phase a window event type subscribes to, if it names one
    pub fn from_event_type(ty: &str) -> Option<Phase> {
        match ty.trim().to_ascii_lowercase().as_str() {
            "load" => Some(Phase::Load),
            "domcontentloaded" | "domready" => Some(Phase::Ready),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Ready => f.write_str("ready"),
            Phase::Load => f.write_str("load"),
        }
    }
}

/// `document.readyState` as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Uninitialized,
    Loading,
    Loaded,
    Interactive,
    Complete,
}

impl ReadyState {
    /// States the ready poll treats as "DOM available"
    pub fn is_ready(self) -> bool {
        matches!(self, ReadyState::Loaded | ReadyState::Complete)
    }
}

impl FromStr for ReadyState {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uninitialized" => Ok(ReadyState::Uninitialized),
            "loading" => Ok(ReadyState::Loading),
            "loaded" => Ok(ReadyState::Loaded),
            "interactive" => Ok(ReadyState::Interactive),
            "complete" => Ok(ReadyState::Complete),
            other => Err(DispatchError::InvalidArgument(format!(
                "unknown ready state: {:?}",
                other
            ))),
        }
    }
}

/// Payload of lifecycle dispatches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEvent {
    pub phase: Phase,
    /// Document state that triggered the phase, when it came from a poll
    pub ready_state: Option<ReadyState>,
}

impl PageEvent {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            ready_state: None,
        }
    }
}

/// A dispatcher that fires once
#[derive(Clone)]
struct OnceDispatcher {
    phase: Phase,
    dispatcher: Dispatcher<PageEvent>,
    fired: Rc<Cell<bool>>,
}

impl OnceDispatcher {
    fn new(phase: Phase, config: &LifecycleConfig) -> Self {
        Self {
            phase,
            dispatcher: Dispatcher::with_config(config.dispatcher.clone()),
            fired: Rc::new(Cell::new(false)),
        }
    }

    fn listen(&self, listener: Listener<PageEvent>, priority: Option<Priority>) -> Result<Listener<PageEvent>> {
        if self.fired.get() {
            return Err(DispatchError::PhaseComplete(self.phase));
        }
        Ok(self.dispatcher.listen_with(listener, None, priority))
    }

    /// Fire unless already fired. `None` means nothing ran.
    fn fire(&self, ready_state: Option<ReadyState>) -> Result<Option<bool>> {
        if self.fired.replace(true) {
            return Ok(None);
        }
        tracing::debug!("Page {} phase firing", self.phase);
        let mut event = PageEvent {
            phase: self.phase,
            ready_state,
        };
        self.dispatcher.fire(&mut event).map(Some)
    }
}

/// Load and ready dispatchers of one page
pub struct PageLifecycle {
    config: LifecycleConfig,
    load: OnceDispatcher,
    ready: OnceDispatcher,
}

impl PageLifecycle {
    pub fn new(config: LifecycleConfig) -> Self {
        let load = OnceDispatcher::new(Phase::Load, &config);
        let ready = OnceDispatcher::new(Phase::Ready, &config);

        if !config.content_loaded_supported {
            tracing::debug!("No DOMContentLoaded, chaining ready onto load");
            let chained = ready.clone();
            load.dispatcher.listen_at(
                Listener::fallible(move |_, _: &mut PageEvent| {
                    chained.fire(None).map(|ran| ran.unwrap_or(true))
                }),
                READY_ON_LOAD_PRIORITY,
            );
        }

        Self { config, load, ready }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Subscribe to the load phase
    pub fn on_load(&self, listener: Listener<PageEvent>, priority: Option<Priority>) -> Result<Listener<PageEvent>> {
        self.load.listen(listener, priority)
    }

    /// Subscribe to the ready phase
    pub fn on_ready(&self, listener: Listener<PageEvent>, priority: Option<Priority>) -> Result<Listener<PageEvent>> {
        self.ready.listen(listener, priority)
    }

    /// Subscribe to `phase`
    pub fn on_phase(&self, phase: Phase, listener: Listener<PageEvent>, priority: Option<Priority>) -> Result<Listener<PageEvent>> {
        match phase {
            Phase::Load => self.on_load(listener, priority),
            Phase::Ready => self.on_ready(listener, priority),
        }
    }

    /// Subscribe by window event type: `load`, or `domcontentloaded` and
    /// `domready` for the ready phase. Other types are not lifecycle events
    /// and are rejected.
    pub fn add_event(&self, ty: &str, listener: Listener<PageEvent>, priority: Option<Priority>) -> Result<Listener<PageEvent>> {
        match Phase::from_event_type(ty) {
            Some(phase) => self.on_phase(phase, listener, priority),
            None => Err(DispatchError::InvalidArgument(format!(
                "{:?} is not a page lifecycle event",
                ty
            ))),
        }
    }

    /// Take over an `onload` handler the page installed before us.
    ///
    /// It runs ahead of everything registered at conventional priorities.
    pub fn adopt_inline_onload(&self, listener: Listener<PageEvent>) -> Result<Listener<PageEvent>> {
        let priority = self.load.dispatcher.indexes().first();
        self.load.listen(listener, Some(priority))
    }

    pub fn remove_load_listener(&self, listener: &Listener<PageEvent>) {
        self.load.dispatcher.remove_listener(listener);
    }

    pub fn remove_ready_listener(&self, listener: &Listener<PageEvent>) {
        self.ready.dispatcher.remove_listener(listener);
    }

    pub fn load_indexes(&self) -> &PriorityIndexes {
        self.load.dispatcher.indexes()
    }

    pub fn ready_indexes(&self) -> &PriorityIndexes {
        self.ready.dispatcher.indexes()
    }

    /// Host reported the window load event.
    ///
    /// Returns the dispatch result, or `true` if load already fired.
    pub fn handle_load(&self) -> Result<bool> {
        Ok(self.load.fire(None)?.unwrap_or(true))
    }

    /// Host reported `DOMContentLoaded`.
    ///
    /// Returns the dispatch result, or `true` if ready already fired.
    pub fn handle_content_loaded(&self) -> Result<bool> {
        Ok(self.ready.fire(None)?.unwrap_or(true))
    }

    /// Timer poll of `document.readyState`.
    ///
    /// Returns whether this call fired the ready phase.
    pub fn poll_ready_state(&self, state: ReadyState) -> Result<bool> {
        if !state.is_ready() {
            return Ok(false);
        }
        Ok(self.ready.fire(Some(state))?.is_some())
    }

    pub fn is_loaded(&self) -> bool {
        self.load.fired.get()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.fired.get()
    }
}

impl Default for PageLifecycle {
    fn default() -> Self {
        Self::new(LifecycleConfig::default())
    }
}

impl fmt::Debug for PageLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageLifecycle")
            .field("config", &self.config)
            .field("ready", &self.is_ready())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
