//! Delegated handlers
//!
//! A delegate sits on an ancestor and runs its handler only for events whose
//! source passes a check. `mouseenter`/`mouseleave` are built on this: a
//! `mouseover`/`mouseout` counts only when the pointer came from, or went to,
//! outside the handling node.

use std::rc::Rc;

use j2_core::{Listener, Priority, Verdict};

use crate::binding::BoundNode;
use crate::{DomEvent, EventListener, NodeId, Result, context_node};

/// Decides whether a delegate handles an event. Receives the event and the
/// node the delegate is installed on.
pub type DelegateCheck = Rc<dyn Fn(&DomEvent, NodeId) -> bool>;

/// Delegates run ahead of ordinary listeners unless told otherwise
const DELEGATE_PRIORITY: Priority = Priority(1000);

/// A wrapper listener installed on behalf of a caller's handler
#[derive(Debug)]
pub(crate) struct Wrapped {
    /// Type the caller asked for
    pub(crate) requested: String,
    /// Type whose dispatcher holds the wrapper
    pub(crate) installed_on: String,
    pub(crate) handler: EventListener,
    pub(crate) wrapper: EventListener,
}

/// Native type emulated hover events are delegated from
pub(crate) fn hover_base(ty: &str) -> Option<&'static str> {
    match ty {
        "mouseenter" => Some("mouseover"),
        "mouseleave" => Some("mouseout"),
        _ => None,
    }
}

/// Accept moves that cross the boundary of the handling node
pub(crate) fn hover_check() -> DelegateCheck {
    Rc::new(|event: &DomEvent, node: NodeId| !event.related_within(node))
}

fn delegate_listener(check: DelegateCheck, handler: EventListener) -> EventListener {
    Listener::fallible(move |ctx, event: &mut DomEvent| match context_node(ctx) {
        Some(node) if check(event, node) => handler.call(ctx, event),
        _ => Ok(Verdict::Continue),
    })
}

impl BoundNode {
    /// Run `handler` for `ty` events whose source passes `check`.
    ///
    /// Returns `handler`; pass it to `remove_event` with the same type to
    /// remove the delegate.
    pub fn add_delegate(
        &mut self,
        ty: &str,
        check: DelegateCheck,
        handler: EventListener,
        priority: Option<Priority>,
    ) -> Result<EventListener> {
        let ty = ty.trim().to_ascii_lowercase();
        if ty.is_empty() {
            return Err(crate::DomError::InvalidArgument("empty event type".into()));
        }
        self.install_delegate(&ty, &ty, check, handler.clone(), priority);
        Ok(handler)
    }

    pub(crate) fn install_delegate(
        &mut self,
        requested: &str,
        installed_on: &str,
        check: DelegateCheck,
        handler: EventListener,
        priority: Option<Priority>,
    ) {
        let wrapper = delegate_listener(check, handler.clone());
        let context = self.context();
        self.events_for(installed_on).listen_with(
            wrapper.clone(),
            Some(context),
            Some(priority.unwrap_or(DELEGATE_PRIORITY)),
        );
        self.wrapped.push(Wrapped {
            requested: requested.to_string(),
            installed_on: installed_on.to_string(),
            handler,
            wrapper,
        });
    }
}
