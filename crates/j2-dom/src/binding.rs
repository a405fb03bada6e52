//! Element event bindings
//!
//! A [`BoundNode`] is the event-capable view of one host node: it owns one
//! dispatcher per event type. [`ElementBindings`] keeps the bound nodes of a
//! document and routes bubbling between them.

use std::collections::HashMap;

use j2_core::{Context, Dispatcher, DispatcherConfig, Priority};

use crate::delegate::{self, DelegateCheck, Wrapped};
use crate::{DomError, DomEvent, EventListener, NodeId, NodeParents, RawEvent, Result, ScrollOffset};

/// Lower-case an event type, rejecting empty ones
fn event_type(ty: &str) -> Result<String> {
    let ty = ty.trim();
    if ty.is_empty() {
        return Err(DomError::InvalidArgument("empty event type".into()));
    }
    Ok(ty.to_ascii_lowercase())
}

/// Event tools for one node
#[derive(Debug)]
pub struct BoundNode {
    pub(crate) node: NodeId,
    pub(crate) config: DispatcherConfig,
    pub(crate) events: HashMap<String, Dispatcher<DomEvent>>,
    /// Handlers set before any dispatcher existed for their type
    pub(crate) inline: HashMap<String, EventListener>,
    pub(crate) wrapped: Vec<Wrapped>,
}

impl BoundNode {
    pub fn new(node: NodeId, config: DispatcherConfig) -> Self {
        Self {
            node,
            config,
            events: HashMap::new(),
            inline: HashMap::new(),
            wrapped: Vec::new(),
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Dispatcher for `ty`, if any listener was ever added for it
    pub fn dispatcher(&self, ty: &str) -> Option<&Dispatcher<DomEvent>> {
        self.events.get(&ty.to_ascii_lowercase())
    }

    /// Event types with a dispatcher
    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }

    pub(crate) fn context(&self) -> Context {
        Context::target(self.node)
    }

    /// Dispatcher for an already normalized type, created on first use.
    ///
    /// A stored inline handler joins a new dispatcher ahead of everything else.
    pub(crate) fn events_for(&mut self, ty: &str) -> &Dispatcher<DomEvent> {
        if !self.events.contains_key(ty) {
            let dispatcher = Dispatcher::with_config(self.config.clone());
            if let Some(inline) = self.inline.remove(ty) {
                dispatcher.listen_with(inline, Some(self.context()), Some(Priority::FIRST));
            }
            self.events.insert(ty.to_string(), dispatcher);
        }
        &self.events[ty]
    }

    /// Add a listener for `ty`.
    ///
    /// `mouseenter` and `mouseleave` are emulated with delegates on
    /// `mouseover` and `mouseout`.
    pub fn add_event(&mut self, ty: &str, listener: EventListener, priority: Option<Priority>) -> Result<EventListener> {
        let ty = event_type(ty)?;
        if let Some(base) = delegate::hover_base(&ty) {
            self.install_delegate(&ty, base, delegate::hover_check(), listener.clone(), priority);
            return Ok(listener);
        }
        let context = self.context();
        Ok(self.events_for(&ty).listen_with(listener, Some(context), priority))
    }

    /// Install the handler the host had in its `on<type>` slot
    pub fn set_inline_handler(&mut self, ty: &str, listener: EventListener) -> Result<()> {
        let ty = event_type(ty)?;
        let context = self.context();
        match self.events.get(&ty) {
            Some(dispatcher) => {
                dispatcher.listen_with(listener, Some(context), Some(Priority::FIRST));
            }
            None => {
                self.inline.insert(ty, listener);
            }
        }
        Ok(())
    }

    /// Remove `listener` from `ty`, including delegates wrapping it
    pub fn remove_event(&mut self, ty: &str, listener: &EventListener) {
        let ty = ty.trim().to_ascii_lowercase();
        if let Some(dispatcher) = self.events.get(&ty) {
            dispatcher.remove_listener(listener);
        }
        if self.inline.get(&ty).is_some_and(|inline| inline.ptr_eq(listener)) {
            self.inline.remove(&ty);
        }

        let events = &self.events;
        self.wrapped.retain(|w| {
            let matches = w.requested == ty && w.handler.ptr_eq(listener);
            if matches {
                if let Some(dispatcher) = events.get(&w.installed_on) {
                    dispatcher.remove_listener(&w.wrapper);
                }
            }
            !matches
        });
    }

    /// Remove every listener for `ty`
    pub fn remove_all_events(&mut self, ty: &str) {
        let ty = ty.trim().to_ascii_lowercase();
        if let Some(dispatcher) = self.events.get(&ty) {
            dispatcher.remove_all_listeners();
        }
        self.inline.remove(&ty);

        let events = &self.events;
        self.wrapped.retain(|w| {
            if w.installed_on == ty {
                return false;
            }
            if w.requested == ty {
                if let Some(dispatcher) = events.get(&w.installed_on) {
                    dispatcher.remove_listener(&w.wrapper);
                }
                return false;
            }
            true
        });
    }

    /// Drop every listener of every type
    pub fn purge(&mut self) {
        for dispatcher in self.events.values() {
            dispatcher.remove_all_listeners();
        }
        self.events.clear();
        self.inline.clear();
        self.wrapped.clear();
    }

    /// Run this node's listeners for `ty` only, without bubbling
    pub fn fire(&self, ty: &str, event: &mut DomEvent) -> Result<bool> {
        match self.dispatcher(ty) {
            Some(dispatcher) => Ok(dispatcher.fire(event)?),
            None => Ok(true),
        }
    }
}

/// Bound nodes of one document
#[derive(Debug, Default)]
pub struct ElementBindings {
    config: DispatcherConfig,
    nodes: HashMap<NodeId, BoundNode>,
}

impl ElementBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bindings whose dispatchers use `config`
    pub fn with_config(config: DispatcherConfig) -> Self {
        Self {
            config,
            nodes: HashMap::new(),
        }
    }

    /// Bind `node`, or return its existing binding
    pub fn bind(&mut self, node: NodeId) -> &mut BoundNode {
        let config = &self.config;
        self.nodes.entry(node).or_insert_with(|| {
            tracing::debug!("Binding element tools to {:?}", node);
            BoundNode::new(node, config.clone())
        })
    }

    /// Purge and forget `node`. Returns whether it was bound.
    pub fn unbind(&mut self, node: NodeId) -> bool {
        match self.nodes.remove(&node) {
            Some(mut bound) => {
                tracing::debug!("Unbinding {:?}", node);
                bound.purge();
                true
            }
            None => false,
        }
    }

    /// Purge and forget every node
    pub fn unbind_all(&mut self) {
        tracing::debug!("Unbinding {} elements", self.nodes.len());
        for bound in self.nodes.values_mut() {
            bound.purge();
        }
        self.nodes.clear();
    }

    pub fn is_bound(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn get(&self, node: NodeId) -> Option<&BoundNode> {
        self.nodes.get(&node)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut BoundNode> {
        self.nodes.get_mut(&node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a listener to `node`, binding it if needed
    pub fn add_event(
        &mut self,
        node: NodeId,
        ty: &str,
        listener: EventListener,
        priority: Option<Priority>,
    ) -> Result<EventListener> {
        self.bind(node).add_event(ty, listener, priority)
    }

    pub fn set_inline_handler(&mut self, node: NodeId, ty: &str, listener: EventListener) -> Result<()> {
        self.bind(node).set_inline_handler(ty, listener)
    }

    /// Run `handler` on `node` for events whose source passes `check`
    pub fn add_delegate(
        &mut self,
        node: NodeId,
        ty: &str,
        check: DelegateCheck,
        handler: EventListener,
        priority: Option<Priority>,
    ) -> Result<EventListener> {
        self.bind(node).add_delegate(ty, check, handler, priority)
    }

    pub fn remove_event(&mut self, node: NodeId, ty: &str, listener: &EventListener) {
        if let Some(bound) = self.nodes.get_mut(&node) {
            bound.remove_event(ty, listener);
        }
    }

    /// Remove every `ty` listener of `node`, and of its bound descendants
    /// when `purge_children` is set
    pub fn remove_all_events<P>(&mut self, parents: &P, node: NodeId, ty: &str, purge_children: bool)
    where
        P: NodeParents + ?Sized,
    {
        for (&id, bound) in self.nodes.iter_mut() {
            if id == node || (purge_children && parents.contains(node, id)) {
                bound.remove_all_events(ty);
            }
        }
    }

    /// Drop every listener of `node`, and of its bound descendants when
    /// `purge_children` is set. Call before removing a subtree from the
    /// document.
    pub fn purge_events<P>(&mut self, parents: &P, node: NodeId, purge_children: bool)
    where
        P: NodeParents + ?Sized,
    {
        for (&id, bound) in self.nodes.iter_mut() {
            if id == node || (purge_children && parents.contains(node, id)) {
                bound.purge();
            }
        }
    }

    /// Fire `ty` on `node` and bubble it through bound ancestors.
    ///
    /// Without an event, a manual one targeting `node` is created. Returns
    /// `false` if any listener returned `false` or prevented the default.
    pub fn fire_event<P>(&self, parents: &P, node: NodeId, ty: &str, event: Option<DomEvent>) -> Result<bool>
    where
        P: NodeParents + ?Sized,
    {
        let ty = event_type(ty)?;
        let mut event = event.unwrap_or_else(|| DomEvent::manual(&ty, node));
        if let Some(related) = event.related_target {
            if event.related_ancestors.is_empty() {
                event.related_ancestors = parents.ancestors(related);
            }
        }

        let mut result = true;
        let mut current = Some(node);
        while let Some(id) = current {
            if let Some(bound) = self.nodes.get(&id) {
                event.current_target = Some(id);
                tracing::trace!("Firing {} on {:?}", ty, id);
                result &= bound.fire(&ty, &mut event)?;
                if event.is_propagation_stopped() {
                    break;
                }
            }
            current = parents.parent(id);
        }

        Ok(result && !event.is_default_prevented())
    }

    /// Normalize a host event and fire it from its source node
    pub fn dispatch_native<P>(&self, parents: &P, raw: RawEvent, scroll: ScrollOffset) -> Result<bool>
    where
        P: NodeParents + ?Sized,
    {
        let event = DomEvent::normalize(raw, scroll);
        let Some(source) = event.source_node else {
            return Err(DomError::InvalidArgument(format!(
                "{} event has no target",
                event.event_type
            )));
        };
        let ty = event.event_type.clone();
        self.fire_event(parents, source, &ty, Some(event))
    }
}
