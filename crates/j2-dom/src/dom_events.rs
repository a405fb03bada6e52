//! DOM Events
//!
//! Native events arrive as [`RawEvent`] with whichever of the legacy and
//! standard fields the host filled in. [`DomEvent::normalize`] folds them
//! into one shape listeners can rely on.

use serde::{Deserialize, Serialize};

use crate::NodeId;

/// Event as reported by the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub target: Option<NodeId>,
    /// Legacy IE name for `target`
    pub src_element: Option<NodeId>,
    pub which: Option<u32>,
    pub key_code: Option<u32>,
    pub button: Option<u32>,
    pub page_x: Option<f64>,
    pub page_y: Option<f64>,
    pub client_x: Option<f64>,
    pub client_y: Option<f64>,
    pub related_target: Option<NodeId>,
    pub from_element: Option<NodeId>,
    pub to_element: Option<NodeId>,
    pub wheel_delta: Option<f64>,
    pub detail: Option<f64>,
    /// Raised programmatically rather than by the user
    pub manual: bool,
    pub timestamp: f64,
}

/// Document scroll at the time of the event
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollOffset {
    pub x: f64,
    pub y: f64,
}

/// Pointer position in page coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MousePosition {
    pub x: f64,
    pub y: f64,
}

/// Normalized DOM event
#[derive(Debug, Clone, Default)]
pub struct DomEvent {
    pub event_type: String,
    /// Node the event originated from
    pub source_node: Option<NodeId>,
    /// Node whose listeners are currently running
    pub current_target: Option<NodeId>,
    pub related_target: Option<NodeId>,
    /// Ancestors of `related_target`, nearest first. Filled in on dispatch.
    pub related_ancestors: Vec<NodeId>,
    pub key_pressed: Option<u32>,
    pub mouse: Option<MousePosition>,
    /// Wheel clicks, positive away from the user
    pub wheel: Option<f64>,
    pub right_click: bool,
    pub manual: bool,
    pub timestamp: f64,
    default_prevented: bool,
    propagation_stopped: bool,
}

fn is_mouse_like(event_type: &str) -> bool {
    let lower = event_type.to_ascii_lowercase();
    lower.contains("click") || lower.contains("mouse") || lower.contains("menu")
}

fn nonzero(code: Option<u32>) -> Option<u32> {
    code.filter(|c| *c != 0)
}

fn reported(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

fn is_wheel(event_type: &str) -> bool {
    event_type.contains("DOMMouseScroll") || event_type.contains("mousewheel")
}

impl DomEvent {
    /// Programmatic event targeting `target`
    pub fn manual(event_type: &str, target: NodeId) -> Self {
        Self::normalize(
            RawEvent {
                event_type: event_type.to_string(),
                target: Some(target),
                manual: true,
                ..Default::default()
            },
            ScrollOffset::default(),
        )
    }

    /// Fold a host event into the normalized shape.
    ///
    /// Zero counts as "not reported" for key codes, page coordinates and
    /// wheel delta, as legacy hosts fill those fields with 0.
    pub fn normalize(raw: RawEvent, scroll: ScrollOffset) -> Self {
        let ty = raw.event_type.as_str();
        let lower = ty.to_ascii_lowercase();
        let source_node = raw.target.or(raw.src_element);

        let key_pressed = if ty.contains("key") {
            nonzero(raw.which).or(nonzero(raw.key_code))
        } else {
            None
        };

        let mouse = if is_mouse_like(ty) {
            Some(if raw.manual {
                MousePosition::default()
            } else {
                MousePosition {
                    x: reported(raw.page_x).unwrap_or(raw.client_x.unwrap_or(0.0) + scroll.x),
                    y: reported(raw.page_y).unwrap_or(raw.client_y.unwrap_or(0.0) + scroll.y),
                }
            })
        } else {
            None
        };

        let mut related_target = raw.related_target;
        if lower.contains("over") {
            if raw.manual {
                related_target = source_node;
            } else if related_target.is_none() {
                related_target = raw.from_element;
            }
        }
        if lower.contains("out") {
            if raw.manual {
                related_target = source_node;
            } else if related_target.is_none() {
                related_target = raw.to_element;
            }
        }

        let wheel = if is_wheel(ty) {
            Some(match reported(raw.wheel_delta) {
                Some(delta) => delta / 120.0,
                None => -raw.detail.unwrap_or(0.0) / 3.0,
            })
        } else {
            None
        };

        Self {
            right_click: raw.which == Some(3) || raw.button == Some(2),
            event_type: raw.event_type,
            source_node,
            current_target: None,
            related_target,
            related_ancestors: Vec::new(),
            key_pressed,
            mouse,
            wheel,
            manual: raw.manual,
            timestamp: raw.timestamp,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// Prevent default action
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// Stop propagation
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Prevent default and stop propagation
    pub fn stop(&mut self) {
        self.prevent_default();
        self.stop_propagation();
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    /// True if the related target is `node` or lies beneath it
    pub fn related_within(&self, node: NodeId) -> bool {
        self.related_target == Some(node) || self.related_ancestors.contains(&node)
    }
}
