//! Events and listeners.
//!
//! Dispatch follows the familiar three phases: capture listeners on the
//! ancestors from the root down, every listener on the target, then bubble
//! listeners on the ancestors from the target up (only for bubbling events).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::Node;

/// Shared callable invoked for a dispatched event.
pub type EventCallback = Arc<dyn Fn(&Event) + Send + Sync>;

/// Identifies one registration made with [`Node::add_event_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Options accepted when registering a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListenerOptions {
    pub capture: bool,
    pub once: bool,
    pub passive: bool,
}

impl ListenerOptions {
    pub fn capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    pub fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    pub fn passive(mut self, passive: bool) -> Self {
        self.passive = passive;
        self
    }
}

/// A listener value bound through an `@event` template binding.
///
/// Two listeners are the same binding only if they share the callback
/// allocation and carry equal options.
#[derive(Clone)]
pub struct EventListener {
    callback: EventCallback,
    options: ListenerOptions,
}

impl EventListener {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
            options: ListenerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ListenerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> ListenerOptions {
        self.options
    }

    pub fn callback(&self) -> &EventCallback {
        &self.callback
    }

    pub fn same_as(&self, other: &EventListener) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback) && self.options == other.options
    }
}

impl fmt::Debug for EventListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListener")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

pub(crate) struct RegisteredListener {
    pub(crate) id: ListenerId,
    pub(crate) event_type: String,
    pub(crate) options: ListenerOptions,
    pub(crate) callback: EventCallback,
}

/// Which listeners a node runs during one step of dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Capture,
    AtTarget,
    Bubble,
}

impl Phase {
    pub(crate) fn accepts(self, options: &ListenerOptions) -> bool {
        match self {
            Phase::Capture => options.capture,
            Phase::AtTarget => true,
            Phase::Bubble => !options.capture,
        }
    }
}

/// An event travelling through the tree.
pub struct Event {
    event_type: String,
    bubbles: bool,
    target: RefCell<Option<Node>>,
    current_target: RefCell<Option<Node>>,
    propagation_stopped: Cell<bool>,
    default_prevented: Cell<bool>,
}

impl Event {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            bubbles: false,
            target: RefCell::new(None),
            current_target: RefCell::new(None),
            propagation_stopped: Cell::new(false),
            default_prevented: Cell::new(false),
        }
    }

    pub fn bubbling(mut self) -> Self {
        self.bubbles = true;
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    /// The node the event was dispatched on.
    pub fn target(&self) -> Option<Node> {
        self.target.borrow().clone()
    }

    /// The node whose listeners are currently running.
    pub fn current_target(&self) -> Option<Node> {
        self.current_target.borrow().clone()
    }

    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    pub(crate) fn set_target(&self, node: Node) {
        *self.target.borrow_mut() = Some(node);
    }

    pub(crate) fn set_current_target(&self, node: Option<Node>) {
        *self.current_target.borrow_mut() = node;
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("event_type", &self.event_type)
            .field("bubbles", &self.bubbles)
            .finish_non_exhaustive()
    }
}
