//! Event parts.
//!
//! Each part registers at most one listener on its element: a trampoline
//! that forwards to whatever callback the part currently holds. Rendering a
//! new handler swaps the callback in place, so re-rendering never stacks
//! listeners. The registration is only replaced when the listener options
//! change, since those are fixed at registration time.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::{PartHandle, PartKind};
use crate::directive::{resolve, DirectivePart, DirectiveSlot};
use crate::dom::{Event, EventCallback, EventListener, ListenerId, ListenerOptions, Node};
use crate::error::RenderError;
use crate::value::Value;

pub(crate) struct EventState {
    element: Node,
    name: String,
    committed: Option<EventListener>,
    registration: Option<(ListenerId, ListenerOptions)>,
    callback: Arc<Mutex<Option<EventCallback>>>,
    directive: Option<DirectiveSlot>,
    connected: bool,
}

/// An `@name=${..}` binding.
#[derive(Clone)]
pub struct EventPart(Arc<Mutex<EventState>>);

impl EventPart {
    pub(crate) fn new(element: Node, name: String, connected: bool) -> Self {
        Self(Arc::new(Mutex::new(EventState {
            element,
            name,
            committed: None,
            registration: None,
            callback: Arc::new(Mutex::new(None)),
            directive: None,
            connected,
        })))
    }

    pub fn name(&self) -> String {
        self.0.lock().name.clone()
    }

    pub fn set_value(&self, value: Value) -> Result<(), RenderError> {
        let handle = PartHandle::event(Arc::downgrade(&self.0));
        let mut state = self.0.lock();
        let connected = state.connected;
        let value = resolve(
            &mut state.directive,
            value,
            &mut DirectivePart::new(PartKind::Event, handle, connected),
        )?;
        state.commit(value)
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        let mut state = self.0.lock();
        if state.connected == connected {
            return;
        }
        state.connected = connected;
        if let Some(slot) = &mut state.directive {
            if connected {
                slot.reconnected();
            } else {
                slot.disconnected();
            }
        }
    }

    pub(crate) fn dispose(&self) {
        let mut state = self.0.lock();
        if let Some(slot) = state.directive.take() {
            slot.dispose();
        }
        state.unregister();
    }
}

impl EventState {
    pub(crate) fn commit(&mut self, value: Value) -> Result<(), RenderError> {
        match value {
            Value::NoChange => Ok(()),
            Value::Directive(_) => Err(RenderError::NestedDirective),
            Value::Nothing | Value::Null => {
                self.unregister();
                Ok(())
            }
            Value::Listener(listener) => {
                self.install(listener);
                Ok(())
            }
            other => Err(RenderError::UnsupportedValue {
                part: PartKind::Event,
                value: other.type_name(),
            }),
        }
    }

    fn install(&mut self, listener: EventListener) {
        if self.committed.as_ref().is_some_and(|c| c.same_as(&listener)) {
            trace!(event = %self.name, "skipping unchanged listener");
            return;
        }
        *self.callback.lock() = Some(listener.callback().clone());

        let options = listener.options();
        let registered = matches!(self.registration, Some((_, current)) if current == options);
        if !registered {
            if let Some((id, _)) = self.registration.take() {
                self.element.remove_event_listener(id);
            }
            let slot = self.callback.clone();
            let id = self.element.add_event_listener(
                &self.name,
                options,
                Arc::new(move |event: &Event| {
                    // Release the slot before calling out; the handler may re-render.
                    let callback = slot.lock().clone();
                    if let Some(callback) = callback {
                        callback(event);
                    }
                }),
            );
            trace!(event = %self.name, ?options, "registered listener");
            self.registration = Some((id, options));
        }
        self.committed = Some(listener);
    }

    fn unregister(&mut self) {
        if let Some((id, _)) = self.registration.take() {
            self.element.remove_event_listener(id);
        }
        *self.callback.lock() = None;
        self.committed = None;
    }
}
