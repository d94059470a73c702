//! Attribute, property, boolean-attribute and element parts.

use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::trace;

use super::{PartHandle, PartKind};
use crate::directive::{resolve, DirectivePart, DirectiveSlot};
use crate::dom::Node;
use crate::error::RenderError;
use crate::value::Value;

pub(crate) struct AttributeState {
    element: Node,
    name: String,
    /// Static text around the bindings; one more entry than bindings.
    strings: Vec<String>,
    values: Vec<Value>,
    directives: Vec<Option<DirectiveSlot>>,
    property: bool,
    connected: bool,
    written: bool,
}

/// An attribute or property binding, possibly interleaved with static text.
///
/// A binding that is the whole value is "single". Single property bindings
/// assign the value as-is; everything else is stringified and concatenated
/// with the static text. Any [`Value::Nothing`] removes the attribute.
#[derive(Clone)]
pub struct AttributePart(Arc<Mutex<AttributeState>>);

impl AttributePart {
    pub(crate) fn new(
        element: Node,
        name: String,
        strings: Vec<String>,
        property: bool,
        connected: bool,
    ) -> Self {
        let count = strings.len().saturating_sub(1);
        Self(Arc::new(Mutex::new(AttributeState {
            element,
            name,
            strings,
            values: vec![Value::Nothing; count],
            directives: (0..count).map(|_| None).collect(),
            property,
            connected,
            written: false,
        })))
    }

    pub fn kind(&self) -> PartKind {
        self.0.lock().kind()
    }

    pub fn name(&self) -> String {
        self.0.lock().name.clone()
    }

    pub fn element(&self) -> Node {
        self.0.lock().element.clone()
    }

    pub fn value_count(&self) -> usize {
        self.0.lock().values.len()
    }

    /// Resolve and commit one value per binding.
    pub fn set_values(&self, values: SmallVec<[Value; 4]>) -> Result<(), RenderError> {
        let weak = Arc::downgrade(&self.0);
        let mut state = self.0.lock();
        let kind = state.kind();
        let connected = state.connected;

        let mut resolved: SmallVec<[Value; 4]> = SmallVec::with_capacity(values.len());
        for (index, (slot, value)) in state.directives.iter_mut().zip(values).enumerate() {
            let handle = PartHandle::attribute(weak.clone(), kind, index);
            resolved.push(resolve(
                slot,
                value,
                &mut DirectivePart::new(kind, handle, connected),
            )?);
        }
        state.commit(resolved)
    }

    /// Shorthand for a part with a single binding.
    pub fn set_value(&self, value: Value) -> Result<(), RenderError> {
        self.set_values(smallvec::smallvec![value])
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        let mut state = self.0.lock();
        if state.connected == connected {
            return;
        }
        state.connected = connected;
        for slot in state.directives.iter_mut().flatten() {
            if connected {
                slot.reconnected();
            } else {
                slot.disconnected();
            }
        }
    }

    pub(crate) fn dispose(&self) {
        let mut state = self.0.lock();
        for slot in state.directives.iter_mut() {
            if let Some(slot) = slot.take() {
                slot.dispose();
            }
        }
    }
}

impl AttributeState {
    fn kind(&self) -> PartKind {
        if self.property {
            PartKind::Property
        } else {
            PartKind::Attribute
        }
    }

    fn is_single(&self) -> bool {
        self.strings.len() == 2 && self.strings.iter().all(String::is_empty)
    }

    fn accepts(&self, value: &Value) -> bool {
        (self.property && self.is_single()) || matches!(value, Value::Nothing) || value.is_primitive()
    }

    /// Commit one value per binding. Nothing is recorded or written unless
    /// every value is acceptable.
    fn commit(&mut self, values: impl IntoIterator<Item = Value>) -> Result<(), RenderError> {
        let values: SmallVec<[Value; 4]> = values.into_iter().take(self.values.len()).collect();
        for value in &values {
            match value {
                Value::NoChange => {}
                Value::Directive(_) => return Err(RenderError::NestedDirective),
                value if !self.accepts(value) => {
                    return Err(RenderError::UnsupportedValue {
                        part: self.kind(),
                        value: value.type_name(),
                    });
                }
                _ => {}
            }
        }

        let mut changed = !self.written;
        for (current, value) in self.values.iter_mut().zip(values) {
            if matches!(value, Value::NoChange) || current.same_as(&value) {
                continue;
            }
            *current = value;
            changed = true;
        }
        if changed {
            self.write();
            self.written = true;
        } else {
            trace!(name = %self.name, "skipping unchanged attribute");
        }
        Ok(())
    }

    /// Commit a value for one binding, leaving the others as they are.
    pub(crate) fn commit_at(&mut self, index: usize, value: Value) -> Result<(), RenderError> {
        let mut value = Some(value);
        let values: SmallVec<[Value; 4]> = (0..self.values.len())
            .map(|i| match i == index {
                true => value.take().unwrap_or(Value::NoChange),
                false => Value::NoChange,
            })
            .collect();
        self.commit(values)
    }

    fn write(&self) {
        if self.property && self.is_single() {
            let value = match &self.values[0] {
                Value::Nothing => Value::Null,
                value => value.clone(),
            };
            self.element.set_property(&self.name, value);
            return;
        }

        if self.values.iter().any(|v| matches!(v, Value::Nothing)) {
            if self.property {
                self.element.set_property(&self.name, Value::Null);
            } else {
                self.element.remove_attribute(&self.name);
            }
            return;
        }

        let mut text = String::new();
        for (segment, value) in self.strings.iter().zip(&self.values) {
            text.push_str(segment);
            text.push_str(&value.to_text().unwrap_or_default());
        }
        if let Some(last) = self.strings.last() {
            text.push_str(last);
        }

        if self.property {
            self.element.set_property(&self.name, Value::Str(text));
        } else {
            self.element.set_attribute(&self.name, &text);
        }
    }
}

/// A `.name=${..}` binding.
///
/// Follows the [`AttributePart`] rules but writes the element's property
/// instead of its attribute.
#[derive(Clone)]
pub struct PropertyPart(AttributePart);

impl PropertyPart {
    pub(crate) fn new(element: Node, name: String, strings: Vec<String>, connected: bool) -> Self {
        Self(AttributePart::new(element, name, strings, true, connected))
    }

    pub fn name(&self) -> String {
        self.0.name()
    }

    pub fn element(&self) -> Node {
        self.0.element()
    }

    pub fn value_count(&self) -> usize {
        self.0.value_count()
    }

    pub fn set_values(&self, values: SmallVec<[Value; 4]>) -> Result<(), RenderError> {
        self.0.set_values(values)
    }

    pub fn set_value(&self, value: Value) -> Result<(), RenderError> {
        self.0.set_value(value)
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.0.set_connected(connected);
    }

    pub(crate) fn dispose(&self) {
        self.0.dispose();
    }
}

pub(crate) struct BooleanState {
    element: Node,
    name: String,
    present: Option<bool>,
    directive: Option<DirectiveSlot>,
    connected: bool,
}

/// A `?name=${..}` binding: present when the value is truthy.
#[derive(Clone)]
pub struct BooleanAttributePart(Arc<Mutex<BooleanState>>);

impl BooleanAttributePart {
    pub(crate) fn new(element: Node, name: String, connected: bool) -> Self {
        Self(Arc::new(Mutex::new(BooleanState {
            element,
            name,
            present: None,
            directive: None,
            connected,
        })))
    }

    pub fn set_value(&self, value: Value) -> Result<(), RenderError> {
        let handle = PartHandle::boolean(Arc::downgrade(&self.0));
        let mut state = self.0.lock();
        let connected = state.connected;
        let value = resolve(
            &mut state.directive,
            value,
            &mut DirectivePart::new(PartKind::BooleanAttribute, handle, connected),
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
        if let Some(slot) = self.0.lock().directive.take() {
            slot.dispose();
        }
    }
}

impl BooleanState {
    pub(crate) fn commit(&mut self, value: Value) -> Result<(), RenderError> {
        let present = match value {
            Value::NoChange => return Ok(()),
            Value::Directive(_) => return Err(RenderError::NestedDirective),
            value => value.is_truthy(),
        };
        if self.present == Some(present) {
            return Ok(());
        }
        if present {
            self.element.set_attribute(&self.name, "");
        } else {
            self.element.remove_attribute(&self.name);
        }
        self.present = Some(present);
        Ok(())
    }
}

pub(crate) struct ElementState {
    directive: Option<DirectiveSlot>,
    connected: bool,
}

impl ElementState {
    pub(crate) fn commit(&mut self, value: Value) -> Result<(), RenderError> {
        match value {
            Value::NoChange | Value::Nothing | Value::Null => Ok(()),
            Value::Directive(_) => Err(RenderError::NestedDirective),
            other => Err(RenderError::UnsupportedValue {
                part: PartKind::Element,
                value: other.type_name(),
            }),
        }
    }
}

/// A binding in attribute-name position. Only directives do anything here;
/// the element is available to them through their own arguments.
#[derive(Clone)]
pub struct ElementPart {
    element: Node,
    state: Arc<Mutex<ElementState>>,
}

impl ElementPart {
    pub(crate) fn new(element: Node, connected: bool) -> Self {
        Self {
            element,
            state: Arc::new(Mutex::new(ElementState {
                directive: None,
                connected,
            })),
        }
    }

    pub fn element(&self) -> Node {
        self.element.clone()
    }

    pub fn handle(&self) -> PartHandle {
        PartHandle::element(Arc::downgrade(&self.state))
    }

    pub fn set_value(&self, value: Value) -> Result<(), RenderError> {
        let handle = self.handle();
        let mut state = self.state.lock();
        let connected = state.connected;
        let value = resolve(
            &mut state.directive,
            value,
            &mut DirectivePart::new(PartKind::Element, handle, connected),
        )?;
        state.commit(value)
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        let mut state = self.state.lock();
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
        if let Some(slot) = self.state.lock().directive.take() {
            slot.dispose();
        }
    }
}
