//! Child parts.
//!
//! A child part owns the sibling range between its start marker and its end
//! marker (or the end of the parent when it has none). Everything it renders
//! lives inside that range, so clearing is a walk from `start` to `end`.

use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::{PartHandle, PartKind};
use crate::directive::{resolve, DirectivePart, DirectiveSlot};
use crate::dom::Node;
use crate::error::{DomError, RenderError, TemplateError};
use crate::template::{get_or_create_template, Template, TemplateInstance, TemplateResult};
use crate::value::Value;

/// What a child part currently has in its range.
enum Content {
    Empty,
    Text(Node),
    /// A caller's node; `committed` holds it.
    Node,
    Instance(TemplateInstance),
    List(Vec<ChildPart>),
}

pub(crate) struct ChildState {
    start: Node,
    end: Option<Node>,
    /// Last committed primitive or node, for change detection.
    committed: Option<Value>,
    content: Content,
    directive: Option<DirectiveSlot>,
    connected: bool,
}

/// A binding in child-content position.
#[derive(Clone)]
pub struct ChildPart(Arc<Mutex<ChildState>>);

impl ChildPart {
    pub(crate) fn new(start: Node, end: Option<Node>, connected: bool) -> Self {
        Self(Arc::new(Mutex::new(ChildState {
            start,
            end,
            committed: None,
            content: Content::Empty,
            directive: None,
            connected,
        })))
    }

    pub fn handle(&self) -> PartHandle {
        PartHandle::child(Arc::downgrade(&self.0))
    }

    /// Resolve `value` through any directive and commit it.
    pub fn set_value(&self, value: Value) -> Result<(), RenderError> {
        let handle = self.handle();
        self.0.lock().set_value(value, &handle)
    }

    pub fn start_node(&self) -> Node {
        self.0.lock().start.clone()
    }

    pub fn end_node(&self) -> Option<Node> {
        self.0.lock().end.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.0.lock().connected
    }

    /// Template of the instance currently rendered here, if any.
    pub fn template(&self) -> Option<Arc<Template>> {
        match &self.0.lock().content {
            Content::Instance(instance) => Some(instance.template().clone()),
            _ => None,
        }
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.0.lock().set_connected(connected);
    }

    pub(crate) fn dispose(&self) {
        self.0.lock().dispose();
    }

    /// Dispose everything rendered here and clear the range.
    pub(crate) fn reset(&self) {
        self.0.lock().reset();
    }

    /// Dispose this part and detach its whole range, markers included.
    pub(crate) fn remove(&self) {
        let mut state = self.0.lock();
        state.dispose();
        for node in state.range() {
            node.remove();
        }
    }

    /// Start marker through end marker, in tree order.
    fn nodes(&self) -> Vec<Node> {
        self.0.lock().range()
    }

    fn same_part(&self, other: &ChildPart) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl ChildState {
    fn parent(&self) -> Result<Node, DomError> {
        self.start.parent().ok_or(DomError::Detached)
    }

    fn is_end(&self, node: &Node) -> bool {
        self.end.as_ref().is_some_and(|end| end.is_same_node(node))
    }

    /// Insert `node` at the end of this part's range.
    fn insert(&self, node: &Node) -> Result<(), DomError> {
        self.parent()?.insert_before(node, self.end.as_ref())
    }

    fn range(&self) -> Vec<Node> {
        let mut nodes = vec![self.start.clone()];
        let mut next = self.start.next_sibling();
        while let Some(node) = next {
            let last = self.is_end(&node);
            next = node.next_sibling();
            nodes.push(node);
            if last {
                break;
            }
        }
        nodes
    }

    pub(crate) fn set_value(&mut self, value: Value, handle: &PartHandle) -> Result<(), RenderError> {
        let value = match value {
            Value::Directive(_) => {
                let mut slot = self.directive.take();
                let connected = self.connected;
                let resolved = resolve(
                    &mut slot,
                    value,
                    &mut DirectivePart::child(handle.clone(), connected, self),
                );
                self.directive = slot;
                resolved?
            }
            other => {
                if let Some(old) = self.directive.take() {
                    old.dispose();
                }
                other
            }
        };
        self.commit(value)
    }

    /// Commit an already-resolved value.
    pub(crate) fn commit(&mut self, value: Value) -> Result<(), RenderError> {
        let type_name = value.type_name();
        match value {
            Value::NoChange => Ok(()),
            Value::Directive(_) => Err(RenderError::NestedDirective),
            Value::Template(result) => self.commit_template(result),
            Value::List(items) => self.commit_list(items),
            Value::Listener(_) | Value::Object(_) => Err(RenderError::UnsupportedValue {
                part: PartKind::Child,
                value: type_name,
            }),
            value => {
                if self.committed.as_ref().is_some_and(|c| c.same_as(&value)) {
                    trace!("skipping unchanged child value");
                    return Ok(());
                }
                let value = match value {
                    Value::Node(node) => {
                        self.commit_node(&node)?;
                        Value::Node(node)
                    }
                    Value::Nothing | Value::Null => {
                        self.clear();
                        Value::Nothing
                    }
                    Value::Str(text) if text.is_empty() => {
                        self.clear();
                        Value::Nothing
                    }
                    primitive => {
                        let text = primitive.to_text().unwrap_or_default();
                        self.commit_text(&text)?;
                        primitive
                    }
                };
                self.committed = Some(value);
                Ok(())
            }
        }
    }

    fn commit_text(&mut self, text: &str) -> Result<(), RenderError> {
        if let Content::Text(node) = &self.content {
            node.set_data(text);
            return Ok(());
        }
        self.clear();
        let node = Node::text(text);
        self.insert(&node)?;
        self.content = Content::Text(node);
        Ok(())
    }

    fn commit_node(&mut self, node: &Node) -> Result<(), RenderError> {
        self.clear();
        self.insert(node)?;
        self.content = Content::Node;
        Ok(())
    }

    fn commit_template(&mut self, result: TemplateResult) -> Result<(), RenderError> {
        let template = get_or_create_template(result.strings(), result.kind())?;
        let values = result.into_values();
        if values.len() != template.value_count() {
            return Err(TemplateError::ValueCountMismatch {
                expected: template.value_count(),
                found: values.len(),
            }
            .into());
        }

        if let Content::Instance(instance) = &self.content {
            if Arc::ptr_eq(instance.template(), &template) {
                trace!("updating template instance in place");
                return instance.update(values);
            }
        }

        let (instance, fragment) = TemplateInstance::new(template, self.connected)?;
        instance.update(values)?;
        self.clear();
        self.insert(&fragment)?;
        self.content = Content::Instance(instance);
        Ok(())
    }

    fn commit_list(&mut self, items: Vec<Value>) -> Result<(), RenderError> {
        let mut parts = self.take_list();
        let outcome = self.fill_list(&mut parts, items);
        self.content = Content::List(parts);
        outcome
    }

    /// Update item parts positionally, creating and removing from the end.
    fn fill_list(&self, parts: &mut Vec<ChildPart>, items: Vec<Value>) -> Result<(), RenderError> {
        let count = items.len();
        for (index, item) in items.into_iter().enumerate() {
            if index == parts.len() {
                parts.push(self.insert_item(None)?);
            }
            parts[index].set_value(item)?;
        }
        for stale in parts.drain(count.min(parts.len())..) {
            stale.remove();
        }
        Ok(())
    }

    /// Render `value` into a new item after the current content.
    pub(crate) fn append(&mut self, value: Value, clear: bool) -> Result<(), RenderError> {
        if clear || !matches!(self.content, Content::List(_)) {
            self.clear();
            self.content = Content::List(Vec::new());
        }
        let item = self.insert_item(None)?;
        if let Content::List(parts) = &mut self.content {
            parts.push(item.clone());
        }
        let handle = item.handle();
        let outcome = item.0.lock().set_value(value, &handle);
        outcome
    }

    // ------------------------------------------------------------------
    // Keyed list support
    // ------------------------------------------------------------------

    /// Take the current item parts, clearing any non-list content.
    pub(crate) fn take_list(&mut self) -> Vec<ChildPart> {
        self.committed = None;
        match mem::replace(&mut self.content, Content::Empty) {
            Content::List(parts) => parts,
            other => {
                self.content = other;
                self.clear();
                Vec::new()
            }
        }
    }

    pub(crate) fn set_list(&mut self, parts: Vec<ChildPart>) {
        self.content = Content::List(parts);
    }

    /// Create an empty item with its own markers, placed before `before` or
    /// at the end of this part's range.
    pub(crate) fn insert_item(&self, before: Option<&ChildPart>) -> Result<ChildPart, RenderError> {
        let parent = self.parent()?;
        let reference = match before {
            Some(item) => Some(item.start_node()),
            None => self.end.clone(),
        };
        let start = Node::comment("");
        let end = Node::comment("");
        parent.insert_before(&start, reference.as_ref())?;
        parent.insert_before(&end, reference.as_ref())?;
        Ok(ChildPart::new(start, Some(end), self.connected))
    }

    /// Move an item's whole range before `before`, or to the end.
    pub(crate) fn move_item(&self, item: &ChildPart, before: Option<&ChildPart>) -> Result<(), RenderError> {
        if before.is_some_and(|b| b.same_part(item)) {
            return Ok(());
        }
        let parent = self.parent()?;
        let reference = match before {
            Some(next) => Some(next.start_node()),
            None => self.end.clone(),
        };
        for node in item.nodes() {
            parent.insert_before(&node, reference.as_ref())?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Dispose nested parts and remove every node between the markers.
    fn clear(&mut self) {
        self.dispose_content();
        self.committed = None;
        let mut next = self.start.next_sibling();
        while let Some(node) = next {
            if self.is_end(&node) {
                break;
            }
            next = node.next_sibling();
            node.remove();
        }
    }

    fn dispose_content(&mut self) {
        match mem::replace(&mut self.content, Content::Empty) {
            Content::Instance(instance) => instance.dispose(),
            Content::List(parts) => parts.iter().for_each(ChildPart::dispose),
            Content::Empty | Content::Text(_) | Content::Node => {}
        }
    }

    /// Like `dispose_content`, for a part that is about to be dropped whole.
    fn dispose_content_of(&self) {
        match &self.content {
            Content::Instance(instance) => instance.dispose(),
            Content::List(parts) => parts.iter().for_each(ChildPart::dispose),
            Content::Empty | Content::Text(_) | Content::Node => {}
        }
    }

    pub(crate) fn set_connected(&mut self, connected: bool) {
        if self.connected == connected {
            return;
        }
        self.connected = connected;
        if let Some(slot) = &mut self.directive {
            if connected {
                slot.reconnected();
            } else {
                slot.disconnected();
            }
        }
        match &self.content {
            Content::Instance(instance) => instance.set_connected(connected),
            Content::List(parts) => parts.iter().for_each(|part| part.set_connected(connected)),
            Content::Empty | Content::Text(_) | Content::Node => {}
        }
    }

    pub(crate) fn dispose(&mut self) {
        if let Some(slot) = self.directive.take() {
            slot.dispose();
        }
        self.dispose_content_of();
    }

    /// Clear the rendered range and forget any directive.
    pub(crate) fn reset(&mut self) {
        if let Some(slot) = self.directive.take() {
            slot.dispose();
        }
        self.clear();
    }
}
