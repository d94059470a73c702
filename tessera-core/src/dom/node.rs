//! Node handles and tree operations.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::event::{Event, EventCallback, ListenerId, ListenerOptions, Phase, RegisteredListener};
use crate::error::DomError;
use crate::value::Value;

/// Unique identifier for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Element namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Html,
    Svg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Element,
    Text,
    Comment,
    Fragment,
}

impl NodeType {
    pub fn name(self) -> &'static str {
        match self {
            NodeType::Element => "element",
            NodeType::Text => "text",
            NodeType::Comment => "comment",
            NodeType::Fragment => "fragment",
        }
    }
}

thread_local! {
    static MUTATIONS: Cell<u64> = const { Cell::new(0) };
}

/// Number of tree mutations performed on the current thread so far.
pub fn mutation_count() -> u64 {
    MUTATIONS.with(Cell::get)
}

fn record_mutation() {
    MUTATIONS.with(|count| count.set(count.get() + 1));
}

/// Properties that are stored as attributes.
///
/// (property, attribute, is_boolean)
const REFLECTED: &[(&str, &str, bool)] = &[
    ("className", "class", false),
    ("id", "id", false),
    ("title", "title", false),
    ("hidden", "hidden", true),
];

fn reflection(property: &str) -> Option<(&'static str, bool)> {
    REFLECTED
        .iter()
        .find(|(name, _, _)| *name == property)
        .map(|(_, attribute, boolean)| (*attribute, *boolean))
}

pub(crate) struct ElementData {
    pub(crate) name: String,
    pub(crate) namespace: Namespace,
    pub(crate) attributes: IndexMap<String, String>,
    properties: IndexMap<String, Value>,
}

pub(crate) enum NodeKind {
    Element(ElementData),
    Text(String),
    Comment(String),
    Fragment,
}

impl NodeKind {
    fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Element(_) => NodeType::Element,
            NodeKind::Text(_) => NodeType::Text,
            NodeKind::Comment(_) => NodeType::Comment,
            NodeKind::Fragment => NodeType::Fragment,
        }
    }
}

pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    parent: Weak<NodeInner>,
    pub(crate) children: Vec<Node>,
    listeners: Vec<RegisteredListener>,
    expandos: Vec<Arc<dyn Any + Send + Sync>>,
}

pub(crate) struct NodeInner {
    id: NodeId,
    pub(crate) data: Mutex<NodeData>,
}

/// A shared handle to a node in a document tree.
///
/// # Example
///
/// ```rust,ignore
/// let list = Node::element("ul");
/// let item = Node::element("li");
/// item.append_child(&Node::text("one"))?;
/// list.append_child(&item)?;
/// assert_eq!(list.outer_html(), "<ul><li>one</li></ul>");
/// ```
#[derive(Clone)]
pub struct Node(pub(crate) Arc<NodeInner>);

impl Node {
    fn with_kind(kind: NodeKind) -> Self {
        Self(Arc::new(NodeInner {
            id: NodeId::next(),
            data: Mutex::new(NodeData {
                kind,
                parent: Weak::new(),
                children: Vec::new(),
                listeners: Vec::new(),
                expandos: Vec::new(),
            }),
        }))
    }

    /// Create an HTML element.
    pub fn element(name: &str) -> Self {
        Self::element_ns(name, Namespace::Html)
    }

    pub fn element_ns(name: &str, namespace: Namespace) -> Self {
        Self::with_kind(NodeKind::Element(ElementData {
            name: name.to_owned(),
            namespace,
            attributes: IndexMap::new(),
            properties: IndexMap::new(),
        }))
    }

    pub fn text(data: &str) -> Self {
        Self::with_kind(NodeKind::Text(data.to_owned()))
    }

    pub fn comment(data: &str) -> Self {
        Self::with_kind(NodeKind::Comment(data.to_owned()))
    }

    pub fn fragment() -> Self {
        Self::with_kind(NodeKind::Fragment)
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn node_type(&self) -> NodeType {
        self.0.data.lock().kind.node_type()
    }

    /// Whether both handles refer to the same node.
    pub fn is_same_node(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Element name as written in the template, `None` for other nodes.
    pub fn tag_name(&self) -> Option<String> {
        self.with_element(|element| element.name.clone())
    }

    pub fn namespace(&self) -> Option<Namespace> {
        self.with_element(|element| element.namespace)
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn parent(&self) -> Option<Node> {
        self.0.data.lock().parent.upgrade().map(Node)
    }

    pub fn children(&self) -> Vec<Node> {
        self.0.data.lock().children.clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.data.lock().children.len()
    }

    pub fn child(&self, index: usize) -> Option<Node> {
        self.0.data.lock().children.get(index).cloned()
    }

    pub fn first_child(&self) -> Option<Node> {
        self.child(0)
    }

    pub fn last_child(&self) -> Option<Node> {
        self.0.data.lock().children.last().cloned()
    }

    pub fn next_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let data = parent.0.data.lock();
        let index = data.children.iter().position(|c| c.is_same_node(self))?;
        data.children.get(index + 1).cloned()
    }

    pub fn previous_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let data = parent.0.data.lock();
        let index = data.children.iter().position(|c| c.is_same_node(self))?;
        index.checked_sub(1).and_then(|i| data.children.get(i).cloned())
    }

    /// Whether `self` is `other` or one of its descendants.
    pub fn is_inclusive_descendant_of(&self, other: &Node) -> bool {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if node.is_same_node(other) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    // ------------------------------------------------------------------
    // Tree mutation
    // ------------------------------------------------------------------

    fn can_have_children(&self) -> bool {
        matches!(
            self.0.data.lock().kind,
            NodeKind::Element(_) | NodeKind::Fragment
        )
    }

    pub fn append_child(&self, child: &Node) -> Result<(), DomError> {
        self.insert_before(child, None)
    }

    /// Insert `child` before `reference`, or at the end when `reference` is
    /// `None`.
    ///
    /// Inserting a fragment moves all of its children and leaves it empty.
    /// Inserting an attached node detaches it from its current parent first.
    pub fn insert_before(&self, child: &Node, reference: Option<&Node>) -> Result<(), DomError> {
        if !self.can_have_children() {
            return Err(DomError::NotAContainer(self.node_type().name()));
        }
        if let Some(reference) = reference {
            let is_child = reference
                .parent()
                .is_some_and(|parent| parent.is_same_node(self));
            if !is_child {
                return Err(DomError::NotAChild);
            }
            if reference.is_same_node(child) {
                return Ok(());
            }
        }
        if self.is_inclusive_descendant_of(child) {
            return Err(DomError::HierarchyRequest);
        }

        if child.node_type() == NodeType::Fragment {
            let moved = std::mem::take(&mut child.0.data.lock().children);
            for node in &moved {
                node.0.data.lock().parent = Weak::new();
            }
            for node in &moved {
                self.insert_single(node, reference)?;
            }
            return Ok(());
        }
        self.insert_single(child, reference)
    }

    fn insert_single(&self, child: &Node, reference: Option<&Node>) -> Result<(), DomError> {
        child.remove();
        {
            let mut data = self.0.data.lock();
            let index = match reference {
                Some(reference) => data
                    .children
                    .iter()
                    .position(|c| c.is_same_node(reference))
                    .ok_or(DomError::NotAChild)?,
                None => data.children.len(),
            };
            data.children.insert(index, child.clone());
        }
        child.0.data.lock().parent = Arc::downgrade(&self.0);
        record_mutation();
        Ok(())
    }

    /// Detach this node from its parent. Detached nodes are left untouched.
    pub fn remove(&self) {
        let parent = {
            let mut data = self.0.data.lock();
            let parent = data.parent.upgrade().map(Node);
            data.parent = Weak::new();
            parent
        };
        if let Some(parent) = parent {
            let mut data = parent.0.data.lock();
            if let Some(index) = data.children.iter().position(|c| c.is_same_node(self)) {
                data.children.remove(index);
                record_mutation();
            }
        }
    }

    pub fn remove_child(&self, child: &Node) -> Result<(), DomError> {
        match child.parent() {
            Some(parent) if parent.is_same_node(self) => {
                child.remove();
                Ok(())
            }
            _ => Err(DomError::NotAChild),
        }
    }

    /// Remove every child of this node.
    pub fn clear_children(&self) {
        for child in self.children() {
            child.remove();
        }
    }

    // ------------------------------------------------------------------
    // Character data
    // ------------------------------------------------------------------

    /// Text of a text or comment node.
    pub fn data(&self) -> Option<String> {
        match &self.0.data.lock().kind {
            NodeKind::Text(data) | NodeKind::Comment(data) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn set_data(&self, value: &str) {
        let mut data = self.0.data.lock();
        if let NodeKind::Text(current) | NodeKind::Comment(current) = &mut data.kind {
            current.clear();
            current.push_str(value);
            record_mutation();
        }
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        let (own, children) = {
            let data = self.0.data.lock();
            let own = match &data.kind {
                NodeKind::Text(text) => Some(text.clone()),
                _ => None,
            };
            (own, data.children.clone())
        };
        if let Some(own) = own {
            return own;
        }
        children.iter().map(Node::text_content).collect()
    }

    // ------------------------------------------------------------------
    // Attributes and properties
    // ------------------------------------------------------------------

    pub(crate) fn with_element<R>(&self, f: impl FnOnce(&ElementData) -> R) -> Option<R> {
        match &self.0.data.lock().kind {
            NodeKind::Element(element) => Some(f(element)),
            _ => None,
        }
    }

    fn with_element_mut<R>(&self, f: impl FnOnce(&mut ElementData) -> R) -> Option<R> {
        match &mut self.0.data.lock().kind {
            NodeKind::Element(element) => Some(f(element)),
            _ => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.with_element(|element| element.attributes.get(name).cloned())
            .flatten()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.with_element(|element| element.attributes.contains_key(name))
            .unwrap_or(false)
    }

    /// All attributes in insertion order.
    pub fn attributes(&self) -> Vec<(String, String)> {
        self.with_element(|element| {
            element
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default()
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        let changed = self.with_element_mut(|element| {
            element
                .attributes
                .insert(name.to_owned(), value.to_owned());
        });
        if changed.is_some() {
            record_mutation();
        }
    }

    pub fn remove_attribute(&self, name: &str) {
        let removed = self
            .with_element_mut(|element| element.attributes.shift_remove(name))
            .flatten();
        if removed.is_some() {
            record_mutation();
        }
    }

    /// Read a property. Reflected properties read their attribute.
    pub fn property(&self, name: &str) -> Option<Value> {
        match reflection(name) {
            Some((attribute, true)) => Some(Value::Bool(self.has_attribute(attribute))),
            Some((attribute, false)) => {
                Some(Value::Str(self.attribute(attribute).unwrap_or_default()))
            }
            None => self
                .with_element(|element| element.properties.get(name).cloned())
                .flatten(),
        }
    }

    /// Assign a property. Reflected properties write their attribute.
    pub fn set_property(&self, name: &str, value: Value) {
        match reflection(name) {
            Some((attribute, true)) => {
                if value.is_truthy() {
                    self.set_attribute(attribute, "");
                } else {
                    self.remove_attribute(attribute);
                }
            }
            Some((attribute, false)) => {
                let text = value.to_text().unwrap_or_default();
                self.set_attribute(attribute, &text);
            }
            None => {
                let stored = self.with_element_mut(|element| {
                    element.properties.insert(name.to_owned(), value);
                });
                if stored.is_some() {
                    record_mutation();
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn add_event_listener(
        &self,
        event_type: &str,
        options: ListenerOptions,
        callback: EventCallback,
    ) -> ListenerId {
        let id = ListenerId::next();
        self.0.data.lock().listeners.push(RegisteredListener {
            id,
            event_type: event_type.to_owned(),
            options,
            callback,
        });
        id
    }

    /// Remove a registration. Returns `false` if it was already gone.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut data = self.0.data.lock();
        let before = data.listeners.len();
        data.listeners.retain(|listener| listener.id != id);
        data.listeners.len() != before
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.0
            .data
            .lock()
            .listeners
            .iter()
            .filter(|listener| listener.event_type == event_type)
            .count()
    }

    /// Dispatch `event` with this node as its target.
    ///
    /// Returns `false` if a listener called [`Event::prevent_default`].
    pub fn dispatch_event(&self, event: &Event) -> bool {
        event.set_target(self.clone());

        let mut ancestors = Vec::new();
        let mut current = self.parent();
        while let Some(node) = current {
            current = node.parent();
            ancestors.push(node);
        }

        for node in ancestors.iter().rev() {
            if event.propagation_stopped() {
                break;
            }
            node.invoke_listeners(event, Phase::Capture);
        }
        if !event.propagation_stopped() {
            self.invoke_listeners(event, Phase::AtTarget);
        }
        if event.bubbles() {
            for node in &ancestors {
                if event.propagation_stopped() {
                    break;
                }
                node.invoke_listeners(event, Phase::Bubble);
            }
        }
        event.set_current_target(None);
        !event.default_prevented()
    }

    /// Dispatch a bubbling `click` event on this node.
    pub fn click(&self) -> bool {
        self.dispatch_event(&Event::new("click").bubbling())
    }

    fn invoke_listeners(&self, event: &Event, phase: Phase) {
        // Snapshot first so listeners may add or remove registrations.
        let matching: Vec<(ListenerId, bool, EventCallback)> = self
            .0
            .data
            .lock()
            .listeners
            .iter()
            .filter(|l| l.event_type == event.event_type() && phase.accepts(&l.options))
            .map(|l| (l.id, l.options.once, l.callback.clone()))
            .collect();
        if matching.is_empty() {
            return;
        }
        event.set_current_target(Some(self.clone()));
        for (id, once, callback) in matching {
            if once && !self.remove_event_listener(id) {
                continue;
            }
            callback(event);
        }
    }

    // ------------------------------------------------------------------
    // Expandos
    // ------------------------------------------------------------------

    /// Attach a typed value to this node, replacing any value of the same type.
    pub fn set_expando<T: Any + Send + Sync>(&self, value: T) {
        let mut data = self.0.data.lock();
        data.expandos.retain(|slot| !(**slot).is::<T>());
        data.expandos.push(Arc::new(value));
    }

    pub fn expando<T: Any + Send + Sync + Clone>(&self) -> Option<T> {
        self.0
            .data
            .lock()
            .expandos
            .iter()
            .find_map(|slot| (**slot).downcast_ref::<T>().cloned())
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.is_same_node(other)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.data.lock();
        match &data.kind {
            NodeKind::Element(element) => write!(f, "<{}>#{}", element.name, self.0.id.0),
            NodeKind::Text(text) => write!(f, "#text({text:?})#{}", self.0.id.0),
            NodeKind::Comment(text) => write!(f, "#comment({text:?})#{}", self.0.id.0),
            NodeKind::Fragment => write!(f, "#fragment#{}", self.0.id.0),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn list_of(names: &[&str]) -> Node {
        let parent = Node::element("div");
        for name in names {
            parent.append_child(&Node::element(name)).unwrap();
        }
        parent
    }

    fn names(node: &Node) -> Vec<String> {
        node.children()
            .iter()
            .filter_map(Node::tag_name)
            .collect()
    }

    #[test]
    fn test_append_and_navigate() {
        let parent = list_of(&["a", "b", "c"]);

        assert_eq!(parent.child_count(), 3);
        let first = parent.first_child().unwrap();
        assert_eq!(first.tag_name().as_deref(), Some("a"));
        assert_eq!(
            first.next_sibling().and_then(|n| n.tag_name()).as_deref(),
            Some("b")
        );
        assert!(first.parent().unwrap().is_same_node(&parent));
        assert!(parent.last_child().unwrap().next_sibling().is_none());
    }

    #[test]
    fn test_insert_before_moves_attached_node() {
        let parent = list_of(&["a", "b", "c"]);
        let c = parent.child(2).unwrap();
        let a = parent.child(0).unwrap();

        parent.insert_before(&c, Some(&a)).unwrap();

        assert_eq!(names(&parent), ["c", "a", "b"]);
    }

    #[test]
    fn test_insert_fragment_moves_children() {
        let parent = list_of(&["a"]);
        let fragment = Node::fragment();
        fragment.append_child(&Node::element("x")).unwrap();
        fragment.append_child(&Node::element("y")).unwrap();

        parent
            .insert_before(&fragment, parent.first_child().as_ref())
            .unwrap();

        assert_eq!(names(&parent), ["x", "y", "a"]);
        assert_eq!(fragment.child_count(), 0);
    }

    #[test]
    fn test_insert_errors() {
        let parent = list_of(&["a"]);
        let child = parent.first_child().unwrap();
        let stranger = Node::element("p");

        // Should reject a reference that belongs elsewhere
        assert_eq!(
            parent.insert_before(&Node::text("x"), Some(&stranger)),
            Err(DomError::NotAChild)
        );
        // Should reject cycles
        assert_eq!(
            child.append_child(&parent),
            Err(DomError::HierarchyRequest)
        );
        // Should reject children on text nodes
        assert_eq!(
            Node::text("t").append_child(&stranger),
            Err(DomError::NotAContainer("text"))
        );
    }

    #[test]
    fn test_remove() {
        let parent = list_of(&["a", "b"]);
        let a = parent.first_child().unwrap();

        a.remove();
        a.remove();

        assert_eq!(names(&parent), ["b"]);
        assert!(a.parent().is_none());
        assert_eq!(parent.remove_child(&a), Err(DomError::NotAChild));
    }

    #[test]
    fn test_property_reflection() {
        let el = Node::element("div");

        el.set_property("className", Value::from("big"));
        el.set_property("hidden", Value::Bool(true));
        el.set_property("custom", Value::Int(4));

        assert_eq!(el.attribute("class").as_deref(), Some("big"));
        assert!(el.has_attribute("hidden"));
        assert!(!el.has_attribute("custom"));
        assert_eq!(el.property("custom"), Some(Value::Int(4)));

        el.set_property("hidden", Value::Bool(false));
        assert!(!el.has_attribute("hidden"));
    }

    #[test]
    fn test_mutation_counter() {
        let el = Node::element("div");
        let before = mutation_count();

        el.set_attribute("a", "1");
        el.append_child(&Node::text("x")).unwrap();
        el.remove_attribute("missing");

        assert_eq!(mutation_count() - before, 2);
    }

    #[test]
    fn test_event_phases() {
        let outer = Node::element("div");
        let inner = Node::element("button");
        outer.append_child(&inner).unwrap();

        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let push = |label: &'static str| -> EventCallback {
            let log = log.clone();
            Arc::new(move |_: &Event| log.lock().push(label))
        };
        outer.add_event_listener("click", ListenerOptions::default(), push("outer-bubble"));
        outer.add_event_listener(
            "click",
            ListenerOptions::default().capture(true),
            push("outer-capture"),
        );
        inner.add_event_listener("click", ListenerOptions::default(), push("target"));

        inner.click();

        assert_eq!(*log.lock(), ["outer-capture", "target", "outer-bubble"]);
    }

    #[test]
    fn test_once_and_stop_propagation() {
        let outer = Node::element("div");
        let inner = Node::element("span");
        outer.append_child(&inner).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        outer.add_event_listener(
            "click",
            ListenerOptions::default(),
            Arc::new(move |_: &Event| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        inner.add_event_listener(
            "click",
            ListenerOptions::default().once(true),
            Arc::new(|event: &Event| event.stop_propagation()),
        );

        // First click is stopped at the target, the second bubbles
        inner.click();
        inner.click();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(inner.listener_count("click"), 0);
    }

    #[test]
    fn test_expando() {
        let el = Node::element("div");
        el.set_expando(7u32);
        el.set_expando(String::from("owner"));
        el.set_expando(9u32);

        assert_eq!(el.expando::<u32>(), Some(9));
        assert_eq!(el.expando::<String>().as_deref(), Some("owner"));
        assert_eq!(el.expando::<i64>(), None);
    }
}
