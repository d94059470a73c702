//! Parts
//!
//! A part is a live binding site: the place in a rendered tree where one
//! template hole writes its value. Parts are created once per template
//! instance and keep their kind for their whole life; only the committed
//! value changes between renders.
//!
//! # Change Detection
//!
//! Every part remembers what it last committed and skips values that are
//! [`Value::same_as`] that record, so re-rendering an unchanged value does not
//! touch the tree. Directive values bypass the check and are always handed to
//! their directive.
//!
//! # Ownership
//!
//! Part state sits behind `Arc<Mutex<_>>`. The owning template instance holds
//! the strong references; directives that commit later hold a [`PartHandle`],
//! which is weak. Locks are only ever taken from a part down into its nested
//! parts, never upwards.

mod attribute;
mod child;
mod event;

use std::fmt;
use std::sync::Weak;

use parking_lot::Mutex;
use serde::Serialize;
use smallvec::SmallVec;

pub use attribute::{AttributePart, BooleanAttributePart, ElementPart, PropertyPart};
pub use child::ChildPart;
pub use event::EventPart;

pub(crate) use attribute::{AttributeState, BooleanState, ElementState};
pub(crate) use child::ChildState;
pub(crate) use event::EventState;

use crate::dom::Node;
use crate::error::RenderError;
use crate::template::PartDescriptor;
use crate::value::Value;

/// The kind of a binding site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartKind {
    Child,
    Attribute,
    Property,
    BooleanAttribute,
    Event,
    Element,
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PartKind::Child => "child",
            PartKind::Attribute => "attribute",
            PartKind::Property => "property",
            PartKind::BooleanAttribute => "boolean attribute",
            PartKind::Event => "event",
            PartKind::Element => "element",
        })
    }
}

/// A live binding site inside a template instance.
pub enum Part {
    Child(ChildPart),
    Attribute(AttributePart),
    Property(PropertyPart),
    BooleanAttribute(BooleanAttributePart),
    Event(EventPart),
    Element(ElementPart),
}

impl Part {
    /// Bind a descriptor to the node its path resolved to.
    pub(crate) fn from_descriptor(
        descriptor: &PartDescriptor,
        node: Node,
        connected: bool,
    ) -> Self {
        match descriptor {
            PartDescriptor::Child { .. } => {
                let end = node.next_sibling();
                Part::Child(ChildPart::new(node, end, connected))
            }
            PartDescriptor::Attribute { name, strings, .. } => Part::Attribute(AttributePart::new(
                node,
                name.clone(),
                strings.clone(),
                false,
                connected,
            )),
            PartDescriptor::Property { name, strings, .. } => Part::Property(PropertyPart::new(
                node,
                name.clone(),
                strings.clone(),
                connected,
            )),
            PartDescriptor::BooleanAttribute { name, .. } => {
                Part::BooleanAttribute(BooleanAttributePart::new(node, name.clone(), connected))
            }
            PartDescriptor::Event { name, .. } => {
                Part::Event(EventPart::new(node, name.clone(), connected))
            }
            PartDescriptor::Element { .. } => Part::Element(ElementPart::new(node, connected)),
        }
    }

    pub fn kind(&self) -> PartKind {
        match self {
            Part::Child(_) => PartKind::Child,
            Part::Attribute(_) => PartKind::Attribute,
            Part::Property(_) => PartKind::Property,
            Part::BooleanAttribute(_) => PartKind::BooleanAttribute,
            Part::Event(_) => PartKind::Event,
            Part::Element(_) => PartKind::Element,
        }
    }

    /// Number of template values this part consumes per render.
    pub fn value_count(&self) -> usize {
        match self {
            Part::Attribute(part) => part.value_count(),
            Part::Property(part) => part.value_count(),
            _ => 1,
        }
    }

    /// Resolve and commit this part's share of a render's values.
    pub(crate) fn set_values(&self, values: SmallVec<[Value; 4]>) -> Result<(), RenderError> {
        fn first(values: SmallVec<[Value; 4]>) -> Value {
            values.into_iter().next().unwrap_or(Value::Nothing)
        }
        match self {
            Part::Child(part) => part.set_value(first(values)),
            Part::Attribute(part) => part.set_values(values),
            Part::Property(part) => part.set_values(values),
            Part::BooleanAttribute(part) => part.set_value(first(values)),
            Part::Event(part) => part.set_value(first(values)),
            Part::Element(part) => part.set_value(first(values)),
        }
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        match self {
            Part::Child(part) => part.set_connected(connected),
            Part::Attribute(part) => part.set_connected(connected),
            Part::Property(part) => part.set_connected(connected),
            Part::BooleanAttribute(part) => part.set_connected(connected),
            Part::Event(part) => part.set_connected(connected),
            Part::Element(part) => part.set_connected(connected),
        }
    }

    pub(crate) fn dispose(&self) {
        match self {
            Part::Child(part) => part.dispose(),
            Part::Attribute(part) => part.dispose(),
            Part::Property(part) => part.dispose(),
            Part::BooleanAttribute(part) => part.dispose(),
            Part::Event(part) => part.dispose(),
            Part::Element(part) => part.dispose(),
        }
    }
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Part").field(&self.kind()).finish()
    }
}

#[derive(Clone)]
enum WeakPart {
    Child(Weak<Mutex<ChildState>>),
    Attribute(Weak<Mutex<AttributeState>>),
    Boolean(Weak<Mutex<BooleanState>>),
    Event(Weak<Mutex<EventState>>),
    Element(Weak<Mutex<ElementState>>),
}

/// How a guarded commit writes its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommitMode {
    Replace,
    /// Into a new nested part after the current content of a child part.
    Append { clear: bool },
}

/// Outcome of [`PartHandle::commit_if`].
#[derive(Debug)]
pub(crate) enum Guarded {
    Committed,
    /// The guard failed; the value is handed back.
    Refused(Value),
    /// The part no longer exists.
    Dropped,
}

/// A weak, cloneable reference a directive uses to commit values later.
///
/// Commits through a handle whose part has been dropped are ignored.
/// Handles must not be used from inside a directive's `update`, which runs
/// while the part is locked; return the value instead.
#[derive(Clone)]
pub struct PartHandle {
    kind: PartKind,
    target: WeakPart,
    index: usize,
}

impl PartHandle {
    pub(crate) fn child(state: Weak<Mutex<ChildState>>) -> Self {
        Self {
            kind: PartKind::Child,
            target: WeakPart::Child(state),
            index: 0,
        }
    }

    pub(crate) fn attribute(state: Weak<Mutex<AttributeState>>, kind: PartKind, index: usize) -> Self {
        Self {
            kind,
            target: WeakPart::Attribute(state),
            index,
        }
    }

    pub(crate) fn boolean(state: Weak<Mutex<BooleanState>>) -> Self {
        Self {
            kind: PartKind::BooleanAttribute,
            target: WeakPart::Boolean(state),
            index: 0,
        }
    }

    pub(crate) fn event(state: Weak<Mutex<EventState>>) -> Self {
        Self {
            kind: PartKind::Event,
            target: WeakPart::Event(state),
            index: 0,
        }
    }

    pub(crate) fn element(state: Weak<Mutex<ElementState>>) -> Self {
        Self {
            kind: PartKind::Element,
            target: WeakPart::Element(state),
            index: 0,
        }
    }

    pub fn kind(&self) -> PartKind {
        self.kind
    }

    /// Position of the bound value within a multi-value attribute.
    pub fn value_index(&self) -> usize {
        self.index
    }

    /// Whether the part still exists.
    pub fn is_alive(&self) -> bool {
        match &self.target {
            WeakPart::Child(state) => state.strong_count() > 0,
            WeakPart::Attribute(state) => state.strong_count() > 0,
            WeakPart::Boolean(state) => state.strong_count() > 0,
            WeakPart::Event(state) => state.strong_count() > 0,
            WeakPart::Element(state) => state.strong_count() > 0,
        }
    }

    /// Commit `value` to the part, bypassing the directive that owns it.
    pub fn set_value(&self, value: Value) -> Result<(), RenderError> {
        self.commit_if(CommitMode::Replace, value, || true).map(drop)
    }

    /// Render `value` into a new nested part after the current content of a
    /// child part. With `clear`, prior content is removed first.
    pub fn append_value(&self, value: Value, clear: bool) -> Result<(), RenderError> {
        self.commit_if(CommitMode::Append { clear }, value, || true).map(drop)
    }

    /// Commit `value` only if `admit` holds once the part is locked.
    ///
    /// Directive updates run under the same lock, so a directive that
    /// changes what `admit` checks cannot interleave with the write.
    pub(crate) fn commit_if(
        &self,
        mode: CommitMode,
        value: Value,
        admit: impl FnOnce() -> bool,
    ) -> Result<Guarded, RenderError> {
        if let Value::Directive(_) = value {
            return Err(RenderError::NestedDirective);
        }
        if matches!(mode, CommitMode::Append { .. }) && !matches!(self.target, WeakPart::Child(_)) {
            return Err(RenderError::UnsupportedValue {
                part: self.kind,
                value: "appended value",
            });
        }

        match &self.target {
            WeakPart::Child(state) => guarded(state, value, admit, |locked, value| match mode {
                CommitMode::Replace => locked.commit(value),
                CommitMode::Append { clear } => locked.append(value, clear),
            }),
            WeakPart::Attribute(state) => {
                guarded(state, value, admit, |locked, value| locked.commit_at(self.index, value))
            }
            WeakPart::Boolean(state) => guarded(state, value, admit, BooleanState::commit),
            WeakPart::Event(state) => guarded(state, value, admit, EventState::commit),
            WeakPart::Element(state) => guarded(state, value, admit, ElementState::commit),
        }
    }
}

fn guarded<S>(
    state: &Weak<Mutex<S>>,
    value: Value,
    admit: impl FnOnce() -> bool,
    commit: impl FnOnce(&mut S, Value) -> Result<(), RenderError>,
) -> Result<Guarded, RenderError> {
    let Some(state) = state.upgrade() else {
        return Ok(Guarded::Dropped);
    };
    let mut locked = state.lock();
    if !admit() {
        return Ok(Guarded::Refused(value));
    }
    commit(&mut locked, value)?;
    Ok(Guarded::Committed)
}

impl fmt::Debug for PartHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartHandle")
            .field("kind", &self.kind)
            .field("index", &self.index)
            .field("alive", &self.is_alive())
            .finish()
    }
}
