//! Directives
//!
//! A directive is a stateful value handler bound to one binding site. The
//! value a template carries is a [`DirectiveResult`]: the directive's type
//! plus the arguments of this render. The part keeps the directive instance
//! between renders.
//!
//! # Lifecycle
//!
//! 1. The first time a site sees a directive type, [`Directive::create`]
//!    builds an instance.
//!
//! 2. Every render at that site, including the first, calls
//!    [`Directive::update`] with the new arguments. The returned value is
//!    committed, unless it is [`Value::NoChange`].
//!
//! 3. When the site receives a different directive type or a plain value,
//!    or the site is torn down, [`Directive::dispose`] runs and the instance
//!    is dropped.
//!
//! 4. Toggling the connection state of a rendered tree calls
//!    [`Directive::disconnected`] and [`Directive::reconnected`] on every
//!    directive inside it.
//!
//! Directives that produce values later keep the [`PartHandle`] from
//! [`DirectivePart::handle`] and commit through it.

mod async_append;
mod async_replace;
mod repeat;
mod stream;

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

pub use async_append::{async_append, async_append_with, AsyncAppend};
pub use async_replace::{async_replace, async_replace_with, AsyncReplace};
pub use repeat::{repeat, Repeat, RepeatArgs, RepeatKey};
pub use stream::{AsyncArgs, AsyncSender, AsyncSource, Mapper, SourceError};

use crate::error::RenderError;
use crate::part::{ChildState, PartHandle, PartKind};
use crate::value::Value;

/// A custom value handler bound to one binding site.
///
/// # Example
///
/// ```rust,ignore
/// struct Counter(i64);
///
/// impl Directive for Counter {
///     type Args = ();
///     const NAME: &'static str = "counter";
///
///     fn create(_part: &DirectivePart<'_>) -> Result<Self, RenderError> {
///         Ok(Counter(0))
///     }
///
///     fn update(&mut self, _part: &mut DirectivePart<'_>, _args: &()) -> Result<Value, RenderError> {
///         self.0 += 1;
///         Ok(Value::Int(self.0))
///     }
/// }
///
/// let value = DirectiveResult::new::<Counter>(());
/// ```
pub trait Directive: Send + 'static {
    /// Arguments passed on every render.
    type Args: Send + Sync + 'static;

    /// Name used in error messages.
    const NAME: &'static str;

    fn create(part: &DirectivePart<'_>) -> Result<Self, RenderError>
    where
        Self: Sized;

    fn update(&mut self, part: &mut DirectivePart<'_>, args: &Self::Args) -> Result<Value, RenderError>;

    fn disconnected(&mut self) {}

    fn reconnected(&mut self) {}

    fn dispose(&mut self) {}
}

/// Object-safe view of a [`Directive`] with its arguments erased.
pub(crate) trait DynDirective: Send {
    fn update_dyn(
        &mut self,
        part: &mut DirectivePart<'_>,
        args: &(dyn Any + Send + Sync),
    ) -> Result<Value, RenderError>;

    fn on_disconnected(&mut self);

    fn on_reconnected(&mut self);

    fn on_dispose(&mut self);
}

impl<D: Directive> DynDirective for D {
    fn update_dyn(
        &mut self,
        part: &mut DirectivePart<'_>,
        args: &(dyn Any + Send + Sync),
    ) -> Result<Value, RenderError> {
        let args = args
            .downcast_ref::<D::Args>()
            .ok_or(RenderError::DirectiveArguments(D::NAME))?;
        self.update(part, args)
    }

    fn on_disconnected(&mut self) {
        Directive::disconnected(self)
    }

    fn on_reconnected(&mut self) {
        Directive::reconnected(self)
    }

    fn on_dispose(&mut self) {
        Directive::dispose(self)
    }
}

type Constructor = fn(&DirectivePart<'_>) -> Result<Box<dyn DynDirective>, RenderError>;

fn construct<D: Directive>(part: &DirectivePart<'_>) -> Result<Box<dyn DynDirective>, RenderError> {
    Ok(Box::new(D::create(part)?))
}

/// A directive value: which directive to run and the arguments for it.
#[derive(Clone)]
pub struct DirectiveResult {
    type_id: TypeId,
    name: &'static str,
    construct: Constructor,
    args: Arc<dyn Any + Send + Sync>,
}

impl DirectiveResult {
    pub fn new<D: Directive>(args: D::Args) -> Self {
        Self {
            type_id: TypeId::of::<D>(),
            name: D::NAME,
            construct: construct::<D>,
            args: Arc::new(args),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this value runs directive `D`.
    pub fn is<D: Directive>(&self) -> bool {
        self.type_id == TypeId::of::<D>()
    }

    pub(crate) fn same_as(&self, other: &DirectiveResult) -> bool {
        self.type_id == other.type_id && Arc::ptr_eq(&self.args, &other.args)
    }
}

impl fmt::Debug for DirectiveResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveResult")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// What a directive sees of the part it is bound to.
pub struct DirectivePart<'a> {
    kind: PartKind,
    handle: PartHandle,
    connected: bool,
    child: Option<&'a mut ChildState>,
}

impl<'a> DirectivePart<'a> {
    pub(crate) fn new(kind: PartKind, handle: PartHandle, connected: bool) -> Self {
        Self {
            kind,
            handle,
            connected,
            child: None,
        }
    }

    pub(crate) fn child(handle: PartHandle, connected: bool, state: &'a mut ChildState) -> Self {
        Self {
            kind: PartKind::Child,
            handle,
            connected,
            child: Some(state),
        }
    }

    pub fn kind(&self) -> PartKind {
        self.kind
    }

    /// A weak handle for committing values after `update` has returned.
    pub fn handle(&self) -> PartHandle {
        self.handle.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Direct access to a child part's content, for list directives.
    pub(crate) fn child_mut(&mut self) -> Option<&mut ChildState> {
        self.child.as_deref_mut()
    }
}

/// The directive instance a part holds between renders.
pub(crate) struct DirectiveSlot {
    type_id: TypeId,
    name: &'static str,
    instance: Box<dyn DynDirective>,
}

impl DirectiveSlot {
    pub(crate) fn disconnected(&mut self) {
        self.instance.on_disconnected();
    }

    pub(crate) fn reconnected(&mut self) {
        self.instance.on_reconnected();
    }

    pub(crate) fn dispose(mut self) {
        tracing::trace!(directive = self.name, "disposing directive");
        self.instance.on_dispose();
    }
}

/// Run `value` through the directive held in `slot`.
///
/// Plain values dispose whatever directive the slot held and pass through.
/// Directive values reuse the held instance when the type matches, otherwise
/// the old one is disposed and a new one created.
pub(crate) fn resolve(
    slot: &mut Option<DirectiveSlot>,
    value: Value,
    part: &mut DirectivePart<'_>,
) -> Result<Value, RenderError> {
    let result = match value {
        Value::Directive(result) => result,
        other => {
            if let Some(old) = slot.take() {
                old.dispose();
            }
            return Ok(other);
        }
    };

    let current = match slot.take() {
        Some(existing) if existing.type_id == result.type_id => existing,
        previous => {
            if let Some(old) = previous {
                old.dispose();
            }
            DirectiveSlot {
                type_id: result.type_id,
                name: result.name,
                instance: (result.construct)(part)?,
            }
        }
    };
    let current = slot.insert(current);

    let value = current.instance.update_dyn(part, &*result.args)?;
    if let Value::Directive(_) = value {
        return Err(RenderError::NestedDirective);
    }
    Ok(value)
}
