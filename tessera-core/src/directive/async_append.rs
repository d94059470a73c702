//! `async_append`: render every value of an async source, in order.

use std::sync::Arc;

use super::async_replace::AsyncReplace;
use super::stream::{AsyncArgs, Gate, Mode};
use super::{AsyncSource, Directive, DirectivePart, DirectiveResult};
use crate::error::RenderError;
use crate::part::PartKind;
use crate::value::Value;

/// Appends each value an [`AsyncSource`] yields into its own nested child
/// part. The first value of a new source clears what was there before.
///
/// Only valid in child position.
pub struct AsyncAppend {
    gate: Arc<Gate>,
    source: Option<AsyncSource>,
}

impl Directive for AsyncAppend {
    type Args = AsyncArgs;
    const NAME: &'static str = "async_append";

    fn create(part: &DirectivePart<'_>) -> Result<Self, RenderError> {
        if part.kind() != PartKind::Child {
            return Err(RenderError::DirectiveMisuse {
                directive: Self::NAME,
                part: part.kind(),
            });
        }
        Ok(Self {
            gate: Gate::new(part.is_connected()),
            source: None,
        })
    }

    fn update(&mut self, part: &mut DirectivePart<'_>, args: &AsyncArgs) -> Result<Value, RenderError> {
        AsyncReplace::start(&self.gate, &mut self.source, part, args, Mode::Append, Self::NAME)
    }

    fn disconnected(&mut self) {
        self.gate.set_connected(false);
    }

    fn reconnected(&mut self) {
        self.gate.set_connected(true);
    }

    fn dispose(&mut self) {
        self.gate.dispose();
    }
}

/// Append the values of `source` as they arrive.
pub fn async_append(source: AsyncSource) -> DirectiveResult {
    DirectiveResult::new::<AsyncAppend>(AsyncArgs::new(source, None))
}

/// Like [`async_append`], passing each value and its index through `mapper`.
pub fn async_append_with<F>(source: AsyncSource, mapper: F) -> DirectiveResult
where
    F: Fn(Value, usize) -> Value + Send + Sync + 'static,
{
    DirectiveResult::new::<AsyncAppend>(AsyncArgs::new(source, Some(Arc::new(mapper))))
}
