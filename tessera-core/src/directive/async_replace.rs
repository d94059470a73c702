//! `async_replace`: render the latest value of an async source.

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::warn;

use super::stream::{AsyncArgs, Gate, Mode, Pump};
use super::{AsyncSource, Directive, DirectivePart, DirectiveResult};
use crate::error::RenderError;
use crate::value::Value;

/// Renders each value an [`AsyncSource`] yields, replacing the previous one.
///
/// Works in any part. Until the first value arrives the part keeps whatever
/// it showed before. Passing a different source starts over; values the old
/// source yields afterwards are dropped.
pub struct AsyncReplace {
    gate: Arc<Gate>,
    source: Option<AsyncSource>,
}

impl AsyncReplace {
    pub(super) fn start(
        gate: &Arc<Gate>,
        current: &mut Option<AsyncSource>,
        part: &DirectivePart<'_>,
        args: &AsyncArgs,
        mode: Mode,
        directive: &'static str,
    ) -> Result<Value, RenderError> {
        if current.as_ref().is_some_and(|s| s.same_as(&args.source)) {
            return Ok(Value::NoChange);
        }
        let runtime = Handle::try_current().map_err(|_| RenderError::NoRuntime)?;

        let generation = gate.advance();
        *current = Some(args.source.clone());
        let Some(stream) = args.source.take_stream() else {
            warn!(directive, "async source was already consumed elsewhere");
            return Ok(Value::NoChange);
        };

        runtime.spawn(
            Pump {
                stream,
                handle: part.handle(),
                gate: gate.clone(),
                generation,
                mapper: args.mapper.clone(),
                mode,
                directive,
            }
            .run(),
        );
        Ok(Value::NoChange)
    }
}

impl Directive for AsyncReplace {
    type Args = AsyncArgs;
    const NAME: &'static str = "async_replace";

    fn create(part: &DirectivePart<'_>) -> Result<Self, RenderError> {
        Ok(Self {
            gate: Gate::new(part.is_connected()),
            source: None,
        })
    }

    fn update(&mut self, part: &mut DirectivePart<'_>, args: &AsyncArgs) -> Result<Value, RenderError> {
        Self::start(&self.gate, &mut self.source, part, args, Mode::Replace, Self::NAME)
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

/// Render the values of `source` as they arrive.
pub fn async_replace(source: AsyncSource) -> DirectiveResult {
    DirectiveResult::new::<AsyncReplace>(AsyncArgs::new(source, None))
}

/// Like [`async_replace`], passing each value and its index through `mapper`.
pub fn async_replace_with<F>(source: AsyncSource, mapper: F) -> DirectiveResult
where
    F: Fn(Value, usize) -> Value + Send + Sync + 'static,
{
    DirectiveResult::new::<AsyncReplace>(AsyncArgs::new(source, Some(Arc::new(mapper))))
}
