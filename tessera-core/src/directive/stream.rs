//! Async value sources and the task that commits their values.
//!
//! # How It Works
//!
//! An async directive takes the stream out of its [`AsyncSource`] and spawns
//! a consumer task holding a weak [`PartHandle`]. Before every commit the task
//! asks the directive's [`Gate`], first while waiting and again with the part
//! locked:
//!
//! - a newer source has replaced this one, or the directive was disposed:
//!   the value is dropped and the task ends
//! - the part is disconnected: the task parks until it is reconnected, then
//!   commits the value it was holding
//! - otherwise: the value is committed
//!
//! The task also watches the gate while waiting for the next item, so a
//! superseded consumer stops without waiting for its stream to yield again.

use std::fmt;
use std::sync::Arc;

use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, trace};

use crate::part::{CommitMode, Guarded, PartHandle};
use crate::value::Value;

/// Error type carried by fallible sources.
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Maps each yielded value, with its index, before it is committed.
pub type Mapper = Arc<dyn Fn(Value, usize) -> Value + Send + Sync>;

type ValueStream = BoxStream<'static, Result<Value, SourceError>>;

/// A stream of values with an identity.
///
/// Clones share the identity and the stream. The stream can be consumed
/// once; passing the same source again on a later render is a no-op.
#[derive(Clone)]
pub struct AsyncSource(Arc<Mutex<Option<ValueStream>>>);

impl AsyncSource {
    pub fn new<S, T>(stream: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
        T: Into<Value>,
    {
        Self::from_boxed(stream.map(|item| Ok(item.into())).boxed())
    }

    /// A source whose stream can fail. The first error is logged and ends
    /// consumption.
    pub fn try_new<S, T, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<T, E>> + Send + 'static,
        T: Into<Value>,
        E: Into<SourceError>,
    {
        Self::from_boxed(
            stream
                .map(|item| item.map(Into::into).map_err(Into::into))
                .boxed(),
        )
    }

    /// A source fed by pushing values into the returned sender. The stream
    /// ends when every sender is dropped.
    pub fn channel() -> (AsyncSender, AsyncSource) {
        let (tx, rx) = mpsc::unbounded_channel::<Value>();
        let values = stream::unfold(rx, |mut rx| async move {
            let value = rx.recv().await?;
            Some((value, rx))
        });
        (AsyncSender(tx), AsyncSource::new(values))
    }

    fn from_boxed(stream: ValueStream) -> Self {
        Self(Arc::new(Mutex::new(Some(stream))))
    }

    pub fn same_as(&self, other: &AsyncSource) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Whether a directive has already taken the stream.
    pub fn is_consumed(&self) -> bool {
        self.0.lock().is_none()
    }

    pub(crate) fn take_stream(&self) -> Option<ValueStream> {
        self.0.lock().take()
    }
}

impl fmt::Debug for AsyncSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncSource")
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

/// Push side of [`AsyncSource::channel`].
#[derive(Clone, Debug)]
pub struct AsyncSender(mpsc::UnboundedSender<Value>);

impl AsyncSender {
    /// Queue a value. Returns `false` once the source has been dropped.
    pub fn push(&self, value: impl Into<Value>) -> bool {
        self.0.send(value.into()).is_ok()
    }
}

/// Arguments shared by the async directives.
pub struct AsyncArgs {
    pub(crate) source: AsyncSource,
    pub(crate) mapper: Option<Mapper>,
}

impl AsyncArgs {
    pub(crate) fn new(source: AsyncSource, mapper: Option<Mapper>) -> Self {
        Self { source, mapper }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Commit,
    Wait,
    Stale,
}

struct GateState {
    generation: u64,
    connected: bool,
    disposed: bool,
}

/// Decides whether a consumer task may commit right now.
pub(crate) struct Gate {
    state: Mutex<GateState>,
    changed: Notify,
}

impl Gate {
    pub(crate) fn new(connected: bool) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(GateState {
                generation: 0,
                connected,
                disposed: false,
            }),
            changed: Notify::new(),
        })
    }

    /// Start a new generation, making every older consumer stale.
    pub(crate) fn advance(&self) -> u64 {
        let generation = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.generation
        };
        self.changed.notify_waiters();
        generation
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.state.lock().connected = connected;
        self.changed.notify_waiters();
    }

    pub(crate) fn dispose(&self) {
        self.state.lock().disposed = true;
        self.changed.notify_waiters();
    }

    fn admit(&self, generation: u64) -> Admission {
        let state = self.state.lock();
        if state.disposed || state.generation != generation {
            Admission::Stale
        } else if !state.connected {
            Admission::Wait
        } else {
            Admission::Commit
        }
    }

    /// Wait until `generation` may commit. Returns `false` if it went stale.
    async fn admitted(&self, generation: u64) -> bool {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            // Register before checking so a change in between is not missed.
            notified.as_mut().enable();
            match self.admit(generation) {
                Admission::Commit => return true,
                Admission::Stale => return false,
                Admission::Wait => notified.await,
            }
        }
    }

    /// Resolve once `generation` is stale.
    async fn superseded(&self, generation: u64) {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.admit(generation) == Admission::Stale {
                return;
            }
            notified.await;
        }
    }
}

/// How a consumer commits each value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Replace,
    Append,
}

/// One consumer task's worth of state.
pub(crate) struct Pump {
    pub(crate) stream: ValueStream,
    pub(crate) handle: PartHandle,
    pub(crate) gate: Arc<Gate>,
    pub(crate) generation: u64,
    pub(crate) mapper: Option<Mapper>,
    pub(crate) mode: Mode,
    pub(crate) directive: &'static str,
}

impl Pump {
    /// Commit values until the stream ends, goes stale, or fails.
    pub(crate) async fn run(self) {
        let Pump {
            mut stream,
            handle,
            gate,
            generation,
            mapper,
            mode,
            directive,
        } = self;

        let mut index = 0;
        loop {
            let next = tokio::select! {
                next = stream.next() => next,
                _ = gate.superseded(generation) => {
                    debug!(directive, "async source superseded");
                    return;
                }
            };
            let value = match next {
                Some(Ok(value)) => value,
                Some(Err(error)) => {
                    error!(directive, %error, "async source failed");
                    return;
                }
                None => {
                    trace!(directive, values = index, "async source finished");
                    return;
                }
            };

            let mut value = match &mapper {
                Some(map) => map(value, index),
                None => value,
            };
            let commit = match mode {
                Mode::Replace => CommitMode::Replace,
                Mode::Append => CommitMode::Append { clear: index == 0 },
            };
            loop {
                if !gate.admitted(generation).await {
                    debug!(directive, index, "discarding value from stale async source");
                    return;
                }
                // Check again under the part lock: a re-render may have
                // replaced the source since `admitted` returned.
                let admit = || gate.admit(generation) == Admission::Commit;
                match handle.commit_if(commit, value, admit) {
                    Ok(Guarded::Committed) => break,
                    Ok(Guarded::Refused(refused)) => value = refused,
                    Ok(Guarded::Dropped) => {
                        debug!(directive, "part dropped, stopping async source");
                        return;
                    }
                    Err(error) => {
                        error!(directive, %error, "failed to commit async value");
                        return;
                    }
                }
            }
            index += 1;
        }
    }
}
