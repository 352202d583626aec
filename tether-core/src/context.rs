use crate::{Connection, ConnectionFn, Driver, QueryState, Result};
use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::{sync::mpsc, task::JoinHandle};
use uuid::Uuid;

/// Operation run by [`Connection::run_context`].
pub type ContextFn<D> = ConnectionFn<D>;

const CHANNEL_CAPACITY: usize = 64;

struct Inner {
    id: Arc<str>,
    flags: Arc<[String]>,
    sender: Mutex<Option<mpsc::Sender<QueryState>>>,
    states: Arc<Mutex<Vec<QueryState>>>,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

/// Correlation scope collecting the [`QueryState`] of the statements run through it.
///
/// A single background task drains the states pushed by any number of producers into an
/// append-only log, in the order they are received. [`Context::done`] stops accepting new
/// states, lets the task drain what was already handed over and waits for it.
///
/// Cloning is cheap, clones share the same scope.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    /// Starts the collector, must be called from within a tokio runtime.
    pub fn new<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (sender, mut receiver) = mpsc::channel::<QueryState>(CHANNEL_CAPACITY);
        let states = Arc::new(Mutex::new(Vec::new()));
        let worker = tokio::spawn({
            let states = states.clone();
            async move {
                while let Some(state) = receiver.recv().await {
                    states
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(state);
                }
            }
        });
        Self {
            inner: Arc::new(Inner {
                id: Uuid::new_v4().simple().to_string().into(),
                flags: flags.into_iter().map(Into::into).collect(),
                sender: Mutex::new(Some(sender)),
                states,
                worker: tokio::sync::Mutex::new(Some(worker)),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn flags(&self) -> &[String] {
        &self.inner.flags
    }

    /// The flags concatenated.
    pub fn flag(&self) -> String {
        self.inner.flags.concat()
    }

    /// Hands `state` to the collector. Returns false once the context is done.
    pub async fn push(&self, state: QueryState) -> bool {
        let sender = self
            .inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match sender {
            Some(sender) => sender.send(state).await.is_ok(),
            None => false,
        }
    }

    /// Stops accepting states and waits until the already accepted ones are collected.
    /// Calling it again has no effect.
    pub async fn done(&self) {
        self.inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let mut worker = self.inner.worker.lock().await;
        if let Some(worker) = worker.take() {
            if let Err(e) = worker.await {
                log::error!("Context {} collector failed: {:#}", self.id(), e);
            }
        }
    }

    pub fn is_done(&self) -> bool {
        self.inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Clears the collected states, the collector keeps running.
    pub fn flush(&self) {
        self.states().clear();
    }

    /// Number of states collected so far.
    pub fn len(&self) -> usize {
        self.states().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the collected states.
    pub fn entries(&self) -> Vec<QueryState> {
        self.states().clone()
    }

    fn states(&self) -> std::sync::MutexGuard<'_, Vec<QueryState>> {
        self.inner
            .states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn flags_arc(&self) -> Arc<[String]> {
        self.inner.flags.clone()
    }

    pub(crate) fn id_arc(&self) -> Arc<str> {
        self.inner.id.clone()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.inner.id)
            .field("flags", &self.inner.flags)
            .field("len", &self.len())
            .field("done", &self.is_done())
            .finish()
    }
}

impl<D: Driver> Connection<D> {
    /// Copy of this connection scoped by a new [`Context`] tagged with `flags`.
    pub fn with_context<I, S>(&self, flags: I) -> Connection<D>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut result = self.copy();
        result.context = Some(Context::new(flags));
        result
    }

    /// The context the statements of this connection are collected into: its own scope if any,
    /// otherwise the profiling context of the root.
    pub fn context(&self) -> Option<&Context> {
        self.context
            .as_ref()
            .or_else(|| self.family.profiling.get().map(|v| &v.context))
    }

    pub fn has_context(&self) -> bool {
        self.context().is_some()
    }

    /// Ends the scope created by [`Connection::with_context`]. The profiling context of the
    /// root is left running, it ends with [`Connection::close`].
    pub async fn done(&self) {
        if let Some(context) = &self.context {
            context.done().await;
        }
    }

    /// Runs `ops` in sequence on a new context scope, stopping at the first error. The scope is
    /// always ended, the first error is returned.
    pub async fn run_context(&self, ops: impl IntoIterator<Item = ContextFn<D>>) -> Result<()> {
        self.run_context_with(Vec::<String>::new(), ops).await
    }

    /// [`Connection::run_context`] with a flagged scope.
    pub async fn run_context_with<I, S>(
        &self,
        flags: I,
        ops: impl IntoIterator<Item = ContextFn<D>>,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let scoped = self.with_context(flags);
        let mut result = Ok(());
        for op in ops {
            if let Err(e) = op(scoped.copy()).await {
                result = Err(e);
                break;
            }
        }
        scoped.done().await;
        result
    }
}
