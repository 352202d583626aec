use crate::{
    Context, DbError, Driver, Environment, Error, ErrorContext, LogTargets, NativeConnection,
    Profiler, Result, Slot, TransactionSlot, is_verbose,
};
use futures::{FutureExt, future::BoxFuture};
use std::{
    fmt,
    future::Future,
    sync::{Arc, Mutex, OnceLock, PoisonError, atomic::AtomicBool},
};

/// Operation run by [`Connection::run_tx`] and [`Connection::run_context`] on a derived copy.
pub type ConnectionFn<D> = Box<dyn FnOnce(Connection<D>) -> BoxFuture<'static, Result<()>> + Send>;

/// Boxes an async closure into a [`ConnectionFn`].
///
/// ```rust,ignore
/// connection
///     .run_tx([connection_fn(|tx: Connection<MySQLDriver>| async move {
///         tx.exec(&Query::new("DELETE FROM articles")).await.map(|_| ())
///     })])
///     .await?;
/// ```
pub fn connection_fn<D, F, Fut>(f: F) -> ConnectionFn<D>
where
    D: Driver,
    F: FnOnce(Connection<D>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Box::new(move |connection| f(connection).boxed())
}

/// Root-wide profiling state, created on the first successful connect when profiling is enabled.
pub(crate) struct Profiling {
    pub(crate) context: Context,
    pub(crate) profiler: Profiler,
}

/// State shared by a root connection and every copy derived from it.
#[derive(Default)]
pub(crate) struct Family {
    pub(crate) profiling: OnceLock<Profiling>,
    /// Set once a closed profiler refused a state.
    pub(crate) profiler_refused: AtomicBool,
}

/// Handle on a pooled native database connection.
///
/// A connection is either a root (returned by the [`crate::Pool`] `open*` family) or a copy
/// derived from one by [`Connection::copy`], [`Connection::with_context`] or
/// [`Connection::begin_tx`]. Copies share the pool slot, so they all observe the same native
/// connection once it is established, but each has its own transaction and context fields.
/// Only a root closes the native connection.
pub struct Connection<D: Driver> {
    pub(crate) driver: Arc<D>,
    pub(crate) slot: Arc<Slot<D::Connection>>,
    pub(crate) family: Arc<Family>,
    pub(crate) transaction: Option<Arc<TransactionSlot<D::Transaction>>>,
    pub(crate) context: Option<Context>,
    pub(crate) env: Arc<Environment>,
    pub(crate) log: LogTargets,
    pub(crate) last_error: Mutex<Option<Arc<str>>>,
    pub(crate) root: bool,
}

impl<D: Driver> Connection<D> {
    pub(crate) fn new(driver: Arc<D>, slot: Arc<Slot<D::Connection>>, env: Environment) -> Self {
        Self {
            driver,
            slot,
            family: Default::default(),
            transaction: None,
            context: None,
            log: LogTargets::new(&env),
            env: Arc::new(env),
            last_error: Mutex::new(None),
            root: true,
        }
    }

    /// Shallow copy sharing the slot, the transaction and the context of `self`.
    pub fn copy(&self) -> Self {
        Self {
            driver: self.driver.clone(),
            slot: self.slot.clone(),
            family: self.family.clone(),
            transaction: self.transaction.clone(),
            context: self.context.clone(),
            env: self.env.clone(),
            log: self.log.clone(),
            last_error: Mutex::new(None),
            root: false,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn slot_id(&self) -> usize {
        self.slot.id()
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn is_connected(&self) -> bool {
        self.slot.is_connected()
    }

    pub fn log_targets(&self) -> &LogTargets {
        &self.log
    }

    /// Redirects the output and error logs to other `log` targets, `None` keeps the current one.
    pub fn set_log_targets(&mut self, out: Option<&str>, err: Option<&str>) {
        self.log.set(out, err);
    }

    /// Message of the last error this connection returned.
    pub fn last_error(&self) -> Option<Arc<str>> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn fail(&self, error: Error) -> Error {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(format!("{:#}", error).into());
        if is_verbose(&self.env) {
            self.log.error(format_args!("{:#}", error));
        }
        error
    }

    /// Establishes the native connection unless already done, at most once per slot even with
    /// concurrent callers. When profiling is enabled, creates the profiling context and profiler
    /// of the root.
    pub async fn connect(&self) -> Result<()> {
        if !self.slot.is_connected() {
            let _guard = self.slot.connect_lock.lock().await;
            if !self.slot.is_connected() {
                let native = self
                    .driver
                    .connect(&self.env)
                    .await
                    .with_context(|| {
                        format!(
                            "While connecting to {} database `{}`",
                            D::NAME,
                            self.env.alias
                        )
                    })
                    .map_err(|e| self.fail(e))?;
                self.slot.set(Arc::new(native));
                if is_verbose(&self.env) {
                    self.log.info(format_args!("connected"));
                }
            }
        }
        if self.env.profiler_enable {
            self.family.profiling.get_or_init(|| Profiling {
                context: Context::new(Vec::<String>::new()),
                profiler: Profiler::new(&self.env.profiler_output),
            });
        }
        Ok(())
    }

    /// The native connection, establishing it first if needed.
    pub async fn native(&self) -> Result<Arc<D::Connection>> {
        self.connect().await?;
        self.slot
            .get()
            .ok_or_else(|| self.fail(DbError::BadConnection.into()))
    }

    /// Verifies the native connection is alive, establishing it first if needed.
    pub async fn ping(&self) -> Result<()> {
        let native = self.native().await?;
        native.ping().await.map_err(|e| self.fail(e))
    }

    /// [`Connection::ping`] that panics on failure, meant for startup checks where a
    /// misconfigured database must abort the program.
    pub async fn must_ping(&self) {
        if let Err(e) = self.ping().await {
            panic!("{:#}", e);
        }
    }

    /// Ends the context of this connection. A root additionally ends its profiling context and
    /// profiler, then closes the native connection. The profiler is not restarted if the
    /// connection is used again, the statements run afterwards are not profiled.
    pub async fn close(&self) -> Result<()> {
        if let Some(context) = &self.context {
            context.done().await;
        }
        if !self.root {
            return Ok(());
        }
        if let Some(profiling) = self.family.profiling.get() {
            profiling.context.done().await;
            profiling.profiler.close().await;
        }
        match self.slot.take() {
            Some(native) => native.close().await.map_err(|e| self.fail(e)),
            None => Ok(()),
        }
    }

    pub fn profiler(&self) -> Option<&Profiler> {
        self.family.profiling.get().map(|v| &v.profiler)
    }

    pub fn has_profiler(&self) -> bool {
        self.profiler().is_some()
    }
}

impl<D: Driver> fmt::Debug for Connection<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("driver", &D::NAME)
            .field("slot", &self.slot)
            .field("root", &self.root)
            .field("transaction", &self.transaction.is_some())
            .field("context", &self.context.as_ref().map(Context::id))
            .field("env", &self.env)
            .finish()
    }
}
