use crate::{Connection, Driver, Environment, LogTargets, NativeConnection, Result, is_verbose};
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

/// Pool cell holding at most one native connection.
///
/// A slot is shared by reference between every [`Connection`] that acquired it. Its connect
/// lock serializes the establishment of the native connection, see [`Connection::connect`].
pub struct Slot<C> {
    id: usize,
    native: RwLock<Option<Arc<C>>>,
    pub(crate) connect_lock: tokio::sync::Mutex<()>,
}

impl<C> Slot<C> {
    fn new(id: usize, native: Option<C>) -> Self {
        Self {
            id,
            native: RwLock::new(native.map(Arc::new)),
            connect_lock: Default::default(),
        }
    }

    /// Stable index of the slot in its pool.
    pub fn id(&self) -> usize {
        self.id
    }

    /// The native connection, if established.
    pub fn get(&self) -> Option<Arc<C>> {
        self.native
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_connected(&self) -> bool {
        self.native
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn set(&self, native: Arc<C>) {
        *self.native.write().unwrap_or_else(PoisonError::into_inner) = Some(native);
    }

    pub(crate) fn take(&self) -> Option<Arc<C>> {
        self.native
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl<C> fmt::Debug for Slot<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

struct PoolState<C> {
    slots: Vec<Arc<Slot<C>>>,
    aliases: HashMap<String, usize>,
}

/// Process-wide registry of native connections for one driver.
///
/// Slots are only ever appended, an index stays valid for the lifetime of the pool. Acquiring
/// "once" (`reuse = true`) by alias always returns the same slot. The pool lock is held only
/// to look up or append a slot, never while connecting.
pub struct Pool<D: Driver> {
    driver: Arc<D>,
    state: Mutex<PoolState<D::Connection>>,
}

impl<D: Driver> Pool<D> {
    pub fn new(driver: D) -> Arc<Self> {
        Arc::new(Self {
            driver: Arc::new(driver),
            state: Mutex::new(PoolState {
                slots: Vec::with_capacity(5),
                aliases: HashMap::with_capacity(5),
            }),
        })
    }

    pub fn driver(&self) -> &Arc<D> {
        &self.driver
    }

    /// Returns the slot registered for `alias` when `reuse` is set, otherwise appends a new
    /// empty slot (registering it under `alias` if `reuse` is set).
    pub fn acquire(&self, alias: &str, reuse: bool) -> Arc<Slot<D::Connection>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if reuse {
            if let Some(index) = state.aliases.get(alias) {
                return state.slots[*index].clone();
            }
        }
        let slot = Self::append(&mut state, None);
        if reuse {
            state.aliases.insert(alias.to_string(), slot.id());
        }
        slot
    }

    fn append(
        state: &mut PoolState<D::Connection>,
        native: Option<D::Connection>,
    ) -> Arc<Slot<D::Connection>> {
        let slot = Arc::new(Slot::new(state.slots.len(), native));
        state.slots.push(slot.clone());
        slot
    }

    pub fn slot(&self, index: usize) -> Option<Arc<Slot<D::Connection>>> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.slots.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .slots
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closes every established native connection. Failures are logged, not reported.
    pub async fn close_all(&self) {
        let slots = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .slots
            .clone();
        for slot in slots {
            if let Some(native) = slot.take() {
                if let Err(e) = native.close().await {
                    log::error!("{:#}", e.context(format!("While closing slot {}", slot.id())));
                }
            }
        }
    }

    /// Opens a connection to `env`, always on a new slot.
    pub async fn open(&self, env: Environment) -> Result<Connection<D>> {
        self.open_slot(env, false, None).await
    }

    /// Opens a connection to `env`, reusing the slot of `env.alias` when it exists.
    pub async fn open_once(&self, env: Environment) -> Result<Connection<D>> {
        self.open_slot(env, true, None).await
    }

    /// Opens a connection configured by the `DATABASE_*` variables, overlaid with the
    /// `DATABASE_<ALIAS>_*` ones when `alias` is not empty.
    pub async fn open_env(&self, alias: &str) -> Result<Connection<D>> {
        self.open_slot(Self::environment(alias), false, None).await
    }

    /// [`Pool::open_env`] reusing the slot of `alias` when it exists.
    pub async fn open_once_env(&self, alias: &str) -> Result<Connection<D>> {
        self.open_slot(Self::environment(alias), true, None).await
    }

    /// Wraps an already established native connection in a new slot.
    pub async fn open_with(
        &self,
        native: D::Connection,
        env: Environment,
    ) -> Result<Connection<D>> {
        self.open_slot(env, false, Some(native)).await
    }

    fn environment(alias: &str) -> Environment {
        let mut env = Environment::from_env();
        if !alias.is_empty() {
            env.load(alias);
        }
        env
    }

    async fn open_slot(
        &self,
        mut env: Environment,
        reuse: bool,
        native: Option<D::Connection>,
    ) -> Result<Connection<D>> {
        env.validate()?;
        let slot = match native {
            Some(native) => {
                let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                Self::append(&mut state, Some(native))
            }
            None => self.acquire(&env.alias, reuse),
        };
        if is_verbose(&env) && env.dsn.is_empty() {
            let log = LogTargets::new(&env);
            log.info(format_args!("configured and ready"));
            log.info(format_args!(
                "setting: {} MaxIdle | {} MaxOpen | {:?} MaxLifetime",
                env.max_idle, env.max_open, env.max_lifetime
            ));
        }
        let autoconnect = env.autoconnect;
        let connection = Connection::new(self.driver.clone(), slot, env);
        if autoconnect {
            // Recorded as the last error, the connection retries lazily on first use.
            let _ = connection.connect().await;
        }
        Ok(connection)
    }
}
