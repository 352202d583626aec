use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tether_core::{
    Driver, Environment, Error, Executor, IsolationLevel, NativeConnection, NativeTransaction,
    Result, RowLabeled, RowNames, RowsAffected, Value,
};

#[derive(Default)]
struct MockState {
    connects: AtomicUsize,
    closes: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    fail_connect: AtomicBool,
    connect_delay: Mutex<Duration>,
    executed: Mutex<Vec<String>>,
    fetched: Mutex<Vec<String>>,
    responses: Mutex<HashMap<String, Vec<RowLabeled>>>,
    failures: Mutex<Vec<String>>,
    levels: Mutex<Vec<IsolationLevel>>,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockState {
    fn check(&self, sql: &str) -> Result<()> {
        if lock(&self.failures).iter().any(|v| v == sql) {
            return Err(Error::msg(format!("mock failure on `{}`", sql)));
        }
        Ok(())
    }

    fn rows(&self, sql: &str) -> Vec<RowLabeled> {
        lock(&self.responses).get(sql).cloned().unwrap_or_default()
    }
}

/// In-memory driver recording what it is asked to do.
///
/// Statements run outside a transaction are applied immediately, the ones run inside a
/// transaction are applied on commit and discarded on rollback. Queries return the rows
/// registered with [`MockDriver::respond`] for the exact same SQL, nothing otherwise.
/// Clones share the same recorded state.
#[derive(Default, Clone)]
pub struct MockDriver {
    state: Arc<MockState>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every native connect sleeps `delay` before succeeding.
    pub fn with_connect_delay(self, delay: Duration) -> Self {
        *lock(&self.state.connect_delay) = delay;
        self
    }

    pub fn set_fail_connect(&self, value: bool) {
        self.state.fail_connect.store(value, Ordering::Relaxed);
    }

    /// Rows returned when `sql` is queried.
    pub fn respond(&self, sql: &str, labels: &[&str], rows: Vec<Vec<Value>>) {
        let labels: RowNames = labels.iter().map(|v| v.to_string()).collect();
        let rows = rows
            .into_iter()
            .map(|v| RowLabeled::new(labels.clone(), v.into()))
            .collect();
        lock(&self.state.responses).insert(sql.to_string(), rows);
    }

    /// Makes every execution of `sql` fail.
    pub fn fail_on(&self, sql: &str) {
        lock(&self.state.failures).push(sql.to_string());
    }

    /// Number of native connections opened.
    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::Relaxed)
    }

    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::Relaxed)
    }

    pub fn commits(&self) -> usize {
        self.state.commits.load(Ordering::Relaxed)
    }

    pub fn rollbacks(&self) -> usize {
        self.state.rollbacks.load(Ordering::Relaxed)
    }

    /// Statements applied so far, in order.
    pub fn executed(&self) -> Vec<String> {
        lock(&self.state.executed).clone()
    }

    /// Queries run so far, in order.
    pub fn fetched(&self) -> Vec<String> {
        lock(&self.state.fetched).clone()
    }

    /// Isolation levels of the transactions begun so far.
    pub fn levels(&self) -> Vec<IsolationLevel> {
        lock(&self.state.levels).clone()
    }
}

impl Driver for MockDriver {
    type Connection = MockConnection;
    type Transaction = MockTransaction;

    const NAME: &'static str = "mock";

    async fn connect(&self, _env: &Environment) -> Result<MockConnection> {
        let delay = *lock(&self.state.connect_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.state.fail_connect.load(Ordering::Relaxed) {
            return Err(Error::msg("mock connection refused"));
        }
        self.state.connects.fetch_add(1, Ordering::Relaxed);
        Ok(MockConnection {
            state: self.state.clone(),
            closed: AtomicBool::new(false),
        })
    }
}

pub struct MockConnection {
    state: Arc<MockState>,
    closed: AtomicBool,
}

impl MockConnection {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(Error::msg("mock connection is closed"));
        }
        Ok(())
    }
}

impl Executor for MockConnection {
    async fn execute(&self, sql: &str, _args: &[Value]) -> Result<RowsAffected> {
        self.ensure_open()?;
        self.state.check(sql)?;
        lock(&self.state.executed).push(sql.to_string());
        Ok(RowsAffected {
            rows_affected: 1,
            last_insert_id: None,
        })
    }

    async fn fetch(&self, sql: &str, _args: &[Value]) -> Result<Vec<RowLabeled>> {
        self.ensure_open()?;
        self.state.check(sql)?;
        lock(&self.state.fetched).push(sql.to_string());
        Ok(self.state.rows(sql))
    }
}

impl NativeConnection for MockConnection {
    type Transaction = MockTransaction;

    async fn ping(&self) -> Result<()> {
        self.ensure_open()
    }

    async fn begin(&self, level: IsolationLevel) -> Result<MockTransaction> {
        self.ensure_open()?;
        lock(&self.state.levels).push(level);
        Ok(MockTransaction {
            state: self.state.clone(),
            pending: Mutex::new(Vec::new()),
        })
    }

    async fn close(&self) -> Result<()> {
        self.ensure_open()?;
        self.closed.store(true, Ordering::Relaxed);
        self.state.closes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

pub struct MockTransaction {
    state: Arc<MockState>,
    pending: Mutex<Vec<String>>,
}

impl Executor for MockTransaction {
    async fn execute(&self, sql: &str, _args: &[Value]) -> Result<RowsAffected> {
        self.state.check(sql)?;
        lock(&self.pending).push(sql.to_string());
        Ok(RowsAffected {
            rows_affected: 1,
            last_insert_id: None,
        })
    }

    async fn fetch(&self, sql: &str, _args: &[Value]) -> Result<Vec<RowLabeled>> {
        self.state.check(sql)?;
        lock(&self.state.fetched).push(sql.to_string());
        Ok(self.state.rows(sql))
    }
}

impl NativeTransaction for MockTransaction {
    async fn commit(self) -> Result<()> {
        let pending = self.pending.into_inner().unwrap_or_else(PoisonError::into_inner);
        lock(&self.state.executed).extend(pending);
        self.state.commits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.state.rollbacks.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
