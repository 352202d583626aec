use crate::{Environment, IsolationLevel, Result, RowLabeled, RowsAffected, Value};
use std::future::Future;

/// Entry point of a backend: knows how to open a native connection for an [`Environment`].
///
/// The native connection it returns is shared by every [`crate::Connection`] bound to the same
/// pool slot, it must therefore accept concurrent use (usually by pooling internally).
pub trait Driver: Send + Sync + 'static {
    type Connection: NativeConnection<Transaction = Self::Transaction>;
    type Transaction: NativeTransaction;

    const NAME: &'static str;

    /// Open the native connection, applying the pool limits (max open, max idle, max lifetime)
    /// found in `env`.
    fn connect(&self, env: &Environment) -> impl Future<Output = Result<Self::Connection>> + Send;
}

/// Prepares and runs statements with positional `?` arguments.
pub trait Executor: Send + Sync {
    /// Run a statement that does not return rows.
    fn execute(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = Result<RowsAffected>> + Send;

    /// Run a statement and collect the rows it returns.
    fn fetch(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = Result<Vec<RowLabeled>>> + Send;
}

pub trait NativeConnection: Executor + 'static {
    type Transaction: NativeTransaction;

    fn ping(&self) -> impl Future<Output = Result<()>> + Send;

    fn begin(&self, level: IsolationLevel)
    -> impl Future<Output = Result<Self::Transaction>> + Send;

    fn close(&self) -> impl Future<Output = Result<()>> + Send;
}

pub trait NativeTransaction: Executor + 'static {
    fn commit(self) -> impl Future<Output = Result<()>> + Send;

    fn rollback(self) -> impl Future<Output = Result<()>> + Send;
}
