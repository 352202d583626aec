use crate::{
    Connection, ConnectionFn, DbError, Driver, NativeConnection, NativeTransaction, Result,
    is_verbose,
};
use std::{
    fmt::{self, Display},
    sync::Arc,
};

/// Operation run by [`Connection::run_tx`] inside the transaction.
pub type TxFn<D> = ConnectionFn<D>;

/// Transaction isolation level.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    /// Whatever the server is configured with.
    #[default]
    Default,
    ReadUncommitted,
    ReadCommitted,
    WriteCommitted,
    RepeatableRead,
    Snapshot,
    Serializable,
    Linearizable,
}

impl IsolationLevel {
    /// SQL keywords of the level, empty for [`IsolationLevel::Default`].
    pub fn to_sql(&self) -> &'static str {
        match self {
            IsolationLevel::Default => "",
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::WriteCommitted => "WRITE COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Snapshot => "SNAPSHOT",
            IsolationLevel::Serializable => "SERIALIZABLE",
            IsolationLevel::Linearizable => "LINEARIZABLE",
        }
    }
}

impl Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsolationLevel::Default => f.write_str("DEFAULT"),
            v => f.write_str(v.to_sql()),
        }
    }
}

/// Native transaction shared by the copies of a transaction scoped connection. Taken out
/// exactly once, by commit or rollback.
pub(crate) struct TransactionSlot<T> {
    pub(crate) native: tokio::sync::Mutex<Option<T>>,
    pub(crate) level: IsolationLevel,
}

impl<D: Driver> Connection<D> {
    /// Begins a transaction with the default isolation level.
    pub async fn begin(&self) -> Result<Connection<D>> {
        self.begin_tx(IsolationLevel::Default).await
    }

    /// Begins a transaction and returns the copy of this connection that runs inside it.
    /// Statements executed through the returned connection (and its copies) are part of the
    /// transaction, until [`Connection::commit`] or [`Connection::rollback`].
    pub async fn begin_tx(&self, level: IsolationLevel) -> Result<Connection<D>> {
        let native = self.native().await?;
        let transaction = native.begin(level).await.map_err(|e| self.fail(e))?;
        if is_verbose(&self.env) {
            self.log.info(format_args!("transaction started ({})", level));
        }
        let mut result = self.copy();
        result.transaction = Some(Arc::new(TransactionSlot {
            native: tokio::sync::Mutex::new(Some(transaction)),
            level,
        }));
        Ok(result)
    }

    pub fn is_tx(&self) -> bool {
        self.transaction.is_some()
    }

    /// Isolation level of the transaction, if any.
    pub fn isolation_level(&self) -> Option<IsolationLevel> {
        self.transaction.as_ref().map(|v| v.level)
    }

    /// Commits the transaction. Does nothing outside a transaction.
    pub async fn commit(&self) -> Result<()> {
        let Some(transaction) = self.take_transaction().await? else {
            return Ok(());
        };
        transaction.commit().await.map_err(|e| self.fail(e))
    }

    /// Rolls the transaction back. Does nothing outside a transaction.
    pub async fn rollback(&self) -> Result<()> {
        let Some(transaction) = self.take_transaction().await? else {
            return Ok(());
        };
        transaction.rollback().await.map_err(|e| self.fail(e))
    }

    async fn take_transaction(&self) -> Result<Option<D::Transaction>> {
        let Some(slot) = &self.transaction else {
            return Ok(None);
        };
        match slot.native.lock().await.take() {
            Some(transaction) => Ok(Some(transaction)),
            None => Err(self.fail(DbError::TransactionResolved.into())),
        }
    }

    /// Runs `ops` in a transaction with the default isolation level, see
    /// [`Connection::run_tx_with`].
    pub async fn run_tx(&self, ops: impl IntoIterator<Item = TxFn<D>>) -> Result<()> {
        self.run_tx_with(IsolationLevel::Default, ops).await
    }

    /// Begins a transaction, runs `ops` in sequence on copies of it and commits. The first
    /// failing op stops the sequence: the transaction is rolled back and the error of the op is
    /// returned as is.
    pub async fn run_tx_with(
        &self,
        level: IsolationLevel,
        ops: impl IntoIterator<Item = TxFn<D>>,
    ) -> Result<()> {
        let tx = self.begin_tx(level).await?;
        for op in ops {
            if let Err(e) = op(tx.copy()).await {
                if let Err(rollback) = tx.rollback().await {
                    self.log.error(format_args!("While rolling back: {:#}", rollback));
                }
                return Err(e);
            }
        }
        tx.commit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolation_level_sql() {
        assert_eq!(IsolationLevel::default(), IsolationLevel::Default);
        assert_eq!(IsolationLevel::Default.to_sql(), "");
        assert_eq!(IsolationLevel::Default.to_string(), "DEFAULT");
        assert_eq!(
            IsolationLevel::RepeatableRead.to_string(),
            "REPEATABLE READ"
        );
        assert_eq!(IsolationLevel::Serializable.to_sql(), "SERIALIZABLE");
    }
}
