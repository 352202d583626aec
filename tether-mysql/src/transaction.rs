use crate::{execute, fetch};
use tether_core::{Executor, NativeTransaction, Result, RowLabeled, RowsAffected, Value};
use tokio::sync::Mutex;

pub struct MySQLTransaction {
    pub(crate) transaction: Mutex<mysql_async::Transaction<'static>>,
}

impl MySQLTransaction {
    pub(crate) fn new(transaction: mysql_async::Transaction<'static>) -> Self {
        Self {
            transaction: Mutex::new(transaction),
        }
    }
}

impl Executor for MySQLTransaction {
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<RowsAffected> {
        execute(&mut *self.transaction.lock().await, sql, args).await
    }

    async fn fetch(&self, sql: &str, args: &[Value]) -> Result<Vec<RowLabeled>> {
        fetch(&mut *self.transaction.lock().await, sql, args).await
    }
}

impl NativeTransaction for MySQLTransaction {
    async fn commit(self) -> Result<()> {
        self.transaction
            .into_inner()
            .commit()
            .await
            .map_err(|e| {
                log::error!("{:#}", e);
                e.into()
            })
    }

    async fn rollback(self) -> Result<()> {
        self.transaction
            .into_inner()
            .rollback()
            .await
            .map_err(|e| {
                log::error!("{:#}", e);
                e.into()
            })
    }
}
