use crate::{MySQLTransaction, RowWrap, options, params};
use mysql_async::{Pool, TxOpts, prelude::Queryable};
use tether_core::{
    Environment, Error, ErrorContext, Executor, IsolationLevel, NativeConnection, Result,
    RowLabeled, RowsAffected, Value, truncate_long,
};

/// Pool of MySQL connections shared by every [`tether_core::Connection`] of a slot.
pub struct MySQLConnection {
    pub(crate) pool: Pool,
}

impl MySQLConnection {
    /// Creates the pool and checks that a connection can be established.
    pub async fn connect(env: &Environment) -> Result<MySQLConnection> {
        let pool = Pool::new(options(env)?);
        let connection = pool.get_conn().await.with_context(|| {
            format!(
                "While trying to connect to `{}:{}` as `{}`",
                env.host, env.port, env.user
            )
        })?;
        drop(connection);
        Ok(MySQLConnection { pool })
    }
}

pub(crate) async fn execute<Q: Queryable>(
    executor: &mut Q,
    sql: &str,
    args: &[Value],
) -> Result<RowsAffected> {
    let context = || format!("While executing the statement:\n{}", truncate_long!(sql));
    let params = params(args).with_context(context)?;
    let statement = executor.prep(sql).await.with_context(context)?;
    let result = executor
        .exec_iter(statement, params)
        .await
        .with_context(context)?;
    let affected = RowsAffected {
        rows_affected: result.affected_rows(),
        last_insert_id: result.last_insert_id(),
    };
    result.drop_result().await.with_context(context)?;
    Ok(affected)
}

pub(crate) async fn fetch<Q: Queryable>(
    executor: &mut Q,
    sql: &str,
    args: &[Value],
) -> Result<Vec<RowLabeled>> {
    let context = || format!("While running the query:\n{}", truncate_long!(sql));
    let params = params(args).with_context(context)?;
    let statement = executor.prep(sql).await.with_context(context)?;
    let rows = executor
        .exec::<RowWrap, _, _>(statement, params)
        .await
        .with_context(context)?;
    Ok(rows.into_iter().map(|v| v.0).collect())
}

impl Executor for MySQLConnection {
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<RowsAffected> {
        let mut connection = self.pool.get_conn().await?;
        execute(&mut connection, sql, args).await
    }

    async fn fetch(&self, sql: &str, args: &[Value]) -> Result<Vec<RowLabeled>> {
        let mut connection = self.pool.get_conn().await?;
        fetch(&mut connection, sql, args).await
    }
}

impl NativeConnection for MySQLConnection {
    type Transaction = MySQLTransaction;

    async fn ping(&self) -> Result<()> {
        let mut connection = self.pool.get_conn().await?;
        connection.ping().await.map_err(Into::into)
    }

    async fn begin(&self, level: IsolationLevel) -> Result<MySQLTransaction> {
        let level = match level {
            IsolationLevel::Default => None,
            IsolationLevel::ReadUncommitted => Some(mysql_async::IsolationLevel::ReadUncommitted),
            IsolationLevel::ReadCommitted => Some(mysql_async::IsolationLevel::ReadCommitted),
            IsolationLevel::RepeatableRead => Some(mysql_async::IsolationLevel::RepeatableRead),
            IsolationLevel::Serializable => Some(mysql_async::IsolationLevel::Serializable),
            level => {
                return Err(Error::msg(format!(
                    "Isolation level {} is not supported by MySQL",
                    level
                )));
            }
        };
        let mut options = TxOpts::default();
        options.with_isolation_level(level);
        let transaction = self
            .pool
            .start_transaction(options)
            .await
            .context("While starting a transaction")?;
        Ok(MySQLTransaction::new(transaction))
    }

    async fn close(&self) -> Result<()> {
        self.pool.clone().disconnect().await.map_err(Into::into)
    }
}
