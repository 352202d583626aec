use crate::{
    Connection, DbError, Driver, Executor, Query, QueryState, Result, RowLabeled, RowsAffected,
    Statement, Value, is_debug, truncate_long,
};
use std::{
    collections::HashMap,
    sync::{Arc, atomic::Ordering},
};

impl<D: Driver> Connection<D> {
    /// Runs a statement that does not return rows.
    pub async fn exec<S: Statement + ?Sized>(&self, statement: &S) -> Result<RowsAffected> {
        self.connect().await?;
        let state = self.start_state(statement);
        let result = self
            .native_execute(statement.sql(), statement.args())
            .await;
        self.record(state).await;
        result.map_err(|e| self.fail(e))
    }

    /// Runs a query and hands every row, keyed by column name, to `mapper`.
    /// Returns the number of rows mapped.
    pub async fn select_map<S, F>(&self, statement: &S, mut mapper: F) -> Result<usize>
    where
        S: Statement + ?Sized,
        F: FnMut(HashMap<String, Value>),
    {
        let rows = self.fetch_rows(statement).await?;
        let count = rows.len();
        rows.into_iter().for_each(|row| mapper(row.into_map()));
        Ok(count)
    }

    /// Runs a query and hands its first row, keyed by column name, to `mapper`.
    ///
    /// The driver still fetches the whole result, the rows after the first are discarded: add a
    /// `LIMIT 1` to queries that may return many rows.
    ///
    /// An empty result maps nothing and returns 0, or fails with [`DbError::NoRows`] when the
    /// environment sets `error_no_rows`.
    pub async fn select_map_row<S, F>(&self, statement: &S, mapper: F) -> Result<usize>
    where
        S: Statement + ?Sized,
        F: FnOnce(HashMap<String, Value>),
    {
        match self.fetch_rows(statement).await?.into_iter().next() {
            Some(row) => {
                mapper(row.into_map());
                Ok(1)
            }
            None => self.no_rows(),
        }
    }

    /// Runs a query and hands every row, as positional values, to `mapper`.
    /// Returns the number of rows mapped.
    pub async fn select_slice<S, F>(&self, statement: &S, mut mapper: F) -> Result<usize>
    where
        S: Statement + ?Sized,
        F: FnMut(Vec<Value>),
    {
        let rows = self.fetch_rows(statement).await?;
        let count = rows.len();
        rows.into_iter().for_each(|row| mapper(row.into_vec()));
        Ok(count)
    }

    /// Positional counterpart of [`Connection::select_map_row`], fetching the whole result as
    /// well.
    pub async fn select_slice_row<S, F>(&self, statement: &S, mapper: F) -> Result<usize>
    where
        S: Statement + ?Sized,
        F: FnOnce(Vec<Value>),
    {
        match self.fetch_rows(statement).await?.into_iter().next() {
            Some(row) => {
                mapper(row.into_vec());
                Ok(1)
            }
            None => self.no_rows(),
        }
    }

    /// [`Connection::select_map`] on raw SQL.
    pub async fn query_map<I, V, F>(&self, sql: &str, args: I, mapper: F) -> Result<usize>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
        F: FnMut(HashMap<String, Value>),
    {
        self.select_map(&Query::with_args(sql, args), mapper).await
    }

    /// [`Connection::select_map_row`] on raw SQL.
    pub async fn query_map_row<I, V, F>(&self, sql: &str, args: I, mapper: F) -> Result<usize>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
        F: FnOnce(HashMap<String, Value>),
    {
        self.select_map_row(&Query::with_args(sql, args), mapper)
            .await
    }

    /// [`Connection::select_slice`] on raw SQL.
    pub async fn query_slice<I, V, F>(&self, sql: &str, args: I, mapper: F) -> Result<usize>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
        F: FnMut(Vec<Value>),
    {
        self.select_slice(&Query::with_args(sql, args), mapper)
            .await
    }

    /// [`Connection::select_slice_row`] on raw SQL.
    pub async fn query_slice_row<I, V, F>(&self, sql: &str, args: I, mapper: F) -> Result<usize>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
        F: FnOnce(Vec<Value>),
    {
        self.select_slice_row(&Query::with_args(sql, args), mapper)
            .await
    }

    async fn fetch_rows<S: Statement + ?Sized>(&self, statement: &S) -> Result<Vec<RowLabeled>> {
        self.connect().await?;
        let state = self.start_state(statement);
        let result = self.native_fetch(statement.sql(), statement.args()).await;
        self.record(state).await;
        result.map_err(|e| self.fail(e))
    }

    fn no_rows(&self) -> Result<usize> {
        if self.env.error_no_rows {
            Err(self.fail(DbError::NoRows.into()))
        } else {
            Ok(0)
        }
    }

    async fn native_execute(&self, sql: &str, args: &[Value]) -> Result<RowsAffected> {
        match &self.transaction {
            Some(transaction) => match transaction.native.lock().await.as_ref() {
                Some(transaction) => transaction.execute(sql, args).await,
                None => Err(DbError::TransactionResolved.into()),
            },
            None => {
                let native = self.slot.get().ok_or(DbError::BadConnection)?;
                native.execute(sql, args).await
            }
        }
    }

    async fn native_fetch(&self, sql: &str, args: &[Value]) -> Result<Vec<RowLabeled>> {
        match &self.transaction {
            Some(transaction) => match transaction.native.lock().await.as_ref() {
                Some(transaction) => transaction.fetch(sql, args).await,
                None => Err(DbError::TransactionResolved.into()),
            },
            None => {
                let native = self.slot.get().ok_or(DbError::BadConnection)?;
                native.fetch(sql, args).await
            }
        }
    }

    /// Starts timing `statement`, when something collects its state.
    fn start_state<S: Statement + ?Sized>(&self, statement: &S) -> Option<QueryState> {
        if is_debug(&self.env) {
            let sql = statement.sql();
            self.log.debug(format_args!("{}", truncate_long!(sql)));
        }
        if !self.has_context() && !self.has_profiler() {
            return None;
        }
        let (id, flags): (Arc<str>, Arc<[String]>) = match self.context() {
            Some(context) => (context.id_arc(), context.flags_arc()),
            None => ("".into(), Vec::<String>::new().into()),
        };
        Some(QueryState::new(statement, id, flags))
    }

    async fn record(&self, state: Option<QueryState>) {
        let Some(state) = state else {
            return;
        };
        let state = state.finish();
        if let Some(context) = self.context() {
            context.push(state.clone()).await;
        }
        if let Some(profiler) = self.profiler() {
            let refused = !profiler.push(state).await;
            if refused && !self.family.profiler_refused.swap(true, Ordering::Relaxed) {
                self.log.error(format_args!(
                    "The profiler is closed, statements are no longer profiled"
                ));
            }
        }
    }
}
