#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use tether::{Connection, DbError, Environment, Pool, Query, Value, set_debug};
    use tether_tests::{MockDriver, init_logs};

    async fn open(driver: &MockDriver, error_no_rows: bool) -> Connection<MockDriver> {
        Pool::new(driver.clone())
            .open(Environment {
                alias: "pipeline".into(),
                user: "tether".into(),
                pass: "secret".into(),
                error_no_rows,
                ..Default::default()
            })
            .await
            .expect("Could not open the connection")
    }

    fn articles(driver: &MockDriver) {
        driver.respond(
            "SELECT id, title FROM articles",
            &["id", "title"],
            vec![
                vec![Value::Int(1), Value::Varchar("first".into())],
                vec![Value::Int(2), Value::Varchar("second".into())],
            ],
        );
    }

    #[tokio::test]
    async fn exec_records_state() {
        init_logs();
        let driver = MockDriver::new();
        let connection = open(&driver, false).await;
        let scoped = connection.with_context(["pipeline"]);
        let result = scoped
            .exec(&Query::with_args("col1 = ?", ["test"]))
            .await
            .expect("Could not execute");
        assert_eq!(result.rows_affected, 1);
        scoped.done().await;
        let context = scoped.context().expect("Scoped context");
        assert_eq!(context.len(), 1);
        let state = &context.entries()[0];
        assert_eq!(state.bytes(), b"col1 = \"test\"");
        assert_eq!(state.sql(), "col1 = ?");
        assert_eq!(state.args(), [Value::Varchar("test".into())]);
        assert!(state.is_finished());
        assert!(state.end() >= state.start());
        assert_eq!(state.context_id(), context.id());
    }

    #[tokio::test]
    async fn no_state_without_collector() {
        let driver = MockDriver::new();
        let connection = open(&driver, false).await;
        set_debug(true);
        connection
            .exec("UPDATE t SET a = 1")
            .await
            .expect("Could not execute");
        set_debug(false);
        assert!(!connection.has_context());
        assert!(!connection.has_profiler());
        assert_eq!(driver.executed(), ["UPDATE t SET a = 1"]);
    }

    #[tokio::test]
    async fn select_rows() {
        let driver = MockDriver::new();
        articles(&driver);
        let connection = open(&driver, false).await;

        let mut maps: Vec<HashMap<String, Value>> = Vec::new();
        let rows = connection
            .select_map(&Query::new("SELECT id, title FROM articles"), |row| {
                maps.push(row)
            })
            .await
            .expect("Could not select");
        assert_eq!(rows, 2);
        assert_eq!(maps[0].get("id"), Some(&Value::Int(1)));
        assert_eq!(maps[1].get("title"), Some(&Value::Varchar("second".into())));

        let mut slices = Vec::new();
        let rows = connection
            .select_slice("SELECT id, title FROM articles", |row| slices.push(row))
            .await
            .expect("Could not select");
        assert_eq!(rows, 2);
        assert_eq!(slices[1], [Value::Int(2), Value::Varchar("second".into())]);

        let mut first = None;
        let rows = connection
            .select_map_row("SELECT id, title FROM articles", |row| first = Some(row))
            .await
            .expect("Could not select");
        assert_eq!(rows, 1);
        assert_eq!(
            first.and_then(|v| v.get("title").cloned()),
            Some(Value::Varchar("first".into()))
        );

        let mut first = Vec::new();
        let rows = connection
            .query_slice_row("SELECT id, title FROM articles", Vec::<Value>::new(), |row| {
                first = row
            })
            .await
            .expect("Could not select");
        assert_eq!(rows, 1);
        assert_eq!(first[0].as_i64(), Some(1));

        let rows = connection
            .query_map_row("SELECT id, title FROM articles", [1], |_| {})
            .await
            .expect("Could not select");
        assert_eq!(rows, 1);
        let rows = connection
            .query_slice("SELECT id, title FROM articles", [1], |_| {})
            .await
            .expect("Could not select");
        assert_eq!(rows, 2);
        assert_eq!(driver.fetched().len(), 6);
    }

    #[tokio::test]
    async fn no_rows_policy() {
        let driver = MockDriver::new();
        let connection = open(&driver, false).await;
        let rows = connection
            .select_map_row("SELECT * FROM empty", |_| {})
            .await
            .expect("No rows is not an error by default");
        assert_eq!(rows, 0);
        let rows = connection
            .select_slice("SELECT * FROM empty", |_| {})
            .await
            .expect("Empty results are fine");
        assert_eq!(rows, 0);
        assert!(connection.last_error().is_none());

        let connection = open(&driver, true).await;
        let error = connection
            .select_slice_row("SELECT * FROM empty", |_| {})
            .await
            .expect_err("No rows must be reported");
        assert!(DbError::NoRows.is(&error));
        assert_eq!(
            connection.last_error().as_deref(),
            Some("no rows in result set")
        );
        let rows = connection
            .query_map("SELECT * FROM empty", Vec::<Value>::new(), |_| {})
            .await
            .expect("Multiple rows variants never report no rows");
        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn failures_are_recorded() {
        let driver = MockDriver::new();
        driver.fail_on("SELECT broken");
        let connection = open(&driver, false).await;
        let scoped = connection.with_context(["failures"]);
        let error = scoped
            .select_map("SELECT broken", |_| {})
            .await
            .expect_err("The query must fail");
        assert_eq!(
            scoped.last_error().as_deref(),
            Some(format!("{:#}", error).as_str())
        );
        assert!(connection.last_error().is_none());
        scoped.done().await;
        assert_eq!(scoped.context().map(|v| v.len()), Some(1));
    }
}
