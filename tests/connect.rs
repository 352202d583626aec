#[cfg(test)]
mod tests {
    use futures::future::join_all;
    use std::time::Duration;
    use tether::{Connection, DbError, Environment, Pool};
    use tether_tests::{MockDriver, init_logs, silent_logs};

    fn environment(alias: &str) -> Environment {
        Environment {
            alias: alias.into(),
            user: "tether".into(),
            pass: "secret".into(),
            ..Default::default()
        }
    }

    async fn open(driver: &MockDriver, alias: &str) -> Connection<MockDriver> {
        Pool::new(driver.clone())
            .open_once(environment(alias))
            .await
            .expect("Could not open the connection")
    }

    #[tokio::test]
    async fn concurrent_connect_once() {
        init_logs();
        let driver = MockDriver::new().with_connect_delay(Duration::from_millis(50));
        let connection = open(&driver, "concurrent").await;
        let results = join_all((0..16).map(|_| {
            let copy = connection.copy();
            tokio::spawn(async move { copy.connect().await })
        }))
        .await;
        for result in results {
            result
                .expect("The task panicked")
                .expect("Could not connect");
        }
        assert!(connection.is_connected());
        assert_eq!(driver.connects(), 1);
    }

    #[tokio::test]
    async fn connect_is_idempotent() {
        let driver = MockDriver::new();
        let connection = open(&driver, "idempotent").await;
        assert!(!connection.is_connected());
        for _ in 0..3 {
            connection.connect().await.expect("Could not connect");
        }
        connection.ping().await.expect("Could not ping");
        assert_eq!(driver.connects(), 1);
    }

    #[tokio::test]
    async fn connect_failure_recorded() {
        init_logs();
        let driver = MockDriver::new();
        driver.set_fail_connect(true);
        let connection = open(&driver, "refused").await;
        let error;
        silent_logs! {
            error = connection.connect().await.expect_err("The connection must fail");
        }
        let message = format!("{:#}", error);
        assert!(message.contains("mock connection refused"), "{}", message);
        assert!(message.contains("`refused`"), "{}", message);
        assert_eq!(connection.last_error().as_deref(), Some(message.as_str()));
        assert!(!connection.is_connected());

        driver.set_fail_connect(false);
        connection.connect().await.expect("Could not connect");
        assert_eq!(driver.connects(), 1);
    }

    #[tokio::test]
    #[should_panic]
    async fn must_ping_panics() {
        let driver = MockDriver::new();
        driver.set_fail_connect(true);
        let connection = open(&driver, "must").await;
        connection.must_ping().await;
    }

    #[tokio::test]
    async fn copy_shares_slot() {
        let driver = MockDriver::new();
        let connection = open(&driver, "copies").await;
        let copy = connection.copy();
        assert!(!copy.is_root());
        assert_eq!(copy.slot_id(), connection.slot_id());
        copy.connect().await.expect("Could not connect");
        assert!(connection.is_connected());

        // Only the root closes the native connection.
        copy.close().await.expect("Could not close the copy");
        assert!(connection.is_connected());
        assert_eq!(driver.closes(), 0);
        connection.close().await.expect("Could not close the root");
        assert!(!copy.is_connected());
        assert_eq!(driver.closes(), 1);

        // The slot is lazily connected again on the next use.
        copy.ping().await.expect("Could not ping");
        assert!(connection.is_connected());
        assert_eq!(driver.connects(), 2);
    }

    #[tokio::test]
    async fn log_targets() {
        let driver = MockDriver::new();
        let mut connection = open(&driver, "Reports").await;
        assert_eq!(connection.log_targets().out_target(), "tether::reports");
        assert_eq!(connection.log_targets().err_target(), "tether::reports::error");
        connection.set_log_targets(None, Some("audit"));
        assert_eq!(connection.log_targets().out_target(), "tether::reports");
        assert_eq!(connection.log_targets().err_target(), "audit");
        assert_eq!(connection.environment().alias, "Reports");
        assert!(DbError::BadConnection.to_string().contains("bad connection"));
    }
}
