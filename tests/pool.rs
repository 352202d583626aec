#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use tether::{Environment, Pool};
    use tether_tests::{MockDriver, init_logs};

    fn environment(alias: &str) -> Environment {
        Environment {
            alias: alias.into(),
            user: "tether".into(),
            pass: "secret".into(),
            ..Default::default()
        }
    }

    #[test]
    fn acquire_once_same_slot() {
        let pool = Pool::new(MockDriver::new());
        let first = pool.acquire("main", true);
        let second = pool.acquire("main", true);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.id(), second.id());
        assert_eq!(pool.len(), 1);

        let other = pool.acquire("replica", true);
        assert_ne!(other.id(), first.id());
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn acquire_fresh_distinct_slots() {
        let pool = Pool::new(MockDriver::new());
        assert!(pool.is_empty());
        let a = pool.acquire("main", false);
        let b = pool.acquire("main", false);
        assert_ne!(a.id(), b.id());
        // A fresh acquisition does not register the alias.
        let c = pool.acquire("main", true);
        assert_ne!(c.id(), a.id());
        assert_ne!(c.id(), b.id());
        assert_eq!(pool.len(), 3);
        for (i, slot) in [a, b, c].iter().enumerate() {
            assert_eq!(slot.id(), i);
            assert!(Arc::ptr_eq(slot, &pool.slot(i).expect("Slot must exist")));
        }
        assert!(pool.slot(3).is_none());
    }

    #[tokio::test]
    async fn open_once_shares_native() {
        init_logs();
        let driver = MockDriver::new();
        let pool = Pool::new(driver.clone());
        let a = pool
            .open_once(environment("main"))
            .await
            .expect("Could not open the connection");
        let b = pool
            .open_once(environment("main"))
            .await
            .expect("Could not open the connection");
        assert_eq!(a.slot_id(), b.slot_id());
        assert!(a.is_root() && b.is_root());
        a.connect().await.expect("Could not connect");
        assert!(b.is_connected());
        b.connect().await.expect("Could not connect");
        assert_eq!(driver.connects(), 1);

        let c = pool
            .open(environment("main"))
            .await
            .expect("Could not open the connection");
        assert_ne!(c.slot_id(), a.slot_id());
        assert!(!c.is_connected());
    }

    #[tokio::test]
    async fn open_rejects_missing_credentials() {
        let pool = Pool::new(MockDriver::new());
        let error = pool
            .open(Environment::default())
            .await
            .expect_err("Missing user must be rejected");
        assert!(tether::DbError::MissingUser.is(&error));
        let error = pool
            .open(Environment {
                user: "tether".into(),
                ..Default::default()
            })
            .await
            .expect_err("Missing password must be rejected");
        assert!(tether::DbError::MissingPass.is(&error));
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn autoconnect() {
        let driver = MockDriver::new();
        let pool = Pool::new(driver.clone());
        let connection = pool
            .open(Environment {
                autoconnect: true,
                ..environment("auto")
            })
            .await
            .expect("Could not open the connection");
        assert!(connection.is_connected());
        assert_eq!(driver.connects(), 1);

        driver.set_fail_connect(true);
        let connection = pool
            .open(Environment {
                autoconnect: true,
                ..environment("broken")
            })
            .await
            .expect("A failed autoconnect does not fail the open");
        assert!(!connection.is_connected());
        assert!(connection.last_error().is_some());
        driver.set_fail_connect(false);
        connection.ping().await.expect("The connection retries lazily");
        assert_eq!(driver.connects(), 2);
    }

    #[tokio::test]
    async fn open_with_native() {
        let driver = MockDriver::new();
        let native = tether::Driver::connect(&driver, &environment("adopted"))
            .await
            .expect("Could not connect");
        let pool = Pool::new(driver.clone());
        let connection = pool
            .open_with(native, environment("adopted"))
            .await
            .expect("Could not open the connection");
        assert!(connection.is_connected());
        connection.ping().await.expect("Could not ping");
        assert_eq!(driver.connects(), 1);
    }

    #[tokio::test]
    async fn close_all() {
        let driver = MockDriver::new();
        let pool = Pool::new(driver.clone());
        let mut connections = Vec::new();
        for alias in ["a", "b", "c"] {
            let connection = pool
                .open_once(environment(alias))
                .await
                .expect("Could not open the connection");
            connection.connect().await.expect("Could not connect");
            connections.push(connection);
        }
        // Never connected, nothing to close.
        pool.acquire("d", true);
        pool.close_all().await;
        assert_eq!(driver.closes(), 3);
        assert!(connections.iter().all(|v| !v.is_connected()));
        assert_eq!(pool.len(), 4);
    }
}
