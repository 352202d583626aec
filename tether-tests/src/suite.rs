use indoc::indoc;
use std::sync::{Arc, Mutex};
use tether_core::{Connection, DbError, Driver, Error, Query, Value, connection_fn};
use tokio::sync::Mutex as AsyncMutex;

static MUTEX: AsyncMutex<()> = AsyncMutex::const_new(());

/// Checks a driver must pass against a live database. The connection must point to a schema
/// where tables can be created and dropped.
pub async fn execute_tests<D: Driver>(connection: &Connection<D>) {
    let _lock = MUTEX.lock().await;
    connection.ping().await.expect("Could not ping the database");
    setup(connection).await;
    simple(connection).await;
    transactions(connection).await;
    contexts(connection).await;
    teardown(connection).await;
}

async fn setup<D: Driver>(connection: &Connection<D>) {
    connection
        .exec("DROP TABLE IF EXISTS tether_articles")
        .await
        .expect("Failed to drop the articles table");
    connection
        .exec(indoc! {"
            CREATE TABLE tether_articles (
                id INTEGER PRIMARY KEY,
                title VARCHAR(255) NOT NULL,
                views BIGINT NOT NULL
            )
        "})
        .await
        .expect("Failed to create the articles table");
}

async fn teardown<D: Driver>(connection: &Connection<D>) {
    connection
        .exec("DROP TABLE tether_articles")
        .await
        .expect("Failed to drop the articles table");
}

async fn simple<D: Driver>(connection: &Connection<D>) {
    for (id, title, views) in [(1, "first", 10), (2, "second", 20), (3, "third", 30)] {
        let result = connection
            .exec(
                &Query::new("INSERT INTO tether_articles (id, title, views) VALUES (?, ?, ?)")
                    .bind(id)
                    .bind(title)
                    .bind(views),
            )
            .await
            .expect("Failed to insert an article");
        assert_eq!(result.rows_affected, 1);
    }

    let mut titles = Vec::new();
    let rows = connection
        .query_map(
            "SELECT title FROM tether_articles WHERE views >= ? ORDER BY id",
            [20],
            |row| {
                titles.push(
                    row.get("title")
                        .and_then(Value::as_str)
                        .map(ToString::to_string),
                )
            },
        )
        .await
        .expect("Failed to select the articles");
    assert_eq!(rows, 2);
    assert_eq!(
        titles,
        [Some("second".to_string()), Some("third".to_string())]
    );

    let mut views = None;
    let rows = connection
        .query_slice_row(
            "SELECT views FROM tether_articles WHERE id = ?",
            [3],
            |row| views = row.first().and_then(Value::as_i64),
        )
        .await
        .expect("Failed to select a single article");
    assert_eq!(rows, 1);
    assert_eq!(views, Some(30));

    let rows = connection
        .query_slice_row(
            "SELECT views FROM tether_articles WHERE id = ?",
            [99],
            |_| panic!("No row expected"),
        )
        .await
        .expect("A missing row must not be an error by default");
    assert_eq!(rows, 0);
}

async fn count<D: Driver>(connection: &Connection<D>) -> i64 {
    let mut count = 0;
    connection
        .query_slice_row(
            "SELECT COUNT(*) FROM tether_articles",
            Vec::<Value>::new(),
            |row| count = row.first().and_then(Value::as_i64).unwrap_or_default(),
        )
        .await
        .expect("Failed to count the articles");
    count
}

async fn transactions<D: Driver>(connection: &Connection<D>) {
    let before = count(connection).await;
    let result = connection
        .run_tx([
            connection_fn(|tx: Connection<D>| async move {
                tx.exec(
                    &Query::new("INSERT INTO tether_articles (id, title, views) VALUES (?, ?, ?)")
                        .bind(4)
                        .bind("fourth")
                        .bind(40),
                )
                .await
                .map(|_| ())
            }),
            connection_fn(|tx: Connection<D>| async move {
                tx.exec("INSERT INTO missing_table VALUES (1)")
                    .await
                    .map(|_| ())
            }),
        ])
        .await;
    assert!(result.is_err(), "The second operation must fail");
    assert_eq!(count(connection).await, before);

    connection
        .run_tx([connection_fn(|tx: Connection<D>| async move {
            tx.exec(
                &Query::new("INSERT INTO tether_articles (id, title, views) VALUES (?, ?, ?)")
                    .bind(5)
                    .bind("fifth")
                    .bind(50),
            )
            .await
            .map(|_| ())
        })])
        .await
        .expect("The transaction must commit");
    assert_eq!(count(connection).await, before + 1);

    let tx = connection.begin().await.expect("Could not begin a transaction");
    tx.exec("DELETE FROM tether_articles")
        .await
        .expect("Failed to delete inside the transaction");
    tx.rollback().await.expect("Failed to roll back");
    let error = tx
        .commit()
        .await
        .expect_err("A resolved transaction cannot be committed");
    assert!(DbError::TransactionResolved.is(&error));
    assert_eq!(count(connection).await, before + 1);
}

async fn contexts<D: Driver>(connection: &Connection<D>) {
    let flags = Arc::new(Mutex::new(Vec::new()));
    connection
        .run_context_with(["suite"], [connection_fn({
            let flags = flags.clone();
            move |scoped: Connection<D>| async move {
                scoped
                    .exec(
                        &Query::new("UPDATE tether_articles SET views = views + ? WHERE id = ?")
                            .bind(1)
                            .bind(1),
                    )
                    .await?;
                if let Some(context) = scoped.context() {
                    flags.lock().unwrap().push(context.flag());
                }
                Ok::<(), Error>(())
            }
        })])
        .await
        .expect("The context operations must succeed");
    assert_eq!(*flags.lock().unwrap(), ["suite".to_string()]);

    let scoped = connection.with_context(["suite", "explicit"]);
    scoped
        .query_map("SELECT id FROM tether_articles", Vec::<Value>::new(), |_| {})
        .await
        .expect("Failed to select inside a context");
    scoped.done().await;
    let context = scoped.context().expect("The scoped connection has a context");
    assert!(context.is_done());
    assert_eq!(context.len(), 1);
    assert_eq!(context.entries()[0].context_flags(), ["suite", "explicit"]);
}
