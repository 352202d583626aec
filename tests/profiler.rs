#[cfg(test)]
mod tests {
    use std::{
        fs,
        path::{Path, PathBuf},
    };
    use tether::{Context, Environment, Pool, Profiler, Query, QueryState};
    use tether_tests::{MockDriver, init_logs};

    fn output(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("tether_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&path);
        path
    }

    fn files(path: &Path) -> Vec<PathBuf> {
        let mut result = Vec::new();
        let Ok(entries) = fs::read_dir(path) else {
            return result;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                result.extend(files(&path));
            } else {
                result.push(path);
            }
        }
        result.sort();
        result
    }

    #[tokio::test]
    async fn writes_one_file_per_state() {
        init_logs();
        let output = output("writes");
        let profiler = Profiler::new(&output);
        let context = Context::new(["Nightly Export"]);
        for i in 0..20 {
            let state = QueryState::new(
                &Query::new("SELECT ?").bind(i),
                context.id(),
                context.flags().to_vec(),
            )
            .finish();
            assert!(profiler.push(state).await);
        }
        profiler.close().await;
        assert_eq!(profiler.written(), 20);
        assert!(!profiler.push(QueryState::new("SELECT 1", "x", vec!["late".to_string()])).await);
        profiler.close().await;

        let files = files(&output);
        assert_eq!(files.len(), 20);
        for (i, file) in files.iter().enumerate() {
            let name = file
                .file_name()
                .and_then(|v| v.to_str())
                .expect("Valid file name");
            assert!(name.starts_with(&format!("{:08}____", i)), "{}", name);
            assert!(name.ends_with(".sql"), "{}", name);
            assert_eq!(
                fs::read_to_string(file).expect("Could not read the profile"),
                format!("SELECT {}", i)
            );
            let dir = file.parent().expect("Context directory");
            assert_eq!(dir.file_name().and_then(|v| v.to_str()), Some(context.id()));
            let flags = dir.parent().expect("Flags directory");
            assert_eq!(
                flags.file_name().and_then(|v| v.to_str()),
                Some("nightly-export")
            );
        }
        let _ = fs::remove_dir_all(&output);
    }

    #[tokio::test]
    async fn connection_profiling() {
        let output = output("connection");
        let driver = MockDriver::new();
        let connection = Pool::new(driver.clone())
            .open(Environment {
                alias: "profiled".into(),
                user: "tether".into(),
                pass: "secret".into(),
                profiler_enable: true,
                profiler_output: output.clone(),
                ..Default::default()
            })
            .await
            .expect("Could not open the connection");
        assert!(!connection.has_profiler());
        connection.connect().await.expect("Could not connect");
        assert!(connection.has_profiler());
        assert!(connection.has_context());

        for i in 0..5 {
            connection
                .exec(&Query::new("UPDATE t SET a = ?").bind(i))
                .await
                .expect("Could not execute");
        }
        let copy = connection.copy();
        copy.query_slice("SELECT a FROM t", [1], |_| {})
            .await
            .expect("Could not query");
        copy.close().await.expect("Could not close the copy");
        assert!(copy.has_profiler());

        let context = connection.context().expect("Profiling context").clone();
        let profiler = connection.profiler().expect("Profiler").clone();
        connection.close().await.expect("Could not close");
        assert!(context.is_done());
        assert_eq!(context.len(), 6);
        assert_eq!(profiler.written(), 6);
        let files = files(&output);
        assert_eq!(files.len(), 6);
        assert!(
            files
                .iter()
                .all(|v| v.components().any(|c| c.as_os_str() == "default"))
        );
        let _ = fs::remove_dir_all(&output);
    }

    #[tokio::test]
    async fn scoped_context_inside_profiling() {
        let output = output("scoped");
        let connection = Pool::new(MockDriver::new())
            .open(Environment {
                alias: "profiled_scope".into(),
                user: "tether".into(),
                pass: "secret".into(),
                profiler_enable: true,
                profiler_output: output.clone(),
                ..Default::default()
            })
            .await
            .expect("Could not open the connection");
        let scoped = connection.with_context(["job"]);
        scoped.exec("DELETE FROM t").await.expect("Could not execute");
        scoped.done().await;
        connection.close().await.expect("Could not close");
        let files = files(&output);
        assert_eq!(files.len(), 1);
        let scope = scoped.context().expect("Scoped context");
        assert!(files[0].ends_with(format!("job/{}/00000000____{:?}.sql", scope.id(), scope.entries()[0].runtime())));
        let _ = fs::remove_dir_all(&output);
    }
}
