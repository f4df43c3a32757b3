/*
    Engine session:
    * EngineSession owns the single in-process DuckDB connection of a run.
    * The connection is opened once, used strictly sequentially, and released either through
      `close()` or, on any early return, when the session is dropped.
    * Every engine call runs on the blocking pool and is awaited before the next one starts.
*/
use crate::imports::*;
use duckdb::Connection;
use duckdb::types::Value;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub mod sql;

pub const EVENTS_TABLE: &str = "user_events";

pub type EngineResult<T> = std::result::Result<T, duckdb::Error>;

pub struct EngineSession {
    conn: Arc<Mutex<Connection>>,
    statements: AtomicUsize,
    remote: bool,
}

impl std::fmt::Debug for EngineSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSession")
            .field("statements", &self.statements_executed())
            .field("remote", &self.remote)
            .finish()
    }
}

impl EngineSession {
    // `remote` carries the S3 settings when files are read from object storage.
    #[tracing::instrument(skip(remote), fields(remote = remote.is_some()))]
    pub async fn open(remote: Option<StorageSettings>) -> Result<Self> {
        let is_remote = remote.is_some();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection> {
            let conn = Connection::open_in_memory().map_err(|source| IngestError::Engine {
                context: "opening in-memory database".to_string(),
                source,
            })?;
            if let Some(settings) = remote {
                configure_s3(&conn, &settings)?;
            }
            Ok(conn)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Task join error: {}", e))??;

        tracing::debug!("Opened engine connection");
        Ok(EngineSession {
            conn: Arc::new(Mutex::new(conn)),
            statements: AtomicUsize::new(0),
            remote: is_remote,
        })
    }

    pub async fn open_in_memory() -> Result<Self> {
        Self::open(None).await
    }

    pub fn is_remote(&self) -> bool {
        self.remote
    }

    pub fn statements_executed(&self) -> usize {
        self.statements.load(Ordering::SeqCst)
    }

    async fn with_connection<T, F>(&self, f: F) -> Result<EngineResult<T>>
    where
        F: FnOnce(&Connection) -> EngineResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || -> Result<EngineResult<T>> {
            let guard = conn
                .lock()
                .map_err(|_| anyhow::anyhow!("Engine connection lock poisoned"))?;
            Ok(f(&*guard))
        })
        .await
        .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }

    /// Runs a single statement and returns the number of rows it changed.
    ///
    /// The outer `Result` covers dispatch failures, the inner one carries the engine's own
    /// error so callers can attach their own context to it.
    pub async fn execute(&self, statement: String) -> Result<EngineResult<usize>> {
        tracing::debug!(statement = %statement, "Executing statement");
        self.statements.fetch_add(1, Ordering::SeqCst);
        self.with_connection(move |conn| conn.execute(&statement, []))
            .await
    }

    /// Runs a query and materializes the full result before returning it.
    pub async fn query(&self, statement: String) -> Result<EngineResult<TabularValue>> {
        tracing::debug!(statement = %statement, "Running query");
        let fetched = self
            .with_connection(move |conn| -> EngineResult<(Vec<String>, Vec<Vec<Value>>)> {
                let mut stmt = conn.prepare(&statement)?;
                let mut rows = stmt.query([])?;
                let names = rows
                    .as_ref()
                    .map(|s| s.column_names())
                    .unwrap_or_default();
                let width = names.len();

                let mut fetched = Vec::new();
                while let Some(row) = rows.next()? {
                    let mut values = Vec::with_capacity(width);
                    for index in 0..width {
                        values.push(row.get::<_, Value>(index)?);
                    }
                    fetched.push(values);
                }
                Ok((names, fetched))
            })
            .await?;

        let (names, fetched) = match fetched {
            Ok(result) => result,
            Err(e) => return Ok(Err(e)),
        };

        let mut buffer = RowBuffer::new(names);
        for row in fetched {
            buffer.push_row(row)?;
        }
        tracing::debug!(rows = buffer.height(), "Fetched query result");
        Ok(Ok(buffer.into_frame()?))
    }

    /// Closes the connection, surfacing any error the engine reports while shutting down.
    #[tracing::instrument(skip(self), fields(statements = self.statements_executed()))]
    pub fn close(self) -> Result<()> {
        let mutex = Arc::try_unwrap(self.conn)
            .map_err(|_| anyhow::anyhow!("Engine connection is still shared"))?;
        let conn = mutex
            .into_inner()
            .map_err(|_| anyhow::anyhow!("Engine connection lock poisoned"))?;
        conn.close().map_err(|(_, source)| IngestError::Engine {
            context: "closing connection".to_string(),
            source,
        })?;
        tracing::debug!("Closed engine connection");
        Ok(())
    }
}

fn configure_s3(conn: &Connection, settings: &StorageSettings) -> Result<()> {
    let setup = |statement: &str, context: &str| -> Result<()> {
        conn.execute_batch(statement)
            .map_err(|source| IngestError::Engine {
                context: context.to_string(),
                source,
            })?;
        Ok(())
    };

    setup("INSTALL httpfs; LOAD httpfs;", "loading httpfs extension")?;
    if !settings.has_credentials() {
        setup("INSTALL aws; LOAD aws;", "loading aws extension")?;
    }
    setup(&sql::create_s3_secret(settings), "registering S3 secret")?;
    tracing::debug!(settings = ?settings, "Configured S3 access for engine");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_tracing;

    #[tokio::test]
    async fn test_execute_then_query() {
        init_tracing();
        let session = EngineSession::open_in_memory().await.unwrap();

        session
            .execute("CREATE TABLE t AS SELECT * FROM (VALUES ('a', 1), ('b', 2), ('a', 3)) v(k, n)".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.statements_executed(), 1);

        let frame = session
            .query("SELECT k, SUM(n)::BIGINT AS total FROM t GROUP BY k ORDER BY k".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.height(), 2);
        assert_eq!(render_rows(&frame).unwrap(), r#"[("a", 4), ("b", 2)]"#);

        session.close().unwrap();
    }

    #[tokio::test]
    async fn test_engine_errors_are_returned_not_raised() {
        init_tracing();
        let session = EngineSession::open_in_memory().await.unwrap();

        let result = session
            .query("SELECT missing_column FROM nowhere".to_string())
            .await
            .unwrap();
        assert!(result.is_err());

        let result = session
            .execute("INSERT INTO nowhere VALUES (1)".to_string())
            .await
            .unwrap();
        assert!(result.is_err());

        // A failed statement leaves the connection usable and closable.
        let frame = session
            .query("SELECT 1 AS one".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.height(), 1);
        session.close().unwrap();
    }

    // Installs the httpfs extension, which needs network access.
    #[tokio::test]
    #[ignore]
    async fn test_open_remote_registers_s3_secret() {
        init_tracing();
        let settings = StorageSettings {
            region: Some("us-east-1".to_string()),
            access_key_id: Some("AKIAEXAMPLE".to_string()),
            secret_access_key: Some("example-secret".to_string()),
            ..Default::default()
        };
        let session = EngineSession::open(Some(settings)).await.unwrap();
        assert!(session.is_remote());
        assert_eq!(session.statements_executed(), 0);

        let frame = session
            .query("SELECT name, type FROM duckdb_secrets() ORDER BY name".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(render_rows(&frame).unwrap(), r#"[("coldstore_s3", "s3")]"#);
        session.close().unwrap();
    }

    #[tokio::test]
    async fn test_local_session_is_not_remote() {
        init_tracing();
        let session = EngineSession::open(None).await.unwrap();
        assert!(!session.is_remote());
        session.close().unwrap();
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_tables() {
        init_tracing();
        let first = EngineSession::open_in_memory().await.unwrap();
        first
            .execute(format!("CREATE TABLE {} AS SELECT 1 AS x", EVENTS_TABLE))
            .await
            .unwrap()
            .unwrap();
        first.close().unwrap();

        let second = EngineSession::open_in_memory().await.unwrap();
        let result = second
            .query(sql::count_all(EVENTS_TABLE))
            .await
            .unwrap();
        assert!(result.is_err());
        drop(second);
    }
}
