use crate::config::Config;
use anyhow::Result;
use libsql::{Builder, Connection, Database as LibsqlDatabase};
use std::path::Path;
use tokio::sync::{Mutex, MutexGuard};

const SCHEMA: &str = include_str!("schema.sql");

const IN_MEMORY: &str = ":memory:";

/// Owns the single libsql connection. Every request goes through a
/// [`Session`], so reads never observe another request's open transaction.
pub struct Database {
    _db: LibsqlDatabase,
    conn: Connection,
    lock: Mutex<()>,
}

/// Exclusive access to the connection for the lifetime of one request.
pub struct Session<'a> {
    conn: &'a Connection,
    _guard: MutexGuard<'a, ()>,
}

impl Session<'_> {
    pub fn connection(&self) -> &Connection {
        self.conn
    }
}

impl Database {
    pub async fn new(cfg: &Config, data_dir: &Path) -> Result<Self> {
        let name = cfg.app.get_db();
        if name == IN_MEMORY {
            tracing::warn!("[db] running against an in-memory database, nothing will be persisted");
            return Self::in_memory().await;
        }

        let path = data_dir.join(name);
        tracing::info!(path = ?path, "[db] opening local database");
        let db = Builder::new_local(&path).build().await?;
        Self::open(db).await
    }

    pub async fn in_memory() -> Result<Self> {
        let db = Builder::new_local(IN_MEMORY).build().await?;
        Self::open(db).await
    }

    async fn open(db: LibsqlDatabase) -> Result<Self> {
        let conn = db.connect()?;
        conn.query("SELECT 1", ()).await?;

        conn.execute_batch(SCHEMA)
            .await
            .map_err(|e| anyhow::anyhow!("failed to apply schema: {e}"))?;

        Ok(Database {
            _db: db,
            conn,
            lock: Mutex::new(()),
        })
    }

    pub async fn session(&self) -> Session<'_> {
        Session {
            conn: &self.conn,
            _guard: self.lock.lock().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_bootstrap_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        let session = db.session().await;
        session.connection().execute_batch(SCHEMA).await.unwrap();

        let mut rows = session
            .connection()
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' \
                 AND name IN ('book', 'history', 'book_history') ORDER BY name",
                (),
            )
            .await
            .unwrap();

        let mut names = Vec::new();
        while let Some(row) = rows.next().await.unwrap() {
            names.push(row.get::<String>(0).unwrap());
        }
        assert_eq!(names, vec!["book", "book_history", "history"]);
    }
}
