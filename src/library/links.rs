//! Helpers shared by the book and history stores: counting, id resolution,
//! association rows and the transaction envelope.

use libsql::Connection;

use crate::error::StoreError;

pub(crate) const BOOK_TABLE: &str = "book";
pub(crate) const HISTORY_TABLE: &str = "history";

pub(crate) async fn count(conn: &Connection, table: &'static str) -> Result<i64, StoreError> {
    let query = format!("SELECT COUNT(*) FROM {table}");
    let mut rows = conn.query(&query, ()).await?;
    match rows.next().await? {
        Some(row) => Ok(row.get::<i64>(0)?),
        None => Ok(0),
    }
}

async fn exists(conn: &Connection, table: &'static str, id: i64) -> Result<bool, StoreError> {
    let query = format!("SELECT 1 FROM {table} WHERE id = ?");
    let mut rows = conn.query(&query, libsql::params![id]).await?;
    Ok(rows.next().await?.is_some())
}

/// Checks that every id names an existing row, collapsing duplicates.
/// Fails on the first unknown id, before the caller writes anything.
pub(crate) async fn resolve_ids(
    conn: &Connection,
    table: &'static str,
    ids: &[i64],
) -> Result<Vec<i64>, StoreError> {
    let mut resolved = Vec::with_capacity(ids.len());
    for &id in ids {
        if resolved.contains(&id) {
            continue;
        }
        if !exists(conn, table, id).await? {
            return Err(StoreError::NotFound { entity: table, id });
        }
        resolved.push(id);
    }
    Ok(resolved)
}

pub(crate) async fn link(
    conn: &Connection,
    book_id: i64,
    history_id: i64,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT OR IGNORE INTO book_history (book_id, history_id) VALUES (?, ?)",
        libsql::params![book_id, history_id],
    )
    .await?;
    Ok(())
}

pub(crate) async fn begin(conn: &Connection) -> Result<(), StoreError> {
    conn.execute("BEGIN TRANSACTION", ()).await?;
    Ok(())
}

/// Commits on success, rolls back on any error.
pub(crate) async fn finish<T>(
    conn: &Connection,
    result: Result<T, StoreError>,
) -> Result<T, StoreError> {
    let err = match result {
        Ok(value) => match conn.execute("COMMIT", ()).await {
            Ok(_) => return Ok(value),
            Err(e) => StoreError::from(e),
        },
        Err(e) => e,
    };

    if let Err(rollback) = conn.execute("ROLLBACK", ()).await {
        tracing::error!(error = %rollback, "rollback failed");
    }
    Err(err)
}
