use libsql::{Connection, Row};

use super::{books, links};
use crate::error::StoreError;
use crate::model::{History, HistoryInput, HistorySummary, timestamp};
use crate::pagination::{Page, PageRequest};

const SELECT_HISTORY: &str = r#"
    SELECT history.id, history.content, history.from_page, history.to_page, history.tag,
        history.create_date
    FROM history
"#;

/// Reading-history rows and their book links.
pub struct HistoryStore<'a> {
    conn: &'a Connection,
}

impl<'a> HistoryStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub async fn list(&self, request: PageRequest) -> Result<Page<History>, StoreError> {
        let total_items = links::count(self.conn, links::HISTORY_TABLE).await?;

        let query = format!("{SELECT_HISTORY} ORDER BY history.id LIMIT ? OFFSET ?");
        let mut rows = self
            .conn
            .query(&query, libsql::params![request.limit(), request.offset()])
            .await?;

        let mut summaries = Vec::new();
        while let Some(row) = rows.next().await? {
            summaries.push(row_to_summary(&row)?);
        }
        drop(rows);

        let mut items = Vec::with_capacity(summaries.len());
        for summary in summaries {
            items.push(self.with_books(summary).await?);
        }

        Ok(Page::new(request, total_items, items))
    }

    pub async fn get(&self, id: i64) -> Result<Option<History>, StoreError> {
        match self.get_summary(id).await? {
            Some(summary) => Ok(Some(self.with_books(summary).await?)),
            None => Ok(None),
        }
    }

    pub async fn create(&self, input: HistoryInput) -> Result<History, StoreError> {
        links::begin(self.conn).await?;
        let result = self.create_internal(input).await;
        links::finish(self.conn, result).await
    }

    async fn create_internal(&self, input: HistoryInput) -> Result<History, StoreError> {
        let book_ids = links::resolve_ids(
            self.conn,
            links::BOOK_TABLE,
            input.book_ids.as_deref().unwrap_or_default(),
        )
        .await?;

        let create_date = input.create_date.unwrap_or_else(timestamp::now);
        self.conn
            .execute(
                r#"
                INSERT INTO history (content, from_page, to_page, tag, create_date)
                VALUES (?, ?, ?, ?, ?)
                "#,
                libsql::params![
                    input.content,
                    input.from_page,
                    input.to_page,
                    input.tag,
                    timestamp::format(&create_date)
                ],
            )
            .await?;
        let id = self.conn.last_insert_rowid();

        for book_id in book_ids {
            links::link(self.conn, book_id, id).await?;
        }

        self.get(id)
            .await?
            .ok_or(StoreError::NotFound { entity: links::HISTORY_TABLE, id })
    }

    pub async fn update(
        &self,
        id: i64,
        input: HistoryInput,
    ) -> Result<Option<History>, StoreError> {
        links::begin(self.conn).await?;
        let result = self.update_internal(id, input).await;
        links::finish(self.conn, result).await
    }

    async fn update_internal(
        &self,
        id: i64,
        input: HistoryInput,
    ) -> Result<Option<History>, StoreError> {
        if self.get_summary(id).await?.is_none() {
            return Ok(None);
        }

        let book_ids = match input.book_ids.as_deref() {
            Some(ids) => Some(links::resolve_ids(self.conn, links::BOOK_TABLE, ids).await?),
            None => None,
        };

        self.conn
            .execute(
                r#"
                UPDATE history
                SET content = ?, from_page = ?, to_page = ?, tag = ?,
                    create_date = COALESCE(?, create_date)
                WHERE id = ?
                "#,
                libsql::params![
                    input.content,
                    input.from_page,
                    input.to_page,
                    input.tag,
                    input.create_date.as_ref().map(timestamp::format),
                    id
                ],
            )
            .await?;

        if let Some(book_ids) = book_ids {
            self.conn
                .execute("DELETE FROM book_history WHERE history_id = ?", libsql::params![id])
                .await?;
            for book_id in book_ids {
                links::link(self.conn, book_id, id).await?;
            }
        }

        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<Option<History>, StoreError> {
        links::begin(self.conn).await?;
        let result = self.delete_internal(id).await;
        links::finish(self.conn, result).await
    }

    async fn delete_internal(&self, id: i64) -> Result<Option<History>, StoreError> {
        let Some(history) = self.get(id).await? else {
            return Ok(None);
        };

        self.conn
            .execute("DELETE FROM book_history WHERE history_id = ?", libsql::params![id])
            .await?;
        self.conn
            .execute("DELETE FROM history WHERE id = ?", libsql::params![id])
            .await?;

        Ok(Some(history))
    }

    async fn get_summary(&self, id: i64) -> Result<Option<HistorySummary>, StoreError> {
        let query = format!("{SELECT_HISTORY} WHERE history.id = ?");
        let mut rows = self.conn.query(&query, libsql::params![id]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_summary(&row)?)),
            None => Ok(None),
        }
    }

    async fn with_books(&self, summary: HistorySummary) -> Result<History, StoreError> {
        let books = books::summaries_for_history(self.conn, summary.id).await?;
        Ok(History { summary, books })
    }
}

pub(crate) async fn summaries_for_book(
    conn: &Connection,
    book_id: i64,
) -> Result<Vec<HistorySummary>, StoreError> {
    let query = format!(
        "{SELECT_HISTORY} JOIN book_history ON book_history.history_id = history.id
        WHERE book_history.book_id = ?
        ORDER BY history.id"
    );
    let mut rows = conn.query(&query, libsql::params![book_id]).await?;

    let mut histories = Vec::new();
    while let Some(row) = rows.next().await? {
        histories.push(row_to_summary(&row)?);
    }
    Ok(histories)
}

fn row_to_summary(row: &Row) -> Result<HistorySummary, StoreError> {
    let create_date: String = row.get(5)?;
    let create_date = timestamp::parse(&create_date)
        .ok_or_else(|| StoreError::Corrupt(format!("history create_date {create_date:?}")))?;

    Ok(HistorySummary {
        id: row.get(0)?,
        content: row.get(1)?,
        from_page: row.get(2)?,
        to_page: row.get(3)?,
        tag: row.get(4)?,
        create_date,
    })
}
