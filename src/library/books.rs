use libsql::{Connection, Row};

use super::{histories, links};
use crate::error::StoreError;
use crate::model::{Book, BookInput, BookSummary, timestamp};
use crate::pagination::{Page, PageRequest};

const SELECT_BOOK: &str = r#"
    SELECT book.id, book.name, book.author, book.number_of_pages, book.photo, book.create_date
    FROM book
"#;

/// Book rows and their history links.
pub struct BookStore<'a> {
    conn: &'a Connection,
}

impl<'a> BookStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub async fn list(&self, request: PageRequest) -> Result<Page<Book>, StoreError> {
        let total_items = links::count(self.conn, links::BOOK_TABLE).await?;

        let query = format!("{SELECT_BOOK} ORDER BY book.id LIMIT ? OFFSET ?");
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
            items.push(self.with_histories(summary).await?);
        }

        Ok(Page::new(request, total_items, items))
    }

    pub async fn get(&self, id: i64) -> Result<Option<Book>, StoreError> {
        match self.get_summary(id).await? {
            Some(summary) => Ok(Some(self.with_histories(summary).await?)),
            None => Ok(None),
        }
    }

    pub async fn create(&self, input: BookInput) -> Result<Book, StoreError> {
        links::begin(self.conn).await?;
        let result = self.create_internal(input).await;
        links::finish(self.conn, result).await
    }

    async fn create_internal(&self, input: BookInput) -> Result<Book, StoreError> {
        let history_ids = links::resolve_ids(
            self.conn,
            links::HISTORY_TABLE,
            input.history_ids.as_deref().unwrap_or_default(),
        )
        .await?;

        let create_date = input.create_date.unwrap_or_else(timestamp::now);
        self.conn
            .execute(
                r#"
                INSERT INTO book (name, author, number_of_pages, photo, create_date)
                VALUES (?, ?, ?, ?, ?)
                "#,
                libsql::params![
                    input.name,
                    input.author,
                    input.number_of_pages,
                    input.photo,
                    timestamp::format(&create_date)
                ],
            )
            .await?;
        let id = self.conn.last_insert_rowid();

        for history_id in history_ids {
            links::link(self.conn, id, history_id).await?;
        }

        self.get(id)
            .await?
            .ok_or(StoreError::NotFound { entity: links::BOOK_TABLE, id })
    }

    /// Overwrites every nullable field. `create_date` is kept when omitted and
    /// links are only replaced when `history_ids` is present.
    pub async fn update(&self, id: i64, input: BookInput) -> Result<Option<Book>, StoreError> {
        links::begin(self.conn).await?;
        let result = self.update_internal(id, input).await;
        links::finish(self.conn, result).await
    }

    async fn update_internal(&self, id: i64, input: BookInput) -> Result<Option<Book>, StoreError> {
        if self.get_summary(id).await?.is_none() {
            return Ok(None);
        }

        let history_ids = match input.history_ids.as_deref() {
            Some(ids) => Some(links::resolve_ids(self.conn, links::HISTORY_TABLE, ids).await?),
            None => None,
        };

        self.conn
            .execute(
                r#"
                UPDATE book
                SET name = ?, author = ?, number_of_pages = ?, photo = ?,
                    create_date = COALESCE(?, create_date)
                WHERE id = ?
                "#,
                libsql::params![
                    input.name,
                    input.author,
                    input.number_of_pages,
                    input.photo,
                    input.create_date.as_ref().map(timestamp::format),
                    id
                ],
            )
            .await?;

        if let Some(history_ids) = history_ids {
            self.conn
                .execute("DELETE FROM book_history WHERE book_id = ?", libsql::params![id])
                .await?;
            for history_id in history_ids {
                links::link(self.conn, id, history_id).await?;
            }
        }

        self.get(id).await
    }

    /// Removes the book and its links, returning what was deleted.
    pub async fn delete(&self, id: i64) -> Result<Option<Book>, StoreError> {
        links::begin(self.conn).await?;
        let result = self.delete_internal(id).await;
        links::finish(self.conn, result).await
    }

    async fn delete_internal(&self, id: i64) -> Result<Option<Book>, StoreError> {
        let Some(book) = self.get(id).await? else {
            return Ok(None);
        };

        self.conn
            .execute("DELETE FROM book_history WHERE book_id = ?", libsql::params![id])
            .await?;
        self.conn
            .execute("DELETE FROM book WHERE id = ?", libsql::params![id])
            .await?;

        Ok(Some(book))
    }

    async fn get_summary(&self, id: i64) -> Result<Option<BookSummary>, StoreError> {
        let query = format!("{SELECT_BOOK} WHERE book.id = ?");
        let mut rows = self.conn.query(&query, libsql::params![id]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_summary(&row)?)),
            None => Ok(None),
        }
    }

    async fn with_histories(&self, summary: BookSummary) -> Result<Book, StoreError> {
        let histories = histories::summaries_for_book(self.conn, summary.id).await?;
        Ok(Book { summary, histories })
    }
}

/// Books linked to one history, ordered by id.
pub(crate) async fn summaries_for_history(
    conn: &Connection,
    history_id: i64,
) -> Result<Vec<BookSummary>, StoreError> {
    let query = format!(
        "{SELECT_BOOK} JOIN book_history ON book_history.book_id = book.id
        WHERE book_history.history_id = ?
        ORDER BY book.id"
    );
    let mut rows = conn.query(&query, libsql::params![history_id]).await?;

    let mut books = Vec::new();
    while let Some(row) = rows.next().await? {
        books.push(row_to_summary(&row)?);
    }
    Ok(books)
}

fn row_to_summary(row: &Row) -> Result<BookSummary, StoreError> {
    let create_date: String = row.get(5)?;
    let create_date = timestamp::parse(&create_date)
        .ok_or_else(|| StoreError::Corrupt(format!("book create_date {create_date:?}")))?;

    Ok(BookSummary {
        id: row.get(0)?,
        name: row.get(1)?,
        author: row.get(2)?,
        number_of_pages: row.get(3)?,
        photo: row.get(4)?,
        create_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn named(name: &str) -> BookInput {
        BookInput {
            name: Some(name.to_string()),
            author: Some("someone".to_string()),
            number_of_pages: Some(100),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn list_returns_id_ordered_windows() {
        let db = Database::in_memory().await.unwrap();
        let session = db.session().await;
        let store = BookStore::new(session.connection());
        for i in 0..7 {
            store.create(named(&format!("book {i}"))).await.unwrap();
        }

        for (page, size) in [(1, 3), (2, 3), (3, 3), (4, 3), (1, 10), (2, 7)] {
            let request = PageRequest::new(page, size).unwrap();
            let result = store.list(request).await.unwrap();
            let expected = size.min((7 - (page - 1) * size).max(0));
            assert_eq!(result.items.len() as i64, expected, "page {page} size {size}");
            assert_eq!(result.total_items, 7);
            assert_eq!(result.total_pages(), (7 + size - 1) / size);
            let ids: Vec<i64> = result.items.iter().map(|b| b.summary.id).collect();
            assert!(ids.windows(2).all(|w| w[0] < w[1]));
        }

        let page = store.list(PageRequest::new(3, 3).unwrap()).await.unwrap();
        assert_eq!(page.items[0].summary.name.as_deref(), Some("book 6"));
    }

    #[tokio::test]
    async fn update_overwrites_omitted_fields_with_null() {
        let db = Database::in_memory().await.unwrap();
        let session = db.session().await;
        let store = BookStore::new(session.connection());
        let created = store.create(named("Dune")).await.unwrap();

        let updated = store
            .update(
                created.summary.id,
                BookInput {
                    name: Some("Dune Messiah".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.summary.name.as_deref(), Some("Dune Messiah"));
        assert_eq!(updated.summary.author, None);
        assert_eq!(updated.summary.number_of_pages, None);
        assert_eq!(updated.summary.create_date, created.summary.create_date);
    }

    #[tokio::test]
    async fn create_rejects_unknown_history() {
        let db = Database::in_memory().await.unwrap();
        let session = db.session().await;
        let store = BookStore::new(session.connection());
        let mut input = named("Dune");
        input.history_ids = Some(vec![5]);

        let err = store.create(input).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "history", id: 5 }));
        assert_eq!(links::count(session.connection(), links::BOOK_TABLE).await.unwrap(), 0);
    }
}
