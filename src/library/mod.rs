//! Books and reading histories.
//!
//! [`BookStore`] and [`HistoryStore`] own the SQL for each resource and keep
//! the `book_history` association in step with it. Every write runs in a
//! single transaction; related ids are resolved before the first write, so a
//! request that names an unknown id changes nothing.
//!
//! # Usage
//!
//! ```rust,ignore
//! use readlog::library::{self, BookStore};
//!
//! let app = Router::new()
//!     .nest("/api/v1.0", library::routes(&validator))
//!     .with_state(app_state);
//!
//! let session = db.session().await;
//! let book = BookStore::new(session.connection()).get(1).await?;
//! ```

mod books;
mod handler;
mod histories;
mod links;
mod routes;

pub use books::BookStore;
pub use histories::HistoryStore;
pub use routes::routes;
