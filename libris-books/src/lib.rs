//! The library catalogue on top of [`libris`](../libris/index.html).
//!
//! [`LibraryApi`] wraps a libris client with one method per operation: listing and reading
//! books, adding, editing and deleting them, borrowing copies and reading the borrow summary.
//! Results are cached and tagged, so a borrow or an edit refreshes every subscribed list
//! and detail view that could have changed.
//!
//! ```no_run
//! use libris_books::{forms::NewBook, models::Genre, notice::{Notice, ADD_FAILED}, LibraryApi};
//!
//! # tokio_test::block_on(async {
//! let api = LibraryApi::connect("http://localhost:5000").unwrap();
//! let book = NewBook {
//!     title: "Dune".to_string(),
//!     author: "Herbert".to_string(),
//!     genre: Genre::Science,
//!     isbn: "9780441013593".to_string(),
//!     description: None,
//!     copies: 3
//! };
//! let notice = match api.add_book(book).await {
//!     Ok(book) => Notice::book_added(&book.title),
//!     Err(e) => Notice::failure(&e, ADD_FAILED)
//! };
//! println!("{}", notice);
//! # });
//! ```

pub mod api;
pub mod endpoints;
mod error;
pub mod forms;
pub mod models;
pub mod notice;
pub mod pagination;
pub mod summary;

pub use api::LibraryApi;
pub use error::LibraryError;
pub use pagination::page_window;
pub use summary::BorrowStats;
