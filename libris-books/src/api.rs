use crate::{
    endpoints::{
        AddBook, BookQuery, BookUpdate, BorrowBook, BorrowRequest, DeleteBook, GetBook, GetBooks,
        GetBorrowSummary, UpdateBook
    },
    error::LibraryError,
    forms::{BookChanges, BorrowForm, FieldErrors, NewBook},
    models::{Ack, Book, Borrow, BorrowSummaryEntry, CreatedBook, Envelope}
};
use libris::{
    default_exchanges::TerminatorExchange, Client, Exchange, QueryError, QueryObservable,
    QueryOptions, RefetchTrigger
};

/// Typed access to the library API.
///
/// Every mutation validates its input first. Invalid input comes back as
/// [`LibraryError::Validation`] without a request being made.
pub struct LibraryApi<M: Exchange = TerminatorExchange> {
    client: Client<M>
}

impl<M: Exchange> Clone for LibraryApi<M> {
    fn clone(&self) -> Self {
        LibraryApi {
            client: self.client.clone()
        }
    }
}

impl LibraryApi {
    /// Connect to the API at `base_url` using the default exchanges.
    pub fn connect<U: AsRef<str>>(base_url: U) -> Result<LibraryApi<impl Exchange>, QueryError> {
        let client = Client::builder(base_url)?
            .with_default_exchanges()
            .build();
        Ok(LibraryApi::new(client))
    }
}

fn require_id(id: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    if id.trim().is_empty() {
        errors.add("id", "Book ID is required");
    }
    errors.into_result()
}

/// Subscriptions to a single book follow the page that shows it: fresh on open, and again
/// when the network comes back.
fn detail_options() -> QueryOptions {
    QueryOptions {
        refetch_on_mount: true,
        refetch_on_reconnect: true,
        ..QueryOptions::default()
    }
}

impl<M: Exchange> LibraryApi<M> {
    pub fn new(client: Client<M>) -> Self {
        LibraryApi { client }
    }

    pub fn client(&self) -> &Client<M> {
        &self.client
    }

    pub async fn books(&self, query: BookQuery) -> Result<Envelope<Vec<Book>>, LibraryError> {
        Ok(self.client.query::<GetBooks>(query).await?.data)
    }

    pub async fn book(&self, id: &str) -> Result<Book, LibraryError> {
        require_id(id)?;
        Ok(self.client.query::<GetBook>(id.to_string()).await?.data.data)
    }

    pub async fn borrow_summary(&self) -> Result<Vec<BorrowSummaryEntry>, LibraryError> {
        Ok(self.client.query::<GetBorrowSummary>(()).await?.data.data)
    }

    pub async fn watch_books(
        &self,
        query: BookQuery
    ) -> Result<QueryObservable<GetBooks, M>, LibraryError> {
        Ok(self.client.subscribe::<GetBooks>(query).await?)
    }

    pub async fn watch_book(&self, id: &str) -> Result<QueryObservable<GetBook, M>, LibraryError> {
        require_id(id)?;
        Ok(self
            .client
            .subscribe_with_options::<GetBook>(id.to_string(), detail_options())
            .await?)
    }

    pub async fn watch_borrow_summary(
        &self
    ) -> Result<QueryObservable<GetBorrowSummary, M>, LibraryError> {
        let options = QueryOptions {
            refetch_on_reconnect: true,
            ..QueryOptions::default()
        };
        Ok(self
            .client
            .subscribe_with_options::<GetBorrowSummary>((), options)
            .await?)
    }

    pub async fn add_book(&self, book: NewBook) -> Result<CreatedBook, LibraryError> {
        book.check()?;
        let created = self.client.mutate::<AddBook>(book).await?.data.data;
        tracing::info!(id = ?created.id, title = %created.title, "book added");
        Ok(created)
    }

    pub async fn update_book(&self, id: &str, changes: BookChanges) -> Result<Book, LibraryError> {
        require_id(id)?;
        changes.check()?;
        let update = BookUpdate {
            id: id.to_string(),
            changes
        };
        let response = self.client.mutate::<UpdateBook>(update).await?;
        tracing::info!(id, "book updated");
        Ok(response.data.data)
    }

    pub async fn delete_book(&self, id: &str) -> Result<Ack, LibraryError> {
        require_id(id)?;
        let response = self.client.mutate::<DeleteBook>(id.to_string()).await?;
        tracing::info!(id, "book deleted");
        Ok(response.data)
    }

    pub async fn borrow_book(&self, form: BorrowForm) -> Result<Borrow, LibraryError> {
        form.check()?;
        let request = BorrowRequest {
            book: form.book,
            quantity: form.quantity,
            due_date: form.due_date
        };
        let response = self.client.mutate::<BorrowBook>(request).await?;
        tracing::info!(book = %response.data.data.book, quantity = response.data.data.quantity, "book borrowed");
        Ok(response.data.data)
    }

    /// Forward an environment event to the subscriptions that care about it.
    pub fn refetch(&self, trigger: RefetchTrigger) {
        self.client.refetch(trigger)
    }
}
