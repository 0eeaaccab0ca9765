//! The library API's endpoints and the cache tags they provide and invalidate.
//!
//! Books are tagged `book:LIST` for any list and `book:{id}` per book; the borrow summary
//! is tagged `borrow:LIST`.

use crate::{
    forms::{BookChanges, NewBook},
    models::{Ack, Book, Borrow, BorrowSummaryEntry, CreatedBook, Envelope}
};
use chrono::{DateTime, Utc};
use libris::{Endpoint, Method, OperationType, QueryError, RequestSpec, Tag};
use serde::Serialize;
use serde_json::Value;

pub const BOOK: &str = "book";
pub const BORROW: &str = "borrow";

fn book_tag(id: &str) -> Tag {
    Tag::id(BOOK, id)
}

const BOOKS_PATH: &str = "/api/books";

fn book_request(method: Method, id: &str) -> Result<RequestSpec, QueryError> {
    RequestSpec::new(method, BOOKS_PATH).with_segment(id)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BookQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>
}

pub struct GetBooks;
impl Endpoint for GetBooks {
    type Args = BookQuery;
    type Response = Envelope<Vec<Book>>;

    const NAME: &'static str = "GetBooks";
    const OPERATION_TYPE: OperationType = OperationType::Query;

    fn request(query: &BookQuery) -> Result<RequestSpec, QueryError> {
        Ok(RequestSpec::get(BOOKS_PATH)
            .with_query("page", query.page)
            .with_query("limit", query.limit))
    }

    fn provides_tags(_query: &BookQuery, response: &Envelope<Vec<Book>>) -> Vec<Tag> {
        let mut tags: Vec<Tag> = response.data.iter().map(|book| book_tag(&book.id)).collect();
        tags.push(Tag::list(BOOK));
        tags
    }
}

pub struct GetBook;
impl Endpoint for GetBook {
    type Args = String;
    type Response = Envelope<Book>;

    const NAME: &'static str = "GetBook";
    const OPERATION_TYPE: OperationType = OperationType::Query;

    fn request(id: &String) -> Result<RequestSpec, QueryError> {
        book_request(Method::Get, id)
    }

    fn provides_tags(id: &String, _response: &Envelope<Book>) -> Vec<Tag> {
        vec![book_tag(id)]
    }
}

pub struct AddBook;
impl Endpoint for AddBook {
    type Args = NewBook;
    type Response = Envelope<CreatedBook>;

    const NAME: &'static str = "AddBook";
    const OPERATION_TYPE: OperationType = OperationType::Mutation;

    fn request(book: &NewBook) -> Result<RequestSpec, QueryError> {
        Ok(RequestSpec::new(Method::Post, BOOKS_PATH).with_body(serde_json::to_value(book)?))
    }

    fn invalidates_tags(_book: &NewBook, _response: &Envelope<CreatedBook>) -> Vec<Tag> {
        vec![Tag::list(BOOK)]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BookUpdate {
    pub id: String,
    pub changes: BookChanges
}

pub struct UpdateBook;
impl Endpoint for UpdateBook {
    type Args = BookUpdate;
    type Response = Envelope<Book>;

    const NAME: &'static str = "UpdateBook";
    const OPERATION_TYPE: OperationType = OperationType::Mutation;

    /// A change of `copies` also sends the `available` flag derived from it.
    fn request(update: &BookUpdate) -> Result<RequestSpec, QueryError> {
        let mut body = serde_json::to_value(&update.changes)?;
        if let (Some(copies), Value::Object(fields)) = (update.changes.copies, &mut body) {
            fields.insert("available".to_string(), Value::Bool(copies > 0));
        }
        Ok(book_request(Method::Put, &update.id)?.with_body(body))
    }

    fn invalidates_tags(update: &BookUpdate, _response: &Envelope<Book>) -> Vec<Tag> {
        vec![Tag::list(BOOK), book_tag(&update.id)]
    }
}

pub struct DeleteBook;
impl Endpoint for DeleteBook {
    type Args = String;
    type Response = Ack;

    const NAME: &'static str = "DeleteBook";
    const OPERATION_TYPE: OperationType = OperationType::Mutation;

    fn request(id: &String) -> Result<RequestSpec, QueryError> {
        book_request(Method::Delete, id)
    }

    fn invalidates_tags(id: &String, _response: &Ack) -> Vec<Tag> {
        vec![Tag::list(BOOK), book_tag(id)]
    }
}

pub struct GetBorrowSummary;
impl Endpoint for GetBorrowSummary {
    type Args = ();
    type Response = Envelope<Vec<BorrowSummaryEntry>>;

    const NAME: &'static str = "GetBorrowSummary";
    const OPERATION_TYPE: OperationType = OperationType::Query;

    fn request(_args: &()) -> Result<RequestSpec, QueryError> {
        Ok(RequestSpec::get("/api/borrow"))
    }

    fn provides_tags(_args: &(), _response: &Envelope<Vec<BorrowSummaryEntry>>) -> Vec<Tag> {
        vec![Tag::list(BORROW)]
    }
}

/// The create-borrow request body.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    pub book: String,
    pub quantity: u32,
    pub due_date: DateTime<Utc>
}

pub struct BorrowBook;
impl Endpoint for BorrowBook {
    type Args = BorrowRequest;
    type Response = Envelope<Borrow>;

    const NAME: &'static str = "BorrowBook";
    const OPERATION_TYPE: OperationType = OperationType::Mutation;

    fn request(borrow: &BorrowRequest) -> Result<RequestSpec, QueryError> {
        Ok(RequestSpec::new(Method::Post, "/api/borrow").with_body(serde_json::to_value(borrow)?))
    }

    /// Borrowing changes the summary and the book's stock.
    fn invalidates_tags(borrow: &BorrowRequest, _response: &Envelope<Borrow>) -> Vec<Tag> {
        vec![Tag::list(BORROW), Tag::list(BOOK), book_tag(&borrow.book)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Genre;
    use serde_json::json;

    fn envelope<T>(data: T) -> Envelope<T> {
        Envelope {
            success: None,
            message: None,
            data,
            pagination: None
        }
    }

    #[test]
    fn list_provides_item_and_list_tags() {
        let books = envelope(vec![
            Book::new("a", "Dune", "Herbert", Genre::Science, "9780441013593", 3),
            Book::new("b", "Emma", "Austen", Genre::Romance, "9780141439587", 1)
        ]);
        let tags = GetBooks::provides_tags(&BookQuery::default(), &books);
        assert_eq!(
            tags.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["book:a", "book:b", "book:LIST"]
        );
    }

    #[test]
    fn list_request_carries_paging() {
        let request = GetBooks::request(&BookQuery {
            page: Some(2),
            limit: None
        })
        .unwrap();
        assert_eq!(request.path, "/api/books");
        assert_eq!(request.query, vec![("page", "2".to_string())]);
    }

    #[test]
    fn book_ids_are_encoded_into_one_segment() {
        let request = GetBook::request(&"../borrow?x=1".to_string()).unwrap();
        assert_eq!(request.path, "/api/books/..%2Fborrow%3Fx%3D1");

        let request = DeleteBook::request(&"a b".to_string()).unwrap();
        assert_eq!(request.path, "/api/books/a%20b");

        assert!(matches!(
            DeleteBook::request(&"..".to_string()),
            Err(QueryError::Encode(_))
        ));
    }

    #[test]
    fn update_derives_availability_from_copies() {
        let update = BookUpdate {
            id: "a".to_string(),
            changes: BookChanges {
                copies: Some(0),
                ..BookChanges::default()
            }
        };
        let request = UpdateBook::request(&update).unwrap();
        assert_eq!(request.method, Method::Put);
        assert_eq!(request.path, "/api/books/a");
        assert_eq!(request.body, Some(json!({ "copies": 0, "available": false })));

        let update = BookUpdate {
            id: "a".to_string(),
            changes: BookChanges {
                title: Some("Dune".to_string()),
                ..BookChanges::default()
            }
        };
        let request = UpdateBook::request(&update).unwrap();
        assert_eq!(request.body, Some(json!({ "title": "Dune" })));
    }

    #[test]
    fn borrow_invalidates_summary_and_book() {
        let borrow = BorrowRequest {
            book: "a".to_string(),
            quantity: 2,
            due_date: "2030-01-01T00:00:00Z".parse().unwrap()
        };
        let request = BorrowBook::request(&borrow).unwrap();
        assert_eq!(
            request.body,
            Some(json!({ "book": "a", "quantity": 2, "dueDate": "2030-01-01T00:00:00Z" }))
        );

        let response = envelope(Borrow {
            id: "r1".to_string(),
            book: "a".to_string(),
            quantity: 2,
            due_date: borrow.due_date,
            borrowed_at: None,
            created_at: None
        });
        let tags = BorrowBook::invalidates_tags(&borrow, &response);
        assert_eq!(
            tags,
            vec![Tag::list(BORROW), Tag::list(BOOK), Tag::id(BOOK, "a")]
        );
    }
}
