//! An in-process stand-in for the library API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router
};
use serde_json::{json, Value};
use std::{
    sync::{Arc, Mutex},
    time::Duration
};

type Reply = (StatusCode, Json<Value>);

#[derive(Clone, Debug, PartialEq)]
pub struct Recorded {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>
}

#[derive(Clone, Default)]
pub struct MockLibrary {
    books: Arc<Mutex<Vec<Value>>>,
    summary: Arc<Mutex<Vec<Value>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
    next_id: Arc<Mutex<u32>>,
    delay: Duration,
    title_only_create: bool
}

pub fn book(id: &str, title: &str, copies: u32) -> Value {
    json!({
        "_id": id,
        "title": title,
        "author": "Someone",
        "genre": "FICTION",
        "isbn": format!("978{:010}", copies),
        "copies": copies,
        "available": copies > 0
    })
}

fn not_found() -> Reply {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "Book not found" }))
    )
}

impl MockLibrary {
    pub fn with_books(books: Vec<Value>) -> Self {
        MockLibrary {
            books: Arc::new(Mutex::new(books)),
            ..MockLibrary::default()
        }
    }

    pub fn with_summary(mut self, summary: Vec<Value>) -> Self {
        self.summary = Arc::new(Mutex::new(summary));
        self
    }

    /// Hold every book list response back for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Answer creates with `{success, data: {title}}` only.
    pub fn with_title_only_create(mut self) -> Self {
        self.title_only_create = true;
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .count()
    }

    fn record(&self, method: &'static str, path: String, body: Option<Value>) {
        self.requests.lock().unwrap().push(Recorded { method, path, body });
    }

    /// Serve the routes on a random local port and return the base url.
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/api/books", get(list_books).post(create_book))
            .route(
                "/api/books/:id",
                get(get_book).put(update_book).delete(delete_book)
            )
            .route("/api/borrow", get(borrow_summary).post(create_borrow))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().expect("Mock server has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Mock server failed");
        });
        format!("http://{}", addr)
    }
}

async fn list_books(State(state): State<MockLibrary>) -> Reply {
    state.record("GET", "/api/books".to_string(), None);
    tokio::time::sleep(state.delay).await;
    let books = state.books.lock().unwrap().clone();
    let total = books.len();
    (
        StatusCode::OK,
        Json(json!({
            "data": books,
            "pagination": {
                "totalPages": 1,
                "totalBooks": total,
                "hasNextPage": false,
                "hasPrevPage": false
            }
        }))
    )
}

async fn create_book(State(state): State<MockLibrary>, Json(body): Json<Value>) -> Reply {
    state.record("POST", "/api/books".to_string(), Some(body.clone()));
    let id = {
        let mut next_id = state.next_id.lock().unwrap();
        *next_id += 1;
        format!("new-{}", next_id)
    };
    let mut book = body;
    book["_id"] = json!(id);
    state.books.lock().unwrap().push(book.clone());
    if state.title_only_create {
        return (
            StatusCode::CREATED,
            Json(json!({ "success": true, "data": { "title": book["title"] } }))
        );
    }
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Book created successfully", "data": book }))
    )
}

async fn get_book(State(state): State<MockLibrary>, Path(id): Path<String>) -> Reply {
    state.record("GET", format!("/api/books/{}", id), None);
    let books = state.books.lock().unwrap();
    match books.iter().find(|book| book["_id"] == id.as_str()) {
        Some(book) => (StatusCode::OK, Json(json!({ "data": book }))),
        None => not_found()
    }
}

async fn update_book(
    State(state): State<MockLibrary>,
    Path(id): Path<String>,
    Json(body): Json<Value>
) -> Reply {
    state.record("PUT", format!("/api/books/{}", id), Some(body.clone()));
    let mut books = state.books.lock().unwrap();
    let book = match books.iter_mut().find(|book| book["_id"] == id.as_str()) {
        Some(book) => book,
        None => return not_found()
    };
    if let (Some(book), Some(changes)) = (book.as_object_mut(), body.as_object()) {
        for (key, value) in changes {
            book.insert(key.clone(), value.clone());
        }
    }
    (StatusCode::OK, Json(json!({ "data": book })))
}

async fn delete_book(State(state): State<MockLibrary>, Path(id): Path<String>) -> Reply {
    state.record("DELETE", format!("/api/books/{}", id), None);
    let mut books = state.books.lock().unwrap();
    let before = books.len();
    books.retain(|book| book["_id"] != id.as_str());
    if books.len() == before {
        return not_found();
    }
    (
        StatusCode::OK,
        Json(json!({ "success": true, "message": "Book deleted successfully" }))
    )
}

async fn borrow_summary(State(state): State<MockLibrary>) -> Reply {
    state.record("GET", "/api/borrow".to_string(), None);
    let summary = state.summary.lock().unwrap().clone();
    (StatusCode::OK, Json(json!({ "data": summary })))
}

async fn create_borrow(State(state): State<MockLibrary>, Json(body): Json<Value>) -> Reply {
    state.record("POST", "/api/borrow".to_string(), Some(body.clone()));
    let id = body["book"].as_str().unwrap_or_default().to_string();
    let quantity = body["quantity"].as_u64().unwrap_or_default();

    let mut books = state.books.lock().unwrap();
    let book = match books.iter_mut().find(|book| book["_id"] == id.as_str()) {
        Some(book) => book,
        None => return not_found()
    };
    let copies = book["copies"].as_u64().unwrap_or_default();
    if quantity > copies {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "message": "Validation failed",
                "error": { "message": "Not enough copies available" }
            }))
        );
    }
    book["copies"] = json!(copies - quantity);
    book["available"] = json!(copies - quantity > 0);

    let mut summary = state.summary.lock().unwrap();
    match summary
        .iter_mut()
        .find(|entry| entry["book"]["title"] == book["title"])
    {
        Some(entry) => {
            let total = entry["totalQuantity"].as_u64().unwrap_or_default();
            entry["totalQuantity"] = json!(total + quantity);
        }
        None => summary.push(json!({
            "book": { "title": book["title"], "isbn": book["isbn"] },
            "totalQuantity": quantity
        }))
    }

    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Book borrowed successfully",
            "data": {
                "_id": "borrow-1",
                "book": id,
                "quantity": quantity,
                "dueDate": body["dueDate"]
            }
        }))
    )
}
