//! Endpoints and a fake in-memory server shared by the unit tests.

use crate::{
    exchange::{
        Client, Exchange, ExchangeFactory, ExchangeResult, Operation, OperationKey, OperationMeta,
        OperationOptions, OperationResult
    },
    utils::operation_key,
    DebugInfo, Endpoint, Method, OperationType, QueryError, RequestPolicy, RequestSpec, Response,
    ResultSource, Tag
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc
    },
    time::Duration
};
use tokio::time::sleep;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub title: String
}

impl Todo {
    pub fn new(id: &str, title: &str) -> Self {
        Todo {
            id: id.to_string(),
            title: title.to_string()
        }
    }
}

pub struct GetTodos;
impl Endpoint for GetTodos {
    type Args = ();
    type Response = Vec<Todo>;

    const NAME: &'static str = "GetTodos";
    const OPERATION_TYPE: OperationType = OperationType::Query;

    fn request(_args: &()) -> Result<RequestSpec, QueryError> {
        Ok(RequestSpec::get("/todos"))
    }

    fn provides_tags(_args: &(), todos: &Vec<Todo>) -> Vec<Tag> {
        let mut tags: Vec<Tag> = todos
            .iter()
            .map(|todo| Tag::id("todo", todo.id.as_str()))
            .collect();
        tags.push(Tag::list("todo"));
        tags
    }
}

pub struct GetTodo;
impl Endpoint for GetTodo {
    type Args = String;
    type Response = Todo;

    const NAME: &'static str = "GetTodo";
    const OPERATION_TYPE: OperationType = OperationType::Query;

    fn request(id: &String) -> Result<RequestSpec, QueryError> {
        Ok(RequestSpec::get(format!("/todos/{}", id)))
    }

    fn provides_tags(id: &String, _todo: &Todo) -> Vec<Tag> {
        vec![Tag::id("todo", id.as_str())]
    }
}

pub struct PostTodo;
impl Endpoint for PostTodo {
    type Args = Todo;
    type Response = Todo;

    const NAME: &'static str = "PostTodo";
    const OPERATION_TYPE: OperationType = OperationType::Mutation;

    fn request(todo: &Todo) -> Result<RequestSpec, QueryError> {
        Ok(RequestSpec::new(Method::Post, "/todos").with_body(serde_json::to_value(todo)?))
    }

    fn invalidates_tags(_todo: &Todo, _response: &Todo) -> Vec<Tag> {
        vec![Tag::list("todo")]
    }
}

pub struct DeleteTodo;
impl Endpoint for DeleteTodo {
    type Args = String;
    type Response = Value;

    const NAME: &'static str = "DeleteTodo";
    const OPERATION_TYPE: OperationType = OperationType::Mutation;

    fn request(id: &String) -> Result<RequestSpec, QueryError> {
        Ok(RequestSpec::new(Method::Delete, format!("/todos/{}", id)))
    }

    fn invalidates_tags(id: &String, _response: &Value) -> Vec<Tag> {
        vec![Tag::list("todo"), Tag::id("todo", id.as_str())]
    }
}

#[derive(Clone, Debug, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// A terminating exchange that answers from an in-memory todo list.
///
/// The answer is computed as soon as a request arrives and delivered after `delay`.
#[derive(Clone, Default)]
pub struct FakeServer {
    pub todos: Arc<Mutex<Vec<Todo>>>,
    pub requests: Counter,
    pub delay: Duration
}

impl FakeServer {
    pub fn with_todos(todos: Vec<Todo>) -> Self {
        FakeServer {
            todos: Arc::new(Mutex::new(todos)),
            requests: Counter::default(),
            delay: Duration::from_millis(10)
        }
    }

    fn respond(&self, request: &RequestSpec) -> Result<Value, QueryError> {
        let not_found = || QueryError::Status {
            status: 404,
            message: Some("Todo not found".to_string())
        };
        let mut todos = self.todos.lock();
        let id = request.path.strip_prefix("/todos/");
        match (request.method, id) {
            (Method::Get, None) => Ok(json!(*todos)),
            (Method::Get, Some(id)) => todos
                .iter()
                .find(|todo| todo.id == id)
                .map(|todo| json!(todo))
                .ok_or_else(not_found),
            (Method::Post, None) => {
                let body = request.body.clone().unwrap_or(Value::Null);
                let todo: Todo = serde_json::from_value(body)?;
                todos.push(todo.clone());
                Ok(json!(todo))
            }
            (Method::Delete, Some(id)) => {
                let before = todos.len();
                todos.retain(|todo| todo.id != id);
                if todos.len() == before {
                    Err(not_found())
                } else {
                    Ok(json!({ "success": true }))
                }
            }
            _ => Err(QueryError::Status {
                status: 405,
                message: None
            })
        }
    }
}

impl<TNext: Exchange> ExchangeFactory<TNext> for FakeServer {
    type Output = FakeServer;

    fn build(self, _next: TNext) -> Self::Output {
        self
    }
}

#[async_trait]
impl Exchange for FakeServer {
    async fn run<E: Endpoint, C: Client>(
        &self,
        operation: Operation<E::Args>,
        _client: C
    ) -> ExchangeResult<E::Response> {
        self.requests.inc();
        let value = self.respond(&operation.request);
        sleep(self.delay).await;
        let value = value?;
        let data: E::Response = serde_json::from_value(value)?;
        Ok(OperationResult {
            key: operation.key,
            meta: operation.meta,
            response: Response {
                debug_info: Some(DebugInfo {
                    source: ResultSource::Network,
                    did_dedup: false
                }),
                data
            }
        })
    }
}

#[derive(Clone)]
pub struct NoopClient;
impl Client for NoopClient {
    fn rerun_query(&self, _query_key: &OperationKey) {}
}

/// Records every rerun request instead of acting on it.
#[derive(Clone, Default)]
pub struct RecordingClient {
    pub reruns: Arc<Mutex<Vec<OperationKey>>>
}
impl Client for RecordingClient {
    fn rerun_query(&self, query_key: &OperationKey) {
        self.reruns.lock().push(query_key.clone());
    }
}

pub fn make_operation<E: Endpoint>(args: E::Args, policy: RequestPolicy) -> Operation<E::Args> {
    Operation {
        key: operation_key(E::NAME, &args).unwrap(),
        meta: OperationMeta {
            endpoint: E::NAME,
            operation_type: E::OPERATION_TYPE
        },
        request: E::request(&args).unwrap(),
        args,
        options: OperationOptions {
            url: "http://0.0.0.0".parse().unwrap(),
            extra_headers: None,
            request_policy: policy
        }
    }
}
