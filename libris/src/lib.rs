//! A REST query client with common built-in features
//! as well as the ability to extend its functionality through exchanges
//!
//! # Getting Started
//!
//! Describe each call your application makes as an [`Endpoint`](./trait.Endpoint.html):
//! a zero-sized type naming its arguments, its response, the request it sends and
//! the cache tags it provides or invalidates.
//!
//! ```
//! use libris::{Endpoint, OperationType, QueryError, RequestSpec, Tag};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! struct Todo {
//!     id: String,
//!     title: String
//! }
//!
//! struct GetTodo;
//!
//! impl Endpoint for GetTodo {
//!     type Args = String;
//!     type Response = Todo;
//!
//!     const NAME: &'static str = "GetTodo";
//!     const OPERATION_TYPE: OperationType = OperationType::Query;
//!
//!     fn request(id: &String) -> Result<RequestSpec, QueryError> {
//!         Ok(RequestSpec::get(format!("/todos/{}", id)))
//!     }
//!
//!     fn provides_tags(id: &String, _todo: &Todo) -> Vec<Tag> {
//!         vec![Tag::id("todo", id.as_str())]
//!     }
//! }
//! ```
//!
//! Afterwards, you can build a client and run it:
//!
//! ```no_run
//! # use libris::{Endpoint, OperationType, QueryError, RequestSpec};
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Clone, Debug, Serialize, Deserialize)]
//! # struct Todo { id: String }
//! # struct GetTodo;
//! # impl Endpoint for GetTodo {
//! #     type Args = String;
//! #     type Response = Todo;
//! #     const NAME: &'static str = "GetTodo";
//! #     const OPERATION_TYPE: OperationType = OperationType::Query;
//! #     fn request(id: &String) -> Result<RequestSpec, QueryError> {
//! #         Ok(RequestSpec::get(format!("/todos/{}", id)))
//! #     }
//! # }
//! # tokio_test::block_on(async {
//! use libris::Client;
//!
//! let client = Client::builder("http://localhost:5000")
//!     .unwrap()
//!     .with_default_exchanges()
//!     .build();
//!
//! let result = client.query::<GetTodo>("1".to_string()).await.unwrap();
//! println!("{:?}", result.data);
//! # });
//! ```
//!
//! # Exchanges
//!
//! Exchanges are like a bi-directional middleware.
//! They act on both the incoming and outgoing operations,
//! passing them on if they can't return a result themselves.
//!
//! There are three default exchanges, called in this order:
//!
//! ## DedupExchange
//!
//! The deduplication exchange (`DedupExchange`) filters out unnecessary queries
//! by combining multiple identical queries into one. It does so by keeping track
//! of in-flight queries and, instead of firing off another identical query,
//! waiting for their results instead. Mutations are never combined.
//!
//! ## CacheExchange
//!
//! The cache exchange stores query results by operation key and remembers which
//! tags each result provides. When a mutation succeeds, every entry providing one
//! of the tags the mutation invalidates is marked stale, and subscribed queries
//! are rerun. There's no expiry; invalidation is purely event driven.
//!
//! ## FetchExchange
//!
//! The fetch exchange serializes the request, sends it over the network using `reqwest`
//! and deserializes the response. Non-success status codes become
//! [`QueryError::Status`](./enum.QueryError.html) with the server's message, if it sent one.
//! This should be your last exchange in the chain, as it never forwards an operation.
//!
//! # Features
//!
//! * `default-exchanges` **(default)** - Include default exchanges and the related builder method

#[macro_use]
extern crate async_trait;

use serde::{de::DeserializeOwned, Serialize};

pub mod cache;
pub mod client;
pub mod default_exchanges;
mod error;
#[cfg(test)]
mod test_support;
pub(crate) mod types;
pub mod utils;

pub use cache::{CacheOptions, EntryStatus, EvictionPolicy, QueryCache};
pub use client::{Client, ClientBuilder, QueryObservable};
pub use error::{extract_error_message, QueryError};
pub use types::{
    DebugInfo, Exchange, ExchangeFactory, ExchangeResult, HeaderPair, Method, Observable,
    OperationKey, OperationType, QueryOptions, QueryState, QueryStatus, RefetchTrigger,
    RequestPolicy, RequestSpec, Response, ResultSource, Tag, TagId
};

/// Types used by custom exchanges. Regular users probably don't need these.
pub mod exchange {
    pub use crate::types::{
        Client, Exchange, ExchangeFactory, ExchangeResult, Operation, OperationKey,
        OperationMeta, OperationOptions, OperationResult, OperationType
    };
}

/// One call against the remote API.
///
/// This is implemented on a zero-sized marker type per endpoint. The associated items
/// carry everything the exchanges need: how to build the request, what comes back, and
/// which cache tags are involved.
pub trait Endpoint: Send + Sync + 'static {
    /// The arguments the endpoint is called with. They're part of the cache key.
    type Args: Serialize + Send + Sync + Clone + 'static;
    /// The decoded response body.
    type Response: DeserializeOwned + Send + Sync + Clone + 'static;

    /// A unique name, used to seed the cache key.
    const NAME: &'static str;
    const OPERATION_TYPE: OperationType;

    /// Build the request for a set of arguments.
    fn request(args: &Self::Args) -> Result<RequestSpec, QueryError>;

    /// The tags a successful query result provides.
    fn provides_tags(_args: &Self::Args, _response: &Self::Response) -> Vec<Tag> {
        Vec::new()
    }

    /// The tags a successful mutation invalidates.
    fn invalidates_tags(_args: &Self::Args, _response: &Self::Response) -> Vec<Tag> {
        Vec::new()
    }
}
