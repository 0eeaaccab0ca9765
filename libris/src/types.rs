use crate::{
    client::ClientImpl,
    utils::{hash_str, progressive_hash},
    Endpoint, QueryError
};
use futures::{channel::mpsc::UnboundedReceiver, task::Context, Stream};
use serde::de::DeserializeOwned;
use std::{any::Any, fmt, marker::PhantomData, pin::Pin, sync::Arc, task::Poll};
use url::{form_urlencoded, Url};

pub type ExchangeResult<R> = Result<OperationResult<R>, QueryError>;

#[async_trait]
pub trait Exchange: Send + Sync + 'static {
    async fn run<E: Endpoint, C: Client>(
        &self,
        operation: Operation<E::Args>,
        client: C
    ) -> ExchangeResult<E::Response>;
}

pub trait ExchangeFactory<TNext: Exchange> {
    type Output: Exchange;

    fn build(self, next: TNext) -> Self::Output;
}

/// The part of the client exchanges are allowed to call back into.
pub trait Client: Clone + Send + Sync + 'static {
    /// Rerun the subscribed query with this key from the network, if anyone is subscribed to it.
    fn rerun_query(&self, query_key: &OperationKey);
}

/// Identifies one endpoint called with one set of arguments.
///
/// The arguments are kept in their encoded form, so two keys are only equal if the endpoint
/// name and every argument byte match.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationKey {
    endpoint: &'static str,
    args: Arc<[u8]>
}

impl OperationKey {
    pub(crate) fn new(endpoint: &'static str, args: Vec<u8>) -> Self {
        OperationKey {
            endpoint,
            args: args.into()
        }
    }

    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    pub fn args(&self) -> &[u8] {
        &self.args
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hash = progressive_hash(hash_str(self.endpoint), &self.args);
        write!(f, "{}#{:016x}", self.endpoint, hash)
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum OperationType {
    Query,
    Mutation
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPolicy {
    CacheFirst,
    CacheOnly,
    NetworkOnly,
    CacheAndNetwork
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE"
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPair(pub String, pub String);

/// Which entity a tag points at: the collection as a whole or a single member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagId {
    List,
    Id(String)
}

/// An abstract label for a class of cached data.
///
/// Queries declare the tags their results provide, mutations declare the tags they invalidate.
/// Renders as `kind:LIST` or `kind:id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub kind: &'static str,
    pub id: TagId
}

impl Tag {
    pub fn list(kind: &'static str) -> Self {
        Tag {
            kind,
            id: TagId::List
        }
    }

    pub fn id<I: Into<String>>(kind: &'static str, id: I) -> Self {
        Tag {
            kind,
            id: TagId::Id(id.into())
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            TagId::List => write!(f, "{}:LIST", self.kind),
            TagId::Id(id) => write!(f, "{}:{}", self.kind, id)
        }
    }
}

/// Everything the fetch exchange needs to put a request on the wire, relative to the base url.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<serde_json::Value>
}

impl RequestSpec {
    pub fn new<P: Into<String>>(method: Method, path: P) -> Self {
        RequestSpec {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None
        }
    }

    pub fn get<P: Into<String>>(path: P) -> Self {
        Self::new(Method::Get, path)
    }

    /// Append a query parameter if it has a value.
    pub fn with_query<V: ToString>(mut self, key: &'static str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.query.push((key, value.to_string()));
        }
        self
    }

    /// Append `segment` to the path, percent-encoded so it stays one segment whatever it
    /// contains. `.` and `..` can't be kept that way and are rejected.
    pub fn with_segment(mut self, segment: &str) -> Result<Self, QueryError> {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(QueryError::Encode(format!(
                "`{}` can't be used as a path segment",
                segment
            )));
        }
        if !self.path.ends_with('/') {
            self.path.push('/');
        }
        // Form encoding turns spaces into `+`, which a path would keep literally
        self.path.extend(
            form_urlencoded::byte_serialize(segment.as_bytes())
                .map(|part| if part == "+" { "%20" } else { part })
        );
        Ok(self)
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OperationMeta {
    pub endpoint: &'static str,
    pub operation_type: OperationType
}

#[derive(Clone)]
pub struct OperationOptions {
    pub url: Url,
    pub extra_headers: Option<Arc<dyn Fn() -> Vec<HeaderPair> + Send + Sync>>,
    pub request_policy: RequestPolicy
}

#[derive(Clone)]
pub struct Operation<A: Clone + Send + Sync> {
    pub key: OperationKey,
    pub meta: OperationMeta,
    pub args: A,
    pub request: RequestSpec,
    pub options: OperationOptions
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultSource {
    Cache,
    Network
}

#[derive(Clone, Debug, PartialEq)]
pub struct DebugInfo {
    pub source: ResultSource,
    pub did_dedup: bool
}

/// A decoded response together with where it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct Response<R> {
    pub debug_info: Option<DebugInfo>,
    pub data: R
}

#[derive(Clone, Debug)]
pub struct OperationResult<R: DeserializeOwned + Send + Sync + Clone> {
    pub key: OperationKey,
    pub meta: OperationMeta,
    pub response: Response<R>
}

/// Events that make opted-in subscriptions refetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefetchTrigger {
    /// The network came back after being unavailable.
    Reconnect,
    /// The application regained focus.
    Focus
}

#[derive(Default, Clone)]
pub struct QueryOptions {
    pub url: Option<Url>,
    pub extra_headers: Option<Arc<dyn Fn() -> Vec<HeaderPair> + Send + Sync>>,
    pub request_policy: Option<RequestPolicy>,
    /// Rerun a subscription when [`RefetchTrigger::Reconnect`] fires.
    pub refetch_on_reconnect: bool,
    /// Rerun a subscription when [`RefetchTrigger::Focus`] fires.
    pub refetch_on_focus: bool,
    /// Go to the network for the first result of a subscription even if the cache has one.
    pub refetch_on_mount: bool
}

impl QueryOptions {
    pub(crate) fn refetches_on(&self, trigger: RefetchTrigger) -> bool {
        match trigger {
            RefetchTrigger::Reconnect => self.refetch_on_reconnect,
            RefetchTrigger::Focus => self.refetch_on_focus
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryStatus {
    Uninitialized,
    Loading,
    Ready,
    Errored
}

/// A snapshot of a subscribed query, as seen by its subscribers.
///
/// While a rerun is loading, `data` still holds the previous result.
#[derive(Clone, Debug)]
pub struct QueryState<R> {
    pub data: Option<R>,
    pub status: QueryStatus,
    pub error: Option<QueryError>,
    pub source: Option<ResultSource>
}

impl<R> QueryState<R> {
    pub fn loading(previous: Option<R>) -> Self {
        QueryState {
            data: previous,
            status: QueryStatus::Loading,
            error: None,
            source: None
        }
    }

    pub fn from_result(result: Result<Response<R>, QueryError>, previous: Option<R>) -> Self {
        match result {
            Ok(response) => QueryState {
                data: Some(response.data),
                status: QueryStatus::Ready,
                error: None,
                source: response.debug_info.map(|info| info.source)
            },
            Err(e) => QueryState {
                data: previous,
                status: QueryStatus::Errored,
                error: Some(e),
                source: None
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Errored
    }

    pub fn is_ready(&self) -> bool {
        self.status == QueryStatus::Ready
    }

    pub fn error(&self) -> Option<&QueryError> {
        self.error.as_ref()
    }
}

/// A stream of states for one subscribed query. Dropping it unsubscribes.
pub struct Observable<T, M: Exchange> {
    inner: UnboundedReceiver<Arc<dyn Any + Send + Sync>>,
    client: Arc<ClientImpl<M>>,
    key: OperationKey,
    index: usize,
    t: PhantomData<fn() -> T>
}

impl<T: Clone, M: Exchange> Observable<T, M> {
    pub(crate) fn new(
        key: OperationKey,
        inner: UnboundedReceiver<Arc<dyn Any + Send + Sync>>,
        client: Arc<ClientImpl<M>>,
        index: usize
    ) -> Self {
        Observable {
            inner,
            client,
            key,
            index,
            t: PhantomData
        }
    }

    /// The cache key of the subscribed operation.
    pub fn key(&self) -> &OperationKey {
        &self.key
    }

    /// Rerun the query from the network. Every subscriber of the same operation sees the result.
    pub fn refetch(&self) {
        self.client.rerun_query(&self.key);
    }
}

impl<T, M: Exchange> Stream for Observable<T, M>
where
    T: 'static + Clone
{
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let inner = &mut self.get_mut().inner;
        loop {
            let poll = Pin::new(&mut *inner).poll_next(cx);
            match poll {
                Poll::Ready(Some(boxed)) => match boxed.downcast_ref::<T>() {
                    Some(cast) => return Poll::Ready(Some(cast.clone())),
                    None => tracing::warn!("dropping observable value of unexpected type")
                },
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending
            }
        }
    }
}

impl<T, M: Exchange> Drop for Observable<T, M> {
    fn drop(&mut self) {
        self.client.clear_observable(&self.key, self.index)
    }
}
