use crate::{
    client::{Client, ClientImpl},
    default_exchanges::{CacheExchange, CacheExchangeImpl, TerminatorExchange},
    Exchange, ExchangeFactory, HeaderPair, QueryCache, QueryError, RequestPolicy
};
#[cfg(feature = "default-exchanges")]
use crate::default_exchanges::{DedupExchange, FetchExchange};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};
use url::Url;

pub struct ClientBuilder<M: Exchange = TerminatorExchange> {
    exchange: M,
    url: Url,
    extra_headers: Option<Arc<dyn Fn() -> Vec<HeaderPair> + Send + Sync>>,
    request_policy: RequestPolicy,
    cache: Arc<QueryCache>
}

impl ClientBuilder<TerminatorExchange> {
    /// Start building a client for the API at `url`.
    pub fn new<U: AsRef<str>>(url: U) -> Result<Self, QueryError> {
        let url = url.as_ref().parse()?;
        Ok(ClientBuilder {
            exchange: TerminatorExchange,
            url,
            extra_headers: None,
            request_policy: RequestPolicy::CacheFirst,
            cache: Arc::new(QueryCache::default())
        })
    }

    /// Use an existing cache instead of creating a fresh one, e.g. to pick an eviction policy.
    ///
    /// Only available before any exchange is added, so every exchange sees the same cache.
    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = cache;
        self
    }
}

impl<M: Exchange> ClientBuilder<M> {
    /// Add the default exchanges to the chain. Keep in mind that exchanges are executed bottom to top, so the first one added will be the last one executed.
    #[cfg(feature = "default-exchanges")]
    pub fn with_default_exchanges(self) -> ClientBuilder<impl Exchange> {
        self.with_exchange(FetchExchange::new())
            .with_cache_exchange()
            .with_exchange(DedupExchange)
    }

    /// Add a [`CacheExchange`](../default_exchanges/struct.CacheExchange.html) backed by this
    /// client's cache.
    pub fn with_cache_exchange(self) -> ClientBuilder<CacheExchangeImpl<M>> {
        let cache = CacheExchange::new(self.cache.clone());
        self.with_exchange(cache)
    }

    /// Add a middleware to the chain. Keep in mind that exchanges are executed bottom to top, so the first one added will be the last one executed.
    pub fn with_exchange<TResult, F>(self, exchange_factory: F) -> ClientBuilder<TResult>
    where
        TResult: Exchange,
        F: ExchangeFactory<M, Output = TResult>
    {
        let exchange = exchange_factory.build(self.exchange);
        ClientBuilder {
            exchange,
            url: self.url,
            extra_headers: self.extra_headers,
            request_policy: self.request_policy,
            cache: self.cache
        }
    }

    pub fn with_extra_headers<F: Fn() -> Vec<HeaderPair> + Send + Sync + 'static>(
        mut self,
        header_fn: F
    ) -> Self {
        self.extra_headers = Some(Arc::new(header_fn));
        self
    }

    pub fn with_request_policy(mut self, request_policy: RequestPolicy) -> Self {
        self.request_policy = request_policy;
        self
    }

    pub fn build(self) -> Client<M> {
        let client = ClientImpl {
            url: self.url,
            exchange: self.exchange,
            extra_headers: self.extra_headers,
            request_policy: self.request_policy,
            cache: self.cache,
            active_subscriptions: Arc::new(Mutex::new(HashMap::new()))
        };

        Client(Arc::new(client))
    }
}
