use crate::{
    exchange::Client,
    types::{ExchangeResult, Operation, OperationKey, OperationResult},
    DebugInfo, Endpoint, Exchange, ExchangeFactory, OperationType, QueryCache, QueryError,
    RequestPolicy, Response, ResultSource
};
use std::sync::Arc;

/// The default cache exchange.
///
/// Query results are stored in a [`QueryCache`](../cache/struct.QueryCache.html) together with
/// the tags they provide. Successful mutations mark every entry providing one of their
/// invalidated tags as stale and ask the client to rerun the affected subscriptions.
///
/// The cache is always the client's own. Add this exchange through
/// [`ClientBuilder::with_cache_exchange`](../client/struct.ClientBuilder.html#method.with_cache_exchange)
/// or `with_default_exchanges`.
pub struct CacheExchange {
    cache: Arc<QueryCache>
}

impl CacheExchange {
    pub(crate) fn new(cache: Arc<QueryCache>) -> Self {
        Self { cache }
    }
}

impl<TNext: Exchange> ExchangeFactory<TNext> for CacheExchange {
    type Output = CacheExchangeImpl<TNext>;

    fn build(self, next: TNext) -> Self::Output {
        CacheExchangeImpl {
            cache: self.cache,
            next
        }
    }
}

/// Abandons the load of `key` if the query is dropped before its result is written.
struct LoadGuard<'a> {
    cache: &'a QueryCache,
    key: &'a OperationKey,
    settled: bool
}

impl<'a> Drop for LoadGuard<'a> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!(key = %self.key, "query dropped while loading");
            self.cache.abandon(self.key);
        }
    }
}

pub struct CacheExchangeImpl<TNext: Exchange> {
    cache: Arc<QueryCache>,
    next: TNext
}

impl<TNext: Exchange> CacheExchangeImpl<TNext> {
    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    fn cached_result<E: Endpoint>(
        &self,
        operation: &Operation<E::Args>
    ) -> Option<OperationResult<E::Response>> {
        let data = self.cache.get::<E::Response>(&operation.key)?;
        Some(OperationResult {
            key: operation.key.clone(),
            meta: operation.meta.clone(),
            response: Response {
                debug_info: Some(DebugInfo {
                    source: ResultSource::Cache,
                    did_dedup: false
                }),
                data
            }
        })
    }

    async fn run_query<E: Endpoint, C: Client>(
        &self,
        operation: Operation<E::Args>,
        client: C
    ) -> ExchangeResult<E::Response> {
        let key = operation.key.clone();
        let request_policy = operation.options.request_policy;

        if request_policy != RequestPolicy::NetworkOnly {
            if let Some(cached) = self.cached_result::<E>(&operation) {
                tracing::debug!(endpoint = E::NAME, %key, "cache hit");
                if request_policy == RequestPolicy::CacheAndNetwork {
                    client.rerun_query(&key);
                }
                return Ok(cached);
            }
            if request_policy == RequestPolicy::CacheOnly {
                return Err(QueryError::CacheMiss(E::NAME));
            }
        }

        tracing::debug!(endpoint = E::NAME, %key, ?request_policy, "cache miss");
        let args = operation.args.clone();
        self.cache.begin_loading(&key);
        let mut guard = LoadGuard {
            cache: &self.cache,
            key: &key,
            settled: false
        };
        let res = self.next.run::<E, _>(operation, client.clone()).await;
        guard.settled = true;
        let (res, invalidated) = match res {
            Ok(res) => {
                let tags = E::provides_tags(&args, &res.response.data);
                let invalidated = self.cache.write(&key, res.response.data.clone(), tags);
                (Ok(res), invalidated)
            }
            Err(e) => (Err(e), self.cache.fail(&key))
        };
        // A mutation landed while this was loading, so the result may predate it
        if invalidated {
            client.rerun_query(&key);
        }
        res
    }

    async fn run_mutation<E: Endpoint, C: Client>(
        &self,
        operation: Operation<E::Args>,
        client: C
    ) -> ExchangeResult<E::Response> {
        let args = operation.args.clone();
        let res = self.next.run::<E, _>(operation, client.clone()).await?;

        let tags = E::invalidates_tags(&args, &res.response.data);
        for key in self.cache.invalidate(&tags) {
            client.rerun_query(&key);
        }
        Ok(res)
    }
}

#[async_trait]
impl<TNext: Exchange> Exchange for CacheExchangeImpl<TNext> {
    async fn run<E: Endpoint, C: Client>(
        &self,
        operation: Operation<E::Args>,
        client: C
    ) -> ExchangeResult<E::Response> {
        match operation.meta.operation_type {
            OperationType::Query => self.run_query::<E, C>(operation, client).await,
            OperationType::Mutation => self.run_mutation::<E, C>(operation, client).await
        }
    }
}
