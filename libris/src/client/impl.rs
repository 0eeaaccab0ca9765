use crate::{
    client::observable::{self, QueryObservable, Subscription},
    exchange::{Client, OperationKey, OperationMeta, OperationOptions},
    types::Operation,
    utils::operation_key,
    Endpoint, Exchange, HeaderPair, QueryCache, QueryError, QueryOptions, RefetchTrigger,
    RequestPolicy, Response, Tag
};
use parking_lot::Mutex;
use std::{any::Any, collections::HashMap, sync::Arc};
use url::Url;

pub struct ClientImpl<M: Exchange> {
    pub(crate) url: Url,
    pub(crate) exchange: M,
    pub(crate) extra_headers: Option<Arc<dyn Fn() -> Vec<HeaderPair> + Send + Sync>>,
    pub(crate) request_policy: RequestPolicy,
    pub(crate) cache: Arc<QueryCache>,
    pub(crate) active_subscriptions: Arc<Mutex<HashMap<OperationKey, Subscription>>>
}

impl<M: Exchange> ClientImpl<M> {
    pub(crate) fn clear_observable(&self, key: &OperationKey, index: usize) {
        let mut subscriptions = self.active_subscriptions.lock();
        if let Some(subscription) = subscriptions.get_mut(key) {
            subscription.listeners.remove(index);
            if subscription.listeners.is_empty() {
                subscriptions.remove(key);
                drop(subscriptions);
                tracing::debug!(%key, "last subscriber left");
                self.cache.release(key);
            }
        }
    }

    /// Send a value to every listener of a subscription. Listeners whose receiver is gone are skipped.
    pub(crate) fn broadcast(&self, key: &OperationKey, value: Arc<dyn Any + Send + Sync>) {
        let subscriptions = self.active_subscriptions.lock();
        if let Some(subscription) = subscriptions.get(key) {
            for listener in subscription.listeners.values() {
                if listener.unbounded_send(value.clone()).is_err() {
                    tracing::warn!(%key, "dropping update for closed listener");
                }
            }
        }
    }

    pub(crate) async fn execute_request_operation<E: Endpoint>(
        self: &Arc<Self>,
        operation: Operation<E::Args>
    ) -> Result<Response<E::Response>, QueryError> {
        self.exchange
            .run::<E, _>(operation, self.clone())
            .await
            .map(|operation_result| operation_result.response)
    }

    pub async fn query<E: Endpoint>(
        self: &Arc<Self>,
        args: E::Args
    ) -> Result<Response<E::Response>, QueryError> {
        self.query_with_options::<E>(args, QueryOptions::default())
            .await
    }

    pub async fn query_with_options<E: Endpoint>(
        self: &Arc<Self>,
        args: E::Args,
        options: QueryOptions
    ) -> Result<Response<E::Response>, QueryError> {
        let operation = self.create_request_operation::<E>(args, &options)?;
        self.execute_request_operation::<E>(operation).await
    }

    pub async fn mutate<E: Endpoint>(
        self: &Arc<Self>,
        args: E::Args
    ) -> Result<Response<E::Response>, QueryError> {
        let operation = self.create_request_operation::<E>(args, &QueryOptions::default())?;
        self.execute_request_operation::<E>(operation).await
    }

    pub fn rerun_query(self: &Arc<Self>, key: &OperationKey) {
        observable::rerun_query(self, key);
    }

    pub async fn subscribe<E: Endpoint>(
        self: &Arc<Self>,
        args: E::Args
    ) -> Result<QueryObservable<E, M>, QueryError> {
        self.subscribe_with_options::<E>(args, QueryOptions::default())
            .await
    }

    pub async fn subscribe_with_options<E: Endpoint>(
        self: &Arc<Self>,
        args: E::Args,
        options: QueryOptions
    ) -> Result<QueryObservable<E, M>, QueryError> {
        observable::subscribe_with_options::<E, M>(self, args, options).await
    }

    /// Rerun every subscription that opted into `trigger`.
    pub fn refetch(self: &Arc<Self>, trigger: RefetchTrigger) {
        let keys: Vec<OperationKey> = {
            let subscriptions = self.active_subscriptions.lock();
            subscriptions
                .iter()
                .filter(|(_, subscription)| subscription.options.refetches_on(trigger))
                .map(|(key, _)| key.clone())
                .collect()
        };
        tracing::debug!(?trigger, subscriptions = keys.len(), "refetching");
        for key in &keys {
            self.rerun_query(key);
        }
    }

    /// Mark everything providing one of `tags` as stale and rerun affected subscriptions.
    pub fn invalidate(self: &Arc<Self>, tags: &[Tag]) {
        for key in self.cache.invalidate(tags) {
            self.rerun_query(&key);
        }
    }

    pub(crate) fn create_request_operation<E: Endpoint>(
        &self,
        args: E::Args,
        options: &QueryOptions
    ) -> Result<Operation<E::Args>, QueryError> {
        let extra_headers = if let Some(ref extra_headers) = options.extra_headers {
            Some(extra_headers.clone())
        } else if let Some(ref extra_headers) = self.extra_headers {
            Some(extra_headers.clone())
        } else {
            None
        };

        Ok(Operation {
            key: operation_key(E::NAME, &args)?,
            meta: OperationMeta {
                endpoint: E::NAME,
                operation_type: E::OPERATION_TYPE
            },
            request: E::request(&args)?,
            args,
            options: OperationOptions {
                url: options.url.clone().unwrap_or_else(|| self.url.clone()),
                extra_headers,
                request_policy: options.request_policy.unwrap_or(self.request_policy)
            }
        })
    }
}

impl<M: Exchange> Client for Arc<ClientImpl<M>> {
    fn rerun_query(&self, query_key: &OperationKey) {
        ClientImpl::rerun_query(self, query_key)
    }
}
