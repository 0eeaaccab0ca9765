use std::sync::Arc;

mod builder;
mod r#impl;
mod observable;

use crate::{
    default_exchanges::TerminatorExchange, Endpoint, Exchange, QueryCache, QueryError,
    QueryOptions, RefetchTrigger, Response, Tag
};
pub use builder::ClientBuilder;
pub use observable::QueryObservable;
pub use r#impl::ClientImpl;

#[repr(transparent)]
pub struct Client<M: Exchange = TerminatorExchange>(pub Arc<ClientImpl<M>>);

impl<M: Exchange> Clone for Client<M> {
    fn clone(&self) -> Self {
        Client(self.0.clone())
    }
}

impl Client {
    /// Fails if `url` isn't a valid absolute url.
    pub fn builder<U: AsRef<str>>(url: U) -> Result<ClientBuilder, QueryError> {
        ClientBuilder::new(url)
    }
}

impl<M: Exchange> Client<M> {
    pub async fn query<E: Endpoint>(
        &self,
        args: E::Args
    ) -> Result<Response<E::Response>, QueryError> {
        self.0.query::<E>(args).await
    }

    pub async fn query_with_options<E: Endpoint>(
        &self,
        args: E::Args,
        options: QueryOptions
    ) -> Result<Response<E::Response>, QueryError> {
        self.0.query_with_options::<E>(args, options).await
    }

    /// Run a mutation. On success, cached queries providing any of the tags it invalidates
    /// are marked stale and their subscriptions rerun.
    pub async fn mutate<E: Endpoint>(
        &self,
        args: E::Args
    ) -> Result<Response<E::Response>, QueryError> {
        self.0.mutate::<E>(args).await
    }

    /// Subscribe to a query. The stream starts with a `Loading` state followed by the result,
    /// and yields `Loading` and the new result again every time the query reruns.
    pub async fn subscribe<E: Endpoint>(
        &self,
        args: E::Args
    ) -> Result<QueryObservable<E, M>, QueryError> {
        self.0.subscribe::<E>(args).await
    }

    pub async fn subscribe_with_options<E: Endpoint>(
        &self,
        args: E::Args,
        options: QueryOptions
    ) -> Result<QueryObservable<E, M>, QueryError> {
        self.0.subscribe_with_options::<E>(args, options).await
    }

    /// Signal an environment event, rerunning the subscriptions that opted into it.
    pub fn refetch(&self, trigger: RefetchTrigger) {
        self.0.refetch(trigger)
    }

    pub fn invalidate(&self, tags: &[Tag]) {
        self.0.invalidate(tags)
    }

    /// Drop all cached data. Active subscriptions keep their last state until they rerun.
    pub fn reset(&self) {
        self.0.cache.clear()
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.0.cache
    }
}
