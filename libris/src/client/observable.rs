use crate::{
    client::ClientImpl,
    types::{Observable, OperationKey},
    Endpoint, Exchange, QueryError, QueryOptions, QueryState, RequestPolicy
};
use futures::{
    channel::mpsc::{unbounded, UnboundedSender},
    future::{BoxFuture, FutureExt}
};
use stable_vec::StableVec;
use std::{
    any::Any,
    future::Future,
    sync::{Arc, Weak}
};

pub type QueryObservable<E, M> = Observable<QueryState<<E as Endpoint>::Response>, M>;

type Rerun = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

pub(crate) struct Subscription {
    pub(crate) listeners: StableVec<UnboundedSender<Arc<dyn Any + Send + Sync>>>,
    pub(crate) options: QueryOptions,
    // This captures the endpoint and arguments without requiring generics, so we can store it in a hashmap
    pub(crate) rerun: Rerun
}

fn boxed<R: Send + Sync + 'static>(state: QueryState<R>) -> Arc<dyn Any + Send + Sync> {
    Arc::new(state)
}

fn network_only(options: &QueryOptions) -> QueryOptions {
    QueryOptions {
        request_policy: Some(RequestPolicy::NetworkOnly),
        ..options.clone()
    }
}

/// Builds the rerun closure for a subscription.
///
/// A rerun always goes to the network. Subscribers see `Loading` with the previous data first,
/// then the new result.
fn make_rerun<E: Endpoint, M: Exchange>(
    client: Weak<ClientImpl<M>>,
    args: E::Args,
    options: QueryOptions
) -> Rerun {
    let options = network_only(&options);
    Arc::new(move || {
        let client = client.clone();
        let args = args.clone();
        let options = options.clone();

        async move {
            // The client is gone, so is everyone who could listen
            let client = match client.upgrade() {
                Some(client) => client,
                None => return
            };
            let operation = match client.create_request_operation::<E>(args, &options) {
                Ok(operation) => operation,
                Err(e) => {
                    tracing::warn!(endpoint = E::NAME, error = %e, "failed to rebuild operation");
                    return;
                }
            };
            let key = operation.key.clone();
            let previous = client.cache.peek::<E::Response>(&key);

            client.broadcast(&key, boxed(QueryState::loading(previous.clone())));
            let res = client.execute_request_operation::<E>(operation).await;
            client.broadcast(&key, boxed(QueryState::from_result(res, previous)));
        }
        .boxed()
    })
}

pub(crate) async fn subscribe_with_options<E: Endpoint, M: Exchange>(
    client: &Arc<ClientImpl<M>>,
    args: E::Args,
    options: QueryOptions
) -> Result<QueryObservable<E, M>, QueryError> {
    let initial_options = if options.refetch_on_mount {
        network_only(&options)
    } else {
        options.clone()
    };
    let operation = client.create_request_operation::<E>(args.clone(), &initial_options)?;
    let key = operation.key.clone();
    let (sender, receiver) = unbounded();

    let observable = {
        let mut subscriptions = client.active_subscriptions.lock();
        let index = if let Some(subscription) = subscriptions.get_mut(&key) {
            subscription.listeners.push(sender.clone())
        } else {
            let mut listeners = StableVec::new();
            let index = listeners.push(sender.clone());
            let subscription = Subscription {
                listeners,
                rerun: make_rerun::<E, M>(Arc::downgrade(client), args, options.clone()),
                options
            };
            subscriptions.insert(key.clone(), subscription);
            index
        };
        Observable::new(key.clone(), receiver, client.clone(), index)
    };

    tracing::debug!(endpoint = E::NAME, %key, "subscribed");

    let previous = client.cache.peek::<E::Response>(&key);
    // The receiver lives in `observable`, so these sends can't fail
    let _ = sender.unbounded_send(boxed(QueryState::loading(previous.clone())));
    let res = client.execute_request_operation::<E>(operation).await;
    let _ = sender.unbounded_send(boxed(QueryState::from_result(res, previous)));
    Ok(observable)
}

pub(crate) fn rerun_query<M: Exchange>(client: &Arc<ClientImpl<M>>, key: &OperationKey) {
    let rerun = {
        let subscriptions = client.active_subscriptions.lock();
        subscriptions.get(key).map(|sub| sub.rerun.clone())
    };

    if let Some(rerun) = rerun {
        tracing::debug!(%key, "rerunning subscribed query");
        spawn(rerun());
    }
}

fn spawn(fut: impl Future<Output = ()> + Send + 'static) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(fut);
        }
        Err(_) => tracing::warn!("no tokio runtime available, skipping rerun")
    }
}
