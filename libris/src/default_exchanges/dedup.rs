use crate::{
    exchange::Client,
    types::{ExchangeResult, Operation, OperationKey, OperationResult},
    Endpoint, Exchange, ExchangeFactory, OperationType, QueryError
};
use futures::channel::{oneshot, oneshot::Sender};
use parking_lot::Mutex;
use std::{any::Any, collections::HashMap, sync::Arc};

type DedupedResult = Result<Box<dyn Any + Send>, QueryError>;
type InFlightCache = Arc<Mutex<HashMap<OperationKey, Vec<Sender<DedupedResult>>>>>;

/// The default deduplication exchange.
///
/// This will keep track of in-flight queries and catch any identical queries before they execute,
/// instead waiting for the result from the in-flight query
pub struct DedupExchange;
pub struct DedupExchangeImpl<TNext: Exchange> {
    next: TNext,
    in_flight_operations: InFlightCache
}

impl<TNext: Exchange> ExchangeFactory<TNext> for DedupExchange {
    type Output = DedupExchangeImpl<TNext>;

    fn build(self, next: TNext) -> Self::Output {
        DedupExchangeImpl {
            next,
            in_flight_operations: InFlightCache::default()
        }
    }
}

fn should_skip<E: Endpoint>(operation: &Operation<E::Args>) -> bool {
    operation.meta.operation_type != OperationType::Query
}

fn make_deduped_result<E: Endpoint>(res: &ExchangeResult<E::Response>) -> DedupedResult {
    match res {
        Ok(ref res) => {
            let mut res = res.clone();
            if let Some(ref mut debug_info) = res.response.debug_info {
                debug_info.did_dedup = true;
            }
            Ok(Box::new(res))
        }
        Err(e) => Err(e.clone())
    }
}

/// Owns the in-flight slot of the leading request.
///
/// If the leading future is dropped before it finishes, the slot is removed and every waiting
/// sender is dropped with it, so waiters see `Cancelled` instead of hanging forever.
struct InFlightGuard<'a> {
    key: OperationKey,
    in_flight: &'a InFlightCache,
    done: bool
}

impl<'a> InFlightGuard<'a> {
    fn complete<E: Endpoint>(mut self, res: &ExchangeResult<E::Response>) {
        self.done = true;
        let to_be_notified = self
            .in_flight
            .lock()
            .remove(&self.key)
            .unwrap_or_default();
        if !to_be_notified.is_empty() {
            tracing::debug!(
                endpoint = E::NAME,
                waiters = to_be_notified.len(),
                "sharing result with deduplicated queries"
            );
        }
        for sender in to_be_notified {
            // The waiter may have been dropped in the meantime, that's fine
            let _ = sender.send(make_deduped_result::<E>(res));
        }
    }
}

impl<'a> Drop for InFlightGuard<'a> {
    fn drop(&mut self) {
        if !self.done {
            self.in_flight.lock().remove(&self.key);
        }
    }
}

#[async_trait]
impl<TNext: Exchange> Exchange for DedupExchangeImpl<TNext> {
    async fn run<E: Endpoint, C: Client>(
        &self,
        operation: Operation<E::Args>,
        client: C
    ) -> ExchangeResult<E::Response> {
        if should_skip::<E>(&operation) {
            return self.next.run::<E, _>(operation, client).await;
        }

        let key = operation.key.clone();
        let rcv = {
            let mut cache = self.in_flight_operations.lock();
            if let Some(listeners) = cache.get_mut(&key) {
                let (sender, receiver) = oneshot::channel();
                listeners.push(sender);
                Some(receiver)
            } else {
                cache.insert(key.clone(), Vec::new());
                None
            }
        };

        if let Some(rcv) = rcv {
            tracing::debug!(endpoint = E::NAME, %key, "joining in-flight query");
            let res = rcv.await.map_err(|_| QueryError::Cancelled)??;
            match res.downcast::<OperationResult<E::Response>>() {
                Ok(res) => Ok(*res),
                // Two endpoints share a name, don't hand out the wrong type
                Err(_) => self.next.run::<E, _>(operation, client).await
            }
        } else {
            let guard = InFlightGuard {
                key,
                in_flight: &self.in_flight_operations,
                done: false
            };
            let res = self.next.run::<E, _>(operation, client).await;
            guard.complete::<E>(&res);
            res
        }
    }
}
