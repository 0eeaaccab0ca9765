//! This module contains the default exchanges.
//! Note that `FetchExchange` requires the `default-exchanges` feature.

use crate::{
    exchange::Client,
    types::{Exchange, Operation},
    Endpoint, ExchangeResult, QueryError
};

mod cache;
mod dedup;
#[cfg(feature = "default-exchanges")]
mod fetch;

pub use cache::{CacheExchange, CacheExchangeImpl};
pub use dedup::{DedupExchange, DedupExchangeImpl};
#[cfg(feature = "default-exchanges")]
pub use fetch::FetchExchange;

/// The terminating exchange.
/// This will always be the last exchange in the chain and will simply return an error if called.
pub struct TerminatorExchange;

#[async_trait]
impl Exchange for TerminatorExchange {
    async fn run<E: Endpoint, C: Client>(
        &self,
        _operation: Operation<E::Args>,
        _client: C
    ) -> ExchangeResult<E::Response> {
        Err(QueryError::UnexpectedEndOfChain)
    }
}
