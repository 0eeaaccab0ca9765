use crate::{
    exchange::Client,
    extract_error_message,
    types::{ExchangeResult, Operation, OperationResult},
    DebugInfo, Endpoint, Exchange, ExchangeFactory, HeaderPair, Method, QueryError, RequestSpec,
    Response, ResultSource
};
use serde_json::Value;
use url::Url;

/// The default fetch exchange
///
/// Uses `reqwest`. Requests carry JSON bodies and expect JSON back; a non-success status
/// becomes `QueryError::Status` with whatever message the error body had.
#[derive(Clone, Default)]
pub struct FetchExchange {
    http: reqwest::Client
}

impl FetchExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured `reqwest` client, e.g. one with a timeout or proxy.
    pub fn with_client(http: reqwest::Client) -> Self {
        FetchExchange { http }
    }

    async fn fetch<E: Endpoint>(
        &self,
        url: Url,
        extra_headers: Vec<HeaderPair>,
        request: &RequestSpec
    ) -> Result<E::Response, QueryError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE
        };

        tracing::debug!(endpoint = E::NAME, method = %request.method, %url, "sending request");

        let mut builder = self
            .http
            .request(method, url)
            .header("Accept", "application/json");
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        for HeaderPair(key, value) in extra_headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        tracing::debug!(endpoint = E::NAME, status = status.as_u16(), "received response");

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|body| extract_error_message(&body));
            return Err(QueryError::Status {
                status: status.as_u16(),
                message
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Resolve the request path against the base url and append the query parameters.
pub(crate) fn request_url(base: &Url, request: &RequestSpec) -> Result<Url, QueryError> {
    let mut url = base.join(&request.path)?;
    if !request.query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &request.query {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

impl<TNext: Exchange> ExchangeFactory<TNext> for FetchExchange {
    type Output = FetchExchange;

    fn build(self, _next: TNext) -> Self::Output {
        self
    }
}

#[async_trait]
impl Exchange for FetchExchange {
    async fn run<E: Endpoint, C: Client>(
        &self,
        operation: Operation<E::Args>,
        _client: C
    ) -> ExchangeResult<E::Response> {
        let extra_headers = if let Some(ref extra_headers) = operation.options.extra_headers {
            extra_headers()
        } else {
            Vec::new()
        };

        let url = request_url(&operation.options.url, &operation.request)?;
        let data = self
            .fetch::<E>(url, extra_headers, &operation.request)
            .await?;

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
