use std::{collections::HashMap, time::Duration};

use backon::{ExponentialBuilder, Retryable};
use log::{debug, info, warn};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT},
    RequestBuilder, Response, Url,
};

use crate::{config::SessionConfig, error::WalletPassError};

/// Downloads pass payloads. Sets sensible defaults such as timeouts and user-agent, and
/// applies retry middleware for transient failures.
pub struct PassFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_retries: u32,
    user_agent: String,
}

impl PassFetcher {
    /// Initializes a new `PassFetcher` from the session config.
    pub(crate) fn new(config: &SessionConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: config.fetch_timeout(),
            max_retries: config.fetch_max_retries,
            user_agent: config.user_agent(),
        }
    }

    /// Fetches the pass at `url` with a GET request carrying `headers`.
    ///
    /// The URL and headers are validated before any network activity. Only a 2xx response
    /// with a non-empty body is accepted.
    pub(crate) async fn fetch(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<Vec<u8>, WalletPassError> {
        let parsed = parse_pass_url(url)?;
        let headers = header_map(headers)?;

        debug!("Fetching pass from {parsed}");
        let request_builder = self
            .client
            .get(parsed)
            .timeout(self.timeout)
            .header(USER_AGENT, &self.user_agent)
            .headers(headers);

        let response = self.handle(request_builder).await?;
        let status = response.status();
        if !status.is_success() {
            warn!("Pass download from {url} failed with HTTP {status}");
            return Err(WalletPassError::HttpError {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| WalletPassError::NetworkError {
                url: url.to_string(),
                error: err.to_string(),
            })?;
        if body.is_empty() {
            return Err(WalletPassError::invalid_data("No data received"));
        }

        info!("Fetched pass from {url} ({} bytes)", body.len());
        Ok(body.to_vec())
    }

    /// Sends the request, retrying connect errors, timeouts, 429 and 5xx responses.
    async fn handle(&self, request_builder: RequestBuilder) -> Result<Response, WalletPassError> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(self.max_retries as usize);

        (|| async {
            let request_builder = request_builder.try_clone().ok_or_else(|| {
                RequestHandleError::permanent(
                    "<unknown>".to_string(),
                    None,
                    "request cannot be retried because it is not cloneable".to_string(),
                )
            })?;
            execute_request_builder(request_builder).await
        })
        .retry(backoff)
        .when(RequestHandleError::is_retryable)
        .notify(|err: &RequestHandleError, delay: Duration| {
            debug!("Retrying pass download in {delay:?}: {}", err.error);
        })
        .await
        .map_err(Into::into)
    }
}

/// Reads a pass from a local file.
pub(crate) fn read_pass_file(path: &str) -> Result<Vec<u8>, WalletPassError> {
    if path.is_empty() {
        return Err(WalletPassError::InvalidUrl {
            url: path.to_string(),
        });
    }
    match std::fs::read(path) {
        Ok(bytes) if !bytes.is_empty() => Ok(bytes),
        Ok(_) => Err(WalletPassError::invalid_data("File not found or empty")),
        Err(err) => {
            warn!("Unable to read pass file {path}: {err}");
            Err(WalletPassError::invalid_data("File not found or empty"))
        }
    }
}

fn parse_pass_url(url: &str) -> Result<Url, WalletPassError> {
    let invalid = || WalletPassError::InvalidUrl {
        url: url.to_string(),
    };
    let parsed = Url::parse(url).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(invalid());
    }
    Ok(parsed)
}

fn header_map(headers: &HashMap<String, String>) -> Result<HeaderMap, WalletPassError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| WalletPassError::invalid_data(format!("Invalid header name: {name}")))?;
        let value = HeaderValue::from_str(value).map_err(|_| {
            WalletPassError::invalid_data(format!("Invalid value for header {name}"))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

#[derive(Debug)]
struct RequestHandleError {
    url: String,
    status: Option<u16>,
    error: String,
    retryable: bool,
}

impl RequestHandleError {
    fn retryable(url: String, status: Option<u16>, error: String) -> Self {
        Self {
            url,
            status,
            error,
            retryable: true,
        }
    }

    fn permanent(url: String, status: Option<u16>, error: String) -> Self {
        Self {
            url,
            status,
            error,
            retryable: false,
        }
    }

    const fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl From<RequestHandleError> for WalletPassError {
    fn from(value: RequestHandleError) -> Self {
        match value.status {
            Some(status) => Self::HttpError {
                url: value.url,
                status,
            },
            None => Self::NetworkError {
                url: value.url,
                error: value.error,
            },
        }
    }
}

async fn execute_request_builder(
    request_builder: RequestBuilder,
) -> Result<Response, RequestHandleError> {
    let (client, request) = request_builder.build_split();
    let request = request.map_err(|err| {
        RequestHandleError::permanent(
            err.url()
                .map_or_else(|| "<unknown>".to_string(), ToString::to_string),
            None,
            format!("request build failed: {err}"),
        )
    })?;
    let url = request.url().to_string();

    match client.execute(request).await {
        Ok(resp) => {
            let status = resp.status().as_u16();
            if status == 429 || (500..600).contains(&status) {
                return Err(RequestHandleError::retryable(
                    url,
                    Some(status),
                    format!("request error with bad status code {status}"),
                ));
            }
            Ok(resp)
        }
        Err(err) => {
            if err.is_timeout() || err.is_connect() {
                return Err(RequestHandleError::retryable(
                    url,
                    None,
                    format!("request timeout/connect error: {err}"),
                ));
            }

            Err(RequestHandleError::permanent(
                url,
                None,
                format!("request failed: {err}"),
            ))
        }
    }
}
