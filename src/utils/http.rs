use std::env;
use std::time::Duration;

use futures::{StreamExt, TryStreamExt};
use log::debug;
use reqwest::{Client, Proxy};

use crate::fetch::{FetchError, FetchResponse, Fetcher};

/// Default timeout for HTTP requests in seconds
const DEFAULT_TIMEOUT: u64 = 15;

const PROXY_ENV_VARS: &[&str] = &[
    "all_proxy",
    "ALL_PROXY",
    "https_proxy",
    "HTTPS_PROXY",
    "http_proxy",
    "HTTP_PROXY",
];

/// Proxy from the environment, or an empty string when none is set.
pub fn get_system_proxy() -> String {
    PROXY_ENV_VARS
        .iter()
        .filter_map(|var| env::var(var).ok())
        .find(|proxy| !proxy.is_empty())
        .unwrap_or_default()
}

/// Resolves a proxy setting: `SYSTEM` reads the environment, `NONE` and the
/// empty string disable proxying, anything else is used as is.
pub fn parse_proxy(proxy_str: &str) -> Option<String> {
    let proxy = match proxy_str {
        "SYSTEM" => get_system_proxy(),
        "NONE" => return None,
        other => other.to_string(),
    };
    (!proxy.is_empty()).then_some(proxy)
}

/// [`Fetcher`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration, proxy: Option<&str>) -> Result<Self, FetchError> {
        let mut client_builder = Client::builder().timeout(timeout).user_agent(user_agent);

        if let Some(proxy) = proxy.and_then(parse_proxy) {
            debug!("Fetching through proxy {}", proxy);
            let proxy = Proxy::all(&proxy)
                .map_err(|e| FetchError::Network(format!("Failed to set proxy: {}", e)))?;
            client_builder = client_builder.proxy(proxy);
        }

        let client = client_builder
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(HttpFetcher { client })
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        HttpFetcher {
            client: Client::builder()
                .timeout(Duration::from_secs(DEFAULT_TIMEOUT))
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("Failed to send request: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map_ok(|chunk| chunk.to_vec())
            .map_err(|e| FetchError::Body(e.to_string()))
            .boxed();
        Ok(FetchResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_proxy() {
        assert_eq!(parse_proxy("NONE"), None);
        assert_eq!(parse_proxy(""), None);
        assert_eq!(
            parse_proxy("http://127.0.0.1:7890").as_deref(),
            Some("http://127.0.0.1:7890")
        );
    }
}
