//! `HttpLookup`: blocking JSON lookups against configured endpoints.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::actions::lookup::{EndpointConfig, LookupEndpoints};
use crate::error::{NexaError, Result};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpLookup {
    client: Client,
    endpoints: LookupEndpoints,
}

impl HttpLookup {
    pub fn new(endpoints: LookupEndpoints, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("nexa/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NexaError::upstream(format!("http client build failed: {e}")))?;
        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &LookupEndpoints {
        &self.endpoints
    }

    /// GET the endpoint for `query` and extract its picked fields.
    pub fn fetch(&self, endpoint: &EndpointConfig, query: &str) -> Result<Vec<String>> {
        let url = endpoint.render_url(query)?;
        debug!(url = %endpoint.url, "lookup request");

        let response = self.client.get(&url).send().map_err(|e| {
            warn!(error = %e, "lookup request failed");
            NexaError::upstream(e)
        })?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "lookup returned non-success status");
            return Err(NexaError::upstream(format!("status {}", response.status())));
        }

        let body: Value = response.json().map_err(|e| {
            warn!(error = %e, "lookup json parse failed");
            NexaError::upstream(e)
        })?;
        endpoint.extract(&body)
    }

    fn lookup(&self, name: &str, endpoint: Option<&EndpointConfig>, query: &str) -> Result<Vec<String>> {
        let endpoint = endpoint.ok_or_else(|| NexaError::upstream(format!("no {name} endpoint configured")))?;
        self.fetch(endpoint, query)
    }

    pub fn weather(&self, city: &str) -> Result<Vec<String>> {
        self.lookup("weather", self.endpoints.weather.as_ref(), city)
    }

    pub fn news(&self) -> Result<Vec<String>> {
        self.lookup("news", self.endpoints.news.as_ref(), "")
    }

    /// Setup and punchline joined with " - ".
    pub fn joke(&self) -> Result<String> {
        Ok(self.lookup("joke", self.endpoints.joke.as_ref(), "")?.join(" - "))
    }

    pub fn quote(&self) -> Result<String> {
        Ok(self.lookup("quote", self.endpoints.quote.as_ref(), "")?.join(" - "))
    }

    pub fn stock(&self, symbol: &str) -> Result<String> {
        let symbol = symbol.trim().to_uppercase();
        let values = self.lookup("stock", self.endpoints.stock.as_ref(), &symbol)?;
        Ok(format!("Current price of {symbol}: {}", values.join(", ")))
    }

    pub fn recipes(&self, ingredient: &str) -> Result<Vec<String>> {
        self.lookup("recipe", self.endpoints.recipe.as_ref(), ingredient)
    }
}

impl std::fmt::Debug for HttpLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLookup")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_endpoint_is_upstream_error() {
        let lookup = HttpLookup::new(
            LookupEndpoints {
                stock: None,
                ..LookupEndpoints::default()
            },
            Duration::from_millis(200),
        )
        .unwrap();
        assert!(matches!(lookup.stock("acme"), Err(NexaError::Upstream(_))));
    }

    #[test]
    fn missing_api_key_fails_before_any_request() {
        let lookup = HttpLookup::new(LookupEndpoints::default(), Duration::from_millis(200)).unwrap();
        assert!(matches!(lookup.weather("Paris"), Err(NexaError::Upstream(_))));
        assert!(matches!(lookup.news(), Err(NexaError::Upstream(_))));
    }

    #[test]
    fn unreachable_host_is_upstream_error() {
        let endpoint = EndpointConfig::new("http://127.0.0.1:9/{query}", &["/x"]);
        let lookup = HttpLookup::new(LookupEndpoints::default(), Duration::from_millis(500)).unwrap();
        assert!(matches!(lookup.fetch(&endpoint, "q"), Err(NexaError::Upstream(_))));
    }
}
