use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::warn;

use crate::error::HydroError;

pub const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectResponse {
    #[serde(default)]
    pub head: Head,
    #[serde(default)]
    pub results: ResultSet,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Head {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Binding {
    #[serde(default)]
    pub predicate: Option<Term>,
    #[serde(default)]
    pub object: Option<Term>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Term {
    #[serde(rename = "type", default)]
    pub term_type: Option<String>,
    pub value: String,
    #[serde(default)]
    pub datatype: Option<String>,
}

impl Term {
    pub fn literal(value: &str) -> Self {
        Self {
            term_type: Some("literal".to_string()),
            value: value.to_string(),
            datatype: None,
        }
    }

    pub fn uri(value: &str) -> Self {
        Self {
            term_type: Some("uri".to_string()),
            value: value.to_string(),
            datatype: None,
        }
    }
}

pub trait SparqlClient: Send + Sync {
    fn select(&self, query: &str) -> Result<SelectResponse, HydroError>;
}

#[derive(Clone)]
pub struct SparqlHttpClient {
    client: Client,
    endpoint_url: String,
}

impl SparqlHttpClient {
    pub fn new(endpoint_url: &str) -> Result<Self, HydroError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("lindas-hydro/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| HydroError::SparqlHttp(err.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static(SPARQL_RESULTS_JSON));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| HydroError::SparqlHttp(err.to_string()))?;
        Ok(Self {
            client,
            endpoint_url: endpoint_url.to_string(),
        })
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }
}

impl SparqlClient for SparqlHttpClient {
    fn select(&self, query: &str) -> Result<SelectResponse, HydroError> {
        let response = self
            .client
            .get(&self.endpoint_url)
            .query(&[("query", query)])
            .send()
            .map_err(|err| HydroError::SparqlHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "SPARQL request failed".to_string());
            return Err(HydroError::SparqlStatus { status, message });
        }
        response
            .json()
            .map_err(|err| HydroError::SparqlHttp(err.to_string()))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    // Delay before retry number `attempt + 1`: doubles each time.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_delay * 2u32.saturating_pow(attempt)
    }
}

pub fn select_with_retry(
    client: &dyn SparqlClient,
    query: &str,
    policy: &RetryPolicy,
) -> Result<SelectResponse, HydroError> {
    let mut attempt = 0u32;
    loop {
        match client.select(query) {
            Ok(response) => return Ok(response),
            Err(err) => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    return Err(err);
                }
                let delay = policy.delay_for(attempt - 1);
                warn!(
                    "SPARQL request failed (attempt {attempt}/{}): {err}; retrying in {delay:?}",
                    policy.max_attempts
                );
                thread::sleep(delay);
            }
        }
    }
}
