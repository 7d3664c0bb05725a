//! Provider implementation for Mantova using the Mantova Ambiente API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::debug;

use raccolta_core::{
    model::{ProviderMeta, Zone, ZoneId},
    plugin::ProviderPlugin,
    ports::{FetchError, FetchPort, RawPayload, ZonePort},
};

/// Public API root.
pub const BASE_URL: &str = "https://www.mantovaambiente.it/api";

/// Per-request deadline used unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Response from /api/zones, either wrapped in `data` or bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZonesResponse {
    Wrapped { data: Vec<ZoneEntry> },
    Bare(Vec<ZoneEntry>),
}

/// Single zone from /api/zones
#[derive(Debug, Deserialize)]
struct ZoneEntry {
    id: ZoneCode,
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZoneCode {
    Text(String),
    Number(i64),
}

impl From<ZoneCode> for ZoneId {
    fn from(code: ZoneCode) -> Self {
        match code {
            ZoneCode::Text(text) => ZoneId(text),
            ZoneCode::Number(number) => ZoneId(number.to_string()),
        }
    }
}

/// Where and how to reach the API.
#[derive(Debug, Clone)]
pub struct Endpoint {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl Endpoint {
    /// Endpoint for the public API with the default timeout.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Point at another API root, e.g. a local test server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Override the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}/{path}", self.base_url))
            .timeout(self.timeout)
    }
}

/// Raw schedule transport for Mantova zones.
pub struct MantovaFetchPort {
    endpoint: Endpoint,
    meta: ProviderMeta,
}

impl MantovaFetchPort {
    /// Create a fetch port for the given endpoint.
    #[must_use]
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            meta: provider_meta(),
        }
    }
}

#[async_trait]
impl FetchPort for MantovaFetchPort {
    fn provider(&self) -> &ProviderMeta {
        &self.meta
    }

    async fn fetch(&self, zone: &ZoneId) -> Result<RawPayload, FetchError> {
        let req = self
            .endpoint
            .get("recyclings")
            .query(&[("zone", zone.0.as_str()), ("from", "today")]);

        let body = send(req).await?.text().await.map_err(classify)?;
        debug!(zone = %zone, bytes = body.len(), "API response received");

        Ok(RawPayload(body))
    }
}

/// Zone listing for Mantova.
pub struct MantovaZonePort {
    endpoint: Endpoint,
}

impl MantovaZonePort {
    /// Create a zone port for the given endpoint.
    #[must_use]
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl ZonePort for MantovaZonePort {
    async fn zones(&self) -> Result<Vec<Zone>, FetchError> {
        let resp: ZonesResponse = send(self.endpoint.get("zones"))
            .await?
            .json()
            .await
            .map_err(classify)?;

        let entries = match resp {
            ZonesResponse::Wrapped { data } => data,
            ZonesResponse::Bare(entries) => entries,
        };

        let zones: Vec<Zone> = entries
            .into_iter()
            .map(|entry| Zone {
                id: entry.id.into(),
                title: entry.title,
            })
            .collect();
        debug!("Retrieved {} zones from API", zones.len());

        Ok(zones)
    }
}

/// Build the plugin bundle for the public Mantova Ambiente API.
#[must_use]
pub fn plugin(client: Client) -> ProviderPlugin {
    plugin_for(&Endpoint::new(client))
}

/// Build the plugin bundle for a custom endpoint.
#[must_use]
pub fn plugin_for(endpoint: &Endpoint) -> ProviderPlugin {
    ProviderPlugin {
        meta: provider_meta(),
        fetch_port: Arc::new(MantovaFetchPort::new(endpoint.clone())),
        zone_port: Arc::new(MantovaZonePort::new(endpoint.clone())),
    }
}

fn provider_meta() -> ProviderMeta {
    ProviderMeta {
        id: String::from("mantova"),
        name: String::from("Mantova Ambiente"),
    }
}

// Send a request and reject non-success statuses.
async fn send(req: RequestBuilder) -> Result<Response, FetchError> {
    let resp = req.send().await.map_err(classify)?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            status: status.as_u16(),
        });
    }
    Ok(resp)
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if let Some(status) = err.status() {
        FetchError::HttpStatus {
            status: status.as_u16(),
        }
    } else {
        FetchError::Network(err.to_string())
    }
}
