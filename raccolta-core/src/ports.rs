//! Traits describing provider and storage capabilities plus their error types.

use std::fmt;
use std::io;

use async_trait::async_trait;

use crate::model::{CacheEntry, NormalizedSchedule, ProviderMeta, Zone, ZoneId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Coarse classification of a failed fetch.
pub enum FetchCause {
    /// Connection or protocol failure.
    Network,
    /// The server answered with a non-success status.
    HttpStatus,
    /// The request exceeded its deadline.
    Timeout,
}

impl fmt::Display for FetchCause {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            FetchCause::Network => "network",
            FetchCause::HttpStatus => "http_status",
            FetchCause::Timeout => "timeout",
        };
        formatter.write_str(tag)
    }
}

#[derive(thiserror::Error, Debug)]
/// Transport failures while talking to the remote API.
pub enum FetchError {
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(String),
    /// Remote returned a non-success status code.
    #[error("API returned status {status}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
    },
    /// Request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,
}

impl FetchError {
    /// Cause tag for this failure.
    #[must_use]
    pub fn cause(&self) -> FetchCause {
        match self {
            FetchError::Network(_) => FetchCause::Network,
            FetchError::HttpStatus { .. } => FetchCause::HttpStatus,
            FetchError::Timeout => FetchCause::Timeout,
        }
    }
}

#[derive(thiserror::Error, Debug)]
/// The payload as a whole could not be interpreted as a schedule.
pub enum ParseError {
    /// Payload is not the expected container shape.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

#[derive(thiserror::Error, Debug)]
/// Failures writing to a cache backend.
pub enum CacheError {
    /// Filesystem access failed.
    #[error("Cache I/O error: {0}")]
    Io(#[from] io::Error),
    /// Entry could not be serialized.
    #[error("Cache encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Undecoded response body returned by a [`FetchPort`].
pub struct RawPayload(pub String);

impl RawPayload {
    /// Body text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RawPayload {
    fn from(body: &str) -> Self {
        RawPayload(body.to_owned())
    }
}

#[async_trait]
/// Transport for retrieving a zone's raw schedule payload.
pub trait FetchPort: Send + Sync {
    /// Metadata describing the provider behind this port.
    fn provider(&self) -> &ProviderMeta;

    /// Issue a single request for the zone's schedule.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] on network failure, non-success status, or timeout.
    async fn fetch(&self, zone: &ZoneId) -> Result<RawPayload, FetchError>;
}

#[async_trait]
/// Listing of zones served by a provider.
pub trait ZonePort: Send + Sync {
    /// Fetch every zone the provider knows about.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the request fails or the body is unusable.
    async fn zones(&self) -> Result<Vec<Zone>, FetchError>;
}

/// Keyed store holding the last good schedule per zone.
///
/// Implementations replace entries wholesale and never merge.
pub trait CachePort: Send + Sync {
    /// Stored entry for the zone; unreadable entries count as absent.
    fn get(&self, zone: &ZoneId) -> Option<CacheEntry>;

    /// Replace the zone's entry with `schedule`, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns a [`CacheError`] when the entry could not be persisted; the
    /// previous entry is then left untouched.
    fn put(&self, zone: &ZoneId, schedule: NormalizedSchedule) -> Result<CacheEntry, CacheError>;
}
