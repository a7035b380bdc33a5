//! Single-attempt retrieval of published JSON documents.

use std::io::ErrorKind;

use async_trait::async_trait;
use reqwest::{
    header::{CACHE_CONTROL, PRAGMA},
    Client,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::error::FetchError;
use url::Url;

#[async_trait]
pub trait FetchGateway: Send + Sync {
    /// Fetches and parses one document, bypassing intermediate caches. There
    /// is no retry: the first failure is returned to the caller.
    async fn fetch_json(&self, location: &Url) -> Result<Value, FetchError>;
}

/// Fetches `location` and decodes it into `T`. A document with the wrong
/// shape is reported as [`FetchError::Parse`].
pub async fn fetch_document<T, G>(gateway: &G, location: &Url) -> Result<T, FetchError>
where
    T: DeserializeOwned,
    G: FetchGateway + ?Sized,
{
    let value = gateway.fetch_json(location).await?;
    serde_json::from_value(value).map_err(|e| FetchError::Parse {
        location: location.to_string(),
        message: e.to_string(),
    })
}

/// Gateway over `http(s)://` via reqwest and `file://` via the local filesystem.
#[derive(Clone, Default)]
pub struct HttpGateway {
    http: Client,
}

impl HttpGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    async fn fetch_http(&self, location: &Url) -> Result<Value, FetchError> {
        let response = self
            .http
            .get(location.clone())
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .map_err(|e| transport(location, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                location: location.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| transport(location, e))?;
        parse_body(location, &body)
    }

    async fn fetch_file(&self, location: &Url) -> Result<Value, FetchError> {
        let path = location
            .to_file_path()
            .map_err(|()| FetchError::UnsupportedScheme {
                location: location.to_string(),
            })?;

        let body = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => FetchError::Status {
                location: location.to_string(),
                status: 404,
            },
            _ => transport(location, e),
        })?;
        parse_body(location, &body)
    }
}

#[async_trait]
impl FetchGateway for HttpGateway {
    async fn fetch_json(&self, location: &Url) -> Result<Value, FetchError> {
        match location.scheme() {
            "http" | "https" => self.fetch_http(location).await,
            "file" => self.fetch_file(location).await,
            _ => Err(FetchError::UnsupportedScheme {
                location: location.to_string(),
            }),
        }
    }
}

fn transport(location: &Url, err: impl std::fmt::Display) -> FetchError {
    FetchError::Transport {
        location: location.to_string(),
        message: err.to_string(),
    }
}

fn parse_body(location: &Url, body: &[u8]) -> Result<Value, FetchError> {
    serde_json::from_slice(body).map_err(|e| FetchError::Parse {
        location: location.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
