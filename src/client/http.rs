use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::debug;

use super::{ClientError, CollectionSource};
use crate::records::{Application, ApplicationColumn, Entity, RecordId};

#[derive(Clone, Debug)]
pub struct ApiOptions {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub proxy: Option<String>,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            base_url: crate::config::DEFAULT_API_URL.to_string(),
            timeout_seconds: crate::config::DEFAULT_TIMEOUT_SECONDS,
            proxy: None,
        }
    }
}

pub fn build_http_client(options: &ApiOptions) -> Result<reqwest::Client, ClientError> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_static(concat!(
            "talenttrack/",
            env!("CARGO_PKG_VERSION")
        )),
    );
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static("application/json"),
    );

    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(options.timeout_seconds.max(1)));

    if let Some(proxy) = options.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
        let proxy = reqwest::Proxy::all(proxy)
            .map_err(|e| ClientError::transport(format!("failed to setup proxy: {proxy}: {e}")))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ClientError::transport(format!("failed to build HTTP client: {e}")))
}

/// Joins path segments onto the API base, tolerating a trailing slash on the base.
pub fn endpoint_url(base: &str, segments: &[&str]) -> Result<Url, ClientError> {
    let mut url = base.trim().trim_end_matches('/').to_string();
    for segment in segments {
        url.push('/');
        url.push_str(segment.trim_matches('/'));
    }
    Url::parse(&url).map_err(|e| ClientError::transport(format!("invalid URL '{url}': {e}")))
}

/// Collection endpoint served over HTTP.
#[derive(Clone, Debug)]
pub struct HttpCollection<E> {
    http: reqwest::Client,
    base_url: String,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> HttpCollection<E> {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            _entity: PhantomData,
        }
    }

    pub fn from_options(options: &ApiOptions) -> Result<Self, ClientError> {
        Ok(Self::new(build_http_client(options)?, options.base_url.clone()))
    }

    fn url(&self, id: Option<RecordId>) -> Result<Url, ClientError> {
        match id {
            Some(id) => endpoint_url(&self.base_url, &[E::ENDPOINT, &id.to_string()]),
            None => endpoint_url(&self.base_url, &[E::ENDPOINT]),
        }
    }

    async fn send(
        &self,
        method: Method,
        id: Option<RecordId>,
        body: Option<&JsonValue>,
    ) -> Result<Vec<u8>, ClientError> {
        let url = self.url(id)?;
        debug!(%method, %url, "collection request");
        let mut request = self.http.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Transport {
                status: e.status().map(|s| s.as_u16()),
                message: format!("request to {} failed: {e}", E::ENDPOINT),
            })?;
        read_response(response, id).await
    }
}

pub(crate) async fn read_response(
    response: reqwest::Response,
    id: Option<RecordId>,
) -> Result<Vec<u8>, ClientError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(|e| ClientError::Transport {
        status: Some(status.as_u16()),
        message: format!("failed to read response body: {e}"),
    })?;
    debug!(status = status.as_u16(), len = bytes.len(), "collection response");
    if status.is_success() {
        return Ok(bytes.to_vec());
    }
    Err(ClientError::from_status(
        status.as_u16(),
        id,
        server_message(status, &bytes),
    ))
}

/// Prefers the `message` or `error` string of a JSON error body.
fn server_message(status: StatusCode, body: &[u8]) -> String {
    let parsed: Option<JsonValue> = serde_json::from_slice(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
        })
        .map(|m| m.to_string())
        .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()))
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ClientError> {
    serde_json::from_slice(bytes)
        .map_err(|e| ClientError::transport(format!("unexpected response body: {e}")))
}

/// Vacancies with their application counts, from `applications/column`.
pub async fn fetch_application_columns(
    http: &reqwest::Client,
    base_url: &str,
) -> Result<Vec<ApplicationColumn>, ClientError> {
    let url = endpoint_url(base_url, &[Application::ENDPOINT, "column"])?;
    debug!(%url, "application column request");
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| ClientError::Transport {
            status: e.status().map(|s| s.as_u16()),
            message: format!("request to applications/column failed: {e}"),
        })?;
    let bytes = read_response(response, None).await?;
    decode(&bytes)
}

#[async_trait]
impl<E: Entity> CollectionSource<E> for HttpCollection<E> {
    async fn list(&self) -> Result<Vec<E>, ClientError> {
        let bytes = self.send(Method::GET, None, None).await?;
        decode(&bytes)
    }

    async fn create(&self, payload: &JsonValue) -> Result<E, ClientError> {
        let bytes = self.send(Method::POST, None, Some(payload)).await?;
        decode(&bytes)
    }

    async fn update(&self, id: RecordId, payload: &JsonValue) -> Result<E, ClientError> {
        let bytes = self.send(Method::PUT, Some(id), Some(payload)).await?;
        decode(&bytes)
    }

    async fn remove(&self, id: RecordId) -> Result<(), ClientError> {
        self.send(Method::DELETE, Some(id), None).await?;
        Ok(())
    }
}
