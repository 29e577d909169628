//! HTTP collaborators: the mission event stream and the command endpoints.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt, TryStreamExt};
use reqwest::{header, Client, Response};
use shared::{
    error::{ApiError, RejectedRequest},
    protocol::{FormationRequest, PodPositionUpdate, FORMATION_ROUTE, STREAM_ROUTE, UPDATE_POD_ROUTE},
};
use url::Url;

pub type ChunkStream = BoxStream<'static, Result<Vec<u8>>>;

#[async_trait]
pub trait MissionLink: Send + Sync {
    /// Opens the push channel. The returned stream ends when the
    /// connection drops; reconnecting is the caller's job.
    async fn open_stream(&self) -> Result<ChunkStream>;
    async fn submit_formation(&self, request: FormationRequest) -> Result<()>;
    async fn persist_position(&self, update: PodPositionUpdate) -> Result<()>;
}

pub struct OfflineMissionLink;

#[async_trait]
impl MissionLink for OfflineMissionLink {
    async fn open_stream(&self) -> Result<ChunkStream> {
        Err(anyhow!("mission link is offline"))
    }

    async fn submit_formation(&self, request: FormationRequest) -> Result<()> {
        Err(anyhow!(
            "mission link is offline; formation {} not sent",
            request.formation
        ))
    }

    async fn persist_position(&self, update: PodPositionUpdate) -> Result<()> {
        Err(anyhow!(
            "mission link is offline; pod {} position not persisted",
            update.id
        ))
    }
}

pub struct HttpMissionLink {
    http: Client,
    api_url: Url,
    request_timeout: Duration,
}

impl HttpMissionLink {
    pub fn new(api_url: &str, request_timeout: Duration) -> Result<Self> {
        let api_url = Url::parse(api_url).with_context(|| format!("invalid api url: {api_url}"))?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(anyhow!("api url must start with http:// or https://"));
        }
        Ok(Self {
            http: Client::new(),
            api_url,
            request_timeout,
        })
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    fn endpoint(&self, route: &str) -> Result<Url> {
        self.api_url
            .join(route)
            .with_context(|| format!("failed to build endpoint url for {route}"))
    }
}

#[async_trait]
impl MissionLink for HttpMissionLink {
    async fn open_stream(&self) -> Result<ChunkStream> {
        let url = self.endpoint(STREAM_ROUTE)?;
        let response = self
            .http
            .get(url.clone())
            .header(header::ACCEPT, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .with_context(|| format!("failed to connect mission stream: {url}"))?;
        let response = ensure_success(response).await?;

        Ok(response
            .bytes_stream()
            .map_ok(|chunk| chunk.to_vec())
            .map_err(anyhow::Error::from)
            .boxed())
    }

    async fn submit_formation(&self, request: FormationRequest) -> Result<()> {
        let response = self
            .http
            .post(self.endpoint(FORMATION_ROUTE)?)
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn persist_position(&self, update: PodPositionUpdate) -> Result<()> {
        let response = self
            .http
            .post(self.endpoint(UPDATE_POD_ROUTE)?)
            .timeout(self.request_timeout)
            .json(&update)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiError>(&body) {
        Ok(error) => Err(RejectedRequest {
            status: status.as_u16(),
            error,
        }
        .into()),
        Err(_) if body.trim().is_empty() => Err(anyhow!("server responded with status {status}")),
        Err(_) => Err(anyhow!("server responded with status {status}: {}", body.trim())),
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
