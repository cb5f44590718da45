use crate::models::error::SError;
use crate::utils::file::PREALLOC_LIMIT;
use futures::StreamExt;
use std::future::Future;
use tracing::debug;

pub const DEFAULT_REGISTRY: &str = "https://api.geode-sdk.org/v1";

/// `GET <registry>/mods/<id>/versions/latest/download`
pub fn download_url(registry_base: &str, mod_id: &str) -> String {
    format!(
        "{}/mods/{}/versions/latest/download",
        registry_base.trim_end_matches('/'),
        mod_id
    )
}

/// A finished request. Any status is returned as-is; the caller decides
/// what counts as failure.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

/// Transport used by the installer. `on_progress` receives the downloaded
/// fraction in `0.0..=1.0` whenever it changes.
pub trait PackageFetcher {
    fn fetch(
        &self,
        url: &str,
        on_progress: &(dyn Fn(f32) + Send + Sync),
    ) -> impl Future<Output = Result<FetchResponse, SError>> + Send;
}

#[derive(Clone, Debug, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl PackageFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        on_progress: &(dyn Fn(f32) + Send + Sync),
    ) -> Result<FetchResponse, SError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let total = response.content_length().unwrap_or(0);
        debug!("GET {url} -> {status} ({total} bytes)");

        let mut body = Vec::with_capacity(total.min(PREALLOC_LIMIT) as usize);
        let mut stream = response.bytes_stream();
        on_progress(0.0);
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk?);
            if total > 0 {
                on_progress((body.len() as f32 / total as f32).min(1.0));
            }
        }
        on_progress(1.0);

        Ok(FetchResponse { status, body })
    }
}
