// Provider adapters - one module per external job API.
// Each adapter builds its own request, parses its own payload shape and
// maps it to CanonicalJob with a pure function the tests drive directly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::config::Config;
use crate::models::canonical::{CanonicalJob, JobSource};
use crate::search::SearchParams;

pub mod adzuna;
pub mod google;
pub mod jsearch;
pub mod reed;
pub mod serpapi;

const USER_AGENT: &str = concat!("jobhub/", env!("CARGO_PKG_VERSION"));
const RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
}

impl ProviderError {
    /// Worth one more attempt: transport hiccups and provider-side 5xx.
    /// 429 is not transient at this timescale, a second hit just burns quota.
    fn is_transient(&self) -> bool {
        match self {
            ProviderError::Http(e) => e.is_timeout() || e.is_connect(),
            ProviderError::Status(status) => status.is_server_error(),
        }
    }
}

/// Trait all external source adapters implement. `fetch` on an adapter
/// missing its credentials must return `Ok(vec![])`, never an error, so
/// a half-configured deployment degrades instead of failing every search.
#[async_trait]
pub trait JobProvider: Send + Sync {
    fn kind(&self) -> JobSource;

    fn is_configured(&self) -> bool;

    async fn fetch(&self, params: &SearchParams) -> Result<Vec<CanonicalJob>, ProviderError>;

    /// Look up one listing by its provider-native id. Only Reed and JSearch
    /// expose a real detail endpoint; the rest answer `None` and the caller
    /// falls back to the Google link.
    async fn fetch_by_id(
        &self,
        _source_id: &str,
    ) -> Result<Option<CanonicalJob>, ProviderError> {
        Ok(None)
    }
}

/// Send a request, retrying exactly once on a transient failure.
async fn send_with_retry(req: reqwest::RequestBuilder) -> Result<reqwest::Response, ProviderError> {
    let retry = req.try_clone();
    match send_once(req).await {
        Ok(resp) => Ok(resp),
        Err(e) if e.is_transient() => {
            let Some(retry) = retry else { return Err(e) };
            tracing::debug!(error = %e, "transient provider failure, retrying once");
            tokio::time::sleep(RETRY_DELAY).await;
            send_once(retry).await
        }
        Err(e) => Err(e),
    }
}

async fn send_once(req: reqwest::RequestBuilder) -> Result<reqwest::Response, ProviderError> {
    let resp = req.send().await?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!(%status, "provider rate limited");
    }
    Err(ProviderError::Status(status))
}

/// All adapters in their fixed merge order. Unconfigured ones stay in the
/// list so `/api/providers` and `apiStatus` can report them as disabled.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn JobProvider>>,
}

impl ProviderRegistry {
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            // Backstop only; the aggregator enforces the real per-fetch deadline.
            .timeout(Duration::from_secs(config.provider_timeout_secs + 5))
            .build()?;

        let providers: Vec<Arc<dyn JobProvider>> = vec![
            Arc::new(adzuna::Adzuna::new(
                client.clone(),
                config.adzuna_app_id.clone(),
                config.adzuna_app_key.clone(),
                config.adzuna_country.clone(),
            )),
            Arc::new(jsearch::JSearch::new(
                client.clone(),
                config.rapidapi_key.clone(),
            )),
            Arc::new(google::GoogleJobs::new(
                client.clone(),
                config.google_jobs_api_key.clone(),
            )),
            Arc::new(reed::Reed::new(client.clone(), config.reed_api_key.clone())),
            Arc::new(serpapi::SerpApi::new(client, config.serpapi_key.clone())),
        ];

        Ok(ProviderRegistry { providers })
    }

    pub fn providers(&self) -> &[Arc<dyn JobProvider>] {
        &self.providers
    }

    pub fn get(&self, kind: JobSource) -> Option<&Arc<dyn JobProvider>> {
        self.providers.iter().find(|p| p.kind() == kind)
    }
}
