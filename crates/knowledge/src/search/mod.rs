//! External web search used to enrich answers.
//!
//! Search is best-effort: every failure, including a timeout or missing
//! credentials, surfaces as [`AppError::ExternalSearchUnavailable`] so the
//! synthesizer can degrade instead of aborting.

pub mod serpapi;

pub use serpapi::SerpApiClient;

use std::sync::Arc;
use std::time::Duration;
use tutor_core::config::SearchSettings;
use tutor_core::{AppError, AppResult};

/// A web search capability returning a free-text summary.
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    fn provider_name(&self) -> &str;

    async fn run(&self, query: &str) -> AppResult<String>;
}

/// Wraps a [`SearchProvider`] with the pipeline's error contract.
#[derive(Clone)]
pub struct ExternalSearcher {
    provider: Arc<dyn SearchProvider>,
    timeout: Option<Duration>,
}

impl ExternalSearcher {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            provider,
            timeout: None,
        }
    }

    /// Give up on the provider after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Search the web for `query`.
    pub async fn search_external(&self, query: &str) -> AppResult<String> {
        tracing::debug!(provider = self.provider.provider_name(), "Searching the web");

        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.provider.run(query))
                .await
                .map_err(|_| {
                    AppError::ExternalSearchUnavailable(format!(
                        "timed out after {}ms",
                        limit.as_millis()
                    ))
                })?,
            None => self.provider.run(query).await,
        };

        outcome.map_err(|e| match e {
            AppError::ExternalSearchUnavailable(_) => e,
            other => AppError::ExternalSearchUnavailable(other.to_string()),
        })
    }
}

/// Build the configured search provider.
pub fn create_search_provider(
    settings: &SearchSettings,
    api_key: Option<String>,
) -> AppResult<Arc<dyn SearchProvider>> {
    match settings.provider.as_str() {
        "serpapi" => Ok(Arc::new(SerpApiClient::new(settings, api_key))),
        other => Err(AppError::Config(format!(
            "Unknown search provider: '{}'. Supported providers: serpapi",
            other
        ))),
    }
}
