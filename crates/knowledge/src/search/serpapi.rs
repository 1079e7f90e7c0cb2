//! SerpAPI search provider.
//!
//! API: https://serpapi.com/search-api
//!
//! The JSON response is reduced to one text block. Direct answers win over
//! structured result lists, which win over collected snippets.

use super::SearchProvider;
use serde_json::Value;
use std::time::Duration;
use tutor_core::config::SearchSettings;
use tutor_core::{AppError, AppResult};

/// Returned when the response carries nothing usable.
pub const NO_RESULT: &str = "No good search result found";

pub struct SerpApiClient {
    /// `None` when the HTTP client could not be built; every search then fails
    client: Option<reqwest::Client>,
    endpoint: String,
    api_key: Option<String>,
    engine: String,
    google_domain: String,
    gl: String,
    hl: String,
}

impl SerpApiClient {
    pub fn new(settings: &SearchSettings, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| tracing::warn!("Failed to create HTTP client for SerpAPI: {}", e))
            .ok();

        Self {
            client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            api_key,
            engine: settings.engine.clone(),
            google_domain: settings.google_domain.clone(),
            gl: settings.gl.clone(),
            hl: settings.hl.clone(),
        }
    }
}

#[async_trait::async_trait]
impl SearchProvider for SerpApiClient {
    fn provider_name(&self) -> &str {
        "serpapi"
    }

    async fn run(&self, query: &str) -> AppResult<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::ExternalSearchUnavailable(
                "missing credentials: no SerpAPI key configured".to_string(),
            )
        })?;

        let client = self.client.as_ref().ok_or_else(|| {
            AppError::ExternalSearchUnavailable("SerpAPI HTTP client unavailable".to_string())
        })?;

        let response = client
            .get(format!("{}/search.json", self.endpoint))
            .query(&[
                ("q", query),
                ("api_key", api_key),
                ("engine", self.engine.as_str()),
                ("google_domain", self.google_domain.as_str()),
                ("gl", self.gl.as_str()),
                ("hl", self.hl.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalSearchUnavailable(format!("SerpAPI request failed: {}", e))
            })?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            AppError::ExternalSearchUnavailable(format!(
                "Failed to parse SerpAPI response ({}): {}",
                status, e
            ))
        })?;

        if !status.is_success() && body.get("error").is_none() {
            return Err(AppError::ExternalSearchUnavailable(format!(
                "SerpAPI returned {}",
                status
            )));
        }

        let summary = summarize(&body)?;
        tracing::debug!(summary_len = summary.len(), "SerpAPI search completed");
        Ok(summary)
    }
}

/// Reduce a SerpAPI response to a text summary.
pub fn summarize(response: &Value) -> AppResult<String> {
    if let Some(error) = response.get("error") {
        let message = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
        return Err(AppError::ExternalSearchUnavailable(format!("SerpAPI error: {}", message)));
    }

    let answer_box = response
        .get("answer_box_list")
        .and_then(|list| list.get(0))
        .or_else(|| match response.get("answer_box") {
            Some(Value::Array(items)) => items.first(),
            other => other,
        });

    if let Some(direct) = answer_box.and_then(direct_answer) {
        return Ok(direct);
    }

    for key in ["sports_results", "top_stories", "news_results"] {
        if let Some(results) = response.get(key) {
            return Ok(results.to_string());
        }
    }

    let mut snippets = Vec::new();

    if let Some(graph) = response.get("knowledge_graph").and_then(Value::as_object) {
        let title = graph.get("title").and_then(Value::as_str).unwrap_or("");

        if let Some(description) = graph.get("description").and_then(Value::as_str) {
            snippets.push(description.to_string());
        }

        for (key, value) in graph {
            let Some(value) = value.as_str() else {
                continue;
            };
            if key == "title"
                || key == "description"
                || key.ends_with("_stick")
                || key.ends_with("_link")
                || value.starts_with("http")
            {
                continue;
            }
            snippets.push(format!("{} {}: {}.", title, key, value));
        }
    }

    if let Some(results) = response.get("organic_results").and_then(Value::as_array) {
        for result in results {
            if let Some(snippet) = result.get("snippet").and_then(Value::as_str) {
                snippets.push(snippet.to_string());
            } else if let Some(words) = result.get("snippet_highlighted_words").and_then(join_words) {
                snippets.push(words);
            } else if let Some(link) = result.get("link").and_then(Value::as_str) {
                snippets.push(link.to_string());
            }
        }
    }

    if snippets.is_empty() {
        Ok(NO_RESULT.to_string())
    } else {
        Ok(snippets.join("\n"))
    }
}

fn direct_answer(answer_box: &Value) -> Option<String> {
    ["result", "answer", "snippet"]
        .iter()
        .find_map(|key| answer_box.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .or_else(|| answer_box.get("snippet_highlighted_words").and_then(join_words))
}

fn join_words(words: &Value) -> Option<String> {
    let words: Vec<&str> = words.as_array()?.iter().filter_map(Value::as_str).collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join(", "))
    }
}
