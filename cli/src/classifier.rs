//! Slot filler backed by an OpenAI-compatible chat completions endpoint.

use std::time::Duration;

use serde::Deserialize;

use redocx::filler::{parse_response, prompt};
use redocx::{Error, FillRequest, FilledBlock, SlotFiller};

/// Default model requested from the endpoint.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Classifies raw text by asking a chat completions endpoint.
pub struct HttpClassifier {
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Deserialize)]
struct ApiMessage {
    content: Option<String>,
}

impl HttpClassifier {
    /// Create a classifier for `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            client,
            runtime,
        })
    }

    async fn complete(&self, request: &FillRequest) -> redocx::Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                {"role": "system", "content": prompt::system_prompt()},
                {"role": "user", "content": prompt::user_prompt(request)},
            ],
        });

        log::debug!("Sending classification request to {}", url);
        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::ClassificationUnavailable(format!("{}: {}", url, e)))?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(Error::ClassificationUnavailable(format!(
                "endpoint returned {}",
                status
            )));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            log::warn!("Classification endpoint returned {}: {}", status, detail);
            return Err(Error::ClassificationUnavailable(format!(
                "endpoint returned {}",
                status
            )));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::ClassificationMalformed(format!("response envelope: {}", e)))?;

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::ClassificationMalformed("no choices in response".into()))
    }
}

impl SlotFiller for HttpClassifier {
    fn name(&self) -> &str {
        "http"
    }

    fn fill(&self, request: &FillRequest) -> redocx::Result<Vec<FilledBlock>> {
        let content = self.runtime.block_on(self.complete(request))?;
        parse_response(&content)
    }
}
