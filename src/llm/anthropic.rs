//! Anthropic adapter.
//!
//! The messages API takes the system prompt as a top-level field, not an
//! inline message; that reshaping stays inside this adapter.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::pricing;
use super::provider::GenerationProvider;
use super::types::{Completion, CompletionRequest, Provider};
use crate::errors::ApiError;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub struct AnthropicClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl AnthropicClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: MessagesUsage,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Deserialize)]
struct MessagesUsage {
    input_tokens: i64,
    output_tokens: i64,
}

#[async_trait]
impl GenerationProvider for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ApiError> {
        let url = format!("{}/v1/messages", self.base_url);

        let mut system = None;
        let mut messages = Vec::with_capacity(request.messages.len());
        for message in &request.messages {
            if message.role == "system" {
                system = Some(message.content.clone());
            } else {
                messages.push(message.clone());
            }
        }

        let mut body = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": messages,
        });
        if let (Some(system), Some(obj)) = (system, body.as_object_mut()) {
            obj.insert("system".to_string(), json!(system));
        }

        let res = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "Anthropic messages error ({}): {}",
                status, text
            )));
        }

        let payload: MessagesResponse = res.json().await.map_err(ApiError::upstream)?;
        let text = payload
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| {
                ApiError::Upstream("Anthropic response carried no text content".to_string())
            })?;

        let tokens_used = payload.usage.input_tokens + payload.usage.output_tokens;
        Ok(Completion {
            text,
            tokens_used,
            estimated_cost: pricing::estimate(Provider::Anthropic, &request.model, tokens_used),
        })
    }
}
