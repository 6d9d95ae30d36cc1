use async_trait::async_trait;
use reqwest::Client;

#[cfg(test)]
use mockall::automock;

use crate::config::GeminiConfig;
use crate::error::{NutriError, Result};
use crate::models::{GenerateRequest, GenerateResponse};

/// One-shot text generation call.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse>;
}

pub struct GeminiTransport {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiTransport {
    pub fn new(api_key: String, model: String, base_url: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(NutriError::Config("Gemini API key is empty".to_string()));
        }
        Ok(Self {
            client: Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(cfg: &GeminiConfig) -> Result<Self> {
        let api_key = cfg
            .credential()
            .ok_or_else(|| NutriError::Config("GEMINI_API_KEY is not set".to_string()))?;
        Self::new(api_key.to_string(), cfg.model.clone(), cfg.base_url.clone())
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl Transport for GeminiTransport {
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse> {
        tracing::debug!(model = %self.model, "Sending generateContent request");

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(req)
            .send()
            .await
            .map_err(|e| NutriError::Transport(format!("Failed to reach Gemini API: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(NutriError::Api(format!("HTTP {status}: {body}")));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            NutriError::Transport(format!("Failed to parse Gemini API response: {e}"))
        })?;

        if let Some(err) = &parsed.error {
            return Err(NutriError::Api(err.message.clone()));
        }
        Ok(parsed)
    }
}
