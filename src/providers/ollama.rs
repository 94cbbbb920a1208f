use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::TranslationBackend;
use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;

/// Ollama client used as a plain text translator
#[derive(Debug)]
pub struct OllamaBackend {
    /// Base URL of the Ollama API
    base_url: String,
    /// Model name
    model: String,
    /// Prompt template with {source_language}, {target_language} and {text}
    prompt_template: String,
    /// HTTP client for making requests
    client: Client,
    /// Request timeout in seconds
    timeout_secs: u64,
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerationOptions,
}

#[derive(Debug, Serialize)]
struct GenerationOptions {
    temperature: f32,
}

/// Generation response from the Ollama API
#[derive(Debug, Deserialize)]
struct GenerationResponse {
    /// Generated text
    response: String,
    #[serde(default)]
    #[allow(dead_code)]
    done: bool,
}

impl OllamaBackend {
    /// Create a new client from provider settings
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            prompt_template: config.prompt.clone(),
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                // Ollama serves HTTP/1.1
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            backoff_base_ms: config.retry_backoff_ms,
        }
    }

    fn build_prompt(&self, text: &str, source_language: &str, target_language: &str) -> String {
        self.prompt_template
            .replace("{source_language}", source_language)
            .replace("{target_language}", target_language)
            .replace("{text}", text)
    }

    fn map_send_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            ProviderError::ConnectionError(e.to_string())
        } else {
            ProviderError::RequestFailed(e.to_string())
        }
    }
}

#[async_trait]
impl TranslationBackend for OllamaBackend {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerationRequest {
            model: &self.model,
            prompt: self.build_prompt(text, source_language, target_language),
            stream: false,
            options: GenerationOptions { temperature: 0.1 },
        };

        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.max_retries {
            match self.client.post(&url).json(&request).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let parsed: GenerationResponse = response
                            .json()
                            .await
                            .map_err(|e| ProviderError::ParseError(e.to_string()))?;
                        return Ok(parsed.response.trim().to_string());
                    }

                    let message = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to get error response text".to_string());
                    let api_error = ProviderError::ApiError {
                        status_code: status.as_u16(),
                        message,
                    };

                    if status.as_u16() == 429 {
                        last_error = Some(ProviderError::RateLimitExceeded(api_error.to_string()));
                    } else if status.is_server_error() {
                        error!("Ollama API error - attempt {}/{}: {}", attempt + 1, self.max_retries + 1, api_error);
                        last_error = Some(api_error);
                    } else {
                        // Client errors are not retried
                        return Err(api_error);
                    }
                }
                Err(e) => {
                    let send_error = self.map_send_error(e);
                    debug!("Ollama request failed - attempt {}/{}: {}", attempt + 1, self.max_retries + 1, send_error);
                    last_error = Some(send_error);
                }
            }

            attempt += 1;

            if attempt <= self.max_retries {
                let backoff_ms = self.backoff_base_ms * (1u64 << (attempt - 1).min(10));
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ProviderError::RequestFailed(format!(
                "Ollama request failed after {} attempts",
                self.max_retries + 1
            ))
        }))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::ApiError {
                status_code: response.status().as_u16(),
                message: "Ollama version check failed".to_string(),
            })
        }
    }
}
