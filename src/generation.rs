//! Answer-synthesis provider abstraction and implementations.
//!
//! Defines the [`GenerationProvider`] trait and two concrete backends:
//! - **[`OpenAiGeneration`]** — OpenAI chat completions.
//! - **[`OllamaGeneration`]** — a local Ollama instance's `/api/generate` endpoint.
//!
//! Retry strategy matches the embedding providers: 429/5xx and network
//! errors retry with exponential backoff, other 4xx fail immediately.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::GenerationConfig;

/// Trait for answer-synthesis providers.
///
/// Given a question and the retrieved context passages, produce prose.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-3.5-turbo"`).
    fn model_name(&self) -> &str;

    /// Synthesize an answer to `question` from `passages`.
    async fn generate(&self, question: &str, passages: &[String]) -> Result<String>;
}

/// Assemble the synthesis prompt from retrieved passages and the question.
fn build_prompt(question: &str, passages: &[String]) -> String {
    let mut prompt = String::from("Context information is below.\n---------------------\n");
    for passage in passages {
        prompt.push_str(passage);
        prompt.push_str("\n\n");
    }
    prompt.push_str("---------------------\n");
    prompt.push_str(
        "Given the context information and not prior knowledge, answer the question.\n",
    );
    prompt.push_str("Question: ");
    prompt.push_str(question);
    prompt.push_str("\nAnswer: ");
    prompt
}

// ============ OpenAI Provider ============

/// Generation provider using the OpenAI chat completions API.
///
/// Requires the `OPENAI_API_KEY` environment variable to be set.
pub struct OpenAiGeneration {
    model: String,
    max_retries: u32,
    timeout_secs: u64,
}

impl OpenAiGeneration {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        if std::env::var("OPENAI_API_KEY").is_err() {
            bail!("OPENAI_API_KEY environment variable not set");
        }

        Ok(Self {
            model: config.model.clone(),
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl GenerationProvider for OpenAiGeneration {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, question: &str, passages: &[String]) -> Result<String> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": build_prompt(question, passages) }
            ],
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post("https://api.openai.com/v1/chat/completions")
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_chat_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err =
                            Some(anyhow::anyhow!("OpenAI API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Generation failed after retries")))
    }
}

fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices[0].message.content"))
}

// ============ Ollama Provider ============

/// Generation provider using a local Ollama instance.
///
/// Calls `POST /api/generate` with `stream: false` on the configured URL
/// (default: `http://localhost:11434`).
pub struct OllamaGeneration {
    model: String,
    url: String,
    max_retries: u32,
    timeout_secs: u64,
}

impl OllamaGeneration {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            model: config.model.clone(),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        }
    }
}

#[async_trait]
impl GenerationProvider for OllamaGeneration {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, question: &str, passages: &[String]) -> Result<String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let body = serde_json::json!({
            "model": self.model,
            "prompt": build_prompt(question, passages),
            "stream": false,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post(format!("{}/api/generate", self.url))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return json
                            .get("response")
                            .and_then(|r| r.as_str())
                            .map(|s| s.trim().to_string())
                            .ok_or_else(|| {
                                anyhow::anyhow!("Invalid Ollama response: missing response field")
                            });
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err =
                            Some(anyhow::anyhow!("Ollama API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Ollama API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(anyhow::anyhow!(
                        "Ollama connection error (is Ollama running at {}?): {}",
                        self.url,
                        e
                    ));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Ollama generation failed after retries")))
    }
}

/// Create the appropriate [`GenerationProvider`] based on configuration.
pub fn create_provider(config: &GenerationConfig) -> Result<Box<dyn GenerationProvider>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiGeneration::new(config)?)),
        "ollama" => Ok(Box::new(OllamaGeneration::new(config))),
        other => bail!("Unknown generation provider: {}", other),
    }
}
