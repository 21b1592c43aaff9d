// Language model client
// One blocking request to an OpenAI-compatible chat completion endpoint

#[cfg(test)]
mod tests;

use std::time::Duration;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::{RagError, Result};

/// Instruction sent with every question
pub const SYSTEM_PROMPT: &str = "You are a research assistant. Answer the question concisely \
using ONLY the provided context. If the context does not contain enough information to \
answer, say so. When possible, cite the paper and page(s) the answer comes from.";

/// Something that turns a system and user prompt into a reply
pub trait ChatModel {
    /// # Errors
    /// Returns `RagError::Upstream` when the model cannot be reached or fails
    fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Build the system and user prompts for a question over retrieved context
#[inline]
pub fn build_prompts(context: &str, question: &str) -> (String, String) {
    (
        SYSTEM_PROMPT.to_string(),
        format!("Context:\n{}\n\nQuestion: {}", context, question),
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking chat completion client
#[derive(Debug, Clone)]
pub struct ChatClient {
    endpoint: String,
    model: String,
    api_key: String,
    agent: ureq::Agent,
}

impl ChatClient {
    /// Create a client, reading the API key from the configured environment variable
    ///
    /// # Errors
    /// Returns `RagError::Config` if the environment variable is not set
    #[inline]
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            RagError::Config(format!(
                "environment variable {} must hold the language model API key",
                config.api_key_env
            ))
        })?;
        Ok(Self::new(config, api_key))
    }

    #[inline]
    pub fn new(config: &LlmConfig, api_key: String) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();

        Self {
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
            agent,
        }
    }

    fn request(&self, system: &str, user: &str) -> anyhow::Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize chat request")?;

        debug!("Sending chat completion request to {}", self.endpoint);
        let response_text = self
            .agent
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| match e {
                ureq::Error::StatusCode(status) => {
                    anyhow!("chat completion request failed with HTTP {}", status)
                }
                other => anyhow!("chat completion request failed: {}", other),
            })?;

        let response: ChatResponse =
            serde_json::from_str(&response_text).context("Failed to parse chat response")?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("chat response contained no message"))
    }
}

impl ChatModel for ChatClient {
    #[inline]
    fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.request(system, user).map_err(|e| {
            warn!("Language model call failed: {:#}", e);
            RagError::Upstream(format!("{:#}", e))
        })
    }
}
