//! Language-model backed structured extraction

use crate::config::ExtractionConfig;
use action_primitives::{markup_to_text, ActionError, StructuredExtractor};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

const SYSTEM_PROMPT: &str = "You extract information from web pages. You are given a goal and \
the visible text of a page. Answer with a single JSON object holding exactly the information \
the goal asks for. Use null for anything the page does not contain. Do not invent data.";

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct OpenAiExtractor {
    client: Client,
    config: ExtractionConfig,
    api_key: String,
}

impl OpenAiExtractor {
    pub fn new(config: ExtractionConfig, api_key: impl Into<String>) -> Result<Self, ActionError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| {
                ActionError::Extraction(format!("failed to build HTTP client: {err}"))
            })?;
        Ok(Self {
            client,
            config,
            api_key: api_key.into(),
        })
    }

    /// Build a client when extraction is enabled and an API key is available.
    pub fn from_config(config: &ExtractionConfig) -> Result<Option<Self>, ActionError> {
        if !config.enabled {
            info!("Structured extraction disabled; extract steps return page excerpts");
            return Ok(None);
        }
        match config.api_key() {
            Some(key) => Self::new(config.clone(), key).map(Some),
            None => {
                info!(
                    env = %config.api_key_env,
                    "No extraction API key set; extract steps return page excerpts"
                );
                Ok(None)
            }
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        )
    }

    fn user_prompt(&self, goal: &str, markup: &str) -> String {
        let text = markup_to_text(markup);
        let content: String = text.chars().take(self.config.max_content_chars).collect();
        format!("Goal: {goal}\n\nPage content:\n{content}")
    }
}

#[async_trait]
impl StructuredExtractor for OpenAiExtractor {
    async fn extract(&self, goal: &str, page_markup: &str) -> Result<String, ActionError> {
        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            temperature: 0.0,
            response_format: ResponseFormat {
                r#type: "json_object".to_string(),
            },
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: self.user_prompt(goal, page_markup),
                },
            ],
        };

        debug!(target: "extraction", model = %self.config.model, goal, "Requesting extraction");
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| ActionError::Extraction(format!("request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(ActionError::Extraction(format!(
                "endpoint returned {status}: {text}"
            )));
        }

        let response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| ActionError::Extraction(format!("response invalid: {err}")))?;
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_text())
            .ok_or_else(|| ActionError::Extraction("response missing content".to_string()))?;

        Ok(normalize_answer(&content))
    }
}

/// Compact JSON when the answer holds a JSON object, else the trimmed text.
fn normalize_answer(content: &str) -> String {
    extract_json_object(content)
        .and_then(|candidate| serde_json::from_str::<Value>(&candidate).ok())
        .map(|value| value.to_string())
        .unwrap_or_else(|| content.trim().to_string())
}

/// First JSON object in a model reply: bare, fenced, or embedded in prose.
pub fn extract_json_object(raw: &str) -> Option<String> {
    if raw.trim_start().starts_with('{') {
        return Some(trim_symmetric(raw));
    }

    let fence = "```";
    if let Some(start) = raw.find(fence) {
        let after_fence = &raw[start + fence.len()..];
        let after_lang = after_fence.trim_start_matches(|c: char| c.is_alphanumeric() || c == '_');
        if let Some(end) = after_lang.find(fence) {
            let block = &after_lang[..end];
            if block.contains('{') {
                return Some(trim_symmetric(block));
            }
        }
    }

    let start = raw.find('{')?;
    let mut depth = 0i32;
    for (idx, ch) in raw[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(trim_symmetric(&raw[start..=start + idx]));
                }
            }
            _ => {}
        }
    }
    None
}

fn trim_symmetric(value: &str) -> String {
    value.trim().trim_matches('`').trim().to_string()
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    temperature: f32,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: ChatCompletionContent,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatCompletionContent {
    Text(String),
    Parts(Vec<ChatCompletionPart>),
}

impl ChatCompletionContent {
    fn as_text(&self) -> Option<String> {
        match self {
            ChatCompletionContent::Text(value) => Some(value.clone()),
            ChatCompletionContent::Parts(parts) => {
                let text = parts
                    .iter()
                    .filter_map(|part| part.text.as_ref())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("\n");
                (!text.is_empty()).then_some(text)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionPart {
    #[serde(default)]
    text: Option<String>,
}
