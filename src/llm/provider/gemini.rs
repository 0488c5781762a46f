// src/llm/provider/gemini.rs
// Gemini provider using the Google AI API

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{FragmentStream, LlmProvider, Message, Role};

/// Gemini provider speaking the generativelanguage REST API
#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(anyhow!("Google API key is required"));
        }

        Ok(GeminiProvider {
            client: Client::new(),
            api_key,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model,
        })
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the API URL for a given method
    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            self.base_url, self.model, method, self.api_key
        )
    }

    /// Convert prior turns plus the new prompt to Gemini `contents`.
    /// System messages are dropped here; Gemini carries instructions inside
    /// the user/model turn structure rather than as a separate role.
    fn history_to_contents(prior_turns: &[Message], prompt: &str) -> Vec<Value> {
        let mut contents = Vec::new();

        for msg in prior_turns {
            let role = match msg.role {
                Role::User => "user",
                Role::Assistant => "model",
                Role::System => continue,
            };

            contents.push(json!({
                "role": role,
                "parts": [{"text": msg.content}]
            }));
        }

        contents.push(json!({
            "role": "user",
            "parts": [{"text": prompt}]
        }));

        contents
    }

    /// Pull the text delta out of one SSE `data:` payload, if it carries one.
    fn extract_text(data: &str) -> Option<String> {
        let json: Value = serde_json::from_str(data).ok()?;
        json.get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("text"))
            .and_then(|t| t.as_str())
            .map(|t| t.to_string())
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn stream(&self, prior_turns: Vec<Message>, prompt: String) -> Result<FragmentStream> {
        debug!(
            "Sending streaming request to Gemini with {} prior turns",
            prior_turns.len()
        );

        let contents = Self::history_to_contents(&prior_turns, &prompt);

        let request_body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": 1.0
            }
        });

        // Use streamGenerateContent endpoint
        let url = format!(
            "{}/models/{}:streamGenerateContent?key={}&alt=sse",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("Gemini API returned {}: {}", status, error_text));
        }

        // Parse the SSE byte stream into text fragments. Lines can split
        // across chunks, so they are reassembled through a buffer.
        let mut byte_stream = Box::pin(response.bytes_stream());
        let fragments = async_stream::stream! {
            let mut buffer = String::new();

            while let Some(chunk) = byte_stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));

                        while let Some(pos) = buffer.find('\n') {
                            let line = buffer[..pos].trim().to_string();
                            buffer.drain(..=pos);

                            if line.is_empty() || line.starts_with(':') {
                                continue;
                            }

                            if let Some(data) = line.strip_prefix("data: ") {
                                if let Some(text) = Self::extract_text(data) {
                                    yield Ok(text);
                                }
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(anyhow!("Stream error: {}", e));
                        return;
                    }
                }
            }
        };

        Ok(Box::new(Box::pin(fragments)))
    }

    async fn generate_once(&self, prompt: String) -> Result<String> {
        debug!("Sending single-shot request to Gemini");

        let request_body = json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": prompt}]
            }],
            "generationConfig": {
                "temperature": 1.0
            }
        });

        let response = self
            .client
            .post(self.api_url("generateContent"))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("Gemini API returned {}: {}", status, error_text));
        }

        let response_body: Value = response.json().await?;

        let content = response_body
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("text"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| anyhow!("No candidates in Gemini response"))?
            .to_string();

        let usage = response_body.get("usageMetadata");
        let tokens_input = usage
            .and_then(|u| u.get("promptTokenCount"))
            .and_then(|t| t.as_i64())
            .unwrap_or(0);
        let tokens_output = usage
            .and_then(|u| u.get("candidatesTokenCount"))
            .and_then(|t| t.as_i64())
            .unwrap_or(0);

        info!(
            "Gemini response: {} input tokens, {} output tokens",
            tokens_input, tokens_output
        );

        Ok(content)
    }
}

/// Mock tool definition (Gemini native format). Declared for the wire
/// protocol; never attached to generation requests.
pub fn tool_declarations() -> Value {
    json!([{
        "function_declarations": [{
            "name": "get_weather",
            "description": "Get the current weather in a given location",
            "parameters": {
                "type": "OBJECT",
                "properties": {
                    "location": {
                        "type": "STRING",
                        "description": "The city and state, e.g. San Francisco, CA"
                    }
                },
                "required": ["location"]
            }
        }]
    }])
}
