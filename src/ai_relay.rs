//! Relay for the trail-assistant chat. The browser never sees the upstream
//! API key; requests land here, get reshaped into the upstream chat format
//! and forwarded, and the reply comes back with the updated history so the
//! client stays stateless.

use axum::{http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::data_formats::ApiResponse;
use crate::errors::RequestError;
use crate::JsonResponse;

const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful hiking assistant. Answer questions about trails, gear \
     and trip planning concisely.";

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub upstream_url: String,
    pub api_key: String,
    pub model: String,
}

impl RelayConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(RelayConfig {
            upstream_url: std::env::var("RELAY_UPSTREAM_URL")
                .map_err(|_| anyhow::anyhow!("RELAY_UPSTREAM_URL is not set"))?,
            api_key: std::env::var("RELAY_API_KEY")
                .map_err(|_| anyhow::anyhow!("RELAY_API_KEY is not set"))?,
            model: std::env::var("RELAY_MODEL").unwrap_or_else(|_| "glm-4-flash".to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    /// Prior turns as [user, assistant] pairs, oldest first.
    #[serde(default)]
    pub history: Vec<[String; 2]>,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub history: Vec<[String; 2]>,
}

/// Splices system prompt, history pairs and the new prompt into the flat
/// message list the upstream chat API expects.
pub fn build_messages(request: &ChatRequest) -> Vec<serde_json::Value> {
    let system = request
        .system
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);
    let mut messages = vec![json!({"role": "system", "content": system})];
    for [user, assistant] in &request.history {
        messages.push(json!({"role": "user", "content": user}));
        messages.push(json!({"role": "assistant", "content": assistant}));
    }
    messages.push(json!({"role": "user", "content": request.prompt}));
    messages
}

pub fn build_payload(config: &RelayConfig, request: &ChatRequest) -> serde_json::Value {
    let mut payload = json!({
        "model": config.model,
        "messages": build_messages(request),
    });
    if let Some(temperature) = request.temperature {
        payload["temperature"] = json!(temperature);
    }
    if let Some(top_p) = request.top_p {
        payload["top_p"] = json!(top_p);
    }
    if let Some(max_tokens) = request.max_tokens {
        payload["max_tokens"] = json!(max_tokens);
    }
    payload
}

fn extract_reply(body: &serde_json::Value) -> Option<String> {
    body.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

pub async fn chat(
    Extension(config): Extension<RelayConfig>,
    Extension(client): Extension<reqwest::Client>,
    Json(request): Json<ChatRequest>,
) -> Result<JsonResponse<ApiResponse<ChatResponse>>, RequestError> {
    if request.prompt.trim().is_empty() {
        return Err(RequestError::Validation("Prompt must not be empty"));
    }

    let payload = build_payload(&config, &request);
    let upstream = client
        .post(&config.upstream_url)
        .bearer_auth(&config.api_key)
        .json(&payload)
        .send()
        .await
        .map_err(|e| {
            tracing::error!("relay upstream request failed: {e}");
            RequestError::ServerError
        })?;

    let status = upstream.status();
    let body: serde_json::Value = upstream.json().await.map_err(|e| {
        tracing::error!("relay upstream returned non-JSON body: {e}");
        RequestError::ServerError
    })?;
    if !status.is_success() {
        tracing::error!(%status, "relay upstream rejected the request: {body}");
        return Err(RequestError::ServerError);
    }

    let response = extract_reply(&body).ok_or_else(|| {
        tracing::error!("relay upstream reply had no message content: {body}");
        RequestError::ServerError
    })?;

    let mut history = request.history;
    history.push([request.prompt, response.clone()]);

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(ChatResponse { response, history })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RelayConfig {
        RelayConfig {
            upstream_url: "http://localhost/v1/chat/completions".to_string(),
            api_key: "k".to_string(),
            model: "glm-4-flash".to_string(),
        }
    }

    #[test]
    fn history_pairs_are_spliced_in_order() {
        let request = ChatRequest {
            prompt: "and gloves?".to_string(),
            history: vec![["what boots?".to_string(), "stiff soles".to_string()]],
            system: None,
            temperature: None,
            top_p: None,
            max_tokens: None,
        };
        let messages = build_messages(&request);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"], "what boots?");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[3]["content"], "and gloves?");
    }

    #[test]
    fn sampling_knobs_are_forwarded_only_when_set() {
        let mut request = ChatRequest {
            prompt: "hi".to_string(),
            history: vec![],
            system: None,
            temperature: Some(0.2),
            top_p: None,
            max_tokens: Some(256),
        };
        let payload = build_payload(&config(), &request);
        assert_eq!(payload["temperature"], 0.2);
        assert!(payload.get("top_p").is_none());
        assert_eq!(payload["max_tokens"], 256);

        request.temperature = None;
        request.max_tokens = None;
        let payload = build_payload(&config(), &request);
        assert!(payload.get("temperature").is_none());
        assert!(payload.get("max_tokens").is_none());
    }

    #[test]
    fn reply_extraction_reads_the_first_choice() {
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "bring layers"}}]
        });
        assert_eq!(extract_reply(&body).as_deref(), Some("bring layers"));
        assert!(extract_reply(&serde_json::json!({})).is_none());
    }
}
