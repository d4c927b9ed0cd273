//! Chat-completions client for OpenAI-compatible APIs (OpenAI, Ollama) and
//! Azure OpenAI deployments.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::infrastructure::config::{LlmConfig, LlmProvider};
use crate::infrastructure::ports::{
    FinishReason, LlmError, LlmPort, LlmRequest, LlmResponse, TokenUsage,
};

/// Default request timeout; completions for a full scene are slow.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Which URL layout and auth header the endpoint expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiFlavor {
    /// `{base}/v1/chat/completions` with an optional bearer token
    OpenAi,
    /// `{base}/openai/deployments/{model}/chat/completions?api-version=..`
    /// with an `api-key` header
    Azure { api_version: String },
}

/// Client for chat-completions endpoints.
///
/// Constructed once at startup and shared behind `Arc<dyn LlmPort>`.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    flavor: ApiFlavor,
}

impl OpenAiClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self::with_timeout(base_url, model, DEFAULT_TIMEOUT_SECS)
    }

    /// Create client with custom timeout.
    pub fn with_timeout(base_url: &str, model: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(
                    error = %e,
                    timeout_secs,
                    "Failed to build HTTP client, using defaults without timeout"
                );
                Client::new()
            });

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
            flavor: ApiFlavor::OpenAi,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
        self
    }

    pub fn with_flavor(mut self, flavor: ApiFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        let flavor = match config.provider {
            LlmProvider::OpenAi => ApiFlavor::OpenAi,
            LlmProvider::Azure => ApiFlavor::Azure {
                api_version: config.azure_api_version.clone(),
            },
        };
        Self::with_timeout(&config.base_url, &config.model, config.timeout_secs)
            .with_api_key(config.api_key.clone())
            .with_flavor(flavor)
    }

    fn endpoint(&self, model: &str) -> String {
        match &self.flavor {
            ApiFlavor::OpenAi => format!("{}/v1/chat/completions", self.base_url),
            ApiFlavor::Azure { api_version } => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.base_url, model, api_version
            ),
        }
    }
}

#[async_trait]
impl LlmPort for OpenAiClient {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());

        let api_request = OpenAIChatRequest {
            model: model.clone(),
            messages: build_messages(&request),
            max_tokens: request.max_tokens,
            stream: false,
        };

        let mut builder = self.client.post(self.endpoint(&model)).json(&api_request);
        if let Some(key) = &self.api_key {
            builder = match self.flavor {
                ApiFlavor::OpenAi => builder.bearer_auth(key),
                ApiFlavor::Azure { .. } => builder.header("api-key", key),
            };
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .map_err(|e| LlmError::RequestFailed(e.to_string()))?;
            return Err(LlmError::RequestFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        let api_response: OpenAIChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        convert_response(api_response)
    }
}

fn build_messages(request: &LlmRequest) -> Vec<OpenAIMessage> {
    request
        .messages
        .iter()
        .map(|msg| OpenAIMessage {
            role: msg.role.as_str().to_string(),
            content: Some(msg.content.clone()),
        })
        .collect()
}

fn convert_response(response: OpenAIChatResponse) -> Result<LlmResponse, LlmError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("No choices in LLM response".to_string()))?;

    let finish_reason = match choice.finish_reason.as_deref() {
        Some("stop") => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        None => FinishReason::Stop,
        Some(_) => FinishReason::Unknown,
    };

    Ok(LlmResponse {
        content: choice.message.content.unwrap_or_default(),
        finish_reason,
        usage: response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
    })
}

// =============================================================================
// OpenAI API types
// =============================================================================

#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize, Default)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::body::Bytes;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode, Uri};
    use axum::response::{IntoResponse, Response};
    use axum::Router;
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    use crate::infrastructure::ports::ChatMessage;

    #[derive(Debug, Clone)]
    struct Captured {
        uri: String,
        authorization: Option<String>,
        api_key: Option<String>,
        body: Value,
    }

    #[derive(Clone)]
    struct StubState {
        status: StatusCode,
        reply: Value,
        captured: Arc<Mutex<Vec<Captured>>>,
    }

    async fn stub_handler(
        State(state): State<StubState>,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let authorization = header("authorization");
        let api_key = header("api-key");
        let body = serde_json::from_slice(&body).expect("json body");
        let uri = uri.to_string();

        state.captured.lock().expect("lock").push(Captured {
            uri,
            authorization,
            api_key,
            body,
        });

        (state.status, axum::Json(state.reply.clone())).into_response()
    }

    async fn spawn_stub(
        status: StatusCode,
        reply: Value,
    ) -> (SocketAddr, Arc<Mutex<Vec<Captured>>>) {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            status,
            reply,
            captured: captured.clone(),
        };
        let router = Router::new().fallback(stub_handler).with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });

        (addr, captured)
    }

    fn completion(content: &str, finish_reason: &str) -> Value {
        json!({
            "choices": [{
                "message": { "role": "assistant", "content": content },
                "finish_reason": finish_reason
            }],
            "usage": { "prompt_tokens": 900, "completion_tokens": 1200, "total_tokens": 2100 }
        })
    }

    fn conversation() -> LlmRequest {
        LlmRequest::new(vec![
            ChatMessage::system("You are a world generator."),
            ChatMessage::user("World Name: Emberfall"),
        ])
    }

    #[tokio::test]
    async fn openai_flavor_posts_to_chat_completions_with_bearer_token() {
        let (addr, captured) =
            spawn_stub(StatusCode::OK, completion("{\"terrain\":{}}", "stop")).await;
        let client = OpenAiClient::new(&format!("http://{addr}/"), "llama3.2")
            .with_api_key(Some("sk-test".into()));

        let response = client.generate(conversation()).await.expect("completion");

        assert_eq!(response.content, "{\"terrain\":{}}");
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(2100));

        let captured = captured.lock().expect("lock");
        assert_eq!(captured.len(), 1);
        let call = &captured[0];
        assert_eq!(call.uri, "/v1/chat/completions");
        assert_eq!(call.authorization.as_deref(), Some("Bearer sk-test"));
        assert_eq!(call.body["model"], "llama3.2");
        assert_eq!(call.body["stream"], false);
        assert_eq!(call.body["messages"][0]["role"], "system");
        assert_eq!(call.body["messages"][1]["role"], "user");
        assert_eq!(call.body["messages"][1]["content"], "World Name: Emberfall");
        assert!(call.body.get("max_tokens").is_none());
    }

    #[tokio::test]
    async fn azure_flavor_targets_deployment_with_api_key_header() {
        let (addr, captured) = spawn_stub(StatusCode::OK, completion("ok", "length")).await;
        let client = OpenAiClient::new(&format!("http://{addr}"), "unused-default")
            .with_api_key(Some("azure-key".into()))
            .with_flavor(ApiFlavor::Azure {
                api_version: "2025-01-01-preview".into(),
            });

        let request = conversation()
            .with_model("gpt-4o-mini-eastus2")
            .with_max_tokens(Some(4000));
        let response = client.generate(request).await.expect("completion");

        assert_eq!(response.finish_reason, FinishReason::Length);

        let captured = captured.lock().expect("lock");
        let call = &captured[0];
        assert_eq!(
            call.uri,
            "/openai/deployments/gpt-4o-mini-eastus2/chat/completions?api-version=2025-01-01-preview"
        );
        assert_eq!(call.api_key.as_deref(), Some("azure-key"));
        assert!(call.authorization.is_none());
        assert_eq!(call.body["max_tokens"], 4000);
    }

    #[tokio::test]
    async fn non_success_status_surfaces_provider_message() {
        let (addr, captured) = spawn_stub(
            StatusCode::TOO_MANY_REQUESTS,
            json!({ "error": { "message": "Rate limit reached" } }),
        )
        .await;
        let client = OpenAiClient::new(&format!("http://{addr}"), "llama3.2");

        let err = client.generate(conversation()).await.expect_err("429");

        match err {
            LlmError::RequestFailed(message) => {
                assert!(message.starts_with("HTTP 429"));
                assert!(message.contains("Rate limit reached"));
            }
            other => panic!("expected RequestFailed, got {other:?}"),
        }
        // Single attempt, no retry.
        assert_eq!(captured.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn empty_choices_is_invalid_response() {
        let (addr, _captured) = spawn_stub(StatusCode::OK, json!({ "choices": [] })).await;
        let client = OpenAiClient::new(&format!("http://{addr}"), "llama3.2");

        let err = client.generate(conversation()).await.expect_err("no choices");

        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn filtered_completion_has_empty_content() {
        let reply = json!({
            "choices": [{ "message": { "role": "assistant", "content": null }, "finish_reason": "content_filter" }]
        });
        let (addr, _captured) = spawn_stub(StatusCode::OK, reply).await;
        let client = OpenAiClient::new(&format!("http://{addr}"), "llama3.2");

        let response = client.generate(conversation()).await.expect("completion");

        assert!(response.content.is_empty());
        assert_eq!(response.finish_reason, FinishReason::ContentFilter);
    }

    #[tokio::test]
    async fn configured_timeout_bounds_slow_provider() {
        async fn stall() -> StatusCode {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            StatusCode::OK
        }
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, Router::new().fallback(stall))
                .await
                .expect("serve");
        });
        let client = OpenAiClient::with_timeout(&format!("http://{addr}"), "llama3.2", 1);

        let started = std::time::Instant::now();
        let err = client.generate(conversation()).await.expect_err("timeout");

        assert!(matches!(err, LlmError::RequestFailed(_)));
        assert!(started.elapsed() < std::time::Duration::from_secs(4));
    }

    #[test]
    fn blank_api_key_is_ignored() {
        let client = OpenAiClient::new("http://localhost:11434", "llama3.2")
            .with_api_key(Some("   ".into()));
        assert!(client.api_key.is_none());
    }
}
