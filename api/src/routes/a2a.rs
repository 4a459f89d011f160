use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use uuid::Uuid;

use vitals_core::normalize;
use vitals_core::protocol::{JSONRPC_VERSION, RpcError, RpcResponse, TaskResult};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/a2a/agent/{agent_id}", post(a2a_post))
}

/// A2A gateway endpoint. Core invariant: once the body has been read,
/// the HTTP status is always 200 and the payload is always a JSON-RPC
/// envelope. Many A2A clients treat non-200 as a transport failure, so
/// protocol-level conditions must stay inside the envelope.
async fn a2a_post(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    body: Bytes,
) -> Response {
    let envelope = match handle(&state, &agent_id, &body).await {
        Ok(envelope) => envelope,
        // Faulted: anything not already converted to a typed error.
        Err(fault) => {
            tracing::error!(event = "a2a_unhandled_fault", agent_id = %agent_id, error = %fault);
            RpcResponse::failure(Value::Null, RpcError::internal(Some(fault)))
        }
    };
    (StatusCode::OK, Json(envelope)).into_response()
}

async fn handle(state: &AppState, agent_id: &str, body: &[u8]) -> Result<RpcResponse, String> {
    // Parse. No id can be recovered from an unparseable body, so the
    // error envelope echoes null.
    let request: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(event = "a2a_parse_error", agent_id = %agent_id, error = %err);
            return Ok(RpcResponse::failure(
                Value::Null,
                RpcError::parse_error(err.to_string()),
            ));
        }
    };

    // The request id is resolved before validation so every subsequent
    // response, success or error, echoes it.
    let request_id = request
        .get("id")
        .filter(|id| !id.is_null())
        .cloned()
        .unwrap_or_else(|| Value::String(Uuid::new_v4().to_string()));

    // Validate. An absent version tag is tolerated; a present one must
    // be exactly "2.0".
    let version_ok = match request.get("jsonrpc") {
        None => true,
        Some(Value::String(v)) => v == JSONRPC_VERSION,
        Some(_) => false,
    };
    if !version_ok {
        return Ok(RpcResponse::failure(request_id, RpcError::invalid_request()));
    }

    // Resolve agent.
    let Some(agent) = state.registry.get(agent_id) else {
        tracing::warn!(event = "a2a_agent_not_found", agent_id = %agent_id);
        return Ok(RpcResponse::failure(
            request_id,
            RpcError::agent_not_found(agent_id, state.registry.ids()),
        ));
    };

    // Normalize and dispatch.
    let params = request.get("params").cloned().unwrap_or_else(|| json!({}));
    let raw_messages: Vec<Value> = match params.get("messages") {
        Some(Value::Array(list)) => list.clone(),
        _ => params.get("message").cloned().map(|m| vec![m]).unwrap_or_default(),
    };
    let messages = normalize::normalize(&raw_messages);

    let generation = agent.generate(&messages);
    let outcome = match state.generation_timeout {
        Some(limit) => match tokio::time::timeout(limit, generation).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(event = "a2a_generation_timeout", agent_id = %agent_id);
                return Ok(RpcResponse::failure(
                    request_id,
                    RpcError::generation_error(format!(
                        "agent generation timed out after {}s",
                        limit.as_secs()
                    )),
                ));
            }
        },
        None => generation.await,
    };

    let reply = match outcome {
        Ok(reply) => reply,
        Err(err) => {
            tracing::warn!(event = "a2a_generation_error", agent_id = %agent_id, error = %err);
            return Ok(RpcResponse::failure(
                request_id,
                RpcError::generation_error(err.to_string()),
            ));
        }
    };

    // A reply that yields no text after every extraction strategy is a
    // generation failure too.
    let Some(agent_text) = extract_text(&reply) else {
        return Ok(RpcResponse::failure(
            request_id,
            RpcError::generation_error("agent returned no usable response text"),
        ));
    };

    // Shape the task result.
    let task_id = string_param(&params, "taskId").unwrap_or_else(new_id);
    let context_id = string_param(&params, "contextId").unwrap_or_else(new_id);
    let task = TaskResult::completed(agent_id, &agent_text, task_id, context_id, &messages);
    let result = serde_json::to_value(task).map_err(|err| err.to_string())?;

    spawn_push_notification(&state.http, &params, &request_id, &result);

    Ok(RpcResponse::success(request_id, result))
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn string_param(params: &Value, key: &str) -> Option<String> {
    params.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Pull displayable text out of an agent reply. Agent runtimes have
/// returned several shapes over time; strategies are tried in order and
/// only a non-empty trimmed string counts.
fn extract_text(reply: &Value) -> Option<String> {
    let candidates = [
        reply.as_str(),
        reply.get("text").and_then(Value::as_str),
        reply.get("content").and_then(Value::as_str),
        reply.get("message").and_then(Value::as_str),
        reply
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str),
    ];
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

/// Webhook destination for a non-blocking request: the configured URL
/// plus an optional bearer token. `None` when the request is blocking,
/// has no push configuration, or the URL does not parse.
fn push_target(params: &Value) -> Option<(String, Option<String>)> {
    let config = params.get("configuration");
    let blocking = config
        .and_then(|c| c.get("blocking"))
        .and_then(Value::as_bool);
    if blocking != Some(false) {
        return None;
    }
    let push = config.and_then(|c| c.get("pushNotificationConfig"))?;
    let url = push.get("url").and_then(Value::as_str)?;
    if url::Url::parse(url).is_err() {
        tracing::warn!(event = "push_notification_invalid_url", url = %url);
        return None;
    }
    let token = push
        .get("token")
        .and_then(Value::as_str)
        .map(str::to_string);
    Some((url.to_string(), token))
}

/// Fire-and-forget webhook delivery of the success envelope. The task
/// is detached from the response path: delivery failure is logged and
/// never retried, and the caller never waits on it. Reuses the
/// process-wide client so deliveries share its connection pool.
fn spawn_push_notification(
    http: &reqwest::Client,
    params: &Value,
    request_id: &Value,
    result: &Value,
) {
    let Some((url, token)) = push_target(params) else {
        return;
    };
    let envelope = json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": request_id,
        "result": result,
    });
    let http = http.clone();

    tokio::spawn(async move {
        let mut request = http.post(&url).json(&envelope);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        match request.send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!(event = "push_notification_sent", url = %url);
            }
            Ok(resp) => {
                tracing::warn!(
                    event = "push_notification_rejected",
                    url = %url,
                    status = resp.status().as_u16()
                );
            }
            Err(err) => {
                tracing::warn!(event = "push_notification_failed", url = %url, error = %err);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use vitals_agent::agent::{Agent, GenerateError};
    use vitals_agent::registry::AgentRegistry;
    use vitals_core::normalize::ChatMessage;

    use super::*;

    /// Echoes the first message back so tests can observe what the
    /// normalizer produced.
    struct EchoAgent;

    #[async_trait]
    impl Agent for EchoAgent {
        fn name(&self) -> &str {
            "Echo"
        }

        fn description(&self) -> &str {
            "echoes input"
        }

        async fn generate(&self, messages: &[ChatMessage]) -> Result<Value, GenerateError> {
            Ok(json!({"text": format!("echo: {}", messages[0].content)}))
        }
    }

    struct FailingAgent;

    #[async_trait]
    impl Agent for FailingAgent {
        fn name(&self) -> &str {
            "Failing"
        }

        fn description(&self) -> &str {
            "always fails"
        }

        async fn generate(&self, _messages: &[ChatMessage]) -> Result<Value, GenerateError> {
            Err(GenerateError::Agent(
                "Country 'Wakanda' not recognized".to_string(),
            ))
        }
    }

    struct ShapelessAgent;

    #[async_trait]
    impl Agent for ShapelessAgent {
        fn name(&self) -> &str {
            "Shapeless"
        }

        fn description(&self) -> &str {
            "returns an unusable value"
        }

        async fn generate(&self, _messages: &[ChatMessage]) -> Result<Value, GenerateError> {
            Ok(json!({"payload": 42}))
        }
    }

    struct SleepyAgent;

    #[async_trait]
    impl Agent for SleepyAgent {
        fn name(&self) -> &str {
            "Sleepy"
        }

        fn description(&self) -> &str {
            "never answers in time"
        }

        async fn generate(&self, _messages: &[ChatMessage]) -> Result<Value, GenerateError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(json!({"text": "too late"}))
        }
    }

    fn test_state(generation_timeout: Option<Duration>) -> AppState {
        let mut registry = AgentRegistry::new();
        registry.register("echoAgent", Arc::new(EchoAgent));
        registry.register("failingAgent", Arc::new(FailingAgent));
        registry.register("shapelessAgent", Arc::new(ShapelessAgent));
        registry.register("sleepyAgent", Arc::new(SleepyAgent));
        AppState {
            registry: Arc::new(registry),
            http: reqwest::Client::new(),
            generation_timeout,
        }
    }

    async fn post_body(agent_id: &str, body: &str) -> (StatusCode, Value) {
        let app = router().with_state(test_state(None));
        post_to(app, agent_id, body).await
    }

    async fn post_to(
        app: Router<()>,
        agent_id: &str,
        body: &str,
    ) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::post(format!("/a2a/agent/{agent_id}"))
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn invalid_json_yields_parse_error_with_http_200() {
        let (status, body) = post_body("echoAgent", "{ invalid json }").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["id"], Value::Null);
        assert_eq!(body["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn wrong_jsonrpc_version_yields_invalid_request() {
        let (status, body) = post_body(
            "echoAgent",
            r#"{"jsonrpc": "1.0", "id": "req-7", "params": {}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"]["code"], -32600);
        // The supplied id is echoed even on protocol errors.
        assert_eq!(body["id"], "req-7");
    }

    #[tokio::test]
    async fn missing_jsonrpc_field_is_tolerated() {
        let (status, body) = post_body(
            "echoAgent",
            r#"{"id": "req-8", "params": {"messages": [{"role": "user", "content": "hi"}]}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "req-8");
        assert!(body.get("error").is_none() || body["error"].is_null());
        assert_eq!(
            body["result"]["status"]["message"]["parts"][0]["text"],
            "echo: hi"
        );
    }

    #[tokio::test]
    async fn unknown_agent_yields_not_found_with_available_agents() {
        let (status, body) = post_body(
            "ghostAgent",
            r#"{"jsonrpc": "2.0", "id": 1, "params": {}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"]["code"], -32000);
        assert_eq!(body["id"], 1);
        assert_eq!(
            body["error"]["data"]["availableAgents"],
            json!(["echoAgent", "failingAgent", "shapelessAgent", "sleepyAgent"])
        );
    }

    #[tokio::test]
    async fn happy_path_returns_a_completed_task() {
        let (status, body) = post_body(
            "echoAgent",
            r#"{"jsonrpc": "2.0", "id": "req-1",
                "params": {"messages": [{"role": "user", "content": "Hello"}]}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "req-1");

        let result = &body["result"];
        assert_eq!(result["kind"], "task");
        assert_eq!(result["status"]["state"], "completed");
        assert_eq!(result["status"]["message"]["role"], "agent");
        assert_eq!(
            result["status"]["message"]["parts"][0]["text"],
            "echo: Hello"
        );
        assert_eq!(result["artifacts"][0]["name"], "echoAgentResponse");

        // History: the input followed by exactly one agent message.
        let history = result["history"].as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["role"], "user");
        assert_eq!(history[1]["role"], "agent");
    }

    #[tokio::test]
    async fn empty_params_dispatch_the_synthetic_greeting() {
        let (status, body) = post_body("echoAgent", r#"{"jsonrpc": "2.0"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["result"]["status"]["message"]["parts"][0]["text"],
            "echo: Hello"
        );
        // No id supplied: one is generated and echoed.
        assert!(body["id"].is_string());
    }

    #[tokio::test]
    async fn single_message_param_is_accepted() {
        let (_, body) = post_body(
            "echoAgent",
            r#"{"jsonrpc": "2.0", "id": 5,
                "params": {"message": {"role": "user", "content": "solo"}}}"#,
        )
        .await;
        assert_eq!(
            body["result"]["status"]["message"]["parts"][0]["text"],
            "echo: solo"
        );
    }

    #[tokio::test]
    async fn supplied_task_and_context_ids_are_echoed() {
        let (_, body) = post_body(
            "echoAgent",
            r#"{"jsonrpc": "2.0", "id": 2,
                "params": {"taskId": "task-9", "contextId": "ctx-9",
                           "messages": [{"role": "user", "content": "X"}]}}"#,
        )
        .await;
        assert_eq!(body["result"]["id"], "task-9");
        assert_eq!(body["result"]["contextId"], "ctx-9");
    }

    #[tokio::test]
    async fn agent_failure_yields_generation_error() {
        let (status, body) = post_body(
            "failingAgent",
            r#"{"jsonrpc": "2.0", "id": 3,
                "params": {"messages": [{"role": "user", "content": "HIV in Wakanda"}]}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"]["code"], -32001);
        assert_eq!(body["error"]["message"], "Agent generation error");
        assert!(
            body["error"]["data"]["details"]
                .as_str()
                .unwrap()
                .contains("Wakanda")
        );
    }

    #[tokio::test]
    async fn unusable_reply_shape_is_a_generation_error() {
        let (_, body) = post_body(
            "shapelessAgent",
            r#"{"jsonrpc": "2.0", "id": 4, "params": {}}"#,
        )
        .await;
        assert_eq!(body["error"]["code"], -32001);
    }

    #[tokio::test]
    async fn generation_timeout_ceiling_is_enforced() {
        let app = router().with_state(test_state(Some(Duration::from_millis(50))));
        let (status, body) = post_to(
            app,
            "sleepyAgent",
            r#"{"jsonrpc": "2.0", "id": 6, "params": {}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"]["code"], -32001);
        assert!(
            body["error"]["data"]["details"]
                .as_str()
                .unwrap()
                .contains("timed out")
        );
    }

    #[test]
    fn extract_text_tries_shapes_in_order() {
        assert_eq!(extract_text(&json!("plain")), Some("plain".to_string()));
        assert_eq!(
            extract_text(&json!({"text": " padded "})),
            Some("padded".to_string())
        );
        assert_eq!(
            extract_text(&json!({"content": "from content"})),
            Some("from content".to_string())
        );
        assert_eq!(
            extract_text(&json!({"message": "from message"})),
            Some("from message".to_string())
        );
        assert_eq!(
            extract_text(&json!({"choices": [{"message": {"content": "nested"}}]})),
            Some("nested".to_string())
        );
        assert_eq!(extract_text(&json!({"text": "   "})), None);
        assert_eq!(extract_text(&json!({"payload": 42})), None);
        assert_eq!(extract_text(&json!(null)), None);
    }

    #[test]
    fn push_target_requires_an_explicitly_non_blocking_request() {
        let push = json!({"url": "https://example.com/hook"});
        // Absent or true blocking flag: no webhook.
        assert_eq!(
            push_target(&json!({"configuration": {"pushNotificationConfig": push}})),
            None
        );
        assert_eq!(
            push_target(&json!({
                "configuration": {"blocking": true, "pushNotificationConfig": push}
            })),
            None
        );
        assert_eq!(
            push_target(&json!({
                "configuration": {"blocking": false, "pushNotificationConfig": push}
            })),
            Some(("https://example.com/hook".to_string(), None))
        );
    }

    #[test]
    fn push_target_passes_the_token_through_and_rejects_bad_urls() {
        assert_eq!(
            push_target(&json!({
                "configuration": {
                    "blocking": false,
                    "pushNotificationConfig": {
                        "url": "https://example.com/hook",
                        "token": "secret-1"
                    }
                }
            })),
            Some((
                "https://example.com/hook".to_string(),
                Some("secret-1".to_string())
            ))
        );
        // Unparseable URL or missing config: no webhook.
        assert_eq!(
            push_target(&json!({
                "configuration": {
                    "blocking": false,
                    "pushNotificationConfig": {"url": "not a url"}
                }
            })),
            None
        );
        assert_eq!(push_target(&json!({"configuration": {"blocking": false}})), None);
        assert_eq!(push_target(&json!({})), None);
    }
}
