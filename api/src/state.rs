use std::sync::Arc;
use std::time::Duration;

use vitals_agent::AgentRegistry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<AgentRegistry>,
    /// Shared outbound HTTP client for push-notification webhooks.
    /// Built once at startup so deliveries reuse its connection pool.
    pub http: reqwest::Client,
    /// Optional ceiling on a single agent generation. Unset by default;
    /// a breached ceiling surfaces as a generation error, not a
    /// transport failure.
    pub generation_timeout: Option<Duration>,
}
