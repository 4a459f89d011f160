use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use vitals_agent::{AgentRegistry, Cache, HealthAgent, StatsCache, StatsFetcher};

mod middleware;
mod routes;
mod state;

/// Expired cache rows are swept every 6 hours; `get` hides them in the
/// meantime, so the interval only bounds table growth.
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vitals API",
        version = "0.1.0",
        description = "A2A gateway for the World Bank health statistics agent."
    ),
    paths(routes::health::health_check),
    components(schemas(HealthResponse))
)]
struct ApiDoc;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vitals_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Cache storage is optional: without DATABASE_URL the agent runs
    // uncached, it does not fail to start.
    let database_url = std::env::var("DATABASE_URL").ok();
    let cache = Arc::new(StatsCache::new(database_url));

    // Periodic sweep, detached from request handling. The first tick
    // fires immediately and doubles as the startup sweep.
    {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CACHE_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                cache.sweep().await;
            }
        });
    }

    let mut registry = AgentRegistry::new();
    registry.register(
        HealthAgent::ID,
        Arc::new(HealthAgent::new(StatsFetcher::new(Arc::clone(&cache) as Arc<dyn Cache>))),
    );
    tracing::info!(agents = ?registry.ids(), "registered agents");

    let generation_timeout = std::env::var("VITALS_GENERATION_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs);

    let app_state = state::AppState {
        registry: Arc::new(registry),
        http: reqwest::Client::new(),
        generation_timeout,
    };

    // CORS
    let cors_layer = middleware::cors::build_cors_layer();

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::a2a::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer),
        )
        .with_state(app_state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Vitals API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
