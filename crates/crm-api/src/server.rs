//! HTTP API Server
//!
//! Builds the axum router with its layers and runs it until shutdown.

use std::any::Any;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any as AnyOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crm_core::{ApiConfig, Assistant};
use crm_hubspot::HubSpotClient;

use crate::error::{ApiError, Result};
use crate::routes::routes;
use crate::shutdown::{Shutdown, ShutdownReason};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub hubspot: Arc<HubSpotClient>,
    pub assistant: Arc<Assistant>,
}

impl AppState {
    pub fn new(hubspot: HubSpotClient, assistant: Assistant) -> Self {
        Self {
            hubspot: Arc::new(hubspot),
            assistant: Arc::new(assistant),
        }
    }
}

/// Full application router: API routes, optional static files and layers
pub fn build_router(state: AppState, config: &ApiConfig, shutdown: &Shutdown) -> Router {
    let mut router = routes();
    if let Some(dir) = config.static_dir.as_deref() {
        info!("Serving static files from: {}", dir);
        router = router.fallback_service(ServeDir::new(dir));
    }
    with_layers(router.with_state(state), config, shutdown)
}

/// Request id, tracing, CORS and panic recovery
pub fn with_layers(router: Router, config: &ApiConfig, shutdown: &Shutdown) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(cors_layer(config))
            .layer(CatchPanicLayer::custom(panic_response(shutdown.clone()))),
    )
}

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let Some(origins) = config.allowed_origins.as_ref() else {
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin)
}

/// 500 envelope for a panicking handler; the panic also starts shutdown
fn panic_response(
    shutdown: Shutdown,
) -> impl Fn(Box<dyn Any + Send + 'static>) -> Response + Clone + Send + Sync + 'static {
    move |panic| {
        let details = if let Some(message) = panic.downcast_ref::<String>() {
            message.clone()
        } else if let Some(message) = panic.downcast_ref::<&str>() {
            message.to_string()
        } else {
            "unknown panic payload".to_string()
        };
        error!("Request handler panicked: {}", details);
        shutdown.trigger(ShutdownReason::Panic);
        ApiError::Internal(details).into_response()
    }
}

/// Serve until shutdown is triggered
///
/// In-flight requests get `grace` to finish once shutdown starts; past that
/// the server is abandoned and [`ApiError::ForcedShutdown`] is returned.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: Shutdown,
    grace: Duration,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("HTTP API listening on {}", addr);
    info!("Health check: http://{}/health", addr);

    let signal = shutdown.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let reason = signal.triggered().await;
            warn!("Shutting down ({}), draining in-flight requests", reason);
        })
        .into_future();

    let deadline = async {
        shutdown.triggered().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => {
            result?;
            info!("Server closed successfully");
            Ok(())
        }
        _ = deadline => {
            error!("Forced shutdown after {}s timeout", grace.as_secs());
            Err(ApiError::ForcedShutdown(grace.as_secs()))
        }
    }
}

/// Bind `host:port` from the config and serve until shutdown
pub async fn start_server(config: &ApiConfig, state: AppState, shutdown: Shutdown) -> Result<()> {
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    let app = build_router(state, config, &shutdown);
    serve(
        listener,
        app,
        shutdown,
        Duration::from_secs(config.shutdown_grace_secs),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{app_state, llm_completion};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use serde_json::{json, Value as JsonValue};
    use tower::ServiceExt;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn boom() -> &'static str {
        panic!("deal cache poisoned")
    }

    #[tokio::test]
    async fn test_panic_becomes_500_and_triggers_shutdown() {
        let shutdown = Shutdown::new();
        let router: Router = Router::new().route("/boom", get(boom));
        let app = with_layers(router, &ApiConfig::default(), &shutdown);

        let response = app
            .oneshot(Request::get("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: JsonValue = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Internal server error");
        assert!(body["details"].as_str().unwrap().contains("deal cache poisoned"));
        assert_eq!(shutdown.reason(), Some(ShutdownReason::Panic));
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let shutdown = Shutdown::new();
        let router: Router = Router::new().route("/ping", get(|| async { "pong" }));
        let app = with_layers(router, &ApiConfig::default(), &shutdown);

        let response = app
            .oneshot(
                Request::get("/ping")
                    .header("x-request-id", "req-7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "req-7");
    }

    #[tokio::test]
    async fn test_graceful_shutdown_when_idle() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = Shutdown::new();
        let router: Router = Router::new().route("/ping", get(|| async { "pong" }));
        let handle = tokio::spawn(serve(listener, router, shutdown.clone(), Duration::from_secs(5)));

        shutdown.trigger(ShutdownReason::Terminate);
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_forced_shutdown_after_grace() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        let router: Router = Router::new().route(
            "/hang",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                "late"
            }),
        );
        let handle = tokio::spawn(serve(
            listener,
            router,
            shutdown.clone(),
            Duration::from_millis(200),
        ));

        let client = tokio::spawn(reqwest::get(format!("http://{}/hang", addr)));
        tokio::time::sleep(Duration::from_millis(200)).await;
        shutdown.trigger(ShutdownReason::Interrupt);

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(ApiError::ForcedShutdown(_))));
        client.abort();
    }

    #[tokio::test]
    async fn test_chat_tool_round_trip_over_loopback() {
        let hubspot = MockServer::start().await;
        let llm = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/crm/v3/objects/deals/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "42",
                "properties": {"dealname": "Pro Plan", "amount": "99", "dealstage": "closedwon"}
            })))
            .expect(1)
            .mount(&hubspot)
            .await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("tool_call_id"))
            .and(body_string_contains("Pro Plan"))
            .respond_with(llm_completion(json!({
                "role": "assistant",
                "content": "Deal 42 is Pro Plan, worth 99, closed won."
            })))
            .expect(1)
            .mount(&llm)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("\"tool_choice\":\"auto\""))
            .respond_with(llm_completion(json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {
                        "name": "DealsTool",
                        "arguments": "{\"action\":\"getDealById\",\"dealId\":\"42\"}"
                    }
                }]
            })))
            .expect(1)
            .mount(&llm)
            .await;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let gateway_url = format!("http://{}", addr);

        let shutdown = Shutdown::new();
        let app = build_router(
            app_state(&hubspot.uri(), &llm.uri(), &gateway_url),
            &ApiConfig::default(),
            &shutdown,
        );
        let server = tokio::spawn(serve(listener, app, shutdown.clone(), Duration::from_secs(5)));

        let response = reqwest::Client::new()
            .post(format!("{}/api/chat", gateway_url))
            .json(&json!({"messages": [{"role": "user", "content": "What is deal 42?"}]}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        let body: JsonValue = response.json().await.unwrap();
        assert_eq!(body, json!({"content": "Deal 42 is Pro Plan, worth 99, closed won."}));

        shutdown.trigger(ShutdownReason::Requested);
        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
