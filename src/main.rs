use std::net::SocketAddr;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use pulse_api::handlers::{auth, health};
use pulse_api::middleware::{identity_middleware, jwt_auth_middleware, rate_limit_middleware};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, REDIS_HOST, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = pulse_api::config::config();
    tracing::info!("Starting Pulse API in {:?} mode", config.environment);

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("🚀 Pulse API server listening on http://{}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server");
}

fn app() -> Router {
    let cors = if pulse_api::config::config().security.enable_cors {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(auth_routes())
        .merge(health_data_routes())
        // Global middleware; identity must run before admission so the
        // authenticated tier applies
        .layer(from_fn(rate_limit_middleware))
        .layer(from_fn(identity_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn auth_routes() -> Router {
    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .route_layer(from_fn(jwt_auth_middleware));

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .merge(protected)
}

fn health_data_routes() -> Router {
    Router::new()
        .route(
            "/users/:user_id/health-data",
            post(health::create).get(health::list),
        )
        .route(
            "/users/:user_id/health-data/summary",
            get(health::summary),
        )
        .route_layer(from_fn(jwt_auth_middleware))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Pulse API",
            "version": version,
            "description": "Health metrics API with rate limiting, caching, and cursor pagination",
            "endpoints": {
                "home": "/ (public)",
                "auth": "/auth/register, /auth/login (public), /auth/me (protected)",
                "health_data": "/users/:user_id/health-data[/summary] (protected)",
            }
        }
    }))
}

async fn health_check() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match pulse_api::database::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
