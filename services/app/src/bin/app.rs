//! services/app/src/bin/app.rs

use app_lib::{
    adapters::{BucketStorage, OAuthIdentityAdapter, RealtimeDbStore},
    config::Config,
    error::AppError,
    web::{
        photo_upload_handler, reading_handler, registration_handler, require_auth,
        show_map_handler, sign_in_handler, sign_out_handler, state::AppState,
        state::Sessions, upload_request_handler, view_handler, ApiDoc,
    },
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Service Adapters ---
    // One HTTP client shared by all three adapters.
    let http_client = reqwest::Client::new();

    let store = Arc::new(RealtimeDbStore::new(
        http_client.clone(),
        config.database_url.clone(),
    ));
    let identity = Arc::new(OAuthIdentityAdapter::new(
        http_client.clone(),
        config.google_userinfo_url.clone(),
        config.google_revoke_url.clone(),
        config.facebook_userinfo_url.clone(),
        config.facebook_revoke_url.clone(),
    ));
    let storage = Arc::new(BucketStorage::new(
        http_client,
        config.storage_bucket_url.clone(),
    ));

    // --- 3. Build the Shared AppState ---
    let app_state = AppState {
        store,
        identity,
        storage,
        config: config.clone(),
        sessions: Sessions::default(),
    };

    let allowed_origin = config
        .allowed_origin
        .parse::<HeaderValue>()
        .map_err(|e| AppError::Internal(format!("Invalid ALLOWED_ORIGIN: {e}")))?;
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // --- 4. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/sign-in", post(sign_in_handler))
        .route("/auth/sign-out", post(sign_out_handler))
        .route("/view", get(view_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/view/upload-request", post(upload_request_handler))
        .route("/view/map", post(show_map_handler))
        .route("/registration", post(registration_handler))
        .route("/registration/photo", post(photo_upload_handler))
        .route("/readings", post(reading_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete
    // application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
