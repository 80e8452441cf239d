//! Campus API server
//!
//! Loads configuration and signing keys, picks an identity store, and
//! serves the auth routes behind the per-client rate limiter. Startup
//! failures are reported through `anyhow` and stop the process.

use auth::middleware::rate_limit;
use auth::{
    AccountGuard, AuthAppState, AuthConfig, AuthError, Email, InMemoryIdentityRepository,
    LockoutStore, PgIdentityRepository, TokenCodec, UserRole, auth_router,
};
use axum::{
    Json, Router, http,
    http::{Method, header},
    middleware::from_fn_with_state,
    routing::get,
};
use platform::password::{ClearTextPassword, CredentialHasher};
use platform::rate_limit::SlidingWindowLimiter;
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "campus_api=info,auth=info,platform=info,security=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration and keys: any failure here stops the process
    let config =
        AuthConfig::from_env().map_err(|e| AuthError::ConfigurationFatal(e.to_string()))?;
    tracing::info!(?config, "Auth configuration loaded");

    let codec = TokenCodec::load(
        &config.private_key_path,
        &config.public_key_path,
        config.token_ttl,
    )
    .await
    .map_err(AuthError::from)?;
    let codec = Arc::new(codec);
    tracing::info!("Token signing keys loaded");

    let hasher = Arc::new(CredentialHasher::new(
        config.password_pepper.clone(),
        config.hash_cost,
    )?);
    let guard = AccountGuard::new(config.lockout, Arc::new(LockoutStore::new()));

    let limiter = Arc::new(SlidingWindowLimiter::new(config.rate_limit.clone()));
    spawn_rate_limit_purge(limiter.clone());

    // Identity store
    let auth_routes = match env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;
            tracing::info!("Connected to database");

            let repo = Arc::new(PgIdentityRepository::new(pool));
            auth_router(AuthAppState::new(repo, codec, hasher, guard))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; using in-memory identity store");

            let repo = Arc::new(InMemoryIdentityRepository::new());
            seed_dev_admin(&repo, hasher.clone()).await?;
            auth_router(AuthAppState::new(repo, codec, hasher, guard))
        }
    };

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:5173,http://127.0.0.1:5173".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .nest("/auth", auth_routes)
        .layer(from_fn_with_state(limiter, rate_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let host: IpAddr = env::var("APP_HOST")
        .unwrap_or_else(|_| "0.0.0.0".to_string())
        .parse()?;
    let port: u16 = env::var("APP_PORT")
        .unwrap_or_else(|_| "8000".to_string())
        .parse()?;
    let addr = SocketAddr::new(host, port);
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Periodically drop rate-limit windows for clients that went quiet
fn spawn_rate_limit_purge(limiter: Arc<SlidingWindowLimiter>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(limiter.config().window);
        loop {
            interval.tick().await;
            let removed = limiter.purge_idle().await;
            if removed > 0 {
                let tracked = limiter.tracked_keys().await;
                tracing::debug!(removed, tracked, "Purged idle rate-limit windows");
            }
        }
    });
}

/// Register an admin in the in-memory store from DEV_ADMIN_EMAIL and
/// DEV_ADMIN_PASSWORD, when both are set.
async fn seed_dev_admin(
    repo: &InMemoryIdentityRepository,
    hasher: Arc<CredentialHasher>,
) -> anyhow::Result<()> {
    let (Ok(email), Ok(password)) = (env::var("DEV_ADMIN_EMAIL"), env::var("DEV_ADMIN_PASSWORD"))
    else {
        return Ok(());
    };

    let password = ClearTextPassword::new(password);
    let strength = password.assess_strength();
    if let Some(reason) = strength.reason {
        anyhow::bail!("DEV_ADMIN_PASSWORD rejected: {reason}");
    }

    let identity = repo
        .register(hasher, Email::new(&email)?, password, Some(UserRole::Admin))
        .await?;
    tracing::info!(identity_id = %identity.id, email = %identity.email, "Seeded development admin");

    Ok(())
}
