pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod clock;
pub mod db;
pub mod jwt;
pub mod password;
pub mod rate_limit;

use api::create_api_router;
use auth::{AuthComponents, AuthConfig, AuthService, ClientIpHeader};
use axum::Router;
use clock::SystemClock;
use db::Database;
use jwt::TokenCodec;
use password::{Argon2Hasher, PasswordError};
use rate_limit::RateLimitConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing access tokens
    pub jwt_secret: Vec<u8>,
    /// Access token lifetime in seconds
    pub access_ttl: u64,
    /// Refresh token lifetime and store timeout
    pub auth_config: AuthConfig,
    /// IP extraction strategy (requires running behind a proxy)
    pub ip_header: Option<ClientIpHeader>,
    /// Login rate limiter
    pub rate_limit: RateLimitConfig,
}

/// Wire the auth service to the SQLite stores and the system clock.
pub fn build_auth_service(config: &ServerConfig) -> Result<AuthService, PasswordError> {
    let components = AuthComponents {
        codec: Arc::new(TokenCodec::with_access_ttl(
            &config.jwt_secret,
            config.access_ttl,
        )),
        sessions: Arc::new(config.db.refresh_tokens()),
        audit: Arc::new(config.db.login_attempts()),
        users: Arc::new(config.db.users()),
        hasher: Arc::new(Argon2Hasher::new()),
        clock: Arc::new(SystemClock),
    };

    AuthService::new(components, config.auth_config)
}

/// Create the application router for an already built auth service.
pub fn create_app(config: &ServerConfig, auth: AuthService) -> Router {
    let api_router = create_api_router(auth, config.ip_header, config.rate_limit.clone());

    Router::new().nest("/api", api_router)
}

/// Run cleanup tasks and spawn background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(auth: &AuthService, rate_limit: &RateLimitConfig) {
    cleanup::run_cleanup(auth, rate_limit).await;
    cleanup::spawn_cleanup_scheduler(auth.clone(), rate_limit.clone());
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(
    config: ServerConfig,
    auth: AuthService,
    listener: TcpListener,
) -> Result<(), std::io::Error> {
    let app = create_app(&config, auth);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    let auth = build_auth_service(&config).map_err(std::io::Error::other)?;

    // Run cleanup tasks on startup
    init_cleanup(&auth, &config.rate_limit).await;

    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        run_server(config, auth, listener).await.ok();
    });

    Ok((handle, local_addr))
}
