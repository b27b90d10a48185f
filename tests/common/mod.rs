#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use tokengate::auth::{AuthComponents, AuthConfig, AuthService, ClientIpHeader};
use tokengate::clock::{Clock, SystemClock};
use tokengate::db::Database;
use tokengate::jwt::TokenCodec;
use tokengate::password::{Argon2Hasher, PasswordHasher};
use tokengate::rate_limit::RateLimitConfig;
use tokengate::{ServerConfig, create_app};
use tower::ServiceExt;

pub const JWT_SECRET: &[u8] = b"test-jwt-secret-that-is-long-enough";

/// Cheap argon2 parameters so tests don't spend seconds hashing.
pub fn test_hasher() -> Argon2Hasher {
    Argon2Hasher::with_cost(64, 1).expect("Invalid argon2 params")
}

/// Auth service over the SQLite stores with a cheap hasher and the given clock.
pub fn auth_service(db: &Database, clock: Arc<dyn Clock>, config: AuthConfig) -> AuthService {
    AuthService::new(
        AuthComponents {
            codec: Arc::new(TokenCodec::new(JWT_SECRET)),
            sessions: Arc::new(db.refresh_tokens()),
            audit: Arc::new(db.login_attempts()),
            users: Arc::new(db.users()),
            hasher: Arc::new(test_hasher()),
            clock,
        },
        config,
    )
    .expect("Failed to build auth service")
}

/// Create an active user, returning its ID.
pub async fn create_user(db: &Database, email: &str, password: &str) -> i64 {
    let hash = test_hasher().hash(password).expect("Failed to hash");
    let username = email.split('@').next().unwrap_or(email);
    db.users()
        .create(email, username, &hash)
        .await
        .expect("Failed to create user")
}

/// Router wired to an in-memory database, reading the client IP from `X-Forwarded-For`.
pub struct TestApp {
    pub app: Router,
    pub db: Database,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_rate_limit(RateLimitConfig::new).await
    }

    pub async fn with_rate_limit(
        rate_limit: impl FnOnce(Option<ClientIpHeader>) -> RateLimitConfig,
    ) -> Self {
        let db = Database::open(":memory:")
            .await
            .expect("Failed to open test database");
        let ip_header = Some(ClientIpHeader::XForwardedFor);

        let config = ServerConfig {
            db: db.clone(),
            jwt_secret: JWT_SECRET.to_vec(),
            access_ttl: 1800,
            auth_config: AuthConfig::default(),
            ip_header,
            rate_limit: rate_limit(ip_header),
        };
        let auth = auth_service(&db, Arc::new(SystemClock), config.auth_config);

        Self {
            app: create_app(&config, auth),
            db,
        }
    }

    pub async fn create_user(&self, email: &str, password: &str) -> i64 {
        create_user(&self.db, email, password).await
    }

    /// Send a request, returning the status and the JSON body (`Null` if empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }

    pub async fn post_json(
        &self,
        uri: &str,
        body: String,
        client_ip: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(ip) = client_ip {
            builder = builder.header("x-forwarded-for", ip);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }
}
