//! Password authentication with rotating refresh tokens.
//!
//! Dual-token system: short-lived access tokens (30 min, stateless JWT) and
//! long-lived refresh tokens (30 days, opaque, store-backed). Each refresh
//! consumes the presented token and issues a replacement; logout deletes it.

mod errors;
mod extractors;
mod ip;
pub mod memory;
mod service;
mod state;
mod store;
mod types;

pub use errors::AuthError;
pub use extractors::{BearerAuth, bearer_token};
pub use ip::{ClientIpHeader, HasHeadersAndExtensions, extract_client_ip};
pub use service::{AuthComponents, AuthService};
pub use state::HasAuthService;
pub use store::{AuditLog, SessionStore, StoreError, UserDirectory};
pub use types::{
    AuthConfig, LoginAttempt, Principal, SessionRecord, TokenResponse, UserCredentials,
};
