//! Access token signing/validation and refresh token generation.
//!
//! Access tokens are HS256 JWTs, stateless and short-lived. Refresh tokens are
//! opaque random strings with no embedded meaning: they are only valid while a
//! matching row exists in the session store.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Access token lifetime: 30 minutes
pub const DEFAULT_ACCESS_TTL_SECS: u64 = 30 * 60;

/// Refresh token lifetime: 30 days
pub const DEFAULT_REFRESH_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Random bytes per refresh token (256 bits).
const REFRESH_TOKEN_BYTES: usize = 32;

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (principal ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// A freshly minted access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    /// Lifetime in seconds
    pub duration: u64,
}

/// Signs and validates access tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: u64,
}

impl TokenCodec {
    /// Create a codec with the given secret and the default 30 minute access lifetime.
    pub fn new(secret: &[u8]) -> Self {
        Self::with_access_ttl(secret, DEFAULT_ACCESS_TTL_SECS)
    }

    pub fn with_access_ttl(secret: &[u8], access_ttl: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
        }
    }

    /// Mint an access token for `subject` that expires at `now + access_ttl`.
    pub fn mint_access(&self, subject: i64, now: u64) -> Result<AccessToken, TokenError> {
        let exp = now
            .checked_add(self.access_ttl)
            .ok_or(TokenError::ExpiryOverflow)?;
        let claims = AccessClaims {
            sub: subject.to_string(),
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Encoding)?;

        Ok(AccessToken {
            token,
            duration: self.access_ttl,
        })
    }

    /// Validate an access token and return its subject.
    ///
    /// Expiry is checked against `now` rather than the system clock; a token is
    /// rejected once `now >= exp`.
    pub fn verify_access(&self, token: &str, now: u64) -> Result<i64, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            })?;

        if now >= data.claims.exp {
            return Err(TokenError::Expired);
        }

        data.claims.sub.parse().map_err(|_| TokenError::Malformed)
    }

    /// Generate an opaque refresh token.
    pub fn mint_refresh(&self) -> String {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

/// Reasons an access token can be rejected or fail to mint.
/// Callers surface every verification failure the same way; the variant is for logs.
#[derive(Debug)]
pub enum TokenError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// `now + access_ttl` does not fit in a timestamp
    ExpiryOverflow,
    /// Not a well-formed token for this codec
    Malformed,
    /// Signature does not match the secret
    BadSignature,
    /// Past its expiry
    Expired,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            TokenError::ExpiryOverflow => write!(f, "Token expiry overflows"),
            TokenError::Malformed => write!(f, "Malformed token"),
            TokenError::BadSignature => write!(f, "Invalid token signature"),
            TokenError::Expired => write!(f, "Token expired"),
        }
    }
}

impl std::error::Error for TokenError {}
