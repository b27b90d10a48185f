//! CLI argument parsing, validation, and startup helpers.

use std::time::Duration;

use crate::ServerConfig;
use crate::auth::{AuthConfig, ClientIpHeader};
use crate::db::Database;
use crate::password::{Argon2Hasher, PasswordHasher};
use crate::rate_limit::RateLimitConfig;
use clap::Parser;
use tracing::{error, info};

const MIN_JWT_SECRET_LENGTH: usize = 32;

/// One week.
const MAX_ACCESS_TTL_MINUTES: u64 = 7 * 24 * 60;

/// Ten years.
const MAX_REFRESH_TTL_DAYS: u64 = 3650;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tokengate",
    about = "Password login with rotating refresh tokens"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "auth.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime in minutes
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..=MAX_ACCESS_TTL_MINUTES))]
    pub access_ttl_minutes: u64,

    /// Refresh token lifetime in days
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..=MAX_REFRESH_TTL_DAYS))]
    pub refresh_ttl_days: u64,

    /// Upper bound on each storage call, in milliseconds
    #[arg(long, default_value = "5000", value_parser = clap::value_parser!(u64).range(1..))]
    pub store_timeout_ms: u64,

    /// Read the client IP from this proxy header instead of the socket address
    #[arg(long, value_enum)]
    pub ip_header: Option<ClientIpHeader>,

    /// Create a user with this email on startup. The password is read from CREATE_USER_PASSWORD
    #[arg(long, value_name = "EMAIL")]
    pub create_user: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    validate_jwt_secret(secret)
}

fn validate_jwt_secret(secret: String) -> Option<String> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Handle the --create-user flag: create an active user with the password from
/// CREATE_USER_PASSWORD. The username is the local part of the email.
pub async fn handle_create_user(db: &Database, email: &str) {
    let Ok(password) = std::env::var("CREATE_USER_PASSWORD") else {
        error!("CREATE_USER_PASSWORD must be set when using --create-user");
        std::process::exit(1);
    };
    // SAFETY: We're single-threaded at this point during startup,
    // and no other code is reading this environment variable.
    unsafe { std::env::remove_var("CREATE_USER_PASSWORD") };

    if password.is_empty() {
        error!("CREATE_USER_PASSWORD cannot be empty");
        std::process::exit(1);
    }

    match db.users().get_by_email(email).await {
        Ok(Some(existing)) => {
            println!();
            println!("User already exists: {} (id {})", existing.email, existing.id);
            println!();
            return;
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "Failed to check for existing user");
            std::process::exit(1);
        }
    }

    let hash = match Argon2Hasher::new().hash(&password) {
        Ok(hash) => hash,
        Err(e) => {
            error!(error = %e, "Failed to hash password");
            std::process::exit(1);
        }
    };

    let username = username_from_email(email);
    match db.users().create(email, username, &hash).await {
        Ok(id) => {
            println!();
            println!("User created: {} (id {})", email, id);
            println!();
        }
        Err(e) => {
            error!(error = %e, "Failed to create user");
            std::process::exit(1);
        }
    }
}

fn username_from_email(email: &str) -> &str {
    match email.split_once('@') {
        Some((local, _)) if !local.is_empty() => local,
        _ => email,
    }
}

/// Build ServerConfig from validated arguments.
/// Returns None and logs an error if a lifetime does not fit in seconds.
pub fn build_config(args: &Args, db: Database, jwt_secret: String) -> Option<ServerConfig> {
    let Some(access_ttl) = args.access_ttl_minutes.checked_mul(60) else {
        error!(minutes = args.access_ttl_minutes, "Access token lifetime is too large");
        return None;
    };
    let Some(refresh_ttl) = args.refresh_ttl_days.checked_mul(24 * 60 * 60) else {
        error!(days = args.refresh_ttl_days, "Refresh token lifetime is too large");
        return None;
    };

    Some(ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        access_ttl,
        auth_config: AuthConfig {
            refresh_ttl,
            io_timeout: Duration::from_millis(args.store_timeout_ms),
        },
        ip_header: args.ip_header,
        rate_limit: RateLimitConfig::new(args.ip_header),
    })
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
