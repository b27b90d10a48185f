use clap::Parser;
use tokengate::cli::{
    Args, build_config, handle_create_user, init_logging, load_jwt_secret, open_database,
};
use tokengate::{build_auth_service, init_cleanup, run_server};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if let Some(email) = args.create_user.as_deref() {
        handle_create_user(&db, email).await;
    }

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let Some(config) = build_config(&args, db, jwt_secret) else {
        std::process::exit(1);
    };
    let auth = build_auth_service(&config).unwrap_or_else(|e| {
        error!(error = %e, "Failed to initialize auth service");
        std::process::exit(1);
    });
    init_cleanup(&auth, &config.rate_limit).await;

    match listener.local_addr() {
        Ok(local_addr) => info!(address = %local_addr, "Listening"),
        Err(_) => info!(address = %addr, "Listening"),
    }

    if let Err(e) = run_server(config, auth, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
