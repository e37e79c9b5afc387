use tracing_subscriber::{fmt, EnvFilter};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let http_port: u16 = std::env::var("REDRESS_HTTP_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8888);
    let session_ttl_secs: i64 = std::env::var("REDRESS_SESSION_TTL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3600);
    let admin_password = std::env::var("REDRESS_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());
    info!(
        target: "redress",
        "redress starting: RUST_LOG='{}', http_port={}, session_ttl_secs={}",
        rust_log, http_port, session_ttl_secs
    );

    redress::server::run_with_port(http_port, session_ttl_secs, &admin_password).await
}
