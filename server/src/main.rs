mod error;
mod llm;
mod routes;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .expect("invalid PORT");

    let config = llm::config::LlmConfig::from_env().expect("invalid LLM configuration");

    // Non-fatal: every chat request fails with a configuration error until a key is set.
    if config.api_key().is_some() {
        tracing::info!(provider = config.provider.display_name(), base_url = %config.base_url, "LLM provider configured");
    } else {
        tracing::warn!(env = %config.api_key_env, "LLM API key not set; chat requests will fail");
    }

    let connector = llm::HttpConnector::new(config.timeouts).expect("http client build failed");
    let state = state::AppState::new(config, Arc::new(connector));

    let static_dir = std::env::var("STATIC_DIR").ok().map(PathBuf::from);
    let app = routes::app(state, static_dir);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "chat relay listening");
    axum::serve(listener, app).await.expect("server failed");
}
