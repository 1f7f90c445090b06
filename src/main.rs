use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use trend_stylist::cascade::MediaCascade;
use trend_stylist::config::Config;
use trend_stylist::gemini::GeminiClient;
use trend_stylist::llm::{AnthropicClient, TextGenerator};
use trend_stylist::routes::{router, AppState};
use trend_stylist::store::TrendStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();
    init_tracing();

    let config = Config::from_env();
    let store = TrendStore::new(&config.database_path);
    store.initialize().await.context("failed to initialize the trend store")?;
    match store.count().await {
        Ok(0) => warn!("⚠️ No trends in the database. Run `ingest --demo` to load sample trends."),
        Ok(count) => info!("📊 {} trends available", count),
        Err(e) => warn!("⚠️ Could not count trends: {}", e),
    }

    let stylist: Arc<dyn TextGenerator> = Arc::new(
        AnthropicClient::new(&config.anthropic_base_url, &config.stylist_model).with_timeout(config.text_timeout),
    );
    let cascade = MediaCascade::new(
        Arc::new(GeminiClient::new(&config.gemini_base_url).with_timeout(config.media_timeout)),
        stylist.clone(),
        config.models.clone(),
        config.polling,
    );
    info!(
        "🎛️ Models: image={:?} image_edit={:?} video={:?}",
        config.models.image, config.models.image_edit, config.models.video
    );

    let state = AppState { store, stylist, cascade: Arc::new(cascade) };
    let app = router(state)
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("HOST and PORT do not form a socket address")?;
    info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await.context("failed to bind listener")?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("👋 Server stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false);
    if json {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()).collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("⚠️ Could not listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("🛑 Shutdown signal received");
}
