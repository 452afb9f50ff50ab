use std::sync::Arc;

use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use og_preview_server::cdn::{CloudinaryRewriter, ImageRewriter, NoopRewriter};
use og_preview_server::config::Config;
use og_preview_server::resolver::LinkPreviewResolver;
use og_preview_server::state::AppState;
use og_preview_server::unfurl::HttpUnfurler;

#[tokio::main]
async fn main() {
    // Initialize tracing — JSON in production, human-readable in dev.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("og_preview_server=info,tower_http=info"));

    if std::env::var("APP_ENV").as_deref() == Ok("production") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("🚀 OG preview server starting...");

    let config = Config::from_env().expect("Failed to load configuration");
    info!(
        timeout_ms = config.unfurl_timeout.as_millis() as u64,
        max_body_bytes = config.max_body_bytes,
        allow_private_hosts = config.allow_private_hosts,
        "📝 Configuration loaded"
    );

    let unfurler = HttpUnfurler::from_config(&config).expect("Failed to build HTTP client");

    let rewriter: Arc<dyn ImageRewriter> = match config.cloudinary.clone() {
        Some(cloudinary) => {
            info!(cloud_name = %cloudinary.cloud_name, "🖼️ Preview images routed through Cloudinary");
            Arc::new(CloudinaryRewriter::new(cloudinary))
        }
        None => {
            tracing::warn!("CLOUDINARY_CLOUD_NAME not set; preview images keep their origin URLs");
            Arc::new(NoopRewriter)
        }
    };

    let app_state = AppState {
        resolver: Arc::new(LinkPreviewResolver::new(
            Arc::new(unfurler),
            rewriter,
            config.unfurl_timeout,
        )),
    };

    // CORS: permissive in dev, restrictive in production.
    let cors = if config.is_dev {
        info!("🔓 CORS: permissive (dev mode)");
        CorsLayer::permissive()
    } else {
        tracing::warn!("🔒 CORS: restrictive (production mode). Cross-origin requests will be denied.");
        CorsLayer::new()
    };

    // Prometheus metrics layer
    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let app = og_preview_server::router(app_state)
        .route(
            "/metrics",
            get(move || async move { metric_handle.render() }),
        )
        .layer(prometheus_layer)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = config.server_addr();
    info!("🎧 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
