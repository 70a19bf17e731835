use axum::{
    Router,
    extract::{ConnectInfo, State},
    http::HeaderMap,
    response::Json,
    routing::get,
};
use ipgate::{IpExtractor, IpFilter, IpFilterConfig, IpFilterLayer, env};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let default_level = if env::bool_or("DEBUG", false)? { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = IpFilterConfig::from_env("ALLOWED_RANGES")?;
    let header = env::var_or("FORWARDED_HEADER", ipgate::DEFAULT_FORWARDED_HEADER);
    let port = u16::try_from(env::int_or("PORT", 3000)?)?;

    let filter = IpFilter::new(config).with_extractor(IpExtractor::new().with_header(header));
    let app = create_app(filter);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "server listening");
    println!("Try:");
    println!("  ALLOWED_RANGES=192.168.1.0/24 cargo run --example server");
    println!("  curl -i -H 'X-Forwarded-For: 192.168.1.125' http://localhost:{port}/");
    println!("  curl -i -H 'X-Forwarded-For: 192.168.2.125' http://localhost:{port}/");
    println!("  curl -i -H 'X-Forwarded-For: foo' http://localhost:{port}/");
    println!();

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

fn create_app(filter: IpFilter) -> Router {
    let ranges: Vec<String> = filter
        .config()
        .allowed_ranges
        .iter()
        .map(ToString::to_string)
        .collect();

    Router::new()
        .route("/", get(hello_handler))
        .layer(IpFilterLayer::new(filter))
        .with_state(Arc::new(ranges))
}

/// Only reached by admitted clients
async fn hello_handler(
    State(ranges): State<Arc<Vec<String>>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok());

    Json(json!({
        "message": "admitted",
        "remote_addr": addr.to_string(),
        "x_forwarded_for": forwarded,
        "allowed_ranges": ranges.as_slice(),
        "unrestricted": ranges.is_empty(),
    }))
}
