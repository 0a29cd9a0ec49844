use mock_server::Library;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "31337".to_string());
    let addr = format!("127.0.0.1:{port}");
    let mut library = Library::sample();
    if let Ok(token) = std::env::var("ICLOUD_BRIDGE_TOKEN") {
        library = library.with_token(&token);
    }
    // Make the first photo's full image take a few polls, like a cold iCloud download.
    library = library.with_pending("photo-000", 3);
    library.retry_after_secs = 1;

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "mock iCloud Bridge listening");
    mock_server::run_with(listener, library).await
}
