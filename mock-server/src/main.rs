use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    let app = match std::env::var("MOCK_SECRET") {
        Ok(secret) if !secret.is_empty() => mock_server::app_with_secret(&secret),
        _ => mock_server::app(),
    };
    mock_server::serve(listener, app).await
}
