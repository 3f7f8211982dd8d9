#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setu_observability::init();

    let config = setu_api::config::ApiConfig::from_env()?;
    let app = setu_api::app::build_app(config.jwt_secret.clone(), config.engine.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
