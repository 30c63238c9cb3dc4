use anyhow::Context;

use miniauth_api::app::routes::orders;
use miniauth_infra::GateConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    miniauth_observability::init();

    let mut config = GateConfig::from_env();
    if config.jwt.secret.is_empty() {
        if config.production {
            anyhow::bail!("MINIAUTH_JWT_SECRET must be set in production");
        }
        tracing::warn!("MINIAUTH_JWT_SECRET not set; using insecure dev default");
        config.jwt.secret = "dev-secret".to_string();
    }

    let bind_addr = config.bind_addr.clone();
    let app = miniauth_api::build_app(config, orders::table()).await?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
