//src/main.rs

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use catalog::config::{AppState, Settings};
use catalog::handlers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logger: RUST_LOG manda; sem ele, nível info.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::from_env()?;

    // Se a configuração ou o banco falharem, a aplicação não deve iniciar.
    let (app_state, _db_pool) = AppState::new(&settings).await?;

    let app = handlers::router(app_state);

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
