use dispatch_server::{server, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let result = match Config::from_env() {
        Ok(config) => server::run(config).await,
        Err(err) => Err(err),
    };
    if let Err(err) = result {
        tracing::error!("Error: {:#}", err);
        std::process::exit(1);
    }
}
