use anyhow::Result;
use tracing_subscriber::EnvFilter;

use weatherboard::{cache, config, dashboard, web};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let command = args.next();
    match command.as_deref() {
        Some("serve") | None => {
            // cache is best-effort; the service works without it
            if let Err(err) = cache::init(config::cache_dir()) {
                tracing::warn!("payload cache disabled: {err}");
            }
            web::run(config::server_port()).await
        }
        Some("dashboard") => {
            let base_url = args
                .next()
                .unwrap_or_else(|| format!("http://localhost:{}", config::server_port()));
            dashboard::run(base_url).await
        }
        Some(other) => {
            eprintln!("Unknown command: {other}");
            eprintln!("Usage: weatherboard [serve | dashboard [base-url]]");
            std::process::exit(2);
        }
    }
}
