mod cli;

use crate::cli::{LogFormatArg, StorageBackendArg, CLI};
use burrow_gateway::{App, AppState};
use burrow_shortener::{ShortenerConfig, ShortenerService};
use burrow_storage::{InMemoryRepository, MySqlRepository, Repository};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CLI::try_parse()?;
    init_tracing(config.log_format);

    info!(
        listen_addr = %config.listen_addr,
        public_base_url = %config.public_base_url,
        storage_backend = %config.storage,
        match_policy = ?config.match_policy,
        "starting gateway server"
    );

    let shortener_config = ShortenerConfig::builder()
        .match_policy(config.match_policy.into())
        .build();

    match config.storage {
        StorageBackendArg::InMemory => {
            run_server(&config, InMemoryRepository::new(), shortener_config).await?;
        }
        StorageBackendArg::Mysql => {
            let mysql_dsn = config
                .mysql_dsn
                .as_deref()
                .ok_or("mysql dsn is required when storage backend is mysql")?;
            let repository = MySqlRepository::connect(mysql_dsn).await?;
            run_server(&config, repository, shortener_config).await?;
        }
    }

    Ok(())
}

fn init_tracing(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormatArg::Text => builder.init(),
        LogFormatArg::Json => builder.json().init(),
    }
}

async fn run_server<R: Repository>(
    config: &CLI,
    repository: R,
    shortener_config: ShortenerConfig,
) -> std::io::Result<()> {
    let service = ShortenerService::with_config(repository, shortener_config);
    let state = AppState::new(Arc::new(service), config.public_base_url.clone());

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "gateway listening");

    axum::serve(listener, App::router(state)).await
}
