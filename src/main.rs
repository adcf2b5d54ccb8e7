mod api;
mod archive;
mod config;
mod error;
mod http;
mod job;
mod persistence;
mod report;
mod result;
mod run;

use crate::api::build_api;
use crate::config::IngestConfig;
use std::error::Error;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();
    let config = IngestConfig::from_env();
    let router = build_api(&config)?;
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("listening on {}, results service at {}", config.bind_address, config.results_url);
    axum::serve(listener, router).await?;
    Ok(())
}
