//! 'main' for the Aegis admission process

use aegis_common::messages::Message;
use anyhow::Result;
use caryatid_process::Process;
use config::{Config, Environment, File};
use std::sync::Arc;
use tracing::info;

use aegis_module_ante_handler::AnteHandler;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Standard main
#[tokio::main]
pub async fn main() -> Result<()> {
    // Standard logging using RUST_LOG for log levels
    let fmt_layer = fmt::layer().with_filter(EnvFilter::from_default_env());
    Registry::default().with(fmt_layer).init();

    info!("Aegis admission process");

    // Read the config
    let config = Arc::new(
        Config::builder()
            .add_source(File::with_name("admission"))
            .add_source(Environment::with_prefix("AEGIS"))
            .build()
            .unwrap(),
    );

    // Create the process
    let mut process = Process::<Message>::create(config).await;

    // Register modules
    AnteHandler::register(&mut process);

    // Run it
    process.run().await?;

    // Bye!
    info!("Exiting");

    Ok(())
}
