use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fulfillment_utils::config::Config;
use fulfillment_utils::get_messages;
use fulfillment_utils::platform::FormatterRegistry;

fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fulfillment_utils=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args().skip(1);
    let response_path = args
        .next()
        .map(PathBuf::from)
        .context("Usage: fulfillment-utils <response.json> [platform]")?;
    let platform_arg = args.next();

    let config_path = std::env::var("FULFILLMENT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("fulfillment.toml"));

    let config = if config_path.exists() {
        info!("Loading configuration from: {}", config_path.display());
        Config::load(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        info!("No config at {}, using defaults", config_path.display());
        Config::default()
    };

    let content = std::fs::read_to_string(&response_path)
        .with_context(|| format!("Failed to read response: {}", response_path.display()))?;
    let response: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse response: {}", response_path.display()))?;

    let platform = platform_arg.as_deref().or_else(|| config.platform_filter());
    info!("  Platform filter: {}", platform.unwrap_or("(none)"));

    let messages = get_messages(&response, platform);
    info!("  Grouped messages: {}", messages.len());

    let registry = FormatterRegistry::from_config(&config);
    let formatted = registry.format_all(&messages);

    println!("{}", serde_json::to_string_pretty(&formatted)?);
    Ok(())
}
