//! Claimflow scenario simulator
//!
//! Runs an approval scenario through the workflow engine and prints the
//! resulting expenses, action outcomes, statistics and audit trail as JSON.

mod runner;
mod scenario;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use claimflow_rates::{
    CachedRateProvider, ExchangeRateProvider, HttpRateProvider, StaticRateProvider,
};
use claimflow_shared::AppConfig;
use claimflow_shared::config::LoggingConfig;

use crate::scenario::Scenario;

const DEFAULT_SCENARIO: &str = "demos/approval_walkthrough.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    let path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_SCENARIO), PathBuf::from);
    let scenario = Scenario::load(&path)
        .with_context(|| format!("failed to load scenario {}", path.display()))?;

    let rates: Arc<dyn ExchangeRateProvider> = match &scenario.rates {
        Some(table) => {
            info!(currencies = table.len(), "using static exchange rates");
            Arc::new(StaticRateProvider::new(table.clone()))
        }
        None => {
            info!(base_url = %config.exchange_rates.base_url, "using live exchange rates");
            let http = HttpRateProvider::new(&config.exchange_rates)?;
            Arc::new(CachedRateProvider::from_config(http, &config.exchange_rates))
        }
    };

    let report = runner::run(scenario, rates, config.workflow).await?;
    info!(
        expenses = report.expenses.len(),
        actions = report.actions.len(),
        audit_entries = report.audit_trail.len(),
        "scenario finished"
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Logs go to stderr so stdout stays valid JSON.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));

    let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let fmt = if logging.json {
        fmt.json().boxed()
    } else {
        fmt.boxed()
    };

    tracing_subscriber::registry().with(filter).with(fmt).init();
}
