//! Dialog Flow - replays a scripted sign-in dialog
//!
//! Wires the state machine to in-memory collaborators, publishes every
//! event of a scenario and prints the resulting step history.

use dialog_flow::scenario::Scenario;
use dialog_flow::DialogConfig;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dialog_flow=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = DialogConfig::from_env();
    let scenario = match &config.scenario_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading scenario");
            Scenario::load(path)?
        }
        None => Scenario::demo()?,
    };

    let history = tokio::task::LocalSet::new()
        .run_until(scenario.replay(
            config.start_info(),
            Duration::from_millis(config.auth_delay_ms),
        ))
        .await?;

    println!("{}", serde_json::to_string_pretty(&history)?);
    Ok(())
}
