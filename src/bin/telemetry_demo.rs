use std::time::Duration;

use gametel::{ClientConfig, InputType, TelemetryClient};
use serde_json::json;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const FRAMES: u32 = 60;
const FRAME_MS: u64 = 16;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup Logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // 2. Setup Client (GAMETEL_PORT, GAMETEL_VERBOSE)
    let config = ClientConfig::from_env()?;
    tracing::info!("Telemetry demo reporting to {}", config.endpoint_url());
    let client = TelemetryClient::new(config)?;

    // Give the collector a moment to acknowledge before the first frame.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let mut score = 0u32;
    let telemetry = &client;
    for frame in 0..FRAMES {
        let score = &mut score;
        telemetry
            .instrument_game_loop(move || async move {
                telemetry
                    .instrument_duration("physics", true, || {
                        tokio::time::sleep(Duration::from_millis(FRAME_MS / 2))
                    })
                    .await;

                if frame % 10 == 0 {
                    *score += 10;
                    telemetry.log_user_input(InputType::Keyboard, "player", "jump", vec![json!("Space")])?;
                    telemetry.log_entity_event(&json!({ "id": "player", "hp": 100 }), &json!({ "kind": "jump" }))?;
                }
                telemetry.log_game_state(&json!({ "frame": frame, "score": *score }))?;

                tokio::time::sleep(Duration::from_millis(FRAME_MS / 2)).await;
                anyhow::Ok(())
            })
            .await?;
    }

    client.log_user_defined_event("demo finished", vec![json!(FRAMES), json!(score)])?;
    client.shutdown().await;
    tracing::info!("Telemetry demo done");
    Ok(())
}
