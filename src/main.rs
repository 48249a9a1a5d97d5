// =============================================================================
// TraderMind Signal Engine — Main Entry Point
// =============================================================================
//
// Reads newline-delimited JSON ticks (`{"market": "R_100", "quote": 1234.5}`)
// from stdin, feeds them through the engine and logs every published event
// as JSON.  Session policy comes from TRADERMIND_SESSION (JSON) if set.
// =============================================================================

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tradermind_signals::ai::HttpInferenceClient;
use tradermind_signals::{EngineConfig, SessionConfig, SignalEngine, Tick};

const CONFIG_PATH: &str = "engine_config.json";
const ENV_SESSION: &str = "TRADERMIND_SESSION";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = EngineConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        EngineConfig::default()
    });
    config.apply_env();

    let session: SessionConfig = match std::env::var(ENV_SESSION) {
        Ok(raw) => serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {ENV_SESSION}"))?,
        Err(_) => SessionConfig::default(),
    };

    info!(
        history_capacity = config.history_capacity,
        ai_endpoint = ?config.ai.endpoint,
        use_ai = session.use_ai,
        "Signal engine starting"
    );

    // ── 2. Build engine ──────────────────────────────────────────────────
    let mut engine = SignalEngine::new(&config);
    if let Some(client) = HttpInferenceClient::from_config(&config.ai)? {
        info!(base_url = %client.base_url(), "AI augmentation available");
        engine = engine.with_inference(Arc::new(client));
    }

    // ── 3. Event logger ──────────────────────────────────────────────────
    let mut rx = engine.subscribe();
    let logger = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => info!(kind = %event.kind(), "{json}"),
                    Err(e) => warn!(error = %e, "Failed to serialise event"),
                },
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event logger lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    // ── 4. Tick loop ─────────────────────────────────────────────────────
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Tick>(line) {
            Ok(tick) => {
                engine.process_tick(&tick, &session);
            }
            Err(e) => warn!(error = %e, "Skipping malformed tick"),
        }
        // Let pending AI tasks and the logger make progress between ticks.
        tokio::task::yield_now().await;
    }

    info!(stats = ?engine.stats(), "Input exhausted, shutting down");
    drop(engine);
    if let Err(e) = logger.await {
        warn!(error = %e, "Event logger task failed");
    }
    Ok(())
}
