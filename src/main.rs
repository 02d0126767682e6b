use tokio::io::{AsyncWriteExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

use kline_engine::{BarBus, EngineConfig, run_replay};

/// Custom timer implementation to format log timestamps using the system's local timezone.
/// By default, tracing uses UTC (Zulu time), which can be confusing for local debugging.
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f"))
    }
}

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries the emitted bars as JSON lines.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_timer(LocalTimer)
        .with_writer(std::io::stderr)
        .init();

    // Fail fast: without a valid config.yaml there is nothing to aggregate.
    let cfg = match EngineConfig::load() {
        Ok(c) => c,
        Err(e) => {
            error!("❌ Critical Error: Failed to load configuration: {}", e);
            return;
        }
    };

    let bus = BarBus::default();
    let mut rx = bus.subscribe();

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let Ok(mut line) = serde_json::to_string(&event) else {
                        warn!("failed to encode bar event");
                        continue;
                    };
                    line.push('\n');
                    if stdout.write_all(line.as_bytes()).await.is_err() {
                        // downstream pipe closed
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("output fell behind, {} bar events dropped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
        let _ = stdout.flush().await;
    });

    let stdin = BufReader::new(tokio::io::stdin());
    match run_replay(stdin, &cfg, &bus).await {
        Ok(summary) => info!(?summary, "📊 Done."),
        Err(e) => error!("⚠️ Replay aborted: {}", e),
    }

    // Dropping the last sender closes the channel so the writer drains and exits.
    drop(bus);
    if let Err(e) = writer.await {
        error!("output task failed: {}", e);
    }
}
