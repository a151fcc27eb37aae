use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use classtrackd::config::Config;
use classtrackd::fixtures::load_fixture_dir;
use classtrackd::gradebook::Gradebook;
use classtrackd::ipc;

fn init_tracing() {
    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn initial_state(config: Config) -> Result<ipc::AppState> {
    let (gradebook, workspace) = match config.fixtures_dir.clone() {
        Some(dir) => {
            let fixtures = load_fixture_dir(&dir)?;
            let book = Gradebook::seeded(fixtures, config.latency)
                .with_context(|| format!("seed stores from {}", dir.display()))?;
            (book, Some(dir))
        }
        None => (Gradebook::in_memory(config.latency), None),
    };
    Ok(ipc::AppState {
        config,
        gradebook,
        workspace,
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(?config, "classtrackd starting");
    let mut state = initial_state(config)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("read stdin")? {
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                stdout.write_all(format!("{}\n", resp).as_bytes()).await?;
                stdout.flush().await?;
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req).await;
        let text = serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string());
        stdout.write_all(format!("{}\n", text).as_bytes()).await?;
        stdout.flush().await?;
    }
    tracing::info!("stdin closed, shutting down");
    Ok(())
}
