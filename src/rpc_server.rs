//! vidmark RPC server: the message router over stdin/stdout.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "action":"saveBookmark", "videoId":"abc123", "bookmark":{...}}
//! Response: the router's reply object, with the request's "id" copied in.
//! Logs go to stderr so stdout carries only protocol lines.

use std::path::PathBuf;

use serde_json::{json, Value};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use vidmark::app::App;
use vidmark::config::VidmarkConfig;

/// Environment variable naming an explicit config file.
const CONFIG_ENV: &str = "VIDMARK_CONFIG";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config() -> VidmarkConfig {
    let path = std::env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| VidmarkConfig::default_path());
    match VidmarkConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "using default config");
            VidmarkConfig::default()
        }
    }
}

async fn write_line(stdout: &mut io::Stdout, value: &Value) -> std::io::Result<()> {
    let mut line = value.to_string();
    line.push('\n');
    stdout.write_all(line.as_bytes()).await?;
    stdout.flush().await
}

fn with_id(mut reply: Value, id: Value) -> Value {
    if let Value::Object(map) = &mut reply {
        map.insert("id".to_string(), id);
    }
    reply
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let config = load_config();
    let app = App::open(config).expect("Failed to initialize vidmark storage");

    match app.startup().await {
        Ok(reason) => info!(?reason, "startup lifecycle completed"),
        Err(e) => error!(error = %e, "startup lifecycle failed"),
    }
    let _cleanup = app.spawn_cleanup();

    let mut stdout = io::stdout();
    let ready = json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")});
    if write_line(&mut stdout, &ready).await.is_err() {
        return;
    }

    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "failed to read request");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let request: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                let reply = json!({"id": null, "error": format!("parse error: {}", e)});
                if write_line(&mut stdout, &reply).await.is_err() {
                    break;
                }
                continue;
            }
        };

        let id = request.get("id").cloned().unwrap_or(Value::Null);
        let dispatch = app.router.dispatch(&request);
        if dispatch.will_reply_async() {
            debug!("reply deferred");
        }
        let reply = with_id(dispatch.reply().await, id);

        if write_line(&mut stdout, &reply).await.is_err() {
            break;
        }
    }

    info!("stdin closed, shutting down");
}
