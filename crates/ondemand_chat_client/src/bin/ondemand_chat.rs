//! ondemand-chat: creates a chat session, submits one query and prints the
//! final response as JSON to stdout.

use ondemand_chat_client::config::{self, Config, ConfigError, Settings};
use ondemand_chat_client::{Client, ResponseMode};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    mode: Option<ResponseMode>,
    query: Vec<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or("--config requires a path")?;
                args.config = Some(PathBuf::from(path));
            }
            "--mode" => {
                let mode = iter.next().ok_or("--mode requires sync or stream")?;
                args.mode = Some(mode.parse()?);
            }
            _ => args.query.push(arg),
        }
    }
    Ok(args)
}

/// Load config from `--config`, then `ONDEMAND_CHAT_CONFIG`, then the default
/// path. Only the default path may be absent.
fn load_config(explicit: Option<PathBuf>) -> Result<Config, String> {
    let explicit = explicit.or_else(|| std::env::var_os("ONDEMAND_CHAT_CONFIG").map(PathBuf::from));
    if let Some(path) = explicit {
        return config::load(&path)
            .map_err(|e| format!("failed to load config from {}: {}", path.display(), e));
    }
    match config::default_config_path() {
        Some(path) if path.exists() => config::load(&path)
            .map_err(|e| format!("failed to load config from {}: {}", path.display(), e)),
        _ => Ok(Config::default()),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

fn main() {
    init_tracing();

    let args = parse_args().unwrap_or_else(|e| fail(e));
    let mut cfg = load_config(args.config).unwrap_or_else(|e| fail(e));
    cfg.apply_env(|key| std::env::var(key).ok());
    if let Some(mode) = args.mode {
        cfg.query.response_mode = Some(mode);
    }
    if !args.query.is_empty() {
        cfg.query.text = Some(args.query.join(" "));
    }
    if cfg.query.text.as_deref().map_or(true, |q| q.trim().is_empty()) {
        // Fall back to the first line of stdin.
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).unwrap_or(0);
        cfg.query.text = Some(line.trim().to_string());
    }

    let settings = match Settings::from_config(cfg) {
        Ok(s) => s,
        Err(ConfigError::MissingApiKey) => {
            fail("Please set the API key (api.api_key in the config file or ONDEMAND_API_KEY)")
        }
        Err(e) => fail(e),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if settings.generated_user_id {
        let _ = writeln!(out, "Generated external user id: {}", settings.external_user_id);
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| fail(format!("failed to create runtime: {}", e)));

    rt.block_on(async {
        let client = Client::new(&settings);

        let _ = writeln!(out, "Creating session at {}/sessions", client.base_url());
        let session = match client.create_session(&settings).await {
            Ok(s) => s,
            Err(e) => fail(format!("creating chat session failed: {}", e)),
        };
        let _ = writeln!(out, "Chat session created. Session ID: {}", session.id);
        if !session.context_metadata.is_empty() {
            let _ = writeln!(out, "Context Metadata:");
            for field in &session.context_metadata {
                let _ = writeln!(out, " - {}: {}", field.key, field.value);
            }
        }

        let _ = writeln!(out, "\n--- Submitting Query ---");
        let _ = writeln!(out, "Using query: '{}'", settings.query);
        let _ = writeln!(out, "Using responseMode: '{}'", settings.response_mode);
        if settings.response_mode == ResponseMode::Stream {
            let _ = writeln!(out, "Streaming Response...");
        }
        let _ = out.flush();

        let response = match client.submit_query(&session.id, &settings).await {
            Ok(r) => r,
            Err(e) => fail(format!(
                "submitting {} query failed: {}",
                settings.response_mode, e
            )),
        };

        let report = response.into_report(&settings.context_metadata);
        let rendered = serde_json::to_string_pretty(&report)
            .unwrap_or_else(|e| fail(format!("failed to render response: {}", e)));
        let _ = writeln!(out, "\nFinal Response (with contextMetadata appended):");
        let _ = writeln!(out, "{}", rendered);
    });
}
