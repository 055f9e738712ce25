//! ai-bridges -- OpenAI, Anthropic and Gemini compatible API over the Gemini
//! web app.
//!
//! This is the application entry point. It wires together:
//!   - Configuration loading and validation
//!   - Logging
//!   - Gemini web client and provider registry
//!   - HTTP server
//!   - Graceful shutdown on SIGTERM / SIGINT

use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use ai_bridges::AppState;
use ai_bridges::api;
use ai_bridges::config::Config;
use ai_bridges::providers::ProviderManager;
use ai_bridges::providers::gemini::{Credentials, GeminiWebClient, GeminiWebProvider};

// ---------------------------------------------------------------------------
// CLI argument parsing (minimal, no clap dependency)
// ---------------------------------------------------------------------------

struct CliArgs {
    config_path: PathBuf,
}

fn parse_args() -> CliArgs {
    let mut args = std::env::args().skip(1);
    let mut config_path = PathBuf::from("ai-bridges.toml");

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                if let Some(path) = args.next() {
                    config_path = PathBuf::from(path);
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("ai-bridges {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                eprintln!("Run with --help for usage information.");
                std::process::exit(1);
            }
        }
    }

    CliArgs { config_path }
}

fn print_usage() {
    println!(
        "\
ai-bridges {version} -- AI API bridge for the Gemini web app

USAGE:
    ai-bridges [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file [default: ai-bridges.toml]
    -h, --help             Print this help message
    -V, --version          Print version information

ENVIRONMENT:
    GEMINI_1PSID           __Secure-1PSID cookie (required)
    GEMINI_1PSIDTS         __Secure-1PSIDTS cookie (required)
    GEMINI_1PSIDCC         __Secure-1PSIDCC cookie
    GEMINI_REFRESH_INTERVAL
                           Token refresh interval in minutes [default: 5]
    PORT                   Listen port [default: 4981]
    LOG_LEVEL              Log level [default: info]
    RUST_LOG               Full tracing filter, overrides LOG_LEVEL
    BRIDGES_CONFIG         Alternative to --config flag
",
        version = env!("CARGO_PKG_VERSION")
    );
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> anyhow::Result<()> {
    // 1. Parse CLI arguments
    let cli = parse_args();

    let config_path = std::env::var("BRIDGES_CONFIG")
        .map(PathBuf::from)
        .unwrap_or(cli.config_path);

    // 2. Load and validate configuration
    let config = Config::load(&config_path)?;
    config.validate()?;

    // 3. Initialize tracing/logging
    init_tracing(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "Starting ai-bridges"
    );
    for (key, env_var) in config.env_overrides.all() {
        tracing::debug!(key = %key, env_var = %env_var, "Config overridden from environment");
    }

    // 4. Build providers
    let client = build_gemini_client(&config)?;
    let mut manager = ProviderManager::new();
    manager.register(Arc::new(GeminiWebProvider::new(client)));

    let warnings = manager.init_all_providers().await;
    if !warnings.is_empty() {
        tracing::warn!(
            failed = warnings.len(),
            "Serving in degraded mode: {}",
            warnings.join("; ")
        );
    }
    manager.select_provider("gemini")?;

    // 5. Serve
    let state = AppState::new(config, manager);
    let addr = state.config.listen_addr();
    let app = api::build_app(state.clone());

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 6. Release upstream sessions
    state.providers.read().await.close_all().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

// ---------------------------------------------------------------------------
// Gemini client builder
// ---------------------------------------------------------------------------

fn build_gemini_client(config: &Config) -> anyhow::Result<GeminiWebClient> {
    let gemini = &config.gemini;
    let mut credentials = Credentials::new(gemini.psid.clone()).with_psidts(gemini.psidts.clone());
    if !gemini.psidcc.is_empty() {
        credentials = credentials.with_psidcc(gemini.psidcc.clone());
    }

    let client = GeminiWebClient::builder()
        .with_credentials(credentials)
        .with_base_url(gemini.base_url.clone())
        .with_refresh_interval(gemini.refresh_interval())
        .with_request_timeout(gemini.request_timeout())
        .build()?;
    Ok(client)
}

// ---------------------------------------------------------------------------
// Tracing initialization
// ---------------------------------------------------------------------------

/// Set up the tracing subscriber based on configuration.
fn init_tracing(config: &Config) {
    // RUST_LOG env var takes precedence over config file
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        EnvFilter::new(format!("ai_bridges={level},tower_http={level},warn"))
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if config.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

// ---------------------------------------------------------------------------
// Graceful shutdown
// ---------------------------------------------------------------------------

/// Wait for a shutdown signal (SIGTERM or SIGINT / Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C)");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_usage_does_not_panic() {
        // Just verify it doesn't panic.
        print_usage();
    }

    #[test]
    fn test_build_gemini_client_from_config() {
        let mut config = Config::default();
        config.gemini.psid = "psid".to_string();
        config.gemini.psidts = "psidts".to_string();
        let client = build_gemini_client(&config).unwrap();
        assert!(!client.is_healthy());
    }
}
