//! Dashboard Client - command-line front end
//!
//! Issues requests through the full client pipeline (cache, coalescing, CSRF
//! and session refresh) against the backend configured in the environment.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dashboard_client::{ApiClient, ApiRequest, Config, Method};

/// Send a request to the dashboard API through the resilient client.
#[derive(Parser, Debug)]
#[command(name = "dashboard_client", version, about)]
struct Cli {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE, HEAD)
    method: Method,

    /// Path relative to API_BASE_URL
    path: String,

    /// Query parameter as key=value, repeatable
    #[arg(short, long = "query", value_parser = parse_query_pair)]
    query: Vec<(String, String)>,

    /// JSON request body
    #[arg(short, long)]
    body: Option<String>,

    /// Fetch a CSRF token before sending
    #[arg(long)]
    prime_csrf: bool,

    /// Issue the request this many times concurrently
    #[arg(long, default_value_t = 1)]
    repeat: usize,
}

fn parse_query_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{}`", raw))
}

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the client and start the session timer
/// 4. Send the request(s) and print each response body
/// 5. End the session
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dashboard_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    info!(
        "Configuration loaded: base_url={}, cache_ttl={}s, cache_max_entries={}, refresh_interval={}s",
        config.base_url, config.cache_ttl, config.cache_max_entries, config.refresh_interval
    );

    let client = ApiClient::from_config(&config).context("failed to build API client")?;
    client.start_session().await;

    if cli.prime_csrf {
        client
            .prime_csrf()
            .await
            .context("failed to fetch CSRF token")?;
    }

    let mut request = ApiRequest::new(cli.method, cli.path.as_str());
    for (key, value) in cli.query {
        request = request.query(key, value);
    }
    if let Some(body) = cli.body {
        let body = serde_json::from_str(&body).context("--body is not valid JSON")?;
        request = request.json(body);
    }

    let handles: Vec<_> = (0..cli.repeat.max(1))
        .map(|_| {
            let client = client.clone();
            let request = request.clone();
            tokio::spawn(async move { client.send(request).await })
        })
        .collect();

    for handle in handles {
        let response = handle
            .await
            .context("request task panicked")?
            .with_context(|| format!("{} {} failed", request.method, request.path))?;
        println!("{}", serde_json::to_string_pretty(&response.body)?);
    }

    let stats = client.cache_stats().await;
    info!(
        "Done: cache_hits={}, cache_misses={}, hit_rate={:.2}, coalesced={}, refresh_calls={}",
        stats.hits,
        stats.misses,
        stats.hit_rate(),
        client.coalesced_count(),
        client.session().refresh_calls()
    );

    client.end_session().await;
    Ok(())
}
