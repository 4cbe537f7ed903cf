use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;
use url::Url;

use parva_core::api::{ApiClient, RawEnvelope, RequestError};
use parva_core::cache::{CacheStore, DiskCacheStore};
use parva_core::net::{Fetcher, HttpRequest, HttpResponse, Method, ReqwestFetcher};
use parva_core::offline::{FetchOutcome, OfflineAgent, ResolutionSource};
use parva_core::Config;

use crate::cli::{Command, ConfigAction, OfflineAction};

pub async fn api(config: &Config, command: Command) -> Result<()> {
    let client = ApiClient::from_config(config)?;
    let plan = client.retry_plan();
    debug!(
        base_url = client.base_url(),
        attempts = plan.total_attempts(),
        backoff_ms = plan.backoff.as_millis() as u64,
        "API client ready"
    );

    let result = match command {
        Command::Today => client.today().await,
        Command::Convert { date } => client.convert(&date).await,
        Command::Panchanga { date } => client.panchanga(date.as_deref()).await,
        Command::Upcoming { days } => client.upcoming(days).await,
        Command::Observances(args) => {
            client
                .observances(&args.date, &args.location, args.preferences.as_deref())
                .await
        }
        Command::Next(args) => {
            client
                .next_observance(
                    args.from.as_deref(),
                    args.days,
                    &args.location,
                    args.preferences.as_deref(),
                )
                .await
        }
        Command::Festival { id, year } => client.explain_festival(&id, year).await,
        Command::Trace { trace_id } => client.explain_trace(&trace_id).await,
        Command::Resolve(args) => client.resolve(&args.date, &args.options()).await,
        Command::Conformance => client.spec_conformance().await,
        Command::Verify { trace_id } => client.verify_trace(&trace_id).await,
        Command::Offline(_) | Command::Config(_) => {
            bail!("Not an API command")
        }
    };

    print_envelope(result.map_err(|e| anyhow!(describe(&e)))?)
}

fn print_envelope(envelope: RawEnvelope) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

/// User-facing message for a failed API call.
fn describe(err: &RequestError) -> String {
    let server_message = err
        .detail()
        .and_then(|d| d.message())
        .map(|m| format!(": {}", m))
        .unwrap_or_default();

    match err.status_code() {
        Some(400) | Some(422) => format!("The server rejected the request{}", server_message),
        Some(404) => format!("Not found{}", server_message),
        Some(status) if status >= 500 => {
            format!("The Parva server is having trouble ({}){}", status, server_message)
        }
        Some(status) => format!("Request failed ({}){}", status, server_message),
        None => match err {
            RequestError::NetworkUnavailable { .. } | RequestError::Timeout { .. } => {
                format!("Could not reach the Parva server: {}", err)
            }
            other => other.to_string(),
        },
    }
}

/// Print the effective configuration, or write it out with `init`.
pub fn config(config: &Config, action: Option<ConfigAction>) -> Result<()> {
    match action {
        None => println!("{}", serde_json::to_string_pretty(config)?),
        Some(ConfigAction::Init) => {
            let path = config.save()?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

pub async fn offline(config: &Config, action: OfflineAction) -> Result<()> {
    let store = Arc::new(DiskCacheStore::new(config.cache_dir()?)?);
    let network = Arc::new(ReqwestFetcher::new()?);

    match action {
        OfflineAction::Install => install(config, store, network).await,
        OfflineAction::Fetch { url } => fetch(config, store, network, &url).await,
        OfflineAction::Buckets => buckets(store).await,
    }
}

async fn install(
    config: &Config,
    store: Arc<DiskCacheStore>,
    network: Arc<ReqwestFetcher>,
) -> Result<()> {
    let agent = OfflineAgent::new(config.agent_config()?, store, network);
    let deleted = agent.start().await.context("Offline install failed")?;

    println!("Installed {} ({})", agent.version(), agent.scope());
    for bucket in deleted {
        println!("  removed stale bucket {}", bucket);
    }
    Ok(())
}

async fn fetch(
    config: &Config,
    store: Arc<DiskCacheStore>,
    network: Arc<ReqwestFetcher>,
    raw_url: &str,
) -> Result<()> {
    let agent = OfflineAgent::new(config.agent_config()?, store, network.clone());
    if !agent.resume().await? {
        debug!("No installed version found, installing");
        agent.start().await.context("Offline install failed")?;
    }

    let url = Url::parse(raw_url)
        .or_else(|_| agent.scope().join(raw_url))
        .with_context(|| format!("Invalid URL: {}", raw_url))?;
    let request = agent.intercept(Method::GET, url.clone());

    let (response, source) = match agent.fetch(&request).await {
        FetchOutcome::Responded(resolution) => {
            (resolution.response, source_label(resolution.source))
        }
        FetchOutcome::Passthrough => {
            let response = network
                .fetch(&HttpRequest::get(url))
                .await
                .context("Request failed")?;
            (response, "passthrough")
        }
    };

    print_response(&response, source);
    Ok(())
}

fn source_label(source: ResolutionSource) -> &'static str {
    match source {
        ResolutionSource::Cache => "cache",
        ResolutionSource::Network => "network",
        ResolutionSource::StaleCache => "stale cache",
        ResolutionSource::OfflineFallback => "offline fallback",
    }
}

fn print_response(response: &HttpResponse, source: &str) {
    eprintln!("{} ({})", response.status, source);
    println!("{}", response.text());
}

async fn buckets(store: Arc<DiskCacheStore>) -> Result<()> {
    let names = store.keys().await?;
    if names.is_empty() {
        println!("No cache buckets in {}", store.cache_dir().display());
        return Ok(());
    }

    for name in names {
        let keys = store.entries(&name).await?;
        println!("{} ({} entries)", name, keys.len());
        for key in keys {
            let age = store
                .get(&name, &key)
                .await?
                .map(|cached| cached.age_display())
                .unwrap_or_else(|| "missing".to_string());
            println!("  {}  [{}]", key, age);
        }
    }
    Ok(())
}
