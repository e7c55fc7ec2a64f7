//! Subcommand implementations.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Method;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use pitchcache_core::cache::CompartmentKind;
use pitchcache_core::{
    CacheStore, ClientMessage, Config, DiskCacheStore, HttpNetwork, InterceptedRequest,
    Interceptor, Network, Response,
};

struct Runtime {
    interceptor: Interceptor,
    network: Arc<HttpNetwork>,
    messages: mpsc::Receiver<ClientMessage>,
}

fn open_store(config: &Config) -> Result<Arc<DiskCacheStore>> {
    let cache_dir = config.cache_dir()?;
    let store = DiskCacheStore::new(cache_dir.clone())
        .with_context(|| format!("Failed to open cache directory: {}", cache_dir.display()))?;
    Ok(Arc::new(store))
}

/// Wire an interceptor to the disk store and the real network, with this
/// terminal registered as a UI context.
fn runtime(config: &Config) -> Result<Runtime> {
    let store = open_store(config)?;
    let network = Arc::new(HttpNetwork::new(config.request_timeout())?);
    let interceptor = Interceptor::from_config(config, store.clone(), network.clone())?;
    let (_id, messages) = interceptor.broadcaster().register();
    Ok(Runtime {
        interceptor,
        network,
        messages,
    })
}

/// Print pending connectivity broadcasts as JSON lines on stderr.
fn print_messages(messages: &mut mpsc::Receiver<ClientMessage>) {
    while let Ok(message) = messages.try_recv() {
        match serde_json::to_string(&message) {
            Ok(line) => eprintln!("{}", line),
            Err(e) => warn!(error = %e, "Failed to encode broadcast"),
        }
    }
}

fn print_response(response: &Response, source: &str) -> Result<()> {
    eprintln!("{} ({})", response.status, source);
    let mut stdout = io::stdout().lock();
    stdout.write_all(&response.body)?;
    stdout.flush()?;
    Ok(())
}

pub fn build_request(
    url: &str,
    navigate: bool,
    method: &str,
    accept: Option<String>,
) -> Result<InterceptedRequest> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid method: {}", method))?;
    let mut request = InterceptedRequest::get(url)?.with_method(method);
    if navigate {
        request = request.with_navigate(true);
    }
    if let Some(accept) = accept {
        request = request.with_accept(accept);
    }
    Ok(request)
}

pub async fn install(config: &Config) -> Result<()> {
    let mut rt = runtime(config)?;
    let report = rt.interceptor.on_install().await?;
    print_messages(&mut rt.messages);

    if report.complete {
        println!("Cached {} shell assets for {}", report.cached, config.release_version);
    } else {
        println!("Shell cache incomplete for {}", config.release_version);
    }

    // Install always activates straight away
    let activation = rt.interceptor.on_activate(config.api_host.as_deref()).await?;
    print_messages(&mut rt.messages);
    println!("Activated, {} stale compartments removed", activation.deleted.len());
    Ok(())
}

pub async fn activate(config: &Config, api_host: Option<&str>) -> Result<()> {
    let mut rt = runtime(config)?;
    let host = api_host.or(config.api_host.as_deref());
    let report = rt.interceptor.on_activate(host).await?;
    print_messages(&mut rt.messages);

    for name in &report.deleted {
        println!("deleted {}", name);
    }
    println!("{} stale compartments removed", report.deleted.len());
    Ok(())
}

pub async fn fetch(config: &Config, config_path: &Path, request: InterceptedRequest) -> Result<()> {
    let mut rt = runtime(config)?;

    match rt.interceptor.handle(&request).await? {
        Some(interception) => {
            print_response(&interception.response, &format!("{:?}", interception.source))?;
            if let Some(revalidation) = interception.revalidation {
                // Keep the process alive until background work settles
                if let Err(e) = revalidation.await {
                    debug!(error = %e, "Revalidation task did not complete");
                }
            }
        }
        None => {
            debug!(url = %request.url, "Not intercepted, fetching directly");
            match rt.network.fetch(&request).await {
                Ok(response) => print_response(&response, "passthrough")?,
                Err(e) => eprintln!("Request failed: {}", e),
            }
        }
    }
    print_messages(&mut rt.messages);

    let current = rt.interceptor.current_api_host().await;
    if current.is_some() && current != config.api_host {
        let updated = Config {
            api_host: current,
            ..config.clone()
        };
        updated.save_to(config_path)?;
    }
    Ok(())
}

pub async fn list(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let summaries = store.summaries().await?;
    if summaries.is_empty() {
        println!("No cache compartments in {}", store.cache_dir().display());
        return Ok(());
    }

    for summary in summaries {
        let kind = match CompartmentKind::of(&summary.name) {
            CompartmentKind::Shell => "shell",
            CompartmentKind::Data => "data",
            CompartmentKind::Other => "other",
        };
        println!(
            "{:<40} {:<6} {:>5} entries  {}",
            summary.name,
            kind,
            summary.entries,
            summary.age_display()
        );
    }
    Ok(())
}

pub async fn clear(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let mut removed = 0;
    for name in store.names().await? {
        if store.delete(&name).await? {
            removed += 1;
        }
    }
    println!("Removed {} compartments", removed);
    Ok(())
}
