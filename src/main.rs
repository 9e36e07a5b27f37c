use std::net::Ipv4Addr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use hostwarden::cache::{NegativeCache, RecordCache};
use hostwarden::config::{Config, HostSource, Mode, StorageKind};
use hostwarden::dns::tsig::TsigKey;
use hostwarden::forwarder::{Forwarder, OverlayFileWriter};
use hostwarden::handler::HandlerState;
use hostwarden::overlay::HostsRecordObserver;
use hostwarden::refresh::RefreshPipeline;
use hostwarden::shutdown::Shutdown;
use hostwarden::storage::{KvStore, MemoryStore, RedbStore};

/// A caching recursive DNS server with a dynamically refreshed hosts-file
/// overlay.
#[derive(Parser, Debug)]
#[command(name = "hostwarden", version, about)]
struct Cli {
    /// Local hosts-file path or http(s):// URL; overrides HOSTWARDEN_HOST_SOURCE.
    #[arg(long)]
    host_source: Option<String>,

    /// Comma-separated upstream resolver list; overrides HOSTWARDEN_UPSTREAMS.
    #[arg(long)]
    upstreams: Option<String>,

    /// "default" (internal listener) or "dnsmasq" (forwarder adapter).
    #[arg(long)]
    mode: Option<String>,

    /// Listener bind address; overrides HOSTWARDEN_BIND_ADDR.
    #[arg(long)]
    bind_addr: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    apply_overrides(&mut config, &cli);

    if let Err(e) = config.validate() {
        error!(error = %e, "configuration failed validation");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal error");
            ExitCode::FAILURE
        }
    }
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(source) = &cli.host_source {
        config.host_source = if source.starts_with("http://") || source.starts_with("https://") {
            HostSource::Url(source.clone())
        } else {
            HostSource::Path(source.into())
        };
    }
    if let Some(upstreams) = &cli.upstreams {
        config.upstreams = hostwarden::config::parse_upstreams(upstreams);
    }
    if let Some(mode) = &cli.mode {
        config.mode = match mode.as_str() {
            "dnsmasq" => Mode::Dnsmasq,
            _ => Mode::Default,
        };
    }
    if let Some(addr) = &cli.bind_addr {
        config.bind_addr = addr.clone();
    }
}

async fn run(config: Config) -> Result<(), hostwarden::error::HostwardenError> {
    let store: Arc<dyn KvStore> = match &config.storage {
        StorageKind::Memory => Arc::new(MemoryStore::new()),
        StorageKind::Disk(path) => Arc::new(RedbStore::open(path)?),
    };
    let cache = Arc::new(RecordCache::new(store));
    let shutdown = Shutdown::new();

    let overlay_path = match &config.host_source {
        HostSource::Path(path) => path.clone(),
        HostSource::Url(_) => config.overlay_path.clone(),
    };

    let mut pipeline = RefreshPipeline::new(config.host_source.clone(), overlay_path.clone(), config.refresh_interval);

    match config.mode {
        Mode::Default => {
            pipeline.register_record_observer(Arc::new(CacheOverlayWriter { cache: cache.clone() }));
            pipeline.initial_load().await;

            let state = Arc::new(HandlerState {
                cache: cache.clone(),
                negative: Arc::new(NegativeCache::new()),
                upstreams: config.upstreams.clone(),
                tsig_keys: tsig_keys_from_env(),
            });

            let listener_task = tokio::spawn(hostwarden::listener::run(
                config.bind_addr.clone(),
                state,
                shutdown.subscribe(),
            ));
            // Periodic refresh only applies to remote hosts-files; a local
            // path is loaded once at startup and never re-polled.
            let refresh_task = matches!(config.host_source, HostSource::Url(_))
                .then(|| tokio::spawn(pipeline.run(shutdown.subscribe())));

            hostwarden::shutdown::wait_for_signal().await;
            shutdown.shutdown(&cache).await;

            if let Ok(Err(e)) = listener_task.await {
                error!(error = %e, "listener exited with error");
            }
            if let Some(refresh_task) = refresh_task {
                let _ = refresh_task.await;
            }
            Ok(())
        }
        Mode::Dnsmasq => {
            let forwarder = Forwarder::new(
                config.bind_addr.clone(),
                config.overlay_path.clone(),
                config.upstreams.clone(),
            );
            let initial_hosts_path = match &config.host_source {
                HostSource::Path(path) => path.clone(),
                HostSource::Url(_) => overlay_path.clone(),
            };
            forwarder.install(&initial_hosts_path).await?;

            pipeline.register_record_observer(Arc::new(OverlayFileWriter {
                overlay_path: config.overlay_path.clone(),
            }));
            pipeline.initial_load().await;

            let refresh_task = matches!(config.host_source, HostSource::Url(_))
                .then(|| tokio::spawn(pipeline.run(shutdown.subscribe())));

            info!("forwarder mode running, owning overlay lifecycle only");
            tokio::select! {
                _ = hostwarden::shutdown::wait_for_signal() => {}
                _ = forwarder.block_forever() => {}
            }
            shutdown.shutdown(&cache).await;
            if let Some(refresh_task) = refresh_task {
                let _ = refresh_task.await;
            }
            Ok(())
        }
    }
}

/// Default-mode record observer: installs each refreshed mapping into the
/// cache as the authoritative overlay (spec §4.5/§4.2's `installOverlay`).
struct CacheOverlayWriter {
    cache: Arc<RecordCache>,
}

impl HostsRecordObserver for CacheOverlayWriter {
    fn on_hosts_record(&self, record: &std::collections::HashMap<String, Ipv4Addr>) {
        let cache = self.cache.clone();
        let record = record.clone();
        tokio::spawn(async move {
            match tokio::task::spawn_blocking(move || cache.install_overlay(&record)).await {
                Ok(Err(e)) => error!(error = %e, "overlay install failed"),
                Err(e) => error!(error = %e, "overlay install task panicked"),
                Ok(Ok(())) => {}
            }
        });
    }
}

fn tsig_keys_from_env() -> Vec<TsigKey> {
    let raw = match std::env::var("HOSTWARDEN_TSIG_KEYS") {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    raw.split(',')
        .filter_map(|entry| {
            let (name, secret) = entry.split_once(':')?;
            Some(TsigKey {
                name: name.to_string(),
                secret: secret.as_bytes().to_vec(),
            })
        })
        .collect()
}
