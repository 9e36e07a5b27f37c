//! Refresh pipeline (C7): periodic fetch, change detection, parse, and
//! observer fan-out (spec §4.5).
//!
//! Grounded on `examples/original_source/dnsutils/dnsserver.go`'s refresh
//! goroutine: sleep, MD5-before, fetch-to-temp-then-rename, MD5-after,
//! compare, fan out to hosts-file observers, parse, fan out to
//! hosts-record observers. An HTTP fetch is a no-op when the configured
//! source is a local path rather than a URL — the file is read in place
//! and "unchanged" is decided the same way.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use md5::{Digest, Md5};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::config::HostSource;
use crate::hosts;
use crate::overlay::{HostsFileObserver, HostsRecordObserver};

pub struct RefreshPipeline {
    source: HostSource,
    overlay_path: PathBuf,
    interval: std::time::Duration,
    file_observers: Vec<Arc<dyn HostsFileObserver>>,
    record_observers: Vec<Arc<dyn HostsRecordObserver>>,
}

impl RefreshPipeline {
    pub fn new(source: HostSource, overlay_path: PathBuf, interval: std::time::Duration) -> Self {
        Self {
            source,
            overlay_path,
            interval,
            file_observers: Vec::new(),
            record_observers: Vec::new(),
        }
    }

    /// Observer lists are append-only and frozen once the loop starts
    /// (spec §5): register everything before calling `run`.
    pub fn register_file_observer(&mut self, observer: Arc<dyn HostsFileObserver>) {
        self.file_observers.push(observer);
    }

    pub fn register_record_observer(&mut self, observer: Arc<dyn HostsRecordObserver>) {
        self.record_observers.push(observer);
    }

    /// Perform the initial fetch-and-fan-out synchronously, so the overlay
    /// is populated before the listener starts accepting queries.
    pub async fn initial_load(&self) {
        self.tick().await;
    }

    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("refresh pipeline received shutdown signal");
                    return;
                }
                _ = tokio::time::sleep(self.interval) => {
                    self.tick().await;
                }
            }
        }
    }

    async fn tick(&self) {
        let before = digest_file(&self.overlay_path);

        if let Err(e) = self.fetch_into_overlay().await {
            warn!(error = %e, "refresh fetch failed, keeping previous overlay");
            return;
        }

        let after = digest_file(&self.overlay_path);
        if before == after {
            info!("hosts file unchanged, skipping observer fan-out");
            return;
        }

        for observer in &self.file_observers {
            observer.on_hosts_file(&self.overlay_path);
        }

        let record = match std::fs::read_to_string(&self.overlay_path).and_then(|text| {
            hosts::parse_hosts_str(&text).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        }) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(error = %e, "hosts file parse failed, record observers skipped");
                return;
            }
        };

        let record: std::collections::HashMap<String, std::net::Ipv4Addr> = record
            .into_iter()
            .filter_map(|(host, ip)| ip.parse().ok().map(|ip| (host, ip)))
            .collect();

        for observer in &self.record_observers {
            // Each observer gets its own copy; none may share a mutable
            // reference to the same map (spec §4.5, invariant I4).
            observer.on_hosts_record(&record.clone());
        }
    }

    /// Local path sources are read in place; URL sources are fetched to a
    /// temp file and renamed over the overlay path atomically.
    async fn fetch_into_overlay(&self) -> Result<(), crate::error::HostwardenError> {
        match &self.source {
            HostSource::Path(path) => {
                if path != &self.overlay_path {
                    let bytes = tokio::fs::read(path).await.map_err(crate::error::HostwardenError::Io)?;
                    write_atomic(&self.overlay_path, &bytes).await?;
                }
                Ok(())
            }
            HostSource::Url(url) => {
                let bytes = reqwest::get(url)
                    .await
                    .map_err(|e| crate::error::HostwardenError::Hosts(e.to_string()))?
                    .bytes()
                    .await
                    .map_err(|e| crate::error::HostwardenError::Hosts(e.to_string()))?;
                write_atomic(&self.overlay_path, &bytes).await
            }
        }
    }
}

async fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<(), crate::error::HostwardenError> {
    let tmp = dest.with_extension("tmp");
    tokio::fs::write(&tmp, bytes).await.map_err(crate::error::HostwardenError::Io)?;
    tokio::fs::rename(&tmp, dest).await.map_err(crate::error::HostwardenError::Io)?;
    Ok(())
}

fn digest_file(path: &Path) -> Vec<u8> {
    let bytes = std::fs::read(path).unwrap_or_default();
    Md5::digest(&bytes).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::Mutex;

    struct RecordingObserver {
        seen: Mutex<Vec<std::collections::HashMap<String, Ipv4Addr>>>,
    }

    impl HostsRecordObserver for RecordingObserver {
        fn on_hosts_record(&self, record: &std::collections::HashMap<String, Ipv4Addr>) {
            self.seen.lock().unwrap().push(record.clone());
        }
    }

    #[tokio::test]
    async fn unchanged_source_skips_fanout() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("hosts");
        std::fs::write(&source_path, "1.2.3.4 a.test\n").unwrap();
        let overlay_path = dir.path().join("overlay");
        std::fs::write(&overlay_path, "1.2.3.4 a.test\n").unwrap();

        let observer = Arc::new(RecordingObserver { seen: Mutex::new(Vec::new()) });
        let mut pipeline = RefreshPipeline::new(
            HostSource::Path(source_path),
            overlay_path,
            std::time::Duration::from_secs(900),
        );
        pipeline.register_record_observer(observer.clone());

        pipeline.tick().await;
        assert!(observer.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn changed_source_fans_out_independent_copies() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("hosts");
        std::fs::write(&source_path, "1.2.3.4 a.test\n").unwrap();
        let overlay_path = dir.path().join("overlay");
        std::fs::write(&overlay_path, "9.9.9.9 b.test\n").unwrap();

        let observer = Arc::new(RecordingObserver { seen: Mutex::new(Vec::new()) });
        let mut pipeline = RefreshPipeline::new(
            HostSource::Path(source_path),
            overlay_path,
            std::time::Duration::from_secs(900),
        );
        pipeline.register_record_observer(observer.clone());

        pipeline.tick().await;
        let seen = observer.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].get("a.test"), Some(&Ipv4Addr::new(1, 2, 3, 4)));
    }
}
