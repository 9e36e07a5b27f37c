//! Forwarder adapter (C9): delegates the listener to an external resolver
//! process, owning only the overlay-file lifecycle (spec §4.6).
//!
//! Grounded on `examples/original_source/dnsutils/dnsserver.go`'s dnsmasq
//! mode: materialize a resolver file and a main config pointing at the
//! overlay path, copy the current hosts file in, (re)start the external
//! process, then register a hosts-record observer that rewrites the
//! overlay whenever the refresh pipeline produces a new mapping.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{error, info, warn};

use crate::error::HostwardenError;
use crate::overlay::HostsRecordObserver;

const RESOLV_CONF: &str = "/etc/resolv.conf";
const UPSTREAM_RESOLV_CONF: &str = "/etc/resolv.dnsmasq.conf";
const DNSMASQ_CONF: &str = "/etc/dnsmasq.d/hostwarden.conf";

pub struct Forwarder {
    bind_addr: String,
    overlay_path: PathBuf,
    upstreams: Vec<String>,
}

impl Forwarder {
    pub fn new(bind_addr: String, overlay_path: PathBuf, upstreams: Vec<String>) -> Self {
        Self {
            bind_addr,
            overlay_path,
            upstreams,
        }
    }

    /// Write the main resolv.conf, the upstream-only resolver file and the
    /// dnsmasq config, seed the overlay with the current hosts file, and
    /// (re)start dnsmasq. POSIX-only (spec §4.6, validated at startup by
    /// `Config::validate`).
    pub async fn install(&self, initial_hosts_path: &Path) -> Result<(), HostwardenError> {
        backup_then_write(Path::new(RESOLV_CONF), &self.resolv_conf()).await?;
        backup_then_write(Path::new(UPSTREAM_RESOLV_CONF), &self.upstream_resolv_conf()).await?;
        backup_then_write(Path::new(DNSMASQ_CONF), &self.dnsmasq_conf()).await?;

        let hosts_bytes = tokio::fs::read(initial_hosts_path).await.map_err(HostwardenError::Io)?;
        backup_then_write(&self.overlay_path, &hosts_bytes).await?;

        self.restart().await
    }

    /// Main `/etc/resolv.conf`: the local listener followed by every
    /// upstream, so lookups dnsmasq itself can't answer still fall through
    /// to the same resolvers this server would have used directly.
    fn resolv_conf(&self) -> Vec<u8> {
        let mut out = format!("nameserver {}\n", self.bind_ip());
        for upstream in &self.upstreams {
            let ip = upstream.split(':').next().unwrap_or(upstream);
            out.push_str(&format!("nameserver {ip}\n"));
        }
        out.into_bytes()
    }

    fn upstream_resolv_conf(&self) -> Vec<u8> {
        let mut out = String::new();
        for upstream in &self.upstreams {
            let ip = upstream.split(':').next().unwrap_or(upstream);
            out.push_str(&format!("nameserver {ip}\n"));
        }
        out.into_bytes()
    }

    fn dnsmasq_conf(&self) -> Vec<u8> {
        format!(
            "listen-address={}\naddn-hosts={}\nresolv-file={}\nno-poll\n",
            self.bind_ip(),
            self.overlay_path.display(),
            UPSTREAM_RESOLV_CONF,
        )
        .into_bytes()
    }

    fn bind_ip(&self) -> &str {
        self.bind_addr.rsplit_once(':').map_or(self.bind_addr.as_str(), |(ip, _)| ip)
    }

    async fn restart(&self) -> Result<(), HostwardenError> {
        let status = Command::new("systemctl")
            .args(["restart", "dnsmasq"])
            .status()
            .await
            .map_err(HostwardenError::Io)?;

        if !status.success() {
            return Err(HostwardenError::Forwarder(format!(
                "dnsmasq restart exited with {status}"
            )));
        }
        info!("dnsmasq restarted");
        Ok(())
    }

    /// Block forever, keeping the process alive to own the overlay-file
    /// and process lifecycle (spec §4.6).
    pub async fn block_forever(&self) -> ! {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        }
    }
}

/// Writes are idempotent-looking from the caller's perspective but the
/// previous content, if any, is preserved under a unique-suffixed backup
/// first (spec §6: "existing files are backed up with a unique suffix
/// before overwrite").
async fn backup_then_write(path: &Path, bytes: &[u8]) -> Result<(), HostwardenError> {
    if path.exists() {
        let suffix = crate::cache::now_secs();
        let backup = path.with_extension(format!("bak.{suffix}"));
        if let Err(e) = tokio::fs::copy(path, &backup).await {
            warn!(error = %e, path = %path.display(), "failed to back up existing file before overwrite");
        }
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    tokio::fs::write(path, bytes).await.map_err(HostwardenError::Io)
}

/// Rewrites the overlay path whenever the refresh pipeline produces a new
/// mapping, re-serializing it in plain hosts-file form.
pub struct OverlayFileWriter {
    pub overlay_path: PathBuf,
}

impl HostsRecordObserver for OverlayFileWriter {
    fn on_hosts_record(&self, record: &HashMap<String, Ipv4Addr>) {
        let mut text = String::new();
        for (host, ip) in record {
            text.push_str(&format!("{ip} {host}\n"));
        }

        let path = self.overlay_path.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::fs::write(&path, text).await {
                error!(error = %e, path = %path.display(), "failed to rewrite overlay file");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn backup_preserves_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay");
        tokio::fs::write(&path, b"old").await.unwrap();

        backup_then_write(&path, b"new").await.unwrap();

        let current = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(current, "new");

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut backup_found = false;
        while let Some(entry) = entries.next_entry().await.unwrap() {
            if entry.file_name().to_string_lossy().contains("bak") {
                backup_found = true;
            }
        }
        assert!(backup_found);
    }
}
