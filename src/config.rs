use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{DEFAULT_BIND_ADDR, DEFAULT_OVERLAY_PATH, DEFAULT_UPSTREAMS};
use crate::error::HostwardenError;

/// Listener mode: run our own UDP server, or delegate to an external
/// forwarder process and only own the overlay-file lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Default,
    Dnsmasq,
}

/// Where the hosts-file overlay comes from.
#[derive(Debug, Clone)]
pub enum HostSource {
    Path(PathBuf),
    Url(String),
}

/// Where cache entries are stored.
#[derive(Debug, Clone)]
pub enum StorageKind {
    Memory,
    Disk(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host_source: HostSource,
    pub upstreams: Vec<String>,
    pub mode: Mode,
    pub bind_addr: String,
    pub refresh_interval: Duration,
    pub storage: StorageKind,
    pub overlay_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host_source: HostSource::Path(PathBuf::from("/etc/hosts")),
            upstreams: DEFAULT_UPSTREAMS.iter().map(|s| s.to_string()).collect(),
            mode: Mode::Default,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            refresh_interval: crate::constants::REFRESH_INTERVAL,
            storage: StorageKind::Memory,
            overlay_path: PathBuf::from(DEFAULT_OVERLAY_PATH),
        }
    }
}

impl Config {
    /// Build a `Config` from `HOSTWARDEN_*` environment variables, falling
    /// back to `Default::default()` for anything unset.
    pub fn from_env() -> Result<Self, HostwardenError> {
        let mut config = Config::default();

        if let Ok(source) = std::env::var("HOSTWARDEN_HOST_SOURCE") {
            config.host_source = parse_host_source(&source);
        }

        if let Ok(upstreams) = std::env::var("HOSTWARDEN_UPSTREAMS") {
            config.upstreams = parse_upstreams(&upstreams);
        }

        if let Ok(mode) = std::env::var("HOSTWARDEN_MODE") {
            config.mode = match mode.as_str() {
                "dnsmasq" => Mode::Dnsmasq,
                "default" => Mode::Default,
                other => {
                    return Err(HostwardenError::Config(format!(
                        "unknown HOSTWARDEN_MODE {other:?}, expected \"default\" or \"dnsmasq\""
                    )));
                }
            };
        }

        if let Ok(addr) = std::env::var("HOSTWARDEN_BIND_ADDR") {
            config.bind_addr = addr;
        }

        if let Ok(secs) = std::env::var("HOSTWARDEN_REFRESH_INTERVAL_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                HostwardenError::Config(format!("invalid HOSTWARDEN_REFRESH_INTERVAL_SECS {secs:?}"))
            })?;
            config.refresh_interval = Duration::from_secs(secs);
        }

        if let Ok(storage) = std::env::var("HOSTWARDEN_STORAGE") {
            config.storage = parse_storage(&storage)?;
        }

        if let Ok(path) = std::env::var("HOSTWARDEN_OVERLAY_PATH") {
            config.overlay_path = PathBuf::from(path);
        }

        Ok(config)
    }

    /// Validate the configuration, per spec §7's fatal-at-startup error
    /// disposition (invalid bind address, unwritable overlay path, dnsmasq
    /// mode on a non-POSIX host).
    pub fn validate(&self) -> Result<(), HostwardenError> {
        self.bind_addr
            .parse::<SocketAddr>()
            .map_err(|e| HostwardenError::Config(format!("invalid bind_addr {:?}: {e}", self.bind_addr)))?;

        if self.mode == Mode::Dnsmasq && !cfg!(unix) {
            return Err(HostwardenError::Config(
                "dnsmasq forwarder mode is only supported on POSIX hosts".into(),
            ));
        }

        if let StorageKind::Disk(path) = &self.storage {
            let parent = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            if !parent.exists() {
                return Err(HostwardenError::Config(format!(
                    "storage path {:?} parent directory does not exist",
                    path
                )));
            }
        }

        if self.mode == Mode::Dnsmasq {
            if let Some(parent) = self.overlay_path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(HostwardenError::Config(format!(
                        "overlay path {:?} parent directory does not exist",
                        self.overlay_path
                    )));
                }
            }
        }

        Ok(())
    }
}

fn parse_host_source(raw: &str) -> HostSource {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        HostSource::Url(raw.to_string())
    } else {
        HostSource::Path(PathBuf::from(raw))
    }
}

fn parse_storage(raw: &str) -> Result<StorageKind, HostwardenError> {
    if raw == "memory" {
        return Ok(StorageKind::Memory);
    }
    if let Some(path) = raw.strip_prefix("disk:") {
        return Ok(StorageKind::Disk(PathBuf::from(path)));
    }
    Err(HostwardenError::Config(format!(
        "unknown HOSTWARDEN_STORAGE {raw:?}, expected \"memory\" or \"disk:<path>\""
    )))
}

/// Parse the upstream list per spec §6: comma-separated `host[:port]`,
/// entries shorter than 5 characters dropped, missing port defaults to 53,
/// empty result falls back to the public defaults.
///
/// Preserves the source's defaults-bug (DESIGN.md Q1): the length filter is
/// applied to produce the *returned* list, but when the input was empty to
/// begin with the defaults are substituted before filtering and therefore
/// always survive intact, matching `dnsserver.go`'s behavior.
pub fn parse_upstreams(raw: &str) -> Vec<String> {
    let raw_list: Vec<&str> = if raw.trim().is_empty() {
        DEFAULT_UPSTREAMS.to_vec()
    } else {
        raw.split(',').collect()
    };

    let filtered: Vec<String> = raw_list
        .iter()
        .filter(|s| s.len() >= 5)
        .map(|s| normalize_upstream(s))
        .collect();

    if filtered.is_empty() {
        DEFAULT_UPSTREAMS.iter().map(|s| s.to_string()).collect()
    } else {
        filtered
    }
}

fn normalize_upstream(entry: &str) -> String {
    let entry = entry.trim();
    if entry.contains(':') {
        entry.to_string()
    } else {
        format!("{entry}:53")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_upstreams_falls_back_to_defaults() {
        let parsed = parse_upstreams("");
        assert_eq!(parsed, vec!["223.5.5.5:53", "223.6.6.6:53"]);
    }

    #[test]
    fn short_entries_are_dropped() {
        let parsed = parse_upstreams("1.1.1.1:53,a,bb,8.8.8.8");
        assert_eq!(parsed, vec!["1.1.1.1:53", "8.8.8.8:53"]);
    }

    #[test]
    fn missing_port_defaults_to_53() {
        let parsed = parse_upstreams("9.9.9.9");
        assert_eq!(parsed, vec!["9.9.9.9:53"]);
    }

    #[test]
    fn validate_rejects_bad_bind_addr() {
        let mut config = Config::default();
        config.bind_addr = "not-an-addr".to_string();
        assert!(config.validate().is_err());
    }
}
