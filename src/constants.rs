use std::time::Duration;

/// Positive-answer cache TTL applied to every upstream writeback, regardless
/// of the upstream's own per-RR TTL (see DESIGN.md Q3).
pub const DEFAULT_POSITIVE_TTL: u64 = 60;

/// Negative-cache suppression window after an upstream failure/empty answer.
pub const FAIL_TTL: u64 = 15;

/// Sentinel expiry used by overlay entries; never trimmed on read.
pub const NEVER: u64 = 0;

/// Sentinel query type matching any queried type, reserved for hosts-file
/// sourced entries.
pub const ANY_TYPE: u16 = 0;

/// Per-upstream UDP query timeout.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);

/// Default interval between hosts-file refreshes.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Default upstream resolvers used when none are configured (see DESIGN.md Q1).
pub const DEFAULT_UPSTREAMS: [&str; 2] = ["223.5.5.5:53", "223.6.6.6:53"];

/// Reserved cache key naming the set of domain keys owned by the overlay.
pub const OVERLAY_KEYS_NAME: &str = "__overlay_keys__";

/// Default UDP listener bind address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:53";

/// Default overlay path written by the forwarder adapter.
pub const DEFAULT_OVERLAY_PATH: &str = "/etc/usr_hosts";

/// TSIG fudge window, in seconds, matching the Go source's `dns.HmacMD5, 300, ...`.
pub const TSIG_FUDGE: u16 = 300;
