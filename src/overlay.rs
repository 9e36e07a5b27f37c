//! Overlay observer contracts (C8): the refresh pipeline fans a freshly
//! fetched hosts file out to whoever cares about it, in two shapes — the
//! raw file path (for an external process, e.g. dnsmasq, that rereads it
//! itself) and an independent copy of the parsed `hostname -> ip` mapping
//! (for anything that needs the data, not the file).
//!
//! Grounded on `examples/original_source/dnsutils/dnsserver.go`'s
//! `RegisterHostsFileObserver`/`RegisterHostsRecordObserver` pair.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::Path;

/// Notified with the path of the hosts file after every refresh, whether or
/// not its content changed (spec §4.4).
pub trait HostsFileObserver: Send + Sync {
    fn on_hosts_file(&self, path: &Path);
}

/// Notified with a fresh, independently-owned copy of the parsed mapping
/// only when the refresh detected a content change (spec §4.4, invariant
/// I4: observers never share a mutable reference to the same map).
pub trait HostsRecordObserver: Send + Sync {
    fn on_hosts_record(&self, record: &HashMap<String, Ipv4Addr>);
}
