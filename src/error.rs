use thiserror::Error;

/// Unified error type for every fallible subsystem in the crate.
///
/// A panicking packet handler never surfaces as a value of this type: it is
/// caught by `listener.rs`'s inner `tokio::spawn`/`JoinHandle` boundary,
/// logged, and the datagram is dropped without a reply (spec §7). This type
/// is for startup and steady-state operational errors that do propagate:
/// binding the listener, opening the storage backend, validating
/// configuration.
#[derive(Debug, Error)]
pub enum HostwardenError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("dns wire format error: {0}")]
    Parse(#[from] ParseError),

    #[error("hosts-file error: {0}")]
    Hosts(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("upstream resolution failed: {0}")]
    Upstream(String),

    #[error("forwarder adapter error: {0}")]
    Forwarder(String),
}

/// Errors produced while decoding/encoding a DNS wire message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected end of packet")]
    UnexpectedEof,
    #[error("invalid label")]
    InvalidLabel,
    #[error("label compression pointer loop exceeded {0} jumps")]
    CompressionLoop(u32),
    #[error("invalid record data for type {0:?}")]
    InvalidRData(u16),
    #[error("invalid master-file record text: {0}")]
    InvalidMasterText(String),
}

impl From<std::io::Error> for ParseError {
    fn from(_: std::io::Error) -> Self {
        ParseError::UnexpectedEof
    }
}

pub type Result<T> = std::result::Result<T, HostwardenError>;
