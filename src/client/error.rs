use std::error::Error as StdError;
use thiserror::Error;

/// Transport-level failure of a single GET
///
/// Each variant carries the rendered error chain for logging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("TLS failure: {0}")]
    Tls(String),

    #[error("Connect timeout: {0}")]
    ConnectTimeout(String),

    #[error("Read timeout: {0}")]
    ReadTimeout(String),

    #[error("Name resolution failed: {0}")]
    NameResolution(String),

    #[error("Transport error: {0}")]
    Other(String),
}

const DNS_MARKERS: &[&str] = &[
    "dns error",
    "failed to lookup address",
    "name or service not known",
    "no such host",
    "nodename nor servname",
    "temporary failure in name resolution",
];

const TLS_MARKERS: &[&str] = &[
    "certificate",
    "handshake",
    "tls error",
    "tls alert",
    "invalid peer",
    "ssl routines",
];

impl TransportError {
    /// Classifies a reqwest error using its flags and source chain
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        classify_failure(err.is_timeout(), err.is_connect(), &error_chain(err))
    }
}

/// Classifies a transport failure
///
/// # Classification
///
/// | Condition | Result |
/// |-----------|--------|
/// | timeout during connect | ConnectTimeout |
/// | other timeout | ReadTimeout |
/// | resolver message in chain | NameResolution |
/// | certificate / handshake message in chain | Tls |
/// | anything else | Other |
pub fn classify_failure(is_timeout: bool, is_connect: bool, detail: &str) -> TransportError {
    let lower = detail.to_lowercase();
    let detail = detail.to_string();

    if is_timeout {
        return if is_connect {
            TransportError::ConnectTimeout(detail)
        } else {
            TransportError::ReadTimeout(detail)
        };
    }

    if DNS_MARKERS.iter().any(|m| lower.contains(m)) {
        return TransportError::NameResolution(detail);
    }

    if TLS_MARKERS.iter().any(|m| lower.contains(m)) {
        return TransportError::Tls(detail);
    }

    TransportError::Other(detail)
}

/// Renders an error and all of its sources as `outer: inner: ...`
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}
