use crate::client::TransportError;
use std::fmt;

/// Classified result of one worker iteration's request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    // ===== Responses =====
    /// A response was received (any status the client did not retry away)
    Success(u16),

    /// HTTP 429 still surfaced after the client's own retries
    RateLimited,

    // ===== Transient Failures =====
    /// Certificate or handshake failure
    TlsFailure,

    /// The connect phase exceeded its timeout
    ConnectTimeout,

    /// The response phase exceeded its timeout
    ReadTimeout,

    /// Any other transport failure (refused, reset, protocol error, ...)
    OtherTransportError,

    // ===== Permanent Failures =====
    /// The endpoint's host could not be resolved
    NameResolutionFailure,

    // ===== Lifecycle =====
    /// Cancellation was observed before the request completed
    Interrupted,
}

impl Outcome {
    /// Classifies the transport result
    pub fn classify(result: &Result<u16, TransportError>) -> Self {
        match result {
            Ok(429) => Self::RateLimited,
            Ok(status) => Self::Success(*status),
            Err(TransportError::Tls(_)) => Self::TlsFailure,
            Err(TransportError::ConnectTimeout(_)) => Self::ConnectTimeout,
            Err(TransportError::ReadTimeout(_)) => Self::ReadTimeout,
            Err(TransportError::NameResolution(_)) => Self::NameResolutionFailure,
            Err(TransportError::Other(_)) => Self::OtherTransportError,
        }
    }

    /// Returns true if an HTTP response was received (and the counter advances)
    pub fn is_response(&self) -> bool {
        matches!(self, Self::Success(_) | Self::RateLimited)
    }

    /// Returns true if the target signalled throttling
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Success(429))
    }

    /// Returns true if the endpoint must be pruned from its pool
    pub fn prunes_endpoint(&self) -> bool {
        matches!(self, Self::NameResolutionFailure)
    }

    /// Returns true if this is a transport failure
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::TlsFailure
                | Self::ConnectTimeout
                | Self::ReadTimeout
                | Self::OtherTransportError
                | Self::NameResolutionFailure
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(status) => write!(f, "success ({})", status),
            Self::RateLimited => write!(f, "rate limited (429)"),
            Self::TlsFailure => write!(f, "tls failure"),
            Self::ConnectTimeout => write!(f, "connect timeout"),
            Self::ReadTimeout => write!(f, "read timeout"),
            Self::OtherTransportError => write!(f, "transport error"),
            Self::NameResolutionFailure => write!(f, "name resolution failure"),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}
