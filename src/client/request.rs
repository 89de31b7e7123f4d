use std::time::Duration;

/// A single GET, built fresh for every worker iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    /// Full URL including the `num` query tag
    pub url: String,

    /// Counter value used for the tag
    pub query_tag: u64,

    /// User-Agent header value
    pub user_agent: String,

    pub timeout: Duration,

    /// Whether the server certificate is verified
    pub tls_verify: bool,
}

impl OutgoingRequest {
    /// Builds a request for `base`, tagged with `query_tag`
    pub fn new(
        base: &str,
        query_tag: u64,
        user_agent: &str,
        timeout: Duration,
        tls_verify: bool,
    ) -> Self {
        Self {
            url: tag_url(base, query_tag),
            query_tag,
            user_agent: user_agent.to_string(),
            timeout,
            tls_verify,
        }
    }
}

/// Appends the `num` query parameter to a base URL
///
/// Uses `?num=` when the base has no query string yet and `&num=` otherwise.
/// The base is otherwise left untouched (no normalization).
///
/// # Examples
///
/// ```
/// use sumi_flow::client::tag_url;
///
/// assert_eq!(tag_url("https://x.com", 7), "https://x.com?num=7");
/// assert_eq!(tag_url("https://x.com?a=1", 7), "https://x.com?a=1&num=7");
/// ```
pub fn tag_url(base: &str, tag: u64) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}num={}", base, separator, tag)
}
