use std::time::Duration;

/// Tunables of a [`Client`](crate::Client) session.
///
/// The defaults suit a RouterOS device on a LAN; every field can be changed with the
/// matching `with_*` method.
///
/// # Examples
/// ```no_run
/// use std::time::Duration;
/// use routeros_rs::SessionConfig;
///
/// let config = SessionConfig::default()
///     .with_reply_capacity(64)
///     .with_read_retry_delay(Duration::from_millis(250));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Capacity of each command's reply channel. A full channel stalls the read loop.
    pub reply_capacity: usize,
    /// Pause before the read loop retries after a read error that did not end the stream.
    pub read_retry_delay: Duration,
    /// Replies the login handshake reads before giving up.
    pub max_login_sentences: usize,
    /// Longest word accepted from the device, in bytes.
    pub max_word_len: u32,
    /// Deadline used by [`Client::dial_tls`](crate::Client::dial_tls).
    pub tls_timeout: Duration,
    /// Whether to disable Nagle's algorithm on the TCP socket.
    pub nodelay: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reply_capacity: 10,
            read_retry_delay: Duration::from_millis(100),
            max_login_sentences: 32,
            max_word_len: 16 * 1024 * 1024,
            tls_timeout: Duration::from_secs(30),
            nodelay: true,
        }
    }
}

impl SessionConfig {
    /// Sets [`SessionConfig::reply_capacity`]. Zero is raised to one.
    pub fn with_reply_capacity(mut self, capacity: usize) -> Self {
        self.reply_capacity = capacity.max(1);
        self
    }

    /// Sets [`SessionConfig::read_retry_delay`].
    pub fn with_read_retry_delay(mut self, delay: Duration) -> Self {
        self.read_retry_delay = delay;
        self
    }

    /// Sets [`SessionConfig::max_login_sentences`].
    pub fn with_max_login_sentences(mut self, max: usize) -> Self {
        self.max_login_sentences = max;
        self
    }

    /// Sets [`SessionConfig::max_word_len`].
    pub fn with_max_word_len(mut self, max: u32) -> Self {
        self.max_word_len = max;
        self
    }

    /// Sets [`SessionConfig::tls_timeout`].
    pub fn with_tls_timeout(mut self, timeout: Duration) -> Self {
        self.tls_timeout = timeout;
        self
    }

    /// Sets [`SessionConfig::nodelay`].
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.reply_capacity, 10);
        assert_eq!(config.read_retry_delay, Duration::from_millis(100));
        assert_eq!(config.tls_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        assert_eq!(SessionConfig::default().with_reply_capacity(0).reply_capacity, 1);
    }
}
