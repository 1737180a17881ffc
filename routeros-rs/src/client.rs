use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::ToSocketAddrs;
use tokio::sync::mpsc;
use tracing::debug;

use crate::{
    actor,
    auth::{LoginHandshake, LoginStep},
    config::SessionConfig,
    error::{ClientError, ClientResult},
    protocol::Reply,
    session::{Session, SessionStatus},
    trace::{Tracer, TracingObserver, WordObserver},
    transport,
};

/// A client for a RouterOS device.
///
/// The `Client` owns one API session. Commands are written directly by the calling task;
/// a single background task reads every reply and routes it, by tag, to the channel
/// returned from [`Client::send_command`]. The client can be cheaply cloned to share the
/// session across tasks.
///
/// Dropping the last clone closes the session, just like [`Client::close`].
#[derive(Clone)]
pub struct Client(Arc<Handle>);

struct Handle {
    session: Arc<Session>,
}

impl Drop for Handle {
    fn drop(&mut self) {
        // Dropping the drained senders closes every pending channel.
        self.session.close();
    }
}

impl Client {
    /// Connects to a device over plain TCP (API port 8728).
    ///
    /// The session starts unauthenticated; call [`Client::login`] next.
    ///
    /// # Examples
    /// ```no_run
    /// let client = Client::dial("192.168.88.1:8728").await?;
    /// client.login("admin", "password").await?;
    /// ```
    ///
    /// # Attention 🚨
    /// The plain API transfers credentials and data unencrypted. Prefer
    /// [`Client::dial_tls`] (API-SSL, port 8729) outside trusted networks.
    pub async fn dial(addr: impl ToSocketAddrs) -> ClientResult<Self> {
        Self::dial_with_config(addr, SessionConfig::default()).await
    }

    /// Like [`Client::dial`], giving up after `timeout`.
    pub async fn dial_timeout(addr: impl ToSocketAddrs, timeout: Duration) -> ClientResult<Self> {
        tokio::time::timeout(timeout, Self::dial(addr))
            .await
            .map_err(|_| ClientError::Timeout(timeout))?
    }

    /// Like [`Client::dial`], with custom session settings.
    pub async fn dial_with_config(
        addr: impl ToSocketAddrs,
        config: SessionConfig,
    ) -> ClientResult<Self> {
        let stream = transport::connect_tcp(addr, config.nodelay).await?;
        debug!(peer = ?stream.peer_addr().ok(), "connected");
        let (reader, writer) = stream.into_split();
        Ok(Self::from_parts(
            Box::new(reader),
            Box::new(writer),
            Tracer::new(TracingObserver),
            config,
        ))
    }

    /// Connects to a device over TLS (API-SSL, port 8729).
    ///
    /// The host part of `addr` is verified against the device certificate according to
    /// `tls`. The whole connect and handshake is bounded by
    /// [`SessionConfig::tls_timeout`].
    #[cfg(feature = "tls")]
    pub async fn dial_tls(addr: &str, tls: Arc<rustls::ClientConfig>) -> ClientResult<Self> {
        let config = SessionConfig::default();
        let timeout = config.tls_timeout;
        Self::dial_tls_timeout_with_config(addr, tls, timeout, config).await
    }

    /// Like [`Client::dial_tls`], giving up after `timeout`.
    #[cfg(feature = "tls")]
    pub async fn dial_tls_timeout(
        addr: &str,
        tls: Arc<rustls::ClientConfig>,
        timeout: Duration,
    ) -> ClientResult<Self> {
        Self::dial_tls_timeout_with_config(addr, tls, timeout, SessionConfig::default()).await
    }

    /// TLS dial with custom session settings and deadline.
    #[cfg(feature = "tls")]
    pub async fn dial_tls_timeout_with_config(
        addr: &str,
        tls: Arc<rustls::ClientConfig>,
        timeout: Duration,
        config: SessionConfig,
    ) -> ClientResult<Self> {
        let stream = tokio::time::timeout(timeout, transport::connect_tls(addr, tls, config.nodelay))
            .await
            .map_err(|_| ClientError::Timeout(timeout))??;
        debug!(addr, "connected over TLS");
        Ok(Self::from_stream(stream, config))
    }

    /// Starts a session over an already established byte stream.
    pub fn from_stream<S>(stream: S, config: SessionConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self::from_stream_with_observer(stream, config, TracingObserver)
    }

    /// Starts a session over `stream`, sending the debug word trace to `observer`.
    pub fn from_stream_with_observer<S>(
        stream: S,
        config: SessionConfig,
        observer: impl WordObserver + 'static,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self::from_parts(
            Box::new(reader),
            Box::new(writer),
            Tracer::new(observer),
            config,
        )
    }

    fn from_parts(
        reader: Box<dyn AsyncRead + Send + Unpin>,
        writer: Box<dyn AsyncWrite + Send + Unpin>,
        tracer: Tracer,
        config: SessionConfig,
    ) -> Self {
        let session = Session::new(reader, writer, Arc::new(tracer), config);
        Self(Arc::new(Handle {
            session: Arc::new(session),
        }))
    }

    fn session(&self) -> &Arc<Session> {
        &self.0.session
    }

    /// Logs in and starts the background read loop.
    ///
    /// Handles both the current plain login and the challenge-response login of
    /// RouterOS versions before 6.43. There is no internal timeout; wrap the call in
    /// [`tokio::time::timeout`] if the device may not answer.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Auth`] if the device rejects the credentials.
    /// - [`ClientError::Transport`] or [`ClientError::Framing`] if the connection fails.
    /// - [`ClientError::InvalidState`] if the session is already logged in or closed.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<()> {
        let session = self.session();
        let mut reader_slot = session.reader.lock().await;

        let status = session.status();
        if status != SessionStatus::Authenticating {
            return Err(ClientError::InvalidState(status));
        }
        let reader = reader_slot
            .as_mut()
            .ok_or(ClientError::InvalidState(SessionStatus::Closed))?;

        let mut handshake =
            LoginHandshake::new(username, password, session.config.max_login_sentences);
        session.write(handshake.initial_sentence()).await?;

        loop {
            let sentence = reader.read_sentence().await?;
            match handshake.on_sentence(&sentence)? {
                LoginStep::Send(words) => session.write(words).await?,
                LoginStep::Continue => {}
                LoginStep::Authenticated => break,
            }
        }

        session
            .state()
            .mark_connected()
            .map_err(ClientError::InvalidState)?;
        if let Some(reader) = reader_slot.take() {
            actor::spawn(session.clone(), reader);
        }
        debug!(username, "authenticated");
        Ok(())
    }

    /// Sends a command and returns the channel its replies arrive on.
    ///
    /// Each argument is one API word, e.g. `=interface=ether1`, `?type=ether` or
    /// `=.proplist=name,mtu`. The correlation tag is added automatically.
    ///
    /// The call returns as soon as the command is written. The channel yields zero or
    /// more [`ReplyKind::Reply`](crate::protocol::ReplyKind::Reply) rows followed by
    /// exactly one terminal reply, after which it closes. Long-running commands such as
    /// `/interface/listen` keep streaming until cancelled; dropping the receiver cancels
    /// the command on the device. If the session closes first, the channel closes
    /// without a terminal reply, or with a synthesized `!fatal` when the connection was
    /// lost.
    ///
    /// # Examples
    /// ```no_run
    /// let mut replies = client.send_command("/interface/print", ["?type=ether"]).await?;
    /// while let Some(reply) = replies.recv().await {
    ///     println!("{:?}", reply.get("name"));
    /// }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidState`] before login or after close, and
    /// [`ClientError::Transport`] if writing fails. No route is left behind on error.
    pub async fn send_command<I, S>(
        &self,
        command: &str,
        args: I,
    ) -> ClientResult<mpsc::Receiver<Reply>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let session = self.session();
        let (reply_tx, reply_rx) = mpsc::channel(session.config.reply_capacity);

        let tag = session
            .state()
            .register(reply_tx)
            .map_err(ClientError::InvalidState)?;

        let mut words = vec![command.to_string()];
        words.extend(args.into_iter().map(|arg| arg.as_ref().to_string()));
        words.push(format!(".tag={tag}"));

        if let Err(e) = session.write(&words).await {
            session.state().complete(tag);
            return Err(e.into());
        }
        Ok(reply_rx)
    }

    /// Whether the session is logged in and not closed.
    pub fn is_connected(&self) -> bool {
        self.status() == SessionStatus::Connected
    }

    /// The lifecycle state of the session.
    pub fn status(&self) -> SessionStatus {
        self.session().status()
    }

    /// Closes the session.
    ///
    /// Stops the read loop, shuts down the transport and closes every pending reply
    /// channel; receivers see the end of the channel without a further reply. Calling
    /// it again has no effect.
    pub async fn close(&self) {
        let session = self.session();
        let Some(pending) = session.close() else {
            return;
        };
        debug!(pending = pending.len(), "closing session");
        drop(pending);
        session.shutdown_transport().await;
    }

    /// Starts reporting every word sent and received to the trace observer.
    pub fn enable_debug(&self) {
        self.session().tracer.enable();
    }

    /// Stops the word trace.
    pub fn disable_debug(&self) {
        self.session().tracer.disable();
    }
}
