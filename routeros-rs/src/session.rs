use std::fmt::{self, Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;
use tokio::io::{self, AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};

use crate::config::SessionConfig;
use crate::protocol::{
    Reply, Tag,
    codec::{WordReader, WordWriter},
};
use crate::trace::Tracer;

pub(crate) type BoxRead = Box<dyn AsyncRead + Send + Unpin>;
pub(crate) type BoxWrite = Box<dyn AsyncWrite + Send + Unpin>;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Dialed, login not completed yet.
    Authenticating,
    /// Logged in; the read loop is running.
    Connected,
    /// Closed by the caller or by the connection ending. Terminal.
    Closed,
}

impl Display for SessionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Authenticating => write!(f, "authenticating"),
            SessionStatus::Connected => write!(f, "connected"),
            SessionStatus::Closed => write!(f, "closed"),
        }
    }
}

/// Mutable state shared by callers, the read loop and `close`.
///
/// Every access goes through the single mutex in [`Session`]; the lock is never held
/// across an await.
#[derive(Debug)]
pub(crate) struct SessionState {
    status: SessionStatus,
    next_tag: Tag,
    pending: HashMap<Tag, mpsc::Sender<Reply>>,
}

impl SessionState {
    pub(crate) fn new() -> Self {
        Self {
            status: SessionStatus::Authenticating,
            next_tag: 0,
            pending: HashMap::new(),
        }
    }

    pub(crate) fn status(&self) -> SessionStatus {
        self.status
    }

    /// Returns the next tag not held by a pending command.
    pub(crate) fn allocate_tag(&mut self) -> Tag {
        loop {
            let tag = self.next_tag;
            self.next_tag = self.next_tag.wrapping_add(1);
            if !self.pending.contains_key(&tag) {
                return tag;
            }
        }
    }

    /// Allocates a tag and routes its replies to `sender`. Only valid while connected.
    pub(crate) fn register(&mut self, sender: mpsc::Sender<Reply>) -> Result<Tag, SessionStatus> {
        if self.status != SessionStatus::Connected {
            return Err(self.status);
        }
        let tag = self.allocate_tag();
        self.pending.insert(tag, sender);
        Ok(tag)
    }

    pub(crate) fn route(&self, tag: Tag) -> Option<mpsc::Sender<Reply>> {
        self.pending.get(&tag).cloned()
    }

    /// Removes the route of `tag`, closing its channel once in-flight deliveries finish.
    pub(crate) fn complete(&mut self, tag: Tag) -> Option<mpsc::Sender<Reply>> {
        self.pending.remove(&tag)
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Moves from `Authenticating` to `Connected`. Fails in any other state.
    pub(crate) fn mark_connected(&mut self) -> Result<(), SessionStatus> {
        match self.status {
            SessionStatus::Authenticating => {
                self.status = SessionStatus::Connected;
                Ok(())
            }
            status => Err(status),
        }
    }

    /// Moves to `Closed` and hands back every pending route.
    ///
    /// Returns [`None`] if the session was already closed, so that each route is
    /// drained exactly once.
    pub(crate) fn close(&mut self) -> Option<Vec<(Tag, mpsc::Sender<Reply>)>> {
        if self.status == SessionStatus::Closed {
            return None;
        }
        self.status = SessionStatus::Closed;
        Some(self.pending.drain().collect())
    }
}

/// A live connection: transport halves, shared state and the shutdown signal.
pub(crate) struct Session {
    state: Mutex<SessionState>,
    writer: tokio::sync::Mutex<WordWriter<BoxWrite>>,
    /// Held by the login handshake, then moved into the read loop.
    pub(crate) reader: tokio::sync::Mutex<Option<WordReader<BoxRead>>>,
    shutdown: watch::Sender<bool>,
    pub(crate) tracer: Arc<Tracer>,
    pub(crate) config: SessionConfig,
}

impl Session {
    pub(crate) fn new(
        reader: BoxRead,
        writer: BoxWrite,
        tracer: Arc<Tracer>,
        config: SessionConfig,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            state: Mutex::new(SessionState::new()),
            writer: tokio::sync::Mutex::new(WordWriter::new(writer, tracer.clone())),
            reader: tokio::sync::Mutex::new(Some(WordReader::new(
                reader,
                tracer.clone(),
                config.max_word_len,
            ))),
            shutdown,
            tracer,
            config,
        }
    }

    /// Locks the state. A poisoned lock is recovered: the state has no invariant a
    /// panicking holder could leave half-updated.
    pub(crate) fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn status(&self) -> SessionStatus {
        self.state().status()
    }

    /// Writes one sentence. Writers are serialized so sentences never interleave.
    pub(crate) async fn write<I, S>(&self, words: I) -> io::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.writer.lock().await.write_sentence(words).await
    }

    pub(crate) fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Marks the session closed and signals the read loop to stop.
    ///
    /// Returns the drained routes, or [`None`] if the session was already closed.
    pub(crate) fn close(&self) -> Option<Vec<(Tag, mpsc::Sender<Reply>)>> {
        let pending = self.state().close()?;
        self.shutdown.send_replace(true);
        Some(pending)
    }

    /// Shuts down the write half and, if no login holds it, drops the read half.
    pub(crate) async fn shutdown_transport(&self) {
        if let Err(e) = self.writer.lock().await.shutdown().await {
            tracing::debug!(error = %e, "transport shutdown failed");
        }
        if let Ok(mut reader) = self.reader.try_lock() {
            reader.take();
        }
    }
}
