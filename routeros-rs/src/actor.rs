use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::protocol::{
    Reply, Tag,
    codec::WordReader,
    error::ReadError,
    sentence::Sentence,
};
use crate::session::{BoxRead, Session};

/// Spawns the read loop of a session. Must be called at most once per session.
pub(crate) fn spawn(session: Arc<Session>, reader: WordReader<BoxRead>) {
    let shutdown = session.subscribe_shutdown();
    tokio::spawn(run(session, reader, shutdown));
}

/// Reads sentences until the session closes or the connection ends, routing each
/// tagged reply to the channel of the command that owns the tag.
async fn run(
    session: Arc<Session>,
    mut reader: WordReader<BoxRead>,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!("read loop started");

    loop {
        let result = tokio::select! {
            biased;
            _ = closed(&mut shutdown) => break,
            result = reader.read_sentence() => result,
        };

        match result {
            Ok(sentence) => {
                if !dispatch(&session, sentence, &mut shutdown).await {
                    break;
                }
            }
            Err(e) if e.is_end_of_stream() => {
                connection_lost(&session, &e).await;
                break;
            }
            Err(e) => {
                warn!(error = %e, "error reading from device, retrying");
                tokio::select! {
                    _ = closed(&mut shutdown) => break,
                    _ = tokio::time::sleep(session.config.read_retry_delay) => {}
                }
            }
        }
    }

    debug!("read loop stopped");
}

/// Delivers one sentence. Returns `false` if the session closed meanwhile.
async fn dispatch(
    session: &Session,
    sentence: Sentence,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    let Some(tag) = sentence.tag() else {
        debug!(marker = ?sentence.marker(), "discarding sentence without a valid tag");
        return true;
    };
    let Some(kind) = sentence.reply_kind() else {
        warn!(tag, marker = ?sentence.marker(), "discarding sentence with unknown reply type");
        return true;
    };
    // Bind first so the state lock is released before awaiting.
    let route = session.state().route(tag);
    let Some(sender) = route else {
        debug!(tag, %kind, "discarding reply for unknown tag");
        return true;
    };

    let reply = Reply::from_sentence(kind, sentence);
    let delivered = tokio::select! {
        biased;
        _ = closed(shutdown) => return false,
        result = sender.send(reply) => result.is_ok(),
    };

    if kind.is_terminal() {
        session.state().complete(tag);
    } else if !delivered {
        // The caller dropped its receiver while rows are still streaming.
        session.state().complete(tag);
        cancel(session, tag).await;
    }
    true
}

/// Asks the device to stop a command nobody listens to anymore.
async fn cancel(session: &Session, tag: Tag) {
    let cancel_tag = session.state().allocate_tag();
    debug!(tag, cancel_tag, "receiver dropped, cancelling command");

    let words = [
        "/cancel".to_string(),
        format!("=tag={tag}"),
        format!(".tag={cancel_tag}"),
    ];
    if let Err(e) = session.write(&words).await {
        warn!(tag, error = %e, "error sending cancel command");
    }
}

/// Closes the session after the device went away, telling every pending command.
async fn connection_lost(session: &Session, error: &ReadError) {
    let Some(pending) = session.close() else {
        return;
    };
    debug!(pending = pending.len(), error = %error, "connection lost");

    // A full channel is closed without the fatal reply.
    let reply = Reply::fatal(format!("connection closed: {error}"));
    for (tag, sender) in pending {
        if let Err(e) = sender.try_send(reply.clone()) {
            debug!(tag, error = %e, "closing channel without the fatal reply");
        }
    }
    session.shutdown_transport().await;
}

/// Resolves once the session has been closed.
async fn closed(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|closed| *closed).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::protocol::ReplyKind;
    use crate::trace::Tracer;
    use tokio::sync::mpsc;

    fn connected_session() -> Session {
        let (client_end, _device_end) = tokio::io::duplex(1024);
        let (reader, writer) = tokio::io::split(client_end);
        let session = Session::new(
            Box::new(reader),
            Box::new(writer),
            Arc::new(Tracer::default()),
            SessionConfig::default(),
        );
        session.state().mark_connected().unwrap();
        session
    }

    #[tokio::test]
    async fn test_dispatch_after_shutdown_delivers_nothing() {
        let session = connected_session();
        let (reply_tx, mut reply_rx) = mpsc::channel(4);
        let tag = session.state().register(reply_tx).unwrap();

        let (_signal, mut shutdown) = watch::channel(true);
        let tag_word = format!(".tag={tag}");
        for _ in 0..32 {
            let row = Sentence::from_words(["!re", "=name=ether1", tag_word.as_str()]);
            assert!(!dispatch(&session, row, &mut shutdown).await);
        }
        assert!(reply_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dispatch_routes_and_completes() {
        let session = connected_session();
        let (reply_tx, mut reply_rx) = mpsc::channel(4);
        let tag = session.state().register(reply_tx).unwrap();
        let (_signal, mut shutdown) = watch::channel(false);

        let tag_word = format!(".tag={tag}");
        let row = Sentence::from_words(["!re", "=name=ether1", tag_word.as_str()]);
        assert!(dispatch(&session, row, &mut shutdown).await);
        let done = Sentence::from_words(["!done", tag_word.as_str()]);
        assert!(dispatch(&session, done, &mut shutdown).await);

        assert_eq!(reply_rx.recv().await.unwrap().get("name"), Some("ether1"));
        assert_eq!(reply_rx.recv().await.unwrap().kind, ReplyKind::Done);
        assert!(reply_rx.recv().await.is_none());
        assert_eq!(session.state().pending_len(), 0);
    }
}
