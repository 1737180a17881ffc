use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};

/// Direction of a traced word relative to this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Written to the device.
    Outbound,
    /// Read from the device.
    Inbound,
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outbound => write!(f, ">>>"),
            Direction::Inbound => write!(f, "<<<"),
        }
    }
}

/// Receives every word crossing the wire while debug tracing is enabled.
///
/// Implementations must be cheap: they run inline on the read loop and on writers.
pub trait WordObserver: Send + Sync {
    /// Called once per non-empty word.
    fn observe(&self, direction: Direction, word: &str);
}

/// Default observer, emitting each word as a `tracing` debug event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl WordObserver for TracingObserver {
    fn observe(&self, direction: Direction, word: &str) {
        tracing::debug!(target: "routeros_rs::wire", "{direction} {word}");
    }
}

/// Switchable word trace shared by the reader and writer of a session.
pub struct Tracer {
    enabled: AtomicBool,
    observer: Box<dyn WordObserver>,
}

impl Tracer {
    /// Creates a disabled tracer reporting to `observer`.
    pub fn new(observer: impl WordObserver + 'static) -> Self {
        Self {
            enabled: AtomicBool::new(false),
            observer: Box::new(observer),
        }
    }

    /// Turns the trace on.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Turns the trace off.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Whether words are currently forwarded to the observer.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub(crate) fn record(&self, direction: Direction, word: &str) {
        if self.is_enabled() && !word.is_empty() {
            self.observer.observe(direction, word);
        }
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new(TracingObserver)
    }
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Observer collecting words, shared with tests across modules.
    #[derive(Default, Clone)]
    pub(crate) struct Recorder(pub Arc<Mutex<Vec<(Direction, String)>>>);

    impl WordObserver for Recorder {
        fn observe(&self, direction: Direction, word: &str) {
            self.0.lock().unwrap().push((direction, word.to_string()));
        }
    }

    #[test]
    fn test_tracer_toggle() {
        let recorder = Recorder::default();
        let tracer = Tracer::new(recorder.clone());

        tracer.record(Direction::Outbound, "/login");
        assert!(recorder.0.lock().unwrap().is_empty());

        tracer.enable();
        tracer.record(Direction::Outbound, "/login");
        tracer.record(Direction::Inbound, "");
        tracer.record(Direction::Inbound, "!done");
        tracer.disable();
        tracer.record(Direction::Inbound, "!re");

        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![
                (Direction::Outbound, "/login".to_string()),
                (Direction::Inbound, "!done".to_string()),
            ]
        );
    }
}
