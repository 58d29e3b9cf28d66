//! Tracing for parse and inspection phases.
//!
//! A [TraceManager] emits entry / trace / exit events for named tasks.
//! Emission is a side channel: managers never affect control flow, and
//! detail serialization failures degrade to a sentinel string rather
//! than an error.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

/// The sentinel emitted when event details fail to serialize.
const SERIALIZATION_ERROR_SENTINEL: &str = "[serialization error]";

/// Represents the kind of a trace event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEventKind {
    /// A task was entered.
    Entry,
    /// A task emitted an intermediate message.
    Trace,
    /// A task was exited.
    Exit,
}

/// Represents a single trace emission.
#[derive(Debug, Clone)]
pub struct TraceEvent {
    /// The correlation id of the task.
    id: u64,
    /// The phase the task belongs to (e.g. `parse`, `inspect`).
    phase: &'static str,
    /// The name of the task.
    task: &'static str,
    /// The kind of the event.
    kind: TraceEventKind,
    /// The message of the event, if any.
    message: Option<String>,
    /// The serialized details of the event, if any.
    details: Option<String>,
    /// Milliseconds since the manager was created, on benchmarking
    /// managers.
    time_now: Option<u128>,
    /// Milliseconds since the task was entered, on benchmarking
    /// managers.
    time_delta: Option<u128>,
}

impl TraceEvent {
    /// Gets the correlation id of the task.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Gets the phase the task belongs to.
    pub fn phase(&self) -> &'static str {
        self.phase
    }

    /// Gets the name of the task.
    pub fn task(&self) -> &'static str {
        self.task
    }

    /// Gets the kind of the event.
    pub fn kind(&self) -> TraceEventKind {
        self.kind
    }

    /// Gets the message of the event, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Gets the serialized details of the event, if any.
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Gets the milliseconds since the manager was created, on
    /// benchmarking managers.
    pub fn time_now(&self) -> Option<u128> {
        self.time_now
    }

    /// Gets the milliseconds since the task was entered, on
    /// benchmarking managers.
    pub fn time_delta(&self) -> Option<u128> {
        self.time_delta
    }
}

/// The callback type trace events are reported through.
pub type ReportCallback = dyn Fn(&TraceEvent) + Send + Sync;

/// Represents the reporting style of a trace manager.
#[derive(Clone)]
enum TraceStyle {
    /// Events are discarded.
    NoOp,
    /// Events are reported to a callback.
    Report(Arc<ReportCallback>),
    /// Events are reported to a callback with timing information.
    Benchmark(Arc<ReportCallback>),
}

/// Emits entry / trace / exit events for named tasks.
#[derive(Clone)]
pub struct TraceManager {
    /// The reporting style of the manager.
    style: TraceStyle,
    /// The source of task correlation ids.
    next_id: Arc<AtomicU64>,
    /// The instant the manager was created.
    created: Instant,
}

impl std::fmt::Debug for TraceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let style = match self.style {
            TraceStyle::NoOp => "NoOp",
            TraceStyle::Report(_) => "Report",
            TraceStyle::Benchmark(_) => "Benchmark",
        };
        f.debug_struct("TraceManager").field("style", &style).finish()
    }
}

impl TraceManager {
    /// Creates a manager that discards all events.
    pub fn no_op() -> Self {
        Self::new(TraceStyle::NoOp, 0)
    }

    /// Creates a manager that reports events to the given callback.
    pub fn report(callback: impl Fn(&TraceEvent) + Send + Sync + 'static) -> Self {
        Self::new(TraceStyle::Report(Arc::new(callback)), 0)
    }

    /// Creates a manager that reports events with timing information
    /// to the given callback.
    pub fn benchmark(callback: impl Fn(&TraceEvent) + Send + Sync + 'static) -> Self {
        Self::new(TraceStyle::Benchmark(Arc::new(callback)), 0)
    }

    /// Creates a manager with the given style and initial correlation
    /// id.
    fn new(style: TraceStyle, initial_id: u64) -> Self {
        Self {
            style,
            next_id: Arc::new(AtomicU64::new(initial_id)),
            created: Instant::now(),
        }
    }

    /// Seeds the correlation id source.
    pub fn with_initial_correlation_id(self, id: u64) -> Self {
        self.next_id.store(id, Ordering::Relaxed);
        self
    }

    /// Enters a named task, emitting an entry event.
    pub fn entry(&self, phase: &'static str, task: &'static str, details: Option<&Value>) -> Trace {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let trace = Trace {
            manager: self.clone(),
            id,
            phase,
            task,
            entered: Instant::now(),
        };
        trace.emit(TraceEventKind::Entry, None, details);
        trace
    }

    /// Serializes details, falling back to a sentinel on failure.
    fn serialize(details: &Value) -> String {
        serde_json::to_string(details).unwrap_or_else(|_| SERIALIZATION_ERROR_SENTINEL.to_string())
    }
}

/// An entered task that emits trace and exit events.
#[derive(Debug)]
pub struct Trace {
    /// The manager the task reports through.
    manager: TraceManager,
    /// The correlation id of the task.
    id: u64,
    /// The phase the task belongs to.
    phase: &'static str,
    /// The name of the task.
    task: &'static str,
    /// The instant the task was entered.
    entered: Instant,
}

impl Trace {
    /// Emits an intermediate trace event for the task.
    pub fn trace(&self, message: &str, details: Option<&Value>) {
        self.emit(TraceEventKind::Trace, Some(message), details);
    }

    /// Exits the task, emitting an exit event.
    pub fn exit(self, details: Option<&Value>) {
        self.emit(TraceEventKind::Exit, None, details);
    }

    /// Emits an event of the given kind for the task.
    fn emit(&self, kind: TraceEventKind, message: Option<&str>, details: Option<&Value>) {
        let (callback, timed) = match &self.manager.style {
            TraceStyle::NoOp => return,
            TraceStyle::Report(callback) => (callback, false),
            TraceStyle::Benchmark(callback) => (callback, true),
        };

        let event = TraceEvent {
            id: self.id,
            phase: self.phase,
            task: self.task,
            kind,
            message: message.map(|m| m.to_string()),
            details: details.map(TraceManager::serialize),
            time_now: timed.then(|| self.manager.created.elapsed().as_millis()),
            time_delta: timed.then(|| self.entered.elapsed().as_millis()),
        };

        tracing::trace!(
            phase = self.phase,
            task = self.task,
            id = self.id,
            kind = ?kind,
            "trace event"
        );

        callback(&event);
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn no_op_discards_events() {
        let manager = TraceManager::no_op();
        let trace = manager.entry("parse", "document", None);
        trace.trace("midway", None);
        trace.exit(None);
    }

    #[test]
    fn report_emits_entry_trace_exit() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let manager = TraceManager::report(move |event| {
            sink.lock().unwrap().push((event.kind(), event.task()));
        });

        let trace = manager.entry("parse", "document", None);
        trace.trace("midway", None);
        trace.exit(None);

        assert_eq!(
            events.lock().unwrap().as_slice(),
            &[
                (TraceEventKind::Entry, "document"),
                (TraceEventKind::Trace, "document"),
                (TraceEventKind::Exit, "document"),
            ],
        );
    }

    #[test]
    fn benchmark_adds_timing() {
        let seen = Arc::new(Mutex::new(false));
        let sink = seen.clone();
        let manager = TraceManager::benchmark(move |event| {
            assert!(event.time_now().is_some());
            assert!(event.time_delta().is_some());
            *sink.lock().unwrap() = true;
        });

        manager.entry("parse", "document", None).exit(None);
        assert!(*seen.lock().unwrap());
    }

    #[test]
    fn details_are_serialized() {
        let details = Arc::new(Mutex::new(None));
        let sink = details.clone();
        let manager = TraceManager::report(move |event| {
            if event.kind() == TraceEventKind::Entry {
                *sink.lock().unwrap() = event.details().map(|d| d.to_string());
            }
        });

        let value = serde_json::json!({ "tokens": 3 });
        manager.entry("lex", "snapshot", Some(&value)).exit(None);
        assert_eq!(
            details.lock().unwrap().as_deref(),
            Some(r#"{"tokens":3}"#)
        );
    }
}
