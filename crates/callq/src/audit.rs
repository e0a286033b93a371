//! Audit trail of dispatch cycles.
//!
//! The audit stream is the human-readable record of what the client did with
//! each request, one line per cycle, for example:
//!
//! ```text
//! id = X1, req = add(2, 3), resp = 5
//! id = X2, req = add(2, 3), resp = 5, (NOT PUBLISHED)
//! ```
//!
//! It is separate from diagnostic logging so it can be shown to a user or
//! captured by a test harness verbatim.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// Tracing target used by [`TracingAuditSink`].
pub const AUDIT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::audit");

/// Append-only destination for audit lines.
pub trait AuditSink: Send + Sync {
    /// Records one line.
    fn log_line(&self, line: &str);
}

impl<T> AuditSink for Arc<T>
where
    T: AuditSink + ?Sized,
{
    fn log_line(&self, line: &str) {
        (**self).log_line(line);
    }
}

/// Emits audit lines as `tracing` events at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl TracingAuditSink {
    /// Builds a new sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl AuditSink for TracingAuditSink {
    fn log_line(&self, line: &str) {
        tracing::info!(target: AUDIT_TARGET, "{line}");
    }
}

/// Writes audit lines to any [`Write`] implementation.
#[derive(Debug)]
pub struct WriterAuditSink<W> {
    writer: Mutex<W>,
}

impl<W> WriterAuditSink<W> {
    /// Wraps a writer.
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl WriterAuditSink<io::Stdout> {
    /// Sink printing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W> AuditSink for WriterAuditSink<W>
where
    W: Write + Send,
{
    fn log_line(&self, line: &str) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(error) = writeln!(writer, "{line}").and_then(|()| writer.flush()) {
            tracing::warn!(target: AUDIT_TARGET, %error, "failed to write audit line");
        }
    }
}

/// Keeps audit lines in memory and forwards them to an optional inner sink.
#[derive(Default)]
pub struct BufferedAuditSink {
    lines: Mutex<Vec<String>>,
    inner: Option<Arc<dyn AuditSink>>,
}

impl BufferedAuditSink {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer that also forwards every line to `inner`.
    #[must_use]
    pub fn forwarding_to(inner: Arc<dyn AuditSink>) -> Self {
        Self {
            lines: Mutex::new(Vec::new()),
            inner: Some(inner),
        }
    }

    /// Copy of the recorded lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded lines joined with newlines.
    #[must_use]
    pub fn log(&self) -> String {
        self.lines().join("\n")
    }

    /// Discards recorded lines.
    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl AuditSink for BufferedAuditSink {
    fn log_line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_owned());
        if let Some(inner) = &self.inner {
            inner.log_line(line);
        }
    }
}

/// Joins the non-empty fragments of one audit line with `, `.
pub(crate) fn compose_line<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex, PoisonError};

    use rstest::rstest;
    use tracing::Level;

    use super::*;

    /// Shared in-memory writer handed to a scoped `fmt` subscriber.
    #[derive(Clone, Default)]
    struct CapturedWriter(Arc<Mutex<Vec<u8>>>);

    impl CapturedWriter {
        fn contents(&self) -> String {
            let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            String::from_utf8_lossy(&bytes).into_owned()
        }
    }

    impl io::Write for CapturedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn traced(max_level: Level, line: &str) -> String {
        let captured = CapturedWriter::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .without_time()
            .with_max_level(max_level)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            TracingAuditSink::new().log_line(line);
        });
        captured.contents()
    }

    #[test]
    fn tracing_sink_emits_info_event_on_audit_target() {
        let output = traced(Level::INFO, "id = X1, req = add(2, 3), resp = 5");
        assert_eq!(output.lines().count(), 1, "one event expected: {output:?}");
        assert!(output.contains("INFO"), "{output:?}");
        assert!(output.contains(AUDIT_TARGET), "{output:?}");
        assert!(output.contains("id = X1, req = add(2, 3), resp = 5"), "{output:?}");
    }

    #[rstest]
    #[case(Level::WARN)]
    #[case(Level::ERROR)]
    fn tracing_sink_is_silent_above_info(#[case] max_level: Level) {
        assert!(traced(max_level, "id = X1, req = ping(), resp = null").is_empty());
    }

    #[test]
    fn composes_non_empty_parts() {
        assert_eq!(
            compose_line(["id = X, req = add(1, 2)", "resp = 3", ""]),
            "id = X, req = add(1, 2), resp = 3"
        );
        assert_eq!(
            compose_line(["id = X, req = add(1, 2)", "resp = 3", "(NOT PUBLISHED)"]),
            "id = X, req = add(1, 2), resp = 3, (NOT PUBLISHED)"
        );
    }

    #[test]
    fn buffer_records_and_clears() {
        let sink = BufferedAuditSink::new();
        sink.log_line("first");
        sink.log_line("second");
        assert_eq!(sink.lines(), vec!["first", "second"]);
        assert_eq!(sink.log(), "first\nsecond");

        sink.clear();
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn buffer_forwards_to_inner_sink() {
        let inner = Arc::new(BufferedAuditSink::new());
        let sink = BufferedAuditSink::forwarding_to(inner.clone());
        sink.log_line("line");
        assert_eq!(inner.lines(), vec!["line"]);
    }

    #[test]
    fn writer_sink_appends_newlines() {
        let sink = WriterAuditSink::new(Vec::new());
        sink.log_line("one");
        sink.log_line("two");
        assert_eq!(sink.into_inner(), b"one\ntwo\n");
    }
}
