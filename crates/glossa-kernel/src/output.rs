//! Where user-visible kernel output goes.
//!
//! The kernel itself prints very little: the binding broker's import report
//! is the main customer. Embedders route these lines into whatever surface
//! frames the session; the default binds to the process streams.

use std::sync::Mutex;

/// Receiver for user-visible kernel output lines.
pub trait OutputSink: Send + Sync {
    /// An ordinary informational line.
    fn out_line(&self, line: &str);

    /// An error/warning line.
    fn err_line(&self, line: &str);
}

/// Sink that writes to the process stdout/stderr.
///
/// Streams are looked up per line, not captured, so redirection set up after
/// kernel construction still takes effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioSink;

impl OutputSink for StdioSink {
    fn out_line(&self, line: &str) {
        println!("{}", line);
    }

    fn err_line(&self, line: &str) {
        eprintln!("{}", line);
    }
}

/// Sink that records lines in memory, for tests and embedders that render
/// output themselves.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Stream, String)>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Out,
    Err,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded out-stream lines, in order.
    pub fn out_lines(&self) -> Vec<String> {
        self.collect(Stream::Out)
    }

    /// All recorded err-stream lines, in order.
    pub fn err_lines(&self) -> Vec<String> {
        self.collect(Stream::Err)
    }

    fn collect(&self, stream: Stream) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == stream)
            .map(|(_, line)| line.clone())
            .collect()
    }
}

impl OutputSink for MemorySink {
    fn out_line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap()
            .push((Stream::Out, line.to_string()));
    }

    fn err_line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap()
            .push((Stream::Err, line.to_string()));
    }
}
