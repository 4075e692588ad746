//! Single-line console progress for poll ticks

use crate::types::JobStatus;
use std::io::Write;

/// Redraws `"{progress}% - {message}"` in place, ending the line once the job is terminal
///
/// A failed job's error trace is printed on the lines after the final status.
pub struct ConsoleProgress<W: Write> {
    out: W,
    last_width: usize,
}

impl ConsoleProgress<std::io::Stdout> {
    /// Render to standard output
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ConsoleProgress<W> {
    /// Render to any writer
    pub fn new(out: W) -> Self {
        Self { out, last_width: 0 }
    }

    /// Draw one status; pass this to a workflow as its tick callback
    pub fn on_tick(&mut self, status: &JobStatus) {
        let line = format!("{}% - {}", status.progress, status.message);
        let width = line.chars().count();
        let padding = self.last_width.saturating_sub(width);
        self.last_width = width;

        // Rendering is best effort; a closed stdout must not fail the workflow
        let _ = write!(self.out, "\r{}{}", line, " ".repeat(padding));

        if status.is_terminal() {
            let _ = writeln!(self.out);
            if let Some(trace) = &status.error_trace {
                let _ = writeln!(self.out, "Error stack trace: {}", trace);
            }
            self.last_width = 0;
        }
        let _ = self.out.flush();
    }

    /// Consume the renderer and return the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}
