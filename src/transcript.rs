//! Human-readable run transcript.
//!
//! A [`Transcript`] fans every line out to a set of destinations (console, a log file, an
//! in-memory buffer). It is handed to the agent explicitly, so several agents in one process can
//! write to different places. Diagnostics go through `tracing`; the transcript is the record of
//! what the agent produced.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Multi-destination line writer.
#[derive(Default)]
pub struct Transcript {
    sinks: Vec<Box<dyn Write + Send>>,
}

impl Transcript {
    /// A transcript with no destinations; every line is discarded.
    pub fn new() -> Self {
        Self::default()
    }

    /// A transcript that writes to stdout.
    pub fn console() -> Self {
        Self::new().with_writer(io::stdout())
    }

    /// Add a destination.
    pub fn with_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.sinks.push(Box::new(writer));
        self
    }

    /// Add a log file destination, truncating any existing file.
    pub fn with_file(self, path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(self.with_writer(file))
    }

    /// Write one line to every destination and flush.
    ///
    /// A destination that fails is reported once through `tracing` and dropped.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        self.sinks.retain_mut(|sink| {
            let written = writeln!(sink, "{}", text).and_then(|_| sink.flush());
            if let Err(e) = &written {
                tracing::warn!("Dropping transcript destination after write error: {}", e);
            }
            written.is_ok()
        });
    }

    /// Write a titled block, used for solutions and verifier output.
    pub fn block(&mut self, title: &str, body: &str) {
        self.line(format!(">>>>>>> {}", title));
        self.line(body);
    }
}

/// Cloneable in-memory destination for inspecting a transcript in tests.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct SharedBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl SharedBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[cfg(test)]
impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
