use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use crate::genomics::AlignedRead;

/// Line-oriented audit sink for reads removed by downsampling.
///
/// Each removed read becomes one `name\tsample\tlibrary\tplatform_unit`
/// line, with no header. Clones share the same writer, so shards running
/// on separate threads may append to one log; lines from a single call
/// stay in removal order.
#[derive(Clone)]
pub struct RemovalLog {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl RemovalLog {
    /// Wrap a writer.
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Append one line for `read`.
    pub fn record(&self, read: &AlignedRead) {
        self.record_all(std::iter::once(read));
    }

    /// Append one line per read, holding the sink for the whole batch.
    pub fn record_all<'a>(&self, reads: impl IntoIterator<Item = &'a AlignedRead>) {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        for read in reads {
            if let Err(err) = writeln!(sink, "{}", format_removed_read(read)) {
                warn!(read = %read.name, error = %err, "failed to write removal log line");
            }
        }
    }

    /// Flush the underlying writer.
    pub fn flush(&self) {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = sink.flush() {
            warn!(error = %err, "failed to flush removal log");
        }
    }
}

impl fmt::Debug for RemovalLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemovalLog").finish_non_exhaustive()
    }
}

/// Render the audit line for a removed read (without the newline).
///
/// Missing read-group fields are written as `null`.
pub fn format_removed_read(read: &AlignedRead) -> String {
    let group = read.read_group.as_deref();
    let field = |value: Option<&String>| value.map_or("null", String::as_str).to_string();
    format!(
        "{}\t{}\t{}\t{}",
        read.name,
        field(group.and_then(|g| g.sample.as_ref())),
        field(group.and_then(|g| g.library.as_ref())),
        field(group.and_then(|g| g.platform_unit.as_ref())),
    )
}
