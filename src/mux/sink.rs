use std::fmt;
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Output stream of the merge tool process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamTag {
    Out,
    Err,
}

impl fmt::Display for StreamTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamTag::Out => f.write_str("OUT"),
            StreamTag::Err => f.write_str("ERR"),
        }
    }
}

/// One line of merge tool output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolLine {
    pub stream: StreamTag,
    pub text: String,
}

/// Receives merge tool output and launch failures, shared by all running merges
pub trait OutputSink: Send + Sync {
    fn line(&self, label: &str, line: &ToolLine);

    fn failure(&self, label: &str, message: &str);
}

/// Writes tool output through `tracing`, one whole line at a time
#[derive(Debug, Default)]
pub struct TracingSink {
    lock: Mutex<()>,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for TracingSink {
    fn line(&self, label: &str, line: &ToolLine) {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match line.stream {
            StreamTag::Out => info!("{} - {} {}", label, line.stream, line.text),
            StreamTag::Err => warn!("{} - {} {}", label, line.stream, line.text),
        }
    }

    fn failure(&self, label: &str, message: &str) {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        error!("[{}] {}", label, message);
    }
}
