// Merge tool invocation
//
// - Commands: argument builders for the merge tool
// - Processor: subprocess runner streaming tool output line by line
// - Sink: the shared collaborator receiving that output

pub mod commands;
pub mod processor;
pub mod sink;

use async_trait::async_trait;
use std::sync::Arc;

pub use commands::*;
pub use processor::*;
pub use sink::*;

use crate::config::MuxConfig;

/// Main trait for merge tool operations
#[async_trait]
pub trait MergeToolTrait: Send + Sync {
    /// Probe the tool with a version query; never fails, only reports
    async fn is_available(&self) -> bool;

    /// Run one merge, forwarding its output under `label`; true on exit code 0
    async fn run(&self, command: &MuxCommand, label: &str) -> bool;
}

/// Factory for creating merge tool instances
pub struct MergeToolFactory;

impl MergeToolFactory {
    /// Create the default merge tool implementation (mkvmerge-based)
    pub fn create_tool(config: MuxConfig, sink: Arc<dyn OutputSink>) -> Arc<dyn MergeToolTrait> {
        Arc::new(processor::MkvMergeTool::new(config, sink))
    }
}
