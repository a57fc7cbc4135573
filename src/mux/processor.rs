use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::MuxConfig;
use crate::error::{Result, MuxError};
use super::{MergeToolTrait, MuxCommand, MuxCommandBuilder, OutputSink, StreamTag, ToolLine};

const LINE_BUFFER: usize = 64;

/// Concrete implementation of the merge tool (mkvmerge-based)
pub struct MkvMergeTool {
    config: MuxConfig,
    command_builder: MuxCommandBuilder,
    sink: Arc<dyn OutputSink>,
}

impl MkvMergeTool {
    /// Create a new merge tool implementation
    pub fn new(config: MuxConfig, sink: Arc<dyn OutputSink>) -> Self {
        let command_builder = MuxCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
            sink,
        }
    }

    fn timeout(&self) -> Option<Duration> {
        self.config.timeout_secs.map(Duration::from_secs)
    }

    async fn execute(&self, command: &MuxCommand, label: &str) -> Result<()> {
        debug!("Executing merge command: {} {:?}", command.binary_path, command.args);
        debug!("Description: {}", command.description);

        let mut child = Command::new(&command.binary_path)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MuxError::Launch {
                label: label.to_string(),
                message: format!("'{}': {}", command.binary_path, e),
            })?;

        let (tx, mut rx) = mpsc::channel(LINE_BUFFER);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, StreamTag::Out, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, StreamTag::Err, tx.clone()));
        }
        drop(tx);

        let finished = async {
            while let Some(line) = rx.recv().await {
                self.sink.line(label, &line);
            }
            child.wait().await
        };

        let status = match self.timeout() {
            None => finished.await?,
            Some(limit) => {
                let waited = tokio::time::timeout(limit, finished).await;
                match waited {
                    Ok(status) => status?,
                    Err(_) => {
                        child.kill().await?;
                        return Err(MuxError::ToolExecutionFailed {
                            label: label.to_string(),
                            reason: format!("timed out after {}s and was killed", limit.as_secs()),
                        });
                    }
                }
            }
        };

        if status.success() {
            Ok(())
        } else {
            let reason = match status.code() {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            };
            Err(MuxError::ToolExecutionFailed {
                label: label.to_string(),
                reason,
            })
        }
    }
}

/// Forward every non-empty line of `reader` until EOF. `\r`, `\n` and
/// `\r\n` all end a line, so carriage-return progress updates arrive one by one.
async fn forward_lines<R>(reader: R, stream: StreamTag, tx: mpsc::Sender<ToolLine>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut pending = Vec::new();

    loop {
        let chunk = match reader.fill_buf().await {
            Ok(chunk) => chunk,
            Err(e) => {
                debug!("Stopped reading {} stream: {}", stream, e);
                break;
            }
        };
        if chunk.is_empty() {
            break;
        }

        let consumed = chunk.len();
        let lines = split_lines(&mut pending, chunk);
        reader.consume(consumed);

        for text in lines {
            if tx.send(ToolLine { stream, text }).await.is_err() {
                return;
            }
        }
    }

    if !pending.is_empty() {
        let text = String::from_utf8_lossy(&pending).into_owned();
        let _ = tx.send(ToolLine { stream, text }).await;
    }
}

/// Append `chunk` to `pending` and take out every completed, non-empty line
fn split_lines(pending: &mut Vec<u8>, chunk: &[u8]) -> Vec<String> {
    let mut lines = Vec::new();
    for &byte in chunk {
        if byte == b'\r' || byte == b'\n' {
            if !pending.is_empty() {
                lines.push(String::from_utf8_lossy(pending).into_owned());
                pending.clear();
            }
        } else {
            pending.push(byte);
        }
    }
    lines
}

#[async_trait]
impl MergeToolTrait for MkvMergeTool {
    async fn is_available(&self) -> bool {
        let version = self.command_builder.version_check();

        let status = Command::new(&version.binary_path)
            .args(&version.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => {
                info!("Merge tool '{}' is available", version.binary_path);
                true
            }
            Ok(status) => {
                debug!("Version check of '{}' exited with {}", version.binary_path, status);
                false
            }
            Err(e) => {
                debug!("Version check of '{}' could not start: {}", version.binary_path, e);
                false
            }
        }
    }

    async fn run(&self, command: &MuxCommand, label: &str) -> bool {
        match self.execute(command, label).await {
            Ok(()) => true,
            Err(e) => {
                self.sink.failure(label, &e.to_string());
                false
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::mux::sink::testing::RecordingSink;
    use std::time::Instant;

    fn tool(binary: &str, timeout_secs: Option<u64>) -> (MkvMergeTool, Arc<RecordingSink>) {
        let mut config = Config::default().mux;
        config.binary_path = binary.to_string();
        config.timeout_secs = timeout_secs;
        let sink = Arc::new(RecordingSink::default());
        (MkvMergeTool::new(config, sink.clone()), sink)
    }

    fn script(body: &str) -> MuxCommand {
        MuxCommand::new("sh", "Test script").arg("-c").arg(body)
    }

    fn lines_of(sink: &RecordingSink, stream: StreamTag) -> Vec<String> {
        sink.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, line)| line.stream == stream)
            .map(|(_, line)| line.text.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_run_streams_both_outputs() {
        let (tool, sink) = tool("sh", None);
        let ok = tool
            .run(&script("echo one; echo two 1>&2; echo; echo three"), "Show E01.mp4")
            .await;

        assert!(ok);
        assert_eq!(lines_of(&sink, StreamTag::Out), vec!["one", "three"]);
        assert_eq!(lines_of(&sink, StreamTag::Err), vec!["two"]);
        assert!(sink.lines.lock().unwrap().iter().all(|(label, _)| label == "Show E01.mp4"));
        assert!(sink.failures.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_splits_carriage_return_progress() {
        let (tool, sink) = tool("sh", None);
        let ok = tool
            .run(&script("printf 'Progress: 10%%\\rProgress: 100%%\\r\\nDone\\n'"), "a.mp4")
            .await;

        assert!(ok);
        assert_eq!(
            lines_of(&sink, StreamTag::Out),
            vec!["Progress: 10%", "Progress: 100%", "Done"]
        );
    }

    #[tokio::test]
    async fn test_run_forwards_unterminated_last_line() {
        let (tool, sink) = tool("sh", None);
        assert!(tool.run(&script("printf 'no newline'"), "a.mp4").await);
        assert_eq!(lines_of(&sink, StreamTag::Out), vec!["no newline"]);
    }

    #[test]
    fn test_split_lines_across_chunks() {
        let mut pending = Vec::new();
        assert_eq!(split_lines(&mut pending, b"Progr"), Vec::<String>::new());
        assert_eq!(split_lines(&mut pending, b"ess: 5%\r"), vec!["Progress: 5%"]);
        assert_eq!(split_lines(&mut pending, b"a\r"), vec!["a"]);
        assert_eq!(split_lines(&mut pending, b"\nb\r\n\n\nc"), vec!["b"]);
        assert_eq!(pending, b"c");
    }

    #[tokio::test]
    async fn test_run_reports_nonzero_exit() {
        let (tool, sink) = tool("sh", None);
        assert!(!tool.run(&script("echo broken 1>&2; exit 3"), "a.mp4").await);

        let failures = sink.failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].1.contains("exit code 3"));
    }

    #[tokio::test]
    async fn test_run_reports_launch_failure() {
        let (tool, sink) = tool("mkvbatch-no-such-binary", None);
        let command = MuxCommand::new("mkvbatch-no-such-binary", "Missing").arg("--version");
        assert!(!tool.run(&command, "a.mp4").await);

        let failures = sink.failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].1.contains("failed to launch"));
        assert!(sink.lines.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_kills_on_timeout() {
        let (tool, sink) = tool("sh", Some(1));
        let started = Instant::now();
        assert!(!tool.run(&script("exec sleep 10"), "slow.mp4").await);
        assert!(started.elapsed() < Duration::from_secs(8));

        let failures = sink.failures.lock().unwrap();
        assert!(failures[0].1.contains("timed out"));
    }

    #[tokio::test]
    async fn test_is_available() {
        let (present, _) = tool("true", None);
        assert!(present.is_available().await);

        let (missing, _) = tool("mkvbatch-no-such-binary", None);
        assert!(!missing.is_available().await);
    }
}
