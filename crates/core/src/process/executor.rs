//! Admission-controlled execution of external commands.

use async_trait::async_trait;
use std::fmt;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn};

use super::error::ProcessError;
use crate::config::ConverterConfig;

/// How long the output readers may keep draining once the process is gone.
const READER_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Something that can run an external command to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `command` (program followed by its arguments) and returns its
    /// merged stdout/stderr split by lines.
    async fn execute(&self, command: &[String]) -> Result<Vec<String>, ProcessError>;
}

/// Runs external processes, never more than `max_concurrent` at a time.
///
/// Callers over the limit wait for a permit, so excess load slows callers
/// down instead of spawning more processes. Each invocation gets its own
/// timeout; a timed out process is killed. Dropping an in-flight `execute`
/// future kills the child and releases the permit.
#[derive(Clone)]
pub struct ProcessExecutor {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    timeout: Duration,
}

impl fmt::Debug for ProcessExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessExecutor")
            .field("max_concurrent", &self.max_concurrent)
            .field("available_permits", &self.semaphore.available_permits())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProcessExecutor {
    /// Creates an executor allowing `max_concurrent` processes (at least 1).
    pub fn new(max_concurrent: usize, timeout: Duration) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            timeout,
        }
    }

    /// Creates an executor from the converter configuration.
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(config.concurrent_processes, config.process_timeout())
    }

    /// Maximum number of processes running at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Number of permits currently held by running processes.
    pub fn active_processes(&self) -> usize {
        self.max_concurrent - self.semaphore.available_permits()
    }

    /// Timeout applied to each invocation.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl CommandRunner for ProcessExecutor {
    async fn execute(&self, command: &[String]) -> Result<Vec<String>, ProcessError> {
        let (program, args) = command.split_first().ok_or(ProcessError::EmptyCommand)?;

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ProcessError::AdmissionClosed)?;

        debug!(program = %program, args = ?args, "Executing command");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: program.clone(),
                source,
            })?;

        let collector = OutputCollector::start(child.stdout.take(), child.stderr.take());

        match timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => {
                let output = collector.finish().await;
                if status.success() {
                    Ok(output)
                } else {
                    Err(ProcessError::NonZeroExit {
                        program: program.clone(),
                        code: status.code(),
                        output,
                    })
                }
            }
            Ok(Err(source)) => {
                collector.finish().await;
                Err(ProcessError::Wait {
                    program: program.clone(),
                    source,
                })
            }
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!(program = %program, error = %e, "Failed to kill timed out process");
                }
                let output = collector.finish().await;
                Err(ProcessError::Timeout {
                    program: program.clone(),
                    timeout_secs: self.timeout.as_secs(),
                    output,
                })
            }
        }
    }
}

/// Drains stdout and stderr on their own tasks into one line buffer.
struct OutputCollector {
    lines: Arc<Mutex<Vec<String>>>,
    readers: Vec<JoinHandle<()>>,
}

impl OutputCollector {
    fn start<O, E>(stdout: Option<O>, stderr: Option<E>) -> Self
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
    {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let mut readers = Vec::with_capacity(2);

        if let Some(stdout) = stdout {
            readers.push(spawn_reader(stdout, Arc::clone(&lines)));
        }
        if let Some(stderr) = stderr {
            readers.push(spawn_reader(stderr, Arc::clone(&lines)));
        }

        Self { lines, readers }
    }

    /// Waits for the readers to reach end of stream, then returns what was captured.
    async fn finish(self) -> Vec<String> {
        let deadline = Instant::now() + READER_GRACE_PERIOD;

        for mut reader in self.readers {
            if timeout_at(deadline, &mut reader).await.is_err() {
                debug!("Output reader did not finish in time, aborting it");
                reader.abort();
            }
        }

        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *lines)
    }
}

fn spawn_reader<R>(stream: R, lines: Arc<Mutex<Vec<String>>>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf)
                        .trim_end_matches(|c: char| c == '\n' || c == '\r')
                        .to_string();
                    lines.lock().unwrap_or_else(|e| e.into_inner()).push(line);
                }
                Err(e) => {
                    debug!(error = %e, "Stopped reading process output");
                    break;
                }
            }
        }
    })
}
