//! Mock command runner for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::process::{CommandRunner, ProcessError, NULL_DEVICE};

/// Scripted outcome of one command.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Succeed with these output lines.
    Lines(Vec<String>),
    /// Succeed after writing `bytes` to the command's output path.
    ///
    /// The output path is the last argument, skipped when it is the null
    /// device. A `-passlogfile` prefix also gets a `-0.log` file, as ffmpeg does.
    WriteOutput { bytes: Vec<u8>, lines: Vec<String> },
    /// Fail with a non-zero exit code.
    Exit { code: i32, output: Vec<String> },
    /// Fail as if the process had been killed for running too long.
    Timeout { output: Vec<String> },
}

impl MockResponse {
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Lines(lines.into_iter().map(Into::into).collect())
    }

    pub fn exit<I, S>(code: i32, output: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Exit {
            code,
            output: output.into_iter().map(Into::into).collect(),
        }
    }

    pub fn write_output(bytes: Vec<u8>) -> Self {
        Self::WriteOutput {
            bytes,
            lines: Vec::new(),
        }
    }

    pub fn timeout() -> Self {
        Self::Timeout { output: Vec::new() }
    }
}

/// Mock implementation of the CommandRunner trait.
///
/// Responses are queued per program, keyed by the file stem of the first
/// command element (`/usr/bin/ffmpeg` and `ffmpeg` share a queue). A command
/// without a queued or default response fails with exit code 127.
///
/// # Example
///
/// ```rust,ignore
/// use stickerify_core::testing::{MockResponse, MockRunner};
///
/// let runner = MockRunner::new();
/// runner.push_response("ffprobe", MockResponse::lines(probe_lines)).await;
/// runner.push_response("ffmpeg", MockResponse::write_output(webm_bytes)).await;
///
/// // Use as the runner of a MediaConverter...
///
/// assert_eq!(runner.commands_for("ffmpeg").await.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct MockRunner {
    /// Every command received, in order.
    commands: Arc<RwLock<Vec<Vec<String>>>>,
    /// Queued responses by program.
    responses: Arc<RwLock<HashMap<String, VecDeque<MockResponse>>>>,
    /// Response used once a program's queue is empty.
    default_response: Arc<RwLock<Option<MockResponse>>>,
    /// Simulated run time of every command.
    delay: Arc<RwLock<Duration>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            commands: Arc::new(RwLock::new(Vec::new())),
            responses: Arc::new(RwLock::new(HashMap::new())),
            default_response: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue a response for the next command running `program`.
    pub async fn push_response(&self, program: &str, response: MockResponse) {
        self.responses
            .write()
            .await
            .entry(program_key(program))
            .or_default()
            .push_back(response);
    }

    /// Set the response for commands with nothing queued.
    pub async fn set_default_response(&self, response: Option<MockResponse>) {
        *self.default_response.write().await = response;
    }

    /// Set how long every command takes.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Get all recorded commands.
    pub async fn recorded_commands(&self) -> Vec<Vec<String>> {
        self.commands.read().await.clone()
    }

    /// Get the recorded commands that ran `program`.
    pub async fn commands_for(&self, program: &str) -> Vec<Vec<String>> {
        let key = program_key(program);
        self.commands
            .read()
            .await
            .iter()
            .filter(|command| command.first().map(|p| program_key(p)) == Some(key.clone()))
            .cloned()
            .collect()
    }

    pub async fn command_count(&self) -> usize {
        self.commands.read().await.len()
    }

    /// Commands currently inside `execute`.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of commands that were inside `execute` at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn next_response(&self, key: &str) -> Option<MockResponse> {
        let queued = self
            .responses
            .write()
            .await
            .get_mut(key)
            .and_then(VecDeque::pop_front);

        match queued {
            Some(response) => Some(response),
            None => self.default_response.read().await.clone(),
        }
    }
}

/// Decrements the in-flight counter, also when the command future is dropped.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn execute(&self, command: &[String]) -> Result<Vec<String>, ProcessError> {
        let Some(program) = command.first() else {
            return Err(ProcessError::EmptyCommand);
        };
        let key = program_key(program);

        self.commands.write().await.push(command.to_vec());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        let _guard = InFlightGuard(Arc::clone(&self.in_flight));

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match self.next_response(&key).await {
            None => Err(ProcessError::NonZeroExit {
                program: program.clone(),
                code: Some(127),
                output: vec![format!("no scripted response for {}", key)],
            }),
            Some(MockResponse::Lines(lines)) => Ok(lines),
            Some(MockResponse::WriteOutput { bytes, lines }) => {
                write_outputs(command, &bytes)
                    .await
                    .map_err(|source| ProcessError::Wait {
                        program: program.clone(),
                        source,
                    })?;
                Ok(lines)
            }
            Some(MockResponse::Exit { code, output }) => Err(ProcessError::NonZeroExit {
                program: program.clone(),
                code: Some(code),
                output,
            }),
            Some(MockResponse::Timeout { output }) => Err(ProcessError::Timeout {
                program: program.clone(),
                timeout_secs: 0,
                output,
            }),
        }
    }
}

fn program_key(program: &str) -> String {
    Path::new(program)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| program.to_string())
}

async fn write_outputs(command: &[String], bytes: &[u8]) -> std::io::Result<()> {
    if let Some(index) = command.iter().position(|arg| arg == "-passlogfile") {
        if let Some(prefix) = command.get(index + 1) {
            tokio::fs::write(format!("{}-0.log", prefix), b"pass statistics").await?;
        }
    }

    match command.last() {
        Some(output) if command.len() > 1 && output != NULL_DEVICE => {
            tokio::fs::write(output, bytes).await
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(args: &[&str]) -> Vec<String> {
        args.iter().map(|arg| arg.to_string()).collect()
    }

    #[tokio::test]
    async fn test_responses_are_queued_per_program() {
        let runner = MockRunner::new();
        runner.push_response("ffprobe", MockResponse::lines(["probe"])).await;
        runner.push_response("ffmpeg", MockResponse::lines(["first"])).await;
        runner.push_response("ffmpeg", MockResponse::lines(["second"])).await;

        let ffmpeg = command(&["/usr/bin/ffmpeg", "-version"]);
        assert_eq!(runner.execute(&ffmpeg).await.unwrap(), vec!["first"]);
        assert_eq!(runner.execute(&ffmpeg).await.unwrap(), vec!["second"]);
        assert_eq!(
            runner.execute(&command(&["ffprobe"])).await.unwrap(),
            vec!["probe"]
        );

        let err = runner.execute(&ffmpeg).await.unwrap_err();
        assert!(matches!(err, ProcessError::NonZeroExit { code: Some(127), .. }));

        assert_eq!(runner.command_count().await, 4);
        assert_eq!(runner.commands_for("ffmpeg").await.len(), 3);
    }

    #[tokio::test]
    async fn test_default_response() {
        let runner = MockRunner::new();
        runner
            .set_default_response(Some(MockResponse::lines(["ok"])))
            .await;

        assert_eq!(runner.execute(&command(&["which", "x"])).await.unwrap(), vec!["ok"]);
        assert_eq!(runner.execute(&command(&["which", "y"])).await.unwrap(), vec!["ok"]);
    }

    #[tokio::test]
    async fn test_write_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.webm");
        let prefix = dir.path().join("pass");
        let runner = MockRunner::new();
        runner
            .push_response("ffmpeg", MockResponse::write_output(vec![7u8; 3]))
            .await;

        runner
            .execute(&command(&[
                "ffmpeg",
                "-passlogfile",
                prefix.to_str().unwrap(),
                output.to_str().unwrap(),
            ]))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), vec![7u8; 3]);
        assert!(dir.path().join("pass-0.log").exists());
    }

    #[tokio::test]
    async fn test_in_flight_released_on_drop() {
        let runner = MockRunner::new();
        runner.set_delay(Duration::from_secs(10)).await;

        let cmd = command(&["ffmpeg"]);
        let pending = runner.execute(&cmd);
        let result = tokio::time::timeout(Duration::from_millis(50), pending).await;

        assert!(result.is_err());
        assert_eq!(runner.in_flight(), 0);
        assert_eq!(runner.max_in_flight(), 1);
    }
}
