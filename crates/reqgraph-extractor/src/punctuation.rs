//! Punctuation restorer adapters
//!
//! Transcripts from speech-to-text often arrive as one long unpunctuated
//! run. A restorer puts sentence marks back so the relation pass has
//! sentences to work with.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use reqgraph_core::{PunctuationConfig, PunctuationRestorer, ReqGraphError};

#[derive(Error, Debug)]
pub enum RestorerError {
    #[error("Restorer not available: {0}")]
    NotAvailable(String),

    #[error("Restorer execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Restorer returned empty output")]
    EmptyOutput,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<RestorerError> for ReqGraphError {
    fn from(err: RestorerError) -> Self {
        ReqGraphError::Punctuation(err.to_string())
    }
}

// ============================================================================
// External Command Restorer
// ============================================================================

/// Restorer backed by an external program that reads text on stdin and
/// writes the punctuated text to stdout
#[derive(Debug, Clone)]
pub struct CommandRestorer {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandRestorer {
    /// Create from a program name and its arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: PunctuationConfig::default().timeout(),
        }
    }

    /// Create from a full argv; `None` when it is empty
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone()).with_args(args.iter().cloned()))
    }

    /// Create from configuration, if a command is configured
    pub fn from_config(config: &PunctuationConfig) -> Option<Self> {
        config
            .command
            .as_deref()
            .and_then(Self::from_argv)
            .map(|restorer| restorer.with_timeout(config.timeout()))
    }

    /// Set the time limit (`None` waits forever)
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Append arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Resolved executable path
    fn executable(&self) -> Option<PathBuf> {
        which::which(&self.program).ok()
    }

    fn run(&self, text: &str) -> Result<String, RestorerError> {
        let executable = self
            .executable()
            .ok_or_else(|| RestorerError::NotAvailable(format!("{} not found in PATH", self.program)))?;

        let mut child = Command::new(executable)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RestorerError::ExecutionFailed(e.to_string()))?;

        // stdin is written on its own thread
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RestorerError::ExecutionFailed("stdin not captured".to_string()))?;
        let input = text.to_string();
        let writer = thread::spawn(move || stdin.write_all(input.as_bytes()));

        // Drained on their own threads so a full pipe never stalls the child
        let stdout = read_pipe(child.stdout.take());
        let stderr = read_pipe(child.stderr.take());

        let status = match self.timeout {
            Some(timeout) => self.wait_with_timeout(&mut child, timeout)?,
            None => child.wait()?,
        };

        if let Ok(result) = writer.join() {
            // A child that exits without reading stdin is judged by its exit status
            if let Err(e) = result {
                debug!(error = %e, "Restorer closed stdin early");
            }
        }
        let stdout = join_pipe(stdout)?;
        let stderr = join_pipe(stderr)?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(RestorerError::ExecutionFailed(format!(
                "{} exited with {}: {}",
                self.program,
                status,
                stderr.trim()
            )));
        }

        let restored = String::from_utf8_lossy(&stdout).trim().to_string();
        if restored.is_empty() {
            return Err(RestorerError::EmptyOutput);
        }
        Ok(restored)
    }

    fn wait_with_timeout(
        &self,
        child: &mut Child,
        timeout: Duration,
    ) -> Result<ExitStatus, RestorerError> {
        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if start.elapsed() > timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(RestorerError::ExecutionFailed(format!(
                    "{} timed out after {}ms",
                    self.program,
                    timeout.as_millis()
                )));
            }
            thread::sleep(Duration::from_millis(25));
        }
    }
}

fn read_pipe<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn join_pipe(handle: JoinHandle<std::io::Result<Vec<u8>>>) -> Result<Vec<u8>, RestorerError> {
    handle
        .join()
        .map_err(|_| RestorerError::ExecutionFailed("output reader panicked".to_string()))?
        .map_err(RestorerError::from)
}

impl PunctuationRestorer for CommandRestorer {
    fn restore(&self, text: &str) -> reqgraph_core::Result<String> {
        Ok(self.run(text)?)
    }

    fn is_available(&self) -> bool {
        self.executable().is_some()
    }

    fn name(&self) -> &str {
        &self.program
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_argv() {
        let argv = vec!["punct".to_string(), "--lang".to_string(), "en".to_string()];
        let restorer = CommandRestorer::from_argv(&argv).unwrap();
        assert_eq!(restorer.name(), "punct");
        assert_eq!(restorer.args, vec!["--lang", "en"]);

        assert!(CommandRestorer::from_argv(&[]).is_none());
        assert!(CommandRestorer::from_config(&PunctuationConfig::default()).is_none());
    }

    #[test]
    fn test_missing_program() {
        let restorer = CommandRestorer::new("reqgraph-no-such-restorer");
        assert!(!restorer.is_available());

        let err = restorer.restore("hello").unwrap_err();
        assert!(matches!(err, ReqGraphError::Punctuation(_)));
    }

    #[test]
    fn test_cat_round_trips_text() {
        let restorer = CommandRestorer::new("cat");
        if !restorer.is_available() {
            return;
        }
        assert_eq!(restorer.restore("Hello world.\n").unwrap(), "Hello world.");
    }

    #[test]
    fn test_failing_command_is_an_error() {
        let restorer = CommandRestorer::new("sh").with_args(["-c", "exit 3"]);
        if !restorer.is_available() {
            return;
        }
        assert!(restorer.restore("some text").is_err());
    }

    #[test]
    fn test_hung_command_times_out() {
        let restorer = CommandRestorer::new("sleep")
            .with_args(["5"])
            .with_timeout(Some(Duration::from_millis(200)));
        if !restorer.is_available() {
            return;
        }

        let start = Instant::now();
        let err = restorer.run("some text").unwrap_err();
        assert!(matches!(err, RestorerError::ExecutionFailed(_)));
        assert!(err.to_string().contains("timed out"));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_from_config_carries_timeout() {
        let config = PunctuationConfig {
            command: Some(vec!["punct".to_string()]),
            timeout_secs: 7,
        };
        let restorer = CommandRestorer::from_config(&config).unwrap();
        assert_eq!(restorer.timeout, Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_empty_output_is_an_error() {
        let restorer = CommandRestorer::new("sh").with_args(["-c", "cat > /dev/null"]);
        if !restorer.is_available() {
            return;
        }
        let err = restorer.restore("some text").unwrap_err();
        assert!(err.to_string().contains("empty output"));
    }
}
