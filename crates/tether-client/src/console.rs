//! Interactive execute step that forwards console lines to the server.
//!
//! Input is read on a dedicated thread and handed over through a channel, so
//! a step never blocks longer than its poll interval. A session waiting on an
//! idle terminal still ends promptly once the server closes the connection.

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use std::mem;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use tether_config::defaults::DEFAULT_CLIENT_TIMEOUT;

use crate::connection::ClientConnection;
use crate::errors::ClientError;

const CONSOLE_TARGET: &str = "tether_client::console";

/// Destination for lines read by a [`ConsoleStep`].
pub trait MessageSink {
    /// Sends one message.
    fn send_message(&self, message: &[u8]) -> Result<(), ClientError>;

    /// Reports whether the sink has begun shutting down.
    fn is_closing(&self) -> bool;
}

impl MessageSink for ClientConnection {
    fn send_message(&self, message: &[u8]) -> Result<(), ClientError> {
        self.send(message)
    }

    fn is_closing(&self) -> bool {
        self.is_shutting_down()
    }
}

/// How often and how patiently a failed send is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Pause between attempts.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 60,
            retry_delay: Duration::from_secs(10),
        }
    }
}

/// Failures that end the console loop.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// The prompt could not be written.
    #[error("failed to write prompt: {0}")]
    Prompt(#[source] io::Error),
    /// The input could not be read.
    #[error("failed to read input: {0}")]
    Read(#[source] io::Error),
    /// The input thread could not be spawned.
    #[error("failed to spawn console input thread: {0}")]
    Spawn(#[source] io::Error),
    /// Every send attempt failed.
    #[error("failed to send after {attempts} attempts: {source}")]
    Send {
        /// Attempts made, including the first.
        attempts: u32,
        /// Error from the last attempt.
        #[source]
        source: ClientError,
    },
}

type Line = io::Result<String>;

enum Input {
    Pending(Box<dyn BufRead + Send>),
    Reading(Receiver<Line>),
    Exhausted,
}

/// Prompts with `>`, reads a line, and sends it without its line ending.
///
/// End of input ends the session.
pub struct ConsoleStep<W> {
    input: Input,
    output: W,
    retry: RetryPolicy,
    poll_interval: Duration,
    prompted: bool,
}

impl ConsoleStep<Stdout> {
    /// Reads standard input and prompts on standard output.
    #[must_use]
    pub fn stdio() -> Self {
        let stdin: Stdin = io::stdin();
        Self::new(BufReader::new(stdin), io::stdout())
    }
}

impl<W: Write> ConsoleStep<W> {
    /// Builds a step over the given streams with the default retry policy.
    ///
    /// The input thread starts on the first step.
    #[must_use]
    pub fn new<R>(input: R, output: W) -> Self
    where
        R: BufRead + Send + 'static,
    {
        Self {
            input: Input::Pending(Box::new(input)),
            output,
            retry: RetryPolicy::default(),
            poll_interval: DEFAULT_CLIENT_TIMEOUT,
            prompted: false,
        }
    }

    /// Overrides the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Bounds how long one step waits for input before re-checking the sink.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Returns the output writer, consuming the step.
    #[must_use]
    pub fn into_output(self) -> W {
        self.output
    }

    /// Runs one prompt-read-send cycle. Returns `false` to end the session;
    /// failures are logged.
    pub fn step<S: MessageSink + ?Sized>(&mut self, sink: &S) -> bool {
        match self.try_step(sink) {
            Ok(proceed) => proceed,
            Err(error) => {
                tracing::error!(target: CONSOLE_TARGET, error = %error, "console step failed");
                false
            }
        }
    }

    /// Runs one prompt-read-send cycle.
    ///
    /// Waits at most one poll interval for a line. Returns `Ok(false)` at end
    /// of input or once the sink is closing.
    pub fn try_step<S: MessageSink + ?Sized>(&mut self, sink: &S) -> Result<bool, ConsoleError> {
        if sink.is_closing() || matches!(self.input, Input::Exhausted) {
            return Ok(false);
        }
        if !self.prompted {
            write!(self.output, "> ")
                .and_then(|()| self.output.flush())
                .map_err(ConsoleError::Prompt)?;
            self.prompted = true;
        }
        let poll_interval = self.poll_interval;
        let Some(lines) = self.lines()? else {
            return Ok(false);
        };
        let line = match lines.recv_timeout(poll_interval) {
            Ok(line) => line.map_err(ConsoleError::Read)?,
            Err(RecvTimeoutError::Timeout) => return Ok(!sink.is_closing()),
            Err(RecvTimeoutError::Disconnected) => {
                self.input = Input::Exhausted;
                return Ok(false);
            }
        };
        self.prompted = false;
        if sink.is_closing() {
            return Ok(false);
        }
        let message = line.trim_end_matches(['\r', '\n']);
        if message.is_empty() {
            return Ok(true);
        }
        send_with_retry(sink, message.as_bytes(), self.retry, self.poll_interval)
    }

    fn lines(&mut self) -> Result<Option<&Receiver<Line>>, ConsoleError> {
        if matches!(self.input, Input::Pending(_))
            && let Input::Pending(reader) = mem::replace(&mut self.input, Input::Exhausted)
        {
            self.input = Input::Reading(spawn_reader(reader)?);
        }
        match &self.input {
            Input::Reading(lines) => Ok(Some(lines)),
            Input::Pending(_) | Input::Exhausted => Ok(None),
        }
    }
}

fn spawn_reader(mut reader: Box<dyn BufRead + Send>) -> Result<Receiver<Line>, ConsoleError> {
    // Bounded so the reader stays at most one line ahead of the session.
    let (sender, lines) = mpsc::sync_channel(1);
    thread::Builder::new()
        .name("tether-console".to_owned())
        .spawn(move || read_lines(reader.as_mut(), &sender))
        .map_err(ConsoleError::Spawn)?;
    Ok(lines)
}

fn read_lines(reader: &mut dyn BufRead, sender: &SyncSender<Line>) {
    loop {
        let mut line = String::new();
        let outcome = match reader.read_line(&mut line) {
            Ok(0) => return,
            Ok(_) => Ok(line),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => Err(error),
        };
        let failed = outcome.is_err();
        if sender.send(outcome).is_err() || failed {
            return;
        }
    }
}

fn send_with_retry<S: MessageSink + ?Sized>(
    sink: &S,
    message: &[u8],
    retry: RetryPolicy,
    poll_interval: Duration,
) -> Result<bool, ConsoleError> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match sink.send_message(message) {
            Ok(()) => return Ok(true),
            Err(ClientError::ShuttingDown) => return Ok(false),
            Err(error) if !error.is_retryable() || attempts > retry.max_retries => {
                return Err(ConsoleError::Send {
                    attempts,
                    source: error,
                });
            }
            Err(error) => {
                tracing::warn!(
                    target: CONSOLE_TARGET,
                    attempt = attempts,
                    error = %error,
                    "send failed; retrying"
                );
                if !pause_unless_closing(sink, retry.retry_delay, poll_interval) {
                    return Ok(false);
                }
            }
        }
    }
}

/// Sleeps for `delay` in slices of `poll_interval`. Returns `false` as soon
/// as the sink starts closing.
fn pause_unless_closing<S: MessageSink + ?Sized>(
    sink: &S,
    delay: Duration,
    poll_interval: Duration,
) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        if sink.is_closing() {
            return false;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return true;
        }
        thread::sleep(remaining.min(poll_interval));
    }
}
