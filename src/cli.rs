//! Process orchestration for `lpass` invocations.
//!
//! Every operation is described as an [`Invocation`] (or a two-stage
//! [`Pipeline`]) and handed to a [`Runner`]. [`SystemRunner`] spawns real
//! processes with tokio; tests substitute a scripted runner.

use crate::{Config, LastPassError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::debug;

/// What happens to a process's stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdoutMode {
    /// Collect stdout into [`ProcessOutput::stdout`]
    Capture,
    /// Send stdout to the null device
    Discard,
}

/// A single external command line with its environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to execute
    pub program: String,
    /// Arguments, in order
    pub args: Vec<String>,
    /// Environment overrides layered on the inherited environment
    pub env: Vec<(String, String)>,
    /// Where stdout goes
    pub stdout: StdoutMode,
    /// `lpass` subcommand, when this is an `lpass` invocation
    pub subcommand: Option<String>,
}

impl Invocation {
    /// Creates an invocation of `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            stdout: StdoutMode::Capture,
            subcommand: None,
        }
    }

    /// Creates an `lpass <subcommand>` invocation from the configuration.
    ///
    /// The configured environment (with pinentry disabled) is attached.
    ///
    /// ```
    /// use lastpass::cli::Invocation;
    /// use lastpass::Config;
    ///
    /// let inv = Invocation::lpass(&Config::default(), "status");
    /// assert_eq!(inv.program, "lpass");
    /// assert_eq!(inv.args, vec!["status".to_string()]);
    /// ```
    pub fn lpass(config: &Config, subcommand: &str) -> Self {
        let mut inv = Self::new(config.program.clone())
            .args(config.program_args.iter().cloned())
            .arg(subcommand);
        inv.env = config.environment();
        inv.subcommand = Some(subcommand.to_string());
        inv
    }

    /// Creates a `printf <format> <args...>` invocation.
    ///
    /// Values go through `%s` conversions so `%` and `\` inside them are
    /// written verbatim; only escapes in `format` are expanded.
    pub fn printf<I, S>(format: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new("printf").arg(format).args(values)
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds an environment override.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Sends stdout to the null device.
    pub fn discard_stdout(mut self) -> Self {
        self.stdout = StdoutMode::Discard;
        self
    }

    /// Program and subcommand, for log lines. Arguments are never logged.
    pub fn label(&self) -> String {
        match &self.subcommand {
            Some(subcommand) => format!("{} {}", self.program, subcommand),
            None => self.program.clone(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        cmd.stdout(match self.stdout {
            StdoutMode::Capture => Stdio::piped(),
            StdoutMode::Discard => Stdio::null(),
        });
        cmd.stderr(Stdio::piped());
        cmd
    }
}

/// Two processes where the feeder's stdout is the consumer's stdin.
///
/// The hand-off is a direct OS pipe; the data never passes through this
/// process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    /// Stage producing the input
    pub feeder: Invocation,
    /// Stage reading the input; its output is the pipeline's output
    pub consumer: Invocation,
}

impl Pipeline {
    /// Creates a pipeline `feeder | consumer`.
    pub fn new(feeder: Invocation, consumer: Invocation) -> Self {
        Self { feeder, consumer }
    }
}

/// How a process that did run finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Exit code zero
    Succeeded,
    /// Non-zero exit code (-1 when terminated by a signal)
    Rejected {
        /// Exit code
        code: i32,
    },
}

impl Completion {
    /// Returns true for [`Completion::Succeeded`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Returns the exit code (0 on success).
    pub fn code(&self) -> i32 {
        match self {
            Self::Succeeded => 0,
            Self::Rejected { code } => *code,
        }
    }
}

/// Result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    /// Captured stdout (empty when discarded)
    pub stdout: Vec<u8>,
    /// Captured stderr
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    /// Creates a successful output with the given stdout.
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// Creates an output with a non-zero exit code and no stdout.
    pub fn failure(code: i32) -> Self {
        Self {
            code: Some(code),
            ..Default::default()
        }
    }

    /// Classifies the exit status.
    pub fn completion(&self) -> Completion {
        match self.code {
            Some(0) => Completion::Succeeded,
            Some(code) => Completion::Rejected { code },
            None => Completion::Rejected { code: -1 },
        }
    }

    /// Decodes stdout as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`LastPassError::Other`] if stdout is not valid UTF-8.
    pub fn stdout_text(&self) -> Result<String> {
        String::from_utf8(self.stdout.clone()).map_err(|e| {
            LastPassError::Other(anyhow::anyhow!("Invalid UTF-8 in command output: {}", e))
        })
    }
}

/// Executes invocations and pipelines.
///
/// Implementations must be `Send + Sync`; one runner is shared by every
/// handle derived from an [`Authenticator`](crate::Authenticator).
#[async_trait]
pub trait Runner: Send + Sync {
    /// Runs a single invocation with stdin closed and waits for it.
    ///
    /// # Errors
    ///
    /// Returns [`LastPassError::ProcessFailure`] if the process cannot be
    /// started or waited on. A non-zero exit is not an error here.
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput>;

    /// Runs `feeder | consumer` and waits for both.
    ///
    /// # Errors
    ///
    /// Returns [`LastPassError::ProcessFailure`] if either stage cannot be
    /// started or the pipe cannot be handed over.
    async fn run_piped(&self, pipeline: &Pipeline) -> Result<ProcessOutput>;
}

/// Runner that spawns real processes with tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Creates a system runner.
    pub fn new() -> Self {
        Self
    }
}

async fn collect(invocation: &Invocation, child: Child) -> Result<ProcessOutput> {
    let output = child
        .wait_with_output()
        .await
        .map_err(|e| LastPassError::process(&invocation.program, e))?;

    let result = ProcessOutput {
        code: output.status.code(),
        stdout: output.stdout,
        stderr: output.stderr,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        debug!(
            command = %invocation.label(),
            code = ?result.code,
            stderr = %stderr.trim(),
            "process exited unsuccessfully"
        );
    }

    Ok(result)
}

#[async_trait]
impl Runner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        debug!(command = %invocation.label(), "spawning process");

        let child = invocation
            .command()
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| LastPassError::process(&invocation.program, e))?;

        collect(invocation, child).await
    }

    async fn run_piped(&self, pipeline: &Pipeline) -> Result<ProcessOutput> {
        let feeder = &pipeline.feeder;
        let consumer = &pipeline.consumer;
        debug!(
            feeder = %feeder.label(),
            consumer = %consumer.label(),
            "spawning pipeline"
        );

        let mut feeder_child = feeder
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| LastPassError::process(&feeder.program, e))?;

        let feed: Stdio = feeder_child
            .stdout
            .take()
            .ok_or_else(|| {
                LastPassError::process(
                    &feeder.program,
                    std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout was not captured"),
                )
            })?
            .try_into()
            .map_err(|e| LastPassError::process(&feeder.program, e))?;

        // The command is dropped right after spawning so this process holds
        // no copy of the pipe's read end.
        let consumer_child = {
            let mut cmd = consumer.command();
            cmd.stdin(feed);
            cmd.spawn()
        };

        let consumer_child = match consumer_child {
            Ok(child) => child,
            Err(e) => {
                if let Err(kill_err) = feeder_child.kill().await {
                    debug!(
                        command = %feeder.label(),
                        error = %kill_err,
                        "failed to kill feeder"
                    );
                }
                return Err(LastPassError::process(&consumer.program, e));
            }
        };

        let output = collect(consumer, consumer_child).await;

        // Reap the feeder even when the consumer could not be collected.
        let reaped = feeder_child
            .wait()
            .await
            .map_err(|e| LastPassError::process(&feeder.program, e));

        let output = output?;
        reaped?;
        Ok(output)
    }
}
