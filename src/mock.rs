//! Scripted runner for testing.
//!
//! [`MockRunner`] never starts a process. It answers each `lpass`
//! subcommand with a scripted [`ProcessOutput`] (or an injected I/O
//! failure) and records every call so tests can assert on the exact
//! command lines and environment.

use crate::cli::{Invocation, Pipeline, ProcessOutput, Runner};
use crate::{LastPassError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::io::ErrorKind;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A call received by [`MockRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// [`Runner::run`]
    Single(Invocation),
    /// [`Runner::run_piped`]
    Piped(Pipeline),
}

impl Call {
    /// The invocation whose output was returned.
    pub fn invocation(&self) -> &Invocation {
        match self {
            Self::Single(inv) => inv,
            Self::Piped(pipeline) => &pipeline.consumer,
        }
    }
}

#[derive(Default)]
struct Script {
    responses: HashMap<String, VecDeque<ProcessOutput>>,
    failures: HashMap<String, ErrorKind>,
    calls: Vec<Call>,
}

/// Runner that replays scripted outputs.
///
/// Responses are keyed by `lpass` subcommand and consumed in order; the
/// last one queued for a subcommand keeps being returned. Subcommands with
/// nothing queued succeed with empty output.
///
/// # Example
///
/// ```
/// use lastpass::cli::ProcessOutput;
/// use lastpass::mock::MockRunner;
/// use lastpass::{Authenticator, Config};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> lastpass::Result<()> {
///     let runner = Arc::new(MockRunner::new());
///     runner.on("status", ProcessOutput::success("Logged in as user@example.com.\n"));
///
///     let auth = Authenticator::with_runner(Config::default(), runner.clone());
///     let session = auth.attach("user@example.com")?;
///     assert!(session.is_logged_in().await?);
///
///     assert_eq!(runner.invocations()[0].args, vec!["status"]);
///     Ok(())
/// }
/// ```
#[derive(Default)]
pub struct MockRunner {
    script: Mutex<Script>,
}

impl MockRunner {
    /// Creates a runner with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues `output` as the next response to `subcommand`.
    pub fn on(&self, subcommand: &str, output: ProcessOutput) {
        self.script()
            .responses
            .entry(subcommand.to_string())
            .or_default()
            .push_back(output);
    }

    /// Makes `subcommand` fail to start with an I/O error of `kind`.
    pub fn fail(&self, subcommand: &str, kind: ErrorKind) {
        self.script().failures.insert(subcommand.to_string(), kind);
    }

    /// Returns every call received, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.script().calls.clone()
    }

    /// Returns the output-producing invocation of every call, in order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.script()
            .calls
            .iter()
            .map(|call| call.invocation().clone())
            .collect()
    }

    /// Returns every pipeline received, in order.
    pub fn pipelines(&self) -> Vec<Pipeline> {
        self.script()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Piped(pipeline) => Some(pipeline.clone()),
                Call::Single(_) => None,
            })
            .collect()
    }

    fn respond(&self, call: Call) -> Result<ProcessOutput> {
        let mut script = self.script();
        let inv = call.invocation();
        let key = inv.subcommand.clone().unwrap_or_else(|| inv.program.clone());
        let program = inv.program.clone();
        script.calls.push(call);

        if let Some(kind) = script.failures.get(&key) {
            return Err(LastPassError::process(
                program,
                std::io::Error::new(*kind, "injected failure"),
            ));
        }

        let output = match script.responses.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        Ok(output.unwrap_or_else(|| ProcessOutput::success(Vec::new())))
    }
}

#[async_trait]
impl Runner for MockRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        self.respond(Call::Single(invocation.clone()))
    }

    async fn run_piped(&self, pipeline: &Pipeline) -> Result<ProcessOutput> {
        self.respond(Call::Piped(pipeline.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    #[tokio::test]
    async fn test_responses_in_order_last_sticks() {
        let runner = MockRunner::new();
        runner.on("status", ProcessOutput::success("first"));
        runner.on("status", ProcessOutput::success("second"));

        let inv = Invocation::lpass(&Config::default(), "status");
        assert_eq!(runner.run(&inv).await.unwrap().stdout, b"first");
        assert_eq!(runner.run(&inv).await.unwrap().stdout, b"second");
        assert_eq!(runner.run(&inv).await.unwrap().stdout, b"second");
        assert_eq!(runner.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_default_response() {
        let runner = MockRunner::new();
        let output = runner
            .run(&Invocation::lpass(&Config::default(), "ls"))
            .await
            .unwrap();

        assert!(output.completion().is_success());
        assert!(output.stdout.is_empty());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let runner = MockRunner::new();
        runner.fail("login", ErrorKind::PermissionDenied);

        let pipeline = Pipeline::new(
            Invocation::printf("%s", ["pw"]),
            Invocation::lpass(&Config::default(), "login"),
        );
        let result = runner.run_piped(&pipeline).await;

        assert!(matches!(result, Err(LastPassError::ProcessFailure { .. })));
        assert_eq!(runner.pipelines().len(), 1);
    }
}
