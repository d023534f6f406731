//! Authentication against `lpass` and login-status checks.
//!
//! [`Authenticator::login`] pipes the master password (and optional
//! one-time code) into `lpass login --trust`. The resulting [`Session`] only
//! remembers the username: `lpass` keeps the real session state, so
//! [`Session::is_logged_in`] asks `lpass status` every time.

use crate::cli::{Completion, Invocation, Pipeline, Runner, SystemRunner};
use crate::validation::validate_argument;
use crate::{Config, LastPassError, Result, Vault};
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::{info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

lazy_static! {
    static ref STATUS_LINE: Regex =
        Regex::new(r"^Logged in as (?P<user>\S*)\.$").expect("status pattern is valid");
}

/// Login credentials.
///
/// Secret fields are zeroed when the value is dropped and redacted from
/// `Debug` output.
///
/// Zeroing only covers this value and the argument list built from it.
/// The password and code are still passed to `printf` on its command line,
/// so copies remain in the spawned process's argv, in the short-lived
/// `Command` used to spawn it, and in allocator memory that is not ours to
/// clear.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    username: String,
    password: String,
    otp: Option<String>,
}

impl Credentials {
    /// Creates credentials without a one-time code.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            otp: None,
        }
    }

    /// Adds a one-time code. An empty code is ignored.
    pub fn with_otp(mut self, otp: impl Into<String>) -> Self {
        let otp = otp.into();
        self.otp = if otp.is_empty() { None } else { Some(otp) };
        self
    }

    /// Returns the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Builds the process that writes the secrets to `lpass login`.
    ///
    /// The `\n` in the format is the literal escape `printf` expands into
    /// the line break separating password and code.
    fn feeder(&self) -> Invocation {
        match &self.otp {
            Some(otp) => Invocation::printf("%s\\n%s", [self.password.as_str(), otp.as_str()]),
            None => Invocation::printf("%s", [self.password.as_str()]),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("otp", &self.otp.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Logs in to LastPass through `lpass`.
///
/// # Example
///
/// ```no_run
/// use lastpass::{Authenticator, Config, Credentials, LastPassError};
///
/// #[tokio::main]
/// async fn main() -> lastpass::Result<()> {
///     let auth = Authenticator::new(Config::default());
///     let credentials = Credentials::new("user@example.com", "master-password")
///         .with_otp("123456");
///
///     match auth.login(&credentials).await {
///         Ok(session) => assert!(session.is_logged_in().await?),
///         Err(LastPassError::InvalidCredentials) => eprintln!("wrong password"),
///         Err(e) => return Err(e),
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Authenticator {
    config: Arc<Config>,
    runner: Arc<dyn Runner>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// Creates an authenticator that spawns real processes.
    pub fn new(config: Config) -> Self {
        Self::with_runner(config, Arc::new(SystemRunner::new()))
    }

    /// Creates an authenticator over a custom runner.
    pub fn with_runner(config: Config, runner: Arc<dyn Runner>) -> Self {
        Self {
            config: Arc::new(config),
            runner,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn session(&self, username: &str) -> Session {
        Session {
            username: username.to_string(),
            config: Arc::clone(&self.config),
            runner: Arc::clone(&self.runner),
        }
    }

    /// Binds a session to `username` without logging in.
    ///
    /// For accounts `lpass` already trusts from an earlier login. No
    /// process is started; use [`Session::ensure_logged_in`] to check.
    ///
    /// # Errors
    ///
    /// Returns [`LastPassError::InvalidArgument`] for an invalid username.
    pub fn attach(&self, username: &str) -> Result<Session> {
        validate_argument("username", username)?;
        Ok(self.session(username))
    }

    /// Logs in with `printf <secrets> | lpass login <username> --trust`.
    ///
    /// On success `lpass` persists its own session; the returned
    /// [`Session`] is bound to the username.
    ///
    /// # Errors
    ///
    /// - [`LastPassError::InvalidCredentials`]: `lpass login` exited non-zero
    /// - [`LastPassError::InvalidArgument`]: the username is not a valid
    ///   argument
    /// - [`LastPassError::ProcessFailure`]: a stage could not be run
    pub async fn login(&self, credentials: &Credentials) -> Result<Session> {
        let username = credentials.username();
        validate_argument("username", username)?;

        let mut consumer = Invocation::lpass(&self.config, "login").arg(username);
        if self.config.trust {
            consumer = consumer.arg("--trust");
        }

        let mut pipeline = Pipeline::new(credentials.feeder(), consumer.discard_stdout());
        let result = self.runner.run_piped(&pipeline).await;
        // Clears our argument list only; the spawned `Command` kept its own copies.
        pipeline.feeder.args.zeroize();

        match result?.completion() {
            Completion::Succeeded => {
                info!(username = %username, "logged in to LastPass");
                Ok(self.session(username))
            }
            Completion::Rejected { code } => {
                warn!(username = %username, code, "lpass rejected login");
                Err(LastPassError::InvalidCredentials)
            }
        }
    }
}

/// A username bound to the `lpass` session state.
#[derive(Clone)]
pub struct Session {
    username: String,
    config: Arc<Config>,
    runner: Arc<dyn Runner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Returns the bound username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Checks whether `lpass` is logged in as the bound user.
    ///
    /// Runs `lpass status` on every call. True only when its first line is
    /// `Logged in as <user>.` with `<user>` equal to the bound username.
    ///
    /// # Errors
    ///
    /// Returns [`LastPassError::ProcessFailure`] if `lpass` could not be run.
    pub async fn is_logged_in(&self) -> Result<bool> {
        let inv = Invocation::lpass(&self.config, "status");
        let output = self.runner.run(&inv).await?;
        let status = String::from_utf8_lossy(&output.stdout);

        Ok(logged_in_user(&status) == Some(self.username.as_str()))
    }

    /// Fails unless `lpass` is logged in as the bound user.
    ///
    /// # Errors
    ///
    /// - [`LastPassError::NotLoggedIn`]: no session for this user
    /// - [`LastPassError::ProcessFailure`]: `lpass` could not be run
    pub async fn ensure_logged_in(&self) -> Result<()> {
        if self.is_logged_in().await? {
            Ok(())
        } else {
            Err(LastPassError::NotLoggedIn {
                username: self.username.clone(),
            })
        }
    }

    /// Returns a vault client for this session.
    pub fn vault(&self) -> Vault {
        Vault::new(
            self.username.clone(),
            Arc::clone(&self.config),
            Arc::clone(&self.runner),
        )
    }
}

/// Extracts the user from the first line of `lpass status` output.
fn logged_in_user(status: &str) -> Option<&str> {
    let first = status.lines().next()?.trim_end();
    STATUS_LINE
        .captures(first)
        .and_then(|caps| caps.name("user"))
        .map(|user| user.as_str())
}
