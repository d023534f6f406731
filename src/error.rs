//! Error types for LastPass operations.

use crate::vault::Lookup;
use thiserror::Error;

/// Result type alias using [`LastPassError`].
pub type Result<T> = std::result::Result<T, LastPassError>;

/// Errors that can occur while driving `lpass`.
///
/// All errors implement `std::error::Error` and can be chained with `source()`.
#[derive(Debug, Error)]
pub enum LastPassError {
    /// `lpass login` rejected the username, password or one-time code.
    #[error("invalid username, password or OTP code")]
    InvalidCredentials,

    /// The bound user has no active `lpass` session.
    #[error("user {username} is not logged in to LastPass")]
    NotLoggedIn {
        /// Username the session is bound to
        username: String,
    },

    /// `lpass show` found no object matching the lookup.
    #[error("no object stored in LastPass account {account} with the following attributes:\n{lookup}")]
    NotFound {
        /// Account the lookup ran against
        account: String,
        /// Parameters of the failed lookup
        lookup: Lookup,
    },

    /// The caller violated an operation's contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A process could not be started, fed or waited on.
    #[error("failed to run {program}: {source}")]
    ProcessFailure {
        /// Program that failed
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A command exited non-zero where that is not otherwise mapped.
    #[error("{program} failed with exit code {code}")]
    CommandFailed {
        /// Program that failed
        program: String,
        /// Exit code, or -1 when terminated by a signal
        code: i32,
    },

    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error (catch-all).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LastPassError {
    /// Wraps an I/O error raised while running `program`.
    ///
    /// # Example
    ///
    /// ```
    /// use lastpass::LastPassError;
    /// use std::io;
    ///
    /// let err = LastPassError::process(
    ///     "lpass",
    ///     io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
    /// );
    ///
    /// assert_eq!(err.to_string(), "failed to run lpass: No such file or directory");
    /// ```
    pub fn process(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::ProcessFailure {
            program: program.into(),
            source,
        }
    }
}
