//! Configuration for `lpass` invocations.

use std::collections::BTreeMap;

/// Environment variable that makes `lpass` read secrets from stdin instead
/// of launching pinentry.
pub const DISABLE_PINENTRY_VAR: &str = "LPASS_DISABLE_PINENTRY";

/// Value that turns [`DISABLE_PINENTRY_VAR`] on.
pub const PINENTRY_DISABLED: &str = "1";

/// Sync behaviour passed to `lpass` as `--sync=<mode>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SyncMode {
    /// Sync only when the local blob is stale
    Auto,
    /// Always sync with the server before the operation
    #[default]
    Now,
    /// Never sync, use the local blob
    No,
}

impl SyncMode {
    /// Renders the mode as the `lpass` command-line flag.
    pub fn flag(&self) -> String {
        format!("--sync={}", self)
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Now => write!(f, "now"),
            Self::No => write!(f, "no"),
        }
    }
}

/// Configuration shared by every `lpass` invocation.
///
/// Use the builder pattern for ergonomic configuration:
///
/// ```
/// use lastpass::{Config, SyncMode};
///
/// let config = Config::new()
///     .with_program("/usr/local/bin/lpass")
///     .with_sync(SyncMode::Auto)
///     .with_env("LPASS_HOME", "/tmp/lpass-home");
///
/// assert_eq!(config.program, "/usr/local/bin/lpass");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Program to execute (default: `lpass`, resolved on `PATH`)
    pub program: String,

    /// Arguments placed before every subcommand, for wrappers
    pub program_args: Vec<String>,

    /// Sync mode for `ls`, `show` and `add` (default: now)
    pub sync: SyncMode,

    /// Prefix marking a top-level shared folder (default: "Shared-")
    pub shared_prefix: String,

    /// Whether `login` passes `--trust` (default: true)
    pub trust: bool,

    /// Extra environment variables for every invocation
    pub env: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            program: "lpass".to_string(),
            program_args: Vec::new(),
            sync: SyncMode::Now,
            shared_prefix: "Shared-".to_string(),
            trust: true,
            env: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the program to execute instead of `lpass`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Sets arguments placed between the program and the subcommand.
    ///
    /// Useful when `lpass` is reached through a wrapper, e.g. a program of
    /// `sh` with the script path as its first argument.
    pub fn with_program_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.program_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the sync mode.
    pub fn with_sync(mut self, sync: SyncMode) -> Self {
        self.sync = sync;
        self
    }

    /// Sets the shared-folder prefix used by path encoding.
    pub fn with_shared_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.shared_prefix = prefix.into();
        self
    }

    /// Controls whether logins are trusted for future non-interactive use.
    pub fn with_trust(mut self, trust: bool) -> Self {
        self.trust = trust;
        self
    }

    /// Adds an environment variable to every invocation.
    ///
    /// Common variables: `LPASS_HOME`, `LPASS_AGENT_TIMEOUT`,
    /// `LPASS_AUTO_SYNC_TIME`.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Returns the effective environment overrides.
    ///
    /// [`DISABLE_PINENTRY_VAR`] is always forced to [`PINENTRY_DISABLED`],
    /// whatever was set with [`with_env`](Self::with_env).
    pub fn environment(&self) -> Vec<(String, String)> {
        let mut env: Vec<(String, String)> = self
            .env
            .iter()
            .filter(|(key, _)| key.as_str() != DISABLE_PINENTRY_VAR)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        env.push((
            DISABLE_PINENTRY_VAR.to_string(),
            PINENTRY_DISABLED.to_string(),
        ));
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = Config::new()
            .with_program("sh")
            .with_program_args(["/tmp/fake-lpass"])
            .with_sync(SyncMode::No)
            .with_shared_prefix("Team-")
            .with_trust(false);

        assert_eq!(config.program, "sh");
        assert_eq!(config.program_args, vec!["/tmp/fake-lpass".to_string()]);
        assert_eq!(config.sync, SyncMode::No);
        assert_eq!(config.shared_prefix, "Team-");
        assert!(!config.trust);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.program, "lpass");
        assert!(config.program_args.is_empty());
        assert_eq!(config.sync, SyncMode::Now);
        assert_eq!(config.shared_prefix, "Shared-");
        assert!(config.trust);
    }

    #[test]
    fn test_sync_flag() {
        assert_eq!(SyncMode::Now.flag(), "--sync=now");
        assert_eq!(SyncMode::Auto.flag(), "--sync=auto");
        assert_eq!(SyncMode::No.flag(), "--sync=no");
    }

    #[test]
    fn test_pinentry_always_disabled() {
        let config = Config::new()
            .with_env("LPASS_HOME", "/tmp/home")
            .with_env(DISABLE_PINENTRY_VAR, "0");

        let env = config.environment();
        assert!(env.contains(&("LPASS_HOME".to_string(), "/tmp/home".to_string())));
        assert_eq!(
            env.iter()
                .filter(|(key, _)| key == DISABLE_PINENTRY_VAR)
                .collect::<Vec<_>>(),
            vec![&(DISABLE_PINENTRY_VAR.to_string(), "1".to_string())]
        );
    }
}
