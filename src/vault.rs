//! Vault client: listing, showing and adding entries through `lpass`.
//!
//! Each operation is one `lpass` invocation against a session that `lpass`
//! already holds. Nothing is cached between calls.

use crate::cli::{Completion, Invocation, Pipeline, ProcessOutput, Runner};
use crate::path::{id_suffix, strip_id_suffix, Target};
use crate::validation::validate_argument;
use crate::{Config, LastPassError, NoteType, Result, VaultEntry};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Parameters of a `show` lookup.
///
/// Exactly one of `id` or `path` is required; when both are set the id wins.
///
/// # Example
///
/// ```
/// use lastpass::ShowRequest;
///
/// let request = ShowRequest::by_path(["Personal", "Bank"])
///     .with_field("password");
/// assert_eq!(request.field.as_deref(), Some("password"));
/// assert!(!request.json);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowRequest {
    /// Numeric object id
    pub id: Option<String>,
    /// Object path
    pub path: Option<Target>,
    /// Single field to print (`--field`); empty means none
    pub field: Option<String>,
    /// Request structured output (`--json`)
    pub json: bool,
}

impl ShowRequest {
    /// Creates a lookup by object id.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Creates a lookup by path.
    pub fn by_path(path: impl Into<Target>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Requests a single field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Requests structured output.
    pub fn structured(mut self) -> Self {
        self.json = true;
        self
    }
}

/// Diagnostic record of a failed lookup, rendered as pretty JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lookup {
    /// Object id, if given
    pub id: Option<String>,
    /// Encoded path, if given
    pub path: Option<String>,
    /// Requested field, if any
    pub field: Option<String>,
    /// Whether structured output was requested
    pub json_format: bool,
}

impl std::fmt::Display for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string_pretty(self) {
            Ok(json) => write!(f, "{}", json),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}

/// Client for vault operations of one logged-in account.
///
/// Cheap to clone; clones share the configuration and runner.
///
/// # Example
///
/// ```no_run
/// use lastpass::{Authenticator, Config, Credentials, NoteType};
///
/// #[tokio::main]
/// async fn main() -> lastpass::Result<()> {
///     let auth = Authenticator::new(Config::default());
///     let session = auth
///         .login(&Credentials::new("user@example.com", "master-password"))
///         .await?;
///
///     let vault = session.vault();
///     for entry in vault.list("Personal").await? {
///         println!("{}", entry);
///     }
///
///     vault
///         .add_note(NoteType::Server, "Hostname: db1", ["Work", "Servers", "db1"])
///         .await?;
///
///     let fields = vault.get_by_path(["Work", "Servers", "db1"]).await?;
///     println!("{:?}", fields.get("note"));
///
///     vault.logout().await
/// }
/// ```
#[derive(Clone)]
pub struct Vault {
    username: String,
    config: Arc<Config>,
    runner: Arc<dyn Runner>,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("username", &self.username)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Vault {
    /// Creates a client for `username` over an existing runner.
    pub fn new(username: impl Into<String>, config: Arc<Config>, runner: Arc<dyn Runner>) -> Self {
        Self {
            username: username.into(),
            config,
            runner,
        }
    }

    /// Returns the account this client is bound to.
    pub fn username(&self) -> &str {
        &self.username
    }

    fn encode(&self, target: &Target) -> String {
        target.encode(&self.config.shared_prefix)
    }

    fn not_found(&self, lookup: Lookup) -> LastPassError {
        LastPassError::NotFound {
            account: self.username.clone(),
            lookup,
        }
    }

    /// Lists entries whose `lpass ls` line starts with `filter`.
    ///
    /// An empty filter matches every entry. Order is the order `lpass`
    /// printed them in.
    ///
    /// # Errors
    ///
    /// - [`LastPassError::CommandFailed`]: `lpass ls` exited non-zero
    /// - [`LastPassError::ProcessFailure`]: `lpass` could not be run
    pub async fn list(&self, filter: impl Into<Target>) -> Result<Vec<String>> {
        let filter = self.encode(&filter.into());

        let inv = Invocation::lpass(&self.config, "ls").arg(self.config.sync.flag());
        let output = self.runner.run(&inv).await?;

        if let Completion::Rejected { code } = output.completion() {
            return Err(LastPassError::CommandFailed {
                program: self.config.program.clone(),
                code,
            });
        }

        Ok(output
            .stdout_text()?
            .lines()
            .filter(|entry| entry.starts_with(&filter))
            .map(str::to_string)
            .collect())
    }

    /// Creates a secure note named `name` with `content` as its body.
    ///
    /// The content is piped to `lpass add --non-interactive`. A non-zero
    /// exit is not an error: it is returned as [`Completion::Rejected`] for
    /// the caller to inspect.
    ///
    /// # Errors
    ///
    /// - [`LastPassError::InvalidArgument`]: the encoded name is not a
    ///   valid argument (empty, control characters, leading `-`)
    /// - [`LastPassError::ProcessFailure`]: a stage could not be run
    pub async fn add_note(
        &self,
        note_type: NoteType,
        content: &str,
        name: impl Into<Target>,
    ) -> Result<Completion> {
        let name = self.encode(&name.into());
        validate_argument("entry name", &name)?;

        let feeder = Invocation::printf("%s", [content]);
        let consumer = Invocation::lpass(&self.config, "add")
            .arg(format!("--note-type={}", note_type))
            .arg(name.as_str())
            .arg("--non-interactive")
            .arg(self.config.sync.flag());

        let output = self
            .runner
            .run_piped(&Pipeline::new(feeder, consumer))
            .await?;

        let completion = output.completion();
        if !completion.is_success() {
            warn!(
                name = %name,
                note_type = %note_type,
                code = completion.code(),
                "lpass rejected new note"
            );
        }

        Ok(completion)
    }

    async fn fetch(&self, request: &ShowRequest) -> Result<(Lookup, ProcessOutput)> {
        let id = request.id.clone().filter(|id| !id.is_empty());
        let path = request
            .path
            .as_ref()
            .map(|path| self.encode(path))
            .filter(|path| !path.is_empty());

        let field = request.field.clone().filter(|field| !field.is_empty());

        let selector = match (&id, &path) {
            (Some(id), _) => {
                validate_argument("object id", id)?;
                id.clone()
            }
            (None, Some(path)) => {
                validate_argument("object path", path)?;
                path.clone()
            }
            (None, None) => {
                return Err(LastPassError::InvalidArgument(
                    "an object id or path is required to retrieve an object from the vault"
                        .to_string(),
                ))
            }
        };

        let mut inv = Invocation::lpass(&self.config, "show")
            .arg(self.config.sync.flag())
            .arg(selector);

        if let Some(field) = &field {
            inv = inv.arg(format!("--field={}", field));
        }

        if request.json {
            inv = inv.arg("--json");
        }

        let output = self.runner.run(&inv).await?;

        let lookup = Lookup {
            id,
            path,
            field,
            json_format: request.json,
        };

        if !output.completion().is_success() {
            return Err(self.not_found(lookup));
        }

        Ok((lookup, output))
    }

    fn first_object(&self, lookup: Lookup, output: &ProcessOutput) -> Result<Map<String, Value>> {
        let mut objects: Vec<Map<String, Value>> = serde_json::from_slice(&output.stdout)?;
        if objects.is_empty() {
            return Err(self.not_found(lookup));
        }
        Ok(objects.swap_remove(0))
    }

    /// Retrieves an object with `lpass show`.
    ///
    /// Structured requests return the first object of the JSON array as
    /// [`VaultEntry::Fields`]; others return the raw output as
    /// [`VaultEntry::Text`].
    ///
    /// # Errors
    ///
    /// - [`LastPassError::InvalidArgument`]: neither id nor path was given;
    ///   no process is started
    /// - [`LastPassError::NotFound`]: `lpass show` exited non-zero, or
    ///   returned an empty array
    /// - [`LastPassError::Json`]: structured output could not be parsed
    /// - [`LastPassError::ProcessFailure`]: `lpass` could not be run
    pub async fn show(&self, request: ShowRequest) -> Result<VaultEntry> {
        let (lookup, output) = self.fetch(&request).await?;

        if request.json {
            return self.first_object(lookup, &output).map(VaultEntry::Fields);
        }

        Ok(VaultEntry::Text(output.stdout_text()?))
    }

    /// Retrieves an object's fields from its path.
    ///
    /// A path ending in ` [id: <digits>]` (as printed by `lpass ls`) is
    /// looked up by that id, ignoring the rest of the path. An id of `0`
    /// is not a real object id: the suffix is stripped and the remaining
    /// path is looked up instead.
    ///
    /// # Errors
    ///
    /// Same as [`show`](Self::show).
    pub async fn get_by_path(&self, path: impl Into<Target>) -> Result<Map<String, Value>> {
        let path = self.encode(&path.into());

        let request = match id_suffix(&path) {
            Some(id) if id != "0" => ShowRequest::by_id(id),
            _ => ShowRequest::by_path(strip_id_suffix(&path).into_owned()),
        }
        .structured();

        let (lookup, output) = self.fetch(&request).await?;
        self.first_object(lookup, &output)
    }

    /// Ends the `lpass` session with `lpass logout --force`.
    ///
    /// The exit code is not inspected.
    ///
    /// # Errors
    ///
    /// Returns [`LastPassError::ProcessFailure`] only if `lpass` could not
    /// be run.
    pub async fn logout(&self) -> Result<()> {
        let inv = Invocation::lpass(&self.config, "logout").arg("--force");
        let output = self.runner.run(&inv).await?;

        info!(
            username = %self.username,
            code = output.completion().code(),
            "logged out of LastPass"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DISABLE_PINENTRY_VAR;
    use crate::mock::MockRunner;
    use crate::VaultPath;

    const LS_OUTPUT: &str = "\
Personal\\Bank/Checking [id: 101]
Work/Jira [id: 202]
Personal/Mail [id: 303]
Shared-Ops/Root [id: 404]
";

    const SHOW_JSON: &str = r#"[
  {
    "id": "42",
    "name": "Checking",
    "fullname": "Personal\\Bank/Checking",
    "username": "me",
    "password": "hunter2",
    "note": ""
  }
]"#;

    fn vault(runner: &Arc<MockRunner>) -> Vault {
        Vault::new("user@example.com", Arc::new(Config::default()), runner.clone())
    }

    #[tokio::test]
    async fn test_list_filters_by_prefix() {
        let runner = Arc::new(MockRunner::new());
        runner.on("ls", ProcessOutput::success(LS_OUTPUT));

        let entries = vault(&runner).list("Personal").await.unwrap();
        assert_eq!(
            entries,
            vec![
                "Personal\\Bank/Checking [id: 101]".to_string(),
                "Personal/Mail [id: 303]".to_string(),
            ]
        );

        let calls = runner.invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args, vec!["ls", "--sync=now"]);
    }

    #[tokio::test]
    async fn test_list_empty_filter_matches_all() {
        let runner = Arc::new(MockRunner::new());
        runner.on("ls", ProcessOutput::success(LS_OUTPUT));

        let entries = vault(&runner).list("").await.unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[3], "Shared-Ops/Root [id: 404]");
    }

    #[tokio::test]
    async fn test_list_with_path_filter() {
        let runner = Arc::new(MockRunner::new());
        runner.on("ls", ProcessOutput::success(LS_OUTPUT));

        let entries = vault(&runner)
            .list(VaultPath::from(["Personal", "Bank", ""]))
            .await
            .unwrap();
        assert_eq!(entries, vec!["Personal\\Bank/Checking [id: 101]".to_string()]);
    }

    #[tokio::test]
    async fn test_list_failure() {
        let runner = Arc::new(MockRunner::new());
        runner.on("ls", ProcessOutput::failure(1));

        let result = vault(&runner).list("").await;
        assert!(matches!(result, Err(LastPassError::CommandFailed { code: 1, .. })));
    }

    #[tokio::test]
    async fn test_every_invocation_disables_pinentry() {
        let runner = Arc::new(MockRunner::new());
        runner.on("show", ProcessOutput::success("secret"));
        let vault = vault(&runner);

        vault.list("").await.unwrap();
        vault.show(ShowRequest::by_id("42")).await.unwrap();
        vault.add_note(NoteType::Server, "body", "Leaf").await.unwrap();
        vault.logout().await.unwrap();

        let calls = runner.invocations();
        assert_eq!(calls.len(), 4);
        for inv in calls {
            assert!(inv
                .env
                .contains(&(DISABLE_PINENTRY_VAR.to_string(), "1".to_string())));
        }
    }

    #[tokio::test]
    async fn test_add_note_pipes_content() {
        let runner = Arc::new(MockRunner::new());

        let completion = vault(&runner)
            .add_note(NoteType::Database, "Hostname: db1\n100%", ["Work", "DB", "db1"])
            .await
            .unwrap();
        assert_eq!(completion, Completion::Succeeded);

        let pipelines = runner.pipelines();
        assert_eq!(pipelines.len(), 1);
        assert_eq!(pipelines[0].feeder.program, "printf");
        assert_eq!(pipelines[0].feeder.args, vec!["%s", "Hostname: db1\n100%"]);
        assert_eq!(
            pipelines[0].consumer.args,
            vec![
                "add",
                "--note-type=database",
                "Work\\DB/db1",
                "--non-interactive",
                "--sync=now",
            ]
        );
    }

    #[tokio::test]
    async fn test_add_note_rejection_is_returned() {
        let runner = Arc::new(MockRunner::new());
        runner.on("add", ProcessOutput::failure(1));

        let completion = vault(&runner)
            .add_note(NoteType::Server, "body", "Leaf")
            .await
            .unwrap();
        assert_eq!(completion, Completion::Rejected { code: 1 });
        assert_eq!(completion.code(), 1);
    }

    #[tokio::test]
    async fn test_add_note_rejects_option_like_name() {
        let runner = Arc::new(MockRunner::new());

        let result = vault(&runner)
            .add_note(NoteType::Server, "body", "--sync=no")
            .await;
        assert!(matches!(result, Err(LastPassError::InvalidArgument(_))));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_show_requires_id_or_path() {
        let runner = Arc::new(MockRunner::new());

        let result = vault(&runner).show(ShowRequest::default().structured()).await;
        assert!(matches!(result, Err(LastPassError::InvalidArgument(_))));

        let result = vault(&runner)
            .show(ShowRequest::by_path(VaultPath::default()))
            .await;
        assert!(matches!(result, Err(LastPassError::InvalidArgument(_))));

        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_show_text_with_field() {
        let runner = Arc::new(MockRunner::new());
        runner.on("show", ProcessOutput::success("hunter2\n"));

        let entry = vault(&runner)
            .show(ShowRequest::by_path(["Personal", "Bank", "Checking"]).with_field("password"))
            .await
            .unwrap();
        assert_eq!(entry, VaultEntry::Text("hunter2\n".to_string()));

        let calls = runner.invocations();
        assert_eq!(
            calls[0].args,
            vec!["show", "--sync=now", "Personal\\Bank/Checking", "--field=password"]
        );
    }

    #[tokio::test]
    async fn test_show_empty_field_is_ignored() {
        let runner = Arc::new(MockRunner::new());
        runner.on("show", ProcessOutput::success("Personal/Mail [id: 42]\n"));

        let entry = vault(&runner)
            .show(ShowRequest::by_id("42").with_field(""))
            .await
            .unwrap();
        assert_eq!(entry.as_text(), Some("Personal/Mail [id: 42]\n"));

        let calls = runner.invocations();
        assert_eq!(calls[0].args, vec!["show", "--sync=now", "42"]);
    }

    #[tokio::test]
    async fn test_show_structured() {
        let runner = Arc::new(MockRunner::new());
        runner.on("show", ProcessOutput::success(SHOW_JSON));

        let entry = vault(&runner)
            .show(ShowRequest::by_id("42").structured())
            .await
            .unwrap();
        assert_eq!(entry.field("password"), Some("hunter2"));
        assert_eq!(entry.field("fullname"), Some("Personal\\Bank/Checking"));

        let calls = runner.invocations();
        assert_eq!(calls[0].args, vec!["show", "--sync=now", "42", "--json"]);
    }

    #[tokio::test]
    async fn test_show_id_takes_precedence() {
        let runner = Arc::new(MockRunner::new());
        runner.on("show", ProcessOutput::success("x"));

        let request = ShowRequest {
            id: Some("7".to_string()),
            path: Some(Target::from("Personal/Mail")),
            ..Default::default()
        };
        vault(&runner).show(request).await.unwrap();

        assert_eq!(runner.invocations()[0].args[2], "7");
    }

    #[tokio::test]
    async fn test_show_not_found_reports_lookup() {
        let runner = Arc::new(MockRunner::new());
        runner.on("show", ProcessOutput::failure(1));

        let err = vault(&runner)
            .show(ShowRequest::by_path("Personal/Missing").with_field("password"))
            .await
            .unwrap_err();

        match &err {
            LastPassError::NotFound { account, lookup } => {
                assert_eq!(account, "user@example.com");
                assert_eq!(lookup.id, None);
                assert_eq!(lookup.path.as_deref(), Some("Personal/Missing"));
                assert_eq!(lookup.field.as_deref(), Some("password"));
                assert!(!lookup.json_format);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("\"path\": \"Personal/Missing\""));
    }

    #[tokio::test]
    async fn test_show_empty_array_is_not_found() {
        let runner = Arc::new(MockRunner::new());
        runner.on("show", ProcessOutput::success("[]"));

        let result = vault(&runner)
            .show(ShowRequest::by_id("42").structured())
            .await;
        assert!(matches!(result, Err(LastPassError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_show_malformed_json() {
        let runner = Arc::new(MockRunner::new());
        runner.on("show", ProcessOutput::success("not json"));

        let result = vault(&runner)
            .show(ShowRequest::by_id("42").structured())
            .await;
        assert!(matches!(result, Err(LastPassError::Json(_))));
    }

    #[tokio::test]
    async fn test_get_by_path_uses_id_suffix() {
        let runner = Arc::new(MockRunner::new());
        runner.on("show", ProcessOutput::success(SHOW_JSON));

        let fields = vault(&runner)
            .get_by_path(["Personal", "Bank", "Checking [id: 42]"])
            .await
            .unwrap();
        assert_eq!(fields.get("id"), Some(&Value::String("42".to_string())));

        let calls = runner.invocations();
        assert_eq!(calls[0].args, vec!["show", "--sync=now", "42", "--json"]);
    }

    #[tokio::test]
    async fn test_get_by_path_zero_id_falls_back_to_path() {
        let runner = Arc::new(MockRunner::new());
        runner.on("show", ProcessOutput::success(SHOW_JSON));

        vault(&runner)
            .get_by_path("Personal\\Bank/Checking [id: 0]")
            .await
            .unwrap();

        let calls = runner.invocations();
        assert_eq!(
            calls[0].args,
            vec!["show", "--sync=now", "Personal\\Bank/Checking", "--json"]
        );
    }

    #[tokio::test]
    async fn test_get_by_path_without_suffix() {
        let runner = Arc::new(MockRunner::new());
        runner.on("show", ProcessOutput::success(SHOW_JSON));

        vault(&runner).get_by_path(["Shared-Ops", "Root"]).await.unwrap();

        let calls = runner.invocations();
        assert_eq!(calls[0].args, vec!["show", "--sync=now", "Shared-Ops/Root", "--json"]);
    }

    #[tokio::test]
    async fn test_logout_ignores_exit_code() {
        let runner = Arc::new(MockRunner::new());
        runner.on("logout", ProcessOutput::failure(1));

        vault(&runner).logout().await.unwrap();

        let calls = runner.invocations();
        assert_eq!(calls[0].args, vec!["logout", "--force"]);
    }

    #[tokio::test]
    async fn test_process_failure_is_surfaced() {
        let runner = Arc::new(MockRunner::new());
        runner.fail("ls", std::io::ErrorKind::NotFound);

        let result = vault(&runner).list("").await;
        assert!(matches!(result, Err(LastPassError::ProcessFailure { .. })));
    }

    #[tokio::test]
    async fn test_sync_mode_from_config() {
        let runner = Arc::new(MockRunner::new());
        let config = Config::new().with_sync(crate::SyncMode::No);
        let vault = Vault::new("user@example.com", Arc::new(config), runner.clone());

        vault.list("").await.unwrap();
        assert_eq!(runner.invocations()[0].args, vec!["ls", "--sync=no"]);
    }
}
