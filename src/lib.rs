//! lastpass - Async interface to the LastPass command-line tool.
//!
//! This crate drives `lpass` as a child process: it logs in by piping the
//! master password into `lpass login`, and lists, shows and adds entries by
//! running the matching subcommands and parsing their text or JSON output.
//! All vault state and security lives in `lpass`; nothing is cached here.
//!
//! # Features
//!
//! - **Async/Await**: Built on tokio processes
//! - **Typed results**: Text and JSON output parsed into [`VaultEntry`]
//! - **Path encoding**: Folder lists rendered in `lpass` path syntax
//! - **No prompts**: pinentry is always disabled; secrets go through pipes
//! - **Testable**: Swap the process [`Runner`](cli::Runner) for
//!   [`MockRunner`](mock::MockRunner)
//!
//! # Quick Start
//!
//! ```no_run
//! use lastpass::{Authenticator, Config, Credentials, ShowRequest};
//!
//! #[tokio::main]
//! async fn main() -> lastpass::Result<()> {
//!     let auth = Authenticator::new(Config::default());
//!
//!     // Log in (lpass keeps the trusted session)
//!     let session = auth
//!         .login(&Credentials::new("user@example.com", "master-password"))
//!         .await?;
//!
//!     let vault = session.vault();
//!
//!     // Folder lists are encoded as "Personal\Bank/Checking"
//!     let entry = vault
//!         .show(ShowRequest::by_path(["Personal", "Bank", "Checking"]).with_field("password"))
//!         .await?;
//!     println!("{:?}", entry.as_text());
//!
//!     vault.logout().await
//! }
//! ```
//!
//! # Requirements
//!
//! `lpass` ([lastpass-cli](https://github.com/lastpass/lastpass-cli)) and
//! `printf` on `PATH`, or a custom program set with
//! [`Config::with_program`].
//!
//! # Logging
//!
//! Events are emitted with `tracing`; install a subscriber to see them.
//! Passwords, one-time codes and note contents are never logged.

pub mod cli;
pub mod config;
pub mod entry;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod path;
pub mod session;
pub mod validation;
pub mod vault;

pub use cli::Completion;
pub use config::{Config, SyncMode};
pub use entry::{NoteType, VaultEntry};
pub use error::{LastPassError, Result};
pub use path::{Target, VaultPath};
pub use session::{Authenticator, Credentials, Session};
pub use vault::{Lookup, ShowRequest, Vault};
