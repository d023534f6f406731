//! Data returned by and passed to vault operations.

use serde_json::{Map, Value};
use std::str::FromStr;

/// Result of a `show` query.
#[derive(Debug, Clone, PartialEq)]
pub enum VaultEntry {
    /// Raw decoded stdout
    Text(String),
    /// Field/value mapping from `show --json`
    Fields(Map<String, Value>),
}

impl VaultEntry {
    /// Returns the raw text, if this is a text entry.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            Self::Fields(_) => None,
        }
    }

    /// Returns the field mapping, if this is a structured entry.
    pub fn as_fields(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Text(_) => None,
            Self::Fields(fields) => Some(fields),
        }
    }

    /// Looks up a string field of a structured entry.
    ///
    /// # Example
    ///
    /// ```
    /// use lastpass::VaultEntry;
    ///
    /// let fields = serde_json::json!({"id": "42", "name": "Bank"});
    /// let entry = VaultEntry::Fields(fields.as_object().unwrap().clone());
    ///
    /// assert_eq!(entry.field("name"), Some("Bank"));
    /// assert_eq!(entry.field("missing"), None);
    /// ```
    pub fn field(&self, name: &str) -> Option<&str> {
        self.as_fields()
            .and_then(|fields| fields.get(name))
            .and_then(Value::as_str)
    }

    /// Consumes the entry, returning the field mapping if structured.
    pub fn into_fields(self) -> Option<Map<String, Value>> {
        match self {
            Self::Text(_) => None,
            Self::Fields(fields) => Some(fields),
        }
    }
}

/// Secure-note template accepted by `lpass add --note-type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NoteType {
    /// American Express card
    Amex,
    /// Bank account
    Bank,
    /// Credit card
    Credit,
    /// Database credentials
    Database,
    /// Driver's license
    DriversLicense,
    /// Email account
    Email,
    /// Health insurance
    Health,
    /// Instant messenger account
    Im,
    /// Insurance policy
    Insurance,
    /// Mastercard
    Mastercard,
    /// Membership
    Membership,
    /// Passport
    Passport,
    /// Server credentials
    Server,
    /// Software license
    Software,
    /// SSH key
    SshKey,
    /// Visa card
    Visa,
    /// Wi-Fi password
    Wifi,
    /// Any other template name understood by `lpass`
    Custom(String),
}

impl std::fmt::Display for NoteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Amex => write!(f, "amex"),
            Self::Bank => write!(f, "bank"),
            Self::Credit => write!(f, "credit"),
            Self::Database => write!(f, "database"),
            Self::DriversLicense => write!(f, "driverslicense"),
            Self::Email => write!(f, "email"),
            Self::Health => write!(f, "health"),
            Self::Im => write!(f, "im"),
            Self::Insurance => write!(f, "insurance"),
            Self::Mastercard => write!(f, "mastercard"),
            Self::Membership => write!(f, "membership"),
            Self::Passport => write!(f, "passport"),
            Self::Server => write!(f, "server"),
            Self::Software => write!(f, "software"),
            Self::SshKey => write!(f, "ssh-key"),
            Self::Visa => write!(f, "visa"),
            Self::Wifi => write!(f, "wifi"),
            Self::Custom(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for NoteType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "amex" => Self::Amex,
            "bank" => Self::Bank,
            "credit" => Self::Credit,
            "database" => Self::Database,
            "driverslicense" => Self::DriversLicense,
            "email" => Self::Email,
            "health" => Self::Health,
            "im" => Self::Im,
            "insurance" => Self::Insurance,
            "mastercard" => Self::Mastercard,
            "membership" => Self::Membership,
            "passport" => Self::Passport,
            "server" => Self::Server,
            "software" => Self::Software,
            "ssh-key" | "sshkey" => Self::SshKey,
            "visa" => Self::Visa,
            "wifi" => Self::Wifi,
            _ => Self::Custom(s.to_string()),
        })
    }
}
