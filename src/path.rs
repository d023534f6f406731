//! LastPass path syntax.
//!
//! `lpass` addresses entries as `Folder\Subfolder/Name`: subfolders are
//! joined with a backslash and the last folder is separated from the entry
//! name with a slash. [`VaultPath`] holds the segments and renders them in
//! that syntax; [`Target`] accepts either form wherever a path is expected.

use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;

lazy_static! {
    /// Trailing ` [id: <digits>]` that `lpass ls` appends to entry names.
    static ref ID_SUFFIX: Regex =
        Regex::new(r" \[id: (?P<id>\d+)\]$").expect("id suffix pattern is valid");
}

/// Separator between the innermost folder and the entry name.
pub const FOLDER_SEPARATOR: char = '/';

/// Separator between nested folders.
pub const SUBFOLDER_SEPARATOR: char = '\\';

/// An ordered sequence of path segments: folders, then the entry name.
///
/// A trailing empty segment marks the segment before it as a folder rather
/// than an entry.
///
/// # Example
///
/// ```
/// use lastpass::VaultPath;
///
/// let path = VaultPath::from(["Folder", "Sub", "Leaf"]);
/// assert_eq!(path.encode("Shared-"), "Folder\\Sub/Leaf");
///
/// let folder = VaultPath::from(["Folder", ""]);
/// assert_eq!(folder.encode("Shared-"), "Folder");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VaultPath {
    segments: Vec<String>,
}

impl VaultPath {
    /// Creates a path from its segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns true if the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Renders the path in `lpass` syntax.
    ///
    /// A first segment starting with `shared_prefix` is a top-level shared
    /// folder and is always followed by `/`.
    pub fn encode(&self, shared_prefix: &str) -> String {
        encode_segments(&self.segments, shared_prefix)
    }
}

impl<S: Into<String>> FromIterator<S> for VaultPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<S: Into<String>> From<Vec<S>> for VaultPath {
    fn from(segments: Vec<S>) -> Self {
        Self::new(segments)
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for VaultPath {
    fn from(segments: [S; N]) -> Self {
        Self::new(segments)
    }
}

/// Joins segments in `lpass` syntax.
///
/// For segment `i` of `n`:
/// - the second-to-last segment followed by an empty one is emitted bare
///   and ends the path;
/// - a shared first segment, or the second-to-last segment, gets `/`;
/// - earlier segments get `\`;
/// - the last segment is emitted bare.
pub fn encode_segments<S: AsRef<str>>(segments: &[S], shared_prefix: &str) -> String {
    let n = segments.len();
    let mut encoded = String::new();

    for (i, segment) in segments.iter().enumerate() {
        let segment = segment.as_ref();
        let second_to_last = i + 2 == n;

        if second_to_last && segments[i + 1].as_ref().is_empty() {
            encoded.push_str(segment);
            break;
        }

        let shared = i == 0 && !shared_prefix.is_empty() && segment.starts_with(shared_prefix);

        encoded.push_str(segment);
        if shared || second_to_last {
            encoded.push(FOLDER_SEPARATOR);
        } else if i + 2 < n {
            encoded.push(SUBFOLDER_SEPARATOR);
        }
    }

    encoded
}

/// Returns the digits of a trailing ` [id: <digits>]`, if any.
///
/// ```
/// use lastpass::path::id_suffix;
///
/// assert_eq!(id_suffix("Personal/Bank [id: 42]"), Some("42"));
/// assert_eq!(id_suffix("Personal/Bank"), None);
/// ```
pub fn id_suffix(path: &str) -> Option<&str> {
    ID_SUFFIX
        .captures(path)
        .and_then(|caps| caps.name("id"))
        .map(|id| id.as_str())
}

/// Removes a trailing ` [id: <digits>]`.
pub fn strip_id_suffix(path: &str) -> Cow<'_, str> {
    ID_SUFFIX.replace(path, "")
}

/// A location in the vault: an already-encoded string or a segment list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Path already in `lpass` syntax, used as-is
    Raw(String),
    /// Segments encoded on use
    Path(VaultPath),
}

impl Target {
    /// Renders the target in `lpass` syntax.
    pub fn encode(&self, shared_prefix: &str) -> String {
        match self {
            Self::Raw(raw) => raw.clone(),
            Self::Path(path) => path.encode(shared_prefix),
        }
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::Raw(String::new())
    }
}

impl From<&str> for Target {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}

impl From<String> for Target {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

impl From<&String> for Target {
    fn from(raw: &String) -> Self {
        Self::Raw(raw.clone())
    }
}

impl From<VaultPath> for Target {
    fn from(path: VaultPath) -> Self {
        Self::Path(path)
    }
}

impl<S: Into<String>> From<Vec<S>> for Target {
    fn from(segments: Vec<S>) -> Self {
        Self::Path(VaultPath::new(segments))
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for Target {
    fn from(segments: [S; N]) -> Self {
        Self::Path(VaultPath::new(segments))
    }
}
