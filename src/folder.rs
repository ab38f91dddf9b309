//! Watched folders
//!
//! The engine deals with three folders: the reference folder it learns
//! spam senders from, the target folder it filters, and the
//! destination folder matched messages are moved to. Only the first
//! two are watched, and each watched folder has a [`FolderRole`].

use std::fmt;

/// Which watched folder raised an event.
///
/// # Examples
///
/// ```
/// use mailsieve::FolderRole;
///
/// assert_eq!(FolderRole::Reference.to_string(), "reference");
/// assert_eq!(FolderRole::Target.to_string(), "target");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FolderRole {
    /// The known-spam folder the domain catalog is built from.
    Reference,
    /// The folder whose new messages are classified.
    Target,
}

impl FolderRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Target => "target",
        }
    }
}

impl fmt::Display for FolderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Folder names used by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folders {
    pub reference: String,
    pub target: String,
    pub destination: String,
}

impl Folders {
    pub const DEFAULT_REFERENCE: &'static str = "INBOX.spam";
    pub const DEFAULT_TARGET: &'static str = "INBOX";
    pub const DEFAULT_DESTINATION: &'static str = "INBOX.Filtered";

    /// The folder name watched under `role`.
    #[must_use]
    pub fn name(&self, role: FolderRole) -> &str {
        match role {
            FolderRole::Reference => &self.reference,
            FolderRole::Target => &self.target,
        }
    }
}

impl Default for Folders {
    fn default() -> Self {
        Self {
            reference: Self::DEFAULT_REFERENCE.to_string(),
            target: Self::DEFAULT_TARGET.to_string(),
            destination: Self::DEFAULT_DESTINATION.to_string(),
        }
    }
}
