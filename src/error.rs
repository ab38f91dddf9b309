//! Error types for mailsieve

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IMAP error: {0}")]
    Imap(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid host pattern: {0}")]
    Pattern(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Failed to relocate UID {uid}: {reason}")]
    Relocation { uid: u32, reason: String },

    #[error("Event queue is full ({capacity} pending events)")]
    QueueFull { capacity: usize },

    #[error("Event queue is closed")]
    QueueClosed,

    #[error("Watcher for {folder} failed: {reason}")]
    Watcher { folder: String, reason: String },

    #[error("Cancelled by operator")]
    Cancelled,
}

impl Error {
    /// Whether this error must stop the engine rather than just the
    /// current scan.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::QueueFull { .. } | Self::QueueClosed | Self::Watcher { .. } | Self::Cancelled
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
