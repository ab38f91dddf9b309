//! Incremental IMAP spam relocation
//!
//! Learns which sender hosts send spam from a reference folder (usually
//! the spam folder), then watches a target folder with IDLE and moves
//! new messages from those hosts into a destination folder.
//!
//! A host with a single known account matches only that account; a host
//! with two or more known accounts matches every sender on it.
//!
//! The pieces:
//!
//! - [`reference::rebuild`] turns the reference folder into a
//!   [`DomainCatalog`].
//! - [`TargetScanner`] finds target messages not yet evaluated.
//! - [`Classifier`] decides, [`relocate::relocate`] moves by UID.
//! - [`FolderWatcher`]s feed an [`event::queue`] consumed by one
//!   [`Processor`]; [`Engine`] wires it all together.

mod catalog;
mod classifier;
mod config;
mod connection;
pub mod detect;
mod engine;
mod envelope;
mod error;
pub mod event;
mod folder;
mod pattern;
mod processor;
pub mod reference;
pub mod relocate;
mod seqset;
mod store;
mod target;
mod watcher;

pub use catalog::{Domain, DomainCatalog};
pub use classifier::{Classifier, Decision, matches};
pub use config::{ImapConfig, SieveConfig, TlsMode};
pub use connection::ImapSession;
pub use engine::Engine;
pub use envelope::{Envelope, Sender};
pub use error::{Error, Result};
pub use folder::{FolderRole, Folders};
pub use pattern::HostPatterns;
pub use processor::Processor;
pub use relocate::{AutoConfirm, Confirm, RelocationPolicy, RelocationReport, TerminalPrompt};
pub use seqset::{SeqRange, UidSet};
pub use store::{Connector, ImapConnector, ImapStore, MailStore};
pub use target::{ProcessedSet, ScanStrategy, TargetScanner};
pub use watcher::{FolderWatcher, Notifications};
