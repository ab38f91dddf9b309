//! Mail store access
//!
//! [`MailStore`] is everything the scanners need from one
//! authenticated session; [`Connector`] opens such sessions. The IMAP
//! implementations sit on top of `async-imap`.

use crate::config::ImapConfig;
use crate::connection::{self, ImapSession};
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::seqset::{SeqRange, UidSet};
use futures::{StreamExt, TryStreamExt};
use std::future::Future;
use tracing::{debug, warn};

/// FETCH items requested for every message.
const ENVELOPE_QUERY: &str = "(UID FLAGS ENVELOPE)";

/// One authenticated session on the mail server.
pub trait MailStore: Send {
    /// Select `folder` and return its message count.
    fn select(&mut self, folder: &str) -> impl Future<Output = Result<u32>> + Send;

    /// Fetch envelopes by sequence number, ordered by position.
    fn fetch_range(&mut self, range: SeqRange)
    -> impl Future<Output = Result<Vec<Envelope>>> + Send;

    /// Fetch envelopes by UID, ordered by position.
    fn fetch_uids(&mut self, uids: &UidSet) -> impl Future<Output = Result<Vec<Envelope>>> + Send;

    /// UIDs of every message in the selected folder not in `exclude`.
    fn search_excluding(&mut self, exclude: &UidSet)
    -> impl Future<Output = Result<UidSet>> + Send;

    /// Move one message, addressed by UID, out of the selected folder.
    fn move_message(&mut self, uid: u32, destination: &str)
    -> impl Future<Output = Result<()>> + Send;

    /// End the session. Failures are ignored.
    fn logout(self) -> impl Future<Output = ()> + Send;
}

/// Opens fresh [`MailStore`] sessions.
pub trait Connector: Send + Sync {
    type Store: MailStore;

    fn connect(&self) -> impl Future<Output = Result<Self::Store>> + Send;
}

/// [`MailStore`] backed by an IMAP session.
pub struct ImapStore {
    session: ImapSession,
    can_move: bool,
    can_uid_expunge: bool,
}

impl ImapStore {
    /// Wrap an authenticated session, probing its capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if the CAPABILITY command fails.
    pub async fn new(mut session: ImapSession) -> Result<Self> {
        let caps = session
            .capabilities()
            .await
            .map_err(|e| Error::Imap(format!("Capability failed: {e}")))?;
        let can_move = caps.has_str("MOVE");
        let can_uid_expunge = caps.has_str("UIDPLUS");
        debug!("Server capabilities: MOVE={can_move} UIDPLUS={can_uid_expunge}");
        Ok(Self {
            session,
            can_move,
            can_uid_expunge,
        })
    }

    /// List all available folders
    ///
    /// # Errors
    ///
    /// Returns an error if the LIST command fails.
    pub async fn list_folders(&mut self) -> Result<Vec<String>> {
        let mut folder_stream = self
            .session
            .list(Some(""), Some("*"))
            .await
            .map_err(|e| Error::Imap(format!("List folders failed: {e}")))?;

        let mut names = Vec::new();
        while let Some(item) = folder_stream.next().await {
            match item {
                Ok(name) => names.push(name.name().to_string()),
                Err(e) => warn!("Skipping unreadable LIST entry: {e}"),
            }
        }
        drop(folder_stream);
        Ok(names)
    }

    async fn fetch(&mut self, set: String, by_uid: bool) -> Result<Vec<Envelope>> {
        let fetches: Vec<_> = if by_uid {
            self.session
                .uid_fetch(&set, ENVELOPE_QUERY)
                .await
                .map_err(|e| Error::Imap(format!("Fetch failed: {e}")))?
                .try_collect::<Vec<_>>()
                .await
        } else {
            self.session
                .fetch(&set, ENVELOPE_QUERY)
                .await
                .map_err(|e| Error::Imap(format!("Fetch failed: {e}")))?
                .try_collect::<Vec<_>>()
                .await
        }
        .map_err(|e| Error::Imap(format!("Fetch error: {e}")))?;

        let mut envelopes: Vec<Envelope> = fetches
            .iter()
            .filter_map(|fetch| {
                let envelope = Envelope::from_fetch(fetch);
                if envelope.is_none() {
                    warn!("Ignoring FETCH response without UID (seq {})", fetch.message);
                }
                envelope
            })
            .collect();
        envelopes.sort_by_key(|e| e.seq);
        Ok(envelopes)
    }

    /// `UID COPY` + `\Deleted` + expunge, for servers without MOVE.
    async fn copy_and_delete(&mut self, uid: &str, destination: &str) -> Result<()> {
        self.session
            .uid_copy(uid, destination)
            .await
            .map_err(|e| Error::Imap(format!("Copy failed: {e}")))?;

        self.session
            .uid_store(uid, "+FLAGS.SILENT (\\Deleted)")
            .await
            .map_err(|e| Error::Imap(format!("Store failed: {e}")))?
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| Error::Imap(format!("Store error: {e}")))?;

        if self.can_uid_expunge {
            self.session
                .uid_expunge(uid)
                .await
                .map_err(|e| Error::Imap(format!("Expunge failed: {e}")))?
                .try_collect::<Vec<_>>()
                .await
                .map_err(|e| Error::Imap(format!("Expunge error: {e}")))?;
        } else {
            self.session
                .expunge()
                .await
                .map_err(|e| Error::Imap(format!("Expunge failed: {e}")))?
                .try_collect::<Vec<_>>()
                .await
                .map_err(|e| Error::Imap(format!("Expunge error: {e}")))?;
        }
        Ok(())
    }
}

impl MailStore for ImapStore {
    async fn select(&mut self, folder: &str) -> Result<u32> {
        connection::select(&mut self.session, folder).await
    }

    async fn fetch_range(&mut self, range: SeqRange) -> Result<Vec<Envelope>> {
        self.fetch(range.to_string(), false).await
    }

    async fn fetch_uids(&mut self, uids: &UidSet) -> Result<Vec<Envelope>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch(uids.to_string(), true).await
    }

    async fn search_excluding(&mut self, exclude: &UidSet) -> Result<UidSet> {
        let query = if exclude.is_empty() {
            "ALL".to_string()
        } else {
            format!("NOT UID {exclude}")
        };
        let uids = self
            .session
            .uid_search(&query)
            .await
            .map_err(|e| Error::Imap(format!("Search failed: {e}")))?;
        Ok(uids.into_iter().collect())
    }

    async fn move_message(&mut self, uid: u32, destination: &str) -> Result<()> {
        let uid_set = uid.to_string();
        let moved = if self.can_move {
            self.session
                .uid_mv(&uid_set, destination)
                .await
                .map_err(|e| Error::Imap(e.to_string()))
        } else {
            self.copy_and_delete(&uid_set, destination).await
        };
        moved.map_err(|e| Error::Relocation {
            uid,
            reason: e.to_string(),
        })
    }

    async fn logout(mut self) {
        self.session.logout().await.ok();
    }
}

/// Opens a new IMAP session per call.
#[derive(Debug, Clone)]
pub struct ImapConnector {
    config: ImapConfig,
}

impl ImapConnector {
    #[must_use]
    pub const fn new(config: ImapConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &ImapConfig {
        &self.config
    }

    /// Open a raw session, for the watchers.
    ///
    /// # Errors
    ///
    /// Returns an error if connecting or logging in fails.
    pub async fn session(&self) -> Result<ImapSession> {
        connection::connect(&self.config).await
    }
}

impl Connector for ImapConnector {
    type Store = ImapStore;

    async fn connect(&self) -> Result<ImapStore> {
        ImapStore::new(self.session().await?).await
    }
}
