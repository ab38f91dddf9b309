//! Incremental target-folder scanning
//!
//! Each scan returns only the messages that still need classifying,
//! newest first. Two strategies are available:
//!
//! - [`ScanStrategy::ExclusionSet`] asks the server for every UID not
//!   in the [`ProcessedSet`]. Robust against expunges and moves.
//! - [`ScanStrategy::Cursor`] fetches positions after the last
//!   recorded count. Cheaper, but a removal followed by an arrival
//!   before the count is refreshed hides the new message. UIDs handed
//!   to [`TargetScanner::retry_later`] are fetched again by UID, since
//!   their positions lie behind the cursor.

use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::seqset::{SeqRange, UidSet};
use crate::store::MailStore;
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, info};

/// How the target folder is diffed against what was already seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanStrategy {
    #[default]
    ExclusionSet,
    Cursor,
}

impl fmt::Display for ScanStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ExclusionSet => "exclusion",
            Self::Cursor => "cursor",
        })
    }
}

impl FromStr for ScanStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exclusion" | "exclusion-set" => Ok(Self::ExclusionSet),
            "cursor" => Ok(Self::Cursor),
            other => Err(Error::Config(format!("Invalid scan strategy: {other}"))),
        }
    }
}

/// UIDs already evaluated in the target folder. Only ever grows.
#[derive(Debug, Clone, Default)]
pub struct ProcessedSet {
    uids: UidSet,
}

impl ProcessedSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if `uid` was already recorded.
    pub fn insert(&mut self, uid: u32) -> bool {
        self.uids.insert(uid)
    }

    #[must_use]
    pub fn contains(&self, uid: u32) -> bool {
        self.uids.contains(uid)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.uids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uids.is_empty()
    }

    #[must_use]
    pub const fn uids(&self) -> &UidSet {
        &self.uids
    }
}

/// Scanner state for the target folder.
#[derive(Debug, Clone, Default)]
pub struct TargetScanner {
    strategy: ScanStrategy,
    processed: ProcessedSet,
    retry: UidSet,
    last_count: Option<u32>,
}

impl TargetScanner {
    #[must_use]
    pub fn new(strategy: ScanStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn strategy(&self) -> ScanStrategy {
        self.strategy
    }

    #[must_use]
    pub const fn processed(&self) -> &ProcessedSet {
        &self.processed
    }

    /// Message count recorded by the last scan or refresh.
    #[must_use]
    pub const fn last_count(&self) -> Option<u32> {
        self.last_count
    }

    /// Record `uid` as evaluated so later scans skip it.
    pub fn mark_processed(&mut self, uid: u32) -> bool {
        self.processed.insert(uid)
    }

    /// Offer `uid` again on the next scan without recording it as
    /// processed.
    pub fn retry_later(&mut self, uid: u32) {
        self.retry.insert(uid);
    }

    /// UIDs waiting to be offered again.
    #[must_use]
    pub const fn pending_retries(&self) -> &UidSet {
        &self.retry
    }

    /// Fetch the messages of `folder` that have not been processed,
    /// newest first.
    ///
    /// The recorded count and the retry set change only when the scan
    /// succeeds. Every retried UID still present is returned once; the
    /// caller re-queues it with [`retry_later`](Self::retry_later) if it
    /// fails again.
    ///
    /// # Errors
    ///
    /// Returns an error if SELECT, SEARCH or FETCH fails.
    pub async fn scan<S: MailStore>(
        &mut self,
        store: &mut S,
        folder: &str,
    ) -> Result<Vec<Envelope>> {
        let started = Instant::now();
        let count = store.select(folder).await?;

        let mut envelopes = match self.strategy {
            ScanStrategy::ExclusionSet => {
                let uids = store.search_excluding(self.processed.uids()).await?;
                debug!("{} unprocessed UIDs in {folder}", uids.len());
                store.fetch_uids(&uids).await?
            }
            ScanStrategy::Cursor => {
                let start = self.last_count.unwrap_or(0).min(count) + 1;
                let mut tail = match SeqRange::new(start, count) {
                    Some(range) => {
                        debug!("Fetching {folder} positions {range}");
                        store.fetch_range(range).await?
                    }
                    None => Vec::new(),
                };
                if !self.retry.is_empty() {
                    debug!("Fetching {folder} retries {}", self.retry);
                    let retried = store.fetch_uids(&self.retry).await?;
                    let seen: UidSet = tail.iter().map(|e| e.uid).collect();
                    tail.extend(retried.into_iter().filter(|e| !seen.contains(e.uid)));
                }
                tail
            }
        };
        envelopes.retain(|e| !self.processed.contains(e.uid));
        envelopes.sort_by_key(|e| Reverse(e.uid));
        self.retry = UidSet::new();
        self.last_count = Some(count);

        info!(
            folder,
            strategy = %self.strategy,
            count,
            candidates = envelopes.len(),
            "Scanned target in {:?}",
            started.elapsed()
        );
        Ok(envelopes)
    }

    /// Re-read the message count of `folder` without fetching anything.
    ///
    /// # Errors
    ///
    /// Returns an error if SELECT fails.
    pub async fn refresh_count<S: MailStore>(
        &mut self,
        store: &mut S,
        folder: &str,
    ) -> Result<u32> {
        let count = store.select(folder).await?;
        debug!("{folder} now holds {count} messages");
        self.last_count = Some(count);
        Ok(count)
    }
}
