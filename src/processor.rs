//! Single-consumer event processor
//!
//! Owns the catalog and the target scanner. Events are handled one at
//! a time in arrival order:
//!
//! | folder    | kind            | action                       |
//! |-----------|-----------------|------------------------------|
//! | reference | any             | rebuild the catalog          |
//! | target    | MessagesAdded   | scan, classify and relocate  |
//! | target    | MessagesRemoved | refresh the recorded count   |
//!
//! Each action opens its own session and logs out afterwards.

use crate::catalog::DomainCatalog;
use crate::classifier::Classifier;
use crate::config::SieveConfig;
use crate::error::Result;
use crate::event::{Event, EventKind, EventReceiver};
use crate::folder::{FolderRole, Folders};
use crate::pattern::HostPatterns;
use crate::reference;
use crate::relocate::{self, Confirm, RelocationPolicy, RelocationReport};
use crate::store::{Connector, MailStore};
use crate::target::TargetScanner;
use tracing::{debug, info, warn};

pub struct Processor<C, P> {
    connector: C,
    confirm: P,
    folders: Folders,
    exempt: HostPatterns,
    block: HostPatterns,
    policy: RelocationPolicy,
    catalog: DomainCatalog,
    scanner: TargetScanner,
}

impl<C: Connector, P: Confirm> Processor<C, P> {
    #[must_use]
    pub fn new(connector: C, confirm: P, config: &SieveConfig) -> Self {
        Self {
            connector,
            confirm,
            folders: config.folders.clone(),
            exempt: config.exempt.clone(),
            block: config.block.clone(),
            policy: config.on_relocation_failure,
            catalog: DomainCatalog::new(),
            scanner: TargetScanner::new(config.strategy),
        }
    }

    #[must_use]
    pub const fn catalog(&self) -> &DomainCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn scanner(&self) -> &TargetScanner {
        &self.scanner
    }

    /// Initial catalog build followed by a full target pass.
    ///
    /// # Errors
    ///
    /// Unlike later rebuilds, a failure here is returned: filtering
    /// against an empty catalog would mark every message as processed.
    pub async fn prime(&mut self) -> Result<RelocationReport> {
        self.rebuild_catalog().await?;
        self.filter_target().await
    }

    /// Rebuild the catalog from the reference folder.
    ///
    /// The new catalog replaces the old one only if the whole rebuild
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns the transport error; the previous catalog stays in use.
    pub async fn rebuild_catalog(&mut self) -> Result<()> {
        let mut store = self.connector.connect().await?;
        let rebuilt = reference::rebuild(&mut store, &self.folders.reference, &self.exempt).await;
        store.logout().await;
        self.catalog = rebuilt?;
        Ok(())
    }

    /// Scan the target folder and relocate matches.
    ///
    /// # Errors
    ///
    /// Returns transport errors from the scan, and [`crate::Error::Cancelled`]
    /// if the operator quits at the prompt.
    pub async fn filter_target(&mut self) -> Result<RelocationReport> {
        let mut store = self.connector.connect().await?;
        let result = self.sift(&mut store).await;
        store.logout().await;
        result
    }

    async fn sift(&mut self, store: &mut C::Store) -> Result<RelocationReport> {
        let candidates = self.scanner.scan(store, &self.folders.target).await?;
        let classifier = Classifier::new(&self.catalog, &self.exempt, &self.block);
        let mut report = RelocationReport::default();

        for envelope in candidates {
            let decision = classifier.classify(&envelope.sender);
            if !decision.is_match() {
                debug!(uid = envelope.uid, "Keeping {} ({decision})", envelope.sender);
                self.scanner.mark_processed(envelope.uid);
                report.unmatched += 1;
                continue;
            }

            info!(
                uid = envelope.uid,
                host = %envelope.sender.host,
                account = %envelope.sender.account,
                "Match: {} ({decision})",
                envelope.subject
            );
            let outcome = relocate::relocate(
                store,
                &mut self.confirm,
                &envelope,
                &decision,
                &self.folders.destination,
            )
            .await?;
            if self.policy.settles(&outcome) {
                self.scanner.mark_processed(envelope.uid);
            } else {
                self.scanner.retry_later(envelope.uid);
            }
            report.record(envelope.uid, &outcome);
        }

        if report.matched() > 0 {
            info!(folder = %self.folders.target, "Relocation: {report}");
        }
        Ok(report)
    }

    /// Re-read the target count after removals.
    ///
    /// # Errors
    ///
    /// Returns the transport error.
    pub async fn refresh_target(&mut self) -> Result<()> {
        let mut store = self.connector.connect().await?;
        let result = self
            .scanner
            .refresh_count(&mut store, &self.folders.target)
            .await;
        store.logout().await;
        result.map(drop)
    }

    /// Perform the action for one event.
    ///
    /// # Errors
    ///
    /// Returns whatever the action returned.
    pub async fn dispatch(&mut self, event: Event) -> Result<()> {
        match (event.folder, event.kind) {
            (FolderRole::Reference, _) => self.rebuild_catalog().await,
            (FolderRole::Target, EventKind::MessagesAdded) => self.filter_target().await.map(drop),
            (FolderRole::Target, EventKind::MessagesRemoved) => self.refresh_target().await,
        }
    }

    /// Dispatch one event, logging and swallowing non-fatal errors.
    ///
    /// # Errors
    ///
    /// Returns only errors for which [`crate::Error::is_fatal`] holds.
    pub async fn process(&mut self, event: Event) -> Result<()> {
        debug!("< {event}");
        match self.dispatch(event).await {
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Handling {event} failed: {e}");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    /// Process events until the queue is closed and drained.
    ///
    /// # Errors
    ///
    /// Stops at the first fatal error.
    pub async fn run(&mut self, events: &mut EventReceiver) -> Result<()> {
        while let Some(event) = events.recv().await {
            self.process(event).await?;
        }
        Ok(())
    }
}
