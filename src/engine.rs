//! Engine wiring: two watchers feeding one processor.

use crate::config::{ImapConfig, SieveConfig};
use crate::error::{Error, Result};
use crate::event::{self, EventReceiver};
use crate::folder::FolderRole;
use crate::processor::Processor;
use crate::relocate::Confirm;
use crate::store::ImapConnector;
use crate::watcher::FolderWatcher;
use std::future::Future;
use tokio::task::JoinSet;
use tracing::{error, info};

/// A started engine, ready to [`run`](Engine::run).
pub struct Engine<P> {
    processor: Processor<ImapConnector, P>,
    events: EventReceiver,
    watchers: JoinSet<Result<std::convert::Infallible>>,
}

impl<P: Confirm> Engine<P> {
    /// Start both watchers, then build the catalog and filter the
    /// target folder once.
    ///
    /// The watchers are in IDLE before the first scan, so nothing that
    /// arrives during priming is missed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Watcher`] if either watcher cannot be set up,
    /// or the error of the initial rebuild or scan.
    pub async fn start(imap: ImapConfig, sieve: SieveConfig, confirm: P) -> Result<Self> {
        let connector = ImapConnector::new(imap);
        let (sender, events) = event::queue(sieve.queue_capacity);

        let mut watchers = JoinSet::new();
        for role in [FolderRole::Reference, FolderRole::Target] {
            let watcher = FolderWatcher::start(
                &connector,
                role,
                sieve.folders.name(role),
                sender.clone(),
                sieve.idle_timeout,
            )
            .await?;
            watchers.spawn(watcher.run());
        }
        drop(sender);

        let mut processor = Processor::new(connector, confirm, &sieve);
        let report = processor.prime().await?;
        info!(
            domains = processor.catalog().len(),
            "Engine started: {report}"
        );

        Ok(Self {
            processor,
            events,
            watchers,
        })
    }

    #[must_use]
    pub const fn processor(&self) -> &Processor<ImapConnector, P> {
        &self.processor
    }

    /// Process events until `shutdown` resolves or a fatal error
    /// occurs.
    ///
    /// On shutdown the watchers are stopped and events already queued
    /// are still processed.
    ///
    /// # Errors
    ///
    /// Returns the fatal error that stopped the engine.
    pub async fn run<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut shutdown = std::pin::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("Shutting down");
                    break;
                }
                Some(joined) = self.watchers.join_next() => {
                    let err = match joined {
                        Ok(Ok(never)) => match never {},
                        Ok(Err(e)) => e,
                        Err(e) => Error::Watcher {
                            folder: "unknown".into(),
                            reason: e.to_string(),
                        },
                    };
                    error!("{err}");
                    self.watchers.abort_all();
                    return Err(err);
                }
                event = self.events.recv() => match event {
                    Some(event) => {
                        if let Err(e) = self.processor.process(event).await {
                            error!("{e}");
                            self.watchers.abort_all();
                            return Err(e);
                        }
                    }
                    None => break,
                },
            }
        }

        self.watchers.abort_all();
        self.events.close();
        let pending = self.events.pending();
        if pending > 0 {
            info!("Draining {pending} pending events");
        }
        self.processor.run(&mut self.events).await
    }
}
