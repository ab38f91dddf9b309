//! IDLE watchers
//!
//! One long-lived session per watched folder. The watcher sits in IDLE
//! and turns the server's unsolicited `EXISTS` and `EXPUNGE` responses
//! into [`Event`]s on the shared queue. IDLE is re-issued after every
//! wake-up and before the server-side keepalive limit.

use crate::connection::{self, ImapSession};
use crate::error::{Error, Result};
use crate::event::{Event, EventSender};
use crate::folder::FolderRole;
use crate::store::ImapConnector;
use async_imap::extensions::idle::{Handle, IdleResponse};
use async_imap::imap_proto::{MailboxDatum, Response};
use async_imap::types::UnsolicitedResponse;
use std::convert::Infallible;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_util::compat::Compat;
use tracing::{debug, info};

type IdleHandle = Handle<Compat<TlsStream<TcpStream>>>;

/// Turns mailbox size updates into events.
///
/// Only a count above the last known one is an arrival; every
/// `EXPUNGE` is a removal.
#[derive(Debug, Clone, Copy)]
pub struct Notifications {
    role: FolderRole,
    count: u32,
}

impl Notifications {
    #[must_use]
    pub const fn new(role: FolderRole, count: u32) -> Self {
        Self { role, count }
    }

    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    fn exists(&mut self, count: u32) -> Option<Event> {
        let grew = count > self.count;
        self.count = count;
        grew.then_some(Event::added(self.role, count))
    }

    const fn expunge(&mut self) -> Event {
        self.count = self.count.saturating_sub(1);
        Event::removed(self.role)
    }

    /// Event for a response received while idling, if any.
    pub fn observe(&mut self, response: &Response<'_>) -> Option<Event> {
        match response {
            Response::MailboxData(MailboxDatum::Exists(n)) => self.exists(*n),
            Response::Expunge(_) => Some(self.expunge()),
            _ => None,
        }
    }

    /// Event for a response buffered by the session outside IDLE.
    pub fn observe_unsolicited(&mut self, response: &UnsolicitedResponse) -> Option<Event> {
        match response {
            UnsolicitedResponse::Exists(n) => self.exists(*n),
            UnsolicitedResponse::Expunge(_) => Some(self.expunge()),
            _ => None,
        }
    }
}

struct WatchState {
    folder: String,
    notifications: Notifications,
    events: EventSender,
    timeout: Duration,
}

impl WatchState {
    fn fail(&self, reason: impl std::fmt::Display) -> Error {
        Error::Watcher {
            folder: self.folder.clone(),
            reason: reason.to_string(),
        }
    }

    fn emit(&self, event: Option<Event>) -> Result<()> {
        match event {
            Some(event) => self.events.emit(event),
            None => Ok(()),
        }
    }

    /// End the current IDLE, pick up anything the session buffered, and
    /// enter IDLE again.
    async fn reissue(&mut self, idle: IdleHandle) -> Result<IdleHandle> {
        let session = idle.done().await.map_err(|e| self.fail(e))?;
        while let Ok(response) = session.unsolicited_responses.try_recv() {
            let event = self.notifications.observe_unsolicited(&response);
            self.emit(event)?;
        }
        enter_idle(session).await.map_err(|e| self.fail(e))
    }
}

async fn enter_idle(
    session: ImapSession,
) -> std::result::Result<IdleHandle, async_imap::error::Error> {
    let mut idle = session.idle();
    idle.init().await?;
    Ok(idle)
}

/// A folder being watched with IDLE.
pub struct FolderWatcher {
    role: FolderRole,
    idle: IdleHandle,
    state: WatchState,
}

impl FolderWatcher {
    /// Connect, select `folder` and enter IDLE.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Watcher`] if any setup step fails.
    pub async fn start(
        connector: &ImapConnector,
        role: FolderRole,
        folder: &str,
        events: EventSender,
        timeout: Duration,
    ) -> Result<Self> {
        let fail = |reason: String| Error::Watcher {
            folder: folder.to_string(),
            reason,
        };
        let mut session = connector.session().await.map_err(|e| fail(e.to_string()))?;
        let count = connection::select(&mut session, folder)
            .await
            .map_err(|e| fail(e.to_string()))?;
        let idle = enter_idle(session)
            .await
            .map_err(|e| fail(format!("IDLE failed: {e}")))?;

        info!(folder, %role, count, "Watching folder");
        Ok(Self {
            role,
            idle,
            state: WatchState {
                folder: folder.to_string(),
                notifications: Notifications::new(role, count),
                events,
                timeout,
            },
        })
    }

    #[must_use]
    pub const fn role(&self) -> FolderRole {
        self.role
    }

    #[must_use]
    pub fn folder(&self) -> &str {
        &self.state.folder
    }

    /// Wait for notifications until the session or the queue fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Watcher`] when the session breaks, or the queue
    /// error when an event cannot be enqueued.
    pub async fn run(self) -> Result<Infallible> {
        let Self {
            mut idle,
            mut state,
            ..
        } = self;
        loop {
            let (wait, _interrupt) = idle.wait_with_timeout(state.timeout);
            match wait.await.map_err(|e| state.fail(e))? {
                IdleResponse::NewData(data) => {
                    let event = state.notifications.observe(data.parsed());
                    if event.is_none() {
                        debug!(folder = %state.folder, "Ignoring {:?}", data.parsed());
                    }
                    state.emit(event)?;
                }
                IdleResponse::Timeout => {
                    debug!(folder = %state.folder, "IDLE keepalive");
                }
                IdleResponse::ManualInterrupt => {
                    debug!(folder = %state.folder, "IDLE interrupted");
                }
            }
            idle = state.reissue(idle).await?;
        }
    }
}
