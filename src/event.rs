//! Folder events and the bounded queue carrying them
//!
//! Watchers are the producers, the processor is the only consumer.
//! Producers never wait: a full queue is reported as
//! [`Error::QueueFull`], which stops the engine.

use crate::error::{Error, Result};
use crate::folder::FolderRole;
use std::fmt;
use tokio::sync::mpsc;
use tracing::debug;

/// What changed in a watched folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    MessagesAdded,
    MessagesRemoved,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MessagesAdded => "MessagesAdded",
            Self::MessagesRemoved => "MessagesRemoved",
        })
    }
}

/// A change notification from one watched folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub folder: FolderRole,
    pub kind: EventKind,
    /// Message count reported by the server, when known.
    pub observed_count: Option<u32>,
}

impl Event {
    #[must_use]
    pub const fn added(folder: FolderRole, count: u32) -> Self {
        Self {
            folder,
            kind: EventKind::MessagesAdded,
            observed_count: Some(count),
        }
    }

    #[must_use]
    pub const fn removed(folder: FolderRole) -> Self {
        Self {
            folder,
            kind: EventKind::MessagesRemoved,
            observed_count: None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.folder, self.kind)?;
        if let Some(count) = self.observed_count {
            write!(f, " (count={count})")?;
        }
        Ok(())
    }
}

/// Create a queue holding at most `capacity` pending events.
///
/// # Panics
///
/// Panics if `capacity` is zero.
#[must_use]
pub fn queue(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender { tx, capacity }, EventReceiver { rx })
}

/// Producer side of the event queue.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<Event>,
    capacity: usize,
}

impl EventSender {
    /// Enqueue without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueFull`] if the queue is at capacity and
    /// [`Error::QueueClosed`] if the consumer has gone away.
    pub fn emit(&self, event: Event) -> Result<()> {
        debug!("> {event}");
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => Error::QueueFull {
                capacity: self.capacity,
            },
            mpsc::error::TrySendError::Closed(_) => Error::QueueClosed,
        })
    }

    /// # Errors
    ///
    /// Same as [`EventSender::emit`].
    pub fn added(&self, folder: FolderRole, count: u32) -> Result<()> {
        self.emit(Event::added(folder, count))
    }

    /// # Errors
    ///
    /// Same as [`EventSender::emit`].
    pub fn removed(&self, folder: FolderRole) -> Result<()> {
        self.emit(Event::removed(folder))
    }
}

/// Consumer side of the event queue.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<Event>,
}

impl EventReceiver {
    /// Next event in arrival order; `None` once the queue is closed and
    /// drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Stop accepting events. Already queued events can still be
    /// received.
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Number of events waiting.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}
