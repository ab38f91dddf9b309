//! Moving matched messages out of the target folder
//!
//! Every move addresses the message by UID. A failed move is logged and
//! reported; whether the message is retried on the next scan is decided
//! by the [`RelocationPolicy`].

use crate::classifier::Decision;
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::store::MailStore;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tracing::{info, warn};

/// What happens to a message whose move failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelocationPolicy {
    /// Leave it unprocessed so the next target scan tries again.
    #[default]
    Retry,
    /// Record it as processed and never look at it again.
    Skip,
}

impl RelocationPolicy {
    /// Whether a message with this outcome joins the processed set.
    #[must_use]
    pub const fn settles(self, outcome: &Outcome) -> bool {
        match outcome {
            Outcome::Moved | Outcome::Declined => true,
            Outcome::Failed(_) => matches!(self, Self::Skip),
        }
    }
}

impl FromStr for RelocationPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retry" => Ok(Self::Retry),
            "skip" => Ok(Self::Skip),
            other => Err(Error::Config(format!("Invalid relocation policy: {other}"))),
        }
    }
}

/// Asks whether a matched message should be moved.
pub trait Confirm: Send {
    /// `Ok(false)` declines this message; [`Error::Cancelled`] stops
    /// the engine.
    fn confirm(
        &mut self,
        envelope: &Envelope,
        decision: &Decision,
    ) -> impl Future<Output = Result<bool>> + Send;
}

/// Moves every match without asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl Confirm for AutoConfirm {
    async fn confirm(&mut self, _envelope: &Envelope, _decision: &Decision) -> Result<bool> {
        Ok(true)
    }
}

/// Interactive `MOVE:[y|n|q]` prompt.
///
/// An empty answer or `y` moves, `q` (or end of input) cancels,
/// anything else declines.
#[derive(Debug)]
pub struct TerminalPrompt<R, W> {
    reader: R,
    writer: W,
}

impl TerminalPrompt<BufReader<Stdin>, Stdout> {
    /// Prompt on the terminal.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> TerminalPrompt<R, W> {
    #[must_use]
    pub const fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl<R, W> Confirm for TerminalPrompt<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn confirm(&mut self, envelope: &Envelope, decision: &Decision) -> Result<bool> {
        let question = format!(
            "UID {} from {}: {}\n  {decision}\nMOVE:[y|n|q] ",
            envelope.uid, envelope.sender, envelope.subject
        );
        self.writer.write_all(question.as_bytes()).await?;
        self.writer.flush().await?;

        let mut answer = String::new();
        if self.reader.read_line(&mut answer).await? == 0 {
            return Err(Error::Cancelled);
        }
        match answer.trim().to_ascii_lowercase().as_str() {
            "" | "y" | "yes" => Ok(true),
            "q" | "quit" => Err(Error::Cancelled),
            _ => Ok(false),
        }
    }
}

/// Result of handling one matched message.
#[derive(Debug)]
pub enum Outcome {
    Moved,
    Declined,
    Failed(Error),
}

/// Confirm and move one matched message to `destination`.
///
/// A failed move is returned as [`Outcome::Failed`], not as an error.
///
/// # Errors
///
/// Only errors from the confirmation itself (such as
/// [`Error::Cancelled`]) are returned.
pub async fn relocate<S, C>(
    store: &mut S,
    confirm: &mut C,
    envelope: &Envelope,
    decision: &Decision,
    destination: &str,
) -> Result<Outcome>
where
    S: MailStore,
    C: Confirm,
{
    if !confirm.confirm(envelope, decision).await? {
        info!(uid = envelope.uid, "Declined move of {}", envelope.sender);
        return Ok(Outcome::Declined);
    }
    match store.move_message(envelope.uid, destination).await {
        Ok(()) => {
            info!(
                uid = envelope.uid,
                "Moved {} to {destination} ({decision})", envelope.sender
            );
            Ok(Outcome::Moved)
        }
        Err(e) => {
            warn!(uid = envelope.uid, "{e}");
            Ok(Outcome::Failed(e))
        }
    }
}

/// Per-batch tally of relocation outcomes, by UID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelocationReport {
    pub moved: Vec<u32>,
    pub declined: Vec<u32>,
    pub failed: Vec<u32>,
    /// Candidates that did not match.
    pub unmatched: usize,
}

impl RelocationReport {
    pub fn record(&mut self, uid: u32, outcome: &Outcome) {
        match outcome {
            Outcome::Moved => self.moved.push(uid),
            Outcome::Declined => self.declined.push(uid),
            Outcome::Failed(_) => self.failed.push(uid),
        }
    }

    /// Number of matched messages.
    #[must_use]
    pub fn matched(&self) -> usize {
        self.moved.len() + self.declined.len() + self.failed.len()
    }
}

impl fmt::Display for RelocationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} moved, {} declined, {} failed, {} unmatched",
            self.moved.len(),
            self.declined.len(),
            self.failed.len(),
            self.unmatched
        )
    }
}
