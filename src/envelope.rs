//! Message envelopes
//!
//! Only envelope metadata is ever fetched: the sender address split
//! into host and account, the subject, and the message's UID and
//! sequence number.

use async_imap::imap_proto::{Address, Envelope as ImapEnvelope};
use async_imap::types::Fetch;
use std::borrow::Cow;
use std::fmt;

/// Sender of a message, split at the `@`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sender {
    /// Local part of the address.
    pub account: String,
    /// Host part of the address, lowercased.
    pub host: String,
}

impl Sender {
    /// Placeholder used for both parts when a message has no sender.
    pub const UNKNOWN: &'static str = "unknown";

    #[must_use]
    pub fn new(account: impl Into<String>, host: impl AsRef<str>) -> Self {
        Self {
            account: account.into(),
            host: host.as_ref().to_ascii_lowercase(),
        }
    }

    #[must_use]
    pub fn unknown() -> Self {
        Self::new(Self::UNKNOWN, Self::UNKNOWN)
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.host == Self::UNKNOWN && self.account == Self::UNKNOWN
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.account, self.host)
    }
}

/// Envelope metadata of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Stable identifier within the folder.
    pub uid: u32,
    /// Position in the folder at fetch time.
    pub seq: u32,
    pub sender: Sender,
    pub subject: String,
}

impl Envelope {
    /// Build an envelope from a FETCH response.
    ///
    /// Returns `None` if the server did not include a UID, since a
    /// message that cannot be addressed by UID cannot be tracked or
    /// moved safely.
    #[must_use]
    pub fn from_fetch(fetch: &Fetch) -> Option<Self> {
        let uid = fetch.uid?;
        let (sender, subject) = fetch.envelope().map_or_else(
            || (Sender::unknown(), String::new()),
            |env| (sender_of(env), decode(env.subject.as_ref())),
        );
        Some(Self {
            uid,
            seq: fetch.message,
            sender,
            subject,
        })
    }
}

/// Host from the `Sender` address (falling back to `From`), account
/// from the first `From` address (falling back to `Sender`).
fn sender_of(env: &ImapEnvelope<'_>) -> Sender {
    let sender = first(env.sender.as_deref()).or_else(|| first(env.from.as_deref()));
    let from = first(env.from.as_deref()).or(sender);

    let host = sender.and_then(|a| a.host.as_ref());
    let account = from.and_then(|a| a.mailbox.as_ref());

    match (account, host) {
        (Some(account), Some(host)) => Sender::new(decode(Some(account)), decode(Some(host))),
        _ => Sender::unknown(),
    }
}

fn first<'a, 'b>(addrs: Option<&'b [Address<'a>]>) -> Option<&'b Address<'a>> {
    addrs.and_then(<[Address<'a>]>::first)
}

fn decode(bytes: Option<&Cow<'_, [u8]>>) -> String {
    bytes
        .map(|b| String::from_utf8_lossy(b).into_owned())
        .unwrap_or_default()
}
