//! Domain catalog
//!
//! Maps each sender host seen in the reference folder to the accounts
//! that sent from it. The catalog is rebuilt from scratch on every
//! reference-folder scan and swapped in whole; it is never merged.

use crate::envelope::Sender;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// A sender host and the accounts observed on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Domain {
    pub name: String,
    /// Occurrences per local part.
    pub accounts: HashMap<String, u32>,
    /// Total messages from this host; always the sum of `accounts`.
    pub total: u32,
}

impl Domain {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Record one message from `account`.
    pub fn add(&mut self, account: &str) {
        self.total += 1;
        *self.accounts.entry(account.to_string()).or_insert(0) += 1;
    }

    /// Number of distinct accounts.
    #[must_use]
    pub fn distinct_accounts(&self) -> usize {
        self.accounts.len()
    }

    /// Accounts sorted by name.
    #[must_use]
    pub fn sorted_accounts(&self) -> Vec<(&str, u32)> {
        let mut accounts: Vec<_> = self
            .accounts
            .iter()
            .map(|(a, n)| (a.as_str(), *n))
            .collect();
        accounts.sort_unstable();
        accounts
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}) accounts: {}, messages: {}",
            self.name,
            self.distinct_accounts(),
            self.total
        )
    }
}

/// Host name to [`Domain`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainCatalog {
    domains: HashMap<String, Domain>,
}

impl DomainCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one message from `sender`.
    pub fn record(&mut self, sender: &Sender) {
        self.domains
            .entry(sender.host.clone())
            .or_insert_with(|| Domain::new(&sender.host))
            .add(&sender.account);
    }

    #[must_use]
    pub fn get(&self, host: &str) -> Option<&Domain> {
        self.domains.get(host)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Total messages across all hosts.
    #[must_use]
    pub fn total_messages(&self) -> u32 {
        self.domains.values().map(|d| d.total).sum()
    }

    /// Domains sorted by host name.
    #[must_use]
    pub fn sorted(&self) -> Vec<&Domain> {
        let mut domains: Vec<_> = self.domains.values().collect();
        domains.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        domains
    }
}

impl<'a> FromIterator<&'a Sender> for DomainCatalog {
    fn from_iter<I: IntoIterator<Item = &'a Sender>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for sender in iter {
            catalog.record(sender);
        }
        catalog
    }
}

impl Serialize for DomainCatalog {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.sorted())
    }
}
