//! Spam classification
//!
//! A message matches when its sender host is in the catalog and either
//! the host has only one known account and the message comes from that
//! account, or the host has two or more distinct known accounts (the
//! whole host is then treated as hostile). Hosts on the block list
//! always match; hosts on the exempt list never do.

use crate::catalog::DomainCatalog;
use crate::envelope::Sender;
use crate::pattern::HostPatterns;
use std::fmt;

/// Outcome of classifying one sender, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The message has no usable sender.
    Anonymous,
    /// The host is on the exempt list.
    Exempt { pattern: String },
    /// The host is not in the catalog.
    UnknownHost,
    /// The host has a single known account and this is not it.
    OtherAccount { known: String },
    /// The host has a single known account and this is it.
    KnownAccount { account: String },
    /// The host has several known accounts.
    CompromisedHost { accounts: usize },
    /// The host is on the block list.
    Blocked { pattern: String },
}

impl Decision {
    #[must_use]
    pub const fn is_match(&self) -> bool {
        matches!(
            self,
            Self::KnownAccount { .. } | Self::CompromisedHost { .. } | Self::Blocked { .. }
        )
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("no sender"),
            Self::Exempt { pattern } => write!(f, "exempt by '{pattern}'"),
            Self::UnknownHost => f.write_str("host not in catalog"),
            Self::OtherAccount { known } => {
                write!(f, "host has a single known account '{known}'")
            }
            Self::KnownAccount { account } => {
                write!(f, "account '{account}' is the host's only known account")
            }
            Self::CompromisedHost { accounts } => {
                write!(f, "host has {accounts} known accounts")
            }
            Self::Blocked { pattern } => write!(f, "blocked by '{pattern}'"),
        }
    }
}

/// Catalog rule alone: does `account@host` match?
#[must_use]
pub fn matches(catalog: &DomainCatalog, host: &str, account: &str) -> bool {
    catalog_decision(catalog, host, account).is_match()
}

fn catalog_decision(catalog: &DomainCatalog, host: &str, account: &str) -> Decision {
    let Some(domain) = catalog.get(host) else {
        return Decision::UnknownHost;
    };
    if domain.total == 0 {
        return Decision::UnknownHost;
    }
    match domain.distinct_accounts() {
        0 => Decision::UnknownHost,
        1 => {
            let known = domain.accounts.keys().next().cloned().unwrap_or_default();
            if known == account {
                Decision::KnownAccount { account: known }
            } else {
                Decision::OtherAccount { known }
            }
        }
        n => Decision::CompromisedHost { accounts: n },
    }
}

/// Classifier over a catalog plus exempt and block lists.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    catalog: &'a DomainCatalog,
    exempt: &'a HostPatterns,
    block: &'a HostPatterns,
}

impl<'a> Classifier<'a> {
    #[must_use]
    pub const fn new(
        catalog: &'a DomainCatalog,
        exempt: &'a HostPatterns,
        block: &'a HostPatterns,
    ) -> Self {
        Self {
            catalog,
            exempt,
            block,
        }
    }

    #[must_use]
    pub fn classify(&self, sender: &Sender) -> Decision {
        if sender.is_unknown() {
            return Decision::Anonymous;
        }
        if let Some(pattern) = self.exempt.matching(&sender.host) {
            return Decision::Exempt {
                pattern: pattern.to_string(),
            };
        }
        if let Some(pattern) = self.block.matching(&sender.host) {
            return Decision::Blocked {
                pattern: pattern.to_string(),
            };
        }
        catalog_decision(self.catalog, &sender.host, &sender.account)
    }
}
