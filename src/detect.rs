//! One-shot sender report for a folder
//!
//! Groups a folder's messages by sender host and runs a few cheap
//! heuristics over the hosts. Useful for deciding what to put on the
//! exempt and block lists before running the engine.

use crate::catalog::DomainCatalog;
use crate::envelope::{Envelope, Sender};
use crate::pattern::HostPatterns;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Top-level domains not flagged by the foreign-TLD heuristic.
pub const PERMITTED_TLDS: [&str; 7] = [".com", ".us", ".gov", ".mil", ".org", ".net", ".edu"];

/// Inputs of [`DetectReport::build`].
#[derive(Debug, Clone)]
pub struct DetectSettings {
    pub folder: String,
    pub block: HostPatterns,
    pub exempt: HostPatterns,
    pub permitted_tlds: Vec<String>,
    pub keywords: Vec<String>,
    /// Emit a block list suggestion. Meaningful for the reference folder.
    pub suggest_block: bool,
}

impl DetectSettings {
    #[must_use]
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            block: HostPatterns::default(),
            exempt: HostPatterns::default(),
            permitted_tlds: PERMITTED_TLDS.iter().map(ToString::to_string).collect(),
            keywords: vec!["health".to_string()],
            suggest_block: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostCount {
    pub host: String,
    pub messages: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountCount {
    pub account: String,
    pub messages: u32,
}

/// Hosts flagged by one heuristic.
#[derive(Debug, Clone, Serialize)]
pub struct Heuristic {
    pub name: String,
    pub hosts: Vec<HostCount>,
    /// Messages from the flagged hosts.
    pub affected: u32,
}

/// A host flagged by at least one heuristic.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedHost {
    pub host: String,
    /// Number of heuristics that flagged it.
    pub hits: u32,
    pub accounts: Vec<AccountCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectReport {
    pub folder: String,
    pub generated_at: DateTime<Utc>,
    pub messages: usize,
    /// Every host, most messages first.
    pub hosts: Vec<HostCount>,
    pub heuristics: Vec<Heuristic>,
    pub planned_filter: Vec<PlannedHost>,
    /// `*@host` entries, sorted.
    pub suggested_block: Vec<String>,
}

impl DetectReport {
    #[must_use]
    pub fn build(envelopes: &[Envelope], settings: &DetectSettings) -> Self {
        let catalog: DomainCatalog = envelopes.iter().map(|e| &e.sender).collect();

        let mut hosts: Vec<HostCount> = catalog
            .sorted()
            .into_iter()
            .map(|d| HostCount {
                host: d.name.clone(),
                messages: d.total,
            })
            .collect();
        hosts.sort_by(|a, b| b.messages.cmp(&a.messages).then_with(|| a.host.cmp(&b.host)));

        let known: Vec<&HostCount> = hosts.iter().filter(|h| h.host != Sender::UNKNOWN).collect();

        let mut heuristics = vec![flag(&known, "domain blocked", |h| {
            settings.block.matches(h)
        })];
        heuristics.push(flag(&known, "domain contains 3+ dots", |h| {
            h.matches('.').count() > 2
        }));
        for keyword in &settings.keywords {
            heuristics.push(flag(&known, &format!("domain contains '{keyword}'"), |h| {
                h.contains(keyword.as_str())
            }));
        }
        heuristics.push(flag(
            &known,
            &format!("domain not in {}", settings.permitted_tlds.join(" ")),
            |h| !settings.permitted_tlds.iter().any(|tld| *tld == extension(h)),
        ));

        let mut hits: BTreeMap<&str, u32> = BTreeMap::new();
        for heuristic in &heuristics {
            for host in &heuristic.hosts {
                *hits.entry(host.host.as_str()).or_insert(0) += 1;
            }
        }
        let planned_filter = hosts
            .iter()
            .filter_map(|h| {
                let hits = *hits.get(h.host.as_str())?;
                let accounts = catalog
                    .get(&h.host)
                    .map(|d| {
                        d.sorted_accounts()
                            .into_iter()
                            .filter(|(a, _)| !a.is_empty())
                            .map(|(account, messages)| AccountCount {
                                account: account.to_string(),
                                messages,
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                Some(PlannedHost {
                    host: h.host.clone(),
                    hits,
                    accounts,
                })
            })
            .collect();

        let suggested_block = if settings.suggest_block {
            catalog
                .sorted()
                .into_iter()
                .filter(|d| d.name != Sender::UNKNOWN && !settings.exempt.matches(&d.name))
                .map(|d| format!("*@{}", d.name))
                .collect()
        } else {
            Vec::new()
        };

        Self {
            folder: settings.folder.clone(),
            generated_at: Utc::now(),
            messages: envelopes.len(),
            hosts,
            heuristics,
            planned_filter,
            suggested_block,
        }
    }
}

fn flag<F>(hosts: &[&HostCount], name: &str, hit: F) -> Heuristic
where
    F: Fn(&str) -> bool,
{
    let hosts: Vec<HostCount> = hosts
        .iter()
        .filter(|h| hit(&h.host))
        .map(|h| (*h).clone())
        .collect();
    Heuristic {
        name: name.to_string(),
        affected: hosts.iter().map(|h| h.messages).sum(),
        hosts,
    }
}

/// `.tld` of a host, lowercased, or empty when it has no dot.
fn extension(host: &str) -> String {
    host.rfind('.')
        .map(|i| host[i..].to_ascii_lowercase())
        .unwrap_or_default()
}

impl fmt::Display for DetectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "folder: {}, messages: {}\n", self.folder, self.messages)?;
        for h in &self.hosts {
            writeln!(f, "host (count={:04}): {}", h.messages, h.host)?;
        }
        writeln!(f, "\nunique domains: {}", self.hosts.len())?;

        for heuristic in &self.heuristics {
            writeln!(f, "\n{}", heuristic.name)?;
            for h in &heuristic.hosts {
                writeln!(f, "(count={:04}): {}", h.messages, h.host)?;
            }
            writeln!(
                f,
                "count: {}, affected: {}",
                heuristic.hosts.len(),
                heuristic.affected
            )?;
        }

        writeln!(f, "\nplanned filter")?;
        for p in &self.planned_filter {
            writeln!(f, "\n(hits={}): {}", p.hits, p.host)?;
            for a in &p.accounts {
                writeln!(f, "    (count={:04}) {}", a.messages, a.account)?;
            }
        }
        writeln!(f, "count: {}", self.planned_filter.len())?;

        if !self.suggested_block.is_empty() {
            writeln!(f, "\n(count={}) block list:", self.suggested_block.len())?;
            for entry in &self.suggested_block {
                writeln!(f, "{entry}")?;
            }
        }
        Ok(())
    }
}
