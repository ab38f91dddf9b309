//! Reference-folder scanning
//!
//! The reference folder (usually the spam folder) is read in full and
//! turned into a fresh [`DomainCatalog`].

use crate::catalog::DomainCatalog;
use crate::error::Result;
use crate::pattern::HostPatterns;
use crate::seqset::SeqRange;
use crate::store::MailStore;
use std::time::Instant;
use tracing::{debug, info};

/// Build a catalog from every message in `folder`.
///
/// Senders whose host is exempt are left out. The whole folder is
/// fetched before anything is returned, so a failure part-way through
/// yields no catalog at all.
///
/// # Errors
///
/// Returns an error if SELECT or FETCH fails.
pub async fn rebuild<S: MailStore>(
    store: &mut S,
    folder: &str,
    exempt: &HostPatterns,
) -> Result<DomainCatalog> {
    let started = Instant::now();
    let count = store.select(folder).await?;

    let envelopes = match SeqRange::all(count) {
        Some(range) => store.fetch_range(range).await?,
        None => Vec::new(),
    };

    let mut catalog = DomainCatalog::new();
    let mut skipped = 0;
    for envelope in &envelopes {
        if let Some(pattern) = exempt.matching(&envelope.sender.host) {
            debug!("Not learning {} (exempt by '{pattern}')", envelope.sender);
            skipped += 1;
            continue;
        }
        catalog.record(&envelope.sender);
    }

    info!(
        folder,
        messages = envelopes.len(),
        domains = catalog.len(),
        exempt = skipped,
        "Rebuilt catalog in {:?}",
        started.elapsed()
    );
    Ok(catalog)
}
