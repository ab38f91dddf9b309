//! Number-set rendering
//!
//! IMAP addresses messages either by sequence number (`1:5`) or by
//! UID set (`3,7:9`). Sequence ranges are positional and shift when
//! messages are expunged; UID sets are stable.

use std::collections::BTreeSet;
use std::fmt;

/// An inclusive range of message sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqRange {
    pub start: u32,
    pub end: u32,
}

impl SeqRange {
    /// The range `start..=end`, or `None` when it is empty.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Option<Self> {
        if start == 0 || start > end {
            None
        } else {
            Some(Self { start, end })
        }
    }

    /// Every message of a folder holding `count` messages.
    #[must_use]
    pub const fn all(count: u32) -> Option<Self> {
        Self::new(1, count)
    }

    /// Number of sequence numbers covered.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.end - self.start + 1
    }

    #[must_use]
    pub const fn contains(&self, seq: u32) -> bool {
        seq >= self.start && seq <= self.end
    }
}

impl fmt::Display for SeqRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

/// A set of UIDs, rendered as compressed runs.
///
/// # Examples
///
/// ```
/// use mailsieve::UidSet;
///
/// let set: UidSet = [9, 1, 2, 3, 7, 10].into_iter().collect();
/// assert_eq!(set.to_string(), "1:3,7,9:10");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UidSet {
    uids: BTreeSet<u32>,
}

impl UidSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a UID. Returns `false` if it was already present.
    pub fn insert(&mut self, uid: u32) -> bool {
        self.uids.insert(uid)
    }

    #[must_use]
    pub fn contains(&self, uid: u32) -> bool {
        self.uids.contains(&uid)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.uids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uids.is_empty()
    }

    /// UIDs in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.uids.iter().copied()
    }

    /// Contiguous runs as `(first, last)` pairs.
    fn runs(&self) -> Vec<(u32, u32)> {
        let mut runs: Vec<(u32, u32)> = Vec::new();
        for uid in self.iter() {
            match runs.last_mut() {
                Some((_, last)) if last.checked_add(1) == Some(uid) => *last = uid,
                _ => runs.push((uid, uid)),
            }
        }
        runs
    }
}

impl FromIterator<u32> for UidSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self {
            uids: iter.into_iter().collect(),
        }
    }
}

impl Extend<u32> for UidSet {
    fn extend<I: IntoIterator<Item = u32>>(&mut self, iter: I) {
        self.uids.extend(iter);
    }
}

impl fmt::Display for UidSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (first, last)) in self.runs().into_iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if first == last {
                write!(f, "{first}")?;
            } else {
                write!(f, "{first}:{last}")?;
            }
        }
        Ok(())
    }
}
