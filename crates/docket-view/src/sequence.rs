//! Request sequencing
//!
//! Every reload is stamped from a monotonically increasing counter. When a
//! reload resolves, its result is applied only if no later reload has been
//! issued since (last request wins).

use parking_lot::RwLock;
use std::fmt::{self, Display, Formatter};

/// Stamp identifying one reload
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestStamp(u64);

impl RequestStamp {
    /// Raw sequence number
    #[inline]
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl Display for RequestStamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues stamps and answers "is this still the latest?"
#[derive(Debug, Default)]
pub struct RequestSequence {
    latest: RwLock<u64>,
}

impl RequestSequence {
    /// Create sequence with nothing issued
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next stamp; it supersedes every earlier one
    pub fn issue(&self) -> RequestStamp {
        let mut latest = self.latest.write();
        *latest += 1;
        RequestStamp(*latest)
    }

    /// Most recently issued stamp, if any
    #[must_use]
    pub fn latest(&self) -> Option<RequestStamp> {
        let latest = *self.latest.read();
        (latest > 0).then_some(RequestStamp(latest))
    }

    /// Whether no later stamp has been issued
    #[inline]
    #[must_use]
    pub fn is_latest(&self, stamp: RequestStamp) -> bool {
        *self.latest.read() == stamp.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_stamp_supersedes_earlier() {
        let sequence = RequestSequence::new();
        assert_eq!(sequence.latest(), None);

        let first = sequence.issue();
        assert!(sequence.is_latest(first));

        let second = sequence.issue();
        assert!(second > first);
        assert!(!sequence.is_latest(first));
        assert!(sequence.is_latest(second));
        assert_eq!(sequence.latest(), Some(second));
    }

    #[test]
    fn stamp_display() {
        let sequence = RequestSequence::new();
        sequence.issue();
        assert_eq!(sequence.issue().to_string(), "#2");
    }
}
