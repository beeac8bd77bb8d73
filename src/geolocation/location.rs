use super::provider::{Provider, ProviderStatus};
use std::time::{Duration, SystemTime};

/// How long a fix from a better ranked provider outlives fixes from a worse
/// one, per rank of difference.
pub static RANK_GRACE: Duration = Duration::from_secs(5 * 60);

#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    pub timestamp: SystemTime,
    pub provider: Provider,
    pub accuracy: f64,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Whether this fix should replace `current`.
    ///
    /// A fix wins when it is strictly more accurate, or when it is newer than
    /// `current` shifted by [`RANK_GRACE`] for every rank `current`'s provider
    /// is above (or below) this one's.
    pub fn is_better_than(&self, current: &Location) -> bool {
        let rank_delta = current.provider.rank() - self.provider.rank();
        let grace = RANK_GRACE * rank_delta.unsigned_abs();
        let deadline = if rank_delta >= 0 {
            current.timestamp.checked_add(grace)
        } else {
            current.timestamp.checked_sub(grace)
        };
        match deadline {
            Some(deadline) if self.timestamp > deadline => true,
            _ => self.accuracy < current.accuracy,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Status {
    pub timestamp: SystemTime,
    pub provider: Provider,
    pub status: ProviderStatus,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorDomain {
    Internal,
    Web,
    Http,
    Service,
}

/// A failure reported by a location source.
#[derive(Clone, Debug, PartialEq)]
pub struct Error {
    pub timestamp: SystemTime,
    pub provider: Provider,
    pub domain: ErrorDomain,
    pub code: i32,
    pub message: String,
}
