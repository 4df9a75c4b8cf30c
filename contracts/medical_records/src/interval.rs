use soroban_sdk::contracttype;

/// Minimum span of a limited grant interval, in seconds.
pub const MIN_INTERVAL_SECS: u64 = 300;

/// A closed time range in ledger seconds.
///
/// `(0, 0)` is the infinite interval. Any other value must have both ends
/// non-zero; mixed values are rejected by [`Interval::is_valid`].
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Interval {
    pub from: u64,
    pub to: u64,
}

impl Interval {
    pub const INFINITE: Interval = Interval { from: 0, to: 0 };

    pub fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }

    pub fn is_infinite(&self) -> bool {
        self.from == 0 && self.to == 0
    }

    pub fn is_limited(&self) -> bool {
        self.from != 0 && self.to != 0
    }

    pub fn is_valid(&self) -> bool {
        self.is_infinite() || self.is_limited()
    }

    /// Limited intervals must be ordered and span at least [`MIN_INTERVAL_SECS`].
    pub fn has_min_duration(&self) -> bool {
        self.from < self.to && self.to - self.from >= MIN_INTERVAL_SECS
    }

    /// Infinite intervals overlap everything; limited ones overlap unless one
    /// ends at or before the other starts.
    pub fn overlaps(&self, other: &Interval) -> bool {
        if self.is_infinite() || other.is_infinite() {
            return true;
        }
        !(self.from >= other.to || self.to <= other.from)
    }

    /// Whether `other` lies entirely inside this interval.
    pub fn contains(&self, other: &Interval) -> bool {
        self.is_infinite() || (self.from <= other.from && other.to <= self.to)
    }

    /// Whether the instant `at` falls inside this interval (bounds inclusive).
    pub fn is_active_at(&self, at: u64) -> bool {
        self.is_infinite() || (self.from <= at && at <= self.to)
    }
}
