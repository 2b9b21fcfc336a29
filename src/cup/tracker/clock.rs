use chrono::{FixedOffset, NaiveDateTime, Utc};

use crate::cup::tracker::error::{Result, TrackerError};

/// Source of wall-clock time in the program's fixed timezone.
pub trait Clock {
    fn local_now(&self) -> NaiveDateTime;
}

/// Reads the system clock and shifts it by a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct FixedOffsetClock {
    offset: FixedOffset,
}

impl FixedOffsetClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Builds a clock from an offset expressed in minutes east of UTC.
    pub fn from_minutes(minutes: i32) -> Result<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(Self::new)
            .ok_or_else(|| TrackerError::Validation(format!("UTC offset {minutes}m out of range")))
    }
}

impl Clock for FixedOffsetClock {
    fn local_now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.offset).naive_local()
    }
}

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn local_now(&self) -> NaiveDateTime {
        self.0
    }
}
