//! Listener priorities
//!
//! Higher priorities run earlier. The conventional range is -999..=999;
//! `FIRST` and `LAST` sit outside it for handlers that must bracket
//! everything else.

use std::cell::Cell;
use std::fmt;

/// Sort key of a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub i32);

impl Priority {
    /// Priority used when none is given
    pub const DEFAULT: Priority = Priority(99);
    /// Runs before every other priority
    pub const FIRST: Priority = Priority(i32::MAX);
    /// Runs after every other priority
    pub const LAST: Priority = Priority(i32::MIN);
    /// Upper end of the conventional range
    pub const MAX_CONVENTIONAL: Priority = Priority(999);
    /// Lower end of the conventional range
    pub const MIN_CONVENTIONAL: Priority = Priority(-999);

    /// Raw value
    #[inline]
    pub fn value(self) -> i32 {
        self.0
    }

    /// Check if the value lies in -999..=999
    pub fn is_conventional(self) -> bool {
        (Self::MIN_CONVENTIONAL..=Self::MAX_CONVENTIONAL).contains(&self)
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Priority(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::FIRST => f.write_str("first"),
            Self::LAST => f.write_str("last"),
            Priority(v) => write!(f, "{}", v),
        }
    }
}

/// Per-dispatcher cursors handing out ever-later "first" and ever-earlier
/// "last" priorities.
///
/// `first()` yields 999, 998, ... and `last()` yields -999, -998, ..., so
/// each call queues behind the previous `first()` caller, or ahead of the
/// previous `last()` caller.
#[derive(Debug)]
pub struct PriorityIndexes {
    first: Cell<i32>,
    last: Cell<i32>,
}

impl PriorityIndexes {
    pub fn new() -> Self {
        Self {
            first: Cell::new(Priority::MAX_CONVENTIONAL.0),
            last: Cell::new(Priority::MIN_CONVENTIONAL.0),
        }
    }

    /// Take the next "first" index
    pub fn first(&self) -> Priority {
        let value = self.first.get();
        self.first.set(value.saturating_sub(1));
        Priority(value)
    }

    /// Take the next "last" index
    pub fn last(&self) -> Priority {
        let value = self.last.get();
        self.last.set(value.saturating_add(1));
        Priority(value)
    }
}

impl Default for PriorityIndexes {
    fn default() -> Self {
        Self::new()
    }
}
