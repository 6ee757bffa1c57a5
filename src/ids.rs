//! Sequential record identifiers.
//!
//! Each record category owns its own [`IdAllocator`]. Counters start at 0 and
//! are pre-incremented, so the first ID handed out is 1. IDs are never reused.

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

macro_rules! sequential_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw counter value.
            #[must_use]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Returns the raw counter value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

sequential_id!(
    /// Identifier of a temporal event token.
    EventTokenId
);

sequential_id!(
    /// Identifier of a temporal anomaly.
    AnomalyId
);

sequential_id!(
    /// Identifier of a causal simulation.
    SimulationId
);

/// Monotonic, gap-free ID source for one record category.
#[derive(Debug, Clone)]
pub struct IdAllocator<T> {
    last: u64,
    _category: PhantomData<T>,
}

impl<T: From<u64>> IdAllocator<T> {
    /// Creates an allocator that has not issued any ID yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: 0,
            _category: PhantomData,
        }
    }

    /// Issues the next ID.
    ///
    /// Callers must run every validation before calling this so that a
    /// rejected transition never leaves a gap in the sequence.
    pub fn next_id(&mut self) -> T {
        self.last += 1;
        T::from(self.last)
    }

    /// The most recently issued raw value, or 0 if nothing was issued.
    #[must_use]
    pub const fn last_issued(&self) -> u64 {
        self.last
    }
}

impl<T: From<u64>> Default for IdAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}
