//! Shared, relinkable quote cells.
//!
//! A [`QuoteHandle`] is the single mutable cell behind an instrument's
//! quote. Calibrated curves keep a handle to every cell they were built
//! from and read through it at query time, so a quote set in place is
//! seen by those curves without any invalidation message.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Reference-counted mutable quote cell.
///
/// Cloning a handle shares the cell. Use [`QuoteHandle::new`] to get an
/// independent cell.
#[derive(Clone)]
pub struct QuoteHandle(Arc<AtomicU64>);

impl QuoteHandle {
    /// Creates a new cell holding `value`.
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(Arc::new(AtomicU64::new(value.to_bits())))
    }

    /// Current value of the cell.
    #[must_use]
    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    /// Overwrites the value, visible to every holder of this cell.
    pub fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }

    /// Returns true if both handles point at the same cell.
    #[must_use]
    pub fn same_cell(&self, other: &QuoteHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for QuoteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("QuoteHandle").field(&self.get()).finish()
    }
}

impl Serialize for QuoteHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.get())
    }
}

impl<'de> Deserialize<'de> for QuoteHandle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(QuoteHandle::new)
    }
}
