//! # History Module
//!
//! Bounded per-channel history and the latest-value snapshot.
//!
//! Every channel keeps exactly `capacity` values, oldest first. Appending a
//! sample evicts the oldest value of every channel, so the series length never
//! changes after construction.
//!
//! The store is shared between one writer (the ingestion pipeline) and any
//! number of readers through [`SharedHistory`]. Readers copy values out and
//! release the lock before doing anything else.
//!
//! ## Usage
//!
//! ```
//! use lora_telemetry::history::{HistoryStore, Sample};
//!
//! let mut store = HistoryStore::new(3);
//! let mut sample = Sample::zeroed();
//! sample.set("velocity", 42.0);
//! store.append(&sample);
//!
//! assert_eq!(store.latest("velocity"), 42.0);
//! assert_eq!(store.series("velocity").unwrap(), vec![0.0, 0.0, 42.0]);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::catalog::{self, Channel, CHANNEL_COUNT};
use crate::error::{Result, TelemetryError};

/// Default number of values kept per channel
pub const DEFAULT_CAPACITY: usize = 100;

/// One complete observation across all channels, in catalog order
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    values: [f64; CHANNEL_COUNT],
}

impl Default for Sample {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl Sample {
    /// Sample with every channel at zero
    #[must_use]
    pub fn zeroed() -> Self {
        Self {
            values: [0.0; CHANNEL_COUNT],
        }
    }

    /// Bind decoded values positionally to the catalog order
    ///
    /// Values beyond the channel count are ignored; channels without a value
    /// take `fill`.
    #[must_use]
    pub fn from_positional(values: &[f64], fill: f64) -> Self {
        let mut sample = Self {
            values: [fill; CHANNEL_COUNT],
        };
        for (slot, &value) in sample.values.iter_mut().zip(values) {
            *slot = value;
        }
        sample
    }

    /// Value of a channel, `None` for unknown keys
    pub fn get(&self, key: &str) -> Option<f64> {
        catalog::index_of(key).map(|i| self.values[i])
    }

    /// Set a channel value
    ///
    /// # Returns
    ///
    /// * `bool` - false if the key is not in the catalog
    pub fn set(&mut self, key: &str, value: f64) -> bool {
        match catalog::index_of(key) {
            Some(i) => {
                self.values[i] = value;
                true
            }
            None => false,
        }
    }

    /// Values in catalog order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Channels paired with their values, in catalog order
    pub fn iter(&self) -> impl Iterator<Item = (&'static Channel, f64)> + '_ {
        catalog::fields().iter().zip(self.values.iter().copied())
    }
}

/// Fixed-capacity ring buffers for every catalog channel
#[derive(Debug, Clone)]
pub struct HistoryStore {
    capacity: usize,
    series: Vec<VecDeque<f64>>,
    latest: [f64; CHANNEL_COUNT],
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl HistoryStore {
    /// Create a zero-filled store
    ///
    /// A capacity of zero is raised to one so that `latest` always mirrors the
    /// tail of the series.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            series: (0..CHANNEL_COUNT)
                .map(|_| VecDeque::from(vec![0.0; capacity]))
                .collect(),
            latest: [0.0; CHANNEL_COUNT],
        }
    }

    /// Values kept per channel
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Push one value per channel, evicting the oldest
    pub fn append(&mut self, sample: &Sample) {
        for ((buffer, latest), &value) in self
            .series
            .iter_mut()
            .zip(self.latest.iter_mut())
            .zip(sample.values.iter())
        {
            buffer.pop_front();
            buffer.push_back(value);
            *latest = value;
        }
    }

    /// Latest value of a channel, 0.0 if the key is unknown
    pub fn latest(&self, key: &str) -> f64 {
        catalog::index_of(key).map_or(0.0, |i| self.latest[i])
    }

    /// Latest values of every channel
    pub fn latest_sample(&self) -> Sample {
        Sample {
            values: self.latest,
        }
    }

    /// Copy of a channel's history, oldest first
    pub fn series(&self, key: &str) -> Option<Vec<f64>> {
        catalog::index_of(key).map(|i| self.series[i].iter().copied().collect())
    }

    /// Overwrite a channel's full history
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The key is not in the catalog (`UnknownChannel`)
    /// - `values` does not hold exactly `capacity` entries (`HistoryLength`)
    pub fn replace(&mut self, key: &str, values: &[f64]) -> Result<()> {
        let index =
            catalog::index_of(key).ok_or_else(|| TelemetryError::UnknownChannel(key.to_string()))?;

        if values.len() != self.capacity {
            return Err(TelemetryError::HistoryLength {
                expected: self.capacity,
                actual: values.len(),
            });
        }

        let buffer = &mut self.series[index];
        buffer.clear();
        buffer.extend(values.iter().copied());
        self.latest[index] = values[values.len() - 1];
        Ok(())
    }
}

/// Shared handle to the single history store
#[derive(Debug, Clone)]
pub struct SharedHistory {
    inner: Arc<RwLock<HistoryStore>>,
}

impl SharedHistory {
    #[must_use]
    pub fn new(store: HistoryStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Read access; hold only for a synchronous copy-out
    pub fn read(&self) -> RwLockReadGuard<'_, HistoryStore> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access for the single producer
    pub fn write(&self) -> RwLockWriteGuard<'_, HistoryStore> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn latest(&self, key: &str) -> f64 {
        self.read().latest(key)
    }

    pub fn latest_sample(&self) -> Sample {
        self.read().latest_sample()
    }

    pub fn series(&self, key: &str) -> Option<Vec<f64>> {
        self.read().series(key)
    }
}
