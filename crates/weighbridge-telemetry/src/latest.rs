//! Single-writer / multi-reader cell holding the latest weight

use std::sync::atomic::{AtomicU64, Ordering};

use weighbridge_types::WeightSample;

/// Latest weight published by the ingest task.
///
/// The value is stored as `f64` bits so reads and writes are a single atomic
/// operation with no lock.
#[derive(Debug)]
pub struct LatestWeight {
    bits: AtomicU64,
}

impl LatestWeight {
    pub fn new() -> Self {
        Self {
            bits: AtomicU64::new(0f64.to_bits()),
        }
    }

    pub fn publish(&self, sample: &WeightSample) {
        self.set(sample.value);
    }

    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}

impl Default for LatestWeight {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_starts_at_zero() {
        let cell = LatestWeight::new();
        assert!(cell.get().abs() < f64::EPSILON);
    }

    #[test]
    fn test_publish_overwrites() {
        let cell = LatestWeight::new();
        cell.publish(&WeightSample::new(12000.0));
        cell.publish(&WeightSample::new(-35.5));
        assert!((cell.get() + 35.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reader_on_other_thread() {
        let cell = Arc::new(LatestWeight::new());
        let writer = Arc::clone(&cell);
        std::thread::spawn(move || {
            for w in 1..=1000 {
                writer.set(w as f64);
            }
        })
        .join()
        .unwrap();
        assert!((cell.get() - 1000.0).abs() < f64::EPSILON);
    }
}
