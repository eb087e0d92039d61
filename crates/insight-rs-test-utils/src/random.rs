use insight_rs_core::RandomSource;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Random source that replays scripted draws per key.
///
/// Once a key's script runs out, `index` returns 0, `range` returns the low
/// bound, and `unit` returns 0.5.
#[derive(Default)]
pub struct ScriptedRandom {
    picks: Mutex<HashMap<String, VecDeque<usize>>>,
    ranges: Mutex<HashMap<String, VecDeque<u64>>>,
}

impl ScriptedRandom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script raw indices for `key`.
    pub fn with_picks(self, key: &str, indices: impl IntoIterator<Item = usize>) -> Self {
        self.picks
            .lock()
            .entry(key.to_string())
            .or_default()
            .extend(indices);
        self
    }

    /// Script picks for `key` by value, resolved against `options`.
    ///
    /// Panics if a value is not one of `options`.
    pub fn with_labels<T: PartialEq + std::fmt::Debug>(
        self,
        key: &str,
        options: &[T],
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        let indices: Vec<usize> = values
            .into_iter()
            .map(|value| {
                options
                    .iter()
                    .position(|option| *option == value)
                    .unwrap_or_else(|| panic!("{value:?} is not an option for {key}"))
            })
            .collect();
        self.with_picks(key, indices)
    }

    /// Script integer draws for `key`.
    pub fn with_ranges(self, key: &str, values: impl IntoIterator<Item = u64>) -> Self {
        self.ranges
            .lock()
            .entry(key.to_string())
            .or_default()
            .extend(values);
        self
    }
}

impl RandomSource for ScriptedRandom {
    fn index(&self, key: &str, len: usize) -> usize {
        self.picks
            .lock()
            .get_mut(key)
            .and_then(VecDeque::pop_front)
            .unwrap_or(0)
            .min(len.saturating_sub(1))
    }

    fn range(&self, key: &str, low: u64, _high: u64) -> u64 {
        self.ranges
            .lock()
            .get_mut(key)
            .and_then(VecDeque::pop_front)
            .unwrap_or(low)
    }

    fn unit(&self, _key: &str) -> f64 {
        0.5
    }
}
