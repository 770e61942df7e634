//! Fixed-capacity sliding window of temperature readings.

use std::collections::VecDeque;

use crate::{STALL_THRESHOLD, WINDOW_CAPACITY};

/// The most recent readings, oldest first.
///
/// Appending to a full window evicts the oldest reading. Nothing else ever
/// removes or reorders readings.
#[derive(Debug, Clone)]
pub struct Window {
    readings: VecDeque<f64>,
}

impl Default for Window {
    fn default() -> Self {
        Self::new()
    }
}

impl Window {
    /// Create an empty window holding up to [`WINDOW_CAPACITY`] readings.
    pub fn new() -> Self {
        Self {
            readings: VecDeque::with_capacity(WINDOW_CAPACITY),
        }
    }

    /// Record a reading and return the resulting window state.
    pub fn observe(&mut self, temperature: f64) -> WindowState {
        if self.readings.len() == WINDOW_CAPACITY {
            self.readings.pop_front();
        }
        self.readings.push_back(temperature);

        WindowState {
            len: self.readings.len(),
            capacity: WINDOW_CAPACITY,
            newest: temperature,
            // Just pushed, so never empty.
            oldest: self.readings.front().copied().unwrap_or(temperature),
        }
    }

    /// Number of readings currently held.
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Check if no reading has been observed yet.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Check if the window has warmed up.
    pub fn is_full(&self) -> bool {
        self.readings.len() == WINDOW_CAPACITY
    }

    /// Oldest reading still in the window.
    pub fn oldest(&self) -> Option<f64> {
        self.readings.front().copied()
    }

    /// Most recent reading.
    pub fn newest(&self) -> Option<f64> {
        self.readings.back().copied()
    }

    /// Iterate readings from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.readings.iter().copied()
    }
}

/// Snapshot of the window right after a reading was observed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowState {
    /// Readings held after the observation.
    pub len: usize,
    /// Window capacity.
    pub capacity: usize,
    /// The reading just observed.
    pub newest: f64,
    /// The oldest reading still held.
    pub oldest: f64,
}

impl WindowState {
    /// Check if the window was full after this observation.
    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// Temperature change across the window, rounded to one decimal place.
    ///
    /// Returns `None` while the window is still warming up.
    pub fn delta(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        Some(round_tenths(self.newest - self.oldest))
    }

    /// Check if the temperature stalled over the full window.
    ///
    /// Always `false` while warming up.
    pub fn is_stalled(&self) -> bool {
        self.delta()
            .is_some_and(|delta| delta.abs() <= STALL_THRESHOLD)
    }
}

/// Round to one decimal place, halves away from zero.
///
/// Applied to the window delta so float noise such as `-1.0999999999999943`
/// compares as `-1.1`.
pub fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(window: &mut Window, readings: &[f64]) -> WindowState {
        let mut last = None;
        for &r in readings {
            last = Some(window.observe(r));
        }
        last.expect("at least one reading")
    }

    #[test]
    fn test_warming_up_never_stalls() {
        let mut window = Window::new();
        for i in 0..(WINDOW_CAPACITY - 1) {
            let state = window.observe(70.0);
            assert_eq!(state.len, i + 1);
            assert!(!state.is_full());
            assert_eq!(state.delta(), None);
            assert!(!state.is_stalled());
        }
    }

    #[test]
    fn test_constant_readings_stall() {
        let mut window = Window::new();
        let state = feed(&mut window, &[70.0; 20]);
        assert!(state.is_full());
        assert_eq!(state.delta(), Some(0.0));
        assert!(state.is_stalled());
    }

    #[test]
    fn test_ramp_does_not_stall() {
        let mut window = Window::new();
        let ramp: Vec<f64> = (50..70).map(f64::from).collect();
        let state = feed(&mut window, &ramp);
        assert_eq!(state.delta(), Some(19.0));
        assert!(!state.is_stalled());
    }

    #[test]
    fn test_drop_just_over_threshold() {
        let mut window = Window::new();
        let mut readings = vec![100.0; 19];
        readings.push(98.9);
        let state = feed(&mut window, &readings);
        assert_eq!(state.delta(), Some(-1.1));
        assert!(!state.is_stalled());
    }

    #[test]
    fn test_drop_exactly_at_threshold() {
        let mut window = Window::new();
        let mut readings = vec![100.0; 19];
        readings.push(99.0);
        let state = feed(&mut window, &readings);
        assert_eq!(state.delta(), Some(-1.0));
        assert!(state.is_stalled());
    }

    #[test]
    fn test_rise_within_threshold_stalls() {
        let mut window = Window::new();
        let mut readings = vec![150.0; 19];
        readings.push(151.04);
        let state = feed(&mut window, &readings);
        assert_eq!(state.delta(), Some(1.0));
        assert!(state.is_stalled());
    }

    #[test]
    fn test_eviction_is_fifo() {
        let mut window = Window::new();
        // 1st reading is far away from the rest; once evicted the window is flat.
        let mut readings = vec![10.0];
        readings.extend(std::iter::repeat(80.0).take(19));
        let state = feed(&mut window, &readings);
        assert_eq!(state.oldest, 10.0);
        assert!(!state.is_stalled());

        let state = window.observe(80.5);
        assert_eq!(state.len, WINDOW_CAPACITY);
        assert_eq!(state.oldest, 80.0);
        assert_eq!(state.delta(), Some(0.5));
        assert!(state.is_stalled());
        assert!(window.iter().all(|r| r != 10.0));
    }

    #[test]
    fn test_second_oldest_becomes_oldest() {
        let mut window = Window::new();
        let readings: Vec<f64> = (1..=21).map(f64::from).collect();
        let state = feed(&mut window, &readings);
        assert_eq!(state.oldest, 2.0);
        assert_eq!(state.newest, 21.0);
        assert_eq!(window.oldest(), Some(2.0));
        assert_eq!(window.newest(), Some(21.0));
        assert_eq!(window.len(), WINDOW_CAPACITY);
    }

    #[test]
    fn test_len_never_exceeds_capacity() {
        let mut window = Window::new();
        for i in 0..100 {
            let state = window.observe(f64::from(i));
            assert!(state.len <= WINDOW_CAPACITY);
        }
        assert!(window.is_full());
    }

    #[test]
    fn test_round_tenths() {
        assert_eq!(round_tenths(98.9 - 100.0), -1.1);
        assert_eq!(round_tenths(0.04), 0.0);
        assert_eq!(round_tenths(0.05), 0.1);
        assert_eq!(round_tenths(-0.05), -0.1);
        assert_eq!(round_tenths(19.0), 19.0);
    }
}
