// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bounded storage for rolling metric histories.

/// A fixed-capacity circular buffer of samples.
///
/// Once full, every push overwrites the oldest sample.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: Vec<f32>,
    capacity: usize,
    index: usize,
    count: usize,
}

impl RingBuffer {
    /// Creates a new, empty ring buffer. A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: vec![0.0; capacity],
            capacity,
            index: 0,
            count: 0,
        }
    }

    /// Pushes a new value into the buffer, overwriting the oldest if full.
    pub fn push(&mut self, value: f32) {
        self.data[self.index] = value;
        self.index = (self.index + 1) % self.capacity;
        if self.count < self.capacity {
            self.count += 1;
        }
    }

    /// Returns the number of elements currently in the buffer.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns the maximum number of elements the buffer holds.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns an iterator over the values in chronological order (oldest to newest).
    pub fn iter(&self) -> impl Iterator<Item = &f32> {
        let (left, right) = self.data.split_at(self.index);
        if self.count < self.capacity {
            // Not full yet: valid values are exactly `[0, index)`.
            right[right.len()..].iter().chain(left.iter())
        } else {
            right.iter().chain(left.iter())
        }
    }

    /// Returns the most recent value.
    pub fn latest(&self) -> Option<f32> {
        if self.count == 0 {
            return None;
        }
        let idx = (self.index + self.capacity - 1) % self.capacity;
        Some(self.data[idx])
    }

    /// Returns the values oldest-first as a vector.
    pub fn to_vec(&self) -> Vec<f32> {
        self.iter().copied().collect()
    }

    /// Calculates the arithmetic mean of the values in the buffer.
    pub fn average(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        self.iter().sum::<f32>() / self.count as f32
    }

    /// Returns the minimum value in the buffer, or 0.0 if empty.
    pub fn min(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        self.iter().copied().fold(f32::MAX, f32::min)
    }

    /// Returns the maximum value in the buffer, or 0.0 if empty.
    pub fn max(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        self.iter().copied().fold(f32::MIN, f32::max)
    }

    /// Clears every sample.
    pub fn clear(&mut self) {
        self.index = 0;
        self.count = 0;
    }
}

/// Relative change between the mean of the most recent `window` samples and
/// the mean of the `window` samples right before them.
///
/// Returns `None` until `2 * window` samples are available or when the older
/// window averages to zero. Positive means rising.
pub fn window_change(history: &[f32], window: usize) -> Option<f32> {
    if window == 0 || history.len() < window * 2 {
        return None;
    }
    let recent = &history[history.len() - window..];
    let prior = &history[history.len() - window * 2..history.len() - window];

    let recent_avg = recent.iter().sum::<f32>() / window as f32;
    let prior_avg = prior.iter().sum::<f32>() / window as f32;
    if prior_avg.abs() < f32::EPSILON {
        return None;
    }
    Some((recent_avg - prior_avg) / prior_avg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_push_and_iter() {
        let mut rb = RingBuffer::new(3);
        rb.push(1.0);
        rb.push(2.0);
        rb.push(3.0);
        rb.push(4.0); // Overwrites 1.0

        assert_eq!(rb.to_vec(), vec![2.0, 3.0, 4.0]);
        assert_eq!(rb.count(), 3);
        assert_eq!(rb.latest(), Some(4.0));
    }

    #[test]
    fn test_ring_buffer_partial_fill_order() {
        let mut rb = RingBuffer::new(4);
        rb.push(5.0);
        rb.push(6.0);
        assert_eq!(rb.to_vec(), vec![5.0, 6.0]);
    }

    #[test]
    fn test_ring_buffer_average() {
        let mut rb = RingBuffer::new(4);
        rb.push(10.0);
        rb.push(20.0);
        assert_eq!(rb.average(), 15.0);
    }

    #[test]
    fn test_ring_buffer_min_max() {
        let mut rb = RingBuffer::new(4);
        rb.push(3.0);
        rb.push(1.0);
        rb.push(4.0);
        rb.push(1.5);
        assert_eq!(rb.min(), 1.0);
        assert_eq!(rb.max(), 4.0);
    }

    #[test]
    fn test_ring_buffer_never_exceeds_capacity() {
        let mut rb = RingBuffer::new(60);
        for i in 0..500 {
            rb.push(i as f32);
        }
        assert_eq!(rb.count(), 60);
        assert_eq!(rb.to_vec().first().copied(), Some(440.0));
    }

    #[test]
    fn test_ring_buffer_empty() {
        let rb = RingBuffer::new(4);
        assert_eq!(rb.average(), 0.0);
        assert_eq!(rb.count(), 0);
        assert_eq!(rb.latest(), None);
    }

    #[test]
    fn test_window_change_detects_decline() {
        let history = [60.0, 60.0, 60.0, 50.0, 50.0, 50.0];
        let change = window_change(&history, 3).unwrap();
        assert!((change + 1.0 / 6.0).abs() < 0.001);
    }

    #[test]
    fn test_window_change_needs_two_windows() {
        assert_eq!(window_change(&[1.0, 2.0, 3.0], 2), None);
        assert_eq!(window_change(&[0.0, 0.0, 1.0, 1.0], 2), None);
    }
}
