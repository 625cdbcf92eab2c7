//! Fixed-capacity position history.

/// One observed centroid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackSample {
    /// Centroid column.
    pub x: u16,
    /// Centroid row.
    pub y: u16,
    /// Frame timestamp in milliseconds.
    pub timestamp_ms: u64,
}

/// Ring buffer of samples; the oldest is overwritten once full.
#[derive(Debug, Clone)]
pub struct TrackHistory {
    samples: Vec<TrackSample>,
    capacity: usize,
    head: usize,
}

impl TrackHistory {
    /// Create an empty history holding at most `capacity` samples.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity: capacity.max(1),
            head: 0,
        }
    }

    /// Append a sample, evicting the oldest when full.
    pub fn push(&mut self, sample: TrackSample) {
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
        } else {
            self.samples[self.head] = sample;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    /// Remove every sample, keeping the allocation.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.head = 0;
    }

    /// Number of stored samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of samples.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &TrackSample> {
        let (newer, older) = self.samples.split_at(self.head);
        older.iter().chain(newer)
    }

    /// Oldest stored sample.
    #[must_use]
    pub fn oldest(&self) -> Option<&TrackSample> {
        self.iter().next()
    }

    /// Newest stored sample.
    #[must_use]
    pub fn newest(&self) -> Option<&TrackSample> {
        if self.head == 0 {
            self.samples.last()
        } else {
            self.samples.get(self.head - 1)
        }
    }

    /// Milliseconds between the oldest and newest sample.
    #[must_use]
    pub fn span_ms(&self) -> u64 {
        match (self.oldest(), self.newest()) {
            (Some(first), Some(last)) => last.timestamp_ms.saturating_sub(first.timestamp_ms),
            _ => 0,
        }
    }

    /// Copy of the samples, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<TrackSample> {
        self.iter().copied().collect()
    }
}
