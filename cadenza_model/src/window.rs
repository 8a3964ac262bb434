// Fixed-capacity rolling context window fed to the sequence model.
//
// Holds exactly `capacity` rows of normalized (pitch, duration, velocity)
// features. Storage is a boxed slice used as a ring buffer: `head` indexes
// the oldest row, and `push` overwrites it and advances the head, so
// eviction is strict FIFO and the length never changes after construction.

/// One normalized timestep: [pitch, duration, velocity], each in model space.
pub type FeatureRow = [f32; 3];

/// Rolling window of the most recent `capacity` feature rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextWindow {
    rows: Box<[FeatureRow]>,
    /// Index of the oldest row.
    head: usize,
}

impl ContextWindow {
    /// A window of `capacity` zero rows. `capacity` must be non-zero.
    pub fn zeroed(capacity: usize) -> Self {
        assert!(capacity > 0, "context window capacity must be non-zero");
        ContextWindow {
            rows: vec![[0.0; 3]; capacity].into_boxed_slice(),
            head: 0,
        }
    }

    /// Build a window from seed rows (oldest first). Fewer seeds than
    /// `capacity` are left-padded with zero rows; more keep only the most
    /// recent `capacity`.
    pub fn from_seed(capacity: usize, seed: &[FeatureRow]) -> Self {
        let mut window = ContextWindow::zeroed(capacity);
        let skip = seed.len().saturating_sub(capacity);
        for row in &seed[skip..] {
            window.push(*row);
        }
        window
    }

    pub fn capacity(&self) -> usize {
        self.rows.len()
    }

    /// Evict the oldest row and append `row` as the newest.
    pub fn push(&mut self, row: FeatureRow) {
        self.rows[self.head] = row;
        self.head = (self.head + 1) % self.rows.len();
    }

    /// Row at logical position `index` (0 = oldest).
    pub fn get(&self, index: usize) -> Option<&FeatureRow> {
        if index >= self.rows.len() {
            return None;
        }
        Some(&self.rows[(self.head + index) % self.rows.len()])
    }

    /// Oldest row.
    pub fn first(&self) -> &FeatureRow {
        &self.rows[self.head]
    }

    /// Newest row.
    pub fn last(&self) -> &FeatureRow {
        let len = self.rows.len();
        &self.rows[(self.head + len - 1) % len]
    }

    /// Rows in chronological order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &FeatureRow> + '_ {
        let (newer, older) = self.rows.split_at(self.head);
        older.iter().chain(newer.iter())
    }
}
