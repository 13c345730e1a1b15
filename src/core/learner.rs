//! The contract between the viewer and a column-based learner.
//!
//! The viewer only ever calls `compute` and reads permanence snapshots. It never reaches into
//! a learner's internal storage, so any implementation of [`Learner`] can be visualized.

use crate::error::Result;

/// A column-based learner driven one input vector at a time.
pub trait Learner {
    /// Length of the input vectors accepted by `compute`.
    fn input_len(&self) -> usize;

    /// Number of columns, i.e. the length of every activation buffer.
    fn column_count(&self) -> usize;

    /// Permanence at or above which a synapse counts as connected.
    fn connected_threshold(&self) -> f32;

    /// Processes one input vector and returns the per-column activity.
    ///
    /// The returned slice borrows the learner's own output buffer, which is overwritten by
    /// the next call. Callers that need the values later must copy them.
    fn compute(&mut self, input: &[bool], learn: bool) -> Result<&[f32]>;

    /// A read-only snapshot of every column's permanences, indexed by input bit.
    fn permanences(&self) -> PermanenceMatrix;
}

/// Per-column permanence rows, each of length `input_len`, with values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PermanenceMatrix {
    input_len: usize,
    rows: Vec<Vec<f32>>,
}

impl PermanenceMatrix {
    /// Builds a matrix from rows. Values are clamped into `[0, 1]`.
    ///
    /// # Panics
    /// If the rows differ in length from `input_len`.
    pub fn new(input_len: usize, rows: Vec<Vec<f32>>) -> Self {
        assert!(
            rows.iter().all(|row| row.len() == input_len),
            "every permanence row must hold {} values",
            input_len
        );
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|p| p.clamp(0.0, 1.0)).collect())
            .collect();
        Self { input_len, rows }
    }

    pub fn input_len(&self) -> usize {
        self.input_len
    }

    pub fn column_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, column: usize) -> &[f32] {
        &self.rows[column]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Which synapses of `column` are connected under `threshold`.
    pub fn connected_mask(&self, column: usize, threshold: f32) -> Vec<bool> {
        self.rows[column].iter().map(|&p| p >= threshold).collect()
    }
}
