//! A `Synapse` links one column to one input bit through a permanence value.
//! A synapse whose permanence is at or above the connected threshold is "connected"
//! and counts toward the column's overlap with the input.
//!
//! `SynapsePool` stores the potential synapses of every column in one flat vec.
//! Column `c` owns the slot range `c * capacity .. c * capacity + count[c]`, and after every
//! update its connected synapses are moved to the front of that range so the overlap
//! computation only walks the connected prefix.

use rand::Rng;
use std::ops::Range;

/// A potential synapse onto input bit `input`.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Synapse {
    pub input: usize,
    pub permanence: f32,
}

/// How permanence values are adjusted and bounded.
#[derive(Debug, Clone)]
pub struct PermanenceOptions {
    pub inactive_decrement: f32,
    pub active_increment: f32,
    pub connected: f32,
    pub below_stimulus_increment: f32,
    pub min: f32,
    pub max: f32,
    pub trim_threshold: f32,
}

impl PermanenceOptions {
    /// Builds options from the learning rates, deriving the raise and trim steps the
    /// same way as the reference HTM implementation does.
    pub fn new(active_increment: f32, inactive_decrement: f32, connected: f32) -> Self {
        Self {
            inactive_decrement,
            active_increment,
            connected,
            below_stimulus_increment: connected / 10.0,
            min: 0.0,
            max: 1.0,
            trim_threshold: active_increment / 2.0,
        }
    }
}

/// Flat pool of potential synapses for all columns.
#[derive(Debug, Clone)]
pub struct SynapsePool {
    synapses: Vec<Synapse>,
    counts: Vec<usize>,
    connected_counts: Vec<usize>,
    capacity: usize,
}

impl SynapsePool {
    /// Creates an empty pool for `num_columns` columns, each holding up to `capacity` synapses.
    pub fn new(num_columns: usize, capacity: usize) -> Self {
        Self {
            synapses: vec![Synapse::default(); num_columns * capacity],
            counts: vec![0; num_columns],
            connected_counts: vec![0; num_columns],
            capacity,
        }
    }

    /// Fills a column from its potential input indices with random initial permanences.
    /// Roughly `init_connected` of them start above the connected threshold.
    pub fn init_column<R: Rng>(
        &mut self,
        column: usize,
        potential: &[usize],
        init_connected: f32,
        options: &PermanenceOptions,
        rng: &mut R,
    ) {
        let len = potential.len().min(self.capacity);
        let start = column * self.capacity;

        for (slot, &input) in self.synapses[start..start + len]
            .iter_mut()
            .zip(potential)
        {
            let raw = if rng.random::<f32>() <= init_connected {
                options.connected + (options.max - options.connected) * rng.random::<f32>()
            } else {
                options.connected * rng.random::<f32>()
            };
            let permanence = if raw > options.trim_threshold {
                (raw * 100_000.0).round() / 100_000.0
            } else {
                0.0
            };
            *slot = Synapse { input, permanence };
        }

        self.counts[column] = len;
        self.partition_connected(column, options.connected);
    }

    /// Moves the connected synapses of a column to the front of its range.
    pub fn partition_connected(&mut self, column: usize, connected: f32) {
        let range = self.range(column);
        let slice = &mut self.synapses[range];

        let mut pivot = 0;
        for i in 0..slice.len() {
            if slice[i].permanence >= connected {
                slice.swap(i, pivot);
                pivot += 1;
            }
        }

        self.connected_counts[column] = pivot;
    }

    /// Re-establishes a column's invariants after its permanences were changed:
    /// trim, raise until `stimulus_threshold` synapses are connected, clamp,
    /// then repartition. Raised synapses are never trimmed again.
    pub fn update_column(&mut self, column: usize, stimulus_threshold: usize, options: &PermanenceOptions) {
        for syn in self.column_mut(column) {
            if syn.permanence <= options.trim_threshold {
                syn.permanence = 0.0;
            }
        }

        self.raise_until_stimulated(column, stimulus_threshold, options);

        for syn in self.column_mut(column) {
            syn.permanence = syn.permanence.clamp(options.min, options.max);
        }

        self.partition_connected(column, options.connected);
    }

    fn raise_until_stimulated(
        &mut self,
        column: usize,
        stimulus_threshold: usize,
        options: &PermanenceOptions,
    ) {
        if options.below_stimulus_increment <= 0.0 {
            return;
        }
        let slice = self.column_mut(column);
        let target = stimulus_threshold.min(slice.len());

        while slice
            .iter()
            .filter(|syn| syn.permanence >= options.connected)
            .count()
            < target
        {
            for syn in slice.iter_mut() {
                syn.permanence += options.below_stimulus_increment;
            }
        }
    }

    fn range(&self, column: usize) -> Range<usize> {
        let start = column * self.capacity;
        start..start + self.counts[column]
    }

    /// All potential synapses of a column.
    pub fn column(&self, column: usize) -> &[Synapse] {
        &self.synapses[self.range(column)]
    }

    pub fn column_mut(&mut self, column: usize) -> &mut [Synapse] {
        let range = self.range(column);
        &mut self.synapses[range]
    }

    /// The connected prefix of a column.
    pub fn connected(&self, column: usize) -> &[Synapse] {
        let start = column * self.capacity;
        &self.synapses[start..start + self.connected_counts[column]]
    }

    /// Scatters a column's permanences into a dense row indexed by input bit.
    /// Inputs outside the potential pool read as 0.
    pub fn dense_row(&self, column: usize, num_inputs: usize) -> Vec<f32> {
        let mut row = vec![0.0; num_inputs];
        for syn in self.column(column) {
            if let Some(slot) = row.get_mut(syn.input) {
                *slot = syn.permanence;
            }
        }
        row
    }
}
