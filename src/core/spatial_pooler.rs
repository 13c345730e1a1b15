//! The `SpatialPooler` is the learner the viewer ships with:
//! - Each column owns a pool of potential synapses into its own neighborhood of the input space.
//! - Its overlap with an input is the number of connected synapses onto active input bits.
//! - Inhibition (global, or local within an inhibition radius) lets only the strongest
//!   `active_columns_per_inh_area` columns become active.
//! - Learning raises the permanences of an active column's synapses onto active bits and lowers
//!   the rest, so each column slowly tunes itself to a recurring input pattern.
//!
//! What are duty cycles?
//! - Rolling averages of how often a column overlaps the input (ODC) and how often it wins (ADC).
//! - Columns whose ADC falls behind get their overlap boosted, up to `max_boost`.
//! - Columns whose ODC falls behind get all their permanences bumped, so no column stays dead.

use super::{
    learner::{Learner, PermanenceMatrix},
    synapses::{PermanenceOptions, SynapsePool},
    topology::Topology,
};
use crate::error::{Result, ViewerError};
use rand::{
    rngs::StdRng,
    seq::{IteratorRandom, SliceRandom},
    Rng, SeedableRng,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Construction parameters of a [`SpatialPooler`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialPoolerParams {
    /// Shape of the input space. A patch of side `S` is `[S, S]`.
    pub input_dimensions: Vec<usize>,

    /// Shape of the column space.
    pub column_dimensions: Vec<usize>,

    /// Radius (in input space) around a column's center from which potential synapses are drawn.
    pub potential_radius: usize,

    /// Fraction of the inputs within `potential_radius` that become potential synapses.
    pub potential_percentage: f64,

    /// If true, every column competes with every other column.
    pub global_inhibition: bool,

    /// How many columns may be active within one inhibition area.
    pub active_columns_per_inh_area: usize,

    /// The minimum overlap a column needs to be considered for winning.
    pub stimulus_threshold: f32,

    pub inactive_decrement: f32,

    pub active_increment: f32,

    /// Permanence at or above which a synapse is connected.
    pub connected: f32,

    /// The largest factor a column's overlap can be boosted by.
    pub max_boost: f32,

    pub seed: u64,

    /// 0 is silent, 1 logs construction, 2 also logs every step.
    pub verbosity: u8,

    /// Window over which duty cycles are averaged.
    pub duty_cycle_period: u32,

    /// Fraction of the largest overlap duty cycle below which a column counts as weak.
    pub min_percentage_overlap_duty_cycles: f32,

    /// Fraction of the largest active duty cycle below which a column gets boosted.
    pub min_percentage_active_duty_cycles: f32,

    /// Fraction of each column's potential synapses that start out connected.
    pub init_connected_percentage: f32,

    /// How often (in iterations) minimum duty cycles and the inhibition radius are refreshed.
    pub update_period: u32,

    /// If true, neighborhoods wrap around the edges of the input and column spaces.
    pub wrap_around: bool,
}

impl Default for SpatialPoolerParams {
    fn default() -> Self {
        Self {
            input_dimensions: vec![32, 32],
            column_dimensions: vec![16],
            potential_radius: 10_000,
            potential_percentage: 1.0,
            global_inhibition: true,
            active_columns_per_inh_area: 1,
            stimulus_threshold: 0.0,
            inactive_decrement: 0.01,
            active_increment: 0.1,
            connected: 0.1,
            max_boost: 3.0,
            seed: 1956,
            verbosity: 1,
            duty_cycle_period: 1000,
            min_percentage_overlap_duty_cycles: 0.001,
            min_percentage_active_duty_cycles: 0.001,
            init_connected_percentage: 0.5,
            update_period: 50,
            wrap_around: true,
        }
    }
}

impl SpatialPoolerParams {
    fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(ViewerError::Configuration(msg)) };

        if self.input_dimensions.is_empty() || self.input_dimensions.contains(&0) {
            return invalid(format!(
                "input dimensions must be non-empty and positive, got {:?}",
                self.input_dimensions
            ));
        }
        if self.column_dimensions.is_empty() || self.column_dimensions.contains(&0) {
            return invalid(format!(
                "column dimensions must be non-empty and positive, got {:?}",
                self.column_dimensions
            ));
        }
        let num_columns: usize = self.column_dimensions.iter().product();
        if !(1..=num_columns).contains(&self.active_columns_per_inh_area) {
            return invalid(format!(
                "active_columns_per_inh_area must be in 1..={}, got {}",
                num_columns, self.active_columns_per_inh_area
            ));
        }
        if !(self.potential_percentage > 0.0 && self.potential_percentage <= 1.0) {
            return invalid(format!(
                "potential_percentage must be in (0, 1], got {}",
                self.potential_percentage
            ));
        }
        if !(0.0..=1.0).contains(&self.connected) {
            return invalid(format!("connected must be in [0, 1], got {}", self.connected));
        }
        if self.max_boost < 1.0 {
            return invalid(format!("max_boost must be at least 1, got {}", self.max_boost));
        }
        if self.duty_cycle_period == 0 || self.update_period == 0 {
            return invalid("duty_cycle_period and update_period must be positive".into());
        }
        Ok(())
    }
}

/// A Spatial Pooler over a fixed-length binary input.
pub struct SpatialPooler {
    params: SpatialPoolerParams,

    /// Seeded from `params.seed`, so runs are reproducible.
    rng: StdRng,

    options: PermanenceOptions,

    input_topology: Topology,

    column_topology: Topology,

    num_inputs: usize,

    num_columns: usize,

    /// `stimulus_threshold` rounded to a synapse count.
    stimulus: usize,

    inhibition_radius: usize,

    synapses: SynapsePool,

    iteration_num: u32,

    iteration_learn_num: u32,

    /// Raw overlap of each column with the current input.
    overlaps: Vec<f32>,

    /// Overlaps after boosting, used for inhibition.
    boosted_overlaps: Vec<f32>,

    /// Small fixed per-column offsets that break ties during inhibition.
    tie_breakers: Vec<f32>,

    overlap_duty_cycles: Vec<f32>,

    active_duty_cycles: Vec<f32>,

    min_overlap_duty_cycles: Vec<f32>,

    min_active_duty_cycles: Vec<f32>,

    boost_factors: Vec<f32>,

    winner_columns: Vec<usize>,

    /// Output buffer handed out by `compute`; 1.0 for active columns, 0.0 otherwise.
    active: Vec<f32>,
}

impl SpatialPooler {
    /// Creates a Spatial Pooler and initializes every column's potential pool.
    pub fn new(params: SpatialPoolerParams) -> Result<Self> {
        params.validate()?;

        let input_topology = Topology::new(&params.input_dimensions);
        let column_topology = Topology::new(&params.column_dimensions);
        let num_inputs = input_topology.len();
        let num_columns = column_topology.len();
        let options = PermanenceOptions::new(
            params.active_increment,
            params.inactive_decrement,
            params.connected,
        );
        let mut rng = StdRng::seed_from_u64(params.seed);
        let tie_breakers = (0..num_columns).map(|_| 0.01 * rng.random::<f32>()).collect();

        let mut sp = Self {
            stimulus: (params.stimulus_threshold + 0.5) as usize,
            inhibition_radius: 0,
            rng,
            options,
            input_topology,
            column_topology,
            num_inputs,
            num_columns,
            synapses: SynapsePool::new(num_columns, num_inputs),
            iteration_num: 0,
            iteration_learn_num: 0,
            overlaps: vec![0.0; num_columns],
            boosted_overlaps: vec![0.0; num_columns],
            tie_breakers,
            overlap_duty_cycles: vec![0.0; num_columns],
            active_duty_cycles: vec![0.0; num_columns],
            min_overlap_duty_cycles: vec![0.0; num_columns],
            min_active_duty_cycles: vec![0.0; num_columns],
            boost_factors: vec![1.0; num_columns],
            winner_columns: Vec::with_capacity(num_columns),
            active: vec![0.0; num_columns],
            params,
        };

        sp.connect_potential_pools();
        sp.update_inhibition_radius();

        if sp.params.verbosity > 0 {
            info!(
                inputs = sp.num_inputs,
                columns = sp.num_columns,
                global_inhibition = sp.params.global_inhibition,
                inhibition_radius = sp.inhibition_radius,
                seed = sp.params.seed,
                "spatial pooler initialized"
            );
        }

        Ok(sp)
    }

    pub fn params(&self) -> &SpatialPoolerParams {
        &self.params
    }

    /// Indices of the columns that won the last inhibition round.
    pub fn winner_columns(&self) -> &[usize] {
        &self.winner_columns
    }

    pub fn iteration_num(&self) -> u32 {
        self.iteration_num
    }

    pub fn iteration_learn_num(&self) -> u32 {
        self.iteration_learn_num
    }

    pub fn boost_factors(&self) -> &[f32] {
        &self.boost_factors
    }

    pub fn inhibition_radius(&self) -> usize {
        self.inhibition_radius
    }

    /// Samples each column's potential pool from the input neighborhood around its center
    /// and gives the synapses random initial permanences.
    fn connect_potential_pools(&mut self) {
        for column in 0..self.num_columns {
            let center = self.map_column(column);
            let neighborhood = self.input_topology.neighborhood(
                center,
                self.params.potential_radius,
                self.params.wrap_around,
            );
            let size = ((neighborhood.len() as f64 * self.params.potential_percentage) + 0.5)
                as usize;
            let mut potential = neighborhood
                .into_iter()
                .choose_multiple(&mut self.rng, size.max(1));
            potential.shuffle(&mut self.rng);

            self.synapses.init_column(
                column,
                &potential,
                self.params.init_connected_percentage,
                &self.options,
                &mut self.rng,
            );
            self.synapses
                .update_column(column, self.stimulus, &self.options);
        }
    }

    /// Maps a column to the input index at the proportional center of its receptive field.
    /// When the two spaces have different dimensionality the flat indices are mapped instead.
    fn map_column(&self, column: usize) -> usize {
        if self.params.column_dimensions.len() != self.params.input_dimensions.len() {
            let center = (column as f64 + 0.5) / self.num_columns as f64 * self.num_inputs as f64;
            return (center as usize).min(self.num_inputs - 1);
        }

        let coords: Vec<usize> = self
            .column_topology
            .coordinates(column)
            .into_iter()
            .zip(&self.params.column_dimensions)
            .zip(&self.params.input_dimensions)
            .map(|((index, &col_dim), &in_dim)| {
                let scaled = (index as f32 / col_dim as f32) * in_dim as f32
                    + (in_dim as f32 / col_dim as f32) * 0.5;
                (scaled as usize).min(in_dim - 1)
            })
            .collect();
        self.input_topology.index(&coords)
    }

    fn calculate_overlaps(&mut self, input: &[bool]) {
        for (column, overlap) in self.overlaps.iter_mut().enumerate() {
            *overlap = self
                .synapses
                .connected(column)
                .iter()
                .filter(|syn| input[syn.input])
                .count() as f32;
        }
    }

    fn boost(&mut self, learn: bool) {
        for ((boosted, &overlap), &factor) in self
            .boosted_overlaps
            .iter_mut()
            .zip(&self.overlaps)
            .zip(&self.boost_factors)
        {
            *boosted = if learn { overlap * factor } else { overlap };
        }
    }

    /// Ordering key for inhibition: boosted overlap plus the column's tie breaker.
    fn strength(&self, column: usize) -> f32 {
        self.boosted_overlaps[column] + self.tie_breakers[column]
    }

    /// Global inhibition: the strongest columns across the whole column space win.
    fn inhibit_columns_global(&mut self) {
        let mut candidates: Vec<usize> = (0..self.num_columns).collect();
        candidates.sort_by(|&a, &b| self.strength(b).total_cmp(&self.strength(a)));

        let eligible = candidates
            .iter()
            .position(|&col| self.boosted_overlaps[col] < self.params.stimulus_threshold)
            .unwrap_or(candidates.len());
        let winners = eligible.min(self.params.active_columns_per_inh_area);

        self.winner_columns.clear();
        self.winner_columns.extend(&candidates[..winners]);
    }

    /// Local inhibition: a column wins if fewer than `active_columns_per_inh_area` of its
    /// neighbors within the inhibition radius are stronger.
    fn inhibit_columns_local(&mut self) {
        self.winner_columns.clear();

        for column in 0..self.num_columns {
            if self.boosted_overlaps[column] < self.params.stimulus_threshold {
                continue;
            }
            let strength = self.strength(column);
            let stronger = self
                .column_topology
                .neighborhood(column, self.inhibition_radius, self.params.wrap_around)
                .into_iter()
                .filter(|&other| other != column && self.strength(other) > strength)
                .count();

            if stronger < self.params.active_columns_per_inh_area {
                self.winner_columns.push(column);
            }
        }
    }

    /// Hebbian update of every winner column's permanences.
    fn adapt_synapses(&mut self, input: &[bool]) {
        for &col in &self.winner_columns {
            for syn in self.synapses.column_mut(col) {
                if input[syn.input] {
                    syn.permanence += self.options.active_increment;
                } else {
                    syn.permanence -= self.options.inactive_decrement;
                }
            }
            self.synapses.update_column(col, self.stimulus, &self.options);
        }
    }

    fn update_duty_cycles(&mut self) {
        let period = self.iteration_num.min(self.params.duty_cycle_period) as f32;
        let factor = (period - 1.0) / period;
        let boost = 1.0 / period;

        for (duty, &overlap) in self.overlap_duty_cycles.iter_mut().zip(&self.overlaps) {
            *duty = (*duty * (period - 1.0) + if overlap > 0.0 { 1.0 } else { 0.0 }) / period;
        }
        for duty in self.active_duty_cycles.iter_mut() {
            *duty *= factor;
        }
        for &col in &self.winner_columns {
            self.active_duty_cycles[col] += boost;
        }
    }

    /// Bumps every permanence of columns whose overlap duty cycle fell below the minimum.
    fn bump_up_weak_columns(&mut self) {
        for column in 0..self.num_columns {
            if self.min_overlap_duty_cycles[column] > self.overlap_duty_cycles[column] {
                for syn in self.synapses.column_mut(column) {
                    syn.permanence += self.options.below_stimulus_increment;
                }
                self.synapses
                    .update_column(column, self.stimulus, &self.options);
            }
        }
    }

    fn update_boost_factors(&mut self) {
        if !self.min_active_duty_cycles.iter().any(|&min| min > 0.0) {
            return;
        }
        let max_boost = self.params.max_boost;
        for ((boost, &min), &active) in self
            .boost_factors
            .iter_mut()
            .zip(&self.min_active_duty_cycles)
            .zip(&self.active_duty_cycles)
        {
            *boost = if active > min {
                1.0
            } else {
                ((1.0 - max_boost) / min.max(f32::EPSILON)) * active + max_boost
            };
        }
    }

    fn update_min_duty_cycles(&mut self) {
        let max_overlap = self.overlap_duty_cycles.iter().fold(0.0f32, |acc, &x| acc.max(x));
        let max_active = self.active_duty_cycles.iter().fold(0.0f32, |acc, &x| acc.max(x));
        self.min_overlap_duty_cycles
            .fill(self.params.min_percentage_overlap_duty_cycles * max_overlap);
        self.min_active_duty_cycles
            .fill(self.params.min_percentage_active_duty_cycles * max_active);
    }

    /// Recomputes the local inhibition radius from the average span of connected synapses,
    /// scaled from input space into column space. Global inhibition covers every column.
    fn update_inhibition_radius(&mut self) {
        if self.params.global_inhibition {
            self.inhibition_radius = self
                .params
                .column_dimensions
                .iter()
                .copied()
                .max()
                .unwrap_or(1);
            return;
        }

        let avg_span = (0..self.num_columns)
            .map(|column| self.connected_span(column))
            .sum::<f32>()
            / self.num_columns as f32;
        let columns_per_input = if self.params.column_dimensions.len()
            == self.params.input_dimensions.len()
        {
            self.params
                .column_dimensions
                .iter()
                .zip(&self.params.input_dimensions)
                .map(|(&c, &i)| c as f32 / i as f32)
                .sum::<f32>()
                / self.params.column_dimensions.len() as f32
        } else {
            (self.num_columns as f32 / self.num_inputs as f32)
                .powf(1.0 / self.params.input_dimensions.len() as f32)
        };
        let diameter = avg_span * columns_per_input;

        self.inhibition_radius = (((diameter - 1.0) / 2.0).round().max(0.0) as usize).max(1);
    }

    /// Average extent, over all input axes, of a column's connected synapses.
    fn connected_span(&self, column: usize) -> f32 {
        let connected = self.synapses.connected(column);
        if connected.is_empty() {
            return 0.0;
        }
        let axes = self.params.input_dimensions.len();
        let mut low = vec![usize::MAX; axes];
        let mut high = vec![0usize; axes];
        for syn in connected {
            for (axis, coord) in self.input_topology.coordinates(syn.input).into_iter().enumerate() {
                low[axis] = low[axis].min(coord);
                high[axis] = high[axis].max(coord);
            }
        }
        low.iter()
            .zip(&high)
            .map(|(&lo, &hi)| (hi - lo + 1) as f32)
            .sum::<f32>()
            / axes as f32
    }
}

impl Learner for SpatialPooler {
    fn input_len(&self) -> usize {
        self.num_inputs
    }

    fn column_count(&self) -> usize {
        self.num_columns
    }

    fn connected_threshold(&self) -> f32 {
        self.options.connected
    }

    /// Runs one step: overlaps, boosting, inhibition and, if `learn`, synapse adaptation and
    /// the duty-cycle bookkeeping.
    fn compute(&mut self, input: &[bool], learn: bool) -> Result<&[f32]> {
        if input.len() != self.num_inputs {
            return Err(ViewerError::ConfigurationMismatch {
                expected: self.num_inputs,
                actual: input.len(),
            });
        }

        self.iteration_num += 1;
        if learn {
            self.iteration_learn_num += 1;
        }

        self.calculate_overlaps(input);
        self.boost(learn);
        if self.params.global_inhibition {
            self.inhibit_columns_global();
        } else {
            self.inhibit_columns_local();
        }

        if learn {
            self.adapt_synapses(input);
            self.update_duty_cycles();
            self.bump_up_weak_columns();
            self.update_boost_factors();
            if self.iteration_num % self.params.update_period == 0 {
                self.update_inhibition_radius();
                self.update_min_duty_cycles();
            }
        }

        self.active.fill(0.0);
        for &col in &self.winner_columns {
            self.active[col] = 1.0;
        }

        if self.params.verbosity > 1 {
            debug!(
                iteration = self.iteration_num,
                winners = ?self.winner_columns,
                "spatial pooler step"
            );
        }

        Ok(&self.active)
    }

    fn permanences(&self) -> PermanenceMatrix {
        let rows = (0..self.num_columns)
            .map(|column| self.synapses.dense_row(column, self.num_inputs))
            .collect();
        PermanenceMatrix::new(self.num_inputs, rows)
    }
}
