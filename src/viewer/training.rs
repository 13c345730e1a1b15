//! Drives the learner over the patch sequence, epoch by epoch.
//!
//! Every step the learner's activation buffer is copied into an [`ActivationVector`] before
//! anything else happens; the learner reuses that buffer on the next call. The copies of one
//! epoch form its [`EpochHistory`], which becomes the epoch's feature maps.

use super::{
    encoder::BitVector,
    feature_map::{FeatureMap, FeatureMapAggregator},
    patches::Patch,
};
use crate::{
    core::learner::{Learner, PermanenceMatrix},
    error::{Result, ViewerError},
};
use tracing::info;

/// An owned copy of the learner's per-column activity for one step.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationVector(Vec<f32>);

impl ActivationVector {
    /// Copies a learner output buffer.
    pub fn from_slice(activity: &[f32]) -> Self {
        Self(activity.to_vec())
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_active(&self, column: usize) -> bool {
        self.0.get(column).is_some_and(|&v| v > 0.0)
    }

    pub fn active_columns(&self) -> Vec<usize> {
        (0..self.0.len()).filter(|&c| self.is_active(c)).collect()
    }
}

/// The activations of one epoch, in patch visitation order.
#[derive(Debug, Clone, Default)]
pub struct EpochHistory {
    snapshots: Vec<ActivationVector>,
}

impl EpochHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            snapshots: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, snapshot: ActivationVector) {
        self.snapshots.push(snapshot);
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ActivationVector> {
        self.snapshots.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivationVector> {
        self.snapshots.iter()
    }

    /// Column count of the recorded snapshots, 0 when empty.
    pub fn column_count(&self) -> usize {
        self.snapshots.first().map_or(0, ActivationVector::len)
    }

    /// The activity of one column across the epoch.
    pub fn column(&self, column: usize) -> impl Iterator<Item = f32> + '_ {
        self.snapshots
            .iter()
            .map(move |snapshot| snapshot.as_slice()[column])
    }
}

/// Everything known about one training step.
#[derive(Debug)]
pub struct StepEvent<'a> {
    /// 1-based epoch number.
    pub epoch: usize,
    pub patch: &'a Patch,
    pub activation: &'a ActivationVector,
}

/// Everything known at the end of an epoch.
#[derive(Debug)]
pub struct EpochEvent<'a> {
    pub epoch: usize,
    pub permanences: &'a PermanenceMatrix,
    pub history: &'a EpochHistory,
    pub feature_maps: &'a [FeatureMap],
}

/// Receives training progress, typically to draw it.
pub trait TrainingObserver {
    /// Called once with the permanences before any learning.
    fn on_start(&mut self, _permanences: &PermanenceMatrix) -> Result<()> {
        Ok(())
    }

    fn on_step(&mut self, event: &StepEvent<'_>) -> Result<()>;

    fn on_epoch_end(&mut self, event: &EpochEvent<'_>) -> Result<()>;
}

/// What a finished run did.
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub epochs: usize,
    /// Number of `compute` calls made.
    pub steps: usize,
    pub final_feature_maps: Vec<FeatureMap>,
}

/// Runs a fixed number of epochs over a fixed patch sequence.
#[derive(Debug, Clone, Copy)]
pub struct TrainingLoop {
    epoch_count: usize,
    aggregator: FeatureMapAggregator,
}

impl TrainingLoop {
    pub fn new(epoch_count: usize, aggregator: FeatureMapAggregator) -> Self {
        Self {
            epoch_count,
            aggregator,
        }
    }

    /// Trains `learner` on every patch, in order, once per epoch, with learning enabled.
    ///
    /// `vectors[i]` must be the encoding of `patches[i]`.
    pub fn run<L, O>(
        &self,
        learner: &mut L,
        patches: &[Patch],
        vectors: &[BitVector],
        observer: &mut O,
    ) -> Result<TrainingSummary>
    where
        L: Learner + ?Sized,
        O: TrainingObserver + ?Sized,
    {
        if patches.len() != vectors.len() {
            return Err(ViewerError::Configuration(format!(
                "{} patches but {} encoded vectors",
                patches.len(),
                vectors.len()
            )));
        }
        if let Some(bits) = vectors.iter().find(|v| v.len() != learner.input_len()) {
            return Err(ViewerError::ConfigurationMismatch {
                expected: learner.input_len(),
                actual: bits.len(),
            });
        }

        observer.on_start(&learner.permanences())?;

        let mut steps = 0;
        let mut feature_maps = Vec::new();

        for epoch in 1..=self.epoch_count {
            info!(epoch, "Epoch: {}", epoch);
            let mut history = EpochHistory::with_capacity(patches.len());

            for (patch, bits) in patches.iter().zip(vectors) {
                let columns = learner.column_count();
                let output = learner.compute(bits.as_slice(), true)?;
                if output.len() != columns {
                    return Err(ViewerError::ConfigurationMismatch {
                        expected: columns,
                        actual: output.len(),
                    });
                }
                let activation = ActivationVector::from_slice(output);
                steps += 1;

                observer.on_step(&StepEvent {
                    epoch,
                    patch,
                    activation: &activation,
                })?;
                history.push(activation);
            }

            let permanences = learner.permanences();
            feature_maps = self.aggregator.aggregate(&history);
            observer.on_epoch_end(&EpochEvent {
                epoch,
                permanences: &permanences,
                history: &history,
                feature_maps: &feature_maps,
            })?;
        }

        Ok(TrainingSummary {
            epochs: self.epoch_count,
            steps,
            final_feature_maps: feature_maps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::patches::BoundingBox;
    use image::RgbImage;

    /// Learner that activates column `calls % columns` and records every input it saw.
    struct RoundRobin {
        columns: usize,
        inputs: usize,
        buffer: Vec<f32>,
        seen: Vec<Vec<bool>>,
    }

    impl RoundRobin {
        fn new(inputs: usize, columns: usize) -> Self {
            Self {
                columns,
                inputs,
                buffer: vec![0.0; columns],
                seen: Vec::new(),
            }
        }
    }

    impl Learner for RoundRobin {
        fn input_len(&self) -> usize {
            self.inputs
        }

        fn column_count(&self) -> usize {
            self.columns
        }

        fn connected_threshold(&self) -> f32 {
            0.5
        }

        fn compute(&mut self, input: &[bool], _learn: bool) -> Result<&[f32]> {
            self.buffer.fill(0.0);
            self.buffer[self.seen.len() % self.columns] = 1.0;
            self.seen.push(input.to_vec());
            Ok(&self.buffer)
        }

        fn permanences(&self) -> PermanenceMatrix {
            PermanenceMatrix::new(self.inputs, vec![vec![0.5; self.inputs]; self.columns])
        }
    }

    #[derive(Default)]
    struct Recorder {
        started: usize,
        steps: Vec<(usize, usize)>,
        histories: Vec<EpochHistory>,
    }

    impl TrainingObserver for Recorder {
        fn on_start(&mut self, _permanences: &PermanenceMatrix) -> Result<()> {
            self.started += 1;
            Ok(())
        }

        fn on_step(&mut self, event: &StepEvent<'_>) -> Result<()> {
            self.steps.push((event.epoch, event.patch.index));
            Ok(())
        }

        fn on_epoch_end(&mut self, event: &EpochEvent<'_>) -> Result<()> {
            assert_eq!(event.feature_maps.len(), 3);
            self.histories.push(event.history.clone());
            Ok(())
        }
    }

    fn fixture(count: usize) -> (Vec<Patch>, Vec<BitVector>) {
        let patches = (0..count)
            .map(|index| Patch {
                index,
                bounds: BoundingBox::new(index as u32 * 2, 0, 2),
                pixels: RgbImage::new(2, 2),
            })
            .collect();
        let vectors = (0..count)
            .map(|index| BitVector::from((0..4).map(|bit| bit == index % 4).collect::<Vec<_>>()))
            .collect();
        (patches, vectors)
    }

    #[test]
    fn test_epoch_major_patch_minor_order() {
        let (patches, vectors) = fixture(4);
        let mut learner = RoundRobin::new(4, 3);
        let mut recorder = Recorder::default();

        let summary = TrainingLoop::new(40, FeatureMapAggregator::new(8))
            .run(&mut learner, &patches, &vectors, &mut recorder)
            .unwrap();

        assert_eq!(summary.steps, 160);
        assert_eq!(summary.epochs, 40);
        assert_eq!(learner.seen.len(), 160);
        assert_eq!(recorder.started, 1);
        for (call, input) in learner.seen.iter().enumerate() {
            assert_eq!(input, vectors[call % 4].as_slice());
        }
        let expected: Vec<(usize, usize)> = (1..=40)
            .flat_map(|epoch| (0..4).map(move |index| (epoch, index)))
            .collect();
        assert_eq!(recorder.steps, expected);
    }

    #[test]
    fn test_history_holds_one_snapshot_per_patch() {
        let (patches, vectors) = fixture(5);
        let mut learner = RoundRobin::new(4, 3);
        let mut recorder = Recorder::default();

        let summary = TrainingLoop::new(2, FeatureMapAggregator::new(8))
            .run(&mut learner, &patches, &vectors, &mut recorder)
            .unwrap();

        assert!(recorder.histories.iter().all(|h| h.len() == 5));
        assert_eq!(summary.final_feature_maps[0].grid_side, 2);
    }

    #[test]
    fn test_snapshots_survive_buffer_reuse() {
        let (patches, vectors) = fixture(3);
        let mut learner = RoundRobin::new(4, 3);
        let mut recorder = Recorder::default();

        TrainingLoop::new(1, FeatureMapAggregator::new(8))
            .run(&mut learner, &patches, &vectors, &mut recorder)
            .unwrap();

        // the learner's buffer now only shows the last step; the history kept every step.
        learner.buffer.fill(7.0);
        let history = &recorder.histories[0];
        assert_eq!(history.get(0).unwrap().active_columns(), vec![0]);
        assert_eq!(history.get(1).unwrap().active_columns(), vec![1]);
        assert_eq!(history.get(2).unwrap().as_slice(), &[0.0, 0.0, 1.0]);
    }

    /// Declares three columns but shrinks its output after the first call.
    struct Shrinking {
        calls: usize,
        buffer: Vec<f32>,
    }

    impl Learner for Shrinking {
        fn input_len(&self) -> usize {
            4
        }

        fn column_count(&self) -> usize {
            3
        }

        fn connected_threshold(&self) -> f32 {
            0.5
        }

        fn compute(&mut self, _input: &[bool], _learn: bool) -> Result<&[f32]> {
            self.calls += 1;
            let len = if self.calls == 1 { 3 } else { 2 };
            self.buffer = vec![1.0; len];
            Ok(&self.buffer)
        }

        fn permanences(&self) -> PermanenceMatrix {
            PermanenceMatrix::new(4, vec![vec![0.5; 4]; 3])
        }
    }

    #[test]
    fn test_output_of_the_wrong_width_is_an_error() {
        let (patches, vectors) = fixture(4);
        let mut learner = Shrinking {
            calls: 0,
            buffer: Vec::new(),
        };
        let mut recorder = Recorder::default();

        let err = TrainingLoop::new(1, FeatureMapAggregator::new(8))
            .run(&mut learner, &patches, &vectors, &mut recorder)
            .unwrap_err();
        assert!(matches!(
            err,
            ViewerError::ConfigurationMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert_eq!(recorder.steps.len(), 1);
        assert!(recorder.histories.is_empty());
    }

    #[test]
    fn test_vector_length_mismatch_fails_before_training() {
        let (patches, vectors) = fixture(2);
        let mut learner = RoundRobin::new(9, 3);
        let mut recorder = Recorder::default();

        let err = TrainingLoop::new(1, FeatureMapAggregator::default())
            .run(&mut learner, &patches, &vectors, &mut recorder)
            .unwrap_err();
        assert!(matches!(
            err,
            ViewerError::ConfigurationMismatch {
                expected: 9,
                actual: 4
            }
        ));
        assert!(learner.seen.is_empty());
        assert_eq!(recorder.started, 0);
    }
}
