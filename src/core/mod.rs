//! The learner side of the viewer: the [`learner::Learner`] contract and the Spatial Pooler
//! that implements it.

pub mod learner;
pub mod spatial_pooler;
pub mod synapses;
pub mod topology;
