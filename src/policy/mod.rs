//! Relaxation policy definitions.

pub mod relaxation;
pub mod forces;

pub use relaxation::{ForceWeights, RelaxationPolicy};
