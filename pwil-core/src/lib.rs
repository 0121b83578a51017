#![warn(missing_docs)]
//! Backend-independent core of reward inference from expert demonstrations.
//!
//! This crate provides the pieces that do not depend on a tensor library:
//! records for training metrics, the [`Algorithm`] interface, the
//! [`NestedAlgorithm`] scheduler alternating reward inference and policy
//! updates, the [`RewardMode`] enumeration and [`RunningReturnStats`].
pub mod error;
pub mod record;

mod algorithm;
pub use algorithm::Algorithm;

mod nested;
pub use nested::{NestedAlgorithm, NestedAlgorithmConfig};

mod reward_mode;
pub use reward_mode::RewardMode;

mod return_stats;
pub use return_stats::RunningReturnStats;
