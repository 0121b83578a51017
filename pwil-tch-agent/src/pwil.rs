//! Primal Wasserstein imitation learning, the reward inference phase.
//!
//! [`Pwil`] implements [`Algorithm`](pwil_core::Algorithm) so that it can be
//! the reward phase of a [`NestedAlgorithm`](pwil_core::NestedAlgorithm).
//! Each update runs the [`DiscriminatorTrainer`] over paired expert and agent
//! minibatches, then relabels every step of the rollout storage with the
//! reward computed by the [`RewardShaper`].
mod base;
mod config;
mod shaper;
mod trainer;
pub use base::Pwil;
pub use config::PwilConfig;
pub use shaper::{RewardShaper, LOG_EPS, NORM_EPS};
pub use trainer::DiscriminatorTrainer;
