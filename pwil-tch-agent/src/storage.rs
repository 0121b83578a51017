//! Interfaces of the storages consumed by reward inference.
//!
//! Reward inference does not collect transitions itself. It reads agent
//! transitions from a [`RolloutStorage`], expert demonstrations from an
//! [`ExpertLoader`] and aligns the state normalization of both through an
//! [`ObsFilter`]. [`VecRolloutStorage`] and [`VecExpertDataset`] are
//! in-memory implementations.
mod base;
mod vec_expert;
mod vec_rollout;
pub use base::{
    AgentBatch, ExpertBatch, ExpertLoader, IdentityFilter, ObsFilter, Observation,
    RolloutStorage,
};
pub use vec_expert::VecExpertDataset;
pub use vec_rollout::{Transition, VecRolloutStorage};
