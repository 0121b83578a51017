//! Reward inference from expert demonstrations implemented with [tch](https://crates.io/crates/tch).
//!
//! The reward-inference phase of a nested training loop is [`pwil::Pwil`]:
//! a [`discriminator::Discriminator`] scores states (optionally with actions),
//! a Sinkhorn-style estimator compares expert and agent scores, and a
//! [`pwil::RewardShaper`] turns scores into per-step rewards written back to
//! the rollout storage.
pub mod action;
pub mod discriminator;
pub mod grad_pen;
pub mod mlp;
pub mod model;
pub mod moments;
pub mod opt;
pub mod pwil;
pub mod sinkhorn;
pub mod storage;
pub mod util;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
/// Device for using tch.
///
/// This enum is added because [`tch::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// The main GPU device.
    Cuda(usize),

    /// The main MPS device.
    Mps,

    /// The main Vulkan device.
    Vulkan,
}

impl From<tch::Device> for Device {
    fn from(device: tch::Device) -> Self {
        match device {
            tch::Device::Cpu => Self::Cpu,
            tch::Device::Cuda(n) => Self::Cuda(n),
            tch::Device::Mps => Self::Mps,
            tch::Device::Vulkan => Self::Vulkan,
        }
    }
}

impl From<Device> for tch::Device {
    fn from(device: Device) -> Self {
        match device {
            Device::Cpu => tch::Device::Cpu,
            Device::Cuda(n) => tch::Device::Cuda(n),
            Device::Mps => tch::Device::Mps,
            Device::Vulkan => tch::Device::Vulkan,
        }
    }
}
