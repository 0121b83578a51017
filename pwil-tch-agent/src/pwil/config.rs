//! Configuration of [`Pwil`](super::Pwil).
use crate::{
    action::ActionSpace, discriminator::DiscriminatorConfig, opt::OptimizerConfig,
    sinkhorn::SinkhornConfig, Device,
};
use anyhow::Result;
use log::info;
use pwil_core::RewardMode;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Pwil`](super::Pwil).
///
/// Constructed once before training and passed by reference to the
/// components built from it.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PwilConfig {
    pub(super) discriminator_config: DiscriminatorConfig,
    pub(super) action_space: ActionSpace,
    #[serde(default)]
    pub(super) reward_mode: RewardMode,
    pub(super) reward_norm: bool,
    pub(super) state_norm: bool,
    pub(super) disc_grad_pen: f64,
    pub(super) n_epochs: usize,
    pub(super) gamma: f64,
    #[serde(default)]
    pub(super) sinkhorn: SinkhornConfig,
    pub(super) seed: Option<i64>,
    pub device: Option<Device>,
}

impl Default for PwilConfig {
    fn default() -> Self {
        Self {
            discriminator_config: Default::default(),
            action_space: ActionSpace::Continuous { dim: 1 },
            reward_mode: RewardMode::Pwil,
            reward_norm: false,
            state_norm: true,
            disc_grad_pen: 0.0,
            n_epochs: 1,
            gamma: 0.99,
            sinkhorn: Default::default(),
            seed: None,
            device: None,
        }
    }
}

impl PwilConfig {
    /// Configuration of the discriminator.
    pub fn discriminator_config(mut self, v: DiscriminatorConfig) -> Self {
        self.discriminator_config = v;
        self
    }

    /// Action space of the environment.
    pub fn action_space(mut self, v: ActionSpace) -> Self {
        self.action_space = v;
        self
    }

    /// Reward mode.
    pub fn reward_mode(mut self, v: RewardMode) -> Self {
        self.reward_mode = v;
        self
    }

    /// If `true`, the discriminator takes actions.
    pub fn action_input(mut self, v: bool) -> Self {
        self.discriminator_config = self.discriminator_config.action_input(v);
        self
    }

    /// If `true`, rewards are divided by the standard deviation of discounted returns.
    pub fn reward_norm(mut self, v: bool) -> Self {
        self.reward_norm = v;
        self
    }

    /// If `true`, the discriminator sees filtered states, otherwise raw states.
    pub fn state_norm(mut self, v: bool) -> Self {
        self.state_norm = v;
        self
    }

    /// Learning rate of the discriminator.
    pub fn disc_lr(mut self, v: f64) -> Self {
        self.discriminator_config = self
            .discriminator_config
            .opt_config(OptimizerConfig::adam(v));
        self
    }

    /// Coefficient of the gradient penalty. The penalty is computed only if positive.
    pub fn disc_grad_pen(mut self, v: f64) -> Self {
        self.disc_grad_pen = v;
        self
    }

    /// The number of passes over the minibatches in an update.
    pub fn n_epochs(mut self, v: usize) -> Self {
        self.n_epochs = v;
        self
    }

    /// Discount factor of the returns used for reward normalization.
    pub fn discount_factor(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }

    /// Configuration of the Sinkhorn estimator.
    pub fn sinkhorn(mut self, v: SinkhornConfig) -> Self {
        self.sinkhorn = v;
        self
    }

    /// Random seed.
    pub fn seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Device.
    pub fn device(mut self, device: tch::Device) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Constructs [`PwilConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of PWIL from {}", path_.display());
        Ok(b)
    }

    /// Saves [`PwilConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of PWIL into {}", path_.display());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_pwil_config() -> Result<()> {
        let config = PwilConfig::default()
            .discriminator_config(DiscriminatorConfig::default().state_dim(3))
            .action_space(ActionSpace::Discrete { n: 4 })
            .reward_mode(RewardMode::Airl)
            .action_input(true)
            .reward_norm(true)
            .disc_grad_pen(10.0)
            .seed(42)
            .device(tch::Device::Cpu);

        let dir = TempDir::new("pwil_config")?;
        let path = dir.path().join("pwil_config.yaml");
        config.save(&path)?;
        let config_ = PwilConfig::load(&path)?;
        assert_eq!(config, config_);
        assert!(config_.discriminator_config.get_action_input());
        Ok(())
    }

    #[test]
    fn test_defaults() {
        let config = PwilConfig::default();
        assert!(!config.discriminator_config.get_action_input());
        assert!(!config.reward_norm);
        assert!(config.state_norm);
        assert_eq!(config.disc_grad_pen, 0.0);
        assert_eq!(config.n_epochs, 1);
        assert_eq!(config.reward_mode, RewardMode::Pwil);
        assert_eq!(
            config.discriminator_config,
            DiscriminatorConfig::default().learning_rate(1e-4)
        );
    }
}
