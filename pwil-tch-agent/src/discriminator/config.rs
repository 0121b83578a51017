//! Configuration of [`Discriminator`](super::Discriminator).
use crate::{
    mlp::{Activation, MlpConfig},
    opt::OptimizerConfig,
};
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Discriminator`](super::Discriminator).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct DiscriminatorConfig {
    pub(super) encoder_config: Option<MlpConfig>,
    pub(super) head_units: Vec<i64>,
    pub(super) action_input: bool,
    pub(super) opt_config: OptimizerConfig,
}

impl Default for DiscriminatorConfig {
    fn default() -> Self {
        Self {
            encoder_config: None,
            head_units: vec![64],
            action_input: false,
            opt_config: OptimizerConfig::adam(1e-4),
        }
    }
}

impl DiscriminatorConfig {
    /// Sets the encoder of states.
    pub fn encoder_config(mut self, v: MlpConfig) -> Self {
        self.encoder_config = Some(v);
        self
    }

    /// Sets an encoder of states of dimension `state_dim`, one hidden layer of 64 units with tanh.
    pub fn state_dim(self, state_dim: i64) -> Self {
        let encoder = MlpConfig::new(state_dim, vec![64], 64, true).activation(Activation::Tanh);
        self.encoder_config(encoder)
    }

    /// Sets the hidden units of the scoring head.
    pub fn head_units(mut self, v: Vec<i64>) -> Self {
        self.head_units = v;
        self
    }

    /// If `true`, actions are concatenated to the encoded states before the head.
    pub fn action_input(mut self, v: bool) -> Self {
        self.action_input = v;
        self
    }

    /// Sets the optimizer.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Sets the learning rate of the optimizer.
    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.opt_config = self.opt_config.learning_rate(lr);
        self
    }

    /// Returns `true` if the discriminator takes actions.
    pub fn get_action_input(&self) -> bool {
        self.action_input
    }

    /// Constructs [`DiscriminatorConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of discriminator from {}", path_.display());
        Ok(b)
    }

    /// Saves [`DiscriminatorConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of discriminator into {}", path_.display());
        Ok(())
    }
}
