use super::DiscriminatorConfig;
use crate::{
    grad_pen::gradient_penalty,
    mlp::{Activation, Mlp, MlpConfig},
    model::{ModelBase, SubModel},
    opt::Adam,
    util::param_stats,
};
use anyhow::{anyhow, Context, Result};
use log::{info, trace};
use pwil_core::{error::PwilError, record::Record};
use std::{fs, path::Path};
use tch::{nn, Device, Tensor};

/// File name of the weights in a checkpoint directory.
pub const MODEL_FILE: &str = "pwil_disc.pt.tch";

/// File name of the optimizer state in a checkpoint directory.
pub const OPT_FILE: &str = "pwil_disc_opt.pt.tch";

/// Network scoring states, optionally concatenated with actions, with a scalar.
///
/// States go through an encoder. If the discriminator takes actions, they are
/// concatenated to the encoded states before the scoring head. The weights
/// and the optimizer bound to them are saved and restored as a pair.
pub struct Discriminator {
    device: Device,
    var_store: nn::VarStore,
    encoder: Mlp,
    head: Mlp,
    action_dim: i64,
    train: bool,
    opt: Adam,
    config: DiscriminatorConfig,
}

impl Discriminator {
    /// Constructs a discriminator.
    ///
    /// `action_dim` is the dimension of the action representation. It is used
    /// only if the discriminator takes actions.
    pub fn build(config: DiscriminatorConfig, action_dim: i64, device: Device) -> Result<Self> {
        let encoder_config = config
            .encoder_config
            .clone()
            .context("Encoder of the discriminator is not configured")?;
        let enc_out = encoder_config.get_out_dim();
        let head_in = match config.action_input {
            true => enc_out + action_dim,
            false => enc_out,
        };
        let head_config = MlpConfig::new(head_in, config.head_units.clone(), 1, false)
            .activation(Activation::Tanh);

        let var_store = nn::VarStore::new(device);
        let encoder = Mlp::build(&(var_store.root() / "encoder"), encoder_config);
        let head = Mlp::build(&(var_store.root() / "head"), head_config);
        let opt = config.opt_config.build(&var_store)?;

        Ok(Self {
            device,
            var_store,
            encoder,
            head,
            action_dim,
            train: true,
            opt,
            config,
        })
    }

    /// Scores a batch, returning a tensor of shape `[batch_size, 1]`.
    ///
    /// `action` is the action representation. It is required if the
    /// discriminator takes actions, and ignored otherwise.
    pub fn forward(&self, state: &Tensor, action: Option<&Tensor>) -> Result<Tensor> {
        let h = self.encoder.forward_t(state, self.train);
        let h = match self.config.action_input {
            false => h,
            true => {
                let action =
                    action.ok_or_else(|| anyhow!("The discriminator requires actions"))?;
                if action.size().last() != Some(&self.action_dim) {
                    return Err(PwilError::ShapeMismatch(format!(
                        "action of shape {:?}, expected dimension {}",
                        action.size(),
                        self.action_dim
                    ))
                    .into());
                }
                Tensor::cat(&[h, action.to(self.device)], -1)
            }
        };

        Ok(self.head.forward_t(&h, self.train))
    }

    /// Returns `true` if the discriminator takes actions.
    pub fn action_input(&self) -> bool {
        self.config.action_input
    }

    /// Sets training mode.
    pub fn train(&mut self) {
        self.train = true;
    }

    /// Sets evaluation mode.
    pub fn eval(&mut self) {
        self.train = false;
    }

    /// Returns `true` in training mode.
    pub fn is_train(&self) -> bool {
        self.train
    }

    /// The device of the weights.
    pub fn device(&self) -> Device {
        self.device
    }

    /// The optimizer bound to the weights.
    pub fn opt(&self) -> &Adam {
        &self.opt
    }

    /// Gradient penalty at interpolations of expert and agent samples.
    ///
    /// Actions are used only if the discriminator takes actions.
    pub fn grad_pen(
        &self,
        expert_state: &Tensor,
        expert_action: &Tensor,
        agent_state: &Tensor,
        agent_action: &Tensor,
    ) -> Result<Tensor> {
        let to_device = |a: &Tensor| a.to(self.device);
        let (expert_action, agent_action) = match self.config.action_input {
            true => (Some(to_device(expert_action)), Some(to_device(agent_action))),
            false => (None, None),
        };
        let expert_state = to_device(expert_state);
        let agent_state = to_device(agent_state);

        gradient_penalty(
            |s, a| self.forward(s, a),
            &expert_state,
            expert_action.as_ref(),
            &agent_state,
            agent_action.as_ref(),
        )
    }

    /// Mean and standard deviation of each weight tensor.
    pub fn param_stats(&self) -> Result<Record> {
        param_stats(&self.var_store)
    }

    /// Saves the weights and the optimizer state in `dir`.
    ///
    /// Both files are written under temporary names first and renamed
    /// after both writes succeeded.
    pub fn save_checkpoint(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        let tmp_model = dir.join(format!("{}.tmp", MODEL_FILE));
        let tmp_opt = dir.join(format!("{}.tmp", OPT_FILE));

        self.save(&tmp_model)?;
        self.opt.save(&tmp_opt)?;
        fs::rename(&tmp_model, dir.join(MODEL_FILE))?;
        fs::rename(&tmp_opt, dir.join(OPT_FILE))?;
        info!("Save discriminator checkpoint into {}", dir.display());

        Ok(())
    }

    /// Restores the weights and the optimizer state from `dir`.
    ///
    /// Both are read into a new discriminator, which replaces this one only
    /// if both reads succeed.
    pub fn load_checkpoint(&mut self, dir: &Path) -> Result<()> {
        let mut disc = Self::build(self.config.clone(), self.action_dim, self.device)?;
        disc.load(dir.join(MODEL_FILE))?;
        disc.opt.load(dir.join(OPT_FILE))?;
        disc.train = self.train;
        *self = disc;
        info!("Load discriminator checkpoint from {}", dir.display());

        Ok(())
    }
}

impl ModelBase for Discriminator {
    fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        self.opt.backward_step(&self.var_store, loss)
    }

    fn get_var_store(&self) -> &nn::VarStore {
        &self.var_store
    }

    fn save<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        self.var_store.save(&path)?;
        info!("Save discriminator to {:?}", path.as_ref());
        let vs = self.var_store.variables();
        for (name, _) in vs.iter() {
            trace!("Save variable {}", name);
        }
        Ok(())
    }

    fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.var_store.load(&path)?;
        info!("Load discriminator from {:?}", path.as_ref());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::opt::OptimizerConfig;
    use tch::Kind;
    use tempdir::TempDir;

    fn config(action_input: bool) -> DiscriminatorConfig {
        DiscriminatorConfig::default()
            .state_dim(3)
            .head_units(vec![16])
            .action_input(action_input)
            .opt_config(OptimizerConfig::adam(1e-2))
    }

    #[test]
    fn test_forward_shapes() -> Result<()> {
        let s = Tensor::randn([5, 3], (Kind::Float, Device::Cpu));
        let a = Tensor::randn([5, 2], (Kind::Float, Device::Cpu));

        let disc = Discriminator::build(config(false), 2, Device::Cpu)?;
        assert_eq!(disc.forward(&s, None)?.size(), vec![5, 1]);
        assert_eq!(disc.forward(&s, Some(&a))?.size(), vec![5, 1]);

        let disc = Discriminator::build(config(true), 2, Device::Cpu)?;
        assert_eq!(disc.forward(&s, Some(&a))?.size(), vec![5, 1]);
        let vars = disc.get_var_store().variables();
        assert_eq!(vars["head.ln0.weight"].size(), vec![16, 66]);
        assert!(disc.forward(&s, None).is_err());
        assert!(disc.forward(&s, Some(&s)).is_err());
        Ok(())
    }

    #[test]
    fn test_missing_encoder() {
        let config = DiscriminatorConfig::default();
        assert!(Discriminator::build(config, 1, Device::Cpu).is_err());
    }

    #[test]
    fn test_checkpoint_round_trip() -> Result<()> {
        tch::manual_seed(0);
        let s = Tensor::randn([8, 3], (Kind::Float, Device::Cpu));
        let a = Tensor::randn([8, 2], (Kind::Float, Device::Cpu));

        let mut disc = Discriminator::build(config(true), 2, Device::Cpu)?;
        let loss = disc.forward(&s, Some(&a))?.square().mean(Kind::Float);
        disc.backward_step(&loss)?;
        disc.eval();
        let y = disc.forward(&s, Some(&a))?;

        let dir = TempDir::new("discriminator")?;
        disc.save_checkpoint(dir.path())?;
        assert!(dir.path().join(MODEL_FILE).exists());
        assert!(dir.path().join(OPT_FILE).exists());

        let mut disc2 = Discriminator::build(config(true), 2, Device::Cpu)?;
        disc2.eval();
        assert!(!disc2.forward(&s, Some(&a))?.equal(&y));
        disc2.load_checkpoint(dir.path())?;
        assert!(disc2.forward(&s, Some(&a))?.equal(&y));
        assert!(disc2.opt().state_eq(disc.opt()));
        Ok(())
    }

    #[test]
    fn test_failed_load_keeps_state() -> Result<()> {
        let s = Tensor::randn([4, 3], (Kind::Float, Device::Cpu));
        let mut disc = Discriminator::build(config(false), 1, Device::Cpu)?;
        disc.eval();
        let y = disc.forward(&s, None)?;

        let dir = TempDir::new("discriminator")?;
        disc.save(dir.path().join(MODEL_FILE))?;
        // optimizer state is missing
        assert!(disc.load_checkpoint(dir.path()).is_err());
        assert!(disc.forward(&s, None)?.equal(&y));
        Ok(())
    }
}
