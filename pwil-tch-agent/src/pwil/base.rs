//! Reward inference algorithm.
use super::{DiscriminatorTrainer, PwilConfig, RewardShaper};
use crate::{
    discriminator::Discriminator,
    moments::RunningMoments,
    storage::{ExpertLoader, IdentityFilter, ObsFilter, RolloutStorage},
    util::to_vec_f32,
};
use anyhow::Result;
use log::{debug, info};
use pwil_core::{
    record::{Record, RecordValue::Scalar},
    Algorithm,
};
use std::path::Path;

/// Primal Wasserstein imitation learning.
///
/// The expert demonstrations are owned by the algorithm. Rollouts are given
/// to [`Algorithm::update`], which trains the discriminator and then writes
/// the reward of every step back into the storage.
pub struct Pwil<E: ExpertLoader> {
    disc: Discriminator,
    expert: E,
    obs_filter: Box<dyn ObsFilter>,
    trainer: DiscriminatorTrainer,
    shaper: RewardShaper,
    n_updates: usize,
}

impl<E: ExpertLoader> Pwil<E> {
    /// Constructs the algorithm.
    ///
    /// The observation filter is the identity until one is set with
    /// [`Pwil::with_obs_filter`].
    pub fn build(config: PwilConfig, expert: E) -> Result<Self> {
        if let Some(seed) = config.seed {
            tch::manual_seed(seed);
        }
        let device = config
            .device
            .map(tch::Device::from)
            .unwrap_or(tch::Device::Cpu);
        let action_dim = config.action_space.repr_dim();
        let disc = Discriminator::build(config.discriminator_config.clone(), action_dim, device)?;
        info!(
            "PWIL with reward mode {}, action input {}",
            config.reward_mode,
            disc.action_input()
        );

        Ok(Self {
            disc,
            expert,
            obs_filter: Box::new(IdentityFilter),
            trainer: DiscriminatorTrainer::new(&config),
            shaper: RewardShaper::new(&config),
            n_updates: 0,
        })
    }

    /// Sets the observation filter normalizing expert states.
    ///
    /// It should be the filter through which the environment produced the
    /// filtered observations of the rollout storage.
    pub fn with_obs_filter(mut self, obs_filter: Box<dyn ObsFilter>) -> Self {
        self.obs_filter = obs_filter;
        self
    }

    /// Uses [`RunningMoments`] fitted on the expert states as the observation filter.
    pub fn with_expert_moments(self, moments: RunningMoments) -> Self {
        self.with_obs_filter(Box::new(moments.freeze()))
    }

    /// The discriminator.
    pub fn discriminator(&self) -> &Discriminator {
        &self.disc
    }

    /// The discriminator as mutable reference.
    pub fn discriminator_mut(&mut self) -> &mut Discriminator {
        &mut self.disc
    }

    /// The reward shaper.
    pub fn shaper(&self) -> &RewardShaper {
        &self.shaper
    }

    /// The number of calls of [`Algorithm::update`].
    pub fn n_updates(&self) -> usize {
        self.n_updates
    }

    /// Computes the reward of a step of `storage`.
    pub fn compute_reward<S: RolloutStorage + ?Sized>(
        &mut self,
        step: usize,
        storage: &S,
    ) -> Result<tch::Tensor> {
        self.shaper.shape(step, storage, &mut self.disc)
    }

    fn relabel<S: RolloutStorage + ?Sized>(&mut self, storage: &mut S) -> Result<Option<f32>> {
        let n_steps = storage.n_steps();
        let mut sum = 0f32;
        for step in 0..n_steps {
            let reward = self.shaper.shape(step, &*storage, &mut self.disc)?;
            let values = to_vec_f32(&reward)?;
            sum += values.iter().sum::<f32>() / values.len().max(1) as f32;
            storage.set_reward(step, &reward)?;
        }

        Ok(match n_steps {
            0 => None,
            n => Some(sum / n as f32),
        })
    }
}

impl<E, S> Algorithm<S> for Pwil<E>
where
    E: ExpertLoader,
    S: RolloutStorage,
{
    fn name(&self) -> &str {
        "pwil"
    }

    fn update(&mut self, storage: &mut S) -> Result<Record> {
        let mut record = self.trainer.train(
            &mut self.disc,
            storage,
            &mut self.expert,
            self.obs_filter.as_mut(),
        )?;
        if !record.is_empty() {
            record.merge_inplace(self.disc.param_stats()?);
        }

        if let Some(reward_mean) = self.relabel(storage)? {
            record.insert("reward_mean", Scalar(reward_mean));
        }
        self.n_updates += 1;
        debug!("PWIL update {}", self.n_updates);

        Ok(record)
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        self.disc.save_checkpoint(path)
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.disc.load_checkpoint(path)
    }
}
