//! Per-step rewards from discriminator scores.
use super::PwilConfig;
use crate::{
    action::ActionSpace,
    discriminator::Discriminator,
    sinkhorn::{wasserstein_distance, SinkhornConfig},
    storage::RolloutStorage,
    util::to_vec_f32,
};
use anyhow::Result;
use log::trace;
use pwil_core::{RewardMode, RunningReturnStats};
use tch::{Kind, Tensor};

/// Added inside the logarithms of the `airl` reward.
pub const LOG_EPS: f64 = 1e-20;

/// Added to the variance of returns before rescaling rewards.
pub const NORM_EPS: f64 = 1e-8;

/// Computes the reward of a step of a rollout storage.
///
/// The discriminator score `d` of the step is turned into a reward according
/// to the [`RewardMode`]. With reward normalization the reward is divided by
/// the standard deviation of discounted returns, which are accumulated across
/// calls and reset after the last step of an episode.
pub struct RewardShaper {
    mode: RewardMode,
    reward_norm: bool,
    state_norm: bool,
    gamma: f64,
    sinkhorn: SinkhornConfig,
    action_space: ActionSpace,
    returns: Option<Tensor>,
    ret_stats: RunningReturnStats,
}

impl RewardShaper {
    /// Creates a shaper.
    pub fn new(config: &PwilConfig) -> Self {
        Self {
            mode: config.reward_mode,
            reward_norm: config.reward_norm,
            state_norm: config.state_norm,
            gamma: config.gamma,
            sinkhorn: config.sinkhorn.clone(),
            action_space: config.action_space,
            returns: None,
            ret_stats: RunningReturnStats::default(),
        }
    }

    /// Turns discriminator scores into rewards, before normalization.
    pub fn reward_from_score(&self, d: &Tensor) -> Result<Tensor> {
        let reward = match self.mode {
            RewardMode::Raw => d.shallow_clone(),
            RewardMode::Airl => {
                let s = d.sigmoid();
                (&s + LOG_EPS).log() - (-&s + 1.0 + LOG_EPS).log()
            }
            RewardMode::Pwil => {
                let s = d.sigmoid();
                let s_neg = -&s + 1.0;
                -wasserstein_distance(&s, &s_neg, &self.sinkhorn)?
            }
        };

        Ok(reward)
    }

    /// Rescales rewards by the spread of discounted returns if reward normalization is enabled.
    ///
    /// The returns of the step are `acc * gamma + reward`, where `acc` holds the
    /// returns of the previous step. After merging them into the statistics,
    /// `acc` is set to `returns * mask`, so it is zero after the last step of
    /// an episode.
    pub fn normalize(&mut self, reward: Tensor, mask: &Tensor) -> Result<Tensor> {
        if !self.reward_norm {
            return Ok(reward);
        }

        let acc = match &self.returns {
            Some(r) => r.shallow_clone(),
            None => reward.zeros_like(),
        };
        let returns = acc * self.gamma + &reward;
        let values = to_vec_f32(&returns)?
            .into_iter()
            .map(f64::from)
            .collect::<Vec<_>>();
        let mask = mask
            .to_kind(Kind::Float)
            .to_device(returns.device())
            .reshape(returns.size());

        self.ret_stats.update(&values);
        self.returns = Some(returns * mask);
        trace!("Return variance {}", self.ret_stats.var());

        Ok(reward * self.ret_stats.scale(1.0, NORM_EPS))
    }

    /// Computes the reward of the given step.
    pub fn shape<S: RolloutStorage + ?Sized>(
        &mut self,
        step: usize,
        storage: &S,
        disc: &mut Discriminator,
    ) -> Result<Tensor> {
        let mask = storage.mask(step)?;
        let obs = storage.get_obs(step)?;
        let state = match self.state_norm {
            true => obs.obs,
            false => obs.raw_obs,
        };
        let action = self.action_space.action_repr(&storage.action(step)?);

        disc.eval();
        let reward = tch::no_grad(|| -> Result<Tensor> {
            let d = disc.forward(&state, Some(&action))?;
            self.reward_from_score(&d)
        })?;

        self.normalize(reward, &mask)
    }

    /// Discounted returns of the last step, if reward normalization has run.
    pub fn returns(&self) -> Option<&Tensor> {
        self.returns.as_ref()
    }

    /// Statistics of discounted returns.
    pub fn ret_stats(&self) -> &RunningReturnStats {
        &self.ret_stats
    }
}
