//! Training loop of the discriminator.
use super::PwilConfig;
use crate::{
    action::ActionSpace,
    discriminator::Discriminator,
    sinkhorn::{wasserstein_distance, SinkhornConfig},
    storage::{ExpertLoader, ObsFilter, RolloutStorage},
};
use anyhow::Result;
use log::{debug, trace};
use pwil_core::record::{Record, RecordValue::Scalar};
use std::convert::TryFrom;
use tch::Tensor;

/// Iterates paired expert and agent minibatches and computes the primal
/// Wasserstein reward between their discriminator scores.
///
/// The loop computes and records the objective without applying a gradient
/// step to the discriminator. An explicit step can be applied through
/// [`ModelBase::backward_step`](crate::model::ModelBase::backward_step).
pub struct DiscriminatorTrainer {
    n_epochs: usize,
    state_norm: bool,
    disc_grad_pen: f64,
    sinkhorn: SinkhornConfig,
    action_space: ActionSpace,
}

impl DiscriminatorTrainer {
    /// Creates a trainer.
    pub fn new(config: &PwilConfig) -> Self {
        Self {
            n_epochs: config.n_epochs,
            state_norm: config.state_norm,
            disc_grad_pen: config.disc_grad_pen,
            sinkhorn: config.sinkhorn.clone(),
            action_space: config.action_space,
        }
    }

    /// Negated mean distance between expert and agent scores.
    pub fn primal_wass_reward(
        &self,
        disc: &Discriminator,
        expert_state: &Tensor,
        expert_action: &Tensor,
        agent_state: &Tensor,
        agent_action: &Tensor,
    ) -> Result<Tensor> {
        let expert_d = disc.forward(expert_state, Some(expert_action))?;
        let agent_d = disc.forward(agent_state, Some(agent_action))?;
        let dist = wasserstein_distance(&expert_d, &agent_d, &self.sinkhorn)?;

        Ok(-dist.mean(tch::Kind::Float))
    }

    /// Runs `n_epochs` passes over paired minibatches.
    ///
    /// Agent minibatches are drawn from `storage` with the batch size of
    /// `expert`, once per epoch. The pairs of a pass stop at the shorter of
    /// both sequences. If the storage provides no minibatches at the first
    /// epoch, nothing is computed and an empty record is returned.
    ///
    /// The record holds `primal_wass_reward`, averaged over all pairs, and
    /// `grad_pen`, the weighted gradient penalty, if its coefficient is positive.
    pub fn train<S, E>(
        &self,
        disc: &mut Discriminator,
        storage: &mut S,
        expert: &mut E,
        obs_filter: &mut dyn ObsFilter,
    ) -> Result<Record>
    where
        S: RolloutStorage + ?Sized,
        E: ExpertLoader + ?Sized,
    {
        disc.train();
        let device = disc.device();
        let batch_size = expert.batch_size();
        let mut n = 0;
        let mut sum_reward = 0f32;
        let mut sum_grad_pen = 0f32;

        for epoch in 0..self.n_epochs {
            let agent_batches = match storage.minibatches(batch_size) {
                Some(batches) => batches,
                None if epoch == 0 => {
                    debug!("Agent sampler is not ready, skip discriminator training");
                    return Ok(Record::empty());
                }
                None => break,
            };
            let expert_batches = expert.batches()?;

            for (eb, ab) in expert_batches.into_iter().zip(agent_batches.into_iter()) {
                let expert_state = eb.state.to(device);
                let expert_state = match self.state_norm {
                    true => obs_filter.filter(&expert_state, false)?,
                    false => expert_state,
                };
                let agent_state = match self.state_norm {
                    true => ab.state,
                    false => ab.raw_state,
                }
                .to(device);
                let expert_action = self.action_space.action_repr(&eb.action).to(device);
                let agent_action = self.action_space.action_repr(&ab.action).to(device);

                let reward = self.primal_wass_reward(
                    disc,
                    &expert_state,
                    &expert_action,
                    &agent_state,
                    &agent_action,
                )?;
                sum_reward += f32::try_from(&reward)?;

                if self.disc_grad_pen > 0.0 {
                    let grad_pen = disc.grad_pen(
                        &expert_state,
                        &expert_action,
                        &agent_state,
                        &agent_action,
                    )? * self.disc_grad_pen;
                    sum_grad_pen += f32::try_from(&grad_pen)?;
                }

                n += 1;
                trace!("epoch {}, minibatch {}", epoch, n);
            }
        }

        if n == 0 {
            return Ok(Record::empty());
        }

        let mut record = Record::from_scalar("primal_wass_reward", sum_reward / n as f32);
        if self.disc_grad_pen > 0.0 {
            record.insert("grad_pen", Scalar(sum_grad_pen / n as f32));
        }

        Ok(record)
    }
}
