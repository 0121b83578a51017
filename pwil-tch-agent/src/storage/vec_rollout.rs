//! In-memory rollout storage.
use super::{AgentBatch, Observation, RolloutStorage};
use crate::util::slice_to_tensor;
use anyhow::{ensure, Result};
use log::trace;
use num_traits::cast::AsPrimitive;
use pwil_core::error::PwilError;
use tch::{Kind, Tensor};

/// A transition of a single environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    state: Vec<f32>,
    raw_state: Option<Vec<f32>>,
    action: Vec<f32>,
    mask: f32,
}

impl Transition {
    /// Creates a transition.
    ///
    /// For discrete action spaces, `action` holds the index of the action.
    pub fn new<T, U>(state: &[T], action: &[U], mask: f32) -> Self
    where
        T: AsPrimitive<f32>,
        U: AsPrimitive<f32>,
    {
        Self {
            state: state.iter().map(|v| v.as_()).collect(),
            raw_state: None,
            action: action.iter().map(|v| v.as_()).collect(),
            mask,
        }
    }

    /// Sets the state before observation filtering.
    pub fn raw_state<T: AsPrimitive<f32>>(mut self, raw_state: &[T]) -> Self {
        self.raw_state = Some(raw_state.iter().map(|v| v.as_()).collect());
        self
    }
}

fn stack_rows<'a>(rows: impl Iterator<Item = &'a [f32]>) -> Tensor {
    let rows = rows.map(|r| slice_to_tensor(r, false)).collect::<Vec<_>>();
    Tensor::stack(&rows, 0)
}

/// Rollout storage holding the transitions of a single environment in memory.
///
/// Each step holds one transition, so accessors return tensors with a
/// leading dimension of size 1.
pub struct VecRolloutStorage {
    states: Tensor,
    raw_states: Tensor,
    actions: Tensor,
    masks: Tensor,
    rewards: Tensor,
    rng: fastrand::Rng,
}

impl VecRolloutStorage {
    /// Creates a storage from transitions.
    ///
    /// `seed` determines the order of the minibatches.
    pub fn from_transitions(transitions: &[Transition], seed: u64) -> Result<Self> {
        ensure!(!transitions.is_empty(), "No transitions");
        let state_dim = transitions[0].state.len();
        let action_dim = transitions[0].action.len();

        for (i, t) in transitions.iter().enumerate() {
            let raw_dim = t.raw_state.as_ref().map_or(state_dim, |s| s.len());
            if t.state.len() != state_dim || raw_dim != state_dim || t.action.len() != action_dim {
                return Err(PwilError::ShapeMismatch(format!("transition {}", i)).into());
            }
        }

        let states = stack_rows(transitions.iter().map(|t| t.state.as_slice()));
        let raw_states = stack_rows(
            transitions
                .iter()
                .map(|t| t.raw_state.as_deref().unwrap_or(&t.state)),
        );
        let actions = stack_rows(transitions.iter().map(|t| t.action.as_slice()));
        let masks = Tensor::from_slice(&transitions.iter().map(|t| t.mask).collect::<Vec<_>>())
            .unsqueeze(-1);
        let rewards = masks.zeros_like();
        trace!("VecRolloutStorage with {} transitions", transitions.len());

        Ok(Self {
            states,
            raw_states,
            actions,
            masks,
            rewards,
            rng: fastrand::Rng::with_seed(seed),
        })
    }

    /// Rewards of all steps, of shape `[n_steps, 1]`.
    pub fn rewards(&self) -> &Tensor {
        &self.rewards
    }

    fn check_step(&self, step: usize) -> Result<i64> {
        ensure!(
            step < self.n_steps(),
            "Step {} out of range of {} steps",
            step,
            self.n_steps()
        );
        Ok(step as i64)
    }
}

impl RolloutStorage for VecRolloutStorage {
    fn n_steps(&self) -> usize {
        self.states.size()[0] as usize
    }

    fn get_obs(&self, step: usize) -> Result<Observation> {
        let i = self.check_step(step)?;
        Ok(Observation {
            obs: self.states.narrow(0, i, 1),
            raw_obs: self.raw_states.narrow(0, i, 1),
        })
    }

    fn action(&self, step: usize) -> Result<Tensor> {
        let i = self.check_step(step)?;
        Ok(self.actions.narrow(0, i, 1))
    }

    fn mask(&self, step: usize) -> Result<Tensor> {
        let i = self.check_step(step)?;
        Ok(self.masks.narrow(0, i, 1))
    }

    fn set_reward(&mut self, step: usize, reward: &Tensor) -> Result<()> {
        let i = self.check_step(step)?;
        let reward = reward.to_kind(Kind::Float).reshape([1, 1]);
        tch::no_grad(|| self.rewards.narrow(0, i, 1).f_copy_(&reward))?;
        Ok(())
    }

    fn minibatches(&mut self, batch_size: usize) -> Option<Vec<AgentBatch>> {
        let n = self.n_steps();
        if batch_size == 0 || n < batch_size {
            return None;
        }

        let mut ixs = (0..n as i64).collect::<Vec<_>>();
        self.rng.shuffle(&mut ixs);
        let batches = ixs
            .chunks_exact(batch_size)
            .map(|chunk| {
                let ixs = Tensor::from_slice(chunk);
                AgentBatch {
                    state: self.states.index_select(0, &ixs),
                    raw_state: self.raw_states.index_select(0, &ixs),
                    action: self.actions.index_select(0, &ixs),
                }
            })
            .collect();

        Some(batches)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::util::to_vec_f32;

    fn storage(n: usize) -> VecRolloutStorage {
        let transitions = (0..n)
            .map(|i| {
                let mask = if i % 3 == 2 { 0.0 } else { 1.0 };
                Transition::new(&[i as f32, 0.0], &[1i64], mask).raw_state(&[i as f32 * 10.0, 0.0])
            })
            .collect::<Vec<_>>();
        VecRolloutStorage::from_transitions(&transitions, 42).unwrap()
    }

    #[test]
    fn test_accessors() -> Result<()> {
        let s = storage(6);
        assert_eq!(s.n_steps(), 6);
        let obs = s.get_obs(4)?;
        assert_eq!(to_vec_f32(&obs.obs)?, vec![4.0, 0.0]);
        assert_eq!(to_vec_f32(&obs.raw_obs)?, vec![40.0, 0.0]);
        assert_eq!(to_vec_f32(&s.mask(2)?)?, vec![0.0]);
        assert_eq!(s.action(0)?.size(), vec![1, 1]);
        assert!(s.get_obs(6).is_err());
        Ok(())
    }

    #[test]
    fn test_set_reward() -> Result<()> {
        let mut s = storage(3);
        s.set_reward(1, &Tensor::from_slice(&[2.5f32]))?;
        assert_eq!(to_vec_f32(s.rewards())?, vec![0.0, 2.5, 0.0]);
        Ok(())
    }

    #[test]
    fn test_minibatches() {
        let mut s = storage(10);
        let batches = s.minibatches(4).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].state.size(), vec![4, 2]);
        assert_eq!(batches[1].action.size(), vec![4, 1]);
        assert!(s.minibatches(11).is_none());
    }

    #[test]
    fn test_shape_mismatch() {
        let transitions = vec![
            Transition::new(&[0.0f32, 0.0], &[0.0f32], 1.0),
            Transition::new(&[0.0f32], &[0.0f32], 1.0),
        ];
        assert!(VecRolloutStorage::from_transitions(&transitions, 0).is_err());
    }
}
