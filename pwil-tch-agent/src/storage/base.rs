use anyhow::Result;
use tch::Tensor;

/// Observation of a step in a rollout storage.
pub struct Observation {
    /// Observation processed by the observation filter of the environment.
    pub obs: Tensor,

    /// Observation before filtering.
    pub raw_obs: Tensor,
}

/// A minibatch of agent transitions.
pub struct AgentBatch {
    /// Filtered states.
    pub state: Tensor,

    /// States before filtering.
    pub raw_state: Tensor,

    /// Actions.
    pub action: Tensor,
}

/// A minibatch of expert transitions.
pub struct ExpertBatch {
    /// States as recorded in the demonstrations.
    pub state: Tensor,

    /// Actions.
    pub action: Tensor,
}

/// Agent transitions of the current training window.
pub trait RolloutStorage {
    /// The number of steps in the storage.
    fn n_steps(&self) -> usize;

    /// Observation at the given step.
    fn get_obs(&self, step: usize) -> Result<Observation>;

    /// Action taken at the given step.
    fn action(&self, step: usize) -> Result<Tensor>;

    /// Mask of the given step, `0` at the last step of an episode.
    fn mask(&self, step: usize) -> Result<Tensor>;

    /// Overwrites the reward of the given step.
    fn set_reward(&mut self, step: usize, reward: &Tensor) -> Result<()>;

    /// Splits the transitions into minibatches of `batch_size`.
    ///
    /// Returns `None` when the storage cannot provide minibatches,
    /// which tells the caller to skip its update.
    fn minibatches(&mut self, batch_size: usize) -> Option<Vec<AgentBatch>>;
}

/// Minibatches of expert demonstrations.
pub trait ExpertLoader {
    /// The size of the minibatches, also used for agent minibatches.
    fn batch_size(&self) -> usize;

    /// Minibatches of one pass over the demonstrations.
    fn batches(&mut self) -> Result<Vec<ExpertBatch>>;
}

/// Normalizes states.
pub trait ObsFilter {
    /// Returns filtered states.
    ///
    /// If `update` is `true`, the statistics of the filter are updated with
    /// `state` before filtering.
    fn filter(&mut self, state: &Tensor, update: bool) -> Result<Tensor>;
}

/// An [`ObsFilter`] returning states as they are.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityFilter;

impl ObsFilter for IdentityFilter {
    fn filter(&mut self, state: &Tensor, _update: bool) -> Result<Tensor> {
        Ok(state.shallow_clone())
    }
}
