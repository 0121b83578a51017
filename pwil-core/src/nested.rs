//! Alternation of reward inference and policy updates.
mod config;
use crate::{
    record::{Record, RecordValue::Scalar, Recorder},
    Algorithm,
};
use anyhow::{ensure, Result};
pub use config::NestedAlgorithmConfig;
use log::{debug, info};
use std::{fs, path::Path};

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Runs a reward inference algorithm and a policy update algorithm in turn.
///
/// Each call of [`NestedAlgorithm::update`] is one outer training iteration:
///
/// 1. The reward inference phase updates with the storage. It trains its
///    reward model and writes inferred rewards back into the storage. The
///    phase may skip its model update and return an empty record.
/// 2. The policy update phase runs `policy_updates_per_iter` times on the same
///    storage, consuming the rewards written in step 1. It always runs, even
///    when the first phase skipped.
/// 3. The records of both phases are merged, with keys prefixed by the name of
///    the phase, and written to the recorder if one is given.
///
/// ```mermaid
/// graph LR
///     S[Storage]-->|transitions|R[Reward inference]
///     R-->|rewards|S
///     S-->|transitions, rewards|P[Policy update]
/// ```
///
/// The calls are issued strictly in sequence. Any error from either phase is
/// returned unmodified and the iteration counter is not advanced.
pub struct NestedAlgorithm<S> {
    reward: Box<dyn Algorithm<S>>,
    policy: Box<dyn Algorithm<S>>,
    policy_updates_per_iter: usize,
    n_iters: usize,
    recorder: Option<Box<dyn Recorder>>,
}

impl<S> NestedAlgorithm<S> {
    /// Constructs the scheduler from the two phases.
    pub fn build(
        config: &NestedAlgorithmConfig,
        reward: Box<dyn Algorithm<S>>,
        policy: Box<dyn Algorithm<S>>,
    ) -> Result<Self> {
        ensure!(
            config.policy_updates_per_iter > 0,
            "policy_updates_per_iter must be positive"
        );
        info!(
            "Nested algorithm: {} -> {} x{}",
            reward.name(),
            policy.name(),
            config.policy_updates_per_iter
        );

        Ok(Self {
            reward,
            policy,
            policy_updates_per_iter: config.policy_updates_per_iter,
            n_iters: 0,
            recorder: None,
        })
    }

    /// Attaches a recorder receiving the merged record of every iteration.
    pub fn with_recorder(mut self, recorder: Box<dyn Recorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// The number of completed outer iterations.
    pub fn n_iters(&self) -> usize {
        self.n_iters
    }

    /// Performs one outer training iteration.
    pub fn update(&mut self, storage: &mut S) -> Result<Record> {
        let record_reward = self.reward.update(storage)?;
        if record_reward.is_empty() {
            debug!("{} skipped its update", self.reward.name());
        }
        let mut record = record_reward.with_prefix(self.reward.name());

        for _ in 0..self.policy_updates_per_iter {
            let record_policy = self.policy.update(storage)?;
            record.merge_inplace(record_policy.with_prefix(self.policy.name()));
        }

        self.n_iters += 1;
        record.insert("iter", Scalar(self.n_iters as f32));

        if let Some(recorder) = self.recorder.as_mut() {
            recorder.write(record.clone());
            recorder.flush(self.n_iters as i64);
        }

        Ok(record)
    }

    /// Saves both phases in the sub-directories `reward` and `policy` of `path`.
    pub fn save_params(&self, path: &Path) -> Result<()> {
        let path_reward = path.join("reward");
        let path_policy = path.join("policy");
        fs::create_dir_all(&path_reward)?;
        fs::create_dir_all(&path_policy)?;
        self.reward.save_params(&path_reward)?;
        self.policy.save_params(&path_policy)?;
        info!("Save nested algorithm to {:?}", path);
        Ok(())
    }

    /// Loads both phases from the sub-directories `reward` and `policy` of `path`.
    pub fn load_params(&mut self, path: &Path) -> Result<()> {
        self.reward.load_params(&path.join("reward"))?;
        self.policy.load_params(&path.join("policy"))?;
        info!("Load nested algorithm from {:?}", path);
        Ok(())
    }
}
