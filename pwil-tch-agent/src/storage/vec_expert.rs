//! In-memory expert demonstrations.
use super::{ExpertBatch, ExpertLoader};
use anyhow::{ensure, Result};
use pwil_core::error::PwilError;
use tch::Tensor;

/// Expert demonstrations held in memory, served in minibatches of a fixed size.
///
/// The last minibatch of a pass is dropped if it is smaller than the batch size.
pub struct VecExpertDataset {
    states: Tensor,
    actions: Tensor,
    batch_size: usize,
    rng: Option<fastrand::Rng>,
}

impl VecExpertDataset {
    /// Creates a dataset from states `[n, state_dim]` and actions `[n, action_dim]`.
    pub fn new(states: Tensor, actions: Tensor, batch_size: usize) -> Result<Self> {
        ensure!(batch_size > 0, "batch_size must be positive");
        if states.size().first() != actions.size().first() || states.dim() < 2 {
            return Err(PwilError::ShapeMismatch(format!(
                "states {:?}, actions {:?}",
                states.size(),
                actions.size()
            ))
            .into());
        }

        Ok(Self {
            states,
            actions,
            batch_size,
            rng: None,
        })
    }

    /// Shuffles the order of the demonstrations at every pass.
    pub fn shuffle(mut self, seed: u64) -> Self {
        self.rng = Some(fastrand::Rng::with_seed(seed));
        self
    }

    /// The number of demonstrations.
    pub fn len(&self) -> usize {
        self.states.size()[0] as usize
    }

    /// Returns `true` if the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExpertLoader for VecExpertDataset {
    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn batches(&mut self) -> Result<Vec<ExpertBatch>> {
        let mut ixs = (0..self.len() as i64).collect::<Vec<_>>();
        if let Some(rng) = self.rng.as_mut() {
            rng.shuffle(&mut ixs);
        }

        let batches = ixs
            .chunks_exact(self.batch_size)
            .map(|chunk| {
                let ixs = Tensor::from_slice(chunk);
                ExpertBatch {
                    state: self.states.index_select(0, &ixs),
                    action: self.actions.index_select(0, &ixs),
                }
            })
            .collect();

        Ok(batches)
    }
}
