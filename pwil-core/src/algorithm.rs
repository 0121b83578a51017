//! Algorithm.
use crate::record::Record;
use anyhow::Result;
use std::path::Path;

/// A training algorithm that updates itself from transitions held in a
/// storage of type `S`.
///
/// Both phases of a [`NestedAlgorithm`](crate::NestedAlgorithm), the
/// reward inference and the policy update, implement this trait.
pub trait Algorithm<S> {
    /// A short name, used as the prefix of the keys in the records of this algorithm.
    fn name(&self) -> &str;

    /// Performs an update step with the transitions in `storage`.
    ///
    /// The algorithm can skip the step, for example when the storage does not
    /// hold enough transitions yet. In that case the returned [`Record`] holds
    /// no training metrics, and is empty if the algorithm did nothing else.
    fn update(&mut self, storage: &mut S) -> Result<Record>;

    /// Save the parameters of the algorithm in the given directory.
    fn save_params(&self, path: &Path) -> Result<()>;

    /// Load the parameters of the algorithm from the given directory.
    fn load_params(&mut self, path: &Path) -> Result<()>;
}
