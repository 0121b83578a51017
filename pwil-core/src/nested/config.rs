//! Configuration of [`NestedAlgorithm`](super::NestedAlgorithm).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`NestedAlgorithm`](super::NestedAlgorithm).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct NestedAlgorithmConfig {
    /// The number of policy updates per reward inference update.
    pub policy_updates_per_iter: usize,
}

impl Default for NestedAlgorithmConfig {
    fn default() -> Self {
        Self {
            policy_updates_per_iter: 1,
        }
    }
}

impl NestedAlgorithmConfig {
    /// Sets the number of policy updates per reward inference update.
    pub fn policy_updates_per_iter(mut self, v: usize) -> Self {
        self.policy_updates_per_iter = v;
        self
    }

    /// Constructs [`NestedAlgorithmConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`NestedAlgorithmConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_nested_algorithm_config() -> Result<()> {
        let config = NestedAlgorithmConfig::default().policy_updates_per_iter(3);

        let dir = TempDir::new("nested_algorithm_config")?;
        let path = dir.path().join("nested_algorithm_config.yaml");

        config.save(&path)?;
        let config_ = NestedAlgorithmConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }
}
