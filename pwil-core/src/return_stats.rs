//! Running statistics of discounted returns.

/// Online variance tracker used to rescale rewards by the spread of
/// discounted returns.
///
/// Batches are merged with the parallel-variance identity. The mean is kept
/// only because the merge needs it; rescaling divides by the standard
/// deviation without centering. The statistics start from `mean = 0`,
/// `var = 1` and a pseudo-count of `1e-4`, so the first merged batch
/// dominates immediately while the state stays well-defined before any update.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningReturnStats {
    mean: f64,
    var: f64,
    count: f64,
}

impl Default for RunningReturnStats {
    fn default() -> Self {
        Self::new(1e-4)
    }
}

impl RunningReturnStats {
    /// Constructs the tracker with the given pseudo-count.
    pub fn new(epsilon: f64) -> Self {
        Self {
            mean: 0.0,
            var: 1.0,
            count: epsilon,
        }
    }

    /// Merges a batch of returns, one value per parallel environment.
    pub fn update(&mut self, batch: &[f64]) {
        if batch.is_empty() {
            return;
        }
        let n = batch.len() as f64;
        let batch_mean = batch.iter().sum::<f64>() / n;
        let batch_var = batch.iter().map(|x| (x - batch_mean).powi(2)).sum::<f64>() / n;

        let delta = batch_mean - self.mean;
        let tot_count = self.count + n;
        let m_a = self.var * self.count;
        let m_b = batch_var * n;
        let m2 = m_a + m_b + delta.powi(2) * self.count * n / tot_count;

        self.mean += delta * n / tot_count;
        self.var = m2 / tot_count;
        self.count = tot_count;
    }

    /// Current variance.
    pub fn var(&self) -> f64 {
        self.var
    }

    /// Current mean.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Accumulated count, including the initial pseudo-count.
    pub fn count(&self) -> f64 {
        self.count
    }

    /// Divides `reward` by `sqrt(var + eps)`.
    pub fn scale(&self, reward: f64, eps: f64) -> f64 {
        reward / (self.var + eps).sqrt()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_matches_full_history() {
        let xs = [1.0, 1.9, 2.71, 0.5, -3.0, 4.25];
        let mut stats = RunningReturnStats::new(0.0);
        stats.update(&xs[..2]);
        stats.update(&xs[2..3]);
        stats.update(&xs[3..]);

        let n = xs.len() as f64;
        let mean = xs.iter().sum::<f64>() / n;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

        assert!((stats.mean() - mean).abs() < 1e-12);
        assert!((stats.var() - var).abs() < 1e-12);
        assert_eq!(stats.count(), n);
    }

    #[test]
    fn test_empty_batch_is_ignored() {
        let mut stats = RunningReturnStats::default();
        let before = stats.clone();
        stats.update(&[]);
        assert_eq!(stats, before);
    }

    #[test]
    fn test_scale() {
        let mut stats = RunningReturnStats::new(0.0);
        stats.update(&[1.0, 3.0]);
        assert!((stats.var() - 1.0).abs() < 1e-12);
        assert!((stats.scale(2.0, 0.0) - 2.0).abs() < 1e-12);
    }
}
