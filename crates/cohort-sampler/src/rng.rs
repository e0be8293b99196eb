use cohort_core::{ComputationError, Distribution, ParameterSampler, F};
use rand::distributions::Uniform;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rand_distr::{Beta, Binomial, Distribution as _, Gamma, LogNormal, Normal};

/// Seeded parameter sampler, one independent stream per PSA iteration
pub struct ParameterRng {
    rng: ChaCha20Rng,
}

impl ParameterRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    pub fn from_iteration_id(global_seed: u64, iteration_id: u64) -> Self {
        // Combine seeds deterministically
        let seed = global_seed.wrapping_add(iteration_id.wrapping_mul(0x9e3779b97f4a7c15));
        Self::new(seed)
    }
}

fn invalid(distribution: &Distribution, reason: impl ToString) -> ComputationError {
    ComputationError::InvalidDistribution {
        distribution: distribution.to_string(),
        reason: reason.to_string(),
    }
}

impl ParameterSampler for ParameterRng {
    fn draw(&mut self, distribution: &Distribution) -> Result<F, ComputationError> {
        let rng = &mut self.rng;
        match *distribution {
            Distribution::Fixed => Err(invalid(distribution, "fixed parameters are not sampled")),

            Distribution::Uniform { low, high } => {
                if !low.is_finite() || !high.is_finite() || low > high {
                    return Err(invalid(distribution, "bounds must be finite with low <= high"));
                }
                if low == high {
                    return Ok(low);
                }
                Ok(Uniform::new(low, high).sample(rng))
            }

            Distribution::Beta { alpha, beta } => Beta::new(alpha, beta)
                .map(|d| d.sample(rng))
                .map_err(|e| invalid(distribution, e)),

            Distribution::Binomial { trials, p } => {
                if trials == 0 {
                    return Err(invalid(distribution, "trials must be positive"));
                }
                Binomial::new(trials, p)
                    .map(|d| d.sample(rng) as F / trials as F)
                    .map_err(|e| invalid(distribution, e))
            }

            Distribution::Gamma { shape, scale } => Gamma::new(shape, scale)
                .map(|d| d.sample(rng))
                .map_err(|e| invalid(distribution, e)),

            Distribution::Normal { mean, std_dev } => Normal::new(mean, std_dev)
                .map(|d| d.sample(rng))
                .map_err(|e| invalid(distribution, e)),

            Distribution::LogNormal { mu, sigma } => LogNormal::new(mu, sigma)
                .map(|d| d.sample(rng))
                .map_err(|e| invalid(distribution, e)),
        }
    }
}
