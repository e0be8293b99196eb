use cohort_core::F;
use serde::{Deserialize, Serialize};

use crate::psa::PsaEnsemble;

/// Spread of one outcome variable's discounted total across iterations
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableSummary {
    pub name: String,
    pub mean: F,
    pub variance: F,
    pub lower: F, // 2.5th percentile
    pub upper: F, // 97.5th percentile
}

impl VariableSummary {
    pub fn from_samples(name: &str, samples: &[F]) -> Self {
        let n = samples.len();
        if n == 0 {
            return Self {
                name: name.to_string(),
                mean: 0.0,
                variance: 0.0,
                lower: 0.0,
                upper: 0.0,
            };
        }

        let mean = samples.iter().sum::<F>() / n as F;
        let variance = if n > 1 {
            samples.iter().map(|&x| (x - mean).powi(2)).sum::<F>() / (n - 1) as F
        } else {
            0.0
        };

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        Self {
            name: name.to_string(),
            mean,
            variance,
            lower: percentile(&sorted, 0.025),
            upper: percentile(&sorted, 0.975),
        }
    }

    pub fn std_dev(&self) -> F {
        self.variance.sqrt()
    }
}

/// Ensemble statistics over a finished PSA
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PsaSummary {
    pub n_iterations: usize,
    pub variables: Vec<VariableSummary>,
    pub mean_final_distribution: Vec<F>,
}

impl PsaSummary {
    pub fn from_ensemble(ensemble: &PsaEnsemble) -> Self {
        let n_iterations = ensemble.len();
        let Some(first) = ensemble.iterations.first() else {
            return Self {
                n_iterations,
                variables: Vec::new(),
                mean_final_distribution: Vec::new(),
            };
        };

        let variables = first
            .results
            .variable_names
            .iter()
            .map(|name| VariableSummary::from_samples(name, &ensemble.totals(name)))
            .collect();

        let mut mean_final_distribution = vec![0.0; first.results.state_names.len()];
        for it in &ensemble.iterations {
            for (acc, &p) in mean_final_distribution.iter_mut().zip(it.results.final_distribution()) {
                *acc += p;
            }
        }
        mean_final_distribution.iter_mut().for_each(|p| *p /= n_iterations as F);

        Self {
            n_iterations,
            variables,
            mean_final_distribution,
        }
    }

    pub fn variable(&self, name: &str) -> Option<&VariableSummary> {
        self.variables.iter().find(|v| v.name == name)
    }
}

/// Linear interpolation between closest ranks of an ascending slice
pub fn percentile(sorted: &[F], q: F) -> F {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as F;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as F;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}
