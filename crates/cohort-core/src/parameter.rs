use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ComputationError;
use crate::F;

/// Distribution family a parameter is drawn from during PSA
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Distribution {
    /// Never resampled; the estimate is always used
    Fixed,
    Uniform { low: F, high: F },
    Beta { alpha: F, beta: F },
    /// Realized as the proportion of successes, `k / trials`
    Binomial { trials: u64, p: F },
    Gamma { shape: F, scale: F },
    Normal { mean: F, std_dev: F },
    LogNormal { mu: F, sigma: F },
}

impl Distribution {
    pub fn is_fixed(&self) -> bool {
        matches!(self, Distribution::Fixed)
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distribution::Fixed => write!(f, "fixed"),
            Distribution::Uniform { low, high } => write!(f, "uniform({low}, {high})"),
            Distribution::Beta { alpha, beta } => write!(f, "beta({alpha}, {beta})"),
            Distribution::Binomial { trials, p } => write!(f, "binomial({trials}, {p})"),
            Distribution::Gamma { shape, scale } => write!(f, "gamma({shape}, {scale})"),
            Distribution::Normal { mean, std_dev } => write!(f, "normal({mean}, {std_dev})"),
            Distribution::LogNormal { mu, sigma } => write!(f, "lognormal({mu}, {sigma})"),
        }
    }
}

/// Source of random draws for parameter resampling.
///
/// The engine never constructs random numbers itself; PSA drivers hand in an
/// implementation (see `cohort-sampler`), tests hand in deterministic stubs.
pub trait ParameterSampler {
    fn draw(&mut self, distribution: &Distribution) -> Result<F, ComputationError>;
}

/// A model input with a point estimate and an optional sampled realization
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub estimate: F,
    pub distribution: Distribution,
    realization: Option<F>,
}

impl Parameter {
    pub fn fixed(value: F) -> Self {
        Self { estimate: value, distribution: Distribution::Fixed, realization: None }
    }

    pub fn sampled(estimate: F, distribution: Distribution) -> Self {
        Self { estimate, distribution, realization: None }
    }

    pub fn uniform(estimate: F, low: F, high: F) -> Self {
        Self::sampled(estimate, Distribution::Uniform { low, high })
    }

    pub fn beta(estimate: F, alpha: F, beta: F) -> Self {
        Self::sampled(estimate, Distribution::Beta { alpha, beta })
    }

    pub fn gamma(estimate: F, shape: F, scale: F) -> Self {
        Self::sampled(estimate, Distribution::Gamma { shape, scale })
    }

    /// Current value: the last realization, or the estimate before any draw
    pub fn value(&self) -> F {
        self.realization.unwrap_or(self.estimate)
    }

    pub fn realization(&self) -> Option<F> {
        self.realization
    }

    pub fn is_sampled(&self) -> bool {
        !self.distribution.is_fixed()
    }

    /// Draw and pin a new realization; fixed parameters are left untouched
    pub fn resample(&mut self, sampler: &mut dyn ParameterSampler) -> Result<(), ComputationError> {
        if self.distribution.is_fixed() {
            return Ok(());
        }
        let draw = sampler.draw(&self.distribution)?;
        if !draw.is_finite() {
            return Err(ComputationError::InvalidDistribution {
                distribution: self.distribution.to_string(),
                reason: format!("draw produced non-finite value {draw}"),
            });
        }
        self.realization = Some(draw);
        Ok(())
    }

    /// Drop the realization and fall back to the estimate
    pub fn reset(&mut self) {
        self.realization = None;
    }
}

impl From<F> for Parameter {
    fn from(value: F) -> Self {
        Parameter::fixed(value)
    }
}
