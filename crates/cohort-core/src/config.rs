use serde::{Deserialize, Serialize};

use crate::F;

/// Which share of a cycle's state mass is used to weight state rewards
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountingMethod {
    /// Mass at the start of the cycle, before transitions
    Start,
    /// Mass at the end of the cycle, after transitions
    End,
    /// Mean of start and end (half-cycle correction)
    #[default]
    Half,
}

impl CountingMethod {
    pub fn occupancy(self, start: F, end: F) -> F {
        match self {
            CountingMethod::Start => start,
            CountingMethod::End => end,
            CountingMethod::Half => 0.5 * (start + end),
        }
    }
}

/// Exponent used when discounting the outcomes of a zero-based cycle index
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountTiming {
    /// First cycle undiscounted: factor `(1 + r)^-cycle`
    #[default]
    FromCycleZero,
    /// First cycle already discounted: factor `(1 + r)^-(cycle + 1)`
    FromCycleOne,
}

impl DiscountTiming {
    pub fn exponent(self, cycle: usize) -> i32 {
        let offset = match self {
            DiscountTiming::FromCycleZero => 0,
            DiscountTiming::FromCycleOne => 1,
        };
        (cycle + offset) as i32
    }
}

/// Configuration for a single cohort run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub total_cycles: usize,
    pub counting: CountingMethod,
    pub discount_rate: F,
    pub discount_timing: DiscountTiming,
    pub tolerance: F,       // allowed deviation of fan-out and initial sums from 1
    pub use_parallel: bool, // forward states concurrently within a cycle
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            total_cycles: 1,
            counting: CountingMethod::Half,
            discount_rate: 0.0,
            discount_timing: DiscountTiming::FromCycleZero,
            tolerance: 1e-9,
            use_parallel: false,
        }
    }
}

impl RunConfig {
    pub fn new(total_cycles: usize, counting: CountingMethod, discount_rate: F) -> Self {
        Self { total_cycles, counting, discount_rate, ..Self::default() }
    }

    pub fn with_discount_timing(mut self, timing: DiscountTiming) -> Self {
        self.discount_timing = timing;
        self
    }

    pub fn with_tolerance(mut self, tolerance: F) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    /// Multiplicative discount factor for outcomes recorded at `cycle`
    pub fn discount_factor(&self, cycle: usize) -> F {
        if self.discount_rate == 0.0 {
            return 1.0;
        }
        (1.0 + self.discount_rate).powi(-self.discount_timing.exponent(cycle))
    }
}
