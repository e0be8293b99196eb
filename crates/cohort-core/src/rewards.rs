use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ComputationError;
use crate::parameter::{Parameter, ParameterSampler};
use crate::F;

/// Named reward variables (cost, utility, ...) attached to a node or edge
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rewards(pub BTreeMap<String, Parameter>);

impl Rewards {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<Parameter>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    pub fn resample(&mut self, sampler: &mut dyn ParameterSampler) -> Result<(), ComputationError> {
        for param in self.0.values_mut() {
            param.resample(sampler)?;
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.0.values_mut().for_each(Parameter::reset);
    }
}

impl std::ops::Deref for Rewards {
    type Target = BTreeMap<String, Parameter>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<K: Into<String>, V: Into<Parameter>> FromIterator<(K, V)> for Rewards {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Rewards(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Accumulated numeric values per reward variable
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Outcomes(pub BTreeMap<String, F>);

impl Outcomes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every name starts at zero so tables stay rectangular
    pub fn zeroed<'a>(names: impl IntoIterator<Item = &'a String>) -> Self {
        Outcomes(names.into_iter().map(|n| (n.clone(), 0.0)).collect())
    }

    pub fn get(&self, name: &str) -> Option<F> {
        self.0.get(name).copied()
    }

    /// Add the current value of each reward
    pub fn add_rewards(&mut self, rewards: &Rewards) {
        for (name, param) in rewards.iter() {
            *self.0.entry(name.clone()).or_insert(0.0) += param.value();
        }
    }

    /// Add the current value of each reward, scaled by `weight`
    pub fn add_weighted_rewards(&mut self, rewards: &Rewards, weight: F) {
        for (name, param) in rewards.iter() {
            *self.0.entry(name.clone()).or_insert(0.0) += weight * param.value();
        }
    }

    pub fn add_weighted(&mut self, other: &Outcomes, weight: F) {
        for (name, value) in other.0.iter() {
            *self.0.entry(name.clone()).or_insert(0.0) += weight * value;
        }
    }

    pub fn scaled(&self, factor: F) -> Outcomes {
        Outcomes(self.0.iter().map(|(k, v)| (k.clone(), v * factor)).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &F)> {
        self.0.iter()
    }
}
