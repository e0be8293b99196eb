use serde::{Deserialize, Serialize};

use crate::error::ComputationError;
use crate::graph::SharedId;
use crate::parameter::{Parameter, ParameterSampler};
use crate::F;

/// Transition probability attached to a chance node or a state transition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Probability {
    Constant(F),
    /// Indexed by cycle; cycles past the end hold the last entry
    TimeVarying(Vec<Parameter>),
    Sampled(Parameter),
    /// `1 - sum(explicit siblings)` within the owning fan-out
    Complement,
    /// Entry of the model's shared table; every edge holding the same id
    /// reads the same realization
    Shared(SharedId),
}

impl Probability {
    pub fn schedule<I>(values: I) -> Self
    where
        I: IntoIterator<Item = F>,
    {
        Probability::TimeVarying(values.into_iter().map(Parameter::fixed).collect())
    }

    pub fn is_complement(&self) -> bool {
        matches!(self, Probability::Complement)
    }

    /// Length of a time-varying schedule, `None` for every other variant
    pub fn schedule_len(&self) -> Option<usize> {
        match self {
            Probability::TimeVarying(entries) => Some(entries.len()),
            _ => None,
        }
    }

    /// Value at `cycle`; a complement cannot be evaluated in isolation
    pub fn value(&self, cycle: usize) -> Result<F, ComputationError> {
        match self {
            Probability::Constant(p) => Ok(*p),
            Probability::TimeVarying(entries) => entries
                .get(cycle)
                .or_else(|| entries.last())
                .map(Parameter::value)
                .ok_or(ComputationError::EmptySchedule),
            Probability::Sampled(param) => Ok(param.value()),
            Probability::Complement => Err(ComputationError::UnresolvedComplement),
            Probability::Shared(id) => Err(ComputationError::UnresolvedShared { id: id.0 }),
        }
    }

    /// Redraw every sampled parameter this probability holds
    pub fn resample(&mut self, sampler: &mut dyn ParameterSampler) -> Result<(), ComputationError> {
        match self {
            Probability::Constant(_) | Probability::Complement | Probability::Shared(_) => Ok(()),
            Probability::Sampled(param) => param.resample(sampler),
            Probability::TimeVarying(entries) => {
                for entry in entries.iter_mut() {
                    entry.resample(sampler)?;
                }
                Ok(())
            }
        }
    }

    pub fn reset(&mut self) {
        match self {
            Probability::Sampled(param) => param.reset(),
            Probability::TimeVarying(entries) => entries.iter_mut().for_each(Parameter::reset),
            Probability::Constant(_) | Probability::Complement | Probability::Shared(_) => {}
        }
    }
}

impl From<F> for Probability {
    fn from(p: F) -> Self {
        Probability::Constant(p)
    }
}

impl From<SharedId> for Probability {
    fn from(id: SharedId) -> Self {
        Probability::Shared(id)
    }
}

impl From<Parameter> for Probability {
    fn from(param: Parameter) -> Self {
        if param.is_sampled() {
            Probability::Sampled(param)
        } else {
            Probability::Constant(param.value())
        }
    }
}

/// Evaluate one fan-out group at `cycle`, resolving its complement (if any)
/// against the explicit siblings.
///
/// `edges` pairs each probability with the name used in error reports; `owner`
/// names the node whose children these are. Shared entries must already be
/// resolved (see `Model::resolve`).
pub fn resolve_fan_out(
    owner: &str,
    edges: &[(&str, &Probability)],
    cycle: usize,
    tolerance: F,
) -> Result<Vec<F>, ComputationError> {
    let mut values = Vec::with_capacity(edges.len());
    let mut complement_at = None;
    let mut explicit_sum = 0.0;

    for (idx, (name, prob)) in edges.iter().enumerate() {
        if prob.is_complement() {
            if complement_at.is_some() {
                return Err(ComputationError::UnresolvedComplement);
            }
            complement_at = Some(idx);
            values.push(0.0);
            continue;
        }

        let value = prob.value(cycle)?;
        if !(0.0..=1.0).contains(&value) {
            return Err(ComputationError::ProbabilityOutOfRange {
                edge: name.to_string(),
                cycle,
                value,
            });
        }
        explicit_sum += value;
        values.push(value);
    }

    if let Some(idx) = complement_at {
        if explicit_sum > 1.0 + tolerance {
            return Err(ComputationError::ComplementOverflow {
                node: owner.to_string(),
                cycle,
                sum: explicit_sum,
            });
        }
        // Within tolerance a negative remainder is rounding noise
        values[idx] = (1.0 - explicit_sum).max(0.0);
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::tests::ScriptedSampler;

    #[test]
    fn test_schedule_holds_last_value() {
        let p = Probability::schedule([0.1, 0.2, 0.3]);
        assert_eq!(p.value(0).unwrap(), 0.1);
        assert_eq!(p.value(2).unwrap(), 0.3);
        assert_eq!(p.value(10).unwrap(), 0.3);
        assert_eq!(p.schedule_len(), Some(3));
    }

    #[test]
    fn test_empty_schedule_is_error() {
        let p = Probability::TimeVarying(Vec::new());
        assert_eq!(p.value(0), Err(ComputationError::EmptySchedule));
    }

    #[test]
    fn test_shared_needs_model() {
        let p = Probability::from(SharedId(3));
        assert_eq!(p.value(0), Err(ComputationError::UnresolvedShared { id: 3 }));
        assert_eq!(p.schedule_len(), None);
    }

    #[test]
    fn test_complement_needs_fan_out() {
        assert_eq!(Probability::Complement.value(0), Err(ComputationError::UnresolvedComplement));
    }

    #[test]
    fn test_resample_time_varying_entries() {
        let mut p = Probability::TimeVarying(vec![
            Parameter::uniform(0.1, 0.0, 0.2),
            Parameter::fixed(0.5),
            Parameter::uniform(0.3, 0.2, 0.4),
        ]);
        p.resample(&mut ScriptedSampler::new(vec![0.15, 0.35])).unwrap();
        assert_eq!(p.value(0).unwrap(), 0.15);
        assert_eq!(p.value(1).unwrap(), 0.5);
        assert_eq!(p.value(2).unwrap(), 0.35);

        p.reset();
        assert_eq!(p.value(0).unwrap(), 0.1);
    }

    #[test]
    fn test_resolve_fan_out_complement() {
        let a = Probability::Constant(0.2);
        let b = Probability::schedule([0.1, 0.3]);
        let c = Probability::Complement;
        let edges = [("a", &a), ("b", &b), ("c", &c)];

        let at0 = resolve_fan_out("node", &edges, 0, 1e-9).unwrap();
        assert_eq!(at0, vec![0.2, 0.1, 1.0 - (0.2 + 0.1)]);

        let at5 = resolve_fan_out("node", &edges, 5, 1e-9).unwrap();
        assert_eq!(at5[2], 1.0 - (0.2 + 0.3));
    }

    #[test]
    fn test_resolve_fan_out_overflow() {
        let a = Probability::Constant(0.7);
        let b = Probability::Constant(0.6);
        let c = Probability::Complement;
        let err = resolve_fan_out("sick", &[("a", &a), ("b", &b), ("c", &c)], 3, 1e-9).unwrap_err();
        assert!(matches!(err, ComputationError::ComplementOverflow { cycle: 3, .. }));
    }

    #[test]
    fn test_resolve_fan_out_rejects_out_of_range() {
        let a = Probability::Sampled(Parameter::sampled(1.2, crate::Distribution::Fixed));
        let err = resolve_fan_out("n", &[("a", &a)], 0, 1e-9).unwrap_err();
        assert!(matches!(err, ComputationError::ProbabilityOutOfRange { .. }));
    }
}
