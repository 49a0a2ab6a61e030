//! Environment abstraction for episodic training
//!
//! An [`Environment`] owns all mutable simulation state and advances it one
//! step at a time. Agents only see the `State` snapshots it hands out, so the
//! same training code runs against any simulator that implements this trait.

use std::collections::hash_map::{Entry, HashMap};

/// Result of advancing an environment by one step
///
/// `state` is always the post-step observation, including on terminal steps
/// (the final observation is what the critic bootstraps from on truncation).
#[derive(Debug, Clone)]
pub struct Step<S, O> {
    /// Observation after the step was applied
    pub state: S,
    /// Scalar reward for the transition
    pub reward: f32,
    /// Whether the episode ended on this step
    pub done: bool,
    /// Terminal outcome tag, present iff `done`
    pub outcome: Option<O>,
}

/// A simulated environment with a fixed-length observation vector
pub trait Environment {
    /// Observation snapshot handed to the policy
    type State: Clone;
    /// Action consumed by [`Environment::step`]
    type Action;
    /// Terminal outcome tag reported when an episode ends
    type Outcome;

    /// Start a fresh episode and return the initial observation
    fn reset(&mut self) -> Self::State;

    /// Advance the simulation by one step
    fn step(&mut self, action: Self::Action) -> Step<Self::State, Self::Outcome>;

    /// Observation of the current (unstepped) state
    fn current_state(&self) -> Self::State;

    /// False once the episode has terminated or hit its step cap
    fn is_active(&self) -> bool;
}

/// Named per-episode metrics accumulated while an episode runs
///
/// Keys are registered up front so consumers can rely on every report from
/// the same environment carrying the same set of entries.
#[derive(Debug, Clone, Default)]
pub struct Report {
    values: HashMap<&'static str, f64>,
}

impl Report {
    pub fn new(keys: Vec<&'static str>) -> Self {
        Self {
            values: keys.into_iter().map(|k| (k, 0.0)).collect(),
        }
    }

    pub fn entry(&mut self, key: &'static str) -> Entry<'_, &'static str, f64> {
        self.values.entry(key)
    }

    pub fn get(&self, key: &str) -> f64 {
        self.values.get(key).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&&'static str, &f64)> {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_accumulates_registered_keys() {
        let mut report = Report::new(vec!["reward", "steps"]);
        report.entry("reward").and_modify(|x| *x += 1.5);
        report.entry("reward").and_modify(|x| *x += 1.0);
        assert_eq!(report.get("reward"), 2.5);
        assert_eq!(report.get("steps"), 0.0);
    }

    #[test]
    fn report_missing_key_reads_zero() {
        let report = Report::new(vec!["reward"]);
        assert_eq!(report.get("absent"), 0.0);
    }
}
