//! Generalized Advantage Estimation
//!
//! A single backward pass over one episode's rewards and value estimates.
//! Each step's advantage depends on its successor, so the recurrence cannot
//! be parallelized or reordered.

/// Compute per-step advantages and return targets.
///
/// `bootstrap_value` stands in for the value of the state following the last
/// transition; it is masked away whenever that transition was terminal.
///
/// delta[t] = r[t] + gamma * V[t+1] * (1 - done[t]) - V[t]
/// A[t]     = delta[t] + gamma * lambda * (1 - done[t]) * A[t+1]
/// G[t]     = A[t] + V[t]
pub fn compute_gae(
    rewards: &[f32],
    values: &[f32],
    dones: &[bool],
    bootstrap_value: f32,
    gamma: f32,
    lambda: f32,
) -> (Vec<f32>, Vec<f32>) {
    assert_eq!(rewards.len(), values.len());
    assert_eq!(rewards.len(), dones.len());

    let n = rewards.len();
    let mut advantages = vec![0.0f32; n];
    let mut gae = 0.0f32;

    for t in (0..n).rev() {
        let next_value = if t == n - 1 {
            bootstrap_value
        } else {
            values[t + 1]
        };
        let mask = if dones[t] { 0.0 } else { 1.0 };
        let delta = rewards[t] + gamma * next_value * mask - values[t];
        gae = delta + gamma * lambda * mask * gae;
        advantages[t] = gae;
    }

    let returns: Vec<f32> = advantages
        .iter()
        .zip(values.iter())
        .map(|(adv, val)| adv + val)
        .collect();

    (advantages, returns)
}
