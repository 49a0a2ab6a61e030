//! Neural network building blocks for the policy

pub mod orthogonal;
pub mod policy;

pub use orthogonal::orthogonal_linear;
pub use policy::{TacticalActorCritic, TacticalActorCriticConfig};
