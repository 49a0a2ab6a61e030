//! Observation construction
//!
//! A pure function of post-step arena state, regenerated every step. All
//! distances are normalized by the arena size, bullet velocities by a fixed
//! reference speed, and headings appear as (cos, sin) pairs so the policy
//! never sees a raw-angle discontinuity.
//!
//! Layout (58 floats):
//! - `[0..2)`   agent position
//! - `[2..6)`   agent hull and turret headings
//! - `[6]`      agent health
//! - `[7..12)`  opponent visibility, relative position, health, distance
//! - `[12..20)` eight wall-distance rays at 45-degree steps
//! - `[20..23)` relative exit vector and distance
//! - `[23..43)` reserved ally slots (five of four floats, zero in the arena;
//!   the full game populates them)
//! - `[43..55)` up to three bullets: relative position and velocity
//! - `[55..58)` opponent exit distance, blocking score, in-danger flag

use glam::Vec2;

use super::{TankArena, ARENA_SIZE, DANGER_RADIUS, MAX_HEALTH};

pub const OBS_DIM: usize = 58;
pub type Observation = [f32; OBS_DIM];

pub const RAY_COUNT: usize = 8;
pub const RAY_RANGE: f32 = 200.0;
pub(crate) const RAY_STEP: f32 = 5.0;

/// Reference speed used to normalize bullet velocities.
const BULLET_SPEED_SCALE: f32 = 500.0;

const ALLY_BLOCK_START: usize = 23;
const BULLET_BLOCK_START: usize = 43;
const TRACKED_BULLETS: usize = 3;

impl TankArena {
    pub fn observe(&self) -> Observation {
        let mut obs = [0.0f32; OBS_DIM];

        obs[0] = self.agent_pos.x / ARENA_SIZE;
        obs[1] = self.agent_pos.y / ARENA_SIZE;

        let hull = self.agent_rotation.to_radians();
        obs[2] = hull.cos();
        obs[3] = hull.sin();
        let turret = self.agent_turret.to_radians();
        obs[4] = turret.cos();
        obs[5] = turret.sin();

        obs[6] = self.agent_health / MAX_HEALTH;

        // The arena grants full knowledge of the opponent.
        obs[7] = 1.0;
        let rel_opponent = (self.opponent_pos - self.agent_pos) / ARENA_SIZE;
        obs[8] = rel_opponent.x;
        obs[9] = rel_opponent.y;
        obs[10] = self.opponent_health / MAX_HEALTH;
        obs[11] = self.opponent_pos.distance(self.agent_pos) / ARENA_SIZE;

        for i in 0..RAY_COUNT {
            let angle = (i as f32 * 45.0).to_radians();
            let direction = Vec2::new(angle.cos(), angle.sin());
            obs[12 + i] = self.raycast(self.agent_pos, direction, RAY_RANGE) / RAY_RANGE;
        }

        let rel_exit = (self.exit_pos - self.agent_pos) / ARENA_SIZE;
        obs[20] = rel_exit.x;
        obs[21] = rel_exit.y;
        obs[22] = self.exit_pos.distance(self.agent_pos) / ARENA_SIZE;

        // obs[23..43): ally block, already zero.
        debug_assert_eq!(ALLY_BLOCK_START + 20, BULLET_BLOCK_START);

        let mut idx = BULLET_BLOCK_START;
        for bullet in self.bullets.iter().take(TRACKED_BULLETS) {
            let rel = (bullet.pos - self.agent_pos) / ARENA_SIZE;
            obs[idx] = rel.x;
            obs[idx + 1] = rel.y;
            obs[idx + 2] = bullet.vel.x / BULLET_SPEED_SCALE;
            obs[idx + 3] = bullet.vel.y / BULLET_SPEED_SCALE;
            idx += 4;
        }

        obs[55] = self.opponent_pos.distance(self.exit_pos) / ARENA_SIZE;
        obs[56] = self.blocking_score();
        obs[57] = if self.agent_pos.distance(self.exit_pos) < DANGER_RADIUS {
            1.0
        } else {
            0.0
        };

        obs
    }
}
