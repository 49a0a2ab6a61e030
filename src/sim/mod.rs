//! Tank arena environment
//!
//! A 1000x1000 arena with one exit zone, one learned agent tank, one scripted
//! opponent tank, and a handful of rectangular walls. The opponent tries to
//! reach the exit; the agent is rewarded for destroying it, for holding an
//! interposing position between it and the exit, and heavily penalized for
//! ever entering the exit zone itself.
//!
//! All randomness flows through one `Pcg64` seeded at construction, so a
//! fixed seed plus a fixed action sequence reproduces an episode bit for bit.

pub mod observation;
pub mod opponent;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use crate::env::{Environment, Report, Step};
use self::observation::Observation;
use self::opponent::{GoalRunner, OpponentCommand, OpponentStrategy, OpponentView};

pub const ARENA_SIZE: f32 = 1000.0;
pub const EXIT_RADIUS: f32 = 50.0;
/// Outside the exit zone proper, proximity already incurs a smooth penalty.
pub const DANGER_RADIUS: f32 = 100.0;
pub const MAX_HEALTH: f32 = 100.0;

const DT: f32 = 0.016;
const AGENT_SPEED: f32 = 150.0;
const OPPONENT_SPEED: f32 = 130.0;
const BULLET_SPEED: f32 = 400.0;
const BULLET_LIFETIME: f32 = 2.0;
const BULLET_HIT_RADIUS: f32 = 25.0;
const BULLET_DAMAGE: f32 = 25.0;
const AGENT_COOLDOWN: f32 = 0.5;
const OPPONENT_COOLDOWN: f32 = 0.7;
const TANK_RADIUS: f32 = 20.0;
const WALL_PENALTY_RADIUS: f32 = 30.0;
const DEFAULT_MAX_STEPS: u32 = 1000;

/// Action layout: [move x, move y, turret (0..1 of a full turn), fire, ability]
pub const ACTION_DIM: usize = 5;
pub type ArenaAction = [f32; ACTION_DIM];

/// How an episode ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Opponent destroyed
    Won,
    /// Agent destroyed
    Died,
    /// Opponent reached the exit zone
    OpponentEscaped,
    /// Agent entered the exit zone (hard-constraint violation)
    TouchedExit,
    /// Step cap reached without a terminal event
    Timeout,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Won => "ai_won",
            Outcome::Died => "ai_died",
            Outcome::OpponentEscaped => "player_escaped",
            Outcome::TouchedExit => "agent_touched_exit",
            Outcome::Timeout => "timeout",
        }
    }
}

/// Axis-aligned rectangular wall
#[derive(Debug, Clone, Copy)]
pub struct Wall {
    min: Vec2,
    size: Vec2,
}

impl Wall {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x
            && p.x <= self.min.x + self.size.x
            && p.y >= self.min.y
            && p.y <= self.min.y + self.size.y
    }

    fn contains_inflated(&self, p: Vec2, radius: f32) -> bool {
        p.x >= self.min.x - radius
            && p.x <= self.min.x + self.size.x + radius
            && p.y >= self.min.y - radius
            && p.y <= self.min.y + self.size.y + radius
    }

    fn overlaps(&self, other: &Wall) -> bool {
        self.min.x <= other.min.x + other.size.x
            && other.min.x <= self.min.x + self.size.x
            && self.min.y <= other.min.y + other.size.y
            && other.min.y <= self.min.y + self.size.y
    }

    fn center(&self) -> Vec2 {
        self.min + self.size * 0.5
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shooter {
    Agent,
    Opponent,
}

#[derive(Debug, Clone, Copy)]
struct Bullet {
    pos: Vec2,
    vel: Vec2,
    owner: Shooter,
    lifetime: f32,
}

/// The arena simulator
pub struct TankArena {
    rng: Pcg64,
    exit_pos: Vec2,
    agent_pos: Vec2,
    agent_rotation: f32,
    agent_turret: f32,
    agent_health: f32,
    opponent_pos: Vec2,
    opponent_rotation: f32,
    opponent_health: f32,
    walls: Vec<Wall>,
    bullets: Vec<Bullet>,
    agent_cooldown: f32,
    opponent_cooldown: f32,
    step_count: u32,
    max_steps: u32,
    active: bool,
    opponent: Box<dyn OpponentStrategy>,
    pub report: Report,
}

impl TankArena {
    pub fn new(seed: u64) -> Self {
        Self::with_max_steps(seed, DEFAULT_MAX_STEPS)
    }

    pub fn with_max_steps(seed: u64, max_steps: u32) -> Self {
        let mut arena = Self {
            rng: Pcg64::seed_from_u64(seed),
            exit_pos: Vec2::ZERO,
            agent_pos: Vec2::ZERO,
            agent_rotation: 0.0,
            agent_turret: 0.0,
            agent_health: MAX_HEALTH,
            opponent_pos: Vec2::ZERO,
            opponent_rotation: 0.0,
            opponent_health: MAX_HEALTH,
            walls: Vec::new(),
            bullets: Vec::new(),
            agent_cooldown: 0.0,
            opponent_cooldown: 0.0,
            step_count: 0,
            max_steps,
            active: false,
            opponent: Box::new(GoalRunner::default()),
            report: Report::new(vec!["reward", "steps"]),
        };
        arena.reset();
        arena
    }

    /// Swap in a different scripted opponent.
    pub fn with_opponent(mut self, opponent: Box<dyn OpponentStrategy>) -> Self {
        self.opponent = opponent;
        self
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    fn in_bounds(p: Vec2) -> bool {
        p.x >= 0.0 && p.x <= ARENA_SIZE && p.y >= 0.0 && p.y <= ARENA_SIZE
    }

    /// A tank center may occupy `p` only if the inflated footprint stays
    /// inside the arena and outside every wall.
    fn position_clear(&self, p: Vec2, radius: f32) -> bool {
        if p.x < radius || p.x > ARENA_SIZE - radius || p.y < radius || p.y > ARENA_SIZE - radius {
            return false;
        }
        !self.walls.iter().any(|w| w.contains_inflated(p, radius))
    }

    fn min_wall_distance(&self, p: Vec2) -> f32 {
        let mut min_dist = p
            .x
            .min(p.y)
            .min(ARENA_SIZE - p.x)
            .min(ARENA_SIZE - p.y);
        for wall in &self.walls {
            let dist = p.distance(wall.center()) - wall.size.x.max(wall.size.y) * 0.5;
            min_dist = min_dist.min(dist);
        }
        min_dist.max(0.0)
    }

    /// March a ray outward in fixed increments, stopping at the first
    /// out-of-bounds point or wall hit. Never overshoots the true distance.
    pub(crate) fn raycast(&self, origin: Vec2, direction: Vec2, max_dist: f32) -> f32 {
        let mut dist = 0.0;
        while dist < max_dist {
            let p = origin + direction * dist;
            if !Self::in_bounds(p) {
                return dist;
            }
            if self.walls.iter().any(|w| w.contains(p)) {
                return dist;
            }
            dist += observation::RAY_STEP;
        }
        max_dist
    }

    /// True when the agent sits between the opponent and the exit: closer to
    /// the opponent than the exit is, and projected onto the middle of the
    /// opponent-to-exit line.
    pub(crate) fn is_blocking(&self) -> bool {
        let to_exit = self.exit_pos - self.opponent_pos;
        let to_agent = self.agent_pos - self.opponent_pos;
        let exit_dist = to_exit.length();
        let agent_dist = to_agent.length();

        if agent_dist < exit_dist * 0.8 {
            let t = to_agent.dot(to_exit) / (exit_dist * exit_dist);
            if t > 0.2 && t < 0.9 {
                return true;
            }
        }
        false
    }

    /// Continuous interposition quality in [0, 1]: distance to an ideal point
    /// on the opponent-to-exit line, kept outside the danger annulus, with
    /// urgency doubling once the opponent is within 200 of the exit.
    pub(crate) fn blocking_score(&self) -> f32 {
        let to_exit = self.exit_pos - self.opponent_pos;
        let exit_dist = to_exit.length();
        if exit_dist < 10.0 {
            return 0.0;
        }

        let t = ((exit_dist - 50.0) / exit_dist).clamp(0.3, 0.7);
        let mut ideal = self.opponent_pos + to_exit * t;

        let ideal_exit_dist = ideal.distance(self.exit_pos);
        if ideal_exit_dist < DANGER_RADIUS {
            let direction = (ideal - self.exit_pos) / (ideal_exit_dist + 1e-3);
            ideal = self.exit_pos + direction * DANGER_RADIUS;
        }

        let mut score = (1.0 - self.agent_pos.distance(ideal) / 300.0).max(0.0);
        if exit_dist < 200.0 {
            score *= 2.0;
        }
        score.min(1.0)
    }

    fn spawn_bullet(&mut self, pos: Vec2, direction: Vec2, owner: Shooter) {
        self.bullets.push(Bullet {
            pos,
            vel: direction * BULLET_SPEED,
            owner,
            lifetime: BULLET_LIFETIME,
        });
    }

    /// Advance every bullet and resolve removals in hit -> wall -> lifetime
    /// -> bounds order. Damage clamps health into [0, MAX_HEALTH].
    fn advance_bullets(&mut self) {
        let mut kept = Vec::with_capacity(self.bullets.len());
        let mut dealt = 0.0;
        let mut taken = 0.0;

        for mut bullet in self.bullets.drain(..) {
            bullet.pos += bullet.vel * DT;
            bullet.lifetime -= DT;

            match bullet.owner {
                Shooter::Agent if bullet.pos.distance(self.opponent_pos) < BULLET_HIT_RADIUS => {
                    dealt += BULLET_DAMAGE;
                    continue;
                }
                Shooter::Opponent if bullet.pos.distance(self.agent_pos) < BULLET_HIT_RADIUS => {
                    taken += BULLET_DAMAGE;
                    continue;
                }
                _ => {}
            }

            if self.walls.iter().any(|w| w.contains(bullet.pos)) {
                continue;
            }
            if bullet.lifetime <= 0.0 {
                continue;
            }
            if !Self::in_bounds(bullet.pos) {
                continue;
            }
            kept.push(bullet);
        }

        self.bullets = kept;
        self.opponent_health = (self.opponent_health - dealt).clamp(0.0, MAX_HEALTH);
        self.agent_health = (self.agent_health - taken).clamp(0.0, MAX_HEALTH);
    }

    fn finish(&mut self, reward: f32, outcome: Outcome) -> Step<Observation, Outcome> {
        self.active = false;
        self.report.entry("reward").and_modify(|x| *x += reward as f64);
        self.report
            .entry("steps")
            .and_modify(|x| *x = self.step_count as f64);
        Step {
            state: self.observe(),
            reward,
            done: true,
            outcome: Some(outcome),
        }
    }
}

impl Environment for TankArena {
    type State = Observation;
    type Action = ArenaAction;
    type Outcome = Outcome;

    fn reset(&mut self) -> Observation {
        let margin = 100.0;
        self.exit_pos = match self.rng.gen_range(0..4) {
            0 => Vec2::new(self.rng.gen_range(margin..ARENA_SIZE - margin), margin),
            1 => Vec2::new(
                self.rng.gen_range(margin..ARENA_SIZE - margin),
                ARENA_SIZE - margin,
            ),
            2 => Vec2::new(margin, self.rng.gen_range(margin..ARENA_SIZE - margin)),
            _ => Vec2::new(
                ARENA_SIZE - margin,
                self.rng.gen_range(margin..ARENA_SIZE - margin),
            ),
        };

        // Agent far from the exit, opponent far from both.
        loop {
            self.agent_pos = Vec2::new(
                self.rng.gen_range(200.0..ARENA_SIZE - 200.0),
                self.rng.gen_range(200.0..ARENA_SIZE - 200.0),
            );
            if self.agent_pos.distance(self.exit_pos) > 300.0 {
                break;
            }
        }
        loop {
            self.opponent_pos = Vec2::new(
                self.rng.gen_range(150.0..ARENA_SIZE - 150.0),
                self.rng.gen_range(150.0..ARENA_SIZE - 150.0),
            );
            if self.opponent_pos.distance(self.agent_pos) > 200.0
                && self.opponent_pos.distance(self.exit_pos) > 200.0
            {
                break;
            }
        }

        self.agent_health = MAX_HEALTH;
        self.opponent_health = MAX_HEALTH;
        self.agent_rotation = self.rng.gen_range(0.0..360.0);
        self.agent_turret = self.rng.gen_range(0.0..360.0);
        self.opponent_rotation = self.rng.gen_range(0.0..360.0);

        self.walls.clear();
        let wall_count = self.rng.gen_range(3..=8);
        for _ in 0..wall_count {
            let w = self.rng.gen_range(30.0..100.0);
            let h = self.rng.gen_range(30.0..100.0);
            let cx = self.rng.gen_range(150.0..ARENA_SIZE - 150.0);
            let cy = self.rng.gen_range(150.0..ARENA_SIZE - 150.0);
            let candidate = Wall::new(cx - w * 0.5, cy - h * 0.5, w, h);
            // Walls may neither crowd the exit nor overlap each other.
            if candidate.center().distance(self.exit_pos) <= 150.0 {
                continue;
            }
            if self.walls.iter().any(|wall| wall.overlaps(&candidate)) {
                continue;
            }
            self.walls.push(candidate);
        }

        self.bullets.clear();
        self.agent_cooldown = 0.0;
        self.opponent_cooldown = 0.0;
        self.step_count = 0;
        self.active = true;
        self.report = Report::new(vec!["reward", "steps"]);

        self.observe()
    }

    fn step(&mut self, action: ArenaAction) -> Step<Observation, Outcome> {
        self.step_count += 1;

        let old_agent_pos = self.agent_pos;
        let old_opponent_pos = self.opponent_pos;
        let old_agent_health = self.agent_health;
        let old_opponent_health = self.opponent_health;
        let old_opponent_exit_dist = self.opponent_pos.distance(self.exit_pos);

        // Agent movement. Intent above unit length is normalized, never
        // amplified; an invalid destination leaves the tank in place.
        let mut intent = Vec2::new(action[0], action[1]);
        let intent_len = intent.length();
        if intent_len > 1.0 {
            intent /= intent_len;
        }
        let destination = self.agent_pos + intent * AGENT_SPEED * DT;
        if self.position_clear(destination, TANK_RADIUS) {
            self.agent_pos = destination;
            if intent_len > 0.1 {
                self.agent_rotation = intent.y.atan2(intent.x).to_degrees();
            }
        }
        self.agent_turret = action[2] * 360.0;

        // Agent fire.
        self.agent_cooldown = (self.agent_cooldown - DT).max(0.0);
        if action[3] > 0.5 && self.agent_cooldown <= 0.0 {
            let heading = self.agent_turret.to_radians();
            let direction = Vec2::new(heading.cos(), heading.sin());
            self.spawn_bullet(self.agent_pos, direction, Shooter::Agent);
            self.agent_cooldown = AGENT_COOLDOWN;
        }

        // Scripted opponent.
        self.opponent_cooldown = (self.opponent_cooldown - DT).max(0.0);
        let view = OpponentView {
            pos: self.opponent_pos,
            agent_pos: self.agent_pos,
            exit_pos: self.exit_pos,
            cooldown: self.opponent_cooldown,
        };
        let OpponentCommand { movement, fire_at } = self.opponent.decide(&view, &mut self.rng);

        let mut opponent_move = movement;
        let move_len = opponent_move.length();
        if move_len > 1.0 {
            opponent_move /= move_len;
        }
        let destination = self.opponent_pos + opponent_move * OPPONENT_SPEED * DT;
        if self.position_clear(destination, TANK_RADIUS) {
            self.opponent_pos = destination;
            self.opponent_rotation = opponent_move.y.atan2(opponent_move.x).to_degrees();
        }
        if let Some(direction) = fire_at {
            self.spawn_bullet(self.opponent_pos, direction, Shooter::Opponent);
            self.opponent_cooldown = OPPONENT_COOLDOWN;
        }

        self.advance_bullets();

        // Terminal checks, in priority order. The exit-zone violation must
        // dominate every other signal, including a simultaneous kill.
        let agent_exit_dist = self.agent_pos.distance(self.exit_pos);
        let opponent_exit_dist = self.opponent_pos.distance(self.exit_pos);

        if agent_exit_dist < EXIT_RADIUS {
            return self.finish(-500.0, Outcome::TouchedExit);
        }
        if opponent_exit_dist < EXIT_RADIUS {
            return self.finish(-400.0, Outcome::OpponentEscaped);
        }
        if self.opponent_health <= 0.0 {
            return self.finish(300.0, Outcome::Won);
        }
        if self.agent_health <= 0.0 {
            return self.finish(-150.0, Outcome::Died);
        }

        // Shaping terms.
        let mut reward = 0.0;

        if agent_exit_dist < DANGER_RADIUS {
            reward += -3.0 * (1.0 - agent_exit_dist / DANGER_RADIUS);
        }

        let damage_dealt = old_opponent_health - self.opponent_health;
        if damage_dealt > 0.0 {
            reward += damage_dealt * 5.0 / BULLET_DAMAGE;
        }
        let damage_taken = old_agent_health - self.agent_health;
        if damage_taken > 0.0 {
            reward -= damage_taken * 2.0 / BULLET_DAMAGE;
        }

        let exit_progress = old_opponent_exit_dist - opponent_exit_dist;
        if exit_progress > 0.0 {
            if self.is_blocking() {
                reward += 2.0;
            }
        } else if exit_progress < 0.0 {
            reward += 1.0;
        }

        reward += self.blocking_score() * 1.5;

        if agent_exit_dist > DANGER_RADIUS {
            let old_gap = old_agent_pos.distance(old_opponent_pos);
            let new_gap = self.agent_pos.distance(self.opponent_pos);
            if new_gap < old_gap {
                reward += 0.5 * (old_gap - new_gap) / 100.0;
            }
        }

        reward += 0.02;

        if self.min_wall_distance(self.agent_pos) < WALL_PENALTY_RADIUS {
            reward -= 0.3;
        }

        if self.step_count >= self.max_steps {
            if self.opponent_health < self.agent_health {
                reward += 50.0;
            }
            if opponent_exit_dist > 300.0 {
                reward += 30.0;
            }
            return self.finish(reward, Outcome::Timeout);
        }

        self.report.entry("reward").and_modify(|x| *x += reward as f64);
        self.report
            .entry("steps")
            .and_modify(|x| *x = self.step_count as f64);

        Step {
            state: self.observe(),
            reward,
            done: false,
            outcome: None,
        }
    }

    fn current_state(&self) -> Observation {
        self.observe()
    }

    fn is_active(&self) -> bool {
        self.active && self.step_count < self.max_steps
    }
}

#[cfg(test)]
mod tests {
    use super::observation::OBS_DIM;
    use super::*;

    const NOOP: ArenaAction = [0.0; ACTION_DIM];

    /// Reproducible arena with a known, empty layout.
    fn bare_arena(seed: u64) -> TankArena {
        let mut arena = TankArena::new(seed);
        arena.walls.clear();
        arena.bullets.clear();
        arena.exit_pos = Vec2::new(100.0, 500.0);
        arena.agent_pos = Vec2::new(800.0, 500.0);
        arena.opponent_pos = Vec2::new(500.0, 200.0);
        arena
    }

    #[test]
    fn identical_seeds_reproduce_observations_bitwise() {
        let mut a = TankArena::new(42);
        let mut b = TankArena::new(42);
        let action: ArenaAction = [0.3, -0.2, 0.25, 0.0, 0.0];

        let oa = a.reset();
        let ob = b.reset();
        assert_eq!(oa.map(f32::to_bits), ob.map(f32::to_bits));

        for _ in 0..60 {
            let sa = a.step(action);
            let sb = b.step(action);
            assert_eq!(sa.state.map(f32::to_bits), sb.state.map(f32::to_bits));
            assert_eq!(sa.reward.to_bits(), sb.reward.to_bits());
            assert_eq!(sa.done, sb.done);
            if sa.done {
                break;
            }
        }
    }

    #[test]
    fn damage_never_drives_health_negative() {
        let mut arena = bare_arena(1);
        arena.agent_health = 10.0;
        arena.bullets.push(Bullet {
            pos: arena.agent_pos,
            vel: Vec2::ZERO,
            owner: Shooter::Opponent,
            lifetime: 1.0,
        });

        let step = arena.step(NOOP);
        assert_eq!(arena.agent_health, 0.0);
        assert!(step.done);
        assert_eq!(step.outcome, Some(Outcome::Died));
        assert_eq!(step.reward, -150.0);
    }

    #[test]
    fn exit_violation_dominates_simultaneous_kill() {
        let mut arena = bare_arena(2);
        // Both terminal conditions hold after this step; the hard constraint
        // must win.
        arena.agent_pos = arena.exit_pos + Vec2::new(10.0, 0.0);
        arena.opponent_health = 0.0;

        let step = arena.step(NOOP);
        assert!(step.done);
        assert_eq!(step.outcome, Some(Outcome::TouchedExit));
        assert_eq!(step.reward, -500.0);
    }

    #[test]
    fn agent_inside_exit_zone_ends_episode() {
        let mut arena = bare_arena(3);
        arena.agent_pos = arena.exit_pos + Vec2::new(40.0, 0.0);

        let step = arena.step(NOOP);
        assert!(step.done);
        assert_eq!(step.reward, -500.0);
        assert_eq!(step.outcome.unwrap().as_str(), "agent_touched_exit");
    }

    #[test]
    fn single_killing_hit_wins_with_exact_reward() {
        let mut arena = bare_arena(4);
        arena.opponent_health = 25.0;
        arena.bullets.push(Bullet {
            pos: arena.opponent_pos,
            vel: Vec2::ZERO,
            owner: Shooter::Agent,
            lifetime: 1.0,
        });

        let step = arena.step(NOOP);
        assert!(step.done);
        assert_eq!(step.reward, 300.0);
        assert_eq!(step.outcome.unwrap().as_str(), "ai_won");
    }

    #[test]
    fn opponent_reaching_exit_ends_episode() {
        let mut arena = bare_arena(5);
        arena.opponent_pos = arena.exit_pos + Vec2::new(30.0, 0.0);

        let step = arena.step(NOOP);
        assert!(step.done);
        assert_eq!(step.outcome, Some(Outcome::OpponentEscaped));
        assert_eq!(step.reward, -400.0);
    }

    #[test]
    fn step_cap_times_out() {
        let mut arena = bare_arena(6);
        arena.step_count = arena.max_steps - 1;

        let step = arena.step(NOOP);
        assert!(step.done);
        assert_eq!(step.outcome, Some(Outcome::Timeout));
        assert!(!arena.is_active());
    }

    #[test]
    fn blocked_move_leaves_agent_in_place() {
        let mut arena = bare_arena(7);
        arena.agent_pos = Vec2::new(500.0, 500.0);
        arena.walls.push(Wall::new(495.0, 480.0, 40.0, 40.0));

        let before = arena.agent_pos;
        arena.step([1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(arena.agent_pos, before);
    }

    #[test]
    fn raycast_stops_at_wall_edge() {
        let mut arena = bare_arena(8);
        arena.agent_pos = Vec2::new(400.0, 500.0);
        arena.walls.push(Wall::new(500.0, 480.0, 40.0, 40.0));

        let dist = arena.raycast(arena.agent_pos, Vec2::new(1.0, 0.0), 200.0);
        assert!(dist <= 100.0, "ray overshot the wall edge: {dist}");
    }

    #[test]
    fn raycast_returns_max_range_in_open_space() {
        let mut arena = bare_arena(9);
        arena.agent_pos = Vec2::new(500.0, 500.0);
        let dist = arena.raycast(arena.agent_pos, Vec2::new(0.0, 1.0), 200.0);
        assert_eq!(dist, 200.0);
    }

    #[test]
    fn reset_respects_separation_constraints() {
        for seed in 0..20 {
            let mut arena = TankArena::new(seed);
            arena.reset();
            assert!(arena.agent_pos.distance(arena.exit_pos) > 300.0);
            assert!(arena.opponent_pos.distance(arena.agent_pos) > 200.0);
            assert!(arena.opponent_pos.distance(arena.exit_pos) > 200.0);
            assert!(arena.walls.len() <= 8);
            for (i, a) in arena.walls.iter().enumerate() {
                assert!(a.center().distance(arena.exit_pos) > 150.0);
                for b in arena.walls.iter().skip(i + 1) {
                    assert!(!a.overlaps(b), "walls overlap after reset");
                }
            }
        }
    }

    #[test]
    fn observation_has_fixed_length() {
        let mut arena = TankArena::new(10);
        let obs = arena.reset();
        assert_eq!(obs.len(), OBS_DIM);
    }
}
