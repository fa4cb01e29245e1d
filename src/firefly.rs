//! Bounded random-walk motion for the swarm of firefly point lights.
//!
//! Every light holds a per-axis velocity that is added to its position each
//! frame. A single countdown shared by the whole swarm re-rolls all velocities
//! at once, which turns into smooth multi-frame drifts instead of jitter. The
//! vertical coordinate never leaves [`VERTICAL_BAND`].
//!
//! The random source is a parameter so that tests can drive the walk with a
//! seeded generator; production passes `rand::rng()`.

use std::ops::RangeInclusive;

use glam::Vec3;
use rand::Rng;

use crate::lights::PointLight;

/// Number of fireflies in the swarm, the template light included.
pub const SWARM_SIZE: usize = 10;
/// Seconds between velocity re-rolls.
pub const REROLL_PERIOD_SECS: u64 = 3;
/// Allowed range of the vertical position component.
pub const VERTICAL_BAND: RangeInclusive<f32> = -5.0..=5.0;
/// Per-frame velocity components a re-roll can pick from.
pub const VELOCITY_STEPS: [f32; 5] = [-0.01, -0.005, 0.0, 0.005, 0.01];
/// Half extent of the box around the template light where the swarm spawns.
pub const SPAWN_RADIUS: f32 = 4.0;

/// Motion state for the swarm: one held velocity per light and the shared timer.
#[derive(Debug, Clone)]
pub struct FireflySwarm {
    velocities: Vec<Vec3>,
    clock: f64,
    next_reroll_secs: u64,
    rerolls: u64,
}

impl FireflySwarm {
    pub fn new(light_count: usize) -> Self {
        Self {
            velocities: vec![Vec3::ZERO; light_count],
            clock: 0.0,
            next_reroll_secs: 0,
            rerolls: 0,
        }
    }

    /// Grows `lights` to `count` copies of the template in `lights[0]`, each at a
    /// random position inside the spawn box around it.
    pub fn populate<R: Rng + ?Sized>(lights: &mut Vec<PointLight>, count: usize, rng: &mut R) {
        let template = lights.first().copied().unwrap_or_default();
        while lights.len() < count {
            let offset = Vec3::new(
                rng.random_range(-SPAWN_RADIUS..=SPAWN_RADIUS),
                rng.random_range(-SPAWN_RADIUS..=SPAWN_RADIUS),
                rng.random_range(-SPAWN_RADIUS..=SPAWN_RADIUS),
            );
            let mut position = template.position + offset;
            position.y = clamp_vertical(position.y);
            lights.push(template.with_position(position));
        }
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    /// How many times the shared timer has fired.
    pub fn rerolls(&self) -> u64 {
        self.rerolls
    }

    /// Advances the walk by one frame of `delta_time` seconds.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        lights: &mut [PointLight],
        delta_time: f32,
        rng: &mut R,
    ) {
        if self.velocities.len() != lights.len() {
            self.velocities.resize(lights.len(), Vec3::ZERO);
        }

        self.clock += f64::from(delta_time.max(0.0));
        let elapsed_secs = self.clock.floor() as u64;
        if elapsed_secs >= self.next_reroll_secs {
            self.reroll(lights, rng);
            self.next_reroll_secs = elapsed_secs + REROLL_PERIOD_SECS;
        }

        for (light, velocity) in lights.iter_mut().zip(self.velocities.iter_mut()) {
            light.position += *velocity;
            if !VERTICAL_BAND.contains(&light.position.y) {
                light.position.y = clamp_vertical(light.position.y);
                // Resting on the edge until the next re-roll.
                velocity.y = 0.0;
            }
        }
    }

    fn reroll<R: Rng + ?Sized>(&mut self, lights: &[PointLight], rng: &mut R) {
        for (velocity, light) in self.velocities.iter_mut().zip(lights) {
            let mut drawn = Vec3::new(draw_step(rng), draw_step(rng), draw_step(rng));
            if !VERTICAL_BAND.contains(&(light.position.y + drawn.y)) {
                drawn.y = 0.0;
            }
            *velocity = drawn;
        }
        self.rerolls += 1;
        log::trace!("firefly velocities re-rolled at t={:.2}s", self.clock);
    }
}

fn draw_step<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    VELOCITY_STEPS[rng.random_range(0..VELOCITY_STEPS.len())]
}

fn clamp_vertical(y: f32) -> f32 {
    y.clamp(*VERTICAL_BAND.start(), *VERTICAL_BAND.end())
}
