//! The background star layer: 8000 points with a per-point 1-D
//! velocity/acceleration pair and a slow constant yaw.

use rand::Rng;

pub const STAR_COUNT: usize = 8000;
pub const SPREAD: f32 = 300.0;
pub const ACCELERATION: f32 = 0.002;
pub const YAW_RATE: f32 = -0.001;

/// What the per-point velocity feeds into.
///
/// The original scene accumulates velocity every frame but never applies it
/// to the positions: the integration is visibly dead. That behavior is kept
/// as the default; `Advance` completes the (likely intended) fall-and-wrap
/// motion instead. The choice is explicit at construction, never silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integration {
    /// Velocity accumulates unboundedly; positions never move.
    Legacy,
    /// Positions fall along -Y by the accumulated velocity, wrapping back to
    /// the top of the volume when they leave it.
    Advance,
}

/// Flat star buffer: N point positions (3 scalars each) plus parallel
/// per-point velocity and acceleration sequences (1 scalar each).
#[derive(Debug, Clone)]
pub struct Starfield {
    positions: Vec<f32>,
    velocities: Vec<f32>,
    accelerations: Vec<f32>,
    yaw: f32,
    dirty: bool,
    integration: Integration,
}

impl Starfield {
    /// Samples `STAR_COUNT` points uniformly in `[-SPREAD, SPREAD)` on every
    /// axis, all starting at velocity 0 and acceleration `ACCELERATION`.
    pub fn new(rng: &mut impl Rng, integration: Integration) -> Self {
        let mut positions = Vec::with_capacity(STAR_COUNT * 3);
        for _ in 0..STAR_COUNT * 3 {
            positions.push(rng.random_range(-SPREAD..SPREAD));
        }
        Self {
            positions,
            velocities: vec![0.0; STAR_COUNT],
            accelerations: vec![ACCELERATION; STAR_COUNT],
            yaw: 0.0,
            dirty: true,
            integration,
        }
    }

    pub fn len(&self) -> usize {
        self.velocities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.velocities.is_empty()
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn velocities(&self) -> &[f32] {
        &self.velocities
    }

    pub fn accelerations(&self) -> &[f32] {
        &self.accelerations
    }

    /// Yaw of the whole layer, in radians.
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// One frame tick: accumulate acceleration into velocity for every point,
    /// advance positions when integration is enabled, yaw the layer, and mark
    /// the position buffer for re-upload.
    pub fn step(&mut self) {
        for (velocity, acceleration) in self.velocities.iter_mut().zip(&self.accelerations) {
            *velocity += *acceleration;
        }
        if self.integration == Integration::Advance {
            for (point, velocity) in self.positions.chunks_exact_mut(3).zip(&self.velocities) {
                point[1] = wrap_above_floor(point[1] - velocity);
            }
        }
        self.yaw += YAW_RATE;
        // Marked every frame regardless of whether positions changed.
        self.dirty = true;
    }

    /// Returns whether the position buffer needs a re-upload, clearing the
    /// flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

/// Wraps a fallen y coordinate back into `[-SPREAD, SPREAD)`. Velocity grows
/// without bound, so one frame can drop a point through the whole volume more
/// than once.
fn wrap_above_floor(y: f32) -> f32 {
    if y < -SPREAD {
        -SPREAD + (y + SPREAD).rem_euclid(2.0 * SPREAD)
    } else {
        y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn field(integration: Integration) -> Starfield {
        let mut rng = StdRng::seed_from_u64(7);
        Starfield::new(&mut rng, integration)
    }

    #[test]
    fn construction_samples_the_configured_volume() {
        let stars = field(Integration::Legacy);
        assert_eq!(stars.len(), STAR_COUNT);
        assert_eq!(stars.positions().len(), STAR_COUNT * 3);
        assert!(stars
            .positions()
            .iter()
            .all(|&c| (-SPREAD..SPREAD).contains(&c)));
        assert!(stars.velocities().iter().all(|&v| v == 0.0));
        assert!(stars.accelerations().iter().all(|&a| a == ACCELERATION));
    }

    #[test]
    fn velocity_grows_linearly_with_frames() {
        let mut stars = field(Integration::Legacy);
        let frames = 50;
        for _ in 0..frames {
            stars.step();
        }
        let expected = frames as f32 * ACCELERATION;
        assert!(stars
            .velocities()
            .iter()
            .all(|&v| (v - expected).abs() < 1e-6));
        assert_eq!(stars.len(), STAR_COUNT);
    }

    #[test]
    fn legacy_integration_never_moves_points() {
        let mut stars = field(Integration::Legacy);
        let before = stars.positions().to_vec();
        for _ in 0..100 {
            stars.step();
        }
        assert_eq!(stars.positions(), before.as_slice());
    }

    #[test]
    fn advance_integration_moves_points_down() {
        let mut stars = field(Integration::Advance);
        let before = stars.positions().to_vec();
        stars.step();
        // One frame: velocity == ACCELERATION, so every y drops (or wraps up).
        for (point, old) in stars.positions().chunks_exact(3).zip(before.chunks_exact(3)) {
            let moved = old[1] - point[1];
            assert!(moved > 0.0 || moved < -SPREAD);
        }
        assert!(stars
            .positions()
            .chunks_exact(3)
            .all(|p| p[1] >= -SPREAD));
    }

    #[test]
    fn wrap_handles_drops_larger_than_the_volume() {
        // A point can fall through the volume several times in one frame.
        let wrapped = wrap_above_floor(-SPREAD - 650.0);
        assert!((-SPREAD..SPREAD).contains(&wrapped));
        assert!((wrapped - 250.0).abs() < 1e-3);

        let wrapped = wrap_above_floor(-SPREAD - 0.5);
        assert!((wrapped - (SPREAD - 0.5)).abs() < 1e-3);

        assert_eq!(wrap_above_floor(12.0), 12.0);
    }

    #[test]
    fn layer_yaws_at_a_constant_rate() {
        let mut stars = field(Integration::Legacy);
        for _ in 0..10 {
            stars.step();
        }
        assert!((stars.yaw() - 10.0 * YAW_RATE).abs() < 1e-6);
    }

    #[test]
    fn dirty_flag_is_set_every_step() {
        let mut stars = field(Integration::Legacy);
        assert!(stars.take_dirty());
        assert!(!stars.take_dirty());
        stars.step();
        assert!(stars.take_dirty());
    }
}
