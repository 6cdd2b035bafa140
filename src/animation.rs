//! Per-frame animation state: orbital group rotations, per-instance spin and
//! the one-shot overlay fade.
//!
//! All deltas are per-frame constants, not time-scaled; the scene is
//! deliberately frame-rate-dependent, matching the original presentation.
//! Timed state takes `now` as an explicit argument so tests can replay frames
//! deterministically.

use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::scene::{NodeId, SceneGraph};

/// The five named groups that orbit or spin on a single fixed axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Group {
    Rocket,
    Moon,
    Planet,
    Sun,
    Ufo,
}

impl Group {
    pub const ALL: [Group; 5] = [
        Group::Rocket,
        Group::Moon,
        Group::Planet,
        Group::Sun,
        Group::Ufo,
    ];

    /// Constant rotation added to the group every frame, in radians.
    pub fn delta(self) -> Vec3 {
        match self {
            Group::Rocket => Vec3::new(0.0, 0.0, 0.0035),
            Group::Moon => Vec3::new(0.0005, 0.0, 0.0),
            Group::Planet => Vec3::new(0.0, 0.0, 0.001),
            Group::Sun => Vec3::new(-0.0006, 0.0, 0.0),
            Group::Ufo => Vec3::new(0.0, -0.007, 0.0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Group::Rocket => "rocket",
            Group::Moon => "moon",
            Group::Planet => "planet",
            Group::Sun => "sun",
            Group::Ufo => "ufo",
        }
    }
}

/// Scene-graph ids of the five animated groups.
#[derive(Debug, Clone, Copy)]
pub struct GroupBindings {
    pub rocket: NodeId,
    pub moon: NodeId,
    pub planet: NodeId,
    pub sun: NodeId,
    pub ufo: NodeId,
}

impl GroupBindings {
    pub fn id(&self, group: Group) -> NodeId {
        match group {
            Group::Rocket => self.rocket,
            Group::Moon => self.moon,
            Group::Planet => self.planet,
            Group::Sun => self.sun,
            Group::Ufo => self.ufo,
        }
    }
}

/// Adds each group's fixed angular delta to its node. One call per frame.
pub fn advance_orbits(scene: &mut SceneGraph, groups: &GroupBindings) {
    for group in Group::ALL {
        scene.node_mut(groups.id(group)).rotation += group.delta();
    }
}

/// Pairs a cloned decorative instance with its fixed angular velocity.
///
/// Velocity lives here rather than on the scene node: spin is simulation
/// state, not part of the node schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spinner {
    pub node: NodeId,
    pub velocity: Vec3,
}

/// Adds each spinner's velocity to its node's rotation. One call per frame.
pub fn advance_spins(scene: &mut SceneGraph, spinners: &[Spinner]) {
    for spinner in spinners {
        scene.node_mut(spinner.node).rotation += spinner.velocity;
    }
}

/// One-shot fade from transparent to opaque over a fixed wall-clock span.
///
/// Armed once when the overlay asset binds; never restarts, never decreases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeIn {
    started_at: Option<Duration>,
    duration: Duration,
}

impl FadeIn {
    pub const DURATION: Duration = Duration::from_millis(3700);

    pub fn new() -> Self {
        Self {
            started_at: None,
            duration: Self::DURATION,
        }
    }

    /// Captures the start timestamp. Later calls are ignored.
    pub fn arm(&mut self, now: Duration) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    pub fn is_armed(&self) -> bool {
        self.started_at.is_some()
    }

    /// Opacity at `now`: 0 before arming, `elapsed / duration` during the
    /// fade, pinned at exactly 1 afterwards.
    pub fn opacity(&self, now: Duration) -> f32 {
        let Some(start) = self.started_at else {
            return 0.0;
        };
        let elapsed = now.saturating_sub(start);
        if elapsed >= self.duration {
            1.0
        } else {
            elapsed.as_secs_f32() / self.duration.as_secs_f32()
        }
    }
}

impl Default for FadeIn {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneNode;

    fn bound_scene() -> (SceneGraph, GroupBindings) {
        let mut scene = SceneGraph::new();
        let planet = scene.insert_root(SceneNode::group("planet"));
        let rocket = scene.insert_child(planet, SceneNode::group("rocket"));
        let moon = scene.insert_child(planet, SceneNode::group("moon"));
        let sun = scene.insert_root(SceneNode::group("sun"));
        let ufo = scene.insert_root(SceneNode::group("ufo"));
        (
            scene,
            GroupBindings {
                rocket,
                moon,
                planet,
                sun,
                ufo,
            },
        )
    }

    #[test]
    fn orbit_axes_accumulate_linearly() {
        let (mut scene, groups) = bound_scene();
        let frames = 200;
        for _ in 0..frames {
            advance_orbits(&mut scene, &groups);
        }
        let t = frames as f32;
        assert!((scene.node(groups.rocket).rotation.z - t * 0.0035).abs() < 1e-4);
        assert!((scene.node(groups.moon).rotation.x - t * 0.0005).abs() < 1e-4);
        assert!((scene.node(groups.planet).rotation.z - t * 0.001).abs() < 1e-4);
        assert!((scene.node(groups.sun).rotation.x - t * -0.0006).abs() < 1e-4);
        assert!((scene.node(groups.ufo).rotation.y - t * -0.007).abs() < 1e-4);
    }

    #[test]
    fn orbit_leaves_other_axes_untouched() {
        let (mut scene, groups) = bound_scene();
        advance_orbits(&mut scene, &groups);
        let rocket = scene.node(groups.rocket).rotation;
        assert_eq!(rocket.x, 0.0);
        assert_eq!(rocket.y, 0.0);
    }

    #[test]
    fn spinners_accumulate_their_own_velocity() {
        let mut scene = SceneGraph::new();
        let a = scene.insert_root(SceneNode::group("a"));
        let b = scene.insert_root(SceneNode::group("b"));
        let spinners = vec![
            Spinner {
                node: a,
                velocity: Vec3::new(0.001, 0.002, 0.001),
            },
            Spinner {
                node: b,
                velocity: Vec3::new(0.003, 0.001, 0.004),
            },
        ];
        for _ in 0..100 {
            advance_spins(&mut scene, &spinners);
        }
        assert!((scene.node(a).rotation - Vec3::new(0.1, 0.2, 0.1)).length() < 1e-4);
        assert!((scene.node(b).rotation - Vec3::new(0.3, 0.1, 0.4)).length() < 1e-4);
    }

    #[test]
    fn fade_is_zero_until_armed() {
        let fade = FadeIn::new();
        assert_eq!(fade.opacity(Duration::from_secs(100)), 0.0);
    }

    #[test]
    fn fade_ramps_and_saturates() {
        let mut fade = FadeIn::new();
        let start = Duration::from_secs(5);
        fade.arm(start);
        assert_eq!(fade.opacity(start), 0.0);
        let half = start + FadeIn::DURATION / 2;
        assert!((fade.opacity(half) - 0.5).abs() < 1e-6);
        assert_eq!(fade.opacity(start + FadeIn::DURATION), 1.0);
        assert_eq!(fade.opacity(start + FadeIn::DURATION * 10), 1.0);
    }

    #[test]
    fn fade_cannot_be_rearmed() {
        let mut fade = FadeIn::new();
        fade.arm(Duration::from_secs(1));
        fade.arm(Duration::from_secs(9));
        // Still measured from the first arm.
        assert_eq!(fade.opacity(Duration::from_secs(1) + FadeIn::DURATION), 1.0);
    }

    #[test]
    fn fade_before_start_is_clamped() {
        let mut fade = FadeIn::new();
        fade.arm(Duration::from_secs(10));
        assert_eq!(fade.opacity(Duration::from_secs(3)), 0.0);
    }
}
