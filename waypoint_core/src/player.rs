//! The path player: drives an actor toward waypoints, one per arrival.
//!
//! # States
//!
//! ```text
//!  NotYetMaterialized ──first target (teleport)──► SeekingAdHoc / SeekingPath
//!
//!  Idle ──force_move_to──► SeekingAdHoc ──arrive──► Idle (keeps last target)
//!    │                          ▲
//!    │ start_playback           │ force_move_to
//!    ▼                          │
//!  SeekingPath{k} ──arrive, k < last──► SeekingPath{k+1}
//!  SeekingPath{last} ──arrive──► Idle
//! ```
//!
//! Every tick moves the actor by at most `max_step` toward the target and
//! turns it by at most `turn_speed * dt` radians.

use crate::actor::Actor;
use crate::pose::Pose;
use crate::waypoint_path::WaypointPath;
use nalgebra::{Point3, UnitQuaternion, Vector3};
use std::f64::consts::PI;
use serde::{Deserialize, Serialize};

/// Below this length a direction is considered undefined.
const DIRECTION_EPS: f64 = 1e-9;

/// Tuning for a [`PathPlayer`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Maximum turn rate in radians per second (default: 20)
    pub turn_speed: f64,
    
    /// Distance under which a target counts as reached (default: 0.1)
    pub arrival_threshold: f64,
    
    /// Longest translation computed per tick (default: 1.0)
    pub max_step: f64,
    
    /// Scale applied to the capped translation when it is committed
    /// (default: 1.0). Stands in for the walk animation's root-motion
    /// length per tick.
    pub stride: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            turn_speed: 20.0,
            arrival_threshold: 0.1,
            max_step: 1.0,
            stride: 1.0,
        }
    }
}

/// Where the player is in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    /// Never given a target; the actor has not been placed yet
    NotYetMaterialized,
    
    /// No path being followed
    Idle,
    
    /// Walking to a single commanded point
    SeekingAdHoc,
    
    /// Following a path; `index` is the waypoint currently targeted
    SeekingPath { index: usize },
}

/// What happened during one [`PathPlayer::tick`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// State after the tick
    pub state: PlayerState,
    
    /// Whether the actor was further than the arrival threshold
    pub moving: bool,
    
    /// Set when the cursor advanced to a new waypoint this tick
    pub advanced_to: Option<usize>,
    
    /// Set on the tick the last waypoint was reached
    pub completed: bool,
}

/// Drives an [`Actor`] along a [`WaypointPath`] or toward an ad-hoc point.
///
/// The player never stores the path: it keeps only the cursor, and the
/// caller lends the path to each [`PathPlayer::tick`].
#[derive(Debug, Clone)]
pub struct PathPlayer {
    config: PlayerConfig,
    state: PlayerState,
    target: Option<Point3<f64>>,
}

impl PathPlayer {
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            config,
            state: PlayerState::NotYetMaterialized,
            target: None,
        }
    }
    
    pub fn state(&self) -> PlayerState {
        self.state
    }
    
    /// Index of the targeted waypoint, or `None` when not following a path.
    pub fn cursor(&self) -> Option<usize> {
        match self.state {
            PlayerState::SeekingPath { index } => Some(index),
            _ => None,
        }
    }
    
    /// Current world-space target, if one was ever assigned.
    pub fn target(&self) -> Option<Point3<f64>> {
        self.target
    }
    
    /// Whether the actor has been placed in the world.
    pub fn is_materialized(&self) -> bool {
        self.state != PlayerState::NotYetMaterialized
    }
    
    /// Starts following `path` from its first waypoint.
    ///
    /// The actor is placed on waypoint 0 immediately. An empty path is
    /// ignored and leaves the player untouched; returns whether playback
    /// started.
    pub fn start_playback<A: Actor>(&mut self, path: &WaypointPath, actor: &mut A) -> bool {
        let Some(first) = path.waypoint(0) else {
            return false;
        };
        
        actor.set_pose(first);
        self.target = Some(first.position);
        self.state = PlayerState::SeekingPath { index: 0 };
        true
    }
    
    /// Abandons any path and walks to `point`.
    ///
    /// The first target ever assigned places the actor on it directly.
    pub fn force_move_to<A: Actor>(&mut self, point: Point3<f64>, actor: &mut A) {
        if !self.is_materialized() {
            let pose = actor.pose();
            actor.set_pose(Pose::new(point, pose.rotation));
        }
        self.target = Some(point);
        self.state = PlayerState::SeekingAdHoc;
    }
    
    /// Advances one fixed-rate step of `dt` seconds.
    ///
    /// `path` is the path being followed, if any; without one, arriving
    /// while following a path ends playback.
    pub fn tick<A: Actor>(&mut self, path: Option<&WaypointPath>, actor: &mut A, dt: f64) -> TickReport {
        // Path targets are re-read each tick so a re-localized anchor moves them
        if let (PlayerState::SeekingPath { index }, Some(path)) = (self.state, path) {
            if let Some(waypoint) = path.waypoint(index) {
                self.target = Some(waypoint.position);
            }
        }
        
        let Some(target) = self.target else {
            actor.set_walking(false);
            return TickReport {
                state: self.state,
                moving: false,
                advanced_to: None,
                completed: false,
            };
        };
        
        let current = actor.pose();
        let mut movement = target - current.position;
        let distance = movement.norm();
        if distance > self.config.max_step {
            movement *= self.config.max_step / distance;
        }
        
        let moving = movement.norm() > self.config.arrival_threshold;
        actor.set_walking(moving);
        
        let max_angle = (self.config.turn_speed * dt).max(0.0);
        let rotation = rotate_towards(current.rotation, &movement, max_angle);
        
        let mut advanced_to = None;
        let mut completed = false;
        if !moving {
            match self.state {
                PlayerState::SeekingPath { index } => {
                    let next = index + 1;
                    match path.and_then(|p| p.waypoint(next)) {
                        Some(waypoint) => {
                            self.state = PlayerState::SeekingPath { index: next };
                            self.target = Some(waypoint.position);
                            advanced_to = Some(next);
                        }
                        None => {
                            self.state = PlayerState::Idle;
                            completed = true;
                        }
                    }
                }
                PlayerState::SeekingAdHoc => self.state = PlayerState::Idle,
                PlayerState::Idle | PlayerState::NotYetMaterialized => {}
            }
        }
        
        actor.set_pose(Pose::new(
            current.position + movement * self.config.stride,
            rotation,
        ));
        
        TickReport {
            state: self.state,
            moving,
            advanced_to,
            completed,
        }
    }
}

impl Default for PathPlayer {
    fn default() -> Self {
        Self::new(PlayerConfig::default())
    }
}

/// Turns `current` toward `direction` by at most `max_angle` radians and
/// returns the matching upright look rotation.
///
/// A zero `direction` keeps `current` as is.
fn rotate_towards(
    current: UnitQuaternion<f64>,
    direction: &Vector3<f64>,
    max_angle: f64,
) -> UnitQuaternion<f64> {
    if direction.norm() <= DIRECTION_EPS {
        return current;
    }
    
    let forward = current * Vector3::z();
    let desired = match UnitQuaternion::rotation_between(&forward, direction) {
        Some(turn) if turn.angle() <= max_angle => direction.normalize(),
        Some(turn) => turn.powf(max_angle / turn.angle()) * forward,
        // Facing exactly away: turn about the vertical
        None => {
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), max_angle.min(PI)) * forward
        }
    };
    
    look_rotation(&desired).unwrap_or(current)
}

/// Rotation mapping +Z onto `direction` with +Y kept as up where possible.
fn look_rotation(direction: &Vector3<f64>) -> Option<UnitQuaternion<f64>> {
    if direction.norm() <= DIRECTION_EPS {
        return None;
    }
    if direction.cross(&Vector3::y()).norm() <= DIRECTION_EPS * direction.norm() {
        // Looking straight up or down; no yaw to preserve
        return UnitQuaternion::rotation_between(&Vector3::z(), direction);
    }
    Some(UnitQuaternion::face_towards(direction, &Vector3::y()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::KinematicActor;
    use crate::anchor::AnchorFrame;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};
    use waypoint_env::AnchorUid;
    
    const DT: f64 = 0.02;
    
    fn three_point_path() -> WaypointPath {
        let anchor = AnchorFrame::from_anchor_pose(&Pose::at(Point3::new(5.0, 0.0, -2.0)));
        let mut path = WaypointPath::new(AnchorUid::new("pcf"), anchor);
        for p in [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 2.5),
        ] {
            path.append_pose(&Pose::at(p));
        }
        path
    }
    
    fn run_until_idle(
        player: &mut PathPlayer,
        path: &WaypointPath,
        actor: &mut KinematicActor,
    ) -> Vec<TickReport> {
        let mut reports = Vec::new();
        for _ in 0..100 {
            let report = player.tick(Some(path), actor, DT);
            reports.push(report);
            if report.state == PlayerState::Idle {
                break;
            }
        }
        reports
    }
    
    #[test]
    fn test_starts_not_materialized() {
        let player = PathPlayer::default();
        assert_eq!(player.state(), PlayerState::NotYetMaterialized);
        assert!(!player.is_materialized());
        assert_eq!(player.cursor(), None);
        assert_eq!(player.target(), None);
    }
    
    #[test]
    fn test_playback_teleports_to_first_waypoint() {
        let path = three_point_path();
        let mut player = PathPlayer::default();
        let mut actor = KinematicActor::new(Pose::at(Point3::new(-10.0, 0.0, 7.0)));
        
        assert!(player.start_playback(&path, &mut actor));
        assert_relative_eq!(actor.pose.position, Point3::new(0.0, 0.0, 0.0), epsilon = 1e-9);
        assert_eq!(player.cursor(), Some(0));
        assert!(player.is_materialized());
    }
    
    #[test]
    fn test_playback_visits_each_waypoint_then_idles() {
        let path = three_point_path();
        let mut player = PathPlayer::default();
        let mut actor = KinematicActor::default();
        player.start_playback(&path, &mut actor);
        
        let reports = run_until_idle(&mut player, &path, &mut actor);
        
        // Already on waypoint 0, so the first tick advances
        assert_eq!(reports[0].advanced_to, Some(1));
        
        let advances: Vec<usize> = reports.iter().filter_map(|r| r.advanced_to).collect();
        assert_eq!(advances, vec![1, 2]);
        
        let last = reports.last().unwrap();
        assert_eq!(last.state, PlayerState::Idle);
        assert!(last.completed);
        assert_eq!(reports.iter().filter(|r| r.completed).count(), 1);
        assert_relative_eq!(actor.pose.position, Point3::new(3.0, 0.0, 2.5), epsilon = 1e-6);
        
        // No further target changes once idle
        let target = player.target();
        for _ in 0..10 {
            let report = player.tick(Some(&path), &mut actor, DT);
            assert_eq!(report.state, PlayerState::Idle);
            assert_eq!(report.advanced_to, None);
        }
        assert_eq!(player.target(), target);
    }
    
    #[test]
    fn test_step_is_capped() {
        let path = three_point_path();
        let mut player = PathPlayer::default();
        let mut actor = KinematicActor::default();
        player.start_playback(&path, &mut actor);
        
        player.tick(Some(&path), &mut actor, DT); // advance to waypoint 1 (3m away)
        let before = actor.pose.position;
        let report = player.tick(Some(&path), &mut actor, DT);
        
        assert!(report.moving);
        assert!(actor.walking);
        assert_relative_eq!((actor.pose.position - before).norm(), 1.0, epsilon = 1e-9);
    }
    
    #[test]
    fn test_stride_scales_translation() {
        let config = PlayerConfig { stride: 0.25, ..Default::default() };
        let mut player = PathPlayer::new(config);
        let mut actor = KinematicActor::default();
        player.force_move_to(Point3::origin(), &mut actor);
        player.force_move_to(Point3::new(0.0, 0.0, 4.0), &mut actor);
        
        player.tick(None, &mut actor, DT);
        assert_relative_eq!(actor.pose.position.z, 0.25, epsilon = 1e-9);
    }
    
    #[test]
    fn test_empty_path_ignored() {
        let empty = WaypointPath::new(AnchorUid::new("pcf"), AnchorFrame::identity());
        let mut player = PathPlayer::default();
        let mut actor = KinematicActor::default();
        player.force_move_to(Point3::new(1.0, 0.0, 0.0), &mut actor);
        
        assert!(!player.start_playback(&empty, &mut actor));
        assert_eq!(player.state(), PlayerState::SeekingAdHoc);
        assert_eq!(player.target(), Some(Point3::new(1.0, 0.0, 0.0)));
    }
    
    #[test]
    fn test_first_force_move_teleports_then_walks() {
        let mut player = PathPlayer::default();
        let mut actor = KinematicActor::new(Pose::at(Point3::new(9.0, 9.0, 9.0)));
        
        player.force_move_to(Point3::new(1.0, 0.0, 1.0), &mut actor);
        assert_eq!(actor.pose.position, Point3::new(1.0, 0.0, 1.0));
        assert_eq!(player.state(), PlayerState::SeekingAdHoc);
        
        // Second assignment walks
        player.force_move_to(Point3::new(4.0, 0.0, 1.0), &mut actor);
        assert_eq!(actor.pose.position, Point3::new(1.0, 0.0, 1.0));
        player.tick(None, &mut actor, DT);
        assert_relative_eq!(actor.pose.position, Point3::new(2.0, 0.0, 1.0), epsilon = 1e-9);
    }
    
    #[test]
    fn test_ad_hoc_arrival_idles_with_target() {
        let mut player = PathPlayer::default();
        let mut actor = KinematicActor::default();
        player.force_move_to(Point3::new(0.0, 0.0, 0.05), &mut actor);
        player.force_move_to(Point3::new(0.0, 0.0, 0.5), &mut actor);
        
        player.tick(None, &mut actor, DT);
        let report = player.tick(None, &mut actor, DT);
        assert_eq!(report.state, PlayerState::Idle);
        assert!(!report.completed);
        assert_eq!(player.target(), Some(Point3::new(0.0, 0.0, 0.5)));
    }
    
    #[test]
    fn test_force_move_cancels_playback() {
        let path = three_point_path();
        let mut player = PathPlayer::default();
        let mut actor = KinematicActor::default();
        player.start_playback(&path, &mut actor);
        player.tick(Some(&path), &mut actor, DT);
        assert_eq!(player.cursor(), Some(1));
        
        let point = Point3::new(-4.0, 0.0, 0.0);
        player.force_move_to(point, &mut actor);
        assert_eq!(player.cursor(), None);
        assert_eq!(player.state(), PlayerState::SeekingAdHoc);
        assert_eq!(player.target(), Some(point));
        
        for _ in 0..20 {
            let report = player.tick(Some(&path), &mut actor, DT);
            assert_eq!(report.advanced_to, None);
        }
        assert_relative_eq!(actor.pose.position, point, epsilon = 1e-6);
    }
    
    #[test]
    fn test_turn_rate_is_bounded() {
        let mut player = PathPlayer::default();
        let mut actor = KinematicActor::default();
        player.force_move_to(Point3::origin(), &mut actor);
        // Target directly to the right: a 90 degree turn from +Z
        player.force_move_to(Point3::new(5.0, 0.0, 0.0), &mut actor);
        
        player.tick(None, &mut actor, DT);
        let turned = actor.pose.rotation.angle();
        assert_relative_eq!(turned, 20.0 * DT, epsilon = 1e-9);
        
        for _ in 0..10 {
            player.tick(None, &mut actor, DT);
        }
        assert_relative_eq!(actor.pose.forward(), Vector3::x(), epsilon = 1e-9);
    }
    
    #[test]
    fn test_turn_around_when_facing_away() {
        let rotation = rotate_towards(UnitQuaternion::identity(), &-Vector3::z(), FRAC_PI_2);
        assert_relative_eq!(rotation.angle(), FRAC_PI_2, epsilon = 1e-9);
        
        let flipped = rotate_towards(UnitQuaternion::identity(), &-Vector3::z(), PI);
        assert_relative_eq!(flipped * Vector3::z(), -Vector3::z(), epsilon = 1e-9);
    }
    
    #[test]
    fn test_long_tick_facing_away_stops_on_heading() {
        let mut player = PathPlayer::default();
        let mut actor = KinematicActor::default();
        player.force_move_to(Point3::origin(), &mut actor);
        player.force_move_to(Point3::new(0.0, 0.0, -5.0), &mut actor);
        
        // 20 rad/s over a full second is far more than a half turn
        player.tick(None, &mut actor, 1.0);
        assert_relative_eq!(actor.pose.forward(), -Vector3::z(), epsilon = 1e-9);
        
        let rotation = rotate_towards(UnitQuaternion::identity(), &-Vector3::z(), 3.0 * PI);
        assert_relative_eq!(rotation * Vector3::z(), -Vector3::z(), epsilon = 1e-9);
    }
    
    #[test]
    fn test_relocalized_path_retargets_current_waypoint() {
        let mut path = three_point_path();
        let mut player = PathPlayer::default();
        let mut actor = KinematicActor::default();
        player.start_playback(&path, &mut actor);
        
        // Anchor shifts 5m along +x while standing on waypoint 0
        let shifted = path.anchor().anchor_pose().position + Vector3::new(5.0, 0.0, 0.0);
        path.relocalize(AnchorFrame::from_anchor_pose(&Pose::at(shifted)));
        
        let report = player.tick(Some(&path), &mut actor, DT);
        assert_eq!(report.advanced_to, None);
        assert!(report.moving);
        assert_eq!(player.target(), Some(path.get_waypoint(0).position));
        assert_relative_eq!(actor.pose.position, Point3::new(1.0, 0.0, 0.0), epsilon = 1e-9);
        
        run_until_idle(&mut player, &path, &mut actor);
        assert_relative_eq!(actor.pose.position, Point3::new(8.0, 0.0, 2.5), epsilon = 1e-6);
    }
    
    #[test]
    fn test_zero_movement_keeps_rotation() {
        let current = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.4);
        assert_eq!(rotate_towards(current, &Vector3::zeros(), 1.0), current);
    }
    
    #[test]
    fn test_no_target_no_motion() {
        let mut player = PathPlayer::default();
        let mut actor = KinematicActor::new(Pose::at(Point3::new(1.0, 2.0, 3.0)));
        let report = player.tick(None, &mut actor, DT);
        
        assert!(!report.moving);
        assert_eq!(report.state, PlayerState::NotYetMaterialized);
        assert_eq!(actor.pose.position, Point3::new(1.0, 2.0, 3.0));
    }
}
