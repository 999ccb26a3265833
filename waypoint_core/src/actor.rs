//! The character being recorded and driven along a path.

use crate::pose::Pose;

/// A body the player can read and move.
///
/// The player writes a pose at most once per tick.
pub trait Actor {
    /// Current world pose.
    fn pose(&self) -> Pose;
    
    /// Moves the actor to `pose`.
    fn set_pose(&mut self, pose: Pose);
    
    /// Whether the actor is walking this tick (drives its animation).
    fn set_walking(&mut self, _walking: bool) {}
}

/// A bare pose with a walking flag. No physics, no animation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KinematicActor {
    pub pose: Pose,
    pub walking: bool,
}

impl KinematicActor {
    pub fn new(pose: Pose) -> Self {
        Self { pose, walking: false }
    }
}

impl Actor for KinematicActor {
    fn pose(&self) -> Pose {
        self.pose
    }
    
    fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }
    
    fn set_walking(&mut self, walking: bool) {
        self.walking = walking;
    }
}
