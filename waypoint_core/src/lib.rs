//! Waypoint Core - Anchor-Relative Path Recording & Playback
//!
//! Records a character's poses relative to a tracked anchor and walks the
//! character back along them later, even after the anchor has moved:
//! 1. **Anchor drift**: waypoints live in anchor-local space, so a
//!    re-localized anchor carries the whole path with it
//! 2. **Persistence**: paths survive restarts through a versioned JSON
//!    codec that also reads the legacy headset format
//! 3. **Playback**: a bounded-step, bounded-turn player advances one
//!    waypoint per arrival

pub mod actor;
pub mod anchor;
pub mod codec;
pub mod error;
pub mod player;
pub mod pose;
pub mod session;
pub mod waypoint_path;

// Re-export key types for convenience
pub use actor::{Actor, KinematicActor};
pub use anchor::AnchorFrame;
pub use error::{CodecError, PathError, SessionError};
pub use player::{PathPlayer, PlayerConfig, PlayerState, TickReport};
pub use pose::Pose;
pub use session::{AnchorOutcome, SessionConfig, SessionEvent, WaypointSession};
pub use waypoint_path::WaypointPath;
