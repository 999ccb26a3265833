//! Waypoint session: the lifecycle that ties anchor, input, storage and
//! playback together.
//!
//! A session is opened once per run. It tries to restore the last saved
//! path, waits for the tracker to resolve an anchor, then turns input
//! commands into recordings and playback. Observers follow along through
//! [`WaypointSession::subscribe`].

use crate::actor::Actor;
use crate::codec;
use crate::error::SessionError;
use crate::player::{PathPlayer, PlayerConfig, TickReport};
use crate::pose::Pose;
use crate::waypoint_path::WaypointPath;
use tracing::{debug, error, info, warn};
use waypoint_env::{AnchorUid, AnchorUpdate, BlobStore, EventBus, InputCommand, Subscription};

/// Configuration for a [`WaypointSession`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Storage key the path is loaded from and saved to
    pub store_key: String,
    
    /// Player tuning
    pub player: PlayerConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store_key: "waypoints.json".to_string(),
            player: PlayerConfig::default(),
        }
    }
}

/// Notifications published by a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A new, empty path was started for a first-seen anchor
    PathCreated { uid: AnchorUid },
    
    /// The saved path's anchor resolved; world poses of every waypoint
    PathRestored { uid: AnchorUid, poses: Vec<Pose> },
    
    /// A waypoint was appended
    WaypointRecorded { index: usize, pose: Pose },
    
    /// Playback started on a path of `waypoints` points
    PlaybackStarted { waypoints: usize },
    
    /// The last waypoint was reached
    PlaybackCompleted,
    
    /// The path was written to storage
    Saved { bytes: usize },
}

/// What an anchor update did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorOutcome {
    /// No path existed; one was created for this anchor
    Created,
    
    /// The path's own anchor re-localized
    Relocalized { waypoints: usize },
    
    /// An anchor other than the path's; nothing changed
    Ignored,
}

/// Owns the path, the player and the store for one run.
pub struct WaypointSession<S: BlobStore> {
    store: S,
    config: SessionConfig,
    
    /// Restored or recorded path; `None` until one is loaded or created
    path: Option<WaypointPath>,
    
    /// Whether `path`'s anchor has been seen by the tracker this run
    anchored: bool,
    
    player: PathPlayer,
    events: EventBus<SessionEvent>,
}

impl<S: BlobStore> WaypointSession<S> {
    /// Opens a session, restoring any previously saved path.
    ///
    /// A missing, unreadable or malformed blob is logged and treated as
    /// "no prior path".
    pub fn open(store: S, config: SessionConfig) -> Self {
        let path = match store.read(&config.store_key) {
            Ok(Some(bytes)) => match codec::decode(&bytes) {
                Ok(path) => {
                    info!(
                        key = %config.store_key,
                        anchor = %path.anchor_uid(),
                        waypoints = path.len(),
                        "Restored waypoint path"
                    );
                    Some(path)
                }
                Err(e) => {
                    warn!(key = %config.store_key, "Discarding unreadable waypoint path: {}", e);
                    None
                }
            },
            Ok(None) => {
                info!(key = %config.store_key, "No saved waypoint path");
                None
            }
            Err(e) => {
                warn!(key = %config.store_key, "Failed to read waypoint path: {}", e);
                None
            }
        };
        
        Self {
            store,
            player: PathPlayer::new(config.player),
            config,
            path,
            anchored: false,
            events: EventBus::new(),
        }
    }
    
    /// Registers an observer for session events.
    pub fn subscribe(&self) -> Subscription<SessionEvent> {
        self.events.subscribe()
    }
    
    /// Handles a resolved (or re-localized) anchor from the tracker.
    pub fn on_anchor_resolved(&mut self, update: AnchorUpdate) -> Result<AnchorOutcome, SessionError> {
        debug!(anchor = %update.uid, "Anchor resolved");
        
        let Some(path) = self.path.as_mut() else {
            let path = WaypointPath::for_anchor(update.uid.clone(), update.to_local)?;
            info!(anchor = %update.uid, "Starting new waypoint path");
            self.path = Some(path);
            self.anchored = true;
            self.events.publish(SessionEvent::PathCreated { uid: update.uid });
            return Ok(AnchorOutcome::Created);
        };
        
        if !path.is_for_anchor(&update.uid) {
            debug!(
                anchor = %update.uid,
                expected = %path.anchor_uid(),
                "Ignoring anchor not matching the path"
            );
            return Ok(AnchorOutcome::Ignored);
        }
        
        path.set_anchor_frame(update.to_local)?;
        self.anchored = true;
        
        let waypoints = path.len();
        info!(anchor = %update.uid, waypoints, "Waypoint path re-localized");
        self.events.publish(SessionEvent::PathRestored {
            uid: update.uid,
            poses: path.world_poses().collect(),
        });
        Ok(AnchorOutcome::Relocalized { waypoints })
    }
    
    /// Executes one input command against `actor`.
    pub fn handle<A: Actor>(&mut self, command: InputCommand, actor: &mut A) -> Result<(), SessionError> {
        match command {
            InputCommand::Record => {
                let path = self.anchored_path_mut()?;
                path.append_pose(&actor.pose());
                let index = path.len() - 1;
                let pose = path.get_waypoint(index as isize);
                debug!(index, x = pose.position.x, y = pose.position.y, z = pose.position.z, "Waypoint recorded");
                self.events.publish(SessionEvent::WaypointRecorded { index, pose });
                Ok(())
            }
            InputCommand::PlayBack => {
                let path = self.path.as_ref().filter(|_| self.anchored).ok_or(SessionError::NoAnchor)?;
                if self.player.start_playback(path, actor) {
                    info!(waypoints = path.len(), "Playback started");
                    self.events.publish(SessionEvent::PlaybackStarted { waypoints: path.len() });
                } else {
                    debug!("Playback requested on an empty path");
                }
                self.save().map(|_| ())
            }
            InputCommand::ForceMove(point) => {
                debug!(x = point.x, y = point.y, z = point.z, "Force move");
                self.player.force_move_to(point, actor);
                Ok(())
            }
        }
    }
    
    /// Advances the player one fixed-rate step.
    pub fn tick<A: Actor>(&mut self, actor: &mut A, dt: f64) -> TickReport {
        let report = self.player.tick(self.path.as_ref(), actor, dt);
        if let Some(index) = report.advanced_to {
            debug!(index, "Heading to next waypoint");
        }
        if report.completed {
            info!("Playback completed");
            self.events.publish(SessionEvent::PlaybackCompleted);
        }
        report
    }
    
    /// Writes the path to storage. Returns the number of bytes written.
    pub fn save(&self) -> Result<usize, SessionError> {
        let path = self.path.as_ref().ok_or(SessionError::NoAnchor)?;
        let bytes = codec::encode(path)?;
        
        if let Err(e) = self.store.write(&self.config.store_key, &bytes) {
            error!(key = %self.config.store_key, "Failed to save waypoint path: {}", e);
            return Err(e.into());
        }
        
        info!(key = %self.config.store_key, bytes = bytes.len(), "Waypoint path saved");
        self.events.publish(SessionEvent::Saved { bytes: bytes.len() });
        Ok(bytes.len())
    }
    
    /// Ends the session, flushing the path if there is one.
    pub fn close(self) -> Result<(), SessionError> {
        if self.path.is_some() {
            self.save()?;
        }
        Ok(())
    }
    
    pub fn path(&self) -> Option<&WaypointPath> {
        self.path.as_ref()
    }
    
    pub fn player(&self) -> &PathPlayer {
        &self.player
    }
    
    /// Whether the path's anchor has resolved this run.
    pub fn is_anchored(&self) -> bool {
        self.anchored
    }
    
    pub fn store(&self) -> &S {
        &self.store
    }
    
    fn anchored_path_mut(&mut self) -> Result<&mut WaypointPath, SessionError> {
        match self.path.as_mut() {
            Some(path) if self.anchored => Ok(path),
            _ => Err(SessionError::NoAnchor),
        }
    }
}
