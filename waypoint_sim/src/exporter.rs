//! JSON exporter for offline inspection of a run.
//!
//! Exports one frame per player tick so a plotting script can redraw the
//! actor walking the recorded path.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use waypoint_core::Pose;

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    pub tick: u64,
    
    /// Simulation time in seconds
    pub time_sec: f64,
    
    /// Actor pose after the tick
    pub actor: PoseSample,
    
    /// Where the player is heading, if anywhere
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<PointSample>,
    
    /// Player state, e.g. `SeekingPath { index: 2 }`
    pub state: String,
    
    pub moving: bool,
    
    /// Session events since the previous frame
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SimEvent>,
}

/// Position of a point of interest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<Point3<f64>> for PointSample {
    fn from(p: Point3<f64>) -> Self {
        Self { x: p.x, y: p.y, z: p.z }
    }
}

/// Position plus heading about +Y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    
    /// Heading in radians, 0 facing +Z
    pub yaw: f64,
}

impl From<&Pose> for PoseSample {
    fn from(pose: &Pose) -> Self {
        let forward: Vector3<f64> = pose.forward();
        Self {
            x: pose.position.x,
            y: pose.position.y,
            z: pose.position.z,
            yaw: forward.x.atan2(forward.z),
        }
    }
}

/// Simulation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEvent {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl SimEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self { message: message.into(), level: None }
    }
    
    pub fn warn(message: impl Into<String>) -> Self {
        Self { message: message.into(), level: Some("warn".to_string()) }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,
    
    /// Seed used
    pub seed: u64,
    
    pub tick_rate_hz: u32,
    
    /// Duration in seconds
    pub duration_sec: f64,
    
    /// Anchor pose at the end of the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<PoseSample>,
    
    /// World poses of the path as last played back
    pub waypoints: Vec<PoseSample>,
    
    /// All frames
    pub frames: Vec<SimFrame>,
    
    /// Final results
    pub passed: bool,
    
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64, tick_rate_hz: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            tick_rate_hz,
            duration_sec: 0.0,
            anchor: None,
            waypoints: Vec::new(),
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }
    
    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }
    
    /// Attaches an event to the latest frame, or to a frame at t=0 if
    /// nothing has been exported yet.
    pub fn add_event(&mut self, event: SimEvent) {
        match self.frames.last_mut() {
            Some(frame) => frame.events.push(event),
            None => self.add_frame(SimFrame {
                tick: 0,
                time_sec: 0.0,
                actor: PoseSample::from(&Pose::identity()),
                target: None,
                state: "NotYetMaterialized".to_string(),
                moving: false,
                events: vec![event],
            }),
        }
    }
    
    /// Records the anchor and the path being played.
    pub fn set_path<'a>(&mut self, anchor: &Pose, waypoints: impl IntoIterator<Item = &'a Pose>) {
        self.anchor = Some(anchor.into());
        self.waypoints = waypoints.into_iter().map(PoseSample::from).collect();
    }
    
    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }
    
    /// Writes to a JSON file.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
