//! Waypoint Deterministic Simulation Harness
//!
//! Runs the waypoint session end to end without a headset: a seeded
//! tracker stands in for the anchor service, a scripted hand presses the
//! controller, and a kinematic actor walks the recorded path.
//!
//! # Core Principle
//!
//! Every source of non-determinism comes from one 64-bit seed:
//! - **Anchor**: initial pose and re-localization drift
//! - **Walk**: where waypoints are recorded and where ad-hoc moves land
//! - **Time**: fixed-rate ticks, never the wall clock
//!
//! # Usage
//!
//! ```ignore
//! use waypoint_sim::{ScenarioRunner, ScenarioId};
//!
//! let result = ScenarioRunner::new(42)
//!     .with_waypoints(8)
//!     .run(ScenarioId::Relocalize);
//! assert!(result.passed);
//! ```

pub mod error;
pub mod exporter;
pub mod runner;
pub mod scenarios;
pub mod tracker;

pub use error::ScenarioFailure;
pub use exporter::{PointSample, PoseSample, SimEvent, SimExport, SimFrame};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner, StoreBackend};
pub use scenarios::ScenarioId;
pub use tracker::AnchorTracker;
