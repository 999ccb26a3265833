//! Session Demo - Record, Re-localize, Replay
//! =========================================
//!
//! Walks a character through the whole waypoint lifecycle in the terminal:
//! - the anchor resolves and a new path starts
//! - four waypoints are recorded around it
//! - the session is closed and reopened from storage
//! - the anchor comes back half a meter off and the path follows it
//! - the character replays the path
//!
//! Run:
//! ```bash
//! cargo run --example session_demo
//! ```

use nalgebra::{Point3, UnitQuaternion, Vector3};
use waypoint_core::{Actor, AnchorFrame, KinematicActor, Pose, SessionConfig, SessionEvent, WaypointSession};
use waypoint_env::{AnchorUpdate, InputCommand, MemoryStore};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🧭 Waypoint Session Demo");
    println!("========================\n");

    let store = MemoryStore::new();
    let anchor = Pose::new(
        Point3::new(3.0, 0.0, -2.0),
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.4),
    );
    let update = |pose: &Pose| AnchorUpdate::new("pcf-demo", *AnchorFrame::from_anchor_pose(pose).to_local());

    // ========================================================================
    // FIRST RUN - record a square around the anchor
    // ========================================================================

    let mut session = WaypointSession::open(&store, SessionConfig::default());
    let mut actor = KinematicActor::default();
    println!("📍 Anchor resolved: {:?}", session.on_anchor_resolved(update(&anchor))?);

    for (x, z) in [(1.0, 1.0), (1.0, -1.0), (-1.0, -1.0), (-1.0, 1.0)] {
        actor.set_pose(Pose::at(anchor.position + Vector3::new(x, 0.0, z)));
        session.handle(InputCommand::Record, &mut actor)?;
        let p = actor.pose().position;
        println!("   ● recorded ({:6.2}, {:6.2}, {:6.2})", p.x, p.y, p.z);
    }
    session.close()?;
    println!("💾 Saved {} blob(s)\n", store.len());

    // ========================================================================
    // SECOND RUN - the tracker re-localizes the anchor somewhere else
    // ========================================================================

    let mut session = WaypointSession::open(&store, SessionConfig::default());
    let mut events = session.subscribe();

    let moved = Pose::new(anchor.position + Vector3::new(0.5, 0.0, 0.0), anchor.rotation);
    println!("📍 Anchor re-localized: {:?}", session.on_anchor_resolved(update(&moved))?);

    for event in events.drain() {
        if let SessionEvent::PathRestored { poses, .. } = event {
            for pose in poses {
                let p = pose.position;
                println!("   ○ waypoint now at ({:6.2}, {:6.2}, {:6.2})", p.x, p.y, p.z);
            }
        }
    }

    // ========================================================================
    // PLAYBACK
    // ========================================================================

    println!("\n▶ Playback");
    session.handle(InputCommand::PlayBack, &mut actor)?;

    let dt = 1.0 / 30.0;
    for tick in 1..=200 {
        let report = session.tick(&mut actor, dt);
        if let Some(index) = report.advanced_to {
            println!("   t={:3} → heading to waypoint {}", tick, index);
        }
        if report.completed {
            let p = actor.pose().position;
            println!("   t={:3} ✓ arrived at ({:6.2}, {:6.2}, {:6.2})", tick, p.x, p.y, p.z);
            break;
        }
    }

    Ok(())
}
