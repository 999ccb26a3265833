//! Scenario runner - drives a waypoint session through scripted runs.

use crate::error::ScenarioFailure;
use crate::exporter::{PointSample, PoseSample, SimEvent, SimExport, SimFrame};
use crate::scenarios::ScenarioId;
use crate::tracker::AnchorTracker;

use nalgebra::Point3;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use waypoint_core::{
    codec, AnchorOutcome, KinematicActor, PlayerConfig, PlayerState, Pose, SessionConfig,
    SessionError, SessionEvent, TickReport, WaypointSession,
};
use waypoint_env::{
    BlobStore, ControllerEvent, ControllerInput, FileStore, InputMapper, MemoryStore, SledStore,
    Subscription,
};

/// Controller id the simulated hand reports.
const CONTROLLER_ID: u8 = 0;

/// Recorded waypoints land within this distance of the anchor (meters).
const WALK_RADIUS: f64 = 4.0;

/// Positions that should coincide after pure f64 math.
const POSITION_TOLERANCE: f64 = 1e-6;

/// Positions that went through a single-precision legacy file.
const LEGACY_TOLERANCE: f64 = 1e-3;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,
    
    /// Seed used
    pub seed: u64,
    
    /// Whether scenario passed all assertions
    pub passed: bool,
    
    /// Total ticks executed
    pub total_ticks: u64,
    
    /// Final simulation time in seconds
    pub final_time_secs: f64,
    
    /// Failure message if any
    pub failure_reason: Option<String>,
    
    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default)]
pub struct ScenarioMetrics {
    /// Waypoints appended through the session
    pub waypoints_recorded: usize,
    
    /// Waypoints the player advanced onto during playback
    pub waypoints_visited: usize,
    
    /// Successful saves
    pub saves: u64,
    
    /// Bytes written by the last save
    pub bytes_saved: usize,
    
    /// Largest world-space shift of a waypoint caused by re-localization
    pub max_relocalization_shift: f64,
    
    /// Distance between the actor and its final target when it stopped
    pub final_arrival_error: f64,
}

/// Where a runner persists paths.
#[derive(Clone, Default)]
pub enum StoreBackend {
    #[default]
    Memory,
    
    /// One JSON file per key in this directory
    Files(PathBuf),
    
    /// An open sled database, shared by every run
    Sled(Arc<SledStore>),
}

/// Runs waypoint scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,
    
    /// Tick rate in Hz
    tick_rate_hz: u32,
    
    /// Waypoints recorded per scenario
    waypoints: usize,
    
    /// Give up on a playback after this many ticks
    max_ticks: u64,
    
    store: StoreBackend,
    
    player: PlayerConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            tick_rate_hz: 30,
            waypoints: 5,
            max_ticks: 10_000,
            store: StoreBackend::Memory,
            player: PlayerConfig::default(),
        }
    }
    
    /// Sets the tick rate.
    pub fn with_tick_rate(mut self, hz: u32) -> Self {
        self.tick_rate_hz = hz.max(1);
        self
    }
    
    /// Sets how many waypoints each scenario records.
    pub fn with_waypoints(mut self, n: usize) -> Self {
        self.waypoints = n;
        self
    }
    
    /// Sets the playback tick budget.
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = ticks;
        self
    }
    
    /// Persists paths as files under `dir`.
    pub fn with_store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store = StoreBackend::Files(dir.into());
        self
    }
    
    /// Persists paths in an open sled database.
    pub fn with_sled(mut self, db: SledStore) -> Self {
        self.store = StoreBackend::Sled(Arc::new(db));
        self
    }
    
    pub fn with_player_config(mut self, player: PlayerConfig) -> Self {
        self.player = player;
        self
    }
    
    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.run_with_export(scenario).0
    }
    
    /// Runs a scenario, also returning every frame it produced.
    pub fn run_with_export(&self, scenario: ScenarioId) -> (ScenarioResult, SimExport) {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        
        let mut harness = Harness::new(self, scenario);
        let outcome = self.open_store(&harness.store_key).and_then(|store| match scenario {
            ScenarioId::RecordReplay => self.run_record_replay(&mut harness, store),
            ScenarioId::Relocalize => self.run_relocalize(&mut harness, store),
            ScenarioId::ForceMoveInterrupt => self.run_force_move_interrupt(&mut harness, store),
            ScenarioId::CorruptStore => self.run_corrupt_store(&mut harness, store),
            ScenarioId::LegacyImport => self.run_legacy_import(&mut harness, store),
        });
        
        let failure_reason = outcome.err().map(|e| e.to_string());
        let passed = failure_reason.is_none();
        
        if let Some(reason) = &failure_reason {
            warn!("{} failed: {}", scenario.name(), reason);
        }
        
        let mut export = harness.export;
        export.finalize(passed, failure_reason.clone());
        
        let result = ScenarioResult {
            scenario,
            seed: self.seed,
            passed,
            total_ticks: harness.tick,
            final_time_secs: harness.tick as f64 * harness.dt,
            failure_reason,
            metrics: harness.metrics,
        };
        (result, export)
    }
    
    fn open_store(&self, key: &str) -> Result<Arc<dyn BlobStore>, ScenarioFailure> {
        let store: Arc<dyn BlobStore> = match &self.store {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Files(dir) => Arc::new(FileStore::new(dir)),
            StoreBackend::Sled(db) => db.clone(),
        };
        // Runs are reproducible only from a clean key
        if store.remove(key)? {
            debug!(key, "Removed blob left by a previous run");
        }
        Ok(store)
    }
    
    fn session_config(&self, key: &str) -> SessionConfig {
        SessionConfig {
            store_key: key.to_string(),
            player: self.player,
        }
    }
    
    /// WP-001: RecordReplay - record a walk, play it back.
    ///
    /// **Assertion**: playback teleports to waypoint 0, advances through
    /// 1..N in order, stops on the last one, and the saved blob decodes to
    /// the same anchor-local matrices.
    fn run_record_replay(&self, h: &mut Harness, store: Arc<dyn BlobStore>) -> Result<(), ScenarioFailure> {
        info!("WP-001: RecordReplay - {} waypoints", self.waypoints);
        
        let mut session = WaypointSession::open(store.clone(), self.session_config(&h.store_key));
        h.attach(&session);
        
        expect_outcome(session.on_anchor_resolved(h.tracker.resolve()), AnchorOutcome::Created)?;
        h.record_walk(&mut session, self.waypoints)?;
        
        let recorded: Vec<Pose> = session.path().map(|p| p.world_poses().collect()).unwrap_or_default();
        ensure(recorded.len() == self.waypoints, || {
            format!("recorded {} waypoints, expected {}", recorded.len(), self.waypoints)
        })?;
        
        h.press(&mut session, ControllerInput::HomeTap)?;
        
        if recorded.is_empty() {
            // Empty path: playback request is a no-op
            ensure(session.player().state() == PlayerState::NotYetMaterialized, || {
                format!("empty playback changed state to {:?}", session.player().state())
            })?;
            return Ok(());
        }
        
        h.expect_at(&recorded[0].position, POSITION_TOLERANCE, "playback start")?;
        h.export.set_path(&h.tracker.pose(), &recorded);
        
        let visited = h.run_until_idle(&mut session, self.max_ticks)?;
        expect_visits(&visited, recorded.len())?;
        h.expect_at(&recorded[recorded.len() - 1].position, POSITION_TOLERANCE, "playback end")?;
        
        let saved = store.read(&h.store_key)?
            .ok_or_else(|| ScenarioFailure::check("playback did not save the path"))?;
        let decoded = codec::decode(&saved)?;
        ensure(session.path().map(|p| p.local_matrices()) == Some(decoded.local_matrices()), || {
            "saved waypoints differ from the live path".to_string()
        })?;
        
        info!("✓ RecordReplay complete: visited {} waypoints in {} ticks", visited.len(), h.tick);
        Ok(())
    }
    
    /// WP-002: Relocalize - persist, reopen, move the anchor, replay.
    ///
    /// **Assertion**: anchor-local waypoints survive the reload untouched
    /// and every world pose follows the anchor to its new place.
    fn run_relocalize(&self, h: &mut Harness, store: Arc<dyn BlobStore>) -> Result<(), ScenarioFailure> {
        info!("WP-002: Relocalize - {} waypoints", self.waypoints);
        
        let mut first = WaypointSession::open(store.clone(), self.session_config(&h.store_key));
        expect_outcome(first.on_anchor_resolved(h.tracker.resolve()), AnchorOutcome::Created)?;
        h.record_walk(&mut first, self.waypoints)?;
        
        let before: Vec<Pose> = first.path().map(|p| p.world_poses().collect()).unwrap_or_default();
        let saved_local = first.path().map(|p| p.local_matrices().to_vec()).unwrap_or_default();
        first.close()?;
        h.metrics.saves += 1;
        
        let update = h.tracker.relocalize();
        debug!("Anchor drifted to {:?}", h.tracker.pose().position);
        
        let mut session = WaypointSession::open(store, self.session_config(&h.store_key));
        h.attach(&session);
        ensure(session.path().map(|p| p.len()) == Some(saved_local.len()), || {
            "reopened session did not restore the path".to_string()
        })?;
        
        // Recording must wait for the anchor
        match h.press(&mut session, ControllerInput::Bumper) {
            Err(SessionError::NoAnchor) => {}
            other => return Err(ScenarioFailure::check(format!("record before anchor returned {:?}", other))),
        }
        
        expect_outcome(
            session.on_anchor_resolved(update),
            AnchorOutcome::Relocalized { waypoints: saved_local.len() },
        )?;
        
        let path = session.path().ok_or_else(|| ScenarioFailure::check("path vanished on re-localization"))?;
        ensure(path.local_matrices() == saved_local.as_slice(), || {
            "re-localization rewrote anchor-local waypoints".to_string()
        })?;
        
        let frame = h.tracker.frame();
        let after: Vec<Pose> = path.world_poses().collect();
        for (i, local) in saved_local.iter().enumerate() {
            let expected = Pose::from_matrix(&frame.globalize(local)).position;
            let error = (after[i].position - expected).norm();
            ensure(error < POSITION_TOLERANCE, || {
                format!("waypoint {} is {:.3e}m from its re-localized pose", i, error)
            })?;
            let shift = (after[i].position - before[i].position).norm();
            h.metrics.max_relocalization_shift = h.metrics.max_relocalization_shift.max(shift);
        }
        
        let restored = h.drain_events()
            .into_iter()
            .find_map(|e| match e {
                SessionEvent::PathRestored { poses, .. } => Some(poses.len()),
                _ => None,
            });
        ensure(restored == Some(saved_local.len()), || {
            format!("expected PathRestored with {} poses, saw {:?}", saved_local.len(), restored)
        })?;
        
        if after.is_empty() {
            return Ok(());
        }
        
        h.press(&mut session, ControllerInput::HomeTap)?;
        h.export.set_path(&h.tracker.pose(), &after);
        
        let visited = h.run_until_idle(&mut session, self.max_ticks)?;
        expect_visits(&visited, after.len())?;
        h.expect_at(&after[after.len() - 1].position, POSITION_TOLERANCE, "playback end")?;
        
        info!(
            "✓ Relocalize complete: max shift {:.3}m, {} ticks",
            h.metrics.max_relocalization_shift, h.tick
        );
        Ok(())
    }
    
    /// WP-003: ForceMoveInterrupt - ad-hoc move during playback.
    ///
    /// **Assertion**: a weak trigger is ignored, a full trigger clears the
    /// cursor, and the actor settles on the hit point without visiting any
    /// further waypoint.
    fn run_force_move_interrupt(&self, h: &mut Harness, store: Arc<dyn BlobStore>) -> Result<(), ScenarioFailure> {
        info!("WP-003: ForceMoveInterrupt");
        
        let waypoints = self.waypoints.max(3);
        let mut session = WaypointSession::open(store, self.session_config(&h.store_key));
        h.attach(&session);
        
        expect_outcome(session.on_anchor_resolved(h.tracker.resolve()), AnchorOutcome::Created)?;
        h.record_walk(&mut session, waypoints)?;
        let recorded: Vec<Pose> = session.path().map(|p| p.world_poses().collect()).unwrap_or_default();
        h.export.set_path(&h.tracker.pose(), &recorded);
        
        h.press(&mut session, ControllerInput::HomeTap)?;
        
        // Let the player move on past the first waypoint
        let mut advanced = false;
        for _ in 0..self.max_ticks {
            if h.step(&mut session).advanced_to.is_some() {
                advanced = true;
                break;
            }
        }
        ensure(advanced, || "playback never left waypoint 0".to_string())?;
        let state_before = session.player().state();
        
        let hit = h.tracker.random_pose_near_anchor(WALK_RADIUS).position;
        h.press(&mut session, ControllerInput::Trigger { value: 0.3, hit: Some(hit) })?;
        ensure(session.player().state() == state_before, || {
            "half-pressed trigger interrupted playback".to_string()
        })?;
        
        h.press(&mut session, ControllerInput::Trigger { value: 1.0, hit: Some(hit) })?;
        ensure(session.player().cursor().is_none(), || {
            "force move left the playback cursor active".to_string()
        })?;
        ensure(session.player().state() == PlayerState::SeekingAdHoc, || {
            format!("force move left state {:?}", session.player().state())
        })?;
        
        let visited = h.run_until_idle(&mut session, self.max_ticks)?;
        ensure(visited.is_empty(), || format!("visited waypoints {:?} after force move", visited))?;
        ensure(session.player().target() == Some(hit), || "ad-hoc target was lost".to_string())?;
        h.expect_at(&hit, POSITION_TOLERANCE, "force move end")?;
        
        info!("✓ ForceMoveInterrupt complete: settled after {} ticks", h.tick);
        Ok(())
    }
    
    /// WP-004: CorruptStore - unreadable persisted data.
    ///
    /// **Assertion**: the session opens without a path, the anchor creates
    /// a fresh one, and the next save replaces the garbage.
    fn run_corrupt_store(&self, h: &mut Harness, store: Arc<dyn BlobStore>) -> Result<(), ScenarioFailure> {
        info!("WP-004: CorruptStore");
        
        store.write(&h.store_key, br#"{ "Waypoints": [ { "e00": 1.0, "#)?;
        
        let mut session = WaypointSession::open(store.clone(), self.session_config(&h.store_key));
        h.attach(&session);
        ensure(session.path().is_none(), || "corrupt blob produced a path".to_string())?;
        h.export.add_event(SimEvent::warn("corrupt blob discarded"));
        
        expect_outcome(session.on_anchor_resolved(h.tracker.resolve()), AnchorOutcome::Created)?;
        h.record_walk(&mut session, self.waypoints.max(1))?;
        h.press(&mut session, ControllerInput::HomeTap)?;
        h.run_until_idle(&mut session, self.max_ticks)?;
        
        let saved = store.read(&h.store_key)?.unwrap_or_default();
        let decoded = codec::decode(&saved)
            .map_err(|e| ScenarioFailure::check(format!("store still unreadable: {}", e)))?;
        ensure(decoded.len() == self.waypoints.max(1), || {
            format!("saved path has {} waypoints", decoded.len())
        })?;
        
        info!("✓ CorruptStore complete: store repaired with {} bytes", h.metrics.bytes_saved);
        Ok(())
    }
    
    /// WP-005: LegacyImport - restore a path written by the headset demo.
    ///
    /// **Assertion**: the single-precision legacy document restores within
    /// float tolerance, plays back, and is re-saved in the current format.
    fn run_legacy_import(&self, h: &mut Harness, store: Arc<dyn BlobStore>) -> Result<(), ScenarioFailure> {
        info!("WP-005: LegacyImport - {} waypoints", self.waypoints);
        
        let frame = h.tracker.frame();
        let walk: Vec<Pose> = (0..self.waypoints)
            .map(|_| h.tracker.random_pose_near_anchor(WALK_RADIUS))
            .collect();
        
        let document = json!({
            "Waypoints": walk.iter()
                .map(|pose| legacy_matrix(&frame.localize(&pose.to_matrix())))
                .collect::<Vec<_>>(),
            "PcfTransformMatrix": legacy_matrix(frame.to_local()),
            "PcfReverseTransformMatrix": legacy_matrix(frame.to_world()),
            "pcfUid": h.tracker.uid().as_str(),
        });
        let bytes = serde_json::to_vec(&document)?;
        store.write(&h.store_key, &bytes)?;
        
        let mut session = WaypointSession::open(store.clone(), self.session_config(&h.store_key));
        h.attach(&session);
        ensure(session.path().map(|p| p.len()) == Some(walk.len()), || {
            "legacy document was not restored".to_string()
        })?;
        
        expect_outcome(
            session.on_anchor_resolved(h.tracker.resolve()),
            AnchorOutcome::Relocalized { waypoints: walk.len() },
        )?;
        
        let restored: Vec<Pose> = session.path().map(|p| p.world_poses().collect()).unwrap_or_default();
        for (i, (got, want)) in restored.iter().zip(&walk).enumerate() {
            let error = (got.position - want.position).norm();
            ensure(error < LEGACY_TOLERANCE, || {
                format!("legacy waypoint {} off by {:.3e}m", i, error)
            })?;
        }
        
        if restored.is_empty() {
            return Ok(());
        }
        
        h.export.set_path(&h.tracker.pose(), &restored);
        h.press(&mut session, ControllerInput::HomeTap)?;
        let visited = h.run_until_idle(&mut session, self.max_ticks)?;
        expect_visits(&visited, restored.len())?;
        
        let saved = store.read(&h.store_key)?.unwrap_or_default();
        let version = serde_json::from_slice::<Value>(&saved)
            .ok()
            .and_then(|v| v.get("version").and_then(Value::as_u64));
        ensure(version == Some(codec::FORMAT_VERSION), || {
            format!("re-saved document has version {:?}", version)
        })?;
        
        info!("✓ LegacyImport complete: {} waypoints upgraded", restored.len());
        Ok(())
    }
}

/// Per-run state shared by every scenario.
struct Harness {
    scenario: ScenarioId,
    store_key: String,
    tracker: AnchorTracker,
    mapper: InputMapper,
    actor: KinematicActor,
    events: Option<Subscription<SessionEvent>>,
    export: SimExport,
    metrics: ScenarioMetrics,
    tick: u64,
    dt: f64,
}

impl Harness {
    fn new(runner: &ScenarioRunner, scenario: ScenarioId) -> Self {
        Self {
            scenario,
            store_key: format!("{}-{}.json", scenario.name(), runner.seed),
            tracker: AnchorTracker::new(runner.seed),
            mapper: InputMapper::new(CONTROLLER_ID),
            actor: KinematicActor::default(),
            events: None,
            export: SimExport::new(scenario.name(), runner.seed, runner.tick_rate_hz),
            metrics: ScenarioMetrics::default(),
            tick: 0,
            dt: 1.0 / runner.tick_rate_hz as f64,
        }
    }
    
    /// Follows `session`'s events from now on.
    fn attach<S: BlobStore>(&mut self, session: &WaypointSession<S>) {
        self.events = Some(session.subscribe());
    }
    
    /// Feeds one controller event through the input mapper.
    fn press<S: BlobStore>(
        &mut self,
        session: &mut WaypointSession<S>,
        input: ControllerInput,
    ) -> Result<(), SessionError> {
        let event = ControllerEvent::new(CONTROLLER_ID, input);
        match self.mapper.map(&event) {
            Some(command) => session.handle(command, &mut self.actor),
            None => {
                debug!(scenario = %self.scenario, "Input ignored: {:?}", event.input);
                Ok(())
            }
        }
    }
    
    /// Walks to `n` random spots, recording a waypoint at each.
    fn record_walk<S: BlobStore>(&mut self, session: &mut WaypointSession<S>, n: usize) -> Result<(), ScenarioFailure> {
        for _ in 0..n {
            self.actor.pose = self.tracker.random_pose_near_anchor(WALK_RADIUS);
            self.press(session, ControllerInput::Bumper)?;
            self.metrics.waypoints_recorded += 1;
        }
        Ok(())
    }
    
    /// One fixed-rate tick, exported as a frame.
    fn step<S: BlobStore>(&mut self, session: &mut WaypointSession<S>) -> TickReport {
        let report = session.tick(&mut self.actor, self.dt);
        self.tick += 1;
        
        if report.advanced_to.is_some() {
            self.metrics.waypoints_visited += 1;
        }
        
        let events = self.drain_events().iter().map(SimEvent::from).collect();
        
        self.export.add_frame(SimFrame {
            tick: self.tick,
            time_sec: self.tick as f64 * self.dt,
            actor: PoseSample::from(&self.actor.pose),
            target: session.player().target().map(PointSample::from),
            state: format!("{:?}", report.state),
            moving: report.moving,
            events,
        });
        report
    }
    
    /// Ticks until the player goes idle; returns every index it advanced to.
    fn run_until_idle<S: BlobStore>(
        &mut self,
        session: &mut WaypointSession<S>,
        max_ticks: u64,
    ) -> Result<Vec<usize>, ScenarioFailure> {
        let mut visited = Vec::new();
        for _ in 0..max_ticks {
            let report = self.step(session);
            visited.extend(report.advanced_to);
            if report.state == PlayerState::Idle {
                if let Some(target) = session.player().target() {
                    self.metrics.final_arrival_error = (self.actor.pose.position - target).norm();
                }
                return Ok(visited);
            }
        }
        Err(ScenarioFailure::check(format!(
            "player still {:?} after {} ticks",
            session.player().state(),
            max_ticks
        )))
    }
    
    /// Drains session events, folding saves into the metrics.
    fn drain_events(&mut self) -> Vec<SessionEvent> {
        let events = self.events.as_mut().map(Subscription::drain).unwrap_or_default();
        for event in &events {
            if let SessionEvent::Saved { bytes } = event {
                self.metrics.saves += 1;
                self.metrics.bytes_saved = *bytes;
            }
        }
        events
    }
    
    fn expect_at(&self, expected: &Point3<f64>, tolerance: f64, what: &str) -> Result<(), ScenarioFailure> {
        let error = (self.actor.pose.position - *expected).norm();
        ensure(error < tolerance, || format!("{}: actor {:.3e}m from expected position", what, error))
    }
}

impl From<&SessionEvent> for SimEvent {
    fn from(event: &SessionEvent) -> Self {
        match event {
            SessionEvent::PathCreated { uid } => SimEvent::info(format!("path created for {}", uid)),
            SessionEvent::PathRestored { uid, poses } => {
                SimEvent::info(format!("path restored for {} ({} waypoints)", uid, poses.len()))
            }
            SessionEvent::WaypointRecorded { index, .. } => SimEvent::info(format!("waypoint {} recorded", index)),
            SessionEvent::PlaybackStarted { waypoints } => {
                SimEvent::info(format!("playback started ({} waypoints)", waypoints))
            }
            SessionEvent::PlaybackCompleted => SimEvent::info("playback completed"),
            SessionEvent::Saved { bytes } => SimEvent::info(format!("saved {} bytes", bytes)),
        }
    }
}

fn ensure(condition: bool, reason: impl FnOnce() -> String) -> Result<(), ScenarioFailure> {
    if condition {
        Ok(())
    } else {
        Err(ScenarioFailure::check(reason()))
    }
}

fn expect_outcome(
    outcome: Result<AnchorOutcome, SessionError>,
    expected: AnchorOutcome,
) -> Result<(), ScenarioFailure> {
    match outcome {
        Ok(got) if got == expected => Ok(()),
        Ok(got) => Err(ScenarioFailure::check(format!("anchor outcome {:?}, expected {:?}", got, expected))),
        Err(e) => Err(e.into()),
    }
}

/// Playback of `n` waypoints must advance onto 1..n exactly once each.
fn expect_visits(visited: &[usize], n: usize) -> Result<(), ScenarioFailure> {
    let expected: Vec<usize> = (1..n).collect();
    ensure(visited == expected.as_slice(), || {
        format!("visited {:?}, expected {:?}", visited, expected)
    })
}

/// Single-precision `eRC` object, the way the headset demo saved matrices.
fn legacy_matrix(m: &nalgebra::Matrix4<f64>) -> Value {
    let mut object = serde_json::Map::new();
    for row in 0..4 {
        for col in 0..4 {
            let value = m[(row, col)] as f32;
            object.insert(format!("e{}{}", row, col), json!(value));
        }
    }
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_record_replay_scenario() {
        let runner = ScenarioRunner::new(42).with_waypoints(4);
        
        let result = runner.run(ScenarioId::RecordReplay);
        
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.waypoints_recorded, 4);
        assert_eq!(result.metrics.waypoints_visited, 3);
        assert!(result.metrics.saves >= 1);
        assert!(result.total_ticks > 0);
    }
    
    #[test]
    fn test_record_replay_single_waypoint() {
        let result = ScenarioRunner::new(7).with_waypoints(1).run(ScenarioId::RecordReplay);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.total_ticks, 1);
    }
    
    #[test]
    fn test_record_replay_empty_path_is_noop() {
        let result = ScenarioRunner::new(7).with_waypoints(0).run(ScenarioId::RecordReplay);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.total_ticks, 0);
    }
    
    #[test]
    fn test_relocalize_scenario() {
        let result = ScenarioRunner::new(42).run(ScenarioId::Relocalize);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.metrics.max_relocalization_shift > 0.0);
    }
    
    #[test]
    fn test_force_move_interrupt_scenario() {
        let result = ScenarioRunner::new(42).run(ScenarioId::ForceMoveInterrupt);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.metrics.final_arrival_error < 0.1);
    }
    
    #[test]
    fn test_corrupt_store_scenario() {
        let result = ScenarioRunner::new(42).run(ScenarioId::CorruptStore);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.metrics.bytes_saved > 0);
    }
    
    #[test]
    fn test_legacy_import_scenario() {
        let result = ScenarioRunner::new(42).with_waypoints(6).run(ScenarioId::LegacyImport);
        assert!(result.passed, "{:?}", result.failure_reason);
    }
    
    #[test]
    fn test_all_scenarios_on_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScenarioRunner::new(1234).with_store_dir(dir.path());
        
        for scenario in ScenarioId::all() {
            let result = runner.run(scenario);
            assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
        }
        
        // Second pass over the same directory starts from clean keys
        for scenario in ScenarioId::all() {
            assert!(runner.run(scenario).passed, "{} rerun", scenario);
        }
    }
    
    #[test]
    fn test_all_scenarios_on_sled() {
        let dir = tempfile::tempdir().unwrap();
        let db = SledStore::open(dir.path().join("waypoints.db")).unwrap();
        let runner = ScenarioRunner::new(77).with_sled(db);
        
        for scenario in ScenarioId::all() {
            let result = runner.run(scenario);
            assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
        }
    }
    
    #[test]
    fn test_deterministic() {
        let (a, export_a) = ScenarioRunner::new(99).run_with_export(ScenarioId::RecordReplay);
        let (b, export_b) = ScenarioRunner::new(99).run_with_export(ScenarioId::RecordReplay);
        
        assert_eq!(a.total_ticks, b.total_ticks);
        assert_eq!(export_a.frames.len(), export_b.frames.len());
        for (fa, fb) in export_a.frames.iter().zip(&export_b.frames) {
            assert_eq!(fa.actor, fb.actor);
        }
    }
    
    #[test]
    fn test_export_carries_frames_and_path() {
        let (result, export) = ScenarioRunner::new(5)
            .with_tick_rate(60)
            .run_with_export(ScenarioId::RecordReplay);
        
        assert!(export.passed);
        assert_eq!(export.frames.len() as u64, result.total_ticks);
        assert_eq!(export.waypoints.len(), 5);
        assert_eq!(export.tick_rate_hz, 60);
        assert!(export.frames.iter().any(|f| f.events.iter().any(|e| e.message == "playback completed")));
    }
    
    #[test]
    fn test_tick_budget_exhaustion_fails() {
        let result = ScenarioRunner::new(42)
            .with_waypoints(5)
            .with_max_ticks(2)
            .run(ScenarioId::RecordReplay);
        
        assert!(!result.passed);
        assert!(result.failure_reason.unwrap().contains("after 2 ticks"));
    }
    
    #[test]
    fn test_ensure_reports_check_failure() {
        assert!(ensure(true, || unreachable!()).is_ok());
        
        match ensure(false, || "waypoint 3 missing".to_string()) {
            Err(ScenarioFailure::Check(reason)) => assert_eq!(reason, "waypoint 3 missing"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
