//! Scenario catalogue for the waypoint simulator.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// WP-001: record a walk, replay it to the end
    RecordReplay,
    
    /// WP-002: save, reopen, drift the anchor, replay in the new frame
    Relocalize,
    
    /// WP-003: ad-hoc move interrupts a running playback
    ForceMoveInterrupt,
    
    /// WP-004: garbage in the store must not block a fresh path
    CorruptStore,
    
    /// WP-005: restore a path saved in the legacy headset format
    LegacyImport,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::RecordReplay,
            ScenarioId::Relocalize,
            ScenarioId::ForceMoveInterrupt,
            ScenarioId::CorruptStore,
            ScenarioId::LegacyImport,
        ]
    }
    
    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::RecordReplay => "record_replay",
            ScenarioId::Relocalize => "relocalize",
            ScenarioId::ForceMoveInterrupt => "force_move_interrupt",
            ScenarioId::CorruptStore => "corrupt_store",
            ScenarioId::LegacyImport => "legacy_import",
        }
    }
    
    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::RecordReplay => "Record N waypoints, play back, visit every one in order",
            ScenarioId::Relocalize => "Persist, reopen, move the anchor, replay relative to the new anchor",
            ScenarioId::ForceMoveInterrupt => "Force-move mid playback, cursor cleared, actor settles on the point",
            ScenarioId::CorruptStore => "Unreadable persisted path is logged and replaced by a fresh one",
            ScenarioId::LegacyImport => "Decode a legacy document and play it back",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;
    
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "record_replay" | "recordreplay" | "wp-001" => Ok(ScenarioId::RecordReplay),
            "relocalize" | "wp-002" => Ok(ScenarioId::Relocalize),
            "force_move_interrupt" | "forcemove" | "wp-003" => Ok(ScenarioId::ForceMoveInterrupt),
            "corrupt_store" | "corruptstore" | "wp-004" => Ok(ScenarioId::CorruptStore),
            "legacy_import" | "legacy" | "wp-005" => Ok(ScenarioId::LegacyImport),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_names_round_trip() {
        for id in ScenarioId::all() {
            assert_eq!(id.name().parse::<ScenarioId>(), Ok(id));
            assert_eq!(id.to_string(), id.name());
        }
    }
    
    #[test]
    fn test_aliases() {
        assert_eq!("WP-003".parse::<ScenarioId>(), Ok(ScenarioId::ForceMoveInterrupt));
        assert_eq!("legacy".parse::<ScenarioId>(), Ok(ScenarioId::LegacyImport));
        assert!("split_brain".parse::<ScenarioId>().is_err());
    }
}
