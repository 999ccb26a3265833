//! Controller input and the commands it maps onto.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Trigger travel (0.0 - 1.0) at which a pull counts as a press.
pub const TRIGGER_PRESS_THRESHOLD: f32 = 0.5;

/// Raw input as delivered by the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerInput {
    /// Shoulder bumper pressed
    Bumper,
    
    /// Home button tapped
    HomeTap,
    
    /// Trigger pulled to `value`, with whatever the pointer ray hit
    Trigger {
        value: f32,
        hit: Option<Point3<f64>>,
    },
}

/// A controller event tagged with the device that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerEvent {
    pub controller_id: u8,
    pub input: ControllerInput,
}

impl ControllerEvent {
    /// Creates a new event.
    pub fn new(controller_id: u8, input: ControllerInput) -> Self {
        Self { controller_id, input }
    }
}

/// Discrete commands understood by a waypoint session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputCommand {
    /// Record the actor's current pose as the next waypoint
    Record,
    
    /// Replay the recorded path from the beginning
    PlayBack,
    
    /// Abandon any path and walk to a single world-space point
    ForceMove(Point3<f64>),
}

/// Maps controller events onto session commands.
///
/// Only the connected controller is listened to; events from any other
/// device id are dropped.
#[derive(Debug, Clone)]
pub struct InputMapper {
    controller_id: Option<u8>,
}

impl InputMapper {
    /// Creates a mapper for the given controller.
    pub fn new(controller_id: u8) -> Self {
        Self {
            controller_id: Some(controller_id),
        }
    }
    
    /// Creates a mapper with no controller connected yet.
    pub fn disconnected() -> Self {
        Self {
            controller_id: None,
        }
    }
    
    /// Records a (re)connected controller.
    pub fn connect(&mut self, controller_id: u8) {
        self.controller_id = Some(controller_id);
    }
    
    /// Forgets the connected controller.
    pub fn disconnect(&mut self) {
        self.controller_id = None;
    }
    
    /// Returns true if events from `controller_id` are accepted.
    pub fn is_valid(&self, controller_id: u8) -> bool {
        self.controller_id == Some(controller_id)
    }
    
    /// Translates one event, or `None` if it maps to nothing.
    pub fn map(&self, event: &ControllerEvent) -> Option<InputCommand> {
        if !self.is_valid(event.controller_id) {
            return None;
        }
        
        match event.input {
            ControllerInput::Bumper => Some(InputCommand::Record),
            ControllerInput::HomeTap => Some(InputCommand::PlayBack),
            ControllerInput::Trigger { value, hit } => {
                if value < TRIGGER_PRESS_THRESHOLD {
                    return None;
                }
                hit.map(InputCommand::ForceMove)
            }
        }
    }
}
