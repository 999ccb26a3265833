//! Waypoint Environment Abstraction Layer
//!
//! This crate holds the seams between the waypoint engine and the host
//! it runs in. Everything the engine would otherwise reach for directly
//! is injected through here:
//! - Storage (`BlobStore`: memory, files, sled)
//! - Anchors (`AnchorUpdate`, delivered whenever tracking resolves one)
//! - Input (`ControllerEvent` -> `InputCommand`)
//! - Notifications (`EventBus` with drop-scoped subscriptions)
//!
//! # Example
//!
//! ```ignore
//! use waypoint_env::{FileStore, InputMapper, ControllerEvent, ControllerInput};
//!
//! let store = FileStore::new("/documents/C1");
//! let mapper = InputMapper::new(0);
//! if let Some(cmd) = mapper.map(&ControllerEvent::new(0, ControllerInput::Bumper)) {
//!     session.handle(cmd, &mut actor)?;
//! }
//! ```

mod error;
mod events;
mod input;
mod store;
mod types;

pub use error::EnvError;
pub use events::{EventBus, Subscription};
pub use input::{ControllerEvent, ControllerInput, InputCommand, InputMapper, TRIGGER_PRESS_THRESHOLD};
pub use store::{BlobStore, FileStore, MemoryStore, SledStore};
pub use types::{AnchorUid, AnchorUpdate};
