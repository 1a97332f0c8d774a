//! Batch orchestration: message protocol, actors and the runtime that wires
//! them together.

pub mod actors;
pub mod config;
pub mod events;
pub mod messages;
pub mod recipient;
pub mod runtime;

pub use actors::*;
pub use config::*;
pub use events::*;
pub use messages::*;
pub use recipient::*;
pub use runtime::*;
