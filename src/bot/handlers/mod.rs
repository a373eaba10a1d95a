//! Discord event handlers
//!
//! Gateway events are converted into core events here. Messages and button
//! presses are offered to the active dialog in their channel first; messages
//! nobody claimed are then checked for the command prefix.

/// Message and component interaction handling
pub mod events;

pub use events::{IncomingMessage, event_handler, handle_component, handle_message};
