//! Built-in command modules.

/// Owner tools and user lookup
pub mod admin;

/// Ping, help and the command list
pub mod general;

/// Dice rolling
pub mod tabletop;

/// Debug-only dialog demos
pub mod test;

pub use admin::Administration;
pub use general::{General, ping};
pub use tabletop::Tabletop;
pub use test::Test;
