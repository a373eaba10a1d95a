//! Bot layer - Discord-specific glue and the built-in command modules
//!
//! The core only sees [`Messenger`] and [`UserDirectory`]; this module
//! provides the serenity-backed versions, turns gateway events into core
//! events and holds the state shared by every invocation.

/// Poise framework setup and the client lifecycle
pub mod client;
/// Built-in command modules (general, tabletop, administration, test)
pub mod commands;
/// Domain converters used by the built-in modules
pub mod converters;
/// Gateway event handlers
pub mod handlers;
/// Serenity implementations of the core collaborator traits
pub mod transport;

use crate::{
    config::AppConfig,
    core::{
        command::CommandRegistry,
        context::{CommandContext, CommandSource, Messenger, UserDirectory},
        ids::{ChannelId, GuildId},
        value::UserRef,
    },
    dialog::registry::SessionRegistry,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Shared data available to every command and event handler.
pub struct BotData {
    /// Frozen command table
    pub registry: Arc<CommandRegistry>,
    /// Active dialog sessions
    pub sessions: Arc<SessionRegistry>,
    /// Application settings
    pub config: Arc<AppConfig>,
    /// Outbound messages
    pub messenger: Arc<dyn Messenger>,
}

impl std::fmt::Debug for BotData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotData")
            .field("prefix", &self.registry.prefix())
            .field("active_sessions", &self.sessions.active_count())
            .finish_non_exhaustive()
    }
}

impl BotData {
    /// Context for a command typed by `requester` in `channel`.
    #[must_use]
    pub fn user_context(
        &self,
        requester: UserRef,
        channel: ChannelId,
        guild: Option<GuildId>,
    ) -> CommandContext {
        CommandContext {
            source: CommandSource::User,
            requester: Some(requester),
            channel,
            guild,
            messenger: Arc::clone(&self.messenger),
            registry: Arc::clone(&self.registry),
            sessions: Arc::clone(&self.sessions),
            config: Arc::clone(&self.config),
        }
    }
}

/// Builds the command table with every built-in module.
#[must_use]
pub fn build_registry(
    config: &AppConfig,
    bot_name: &str,
    users: Arc<dyn UserDirectory>,
    started_at: DateTime<Utc>,
) -> Arc<CommandRegistry> {
    CommandRegistry::builder(config.prefix.clone())
        .module(&commands::General::new(bot_name, started_at))
        .module(&commands::Tabletop)
        .module(&commands::Administration::new(users))
        .module(&commands::Test)
        .build()
}
