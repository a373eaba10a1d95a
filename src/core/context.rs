//! Invocation context and the collaborator traits the core calls into.
//!
//! The core never talks to the chat platform directly. It sends and edits
//! messages through a [`Messenger`] and looks users up through a
//! [`UserDirectory`]; the bot layer provides serenity-backed versions and the
//! tests provide recording ones.

use crate::{
    config::AppConfig,
    core::{
        command::CommandRegistry,
        ids::{ChannelId, GuildId, MessageId, UserId},
        reply::{Embed, Reply},
        value::UserRef,
    },
    dialog::registry::SessionRegistry,
    errors::Result,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Handle to a message the bot has sent, used for later edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SentMessage {
    /// Channel the message lives in
    pub channel: ChannelId,
    /// Message id
    pub id: MessageId,
}

/// Handle to a component interaction that still needs acknowledging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionRef {
    /// Interaction id
    pub id: u64,
    /// Continuation token issued with the interaction
    pub token: String,
}

/// Outbound message capability.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Sends a new message to `channel`.
    async fn send(&self, channel: ChannelId, reply: Reply) -> Result<SentMessage>;

    /// Replaces the content of a message sent earlier.
    async fn edit(&self, message: &SentMessage, reply: Reply) -> Result<()>;

    /// Acknowledges a button press without changing anything visible.
    async fn acknowledge(&self, interaction: &InteractionRef) -> Result<()>;
}

/// User lookup capability.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolves a user id, returning `None` for unknown users.
    async fn fetch_user(&self, id: UserId) -> Result<Option<UserRef>>;
}

/// Where an invocation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSource {
    /// A user typed the command
    User,
    /// A scheduled job replayed a stored command
    Scheduled,
    /// Anything else, e.g. internal calls
    Other,
}

/// Per-invocation context handed to every command handler.
///
/// Cloning is cheap: everything shared sits behind an `Arc`.
#[derive(Clone)]
pub struct CommandContext {
    /// Origin of the invocation
    pub source: CommandSource,
    /// User who issued the command; `None` for system invocations
    pub requester: Option<UserRef>,
    /// Channel replies go to
    pub channel: ChannelId,
    /// Guild the channel belongs to, if any
    pub guild: Option<GuildId>,
    /// Outbound messages
    pub messenger: Arc<dyn Messenger>,
    /// Registered commands and the conversion graph
    pub registry: Arc<CommandRegistry>,
    /// Active dialog sessions
    pub sessions: Arc<SessionRegistry>,
    /// Application settings
    pub config: Arc<AppConfig>,
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("source", &self.source)
            .field("requester", &self.requester)
            .field("channel", &self.channel)
            .field("guild", &self.guild)
            .finish_non_exhaustive()
    }
}

impl CommandContext {
    /// Sends `reply` to the originating channel.
    pub async fn reply(&self, reply: Reply) -> Result<SentMessage> {
        self.messenger.send(self.channel, reply).await
    }

    /// Sends plain text to the originating channel.
    pub async fn say(&self, text: impl Into<String> + Send) -> Result<SentMessage> {
        self.reply(Reply::text(text)).await
    }

    /// Sends an embed, filling in the configured colour when none is set.
    pub async fn reply_embed(&self, embed: Embed) -> Result<SentMessage> {
        self.reply(Reply::embed(self.base_embed(embed))).await
    }

    /// Applies the configured embed colour and a "Requested by" footer to
    /// an embed that sets neither.
    #[must_use]
    pub fn base_embed(&self, mut embed: Embed) -> Embed {
        if embed.color.is_none() {
            embed.color = Some(self.config.embed_color);
        }
        if embed.footer.is_none() {
            embed.footer = match (self.source, &self.requester) {
                (CommandSource::User, Some(user)) => Some(format!("Requested by {}", user.name)),
                (CommandSource::Scheduled, Some(user)) => Some(format!("Scheduled by {}", user.name)),
                _ => None,
            };
        }
        embed
    }

    /// Whether the requester is the configured bot owner.
    #[must_use]
    pub fn requester_is_owner(&self) -> bool {
        match (&self.requester, self.config.owner_id) {
            (Some(user), Some(owner)) => user.id.get() == owner,
            _ => false,
        }
    }
}
