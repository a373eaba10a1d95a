//! Shared test utilities for `maiden`.
//!
//! A [`RecordingMessenger`] stands in for the chat platform and keeps every
//! outbound call, [`StaticUsers`] answers user lookups from a fixed table and
//! [`TestHarness`] wires both into a ready-to-use [`CommandContext`].

use crate::{
    config::AppConfig,
    core::{
        command::CommandRegistry,
        context::{
            CommandContext, CommandSource, InteractionRef, Messenger, SentMessage, UserDirectory,
        },
        ids::{ChannelId, GuildId, MessageId, UserId},
        reply::{Embed, Reply},
        value::UserRef,
    },
    dialog::{
        event::{ComponentEvent, InboundEvent, MessageEvent},
        registry::SessionRegistry,
    },
    errors::Result,
};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

/// Channel every harness context runs in.
pub const CHANNEL: ChannelId = ChannelId(10);
/// Guild of [`CHANNEL`].
pub const GUILD: GuildId = GuildId(20);
/// User issuing commands in the harness.
pub const REQUESTER: UserId = UserId(100);
/// Configured bot owner.
pub const OWNER: UserId = UserId(1);

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Send {
        channel: ChannelId,
        id: MessageId,
        reply: Reply,
    },
    Edit {
        message: SentMessage,
        reply: Reply,
    },
    Acknowledge(InteractionRef),
}

/// Messenger that records instead of sending.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    log: Mutex<Vec<Outbound>>,
    next_id: AtomicU64,
}

impl RecordingMessenger {
    /// Everything sent so far, in order.
    pub fn log(&self) -> Vec<Outbound> {
        self.log.lock().unwrap().clone()
    }

    /// Replies of new messages, ignoring edits.
    pub fn sent(&self) -> Vec<Reply> {
        self.log()
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Send { reply, .. } => Some(reply),
                _ => None,
            })
            .collect()
    }

    /// Embed of the most recently sent message that had one.
    pub fn last_embed(&self) -> Option<Embed> {
        self.sent().into_iter().rev().find_map(|reply| reply.embed)
    }

    /// Content of sent plain-text messages.
    pub fn sent_texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|reply| reply.embed.is_none())
            .filter_map(|reply| reply.content)
            .collect()
    }

    /// Titles of sent embeds.
    pub fn sent_titles(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|reply| reply.embed.and_then(|e| e.title))
            .collect()
    }

    /// Acknowledged interactions.
    pub fn acks(&self) -> Vec<InteractionRef> {
        self.log()
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Acknowledge(interaction) => Some(interaction),
                _ => None,
            })
            .collect()
    }

    fn push(&self, outbound: Outbound) {
        self.log.lock().unwrap().push(outbound);
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, channel: ChannelId, reply: Reply) -> Result<SentMessage> {
        let id = MessageId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.push(Outbound::Send { channel, id, reply });
        Ok(SentMessage { channel, id })
    }

    async fn edit(&self, message: &SentMessage, reply: Reply) -> Result<()> {
        self.push(Outbound::Edit {
            message: *message,
            reply,
        });
        Ok(())
    }

    async fn acknowledge(&self, interaction: &InteractionRef) -> Result<()> {
        self.push(Outbound::Acknowledge(interaction.clone()));
        Ok(())
    }
}

/// User directory backed by a fixed table.
#[derive(Debug, Default)]
pub struct StaticUsers {
    users: HashMap<UserId, UserRef>,
}

impl StaticUsers {
    pub fn with(mut self, id: u64, name: &str) -> Self {
        let id = UserId(id);
        self.users.insert(
            id,
            UserRef {
                id,
                name: name.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl UserDirectory for StaticUsers {
    async fn fetch_user(&self, id: UserId) -> Result<Option<UserRef>> {
        Ok(self.users.get(&id).cloned())
    }
}

/// The users every test knows about: the owner, the requester and user 7.
pub fn test_users() -> Arc<dyn UserDirectory> {
    Arc::new(
        StaticUsers::default()
            .with(OWNER.get(), "owner")
            .with(REQUESTER.get(), "requester")
            .with(7, "gwen"),
    )
}

/// The user behind [`REQUESTER`].
pub fn requester() -> UserRef {
    UserRef {
        id: REQUESTER,
        name: "requester".to_string(),
    }
}

/// Settings used by the harness: debug on, [`OWNER`] as owner.
pub fn test_config() -> AppConfig {
    AppConfig {
        owner_id: Some(OWNER.get()),
        debug: true,
        ..AppConfig::default()
    }
}

/// A context plus the fakes behind it.
pub struct TestHarness {
    pub ctx: CommandContext,
    pub messenger: Arc<RecordingMessenger>,
    pub sessions: Arc<SessionRegistry>,
}

impl TestHarness {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self::with_config(registry, test_config())
    }

    pub fn with_config(registry: Arc<CommandRegistry>, config: AppConfig) -> Self {
        let messenger = Arc::new(RecordingMessenger::default());
        let sessions = Arc::new(SessionRegistry::new());
        let ctx = CommandContext {
            source: CommandSource::User,
            requester: Some(requester()),
            channel: CHANNEL,
            guild: Some(GUILD),
            messenger: Arc::clone(&messenger) as Arc<dyn Messenger>,
            registry,
            sessions: Arc::clone(&sessions),
            config: Arc::new(config),
        };
        Self {
            ctx,
            messenger,
            sessions,
        }
    }

    /// The same context with another requester.
    pub fn as_user(&self, id: UserId, name: &str) -> CommandContext {
        CommandContext {
            requester: Some(UserRef {
                id,
                name: name.to_string(),
            }),
            ..self.ctx.clone()
        }
    }

    /// Routes `event` through the session registry.
    pub fn route(&self, event: InboundEvent) -> bool {
        self.sessions.route(&event)
    }
}

/// A message typed in [`CHANNEL`].
pub fn message(author: UserId, content: &str) -> InboundEvent {
    InboundEvent::Message(MessageEvent {
        channel: CHANNEL,
        author,
        content: content.to_string(),
    })
}

/// A button press in [`CHANNEL`].
pub fn button(user: UserId, custom_id: &str) -> InboundEvent {
    InboundEvent::Component(ComponentEvent {
        channel: CHANNEL,
        user,
        message: None,
        custom_id: custom_id.to_string(),
        interaction: Some(InteractionRef {
            id: 1,
            token: format!("token-{custom_id}"),
        }),
    })
}

/// A button press on `message` in [`CHANNEL`].
pub fn button_on(user: UserId, message: MessageId, custom_id: &str) -> InboundEvent {
    let InboundEvent::Component(event) = button(user, custom_id) else {
        unreachable!("button() builds a component event");
    };
    InboundEvent::Component(ComponentEvent {
        message: Some(message),
        ..event
    })
}
