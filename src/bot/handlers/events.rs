//! Gateway event handling.

use crate::{
    bot::BotData,
    core::{
        context::InteractionRef,
        dispatch::{DispatchOutcome, dispatch, parse_invocation},
        ids::{ChannelId, GuildId, MessageId, UserId},
        value::UserRef,
    },
    dialog::event::{ComponentEvent, InboundEvent, MessageEvent},
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// A chat message reduced to what routing and dispatch need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Channel the message was posted in
    pub channel: ChannelId,
    /// Guild of the channel; `None` in direct messages
    pub guild: Option<GuildId>,
    /// Author of the message
    pub author: UserRef,
    /// Full message text, prefix included
    pub content: String,
}

impl From<&serenity::Message> for IncomingMessage {
    fn from(message: &serenity::Message) -> Self {
        Self {
            channel: ChannelId(message.channel_id.get()),
            guild: message.guild_id.map(|id| GuildId(id.get())),
            author: UserRef {
                id: UserId(message.author.id.get()),
                name: message.author.name.clone(),
            },
            content: message.content.clone(),
        }
    }
}

impl From<&serenity::ComponentInteraction> for ComponentEvent {
    fn from(interaction: &serenity::ComponentInteraction) -> Self {
        Self {
            channel: ChannelId(interaction.channel_id.get()),
            user: UserId(interaction.user.id.get()),
            message: Some(MessageId(interaction.message.id.get())),
            custom_id: interaction.data.custom_id.clone(),
            interaction: Some(InteractionRef {
                id: interaction.id.get(),
                token: interaction.token.clone(),
            }),
        }
    }
}

/// Offers `message` to the channel's dialog, then dispatches it if it is a
/// prefixed command.
///
/// Returns the dispatch task, or `None` when the message was consumed by a
/// dialog or is not a command.
pub fn handle_message(
    data: &BotData,
    message: IncomingMessage,
) -> Option<JoinHandle<Result<DispatchOutcome>>> {
    let event = InboundEvent::Message(MessageEvent {
        channel: message.channel,
        author: message.author.id,
        content: message.content.clone(),
    });
    if data.sessions.route(&event) {
        debug!("Message from {} routed to dialog in {}", message.author.id, message.channel);
        return None;
    }

    let (command, args) = parse_invocation(data.registry.prefix(), &message.content)?;
    let (command, args) = (command.to_string(), args.to_string());
    info!("{} invoked `{}` in channel {}", message.author.name, command, message.channel);

    let ctx = data.user_context(message.author, message.channel, message.guild);
    Some(tokio::spawn(async move {
        dispatch(&ctx, &command, &args)
            .await
            .inspect_err(|e| error!("Dispatch of `{}` failed: {}", command, e))
    }))
}

/// Routes a button press to the channel's dialog.
///
/// Presses nobody is waiting for (an expired prompt, another user's dialog)
/// are acknowledged here; a dialog acknowledges every press it takes.
/// Returns whether a dialog took the event.
pub async fn handle_component(data: &BotData, event: ComponentEvent) -> Result<bool> {
    let interaction = event.interaction.clone();
    if data.sessions.route(&InboundEvent::Component(event)) {
        return Ok(true);
    }

    if let Some(interaction) = interaction {
        debug!("Acknowledging unrouted interaction {}", interaction.id);
        data.messenger.acknowledge(&interaction).await?;
    }
    Ok(false)
}

/// Poise event handler: feeds messages and button presses into the core.
pub async fn event_handler(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, BotData, Error>,
    data: &BotData,
) -> Result<()> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if !new_message.author.bot {
                handle_message(data, IncomingMessage::from(new_message));
            }
        }
        serenity::FullEvent::InteractionCreate { interaction } => {
            if let Some(component) = interaction.as_message_component() {
                handle_component(data, ComponentEvent::from(component)).await?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        bot::build_registry,
        core::context::Messenger,
        dialog::registry::{Begin, SessionRegistry},
        test_utils::{CHANNEL, GUILD, REQUESTER, RecordingMessenger, requester, test_config, test_users},
    };
    use chrono::Utc;
    use std::sync::Arc;

    fn bot_data() -> (BotData, Arc<RecordingMessenger>) {
        let config = test_config();
        let messenger = Arc::new(RecordingMessenger::default());
        let data = BotData {
            registry: build_registry(&config, "maiden", test_users(), Utc::now()),
            sessions: Arc::new(SessionRegistry::new()),
            config: Arc::new(config),
            messenger: Arc::clone(&messenger) as Arc<dyn Messenger>,
        };
        (data, messenger)
    }

    fn incoming(author: UserRef, content: &str) -> IncomingMessage {
        IncomingMessage {
            channel: CHANNEL,
            guild: Some(GUILD),
            author,
            content: content.to_string(),
        }
    }

    fn other_user() -> UserRef {
        UserRef {
            id: UserId(7),
            name: "gwen".to_string(),
        }
    }

    #[tokio::test]
    async fn test_prefixed_message_dispatches() -> Result<()> {
        let (data, messenger) = bot_data();

        let task = handle_message(&data, incoming(requester(), "M!roll 2d1")).unwrap();
        assert!(task.await??.is_success());
        assert_eq!(messenger.sent_texts(), vec!["Rolled 2d1: 2!".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_plain_message_is_ignored() {
        let (data, messenger) = bot_data();
        assert!(handle_message(&data, incoming(requester(), "roll 2d1")).is_none());
        assert!(handle_message(&data, incoming(requester(), "m!")).is_none());
        assert!(messenger.log().is_empty());
    }

    #[tokio::test]
    async fn test_dialog_takes_requester_messages_first() -> Result<()> {
        let (data, messenger) = bot_data();
        let Begin::Started(mut handle) = data.sessions.begin(CHANNEL, REQUESTER) else {
            panic!("channel should be free");
        };

        assert!(handle_message(&data, incoming(requester(), "m!roll 2d1")).is_none());
        let InboundEvent::Message(routed) = handle.events.try_recv().unwrap() else {
            panic!("expected a message event");
        };
        assert_eq!(routed.content, "m!roll 2d1");

        let task = handle_message(&data, incoming(other_user(), "m!roll 1d1")).unwrap();
        task.await??;
        assert_eq!(messenger.sent_texts(), vec!["Rolled 1d1: 1!".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_unrouted_button_is_acknowledged() -> Result<()> {
        let (data, messenger) = bot_data();
        let event = ComponentEvent {
            channel: CHANNEL,
            user: REQUESTER,
            message: None,
            custom_id: "10:next".to_string(),
            interaction: Some(InteractionRef {
                id: 5,
                token: "expired".to_string(),
            }),
        };

        assert!(!handle_component(&data, event).await?);
        assert_eq!(messenger.acks()[0].id, 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_routed_button_is_left_to_the_dialog() -> Result<()> {
        let (data, messenger) = bot_data();
        let Begin::Started(mut handle) = data.sessions.begin(CHANNEL, REQUESTER) else {
            panic!("channel should be free");
        };
        let event = ComponentEvent {
            channel: CHANNEL,
            user: REQUESTER,
            message: None,
            custom_id: "10:A".to_string(),
            interaction: None,
        };

        assert!(handle_component(&data, event.clone()).await?);
        assert_eq!(handle.events.try_recv().unwrap(), InboundEvent::Component(event));
        assert!(messenger.acks().is_empty());
        Ok(())
    }
}
