//! Serenity implementations of [`Messenger`] and [`UserDirectory`].

use crate::{
    core::{
        context::{InteractionRef, Messenger, SentMessage, UserDirectory},
        ids::{ChannelId, MessageId, UserId},
        reply::{Button, ButtonStyle, Embed, Reply},
        value::UserRef,
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{debug, warn};

fn build_embed(embed: Embed) -> serenity::CreateEmbed {
    let mut builder = serenity::CreateEmbed::new();
    if let Some(title) = embed.title {
        builder = builder.title(title);
    }
    if let Some(description) = embed.description {
        builder = builder.description(description);
    }
    for field in embed.fields {
        builder = builder.field(field.name, field.value, field.inline);
    }
    if let Some(footer) = embed.footer {
        builder = builder.footer(serenity::CreateEmbedFooter::new(footer));
    }
    if let Some(color) = embed.color {
        builder = builder.colour(color);
    }
    if let Some(url) = embed.thumbnail {
        builder = builder.thumbnail(url);
    }
    builder
}

const fn button_style(style: ButtonStyle) -> serenity::ButtonStyle {
    match style {
        ButtonStyle::Primary => serenity::ButtonStyle::Primary,
        ButtonStyle::Secondary => serenity::ButtonStyle::Secondary,
        ButtonStyle::Success => serenity::ButtonStyle::Success,
        ButtonStyle::Danger => serenity::ButtonStyle::Danger,
    }
}

/// All buttons go in a single action row; no buttons means no rows.
fn build_components(buttons: Vec<Button>) -> Vec<serenity::CreateActionRow> {
    if buttons.is_empty() {
        return Vec::new();
    }

    let buttons = buttons
        .into_iter()
        .map(|button| {
            let mut builder = serenity::CreateButton::new(button.custom_id)
                .label(button.label)
                .style(button_style(button.style));
            if let Some(emoji) = button.emoji {
                builder = builder.emoji(serenity::ReactionType::Unicode(emoji));
            }
            builder
        })
        .collect();
    vec![serenity::CreateActionRow::Buttons(buttons)]
}

/// Sends and edits messages over the Discord HTTP API.
#[derive(Debug, Clone)]
pub struct SerenityMessenger {
    http: Arc<serenity::Http>,
}

impl SerenityMessenger {
    /// Messenger sending through `http`.
    #[must_use]
    pub const fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Messenger for SerenityMessenger {
    async fn send(&self, channel: ChannelId, reply: Reply) -> Result<SentMessage> {
        if channel.get() == 0 {
            return Err(Error::Transport {
                message: "channel id 0 is not a valid Discord channel".to_string(),
            });
        }

        let mut message = serenity::CreateMessage::new();
        if let Some(content) = reply.content {
            message = message.content(content);
        }
        if let Some(embed) = reply.embed {
            message = message.embed(build_embed(embed));
        }
        let components = build_components(reply.buttons);
        if !components.is_empty() {
            message = message.components(components);
        }

        let sent = serenity::ChannelId::new(channel.get())
            .send_message(&*self.http, message)
            .await?;
        debug!("Sent message {} to channel {}", sent.id, channel);

        Ok(SentMessage {
            channel,
            id: MessageId(sent.id.get()),
        })
    }

    async fn edit(&self, message: &SentMessage, reply: Reply) -> Result<()> {
        let edit = serenity::EditMessage::new()
            .content(reply.content.unwrap_or_default())
            .embeds(reply.embed.into_iter().map(build_embed).collect())
            .components(build_components(reply.buttons));

        serenity::ChannelId::new(message.channel.get())
            .edit_message(&*self.http, serenity::MessageId::new(message.id.get()), edit)
            .await?;
        Ok(())
    }

    async fn acknowledge(&self, interaction: &InteractionRef) -> Result<()> {
        self.http
            .create_interaction_response(
                serenity::InteractionId::new(interaction.id),
                &interaction.token,
                &serenity::CreateInteractionResponse::Acknowledge,
                Vec::new(),
            )
            .await?;
        Ok(())
    }
}

/// Looks users up over the Discord HTTP API.
#[derive(Debug, Clone)]
pub struct SerenityUsers {
    http: Arc<serenity::Http>,
}

impl SerenityUsers {
    /// Directory fetching users through `http`.
    #[must_use]
    pub const fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl UserDirectory for SerenityUsers {
    async fn fetch_user(&self, id: UserId) -> Result<Option<UserRef>> {
        if id.get() == 0 {
            return Ok(None);
        }

        match serenity::UserId::new(id.get()).to_user(&*self.http).await {
            Ok(user) => Ok(Some(UserRef {
                id,
                name: user.name,
            })),
            Err(e) => {
                warn!("Could not fetch user {}: {}", id, e);
                Ok(None)
            }
        }
    }
}
