//! Inbound events a dialog session can consume.

use crate::core::{
    context::InteractionRef,
    ids::{ChannelId, MessageId, UserId},
};

/// A chat message posted in a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    /// Channel the message was posted in
    pub channel: ChannelId,
    /// Author of the message
    pub author: UserId,
    /// Message text
    pub content: String,
}

/// A button press on a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentEvent {
    /// Channel of the message holding the button
    pub channel: ChannelId,
    /// User who pressed the button
    pub user: UserId,
    /// Message holding the button; absent for synthetic events
    pub message: Option<MessageId>,
    /// Identifier the button was created with
    pub custom_id: String,
    /// Needed to acknowledge the press; absent for synthetic events
    pub interaction: Option<InteractionRef>,
}

/// Anything the session registry can route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A typed message
    Message(MessageEvent),
    /// A button press
    Component(ComponentEvent),
}

impl InboundEvent {
    /// Channel the event happened in.
    #[must_use]
    pub const fn channel(&self) -> ChannelId {
        match self {
            Self::Message(event) => event.channel,
            Self::Component(event) => event.channel,
        }
    }

    /// User who caused the event.
    #[must_use]
    pub const fn user(&self) -> UserId {
        match self {
            Self::Message(event) => event.author,
            Self::Component(event) => event.user,
        }
    }
}
