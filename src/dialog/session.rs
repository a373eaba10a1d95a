//! Per-session state threaded through every step.

use crate::{
    core::{
        context::{Messenger, SentMessage},
        ids::{ChannelId, MessageId},
        reply::{Reply, fit_title},
        value::UserRef,
    },
    dialog::event::{ComponentEvent, InboundEvent},
    errors::{Error, Result},
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Everything a step can see and mutate while it runs.
///
/// `state` is the dialog's own record, owned by the session for its whole
/// lifetime; steps read answers left there by earlier steps.
pub struct DialogSession<S> {
    /// Caller-defined state shared by all steps
    pub state: S,
    /// Modal title, used as the first part of every prompt title
    pub title: String,
    /// User answering the dialog
    pub requester: UserRef,
    /// Channel the dialog runs in
    pub channel: ChannelId,
    pub(crate) messenger: Arc<dyn Messenger>,
    events: mpsc::UnboundedReceiver<InboundEvent>,
    last_prompt: Option<(SentMessage, Reply)>,
    prompt_live: bool,
}

impl<S> DialogSession<S> {
    pub(crate) fn new(
        state: S,
        title: String,
        requester: UserRef,
        channel: ChannelId,
        messenger: Arc<dyn Messenger>,
        events: mpsc::UnboundedReceiver<InboundEvent>,
    ) -> Self {
        Self {
            state,
            title,
            requester,
            channel,
            messenger,
            events,
            last_prompt: None,
            prompt_live: false,
        }
    }

    /// Waits for the next event routed to this session.
    pub async fn next_event(&mut self) -> Result<InboundEvent> {
        self.events.recv().await.ok_or(Error::SessionClosed)
    }

    /// Shows a prompt, either as a new message or by editing the previous
    /// prompt in place.
    pub async fn render(&mut self, reply: Reply, replace_previous: bool) -> Result<SentMessage> {
        let message = match (&self.last_prompt, replace_previous) {
            (Some((previous, _)), true) => {
                let previous = *previous;
                self.messenger.edit(&previous, reply.clone()).await?;
                previous
            }
            _ => self.messenger.send(self.channel, reply.clone()).await?,
        };

        self.last_prompt = Some((message, reply));
        self.prompt_live = true;
        Ok(message)
    }

    /// Sends a plain notice that is not a prompt.
    pub async fn notify(&mut self, text: &str) -> Result<()> {
        self.messenger.send(self.channel, Reply::text(text)).await?;
        Ok(())
    }

    /// Acknowledges a button press so the client does not report it as
    /// failed.
    pub async fn acknowledge(&mut self, event: &ComponentEvent) -> Result<()> {
        if let Some(interaction) = &event.interaction {
            self.messenger.acknowledge(interaction).await?;
        }
        Ok(())
    }

    /// Message the current prompt was rendered into.
    #[must_use]
    pub fn prompt_message(&self) -> Option<MessageId> {
        self.last_prompt.as_ref().map(|(message, _)| message.id)
    }

    /// Stops accepting events. Anything routed afterwards is handled as if
    /// no dialog owned the channel.
    pub fn close_events(&mut self) {
        self.events.close();
    }

    /// Locks the live prompt: the title gains a lock and "(expired)" and the
    /// buttons are removed so it cannot be answered out of order.
    pub async fn expire_prompt(&mut self) -> Result<()> {
        if !self.prompt_live {
            return Ok(());
        }
        self.prompt_live = false;

        let Some((message, reply)) = &self.last_prompt else {
            return Ok(());
        };

        let mut expired = reply.clone();
        expired.buttons.clear();
        if let Some(embed) = expired.embed.as_mut() {
            let title = embed.title.as_deref().unwrap_or("Dialog");
            embed.title = Some(fit_title("🔒 ", title, " (expired)"));
        }

        let message = *message;
        self.messenger.edit(&message, expired.clone()).await?;
        self.last_prompt = Some((message, expired));
        Ok(())
    }
}
