//! Domain converters registered by the built-in modules.
//!
//! Both consume text: a user mention resolves through the platform, and a
//! `guild/channel` pair is parsed locally.

use crate::{
    core::{
        context::UserDirectory,
        conversion::Converter,
        ids::{ChannelId, GuildId, UserId},
        value::{GuildChannel, Value, ValueKind},
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock};

/// Cost of both domain converters.
pub const DOMAIN_PRIORITY: u32 = 1;

static MENTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // Literal pattern
    Regex::new(r"^<@!?(\d+)>$").unwrap()
});

fn expect_text(value: Value, to: ValueKind) -> Result<String> {
    match value {
        Value::Text(text) => Ok(text),
        other => Err(Error::Conversion {
            from: other.kind(),
            to,
            message: format!("expected text, got `{other}`"),
        }),
    }
}

/// Resolves `<@id>` and `<@!id>` mentions to users.
pub struct MentionConverter {
    users: Arc<dyn UserDirectory>,
}

impl MentionConverter {
    /// Converter resolving mentions through `users`.
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }
}

impl std::fmt::Debug for MentionConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MentionConverter").finish_non_exhaustive()
    }
}

#[async_trait]
impl Converter for MentionConverter {
    async fn convert(&self, value: Value) -> Result<Value> {
        let text = expect_text(value, ValueKind::User)?;
        let failed = |message: String| Error::Conversion {
            from: ValueKind::Text,
            to: ValueKind::User,
            message,
        };

        let id = MENTION_PATTERN
            .captures(text.trim())
            .and_then(|caps| caps.get(1))
            .and_then(|id| id.as_str().parse::<u64>().ok())
            .ok_or_else(|| failed(format!("`{text}` is not a user mention")))?;

        self.users
            .fetch_user(UserId(id))
            .await?
            .map(Value::User)
            .ok_or_else(|| failed(format!("no user with id {id}")))
    }
}

/// Parses `guild/channel` numeric pairs.
#[derive(Debug, Default, Clone, Copy)]
pub struct GuildChannelConverter;

impl GuildChannelConverter {
    fn parse(text: &str) -> Option<GuildChannel> {
        let (guild, channel) = text.trim().split_once('/')?;
        Some(GuildChannel {
            guild: GuildId(guild.parse().ok()?),
            channel: ChannelId(channel.parse().ok()?),
        })
    }
}

#[async_trait]
impl Converter for GuildChannelConverter {
    async fn convert(&self, value: Value) -> Result<Value> {
        let text = expect_text(value, ValueKind::GuildChannel)?;
        Self::parse(&text)
            .map(Value::GuildChannel)
            .ok_or_else(|| Error::Conversion {
                from: ValueKind::Text,
                to: ValueKind::GuildChannel,
                message: format!("`{text}` is not a guild/channel pair"),
            })
    }
}
