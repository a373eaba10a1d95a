//! Administration commands - owner-only messaging, user lookup and a
//! deliberate failure for checking error reports.

use crate::{
    bot::converters::{DOMAIN_PRIORITY, GuildChannelConverter, MentionConverter},
    core::{
        command::{Args, Module, ParamSpec, RegisteredCommand},
        context::{CommandContext, UserDirectory},
        conversion::ConversionGraph,
        reply::{Embed, Reply},
        value::ValueKind,
    },
    errors::{Error, Result},
};
use std::sync::Arc;
use tracing::info;

/// Tells a non-owner no. Returns `true` when the requester may continue.
async fn owner_only(ctx: &CommandContext) -> Result<bool> {
    let Some(requester) = &ctx.requester else {
        return Ok(false);
    };

    if ctx.requester_is_owner() {
        return Ok(true);
    }

    ctx.say(format!("{} no", requester.mention())).await?;
    Ok(false)
}

async fn say(ctx: CommandContext, args: Args) -> Result<()> {
    if !owner_only(&ctx).await? {
        return Ok(());
    }
    ctx.say(args.text(0)?).await?;
    Ok(())
}

async fn sayin(ctx: CommandContext, args: Args) -> Result<()> {
    if !owner_only(&ctx).await? {
        return Ok(());
    }

    let target = args.guild_channel(0)?;
    info!("Owner message to channel {} in guild {}", target.channel, target.guild);
    ctx.messenger
        .send(target.channel, Reply::text(args.text(1)?))
        .await?;
    Ok(())
}

async fn userinfo(ctx: CommandContext, args: Args) -> Result<()> {
    let user = args.user(0)?;
    let embed = Embed::new()
        .title(format!("Info for user {}", user.name))
        .description(format!("User ID: {}", user.id));
    ctx.reply_embed(embed).await?;
    Ok(())
}

#[allow(clippy::unused_async)]
async fn throw(_ctx: CommandContext, _args: Args) -> Result<()> {
    Err(Error::command("Success"))
}

/// Owner tools and user lookup.
pub struct Administration {
    users: Arc<dyn UserDirectory>,
}

impl Administration {
    /// Module looking users up in `users`.
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }
}

impl std::fmt::Debug for Administration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Administration").finish_non_exhaustive()
    }
}

impl Module for Administration {
    fn name(&self) -> &'static str {
        "administration"
    }

    fn register_converters(&self, graph: &mut ConversionGraph) {
        graph.add_converter(
            ValueKind::Text,
            ValueKind::User,
            Arc::new(MentionConverter::new(Arc::clone(&self.users))),
            DOMAIN_PRIORITY,
        );
        graph.add_converter(
            ValueKind::Text,
            ValueKind::GuildChannel,
            Arc::new(GuildChannelConverter),
            DOMAIN_PRIORITY,
        );
    }

    fn commands(&self) -> Vec<RegisteredCommand> {
        vec![
            RegisteredCommand::new("say", say)
                .param(ParamSpec::text("text").join_remaining())
                .hidden(),
            RegisteredCommand::new("sayin", sayin)
                .param(ParamSpec::new("target", ValueKind::GuildChannel))
                .param(ParamSpec::text("text").join_remaining())
                .hidden(),
            RegisteredCommand::new("userinfo", userinfo)
                .param(ParamSpec::new("user", ValueKind::User))
                .help("Fetch a user's account information."),
            RegisteredCommand::new("throw", throw).hidden(),
        ]
    }
}
