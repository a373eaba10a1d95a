//! General commands - ping, help and the command list.
//!
//! `help` and `commands` read the registry from the invocation context, so
//! they always describe exactly what is registered.

use crate::{
    core::{
        command::{Args, HelpText, Module, ParamSpec, RegisteredCommand},
        context::CommandContext,
        reply::{ButtonStyle, Embed, EmbedField},
    },
    dialog::{DialogStep, StepModal, StepOption, StepResult, begin_modal},
    errors::Result,
};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::{fmt::Write, sync::LazyLock};

/// Commands shown per page by `commands`.
pub const COMMANDS_PER_PAGE: usize = 15;

const NO_HELP_TEXT: &str = "_No help text available._";

static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // Literal pattern
    Regex::new(r"\.(?:\s|$)").unwrap()
});

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }
}

pub use inner::*;

/// Formats an uptime like `2d 3h 4m 5s`, leaving out leading zero units.
#[must_use]
pub fn pretty_duration(duration: chrono::Duration) -> String {
    let total = duration.num_seconds().max(0);
    let (days, hours, minutes, seconds) =
        (total / 86_400, total % 86_400 / 3_600, total % 3_600 / 60, total % 60);

    let mut out = String::new();
    for (value, unit) in [(days, "d"), (hours, "h"), (minutes, "m")] {
        if value > 0 || !out.is_empty() {
            let _ = write!(out, "{value}{unit} ");
        }
    }
    let _ = write!(out, "{seconds}s");
    out
}

/// First sentence of a help summary.
fn short_text(help: Option<&HelpText>) -> String {
    help.map(HelpText::display_summary)
        .and_then(|summary| SENTENCE_END.split(summary).next())
        .filter(|text| !text.trim().is_empty())
        .map_or_else(|| NO_HELP_TEXT.to_string(), str::to_string)
}

/// Bot information, overload help and the command list.
#[derive(Debug, Clone)]
pub struct General {
    bot_name: String,
    started_at: DateTime<Utc>,
}

impl General {
    /// Module for the bot called `bot_name`, online since `started_at`.
    pub fn new(bot_name: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            bot_name: bot_name.into(),
            started_at,
        }
    }

    async fn about(self, ctx: CommandContext) -> Result<()> {
        let prefix = ctx.registry.prefix().to_string();
        let uptime = pretty_duration(Utc::now() - self.started_at);
        let count = ctx.registry.visible().len();

        let embed = Embed::new()
            .title(format!("About {}", self.bot_name))
            .description(format!(
                "Hi! I'm {}, a bot that runs commands and small interactive dialogs.",
                self.bot_name
            ))
            .field("Command prefix", format!("`{prefix}`"), true)
            .field(
                "Getting started",
                format!(
                    "Here are some commands you can try out to get started:\n`{prefix}commands`\n`{prefix}help roll`"
                ),
                false,
            )
            .field(
                "Status",
                format!("**Uptime**: {uptime}\n**Commands**: {count}"),
                true,
            );

        ctx.reply_embed(embed).await?;
        Ok(())
    }
}

async fn pong(ctx: CommandContext, _args: Args) -> Result<()> {
    ctx.say("Pong!").await?;
    Ok(())
}

async fn help_command(ctx: CommandContext, args: Args) -> Result<()> {
    let name = args.text(0)?;
    let prefix = ctx.registry.prefix();
    let overloads: Vec<&RegisteredCommand> = ctx.registry.named_ignore_case(name).collect();

    if overloads.is_empty() {
        ctx.say("That command doesn't seem to exist.").await?;
        return Ok(());
    }

    let mut embed = Embed::new().title(format!("About {name}"));
    let mut related: Vec<&RegisteredCommand> = Vec::new();

    for (i, command) in overloads.iter().enumerate() {
        let title = command.display_title(prefix);
        let name = if overloads.len() == 1 {
            title
        } else {
            format!("#{}: {title}", i + 1)
        };
        let description = command
            .help
            .as_ref()
            .map(|help| help.description.clone())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| NO_HELP_TEXT.to_string());
        embed = embed.field(name, description, false);

        let Some(group) = command
            .help
            .as_ref()
            .and_then(|help| help.group.as_deref())
            .filter(|group| !group.trim().is_empty())
        else {
            continue;
        };

        for other in ctx.registry.commands() {
            let same_group = other.help.as_ref().and_then(|h| h.group.as_deref()) == Some(group);
            let is_overload = overloads.iter().any(|o| std::ptr::eq(*o, other));
            let seen = related.iter().any(|r| std::ptr::eq(*r, other));
            if same_group && !is_overload && !seen {
                related.push(other);
            }
        }
    }

    if !related.is_empty() {
        let mut text = String::new();
        for command in related {
            let summary = command.help.as_ref().map_or("", HelpText::display_summary);
            let _ = writeln!(text, "{}: {summary}", command.display_title(prefix));
        }
        embed = embed.field("Related commands", text.trim_end(), false);
    }

    ctx.reply_embed(embed).await?;
    Ok(())
}

/// One line of the command list.
#[derive(Debug, Clone)]
struct Listed {
    name: String,
    summary: String,
}

/// State of the `commands` dialog.
#[derive(Debug)]
struct CommandPages {
    page: usize,
    pages: Vec<Vec<Listed>>,
    prefix: String,
}

fn commands_step(pages: &CommandPages) -> Result<DialogStep<CommandPages>> {
    DialogStep::builder()
        .replace_previous()
        .main_text(format!(
            "**Use `{}help [command-name]` for information on how to use a specific command.**",
            pages.prefix
        ))
        .option(StepOption::new("Previous").icon("⬅️").data("previous"))
        .option(StepOption::new("Next").icon("➡️").data("next"))
        .option(
            StepOption::new("Close")
                .icon("❎")
                .data("close")
                .style(ButtonStyle::Danger),
        )
        .decorate(|state: &CommandPages, embed| {
            let title = embed.title.clone().unwrap_or_default();
            embed.title = Some(format!(
                "{title} (page {} of {})",
                state.page + 1,
                state.pages.len().max(1)
            ));
            embed.fields.push(EmbedField {
                name: "Command prefix".to_string(),
                value: format!("`{}`", state.prefix),
                inline: false,
            });
            for listed in state.pages.get(state.page).into_iter().flatten() {
                embed.fields.push(EmbedField {
                    name: format!("`{}`", listed.name),
                    value: listed.summary.clone(),
                    inline: true,
                });
            }
        })
        .on_complete(|state: &mut CommandPages, option, _| {
            if option.is("previous") {
                state.page = state.page.saturating_sub(1);
            } else if option.is("next") {
                state.page = (state.page + 1).min(state.pages.len().saturating_sub(1));
            } else {
                return StepResult::Finish;
            }
            StepResult::GotoCurrent
        })
        .build()
}

async fn commands(ctx: CommandContext, _args: Args) -> Result<()> {
    let listed: Vec<Listed> = ctx
        .registry
        .visible()
        .into_iter()
        .map(|command| Listed {
            name: command.name.clone(),
            summary: short_text(command.help.as_ref()),
        })
        .collect();

    let state = CommandPages {
        page: 0,
        pages: listed.chunks(COMMANDS_PER_PAGE).map(<[Listed]>::to_vec).collect(),
        prefix: ctx.registry.prefix().to_string(),
    };

    let modal = StepModal::new("List of commands").lazy_step(commands_step);
    begin_modal(&ctx, modal, state)?.await?;
    Ok(())
}

impl Module for General {
    fn name(&self) -> &'static str {
        "general"
    }

    fn commands(&self) -> Vec<RegisteredCommand> {
        let about = self.clone();
        vec![
            RegisteredCommand::new("ping", pong).help("Check that the bot is responding."),
            RegisteredCommand::new("help", move |ctx, _args| about.clone().about(ctx))
                .help("Show the bot information dialog.")
                .group("basic"),
            RegisteredCommand::new("help", help_command)
                .param(ParamSpec::text("command"))
                .help("Show help for the specified command.")
                .group("basic"),
            RegisteredCommand::new("commands", commands)
                .help("Show a list of all available commands.")
                .group("basic"),
        ]
    }
}
