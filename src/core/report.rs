//! User-facing failure reports.
//!
//! Resolution failures and handler errors are rendered as red "Failure"
//! embeds. These functions only build the embeds; the dispatcher sends them.

use crate::{
    core::{
        command::RegisteredCommand,
        reply::{Embed, FAILURE_COLOR},
        tokenizer::Arg,
    },
    errors::Error,
};
use std::error::Error as StdError;
use std::fmt::Write;

/// Base embed every failure report starts from.
#[must_use]
pub fn failure_embed() -> Embed {
    Embed::new()
        .title("Failure")
        .description("**An error occurred:**\n")
        .color(FAILURE_COLOR)
}

fn append_description(mut embed: Embed, text: &str) -> Embed {
    embed.description.get_or_insert_with(String::new).push_str(text);
    embed
}

/// A failure embed carrying a plain message.
#[must_use]
pub fn failure(message: &str) -> Embed {
    append_description(failure_embed(), message)
}

/// Kind names of the provided arguments, e.g. `` `int text` ``.
#[must_use]
pub fn provided_types(args: &[Arg]) -> String {
    if args.is_empty() {
        return "(none)".to_string();
    }

    let kinds: Vec<_> = args
        .iter()
        .map(|arg| arg.value.kind().display_name())
        .collect();
    format!("`{}`", kinds.join(" "))
}

fn overload_list(out: &mut String, overloads: &[&RegisteredCommand], prefix: &str) {
    out.push_str("This command accepts the following sets of values:\n");
    for overload in overloads {
        let _ = writeln!(out, "• {}", overload.display_title(prefix));
    }
}

fn help_hint(prefix: &str, command: &str) -> String {
    format!("**Use `{prefix}help {command}` for more information.**")
}

/// No command with that name; lists close matches if any.
#[must_use]
pub fn command_not_found(command: &str, suggestions: &[String]) -> Embed {
    let mut text = format!("No command with the name `{command}` was found.\n");
    if !suggestions.is_empty() {
        text.push_str("\nDid you mean:\n");
        for suggestion in suggestions {
            let _ = writeln!(text, "• `{suggestion}`");
        }
    }
    append_description(failure_embed(), &text)
}

/// The command exists but none of its overloads accepted the arguments.
#[must_use]
pub fn no_matching_overload(
    prefix: &str,
    command: &str,
    overloads: &[&RegisteredCommand],
    args: &[Arg],
) -> Embed {
    let mut text = format!("No version of the command `{command}` accepts the provided values:\n");
    let _ = writeln!(text, "{}", provided_types(args));
    text.push('\n');
    overload_list(&mut text, overloads, prefix);

    append_description(failure_embed(), &text).field("Resolution", help_hint(prefix, command), false)
}

/// Several overloads tied for the best score.
#[must_use]
pub fn ambiguous_overload(
    prefix: &str,
    command: &str,
    overloads: &[&RegisteredCommand],
    args: &[Arg],
    score: u32,
) -> Embed {
    let mut text =
        format!("Multiple versions of the command `{command}` accept the provided values:\n");
    let _ = writeln!(text, "{}", provided_types(args));
    text.push('\n');
    overload_list(&mut text, overloads, prefix);

    append_description(failure_embed(), &text)
        .field("Resolution", help_hint(prefix, command), false)
        .field("Debug information", format!("Argument match score: {score}"), false)
}

/// Formats a handler failure as its cause chain, one cause per line.
///
/// An [`Error::Invocation`] wrapper is peeled off first so the report starts
/// at what the handler actually returned.
#[must_use]
pub fn cause_chain(error: &Error) -> String {
    let root = match error {
        Error::Invocation { source, .. } => source.as_ref(),
        other => other,
    };

    let mut text = format!("`{}`: {}", root.kind(), root);
    let mut next = root.source();
    while let Some(cause) = next {
        let kind = cause
            .downcast_ref::<Error>()
            .map_or("Error", Error::kind);
        let _ = write!(text, "\ncaused by `{kind}`: {cause}");
        next = cause.source();
    }
    text
}

/// Failure report for a handler that returned an error.
#[must_use]
pub fn invocation_failure(error: &Error) -> Embed {
    append_description(failure_embed(), &cause_chain(error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        command::ParamSpec,
        tokenizer::parse_arguments,
        value::ValueKind,
    };

    fn noop(name: &str) -> RegisteredCommand {
        RegisteredCommand::new(name, |_ctx, _args| async { Ok(()) })
    }

    #[test]
    fn test_not_found_lists_suggestions() {
        let embed = command_not_found("rol", &["roll".to_string(), "role".to_string()]);
        assert_eq!(embed.title.as_deref(), Some("Failure"));
        assert_eq!(embed.color, Some(FAILURE_COLOR));
        assert_eq!(
            embed.description.as_deref(),
            Some(
                "**An error occurred:**\nNo command with the name `rol` was found.\n\nDid you mean:\n• `roll`\n• `role`\n"
            )
        );

        let bare = command_not_found("zzz", &[]);
        assert!(!bare.description.unwrap_or_default().contains("Did you mean"));
    }

    #[test]
    fn test_no_matching_overload_shows_types_and_signatures() {
        let roll = noop("roll").param(ParamSpec::text("dice"));
        let args = parse_arguments("2 d6");
        let embed = no_matching_overload("m!", "roll", &[&roll], &args);

        let description = embed.description.unwrap_or_default();
        assert!(description.contains("`int text`"));
        assert!(description.contains("• `m!roll [dice: text]`"));
        assert_eq!(embed.fields[0].name, "Resolution");
        assert_eq!(embed.fields[0].value, "**Use `m!help roll` for more information.**");
    }

    #[test]
    fn test_no_arguments_render_as_none() {
        assert_eq!(provided_types(&[]), "(none)");
    }

    #[test]
    fn test_ambiguous_overload_reports_score() {
        let a = noop("pick").param(ParamSpec::new("n", ValueKind::Long));
        let b = noop("pick").param(ParamSpec::new("n", ValueKind::BigDecimal));
        let embed = ambiguous_overload("m!", "pick", &[&a, &b], &parse_arguments("5"), 0);

        assert!(embed.description.unwrap_or_default().starts_with(
            "**An error occurred:**\nMultiple versions of the command `pick` accept the provided values:"
        ));
        assert_eq!(embed.fields[1].value, "Argument match score: 0");
    }

    #[test]
    fn test_cause_chain_unwraps_invocation_once() {
        let inner = Error::Conversion {
            from: ValueKind::Text,
            to: ValueKind::User,
            message: "bad mention".to_string(),
        };
        let wrapped = Error::Invocation {
            command: "userinfo".to_string(),
            source: Box::new(Error::Invocation {
                command: "inner".to_string(),
                source: Box::new(inner),
            }),
        };

        let text = cause_chain(&wrapped);
        assert_eq!(
            text,
            "`InvocationError`: Command `inner` failed\ncaused by `ConversionError`: Could not convert text to user: bad mention"
        );
    }

    #[test]
    fn test_cause_chain_for_plain_error() {
        let text = cause_chain(&Error::command("Success"));
        assert_eq!(text, "`CommandError`: Success");
        assert!(
            invocation_failure(&Error::command("Success"))
                .description
                .unwrap_or_default()
                .ends_with("`CommandError`: Success")
        );
    }
}
