//! Overload resolution and dispatch.
//!
//! `dispatch` filters the registered overloads by name, tokenizes the raw
//! argument text, tries every overload, keeps the successful matches with the
//! lowest total conversion cost and invokes the single winner. Resolution
//! failures are reported to the requester and returned as a
//! [`DispatchOutcome`]; they are never errors.

use crate::{
    core::{
        command::{Args, RegisteredCommand},
        context::CommandContext,
        conversion::ConversionGraph,
        report,
        tokenizer::{self, Arg},
        value::Value,
    },
    errors::{Error, Result},
};
use std::collections::BTreeMap;
use tracing::{debug, error, info, instrument};

/// A successful parameter match for one overload.
#[derive(Debug, Clone)]
pub struct MatchAttempt<'a> {
    /// The overload that matched
    pub command: &'a RegisteredCommand,
    /// Converted values, one per declared parameter
    pub values: Vec<Option<Value>>,
    /// Sum of conversion costs; 0 means every argument already had the right kind
    pub score: u32,
}

/// How a dispatch call ended.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The winning overload ran to completion.
    Invoked {
        /// Command name
        command: String,
        /// Score of the winning match
        score: u32,
    },
    /// No command has that name.
    NotFound {
        /// Similar command names offered to the user
        suggestions: Vec<String>,
    },
    /// Overloads exist but none accepted the arguments.
    NoMatchingOverload,
    /// Several overloads tied for the lowest score.
    Ambiguous {
        /// The tied score
        score: u32,
        /// Number of tied overloads
        candidates: usize,
    },
    /// The handler returned an error; it has been reported to the requester.
    Failed {
        /// The wrapped handler error
        error: Error,
    },
}

impl DispatchOutcome {
    /// Whether a handler ran successfully.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Invoked { .. })
    }
}

/// Splits `<prefix><command>[ <args>]` into command name and argument text.
///
/// The prefix is matched ignoring ASCII case. Returns `None` for content that
/// does not start with the prefix or has nothing after it.
#[must_use]
pub fn parse_invocation<'a>(prefix: &str, content: &'a str) -> Option<(&'a str, &'a str)> {
    let head = content.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }

    let unprefixed = content[prefix.len()..].trim();
    if unprefixed.is_empty() {
        return None;
    }

    Some(match unprefixed.split_once(' ') {
        Some((command, args)) => (command, args),
        None => (unprefixed, ""),
    })
}

/// Tries to bind `args` to the parameters of `command`.
///
/// Returns `Ok(None)` when the overload cannot accept the arguments. Only a
/// broken conversion graph is an error.
pub async fn match_arguments<'a>(
    graph: &ConversionGraph,
    command: &'a RegisteredCommand,
    args: &[Arg],
) -> Result<Option<MatchAttempt<'a>>> {
    let params = &command.params;
    let mut values = Vec::with_capacity(params.len());
    let mut score = 0;
    let mut cursor = 0;

    for (index, param) in params.iter().enumerate() {
        let is_last = index + 1 == params.len();

        if cursor >= args.len() {
            if is_last && param.optional {
                values.push(param.default.clone());
                continue;
            }
            debug!(
                "{}: expected {} arguments, got {}",
                command.display_title(""),
                params.len(),
                args.len()
            );
            return Ok(None);
        }

        let value = if is_last && param.join_remaining {
            let joined = tokenizer::join_remaining(&args[cursor..]);
            cursor = args.len();
            Value::Text(joined)
        } else {
            cursor += 1;
            args[cursor - 1].value.clone()
        };

        let Some(path) = graph.find_path(value.kind(), param.kind)? else {
            debug!(
                "{}: no conversion from {} to {} for `{}`",
                command.display_title(""),
                value.kind(),
                param.kind,
                param.name
            );
            return Ok(None);
        };

        match path.apply(value).await {
            Ok(converted) => {
                score += path.cost();
                values.push(Some(converted));
            }
            Err(e) => {
                debug!("{}: conversion failed for `{}`: {}", command.display_title(""), param.name, e);
                return Ok(None);
            }
        }
    }

    if cursor < args.len() {
        debug!(
            "{}: {} arguments left over",
            command.display_title(""),
            args.len() - cursor
        );
        return Ok(None);
    }

    Ok(Some(MatchAttempt {
        command,
        values,
        score,
    }))
}

/// Result of resolving one invocation against a set of overloads.
#[derive(Debug)]
pub enum Resolution<'a> {
    /// Exactly one overload has the lowest score.
    Unique(MatchAttempt<'a>),
    /// Nothing matched.
    NoMatch,
    /// Several overloads share the lowest score.
    Ambiguous {
        /// The tied score
        score: u32,
        /// The tied overloads, in registration order
        candidates: Vec<MatchAttempt<'a>>,
    },
}

/// Matches every candidate and picks the lowest-scoring group.
pub async fn resolve<'a>(
    graph: &ConversionGraph,
    candidates: &[&'a RegisteredCommand],
    args: &[Arg],
) -> Result<Resolution<'a>> {
    let mut by_score: BTreeMap<u32, Vec<MatchAttempt<'a>>> = BTreeMap::new();

    for &command in candidates {
        if let Some(attempt) = match_arguments(graph, command, args).await? {
            by_score.entry(attempt.score).or_default().push(attempt);
        }
    }

    let Some((score, mut best)) = by_score.into_iter().next() else {
        return Ok(Resolution::NoMatch);
    };

    if best.len() == 1 {
        if let Some(attempt) = best.pop() {
            return Ok(Resolution::Unique(attempt));
        }
    }

    Ok(Resolution::Ambiguous {
        score,
        candidates: best,
    })
}

/// Command names similar to `name`, most similar first.
#[must_use]
pub fn suggestions(
    commands: &[RegisteredCommand],
    name: &str,
    min_similarity: f64,
    max: usize,
) -> Vec<String> {
    let mut scored: Vec<(f64, &str)> = commands
        .iter()
        .filter(|command| !command.hidden)
        .map(|command| (strsim::jaro_winkler(name, &command.name), command.name.as_str()))
        .filter(|(similarity, _)| *similarity >= min_similarity)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));

    let mut names: Vec<String> = Vec::new();
    for (_, name) in scored {
        if names.len() == max {
            break;
        }
        if !names.iter().any(|existing| existing == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Resolves and runs `command` with `raw_args` in `ctx`.
///
/// Failures to resolve or to run are reported in the channel. The returned
/// error is reserved for transport failures while reporting and for a broken
/// conversion graph.
#[instrument(skip(ctx), fields(channel = %ctx.channel))]
pub async fn dispatch(ctx: &CommandContext, command: &str, raw_args: &str) -> Result<DispatchOutcome> {
    let registry = ctx.registry.as_ref();
    let prefix = registry.prefix();
    let candidates: Vec<&RegisteredCommand> = registry.named(command).collect();

    if candidates.is_empty() {
        let suggestions = suggestions(
            registry.commands(),
            command,
            ctx.config.suggestions.min_similarity,
            ctx.config.suggestions.max_suggestions,
        );
        info!("Unknown command `{}`", command);
        ctx.reply_embed(report::command_not_found(command, &suggestions))
            .await?;
        return Ok(DispatchOutcome::NotFound { suggestions });
    }

    let args = tokenizer::parse_arguments(raw_args);

    match resolve(registry.graph(), &candidates, &args).await? {
        Resolution::NoMatch => {
            ctx.reply_embed(report::no_matching_overload(prefix, command, &candidates, &args))
                .await?;
            Ok(DispatchOutcome::NoMatchingOverload)
        }
        Resolution::Ambiguous { score, candidates: tied } => {
            let overloads: Vec<&RegisteredCommand> = tied.iter().map(|attempt| attempt.command).collect();
            ctx.reply_embed(report::ambiguous_overload(prefix, command, &overloads, &args, score))
                .await?;
            Ok(DispatchOutcome::Ambiguous {
                score,
                candidates: tied.len(),
            })
        }
        Resolution::Unique(attempt) => {
            let score = attempt.score;
            let winner = attempt.command;
            debug!("Invoking {} with score {}", winner.display_title(prefix), score);

            match winner.invoke(ctx.clone(), Args::new(attempt.values)).await {
                Ok(()) => Ok(DispatchOutcome::Invoked {
                    command: command.to_string(),
                    score,
                }),
                Err(e) => {
                    let error = Error::Invocation {
                        command: command.to_string(),
                        source: Box::new(e),
                    };
                    error!("{}: {}", error, report::cause_chain(&error));
                    ctx.reply_embed(report::invocation_failure(&error)).await?;
                    Ok(DispatchOutcome::Failed { error })
                }
            }
        }
    }
}
