//! Tabletop commands - dice rolling.

use crate::{
    core::{
        command::{Args, Module, ParamSpec, RegisteredCommand},
        context::CommandContext,
        report,
        value::Value,
    },
    errors::Result,
};
use bigdecimal::num_bigint::BigInt;
use rand::Rng;
use regex::Regex;
use std::{fmt::Write, sync::LazyLock};
use tracing::debug;

/// Most dice a single `roll` may throw.
pub const MAX_ROLLS: u32 = 100;

static DIE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // Literal pattern
    Regex::new(r"^(?:(\d+)?d)?(\d+)$").unwrap()
});

/// What a `roll` request asked for, before any dice are thrown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceRequest {
    /// Dice counts per size, in order of first appearance
    pub groups: Vec<(u64, BigInt)>,
    /// Tokens that were not a valid die
    pub invalid: usize,
}

impl DiceRequest {
    /// Parses a space-separated list like `6 5d6 d20`.
    ///
    /// A die size must be at least one; counts may be arbitrarily large and
    /// are checked against [`MAX_ROLLS`] by the caller.
    #[must_use]
    pub fn parse(dice: &str) -> Self {
        let mut groups: Vec<(u64, BigInt)> = Vec::new();
        let mut invalid = 0;

        for token in dice.split_whitespace() {
            let Some((count, size)) = parse_die(token) else {
                debug!("Invalid die `{}`", token);
                invalid += 1;
                continue;
            };

            match groups.iter_mut().find(|(s, _)| *s == size) {
                Some((_, total)) => *total += count,
                None => groups.push((size, count)),
            }
        }

        Self { groups, invalid }
    }

    /// Total number of dice across all sizes.
    #[must_use]
    pub fn total(&self) -> BigInt {
        self.groups.iter().map(|(_, count)| count).sum()
    }

    /// Throws every die, returning `(size, count, sum)` per size, or `None`
    /// when more than [`MAX_ROLLS`] dice were requested.
    pub fn roll<R: Rng>(&self, rng: &mut R) -> Option<Vec<(u64, u32, u128)>> {
        if self.total() > BigInt::from(MAX_ROLLS) {
            return None;
        }

        let mut results = Vec::with_capacity(self.groups.len());
        for (size, count) in &self.groups {
            let count = u32::try_from(count).ok()?;
            let sum = (0..count).map(|_| u128::from(rng.gen_range(1..=*size))).sum();
            results.push((*size, count, sum));
        }
        Some(results)
    }
}

fn parse_die(token: &str) -> Option<(BigInt, u64)> {
    let caps = DIE_PATTERN.captures(token)?;
    let count = match caps.get(1) {
        Some(count) => count.as_str().parse::<BigInt>().ok()?,
        None => BigInt::from(1),
    };
    let size = caps.get(2)?.as_str().parse::<u64>().ok().filter(|&s| s > 0)?;
    Some((count, size))
}

/// Formats roll results the way the `roll` command replies.
#[must_use]
pub fn format_rolls(invalid: usize, results: &[(u64, u32, u128)]) -> String {
    let mut out = String::new();
    if invalid > 0 {
        let noun = if invalid == 1 { "roll was" } else { "rolls were" };
        let _ = write!(out, "{invalid} provided {noun} invalid.\n\n");
    }

    let lines: Vec<String> = results
        .iter()
        .map(|(size, count, sum)| format!("Rolled {count}d{size}: {sum}!"))
        .collect();
    out.push_str(&lines.join("\n"));

    if results.len() > 1 {
        let total: u128 = results.iter().map(|(_, _, sum)| sum).sum();
        let _ = write!(out, "\n\nSum: {total}");
    }
    out.trim_end().to_string()
}

async fn roll(ctx: CommandContext, args: Args) -> Result<()> {
    let request = DiceRequest::parse(args.text(0)?);

    let reply = request
        .roll(&mut rand::thread_rng())
        .map(|results| format_rolls(request.invalid, &results));

    match reply {
        Some(text) => ctx.say(text).await?,
        None => {
            let message = format!(
                "The maximum number of dice rolls is {MAX_ROLLS} (received {}.)",
                request.total()
            );
            ctx.reply_embed(report::failure(&message)).await?
        }
    };
    Ok(())
}

/// Dice rolling.
#[derive(Debug, Default)]
pub struct Tabletop;

impl Module for Tabletop {
    fn name(&self) -> &'static str {
        "tabletop"
    }

    fn commands(&self) -> Vec<RegisteredCommand> {
        vec![
            RegisteredCommand::new("roll", roll)
                .param(
                    ParamSpec::text("dice")
                        .join_remaining()
                        .default_value(Value::text("d6")),
                )
                .summary("Roll some dice")
                .help(
                    "Roll the specified dice.\n`dice` should be a list of die rolls, like `6`, \
                     `5d6` or `d20`, separated by spaces.\nThe maximum number of total rolls is 100.",
                ),
        ]
    }
}
