//! Debug-only dialog demos.

use crate::{
    core::{
        command::{Args, Module, ParamSpec, RegisteredCommand},
        context::CommandContext,
        report,
    },
    dialog::{DialogStep, OptionMode, StepModal, StepOption, StepResult, begin_modal},
    errors::Result,
};
use tracing::info;

#[derive(Debug)]
struct Selection {
    picked: String,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            picked: "unknown".to_string(),
        }
    }
}

/// The two-step input test, answered by typing or by buttons.
fn input_test(mode: OptionMode) -> Result<StepModal<Selection>> {
    let first = DialogStep::builder()
        .title("Step 1")
        .main_text("This is a dialog test.")
        .options_text("Pick an option:")
        .mode(mode)
        .option(StepOption::new("Option 1").data("A"))
        .option(StepOption::new("Option 2").data("B"))
        .on_complete(|state: &mut Selection, option, _| {
            state.picked = option.data.id().to_string();
            StepResult::GotoNext
        })
        .build()?;

    Ok(StepModal::new("Input test")
        .step(first)
        .lazy_step(|state: &Selection| {
            DialogStep::builder()
                .title("Results")
                .main_text(format!("You picked option {}", state.picked))
                .build()
        }))
}

async fn run_test(ctx: CommandContext, args: Args) -> Result<()> {
    if !ctx.config.debug {
        ctx.reply_embed(report::failure("Tests are disabled! (`debug = false`)"))
            .await?;
        return Ok(());
    }

    let mode = match args.text(0)? {
        "dialog1" => OptionMode::Text,
        "dialog2" => OptionMode::Buttons,
        _ => {
            ctx.say("That test doesn't exist!").await?;
            return Ok(());
        }
    };

    let outcome = begin_modal(&ctx, input_test(mode)?, Selection::default())?.await?;
    info!("Dialog test finished: {:?}", outcome);
    Ok(())
}

/// Function tests for debugging.
#[derive(Debug, Default)]
pub struct Test;

impl Module for Test {
    fn name(&self) -> &'static str {
        "test"
    }

    fn commands(&self) -> Vec<RegisteredCommand> {
        vec![
            RegisteredCommand::new("test", run_test)
                .param(ParamSpec::text("name"))
                .help("Run function tests for debugging purposes. Not available in the production bot!"),
        ]
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::{command::CommandRegistry, dispatch::dispatch},
        test_utils::{CHANNEL, REQUESTER, TestHarness, button, message, test_config},
    };

    fn harness() -> TestHarness {
        TestHarness::new(CommandRegistry::builder("m!").module(&Test).build())
    }

    async fn wait_for_session(h: &TestHarness) {
        while !h.sessions.is_active(CHANNEL) {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_disabled_without_debug() -> Result<()> {
        let config = crate::config::AppConfig {
            debug: false,
            ..test_config()
        };
        let h = TestHarness::with_config(CommandRegistry::builder("m!").module(&Test).build(), config);
        dispatch(&h.ctx, "test", "dialog1").await?;

        let embed = h.messenger.last_embed().unwrap();
        assert_eq!(embed.title.as_deref(), Some("Failure"));
        assert!(embed.description.unwrap().ends_with("Tests are disabled! (`debug = false`)"));
        assert!(!h.sessions.is_active(CHANNEL));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_test_name() -> Result<()> {
        let h = harness();
        dispatch(&h.ctx, "test", "dialog9").await?;
        assert_eq!(
            h.messenger.sent_texts(),
            vec!["That test doesn't exist!".to_string()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_text_dialog() -> Result<()> {
        let h = harness();
        let ctx = h.ctx.clone();
        let task = tokio::spawn(async move { dispatch(&ctx, "test", "dialog1").await });

        wait_for_session(&h).await;
        assert!(h.route(message(REQUESTER, "option 2")));
        task.await??;

        let first = h.messenger.sent()[0].embed.clone().unwrap();
        assert_eq!(first.title.as_deref(), Some("Input test / Step 1"));
        assert_eq!(
            first.fields[0].value,
            "Pick an option:\n\n •  Option 1\n •  Option 2"
        );

        let last = h.messenger.last_embed().unwrap();
        assert_eq!(last.title.as_deref(), Some("Input test / Results"));
        assert_eq!(last.description.as_deref(), Some("You picked option B"));
        Ok(())
    }

    #[tokio::test]
    async fn test_button_dialog() -> Result<()> {
        let h = harness();
        let ctx = h.ctx.clone();
        let task = tokio::spawn(async move { dispatch(&ctx, "test", "dialog2").await });

        wait_for_session(&h).await;
        assert!(h.route(button(REQUESTER, &format!("{CHANNEL}:A"))));
        task.await??;

        assert_eq!(h.messenger.acks().len(), 1);
        let last = h.messenger.last_embed().unwrap();
        assert_eq!(last.description.as_deref(), Some("You picked option A"));
        Ok(())
    }
}
