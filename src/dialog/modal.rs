//! The step modal and its driving loop.
//!
//! A [`StepModal`] is an ordered list of steps. [`begin_modal`] claims the
//! channel in the session registry and runs the modal on its own task; every
//! step gets a fixed inactivity timeout, and the registry entry is released
//! however the loop ends.

use crate::{
    core::{context::CommandContext, reply::Reply, report},
    dialog::{
        registry::{Begin, SessionHandle},
        session::DialogSession,
        step::{DialogStep, LazyStep, Step, StepResult},
    },
    errors::{Error, Result},
};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// How a modal run ended.
#[derive(Debug)]
pub enum ModalOutcome {
    /// A step returned `Finish`, or `GotoNext` ran past the last step
    Finished,
    /// A step returned `Cancel`
    Canceled,
    /// The requester did not answer within the step timeout
    TimedOut,
    /// The session registry shut down
    Shutdown,
    /// A step failed; the error was reported in the channel
    Failed(Error),
}

enum Flow {
    Goto(usize),
    Invalid,
    Done(ModalOutcome),
}

struct KeyedStep<S> {
    key: Option<String>,
    step: Box<dyn Step<S>>,
}

/// Ordered steps plus a title shown on every prompt.
pub struct StepModal<S> {
    title: String,
    steps: Vec<KeyedStep<S>>,
    step_timeout: Option<Duration>,
}

impl<S> std::fmt::Debug for StepModal<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepModal")
            .field("title", &self.title)
            .field("steps", &self.steps.len())
            .field("step_timeout", &self.step_timeout)
            .finish()
    }
}

impl<S: Send + 'static> StepModal<S> {
    /// An empty modal titled `title`.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            steps: Vec::new(),
            step_timeout: None,
        }
    }

    /// Appends a step.
    #[must_use]
    pub fn step(mut self, step: impl Step<S> + 'static) -> Self {
        self.steps.push(KeyedStep {
            key: None,
            step: Box::new(step),
        });
        self
    }

    /// Appends a step reachable through [`StepResult::GotoStep`].
    #[must_use]
    pub fn keyed_step(mut self, key: impl Into<String>, step: impl Step<S> + 'static) -> Self {
        self.steps.push(KeyedStep {
            key: Some(key.into()),
            step: Box::new(step),
        });
        self
    }

    /// Appends a step rebuilt from the state on every visit.
    #[must_use]
    pub fn lazy_step<F>(self, factory: F) -> Self
    where
        F: Fn(&S) -> Result<DialogStep<S>> + Send + Sync + 'static,
    {
        self.step(LazyStep::new(factory))
    }

    /// Overrides the configured per-step timeout.
    #[must_use]
    pub const fn step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }
}

impl<S> StepModal<S> {
    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the modal has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.steps
            .iter()
            .position(|entry| entry.key.as_deref() == Some(key))
    }

    fn resolve_index(&self, index: usize) -> Result<usize> {
        if index < self.steps.len() {
            Ok(index)
        } else {
            Err(Error::UnknownStep {
                target: index.to_string(),
            })
        }
    }

    fn next(&self, index: usize, result: StepResult) -> Result<Flow> {
        Ok(match result {
            StepResult::GotoNext if index + 1 >= self.len() => Flow::Done(ModalOutcome::Finished),
            StepResult::GotoNext => Flow::Goto(index + 1),
            StepResult::GotoCurrent => Flow::Goto(index),
            StepResult::GotoIndex(target) => Flow::Goto(self.resolve_index(target)?),
            StepResult::GotoStep(key) => Flow::Goto(
                self.position(&key)
                    .ok_or(Error::UnknownStep { target: key })?,
            ),
            StepResult::Finish => Flow::Done(ModalOutcome::Finished),
            StepResult::Cancel => Flow::Done(ModalOutcome::Canceled),
            StepResult::Invalid => Flow::Invalid,
        })
    }
}

/// Runs `modal` against `session` until a terminal result.
///
/// The live prompt is expired whenever a step exits, including on timeout,
/// cancellation and errors. Once the run is over the session stops taking
/// events before any further message is sent.
#[instrument(skip_all, fields(channel = %session.channel, title = %session.title))]
pub async fn drive<S: Send>(
    modal: &StepModal<S>,
    session: &mut DialogSession<S>,
    step_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<ModalOutcome> {
    if modal.is_empty() {
        return Ok(ModalOutcome::Finished);
    }

    let mut index = 0;
    loop {
        let step = &modal.steps[index].step;
        let accepted = tokio::select! {
            () = cancel.cancelled() => None,
            accepted = tokio::time::timeout(step_timeout, step.accept(session)) => Some(accepted),
        };

        let flow = match accepted {
            None => {
                info!("Dialog stopped by shutdown");
                Ok(Flow::Done(ModalOutcome::Shutdown))
            }
            Some(Err(_)) => {
                info!("Dialog timed out after {:?}", step_timeout);
                Ok(Flow::Done(ModalOutcome::TimedOut))
            }
            Some(Ok(result)) => result.and_then(|result| modal.next(index, result)),
        };

        if !matches!(flow, Ok(Flow::Goto(_) | Flow::Invalid)) {
            session.close_events();
        }
        if let Err(e) = session.expire_prompt().await {
            warn!("Failed to expire dialog prompt: {}", e);
        }

        match flow? {
            Flow::Goto(next) => index = next,
            Flow::Invalid => session.notify("Invalid response").await?,
            Flow::Done(outcome) => {
                if matches!(outcome, ModalOutcome::Canceled) {
                    session.notify("Canceled").await?;
                }
                return Ok(outcome);
            }
        }
    }
}

/// Starts `modal` in the context's channel on its own task.
///
/// Fails with [`Error::SessionActive`] when another dialog owns the channel
/// and with [`Error::NoRequester`] for system invocations. A modal without
/// steps completes immediately without claiming the channel.
pub fn begin_modal<S: Send + 'static>(
    ctx: &CommandContext,
    modal: StepModal<S>,
    state: S,
) -> Result<JoinHandle<ModalOutcome>> {
    let requester = ctx.requester.clone().ok_or(Error::NoRequester)?;

    if modal.is_empty() {
        return Ok(tokio::spawn(async { ModalOutcome::Finished }));
    }

    let SessionHandle {
        guard,
        events,
        cancel,
    } = match ctx.sessions.begin(ctx.channel, requester.id) {
        Begin::Started(handle) => handle,
        Begin::AlreadyActive => {
            return Err(Error::SessionActive {
                channel: ctx.channel,
            });
        }
    };

    let step_timeout = modal
        .step_timeout
        .unwrap_or_else(|| ctx.config.dialog.step_timeout());
    let mut session = DialogSession::new(
        state,
        modal.title.clone(),
        requester,
        ctx.channel,
        Arc::clone(&ctx.messenger),
        events,
    );

    Ok(tokio::spawn(async move {
        let _guard = guard;
        let driven = drive(&modal, &mut session, step_timeout, &cancel).await;
        session.close_events();
        match driven {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Dialog `{}` failed: {}", modal.title, e);
                let report = report::invocation_failure(&e);
                if let Err(send_error) = session
                    .messenger
                    .send(session.channel, Reply::embed(report))
                    .await
                {
                    warn!("Could not report dialog failure: {}", send_error);
                }
                ModalOutcome::Failed(e)
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::{
            command::CommandRegistry,
            context::{InteractionRef, Messenger, SentMessage},
            ids::{ChannelId, MessageId, UserId},
            reply::ButtonStyle,
        },
        dialog::step::{OptionMode, StepOption},
        test_utils::{
            CHANNEL, Outbound, REQUESTER, RecordingMessenger, TestHarness, button, button_on,
            message,
        },
    };
    use async_trait::async_trait;
    use std::{
        cell::Cell,
        sync::atomic::{AtomicUsize, Ordering},
    };
    use tokio::sync::Notify;

    fn harness() -> TestHarness {
        TestHarness::new(CommandRegistry::builder("m!").build())
    }

    #[derive(Default)]
    struct Answer {
        picked: Option<String>,
    }

    fn confirm_step(mode: OptionMode) -> DialogStep<Answer> {
        DialogStep::builder()
            .title("Confirm")
            .mode(mode)
            .option(StepOption::new("Yes"))
            .option(StepOption::new("No"))
            .on_complete(|state: &mut Answer, option, _| {
                state.picked = Some(option.text.clone());
                StepResult::GotoNext
            })
            .build()
            .unwrap()
    }

    fn result_step() -> StepModal<Answer> {
        StepModal::new("Test").step(confirm_step(OptionMode::Text)).lazy_step(|state: &Answer| {
            DialogStep::builder()
                .title("Result")
                .main_text(format!(
                    "You picked {}",
                    state.picked.as_deref().unwrap_or("nothing")
                ))
                .build()
        })
    }

    #[tokio::test]
    async fn test_invalid_answer_reprompts_then_matches_case_insensitively() -> Result<()> {
        let h = harness();
        let task = begin_modal(&h.ctx, result_step(), Answer::default())?;

        assert!(h.route(message(REQUESTER, "maybe")));
        assert!(h.route(message(REQUESTER, "yes")));
        let outcome = task.await?;
        assert!(matches!(outcome, ModalOutcome::Finished));

        let texts = h.messenger.sent_texts();
        assert_eq!(texts, vec!["Invalid response".to_string()]);

        let titles = h.messenger.sent_titles();
        assert_eq!(
            titles,
            vec![
                "Test / Confirm".to_string(),
                "Test / Confirm".to_string(),
                "Test / Result".to_string(),
            ]
        );
        let last = h.messenger.last_embed().unwrap();
        assert_eq!(last.description.as_deref(), Some("You picked Yes"));
        assert!(!h.ctx.sessions.is_active(CHANNEL));
        Ok(())
    }

    #[tokio::test]
    async fn test_other_users_do_not_answer() -> Result<()> {
        let h = harness();
        let task = begin_modal(&h.ctx, result_step(), Answer::default())?;

        assert!(!h.route(message(UserId(999), "yes")));
        assert!(h.route(message(REQUESTER, "No")));
        task.await?;

        let last = h.messenger.last_embed().unwrap();
        assert_eq!(last.description.as_deref(), Some("You picked No"));
        Ok(())
    }

    #[tokio::test]
    async fn test_free_input_catches_unlisted_answers() -> Result<()> {
        let h = harness();
        let modal = StepModal::new("Name").step(
            DialogStep::builder()
                .mode(OptionMode::Text)
                .option(StepOption::new("Skip"))
                .option(StepOption::free_input("(anything)"))
                .on_complete(|state: &mut Answer, _, input| {
                    state.picked = Some(input.to_string());
                    StepResult::GotoNext
                })
                .build()?,
        )
        .lazy_step(|state: &Answer| {
            DialogStep::builder()
                .main_text(state.picked.clone().unwrap_or_default())
                .build()
        });

        let task = begin_modal(&h.ctx, modal, Answer::default())?;
        h.route(message(REQUESTER, "Gwendolyn"));
        task.await?;

        assert_eq!(
            h.messenger.last_embed().unwrap().description.as_deref(),
            Some("Gwendolyn")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_button_press_is_acknowledged_and_prompt_expired() -> Result<()> {
        let h = harness();
        let modal = StepModal::new("Test").step(confirm_step(OptionMode::Buttons));

        let task = begin_modal(&h.ctx, modal, Answer::default())?;
        h.route(message(REQUESTER, "typed text is ignored"));
        h.route(button(REQUESTER, &format!("{CHANNEL}:No")));
        let outcome = task.await?;
        assert!(matches!(outcome, ModalOutcome::Finished));

        assert_eq!(h.messenger.acks().len(), 1);

        let log = h.messenger.log();
        let Outbound::Send { reply: prompt, .. } = &log[0] else {
            panic!("first outbound should be the prompt");
        };
        assert_eq!(prompt.buttons.len(), 2);
        assert_eq!(prompt.buttons[1].custom_id, format!("{CHANNEL}:No"));

        let Outbound::Edit { reply: expired, .. } = log.last().unwrap() else {
            panic!("last outbound should expire the prompt");
        };
        assert!(expired.buttons.is_empty());
        assert_eq!(
            expired.embed.as_ref().unwrap().title.as_deref(),
            Some("🔒 Test / Confirm (expired)")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_pagination_edits_in_place() -> Result<()> {
        #[derive(Default)]
        struct Page(usize);

        let h = harness();
        let modal = StepModal::new("Pages").lazy_step(|page: &Page| {
            DialogStep::builder()
                .replace_previous()
                .main_text(format!("page {}", page.0))
                .option(StepOption::new("Next").data("next"))
                .option(StepOption::new("Close").style(ButtonStyle::Danger))
                .on_complete(|page: &mut Page, option, _| {
                    if option.is("next") {
                        page.0 += 1;
                        StepResult::GotoCurrent
                    } else {
                        StepResult::Finish
                    }
                })
                .build()
        });

        let task = begin_modal(&h.ctx, modal, Page::default())?;
        h.route(button(REQUESTER, &format!("{CHANNEL}:next")));
        h.route(button(REQUESTER, &format!("{CHANNEL}:next")));
        h.route(button(REQUESTER, &format!("{CHANNEL}:Close")));
        task.await?;

        let log = h.messenger.log();
        let sends = log.iter().filter(|o| matches!(o, Outbound::Send { .. })).count();
        assert_eq!(sends, 1);

        let page_edits: Vec<_> = log
            .iter()
            .filter_map(|o| match o {
                Outbound::Edit { reply, .. } if !reply.buttons.is_empty() => {
                    reply.embed.as_ref().and_then(|e| e.description.clone())
                }
                _ => None,
            })
            .collect();
        assert_eq!(page_edits, vec!["page 1".to_string(), "page 2".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_option_sends_notice() -> Result<()> {
        let h = harness();
        let modal = StepModal::new("Test").step(
            DialogStep::<Answer>::builder()
                .mode(OptionMode::Text)
                .option(StepOption::new("Go"))
                .option(StepOption::cancel("stop"))
                .build()?,
        );

        let task = begin_modal(&h.ctx, modal, Answer::default())?;
        h.route(message(REQUESTER, "STOP"));
        assert!(matches!(task.await?, ModalOutcome::Canceled));
        assert_eq!(h.messenger.sent_texts(), vec!["Canceled".to_string()]);
        assert!(!h.ctx.sessions.is_active(CHANNEL));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_ends_session_and_frees_channel() -> Result<()> {
        let h = harness();
        let task = begin_modal(&h.ctx, result_step(), Answer::default())?;

        // Invalid answers keep the dialog alive until the inactivity timeout.
        h.route(message(REQUESTER, "maybe"));
        let outcome = task.await?;
        assert!(matches!(outcome, ModalOutcome::TimedOut));
        assert!(!h.ctx.sessions.is_active(CHANNEL));

        let last = h.messenger.log().pop().unwrap();
        let Outbound::Edit { reply, .. } = last else {
            panic!("timeout should expire the prompt");
        };
        assert!(reply.embed.unwrap().title.unwrap().starts_with("🔒 "));
        Ok(())
    }

    struct Failing;

    #[async_trait]
    impl Step<Answer> for Failing {
        async fn accept(&self, _session: &mut DialogSession<Answer>) -> Result<StepResult> {
            Err(Error::command("step blew up"))
        }
    }

    #[tokio::test]
    async fn test_step_error_is_reported_and_channel_freed() -> Result<()> {
        let h = harness();
        let task = begin_modal(&h.ctx, StepModal::new("Test").step(Failing), Answer::default())?;

        let ModalOutcome::Failed(error) = task.await? else {
            panic!("expected failure");
        };
        assert_eq!(error.kind(), "CommandError");
        assert!(!h.ctx.sessions.is_active(CHANNEL));
        assert_eq!(
            h.messenger.last_embed().unwrap().title.as_deref(),
            Some("Failure")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_goto_index_out_of_range_fails() -> Result<()> {
        let h = harness();
        let modal = StepModal::new("Test").step(
            DialogStep::<Answer>::builder()
                .default_result(StepResult::GotoIndex(7))
                .build()?,
        );

        let outcome = begin_modal(&h.ctx, modal, Answer::default())?.await?;
        assert!(matches!(
            outcome,
            ModalOutcome::Failed(Error::UnknownStep { ref target }) if target == "7"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_goto_step_by_key() -> Result<()> {
        let visits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&visits);

        let h = harness();
        let modal = StepModal::new("Test")
            .step(
                DialogStep::<Answer>::builder()
                    .default_result(StepResult::GotoStep("end".to_string()))
                    .build()?,
            )
            .lazy_step(|_: &Answer| DialogStep::builder().title("skipped").build())
            .keyed_step(
                "end",
                LazyStep::new(move |_: &Answer| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    DialogStep::builder()
                        .title("end")
                        .default_result(StepResult::Finish)
                        .build()
                }),
            );

        begin_modal(&h.ctx, modal, Answer::default())?.await?;
        assert_eq!(visits.load(Ordering::SeqCst), 1);
        assert_eq!(
            h.messenger.sent_titles(),
            vec!["Test".to_string(), "Test / end".to_string()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_second_dialog_in_channel_is_refused() -> Result<()> {
        let h = harness();
        let first = begin_modal(&h.ctx, result_step(), Answer::default())?;

        let second = begin_modal(&h.ctx, result_step(), Answer::default());
        assert!(matches!(second, Err(Error::SessionActive { channel }) if channel == CHANNEL));

        h.route(message(REQUESTER, "yes"));
        first.await?;
        assert!(!h.ctx.sessions.is_active(CHANNEL));
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_modal_completes_without_claiming_channel() -> Result<()> {
        let h = harness();
        let task = begin_modal(&h.ctx, StepModal::<Answer>::new("Empty"), Answer::default())?;
        assert!(!h.ctx.sessions.is_active(CHANNEL));
        assert!(matches!(task.await?, ModalOutcome::Finished));
        assert!(h.messenger.log().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_requires_requester() {
        let mut h = harness();
        h.ctx.requester = None;
        let result = begin_modal(&h.ctx, result_step(), Answer::default());
        assert!(matches!(result, Err(Error::NoRequester)));
    }

    #[tokio::test]
    async fn test_shutdown_stops_sessions() -> Result<()> {
        let h = harness();
        let task = begin_modal(&h.ctx, result_step(), Answer::default())?;

        h.ctx.sessions.shutdown();
        assert!(matches!(task.await?, ModalOutcome::Shutdown));
        assert!(!h.ctx.sessions.is_active(CHANNEL));
        Ok(())
    }

    #[tokio::test]
    async fn test_state_needs_only_send() -> Result<()> {
        let h = harness();
        let modal = StepModal::new("Count").step(
            DialogStep::builder()
                .mode(OptionMode::Text)
                .option(StepOption::new("Up"))
                .option(StepOption::cancel("stop"))
                .on_complete(|count: &mut Cell<u32>, _, _| {
                    count.set(count.get() + 1);
                    StepResult::GotoCurrent
                })
                .build()?,
        );

        let task = begin_modal(&h.ctx, modal, Cell::new(0))?;
        h.route(message(REQUESTER, "up"));
        h.route(message(REQUESTER, "sideways"));
        h.route(message(REQUESTER, "stop"));
        assert!(matches!(task.await?, ModalOutcome::Canceled));
        assert_eq!(
            h.messenger.sent_texts(),
            vec!["Invalid response".to_string(), "Canceled".to_string()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_text_step_acknowledges_button_presses() -> Result<()> {
        let h = harness();
        let task = begin_modal(&h.ctx, result_step(), Answer::default())?;

        assert!(h.route(button(REQUESTER, &format!("{CHANNEL}:Yes"))));
        assert!(h.route(message(REQUESTER, "no")));
        task.await?;

        assert_eq!(h.messenger.acks().len(), 1);
        assert_eq!(
            h.messenger.last_embed().unwrap().description.as_deref(),
            Some("You picked No")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_press_on_earlier_prompt_is_ignored() -> Result<()> {
        let h = harness();
        let modal = StepModal::new("Test")
            .step(confirm_step(OptionMode::Buttons))
            .lazy_step(|state: &Answer| {
                DialogStep::builder()
                    .main_text(state.picked.clone().unwrap_or_default())
                    .build()
            });

        let task = begin_modal(&h.ctx, modal, Answer::default())?;
        h.route(button_on(REQUESTER, MessageId(99), &format!("{CHANNEL}:No")));
        h.route(button_on(REQUESTER, MessageId(1), &format!("{CHANNEL}:Yes")));
        task.await?;

        assert_eq!(h.messenger.acks().len(), 2);
        assert_eq!(
            h.messenger.last_embed().unwrap().description.as_deref(),
            Some("Yes")
        );
        Ok(())
    }

    /// Holds every edit until released.
    #[derive(Default)]
    struct HeldEdits {
        inner: RecordingMessenger,
        editing: Notify,
        release: Notify,
    }

    #[async_trait]
    impl Messenger for HeldEdits {
        async fn send(&self, channel: ChannelId, reply: Reply) -> Result<SentMessage> {
            self.inner.send(channel, reply).await
        }

        async fn edit(&self, message: &SentMessage, reply: Reply) -> Result<()> {
            self.editing.notify_one();
            self.release.notified().await;
            self.inner.edit(message, reply).await
        }

        async fn acknowledge(&self, interaction: &InteractionRef) -> Result<()> {
            self.inner.acknowledge(interaction).await
        }
    }

    #[tokio::test]
    async fn test_finished_dialog_stops_taking_events_before_expiring() -> Result<()> {
        let mut h = harness();
        let held = Arc::new(HeldEdits::default());
        h.ctx.messenger = Arc::clone(&held) as Arc<dyn Messenger>;
        let modal = StepModal::new("Test").step(confirm_step(OptionMode::Text));

        let task = begin_modal(&h.ctx, modal, Answer::default())?;
        assert!(h.route(message(REQUESTER, "yes")));
        held.editing.notified().await;

        assert!(h.ctx.sessions.is_active(CHANNEL));
        assert!(!h.route(message(REQUESTER, "m!roll")));

        held.release.notify_one();
        assert!(matches!(task.await?, ModalOutcome::Finished));
        assert!(!h.ctx.sessions.is_active(CHANNEL));
        Ok(())
    }
}
