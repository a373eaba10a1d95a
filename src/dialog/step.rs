//! Dialog steps.
//!
//! A step renders one prompt, waits for one correlated answer and returns a
//! [`StepResult`] telling the modal where to go next. [`DialogStep`] covers
//! the two built-in answer styles (typed text and buttons); [`LazyStep`]
//! rebuilds a `DialogStep` from the session state every time it is visited.

use crate::{
    core::reply::{Button, ButtonStyle, Embed, Reply},
    dialog::{event::InboundEvent, session::DialogSession},
    errors::{Error, Result},
};
use async_trait::async_trait;
use std::fmt::Write;
use tracing::debug;

/// Most buttons a single action row can hold.
pub const MAX_BUTTONS: usize = 5;

/// Where the modal goes after a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// Next step, or finish after the last one
    GotoNext,
    /// Run the same step again, re-rendering it
    GotoCurrent,
    /// Jump to a step by position
    GotoIndex(usize),
    /// Jump to a step by key
    GotoStep(String),
    /// End normally
    Finish,
    /// End with a cancellation notice
    Cancel,
    /// Tell the user the answer was invalid and ask again
    Invalid,
}

/// One stage of a dialog.
#[async_trait]
pub trait Step<S: Send>: Send + Sync {
    /// Renders the prompt and waits for an answer.
    async fn accept(&self, session: &mut DialogSession<S>) -> Result<StepResult>;
}

/// What picking an option means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionData {
    /// A regular answer identified by this string
    Value(String),
    /// Catch-all for typed answers that match no label
    FreeInput,
    /// Cancels the whole dialog
    Cancel,
}

impl OptionData {
    /// Identifier embedded in button ids.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Value(value) => value,
            Self::FreeInput => "free-input",
            Self::Cancel => "cancel",
        }
    }
}

/// One selectable answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOption {
    /// Label, also what the user types in text mode
    pub text: String,
    /// Optional unicode emoji
    pub icon: Option<String>,
    /// Meaning of the option
    pub data: OptionData,
    /// Button style in button mode
    pub style: ButtonStyle,
}

impl StepOption {
    /// An option whose data is its own label.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            data: OptionData::Value(text.clone()),
            text,
            icon: None,
            style: ButtonStyle::Secondary,
        }
    }

    /// Catch-all option for text mode.
    pub fn free_input(text: impl Into<String>) -> Self {
        Self {
            data: OptionData::FreeInput,
            ..Self::new(text)
        }
    }

    /// Option that cancels the dialog.
    pub fn cancel(text: impl Into<String>) -> Self {
        Self {
            data: OptionData::Cancel,
            ..Self::new(text)
        }
    }

    /// Sets the data reported when the option is picked.
    #[must_use]
    pub fn data(mut self, data: impl Into<String>) -> Self {
        self.data = OptionData::Value(data.into());
        self
    }

    /// Sets the emoji shown on the button.
    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Sets the button style.
    #[must_use]
    pub const fn style(mut self, style: ButtonStyle) -> Self {
        self.style = style;
        self
    }

    /// Whether this option carries `data`.
    #[must_use]
    pub fn is(&self, data: &str) -> bool {
        matches!(&self.data, OptionData::Value(value) if value == data)
    }
}

/// How answers are collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptionMode {
    /// One button per option
    #[default]
    Buttons,
    /// The user types an option label
    Text,
}

type OnComplete<S> = Box<dyn Fn(&mut S, &StepOption, &str) -> StepResult + Send + Sync>;
type Decorate<S> = Box<dyn Fn(&S, &mut Embed) + Send + Sync>;

/// A prompt with a fixed set of options.
pub struct DialogStep<S> {
    title: Option<String>,
    main_text: Option<String>,
    options_text: Option<String>,
    options: Vec<StepOption>,
    option_mode: OptionMode,
    use_icons: bool,
    replace_previous: bool,
    default_result: StepResult,
    on_complete: OnComplete<S>,
    decorate: Option<Decorate<S>>,
}

impl<S> std::fmt::Debug for DialogStep<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogStep")
            .field("title", &self.title)
            .field("options", &self.options)
            .field("option_mode", &self.option_mode)
            .field("replace_previous", &self.replace_previous)
            .finish_non_exhaustive()
    }
}

impl<S: 'static> DialogStep<S> {
    /// Starts a step with no options that moves on to the next step.
    #[must_use]
    pub fn builder() -> DialogStepBuilder<S> {
        DialogStepBuilder {
            step: Self {
                title: None,
                main_text: None,
                options_text: None,
                options: Vec::new(),
                option_mode: OptionMode::default(),
                use_icons: true,
                replace_previous: false,
                default_result: StepResult::GotoNext,
                on_complete: Box::new(|_, _, _| StepResult::GotoNext),
                decorate: None,
            },
        }
    }
}

impl<S> DialogStep<S> {
    /// The options this step offers.
    #[must_use]
    pub fn options(&self) -> &[StepOption] {
        &self.options
    }

    /// Builds the prompt for the current state.
    pub fn render(&self, modal_title: &str, channel: impl std::fmt::Display, state: &S) -> Reply {
        let title = [Some(modal_title), self.title.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" / ");

        let mut embed = Embed::new().title(title);
        embed.description.clone_from(&self.main_text);
        if let Some(decorate) = &self.decorate {
            decorate(state, &mut embed);
        }

        if let Some(field) = self.options_field() {
            embed = embed.field("Options", field, false);
        }

        if self.option_mode == OptionMode::Text {
            if let Some(cancel) = self.options.iter().find(|o| o.data == OptionData::Cancel) {
                embed = embed.footer(format!("Type \"{}\" to cancel.", cancel.text));
            }
            return Reply::embed(embed);
        }

        let buttons = self
            .options
            .iter()
            .map(|option| Button {
                custom_id: format!("{channel}:{}", option.data.id()),
                label: option.text.clone(),
                emoji: option.icon.clone().filter(|_| self.use_icons),
                style: option.style,
            })
            .collect();
        Reply::embed(embed).with_buttons(buttons)
    }

    fn options_field(&self) -> Option<String> {
        if self.option_mode == OptionMode::Buttons && !self.use_icons {
            return self.options_text.clone();
        }

        let listed: Vec<&StepOption> = self
            .options
            .iter()
            .filter(|o| self.option_mode == OptionMode::Buttons || o.data != OptionData::Cancel)
            .collect();

        let mut parts = Vec::new();
        if let Some(text) = self.options_text.as_ref().filter(|t| !t.trim().is_empty()) {
            parts.push(text.clone());
        }
        if !listed.is_empty() {
            let mut lines = String::new();
            for (i, option) in listed.iter().enumerate() {
                if i > 0 {
                    lines.push('\n');
                }
                let bullet = match (self.option_mode, &option.icon) {
                    (OptionMode::Buttons, Some(icon)) => icon.as_str(),
                    _ => "•",
                };
                let _ = write!(lines, " {bullet}  {}", option.text);
            }
            parts.push(lines);
        }

        (!parts.is_empty()).then(|| parts.join("\n\n"))
    }
}

/// Builder for [`DialogStep`].
pub struct DialogStepBuilder<S> {
    step: DialogStep<S>,
}

impl<S> DialogStepBuilder<S> {
    /// Second part of the prompt title, after the modal title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.step.title = Some(title.into());
        self
    }

    /// Prompt body.
    #[must_use]
    pub fn main_text(mut self, text: impl Into<String>) -> Self {
        self.step.main_text = Some(text.into());
        self
    }

    /// Text shown above the option list.
    #[must_use]
    pub fn options_text(mut self, text: impl Into<String>) -> Self {
        self.step.options_text = Some(text.into());
        self
    }

    /// Appends an option.
    #[must_use]
    pub fn option(mut self, option: StepOption) -> Self {
        self.step.options.push(option);
        self
    }

    /// Sets how answers are collected.
    #[must_use]
    pub const fn mode(mut self, mode: OptionMode) -> Self {
        self.step.option_mode = mode;
        self
    }

    /// Whether option icons are shown.
    #[must_use]
    pub const fn use_icons(mut self, use_icons: bool) -> Self {
        self.step.use_icons = use_icons;
        self
    }

    /// Edit the previous prompt instead of sending a new one.
    #[must_use]
    pub const fn replace_previous(mut self) -> Self {
        self.step.replace_previous = true;
        self
    }

    /// Result returned straight after rendering when the step has no options.
    #[must_use]
    pub fn default_result(mut self, result: StepResult) -> Self {
        self.step.default_result = result;
        self
    }

    /// Called with the chosen option and the raw answer text.
    #[must_use]
    pub fn on_complete<F>(mut self, on_complete: F) -> Self
    where
        F: Fn(&mut S, &StepOption, &str) -> StepResult + Send + Sync + 'static,
    {
        self.step.on_complete = Box::new(on_complete);
        self
    }

    /// Adjusts the embed from the session state before options are added.
    #[must_use]
    pub fn decorate<F>(mut self, decorate: F) -> Self
    where
        F: Fn(&S, &mut Embed) + Send + Sync + 'static,
    {
        self.step.decorate = Some(Box::new(decorate));
        self
    }

    /// Validates and returns the step.
    pub fn build(self) -> Result<DialogStep<S>> {
        let count = self.step.options.len();
        if self.step.option_mode == OptionMode::Buttons && count > MAX_BUTTONS {
            return Err(Error::TooManyButtons {
                count,
                max: MAX_BUTTONS,
            });
        }
        Ok(self.step)
    }
}

fn matches_label(option: &StepOption, input: &str) -> bool {
    option.text.to_lowercase() == input.to_lowercase()
}

#[async_trait]
impl<S: Send> Step<S> for DialogStep<S> {
    async fn accept(&self, session: &mut DialogSession<S>) -> Result<StepResult> {
        let reply = self.render(&session.title, session.channel, &session.state);
        session.render(reply, self.replace_previous).await?;

        if self.options.is_empty() {
            return Ok(self.default_result.clone());
        }

        match self.option_mode {
            OptionMode::Text => loop {
                let message = match session.next_event().await? {
                    InboundEvent::Message(message) => message,
                    InboundEvent::Component(component) => {
                        debug!("Ignoring button press in text step");
                        session.acknowledge(&component).await?;
                        continue;
                    }
                };

                let content = message.content;
                let selected = self
                    .options
                    .iter()
                    .find(|option| matches_label(option, &content))
                    .or_else(|| self.options.iter().find(|o| o.data == OptionData::FreeInput));

                return Ok(match selected {
                    Some(option) => self.finish(&mut session.state, option, &content),
                    None => StepResult::Invalid,
                });
            },
            OptionMode::Buttons => loop {
                let InboundEvent::Component(component) = session.next_event().await? else {
                    debug!("Ignoring non-button event in button step");
                    continue;
                };
                session.acknowledge(&component).await?;
                if component.channel != session.channel {
                    continue;
                }
                if component.message.is_some() && component.message != session.prompt_message() {
                    debug!("Ignoring press on an earlier prompt");
                    continue;
                }

                let id = component
                    .custom_id
                    .split_once(':')
                    .map_or(component.custom_id.as_str(), |(_, id)| id);

                return Ok(match self.options.iter().find(|o| o.data.id() == id) {
                    Some(option) => self.finish(&mut session.state, option, &option.text),
                    None => StepResult::Invalid,
                });
            },
        }
    }
}

impl<S> DialogStep<S> {
    fn finish(&self, state: &mut S, option: &StepOption, input: &str) -> StepResult {
        if option.data == OptionData::Cancel {
            return StepResult::Cancel;
        }
        (self.on_complete)(state, option, input)
    }
}

type Factory<S> = Box<dyn Fn(&S) -> Result<DialogStep<S>> + Send + Sync>;

/// A step rebuilt from the session state on every visit.
pub struct LazyStep<S> {
    factory: Factory<S>,
}

impl<S> LazyStep<S> {
    /// Wraps a factory called on every visit.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&S) -> Result<DialogStep<S>> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
        }
    }
}

#[async_trait]
impl<S: Send> Step<S> for LazyStep<S> {
    async fn accept(&self, session: &mut DialogSession<S>) -> Result<StepResult> {
        let step = (self.factory)(&session.state)?;
        step.accept(session).await
    }
}
