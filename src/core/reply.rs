//! Transport-neutral reply model.
//!
//! Handlers and dialog steps describe what they want to show with these
//! types; the chat adapter turns them into platform messages.

/// Embed colour used for failure reports.
pub const FAILURE_COLOR: u32 = 0xFF0000;

/// Embed titles longer than this are truncated by the platform.
pub const MAX_TITLE_LENGTH: usize = 256;

/// Visual weight of a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonStyle {
    /// Highlighted action
    #[default]
    Primary,
    /// Neutral action
    Secondary,
    /// Confirming action
    Success,
    /// Destructive or closing action
    Danger,
}

/// One clickable action attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    /// Identifier echoed back when the button is pressed
    pub custom_id: String,
    /// Caption
    pub label: String,
    /// Optional unicode emoji shown before the label
    pub emoji: Option<String>,
    /// Visual style
    pub style: ButtonStyle,
}

/// One named field inside an embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    /// Field heading
    pub name: String,
    /// Field body
    pub value: String,
    /// Whether the field may share a row with its neighbours
    pub inline: bool,
}

/// Rich message body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Embed {
    /// Heading line
    pub title: Option<String>,
    /// Main text
    pub description: Option<String>,
    /// Named fields, in display order
    pub fields: Vec<EmbedField>,
    /// Small text at the bottom
    pub footer: Option<String>,
    /// Side bar colour as `0xRRGGBB`
    pub color: Option<u32>,
    /// Image url shown in the corner
    pub thumbnail: Option<String>,
}

impl Embed {
    /// An empty embed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the main text.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    /// Sets the footer.
    #[must_use]
    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Sets the colour.
    #[must_use]
    pub const fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    /// Sets the thumbnail url.
    #[must_use]
    pub fn thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail = Some(url.into());
        self
    }
}

/// A message to send or an edit to apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    /// Plain text content
    pub content: Option<String>,
    /// Rich content
    pub embed: Option<Embed>,
    /// Buttons, rendered as a single action row. An empty list on an edit
    /// removes any existing buttons.
    pub buttons: Vec<Button>,
}

impl Reply {
    /// Plain text reply.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Embed-only reply.
    #[must_use]
    pub fn embed(embed: Embed) -> Self {
        Self {
            embed: Some(embed),
            ..Self::default()
        }
    }

    /// Attaches buttons.
    #[must_use]
    pub fn with_buttons(mut self, buttons: Vec<Button>) -> Self {
        self.buttons = buttons;
        self
    }
}

/// Shortens `title` so that `prefix + title + suffix` fits an embed title.
#[must_use]
pub fn fit_title(prefix: &str, title: &str, suffix: &str) -> String {
    let budget = MAX_TITLE_LENGTH.saturating_sub(prefix.chars().count() + suffix.chars().count());
    let clipped: String = title.chars().take(budget).collect();
    format!("{prefix}{clipped}{suffix}")
}
