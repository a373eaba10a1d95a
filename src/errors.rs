//! Unified error types and result handling.
//!
//! Every fallible operation in the crate returns [`Result`]. Variants carry
//! structured fields so callers can match on them, and [`Error::kind`] gives a
//! short stable name used when a failure is shown to a requester.

use crate::core::{ids::ChannelId, value::ValueKind};
use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required environment variable was missing or malformed.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// The configuration file was not valid TOML.
    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// A converter rejected its input.
    #[error("Could not convert {from} to {to}: {message}")]
    Conversion {
        /// Kind of the value being converted
        from: ValueKind,
        /// Kind the converter was producing
        to: ValueKind,
        /// Converter-specific reason
        message: String,
    },

    /// Path search produced a hop with no registered edge.
    #[error("Conversion from {from} to {to} was discovered by path search but no converter is registered")]
    BrokenConversionPath {
        /// Source of the missing edge
        from: ValueKind,
        /// Destination of the missing edge
        to: ValueKind,
    },

    /// A handler asked for an argument that was not bound with the expected kind.
    #[error("Argument {index} is not a `{expected}` (found {found})")]
    ArgumentType {
        /// Positional index of the argument
        index: usize,
        /// Kind the handler asked for
        expected: ValueKind,
        /// What was actually bound, if anything
        found: String,
    },

    /// Button-mode dialog steps are limited to a single action row.
    #[error("Button option mode requires at most {max} options, but {count} were added")]
    TooManyButtons {
        /// Number of options supplied
        count: usize,
        /// Maximum allowed
        max: usize,
    },

    /// A step transition pointed outside the modal.
    #[error("Dialog step `{target}` does not exist")]
    UnknownStep {
        /// Index or key that failed to resolve
        target: String,
    },

    /// A dialog is already running in this channel.
    #[error("There is already an active dialog in channel {channel}")]
    SessionActive {
        /// Channel that already has a session
        channel: ChannelId,
    },

    /// Dialogs need a user to answer them.
    #[error("A dialog cannot be started without a requester")]
    NoRequester,

    /// The session's event stream was closed before a response arrived.
    #[error("Dialog event stream closed")]
    SessionClosed,

    /// A dialog task panicked or was aborted.
    #[error("Dialog task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    /// Chat transport failure not coming from serenity directly.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the failure
        message: String,
    },

    /// Free-form failure raised by a command handler.
    #[error("{message}")]
    Command {
        /// Message shown to the requester
        message: String,
    },

    /// Failure raised while invoking a resolved command handler.
    #[error("Command `{command}` failed")]
    Invocation {
        /// Name of the command that failed
        command: String,
        /// What the handler returned
        #[source]
        source: Box<Error>,
    },

    /// Serenity/Poise framework error.
    #[error("Serenity/Poise framework error: {0}")]
    #[allow(clippy::enum_variant_names)]
    FrameworkError(Box<poise::serenity_prelude::Error>),
}

impl Error {
    /// Builds a [`Error::Command`] from anything printable.
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
        }
    }

    /// Short name of the variant, used as the "type" in failure reports.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "ConfigError",
            Self::Io(_) => "IoError",
            Self::EnvVar(_) => "EnvVarError",
            Self::Toml(_) => "TomlError",
            Self::Conversion { .. } => "ConversionError",
            Self::BrokenConversionPath { .. } => "BrokenConversionPath",
            Self::ArgumentType { .. } => "ArgumentTypeError",
            Self::TooManyButtons { .. } => "TooManyButtons",
            Self::UnknownStep { .. } => "UnknownStep",
            Self::SessionActive { .. } => "SessionActive",
            Self::NoRequester => "NoRequester",
            Self::SessionClosed => "SessionClosed",
            Self::TaskJoin(_) => "TaskJoinError",
            Self::Transport { .. } => "TransportError",
            Self::Command { .. } => "CommandError",
            Self::Invocation { .. } => "InvocationError",
            Self::FrameworkError(_) => "FrameworkError",
        }
    }
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::FrameworkError(Box::new(value))
    }
}

impl From<std::fmt::Error> for Error {
    fn from(value: std::fmt::Error) -> Self {
        Self::Command {
            message: value.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
