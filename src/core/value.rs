//! Argument values and their kinds.
//!
//! Arguments flow through the dispatcher as a closed sum type. Conversion
//! graph edges are keyed by [`ValueKind`] pairs, so converters pattern-match on
//! variants instead of inspecting runtime types.

use crate::core::ids::{ChannelId, GuildId, UserId};
use bigdecimal::BigDecimal;
use bigdecimal::num_bigint::BigInt;
use std::fmt;

/// Tag for each [`Value`] variant. Ordering is only used to keep graph
/// iteration deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    /// Free text
    Text,
    /// 8-bit signed integer
    Byte,
    /// 16-bit signed integer
    Short,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// Arbitrary-precision integer
    BigInt,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// Arbitrary-precision decimal
    BigDecimal,
    /// A resolved platform user
    User,
    /// A guild and one of its channels
    GuildChannel,
}

impl ValueKind {
    /// Name shown to users in command signatures and error reports.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int32",
            Self::Long => "long",
            Self::BigInt => "int",
            Self::Float => "float",
            Self::Double => "double",
            Self::BigDecimal => "num",
            Self::User => "user",
            Self::GuildChannel => "channel",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A user resolved through the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    /// Platform id
    pub id: UserId,
    /// Display name
    pub name: String,
}

impl UserRef {
    /// Mention markup for this user.
    #[must_use]
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// A channel addressed together with its guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuildChannel {
    /// Owning guild
    pub guild: GuildId,
    /// Channel inside the guild
    pub channel: ChannelId,
}

/// One argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Free text
    Text(String),
    /// 8-bit signed integer
    Byte(i8),
    /// 16-bit signed integer
    Short(i16),
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    Long(i64),
    /// Arbitrary-precision integer
    BigInt(BigInt),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// Arbitrary-precision decimal
    BigDecimal(BigDecimal),
    /// A resolved platform user
    User(UserRef),
    /// A guild and one of its channels
    GuildChannel(GuildChannel),
}

impl Value {
    /// The tag of this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Text(_) => ValueKind::Text,
            Self::Byte(_) => ValueKind::Byte,
            Self::Short(_) => ValueKind::Short,
            Self::Int(_) => ValueKind::Int,
            Self::Long(_) => ValueKind::Long,
            Self::BigInt(_) => ValueKind::BigInt,
            Self::Float(_) => ValueKind::Float,
            Self::Double(_) => ValueKind::Double,
            Self::BigDecimal(_) => ValueKind::BigDecimal,
            Self::User(_) => ValueKind::User,
            Self::GuildChannel(_) => ValueKind::GuildChannel,
        }
    }

    /// Builds a text value.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(v) => f.write_str(v),
            Self::Byte(v) => write!(f, "{v}"),
            Self::Short(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::BigInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::BigDecimal(v) => write!(f, "{v}"),
            Self::User(user) => f.write_str(&user.name),
            Self::GuildChannel(pair) => write!(f, "{}/{}", pair.guild, pair.channel),
        }
    }
}
