//! Command registration table.
//!
//! Each [`Module`] hands the registry an explicit list of
//! [`RegisteredCommand`]s at startup, and may add domain converters to the
//! conversion graph. Once built, the [`CommandRegistry`] is immutable and
//! shared behind an `Arc`.

use crate::{
    core::{
        context::CommandContext,
        conversion::{ConversionGraph, Converter},
        value::{GuildChannel, UserRef, Value, ValueKind},
    },
    errors::{Error, Result},
};
use bigdecimal::BigDecimal;
use bigdecimal::num_bigint::BigInt;
use futures::future::BoxFuture;
use std::{fmt, future::Future, sync::Arc};
use tracing::info;

/// Boxed command body.
pub type HandlerFn = Arc<dyn Fn(CommandContext, Args) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Declared parameter of a command.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    /// Name shown in help
    pub name: String,
    /// Kind the argument is converted to
    pub kind: ValueKind,
    /// May be left out when it is the last parameter
    pub optional: bool,
    /// Swallows every remaining token as one text value
    pub join_remaining: bool,
    /// Value bound when an optional parameter is left out
    pub default: Option<Value>,
}

impl ParamSpec {
    /// A required parameter.
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: false,
            join_remaining: false,
            default: None,
        }
    }

    /// Shorthand for a text parameter.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Text)
    }

    /// Marks the parameter optional with no default.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Marks the parameter optional, binding `value` when it is left out.
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.optional = true;
        self.default = Some(value);
        self
    }

    /// Marks the parameter join-remaining.
    #[must_use]
    pub const fn join_remaining(mut self) -> Self {
        self.join_remaining = true;
        self
    }
}

impl fmt::Display for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}: {}", self.name, self.kind)?;
        if self.join_remaining {
            f.write_str("+")?;
        }
        if self.optional {
            f.write_str("?")?;
        }
        f.write_str("]")
    }
}

/// Help metadata attached to a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelpText {
    /// Full description shown by `help <command>`
    pub description: String,
    /// One-line summary for listings; falls back to the description
    pub summary: Option<String>,
    /// Commands sharing a group are listed as related
    pub group: Option<String>,
}

impl HelpText {
    /// Summary for listings.
    #[must_use]
    pub fn display_summary(&self) -> &str {
        self.summary.as_deref().unwrap_or(&self.description)
    }
}

/// One invocable overload.
#[derive(Clone)]
pub struct RegisteredCommand {
    /// Owning module name; filled in by the registry builder
    pub module: String,
    /// Name users type
    pub name: String,
    /// Value parameters, in order
    pub params: Vec<ParamSpec>,
    /// Help metadata
    pub help: Option<HelpText>,
    /// Left out of command listings
    pub hidden: bool,
    handler: HandlerFn,
}

impl fmt::Debug for RegisteredCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredCommand")
            .field("module", &self.module)
            .field("name", &self.name)
            .field("params", &self.params)
            .field("hidden", &self.hidden)
            .finish_non_exhaustive()
    }
}

impl RegisteredCommand {
    /// Creates a command with no parameters around `handler`.
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(CommandContext, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            module: String::new(),
            name: name.into(),
            params: Vec::new(),
            help: None,
            hidden: false,
            handler: Arc::new(move |ctx, args| -> BoxFuture<'static, Result<()>> {
                Box::pin(handler(ctx, args))
            }),
        }
    }

    /// Appends a value parameter.
    #[must_use]
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Sets the full help description.
    #[must_use]
    pub fn help(mut self, description: impl Into<String>) -> Self {
        self.help_text_mut().description = description.into();
        self
    }

    /// Sets the one-line summary.
    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.help_text_mut().summary = Some(summary.into());
        self
    }

    /// Puts the command in a help group.
    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.help_text_mut().group = Some(group.into());
        self
    }

    /// Leaves the command out of listings and suggestions.
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    fn help_text_mut(&mut self) -> &mut HelpText {
        self.help.get_or_insert_with(HelpText::default)
    }

    /// Signature as shown to users, e.g. `` `m!roll [dice: text+?]` ``.
    #[must_use]
    pub fn display_title(&self, prefix: &str) -> String {
        let mut title = format!("`{prefix}{}", self.name);
        for param in &self.params {
            title.push(' ');
            title.push_str(&param.to_string());
        }
        title.push('`');
        title
    }

    /// Runs the handler.
    pub fn invoke(&self, ctx: CommandContext, args: Args) -> BoxFuture<'static, Result<()>> {
        (self.handler)(ctx, args)
    }
}

/// Converted argument values bound positionally to a command's parameters.
/// Optional parameters without a default that were left out are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<Option<Value>>,
}

impl Args {
    /// Wraps bound values.
    #[must_use]
    pub const fn new(values: Vec<Option<Value>>) -> Self {
        Self { values }
    }

    /// Value at `index`, if bound.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// Number of parameter slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no parameter slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn mismatch(&self, index: usize, expected: ValueKind) -> Error {
        Error::ArgumentType {
            index,
            expected,
            found: self
                .get(index)
                .map_or_else(|| "nothing".to_string(), |value| value.kind().to_string()),
        }
    }

    /// Text argument.
    pub fn text(&self, index: usize) -> Result<&str> {
        match self.get(index) {
            Some(Value::Text(text)) => Ok(text),
            _ => Err(self.mismatch(index, ValueKind::Text)),
        }
    }

    /// Text argument that may have been left out.
    pub fn opt_text(&self, index: usize) -> Result<Option<&str>> {
        match self.get(index) {
            None => Ok(None),
            Some(Value::Text(text)) => Ok(Some(text)),
            Some(_) => Err(self.mismatch(index, ValueKind::Text)),
        }
    }

    /// Integer argument.
    pub fn int(&self, index: usize) -> Result<&BigInt> {
        match self.get(index) {
            Some(Value::BigInt(n)) => Ok(n),
            _ => Err(self.mismatch(index, ValueKind::BigInt)),
        }
    }

    /// Decimal argument.
    pub fn num(&self, index: usize) -> Result<&BigDecimal> {
        match self.get(index) {
            Some(Value::BigDecimal(n)) => Ok(n),
            _ => Err(self.mismatch(index, ValueKind::BigDecimal)),
        }
    }

    /// User argument.
    pub fn user(&self, index: usize) -> Result<&UserRef> {
        match self.get(index) {
            Some(Value::User(user)) => Ok(user),
            _ => Err(self.mismatch(index, ValueKind::User)),
        }
    }

    /// Guild and channel argument.
    pub fn guild_channel(&self, index: usize) -> Result<GuildChannel> {
        match self.get(index) {
            Some(Value::GuildChannel(pair)) => Ok(*pair),
            _ => Err(self.mismatch(index, ValueKind::GuildChannel)),
        }
    }
}

/// A feature module contributing commands and converters.
pub trait Module: Send + Sync {
    /// Module name used in logs and on registered commands.
    fn name(&self) -> &'static str;

    /// Commands this module provides.
    fn commands(&self) -> Vec<RegisteredCommand>;

    /// Adds domain converters. Called once, before any dispatch.
    fn register_converters(&self, _graph: &mut ConversionGraph) {}
}

/// Immutable table of commands plus the conversion graph used to bind them.
#[derive(Debug)]
pub struct CommandRegistry {
    prefix: String,
    graph: ConversionGraph,
    commands: Vec<RegisteredCommand>,
}

impl CommandRegistry {
    /// Starts a registry with the primitive widenings pre-registered.
    pub fn builder(prefix: impl Into<String>) -> CommandRegistryBuilder {
        CommandRegistryBuilder {
            prefix: prefix.into(),
            graph: ConversionGraph::with_primitives(),
            commands: Vec::new(),
        }
    }

    /// Command prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Conversion graph used to bind arguments.
    #[must_use]
    pub const fn graph(&self) -> &ConversionGraph {
        &self.graph
    }

    /// Every overload, in registration order.
    #[must_use]
    pub fn commands(&self) -> &[RegisteredCommand] {
        &self.commands
    }

    /// Overloads whose name matches exactly.
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a RegisteredCommand> + 'a {
        self.commands.iter().filter(move |command| command.name == name)
    }

    /// Overloads whose name matches ignoring ASCII case.
    pub fn named_ignore_case<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a RegisteredCommand> + 'a {
        self.commands
            .iter()
            .filter(move |command| command.name.eq_ignore_ascii_case(name))
    }

    /// Non-hidden overloads sorted by name; overloads of one name keep their
    /// registration order.
    #[must_use]
    pub fn visible(&self) -> Vec<&RegisteredCommand> {
        let mut visible: Vec<_> = self.commands.iter().filter(|command| !command.hidden).collect();
        visible.sort_by(|a, b| a.name.cmp(&b.name));
        visible
    }
}

/// Collects modules and freezes them into a [`CommandRegistry`].
pub struct CommandRegistryBuilder {
    prefix: String,
    graph: ConversionGraph,
    commands: Vec<RegisteredCommand>,
}

impl CommandRegistryBuilder {
    /// Adds a module's converters and commands.
    #[must_use]
    pub fn module(mut self, module: &dyn Module) -> Self {
        module.register_converters(&mut self.graph);
        let commands = module.commands();
        info!("Registered module {} with {} commands", module.name(), commands.len());

        for mut command in commands {
            command.module = module.name().to_string();
            self.commands.push(command);
        }
        self
    }

    /// Adds a loose command outside any module.
    #[must_use]
    pub fn command(mut self, command: RegisteredCommand) -> Self {
        self.commands.push(command);
        self
    }

    /// Adds one converter edge.
    #[must_use]
    pub fn converter(
        mut self,
        from: ValueKind,
        to: ValueKind,
        converter: Arc<dyn Converter>,
        priority: u32,
    ) -> Self {
        self.graph.add_converter(from, to, converter, priority);
        self
    }

    /// Freezes the table.
    #[must_use]
    pub fn build(self) -> Arc<CommandRegistry> {
        Arc::new(CommandRegistry {
            prefix: self.prefix,
            graph: self.graph,
            commands: self.commands,
        })
    }
}
