//! Transport-agnostic command core: values, conversions, tokenizing,
//! registration and overload dispatch.

/// Command registration table and modules
pub mod command;
/// Invocation context and collaborator traits
pub mod context;
/// Conversion graph between value kinds
pub mod conversion;
/// Overload resolution and dispatch
pub mod dispatch;
/// Platform-neutral ids
pub mod ids;
/// Failure report embeds
pub mod report;
/// Reply, embed and button model
pub mod reply;
/// Argument tokenizer
pub mod tokenizer;
/// Argument values
pub mod value;
