//! Multi-step interactive dialogs bound to a channel and a requester.

/// Inbound events routed to sessions
pub mod event;
/// Step modals and the loop that drives them
pub mod modal;
/// One active session per channel
pub mod registry;
/// State visible to steps while a dialog runs
pub mod session;
/// Prompt steps and their results
pub mod step;

pub use modal::{ModalOutcome, StepModal, begin_modal};
pub use step::{DialogStep, LazyStep, OptionMode, StepOption, StepResult};
