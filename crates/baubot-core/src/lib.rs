//! # baubot-core
//!
//! Intent routing and workflows for the office assistant: project
//! numbering with year rollover, fuzzy project resolution, date and
//! duration normalization, task auto-tagging, and the dispatcher that
//! maps classified intents onto side-effecting workflows.
//!
//! The transport (Telegram) and the external collaborators (Drive,
//! CalDAV, the LLM classifier) live in `baubot-adapters`; persistence
//! lives in `baubot-store`. This crate wires them together behind
//! [`Dispatcher::dispatch`].

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod normalize;
pub mod numbering;
pub mod resolver;
pub mod tags;
pub mod workflows;

// ── re-exports ───────────────────────────────────────────────────────

pub use config::AssistantConfig;
pub use dispatcher::Dispatcher;
pub use error::{CoreError, CoreResult};
pub use numbering::{IssuedNumber, NumberingService};
pub use resolver::ProjectResolver;
pub use tags::TagMatcher;
pub use workflows::{SenderContext, TaskRequest, WorkflowResult, Workflows};
