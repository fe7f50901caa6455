pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod notify;
pub mod storage;
pub mod store;
pub mod view;

pub use commands::{
    command_descriptors, parse_command, ApprovalCommand, CommandDescriptor, CommandDispatcher,
    CommandOutcome, CommandParseError, InputRequest, Prompt, ScriptedPrompt,
};
pub use domain::approval::{ApprovalId, ApprovalItem, ApprovalStatus};
pub use errors::{ApplicationError, DomainError, InterfaceError, StorageError};
pub use notify::{Emitter, Subscription, SubscriptionSet};
pub use storage::{InMemoryStorage, StorageBackend, StorageChange, WriterId};
pub use store::ApprovalStore;
pub use view::{ApprovalCounts, ApprovalRow, ApprovalView, Projection, RowAction};
