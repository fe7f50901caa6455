use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::info;

use crate::domain::approval::{ApprovalId, ApprovalItem, ApprovalStatus};
use crate::errors::ApplicationError;
use crate::store::ApprovalStore;

pub const REQUEST_COMMAND_ID: &str = "signoff.approvals.request";
pub const APPROVE_COMMAND_ID: &str = "signoff.approvals.approve";
pub const REJECT_COMMAND_ID: &str = "signoff.approvals.reject";
pub const CLEAR_COMMAND_ID: &str = "signoff.approvals.clear";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub id: &'static str,
    pub title: &'static str,
    /// Invocable by name from a command palette. Approve and reject need a row id.
    pub global: bool,
}

pub fn command_descriptors() -> [CommandDescriptor; 4] {
    [
        CommandDescriptor { id: REQUEST_COMMAND_ID, title: "Request Approval", global: true },
        CommandDescriptor { id: APPROVE_COMMAND_ID, title: "Approve", global: false },
        CommandDescriptor { id: REJECT_COMMAND_ID, title: "Reject", global: false },
        CommandDescriptor { id: CLEAR_COMMAND_ID, title: "Clear Approvals", global: true },
    ]
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApprovalCommand {
    Request,
    Approve { id: ApprovalId },
    Reject { id: ApprovalId },
    Clear,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("command `{0}` requires an approval id argument")]
    MissingArgument(&'static str),
}

pub fn parse_command(
    command_id: &str,
    argument: Option<&str>,
) -> Result<ApprovalCommand, CommandParseError> {
    let id = || {
        argument
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ApprovalId::from)
    };

    match command_id {
        REQUEST_COMMAND_ID => Ok(ApprovalCommand::Request),
        CLEAR_COMMAND_ID => Ok(ApprovalCommand::Clear),
        APPROVE_COMMAND_ID => id()
            .map(|id| ApprovalCommand::Approve { id })
            .ok_or(CommandParseError::MissingArgument(APPROVE_COMMAND_ID)),
        REJECT_COMMAND_ID => id()
            .map(|id| ApprovalCommand::Reject { id })
            .ok_or(CommandParseError::MissingArgument(REJECT_COMMAND_ID)),
        other => Err(CommandParseError::UnknownCommand(other.to_string())),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputRequest {
    pub prompt: &'static str,
    pub placeholder: Option<&'static str>,
}

pub const TITLE_INPUT: InputRequest = InputRequest {
    prompt: "Approval title",
    placeholder: Some("e.g. Push to main, run build, edit config"),
};

pub const DETAILS_INPUT: InputRequest =
    InputRequest { prompt: "Details (optional)", placeholder: None };

/// Gathers free text from a person. `None` means the prompt was dismissed.
pub trait Prompt: Send + Sync {
    fn input(&self, request: &InputRequest) -> Option<String>;
}

/// Answers prompts from a fixed queue; an exhausted queue reads as dismissed.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<Option<String>>>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let answers = answers.into_iter().map(|answer| answer.map(Into::into)).collect();
        Self { answers: Mutex::new(answers) }
    }
}

impl Prompt for ScriptedPrompt {
    fn input(&self, _request: &InputRequest) -> Option<String> {
        self.answers.lock().unwrap_or_else(PoisonError::into_inner).pop_front().flatten()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    Requested(ApprovalItem),
    /// The title prompt was dismissed or left blank; nothing was created.
    Aborted,
    Decided(ApprovalItem),
    UnknownApproval { id: ApprovalId },
    Cleared,
}

pub struct CommandDispatcher<P> {
    store: Arc<ApprovalStore>,
    prompt: P,
}

impl<P> CommandDispatcher<P>
where
    P: Prompt,
{
    pub fn new(store: Arc<ApprovalStore>, prompt: P) -> Self {
        Self { store, prompt }
    }

    pub fn store(&self) -> &Arc<ApprovalStore> {
        &self.store
    }

    pub async fn dispatch(
        &self,
        command: ApprovalCommand,
    ) -> Result<CommandOutcome, ApplicationError> {
        match command {
            ApprovalCommand::Request => self.request().await,
            ApprovalCommand::Approve { id } => self.decide(id, ApprovalStatus::Approved).await,
            ApprovalCommand::Reject { id } => self.decide(id, ApprovalStatus::Rejected).await,
            ApprovalCommand::Clear => {
                self.store.clear().await?;
                Ok(CommandOutcome::Cleared)
            }
        }
    }

    async fn request(&self) -> Result<CommandOutcome, ApplicationError> {
        let Some(title) = self.prompt.input(&TITLE_INPUT).filter(|title| !title.trim().is_empty())
        else {
            info!(event_name = "approvals.command.request_aborted", "approval request abandoned");
            return Ok(CommandOutcome::Aborted);
        };
        let details = self.prompt.input(&DETAILS_INPUT);

        let item = self.store.add(&title, details.as_deref()).await?;
        Ok(CommandOutcome::Requested(item))
    }

    async fn decide(
        &self,
        id: ApprovalId,
        status: ApprovalStatus,
    ) -> Result<CommandOutcome, ApplicationError> {
        match self.store.set_status(&id, status).await? {
            Some(item) => Ok(CommandOutcome::Decided(item)),
            None => Ok(CommandOutcome::UnknownApproval { id }),
        }
    }
}
