use signoff_core::commands::{
    parse_command, CommandDispatcher, CommandOutcome, ScriptedPrompt, APPROVE_COMMAND_ID,
    REJECT_COMMAND_ID,
};
use signoff_core::config::LoadOptions;
use signoff_core::domain::approval::ApprovalStatus;

use crate::commands::{with_session, CommandResult, Failure};

/// Approves or rejects the approval with `id`.
pub fn run(options: &LoadOptions, id: &str, decision: ApprovalStatus) -> CommandResult {
    let (command, command_id) = match decision {
        ApprovalStatus::Approved => ("approve", APPROVE_COMMAND_ID),
        ApprovalStatus::Rejected => ("reject", REJECT_COMMAND_ID),
        ApprovalStatus::Pending => {
            return CommandResult::failure(
                "decide",
                "invalid_argument",
                "approval status cannot be set back to `pending`",
                6,
            );
        }
    };

    let parsed = match parse_command(command_id, Some(id)) {
        Ok(parsed) => parsed,
        Err(error) => {
            return CommandResult::failure(command, "invalid_argument", error.to_string(), 6)
        }
    };

    with_session(command, options, |_config, store, _storage| async move {
        let dispatcher = CommandDispatcher::new(store, ScriptedPrompt::default());
        match dispatcher.dispatch(parsed).await.map_err(Failure::from)? {
            CommandOutcome::Decided(item) => Ok(CommandResult::success(
                command,
                format!("{} {}: {}", item.status, item.id, item.title),
            )),
            CommandOutcome::UnknownApproval { id } => Ok(CommandResult::with_status(
                command,
                "not_found",
                format!("no approval with id {id}; nothing changed"),
            )),
            other => Err(Failure::new(
                "internal",
                format!("unexpected outcome for {command}: {other:?}"),
                3,
            )),
        }
    })
}
