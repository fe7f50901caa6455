use signoff_core::commands::{ApprovalCommand, CommandDispatcher, CommandOutcome, Prompt};
use signoff_core::config::LoadOptions;

use crate::commands::{with_session, CommandResult, Failure};

pub fn run<P>(options: &LoadOptions, prompt: P) -> CommandResult
where
    P: Prompt,
{
    with_session("request", options, |_config, store, _storage| async move {
        let dispatcher = CommandDispatcher::new(store, prompt);
        let result = match dispatcher.dispatch(ApprovalCommand::Request).await? {
            CommandOutcome::Requested(item) => CommandResult::success(
                "request",
                format!("requested approval {}: {}", item.id, item.title),
            ),
            CommandOutcome::Aborted => {
                CommandResult::with_status("request", "aborted", "no title given; nothing created")
            }
            other => {
                return Err(Failure::new(
                    "internal",
                    format!("unexpected outcome for request: {other:?}"),
                    3,
                ))
            }
        };
        Ok(result)
    })
}
