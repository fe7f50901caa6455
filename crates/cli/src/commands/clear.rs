use signoff_core::commands::{ApprovalCommand, CommandDispatcher, ScriptedPrompt};
use signoff_core::config::LoadOptions;

use crate::commands::{with_session, CommandResult};

pub fn run(options: &LoadOptions) -> CommandResult {
    with_session("clear", options, |config, store, _storage| async move {
        let removed = store.list().await?.len();
        CommandDispatcher::new(store, ScriptedPrompt::default())
            .dispatch(ApprovalCommand::Clear)
            .await?;
        Ok(CommandResult::success(
            "clear",
            format!("cleared {removed} approval(s) from profile `{}`", config.storage.profile),
        ))
    })
}
