use serde::Serialize;
use signoff_core::config::LoadOptions;
use signoff_core::view::{ApprovalCounts, ApprovalRow, ApprovalView};

use crate::commands::{with_session, CommandResult, Failure};
use crate::render::render_projection;

#[derive(Debug, Serialize)]
struct ListPayload<'a> {
    command: &'static str,
    status: &'static str,
    profile: &'a str,
    only_pending: bool,
    counts: ApprovalCounts,
    rows: Vec<ApprovalRow>,
}

pub fn run(options: &LoadOptions, all: bool, json_output: bool) -> CommandResult {
    with_session("list", options, |config, store, _storage| async move {
        let items = store.list().await?;
        let projection = ApprovalView::new(!all).project(&items);

        if !json_output {
            return Ok(CommandResult::text(render_projection(&projection)));
        }

        let payload = ListPayload {
            command: "list",
            status: "ok",
            profile: &config.storage.profile,
            only_pending: projection.only_pending,
            counts: projection.counts,
            rows: projection.row_models(),
        };
        serde_json::to_string(&payload)
            .map(CommandResult::text)
            .map_err(|error| Failure::new("serialization", error.to_string(), 3))
    })
}
