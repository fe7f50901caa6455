use std::future::Future;
use std::io::{self, Write};
use std::time::Duration;

use signoff_core::config::LoadOptions;
use signoff_core::store::ApprovalStore;
use signoff_core::view::ApprovalView;
use tokio::sync::mpsc;
use tracing::info;

use crate::commands::{with_session, CommandResult, Failure};
use crate::render::render_projection;

/// Re-renders the approval list after every change until Ctrl-C.
pub fn run(options: &LoadOptions, all: bool) -> CommandResult {
    with_session("watch", options, |config, store, storage| async move {
        let view = ApprovalView::new(!all);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _subscription = store.on_did_change(move || {
            let _ = tx.send(());
        });
        let watcher =
            storage.spawn_watcher(Duration::from_millis(config.storage.watch_interval_ms));

        info!(
            event_name = "cli.watch.started",
            profile = %storage.profile(),
            interval_ms = config.storage.watch_interval_ms,
            "watching approvals"
        );

        let rendered =
            render_on_change(&store, &view, &mut rx, tokio::signal::ctrl_c(), &mut io::stdout())
                .await;
        watcher.abort();

        let renders = rendered?;
        Ok(CommandResult::success("watch", format!("stopped after {renders} render(s)")))
    })
}

/// Renders once, then once more per burst of change notifications, until `stop` resolves.
/// Returns how many times the list was rendered.
pub(crate) async fn render_on_change<S, W>(
    store: &ApprovalStore,
    view: &ApprovalView,
    changes: &mut mpsc::UnboundedReceiver<()>,
    stop: S,
    out: &mut W,
) -> Result<usize, Failure>
where
    S: Future<Output = io::Result<()>>,
    W: Write,
{
    tokio::pin!(stop);
    let mut renders = 0usize;

    loop {
        let items = store.list().await?;
        writeln!(out, "{}\n", render_projection(&view.project(&items)))
            .and_then(|()| out.flush())
            .map_err(|error| Failure::new("output", format!("failed to render: {error}"), 3))?;
        renders += 1;

        tokio::select! {
            biased;
            signal = &mut stop => {
                signal.map_err(|error| {
                    Failure::new("runtime_init", format!("ctrl-c handler failed: {error}"), 3)
                })?;
                break;
            }
            changed = changes.recv() => {
                if changed.is_none() {
                    break;
                }
                // Several writes may land between two renders; one re-read covers them all.
                while changes.try_recv().is_ok() {}
            }
        }
    }

    Ok(renders)
}
