//! Plain-text rendering of approval projections for terminals.

use signoff_core::view::{ApprovalCounts, ApprovalRow, Projection};

pub fn render_projection(projection: &Projection) -> String {
    let mut lines = vec![render_header(&projection.counts, projection.only_pending)];

    if projection.counts.total == 0 {
        lines.push("No approvals yet.".to_string());
    } else if projection.is_empty() {
        lines.push("No pending approvals.".to_string());
    } else {
        lines.extend(projection.row_models().iter().map(render_row));
    }

    lines.join("\n")
}

fn render_header(counts: &ApprovalCounts, only_pending: bool) -> String {
    let scope = if only_pending { "showing pending only" } else { "showing all" };
    format!(
        "approvals: {} pending, {} approved, {} rejected ({} total; {scope})",
        counts.pending, counts.approved, counts.rejected, counts.total
    )
}

fn render_row(row: &ApprovalRow) -> String {
    let mut line = format!("[{:<8}] {}  {}", row.status_label, row.id, row.title);
    if let Some(details) = &row.details {
        line.push_str(&format!("\n           {details}"));
    }
    if !row.actions.is_empty() {
        let actions: Vec<String> = row
            .actions
            .iter()
            .map(|action| format!("signoff {} {}", action.label().to_ascii_lowercase(), row.id))
            .collect();
        line.push_str(&format!("\n           -> {}", actions.join(" | ")));
    }
    line
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use signoff_core::domain::approval::{ApprovalItem, ApprovalStatus};
    use signoff_core::view::ApprovalView;

    use super::render_projection;

    fn item(title: &str, details: Option<&str>, status: ApprovalStatus) -> ApprovalItem {
        let mut item = ApprovalItem::new_pending(title, details, Utc::now()).expect("valid title");
        item.status = status;
        item
    }

    #[test]
    fn empty_store_says_so() {
        let output = render_projection(&ApprovalView::default().project(&[]));
        assert!(output.starts_with("approvals: 0 pending, 0 approved, 0 rejected (0 total;"));
        assert!(output.ends_with("No approvals yet."));
    }

    #[test]
    fn decided_items_hidden_by_default_are_reported() {
        let items = vec![item("Ship", None, ApprovalStatus::Approved)];
        let output = render_projection(&ApprovalView::default().project(&items));
        assert!(output.ends_with("No pending approvals."));
    }

    #[test]
    fn pending_rows_list_their_actions() {
        let pending = item("Push to main", Some("hotfix"), ApprovalStatus::Pending);
        let rejected = item("Drop table", None, ApprovalStatus::Rejected);
        let items = vec![pending.clone(), rejected.clone()];

        let output = render_projection(&ApprovalView::new(false).project(&items));

        assert!(output.contains(&format!("[PENDING ] {}  Push to main", pending.id)));
        assert!(output.contains("           hotfix"));
        assert!(output.contains(&format!(
            "-> signoff approve {id} | signoff reject {id}",
            id = pending.id
        )));
        assert!(output.contains(&format!("[REJECTED] {}  Drop table", rejected.id)));
        assert_eq!(output.matches("->").count(), 1);
    }
}
