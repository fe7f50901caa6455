//! Read-only projections of an approval snapshot for presentation.
//!
//! Nothing here holds on to items between changes; callers hand in a fresh
//! [`ApprovalStore::list`](crate::store::ApprovalStore::list) result every time.

use serde::Serialize;

use crate::commands::{APPROVE_COMMAND_ID, REJECT_COMMAND_ID};
use crate::domain::approval::{ApprovalId, ApprovalItem, ApprovalStatus};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ApprovalCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub total: usize,
}

pub fn counts(items: &[ApprovalItem]) -> ApprovalCounts {
    let mut counts = ApprovalCounts::default();
    for item in items {
        match item.status {
            ApprovalStatus::Pending => counts.pending += 1,
            ApprovalStatus::Approved => counts.approved += 1,
            ApprovalStatus::Rejected => counts.rejected += 1,
        }
    }
    counts.total = counts.pending + counts.approved + counts.rejected;
    counts
}

pub fn filtered(items: &[ApprovalItem], only_pending: bool) -> Vec<ApprovalItem> {
    items.iter().filter(|item| !only_pending || item.is_pending()).cloned().collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowAction {
    Approve,
    Reject,
}

impl RowAction {
    pub fn command_id(&self) -> &'static str {
        match self {
            Self::Approve => APPROVE_COMMAND_ID,
            Self::Reject => REJECT_COMMAND_ID,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Approve => "Approve",
            Self::Reject => "Reject",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApprovalRow {
    pub id: ApprovalId,
    pub title: String,
    pub details: Option<String>,
    pub status: ApprovalStatus,
    pub status_label: &'static str,
    pub actions: Vec<RowAction>,
}

impl From<&ApprovalItem> for ApprovalRow {
    fn from(item: &ApprovalItem) -> Self {
        let actions = match item.status {
            ApprovalStatus::Pending => vec![RowAction::Approve, RowAction::Reject],
            ApprovalStatus::Approved | ApprovalStatus::Rejected => Vec::new(),
        };
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            details: item.details.clone(),
            status: item.status,
            status_label: item.status.label(),
            actions,
        }
    }
}

/// The rows a surface shows for one snapshot, plus counts over the whole snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Projection {
    pub only_pending: bool,
    pub rows: Vec<ApprovalItem>,
    pub counts: ApprovalCounts,
}

impl Projection {
    /// Row lookup for selection state kept by the surface.
    pub fn item_at(&self, index: usize) -> Option<&ApprovalItem> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_models(&self) -> Vec<ApprovalRow> {
        self.rows.iter().map(ApprovalRow::from).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApprovalView {
    only_pending: bool,
}

impl Default for ApprovalView {
    fn default() -> Self {
        Self { only_pending: true }
    }
}

impl ApprovalView {
    pub fn new(only_pending: bool) -> Self {
        Self { only_pending }
    }

    pub fn only_pending(&self) -> bool {
        self.only_pending
    }

    pub fn set_only_pending(&mut self, only_pending: bool) {
        self.only_pending = only_pending;
    }

    pub fn toggle_only_pending(&mut self) -> bool {
        self.only_pending = !self.only_pending;
        self.only_pending
    }

    pub fn project(&self, items: &[ApprovalItem]) -> Projection {
        Projection {
            only_pending: self.only_pending,
            rows: filtered(items, self.only_pending),
            counts: counts(items),
        }
    }
}
