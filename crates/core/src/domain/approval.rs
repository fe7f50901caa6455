use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalId(pub String);

impl ApprovalId {
    /// `<epoch-ms>-<uuid v4 simple>`.
    pub fn generate(now: DateTime<Utc>) -> Self {
        Self(format!("{}-{}", now.timestamp_millis(), Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApprovalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ApprovalId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Short upper-case label used by list rows.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Resolves the status an item ends up in when `target` is requested.
    ///
    /// Decisions are one-way: pending can move to approved or rejected, a decided item
    /// only accepts its own status again, and nothing moves back to pending.
    pub fn transition_to(self, target: ApprovalStatus) -> Result<ApprovalStatus, DomainError> {
        match (self, target) {
            (_, Self::Pending) => Err(DomainError::InvalidArgument(
                "approval status cannot be set back to `pending`".to_string(),
            )),
            (Self::Pending, decided) => Ok(decided),
            (current, decided) if current == decided => Ok(current),
            (from, to) => Err(DomainError::InvalidTransition { from, to }),
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalItem {
    pub id: ApprovalId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub status: ApprovalStatus,
}

impl ApprovalItem {
    /// Builds a new request. Items are always born pending.
    pub fn new_pending(
        title: &str,
        details: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DomainError::InvalidArgument(
                "approval title must not be empty".to_string(),
            ));
        }

        let details = details.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string);
        // Persisted timestamps carry milliseconds only.
        let created_at = now.trunc_subsecs(3);

        Ok(Self {
            id: ApprovalId::generate(created_at),
            title: title.to_string(),
            details,
            created_at,
            status: ApprovalStatus::Pending,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == ApprovalStatus::Pending
    }
}
