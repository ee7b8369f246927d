//! Document workflow status and the reason text sent with a transition.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Workflow status of an uploaded document.
///
/// A document has exactly one status at a time. The client never computes a
/// transition; it asks the backend for one and reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Draft,
    Reviewed,
    Approved,
    Rejected,
}

impl WorkflowStatus {
    /// All statuses in board column order.
    pub const ALL: [WorkflowStatus; 4] = [
        WorkflowStatus::Draft,
        WorkflowStatus::Reviewed,
        WorkflowStatus::Approved,
        WorkflowStatus::Rejected,
    ];

    /// Wire name used in URLs and JSON bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::Draft => "draft",
            WorkflowStatus::Reviewed => "reviewed",
            WorkflowStatus::Approved => "approved",
            WorkflowStatus::Rejected => "rejected",
        }
    }

    /// German label shown on badges and column headers.
    pub fn label(self) -> &'static str {
        match self {
            WorkflowStatus::Draft => "Entwurf",
            WorkflowStatus::Reviewed => "Geprüft",
            WorkflowStatus::Approved => "Freigegeben",
            WorkflowStatus::Rejected => "Abgelehnt",
        }
    }

    /// Column position on the board.
    pub fn index(self) -> usize {
        match self {
            WorkflowStatus::Draft => 0,
            WorkflowStatus::Reviewed => 1,
            WorkflowStatus::Approved => 2,
            WorkflowStatus::Rejected => 3,
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowStatus {
    type Err = ValidationError;

    /// Accepts the wire name or the German label, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        WorkflowStatus::ALL
            .into_iter()
            .find(|status| {
                status.as_str().eq_ignore_ascii_case(needle)
                    || status.label().to_lowercase() == needle.to_lowercase()
            })
            .ok_or_else(|| ValidationError::UnknownStatus(needle.to_string()))
    }
}

/// Reason attached to a status change requested by drag and drop.
pub fn default_transition_reason(from: WorkflowStatus, to: WorkflowStatus) -> String {
    format!(
        "Status per Drag & Drop von \"{}\" zu \"{}\" geändert",
        from.label(),
        to.label()
    )
}
