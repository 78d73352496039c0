use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier wrapper for tenant requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantRequestId(pub String);

impl fmt::Display for TenantRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a tenant request.
///
/// Allowed edges: Draft → Submitted → Scheduled → Done | Failed → Closed, plus
/// Submitted → Declined, Failed → Scheduled (reschedule) and Declined → Closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantRequestStatus {
    Draft,
    Submitted,
    Scheduled,
    Done,
    Failed,
    Declined,
    Closed,
}

impl TenantRequestStatus {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Draft,
            Self::Submitted,
            Self::Scheduled,
            Self::Done,
            Self::Failed,
            Self::Declined,
            Self::Closed,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Submitted => "Submitted",
            Self::Scheduled => "Scheduled",
            Self::Done => "Done",
            Self::Failed => "Failed",
            Self::Declined => "Declined",
            Self::Closed => "Closed",
        }
    }

    /// No further work can happen on the request. A declined request may still be closed
    /// administratively, which only records closure notes.
    pub const fn is_terminal(self) -> bool {
        match self {
            Self::Closed | Self::Declined => true,
            Self::Draft | Self::Submitted | Self::Scheduled | Self::Done | Self::Failed => false,
        }
    }

    /// Tenant-facing details (contact info, description) may still change.
    pub const fn can_be_modified(self) -> bool {
        match self {
            Self::Draft | Self::Submitted => true,
            Self::Scheduled | Self::Done | Self::Failed | Self::Declined | Self::Closed => false,
        }
    }

    pub const fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Draft => matches!(next, Self::Submitted),
            Self::Submitted => matches!(next, Self::Scheduled | Self::Declined),
            Self::Scheduled => matches!(next, Self::Done | Self::Failed),
            Self::Failed => matches!(next, Self::Scheduled),
            Self::Done | Self::Declined => matches!(next, Self::Closed),
            Self::Closed => false,
        }
    }
}

impl fmt::Display for TenantRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tenant-declared priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Low,
    #[default]
    Normal,
    High,
    Critical,
    Emergency,
}

impl UrgencyLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Normal => "Normal",
            Self::High => "High",
            Self::Critical => "Critical",
            Self::Emergency => "Emergency",
        }
    }

    /// Critical and emergency requests rank workers by how soon they are free.
    pub const fn is_emergency(self) -> bool {
        matches!(self, Self::Critical | Self::Emergency)
    }

    pub const fn expected_response_hours(self) -> u32 {
        match self {
            Self::Emergency => 2,
            Self::Critical => 4,
            Self::High => 24,
            Self::Normal => 72,
            Self::Low => 168,
        }
    }
}

/// Tenant details copied onto the request at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContact {
    pub tenant_id: String,
    pub name: String,
    pub email: String,
    pub unit_number: String,
}

/// Property and superintendent details copied onto the request at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyContact {
    pub property_id: String,
    pub name: String,
    pub phone: String,
    pub superintendent_name: String,
    pub superintendent_email: String,
}

/// Everything a tenant supplies when opening a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTenantRequest {
    pub code: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub urgency: UrgencyLevel,
    pub tenant: TenantContact,
    pub property: PropertyContact,
}

/// Append-only audit entry. Info updates record `from == Some(to)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChangeRecord {
    pub from: Option<TenantRequestStatus>,
    pub to: TenantRequestStatus,
    pub changed_at: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantRequestEvent {
    pub request_id: TenantRequestId,
    pub code: String,
    pub occurred_at: DateTime<Utc>,
    pub kind: TenantRequestEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TenantRequestEventKind {
    Created {
        urgency: UrgencyLevel,
    },
    Submitted,
    Scheduled {
        scheduled_date: DateTime<Utc>,
        worker_email: String,
        work_order_number: String,
    },
    Completed {
        successful: bool,
        notes: String,
    },
    Declined {
        reason: String,
    },
    Closed {
        closure_notes: String,
    },
    TenantInfoUpdated {
        tenant: TenantContact,
    },
    PropertyInfoUpdated {
        property: PropertyContact,
    },
}

impl TenantRequestEventKind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Submitted => "submitted",
            Self::Scheduled { .. } => "scheduled",
            Self::Completed { .. } => "completed",
            Self::Declined { .. } => "declined",
            Self::Closed { .. } => "closed",
            Self::TenantInfoUpdated { .. } => "tenant_info_updated",
            Self::PropertyInfoUpdated { .. } => "property_info_updated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_are_exactly_closed_and_declined() {
        for status in TenantRequestStatus::ordered() {
            let expected = matches!(
                status,
                TenantRequestStatus::Closed | TenantRequestStatus::Declined
            );
            assert_eq!(status.is_terminal(), expected, "{status}");
        }
    }

    #[test]
    fn every_non_terminal_status_has_an_outgoing_edge() {
        for status in TenantRequestStatus::ordered() {
            if status.is_terminal() {
                continue;
            }
            assert!(
                TenantRequestStatus::ordered()
                    .iter()
                    .any(|next| status.can_transition_to(*next)),
                "{status} should allow a further transition"
            );
        }
    }

    #[test]
    fn only_draft_and_submitted_are_modifiable() {
        let modifiable: Vec<_> = TenantRequestStatus::ordered()
            .into_iter()
            .filter(|status| status.can_be_modified())
            .collect();
        assert_eq!(
            modifiable,
            vec![TenantRequestStatus::Draft, TenantRequestStatus::Submitted]
        );
    }

    #[test]
    fn modifiable_statuses_are_never_terminal() {
        for status in TenantRequestStatus::ordered() {
            assert!(!(status.can_be_modified() && status.is_terminal()));
        }
    }

    #[test]
    fn closed_has_no_outgoing_edges() {
        assert!(TenantRequestStatus::ordered()
            .iter()
            .all(|next| !TenantRequestStatus::Closed.can_transition_to(*next)));
    }

    #[test]
    fn urgency_emergency_flag_and_response_targets() {
        assert!(UrgencyLevel::Emergency.is_emergency());
        assert!(UrgencyLevel::Critical.is_emergency());
        assert!(!UrgencyLevel::High.is_emergency());
        assert!(
            UrgencyLevel::Emergency.expected_response_hours()
                < UrgencyLevel::Low.expected_response_hours()
        );
        assert_eq!(UrgencyLevel::default(), UrgencyLevel::Normal);
    }
}
