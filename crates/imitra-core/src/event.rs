//! Real-time push events and the rooms they are addressed to.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::complaint::{Complaint, Remark, Status};
use crate::sla::SlaStatus;
use crate::taxonomy::{Category, Department, Priority};
use crate::user::Role;

/// A push audience: everyone with a role, everyone in a department, or one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Room {
    Role(Role),
    Department(Department),
    User(Uuid),
}

impl Room {
    /// Rooms a connection for this identity joins.
    pub fn memberships(user_id: Uuid, role: Role, department: Option<Department>) -> Vec<Room> {
        let mut rooms = vec![Room::Role(role), Room::User(user_id)];
        if let Some(d) = department {
            rooms.push(Room::Department(d));
        }
        rooms
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::Role(r) => write!(f, "role:{r}"),
            Room::Department(d) => write!(f, "department:{d}"),
            Room::User(u) => write!(f, "user:{u}"),
        }
    }
}

/// Compact complaint card carried in push payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplaintSummary {
    pub id: Uuid,
    pub complaint_number: String,
    pub title: String,
    pub status: Status,
    pub category: Category,
    pub department: Department,
    pub priority: Priority,
    pub citizen_id: Uuid,
    pub assigned_officer: Option<Uuid>,
    pub assigned_mitra: Option<Uuid>,
    pub sla_status: SlaStatus,
    pub deadline: DateTime<Utc>,
}

impl From<&Complaint> for ComplaintSummary {
    fn from(c: &Complaint) -> Self {
        Self {
            id: c.id,
            complaint_number: c.complaint_number.clone(),
            title: c.title.clone(),
            status: c.status,
            category: c.classification.category,
            department: c.classification.department,
            priority: c.classification.priority,
            citizen_id: c.citizen_id,
            assigned_officer: c.assigned_officer,
            assigned_mitra: c.assigned_mitra,
            sla_status: c.sla.status,
            deadline: c.sla.deadline,
        }
    }
}

/// Server → client payload: `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    NewComplaint(ComplaintSummary),
    ComplaintAssigned {
        complaint: ComplaintSummary,
        mitra_id: Uuid,
    },
    ComplaintStatusUpdated {
        complaint: ComplaintSummary,
        from: Status,
        to: Status,
        note: Option<String>,
    },
    NewRemark {
        complaint: ComplaintSummary,
        remark: Remark,
    },
    FeedbackReceived {
        complaint: ComplaintSummary,
        rating: u8,
        satisfied: bool,
    },
    SlaBreached(ComplaintSummary),
}

impl PushEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewComplaint(_) => "new_complaint",
            Self::ComplaintAssigned { .. } => "complaint_assigned",
            Self::ComplaintStatusUpdated { .. } => "complaint_status_updated",
            Self::NewRemark { .. } => "new_remark",
            Self::FeedbackReceived { .. } => "feedback_received",
            Self::SlaBreached(_) => "sla_breached",
        }
    }

    pub fn complaint(&self) -> &ComplaintSummary {
        match self {
            Self::NewComplaint(c) | Self::SlaBreached(c) => c,
            Self::ComplaintAssigned { complaint, .. }
            | Self::ComplaintStatusUpdated { complaint, .. }
            | Self::NewRemark { complaint, .. }
            | Self::FeedbackReceived { complaint, .. } => complaint,
        }
    }
}
