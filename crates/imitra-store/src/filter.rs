//! Query filters shared by every backend.

use imitra_core::{Actor, Category, Complaint, Department, Priority, Role, Status, User};
use uuid::Uuid;

/// Complaint selection. Every `Some` field must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplaintFilter {
    pub citizen_id: Option<Uuid>,
    pub department: Option<Department>,
    pub assigned_mitra: Option<Uuid>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    /// Drop resolved, closed and rejected complaints.
    pub open_only: bool,
}

impl ComplaintFilter {
    /// Restrict to what `actor` is allowed to see.
    pub fn visible_to(actor: &Actor) -> Self {
        let mut filter = Self::default();
        match actor.role {
            Role::Citizen => filter.citizen_id = Some(actor.id),
            // An officer without a department sees nothing.
            Role::Officer => {
                filter.department = actor.department;
                if actor.department.is_none() {
                    filter.citizen_id = Some(Uuid::nil());
                }
            }
            Role::Mitra => filter.assigned_mitra = Some(actor.id),
            Role::Admin => {}
        }
        filter
    }

    pub fn open() -> Self {
        Self {
            open_only: true,
            ..Self::default()
        }
    }

    pub fn matches(&self, c: &Complaint) -> bool {
        self.citizen_id.is_none_or(|id| c.citizen_id == id)
            && self
                .department
                .is_none_or(|d| c.classification.department == d)
            && self
                .assigned_mitra
                .is_none_or(|id| c.assigned_mitra == Some(id))
            && self.status.is_none_or(|s| c.status == s)
            && self
                .priority
                .is_none_or(|p| c.classification.priority == p)
            && self
                .category
                .is_none_or(|cat| c.classification.category == cat)
            && (!self.open_only || c.status.is_open())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub department: Option<Department>,
    pub active: Option<bool>,
}

impl UserFilter {
    pub fn matches(&self, u: &User) -> bool {
        self.role.is_none_or(|r| u.role == r)
            && self.department.is_none_or(|d| u.department == Some(d))
            && self.active.is_none_or(|a| u.is_active == a)
    }
}
