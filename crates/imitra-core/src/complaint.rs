//! The complaint document and its lifecycle.
//!
//! Status changes go through [`Complaint::set_status`], which enforces the
//! fixed transition table and appends to the timeline. Feedback is the one
//! system-driven path outside that table.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::sla::{Sla, SlaPolicy};
use crate::taxonomy::{Category, Department, Priority, parse_variant};
use crate::user::{Actor, Role};
use crate::DomainError;

/// Escalation stops counting here.
pub const MAX_ESCALATION_LEVEL: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    New,
    Assigned,
    InProgress,
    Resolved,
    Closed,
    Rejected,
    Escalated,
}

impl Status {
    pub const ALL: [Status; 7] = [
        Self::New,
        Self::Assigned,
        Self::InProgress,
        Self::Resolved,
        Self::Closed,
        Self::Rejected,
        Self::Escalated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
            Self::Rejected => "rejected",
            Self::Escalated => "escalated",
        }
    }

    /// Statuses reachable from `self` by a manual update.
    pub fn allowed_next(&self) -> &'static [Status] {
        match self {
            Self::New => &[Self::Assigned, Self::Rejected],
            Self::Assigned => &[Self::InProgress, Self::Rejected],
            Self::InProgress => &[Self::Resolved, Self::Escalated],
            Self::Resolved => &[Self::Closed],
            Self::Rejected => &[Self::New, Self::Escalated],
            Self::Escalated => &[Self::Assigned, Self::InProgress, Self::Resolved],
            Self::Closed => &[],
        }
    }

    pub fn can_transition_to(&self, next: Status) -> bool {
        self.allowed_next().contains(&next)
    }

    /// Work is still expected on the complaint.
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Resolved | Self::Closed | Self::Rejected)
    }

    /// SLA is frozen at resolution time for these.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }
}

impl FromStr for Status {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(&Self::ALL, Self::as_str, "status", s)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    Ai,
    Keyword,
}

/// Routing decision for a complaint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    pub department: Department,
    pub priority: Priority,
    /// Always within [0, 1].
    pub confidence: f32,
    pub method: ClassificationMethod,
}

impl Classification {
    /// Build a classification, clamping confidence into [0, 1].
    /// Non-finite confidence becomes 0.
    pub fn new(
        category: Category,
        department: Department,
        priority: Priority,
        confidence: f32,
        method: ClassificationMethod,
    ) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            category,
            department,
            priority,
            confidence,
            method,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    pub zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ward: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl Location {
    fn validate(&self) -> Result<(), DomainError> {
        if self.address.trim().is_empty() {
            return Err(DomainError::validation("location address is required"));
        }
        if self.zone.trim().is_empty() {
            return Err(DomainError::validation("location zone is required"));
        }
        if let Some(lat) = self.latitude
            && !(-90.0..=90.0).contains(&lat)
        {
            return Err(DomainError::validation("latitude must be within [-90, 90]"));
        }
        if let Some(lng) = self.longitude
            && !(-180.0..=180.0).contains(&lng)
        {
            return Err(DomainError::validation("longitude must be within [-180, 180]"));
        }
        Ok(())
    }
}

/// Audit entry, one per creation and per status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub at: DateTime<Utc>,
    pub status: Status,
    pub actor_id: Uuid,
    pub actor_role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Remark {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_role: Role,
    pub text: String,
    /// Staff-only; hidden from citizens.
    #[serde(default)]
    pub internal: bool,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    pub stored_name: String,
    pub content_type: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub rating: u8,
    pub satisfied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub summary: String,
    pub resolved_by: Uuid,
    pub resolved_at: DateTime<Utc>,
}

/// Input for filing a complaint.
#[derive(Debug, Clone)]
pub struct NewComplaint {
    pub citizen_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: Location,
    pub attachments: Vec<Attachment>,
}

impl NewComplaint {
    /// Check the citizen-supplied fields. Cheap, so callers run it before
    /// classifying or storing uploads.
    pub fn validate(&self) -> Result<(), DomainError> {
        let title_len = self.title.trim().chars().count();
        if !(5..=200).contains(&title_len) {
            return Err(DomainError::validation("title must be 5-200 characters"));
        }
        let description_len = self.description.trim().chars().count();
        if !(10..=5000).contains(&description_len) {
            return Err(DomainError::validation(
                "description must be 10-5000 characters",
            ));
        }
        self.location.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complaint {
    pub id: Uuid,
    pub complaint_number: String,
    pub citizen_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: Location,
    pub classification: Classification,
    pub status: Status,
    #[serde(default)]
    pub escalation_level: u8,
    pub sla: Sla,
    #[serde(default)]
    pub assigned_officer: Option<Uuid>,
    #[serde(default)]
    pub assigned_mitra: Option<Uuid>,
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
    #[serde(default)]
    pub remarks: Vec<Remark>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub feedback: Option<Feedback>,
    #[serde(default)]
    pub resolution: Option<Resolution>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Write counter kept by the store; a write carrying an older value is
    /// rejected.
    #[serde(default)]
    pub version: u64,
}

/// `IMT-<year>-<6-digit sequence>`.
pub fn complaint_number(year: i32, sequence: u64) -> String {
    format!("IMT-{year}-{sequence:06}")
}

impl Complaint {
    /// File a new complaint with status `new` and a fresh SLA clock.
    pub fn new(
        input: NewComplaint,
        classification: Classification,
        policy: SlaPolicy,
        sequence: u64,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        input.validate()?;
        let title = input.title.trim().to_string();
        let description = input.description.trim().to_string();

        let sla = policy.start(classification.department, classification.priority, now);
        Ok(Self {
            id: Uuid::new_v4(),
            complaint_number: complaint_number(now.year(), sequence),
            citizen_id: input.citizen_id,
            title,
            description,
            location: input.location,
            classification,
            status: Status::New,
            escalation_level: 0,
            sla,
            assigned_officer: None,
            assigned_mitra: None,
            timeline: vec![TimelineEntry {
                at: now,
                status: Status::New,
                actor_id: input.citizen_id,
                actor_role: Role::Citizen,
                note: Some("complaint registered".to_string()),
            }],
            remarks: Vec::new(),
            attachments: input.attachments,
            feedback: None,
            resolution: None,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    /// Whether `actor` may see this complaint.
    pub fn visible_to(&self, actor: &Actor) -> bool {
        match actor.role {
            Role::Admin => true,
            Role::Citizen => self.citizen_id == actor.id,
            Role::Officer => actor.department == Some(self.classification.department),
            Role::Mitra => self.assigned_mitra == Some(actor.id),
        }
    }

    /// Whether `actor` may change status.
    pub fn can_update_status(&self, actor: &Actor) -> bool {
        match actor.role {
            Role::Admin => true,
            Role::Officer => actor.department == Some(self.classification.department),
            Role::Mitra => self.assigned_mitra == Some(actor.id),
            Role::Citizen => false,
        }
    }

    /// Apply a manual status change along the transition table.
    ///
    /// Moving to `resolved` requires a non-empty `note`, which becomes the
    /// resolution summary.
    pub fn set_status(
        &mut self,
        to: Status,
        actor: &Actor,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Status, DomainError> {
        let from = self.status;
        if !from.can_transition_to(to) {
            return Err(DomainError::InvalidTransition { from, to });
        }
        let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

        if to == Status::Resolved {
            let summary = note.clone().ok_or_else(|| {
                DomainError::validation("a resolution summary is required to resolve")
            })?;
            self.resolution = Some(Resolution {
                summary,
                resolved_by: actor.id,
                resolved_at: now,
            });
        }
        if to == Status::New {
            // Reopened after rejection.
            self.resolution = None;
        }
        if to == Status::Escalated {
            self.escalate();
        }

        self.record(to, actor, note, now);
        debug!(complaint = %self.complaint_number, %from, %to, "status changed");
        Ok(from)
    }

    /// Assign to a field agent. `new`/`escalated` complaints move to
    /// `assigned`; `assigned`/`in_progress` ones keep their status.
    pub fn assign(
        &mut self,
        mitra_id: Uuid,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let note = Some(format!("assigned to mitra {mitra_id}"));
        match self.status {
            Status::New | Status::Escalated => {
                self.assigned_mitra = Some(mitra_id);
                self.record(Status::Assigned, actor, note, now);
            }
            Status::Assigned | Status::InProgress => {
                self.assigned_mitra = Some(mitra_id);
                self.record(self.status, actor, note, now);
            }
            other => {
                return Err(DomainError::validation(format!(
                    "cannot assign a complaint in status {other}"
                )));
            }
        }
        if actor.role == Role::Officer {
            self.assigned_officer = Some(actor.id);
        }
        Ok(())
    }

    pub fn add_remark(
        &mut self,
        actor: &Actor,
        text: &str,
        internal: bool,
        now: DateTime<Utc>,
    ) -> Result<&Remark, DomainError> {
        let text = text.trim();
        if text.is_empty() || text.chars().count() > 1000 {
            return Err(DomainError::validation("remark must be 1-1000 characters"));
        }
        if internal && actor.role == Role::Citizen {
            return Err(DomainError::validation(
                "citizens cannot post internal remarks",
            ));
        }
        self.remarks.push(Remark {
            id: Uuid::new_v4(),
            author_id: actor.id,
            author_role: actor.role,
            text: text.to_string(),
            internal,
            at: now,
        });
        self.updated_at = now;
        self.refresh_sla(now);
        Ok(&self.remarks[self.remarks.len() - 1])
    }

    /// Record the citizen's verdict on a resolved complaint. One verdict is
    /// accepted per resolution.
    ///
    /// Satisfied closes it. Unsatisfied escalates it, bumps priority one level
    /// and restarts the SLA clock.
    pub fn submit_feedback(
        &mut self,
        actor: &Actor,
        rating: u8,
        satisfied: bool,
        comment: Option<String>,
        policy: SlaPolicy,
        now: DateTime<Utc>,
    ) -> Result<Status, DomainError> {
        if actor.role != Role::Citizen || actor.id != self.citizen_id {
            return Err(DomainError::validation(
                "only the citizen who filed the complaint can give feedback",
            ));
        }
        if self.status != Status::Resolved {
            return Err(DomainError::validation(
                "feedback is only accepted on resolved complaints",
            ));
        }
        let resolved_at = self.resolution.as_ref().map(|r| r.resolved_at);
        if let Some(previous) = &self.feedback
            && resolved_at.is_none_or(|at| previous.at >= at)
        {
            return Err(DomainError::validation("feedback already submitted"));
        }
        if !(1..=5).contains(&rating) {
            return Err(DomainError::validation("rating must be between 1 and 5"));
        }

        let comment = comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        self.feedback = Some(Feedback {
            rating,
            satisfied,
            comment,
            at: now,
        });

        if satisfied {
            self.record(Status::Closed, actor, Some("citizen satisfied".into()), now);
        } else {
            self.escalate();
            let priority = self.classification.priority.bump();
            self.classification.priority = priority;
            self.sla = policy.start(self.classification.department, priority, now);
            self.record(
                Status::Escalated,
                actor,
                Some(format!("citizen not satisfied, escalation level {}", self.escalation_level)),
                now,
            );
        }
        Ok(self.status)
    }

    /// Recompute SLA status; resolved complaints are evaluated at their
    /// resolution time. Returns true when the status changed.
    pub fn refresh_sla(&mut self, now: DateTime<Utc>) -> bool {
        let at = match (&self.resolution, self.status.is_resolved()) {
            (Some(r), true) => r.resolved_at,
            _ => now,
        };
        self.sla.refresh(at)
    }

    /// Copy suitable for `role`: citizens do not see internal remarks.
    pub fn view_for(&self, role: Role) -> Complaint {
        let mut view = self.clone();
        if role == Role::Citizen {
            view.remarks.retain(|r| !r.internal);
        }
        view
    }

    /// Hours from filing to resolution, if resolved.
    pub fn resolution_hours(&self) -> Option<f64> {
        self.resolution
            .as_ref()
            .map(|r| (r.resolved_at - self.created_at).num_minutes() as f64 / 60.0)
    }

    /// Raise the escalation level and drop the resolution that no longer
    /// holds.
    fn escalate(&mut self) {
        self.escalation_level = (self.escalation_level + 1).min(MAX_ESCALATION_LEVEL);
        self.resolution = None;
    }

    fn record(&mut self, status: Status, actor: &Actor, note: Option<String>, now: DateTime<Utc>) {
        self.status = status;
        self.timeline.push(TimelineEntry {
            at: now,
            status,
            actor_id: actor.id,
            actor_role: actor.role,
            note,
        });
        self.updated_at = now;
        self.refresh_sla(now);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    pub(crate) fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap()
    }

    pub(crate) fn sample(citizen: Uuid, category: Category, priority: Priority) -> Complaint {
        let input = NewComplaint {
            citizen_id: citizen,
            title: "Overflowing drain on MG Road".into(),
            description: "The drain near the bus stop has been overflowing for two days.".into(),
            location: Location {
                address: "MG Road bus stop".into(),
                zone: "Central".into(),
                ward: Some("12".into()),
                latitude: Some(12.97),
                longitude: Some(77.59),
            },
            attachments: Vec::new(),
        };
        let classification = Classification::new(
            category,
            category.department(),
            priority,
            0.8,
            ClassificationMethod::Keyword,
        );
        Complaint::new(input, classification, SlaPolicy::PriorityOnly, 42, t0()).unwrap()
    }

    fn officer(dept: Department) -> Actor {
        Actor::new(Uuid::new_v4(), Role::Officer, Some(dept))
    }

    #[test]
    fn new_complaint_starts_in_new_with_timeline() {
        let c = sample(Uuid::new_v4(), Category::Drainage, Priority::Medium);
        assert_eq!(c.status, Status::New);
        assert_eq!(c.complaint_number, "IMT-2026-000042");
        assert_eq!(c.timeline.len(), 1);
        assert_eq!(c.sla.deadline, t0() + Duration::hours(48));
    }

    #[test]
    fn transition_table_is_exact() {
        use Status::*;
        let expected: &[(Status, &[Status])] = &[
            (New, &[Assigned, Rejected]),
            (Assigned, &[InProgress, Rejected]),
            (InProgress, &[Resolved, Escalated]),
            (Resolved, &[Closed]),
            (Rejected, &[New, Escalated]),
            (Escalated, &[Assigned, InProgress, Resolved]),
            (Closed, &[]),
        ];
        for (from, allowed) in expected {
            for to in Status::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&to),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn new_to_resolved_is_rejected() {
        let mut c = sample(Uuid::new_v4(), Category::Roads, Priority::High);
        let err = c
            .set_status(Status::Resolved, &officer(Department::PublicWorks), Some("done".into()), t0())
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: Status::New,
                to: Status::Resolved
            }
        );
        assert_eq!(c.status, Status::New);
        assert_eq!(c.timeline.len(), 1);
    }

    #[test]
    fn resolving_requires_summary_and_freezes_sla() {
        let off = officer(Department::PublicWorks);
        let mut c = sample(Uuid::new_v4(), Category::Roads, Priority::Critical);
        c.set_status(Status::Assigned, &off, None, t0()).unwrap();
        c.set_status(Status::InProgress, &off, None, t0()).unwrap();

        let later = t0() + Duration::hours(2);
        assert!(c.set_status(Status::Resolved, &off, Some("  ".into()), later).is_err());
        c.set_status(Status::Resolved, &off, Some("pothole filled".into()), later)
            .unwrap();

        let resolution = c.resolution.as_ref().unwrap();
        assert_eq!(resolution.summary, "pothole filled");
        assert_eq!(resolution.resolved_by, off.id);

        // Long after the deadline the SLA still reflects resolution time.
        c.refresh_sla(t0() + Duration::days(10));
        assert_ne!(c.sla.status, crate::SlaStatus::Breached);
        assert_eq!(c.resolution_hours(), Some(2.0));
    }

    #[test]
    fn visibility_by_role() {
        let owner = Uuid::new_v4();
        let mut c = sample(owner, Category::WaterSupply, Priority::Low);
        let mitra = Actor::new(Uuid::new_v4(), Role::Mitra, Some(Department::WaterSupply));

        assert!(c.visible_to(&Actor::new(owner, Role::Citizen, None)));
        assert!(!c.visible_to(&Actor::new(Uuid::new_v4(), Role::Citizen, None)));
        assert!(c.visible_to(&officer(Department::WaterSupply)));
        assert!(!c.visible_to(&officer(Department::Electricity)));
        assert!(!c.visible_to(&mitra));
        assert!(c.visible_to(&Actor::new(Uuid::new_v4(), Role::Admin, None)));

        c.assign(mitra.id, &officer(Department::WaterSupply), t0()).unwrap();
        assert!(c.visible_to(&mitra));
        assert!(c.can_update_status(&mitra));
    }

    #[test]
    fn assign_moves_new_to_assigned_and_keeps_in_progress() {
        let off = officer(Department::Sanitation);
        let mut c = sample(Uuid::new_v4(), Category::Sanitation, Priority::Medium);
        let first = Uuid::new_v4();
        c.assign(first, &off, t0()).unwrap();
        assert_eq!(c.status, Status::Assigned);
        assert_eq!(c.assigned_officer, Some(off.id));

        c.set_status(Status::InProgress, &off, None, t0()).unwrap();
        let second = Uuid::new_v4();
        c.assign(second, &off, t0()).unwrap();
        assert_eq!(c.status, Status::InProgress);
        assert_eq!(c.assigned_mitra, Some(second));
    }

    #[test]
    fn cannot_assign_closed_complaint() {
        let off = officer(Department::Sanitation);
        let mut c = sample(Uuid::new_v4(), Category::Sanitation, Priority::Medium);
        c.set_status(Status::Rejected, &off, Some("duplicate".into()), t0()).unwrap();
        assert!(c.assign(Uuid::new_v4(), &off, t0()).is_err());
    }

    fn resolved(owner: Uuid) -> Complaint {
        let off = officer(Department::Electricity);
        let mut c = sample(owner, Category::StreetLighting, Priority::Medium);
        c.set_status(Status::Assigned, &off, None, t0()).unwrap();
        c.set_status(Status::InProgress, &off, None, t0()).unwrap();
        c.set_status(Status::Resolved, &off, Some("lamp replaced".into()), t0())
            .unwrap();
        c
    }

    #[test]
    fn satisfied_feedback_closes() {
        let owner = Uuid::new_v4();
        let mut c = resolved(owner);
        let citizen = Actor::new(owner, Role::Citizen, None);
        let status = c
            .submit_feedback(&citizen, 5, true, None, SlaPolicy::PriorityOnly, t0())
            .unwrap();
        assert_eq!(status, Status::Closed);
        assert_eq!(c.escalation_level, 0);
    }

    #[test]
    fn unsatisfied_feedback_escalates_and_bumps_priority() {
        let owner = Uuid::new_v4();
        let mut c = resolved(owner);
        let citizen = Actor::new(owner, Role::Citizen, None);
        let later = t0() + Duration::hours(5);
        let status = c
            .submit_feedback(&citizen, 1, false, Some("still dark".into()), SlaPolicy::PriorityOnly, later)
            .unwrap();
        assert_eq!(status, Status::Escalated);
        assert_eq!(c.escalation_level, 1);
        assert_eq!(c.classification.priority, Priority::High);
        assert_eq!(c.sla.deadline, later + Duration::hours(24));

        // Only once.
        assert!(
            c.submit_feedback(&citizen, 1, false, None, SlaPolicy::PriorityOnly, later)
                .is_err()
        );
    }

    #[test]
    fn feedback_rejected_from_other_citizen_or_unresolved() {
        let owner = Uuid::new_v4();
        let mut c = resolved(owner);
        let stranger = Actor::new(Uuid::new_v4(), Role::Citizen, None);
        assert!(
            c.submit_feedback(&stranger, 4, true, None, SlaPolicy::PriorityOnly, t0())
                .is_err()
        );

        let mut open = sample(owner, Category::Roads, Priority::Low);
        let citizen = Actor::new(owner, Role::Citizen, None);
        assert!(
            open.submit_feedback(&citizen, 4, true, None, SlaPolicy::PriorityOnly, t0())
                .is_err()
        );
    }

    #[test]
    fn escalation_level_caps() {
        let owner = Uuid::new_v4();
        let mut c = resolved(owner);
        c.escalation_level = MAX_ESCALATION_LEVEL;
        let citizen = Actor::new(owner, Role::Citizen, None);
        c.submit_feedback(&citizen, 2, false, None, SlaPolicy::PriorityOnly, t0())
            .unwrap();
        assert_eq!(c.escalation_level, MAX_ESCALATION_LEVEL);
    }

    #[test]
    fn repeated_unsatisfied_feedback_climbs_to_cap() {
        let owner = Uuid::new_v4();
        let off = officer(Department::Electricity);
        let citizen = Actor::new(owner, Role::Citizen, None);
        let mut c = resolved(owner);

        for round in 0..4 {
            let heard = t0() + Duration::hours(2 * round + 1);
            c.submit_feedback(&citizen, 1, false, None, SlaPolicy::PriorityOnly, heard)
                .unwrap();
            assert_eq!(c.status, Status::Escalated);
            assert!(c.resolution.is_none());
            assert_eq!(c.resolution_hours(), None);

            let fixed = heard + Duration::hours(1);
            c.set_status(Status::Resolved, &off, Some("rewired the pole".into()), fixed)
                .unwrap();
            assert_eq!(c.resolution.as_ref().unwrap().resolved_at, fixed);
        }
        assert_eq!(c.escalation_level, MAX_ESCALATION_LEVEL);

        // The latest resolution still takes a verdict.
        let last = t0() + Duration::hours(20);
        c.submit_feedback(&citizen, 4, true, None, SlaPolicy::PriorityOnly, last)
            .unwrap();
        assert_eq!(c.status, Status::Closed);
        assert_eq!(c.feedback.as_ref().unwrap().rating, 4);
    }

    #[test]
    fn manual_escalation_raises_level() {
        let off = officer(Department::PublicWorks);
        let mut c = sample(Uuid::new_v4(), Category::Roads, Priority::Medium);
        c.set_status(Status::Assigned, &off, None, t0()).unwrap();
        c.set_status(Status::InProgress, &off, None, t0()).unwrap();
        c.set_status(Status::Escalated, &off, Some("needs a crane".into()), t0())
            .unwrap();
        assert_eq!(c.escalation_level, 1);
    }

    #[test]
    fn remark_refreshes_sla() {
        let mut c = sample(Uuid::new_v4(), Category::Roads, Priority::Medium);
        let off = officer(Department::PublicWorks);
        c.add_remark(&off, "still waiting on material", false, t0() + Duration::days(5))
            .unwrap();
        assert_eq!(c.sla.status, crate::SlaStatus::Breached);
    }

    #[test]
    fn validation_runs_without_classifying() {
        let c = sample(Uuid::new_v4(), Category::Roads, Priority::Low);
        let mut input = NewComplaint {
            citizen_id: c.citizen_id,
            title: "Hi".into(),
            description: c.description.clone(),
            location: c.location.clone(),
            attachments: Vec::new(),
        };
        assert!(input.validate().is_err());
        input.title = c.title.clone();
        assert!(input.validate().is_ok());
    }

    #[test]
    fn internal_remarks_hidden_from_citizens() {
        let owner = Uuid::new_v4();
        let mut c = sample(owner, Category::Parks, Priority::Low);
        let off = officer(Department::Horticulture);
        let citizen = Actor::new(owner, Role::Citizen, None);

        c.add_remark(&off, "check with contractor", true, t0()).unwrap();
        c.add_remark(&off, "team visiting tomorrow", false, t0()).unwrap();
        assert!(c.add_remark(&citizen, "sneaky", true, t0()).is_err());

        assert_eq!(c.view_for(Role::Citizen).remarks.len(), 1);
        assert_eq!(c.view_for(Role::Officer).remarks.len(), 2);
    }

    #[test]
    fn rejects_short_title_and_bad_coordinates() {
        let mut c = sample(Uuid::new_v4(), Category::Roads, Priority::Low);
        let classification = c.classification.clone();
        let mut input = NewComplaint {
            citizen_id: c.citizen_id,
            title: "Hi".into(),
            description: c.description.clone(),
            location: c.location.clone(),
            attachments: Vec::new(),
        };
        assert!(
            Complaint::new(input.clone(), classification.clone(), SlaPolicy::PriorityOnly, 1, t0())
                .is_err()
        );

        input.title = c.title.clone();
        c.location.latitude = Some(123.0);
        input.location = c.location.clone();
        assert!(Complaint::new(input, classification, SlaPolicy::PriorityOnly, 1, t0()).is_err());
    }

    #[test]
    fn classification_confidence_is_clamped() {
        let make = |conf| {
            Classification::new(
                Category::Other,
                Department::GeneralAdministration,
                Priority::Low,
                conf,
                ClassificationMethod::Ai,
            )
            .confidence
        };
        assert_eq!(make(1.7), 1.0);
        assert_eq!(make(-0.2), 0.0);
        assert_eq!(make(f32::NAN), 0.0);
        assert_eq!(make(0.42), 0.42);
    }
}
