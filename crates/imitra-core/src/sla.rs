//! Service-level targets for complaint resolution.
//!
//! Priority (and, under the matrix policy, department) determines an
//! allowance in hours; urgent departments get half of it. The deadline is the
//! start time plus the allowance, and the status is derived from the time
//! remaining.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::taxonomy::{Department, Priority, parse_variant};
use crate::DomainError;

/// A running SLA enters `warning` once 1/WARNING_DIVISOR of its allowance remains.
const WARNING_DIVISOR: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaStatus {
    Safe,
    Warning,
    Breached,
}

impl SlaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Warning => "warning",
            Self::Breached => "breached",
        }
    }
}

impl fmt::Display for SlaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How allowances are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaPolicy {
    /// critical 4h, high 24h, medium 48h, low 72h.
    #[default]
    PriorityOnly,
    /// Department × priority table.
    DepartmentMatrix,
}

impl SlaPolicy {
    pub const ALL: [SlaPolicy; 2] = [Self::PriorityOnly, Self::DepartmentMatrix];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PriorityOnly => "priority_only",
            Self::DepartmentMatrix => "department_matrix",
        }
    }

    /// Allowance in hours, after the urgent-department adjustment.
    pub fn allotted_hours(&self, department: Department, priority: Priority) -> i64 {
        let base = match self {
            Self::PriorityOnly => priority_hours(priority),
            Self::DepartmentMatrix => matrix_hours(department, priority),
        };
        if department.is_urgent() {
            (base / 2).max(1)
        } else {
            base
        }
    }

    /// Start a new SLA clock at `from`.
    pub fn start(&self, department: Department, priority: Priority, from: DateTime<Utc>) -> Sla {
        let allotted_hours = self.allotted_hours(department, priority);
        let deadline = from + Duration::hours(allotted_hours);
        Sla {
            allotted_hours,
            deadline,
            status: evaluate(deadline, allotted_hours, from),
            breach_notified: false,
        }
    }
}

impl FromStr for SlaPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(&Self::ALL, Self::as_str, "sla policy", s)
    }
}

impl fmt::Display for SlaPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn priority_hours(priority: Priority) -> i64 {
    match priority {
        Priority::Critical => 4,
        Priority::High => 24,
        Priority::Medium => 48,
        Priority::Low => 72,
    }
}

fn matrix_hours(department: Department, priority: Priority) -> i64 {
    // [critical, high, medium, low]
    let row: [i64; 4] = match department {
        Department::PublicWorks => [8, 48, 96, 168],
        Department::WaterSupply => [4, 24, 48, 96],
        Department::Electricity => [4, 12, 48, 72],
        Department::Sanitation => [12, 24, 48, 72],
        Department::FireAndEmergency => [2, 6, 12, 24],
        Department::Health => [4, 12, 24, 48],
        Department::Horticulture => [24, 72, 120, 168],
        Department::GeneralAdministration => [24, 48, 72, 120],
    };
    match priority {
        Priority::Critical => row[0],
        Priority::High => row[1],
        Priority::Medium => row[2],
        Priority::Low => row[3],
    }
}

/// SLA sub-document stored on each complaint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sla {
    pub allotted_hours: i64,
    pub deadline: DateTime<Utc>,
    pub status: SlaStatus,
    /// Set once the breach has been announced.
    #[serde(default)]
    pub breach_notified: bool,
}

impl Sla {
    /// Time left until the deadline; negative once breached.
    pub fn remaining(&self, at: DateTime<Utc>) -> Duration {
        self.deadline - at
    }

    /// Recompute the status at `at`. Returns true when it changed.
    pub fn refresh(&mut self, at: DateTime<Utc>) -> bool {
        let status = evaluate(self.deadline, self.allotted_hours, at);
        let changed = status != self.status;
        self.status = status;
        changed
    }
}

/// Status for a deadline with the given allowance, observed at `at`.
pub fn evaluate(deadline: DateTime<Utc>, allotted_hours: i64, at: DateTime<Utc>) -> SlaStatus {
    let remaining = deadline - at;
    if remaining <= Duration::zero() {
        SlaStatus::Breached
    } else if remaining * WARNING_DIVISOR <= Duration::hours(allotted_hours) {
        SlaStatus::Warning
    } else {
        SlaStatus::Safe
    }
}
