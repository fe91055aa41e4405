//! Aggregate dashboards computed over a set of complaints.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::complaint::{Complaint, Status};
use crate::sla::SlaStatus;
use crate::taxonomy::{Category, Department, Priority};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlaCounts {
    pub safe: usize,
    pub warning: usize,
    pub breached: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub total: usize,
    pub open: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub by_department: BTreeMap<String, usize>,
    /// Open complaints only.
    pub sla: SlaCounts,
    pub avg_resolution_hours: Option<f64>,
    pub satisfaction_rate: Option<f64>,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentStats {
    pub department: Department,
    pub total: usize,
    pub open: usize,
    pub resolved: usize,
    pub breached: usize,
    pub avg_resolution_hours: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub created: usize,
    pub resolved: usize,
}

fn zeroed(names: impl Iterator<Item = &'static str>) -> BTreeMap<String, usize> {
    names.map(|n| (n.to_string(), 0)).collect()
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// SLA status as of `now`, without mutating the stored document.
fn current_sla(complaint: &Complaint, now: DateTime<Utc>) -> SlaStatus {
    let mut c = complaint.sla.clone();
    let at = match (&complaint.resolution, complaint.status.is_resolved()) {
        (Some(r), true) => r.resolved_at,
        _ => now,
    };
    c.refresh(at);
    c.status
}

pub fn overview(complaints: &[Complaint], now: DateTime<Utc>) -> Overview {
    let mut by_status = zeroed(Status::ALL.iter().map(|s| s.as_str()));
    let mut by_priority = zeroed(Priority::ALL.iter().map(|p| p.as_str()));
    let mut by_category = zeroed(Category::ALL.iter().map(|c| c.as_str()));
    let mut by_department = zeroed(Department::ALL.iter().map(|d| d.as_str()));
    let mut sla = SlaCounts::default();
    let mut open = 0;

    for c in complaints {
        *by_status.entry(c.status.as_str().to_string()).or_default() += 1;
        *by_priority
            .entry(c.classification.priority.as_str().to_string())
            .or_default() += 1;
        *by_category
            .entry(c.classification.category.as_str().to_string())
            .or_default() += 1;
        *by_department
            .entry(c.classification.department.as_str().to_string())
            .or_default() += 1;

        if c.status.is_open() {
            open += 1;
            match current_sla(c, now) {
                SlaStatus::Safe => sla.safe += 1,
                SlaStatus::Warning => sla.warning += 1,
                SlaStatus::Breached => sla.breached += 1,
            }
        }
    }

    let feedbacks: Vec<_> = complaints.iter().filter_map(|c| c.feedback.as_ref()).collect();
    let satisfaction_rate = (!feedbacks.is_empty()).then(|| {
        feedbacks.iter().filter(|f| f.satisfied).count() as f64 / feedbacks.len() as f64
    });

    Overview {
        total: complaints.len(),
        open,
        by_status,
        by_priority,
        by_category,
        by_department,
        sla,
        avg_resolution_hours: mean(complaints.iter().filter_map(Complaint::resolution_hours)),
        satisfaction_rate,
        average_rating: mean(feedbacks.iter().map(|f| f.rating as f64)),
    }
}

/// One row per department, in table order, including empty departments.
pub fn department_stats(complaints: &[Complaint], now: DateTime<Utc>) -> Vec<DepartmentStats> {
    Department::ALL
        .iter()
        .map(|&department| {
            let mine: Vec<&Complaint> = complaints
                .iter()
                .filter(|c| c.classification.department == department)
                .collect();
            DepartmentStats {
                department,
                total: mine.len(),
                open: mine.iter().filter(|c| c.status.is_open()).count(),
                resolved: mine.iter().filter(|c| c.status.is_resolved()).count(),
                breached: mine
                    .iter()
                    .filter(|c| current_sla(c, now) == SlaStatus::Breached)
                    .count(),
                avg_resolution_hours: mean(mine.iter().filter_map(|c| c.resolution_hours())),
            }
        })
        .collect()
}

/// Daily created/resolved counts for the last `days` days, oldest first,
/// ending with today.
pub fn trends(complaints: &[Complaint], days: u32, now: DateTime<Utc>) -> Vec<TrendPoint> {
    let today = now.date_naive();
    let days = days.max(1) as i64;
    let first = today - Duration::days(days - 1);

    let mut points: Vec<TrendPoint> = (0..days)
        .map(|offset| TrendPoint {
            date: first + Duration::days(offset),
            created: 0,
            resolved: 0,
        })
        .collect();

    let slot = |date: NaiveDate| -> Option<usize> {
        if date < first || date > today {
            None
        } else {
            Some((date - first).num_days() as usize)
        }
    };

    for c in complaints {
        if let Some(i) = slot(c.created_at.date_naive()) {
            points[i].created += 1;
        }
        if let Some(r) = &c.resolution
            && let Some(i) = slot(r.resolved_at.date_naive())
        {
            points[i].resolved += 1;
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complaint::tests::{sample, t0};
    use crate::sla::SlaPolicy;
    use crate::user::{Actor, Role};
    use uuid::Uuid;

    fn resolve(c: &mut Complaint, at: DateTime<Utc>) {
        let admin = Actor::new(Uuid::new_v4(), Role::Admin, None);
        c.set_status(Status::Assigned, &admin, None, at).unwrap();
        c.set_status(Status::InProgress, &admin, None, at).unwrap();
        c.set_status(Status::Resolved, &admin, Some("fixed".into()), at).unwrap();
    }

    #[test]
    fn overview_counts_and_rates() {
        let owner = Uuid::new_v4();
        let mut a = sample(owner, Category::Roads, Priority::Critical);
        let b = sample(owner, Category::WaterSupply, Priority::Low);
        let mut c = sample(owner, Category::Roads, Priority::Medium);
        resolve(&mut c, t0() + Duration::hours(6));
        let citizen = Actor::new(owner, Role::Citizen, None);
        c.submit_feedback(&citizen, 4, true, None, SlaPolicy::PriorityOnly, t0())
            .unwrap();
        a.refresh_sla(t0());

        // 10 hours in: the critical (4h) complaint is breached, the low one is safe.
        let o = overview(&[a, b, c], t0() + Duration::hours(10));
        assert_eq!(o.total, 3);
        assert_eq!(o.open, 2);
        assert_eq!(o.by_category["roads"], 2);
        assert_eq!(o.by_status["closed"], 1);
        assert_eq!(o.by_status["rejected"], 0);
        assert_eq!(o.sla.breached, 1);
        assert_eq!(o.sla.safe, 1);
        assert_eq!(o.avg_resolution_hours, Some(6.0));
        assert_eq!(o.satisfaction_rate, Some(1.0));
        assert_eq!(o.average_rating, Some(4.0));
    }

    #[test]
    fn overview_of_nothing() {
        let o = overview(&[], t0());
        assert_eq!(o.total, 0);
        assert!(o.avg_resolution_hours.is_none());
        assert!(o.satisfaction_rate.is_none());
        assert_eq!(o.by_department.len(), Department::ALL.len());
    }

    #[test]
    fn department_rows_cover_every_department() {
        let c = sample(Uuid::new_v4(), Category::FireSafety, Priority::High);
        let rows = department_stats(&[c], t0());
        assert_eq!(rows.len(), Department::ALL.len());
        let fire = rows
            .iter()
            .find(|r| r.department == Department::FireAndEmergency)
            .unwrap();
        assert_eq!(fire.total, 1);
        assert_eq!(fire.open, 1);
        assert_eq!(fire.resolved, 0);
    }

    #[test]
    fn trends_bucket_by_day() {
        let mut c = sample(Uuid::new_v4(), Category::Parks, Priority::Low);
        resolve(&mut c, t0() + Duration::days(2));
        let points = trends(&[c], 7, t0() + Duration::days(3));
        assert_eq!(points.len(), 7);
        assert_eq!(points.last().unwrap().date, (t0() + Duration::days(3)).date_naive());
        assert_eq!(points.iter().map(|p| p.created).sum::<usize>(), 1);
        assert_eq!(points[3].created, 1);
        assert_eq!(points[5].resolved, 1);
    }
}
