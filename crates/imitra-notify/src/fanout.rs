//! Who hears about each event.

use imitra_core::{PushEvent, Role, Room};
use uuid::Uuid;

/// Audience for one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delivery {
    /// Live push rooms.
    pub rooms: Vec<Room>,
    /// Users who get a stored in-app notification.
    pub in_app: Vec<Uuid>,
    /// Users who also get email and SMS.
    pub outbound: Vec<Uuid>,
}

pub fn fan_out(event: &PushEvent) -> Delivery {
    let c = event.complaint();
    let department = Room::Department(c.department);
    let admins = Room::Role(Role::Admin);

    match event {
        PushEvent::NewComplaint(_) => Delivery {
            rooms: vec![department, admins],
            in_app: vec![c.citizen_id],
            outbound: vec![c.citizen_id],
        },
        PushEvent::ComplaintAssigned { mitra_id, .. } => Delivery {
            rooms: vec![Room::User(*mitra_id), Room::User(c.citizen_id)],
            in_app: vec![*mitra_id, c.citizen_id],
            outbound: Vec::new(),
        },
        PushEvent::ComplaintStatusUpdated { .. } => Delivery {
            rooms: vec![Room::User(c.citizen_id), department],
            in_app: vec![c.citizen_id],
            outbound: vec![c.citizen_id],
        },
        PushEvent::NewRemark { remark, .. } => {
            let mut users = Vec::new();
            if !remark.internal {
                users.push(c.citizen_id);
            }
            users.extend(c.assigned_officer);
            users.extend(c.assigned_mitra);
            users.retain(|u| *u != remark.author_id);
            users.dedup();
            Delivery {
                rooms: users.iter().copied().map(Room::User).collect(),
                in_app: users,
                outbound: Vec::new(),
            }
        }
        PushEvent::FeedbackReceived { .. } | PushEvent::SlaBreached(_) => Delivery {
            rooms: vec![department, admins],
            in_app: Vec::new(),
            outbound: Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::tests::summary;
    use chrono::Utc;
    use imitra_core::{Category, Department, Remark, Status};

    fn remark(author: Uuid, internal: bool) -> Remark {
        Remark {
            id: Uuid::new_v4(),
            author_id: author,
            author_role: Role::Officer,
            text: "crew dispatched".into(),
            internal,
            at: Utc::now(),
        }
    }

    #[test]
    fn new_complaint_goes_to_department_and_admins() {
        let c = summary(Category::WaterSupply);
        let d = fan_out(&PushEvent::NewComplaint(c.clone()));
        assert_eq!(
            d.rooms,
            vec![Room::Department(Department::WaterSupply), Room::Role(Role::Admin)]
        );
        assert_eq!(d.in_app, vec![c.citizen_id]);
        assert_eq!(d.outbound, vec![c.citizen_id]);
    }

    #[test]
    fn assignment_reaches_mitra_and_citizen() {
        let c = summary(Category::Roads);
        let mitra = Uuid::new_v4();
        let d = fan_out(&PushEvent::ComplaintAssigned {
            complaint: c.clone(),
            mitra_id: mitra,
        });
        assert!(d.rooms.contains(&Room::User(mitra)));
        assert!(d.rooms.contains(&Room::User(c.citizen_id)));
        assert!(d.outbound.is_empty());
    }

    #[test]
    fn status_update_emails_citizen() {
        let c = summary(Category::Roads);
        let d = fan_out(&PushEvent::ComplaintStatusUpdated {
            complaint: c.clone(),
            from: Status::New,
            to: Status::Assigned,
            note: None,
        });
        assert_eq!(d.outbound, vec![c.citizen_id]);
        assert!(d.rooms.contains(&Room::Department(Department::PublicWorks)));
    }

    #[test]
    fn internal_remark_skips_citizen_and_author() {
        let mut c = summary(Category::Parks);
        let officer = Uuid::new_v4();
        let mitra = Uuid::new_v4();
        c.assigned_officer = Some(officer);
        c.assigned_mitra = Some(mitra);

        let d = fan_out(&PushEvent::NewRemark {
            complaint: c.clone(),
            remark: remark(officer, true),
        });
        assert_eq!(d.in_app, vec![mitra]);

        let d = fan_out(&PushEvent::NewRemark {
            complaint: c.clone(),
            remark: remark(officer, false),
        });
        assert_eq!(d.in_app, vec![c.citizen_id, mitra]);
    }

    #[test]
    fn breaches_are_room_only() {
        let c = summary(Category::FireSafety);
        let d = fan_out(&PushEvent::SlaBreached(c));
        assert_eq!(
            d.rooms,
            vec![Room::Department(Department::FireAndEmergency), Room::Role(Role::Admin)]
        );
        assert!(d.in_app.is_empty());
    }
}
