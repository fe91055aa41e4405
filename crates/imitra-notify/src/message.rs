//! Human-readable title and body for each event.

use imitra_core::PushEvent;

pub fn describe(event: &PushEvent) -> (String, String) {
    let c = event.complaint();
    let number = &c.complaint_number;
    match event {
        PushEvent::NewComplaint(_) => (
            "Complaint registered".into(),
            format!(
                "Your complaint {number} \"{}\" was registered and routed to {}.",
                c.title, c.department
            ),
        ),
        PushEvent::ComplaintAssigned { .. } => (
            "Complaint assigned".into(),
            format!("Complaint {number} has been assigned to a field officer."),
        ),
        PushEvent::ComplaintStatusUpdated { to, note, .. } => {
            let mut body = format!("Complaint {number} is now {to}.");
            if let Some(note) = note {
                body.push(' ');
                body.push_str(note);
            }
            ("Complaint status updated".into(), body)
        }
        PushEvent::NewRemark { remark, .. } => (
            "New remark".into(),
            format!("New remark on complaint {number}: {}", remark.text),
        ),
        PushEvent::FeedbackReceived {
            rating, satisfied, ..
        } => (
            "Feedback received".into(),
            format!(
                "Citizen rated complaint {number} {rating}/5 ({}).",
                if *satisfied { "satisfied" } else { "not satisfied" }
            ),
        ),
        PushEvent::SlaBreached(_) => (
            "SLA breached".into(),
            format!(
                "Complaint {number} ({} priority) passed its deadline {}.",
                c.priority,
                c.deadline.format("%Y-%m-%d %H:%M UTC")
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::tests::summary;
    use imitra_core::{Category, Status};

    #[test]
    fn status_message_includes_note() {
        let c = summary(Category::Roads);
        let (title, body) = describe(&PushEvent::ComplaintStatusUpdated {
            complaint: c.clone(),
            from: Status::InProgress,
            to: Status::Resolved,
            note: Some("Pothole filled.".into()),
        });
        assert_eq!(title, "Complaint status updated");
        assert_eq!(
            body,
            format!("Complaint {} is now resolved. Pothole filled.", c.complaint_number)
        );
    }
}
