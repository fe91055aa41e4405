//! Complaint operations with their side effects: persistence, live push,
//! in-app notifications and outbound messages.
//!
//! Notification delivery never fails the operation that triggered it.

use chrono::{Datelike, Utc};
use imitra_core::{
    Actor, Complaint, ComplaintSummary, NewComplaint, Notification, PushEvent, Role, Status,
};
use imitra_notify::{fan_out, message};
use imitra_store::StoreError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use crate::upload::{self, PendingFile};

/// Attempts at a read-modify-write before a concurrent writer wins.
const WRITE_ATTEMPTS: usize = 3;

/// Load a complaint the actor may see.
pub async fn load_visible(state: &AppState, actor: &Actor, id: Uuid) -> Result<Complaint, ApiError> {
    let complaint = state.store.get_complaint(id).await?;
    ensure_visible(&complaint, actor)?;
    Ok(complaint)
}

fn ensure_visible(complaint: &Complaint, actor: &Actor) -> Result<(), ApiError> {
    if complaint.visible_to(actor) {
        Ok(())
    } else {
        Err(ApiError::forbidden("you do not have access to this complaint"))
    }
}

/// Read the complaint, apply `change` and write it back. When another writer
/// got there first the change is re-applied to the fresh copy.
pub async fn modify<T>(
    state: &AppState,
    id: Uuid,
    mut change: impl FnMut(&mut Complaint) -> Result<T, ApiError>,
) -> Result<(Complaint, T), ApiError> {
    let mut attempt = 1;
    loop {
        let mut complaint = state.store.get_complaint(id).await?;
        let out = change(&mut complaint)?;
        match state.store.update_complaint(&complaint).await {
            Ok(()) => {
                complaint.version += 1;
                return Ok((complaint, out));
            }
            Err(StoreError::Conflict { .. }) if attempt < WRITE_ATTEMPTS => {
                debug!(complaint = %id, attempt, "concurrent write, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Validate, classify, store uploads and persist a new complaint. Uploads
/// are removed again if anything after storing them fails.
pub async fn file_complaint(
    state: &AppState,
    mut input: NewComplaint,
    files: Vec<PendingFile>,
) -> Result<Complaint, ApiError> {
    input.validate()?;
    let classification = state
        .classifier
        .classify(&input.title, &input.description)
        .await;

    let upload_dir = &state.config.upload_dir;
    input.attachments = upload::save_files(upload_dir, files).await?;
    let stored = input.attachments.clone();

    let now = Utc::now();
    let filed = async {
        let sequence = state.store.next_complaint_sequence(now.year()).await?;
        let complaint =
            Complaint::new(input, classification, state.config.sla_policy, sequence, now)?;
        state.store.insert_complaint(&complaint).await?;
        Ok::<_, ApiError>(complaint)
    }
    .await;
    let complaint = match filed {
        Ok(c) => c,
        Err(e) => {
            upload::remove_files(upload_dir, &stored).await;
            return Err(e);
        }
    };

    info!(
        complaint = %complaint.complaint_number,
        category = %complaint.classification.category,
        department = %complaint.classification.department,
        priority = %complaint.classification.priority,
        "complaint filed"
    );
    publish(state, PushEvent::NewComplaint(ComplaintSummary::from(&complaint))).await;
    Ok(complaint)
}

pub async fn change_status(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    to: Status,
    note: Option<String>,
) -> Result<Complaint, ApiError> {
    let (complaint, from) = modify(state, id, |complaint| {
        ensure_visible(complaint, actor)?;
        if !complaint.can_update_status(actor) {
            return Err(ApiError::forbidden("you cannot update this complaint"));
        }
        Ok(complaint.set_status(to, actor, note.clone(), Utc::now())?)
    })
    .await?;

    info!(complaint = %complaint.complaint_number, %from, %to, actor = %actor.id, "status updated");
    let note = complaint.timeline.last().and_then(|t| t.note.clone());
    publish(
        state,
        PushEvent::ComplaintStatusUpdated {
            complaint: ComplaintSummary::from(&complaint),
            from,
            to,
            note,
        },
    )
    .await;
    Ok(complaint)
}

pub async fn assign(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    mitra_id: Uuid,
) -> Result<Complaint, ApiError> {
    if !matches!(actor.role, Role::Officer | Role::Admin) {
        return Err(ApiError::forbidden("only officers and admins can assign"));
    }
    load_visible(state, actor, id).await?;

    let mitra = state.store.get_user(mitra_id).await?;
    if mitra.role != Role::Mitra {
        return Err(ApiError::bad_request("assignee must be a mitra"));
    }
    if !mitra.is_active {
        return Err(ApiError::bad_request("assignee is deactivated"));
    }

    let (complaint, ()) = modify(state, id, |complaint| {
        ensure_visible(complaint, actor)?;
        if mitra.department != Some(complaint.classification.department) {
            return Err(ApiError::bad_request(
                "assignee does not belong to the complaint's department",
            ));
        }
        Ok(complaint.assign(mitra_id, actor, Utc::now())?)
    })
    .await?;

    info!(complaint = %complaint.complaint_number, mitra = %mitra_id, "complaint assigned");
    publish(
        state,
        PushEvent::ComplaintAssigned {
            complaint: ComplaintSummary::from(&complaint),
            mitra_id,
        },
    )
    .await;
    Ok(complaint)
}

pub async fn add_remark(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    text: &str,
    internal: bool,
) -> Result<Complaint, ApiError> {
    let (complaint, remark) = modify(state, id, |complaint| {
        ensure_visible(complaint, actor)?;
        Ok(complaint.add_remark(actor, text, internal, Utc::now())?.clone())
    })
    .await?;

    publish(
        state,
        PushEvent::NewRemark {
            complaint: ComplaintSummary::from(&complaint),
            remark,
        },
    )
    .await;
    Ok(complaint)
}

pub async fn submit_feedback(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    rating: u8,
    satisfied: bool,
    comment: Option<String>,
) -> Result<Complaint, ApiError> {
    let (complaint, status) = modify(state, id, |complaint| {
        if actor.role != Role::Citizen || complaint.citizen_id != actor.id {
            return Err(ApiError::forbidden(
                "only the citizen who filed the complaint can give feedback",
            ));
        }
        Ok(complaint.submit_feedback(
            actor,
            rating,
            satisfied,
            comment.clone(),
            state.config.sla_policy,
            Utc::now(),
        )?)
    })
    .await?;

    info!(complaint = %complaint.complaint_number, rating, satisfied, %status, "feedback received");
    publish(
        state,
        PushEvent::FeedbackReceived {
            complaint: ComplaintSummary::from(&complaint),
            rating,
            satisfied,
        },
    )
    .await;
    Ok(complaint)
}

/// Push, store in-app notifications and send outbound messages for `event`.
pub async fn publish(state: &AppState, event: PushEvent) {
    let delivery = fan_out(&event);
    let (title, body) = message::describe(&event);
    let complaint_id = event.complaint().id;
    let now = Utc::now();

    for user_id in &delivery.in_app {
        let n = Notification::new(*user_id, event.name(), &title, &body, Some(complaint_id), now);
        if let Err(e) = state.store.insert_notification(&n).await {
            warn!(error = %e, user = %user_id, event = event.name(), "storing notification failed");
        }
    }

    for user_id in &delivery.outbound {
        let user = match state.store.get_user(*user_id).await {
            Ok(u) => u,
            Err(e) => {
                warn!(error = %e, user = %user_id, "recipient lookup failed");
                continue;
            }
        };
        if let Err(e) = state.gateway.send_email(&user.email, &title, &body).await {
            warn!(error = %e, to = %user.email, "email delivery failed");
        }
        if let Err(e) = state.gateway.send_sms(&user.phone, &body).await {
            warn!(error = %e, to = %user.phone, "sms delivery failed");
        }
    }

    state.hub.publish(delivery.rooms, event);
}
