//! Periodic SLA sweep over open complaints.

use std::time::Duration;

use chrono::{DateTime, Utc};
use imitra_core::{Complaint, ComplaintSummary, PushEvent, SlaStatus};
use imitra_store::ComplaintFilter;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::state::AppState;
use crate::workflow::{modify, publish};

/// Recompute SLA status for every open complaint at `now`, persist the ones
/// that changed and announce each breach once. Returns the number of breaches
/// announced.
pub async fn sweep(state: &AppState, now: DateTime<Utc>) -> Result<usize, ApiError> {
    let open = state.store.list_complaints(&ComplaintFilter::open()).await?;
    Ok(sweep_listed(state, open, now).await)
}

/// Second half of [`sweep`]. The listed copies only pick candidates; each
/// write goes through [`modify`] against the stored complaint, so work done
/// since the listing is kept.
pub(crate) async fn sweep_listed(
    state: &AppState,
    open: Vec<Complaint>,
    now: DateTime<Utc>,
) -> usize {
    let mut announced = 0;

    for mut listed in open {
        let changed = listed.refresh_sla(now);
        if !changed && !needs_announcement(&listed) {
            continue;
        }

        let result = modify(state, listed.id, |complaint| {
            complaint.refresh_sla(now);
            let announce = needs_announcement(complaint);
            if announce {
                complaint.sla.breach_notified = true;
            }
            Ok(announce)
        })
        .await;
        let complaint = match result {
            Ok((complaint, true)) => complaint,
            Ok((_, false)) => continue,
            Err(e) => {
                warn!(error = %e, complaint = %listed.complaint_number, "SLA update failed");
                continue;
            }
        };

        warn!(
            complaint = %complaint.complaint_number,
            department = %complaint.classification.department,
            deadline = %complaint.sla.deadline,
            "SLA breached"
        );
        publish(state, PushEvent::SlaBreached(ComplaintSummary::from(&complaint))).await;
        announced += 1;
    }
    announced
}

fn needs_announcement(complaint: &Complaint) -> bool {
    complaint.sla.status == SlaStatus::Breached && !complaint.sla.breach_notified
}

/// Run [`sweep`] on the configured interval until the runtime shuts down.
pub fn spawn(state: AppState) -> JoinHandle<()> {
    let period = Duration::from_secs(state.config.sla_check_interval_secs.max(1));
    info!(every_secs = period.as_secs(), "SLA monitor started");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match sweep(&state, Utc::now()).await {
                Ok(0) => debug!("SLA sweep: no new breaches"),
                Ok(n) => info!(breaches = n, "SLA sweep complete"),
                Err(e) => warn!(error = %e, "SLA sweep failed"),
            }
        }
    })
}
