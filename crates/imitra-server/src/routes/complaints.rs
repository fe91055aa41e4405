use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Query, Request, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::Utc;
use imitra_core::{Classification, Complaint, Department, Location, NewComplaint, Role, Status};
use imitra_store::ComplaintFilter;
use serde::Deserialize;
use validator::Validate;

use super::paginate;
use crate::auth::AuthUser;
use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::extract::{ValidJson, ok, ok_with, parse_id, parse_opt};
use crate::state::AppState;
use crate::upload;
use crate::workflow;

pub fn routes(config: &ServerConfig) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(create)
                .layer(DefaultBodyLimit::max(config.upload_body_limit()))
                .get(list),
        )
        .route("/classify", post(classify))
        .route("/:id", get(show))
        .route("/:id/status", put(update_status))
        .route("/:id/assign", put(assign))
        .route("/:id/remarks", post(add_remark))
        .route("/:id/feedback", post(feedback))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateComplaintRequest {
    #[validate(length(min = 5, max = 200))]
    title: String,
    #[validate(length(min = 10, max = 5000))]
    description: String,
    location: Location,
}

#[derive(Debug, Deserialize, Validate)]
struct ClassifyRequest {
    #[validate(length(min = 1, max = 200))]
    title: String,
    #[validate(length(min = 1, max = 5000))]
    description: String,
}

#[derive(Debug, Deserialize, Validate)]
struct StatusRequest {
    status: String,
    #[validate(length(max = 2000))]
    note: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct AssignRequest {
    mitra_id: String,
}

#[derive(Debug, Deserialize, Validate)]
struct RemarkRequest {
    #[validate(length(min = 1, max = 1000))]
    text: String,
    #[serde(default)]
    internal: bool,
}

#[derive(Debug, Deserialize, Validate)]
struct FeedbackRequest {
    #[validate(range(min = 1, max = 5))]
    rating: u8,
    satisfied: bool,
    #[validate(length(max = 500))]
    comment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    status: Option<String>,
    priority: Option<String>,
    category: Option<String>,
    department: Option<String>,
    page: Option<usize>,
    limit: Option<usize>,
}

/// What `role` gets to see, with SLA status as of now.
fn present(mut complaint: Complaint, role: Role) -> Complaint {
    complaint.refresh_sla(Utc::now());
    complaint.view_for(role)
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    req: Request,
) -> Result<impl IntoResponse, ApiError> {
    auth.require(&[Role::Citizen])?;

    let (input, files) = if is_multipart(&req) {
        let multipart = Multipart::from_request(req, &state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        let form = upload::read_complaint_form(multipart, &state.config).await?;
        let input = NewComplaint {
            citizen_id: auth.0.id,
            title: form.title,
            description: form.description,
            location: form.location,
            attachments: Vec::new(),
        };
        (input, form.files)
    } else {
        let ValidJson(body) = ValidJson::<CreateComplaintRequest>::from_request(req, &state).await?;
        let input = NewComplaint {
            citizen_id: auth.0.id,
            title: body.title,
            description: body.description,
            location: body.location,
            attachments: Vec::new(),
        };
        (input, Vec::new())
    };

    let complaint = workflow::file_complaint(&state, input, files).await?;
    Ok((
        StatusCode::CREATED,
        ok_with("complaint registered", present(complaint, auth.role())),
    ))
}

async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(q): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut filter = ComplaintFilter::visible_to(&auth.actor());
    filter.status = parse_opt(q.status.as_deref())?;
    filter.priority = parse_opt(q.priority.as_deref())?;
    filter.category = parse_opt(q.category.as_deref())?;
    let department: Option<Department> = parse_opt(q.department.as_deref())?;

    let mut complaints = state.store.list_complaints(&filter).await?;
    if let Some(d) = department {
        complaints.retain(|c| c.classification.department == d);
    }
    let role = auth.role();
    let complaints: Vec<Complaint> = complaints.into_iter().map(|c| present(c, role)).collect();
    Ok(ok(paginate(complaints, q.page, q.limit)))
}

async fn classify(
    State(state): State<AppState>,
    _auth: AuthUser,
    ValidJson(req): ValidJson<ClassifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let classification: Classification = state.classifier.classify(&req.title, &req.description).await;
    Ok(ok(classification))
}

async fn show(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let complaint = workflow::load_visible(&state, &auth.actor(), parse_id(&id)?).await?;
    Ok(ok(present(complaint, auth.role())))
}

async fn update_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<StatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require(&[Role::Officer, Role::Mitra, Role::Admin])?;
    let to: Status = req.status.parse()?;
    let complaint =
        workflow::change_status(&state, &auth.actor(), parse_id(&id)?, to, req.note).await?;
    Ok(ok_with("status updated", present(complaint, auth.role())))
}

async fn assign(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<AssignRequest>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require(&[Role::Officer, Role::Admin])?;
    let mitra_id = parse_id(&req.mitra_id)?;
    let complaint = workflow::assign(&state, &auth.actor(), parse_id(&id)?, mitra_id).await?;
    Ok(ok_with("complaint assigned", present(complaint, auth.role())))
}

async fn add_remark(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<RemarkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let complaint =
        workflow::add_remark(&state, &auth.actor(), parse_id(&id)?, &req.text, req.internal)
            .await?;
    Ok((
        StatusCode::CREATED,
        ok_with("remark added", present(complaint, auth.role())),
    ))
}

async fn feedback(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<FeedbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let complaint = workflow::submit_feedback(
        &state,
        &auth.actor(),
        parse_id(&id)?,
        req.rating,
        req.satisfied,
        req.comment,
    )
    .await?;
    Ok(ok_with("feedback recorded", present(complaint, auth.role())))
}
