use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use chrono::Utc;
use imitra_core::{Department, NewUser, Role, User, UserView};
use imitra_store::UserFilter;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::paginate;
use crate::auth::{AuthUser, hash_password};
use crate::error::ApiError;
use crate::extract::{ValidJson, ok, ok_with, parse_id, parse_opt};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create_staff))
        .route("/mitras", get(mitras))
        .route("/:id", get(show).put(update))
        .route("/:id/status", patch(set_active))
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    role: Option<String>,
    department: Option<String>,
    active: Option<bool>,
    page: Option<usize>,
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct MitraQuery {
    department: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct CreateStaffRequest {
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 10, max = 16))]
    phone: String,
    #[validate(length(min = 6, max = 128))]
    password: String,
    role: String,
    department: Option<String>,
    employee_id: Option<String>,
    zone: Option<String>,
    address: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100))]
    name: Option<String>,
    #[validate(length(min = 10, max = 16))]
    phone: Option<String>,
    address: Option<String>,
    zone: Option<String>,
    /// Admin only.
    department: Option<String>,
    /// Admin only.
    employee_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct ActiveRequest {
    is_active: bool,
}

fn views(users: Vec<User>) -> Vec<UserView> {
    users.iter().map(User::view).collect()
}

fn require_self_or_admin(auth: &AuthUser, id: uuid::Uuid) -> Result<(), ApiError> {
    if auth.role() == Role::Admin || auth.0.id == id {
        Ok(())
    } else {
        Err(ApiError::forbidden("you can only access your own profile"))
    }
}

async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(q): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require(&[Role::Admin])?;
    let filter = UserFilter {
        role: parse_opt(q.role.as_deref())?,
        department: parse_opt(q.department.as_deref())?,
        active: q.active,
    };
    let users = state.store.list_users(&filter).await?;
    Ok(ok(paginate(views(users), q.page, q.limit)))
}

async fn create_staff(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(req): ValidJson<CreateStaffRequest>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require(&[Role::Admin])?;
    let role: Role = req.role.parse()?;
    if role == Role::Citizen {
        return Err(ApiError::bad_request(
            "citizens register themselves; choose officer, mitra or admin",
        ));
    }
    let input = NewUser {
        name: req.name,
        email: req.email,
        phone: req.phone,
        role: Some(role),
        department: parse_opt(req.department.as_deref())?,
        employee_id: req.employee_id,
        zone: req.zone,
        address: req.address,
    };
    let hash = hash_password(&req.password, state.config.password_rounds).await?;
    let user = User::new(input, hash, Utc::now())?;
    state.store.insert_user(&user).await?;

    info!(user = %user.id, role = %user.role, by = %auth.0.id, "staff account created");
    Ok((
        StatusCode::CREATED,
        ok_with("user created", user.view()),
    ))
}

async fn mitras(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(q): Query<MitraQuery>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require(&[Role::Officer, Role::Admin])?;
    let department: Option<Department> = match auth.role() {
        Role::Officer => auth.0.department,
        _ => parse_opt(q.department.as_deref())?,
    };
    let filter = UserFilter {
        role: Some(Role::Mitra),
        department,
        active: Some(true),
    };
    let users = state.store.list_users(&filter).await?;
    Ok(ok(views(users)))
}

async fn show(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    require_self_or_admin(&auth, id)?;
    let user = state.store.get_user(id).await?;
    Ok(ok(user.view()))
}

async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    require_self_or_admin(&auth, id)?;
    let is_admin = auth.role() == Role::Admin;
    if !is_admin && (req.department.is_some() || req.employee_id.is_some()) {
        return Err(ApiError::forbidden(
            "only admins can change department or employee id",
        ));
    }

    let mut user = state.store.get_user(id).await?;
    if let Some(name) = req.name {
        user.name = name.trim().to_string();
    }
    if let Some(phone) = req.phone {
        user.phone = phone.trim().to_string();
    }
    if let Some(address) = req.address {
        user.address = Some(address.trim().to_string()).filter(|a| !a.is_empty());
    }
    if let Some(zone) = req.zone {
        user.zone = Some(zone.trim().to_string()).filter(|z| !z.is_empty());
    }
    if let Some(department) = parse_opt(req.department.as_deref())? {
        user.department = Some(department);
    }
    if let Some(employee_id) = req.employee_id {
        user.employee_id = Some(employee_id.trim().to_string()).filter(|e| !e.is_empty());
    }
    user.validate()?;
    state.store.update_user(&user).await?;

    info!(user = %user.id, by = %auth.0.id, "profile updated");
    Ok(ok_with("profile updated", user.view()))
}

async fn set_active(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<ActiveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require(&[Role::Admin])?;
    let id = parse_id(&id)?;
    if id == auth.0.id && !req.is_active {
        return Err(ApiError::bad_request("you cannot deactivate your own account"));
    }
    let mut user = state.store.get_user(id).await?;
    user.is_active = req.is_active;
    state.store.update_user(&user).await?;

    info!(user = %user.id, active = user.is_active, by = %auth.0.id, "account status changed");
    let message = if user.is_active {
        "user activated"
    } else {
        "user deactivated"
    };
    Ok(ok_with(message, user.view()))
}
