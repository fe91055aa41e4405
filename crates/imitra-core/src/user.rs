//! User accounts and roles.
//!
//! One document type covers citizens, department officers, field agents
//! (mitra) and administrators. Staff roles carry extra required fields.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::taxonomy::{Department, parse_variant};
use crate::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Citizen,
    Officer,
    Mitra,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Self::Citizen, Self::Officer, Self::Mitra, Self::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Citizen => "citizen",
            Self::Officer => "officer",
            Self::Mitra => "mitra",
            Self::Admin => "admin",
        }
    }

    /// Officers and mitra belong to a department.
    pub fn requires_department(&self) -> bool {
        matches!(self, Self::Officer | Self::Mitra)
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(&Self::ALL, Self::as_str, "role", s)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity an operation is performed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
    pub department: Option<Department>,
}

impl Actor {
    pub fn new(id: Uuid, role: Role, department: Option<Department>) -> Self {
        Self {
            id,
            role,
            department,
        }
    }
}

/// Stored user document. Never serialised to API callers directly; see [`UserView`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub role: Role,
    pub department: Option<Department>,
    pub employee_id: Option<String>,
    pub zone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a user.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Option<Role>,
    pub department: Option<Department>,
    pub employee_id: Option<String>,
    pub zone: Option<String>,
    pub address: Option<String>,
}

/// Public projection of a [`User`] without the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<Department>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Build and validate a new user. Email is trimmed and lower-cased.
    pub fn new(
        input: NewUser,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let user = Self {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            email: normalize_email(&input.email),
            phone: input.phone.trim().to_string(),
            password_hash,
            role: input.role.unwrap_or(Role::Citizen),
            department: input.department,
            employee_id: non_blank(input.employee_id),
            zone: non_blank(input.zone),
            address: non_blank(input.address),
            is_active: true,
            created_at: now,
            last_login_at: None,
        };
        user.validate()?;
        Ok(user)
    }

    /// Field constraints, including the role-conditional ones.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.is_empty() || self.name.chars().count() > 100 {
            return Err(DomainError::validation("name must be 1-100 characters"));
        }
        if !is_plausible_email(&self.email) {
            return Err(DomainError::validation("invalid email address"));
        }
        if !is_plausible_phone(&self.phone) {
            return Err(DomainError::validation(
                "phone must be 10-15 digits, optionally prefixed with '+'",
            ));
        }

        match self.role {
            Role::Officer | Role::Mitra => {
                if self.department.is_none() {
                    return Err(DomainError::validation(format!(
                        "department is required for role {}",
                        self.role
                    )));
                }
                if self.employee_id.is_none() {
                    return Err(DomainError::validation(format!(
                        "employee_id is required for role {}",
                        self.role
                    )));
                }
                if self.role == Role::Mitra && self.zone.is_none() {
                    return Err(DomainError::validation("zone is required for role mitra"));
                }
            }
            Role::Citizen => {
                if self.department.is_some() {
                    return Err(DomainError::validation(
                        "citizens cannot belong to a department",
                    ));
                }
            }
            Role::Admin => {}
        }
        Ok(())
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.role, self.department)
    }

    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            role: self.role,
            department: self.department,
            employee_id: self.employee_id.clone(),
            zone: self.zone.clone(),
            address: self.address.clone(),
            is_active: self.is_active,
            created_at: self.created_at,
            last_login_at: self.last_login_at,
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

fn is_plausible_phone(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    (10..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citizen_input() -> NewUser {
        NewUser {
            name: "Asha Rao".into(),
            email: "  Asha.Rao@Example.org ".into(),
            phone: "+919876543210".into(),
            ..Default::default()
        }
    }

    #[test]
    fn citizen_defaults_and_normalises_email() {
        let user = User::new(citizen_input(), "hash".into(), Utc::now()).unwrap();
        assert_eq!(user.role, Role::Citizen);
        assert_eq!(user.email, "asha.rao@example.org");
        assert!(user.is_active);
    }

    #[test]
    fn officer_requires_department_and_employee_id() {
        let mut input = citizen_input();
        input.role = Some(Role::Officer);
        let err = User::new(input.clone(), "hash".into(), Utc::now()).unwrap_err();
        assert!(err.to_string().contains("department"));

        input.department = Some(Department::Sanitation);
        let err = User::new(input.clone(), "hash".into(), Utc::now()).unwrap_err();
        assert!(err.to_string().contains("employee_id"));

        input.employee_id = Some("EMP-17".into());
        assert!(User::new(input, "hash".into(), Utc::now()).is_ok());
    }

    #[test]
    fn mitra_requires_zone() {
        let mut input = citizen_input();
        input.role = Some(Role::Mitra);
        input.department = Some(Department::WaterSupply);
        input.employee_id = Some("M-4".into());
        input.zone = Some("   ".into());
        let err = User::new(input.clone(), "hash".into(), Utc::now()).unwrap_err();
        assert!(err.to_string().contains("zone"));

        input.zone = Some("North".into());
        assert!(User::new(input, "hash".into(), Utc::now()).is_ok());
    }

    #[test]
    fn citizen_cannot_have_department() {
        let mut input = citizen_input();
        input.department = Some(Department::Health);
        assert!(User::new(input, "hash".into(), Utc::now()).is_err());
    }

    #[test]
    fn rejects_bad_contact_details() {
        let mut input = citizen_input();
        input.email = "not-an-email".into();
        assert!(User::new(input, "hash".into(), Utc::now()).is_err());

        let mut input = citizen_input();
        input.phone = "12345".into();
        assert!(User::new(input, "hash".into(), Utc::now()).is_err());
    }

    #[test]
    fn view_omits_password_hash() {
        let user = User::new(citizen_input(), "secret-hash".into(), Utc::now()).unwrap();
        let json = serde_json::to_string(&user.view()).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password"));
    }
}
