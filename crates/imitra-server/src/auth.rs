//! Password hashing, JWT issuance and the authenticated-user extractor.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use imitra_core::{Actor, Department, Role, User};
use imitra_store::StoreError;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

const HASH_SCHEME: &str = "pbkdf2-sha256";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub department: Option<Department>,
    pub exp: i64,
    pub iat: i64,
}

pub fn issue_token(
    user: &User,
    secret: &str,
    ttl_hours: i64,
    now: DateTime<Utc>,
) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user.id,
        role: user.role,
        department: user.department,
        iat: now.timestamp(),
        exp: (now + Duration::hours(ttl_hours)).timestamp(),
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(anyhow::Error::new(e).context("signing token")))
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| ApiError::unauthorized(format!("invalid token: {e}")))
}

fn derive(password: &str, salt: &str, rounds: u32) -> [u8; 32] {
    let mut out = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), rounds, &mut out);
    out
}

/// `pbkdf2-sha256$<rounds>$<salt>$<hex digest>`.
///
/// Runs on the blocking pool; a full-strength hash takes tens of
/// milliseconds.
pub async fn hash_password(password: &str, rounds: u32) -> Result<String, ApiError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || {
        let rounds = rounds.max(1);
        let salt = Uuid::new_v4().simple().to_string();
        let digest = hex::encode(derive(&password, &salt, rounds));
        format!("{HASH_SCHEME}${rounds}${salt}${digest}")
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::Error::new(e).context("hashing password")))
}

/// Check `password` against a stored hash on the blocking pool. Malformed
/// hashes never match.
pub async fn verify_password(password: &str, stored: &str) -> Result<bool, ApiError> {
    let password = password.to_string();
    let stored = stored.to_string();
    tokio::task::spawn_blocking(move || matches_hash(&password, &stored))
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e).context("verifying password")))
}

fn matches_hash(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(HASH_SCHEME), Some(rounds), Some(salt), Some(digest), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    let (Ok(rounds @ 1..), Ok(expected)) = (rounds.parse::<u32>(), hex::decode(digest)) else {
        return false;
    };
    constant_time_eq(&derive(password, salt, rounds), &expected)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Session cookie carrying the token.
pub fn session_cookie(token: &str, ttl_hours: i64) -> String {
    format!(
        "token={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        ttl_hours * 3600
    )
}

/// Bearer header first, then the `token` cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(bearer) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(bearer.to_string());
    }
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == "token" && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Resolve a token to an active user.
pub async fn authenticate(state: &AppState, token: &str) -> Result<User, ApiError> {
    let claims = decode_token(token, &state.config.jwt_secret)?;
    let user = state.store.get_user(claims.sub).await.map_err(|e| match e {
        StoreError::NotFound { .. } => ApiError::unauthorized("user no longer exists"),
        other => other.into(),
    })?;
    if !user.is_active {
        return Err(ApiError::unauthorized("account is deactivated"));
    }
    Ok(user)
}

/// The caller, resolved from the request's token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn actor(&self) -> Actor {
        self.0.actor()
    }

    pub fn role(&self) -> Role {
        self.0.role
    }

    pub fn require(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.0.role) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "role {} is not allowed to do this",
                self.0.role
            )))
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("authentication required"))?;
        Ok(Self(authenticate(state, &token).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use imitra_core::NewUser;

    fn user() -> User {
        let input = NewUser {
            name: "Meera".into(),
            email: "meera@example.com".into(),
            phone: "9876501234".into(),
            ..NewUser::default()
        };
        User::new(input, "x".into(), Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn password_roundtrip() {
        let stored = hash_password("s3cret!", 1_000).await.unwrap();
        assert!(stored.starts_with("pbkdf2-sha256$1000$"));
        assert_eq!(stored.rsplit('$').next().map(str::len), Some(64));
        assert!(verify_password("s3cret!", &stored).await.unwrap());
        assert!(!verify_password("S3cret!", &stored).await.unwrap());
        assert!(!verify_password("s3cret!", "plain").await.unwrap());
        // Salted: same password, different hash.
        assert_ne!(stored, hash_password("s3cret!", 1_000).await.unwrap());
    }

    #[test]
    fn malformed_digest_never_matches() {
        assert!(!matches_hash("pw", "pbkdf2-sha256$10$salt$not-hex"));
        assert!(!matches_hash("pw", "pbkdf2-sha256$ten$salt$00"));
        assert!(!matches_hash("pw", "pbkdf2-sha256$0$salt$00"));
    }

    #[test]
    fn token_roundtrip_and_wrong_secret() {
        let u = user();
        let token = issue_token(&u, "secret", 1, Utc::now()).unwrap();
        let claims = decode_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, u.id);
        assert_eq!(claims.role, Role::Citizen);
        assert!(decode_token(&token, "other").is_err());
    }

    #[test]
    fn expired_token_rejected() {
        let token = issue_token(&user(), "secret", 1, Utc::now() - Duration::hours(3)).unwrap();
        assert!(matches!(
            decode_token(&token, "secret"),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn token_from_bearer_or_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; token=abc"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("xyz"));
        assert_eq!(token_from_headers(&HeaderMap::new()), None);
    }
}
