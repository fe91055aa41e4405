//! Storage layer: users, complaints and notifications as JSON documents.
//!
//! [`MemoryStore`] is always available. [`DuckStore`] persists the same
//! documents to a DuckDB file behind the `duckdb` feature.

mod error;
mod filter;
mod memory;

pub use error::StoreError;
pub use filter::{ComplaintFilter, UserFilter};
pub use memory::MemoryStore;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;

use async_trait::async_trait;
use imitra_core::{Complaint, Notification, User};
use uuid::Uuid;

/// Persistence contract the service is written against.
///
/// Lists come back newest first. Email and phone are unique across users.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;
    async fn get_user(&self, id: Uuid) -> Result<User, StoreError>;
    /// `email` must already be normalised.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn update_user(&self, user: &User) -> Result<(), StoreError>;
    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError>;

    /// Next per-year complaint sequence number, starting at 1.
    async fn next_complaint_sequence(&self, year: i32) -> Result<u64, StoreError>;
    async fn insert_complaint(&self, complaint: &Complaint) -> Result<(), StoreError>;
    async fn get_complaint(&self, id: Uuid) -> Result<Complaint, StoreError>;
    /// Replace a complaint if the stored `version` still equals
    /// `complaint.version`; the stored copy gets `version + 1`. A mismatch
    /// fails with `Conflict` and writes nothing.
    async fn update_complaint(&self, complaint: &Complaint) -> Result<(), StoreError>;
    async fn list_complaints(&self, filter: &ComplaintFilter)
    -> Result<Vec<Complaint>, StoreError>;

    async fn insert_notification(&self, notification: &Notification) -> Result<(), StoreError>;
    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> Result<Vec<Notification>, StoreError>;
    /// Fails with `NotFound` unless the notification belongs to `user_id`.
    async fn mark_notification_read(&self, user_id: Uuid, id: Uuid) -> Result<(), StoreError>;
    /// Returns how many were unread.
    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<usize, StoreError>;
}

fn check_unique<'a>(
    candidate: &User,
    existing: impl IntoIterator<Item = &'a User>,
) -> Result<(), StoreError> {
    for other in existing {
        if other.id == candidate.id {
            continue;
        }
        if other.email == candidate.email {
            return Err(StoreError::Duplicate { field: "email" });
        }
        if other.phone == candidate.phone {
            return Err(StoreError::Duplicate { field: "phone" });
        }
    }
    Ok(())
}
