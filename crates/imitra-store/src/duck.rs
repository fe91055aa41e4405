//! DuckDB-backed document store.
//!
//! Each entity is a JSON document in a `doc` column next to the handful of
//! columns used for lookups. Filters on those columns run in SQL; the rest of
//! a [`ComplaintFilter`] is applied to the decoded documents.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use duckdb::{Connection, Params, params, params_from_iter};
use imitra_core::{Complaint, Notification, User};
use serde::de::DeserializeOwned;
use tracing::info;
use uuid::Uuid;

use crate::{ComplaintFilter, Store, StoreError, UserFilter, check_unique};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id VARCHAR PRIMARY KEY,
    email VARCHAR NOT NULL,
    phone VARCHAR NOT NULL,
    doc VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS complaints (
    id VARCHAR PRIMARY KEY,
    citizen_id VARCHAR NOT NULL,
    department VARCHAR NOT NULL,
    assigned_mitra VARCHAR,
    status VARCHAR NOT NULL,
    doc VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS notifications (
    id VARCHAR PRIMARY KEY,
    user_id VARCHAR NOT NULL,
    is_read BOOLEAN NOT NULL,
    doc VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS complaint_sequences (
    year INTEGER PRIMARY KEY,
    value BIGINT NOT NULL
);
";

/// DuckDB store, in-memory or file-backed.
///
/// A single connection behind a mutex. Statements run on the blocking pool so
/// a slow disk never stalls the async workers.
pub struct DuckStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckStore {
    /// Open an in-memory database.
    pub fn open() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open or create a database file at `path`.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let store = Self::init(Connection::open(path)?)?;
        info!(path = %path.display(), "opened duckdb store");
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Other("duckdb connection lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Other(format!("duckdb task failed: {e}")))?
    }
}

fn docs<T: DeserializeOwned>(
    conn: &Connection,
    sql: &str,
    params: impl Params,
) -> Result<Vec<T>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;
    rows.map(|raw| Ok(serde_json::from_str(&raw?)?)).collect()
}

fn one<T: DeserializeOwned>(
    conn: &Connection,
    sql: &str,
    params: impl Params,
    entity: &'static str,
) -> Result<T, StoreError> {
    docs(conn, sql, params)?
        .into_iter()
        .next()
        .ok_or(StoreError::not_found(entity))
}

fn opt_id(id: Option<Uuid>) -> Option<String> {
    id.map(|u| u.to_string())
}

#[async_trait]
impl Store for DuckStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let user = user.clone();
        self.run(move |conn| {
            let existing: Vec<User> = docs(conn, "SELECT doc FROM users", [])?;
            check_unique(&user, &existing)?;
            conn.execute(
                "INSERT INTO users (id, email, phone, doc) VALUES (?, ?, ?, ?)",
                params![
                    user.id.to_string(),
                    user.email,
                    user.phone,
                    serde_json::to_string(&user)?
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_user(&self, id: Uuid) -> Result<User, StoreError> {
        self.run(move |conn| {
            one(conn, "SELECT doc FROM users WHERE id = ?", [id.to_string()], "user")
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.to_string();
        self.run(move |conn| {
            let found: Vec<User> = docs(conn, "SELECT doc FROM users WHERE email = ?", [email])?;
            Ok(found.into_iter().next())
        })
        .await
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let user = user.clone();
        self.run(move |conn| {
            let existing: Vec<User> = docs(conn, "SELECT doc FROM users", [])?;
            if !existing.iter().any(|u| u.id == user.id) {
                return Err(StoreError::not_found("user"));
            }
            check_unique(&user, &existing)?;
            conn.execute(
                "UPDATE users SET email = ?, phone = ?, doc = ? WHERE id = ?",
                params![
                    user.email,
                    user.phone,
                    serde_json::to_string(&user)?,
                    user.id.to_string()
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError> {
        let filter = filter.clone();
        self.run(move |conn| {
            let mut users: Vec<User> = docs(conn, "SELECT doc FROM users", [])?;
            users.retain(|u| filter.matches(u));
            users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(users)
        })
        .await
    }

    async fn next_complaint_sequence(&self, year: i32) -> Result<u64, StoreError> {
        self.run(move |conn| {
            let updated = conn.execute(
                "UPDATE complaint_sequences SET value = value + 1 WHERE year = ?",
                [year],
            )?;
            if updated == 0 {
                conn.execute(
                    "INSERT INTO complaint_sequences (year, value) VALUES (?, 1)",
                    [year],
                )?;
            }
            let value: i64 = conn.query_row(
                "SELECT value FROM complaint_sequences WHERE year = ?",
                [year],
                |row| row.get(0),
            )?;
            Ok(value as u64)
        })
        .await
    }

    async fn insert_complaint(&self, complaint: &Complaint) -> Result<(), StoreError> {
        let complaint = complaint.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO complaints (id, citizen_id, department, assigned_mitra, status, doc)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    complaint.id.to_string(),
                    complaint.citizen_id.to_string(),
                    complaint.classification.department.as_str(),
                    opt_id(complaint.assigned_mitra),
                    complaint.status.as_str(),
                    serde_json::to_string(&complaint)?
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_complaint(&self, id: Uuid) -> Result<Complaint, StoreError> {
        self.run(move |conn| {
            one(
                conn,
                "SELECT doc FROM complaints WHERE id = ?",
                [id.to_string()],
                "complaint",
            )
        })
        .await
    }

    async fn update_complaint(&self, complaint: &Complaint) -> Result<(), StoreError> {
        let next = Complaint {
            version: complaint.version + 1,
            ..complaint.clone()
        };
        self.run(move |conn| {
            // The connection lock makes this read and the write below atomic.
            let stored: Complaint = one(
                conn,
                "SELECT doc FROM complaints WHERE id = ?",
                [next.id.to_string()],
                "complaint",
            )?;
            if stored.version + 1 != next.version {
                return Err(StoreError::Conflict {
                    entity: "complaint",
                });
            }
            conn.execute(
                "UPDATE complaints
                 SET department = ?, assigned_mitra = ?, status = ?, doc = ?
                 WHERE id = ?",
                params![
                    next.classification.department.as_str(),
                    opt_id(next.assigned_mitra),
                    next.status.as_str(),
                    serde_json::to_string(&next)?,
                    next.id.to_string()
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn list_complaints(
        &self,
        filter: &ComplaintFilter,
    ) -> Result<Vec<Complaint>, StoreError> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        if let Some(id) = filter.citizen_id {
            clauses.push("citizen_id = ?");
            values.push(id.to_string());
        }
        if let Some(d) = filter.department {
            clauses.push("department = ?");
            values.push(d.as_str().to_string());
        }
        if let Some(id) = filter.assigned_mitra {
            clauses.push("assigned_mitra = ?");
            values.push(id.to_string());
        }
        if let Some(s) = filter.status {
            clauses.push("status = ?");
            values.push(s.as_str().to_string());
        }
        let mut sql = String::from("SELECT doc FROM complaints");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let filter = filter.clone();
        self.run(move |conn| {
            let mut complaints: Vec<Complaint> = docs(conn, &sql, params_from_iter(values))?;
            complaints.retain(|c| filter.matches(c));
            complaints.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(complaints)
        })
        .await
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        let n = notification.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO notifications (id, user_id, is_read, doc) VALUES (?, ?, ?, ?)",
                params![
                    n.id.to_string(),
                    n.user_id.to_string(),
                    n.read,
                    serde_json::to_string(&n)?
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> Result<Vec<Notification>, StoreError> {
        let sql = if unread_only {
            "SELECT doc FROM notifications WHERE user_id = ? AND NOT is_read"
        } else {
            "SELECT doc FROM notifications WHERE user_id = ?"
        };
        self.run(move |conn| {
            let mut list: Vec<Notification> = docs(conn, sql, [user_id.to_string()])?;
            list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(list)
        })
        .await
    }

    async fn mark_notification_read(&self, user_id: Uuid, id: Uuid) -> Result<(), StoreError> {
        self.run(move |conn| {
            let mut n: Notification = one(
                conn,
                "SELECT doc FROM notifications WHERE id = ? AND user_id = ?",
                [id.to_string(), user_id.to_string()],
                "notification",
            )?;
            n.read = true;
            conn.execute(
                "UPDATE notifications SET is_read = true, doc = ? WHERE id = ?",
                params![serde_json::to_string(&n)?, id.to_string()],
            )?;
            Ok(())
        })
        .await
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<usize, StoreError> {
        self.run(move |conn| {
            let unread: Vec<Notification> = docs(
                conn,
                "SELECT doc FROM notifications WHERE user_id = ? AND NOT is_read",
                [user_id.to_string()],
            )?;
            for mut n in unread.iter().cloned() {
                n.read = true;
                conn.execute(
                    "UPDATE notifications SET is_read = true, doc = ? WHERE id = ?",
                    params![serde_json::to_string(&n)?, n.id.to_string()],
                )?;
            }
            Ok(unread.len())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::tests::{citizen, complaint};
    use chrono::Utc;
    use imitra_core::{Actor, Category, Role, Status};

    #[tokio::test]
    async fn users_roundtrip_and_stay_unique() {
        let store = DuckStore::open().unwrap();
        let u = citizen("ravi@example.com", "9123456780");
        store.insert_user(&u).await.unwrap();

        let found = store
            .find_user_by_email("ravi@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, u);
        assert!(matches!(
            store.insert_user(&citizen("ravi@example.com", "9000000001")).await,
            Err(StoreError::Duplicate { field: "email" })
        ));
    }

    #[tokio::test]
    async fn complaint_update_changes_sql_columns() {
        let store = DuckStore::open().unwrap();
        let mut c = complaint(Uuid::new_v4(), Category::Drainage, 0);
        store.insert_complaint(&c).await.unwrap();

        let officer = Actor::new(Uuid::new_v4(), Role::Officer, Some(c.classification.department));
        let mitra = Uuid::new_v4();
        c.assign(mitra, &officer, Utc::now()).unwrap();
        store.update_complaint(&c).await.unwrap();

        let by_mitra = store
            .list_complaints(&ComplaintFilter {
                assigned_mitra: Some(mitra),
                status: Some(Status::Assigned),
                ..ComplaintFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(by_mitra.len(), 1);
        assert_eq!(by_mitra[0].id, c.id);
    }

    #[tokio::test]
    async fn stale_complaint_write_is_refused() {
        let store = DuckStore::open().unwrap();
        let c = complaint(Uuid::new_v4(), Category::Roads, 0);
        store.insert_complaint(&c).await.unwrap();

        let mut first = store.get_complaint(c.id).await.unwrap();
        let stale = first.clone();
        first.title = "Pothole near the school gate".into();
        store.update_complaint(&first).await.unwrap();

        assert!(matches!(
            store.update_complaint(&stale).await,
            Err(StoreError::Conflict { entity: "complaint" })
        ));
        let stored = store.get_complaint(c.id).await.unwrap();
        assert_eq!(stored.title, "Pothole near the school gate");
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn sequences_survive_reopen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("imitra.duckdb");
        {
            let store = DuckStore::open_persistent(&path).unwrap();
            assert_eq!(store.next_complaint_sequence(2026).await.unwrap(), 1);
            assert_eq!(store.next_complaint_sequence(2026).await.unwrap(), 2);
        }
        let store = DuckStore::open_persistent(&path).unwrap();
        assert_eq!(store.next_complaint_sequence(2026).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn notifications_mark_read() {
        let store = DuckStore::open().unwrap();
        let me = Uuid::new_v4();
        for title in ["one", "two"] {
            let n = Notification::new(me, "new_remark", title, "body", None, Utc::now());
            store.insert_notification(&n).await.unwrap();
        }
        assert_eq!(store.mark_all_notifications_read(me).await.unwrap(), 2);
        assert!(store.list_notifications(me, true).await.unwrap().is_empty());
    }
}
