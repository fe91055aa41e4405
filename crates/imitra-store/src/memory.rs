use std::collections::HashMap;

use async_trait::async_trait;
use imitra_core::{Complaint, Notification, User};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{ComplaintFilter, Store, StoreError, UserFilter, check_unique};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    complaints: HashMap<Uuid, Complaint>,
    notifications: HashMap<Uuid, Notification>,
    sequences: HashMap<i32, u64>,
}

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        check_unique(user, inner.users.values())?;
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<User, StoreError> {
        self.inner
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or(StoreError::not_found("user"))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user.id) {
            return Err(StoreError::not_found("user"));
        }
        check_unique(user, inner.users.values())?;
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner
            .users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn next_complaint_sequence(&self, year: i32) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let seq = inner.sequences.entry(year).or_default();
        *seq += 1;
        Ok(*seq)
    }

    async fn insert_complaint(&self, complaint: &Complaint) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.complaints.insert(complaint.id, complaint.clone());
        Ok(())
    }

    async fn get_complaint(&self, id: Uuid) -> Result<Complaint, StoreError> {
        self.inner
            .read()
            .await
            .complaints
            .get(&id)
            .cloned()
            .ok_or(StoreError::not_found("complaint"))
    }

    async fn update_complaint(&self, complaint: &Complaint) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        match inner.complaints.get_mut(&complaint.id) {
            Some(slot) if slot.version != complaint.version => Err(StoreError::Conflict {
                entity: "complaint",
            }),
            Some(slot) => {
                *slot = Complaint {
                    version: complaint.version + 1,
                    ..complaint.clone()
                };
                Ok(())
            }
            None => Err(StoreError::not_found("complaint")),
        }
    }

    async fn list_complaints(
        &self,
        filter: &ComplaintFilter,
    ) -> Result<Vec<Complaint>, StoreError> {
        let inner = self.inner.read().await;
        let mut complaints: Vec<Complaint> = inner
            .complaints
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        complaints.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(complaints)
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .notifications
            .insert(notification.id, notification.clone());
        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> Result<Vec<Notification>, StoreError> {
        let inner = self.inner.read().await;
        let mut list: Vec<Notification> = inner
            .notifications
            .values()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.read))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn mark_notification_read(&self, user_id: Uuid, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        match inner.notifications.get_mut(&id) {
            Some(n) if n.user_id == user_id => {
                n.read = true;
                Ok(())
            }
            _ => Err(StoreError::not_found("notification")),
        }
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().await;
        let mut count = 0;
        for n in inner.notifications.values_mut() {
            if n.user_id == user_id && !n.read {
                n.read = true;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use imitra_core::{
        Category, Classification, ClassificationMethod, Location, NewComplaint, NewUser, Priority,
        Role, SlaPolicy, Status,
    };

    pub(crate) fn citizen(email: &str, phone: &str) -> User {
        let input = NewUser {
            name: "Asha Rao".into(),
            email: email.into(),
            phone: phone.into(),
            ..NewUser::default()
        };
        User::new(input, "hash".into(), Utc::now()).unwrap()
    }

    pub(crate) fn complaint(citizen_id: Uuid, category: Category, minutes: i64) -> Complaint {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes);
        let input = NewComplaint {
            citizen_id,
            title: "Streetlight not working".into(),
            description: "The streetlight outside house 14 has been off all week.".into(),
            location: Location {
                address: "14 Lake View Road".into(),
                zone: "North".into(),
                ward: None,
                latitude: None,
                longitude: None,
            },
            attachments: Vec::new(),
        };
        let classification = Classification::new(
            category,
            category.department(),
            Priority::Medium,
            0.6,
            ClassificationMethod::Keyword,
        );
        Complaint::new(input, classification, SlaPolicy::PriorityOnly, 1, at).unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_and_phone_rejected() {
        let store = MemoryStore::new();
        store
            .insert_user(&citizen("a@example.com", "9876543210"))
            .await
            .unwrap();

        let err = store
            .insert_user(&citizen("a@example.com", "9000000000"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "email" }));

        let err = store
            .insert_user(&citizen("b@example.com", "9876543210"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "phone" }));
    }

    #[tokio::test]
    async fn update_keeps_own_email() {
        let store = MemoryStore::new();
        let mut u = citizen("a@example.com", "9876543210");
        store.insert_user(&u).await.unwrap();
        u.name = "Asha R.".into();
        store.update_user(&u).await.unwrap();
        let found = store.find_user_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(found.name, "Asha R.");
    }

    #[tokio::test]
    async fn sequences_are_per_year() {
        let store = MemoryStore::new();
        assert_eq!(store.next_complaint_sequence(2026).await.unwrap(), 1);
        assert_eq!(store.next_complaint_sequence(2026).await.unwrap(), 2);
        assert_eq!(store.next_complaint_sequence(2027).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn complaints_filtered_and_newest_first() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let older = complaint(owner, Category::StreetLighting, 0);
        let newer = complaint(owner, Category::Roads, 30);
        let other = complaint(Uuid::new_v4(), Category::Roads, 60);
        for c in [&older, &newer, &other] {
            store.insert_complaint(c).await.unwrap();
        }

        let mine = store
            .list_complaints(&ComplaintFilter {
                citizen_id: Some(owner),
                ..ComplaintFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id, newer.id);

        let roads = store
            .list_complaints(&ComplaintFilter {
                category: Some(Category::Roads),
                status: Some(Status::New),
                ..ComplaintFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(roads.len(), 2);
    }

    #[tokio::test]
    async fn update_missing_complaint_is_not_found() {
        let store = MemoryStore::new();
        let c = complaint(Uuid::new_v4(), Category::Parks, 0);
        assert!(matches!(
            store.update_complaint(&c).await,
            Err(StoreError::NotFound { entity: "complaint" })
        ));
    }

    #[tokio::test]
    async fn stale_complaint_write_is_refused() {
        let store = MemoryStore::new();
        let c = complaint(Uuid::new_v4(), Category::Parks, 0);
        store.insert_complaint(&c).await.unwrap();

        let mut first = store.get_complaint(c.id).await.unwrap();
        let mut second = first.clone();
        first.title = "Broken swing in the park".into();
        store.update_complaint(&first).await.unwrap();

        second.title = "Bench missing".into();
        assert!(matches!(
            store.update_complaint(&second).await,
            Err(StoreError::Conflict { entity: "complaint" })
        ));
        let stored = store.get_complaint(c.id).await.unwrap();
        assert_eq!(stored.title, "Broken swing in the park");
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn notifications_are_owner_scoped() {
        let store = MemoryStore::new();
        let me = Uuid::new_v4();
        let n = Notification::new(me, "new_complaint", "Filed", "IMT-2026-000001", None, Utc::now());
        store.insert_notification(&n).await.unwrap();
        store
            .insert_notification(&Notification::new(me, "new_remark", "Remark", "x", None, Utc::now()))
            .await
            .unwrap();

        assert!(store.mark_notification_read(Uuid::new_v4(), n.id).await.is_err());
        store.mark_notification_read(me, n.id).await.unwrap();
        assert_eq!(store.list_notifications(me, true).await.unwrap().len(), 1);
        assert_eq!(store.mark_all_notifications_read(me).await.unwrap(), 1);
        assert!(store.list_notifications(me, true).await.unwrap().is_empty());
        assert_eq!(store.list_notifications(me, false).await.unwrap().len(), 2);
    }

    #[test]
    fn officer_scope_is_department() {
        let actor = imitra_core::Actor::new(
            Uuid::new_v4(),
            Role::Officer,
            Some(imitra_core::Department::Electricity),
        );
        let filter = ComplaintFilter::visible_to(&actor);
        let c = complaint(Uuid::new_v4(), Category::StreetLighting, 0);
        assert!(filter.matches(&c));
        let c = complaint(Uuid::new_v4(), Category::Roads, 0);
        assert!(!filter.matches(&c));
    }
}
