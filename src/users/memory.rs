use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use super::{
    repo_types::{NewUser, User},
    store::{StoreError, UserStore},
};

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    next_id: i64,
}

impl Inner {
    fn by_id_mut(&mut self, id: i64) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }
}

fn has_code(user: &User) -> bool {
    user.referral_code.as_deref().is_some_and(|c| !c.is_empty())
}

/// Process-local store. Every operation runs under one lock, which gives the
/// same check-and-write atomicity as the database constraints.
#[derive(Default)]
pub struct InMemoryUserStore {
    inner: Mutex<Inner>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Database("in-memory store lock poisoned".into()))
    }

    fn find<F>(&self, pred: F) -> Result<User, StoreError>
    where
        F: Fn(&User) -> bool,
    {
        self.lock()?
            .users
            .iter()
            .find(|u| pred(u))
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.find(|u| u.email == email)
    }

    async fn find_by_id(&self, id: i64) -> Result<User, StoreError> {
        self.find(|u| u.id == id)
    }

    async fn find_by_referral_code(&self, code: &str) -> Result<User, StoreError> {
        self.find(|u| has_code(u) && u.referral_code.as_deref() == Some(code))
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.lock()?;
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        if let Some(referrer) = user.referrer_id {
            if !inner.users.iter().any(|u| u.id == referrer) {
                return Err(StoreError::UnknownReferrer);
            }
        }

        inner.next_id += 1;
        let stored = User {
            id: inner.next_id,
            email: user.email,
            password_hash: user.password_hash,
            referrer_id: user.referrer_id,
            referral_code: None,
            code_expiry: None,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.users.push(stored.clone());
        Ok(stored)
    }

    async fn set_referral_code(
        &self,
        user_id: i64,
        code: Option<&str>,
        expiry: Option<OffsetDateTime>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        match code {
            Some(code) => {
                let target = inner
                    .users
                    .iter()
                    .find(|u| u.id == user_id)
                    .ok_or(StoreError::NotFound)?;
                if has_code(target) {
                    return Err(StoreError::CodeAlreadyActive);
                }
                if inner
                    .users
                    .iter()
                    .any(|u| u.referral_code.as_deref() == Some(code))
                {
                    return Err(StoreError::DuplicateReferralCode);
                }
                let user = inner.by_id_mut(user_id).ok_or(StoreError::NotFound)?;
                user.referral_code = Some(code.to_string());
                user.code_expiry = expiry;
            }
            None => {
                let user = inner.by_id_mut(user_id).ok_or(StoreError::NotFound)?;
                if !has_code(user) {
                    return Err(StoreError::NoActiveCode);
                }
                user.referral_code = None;
                user.code_expiry = None;
            }
        }
        Ok(())
    }

    async fn list_referred_by(&self, referrer_id: i64) -> Result<Vec<User>, StoreError> {
        Ok(self
            .lock()?
            .users
            .iter()
            .filter(|u| u.referrer_id == Some(referrer_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_user(email: &str, referrer_id: Option<i64>) -> NewUser {
        NewUser {
            email: email.into(),
            password_hash: "hash".into(),
            referrer_id,
        }
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_rejects_duplicate_email() {
        let store = InMemoryUserStore::new();
        let a = store.insert(new_user("a@x.com", None)).await.unwrap();
        let b = store.insert(new_user("b@x.com", None)).await.unwrap();
        assert_ne!(a.id, b.id);

        let err = store.insert(new_user("a@x.com", None)).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn email_lookup_is_case_sensitive() {
        let store = InMemoryUserStore::new();
        store.insert(new_user("a@x.com", None)).await.unwrap();
        assert!(matches!(
            store.find_by_email("A@x.com").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn insert_rejects_unknown_referrer() {
        let store = InMemoryUserStore::new();
        let err = store.insert(new_user("a@x.com", Some(42))).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownReferrer));
    }

    #[tokio::test]
    async fn set_code_enforces_one_active_code_and_uniqueness() {
        let store = InMemoryUserStore::new();
        let a = store.insert(new_user("a@x.com", None)).await.unwrap();
        let b = store.insert(new_user("b@x.com", None)).await.unwrap();

        store.set_referral_code(a.id, Some("code-a"), None).await.unwrap();
        assert!(matches!(
            store.set_referral_code(a.id, Some("other"), None).await,
            Err(StoreError::CodeAlreadyActive)
        ));
        assert!(matches!(
            store.set_referral_code(b.id, Some("code-a"), None).await,
            Err(StoreError::DuplicateReferralCode)
        ));
        assert!(matches!(
            store.set_referral_code(999, Some("x"), None).await,
            Err(StoreError::NotFound)
        ));

        let found = store.find_by_referral_code("code-a").await.unwrap();
        assert_eq!(found.id, a.id);
    }

    #[tokio::test]
    async fn clear_code_requires_an_active_code() {
        let store = InMemoryUserStore::new();
        let a = store.insert(new_user("a@x.com", None)).await.unwrap();
        assert!(matches!(
            store.set_referral_code(a.id, None, None).await,
            Err(StoreError::NoActiveCode)
        ));

        store
            .set_referral_code(a.id, Some("abc"), Some(OffsetDateTime::now_utc()))
            .await
            .unwrap();
        store.set_referral_code(a.id, None, None).await.unwrap();

        let a = store.find_by_id(a.id).await.unwrap();
        assert!(a.referral_code.is_none());
        assert!(a.code_expiry.is_none());
        assert!(matches!(
            store.find_by_referral_code("abc").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn lists_only_direct_referrals() {
        let store = InMemoryUserStore::new();
        let a = store.insert(new_user("a@x.com", None)).await.unwrap();
        let b = store.insert(new_user("b@x.com", Some(a.id))).await.unwrap();
        store.insert(new_user("c@x.com", Some(b.id))).await.unwrap();
        store.insert(new_user("d@x.com", Some(a.id))).await.unwrap();

        let emails: Vec<_> = store
            .list_referred_by(a.id)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.email)
            .collect();
        assert_eq!(emails, vec!["b@x.com", "d@x.com"]);
        assert!(store.list_referred_by(999).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_admit_one_email() {
        let store = Arc::new(InMemoryUserStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.insert(new_user("race@x.com", None)).await.is_ok()
            }));
        }
        let mut wins = 0;
        for h in handles {
            if h.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }
}
