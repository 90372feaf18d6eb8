//! In-memory profile store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::ports::{ProfileRepository, RepositoryError};
use crate::domain::{LoginStreak, Profile, ProfileUpdate, UserId};

use super::lock;

/// Profiles keyed by user id.
#[derive(Debug, Default)]
pub struct InMemoryProfileRepository {
    profiles: Mutex<HashMap<UserId, Profile>>,
}

impl InMemoryProfileRepository {
    /// Store seeded with `profiles`.
    pub fn with_profiles(profiles: impl IntoIterator<Item = Profile>) -> Self {
        let profiles = profiles
            .into_iter()
            .map(|profile| (profile.id, profile))
            .collect();
        Self {
            profiles: Mutex::new(profiles),
        }
    }

    fn modify(&self, id: &UserId, apply: impl FnOnce(&mut Profile)) {
        if let Some(profile) = lock(&self.profiles).get_mut(id) {
            apply(profile);
        }
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn find(&self, id: &UserId) -> Result<Option<Profile>, RepositoryError> {
        Ok(lock(&self.profiles).get(id).cloned())
    }

    async fn find_by_login_id(&self, login_id: &str) -> Result<Option<Profile>, RepositoryError> {
        Ok(lock(&self.profiles)
            .values()
            .find(|profile| profile.login_id.as_deref() == Some(login_id))
            .cloned())
    }

    async fn find_many(&self, ids: &[UserId]) -> Result<Vec<Profile>, RepositoryError> {
        let profiles = lock(&self.profiles);
        Ok(ids.iter().filter_map(|id| profiles.get(id).cloned()).collect())
    }

    async fn insert(&self, profile: &Profile) -> Result<(), RepositoryError> {
        let mut profiles = lock(&self.profiles);
        if profiles.contains_key(&profile.id) {
            return Err(RepositoryError::duplicate("profile already exists"));
        }
        if let Some(login_id) = &profile.login_id
            && profiles
                .values()
                .any(|other| other.login_id.as_ref() == Some(login_id))
        {
            return Err(RepositoryError::duplicate("login id is taken"));
        }
        profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn update_details(
        &self,
        id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<Option<Profile>, RepositoryError> {
        let mut profiles = lock(&self.profiles);
        let Some(profile) = profiles.get_mut(id) else {
            return Ok(None);
        };
        if let Some(full_name) = &update.full_name {
            profile.full_name = Some(full_name.clone());
        }
        if let Some(grade) = &update.grade {
            profile.grade = Some(grade.clone());
        }
        if let Some(school_name) = &update.school_name {
            profile.school_name = Some(school_name.clone());
        }
        Ok(Some(profile.clone()))
    }

    async fn increment_writing_checks(&self, id: &UserId) -> Result<(), RepositoryError> {
        self.modify(id, |profile| {
            profile.total_writing_checks = profile.total_writing_checks.saturating_add(1);
        });
        Ok(())
    }

    async fn increment_test_count(&self, id: &UserId) -> Result<(), RepositoryError> {
        self.modify(id, |profile| {
            profile.test_count = profile.test_count.saturating_add(1);
        });
        Ok(())
    }

    async fn record_login(
        &self,
        id: &UserId,
        streak: &LoginStreak,
    ) -> Result<(), RepositoryError> {
        self.modify(id, |profile| {
            profile.consecutive_login_days = streak.consecutive_days;
            profile.last_login_at = Some(streak.last_login_at);
        });
        Ok(())
    }

    async fn activate_subscription(
        &self,
        id: &UserId,
        customer_id: Option<String>,
        subscription_id: Option<String>,
    ) -> Result<bool, RepositoryError> {
        let mut profiles = lock(&self.profiles);
        let Some(profile) = profiles.get_mut(id) else {
            return Ok(false);
        };
        profile.is_pro = true;
        if customer_id.is_some() {
            profile.stripe_customer_id = customer_id;
        }
        if subscription_id.is_some() {
            profile.stripe_subscription_id = subscription_id;
        }
        Ok(true)
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<u64, RepositoryError> {
        let mut changed = 0;
        for profile in lock(&self.profiles).values_mut() {
            if profile.stripe_subscription_id.as_deref() == Some(subscription_id) {
                profile.is_pro = false;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn list_students(&self, cram_school_id: &Uuid) -> Result<Vec<Profile>, RepositoryError> {
        let mut students: Vec<Profile> = lock(&self.profiles)
            .values()
            .filter(|profile| {
                profile.cram_school_id.as_ref() == Some(cram_school_id)
                    && profile.role == crate::domain::Role::Student
            })
            .cloned()
            .collect();
        students.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(students)
    }
}
