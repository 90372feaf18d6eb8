//! Own-profile reads, edits, and activity counters.

use std::sync::Arc;

use mockable::Clock;
use serde_json::json;
use tracing::{debug, info};

use crate::domain::ports::{ProfileRepository, RepositoryError};
use crate::domain::{
    Error, LoginStreak, Profile, ProfileUpdate, Role, UserId, Viewer, next_login_streak,
};

const NAME_MAX_CHARS: usize = 50;

fn invalid_field(field: &str, message: &str) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field,
        "code": "invalid_value",
    }))
}

fn trimmed(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim().to_owned())
}

/// Profile use-cases for the signed-in caller.
#[derive(Clone)]
pub struct ProfileService {
    profiles: Arc<dyn ProfileRepository>,
    clock: Arc<dyn Clock>,
}

impl ProfileService {
    pub fn new(profiles: Arc<dyn ProfileRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { profiles, clock }
    }

    /// The caller's profile, created with defaults on first use.
    pub async fn me(&self, viewer: &Viewer) -> Result<Profile, Error> {
        if let Some(profile) = &viewer.profile {
            return Ok(profile.clone());
        }
        let profile = Profile::new(viewer.user_id, Role::Student, self.clock.utc());
        match self.profiles.insert(&profile).await {
            Ok(()) => {
                info!(user_id = %viewer.user_id, "profile created on first use");
                Ok(profile)
            }
            // Another request created it first.
            Err(RepositoryError::Duplicate { .. }) => self
                .profiles
                .find(&viewer.user_id)
                .await?
                .ok_or_else(|| Error::internal("profile vanished after insert conflict")),
            Err(err) => Err(err.into()),
        }
    }

    /// Edit name, grade, or school.
    pub async fn update(&self, viewer: &Viewer, update: &ProfileUpdate) -> Result<Profile, Error> {
        let update = ProfileUpdate {
            full_name: trimmed(update.full_name.as_ref()),
            grade: trimmed(update.grade.as_ref()),
            school_name: trimmed(update.school_name.as_ref()),
        };
        if update.is_empty() {
            return Err(Error::invalid_request("no profile fields to update"));
        }
        if let Some(name) = &update.full_name {
            if name.is_empty() {
                return Err(invalid_field("fullName", "fullName must not be empty"));
            }
            if name.chars().count() > NAME_MAX_CHARS {
                return Err(invalid_field("fullName", "fullName is too long"));
            }
        }

        self.me(viewer).await?;
        self.profiles
            .update_details(&viewer.user_id, &update)
            .await?
            .ok_or_else(|| Error::not_found("profile not found"))
    }

    /// Record today's login and return the streak.
    pub async fn record_login(&self, viewer: &Viewer) -> Result<LoginStreak, Error> {
        let profile = self.me(viewer).await?;
        let streak = next_login_streak(
            profile.last_login_at,
            profile.consecutive_login_days,
            self.clock.utc(),
        );
        if streak.advanced {
            self.profiles.record_login(&profile.id, &streak).await?;
            debug!(user_id = %profile.id, days = streak.consecutive_days, "login streak recorded");
        }
        Ok(streak)
    }

    /// Count a quiz the caller started.
    pub async fn record_test_started(&self, user_id: &UserId) -> Result<(), Error> {
        Ok(self.profiles.increment_test_count(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::MockProfileRepository;
    use chrono::{DateTime, TimeZone, Utc};
    use mockable::MockClock;
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 2, 1, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn clock() -> Arc<dyn Clock> {
        let mut clock = MockClock::new();
        clock.expect_utc().return_const(now());
        Arc::new(clock)
    }

    fn viewer_with(profile: Option<Profile>) -> Viewer {
        Viewer {
            user_id: profile.as_ref().map_or_else(UserId::random, |p| p.id),
            email: None,
            profile,
        }
    }

    #[tokio::test]
    async fn missing_profile_is_created_on_first_read() {
        let mut repo = MockProfileRepository::new();
        repo.expect_insert().times(1).returning(|_| Ok(()));
        let service = ProfileService::new(Arc::new(repo), clock());

        let profile = service
            .me(&viewer_with(None))
            .await
            .expect("profile created");

        assert_eq!(profile.role, Role::Student);
        assert_eq!(profile.created_at, now());
    }

    #[tokio::test]
    async fn login_on_the_next_day_extends_the_streak() {
        let mut profile = Profile::new(UserId::random(), Role::Student, now());
        profile.consecutive_login_days = 6;
        // 1 June 10:00 JST.
        profile.last_login_at = Utc.with_ymd_and_hms(2026, 6, 1, 1, 0, 0).single();
        let mut repo = MockProfileRepository::new();
        repo.expect_record_login()
            .withf(|_, streak| streak.consecutive_days == 7)
            .times(1)
            .returning(|_, _| Ok(()));
        let service = ProfileService::new(Arc::new(repo), clock());

        let streak = service
            .record_login(&viewer_with(Some(profile)))
            .await
            .expect("login recorded");

        assert!(streak.advanced);
    }

    #[rstest]
    #[case::nothing(ProfileUpdate::default())]
    #[case::blank_name(ProfileUpdate { full_name: Some("  ".to_owned()), ..ProfileUpdate::default() })]
    #[tokio::test]
    async fn unusable_updates_are_rejected(#[case] update: ProfileUpdate) {
        let mut repo = MockProfileRepository::new();
        repo.expect_update_details().never();
        let service = ProfileService::new(Arc::new(repo), clock());

        let error = service
            .update(&viewer_with(None), &update)
            .await
            .expect_err("rejected");

        assert_eq!(error.code(), ErrorCode::InvalidRequest);
    }
}
