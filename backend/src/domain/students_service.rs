//! Teacher-side student provisioning.
//!
//! Students sign in with a login id rather than an email address. Each one
//! gets a synthetic address under a configured domain, a confirmed identity,
//! and a profile. If the profile cannot be written the identity is deleted
//! again so the login id can be reused.

use std::sync::Arc;

use mockable::Clock;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::domain::ports::{AuthGateway, AuthGatewayError, ProfileRepository, RepositoryError};
use crate::domain::{Error, Profile, Role, Viewer};

/// Shortest accepted student password.
pub const MIN_PASSWORD_CHARS: usize = 6;
const DUPLICATE_LOGIN_MESSAGE: &str = "この生徒IDはすでに使用されています";

fn field_error(field: &str, code: &str, message: impl Into<String>) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field,
        "code": code,
    }))
}

fn required(field: &str, value: &str) -> Result<String, Error> {
    let value = value.trim();
    if value.is_empty() {
        return Err(field_error(
            field,
            "missing_field",
            format!("missing required field: {field}"),
        ));
    }
    Ok(value.to_owned())
}

fn map_auth_error(err: AuthGatewayError) -> Error {
    match err {
        AuthGatewayError::Duplicate { .. } => {
            field_error("loginId", "duplicate", DUPLICATE_LOGIN_MESSAGE)
        }
        AuthGatewayError::Unavailable { message } => {
            warn!(%message, "identity provider unavailable");
            Error::service_unavailable("identity provider is unavailable")
        }
        AuthGatewayError::Rejected { message } => Error::invalid_request(message),
    }
}

/// Teacher input for a new student.
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub full_name: String,
    pub login_id: String,
    pub password: Zeroizing<String>,
    pub grade: Option<String>,
    pub school_name: Option<String>,
    pub cram_school_id: Option<Uuid>,
}

/// Student provisioning and listing.
#[derive(Clone)]
pub struct StudentService {
    auth: Arc<dyn AuthGateway>,
    profiles: Arc<dyn ProfileRepository>,
    clock: Arc<dyn Clock>,
    email_domain: String,
}

impl StudentService {
    /// `email_domain` is appended to login ids, e.g. `@student.example.jp`.
    pub fn new(
        auth: Arc<dyn AuthGateway>,
        profiles: Arc<dyn ProfileRepository>,
        clock: Arc<dyn Clock>,
        email_domain: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            profiles,
            clock,
            email_domain: email_domain.into(),
        }
    }

    /// Create the identity and profile for a student.
    pub async fn provision(&self, viewer: &Viewer, draft: NewStudent) -> Result<Profile, Error> {
        viewer.require_staff()?;
        let full_name = required("fullName", &draft.full_name)?;
        let login_id = required("loginId", &draft.login_id)?;
        if draft.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(field_error(
                "password",
                "too_short",
                format!("password must be at least {MIN_PASSWORD_CHARS} characters"),
            ));
        }
        if self.profiles.find_by_login_id(&login_id).await?.is_some() {
            return Err(field_error("loginId", "duplicate", DUPLICATE_LOGIN_MESSAGE));
        }

        let email = format!("{login_id}{}", self.email_domain);
        let identity = self
            .auth
            .create_user(&email, &draft.password)
            .await
            .map_err(map_auth_error)?;

        let mut profile = Profile::new(identity.id, Role::Student, self.clock.utc());
        profile.full_name = Some(full_name);
        profile.login_id = Some(login_id);
        profile.grade = draft.grade.filter(|g| !g.trim().is_empty());
        profile.school_name = draft.school_name.filter(|s| !s.trim().is_empty());
        profile.cram_school_id = draft.cram_school_id;

        if let Err(err) = self.profiles.insert(&profile).await {
            self.roll_back_identity(&profile).await;
            return Err(match err {
                RepositoryError::Duplicate { .. } => {
                    field_error("loginId", "duplicate", DUPLICATE_LOGIN_MESSAGE)
                }
                other => other.into(),
            });
        }
        info!(student_id = %profile.id, "student provisioned");
        Ok(profile)
    }

    /// Students of a cram school ordered by name. No school, no students.
    pub async fn list(
        &self,
        viewer: &Viewer,
        cram_school_id: Option<Uuid>,
    ) -> Result<Vec<Profile>, Error> {
        viewer.require_staff()?;
        match cram_school_id {
            Some(id) => Ok(self.profiles.list_students(&id).await?),
            None => Ok(Vec::new()),
        }
    }

    async fn roll_back_identity(&self, profile: &Profile) {
        match self.auth.delete_user(&profile.id).await {
            Ok(()) => warn!(student_id = %profile.id, "profile insert failed; identity removed"),
            Err(err) => error!(
                student_id = %profile.id,
                error = %err,
                "profile insert failed and identity could not be removed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{AuthUser, MockAuthGateway, MockProfileRepository};
    use crate::domain::{ErrorCode, UserId};
    use chrono::Utc;
    use mockable::MockClock;
    use rstest::{fixture, rstest};

    fn clock() -> Arc<dyn Clock> {
        let mut clock = MockClock::new();
        clock.expect_utc().return_const(Utc::now());
        Arc::new(clock)
    }

    fn teacher() -> Viewer {
        let id = UserId::random();
        Viewer {
            user_id: id,
            email: None,
            profile: Some(Profile::new(id, Role::Teacher, Utc::now())),
        }
    }

    #[fixture]
    fn draft() -> NewStudent {
        NewStudent {
            full_name: "佐藤 花子".to_owned(),
            login_id: "hanako01".to_owned(),
            password: Zeroizing::new("secret1".to_owned()),
            grade: Some("中2".to_owned()),
            school_name: None,
            cram_school_id: Some(Uuid::new_v4()),
        }
    }

    fn service(auth: MockAuthGateway, profiles: MockProfileRepository) -> StudentService {
        StudentService::new(
            Arc::new(auth),
            Arc::new(profiles),
            clock(),
            "@student.edulens.jp",
        )
    }

    #[rstest]
    #[tokio::test]
    async fn provisioning_uses_synthetic_email(draft: NewStudent) {
        let new_id = UserId::random();
        let mut auth = MockAuthGateway::new();
        auth.expect_create_user()
            .withf(|email, _| email == "hanako01@student.edulens.jp")
            .returning(move |email, _| {
                Ok(AuthUser {
                    id: new_id,
                    email: Some(email.to_owned()),
                })
            });
        let mut profiles = MockProfileRepository::new();
        profiles.expect_find_by_login_id().returning(|_| Ok(None));
        profiles.expect_insert().times(1).returning(|_| Ok(()));

        let profile = service(auth, profiles)
            .provision(&teacher(), draft)
            .await
            .expect("student created");

        assert_eq!(profile.id, new_id);
        assert_eq!(profile.role, Role::Student);
        assert_eq!(profile.login_id.as_deref(), Some("hanako01"));
    }

    #[rstest]
    #[tokio::test]
    async fn short_password_is_rejected(mut draft: NewStudent) {
        draft.password = Zeroizing::new("12345".to_owned());
        let mut auth = MockAuthGateway::new();
        auth.expect_create_user().never();

        let error = service(auth, MockProfileRepository::new())
            .provision(&teacher(), draft)
            .await
            .expect_err("too short");

        assert_eq!(error.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[tokio::test]
    async fn taken_login_id_is_a_bad_request(draft: NewStudent) {
        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_find_by_login_id()
            .returning(|_| Ok(Some(Profile::new(UserId::random(), Role::Student, Utc::now()))));
        let mut auth = MockAuthGateway::new();
        auth.expect_create_user().never();

        let error = service(auth, profiles)
            .provision(&teacher(), draft)
            .await
            .expect_err("duplicate");

        assert_eq!(error.code(), ErrorCode::InvalidRequest);
        assert_eq!(error.message(), DUPLICATE_LOGIN_MESSAGE);
    }

    #[rstest]
    #[tokio::test]
    async fn failed_profile_insert_removes_identity(draft: NewStudent) {
        let new_id = UserId::random();
        let mut auth = MockAuthGateway::new();
        auth.expect_create_user().returning(move |_, _| {
            Ok(AuthUser {
                id: new_id,
                email: None,
            })
        });
        auth.expect_delete_user()
            .withf(move |id| *id == new_id)
            .times(1)
            .returning(|_| Ok(()));
        let mut profiles = MockProfileRepository::new();
        profiles.expect_find_by_login_id().returning(|_| Ok(None));
        profiles
            .expect_insert()
            .returning(|_| Err(RepositoryError::query("constraint")));

        let error = service(auth, profiles)
            .provision(&teacher(), draft)
            .await
            .expect_err("insert failed");

        assert_eq!(error.code(), ErrorCode::InternalError);
    }

    #[tokio::test]
    async fn listing_without_school_is_empty() {
        let mut profiles = MockProfileRepository::new();
        profiles.expect_list_students().never();

        let students = service(MockAuthGateway::new(), profiles)
            .list(&teacher(), None)
            .await
            .expect("empty");

        assert!(students.is_empty());
    }
}
