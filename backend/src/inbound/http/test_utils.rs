//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};

use crate::domain::ports::{
    AuthUser, DisabledPaymentGateway, EmptyContentSource, FixtureModelClient, ModelClient,
    OfflineDocumentFetcher, ProfileRepository,
};
use crate::domain::{Profile, UserId};
use crate::inbound::http::state::{HttpState, HttpStatePorts, HttpStateSettings};
use crate::outbound::memory::{
    InMemoryAnnouncementRepository, InMemoryAuthGateway, InMemoryCommunityRepository,
    InMemoryExamCalendarRepository, InMemoryGroupRepository, InMemoryProfileRepository, InMemoryResultRepository,
    InMemorySchoolRepository, InMemorySubjectRepository,
};
use crate::outbound::rate_limit::InMemoryRateLimiter;

/// HTTP state over in-memory adapters, with handles to seed identities.
pub struct TestContext {
    pub auth: Arc<InMemoryAuthGateway>,
    pub profiles: Arc<InMemoryProfileRepository>,
    pub state: HttpState,
}

impl TestContext {
    /// Context backed by the canned model client.
    pub fn new() -> Self {
        Self::with_model(Arc::new(FixtureModelClient))
    }

    /// Context with a caller-supplied model client.
    pub fn with_model(model: Arc<dyn ModelClient>) -> Self {
        Self::customised(|ports, _| ports.model = model)
    }

    /// Context whose ports and settings are adjusted before the state is built.
    pub fn customised(adjust: impl FnOnce(&mut HttpStatePorts, &mut HttpStateSettings)) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
        let auth = Arc::new(InMemoryAuthGateway::default());
        let profiles = Arc::new(InMemoryProfileRepository::default());
        let mut ports = HttpStatePorts {
            auth: auth.clone(),
            profiles: profiles.clone(),
            results: Arc::new(InMemoryResultRepository::new(clock.clone())),
            groups: Arc::new(InMemoryGroupRepository::default()),
            announcements: Arc::new(InMemoryAnnouncementRepository::default()),
            community: Arc::new(InMemoryCommunityRepository::default()),
            subjects: Arc::new(InMemorySubjectRepository::default()),
            school: Arc::new(InMemorySchoolRepository::default()),
            exam_calendar: Arc::new(InMemoryExamCalendarRepository::default()),
            documents: Arc::new(OfflineDocumentFetcher),
            rate_limiter: Arc::new(InMemoryRateLimiter::new(clock.clone())),
            model: Arc::new(FixtureModelClient),
            payments: Arc::new(DisabledPaymentGateway),
            content: Arc::new(EmptyContentSource),
            clock,
        };
        let mut settings = HttpStateSettings::default();
        adjust(&mut ports, &mut settings);
        let state = HttpState::new(ports, settings);
        Self {
            auth,
            profiles,
            state,
        }
    }

    /// State wrapped for `App::app_data`.
    pub fn data(&self) -> web::Data<HttpState> {
        web::Data::new(self.state.clone())
    }

    /// Register a user and return a bearer token for them.
    pub async fn sign_up(&self, email: &str) -> (String, UserId) {
        let user = AuthUser {
            id: UserId::random(),
            email: Some(email.to_owned()),
        };
        (self.auth.issue_token(&user), user.id)
    }

    /// Store a profile for a previously signed-up user.
    pub async fn seed_profile(&self, profile: Profile) {
        self.profiles
            .insert(&profile)
            .await
            .expect("seeding a profile succeeds");
    }
}
