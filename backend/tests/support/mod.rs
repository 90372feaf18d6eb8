//! Shared helpers for backend integration tests.
//!
//! Integration tests compile as separate crates, so the crate-private test
//! context is unavailable here. [`TestApp`] rebuilds the same wiring from the
//! public in-memory adapters and mounts the full `/api` surface.

use std::sync::Arc;

use actix_web::{App, web};
use edulens::Trace;
use edulens::domain::UserId;
use edulens::domain::ports::{
    AuthUser, DisabledPaymentGateway, EmptyContentSource, FixtureModelClient,
    OfflineDocumentFetcher,
};
use edulens::inbound::http::configure_api;
use edulens::inbound::http::state::{HttpState, HttpStatePorts, HttpStateSettings};
use edulens::outbound::memory::{
    InMemoryAnnouncementRepository, InMemoryAuthGateway, InMemoryCommunityRepository,
    InMemoryExamCalendarRepository, InMemoryGroupRepository, InMemoryProfileRepository,
    InMemoryResultRepository, InMemorySchoolRepository, InMemorySubjectRepository,
};
use edulens::outbound::rate_limit::InMemoryRateLimiter;
use mockable::{Clock, DefaultClock};

/// One-pixel-ish payload that decodes as base64.
pub const IMAGE: &str = "data:image/png;base64,aGVsbG8=";

/// Handler state over in-memory adapters plus the identity store that mints
/// bearer tokens.
pub struct TestApp {
    pub auth: Arc<InMemoryAuthGateway>,
    pub state: web::Data<HttpState>,
}

impl TestApp {
    pub fn new() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
        let auth = Arc::new(InMemoryAuthGateway::default());
        let ports = HttpStatePorts {
            auth: auth.clone(),
            profiles: Arc::new(InMemoryProfileRepository::default()),
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
        let state = HttpState::new(ports, HttpStateSettings::default());
        Self {
            auth,
            state: web::Data::new(state),
        }
    }

    /// Register a user and return an `Authorization` header pair for them.
    pub fn sign_in(&self, email: &str) -> (&'static str, String) {
        let user = AuthUser {
            id: UserId::random(),
            email: Some(email.to_owned()),
        };
        let token = self.auth.issue_token(&user);
        ("authorization", format!("Bearer {token}"))
    }

    /// Application factory with the full `/api` scope and trace middleware.
    pub fn app(
        &self,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        > + use<>,
    > {
        App::new()
            .app_data(self.state.clone())
            .wrap(Trace)
            .service(web::scope("/api").configure(configure_api))
    }
}
