//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain services built over ports, and remain testable with the
//! in-memory adapters.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::content_service::CachePolicy;
use crate::domain::ports::{
    AnnouncementRepository, AuthGateway, CommunityRepository, ContentSource, DocumentFetcher,
    ExamCalendarRepository, GroupRepository, ModelClient, PaymentGateway, ProfileRepository,
    RateLimiter, ResultRepository, SchoolRepository, SubjectRepository,
};
use crate::domain::{
    AnnouncementService, BillingService, ChatService, CommunityService, ContentService,
    ExamCalendarService, ExamImportService, GradingService, GroupService, ProfileService,
    QuotaService, ResultsService, ReviewService, SchoolService, StudentService, UsageRecorder,
};

/// Parameter object bundling every port implementation the handlers need.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub auth: Arc<dyn AuthGateway>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub results: Arc<dyn ResultRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub announcements: Arc<dyn AnnouncementRepository>,
    pub community: Arc<dyn CommunityRepository>,
    pub subjects: Arc<dyn SubjectRepository>,
    pub school: Arc<dyn SchoolRepository>,
    pub exam_calendar: Arc<dyn ExamCalendarRepository>,
    pub documents: Arc<dyn DocumentFetcher>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub model: Arc<dyn ModelClient>,
    pub payments: Arc<dyn PaymentGateway>,
    pub content: Arc<dyn ContentSource>,
    pub clock: Arc<dyn Clock>,
}

/// Deployment values the services read.
#[derive(Debug, Clone)]
pub struct HttpStateSettings {
    /// Public base URL used in links and redirects.
    pub app_url: String,
    /// Suffix appended to a student's login id to form their email.
    pub student_email_domain: String,
    /// Shared secret for CMS cache revalidation.
    pub revalidate_secret: Option<String>,
    pub cache_policy: CachePolicy,
}

impl Default for HttpStateSettings {
    fn default() -> Self {
        Self {
            app_url: "https://mistap.jp".to_owned(),
            student_email_domain: "@student.edulens.jp".to_owned(),
            revalidate_secret: None,
            cache_policy: CachePolicy::default(),
        }
    }
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub auth: Arc<dyn AuthGateway>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub quota: QuotaService,
    pub usage: UsageRecorder,
    pub grading: GradingService,
    pub chat: ChatService,
    pub profile: ProfileService,
    pub results: ResultsService,
    pub review: ReviewService,
    pub groups: GroupService,
    pub announcements: AnnouncementService,
    pub community: CommunityService,
    pub school: SchoolService,
    pub students: StudentService,
    pub exam_calendar: ExamCalendarService,
    pub exam_import: ExamImportService,
    pub billing: BillingService,
    pub content: Arc<ContentService>,
}

impl HttpState {
    /// Build every service over `ports`.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use edulens::domain::ports::{
    ///     DisabledPaymentGateway, EmptyContentSource, FixtureAuthGateway, FixtureModelClient,
    ///     OfflineDocumentFetcher,
    /// };
    /// use edulens::inbound::http::state::{HttpState, HttpStatePorts, HttpStateSettings};
    /// use edulens::outbound::memory::{
    ///     InMemoryAnnouncementRepository, InMemoryCommunityRepository,
    ///     InMemoryExamCalendarRepository, InMemoryGroupRepository, InMemoryProfileRepository, InMemoryResultRepository, InMemorySchoolRepository,
    ///     InMemorySubjectRepository,
    /// };
    /// use edulens::outbound::rate_limit::InMemoryRateLimiter;
    /// use mockable::{Clock, DefaultClock};
    ///
    /// let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    /// let ports = HttpStatePorts {
    ///     auth: Arc::new(FixtureAuthGateway),
    ///     profiles: Arc::new(InMemoryProfileRepository::default()),
    ///     results: Arc::new(InMemoryResultRepository::new(clock.clone())),
    ///     groups: Arc::new(InMemoryGroupRepository::default()),
    ///     announcements: Arc::new(InMemoryAnnouncementRepository::default()),
    ///     community: Arc::new(InMemoryCommunityRepository::default()),
    ///     subjects: Arc::new(InMemorySubjectRepository::default()),
    ///     school: Arc::new(InMemorySchoolRepository::default()),
    ///     exam_calendar: Arc::new(InMemoryExamCalendarRepository::default()),
    ///     documents: Arc::new(OfflineDocumentFetcher),
    ///     rate_limiter: Arc::new(InMemoryRateLimiter::new(clock.clone())),
    ///     model: Arc::new(FixtureModelClient),
    ///     payments: Arc::new(DisabledPaymentGateway),
    ///     content: Arc::new(EmptyContentSource),
    ///     clock,
    /// };
    /// let state = HttpState::new(ports, HttpStateSettings::default());
    /// let _quota = state.quota.clone();
    /// ```
    pub fn new(ports: HttpStatePorts, settings: HttpStateSettings) -> Self {
        let HttpStatePorts {
            auth,
            profiles,
            results,
            groups,
            announcements,
            community,
            subjects,
            school,
            exam_calendar,
            documents,
            rate_limiter,
            model,
            payments,
            content,
            clock,
        } = ports;
        let HttpStateSettings {
            app_url,
            student_email_domain,
            revalidate_secret,
            cache_policy,
        } = settings;

        let quota = QuotaService::new(rate_limiter, app_url.clone());
        Self {
            usage: UsageRecorder::new(profiles.clone()),
            grading: GradingService::new(model.clone()),
            exam_import: ExamImportService::new(documents, model.clone()),
            chat: ChatService::new(model, quota.clone()),
            quota,
            profile: ProfileService::new(profiles.clone(), clock.clone()),
            results: ResultsService::new(results.clone()),
            review: ReviewService::new(results, profiles.clone(), clock.clone()),
            groups: GroupService::new(groups, profiles.clone(), clock.clone()),
            announcements: AnnouncementService::new(announcements, clock.clone()),
            community: CommunityService::new(community, profiles.clone(), clock.clone()),
            school: SchoolService::new(school, subjects, profiles.clone(), clock.clone()),
            exam_calendar: ExamCalendarService::new(exam_calendar, clock.clone()),
            students: StudentService::new(
                auth.clone(),
                profiles.clone(),
                clock.clone(),
                student_email_domain,
            ),
            billing: BillingService::new(payments, profiles.clone(), app_url),
            content: Arc::new(ContentService::new(
                content,
                clock,
                cache_policy,
                revalidate_secret,
            )),
            auth,
            profiles,
        }
    }
}
