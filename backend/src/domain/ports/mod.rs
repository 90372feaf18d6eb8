//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (repositories, gateways, the model client) are implemented by
//! outbound adapters. Each port with an offline stand-in ships it here so the
//! server can start without external services.

mod macros;
pub(crate) use macros::define_port_error;

mod announcement_repository;
mod auth_gateway;
mod community_repository;
mod content_source;
mod document_fetcher;
mod exam_calendar_repository;
mod group_repository;
mod model_client;
mod payment_gateway;
mod profile_repository;
mod rate_limiter;
mod repository_error;
mod result_repository;
mod school_repository;

pub use announcement_repository::AnnouncementRepository;
#[cfg(test)]
pub use announcement_repository::MockAnnouncementRepository;
#[cfg(test)]
pub use auth_gateway::MockAuthGateway;
pub use auth_gateway::{AuthGateway, AuthGatewayError, AuthUser, FixtureAuthGateway};
pub use community_repository::CommunityRepository;
#[cfg(test)]
pub use community_repository::MockCommunityRepository;
#[cfg(test)]
pub use content_source::MockContentSource;
pub use content_source::{
    BlogPage, BlogPost, BlogQuery, Category, ContentSource, ContentSourceError,
    EmptyContentSource, Eyecatch,
};
#[cfg(test)]
pub use document_fetcher::MockDocumentFetcher;
pub use document_fetcher::{
    DocumentFetchError, DocumentFetcher, FetchedDocument, OfflineDocumentFetcher,
};
pub use exam_calendar_repository::ExamCalendarRepository;
#[cfg(test)]
pub use exam_calendar_repository::MockExamCalendarRepository;
pub use group_repository::GroupRepository;
#[cfg(test)]
pub use group_repository::MockGroupRepository;
#[cfg(test)]
pub use model_client::MockModelClient;
pub use model_client::{
    FixtureModelClient, InlineImage, ModelClient, ModelClientError, ModelPrompt, ModelTurn,
    TextStream, TurnRole,
};
#[cfg(test)]
pub use payment_gateway::MockPaymentGateway;
pub use payment_gateway::{
    BillingEvent, CheckoutRequest, DisabledPaymentGateway, PaymentGateway, PaymentGatewayError,
    RedirectSession,
};
#[cfg(test)]
pub use profile_repository::MockProfileRepository;
pub use profile_repository::ProfileRepository;
#[cfg(test)]
pub use rate_limiter::MockRateLimiter;
pub use rate_limiter::{RateLimitDecision, RateLimitRule, RateLimiter, RateLimiterError};
pub use repository_error::RepositoryError;
#[cfg(test)]
pub use result_repository::MockResultRepository;
pub use result_repository::ResultRepository;
#[cfg(test)]
pub use school_repository::{MockSchoolRepository, MockSubjectRepository};
pub use school_repository::{SchoolRepository, SubjectRepository};
