//! Domain primitives, aggregates, and use-case services.
//!
//! Purpose: Define strongly typed entities used by the API and persistence
//! layers, plus the services that orchestrate them through the driven ports
//! in [`ports`]. Nothing in here knows about HTTP, SQL, or provider wire
//! formats.
//!
//! Public surface:
//! - Error (alias to `error::Error`) — API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`) — stable error identifier.
//! - UserId (alias to `user::UserId`) — identity issued by the auth provider.
//! - Profile, Viewer, PlanTier — who is calling and what they may do.

pub mod announcements;
pub mod announcements_service;
pub mod billing_service;
pub mod chat;
pub mod community;
pub mod community_service;
pub mod content_service;
mod error;
pub mod exam;
pub mod exam_calendar;
pub mod exam_calendar_service;
pub mod exam_import;
pub mod grading;
pub mod groups;
pub mod groups_service;
pub mod ports;
mod profile;
pub mod profile_service;
pub mod quota;
pub mod results;
pub mod results_service;
pub mod review_service;
pub mod school;
pub mod school_service;
pub mod students_service;
pub mod textbook;
mod trace_id;
pub mod usage;
mod user;
pub mod weak_words;

pub use self::announcements_service::AnnouncementService;
pub use self::billing_service::BillingService;
pub use self::chat::ChatService;
pub use self::community_service::CommunityService;
pub use self::content_service::ContentService;
pub use self::error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use self::exam_calendar_service::ExamCalendarService;
pub use self::exam_import::ExamImportService;
pub use self::grading::GradingService;
pub use self::groups_service::GroupService;
pub use self::profile::{
    LoginStreak, PlanTier, Profile, ProfileUpdate, Role, UnknownRole, Viewer, next_login_streak,
    tokyo_date,
};
pub use self::profile_service::ProfileService;
pub use self::quota::QuotaService;
pub use self::results_service::ResultsService;
pub use self::review_service::ReviewService;
pub use self::school_service::SchoolService;
pub use self::students_service::StudentService;
pub use self::trace_id::TraceId;
pub use self::usage::UsageRecorder;
pub use self::user::{UserId, UserValidationError};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use edulens::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
