//! Process-local adapters used when no database or identity provider is
//! configured.
//!
//! State lives behind a `Mutex` per store and disappears on restart. The
//! stores honour the same ordering and uniqueness rules as the Diesel
//! repositories so handlers behave identically in development and tests.

use std::sync::{Mutex, MutexGuard, PoisonError};

mod auth;
mod community;
mod exams;
mod groups;
mod profiles;
mod results;
mod school;

pub use auth::InMemoryAuthGateway;
pub use community::{InMemoryAnnouncementRepository, InMemoryCommunityRepository};
pub use exams::InMemoryExamCalendarRepository;
pub use groups::InMemoryGroupRepository;
pub use profiles::InMemoryProfileRepository;
pub use results::InMemoryResultRepository;
pub use school::{InMemorySchoolRepository, InMemorySubjectRepository};

/// Lock a store, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
