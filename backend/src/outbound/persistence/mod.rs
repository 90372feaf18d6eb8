//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Repository implementations here only translate between Diesel rows and
//! domain types. Row structs (`models.rs`) and the table definitions
//! (`schema.rs`) stay private to this module; every database failure is
//! mapped to a domain [`RepositoryError`](crate::domain::ports::RepositoryError).
//!
//! ```ignore
//! use edulens::outbound::persistence::{DbPool, PoolConfig, DieselResultRepository};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/edulens")).await?;
//! let results = DieselResultRepository::new(pool);
//! ```

mod diesel_announcement_repository;
mod diesel_community_repository;
mod diesel_exam_calendar_repository;
mod diesel_group_repository;
mod diesel_profile_repository;
mod diesel_result_repository;
mod diesel_school_repository;
mod error_mapping;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_announcement_repository::DieselAnnouncementRepository;
pub use diesel_community_repository::DieselCommunityRepository;
pub use diesel_exam_calendar_repository::DieselExamCalendarRepository;
pub use diesel_group_repository::DieselGroupRepository;
pub use diesel_profile_repository::DieselProfileRepository;
pub use diesel_result_repository::DieselResultRepository;
pub use diesel_school_repository::{DieselSchoolRepository, DieselSubjectRepository};
pub use migrations::{MigrationError, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
