//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL repositories using Diesel and `diesel-async`
//! - **memory**: process-local repositories and identities for development
//! - **rate_limit**: sliding-window limiters over Redis or memory
//! - **gemini**, **supabase**, **stripe**, **microcms**: reqwest clients for
//!   the model, identity, billing, and CMS providers
//! - **document_fetcher**: downloads exam guidelines for import
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod document_fetcher;
pub mod gemini;
pub(crate) mod http_support;
pub mod memory;
pub mod microcms;
pub mod persistence;
pub mod rate_limit;
pub mod stripe;
pub mod supabase;
