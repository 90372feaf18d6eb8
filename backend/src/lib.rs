//! EduLens backend library.
//!
//! Layout follows ports and adapters: [`domain`] holds entities, services,
//! and the driven ports; [`inbound`] turns HTTP requests into service calls;
//! [`outbound`] implements the ports against Postgres, Redis, and the
//! external providers.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
