//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every HTTP endpoint, the error envelope schema, and
//! the bearer security scheme. Public endpoints opt out with `security([])`
//! on their path attribute.
//!
//! The generated document is served by Swagger UI in debug builds and
//! exported via `cargo run --bin openapi-dump` for external tooling.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{Error, ErrorCode};
use crate::inbound::http::{
    analyze, announcements, billing, blogs, chat, community, exams, groups, health, profile,
    results, review, school, teacher,
};

/// Enrich the generated document with the bearer token scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "BearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .description(Some("Access token issued by the identity provider."))
                    .build(),
            ),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "EduLens backend API",
        description = "Essay grading, vocabulary review, study groups, school records, exam calendars, and billing."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("BearerAuth" = [])),
    paths(
        health::ready,
        health::live,
        analyze::analyze_basic,
        analyze::analyze_detail,
        analyze::analyze_full,
        chat::chat,
        profile::get_profile,
        profile::update_profile,
        profile::record_login,
        profile::record_test_started,
        results::save_result,
        results::list_results,
        review::weak_words,
        review::create_review_test,
        groups::create_group,
        groups::list_groups,
        groups::join_group,
        groups::overall_ranking,
        groups::rename_group,
        groups::group_ranking,
        announcements::list_active,
        announcements::list_all,
        announcements::create,
        announcements::update,
        announcements::remove,
        community::list_threads,
        community::get_thread,
        community::create_post,
        community::delete_post,
        school::list_subjects,
        school::list_workbooks,
        school::create_workbook,
        school::set_workbook_page,
        school::record_daily_log,
        school::list_tasks,
        school::create_task,
        school::complete_task,
        school::list_test_results,
        school::create_test_result,
        school::delete_test_result,
        exams::list_countdowns,
        exams::get_countdown,
        exams::high_school_exams,
        exams::list_sessions,
        exams::save_session,
        exams::delete_session,
        exams::list_official_exams,
        exams::save_official_exams,
        exams::delete_official_exam,
        exams::import_schedule,
        exams::search_sources,
        teacher::create_student,
        teacher::list_students,
        teacher::student_alerts,
        billing::checkout,
        billing::portal,
        billing::stripe_webhook,
        billing::stripe_webhook_status,
        blogs::list_blogs,
        blogs::get_blog,
        blogs::revalidate,
    ),
    components(schemas(Error, ErrorCode)),
    tags(
        (name = "health", description = "Health checks for orchestrators"),
        (name = "analyze", description = "Essay grading"),
        (name = "chat", description = "Streaming tutor chat"),
        (name = "profile", description = "The caller's own profile"),
        (name = "results", description = "Quiz results"),
        (name = "review", description = "Weak-word review"),
        (name = "groups", description = "Study groups and rankings"),
        (name = "announcements", description = "Site notices"),
        (name = "community", description = "Community board"),
        (name = "school", description = "Workbooks, daily logs, tasks, and test results"),
        (name = "exams", description = "Exam countdowns and entrance exam schedules"),
        (name = "teacher", description = "Cram-school staff tools"),
        (name = "billing", description = "Subscriptions"),
        (name = "blogs", description = "CMS-backed blog")
    )
)]
pub struct ApiDoc;
