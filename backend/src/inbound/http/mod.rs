//! HTTP inbound adapter exposing REST endpoints.
//!
//! Every endpoint except the health checks lives under `/api`; register them
//! with [`configure_api`] inside that scope.

pub mod analyze;
pub mod announcements;
pub mod auth;
pub mod billing;
pub mod blogs;
pub mod chat;
pub(crate) mod client;
pub mod community;
pub mod error;
pub mod exams;
pub mod groups;
pub mod health;
pub mod profile;
pub mod results;
pub mod review;
pub mod school;
pub mod state;
pub mod teacher;
#[cfg(test)]
pub mod test_utils;
pub mod validation;

use actix_web::web;

pub use error::ApiResult;

/// Register every `/api` endpoint on `cfg`.
///
/// Literal segments are registered before `{id}` patterns that would
/// otherwise capture them.
///
/// # Examples
/// ```
/// use actix_web::{App, web};
/// use edulens::inbound::http::configure_api;
///
/// let _app = App::new().service(web::scope("/api").configure(configure_api));
/// ```
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(analyze::analyze_basic)
        .service(analyze::analyze_detail)
        .service(analyze::analyze_full)
        .service(chat::chat)
        .service(profile::get_profile)
        .service(profile::update_profile)
        .service(profile::record_login)
        .service(profile::record_test_started)
        .service(results::save_result)
        .service(results::list_results)
        .service(review::weak_words)
        .service(review::create_review_test)
        .service(groups::create_group)
        .service(groups::list_groups)
        .service(groups::join_group)
        .service(groups::overall_ranking)
        .service(groups::rename_group)
        .service(groups::group_ranking)
        .service(announcements::list_active)
        .service(announcements::list_all)
        .service(announcements::create)
        .service(announcements::update)
        .service(announcements::remove)
        .service(community::list_threads)
        .service(community::get_thread)
        .service(community::create_post)
        .service(community::delete_post)
        .service(school::list_subjects)
        .service(school::list_workbooks)
        .service(school::create_workbook)
        .service(school::set_workbook_page)
        .service(school::record_daily_log)
        .service(school::list_tasks)
        .service(school::create_task)
        .service(school::complete_task)
        .service(school::list_test_results)
        .service(school::create_test_result)
        .service(school::delete_test_result)
        .service(exams::list_countdowns)
        .service(exams::get_countdown)
        .service(exams::high_school_exams)
        .service(exams::list_sessions)
        .service(exams::save_session)
        .service(exams::delete_session)
        .service(exams::list_official_exams)
        .service(exams::save_official_exams)
        .service(exams::delete_official_exam)
        .service(exams::import_schedule)
        .service(exams::search_sources)
        .service(teacher::create_student)
        .service(teacher::list_students)
        .service(teacher::student_alerts)
        .service(billing::checkout)
        .service(billing::portal)
        .service(billing::stripe_webhook)
        .service(billing::stripe_webhook_status)
        .service(blogs::list_blogs)
        .service(blogs::get_blog)
        .service(blogs::revalidate);
}
