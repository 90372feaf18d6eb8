//! Internal Diesel row structs.
//!
//! These types never leave the persistence layer. Repositories convert them
//! to domain types with the `row_to_*` helpers in each adapter.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{
    announcements, community_posts, daily_logs, exam_schedules, group_members, official_exams,
    one_off_tasks, profiles, quiz_results, school_tests, study_groups, subjects, workbooks,
};

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = profiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ProfileRow {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub role: String,
    pub grade: Option<String>,
    pub school_name: Option<String>,
    pub cram_school_id: Option<Uuid>,
    pub login_id: Option<String>,
    pub is_pro: bool,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub test_count: i32,
    pub total_writing_checks: i32,
    pub consecutive_login_days: i32,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = profiles)]
pub(crate) struct NewProfileRow<'a> {
    pub id: Uuid,
    pub full_name: Option<&'a str>,
    pub role: &'a str,
    pub grade: Option<&'a str>,
    pub school_name: Option<&'a str>,
    pub cram_school_id: Option<Uuid>,
    pub login_id: Option<&'a str>,
    pub is_pro: bool,
    pub test_count: i32,
    pub total_writing_checks: i32,
    pub consecutive_login_days: i32,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Editable fields; `None` columns are left untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = profiles)]
pub(crate) struct ProfileDetailsChangeset<'a> {
    pub full_name: Option<&'a str>,
    pub grade: Option<&'a str>,
    pub school_name: Option<&'a str>,
}

/// Marks a profile as Pro; absent billing identifiers keep their stored value.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = profiles)]
pub(crate) struct SubscriptionChangeset<'a> {
    pub is_pro: bool,
    pub stripe_customer_id: Option<&'a str>,
    pub stripe_subscription_id: Option<&'a str>,
}

// ---------------------------------------------------------------------------
// Quiz results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = quiz_results)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct QuizResultRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub selected_text: String,
    pub unit: Option<String>,
    pub start_num: Option<i32>,
    pub end_num: Option<i32>,
    pub total: i32,
    pub correct: i32,
    pub incorrect_count: i32,
    pub incorrect_words: serde_json::Value,
    pub correct_words: serde_json::Value,
    pub test_key: String,
    pub mode: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = quiz_results)]
pub(crate) struct NewQuizResultRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub selected_text: &'a str,
    pub unit: Option<&'a str>,
    pub start_num: Option<i32>,
    pub end_num: Option<i32>,
    pub total: i32,
    pub correct: i32,
    pub incorrect_count: i32,
    pub incorrect_words: serde_json::Value,
    pub correct_words: serde_json::Value,
    pub test_key: &'a str,
    pub mode: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = study_groups)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct GroupRow {
    pub id: Uuid,
    pub name: String,
    pub invite_code: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = group_members)]
pub(crate) struct NewMemberRow {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Announcements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = announcements)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AnnouncementRow {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Patch columns; the outer `Option` selects the column, the inner one is the
/// nullable value.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = announcements)]
pub(crate) struct AnnouncementChangeset<'a> {
    pub title: Option<&'a str>,
    pub message: Option<&'a str>,
    pub kind: Option<&'a str>,
    pub is_active: Option<bool>,
    pub start_date: Option<Option<DateTime<Utc>>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
}

// ---------------------------------------------------------------------------
// Community
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = community_posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CommunityPostRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub author_name: String,
    pub title: Option<String>,
    pub body: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// School
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = subjects)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SubjectRow {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = workbooks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct WorkbookRow {
    pub id: Uuid,
    pub student_id: Uuid,
    pub subject_id: i32,
    pub title: String,
    pub current_page: i32,
    pub target_page: i32,
    pub deadline: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = daily_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct DailyLogRow {
    pub id: Uuid,
    pub student_id: Uuid,
    pub subject_id: i32,
    pub log_date: NaiveDate,
    pub hand_raised_count: i32,
    pub submission_status: String,
    pub attitude_score: Option<i32>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = one_off_tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TaskRow {
    pub id: Uuid,
    pub student_id: Uuid,
    pub task_type: String,
    pub title: String,
    pub deadline: Option<NaiveDate>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = school_tests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TestRecordRow {
    pub id: Uuid,
    pub student_id: Uuid,
    pub test_name: String,
    pub test_date: NaiveDate,
    pub english: Option<i32>,
    pub math: Option<i32>,
    pub japanese: Option<i32>,
    pub science: Option<i32>,
    pub social: Option<i32>,
    pub music: Option<i32>,
    pub art: Option<i32>,
    pub pe: Option<i32>,
    pub tech_home: Option<i32>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Exam calendars
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = exam_schedules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct ExamSessionRow {
    pub id: Uuid,
    pub slug: String,
    pub session_slug: String,
    pub exam_name: String,
    pub session_name: String,
    pub primary_exam_date: NaiveDate,
    pub result_date: Option<NaiveDate>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = official_exams)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct OfficialExamRow {
    pub id: Uuid,
    pub year: i32,
    pub prefecture_id: i32,
    pub category: String,
    pub name: String,
    pub exam_date: NaiveDate,
    pub result_date: Option<NaiveDate>,
    pub application_start: Option<NaiveDate>,
    pub application_end: Option<NaiveDate>,
}
