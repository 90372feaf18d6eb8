//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// One row per account; students, teachers, and admins alike.
    profiles (id) {
        id -> Uuid,
        full_name -> Nullable<Text>,
        role -> Text,
        grade -> Nullable<Text>,
        school_name -> Nullable<Text>,
        cram_school_id -> Nullable<Uuid>,
        login_id -> Nullable<Text>,
        is_pro -> Bool,
        stripe_customer_id -> Nullable<Text>,
        stripe_subscription_id -> Nullable<Text>,
        test_count -> Int4,
        total_writing_checks -> Int4,
        consecutive_login_days -> Int4,
        last_login_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Quiz results, unique on `(user_id, test_key)`.
    quiz_results (id) {
        id -> Uuid,
        user_id -> Uuid,
        selected_text -> Text,
        unit -> Nullable<Text>,
        start_num -> Nullable<Int4>,
        end_num -> Nullable<Int4>,
        total -> Int4,
        correct -> Int4,
        incorrect_count -> Int4,
        incorrect_words -> Jsonb,
        correct_words -> Jsonb,
        test_key -> Text,
        mode -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    study_groups (id) {
        id -> Uuid,
        name -> Text,
        invite_code -> Text,
        owner_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    group_members (group_id, user_id) {
        group_id -> Uuid,
        user_id -> Uuid,
        joined_at -> Timestamptz,
    }
}

diesel::table! {
    announcements (id) {
        id -> Uuid,
        title -> Text,
        message -> Text,
        kind -> Text,
        is_active -> Bool,
        start_date -> Nullable<Timestamptz>,
        end_date -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Threads have no `parent_id`; replies point at their thread.
    community_posts (id) {
        id -> Uuid,
        user_id -> Uuid,
        author_name -> Text,
        title -> Nullable<Text>,
        body -> Text,
        parent_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    subjects (id) {
        id -> Int4,
        name -> Text,
    }
}

diesel::table! {
    workbooks (id) {
        id -> Uuid,
        student_id -> Uuid,
        subject_id -> Int4,
        title -> Text,
        current_page -> Int4,
        target_page -> Int4,
        deadline -> Nullable<Date>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Unique on `(student_id, subject_id, log_date)`.
    daily_logs (id) {
        id -> Uuid,
        student_id -> Uuid,
        subject_id -> Int4,
        log_date -> Date,
        hand_raised_count -> Int4,
        submission_status -> Text,
        attitude_score -> Nullable<Int4>,
    }
}

diesel::table! {
    one_off_tasks (id) {
        id -> Uuid,
        student_id -> Uuid,
        task_type -> Text,
        title -> Text,
        deadline -> Nullable<Date>,
        is_completed -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Regular school test marks; `NULL` means the subject was not examined.
    school_tests (id) {
        id -> Uuid,
        student_id -> Uuid,
        test_name -> Text,
        test_date -> Date,
        english -> Nullable<Int4>,
        math -> Nullable<Int4>,
        japanese -> Nullable<Int4>,
        science -> Nullable<Int4>,
        social -> Nullable<Int4>,
        music -> Nullable<Int4>,
        art -> Nullable<Int4>,
        pe -> Nullable<Int4>,
        tech_home -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Qualification exam sessions, unique on `(slug, session_slug)`.
    exam_schedules (id) {
        id -> Uuid,
        slug -> Text,
        session_slug -> Text,
        exam_name -> Text,
        session_name -> Text,
        primary_exam_date -> Date,
        result_date -> Nullable<Date>,
        is_active -> Bool,
    }
}

diesel::table! {
    /// Public high-school entrance exams per prefecture and school year.
    official_exams (id) {
        id -> Uuid,
        year -> Int4,
        prefecture_id -> Int4,
        category -> Text,
        name -> Text,
        exam_date -> Date,
        result_date -> Nullable<Date>,
        application_start -> Nullable<Date>,
        application_end -> Nullable<Date>,
    }
}

diesel::joinable!(group_members -> study_groups (group_id));

diesel::allow_tables_to_appear_in_same_query!(
    announcements,
    community_posts,
    daily_logs,
    exam_schedules,
    group_members,
    official_exams,
    one_off_tasks,
    profiles,
    quiz_results,
    school_tests,
    study_groups,
    subjects,
    workbooks,
);
