//! Cram-school progress tracking: workbooks, daily logs, one-off tasks, and
//! the alerts teachers read.

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::exam::UnsupportedValue;
use super::{Profile, UserId};

/// Days without a log before a student is flagged.
pub const NO_LOG_ALERT_DAYS: i64 = 3;
/// Reported when a student has never logged.
pub const NEVER_LOGGED_DAYS: i64 = 999;

/// A school subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subject {
    pub id: i32,
    pub name: String,
}

/// A workbook a student works through page by page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workbook {
    pub id: Uuid,
    pub student_id: UserId,
    pub subject_id: i32,
    pub title: String,
    pub current_page: i32,
    pub target_page: i32,
    pub deadline: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Homework submission state recorded in a daily log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    #[default]
    None,
    Done,
    Forgot,
    Incomplete,
}

impl SubmissionStatus {
    /// Persisted string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Done => "done",
            Self::Forgot => "forgot",
            Self::Incomplete => "incomplete",
        }
    }
}

impl FromStr for SubmissionStatus {
    type Err = UnsupportedValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "done" => Ok(Self::Done),
            "forgot" => Ok(Self::Forgot),
            "incomplete" => Ok(Self::Incomplete),
            other => Err(UnsupportedValue(other.to_owned())),
        }
    }
}

/// One subject's record for one day. Unique per student, subject, and date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyLog {
    pub id: Uuid,
    pub student_id: UserId,
    pub subject_id: i32,
    pub log_date: NaiveDate,
    pub hand_raised_count: i32,
    pub submission_status: SubmissionStatus,
    pub attitude_score: Option<i32>,
}

/// Kind of one-off task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Print,
    Report,
    Work,
    #[default]
    Other,
}

impl TaskType {
    /// Persisted string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Print => "print",
            Self::Report => "report",
            Self::Work => "work",
            Self::Other => "other",
        }
    }
}

impl FromStr for TaskType {
    type Err = UnsupportedValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "print" => Ok(Self::Print),
            "report" => Ok(Self::Report),
            "work" => Ok(Self::Work),
            "other" => Ok(Self::Other),
            other => Err(UnsupportedValue(other.to_owned())),
        }
    }
}

/// A task with an optional deadline, outside the workbook plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneOffTask {
    pub id: Uuid,
    pub student_id: UserId,
    pub task_type: TaskType,
    pub title: String,
    pub deadline: Option<NaiveDate>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Highest mark a school test subject can carry.
pub const MAX_TEST_SCORE: i32 = 100;

/// Marks from one school test. Absent subjects were not examined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectScores {
    pub english: Option<i32>,
    pub math: Option<i32>,
    pub japanese: Option<i32>,
    pub science: Option<i32>,
    pub social: Option<i32>,
    pub music: Option<i32>,
    pub art: Option<i32>,
    pub pe: Option<i32>,
    pub tech_home: Option<i32>,
}

impl SubjectScores {
    fn core(&self) -> [Option<i32>; 5] {
        [
            self.english,
            self.math,
            self.japanese,
            self.science,
            self.social,
        ]
    }

    fn practical(&self) -> [Option<i32>; 4] {
        [self.music, self.art, self.pe, self.tech_home]
    }

    /// Sum of the five core subjects that were examined.
    ///
    /// # Examples
    /// ```
    /// use edulens::domain::school::SubjectScores;
    ///
    /// let scores = SubjectScores {
    ///     english: Some(80),
    ///     math: Some(70),
    ///     music: Some(90),
    ///     ..SubjectScores::default()
    /// };
    /// assert_eq!(scores.total5(), Some(150));
    /// assert_eq!(scores.total9(), Some(240));
    /// assert_eq!(SubjectScores::default().total5(), None);
    /// ```
    pub fn total5(&self) -> Option<i32> {
        sum_present(self.core())
    }

    /// Sum of all nine subjects that were examined.
    pub fn total9(&self) -> Option<i32> {
        sum_present(self.core().into_iter().chain(self.practical()))
    }

    fn validate(&self) -> Result<(), SchoolValidationError> {
        let out_of_range = self
            .core()
            .into_iter()
            .chain(self.practical())
            .flatten()
            .any(|score| !(0..=MAX_TEST_SCORE).contains(&score));
        if out_of_range {
            Err(SchoolValidationError::TestScoreOutOfRange)
        } else {
            Ok(())
        }
    }
}

fn sum_present(scores: impl IntoIterator<Item = Option<i32>>) -> Option<i32> {
    scores
        .into_iter()
        .flatten()
        .fold(None, |total, score| Some(total.unwrap_or(0) + score))
}

/// A regular school test (定期テスト) result entered by the student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRecord {
    pub id: Uuid,
    pub student_id: UserId,
    pub test_name: String,
    pub test_date: NaiveDate,
    pub scores: SubjectScores,
    pub created_at: DateTime<Utc>,
}

/// Check a test's name and marks. Returns the trimmed name.
pub fn validate_test_record(
    test_name: &str,
    scores: &SubjectScores,
) -> Result<String, SchoolValidationError> {
    let name = validate_title(test_name)?;
    scores.validate()?;
    Ok(name)
}

/// Validation failures for school input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchoolValidationError {
    #[error("page must not be negative")]
    NegativePage,
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("count must not be negative")]
    NegativeCount,
    #[error("attitude score must be between 1 and 5")]
    AttitudeOutOfRange,
    #[error("test scores must be between 0 and 100")]
    TestScoreOutOfRange,
}

/// Reject negative page numbers.
pub fn validate_page(page: i32) -> Result<i32, SchoolValidationError> {
    if page < 0 {
        Err(SchoolValidationError::NegativePage)
    } else {
        Ok(page)
    }
}

/// Trim a title and reject blanks.
pub fn validate_title(raw: &str) -> Result<String, SchoolValidationError> {
    let title = raw.trim();
    if title.is_empty() {
        Err(SchoolValidationError::EmptyTitle)
    } else {
        Ok(title.to_owned())
    }
}

/// Check the numeric fields of a daily log.
pub fn validate_daily_log(
    hand_raised_count: i32,
    attitude_score: Option<i32>,
) -> Result<(), SchoolValidationError> {
    if hand_raised_count < 0 {
        return Err(SchoolValidationError::NegativeCount);
    }
    if attitude_score.is_some_and(|score| !(1..=5).contains(&score)) {
        return Err(SchoolValidationError::AttitudeOutOfRange);
    }
    Ok(())
}

/// Kind of teacher alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    NoLog,
    ForgotSubmission,
}

/// A student who needs attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentAlert {
    pub student: Profile,
    pub alert_type: AlertType,
    pub days_without_log: Option<i64>,
    pub last_log_date: Option<NaiveDate>,
}

/// First day of the alert window ending on `today`.
pub fn alert_window_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(NO_LOG_ALERT_DAYS)
}

/// Build alerts for a set of students.
///
/// `latest_logs` holds each student's most recent log date and
/// `forgot_students` those with a forgotten submission inside the window.
/// No-log alerts come first, longest gap first.
pub fn build_alerts(
    students: &[Profile],
    latest_logs: &HashMap<UserId, NaiveDate>,
    forgot_students: &BTreeSet<UserId>,
    today: NaiveDate,
) -> Vec<StudentAlert> {
    let window_start = alert_window_start(today);
    let mut alerts: Vec<StudentAlert> = students
        .iter()
        .filter_map(|student| {
            let last = latest_logs.get(&student.id).copied();
            if last.is_some_and(|date| date >= window_start) {
                return None;
            }
            Some(StudentAlert {
                student: student.clone(),
                alert_type: AlertType::NoLog,
                days_without_log: Some(
                    last.map_or(NEVER_LOGGED_DAYS, |date| (today - date).num_days()),
                ),
                last_log_date: last,
            })
        })
        .collect();
    alerts.sort_by(|a, b| b.days_without_log.cmp(&a.days_without_log));

    alerts.extend(
        students
            .iter()
            .filter(|student| forgot_students.contains(&student.id))
            .map(|student| StudentAlert {
                student: student.clone(),
                alert_type: AlertType::ForgotSubmission,
                days_without_log: None,
                last_log_date: latest_logs.get(&student.id).copied(),
            }),
    );
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use rstest::rstest;

    fn student(name: &str) -> Profile {
        let mut profile = Profile::new(UserId::random(), Role::Student, Utc::now());
        profile.full_name = Some(name.to_owned());
        profile
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, d).expect("valid date")
    }

    #[rstest]
    fn alerts_flag_stale_and_missing_logs() {
        let (fresh, stale, never) = (student("fresh"), student("stale"), student("never"));
        let latest = HashMap::from([(fresh.id, day(19)), (stale.id, day(10))]);
        let forgot = BTreeSet::from([fresh.id]);

        let alerts = build_alerts(
            &[fresh.clone(), stale.clone(), never.clone()],
            &latest,
            &forgot,
            day(20),
        );

        let summary: Vec<_> = alerts
            .iter()
            .map(|a| (a.student.id, a.alert_type, a.days_without_log))
            .collect();
        assert_eq!(
            summary,
            vec![
                (never.id, AlertType::NoLog, Some(NEVER_LOGGED_DAYS)),
                (stale.id, AlertType::NoLog, Some(10)),
                (fresh.id, AlertType::ForgotSubmission, None),
            ]
        );
    }

    #[rstest]
    fn log_on_window_start_counts_as_recent() {
        let s = student("edge");
        let latest = HashMap::from([(s.id, day(17))]);
        assert!(build_alerts(&[s], &latest, &BTreeSet::new(), day(20)).is_empty());
    }

    #[rstest]
    #[case::ok(0, Some(3), Ok(()))]
    #[case::negative(-1, None, Err(SchoolValidationError::NegativeCount))]
    #[case::attitude(2, Some(6), Err(SchoolValidationError::AttitudeOutOfRange))]
    fn validates_daily_logs(
        #[case] hands: i32,
        #[case] attitude: Option<i32>,
        #[case] expected: Result<(), SchoolValidationError>,
    ) {
        assert_eq!(validate_daily_log(hands, attitude), expected);
    }

    #[rstest]
    #[case::nothing_examined(SubjectScores::default(), None, None)]
    #[case::core_only(
        SubjectScores { english: Some(90), math: Some(0), social: Some(55), ..SubjectScores::default() },
        Some(145),
        Some(145)
    )]
    #[case::practical_only(
        SubjectScores { pe: Some(40), art: Some(35), ..SubjectScores::default() },
        None,
        Some(75)
    )]
    fn test_totals_count_examined_subjects(
        #[case] scores: SubjectScores,
        #[case] total5: Option<i32>,
        #[case] total9: Option<i32>,
    ) {
        assert_eq!(scores.total5(), total5);
        assert_eq!(scores.total9(), total9);
    }

    #[rstest]
    #[case::above(Some(101))]
    #[case::below(Some(-1))]
    fn test_scores_outside_percent_are_rejected(#[case] math: Option<i32>) {
        let scores = SubjectScores {
            math,
            ..SubjectScores::default()
        };
        assert_eq!(
            validate_test_record("一学期中間", &scores),
            Err(SchoolValidationError::TestScoreOutOfRange)
        );
    }

    #[rstest]
    fn test_names_are_trimmed_and_required() {
        let scores = SubjectScores::default();
        assert_eq!(
            validate_test_record(" 期末テスト ", &scores).as_deref(),
            Ok("期末テスト")
        );
        assert_eq!(
            validate_test_record("  ", &scores),
            Err(SchoolValidationError::EmptyTitle)
        );
    }

    #[rstest]
    fn negative_pages_are_rejected() {
        assert_eq!(validate_page(-1), Err(SchoolValidationError::NegativePage));
        assert_eq!(validate_page(0), Ok(0));
    }
}
