//! Exam calendars and the countdowns shown to students.
//!
//! Two kinds of dates are tracked. Qualification exams (Eiken, kanji tests,
//! and so on) run in numbered sessions grouped under an exam slug. Public
//! high-school entrance exams are published per prefecture and school year.
//! Day arithmetic always uses the calendar date in Asia/Tokyo.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::exam::UnsupportedValue;

/// Earliest school year accepted for an entrance exam.
pub const MIN_EXAM_YEAR: i32 = 2000;
/// Latest school year accepted for an entrance exam.
pub const MAX_EXAM_YEAR: i32 = 2100;

/// One sitting of a qualification exam, e.g. `eiken` / `2026-1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamSession {
    pub id: Uuid,
    pub slug: String,
    pub session_slug: String,
    pub exam_name: String,
    pub session_name: String,
    pub primary_exam_date: NaiveDate,
    pub result_date: Option<NaiveDate>,
    pub is_active: bool,
}

impl ExamSession {
    /// Whether the session still matters on `today`.
    ///
    /// A session stays listed until its results are out; sessions without a
    /// result date drop off after the exam day.
    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.result_date.unwrap_or(self.primary_exam_date) >= today
    }
}

/// Selection route of a public high-school entrance exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamCategory {
    /// 一般選抜 / 学力検査.
    PublicGeneral,
    /// 推薦・特色・前期選抜.
    PublicRecommendation,
    #[default]
    #[serde(other)]
    Other,
}

impl ExamCategory {
    /// Persisted string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PublicGeneral => "public_general",
            Self::PublicRecommendation => "public_recommendation",
            Self::Other => "other",
        }
    }
}

impl FromStr for ExamCategory {
    type Err = UnsupportedValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public_general" => Ok(Self::PublicGeneral),
            "public_recommendation" => Ok(Self::PublicRecommendation),
            "other" => Ok(Self::Other),
            other => Err(UnsupportedValue(other.to_owned())),
        }
    }
}

/// A public high-school entrance exam in one prefecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfficialExam {
    pub id: Uuid,
    /// School year the successful applicants enrol in.
    pub year: i32,
    pub prefecture_id: i32,
    pub category: ExamCategory,
    pub name: String,
    pub exam_date: NaiveDate,
    pub result_date: Option<NaiveDate>,
    pub application_start: Option<NaiveDate>,
    pub application_end: Option<NaiveDate>,
}

/// A prefecture with its JIS code and URL slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Prefecture {
    pub id: i32,
    pub name: &'static str,
    pub slug: &'static str,
}

const fn pref(id: i32, name: &'static str, slug: &'static str) -> Prefecture {
    Prefecture { id, name, slug }
}

/// The 47 prefectures in JIS X 0401 order.
pub const PREFECTURES: [Prefecture; 47] = [
    pref(1, "北海道", "hokkaido"),
    pref(2, "青森県", "aomori"),
    pref(3, "岩手県", "iwate"),
    pref(4, "宮城県", "miyagi"),
    pref(5, "秋田県", "akita"),
    pref(6, "山形県", "yamagata"),
    pref(7, "福島県", "fukushima"),
    pref(8, "茨城県", "ibaraki"),
    pref(9, "栃木県", "tochigi"),
    pref(10, "群馬県", "gunma"),
    pref(11, "埼玉県", "saitama"),
    pref(12, "千葉県", "chiba"),
    pref(13, "東京都", "tokyo"),
    pref(14, "神奈川県", "kanagawa"),
    pref(15, "新潟県", "niigata"),
    pref(16, "富山県", "toyama"),
    pref(17, "石川県", "ishikawa"),
    pref(18, "福井県", "fukui"),
    pref(19, "山梨県", "yamanashi"),
    pref(20, "長野県", "nagano"),
    pref(21, "岐阜県", "gifu"),
    pref(22, "静岡県", "shizuoka"),
    pref(23, "愛知県", "aichi"),
    pref(24, "三重県", "mie"),
    pref(25, "滋賀県", "shiga"),
    pref(26, "京都府", "kyoto"),
    pref(27, "大阪府", "osaka"),
    pref(28, "兵庫県", "hyogo"),
    pref(29, "奈良県", "nara"),
    pref(30, "和歌山県", "wakayama"),
    pref(31, "鳥取県", "tottori"),
    pref(32, "島根県", "shimane"),
    pref(33, "岡山県", "okayama"),
    pref(34, "広島県", "hiroshima"),
    pref(35, "山口県", "yamaguchi"),
    pref(36, "徳島県", "tokushima"),
    pref(37, "香川県", "kagawa"),
    pref(38, "愛媛県", "ehime"),
    pref(39, "高知県", "kochi"),
    pref(40, "福岡県", "fukuoka"),
    pref(41, "佐賀県", "saga"),
    pref(42, "長崎県", "nagasaki"),
    pref(43, "熊本県", "kumamoto"),
    pref(44, "大分県", "oita"),
    pref(45, "宮崎県", "miyazaki"),
    pref(46, "鹿児島県", "kagoshima"),
    pref(47, "沖縄県", "okinawa"),
];

pub fn prefecture_by_id(id: i32) -> Option<&'static Prefecture> {
    PREFECTURES.iter().find(|p| p.id == id)
}

pub fn prefecture_by_slug(slug: &str) -> Option<&'static Prefecture> {
    let slug = slug.trim();
    PREFECTURES.iter().find(|p| p.slug.eq_ignore_ascii_case(slug))
}

/// Look a prefecture up by its Japanese name, with or without the
/// 都/府/県 suffix.
///
/// # Examples
/// ```
/// use edulens::domain::exam_calendar::prefecture_by_name;
///
/// assert_eq!(prefecture_by_name("兵庫県").map(|p| p.id), Some(28));
/// assert_eq!(prefecture_by_name("兵庫").map(|p| p.id), Some(28));
/// assert_eq!(prefecture_by_name("北海道").map(|p| p.slug), Some("hokkaido"));
/// assert!(prefecture_by_name("兵庫市").is_none());
/// ```
pub fn prefecture_by_name(name: &str) -> Option<&'static Prefecture> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    PREFECTURES.iter().find(|p| {
        p.name == name
            || p
                .name
                .strip_suffix(['都', '府', '県'])
                .is_some_and(|stem| stem == name)
    })
}

/// Days left until an exam, as shown on a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Countdown {
    /// Whole days from today to the exam day, never negative.
    pub days_remaining: i64,
    /// The exam day has passed. The exam day itself is not over.
    pub is_over: bool,
}

/// Countdown to `exam_date` as seen on `today`.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use edulens::domain::exam_calendar::countdown;
///
/// let day = |d| NaiveDate::from_ymd_opt(2027, 3, d).expect("date");
/// assert_eq!(countdown(day(12), day(2)).days_remaining, 10);
/// assert!(!countdown(day(12), day(12)).is_over);
/// assert!(countdown(day(12), day(13)).is_over);
/// ```
pub fn countdown(exam_date: NaiveDate, today: NaiveDate) -> Countdown {
    let days = (exam_date - today).num_days();
    Countdown {
        days_remaining: days.max(0),
        is_over: days < 0,
    }
}

/// Validation failures for exam calendar input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExamCalendarError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{0} may only contain lowercase letters, digits, and hyphens")]
    InvalidSlug(&'static str),
    #[error("results cannot be announced before the exam")]
    ResultBeforeExam,
    #[error("applications must open before they close")]
    ApplicationWindow,
    #[error("unknown prefecture {0}")]
    UnknownPrefecture(i32),
    #[error("year must be between {MIN_EXAM_YEAR} and {MAX_EXAM_YEAR}")]
    YearOutOfRange,
}

impl ExamCalendarError {
    /// Request field the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Empty(field) | Self::InvalidSlug(field) => field,
            Self::ResultBeforeExam => "resultDate",
            Self::ApplicationWindow => "applicationEnd",
            Self::UnknownPrefecture(_) => "prefectureId",
            Self::YearOutOfRange => "year",
        }
    }
}

/// Trim `value` and reject blanks.
pub fn required(field: &'static str, value: &str) -> Result<String, ExamCalendarError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ExamCalendarError::Empty(field))
    } else {
        Ok(value.to_owned())
    }
}

/// Normalise a URL slug to lowercase and check its characters.
pub fn slug(field: &'static str, value: &str) -> Result<String, ExamCalendarError> {
    let value = required(field, value)?.to_ascii_lowercase();
    if value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        Ok(value)
    } else {
        Err(ExamCalendarError::InvalidSlug(field))
    }
}

/// Reject a result date before the exam day.
pub fn check_result_date(
    exam_date: NaiveDate,
    result_date: Option<NaiveDate>,
) -> Result<(), ExamCalendarError> {
    match result_date {
        Some(result) if result < exam_date => Err(ExamCalendarError::ResultBeforeExam),
        _ => Ok(()),
    }
}

/// Check every rule an official exam must satisfy before storage.
pub fn validate_official_exam(exam: &OfficialExam) -> Result<(), ExamCalendarError> {
    if !(MIN_EXAM_YEAR..=MAX_EXAM_YEAR).contains(&exam.year) {
        return Err(ExamCalendarError::YearOutOfRange);
    }
    if prefecture_by_id(exam.prefecture_id).is_none() {
        return Err(ExamCalendarError::UnknownPrefecture(exam.prefecture_id));
    }
    check_result_date(exam.exam_date, exam.result_date)?;
    match (exam.application_start, exam.application_end) {
        (Some(start), Some(end)) if start > end => Err(ExamCalendarError::ApplicationWindow),
        _ => Ok(()),
    }
}
