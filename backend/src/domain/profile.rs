//! Learner and staff profiles, plan tiers, and daily login streaks.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Error, UserId};

/// Account role stored on the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Learner account; the default for self sign-ups.
    #[default]
    Student,
    /// Cram-school staff who provision students and read alerts.
    Teacher,
    /// Operator with access to administrative endpoints.
    Admin,
}

impl Role {
    /// Persisted string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "teacher" => Ok(Self::Teacher),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_owned())),
        }
    }
}

/// A user's profile row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: UserId,
    pub full_name: Option<String>,
    pub role: Role,
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

impl Profile {
    /// Fresh profile with counters at zero.
    pub fn new(id: UserId, role: Role, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            full_name: None,
            role,
            grade: None,
            school_name: None,
            cram_school_id: None,
            login_id: None,
            is_pro: false,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            test_count: 0,
            total_writing_checks: 0,
            consecutive_login_days: 0,
            last_login_at: None,
            created_at,
        }
    }

    /// Whether the profile may use staff endpoints.
    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Teacher | Role::Admin)
    }
}

/// Editable profile fields. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub grade: Option<String>,
    pub school_name: Option<String>,
}

impl ProfileUpdate {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.grade.is_none() && self.school_name.is_none()
    }
}

/// Plan tier that selects quota rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanTier {
    /// Not signed in.
    Guest,
    /// Signed in without a subscription.
    Free,
    /// Signed in with an active subscription.
    Pro,
}

impl PlanTier {
    /// Resolve the tier for an optional viewer.
    pub fn for_viewer(viewer: Option<&Viewer>) -> Self {
        match viewer {
            None => Self::Guest,
            Some(viewer) if viewer.is_pro() => Self::Pro,
            Some(_) => Self::Free,
        }
    }
}

/// An authenticated caller and, when present, their profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: UserId,
    pub email: Option<String>,
    pub profile: Option<Profile>,
}

impl Viewer {
    /// Whether the caller holds an active subscription.
    pub fn is_pro(&self) -> bool {
        self.profile.as_ref().is_some_and(|p| p.is_pro)
    }

    /// Role from the profile, defaulting to student.
    pub fn role(&self) -> Role {
        self.profile.as_ref().map(|p| p.role).unwrap_or_default()
    }

    /// Whether the caller is an administrator.
    pub fn is_admin(&self) -> bool {
        matches!(self.role(), Role::Admin)
    }

    /// Fail with `forbidden` unless the caller is an administrator.
    pub fn require_admin(&self) -> Result<(), Error> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::forbidden("administrator role required"))
        }
    }

    /// The caller's profile when they are a teacher or administrator.
    pub fn require_staff(&self) -> Result<&Profile, Error> {
        self.profile
            .as_ref()
            .filter(|profile| profile.is_staff())
            .ok_or_else(|| Error::forbidden("teacher role required"))
    }
}

/// Outcome of recording a daily login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginStreak {
    pub consecutive_days: i32,
    pub last_login_at: DateTime<Utc>,
    /// False when the login falls on a day already counted.
    pub advanced: bool,
}

const TOKYO_OFFSET_SECONDS: i32 = 9 * 3600;

fn tokyo() -> FixedOffset {
    FixedOffset::east_opt(TOKYO_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix())
}

/// Calendar day in Asia/Tokyo for a UTC instant.
pub fn tokyo_date(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&tokyo()).date_naive()
}

/// Compute the next login streak. Days are Asia/Tokyo calendar days.
///
/// A login on the same day keeps the streak, the following day extends it,
/// and any longer gap restarts it at one.
pub fn next_login_streak(
    previous: Option<DateTime<Utc>>,
    current_days: i32,
    now: DateTime<Utc>,
) -> LoginStreak {
    let today = tokyo_date(now);
    let Some(previous) = previous else {
        return LoginStreak {
            consecutive_days: 1,
            last_login_at: now,
            advanced: true,
        };
    };

    let last_day = tokyo_date(previous);
    if last_day >= today {
        return LoginStreak {
            consecutive_days: current_days.max(1),
            last_login_at: previous,
            advanced: false,
        };
    }

    let consecutive_days = if last_day + Duration::days(1) == today {
        current_days.saturating_add(1)
    } else {
        1
    };
    LoginStreak {
        consecutive_days,
        last_login_at: now,
        advanced: true,
    }
}
