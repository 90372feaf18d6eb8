//! Exam settings that steer grading prompts and score ranges.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Exam family the composition is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamType {
    /// Eiken (STEP) writing section.
    #[default]
    Eiken,
    /// University entrance exam composition or translation.
    University,
}

impl ExamType {
    /// Maximum score per criterion.
    pub fn criterion_max(self) -> u32 {
        match self {
            Self::Eiken => 4,
            Self::University => 10,
        }
    }

    /// Maximum total over the four criteria.
    pub fn total_max(self) -> u32 {
        self.criterion_max() * 4
    }
}

/// Error returned for unknown enum values in requests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported value: {0}")]
pub struct UnsupportedValue(pub String);

impl FromStr for ExamType {
    type Err = UnsupportedValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eiken" => Ok(Self::Eiken),
            "university" => Ok(Self::University),
            other => Err(UnsupportedValue(other.to_owned())),
        }
    }
}

/// Eiken writing task format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemType {
    /// Opinion essay with reasons.
    #[default]
    Opinion,
    /// Summary of a passage.
    Summary,
    /// Reply to an email.
    Email,
}

impl FromStr for ProblemType {
    type Err = UnsupportedValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opinion" => Ok(Self::Opinion),
            "summary" => Ok(Self::Summary),
            "email" => Ok(Self::Email),
            other => Err(UnsupportedValue(other.to_owned())),
        }
    }
}

const DEFAULT_LEVEL: &str = "2";

/// Eiken grade code such as `pre-2` or `1`.
///
/// Unknown codes are kept so they can still be rendered as `{code}級`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EikenLevel(String);

impl Default for EikenLevel {
    fn default() -> Self {
        Self(DEFAULT_LEVEL.to_owned())
    }
}

impl EikenLevel {
    /// Build from an optional request value; blank input selects grade 2.
    pub fn from_request(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(code) if !code.is_empty() => Self(code.to_owned()),
            _ => Self::default(),
        }
    }

    /// Code as received.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Japanese grade label used in prompts.
    pub fn label(&self) -> String {
        match self.0.as_str() {
            "3" => "3級".to_owned(),
            "pre-2" => "準2級".to_owned(),
            "pre-2-plus" => "準2級プラス".to_owned(),
            "2" => "2級".to_owned(),
            "pre-1" => "準1級".to_owned(),
            "1" => "1級".to_owned(),
            other => format!("{other}級"),
        }
    }

    /// Lower grades are graded on basic accuracy over range.
    pub fn is_foundation(&self) -> bool {
        matches!(self.0.as_str(), "3" | "pre-2")
    }

    /// Upper grades are graded on range and sophistication.
    pub fn is_advanced(&self) -> bool {
        matches!(self.0.as_str(), "pre-1" | "1")
    }
}

/// Grading settings shared by all analysis modes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExamSettings {
    pub exam_type: ExamType,
    pub level: EikenLevel,
    pub problem_type: ProblemType,
    pub university_name: Option<String>,
    pub word_limit: Option<String>,
}
