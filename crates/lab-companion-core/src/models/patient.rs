//! User and patient demographic models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An account that owns uploaded reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Local UUID
    pub id: String,
    /// Unique e-mail address
    pub email: String,
    /// Creation timestamp
    pub created_at: String,
}

impl User {
    pub fn new(email: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.trim().to_lowercase(),
            created_at: super::timestamp_now(),
        }
    }
}

/// Patient gender as recorded on a report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unrecognised gender code.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Unrecognised gender: {0}")]
pub struct ParseGenderError(pub String);

impl FromStr for Gender {
    type Err = ParseGenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "m" | "male" => Ok(Gender::Male),
            "f" | "female" => Ok(Gender::Female),
            _ => Err(ParseGenderError(s.to_string())),
        }
    }
}

/// Coarse age grouping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgeCategory {
    Unknown,
    /// Under 18; adult ranges do not apply
    Pediatric,
    YoungAdult,
    MiddleAged,
    Elderly,
}

impl AgeCategory {
    pub fn from_age(age: Option<u32>) -> Self {
        match age {
            None => AgeCategory::Unknown,
            Some(a) if a < 18 => AgeCategory::Pediatric,
            Some(a) if a < 40 => AgeCategory::YoungAdult,
            Some(a) if a < 60 => AgeCategory::MiddleAged,
            Some(_) => AgeCategory::Elderly,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeCategory::Unknown => "UNKNOWN",
            AgeCategory::Pediatric => "PEDIATRIC",
            AgeCategory::YoungAdult => "YOUNG_ADULT",
            AgeCategory::MiddleAged => "MIDDLE_AGED",
            AgeCategory::Elderly => "ELDERLY",
        }
    }
}

/// Demographics used to personalise reference ranges.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Demographics {
    pub gender: Option<Gender>,
    /// Age in years
    pub age: Option<u32>,
}

impl Demographics {
    pub fn new(gender: Option<Gender>, age: Option<u32>) -> Self {
        Self { gender, age }
    }

    pub fn is_empty(&self) -> bool {
        self.gender.is_none() && self.age.is_none()
    }

    pub fn age_category(&self) -> AgeCategory {
        AgeCategory::from_age(self.age)
    }
}
