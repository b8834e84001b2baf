//! Typed field values
//!
//! Numeric and enumerated fields of the workplan records. Every constructor
//! validates, so a value of these types always satisfies its range.

use crate::error::ModelError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Monetary amount: finite and non-negative
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Budget(f64);

impl Budget {
    /// Zero budget
    pub const ZERO: Self = Self(0.0);

    /// Create a budget
    ///
    /// # Errors
    /// Returns [`ModelError::NegativeBudget`] for negative or non-finite amounts
    pub fn new(amount: f64) -> Result<Self, ModelError> {
        if amount.is_finite() && amount >= 0.0 {
            Ok(Self(amount))
        } else {
            Err(ModelError::NegativeBudget(amount))
        }
    }

    /// Parse wizard text input
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidNumber`] when the text is not a number,
    /// [`ModelError::NegativeBudget`] when it is negative
    pub fn parse(text: &str) -> Result<Self, ModelError> {
        let amount: f64 = text
            .trim()
            .parse()
            .map_err(|_| ModelError::InvalidNumber(text.to_string()))?;
        Self::new(amount)
    }

    /// Amount as a float
    #[inline]
    #[must_use]
    pub fn amount(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Budget {
    type Error = ModelError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Budget> for f64 {
    fn from(value: Budget) -> Self {
        value.0
    }
}

impl Display for Budget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Completion percentage, `0..=100`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Progress(u8);

impl Progress {
    /// Largest allowed value
    pub const MAX: u8 = 100;

    /// Create a progress value
    ///
    /// # Errors
    /// Returns [`ModelError::ProgressOutOfRange`] above 100
    pub fn new(percent: u8) -> Result<Self, ModelError> {
        if percent <= Self::MAX {
            Ok(Self(percent))
        } else {
            Err(ModelError::ProgressOutOfRange(i64::from(percent)))
        }
    }

    /// Parse wizard text input
    ///
    /// # Errors
    /// Returns an error for non-integers and values outside `0..=100`
    pub fn parse(text: &str) -> Result<Self, ModelError> {
        let value: i64 = text
            .trim()
            .parse()
            .map_err(|_| ModelError::InvalidNumber(text.to_string()))?;
        u8::try_from(value)
            .map_err(|_| ModelError::ProgressOutOfRange(value))
            .and_then(Self::new)
    }

    /// Percentage value
    #[inline]
    #[must_use]
    pub fn percent(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Progress {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Progress> for u8 {
    fn from(value: Progress) -> Self {
        value.0
    }
}

/// Integer task status on a `0..=10` scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TaskStatus(u8);

impl TaskStatus {
    /// Largest allowed value
    pub const MAX: u8 = 10;

    /// Create a status
    ///
    /// # Errors
    /// Returns [`ModelError::TaskStatusOutOfRange`] above 10
    pub fn new(value: u8) -> Result<Self, ModelError> {
        if value <= Self::MAX {
            Ok(Self(value))
        } else {
            Err(ModelError::TaskStatusOutOfRange(i64::from(value)))
        }
    }

    /// Parse wizard text input
    ///
    /// # Errors
    /// Returns an error for non-integers and values outside `0..=10`
    pub fn parse(text: &str) -> Result<Self, ModelError> {
        let value: i64 = text
            .trim()
            .parse()
            .map_err(|_| ModelError::InvalidNumber(text.to_string()))?;
        u8::try_from(value)
            .map_err(|_| ModelError::TaskStatusOutOfRange(value))
            .and_then(Self::new)
    }

    /// Raw status value
    #[inline]
    #[must_use]
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for TaskStatus {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaskStatus> for u8 {
    fn from(value: TaskStatus) -> Self {
        value.0
    }
}

/// Inclusive date range of an activity, `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTimeline")]
pub struct Timeline {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawTimeline {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawTimeline> for Timeline {
    type Error = ModelError;

    fn try_from(raw: RawTimeline) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl Timeline {
    /// Create a timeline
    ///
    /// # Errors
    /// Returns [`ModelError::InvertedTimeline`] when `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ModelError> {
        if start > end {
            return Err(ModelError::InvertedTimeline { start, end });
        }
        Ok(Self { start, end })
    }

    /// First day
    #[inline]
    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day
    #[inline]
    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, both ends included
    #[inline]
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Parse a `YYYY-MM-DD` wizard date
///
/// # Errors
/// Returns [`ModelError::InvalidDate`] on any other format
pub fn parse_date(text: &str) -> Result<NaiveDate, ModelError> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_| ModelError::InvalidDate(text.to_string()))
}

/// Parse a four-digit program year
///
/// # Errors
/// Returns [`ModelError::InvalidYear`] for non-integers and years outside `1000..=9999`
pub fn parse_year(text: &str) -> Result<i32, ModelError> {
    text.trim()
        .parse::<i32>()
        .ok()
        .filter(|year| (1000..=9999).contains(year))
        .ok_or_else(|| ModelError::InvalidYear(text.to_string()))
}

/// Parse a numeric task target
///
/// # Errors
/// Returns [`ModelError::InvalidNumber`] or [`ModelError::NegativeTarget`]
pub fn parse_target(text: &str) -> Result<f64, ModelError> {
    let target: f64 = text
        .trim()
        .parse()
        .map_err(|_| ModelError::InvalidNumber(text.to_string()))?;
    if target.is_finite() && target >= 0.0 {
        Ok(target)
    } else {
        Err(ModelError::NegativeTarget(target))
    }
}

/// Normalize an enum label: lower case, `-` and spaces folded to `_`
fn normalize_label(text: &str) -> String {
    text.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Lifecycle status of a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramStatus {
    /// Not started yet
    #[default]
    Planned,
    /// Running
    Active,
    /// Paused
    OnHold,
    /// Finished
    Completed,
    /// Abandoned
    Cancelled,
}

impl FromStr for ProgramStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "planned" => Ok(Self::Planned),
            "active" => Ok(Self::Active),
            "on_hold" => Ok(Self::OnHold),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(ModelError::UnknownStatus(s.to_string())),
        }
    }
}

/// Lifecycle status of an activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    /// Not started yet
    #[default]
    NotStarted,
    /// Running
    InProgress,
    /// Finished
    Completed,
    /// Behind schedule
    Delayed,
    /// Abandoned
    Cancelled,
}

impl FromStr for ActivityStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "delayed" => Ok(Self::Delayed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(ModelError::UnknownStatus(s.to_string())),
        }
    }
}

/// Program visibility flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Listed on public dashboards
    Public,
    /// Visible to staff only
    #[default]
    Private,
}

impl Visibility {
    /// Whether the program is publicly listed
    #[inline]
    #[must_use]
    pub fn is_public(&self) -> bool {
        matches!(self, Self::Public)
    }
}

impl From<bool> for Visibility {
    fn from(public: bool) -> Self {
        if public {
            Self::Public
        } else {
            Self::Private
        }
    }
}

impl FromStr for Visibility {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "public" | "true" | "yes" => Ok(Self::Public),
            "private" | "false" | "no" => Ok(Self::Private),
            _ => Err(ModelError::UnknownVisibility(s.to_string())),
        }
    }
}
