//! Card data model.
//!
//! A [`Card`] is a prioritizable work item. It carries the legacy slider
//! fields (`urgency`, `important`, `effort`) alongside the RICE fields
//! (`reach`, `impact`, `confidence`, `effort_months`). Both generations of the
//! schema deserialize into the same struct; `effort` accepts either a numeric
//! rating or a free-text category.
//!
//! Cards are only created by the remote service, which assigns `id` and
//! `created_at`. Client code builds a [`NewCard`] for inserts and a
//! [`CardPatch`] for partial updates.

pub mod mapping;
pub mod scoring;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub use mapping::CardField;
pub use scoring::{rank_by_rice, rice_score, RiceFields};

/// Legacy effort value.
///
/// Older rows store a 1-10 slider rating, the oldest ones a category label
/// such as `"small"`. Some ratings were saved from a fractional slider, so the
/// rating is a float. Serialized untagged so either shape round-trips.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Effort {
    Rating(f64),
    Category(String),
}

impl Default for Effort {
    fn default() -> Self {
        Effort::Rating(1.0)
    }
}

impl Serialize for Effort {
    /// Whole ratings go out as integers so integer columns accept them.
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Effort::Rating(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                serializer.serialize_i64(*n as i64)
            }
            Effort::Rating(n) => serializer.serialize_f64(*n),
            Effort::Category(s) => serializer.serialize_str(s),
        }
    }
}

impl fmt::Display for Effort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effort::Rating(n) => write!(f, "{n}"),
            Effort::Category(s) => f.write_str(s),
        }
    }
}

impl std::str::FromStr for Effort {
    type Err = std::convert::Infallible;

    /// Numeric input becomes a rating, anything else a category.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Effort::Rating(n),
            _ => Effort::Category(trimmed.to_string()),
        })
    }
}

/// RICE impact multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Massive,
    High,
    Medium,
    Low,
    Minimal,
}

impl Impact {
    pub const ALL: [Impact; 5] = [
        Impact::Massive,
        Impact::High,
        Impact::Medium,
        Impact::Low,
        Impact::Minimal,
    ];

    pub fn multiplier(self) -> f64 {
        match self {
            Impact::Massive => 3.0,
            Impact::High => 2.0,
            Impact::Medium => 1.0,
            Impact::Low => 0.5,
            Impact::Minimal => 0.25,
        }
    }

    /// Exact match against the allowed multipliers.
    pub fn from_multiplier(value: f64) -> Option<Impact> {
        Impact::ALL.into_iter().find(|i| i.multiplier() == value)
    }
}

/// A card as held by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Assigned by the remote service.
    pub id: String,
    pub title: String,
    /// 1-10
    pub urgency: i32,
    /// 1-10
    pub important: i32,
    pub effort: Effort,
    pub owner: String,
    /// Assigned by the remote service.
    #[serde(deserialize_with = "mapping::deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    /// Number of customer leads reached.
    pub reach: i64,
    /// One of 3, 2, 1, 0.5, 0.25.
    pub impact: f64,
    /// Percentage, 0-100.
    pub confidence: f64,
    /// Person-months.
    pub effort_months: f64,
}

impl Card {
    pub fn rice(&self) -> RiceFields {
        RiceFields {
            reach: self.reach,
            impact: self.impact,
            confidence: self.confidence,
            effort_months: self.effort_months,
        }
    }

    pub fn rice_score(&self) -> f64 {
        self.rice().score()
    }
}

/// Insert payload: every card field except the server-assigned ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCard {
    pub title: String,
    pub urgency: i32,
    pub important: i32,
    pub effort: Effort,
    pub owner: String,
    pub reach: i64,
    pub impact: f64,
    pub confidence: f64,
    pub effort_months: f64,
}

impl Default for NewCard {
    fn default() -> Self {
        Self {
            title: String::new(),
            urgency: 5,
            important: 5,
            effort: Effort::Rating(5.0),
            owner: String::new(),
            reach: 0,
            impact: Impact::Medium.multiplier(),
            confidence: 100.0,
            effort_months: 1.0,
        }
    }
}

impl NewCard {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn rice(&self) -> RiceFields {
        RiceFields {
            reach: self.reach,
            impact: self.impact,
            confidence: self.confidence,
            effort_months: self.effort_months,
        }
    }

    pub fn rice_score(&self) -> f64 {
        self.rice().score()
    }

    /// Range checks for user input. Nothing in the store calls this; it is
    /// up to the caller to validate before inserting.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        validate_rating("urgency", self.urgency as i64)?;
        validate_rating("important", self.important as i64)?;
        validate_effort(&self.effort)?;
        validate_reach(self.reach)?;
        validate_impact(self.impact)?;
        validate_confidence(self.confidence)?;
        validate_effort_months(self.effort_months)
    }
}

/// Partial update. `None` fields are left untouched on the remote row.
///
/// `id` and `created_at` are immutable and have no slot here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub important: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort: Option<Effort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reach: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort_months: Option<f64>,
}

impl CardPatch {
    pub fn is_empty(&self) -> bool {
        *self == CardPatch::default()
    }

    /// Same checks as [`NewCard::validate`], applied to present fields only.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(ref title) = self.title {
            validate_title(title)?;
        }
        if let Some(urgency) = self.urgency {
            validate_rating("urgency", urgency as i64)?;
        }
        if let Some(important) = self.important {
            validate_rating("important", important as i64)?;
        }
        if let Some(ref effort) = self.effort {
            validate_effort(effort)?;
        }
        if let Some(reach) = self.reach {
            validate_reach(reach)?;
        }
        if let Some(impact) = self.impact {
            validate_impact(impact)?;
        }
        if let Some(confidence) = self.confidence {
            validate_confidence(confidence)?;
        }
        if let Some(effort_months) = self.effort_months {
            validate_effort_months(effort_months)?;
        }
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::invalid("title", "must not be empty"));
    }
    Ok(())
}

fn validate_rating(field: &str, value: i64) -> Result<(), ValidationError> {
    if !(1..=10).contains(&value) {
        return Err(ValidationError::invalid(
            field,
            format!("must be between 1 and 10, got {value}"),
        ));
    }
    Ok(())
}

fn validate_effort(effort: &Effort) -> Result<(), ValidationError> {
    match effort {
        Effort::Rating(n) if !(1.0..=10.0).contains(n) => Err(ValidationError::invalid(
            "effort",
            format!("must be between 1 and 10, got {n}"),
        )),
        Effort::Rating(_) => Ok(()),
        Effort::Category(s) if s.trim().is_empty() => {
            Err(ValidationError::invalid("effort", "category must not be empty"))
        }
        Effort::Category(_) => Ok(()),
    }
}

fn validate_reach(reach: i64) -> Result<(), ValidationError> {
    if reach < 0 {
        return Err(ValidationError::invalid("reach", "must not be negative"));
    }
    Ok(())
}

fn validate_impact(impact: f64) -> Result<(), ValidationError> {
    if Impact::from_multiplier(impact).is_none() {
        return Err(ValidationError::invalid(
            "impact",
            format!("must be one of 3, 2, 1, 0.5, 0.25, got {impact}"),
        ));
    }
    Ok(())
}

fn validate_confidence(confidence: f64) -> Result<(), ValidationError> {
    if !(0.0..=100.0).contains(&confidence) {
        return Err(ValidationError::invalid(
            "confidence",
            format!("must be a percentage between 0 and 100, got {confidence}"),
        ));
    }
    Ok(())
}

fn validate_effort_months(effort_months: f64) -> Result<(), ValidationError> {
    if !effort_months.is_finite() || effort_months < 0.0 {
        return Err(ValidationError::invalid(
            "effortMonths",
            format!("must be a non-negative number, got {effort_months}"),
        ));
    }
    Ok(())
}
