// src/models.rs

use crate::constants::*;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// --- Update Rules ---

/// Which mastery formula a practice outcome is scored with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateRule {
    /// Rule A: moves mastery a fraction of the way toward 1.0 on success,
    /// decays it multiplicatively on failure. Used by single practice attempts.
    Ema,
    /// Rule B: mastery is the raw success ratio. Used by the batch updater.
    SuccessRatio,
}

impl UpdateRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateRule::Ema => "ema",
            UpdateRule::SuccessRatio => "success_ratio",
        }
    }
}

impl FromStr for UpdateRule {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ema" | "A" => Ok(UpdateRule::Ema),
            "success_ratio" | "B" => Ok(UpdateRule::SuccessRatio),
            other => Err(Error::InvalidInput(format!("unknown update rule '{}'", other))),
        }
    }
}

impl fmt::Display for UpdateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MasteryTier {
    New,
    Learning,
    Mastered,
}

impl MasteryTier {
    pub fn from_level(level: f64) -> Self {
        if level >= TIER_MASTERED_THRESHOLD {
            MasteryTier::Mastered
        } else if level >= TIER_LEARNING_THRESHOLD {
            MasteryTier::Learning
        } else {
            MasteryTier::New
        }
    }
}

// --- Data Models ---

/// The slice of a concept the mastery engine reads and writes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConceptMasteryRecord {
    pub mastery_level: f64,
    pub times_encountered: u32,
    pub times_succeeded: u32,
    pub times_failed: u32,
    pub needs_review: bool,
    pub next_review_date: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
}

impl ConceptMasteryRecord {
    pub fn new(mastery_level: f64) -> Self {
        ConceptMasteryRecord {
            mastery_level: mastery_level.clamp(MASTERY_MIN, MASTERY_MAX),
            times_encountered: 0,
            times_succeeded: 0,
            times_failed: 0,
            needs_review: false,
            next_review_date: None,
            last_used: None,
        }
    }
}

impl ConceptMasteryRecord {
    /// Every attempt is either a success or a failure.
    pub fn check_counters(&self) -> Result<()> {
        let recorded = u64::from(self.times_succeeded) + u64::from(self.times_failed);
        if u64::from(self.times_encountered) != recorded {
            return Err(Error::InvalidInput(format!(
                "times_encountered ({}) must equal times_succeeded ({}) + times_failed ({})",
                self.times_encountered, self.times_succeeded, self.times_failed
            )));
        }
        Ok(())
    }
}

impl Default for ConceptMasteryRecord {
    fn default() -> Self {
        Self::new(MASTERY_DEFAULT)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Concept {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub mastery: ConceptMasteryRecord,
    pub related_concepts: Vec<i64>,
    pub prerequisites: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NewConcept {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub mastery_level: f64,
    #[serde(default)]
    pub related_concepts: Vec<i64>,
    #[serde(default)]
    pub prerequisites: Vec<i64>,
}

impl NewConcept {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        NewConcept {
            name: name.into(),
            category: category.into(),
            description: None,
            mastery_level: MASTERY_DEFAULT,
            related_concepts: Vec::new(),
            prerequisites: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_label("name", &self.name)?;
        check_label("category", &self.category)?;
        check_mastery(self.mastery_level)
    }
}

/// Partial update; `None` leaves a field untouched.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ConceptPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub mastery_level: Option<f64>,
    pub needs_review: Option<bool>,
    pub next_review_date: Option<DateTime<Utc>>,
    pub times_encountered: Option<u32>,
    pub times_succeeded: Option<u32>,
    pub times_failed: Option<u32>,
    pub related_concepts: Option<Vec<i64>>,
    pub prerequisites: Option<Vec<i64>>,
}

impl ConceptPatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            check_label("name", name)?;
        }
        if let Some(category) = &self.category {
            check_label("category", category)?;
        }
        if let Some(level) = self.mastery_level {
            check_mastery(level)?;
        }
        Ok(())
    }

    pub fn apply(&self, concept: &mut Concept, now: DateTime<Utc>) {
        if let Some(v) = &self.name {
            concept.name = v.clone();
        }
        if let Some(v) = &self.category {
            concept.category = v.clone();
        }
        if let Some(v) = &self.description {
            concept.description = Some(v.clone());
        }
        if let Some(v) = self.mastery_level {
            concept.mastery.mastery_level = v;
        }
        if let Some(v) = self.needs_review {
            concept.mastery.needs_review = v;
        }
        if let Some(v) = self.next_review_date {
            concept.mastery.next_review_date = Some(v);
        }
        if let Some(v) = self.times_encountered {
            concept.mastery.times_encountered = v;
        }
        if let Some(v) = self.times_succeeded {
            concept.mastery.times_succeeded = v;
        }
        if let Some(v) = self.times_failed {
            concept.mastery.times_failed = v;
        }
        if let Some(v) = &self.related_concepts {
            concept.related_concepts = v.clone();
        }
        if let Some(v) = &self.prerequisites {
            concept.prerequisites = v.clone();
        }
        concept.mastery.last_used = Some(now);
        concept.updated_at = now;
    }
}

fn check_label(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

fn check_mastery(level: f64) -> Result<()> {
    if !(MASTERY_MIN..=MASTERY_MAX).contains(&level) {
        return Err(Error::InvalidInput(format!(
            "mastery level {} is outside [0, 1]",
            level
        )));
    }
    Ok(())
}

// --- Listing ---

#[derive(Debug, Clone)]
pub struct ConceptFilter {
    pub category: Option<String>,
    pub needs_review_only: bool,
    pub page: u32,
    pub limit: u32,
}

impl Default for ConceptFilter {
    fn default() -> Self {
        ConceptFilter {
            category: None,
            needs_review_only: false,
            page: PAGE_DEFAULT,
            limit: PAGE_SIZE_DEFAULT,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Serialize, Debug)]
pub struct ConceptPage {
    pub concepts: Vec<Concept>,
    pub pagination: Pagination,
}

// Used for seeding
#[derive(Deserialize)]
pub struct JsonConcept {
    pub name: String,
    pub category: String,
    pub description: String,
    pub mastery_level: f64,
}
