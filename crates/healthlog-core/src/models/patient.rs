//! Patient models.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::UNSAVED_ID;

/// How physically active a patient is day to day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    /// Stored / wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Active => "active",
            ActivityLevel::VeryActive => "very_active",
        }
    }

    /// Parse a stored / wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sedentary" => Some(ActivityLevel::Sedentary),
            "light" => Some(ActivityLevel::Light),
            "moderate" => Some(ActivityLevel::Moderate),
            "active" => Some(ActivityLevel::Active),
            "very_active" => Some(ActivityLevel::VeryActive),
            _ => None,
        }
    }
}

/// What the patient is working towards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    LoseWeight,
    MaintainWeight,
    GainMuscle,
    ImproveHealth,
    Other,
}

impl Goal {
    /// Stored / wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Goal::LoseWeight => "lose_weight",
            Goal::MaintainWeight => "maintain_weight",
            Goal::GainMuscle => "gain_muscle",
            Goal::ImproveHealth => "improve_health",
            Goal::Other => "other",
        }
    }

    /// Parse a stored / wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "lose_weight" => Some(Goal::LoseWeight),
            "maintain_weight" => Some(Goal::MaintainWeight),
            "gain_muscle" => Some(Goal::GainMuscle),
            "improve_health" => Some(Goal::ImproveHealth),
            "other" => Some(Goal::Other),
            _ => None,
        }
    }
}

/// A person whose measurements are tracked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Storage-assigned id, [`UNSAVED_ID`] until persisted
    pub id: i64,
    pub first_name: String,
    pub last_name1: String,
    /// Second surname (optional)
    pub last_name2: Option<String>,
    /// Free-text gender category
    pub gender: String,
    pub birth_date: NaiveDate,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
    /// Storage-assigned creation timestamp, `None` until persisted
    pub created_at: Option<NaiveDateTime>,
}

impl Patient {
    /// Create an unsaved patient with required fields.
    pub fn new(
        first_name: String,
        last_name1: String,
        gender: String,
        birth_date: NaiveDate,
        activity_level: ActivityLevel,
        goal: Goal,
    ) -> Self {
        Self {
            id: UNSAVED_ID,
            first_name,
            last_name1,
            last_name2: None,
            gender,
            birth_date,
            activity_level,
            goal,
            created_at: None,
        }
    }

    /// Check if this patient has been persisted.
    pub fn is_persisted(&self) -> bool {
        self.id > 0
    }

    /// Display name: first name followed by the present surnames.
    pub fn full_name(&self) -> String {
        let mut parts = vec![self.first_name.trim(), self.last_name1.trim()];
        if let Some(last_name2) = self.last_name2.as_deref() {
            parts.push(last_name2.trim());
        }
        parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Case-insensitive substring match against first name and surnames.
    pub fn matches_name(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        self.first_name.to_lowercase().contains(&term)
            || self.last_name1.to_lowercase().contains(&term)
            || self
                .last_name2
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(&term))
    }
}
