// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SkinType {
    Normal,
    Dry,
    Oily,
    Combination,
    Sensitive,
    #[serde(other)]
    #[default]
    Unknown,
}

impl fmt::Display for SkinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SkinType::Normal => "Normal",
            SkinType::Dry => "Dry",
            SkinType::Oily => "Oily",
            SkinType::Combination => "Combination",
            SkinType::Sensitive => "Sensitive",
            SkinType::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Severity tags are case-sensitive; anything the model invents falls into
/// `Unknown` and carries no health-score penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
    #[serde(other)]
    #[default]
    Unknown,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Mild => "Mild",
            Severity::Moderate => "Moderate",
            Severity::Severe => "Severe",
            Severity::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concern {
    pub name: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub short_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientToAvoid {
    pub name: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpfulIngredient {
    pub name: String,
    #[serde(default)]
    pub use_for: String,
    #[serde(default)]
    pub product_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPlanStep {
    pub title: String,
    pub priority: Priority,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkinAnalysis {
    #[serde(default)]
    pub skin_type: SkinType,
    #[serde(default)]
    pub overall_assessment: String,
    #[serde(default)]
    pub key_concerns: Vec<Concern>,
    #[serde(default)]
    pub ingredients_to_avoid: Vec<IngredientToAvoid>,
    #[serde(default)]
    pub ingredients_that_help: Vec<HelpfulIngredient>,
    #[serde(default)]
    pub general_recommendations: Vec<String>,
    #[serde(default)]
    pub dermatology_advice: String,
    #[serde(default)]
    pub action_plan_steps: Vec<ActionPlanStep>,
    #[serde(default)]
    pub quick_tips: Vec<String>,
    #[serde(default)]
    pub health_score: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "keyIngredients", default)]
    pub key_ingredients: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "type", default)]
    pub suggestion_type: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub products: Vec<String>,
    pub issue: String,
    #[serde(default)]
    pub solution: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutineStep {
    #[serde(default)]
    pub step: u32,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub instructions: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Routine {
    #[serde(rename = "AM", default)]
    pub am: Vec<RoutineStep>,
    #[serde(rename = "PM", default)]
    pub pm: Vec<RoutineStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingCategory {
    pub category: String,
    #[serde(default)]
    pub importance: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAnalysis {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
    #[serde(default)]
    pub conflicts: Vec<Conflict>,
    #[serde(default)]
    pub routine: Routine,
    #[serde(default)]
    pub missing: Vec<MissingCategory>,
}

// The detailed plan keeps the camelCase wire form the model is prompted for.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkinTypeAnalysis {
    #[serde(rename = "type", default)]
    pub skin_type: SkinType,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedConcern {
    pub concern: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub analysis: String,
    #[serde(default)]
    pub impact: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRoutineStep {
    #[serde(default)]
    pub step: u32,
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub products: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub tips: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyIngredient {
    pub name: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub usage: String,
    #[serde(default)]
    pub caution: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressTracking {
    #[serde(default)]
    pub week2: String,
    #[serde(default)]
    pub week6: String,
    #[serde(default)]
    pub week12: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPlan {
    #[serde(default)]
    pub introduction: String,
    #[serde(default)]
    pub skin_type_analysis: Option<SkinTypeAnalysis>,
    #[serde(default)]
    pub concerns_detailed: Vec<DetailedConcern>,
    #[serde(default)]
    pub am_routine: Vec<PlanRoutineStep>,
    #[serde(default)]
    pub pm_routine: Vec<PlanRoutineStep>,
    #[serde(default)]
    pub key_ingredients: Vec<KeyIngredient>,
    #[serde(default)]
    pub lifestyle_recommendations: Vec<String>,
    #[serde(default)]
    pub progress_tracking: ProgressTracking,
    #[serde(default)]
    pub when_to_see_dermatologist: Vec<String>,
    #[serde(default)]
    pub disclaimer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedScan {
    pub id: Uuid,
    pub saved_at: DateTime<Utc>,
    pub analysis: SkinAnalysis,
}

/// Lifecycle of the latest analysis per client. Terminal transitions always
/// clear `Pending`; no handler path may finish with the state still pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisState {
    #[default]
    Idle,
    Pending {
        started_at: DateTime<Utc>,
    },
    Succeeded {
        finished_at: DateTime<Utc>,
        health_score: u8,
    },
    Failed {
        error: String,
    },
}

impl AnalysisState {
    pub fn start(now: DateTime<Utc>) -> Self {
        AnalysisState::Pending { started_at: now }
    }

    pub fn succeed(self, now: DateTime<Utc>, health_score: u8) -> Self {
        AnalysisState::Succeeded {
            finished_at: now,
            health_score,
        }
    }

    pub fn fail(self, error: impl Into<String>) -> Self {
        AnalysisState::Failed {
            error: error.into(),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AnalysisState::Pending { .. })
    }
}

// Request bodies.

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub user: Option<String>,
    pub image: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionPlanRequest {
    #[serde(default)]
    pub user: Option<String>,
    pub image: String,
    #[serde(default)]
    pub analysis: Option<SkinAnalysis>,
}

/// Image payload after data-URI validation, ready for the model call.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub mime_type: String,
    pub data: String,
}
