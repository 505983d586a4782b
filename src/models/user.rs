//! User profile model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Primary training goal chosen during onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum FitnessGoal {
    Strength,
    Hypertrophy,
    FatLoss,
    Endurance,
    GeneralFitness,
}

/// Free-form UI preferences.
///
/// The well-known keys are typed; anything else the UI stores is kept
/// verbatim in `extra` so a round trip through this crate never drops it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// "metric" or "imperial"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    /// Ordered list of dashboard widget ids
    #[serde(default)]
    pub dashboard_widgets: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// User profile stored in the profile collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Provider user ID (also used as document ID)
    pub id: String,
    /// Display name
    #[serde(default)]
    pub username: Option<String>,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Primary fitness goal
    #[serde(default)]
    pub fitness_goal: Option<FitnessGoal>,
    #[serde(default)]
    pub preferences: Preferences,
    /// When the profile was created (RFC 3339)
    pub created_at: String,
}

impl UserProfile {
    /// New profile written right after account creation.
    pub fn new(id: impl Into<String>, username: &str, email: &str, created_at: String) -> Self {
        Self {
            id: id.into(),
            username: Some(username.to_string()),
            email: Some(email.to_string()),
            fitness_goal: None,
            preferences: Preferences::default(),
            created_at,
        }
    }
}
