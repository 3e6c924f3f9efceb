//! Profile Domain Model
//!
//! The spiritual profile, its optional biographical fields, the derived
//! completion summary and the attached enrichment narrative.

pub mod completion;
pub mod store;

pub use completion::{compute, ProfileCompletion, ProfileField, Tier, COMPLETION_FIELDS, COMPLETION_FIELDS_VERSION};
pub use store::{ProfileStore, StoreResult};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Enumerations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Masculine,
    Feminine,
    NonBinary,
    PreferNotToSay,
}

impl Gender {
    pub fn label(&self) -> &'static str {
        match self {
            Gender::Masculine => "Masculine",
            Gender::Feminine => "Feminine",
            Gender::NonBinary => "Non-binary",
            Gender::PreferNotToSay => "Prefer not to say",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BloodType {
    APositive,
    ANegative,
    BPositive,
    BNegative,
    AbPositive,
    AbNegative,
    OPositive,
    ONegative,
    Unknown,
}

impl BloodType {
    pub fn label(&self) -> &'static str {
        match self {
            BloodType::APositive => "A+",
            BloodType::ANegative => "A-",
            BloodType::BPositive => "B+",
            BloodType::BNegative => "B-",
            BloodType::AbPositive => "AB+",
            BloodType::AbNegative => "AB-",
            BloodType::OPositive => "O+",
            BloodType::ONegative => "O-",
            BloodType::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    Left,
    Right,
    Ambidextrous,
}

impl Hand {
    pub fn label(&self) -> &'static str {
        match self {
            Hand::Left => "Left",
            Hand::Right => "Right",
            Hand::Ambidextrous => "Ambidextrous",
        }
    }
}

/// Cloud synchronisation state of a profile record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Local,
    Syncing,
    Synced,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Local => "local",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Synced => "synced",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "syncing" => SyncStatus::Syncing,
            "synced" => SyncStatus::Synced,
            _ => SyncStatus::Local,
        }
    }
}

// ============================================================================
// Profile Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BirthPlace {
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// Optional personal and biographical data.
///
/// Only the fields named in [`COMPLETION_FIELDS`] count towards completion;
/// the rest still flow into the prompt when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileFields {
    // Core identity
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub birth_date_time: Option<NaiveDateTime>,
    pub birth_place: Option<BirthPlace>,

    // Additional names
    pub middle_name: Option<String>,
    pub nickname: Option<String>,
    pub spiritual_name: Option<String>,
    pub maiden_name: Option<String>,

    // Family & ancestry
    pub mother_name: Option<String>,
    pub father_name: Option<String>,
    pub ancestry: Option<String>,
    pub family_tradition: Option<String>,

    // Physical & energetic
    pub gender: Option<Gender>,
    pub blood_type: Option<BloodType>,
    pub dominant_hand: Option<Hand>,
    pub eye_color: Option<String>,
    pub height_cm: Option<f64>,
    pub birth_weight_kg: Option<f64>,

    // Timing
    pub first_breath: Option<NaiveDateTime>,
    pub first_cry: Option<NaiveDateTime>,
    pub conception_date: Option<NaiveDateTime>,

    // Environmental
    pub weather_conditions: Option<String>,
    pub moon_phase: Option<String>,
    pub hospital_name: Option<String>,
    pub seasonal_energy: Option<String>,

    // Life patterns & preferences
    pub first_word: Option<String>,
    pub first_steps: Option<NaiveDateTime>,
    pub life_purpose: Option<String>,
    pub preferences: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldValueError {
    #[error("Unknown profile field: {0}")]
    UnknownField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ProfileFields {
    /// Set one field by its serialized key from user text.
    ///
    /// The text is tried as a plain string first, then as JSON, so dates,
    /// enum names, numbers and birth-place objects all work. Blank text clears.
    pub fn set_from_str(&mut self, key: &str, text: &str) -> Result<(), FieldValueError> {
        let invalid = |message: String| FieldValueError::InvalidValue {
            field: key.to_string(),
            message,
        };

        let mut object = match serde_json::to_value(&*self) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(invalid("fields did not encode as an object".to_string())),
            Err(e) => return Err(invalid(e.to_string())),
        };
        if !object.contains_key(key) {
            return Err(FieldValueError::UnknownField(key.to_string()));
        }

        let mut candidates = Vec::new();
        if text.trim().is_empty() {
            candidates.push(Value::Null);
        } else {
            candidates.push(Value::String(text.trim().to_string()));
            if let Ok(parsed) = serde_json::from_str::<Value>(text) {
                candidates.push(parsed);
            }
        }

        let mut last_error = String::new();
        for candidate in candidates {
            object.insert(key.to_string(), candidate);
            match serde_json::from_value::<ProfileFields>(Value::Object(object.clone())) {
                Ok(fields) => {
                    *self = fields;
                    return Ok(());
                }
                Err(e) => last_error = e.to_string(),
            }
        }
        Err(invalid(last_error))
    }
}

/// AI-generated narrative attached to a profile.
///
/// Text and timestamp travel together; a profile either has both or neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub narrative: String,
    pub generated_at: DateTime<Utc>,
}

impl EnrichmentResult {
    pub fn new(narrative: impl Into<String>) -> Self {
        Self {
            narrative: narrative.into(),
            generated_at: Utc::now(),
        }
    }

    pub fn at(narrative: impl Into<String>, generated_at: DateTime<Utc>) -> Self {
        Self {
            narrative: narrative.into(),
            generated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub profile_name: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub fields: ProfileFields,
    pub completion: ProfileCompletion,
    pub enrichment: Option<EnrichmentResult>,
    pub sync_status: SyncStatus,
}

impl Profile {
    /// Create a new, empty profile with a fresh id
    pub fn new(profile_name: impl Into<String>) -> Self {
        let now = Utc::now();
        let fields = ProfileFields::default();
        let completion = compute(&fields);
        Self {
            id: Uuid::new_v4().to_string(),
            profile_name: profile_name.into(),
            created_at: now,
            last_modified: now,
            fields,
            completion,
            enrichment: None,
            sync_status: SyncStatus::Local,
        }
    }

    pub fn with_fields(mut self, fields: ProfileFields) -> Self {
        self.completion = compute(&fields);
        self.fields = fields;
        self
    }

    /// Replace the field set, refreshing completion and modification time.
    ///
    /// The stored enrichment is left in place even though it is now stale.
    pub fn edit(&mut self, edit: impl FnOnce(&mut ProfileFields)) {
        edit(&mut self.fields);
        self.completion = compute(&self.fields);
        self.last_modified = Utc::now();
        self.sync_status = SyncStatus::Local;
    }

    pub fn tier(&self) -> Tier {
        self.completion.tier
    }
}
