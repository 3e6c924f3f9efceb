//! Profile completion scoring
//!
//! Pure, deterministic derivation of a [`ProfileCompletion`] from the
//! field set. Called on every save and every read so the stored value can
//! never drift from the fields it summarises.

use serde::{Deserialize, Serialize};

use super::ProfileFields;

/// Version of the counted field list. Bump when [`COMPLETION_FIELDS`] changes.
pub const COMPLETION_FIELDS_VERSION: u32 = 1;

/// Depth of enrichment a profile qualifies for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Minimal = 0,
    Basic = 1,
    Detailed = 2,
    Comprehensive = 3,
    Master = 4,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::Minimal,
        Tier::Basic,
        Tier::Detailed,
        Tier::Comprehensive,
        Tier::Master,
    ];

    pub fn from_score(score: f64) -> Self {
        if score < 0.25 {
            Tier::Minimal
        } else if score < 0.45 {
            Tier::Basic
        } else if score < 0.70 {
            Tier::Detailed
        } else if score < 0.90 {
            Tier::Comprehensive
        } else {
            Tier::Master
        }
    }

    pub fn level(&self) -> u8 {
        *self as u8
    }

    pub fn from_level(level: u8) -> Option<Self> {
        Self::ALL.get(level as usize).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Minimal => "minimal",
            Tier::Basic => "basic",
            Tier::Detailed => "detailed",
            Tier::Comprehensive => "comprehensive",
            Tier::Master => "master",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field that counts towards completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    Name,
    DisplayName,
    BirthDateTime,
    BirthPlace,
    MiddleName,
    Nickname,
    SpiritualName,
    MotherName,
    FatherName,
    Ancestry,
    Gender,
    BloodType,
    DominantHand,
    EyeColor,
    FirstBreath,
    WeatherConditions,
    MoonPhase,
    HospitalName,
    FirstWord,
    FirstSteps,
}

pub const COMPLETION_FIELDS: [ProfileField; 20] = [
    ProfileField::Name,
    ProfileField::DisplayName,
    ProfileField::BirthDateTime,
    ProfileField::BirthPlace,
    ProfileField::MiddleName,
    ProfileField::Nickname,
    ProfileField::SpiritualName,
    ProfileField::MotherName,
    ProfileField::FatherName,
    ProfileField::Ancestry,
    ProfileField::Gender,
    ProfileField::BloodType,
    ProfileField::DominantHand,
    ProfileField::EyeColor,
    ProfileField::FirstBreath,
    ProfileField::WeatherConditions,
    ProfileField::MoonPhase,
    ProfileField::HospitalName,
    ProfileField::FirstWord,
    ProfileField::FirstSteps,
];

const CRITICAL_FIELDS: [ProfileField; 3] = [
    ProfileField::Name,
    ProfileField::BirthDateTime,
    ProfileField::BirthPlace,
];

impl ProfileField {
    pub fn key(&self) -> &'static str {
        match self {
            ProfileField::Name => "name",
            ProfileField::DisplayName => "display_name",
            ProfileField::BirthDateTime => "birth_date_time",
            ProfileField::BirthPlace => "birth_place",
            ProfileField::MiddleName => "middle_name",
            ProfileField::Nickname => "nickname",
            ProfileField::SpiritualName => "spiritual_name",
            ProfileField::MotherName => "mother_name",
            ProfileField::FatherName => "father_name",
            ProfileField::Ancestry => "ancestry",
            ProfileField::Gender => "gender",
            ProfileField::BloodType => "blood_type",
            ProfileField::DominantHand => "dominant_hand",
            ProfileField::EyeColor => "eye_color",
            ProfileField::FirstBreath => "first_breath",
            ProfileField::WeatherConditions => "weather_conditions",
            ProfileField::MoonPhase => "moon_phase",
            ProfileField::HospitalName => "hospital_name",
            ProfileField::FirstWord => "first_word",
            ProfileField::FirstSteps => "first_steps",
        }
    }

    pub fn is_filled(&self, fields: &ProfileFields) -> bool {
        match self {
            ProfileField::Name => filled(&fields.name),
            ProfileField::DisplayName => filled(&fields.display_name),
            ProfileField::BirthDateTime => fields.birth_date_time.is_some(),
            ProfileField::BirthPlace => fields.birth_place.is_some(),
            ProfileField::MiddleName => filled(&fields.middle_name),
            ProfileField::Nickname => filled(&fields.nickname),
            ProfileField::SpiritualName => filled(&fields.spiritual_name),
            ProfileField::MotherName => filled(&fields.mother_name),
            ProfileField::FatherName => filled(&fields.father_name),
            ProfileField::Ancestry => filled(&fields.ancestry),
            ProfileField::Gender => fields.gender.is_some(),
            ProfileField::BloodType => fields.blood_type.is_some(),
            ProfileField::DominantHand => fields.dominant_hand.is_some(),
            ProfileField::EyeColor => filled(&fields.eye_color),
            ProfileField::FirstBreath => fields.first_breath.is_some(),
            ProfileField::WeatherConditions => filled(&fields.weather_conditions),
            ProfileField::MoonPhase => filled(&fields.moon_phase),
            ProfileField::HospitalName => filled(&fields.hospital_name),
            ProfileField::FirstWord => filled(&fields.first_word),
            ProfileField::FirstSteps => fields.first_steps.is_some(),
        }
    }
}

fn filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileCompletion {
    pub tier: Tier,
    pub filled_field_count: u32,
    pub total_field_count: u32,
    pub score: f64,
    pub missing_critical_fields: Vec<String>,
}

impl ProfileCompletion {
    pub fn percentage(&self) -> u32 {
        (self.score * 100.0).round() as u32
    }
}

/// Score a field set against the versioned field list
pub fn compute(fields: &ProfileFields) -> ProfileCompletion {
    let total = COMPLETION_FIELDS.len() as u32;
    let filled_count = COMPLETION_FIELDS
        .iter()
        .filter(|f| f.is_filled(fields))
        .count() as u32;

    let score = if total == 0 {
        0.0
    } else {
        (filled_count as f64 / total as f64).clamp(0.0, 1.0)
    };

    let missing_critical_fields = CRITICAL_FIELDS
        .iter()
        .filter(|f| !f.is_filled(fields))
        .map(|f| f.key().to_string())
        .collect();

    ProfileCompletion {
        tier: Tier::from_score(score),
        filled_field_count: filled_count,
        total_field_count: total,
        score,
        missing_critical_fields,
    }
}
