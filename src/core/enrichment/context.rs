//! Enrichment context assembly
//!
//! Turns a profile snapshot into the ordered key/value maps the prompt
//! builder renders. Absent or blank fields never produce a key.

use chrono::{Datelike, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::calculators;
use crate::core::profile::{compute, Profile, ProfileFields, Tier};

/// Map keys, grouped by the prompt section that renders them
pub mod keys {
    // Identity
    pub const FULL_NAME: &str = "Full Name";
    pub const PREFERRED_NAME: &str = "Preferred Name";
    pub const BIRTH_DATE: &str = "Birth Date";
    pub const BIRTH_TIME: &str = "Birth Time";
    pub const BIRTH_CITY: &str = "Birth City";
    pub const BIRTH_STATE: &str = "Birth State";
    pub const BIRTH_COUNTRY: &str = "Birth Country";
    pub const MIDDLE_NAME: &str = "Middle Name";
    pub const NICKNAME: &str = "Nickname";
    pub const SPIRITUAL_NAME: &str = "Spiritual Name";
    pub const MAIDEN_NAME: &str = "Maiden Name";

    // Family
    pub const MOTHER_NAME: &str = "Mother's Name";
    pub const FATHER_NAME: &str = "Father's Name";
    pub const ANCESTRY: &str = "Ancestry";
    pub const FAMILY_TRADITION: &str = "Family Tradition";

    // Physical
    pub const GENDER: &str = "Gender";
    pub const EYE_COLOR: &str = "Eye Color";
    pub const DOMINANT_HAND: &str = "Dominant Hand";
    pub const BLOOD_TYPE: &str = "Blood Type";
    pub const HEIGHT: &str = "Height";
    pub const BIRTH_WEIGHT: &str = "Birth Weight";

    // Timing
    pub const FIRST_BREATH: &str = "First Breath";
    pub const FIRST_CRY: &str = "First Cry";
    pub const CONCEPTION_DATE: &str = "Conception Date";
    pub const FIRST_STEPS: &str = "First Steps";

    // Environment
    pub const BIRTH_WEATHER: &str = "Birth Weather";
    pub const MOON_PHASE: &str = "Moon Phase";
    pub const HOSPITAL: &str = "Hospital";
    pub const SEASONAL_ENERGY: &str = "Seasonal Energy";

    // Preferences
    pub const FIRST_WORD: &str = "First Word";
    pub const LIFE_PURPOSE: &str = "Life Purpose";
    pub const PREFERENCES: &str = "Preferences";

    pub const IDENTITY: &[&str] = &[
        FULL_NAME,
        PREFERRED_NAME,
        MIDDLE_NAME,
        NICKNAME,
        SPIRITUAL_NAME,
        MAIDEN_NAME,
        BIRTH_DATE,
        BIRTH_TIME,
        BIRTH_CITY,
        BIRTH_STATE,
        BIRTH_COUNTRY,
    ];
    pub const FAMILY: &[&str] = &[MOTHER_NAME, FATHER_NAME, ANCESTRY, FAMILY_TRADITION];
    pub const PHYSICAL: &[&str] = &[GENDER, EYE_COLOR, DOMINANT_HAND, BLOOD_TYPE, HEIGHT, BIRTH_WEIGHT];
    pub const TIMING: &[&str] = &[FIRST_BREATH, FIRST_CRY, CONCEPTION_DATE, FIRST_STEPS];
    pub const ENVIRONMENT: &[&str] = &[BIRTH_WEATHER, MOON_PHASE, HOSPITAL, SEASONAL_ENERGY];
    pub const PREFERENCE: &[&str] = &[FIRST_WORD, LIFE_PURPOSE, PREFERENCES];
}

/// Request-scoped input to the prompt builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentContext {
    pub numerology: IndexMap<String, String>,
    pub astrology: IndexMap<String, String>,
    pub energy_profile: IndexMap<String, String>,
    pub personal_details: IndexMap<String, String>,
    pub filled_fields: u32,
    pub total_fields: u32,
    pub tier: Tier,
}

impl EnrichmentContext {
    /// Build from a profile snapshot, recomputing completion from its fields
    pub fn from_profile(profile: &Profile) -> Self {
        Self::from_fields(&profile.fields)
    }

    pub fn from_fields(fields: &ProfileFields) -> Self {
        let completion = compute(fields);
        Self {
            numerology: numerology(fields),
            astrology: astrology(fields),
            energy_profile: energy_profile(fields),
            personal_details: personal_details(fields),
            filled_fields: completion.filled_field_count,
            total_fields: completion.total_field_count,
            tier: completion.tier,
        }
    }

    /// Total number of populated keys across all maps
    pub fn len(&self) -> usize {
        self.numerology.len() + self.astrology.len() + self.energy_profile.len() + self.personal_details.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn text(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn put(map: &mut IndexMap<String, String>, key: &str, value: Option<String>) {
    if let Some(v) = value {
        map.insert(key.to_string(), v);
    }
}

fn put_text(map: &mut IndexMap<String, String>, key: &str, value: &Option<String>) {
    put(map, key, text(value).map(str::to_string));
}

fn format_moment(value: &Option<NaiveDateTime>) -> Option<String> {
    value.map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
}

fn birth_parts(fields: &ProfileFields) -> Option<(u32, u32, i32)> {
    fields.birth_date_time.map(|dt| (dt.day(), dt.month(), dt.year()))
}

fn numerology(fields: &ProfileFields) -> IndexMap<String, String> {
    let mut map = IndexMap::new();

    if let Some(name) = text(&fields.name) {
        put(&mut map, "Chaldean Name Number", calculators::chaldean_name_number(name).map(|n| n.to_string()));
        put(&mut map, "Pythagorean Name Number", calculators::pythagorean_name_number(name).map(|n| n.to_string()));
    }

    if let Some((day, month, year)) = birth_parts(fields) {
        let life_path = calculators::life_path(day, month, year.unsigned_abs());
        map.insert("Life Path".to_string(), life_path.to_string());
        map.insert("Birth Day".to_string(), day.to_string());
        map.insert("Birth Month".to_string(), month.to_string());
        map.insert("Birth Year".to_string(), year.to_string());
    }

    if let Some(display) = text(&fields.display_name) {
        put(&mut map, "Display Name Chaldean", calculators::chaldean_name_number(display).map(|n| n.to_string()));
        put(
            &mut map,
            "Display Name Pythagorean",
            calculators::pythagorean_name_number(display).map(|n| n.to_string()),
        );
    }

    map
}

fn astrology(fields: &ProfileFields) -> IndexMap<String, String> {
    let mut map = IndexMap::new();
    let Some((day, month, year)) = birth_parts(fields) else {
        return map;
    };

    let sun = calculators::approximate_sun(day, month, year);
    map.insert("Sun Sign".to_string(), sun.sign.to_string());
    map.insert("Sun Degree".to_string(), format!("{:.2}", sun.degree));
    map.insert("Sidereal Longitude".to_string(), format!("{:.2}", sun.sidereal_longitude));
    map.insert("Tropical Longitude".to_string(), format!("{:.2}", sun.tropical_longitude));
    map.insert("Ayanamsa".to_string(), format!("{:.4}", sun.ayanamsa));

    if let Some(place) = &fields.birth_place {
        map.insert("Birth Latitude".to_string(), format!("{:.4}", place.latitude));
        map.insert("Birth Longitude".to_string(), format!("{:.4}", place.longitude));
    }

    map
}

fn energy_profile(fields: &ProfileFields) -> IndexMap<String, String> {
    let mut map = IndexMap::new();
    let Some((day, month, year)) = birth_parts(fields) else {
        return map;
    };

    let energy = calculators::energy_type(day, month, year.unsigned_abs());
    let lines = calculators::line_profile(day, month);
    map.insert("Energy Type".to_string(), energy.label().to_string());
    map.insert("Profile Notation".to_string(), lines.notation());
    map.insert(
        "Conscious Line".to_string(),
        format!("{} {} ({})", lines.conscious.number, lines.conscious.name, lines.conscious.description),
    );
    map.insert(
        "Unconscious Line".to_string(),
        format!("{} {} ({})", lines.unconscious.number, lines.unconscious.name, lines.unconscious.description),
    );
    map
}

fn personal_details(fields: &ProfileFields) -> IndexMap<String, String> {
    let mut map = IndexMap::new();

    put_text(&mut map, keys::FULL_NAME, &fields.name);
    put_text(&mut map, keys::PREFERRED_NAME, &fields.display_name);
    if let Some(dt) = fields.birth_date_time {
        map.insert(keys::BIRTH_DATE.to_string(), dt.date().to_string());
        map.insert(keys::BIRTH_TIME.to_string(), dt.time().format("%H:%M").to_string());
    }
    if let Some(place) = &fields.birth_place {
        put_text(&mut map, keys::BIRTH_CITY, &Some(place.city.clone()));
        put_text(&mut map, keys::BIRTH_STATE, &place.state);
        put_text(&mut map, keys::BIRTH_COUNTRY, &Some(place.country.clone()));
    }
    put_text(&mut map, keys::MIDDLE_NAME, &fields.middle_name);
    put_text(&mut map, keys::NICKNAME, &fields.nickname);
    put_text(&mut map, keys::SPIRITUAL_NAME, &fields.spiritual_name);
    put_text(&mut map, keys::MAIDEN_NAME, &fields.maiden_name);

    put_text(&mut map, keys::MOTHER_NAME, &fields.mother_name);
    put_text(&mut map, keys::FATHER_NAME, &fields.father_name);
    put_text(&mut map, keys::ANCESTRY, &fields.ancestry);
    put_text(&mut map, keys::FAMILY_TRADITION, &fields.family_tradition);

    put(&mut map, keys::GENDER, fields.gender.map(|g| g.label().to_string()));
    put_text(&mut map, keys::EYE_COLOR, &fields.eye_color);
    put(&mut map, keys::DOMINANT_HAND, fields.dominant_hand.map(|h| h.label().to_string()));
    put(&mut map, keys::BLOOD_TYPE, fields.blood_type.map(|b| b.label().to_string()));
    put(&mut map, keys::HEIGHT, fields.height_cm.map(|h| format!("{h:.0} cm")));
    put(&mut map, keys::BIRTH_WEIGHT, fields.birth_weight_kg.map(|w| format!("{w:.2} kg")));

    put(&mut map, keys::FIRST_BREATH, format_moment(&fields.first_breath));
    put(&mut map, keys::FIRST_CRY, format_moment(&fields.first_cry));
    put(&mut map, keys::CONCEPTION_DATE, fields.conception_date.map(|d| d.date().to_string()));
    put(&mut map, keys::FIRST_STEPS, fields.first_steps.map(|d| d.date().to_string()));

    put_text(&mut map, keys::BIRTH_WEATHER, &fields.weather_conditions);
    put_text(&mut map, keys::MOON_PHASE, &fields.moon_phase);
    put_text(&mut map, keys::HOSPITAL, &fields.hospital_name);
    put_text(&mut map, keys::SEASONAL_ENERGY, &fields.seasonal_energy);

    put_text(&mut map, keys::FIRST_WORD, &fields.first_word);
    put_text(&mut map, keys::LIFE_PURPOSE, &fields.life_purpose);
    put_text(&mut map, keys::PREFERENCES, &fields.preferences);

    map
}
