//! Numerology, astrology and energy-profile derivations
//!
//! All functions here are pure and total: inputs outside the expected range
//! produce a defined value rather than an error.

// ============================================================================
// Numerology
// ============================================================================

fn chaldean_value(c: char) -> u32 {
    match c {
        'A' | 'I' | 'J' | 'Q' | 'Y' => 1,
        'B' | 'K' | 'R' => 2,
        'C' | 'G' | 'L' | 'S' => 3,
        'D' | 'M' | 'T' => 4,
        'E' | 'H' | 'N' => 5,
        'U' | 'V' | 'W' | 'X' => 6,
        'O' | 'Z' => 7,
        'F' | 'P' => 8,
        _ => 0,
    }
}

fn pythagorean_value(c: char) -> u32 {
    match c {
        'A' | 'J' | 'S' => 1,
        'B' | 'K' | 'T' => 2,
        'C' | 'L' | 'U' => 3,
        'D' | 'M' | 'V' => 4,
        'E' | 'N' | 'W' => 5,
        'F' | 'O' | 'X' => 6,
        'G' | 'P' | 'Y' => 7,
        'H' | 'Q' | 'Z' => 8,
        'I' | 'R' => 9,
        _ => 0,
    }
}

fn digit_sum(mut n: u32) -> u32 {
    let mut sum = 0;
    while n > 0 {
        sum += n % 10;
        n /= 10;
    }
    sum
}

/// Reduce to a single digit, stopping early at any of the given master numbers.
/// Zero stays zero.
fn reduce(mut n: u32, masters: &[u32]) -> u32 {
    while n > 9 && !masters.contains(&n) {
        n = digit_sum(n);
    }
    n
}

fn letter_sum(name: &str, value: fn(char) -> u32) -> u32 {
    name.chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(|c| c.to_uppercase())
        .map(value)
        .sum()
}

/// Chaldean name number (keeps 11 and 22). `None` when the name has no mapped letters.
pub fn chaldean_name_number(name: &str) -> Option<u32> {
    match letter_sum(name, chaldean_value) {
        0 => None,
        sum => Some(reduce(sum, &[11, 22])),
    }
}

/// Pythagorean name number (keeps 11, 22 and 33). `None` when the name has no mapped letters.
pub fn pythagorean_name_number(name: &str) -> Option<u32> {
    match letter_sum(name, pythagorean_value) {
        0 => None,
        sum => Some(reduce(sum, &[11, 22, 33])),
    }
}

pub fn life_path(day: u32, month: u32, year: u32) -> u32 {
    const MASTERS: [u32; 3] = [11, 22, 33];
    let total = reduce(day, &MASTERS) + reduce(month, &MASTERS) + reduce(year, &MASTERS);
    reduce(total, &MASTERS)
}

// ============================================================================
// Astrology
// ============================================================================

const LAHIRI_AYANAMSA_2000: f64 = 23.85;
const AYANAMSA_RATE: f64 = 0.01397;

const SIGNS: [&str; 12] = [
    "Aries",
    "Taurus",
    "Gemini",
    "Cancer",
    "Leo",
    "Virgo",
    "Libra",
    "Scorpio",
    "Sagittarius",
    "Capricorn",
    "Aquarius",
    "Pisces",
];

#[derive(Debug, Clone, PartialEq)]
pub struct SunPosition {
    pub tropical_longitude: f64,
    pub sidereal_longitude: f64,
    pub sign: &'static str,
    pub degree: f64,
    pub ayanamsa: f64,
}

pub fn ayanamsa(year: i32) -> f64 {
    LAHIRI_AYANAMSA_2000 + (year - 2000) as f64 * AYANAMSA_RATE
}

fn normalize_degrees(lon: f64) -> f64 {
    lon.rem_euclid(360.0)
}

pub fn zodiac_sign(longitude: f64) -> (&'static str, f64) {
    let lon = normalize_degrees(longitude);
    let index = ((lon / 30.0).floor() as usize).min(SIGNS.len() - 1);
    (SIGNS[index], lon - index as f64 * 30.0)
}

/// Approximate sidereal sun position from the calendar date alone
pub fn approximate_sun(day: u32, month: u32, year: i32) -> SunPosition {
    let tropical = month.saturating_sub(1) as f64 * 30.0 + day as f64 * 0.98;
    let ayanamsa = ayanamsa(year);
    let sidereal = normalize_degrees(tropical - ayanamsa);
    let (sign, degree) = zodiac_sign(sidereal);
    SunPosition {
        tropical_longitude: tropical,
        sidereal_longitude: sidereal,
        sign,
        degree,
        ayanamsa,
    }
}

// ============================================================================
// Energy Profile
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyType {
    Initiator,
    Builder,
    Guide,
    Refiner,
    Observer,
}

impl EnergyType {
    const ALL: [EnergyType; 5] = [
        EnergyType::Initiator,
        EnergyType::Builder,
        EnergyType::Guide,
        EnergyType::Refiner,
        EnergyType::Observer,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EnergyType::Initiator => "Initiator",
            EnergyType::Builder => "Builder",
            EnergyType::Guide => "Guide",
            EnergyType::Refiner => "Refiner",
            EnergyType::Observer => "Observer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileLine {
    pub number: u32,
    pub name: &'static str,
    pub description: &'static str,
}

const LINES: [ProfileLine; 6] = [
    ProfileLine { number: 1, name: "Investigator", description: "Foundation seeker" },
    ProfileLine { number: 2, name: "Hermit", description: "Natural talent" },
    ProfileLine { number: 3, name: "Experimenter", description: "Trial and error" },
    ProfileLine { number: 4, name: "Opportunist", description: "Network builder" },
    ProfileLine { number: 5, name: "Heretic", description: "Solution provider" },
    ProfileLine { number: 6, name: "Role Model", description: "Living example" },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineProfile {
    pub conscious: ProfileLine,
    pub unconscious: ProfileLine,
}

impl LineProfile {
    pub fn notation(&self) -> String {
        format!("{}/{}", self.conscious.number, self.unconscious.number)
    }
}

pub fn energy_type(day: u32, month: u32, year: u32) -> EnergyType {
    EnergyType::ALL[((day + month + year) % 5) as usize]
}

pub fn line_profile(day: u32, month: u32) -> LineProfile {
    LineProfile {
        conscious: LINES[(day.saturating_sub(1) % 6) as usize],
        unconscious: LINES[(month.saturating_sub(1) % 6) as usize],
    }
}
