//! Tiered prompt construction
//!
//! Each tier renders every section of the tier below it plus its own, and asks
//! for more analysis dimensions. Output for the same context therefore never
//! shrinks as the tier rises.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::context::{keys, EnrichmentContext};
use crate::core::profile::Tier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptVariant {
    Minimal,
    Basic,
    Detailed,
    Comprehensive,
    Master,
}

impl PromptVariant {
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Minimal => PromptVariant::Minimal,
            Tier::Basic => PromptVariant::Basic,
            Tier::Detailed => PromptVariant::Detailed,
            Tier::Comprehensive => PromptVariant::Comprehensive,
            Tier::Master => PromptVariant::Master,
        }
    }

    pub fn target_words(&self) -> u32 {
        match self {
            PromptVariant::Minimal => 300,
            PromptVariant::Basic => 600,
            PromptVariant::Detailed => 1200,
            PromptVariant::Comprehensive => 1800,
            PromptVariant::Master => 2700,
        }
    }

    /// Number of analysis dimensions requested
    fn dimensions(&self) -> usize {
        match self {
            PromptVariant::Minimal => 2,
            PromptVariant::Basic => 3,
            PromptVariant::Detailed => 4,
            PromptVariant::Comprehensive => 5,
            PromptVariant::Master => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptVariant::Minimal => "minimal",
            PromptVariant::Basic => "basic",
            PromptVariant::Detailed => "detailed",
            PromptVariant::Comprehensive => "comprehensive",
            PromptVariant::Master => "master",
        }
    }
}

/// A rendered prompt ready to send to any provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptText {
    pub text: String,
    pub variant: PromptVariant,
    pub target_words: u32,
}

impl PromptText {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

const PREAMBLE: &str = "You are a spiritual advisor versed in Chaldean and Pythagorean numerology, \
sidereal astrology and energy profiling. Ground every insight in the data provided, reference \
exact numbers and placements, and keep the tone empowering and non-judgmental.";

const DIMENSIONS: [(&str, &str); 6] = [
    ("Soul Purpose & Life Path", "the core mission their numbers and placements point to"),
    ("Natural Gifts & Strengths", "innate talents and practical ways to develop them"),
    ("Family & Ancestral Patterns", "what their lineage and upbringing carry forward"),
    ("Energetic Constitution", "their energy type, strategy and how to sustain vitality"),
    ("Timing & Life Cycles", "how birth timing and environment shape their cycles"),
    ("Spiritual Practices & Recommendations", "personalised practices that will resonate"),
];

enum Source {
    Personal(&'static [&'static str]),
    Numerology,
    Astrology,
    Energy,
}

struct Section {
    title: &'static str,
    min_tier: Tier,
    sources: &'static [Source],
}

const SECTIONS: [Section; 6] = [
    Section {
        title: "Identity & Numerology",
        min_tier: Tier::Minimal,
        sources: &[Source::Personal(keys::IDENTITY), Source::Numerology],
    },
    Section {
        title: "Family & Ancestry",
        min_tier: Tier::Basic,
        sources: &[Source::Personal(keys::FAMILY)],
    },
    Section {
        title: "Physical & Energetic",
        min_tier: Tier::Detailed,
        sources: &[Source::Personal(keys::PHYSICAL), Source::Energy],
    },
    Section {
        title: "Timing & Astrology",
        min_tier: Tier::Comprehensive,
        sources: &[Source::Personal(keys::TIMING), Source::Astrology],
    },
    Section {
        title: "Birth Environment",
        min_tier: Tier::Comprehensive,
        sources: &[Source::Personal(keys::ENVIRONMENT)],
    },
    Section {
        title: "Life Patterns & Preferences",
        min_tier: Tier::Master,
        sources: &[Source::Personal(keys::PREFERENCE)],
    },
];

fn push_entries(lines: &mut Vec<String>, map: &IndexMap<String, String>, only: Option<&[&str]>) {
    match only {
        Some(wanted) => {
            for key in wanted {
                if let Some(value) = map.get(*key) {
                    lines.push(format!("- **{key}:** {value}"));
                }
            }
        }
        None => {
            for (key, value) in map {
                lines.push(format!("- **{key}:** {value}"));
            }
        }
    }
}

fn render_section(ctx: &EnrichmentContext, section: &Section) -> Option<String> {
    let mut lines = Vec::new();
    for source in section.sources {
        match source {
            Source::Personal(wanted) => push_entries(&mut lines, &ctx.personal_details, Some(wanted)),
            Source::Numerology => push_entries(&mut lines, &ctx.numerology, None),
            Source::Astrology => push_entries(&mut lines, &ctx.astrology, None),
            Source::Energy => push_entries(&mut lines, &ctx.energy_profile, None),
        }
    }
    if lines.is_empty() {
        return None;
    }
    Some(format!("#### {}\n{}", section.title, lines.join("\n")))
}

pub struct PromptBuilder;

impl PromptBuilder {
    /// Render the prompt for `tier`. Never fails; absent data is simply left out.
    pub fn build(ctx: &EnrichmentContext, tier: Tier) -> PromptText {
        let variant = PromptVariant::for_tier(tier);
        let target_words = variant.target_words();

        let mut out = String::with_capacity(2048);
        out.push_str(PREAMBLE);
        out.push_str("\n\n## Profile Analysis Request\n\n");
        out.push_str(&format!(
            "**Data Quality:** {}/{} fields, {} depth\n",
            ctx.filled_fields,
            ctx.total_fields,
            variant.as_str()
        ));

        let sections: Vec<String> = SECTIONS
            .iter()
            .filter(|s| s.min_tier <= tier)
            .filter_map(|s| render_section(ctx, s))
            .collect();

        if !sections.is_empty() {
            out.push_str("\n### Available Data\n\n");
            out.push_str(&sections.join("\n\n"));
            out.push('\n');
        }

        out.push_str("\n### Analysis Framework\n\nCover these dimensions:\n");
        for (i, (title, focus)) in DIMENSIONS.iter().take(variant.dimensions()).enumerate() {
            out.push_str(&format!("{}. **{}** - {}\n", i + 1, title, focus));
        }

        out.push_str(&format!(
            "\n### Output Format\n\nUse one `##` header per dimension, in the order above. \
Write approximately {target_words} words in total.\n"
        ));

        PromptText {
            text: out,
            variant,
            target_words,
        }
    }
}
