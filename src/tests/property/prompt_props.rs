//! Property tests for context and prompt building

use proptest::prelude::*;

use super::{field_subset, fields_from};
use crate::core::enrichment::context::keys;
use crate::core::enrichment::{EnrichmentContext, PromptBuilder, PromptVariant};
use crate::core::profile::{ProfileField, Tier};

/// Personal keys that only come from a single completion field
const SINGLE_SOURCE: [(ProfileField, &str); 8] = [
    (ProfileField::MiddleName, keys::MIDDLE_NAME),
    (ProfileField::Nickname, keys::NICKNAME),
    (ProfileField::SpiritualName, keys::SPIRITUAL_NAME),
    (ProfileField::MotherName, keys::MOTHER_NAME),
    (ProfileField::FatherName, keys::FATHER_NAME),
    (ProfileField::Ancestry, keys::ANCESTRY),
    (ProfileField::EyeColor, keys::EYE_COLOR),
    (ProfileField::FirstWord, keys::FIRST_WORD),
];

proptest! {
    #[test]
    fn absent_fields_never_render(subset in field_subset()) {
        let ctx = EnrichmentContext::from_fields(&fields_from(&subset));
        let prompt = PromptBuilder::build(&ctx, Tier::Master);

        for (field, key) in SINGLE_SOURCE {
            if !subset.contains(&field) {
                let line = format!("**{key}:**");
                prop_assert!(!prompt.text.contains(&line), "{} rendered without data", key);
                prop_assert!(!ctx.personal_details.contains_key(key));
            }
        }
    }

    #[test]
    fn no_birth_date_means_no_derived_maps(subset in field_subset()) {
        let ctx = EnrichmentContext::from_fields(&fields_from(&subset));
        if !subset.contains(&ProfileField::BirthDateTime) {
            prop_assert!(ctx.astrology.is_empty());
            prop_assert!(ctx.energy_profile.is_empty());
            prop_assert!(!ctx.numerology.contains_key("Life Path"));
        }
    }

    #[test]
    fn build_is_deterministic(subset in field_subset(), level in 0u8..5) {
        let tier = Tier::from_level(level).unwrap_or(Tier::Minimal);
        let ctx = EnrichmentContext::from_fields(&fields_from(&subset));
        prop_assert_eq!(PromptBuilder::build(&ctx, tier), PromptBuilder::build(&ctx, tier));
    }

    #[test]
    fn word_count_never_drops_with_tier(subset in field_subset()) {
        let ctx = EnrichmentContext::from_fields(&fields_from(&subset));
        let counts: Vec<usize> = Tier::ALL
            .iter()
            .map(|tier| PromptBuilder::build(&ctx, *tier).word_count())
            .collect();
        for pair in counts.windows(2) {
            prop_assert!(pair[0] <= pair[1], "word counts {:?}", counts);
        }
    }

    #[test]
    fn higher_tier_targets_more_words(low in 0u8..5, high in 0u8..5) {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        let low = Tier::from_level(low).unwrap_or(Tier::Minimal);
        let high = Tier::from_level(high).unwrap_or(Tier::Master);
        prop_assert!(PromptVariant::for_tier(low).target_words() <= PromptVariant::for_tier(high).target_words());
    }
}
