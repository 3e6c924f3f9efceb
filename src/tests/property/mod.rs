//! Property-based tests for the enrichment pipeline
//!
//! Uses proptest to check invariants over arbitrary field subsets.
//!
//! ## Test Modules
//!
//! - `completion_props`: completion scoring
//!   - Same fields always give the same result
//!   - Filling another field never lowers the score or tier
//!   - Counts and score stay in range
//!
//! - `prompt_props`: context and prompt building
//!   - Absent fields never produce a `**Key:**` line
//!   - Word targets never decrease with tier
//!   - Building is deterministic
//!
//! Run with more cases:
//! ```sh
//! PROPTEST_CASES=1000 cargo test property --release
//! ```

mod prompt_props;

use proptest::prelude::*;

use crate::core::profile::{ProfileField, ProfileFields, COMPLETION_FIELDS};
use crate::tests::common::fill;

/// Arbitrary subset of the completion fields
pub(crate) fn field_subset() -> impl Strategy<Value = Vec<ProfileField>> {
    proptest::sample::subsequence(COMPLETION_FIELDS.to_vec(), 0..=COMPLETION_FIELDS.len())
}

pub(crate) fn fields_from(subset: &[ProfileField]) -> ProfileFields {
    let mut fields = ProfileFields::default();
    for field in subset {
        fill(&mut fields, *field);
    }
    fields
}
