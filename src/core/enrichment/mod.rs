//! Enrichment input preparation: derived calculations, context maps and prompts

pub mod calculators;
pub mod context;
pub mod prompt;

pub use context::EnrichmentContext;
pub use prompt::{PromptBuilder, PromptText, PromptVariant};
