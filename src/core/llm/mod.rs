//! Text Generation Module
//!
//! Provider trait, hosted and local backends, and the mode-driven selector
//! that combines them.

pub mod error;
pub mod provider;
pub mod providers;
pub mod selector;

pub use error::GenerationError;
pub use provider::{EnrichmentRequest, ProviderKind, TextProvider};
pub use providers::{HostedProvider, LocalProvider, ProviderConfig};
pub use selector::{AutoPrimary, CombinedProvider, ProviderMode, ProviderSettings};
