pub mod consent;
pub mod credentials;
pub mod enrichment;
pub mod jobs;
pub mod llm;
pub mod logging;
pub mod profile;
