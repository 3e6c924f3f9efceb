//! Common Test Utilities
//!
//! Shared fixtures and test doubles used across test modules:
//! - Profile and database fixtures (`fixtures`)
//! - A scripted `TextProvider` with a call counter (`scripted`)


pub use fixtures::*;
pub use scripted::ScriptedProvider;
