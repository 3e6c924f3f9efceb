//! Provider Unit Tests
//!
//! HTTP-level tests for the hosted and local backends against a wiremock server.

mod hosted_tests;
mod local_tests;
