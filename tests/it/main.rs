//! Single test binary entry point.
//!
//! All integration tests compile into one binary to keep linking overhead
//! down.
//!
//! Structure:
//! - integration: Multi-component drag workflows through the router
//! - unit: Single-component tests against the public API

mod helpers;
