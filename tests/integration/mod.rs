//! Integration test suite for picam-streamer
//!
//! End-to-end tests of the self-update engine against a `wiremock` release
//! API, with real `.tar.gz` archives built on the fly, and tests of the
//! compiled binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! RUST_LOG=picam_streamer=debug cargo test --test integration -- --nocapture
//! ```
//!
//! # Test Organization
//!
//! - **commands**: the `picam-streamer` binary (`version`, `upgrade`, exit codes)
//! - **release_catalog**: release listing, leases and credentials
//! - **upgrade_flow**: complete upgrades, integrity and archive failures

#[path = "../common/mod.rs"]
mod common;

mod commands;
mod release_catalog;
mod upgrade_flow;
