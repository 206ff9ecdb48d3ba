//! Test utilities for picam-streamer
//!
//! Helpers shared by unit tests and the integration suite:
//! - logging initialization that survives being called from every test
//! - `.tar.gz` release archive builders
//! - release API payloads
//!
//! # Example
//!
//! ```rust,no_run
//! use picam_streamer::test_utils::archive::{TarEntry, write_tar_gz};
//! use std::path::Path;
//!
//! write_tar_gz(
//!     Path::new("/tmp/picam-streamer_linux_arm.tar.gz"),
//!     &[TarEntry::executable("picam-streamer", b"#!/bin/sh\necho new\n")],
//! )
//! .unwrap();
//! ```

pub mod archive;
pub mod fixtures;

pub use archive::{TarEntry, tar_gz_bytes, write_tar_gz};
pub use fixtures::{ReleaseFixture, releases_json};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. `level` wins over `RUST_LOG`; without
/// either, tests run silently.
///
/// ```bash
/// RUST_LOG=picam_streamer=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
