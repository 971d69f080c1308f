//! # Common Test Utilities
//!
//! Loads `.env` and installs a tracing subscriber once per test binary, so
//! `RUST_LOG=adintel=debug cargo test` shows the library's logs.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initializes the tracing subscriber and loads .env for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        dotenvy::dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .compact()
            .try_init();
    });
}
